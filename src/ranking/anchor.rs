use once_cell::sync::Lazy;
use regex::Regex;

/// Assumed leaderboard page size when no rank marker can be located.
const ENTRIES_PER_PAGE: u32 = 80;

/// First absolute rank visible on a leaderboard page, plus the byte offset
/// right after the marker. Everything before the offset is promotional
/// clutter (browse history, sponsored carousels) and gets cut away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageAnchor {
    pub rank: u32,
    pub offset: usize,
}

// Rank markers show up as alt text (alt="81位"), inside rank-styled elements,
// or as free text after a tag close.
static RANK_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:alt="|class="[^"]*rank[^"]*".*?>|>\s*)(\d{1,3})\s*位"#).unwrap());

/// Finds the anchor for a leaderboard page. Never fails: without a marker it
/// falls back to rank 1 on page 1 and `(page-1)*80+1` beyond, with no slicing.
pub fn locate_anchor(content: &str, page: u32) -> PageAnchor {
    if let Some(caps) = RANK_MARKER_RE.captures(content) {
        if let Ok(rank) = caps[1].parse::<u32>() {
            return PageAnchor {
                rank,
                offset: caps.get(0).map(|m| m.end()).unwrap_or(0),
            };
        }
    }

    let rank = if page > 1 {
        (page - 1) * ENTRIES_PER_PAGE + 1
    } else {
        1
    };
    PageAnchor { rank, offset: 0 }
}

/// Truncates page content to the part after the anchor.
pub fn slice_after_anchor(content: &str, anchor: PageAnchor) -> &str {
    &content[anchor.offset..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_alt_text_marker() {
        let content = r#"<div>history</div><img alt="81位" src="b.png"><ul>list</ul>"#;
        let anchor = locate_anchor(content, 2);

        assert_eq!(anchor.rank, 81);
        assert_eq!(&content[anchor.offset..anchor.offset + 1], "\"");
        assert!(slice_after_anchor(content, anchor).contains("list"));
        assert!(!slice_after_anchor(content, anchor).contains("history"));
    }

    #[test]
    fn finds_rank_class_marker() {
        let content = r#"<span class="item-rank">1位</span><ol>entries</ol>"#;
        let anchor = locate_anchor(content, 1);
        assert_eq!(anchor.rank, 1);
        assert!(anchor.offset > 0);
    }

    #[test]
    fn finds_free_text_marker() {
        let content = "<li>\n 46位 first entry</li>";
        assert_eq!(locate_anchor(content, 2).rank, 46);
    }

    #[test]
    fn default_on_page_one_is_rank_one_no_slice() {
        let anchor = locate_anchor("no markers here", 1);
        assert_eq!(anchor, PageAnchor { rank: 1, offset: 0 });
    }

    #[test]
    fn default_on_later_pages_assumes_eighty_per_page() {
        assert_eq!(locate_anchor("nothing", 2).rank, 81);
        assert_eq!(locate_anchor("nothing", 3).rank, 161);
        assert_eq!(locate_anchor("nothing", 3).offset, 0);
    }
}
