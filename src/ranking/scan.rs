use super::anchor::{locate_anchor, slice_after_anchor};
use super::entries::{extract_entries, position_of, ItemRef};
use super::resolve::{corrected_first_page_rank, resolve_positional, resolve_structured};
use crate::clients::http::MallClient;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

const UNAVAILABLE_MARKER: &str = "ページが表示できません";
const OVERALL_RANKING: &str = "総合ランキング";

static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static TITLE_FALLBACK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".title").unwrap());

/// Outcome of checking one leaderboard page for the target item. Distinguishes
/// "definitely absent" from "could not determine".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageScan {
    Found {
        rank: u32,
        category_name: Option<String>,
    },
    NotFound,
    /// Invalid leaderboard or a redirect to the overall ranking.
    Skipped,
    TransientError,
}

/// Rank of the target within one leaderboard category, with the category name
/// taken from the leaderboard's own title when available.
#[derive(Debug, Clone)]
pub struct CategoryHit {
    pub rank: u32,
    pub category_name: Option<String>,
}

/// Resolves the target's rank on a single page of leaderboard content.
/// Structured unit-index markers win; positional counting (with the page-1
/// undercount correction) is the fallback.
pub fn resolve_on_page(content: &str, page: u32, target: &ItemRef) -> Option<u32> {
    let full = content.to_lowercase();
    let anchor = locate_anchor(&full, page);
    let sliced = slice_after_anchor(&full, anchor);

    let entries = extract_entries(sliced);
    let index = position_of(&entries, target)?;
    debug!(
        "Target at index {} of {} deduplicated entries (anchor {})",
        index,
        entries.len(),
        anchor.rank
    );

    if let Some(rank) = resolve_structured(&full, target) {
        return Some(rank);
    }

    if page == 1 && anchor.rank == 1 {
        if let Some(rank) = corrected_first_page_rank(&full, sliced, target) {
            return Some(rank);
        }
    }

    Some(resolve_positional(anchor.rank, index))
}

/// Classifies and resolves one fetched leaderboard page.
pub fn scan_page(content: &str, page: u32, target: &ItemRef, rank_type: &str) -> PageScan {
    if content.contains(UNAVAILABLE_MARKER) {
        return PageScan::Skipped;
    }

    // Dead category ids bounce to the overall ranking. Only trust the page
    // title for that call, the marker text also shows up in nav links.
    if content.contains(OVERALL_RANKING) && !content.to_lowercase().contains(rank_type) {
        let document = Html::parse_document(content);
        if let Some(h1) = document.select(&TITLE_SEL).next() {
            if h1.text().collect::<String>().contains(OVERALL_RANKING) {
                return PageScan::Skipped;
            }
        }
    }

    match resolve_on_page(content, page, target) {
        Some(rank) => PageScan::Found {
            rank,
            category_name: leaderboard_title(content),
        },
        None => PageScan::NotFound,
    }
}

/// Leaderboard page title with the boilerplate ranking words removed.
fn leaderboard_title(content: &str) -> Option<String> {
    let document = Html::parse_document(content);
    let el = document
        .select(&TITLE_SEL)
        .next()
        .or_else(|| document.select(&TITLE_FALLBACK_SEL).next())?;

    let title = el
        .text()
        .collect::<String>()
        .replace("ランキング", "")
        .replace("デイリー", "")
        .trim()
        .to_string();

    (!title.is_empty()).then_some(title)
}

/// Scans up to `search_pages` pages of one category's leaderboard, in page
/// order, stopping at the first page containing the target. A fetch failure
/// aborts this category only.
pub async fn scan_category(
    client: &MallClient,
    target: &ItemRef,
    category_id: &str,
    rank_type: &str,
    search_pages: u32,
) -> Option<CategoryHit> {
    let base_url = format!("https://ranking.rakuten.co.jp/{rank_type}/{category_id}/");

    for page in 1..=search_pages {
        let url = if page > 1 {
            format!("{base_url}?p={page}")
        } else {
            base_url.clone()
        };

        debug!("Checking leaderboard page {url}");
        let scan = match client.fetch(&url).await {
            Ok(response) if response.is_ok() => scan_page(&response.text, page, target, rank_type),
            Ok(response) => {
                warn!("Leaderboard {url} returned HTTP {}", response.status);
                PageScan::TransientError
            }
            Err(e) => {
                warn!("Leaderboard fetch failed for {url}: {e}");
                PageScan::TransientError
            }
        };

        match scan {
            PageScan::Found {
                rank,
                category_name,
            } => {
                return Some(CategoryHit {
                    rank,
                    category_name,
                });
            }
            PageScan::NotFound | PageScan::Skipped => continue,
            PageScan::TransientError => return None,
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(shop: &str, item: &str) -> String {
        format!(r#"<a href="https://item.rakuten.co.jp/{shop}/{item}/">x</a>"#)
    }

    fn leaderboard(prefix: &str, entries: &[(&str, &str)]) -> String {
        let list: String = entries.iter().map(|(s, i)| entry(s, i)).collect();
        format!(r#"<h1>水・ソフトドリンクランキング</h1>{prefix}{list}"#)
    }

    #[test]
    fn structured_marker_beats_positional_count() {
        // Positionally the target is the second entry after a rank-1 anchor,
        // but the embedded unit index says 7.
        let page = format!(
            r#"<img alt="1位">{}shopunit[7]{}"#,
            entry("other", "x"),
            entry("shop", "item")
        );
        let rank = resolve_on_page(&page, 1, &ItemRef::new("shop", "item"));
        assert_eq!(rank, Some(7));
    }

    #[test]
    fn zero_unit_index_falls_back_to_positional() {
        // A zero marker must never leak out as "第0"; the positional count
        // takes over instead.
        let page = format!(r#"<img alt="1位">shopunit[0]{}"#, entry("shop", "item"));
        let rank = resolve_on_page(&page, 1, &ItemRef::new("shop", "item"));
        assert_eq!(rank, Some(1));
    }

    #[test]
    fn positional_fallback_counts_from_anchor() {
        let page = format!(
            r#"history junk<img alt="81位">{}{}{}"#,
            entry("a", "1"),
            entry("b", "2"),
            entry("c", "3")
        );
        let rank = resolve_on_page(&page, 2, &ItemRef::new("c", "3"));
        assert_eq!(rank, Some(83));
    }

    #[test]
    fn page_one_correction_recounts_from_full_content() {
        // b/2 appears in the history strip before the anchor and again in the
        // list, so the sliced list collapses it and undercounts c/3.
        let page = format!(
            r#"{}{}<img alt="1位">{}{}"#,
            entry("a", "1"),
            entry("b", "2"),
            entry("b", "2"),
            entry("c", "3")
        );
        // Positional counting alone would say rank 2.
        let rank = resolve_on_page(&page, 1, &ItemRef::new("c", "3"));
        assert_eq!(rank, Some(3));
    }

    #[test]
    fn target_absent_is_not_found() {
        let page = leaderboard("", &[("a", "1"), ("b", "2")]);
        assert_eq!(
            scan_page(&page, 1, &ItemRef::new("z", "9"), "daily"),
            PageScan::NotFound
        );
    }

    #[test]
    fn case_differences_do_not_hide_the_target() {
        let page = leaderboard("", &[("ShopX", "Item123")]);
        let scan = scan_page(&page, 1, &ItemRef::new("shopx", "item123"), "daily");
        assert!(matches!(scan, PageScan::Found { rank: 1, .. }));
    }

    #[test]
    fn unavailable_page_is_skipped() {
        let page = format!("<html>{UNAVAILABLE_MARKER}</html>");
        assert_eq!(
            scan_page(&page, 1, &ItemRef::new("a", "1"), "daily"),
            PageScan::Skipped
        );
    }

    #[test]
    fn overall_ranking_redirect_is_skipped() {
        let page = format!("<html><h1>{OVERALL_RANKING}</h1>{}</html>", entry("a", "1"));
        assert_eq!(
            scan_page(&page, 1, &ItemRef::new("a", "1"), "daily"),
            PageScan::Skipped
        );
    }

    #[test]
    fn found_carries_cleaned_leaderboard_title() {
        let page = leaderboard("", &[("shop", "item")]);
        match scan_page(&page, 1, &ItemRef::new("shop", "item"), "daily") {
            PageScan::Found { category_name, .. } => {
                assert_eq!(category_name.as_deref(), Some("水・ソフトドリンク"));
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }
}
