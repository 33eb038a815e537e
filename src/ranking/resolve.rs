use super::entries::{first_occurrence, unique_entries_before, ItemRef};
use once_cell::sync::Lazy;
use regex::Regex;

// Some leaderboard renderings embed a per-item index in inline JSON, e.g.
// shopUnit[12]. When present it beats positional counting. Pages are matched
// lowercased, hence the (?i).
static SHOP_UNIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)shopunit\[(\d+)\]").unwrap());

/// Resolves the target's rank from the unit-index markers in the *unsliced*
/// page content: the nearest marker preceding the target's first occurrence
/// carries the authoritative rank. `None` when no marker precedes the target
/// or when the marker's index is not a valid rank (ranks start at 1).
pub fn resolve_structured(full_content: &str, target: &ItemRef) -> Option<u32> {
    let target_pos = first_occurrence(full_content, target)?;

    SHOP_UNIT_RE
        .captures_iter(full_content)
        .filter(|caps| caps.get(0).map(|m| m.start() < target_pos).unwrap_or(false))
        .last()
        .and_then(|caps| caps[1].parse().ok())
        .filter(|rank: &u32| *rank >= 1)
}

/// Positional fallback: anchor rank plus the target's index in the
/// deduplicated entry list.
pub fn resolve_positional(anchor_rank: u32, index: usize) -> u32 {
    anchor_rank + index as u32
}

/// Page-1 undercount correction. Slicing can absorb an entry that occurs once
/// before the anchor and once after, so the positional count comes up short.
/// Recounts distinct entries in the full content ahead of the target's first
/// occurrence; only usable when the target is locatable in both the full and
/// the sliced content.
pub fn corrected_first_page_rank(
    full_content: &str,
    sliced_content: &str,
    target: &ItemRef,
) -> Option<u32> {
    let pos_in_full = first_occurrence(full_content, target)?;
    first_occurrence(sliced_content, target)?;

    Some(unique_entries_before(full_content, pos_in_full) as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(shop: &str, item: &str) -> String {
        format!(r#"<a href="https://item.rakuten.co.jp/{shop}/{item}/">x</a>"#)
    }

    #[test]
    fn structured_rank_uses_nearest_preceding_marker() {
        let content = format!(
            "shopunit[1]{}shopunit[2]{}shopunit[3]{}",
            link("a", "1"),
            link("b", "2"),
            link("c", "3")
        );

        assert_eq!(resolve_structured(&content, &ItemRef::new("b", "2")), Some(2));
        assert_eq!(resolve_structured(&content, &ItemRef::new("c", "3")), Some(3));
    }

    #[test]
    fn structured_rank_requires_preceding_marker() {
        let content = format!("{}shopunit[5]", link("a", "1"));
        assert_eq!(resolve_structured(&content, &ItemRef::new("a", "1")), None);
    }

    #[test]
    fn structured_rank_rejects_zero_index() {
        // Ranks start at 1; a zero unit index is rendering noise, not a rank.
        let content = format!("shopunit[0]{}", link("a", "1"));
        assert_eq!(resolve_structured(&content, &ItemRef::new("a", "1")), None);
    }

    #[test]
    fn structured_rank_none_without_markers() {
        let content = link("a", "1");
        assert_eq!(resolve_structured(&content, &ItemRef::new("a", "1")), None);
    }

    #[test]
    fn positional_rank_is_monotonic_in_index() {
        let ranks: Vec<u32> = (0..5).map(|i| resolve_positional(46, i)).collect();
        assert_eq!(ranks, vec![46, 47, 48, 49, 50]);
    }

    #[test]
    fn correction_counts_unique_entries_ahead_of_target() {
        // "b/2" appears before the anchor cut and again after it. The sliced
        // list starts at the repeat, so positional counting misses "a/1".
        let before_anchor = [link("a", "1"), link("b", "2")].join("");
        let after_anchor = [link("b", "2"), link("c", "3")].join("");
        let full = format!("{before_anchor}{after_anchor}");

        let rank = corrected_first_page_rank(&full, &after_anchor, &ItemRef::new("c", "3"));
        assert_eq!(rank, Some(3));
    }

    #[test]
    fn correction_needs_target_in_both_views() {
        let full = link("a", "1");
        assert_eq!(
            corrected_first_page_rank(&full, "", &ItemRef::new("a", "1")),
            None
        );
    }
}
