use once_cell::sync::Lazy;
use regex::Regex;

/// One `shop/item` pair as it appears inside leaderboard markup. Both parts
/// are lowercased on construction so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemRef {
    pub shop_id: String,
    pub item_id: String,
}

impl ItemRef {
    pub fn new(shop_id: &str, item_id: &str) -> Self {
        Self {
            shop_id: shop_id.to_lowercase(),
            item_id: item_id.to_lowercase(),
        }
    }

    /// The canonical `shop/item` key used for ordering and membership tests.
    pub fn key(&self) -> String {
        format!("{}/{}", self.shop_id, self.item_id)
    }
}

static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"item\.rakuten\.co\.jp/([^/]+)/([^/"?]+)"#).unwrap());

// Looser variant for the page-1 undercount correction. Tolerates the encoded
// link formats that show up outside the ranked list proper.
static LOOSE_ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"item\.rakuten\.co\.jp/([^/"\s]+)/([^/"\s?]+)"#).unwrap());

/// Extracts the ranked entry list from (sliced) leaderboard content:
/// every `shop/item` pair in encounter order, first occurrence only.
pub fn extract_entries(content: &str) -> Vec<ItemRef> {
    let mut seen = std::collections::HashSet::new();
    let mut entries = Vec::new();

    for caps in ENTRY_RE.captures_iter(content) {
        let entry = ItemRef::new(&caps[1], &caps[2]);
        if seen.insert(entry.key()) {
            entries.push(entry);
        }
    }

    entries
}

/// 0-based position of `target` in the deduplicated entry list, if present.
pub fn position_of(entries: &[ItemRef], target: &ItemRef) -> Option<usize> {
    entries.iter().position(|e| e == target)
}

/// Counts distinct `shop/item` pairs appearing in `content` before byte
/// offset `end`, using the loose link pattern.
pub fn unique_entries_before(content: &str, end: usize) -> usize {
    LOOSE_ENTRY_RE
        .captures_iter(&content[..end])
        .map(|caps| ItemRef::new(&caps[1], &caps[2]).key())
        .collect::<std::collections::HashSet<_>>()
        .len()
}

/// Byte offset of the first occurrence of `target`'s canonical link inside
/// `content`. The content is expected to be lowercased already.
pub fn first_occurrence(content: &str, target: &ItemRef) -> Option<usize> {
    let pattern = format!(
        "item\\.rakuten\\.co\\.jp/{}/{}",
        regex::escape(&target.shop_id),
        regex::escape(&target.item_id)
    );
    Regex::new(&pattern).ok()?.find(content).map(|m| m.start())
}
