use crate::clients::http::MallClient;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Redirect chains through ad servers are chased at most this many hops.
const MAX_REDIRECT_HOPS: usize = 5;

const ITEM_HOST: &str = "item.rakuten.co.jp";

static META_REFRESH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta[^>]*refresh[^>]*content=["'][^"']*url=([^"']+)"#).unwrap());
static JS_REPLACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"window\.location\.replace\("([^"]+)"\)"#).unwrap());
static JS_HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:window\.)?location\.href\s*=\s*["']([^"']+)["']"#).unwrap());
static ITEM_HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="([^"]*item\.rakuten\.co\.jp[^"]*)""#).unwrap());
static JSON_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:url|link|href)"\s*:\s*"(https?://item\.rakuten\.co\.jp[^"]+)""#).unwrap()
});
static ANY_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(https?://item\.rakuten\.co\.jp/[^/]+/[^/\s"'<>]+)"#).unwrap());

static ITEM_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"item\.rakuten\.co\.jp/([^/?#]+)/([^/?#]+)").unwrap());
static ITEM_URL_LOOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"item\.rakuten\.co\.jp/([^/?#"']+)/([^/?#"']+)"#).unwrap());
static PRODUCT_PAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"product\.rakuten\.co\.jp/product/-/([^/?#]+)").unwrap());

/// Splits a canonical item URL into its `(shop_id, item_id)` pair.
pub fn parse_item_url(url: &str) -> Option<(String, String)> {
    ITEM_URL_RE
        .captures(url)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

/// Finds the first item link buried anywhere in page markup.
pub fn find_item_link(html: &str) -> Option<(String, String)> {
    ITEM_URL_LOOSE_RE
        .captures(html)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

pub fn is_product_page(url: &str) -> bool {
    PRODUCT_PAGE_RE.is_match(url)
}

/// Next hop extracted from a redirect interstitial, if any.
fn next_hop(html: &str) -> Option<String> {
    for re in [&*META_REFRESH_RE, &*JS_REPLACE_RE, &*JS_HREF_RE] {
        if let Some(caps) = re.captures(html) {
            return Some(caps[1].to_string());
        }
    }
    for re in [&*ITEM_HREF_RE, &*JSON_URL_RE, &*ANY_ITEM_RE] {
        if let Some(caps) = re.captures(html) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Resolves a PR/ad redirect link to the canonical item URL, chasing
/// meta-refresh and JS redirects up to [`MAX_REDIRECT_HOPS`] hops. On any
/// failure or when the bound is hit, the last known URL is returned.
pub async fn resolve_promo_link(client: &MallClient, url: &str) -> String {
    let mut current = url.to_string();

    for _ in 0..MAX_REDIRECT_HOPS {
        if current.contains(ITEM_HOST) && !current.contains("redirect") {
            return current;
        }

        let response = match client.fetch(&current).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Promo link fetch failed for {current}: {e}");
                return current;
            }
        };

        if response.final_url.contains(ITEM_HOST) {
            return response.final_url;
        }

        match next_hop(&response.text) {
            Some(next) => {
                debug!("Following promo redirect to {next}");
                current = next;
            }
            None => return current,
        }
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shop_and_item_from_url() {
        let (shop, item) =
            parse_item_url("https://item.rakuten.co.jp/cocacola-shop/4902102141116/?s=1").unwrap();
        assert_eq!(shop, "cocacola-shop");
        assert_eq!(item, "4902102141116");
    }

    #[test]
    fn meta_refresh_hop_is_detected() {
        let html = r#"<meta http-equiv="refresh" content="0;url=https://example.com/next">"#;
        assert_eq!(next_hop(html).as_deref(), Some("https://example.com/next"));
    }

    #[test]
    fn js_redirects_are_detected() {
        assert_eq!(
            next_hop(r#"<script>window.location.replace("https://a.example/x")</script>"#)
                .as_deref(),
            Some("https://a.example/x")
        );
        assert_eq!(
            next_hop(r#"<script>location.href = 'https://b.example/y'</script>"#).as_deref(),
            Some("https://b.example/y")
        );
    }

    #[test]
    fn embedded_item_links_are_a_last_resort() {
        let html = r#"{"url":"https://item.rakuten.co.jp/shop/item123"}"#;
        assert_eq!(
            next_hop(html).as_deref(),
            Some("https://item.rakuten.co.jp/shop/item123")
        );
    }

    #[test]
    fn product_aggregation_pages_are_recognized() {
        assert!(is_product_page("https://product.rakuten.co.jp/product/-/abcdef/"));
        assert!(!is_product_page("https://item.rakuten.co.jp/shop/item/"));
    }
}
