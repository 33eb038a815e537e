use crate::clients::http::MallClient;
use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Hard cap on review pages crawled per product.
const MAX_REVIEW_PAGES: u32 = 10;
/// Review pages hold about this many entries.
const REVIEWS_PER_PAGE: u32 = 30;
/// Order pages used for launch-date discovery paginate in smaller steps.
const ORDERS_PER_PAGE: u32 = 20;

static SORT_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+\.\d+/?$").unwrap());
static PAGE_PARAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?p=(\d+)").unwrap());
static PAGE_TOTAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"全(\d+)ページ|(\d+)ページ中").unwrap());
static REVIEW_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""reviewCount"\s*:\s*"?(\d+)"?"#).unwrap());
static REVIEW_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#">([^<]{20,500})</div></div><div class="expand-link"#).unwrap());
static ORDER_TOTAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""nr_max_review"\s*:\s*(\d+)"#).unwrap());
static ORDER_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""orderDate"\s*:\s*"(20\d{2})/(\d{1,2})/(\d{1,2})""#).unwrap());
static ORDER_DATE_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"注文日.{0,3}(20\d{2})/(\d{1,2})/(\d{1,2})").unwrap());

const NEGATIVE_WORDS: [&str; 11] = [
    "残念", "悪い", "がっかり", "最悪", "壊れ", "傷", "ダメ", "不良", "欠け", "凹", "錆",
];

/// Raw review signal collected from the review pages.
#[derive(Debug, Default)]
pub struct ReviewPages {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Strips the trailing sort segment (`/1.1/`) off a review URL.
pub fn review_base_url(review_url: &str) -> String {
    SORT_SUFFIX_RE
        .replace(review_url.split('?').next().unwrap_or(review_url), "/")
        .to_string()
}

/// How many review pages to crawl, from the pagination links, the page-total
/// text, or a count-based estimate, in that order.
pub fn detect_page_count(first_page: &str) -> u32 {
    let from_links = PAGE_PARAM_RE
        .captures_iter(first_page)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max();
    if let Some(pages) = from_links {
        return pages.min(MAX_REVIEW_PAGES);
    }

    if let Some(caps) = PAGE_TOTAL_RE.captures(first_page) {
        let total = caps.get(1).or_else(|| caps.get(2));
        if let Some(pages) = total.and_then(|m| m.as_str().parse::<u32>().ok()) {
            return pages.min(MAX_REVIEW_PAGES);
        }
    }

    if let Some(caps) = REVIEW_COUNT_RE.captures(first_page) {
        if let Ok(count) = caps[1].parse::<u32>() {
            return count.div_ceil(REVIEWS_PER_PAGE).max(1).min(MAX_REVIEW_PAGES);
        }
    }

    1
}

/// Splits the review texts on one page into praise and complaints by
/// negative-keyword matching.
pub fn classify_reviews(page_text: &str, pages: &mut ReviewPages) -> usize {
    let mut found = 0;
    for caps in REVIEW_TEXT_RE.captures_iter(page_text) {
        let text: String = caps[1].trim().replace('\n', " ").chars().take(200).collect();
        if text.chars().count() <= 15 || text.starts_with('<') {
            continue;
        }

        if NEGATIVE_WORDS.iter().any(|w| text.contains(w)) {
            pages.cons.push(text);
        } else {
            pages.pros.push(text);
        }
        found += 1;
    }
    found
}

/// Crawls the review pages and buckets every review into pros/cons.
pub async fn collect_reviews(client: &MallClient, review_url: &str) -> ReviewPages {
    let mut pages = ReviewPages::default();
    if !review_url.contains("http") {
        return pages;
    }

    let base_url = review_base_url(review_url);
    let first = match client.fetch(&base_url).await {
        Ok(response) if response.is_ok() => response,
        _ => {
            warn!("Review page fetch failed for {base_url}");
            return pages;
        }
    };
    let total_pages = detect_page_count(&first.text);
    debug!("Crawling {total_pages} review pages");

    for page in 1..=total_pages {
        let page_text = if page == 1 {
            first.text.clone()
        } else {
            let url = format!("{base_url}?p={page}");
            match client.fetch(&url).await {
                Ok(response) if response.is_ok() => response.text,
                _ => break,
            }
        };

        if classify_reviews(&page_text, &mut pages) == 0 {
            break;
        }
        sleep(std::time::Duration::from_millis(300)).await;
    }

    debug!(
        "Collected {} positive / {} negative reviews",
        pages.pros.len(),
        pages.cons.len()
    );
    pages
}

fn valid_dates(text: &str) -> Vec<String> {
    let current_year = Utc::now().year();
    let mut dates: Vec<String> = ORDER_DATE_RE
        .captures_iter(text)
        .chain(ORDER_DATE_TEXT_RE.captures_iter(text))
        .filter_map(|caps| {
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            let day: u32 = caps[3].parse().ok()?;
            if (2010..=current_year).contains(&year) && (1..=12).contains(&month) && (1..=31).contains(&day)
            {
                Some(format!("{year}-{month:02}-{day:02}"))
            } else {
                None
            }
        })
        .collect();
    dates.sort();
    dates
}

/// Earliest order date across the review history, used as the listing's
/// launch date. Walks to the last order page and probes backwards when it
/// turns out empty.
pub async fn earliest_review_date(client: &MallClient, review_url: &str) -> Option<String> {
    let base_url = review_base_url(review_url);
    let first = client.fetch(&base_url).await.ok()?;
    if !first.is_ok() {
        return None;
    }

    let mut text = first.text.replace("\\u002F", "/");

    if let Some(caps) = ORDER_TOTAL_RE.captures(&text) {
        let total: u32 = caps[1].parse().ok()?;
        let last_page = total.div_ceil(ORDERS_PER_PAGE).max(1);
        debug!("{total} reviews, trying order page {last_page}");

        let mut page = last_page;
        loop {
            let url = format!("{base_url}?p={page}");
            if let Ok(response) = client.fetch(&url).await {
                let decoded = response.text.replace("\\u002F", "/");
                if decoded.contains("\"orderDate\"") || page == 1 {
                    text = decoded;
                    break;
                }
            }
            if page == 1 {
                break;
            }
            page -= 1;
        }
    }

    valid_dates(&text).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_strips_sort_segment() {
        assert_eq!(
            review_base_url("https://review.rakuten.co.jp/item/1/306224_10008717/1.1/"),
            "https://review.rakuten.co.jp/item/1/306224_10008717/"
        );
    }

    #[test]
    fn page_count_prefers_pagination_links() {
        let html = r#"<a href="?p=2">2</a><a href="?p=7">7</a>"#;
        assert_eq!(detect_page_count(html), 7);
    }

    #[test]
    fn page_count_estimates_from_review_total() {
        assert_eq!(detect_page_count(r#"{"reviewCount":"95"}"#), 4);
        assert_eq!(detect_page_count(r#"{"reviewCount":"2000"}"#), MAX_REVIEW_PAGES);
    }

    #[test]
    fn page_count_defaults_to_one() {
        assert_eq!(detect_page_count("no pagination"), 1);
    }

    #[test]
    fn reviews_split_on_negative_keywords() {
        let page = concat!(
            r#">とても良い商品でしっかりしていて満足です</div></div><div class="expand-link"#,
            r#">届いた時点で棚板に傷がありました。残念です</div></div><div class="expand-link"#,
        );
        let mut pages = ReviewPages::default();
        assert_eq!(classify_reviews(page, &mut pages), 2);
        assert_eq!(pages.pros.len(), 1);
        assert_eq!(pages.cons.len(), 1);
    }

    #[test]
    fn earliest_date_comes_from_order_json() {
        let text = r#""orderDate":"2023/04/10" "orderDate":"2021/2/3" "orderDate":"2009/1/1""#;
        assert_eq!(valid_dates(text).first().map(String::as_str), Some("2021-02-03"));
    }
}
