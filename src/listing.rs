use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

/// One product as seen on a search-results page, before the deep scrape.
#[derive(Debug, Clone)]
pub struct ListedProduct {
    pub shop: String,
    pub title: String,
    pub url: String,
    /// Review-page link kept as a backup route for resolving redirect links.
    pub review_url: Option<String>,
    pub image: String,
    pub saturation: String,
    pub review_count: u32,
    pub review_score: String,
    pub price: u64,
    pub is_ad: bool,
}

static ITEM_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".searchresultitem").unwrap());
static ITEM_FALLBACK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[data-track-item]").unwrap());
static REVIEW_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="review.rakuten.co.jp"]"#).unwrap());
static ITEM_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="item.rakuten.co.jp"]"#).unwrap());
static TITLE_LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".title a, h2 a").unwrap());
static MERCHANT_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".merchant a").unwrap());
static IMG_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static PR_MARKER_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".marker-pr").unwrap());
static COUNT_EL_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#".search-count, [class*="count"]"#).unwrap());
static PRICE_EL_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[class*="price"]"#).unwrap());

static PRICE_YEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)円").unwrap());
static PRICE_SYM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[¥￥](\d+)").unwrap());
static PRICE_BARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{3,})").unwrap());
static SCORE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[★☆評価]\s*(\d\.\d{1,2})").unwrap());
static SCORE_BEFORE_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d\.\d{1,2})\s*[\(（]\d+[件\)）]").unwrap());
static COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(（](\d{1,6})件?[\)）]").unwrap());
static TOTAL_PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(（]([\d,]+)件[\)）]").unwrap());
static TOTAL_BARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d,]{5,})件").unwrap());
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d,]+)").unwrap());
static IMG_PARAMS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?.*$").unwrap());

/// Extracts the price in yen from free text: `1980円`, `¥1980`, or the first
/// bare run of 3+ digits. Zero when nothing matches.
pub fn extract_price(text: &str) -> u64 {
    let text: String = text.chars().filter(|c| *c != ',' && *c != ' ').collect();

    for re in [&*PRICE_YEN_RE, &*PRICE_SYM_RE, &*PRICE_BARE_RE] {
        if let Some(caps) = re.captures(&text) {
            if let Ok(price) = caps[1].parse() {
                return price;
            }
        }
    }
    0
}

/// Total result count shown on the search page ("market saturation").
pub fn extract_total_count(document: &Html, page_text: &str) -> String {
    if let Some(caps) = TOTAL_PAREN_RE.captures(page_text) {
        if caps[1].replace(',', "").len() >= 3 {
            return caps[1].to_string();
        }
    }
    if let Some(caps) = TOTAL_BARE_RE.captures(page_text) {
        return caps[1].to_string();
    }
    if let Some(el) = document.select(&COUNT_EL_SEL).next() {
        let text = el.text().collect::<String>();
        if let Some(caps) = NUMBER_RE.captures(&text) {
            if caps[1].replace(',', "").len() >= 3 {
                return caps[1].to_string();
            }
        }
    }
    "未知".to_string()
}

fn extract_link(item: &ElementRef<'_>) -> (String, String, Option<String>) {
    let mut link = String::new();
    let mut title = String::new();

    let review_url = item
        .select(&REVIEW_LINK_SEL)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains("review.rakuten.co.jp/item/"))
        .map(str::to_string);

    // Direct item link is the happy path.
    for a in item.select(&ITEM_LINK_SEL) {
        if let Some(href) = a.value().attr("href") {
            link = href.to_string();
            title = a.text().collect::<String>().trim().to_string();
            break;
        }
    }

    // Title anchors may only carry a redirect link; keep it anyway.
    if link.is_empty() {
        if let Some(a) = item.select(&TITLE_LINK_SEL).next() {
            link = a.value().attr("href").unwrap_or_default().to_string();
            title = a.text().collect::<String>().trim().to_string();
        }
    }

    // Last resort: rebuild the canonical URL from the tracking attribute,
    // formatted "shop:itemid".
    if link.is_empty() || link.contains("redirect") {
        let attr = item
            .value()
            .attr("data-track-ratid")
            .or_else(|| item.value().attr("data-item-id"))
            .unwrap_or_default();
        let parts: Vec<&str> = attr.split(':').collect();
        if parts.len() >= 2 {
            link = format!("https://item.rakuten.co.jp/{}/{}/", parts[0], parts[1]);
            debug!("Rebuilt item link from tracking attribute: {link}");
        }
    }

    (link, title, review_url)
}

fn extract_image(item: &ElementRef<'_>) -> String {
    const SKIP: [&str; 7] = [".svg", "/assets/", "/resources/", "logo", "icon", "badge", "39shop"];
    const FORMATS: [&str; 5] = [".jpg", ".jpeg", ".png", ".webp", ".gif"];

    for img in item.select(&IMG_SEL) {
        let src = img
            .value()
            .attr("src")
            .or_else(|| img.value().attr("data-src"))
            .or_else(|| img.value().attr("data-lazy"))
            .unwrap_or_default();
        let lower = src.to_lowercase();

        if src.is_empty() || SKIP.iter().any(|s| lower.contains(s)) {
            continue;
        }
        if FORMATS.iter().any(|f| lower.contains(f)) {
            return IMG_PARAMS_RE
                .replace(src, "")
                .replace("_ex=80x80", "")
                .replace("_ex=128x128", "");
        }
    }
    String::new()
}

/// Parses one search-results page into listed products. Ad (PR) placements
/// and natural results are counted separately for the saturation column.
pub fn parse_list_page(html: &str, limit: Option<usize>) -> Vec<ListedProduct> {
    let document = Html::parse_document(html);
    let page_text: String = document.root_element().text().collect();
    let total = extract_total_count(&document, &page_text);
    info!("Search result total: {total}件");

    let mut items: Vec<ElementRef<'_>> = document.select(&ITEM_SEL).collect();
    if items.is_empty() {
        items = document.select(&ITEM_FALLBACK_SEL).collect();
    }
    if let Some(limit) = limit {
        items.truncate(limit);
    }

    let mut products = Vec::new();
    let mut ad_rank = 0u32;
    let mut nat_rank = 0u32;

    for item in items {
        let full_text = item.text().collect::<String>();
        let full_text = full_text.split_whitespace().collect::<Vec<_>>().join(" ");

        let (link, title, review_url) = extract_link(&item);
        if link.is_empty() {
            continue;
        }

        let shop = item
            .select(&MERCHANT_SEL)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_else(|| "N/A".to_string());

        let mut price = extract_price(&full_text);
        if price == 0 {
            if let Some(el) = item.select(&PRICE_EL_SEL).next() {
                price = extract_price(&el.text().collect::<String>());
            }
        }

        let mut review_score = "0.0".to_string();
        if let Some(caps) = SCORE_RE
            .captures(&full_text)
            .or_else(|| SCORE_BEFORE_COUNT_RE.captures(&full_text))
        {
            if let Ok(score) = caps[1].parse::<f64>() {
                if (1.0..=5.0).contains(&score) {
                    review_score = caps[1].to_string();
                }
            }
        }
        let review_count = COUNT_RE
            .captures(&full_text)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0);

        let is_ad = title.contains("[PR]")
            || item.select(&PR_MARKER_SEL).next().is_some()
            || link.contains("r.rakuten.co.jp");
        if is_ad {
            ad_rank += 1;
        } else {
            nat_rank += 1;
        }
        let saturation = format!(
            "商品数{total}件中, {}{}位",
            if is_ad { "PR" } else { "自然" },
            if is_ad { ad_rank } else { nat_rank }
        );

        products.push(ListedProduct {
            shop,
            title,
            url: link,
            review_url,
            image: extract_image(&item),
            saturation,
            review_count,
            review_score,
            price,
            is_ad,
        });
    }

    products
}
