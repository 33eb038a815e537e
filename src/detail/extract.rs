use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static TABLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("table tr").unwrap());
static CELL_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());
static DESC_LI_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".item_desc li").unwrap());
static CATCH_COPY_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".catch_copy").unwrap());
static DESC_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".item_desc").unwrap());
static DESC_ANY_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#".item_desc, [class*="description"]"#).unwrap());
static VIDEO_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("video").unwrap());
static RAKUTEN_PLAYER_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".rakutenVideoPlayer").unwrap());
static IFRAME_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("iframe").unwrap());
static OG_IMAGE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());
static MAIN_IMG_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#".rakutenLimitedId_ImageMain1-3 img, .image-main img, [class*="mainImage"] img, .item-image img"#,
    )
    .unwrap()
});
static DETAIL_IMG_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".item_desc img, .item-image img, [class*="itemImage"] img"#).unwrap()
});
static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

static JSON_RATING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""ratingValue"\s*:\s*"?(\d\.\d+)"?"#).unwrap());
static JSON_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""reviewCount"\s*:\s*"?(\d+)"?"#).unwrap());
static SCORE_WITH_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d\.\d{1,2})\s*[\(（]([0-9,]+)\s*件[\)）]").unwrap());
static TAGGED_SCORE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r">(\d\.\d{1,2})<").unwrap());
static COUNT_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(（]([0-9,]+)\s*件[\)）]").unwrap());
static IMAGE_JSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"image"\s*:\s*"(https://[^"]+\.(?:jpg|jpeg|png|webp))""#).unwrap()
});

/// Table parameters scraped off the detail page, shipping/payment rows
/// excluded. Falls back to colon-separated description bullets.
pub fn extract_specs(document: &Html) -> String {
    const SKIP_KEYS: [&str; 5] = ["配送", "支払", "送料", "カード", "あす楽"];

    let mut specs = Vec::new();
    for row in document.select(&TABLE_SEL) {
        let cells: Vec<String> = row
            .select(&CELL_SEL)
            .map(|c| c.text().collect::<String>().trim().to_string())
            .collect();
        if let [key, val] = cells.as_slice() {
            if key.chars().count() < 30
                && val.chars().count() < 200
                && !val.is_empty()
                && !SKIP_KEYS.iter().any(|s| key.contains(s))
            {
                specs.push(format!("【{key}】: {val}"));
            }
        }
    }

    if specs.is_empty() {
        for li in document.select(&DESC_LI_SEL) {
            let text = li.text().collect::<String>().trim().to_string();
            if text.contains(':') || text.contains('：') {
                specs.push(text);
            }
        }
    }

    if specs.is_empty() {
        return "未抓取到参数".to_string();
    }
    specs.truncate(20);
    specs.join("\n")
}

/// Catch copy plus the leading description bullets.
pub fn extract_selling_points(document: &Html) -> String {
    let mut points = Vec::new();

    if let Some(el) = document.select(&CATCH_COPY_SEL).next() {
        points.push(el.text().collect::<String>().trim().to_string());
    }
    for li in document.select(&DESC_LI_SEL).take(3) {
        points.push(li.text().collect::<String>().trim().to_string());
    }

    if points.is_empty() {
        if let Some(desc) = document.select(&DESC_SEL).next() {
            let text: String = desc.text().collect::<String>().trim().chars().take(100).collect();
            points.push(text);
        }
    }

    if points.is_empty() {
        return "无明显卖点".to_string();
    }
    points.join("\n")
}

pub fn extract_description(document: &Html) -> String {
    document
        .select(&DESC_ANY_SEL)
        .next()
        .map(|el| el.text().collect::<String>().trim().chars().take(500).collect())
        .unwrap_or_default()
}

pub fn extract_title(document: &Html) -> String {
    document
        .select(&TITLE_SEL)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Whether the page embeds product video in any of the known forms.
pub fn has_video(document: &Html, raw_html: &str) -> bool {
    if document.select(&VIDEO_SEL).next().is_some()
        || document.select(&RAKUTEN_PLAYER_SEL).next().is_some()
        || raw_html.contains("rakuten.co.jp/rms/mall/image/video")
    {
        return true;
    }

    document.select(&IFRAME_SEL).any(|iframe| {
        let src = iframe.value().attr("src").unwrap_or_default();
        src.contains("youtube") || src.contains("vimeo")
    })
}

/// Review score and count as the detail page states them, tried in order:
/// JSON-LD fields, the `4.63(1,526件)` text form, then separate matches.
pub fn extract_rating(raw_html: &str) -> Option<(String, u32)> {
    if let (Some(score), Some(count)) = (
        JSON_RATING_RE.captures(raw_html),
        JSON_COUNT_RE.captures(raw_html),
    ) {
        if let Ok(count) = count[1].parse() {
            return Some((score[1].to_string(), count));
        }
    }

    if let Some(caps) = SCORE_WITH_COUNT_RE.captures(raw_html) {
        if let Ok(count) = caps[2].replace(',', "").parse() {
            return Some((caps[1].to_string(), count));
        }
    }

    if let (Some(score), Some(count)) = (
        TAGGED_SCORE_RE.captures(raw_html),
        COUNT_ONLY_RE.captures(raw_html),
    ) {
        let value: f64 = score[1].parse().ok()?;
        if (1.0..=5.0).contains(&value) {
            if let Ok(count) = count[1].replace(',', "").parse() {
                return Some((score[1].to_string(), count));
            }
        }
    }

    None
}

/// High-resolution main image: og:image first, the known main-image
/// selectors next, a JSON image field as the last resort.
pub fn extract_main_image(document: &Html, raw_html: &str) -> String {
    if let Some(meta) = document.select(&OG_IMAGE_SEL).next() {
        if let Some(content) = meta.value().attr("content") {
            if !content.is_empty() {
                return content.to_string();
            }
        }
    }

    for img in document.select(&MAIN_IMG_SEL) {
        if let Some(src) = img.value().attr("src") {
            if !src.is_empty() {
                return src.to_string();
            }
        }
    }

    IMAGE_JSON_RE
        .captures(raw_html)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

/// Product-description images worth feeding to the vision model. Ad, banner
/// and seasonal-campaign assets are filtered out aggressively and only
/// images hosted for this shop are kept.
pub fn extract_detail_images(document: &Html, main_image: &str, shop_id: &str) -> Vec<String> {
    const SKIP_WORDS: [&str; 20] = [
        "icon", "logo", "banner", "campaign", "sale", "point", "review", "cart", "btn", "button",
        "arrow", "star", "rank", "pr_", "ad_", "season", "event", "special", "coupon", "guide",
    ];
    const FORMATS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

    let mut images = Vec::new();
    if main_image.starts_with("http") {
        images.push(main_image.to_string());
    }

    for img in document.select(&DETAIL_IMG_SEL).take(8) {
        let src = img
            .value()
            .attr("src")
            .or_else(|| img.value().attr("data-src"))
            .unwrap_or_default();
        let lower = src.to_lowercase();

        if !src.starts_with("http") || !FORMATS.iter().any(|f| lower.contains(f)) {
            continue;
        }
        if SKIP_WORDS.iter().any(|w| lower.contains(w)) {
            continue;
        }
        let hosted = lower.contains("image.rakuten")
            || lower.contains("shop.r10s")
            || lower.contains("thumbnail");
        if hosted && lower.contains(&shop_id.to_lowercase()) && !images.contains(&src.to_string()) {
            images.push(src.to_string());
        }
    }

    images.truncate(5);
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specs_keep_short_rows_and_skip_shipping() {
        let html = r#"<table>
            <tr><th>サイズ</th><td>幅54×奥行35cm</td></tr>
            <tr><th>配送について</th><td>宅配便でお届けします</td></tr>
            <tr><th>素材</th><td>スチール</td></tr>
            <tr><td>one-cell row</td></tr>
        </table>"#;
        let specs = extract_specs(&Html::parse_document(html));

        assert_eq!(specs, "【サイズ】: 幅54×奥行35cm\n【素材】: スチール");
    }

    #[test]
    fn specs_fall_back_to_description_bullets() {
        let html = r#"<div class="item_desc"><ul>
            <li>容量: 500ml</li><li>ただのテキスト</li>
        </ul></div>"#;
        assert_eq!(extract_specs(&Html::parse_document(html)), "容量: 500ml");
    }

    #[test]
    fn missing_specs_use_placeholder() {
        assert_eq!(extract_specs(&Html::parse_document("<p>x</p>")), "未抓取到参数");
    }

    #[test]
    fn selling_points_combine_catch_copy_and_bullets() {
        let html = r#"<p class="catch_copy">送料無料！</p>
            <div class="item_desc"><ul><li>強炭酸</li><li>飲みきりサイズ</li></ul></div>"#;
        let points = extract_selling_points(&Html::parse_document(html));
        assert_eq!(points, "送料無料！\n強炭酸\n飲みきりサイズ");
    }

    #[test]
    fn video_detection_covers_iframes() {
        let html = r#"<iframe src="https://www.youtube.com/embed/abc"></iframe>"#;
        assert!(has_video(&Html::parse_document(html), html));
        assert!(!has_video(&Html::parse_document("<p>no</p>"), "<p>no</p>"));
    }

    #[test]
    fn rating_prefers_json_fields() {
        let raw = r#"{"ratingValue":"4.63","reviewCount":1526} 3.10(5件)"#;
        assert_eq!(extract_rating(raw), Some(("4.63".to_string(), 1526)));
    }

    #[test]
    fn rating_reads_text_form() {
        assert_eq!(
            extract_rating("評価 4.52（1,169件）"),
            Some(("4.52".to_string(), 1169))
        );
    }

    #[test]
    fn main_image_prefers_og_meta() {
        let html = r#"<meta property="og:image" content="https://img.example/main.jpg">"#;
        let image = extract_main_image(&Html::parse_document(html), html);
        assert_eq!(image, "https://img.example/main.jpg");
    }

    #[test]
    fn detail_images_filter_ads_and_foreign_shops() {
        let html = r#"<div class="item_desc">
            <img src="https://image.rakuten.co.jp/myshop/product1.jpg">
            <img src="https://image.rakuten.co.jp/myshop/banner_sale.jpg">
            <img src="https://image.rakuten.co.jp/othershop/product2.jpg">
        </div>"#;
        let images = extract_detail_images(
            &Html::parse_document(html),
            "https://img.example/main.jpg",
            "myshop",
        );

        assert_eq!(
            images,
            vec![
                "https://img.example/main.jpg".to_string(),
                "https://image.rakuten.co.jp/myshop/product1.jpg".to_string(),
            ]
        );
    }
}
