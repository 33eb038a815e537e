use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// A category id spotted on a product detail page. The name is whatever text
/// came with the link; id-only sources leave it empty and the leaderboard
/// title fills it in later.
#[derive(Debug, Clone)]
pub struct CategoryCandidate {
    pub id: String,
    pub name: Option<String>,
}

static BREADCRUMB_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/category/"]"#).unwrap());
static GENRE_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/genre/"]"#).unwrap());
static RANKING_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="ranking.rakuten.co.jp"]"#).unwrap());

static CATEGORY_HREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/category/(\d+)/").unwrap());
static GENRE_HREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/genre/(\d+)").unwrap());
static RANKING_HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ranking\.rakuten\.co\.jp/\w+/(\d+)").unwrap());
static JSON_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["'](?:genre|category)_?[Ii]d["']\s*:\s*["']?(\d{5,})"#).unwrap());
static LOOSE_GENRE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"genre[Ii]d["'\s:=]+["']?(\d{5,})"#).unwrap());
static URL_PARAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[?&]genre_?id=(\d{5,})").unwrap());
static LINK_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"l-id=[^"'&]*?(\d{6})"#).unwrap());

/// Pulls category-id candidates out of a detail page. Several independent
/// extraction rules contribute; ids shorter than 5 digits are rejected and
/// the first occurrence of an id wins.
pub fn discover_categories(document: &Html, raw_html: &str) -> Vec<CategoryCandidate> {
    let mut categories: Vec<CategoryCandidate> = Vec::new();

    let mut add = |id: &str, name: Option<String>, categories: &mut Vec<CategoryCandidate>| {
        if id.len() >= 5 && !categories.iter().any(|c| c.id == id) {
            categories.push(CategoryCandidate {
                id: id.to_string(),
                name,
            });
        }
    };

    // Breadcrumb and genre links carry a usable display name.
    for (selector, href_re) in [
        (&*BREADCRUMB_SEL, &*CATEGORY_HREF_RE),
        (&*GENRE_LINK_SEL, &*GENRE_HREF_RE),
    ] {
        for el in document.select(selector) {
            let href = el.value().attr("href").unwrap_or_default();
            let name = el.text().collect::<String>().trim().to_string();
            if let Some(caps) = href_re.captures(href) {
                if name.chars().count() < 30 {
                    let name = (!name.is_empty()).then_some(name);
                    add(&caps[1], name, &mut categories);
                }
            }
        }
    }

    for el in document.select(&RANKING_LINK_SEL) {
        let href = el.value().attr("href").unwrap_or_default();
        if let Some(caps) = RANKING_HREF_RE.captures(href) {
            let name = el.text().collect::<String>().trim().to_string();
            add(&caps[1], (!name.is_empty()).then_some(name), &mut categories);
        }
    }

    // Id-only sources: inline JSON keys, loose genreId mentions, URL query
    // parameters and tracking link ids.
    for caps in JSON_ID_RE.captures_iter(raw_html).take(10) {
        add(&caps[1], None, &mut categories);
    }
    for caps in LOOSE_GENRE_RE.captures_iter(raw_html).take(10) {
        add(&caps[1], None, &mut categories);
    }
    for caps in URL_PARAM_RE.captures_iter(raw_html).take(5) {
        add(&caps[1], None, &mut categories);
    }
    for caps in LINK_ID_RE.captures_iter(raw_html).take(5) {
        add(&caps[1], None, &mut categories);
    }

    if categories.is_empty() {
        debug!("No category candidates on detail page");
    }

    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breadcrumb_and_genre_links_contribute_names() {
        let html = r#"
            <a href="https://www.rakuten.co.jp/category/566374/">スチールラック</a>
            <a href="https://search.rakuten.co.jp/genre/215566/">収納家具</a>
        "#;
        let document = Html::parse_document(html);
        let cats = discover_categories(&document, html);

        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].id, "566374");
        assert_eq!(cats[0].name.as_deref(), Some("スチールラック"));
        assert_eq!(cats[1].id, "215566");
    }

    #[test]
    fn json_and_url_sources_have_no_name() {
        let html = r#"<script>var x = {"genreId": "558944"};</script>
            <a href="https://example.com/?genre_id=112233">x</a>"#;
        let document = Html::parse_document(html);
        let cats = discover_categories(&document, html);

        assert!(cats.iter().any(|c| c.id == "558944" && c.name.is_none()));
        assert!(cats.iter().any(|c| c.id == "112233"));
    }

    #[test]
    fn short_ids_are_rejected_and_dups_keep_first_name() {
        let html = r#"
            <a href="/category/1234/">too short</a>
            <a href="/category/56789/">first</a>
            <a href="/genre/56789">second</a>
        "#;
        let document = Html::parse_document(html);
        let cats = discover_categories(&document, html);

        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].id, "56789");
        assert_eq!(cats[0].name.as_deref(), Some("first"));
    }

    #[test]
    fn ranking_links_are_recognized() {
        let html = r#"<a href="https://ranking.rakuten.co.jp/daily/215566/">デイリー</a>"#;
        let document = Html::parse_document(html);
        let cats = discover_categories(&document, html);

        assert_eq!(cats[0].id, "215566");
    }
}
