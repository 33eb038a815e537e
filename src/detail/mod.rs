use crate::clients::ai::AiClient;
use crate::clients::http::MallClient;
use crate::config::RankingConfig;
use crate::ranking::{discover_categories, rank_in_categories, ItemRef, RankResult};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub(crate) mod extract;
pub(crate) mod features;
pub(crate) mod link;
pub(crate) mod reviews;

static REVIEW_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="(https://review\.rakuten\.co\.jp/item/1/[^"]+)""#).unwrap());

/// Everything the deep scrape adds on top of the listing row.
#[derive(Debug)]
pub struct ProductDetails {
    pub launch_date: String,
    pub specs: String,
    pub selling_points: String,
    pub review_pros: String,
    pub complaints: String,
    pub has_video: bool,
    pub ranks: RankResult,
    pub main_image: String,
    pub features: Vec<String>,
    pub note: String,
    /// Review count/score read off the detail page, used to backfill
    /// listings where the search page showed none.
    pub review_count: Option<u32>,
    pub review_score: Option<String>,
}

impl Default for ProductDetails {
    fn default() -> Self {
        Self {
            launch_date: "...".to_string(),
            specs: "...".to_string(),
            selling_points: "...".to_string(),
            review_pros: "...".to_string(),
            complaints: "...".to_string(),
            has_video: false,
            ranks: RankResult::default(),
            main_image: String::new(),
            features: Vec::new(),
            note: String::new(),
            review_count: None,
            review_score: None,
        }
    }
}

/// Deep-scrape context shared across one batch run.
pub struct DetailScraper {
    pub mall: MallClient,
    pub ai: AiClient,
    pub ranking: RankingConfig,
}

impl DetailScraper {
    /// Resolves the listing link down to a `(shop_id, item_id)` pair, trying
    /// the redirect chase, product aggregation pages, and the review-page
    /// backup in that order.
    async fn resolve_target(
        &self,
        url: &str,
        review_backup: Option<&str>,
    ) -> Option<(String, String)> {
        let real_url = link::resolve_promo_link(&self.mall, url).await;
        debug!("Resolved listing URL: {real_url}");

        if let Some(target) = link::parse_item_url(&real_url) {
            return Some(target);
        }

        if link::is_product_page(&real_url) {
            debug!("Product aggregation page, looking for an item link inside");
            if let Ok(response) = self.mall.fetch(&real_url).await {
                if let Some(target) = link::find_item_link(&response.text) {
                    return Some(target);
                }
            }
        }

        if let Some(review_url) = review_backup {
            debug!("Falling back to the review page for the item link");
            if let Ok(response) = self.mall.fetch(review_url).await {
                if let Some(target) = link::find_item_link(&response.text) {
                    return Some(target);
                }
            }
        }

        None
    }

    /// Full deep scrape for one listed product. Never fails: every sub-step
    /// degrades to its placeholder independently.
    pub async fn scrape(
        &self,
        url: &str,
        review_backup: Option<&str>,
        listed_review_count: u32,
    ) -> ProductDetails {
        let mut details = ProductDetails::default();

        let Some((shop_id, item_id)) = self.resolve_target(url, review_backup).await else {
            details.launch_date = "URL解析失败".to_string();
            details.note = format!("无法解析URL: {}", url.chars().take(50).collect::<String>());
            return details;
        };

        let item_page_url = format!("https://item.rakuten.co.jp/{shop_id}/{item_id}/");
        info!("Deep scraping {item_page_url}");

        let response = match self.mall.fetch(&item_page_url).await {
            Ok(response) if response.is_ok() => response,
            _ => {
                warn!("Item page fetch failed for {item_page_url}");
                details.note = "商品页获取失败".to_string();
                return details;
            }
        };
        let raw_html = response.text;

        let title;
        let description;
        let raw_selling_points;
        let detail_images;
        let categories;
        {
            let document = Html::parse_document(&raw_html);

            details.specs = extract::extract_specs(&document);
            details.has_video = extract::has_video(&document, &raw_html);
            details.main_image = extract::extract_main_image(&document, &raw_html);
            if let Some((score, count)) = extract::extract_rating(&raw_html) {
                details.review_score = Some(score);
                details.review_count = Some(count);
            }

            title = extract::extract_title(&document);
            description = extract::extract_description(&document);
            raw_selling_points = extract::extract_selling_points(&document);
            detail_images =
                extract::extract_detail_images(&document, &details.main_image, &shop_id);
            categories = discover_categories(&document, &raw_html);
        }

        details.selling_points = self
            .ai
            .analyze_selling_points(&raw_selling_points, &title)
            .await;

        let full_description = format!("{description}\n{}", details.selling_points);
        details.features = features::extract_features(
            &self.ai,
            &self.mall,
            &title,
            &full_description,
            &details.specs,
            &detail_images,
        )
        .await;

        // Leaderboard back-query across every discovered category.
        let target = ItemRef::new(&shop_id, &item_id);
        info!(
            "Querying leaderboards for {}/{} ({} categories)",
            shop_id,
            item_id,
            categories.len()
        );
        details.ranks = rank_in_categories(&self.mall, &target, &categories, &self.ranking).await;

        let review_count = match details.review_count {
            Some(supplement) if listed_review_count == 0 => supplement,
            _ => listed_review_count,
        };

        if review_count == 0 {
            details.launch_date = "暂无评论(新品)".to_string();
            details.review_pros = "无评论".to_string();
            details.complaints = "无评论".to_string();
            return details;
        }

        let Some(review_url) = REVIEW_LINK_RE
            .captures(&raw_html)
            .map(|caps| caps[1].to_string())
        else {
            details.launch_date = "无评论链接".to_string();
            return details;
        };

        let pages = reviews::collect_reviews(&self.mall, &review_url).await;
        let summary = self.ai.summarize_reviews(&pages.pros, &pages.cons).await;
        details.review_pros = summary.pros;
        details.complaints = summary.complaints;

        sleep(std::time::Duration::from_millis(500)).await;

        details.launch_date = match reviews::earliest_review_date(&self.mall, &review_url).await {
            Some(date) => date,
            None => "日期提取失败".to_string(),
        };

        details
    }
}
