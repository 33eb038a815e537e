use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use tokio::time::sleep;
use tracing::debug;

const MAX_TRANSLATE_LEN: usize = 800;

static RANK_TEXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*第(\d+)$").unwrap());

/// Best-effort ja -> zh-CN translation over the public endpoint. Every
/// failure path returns the input unchanged.
#[derive(Debug, Clone)]
pub struct Translator {
    client: Client,
}

impl Translator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn translate(&self, text: &str) -> String {
        let text = text.trim();
        if text.chars().count() < 2 || text == "N/A" || text == "..." {
            return text.to_string();
        }
        let capped: String = text.chars().take(MAX_TRANSLATE_LEN).collect();

        // Courtesy delay, the endpoint rate-limits aggressively.
        sleep(std::time::Duration::from_millis(300)).await;

        match self.request(&capped).await {
            Some(translated) if !translated.is_empty() => translated,
            _ => {
                debug!("Translation fell back to source text");
                text.to_string()
            }
        }
    }

    /// Translates the category-name part of a `"<name> 第<rank>"` string,
    /// keeping the rank suffix intact.
    pub async fn translate_rank(&self, rank_text: &str) -> String {
        let Some(caps) = RANK_TEXT_RE.captures(rank_text) else {
            return rank_text.to_string();
        };

        let name = self.translate(&caps[1]).await;
        format!("{} 第{}", name, &caps[2])
    }

    async fn request(&self, text: &str) -> Option<String> {
        let response = self
            .client
            .get("https://translate.googleapis.com/translate_a/single")
            .query(&[
                ("client", "gtx"),
                ("sl", "ja"),
                ("tl", "zh-CN"),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        // Payload shape: [[["segment", "source", ...], ...], ...]
        let body: Value = response.json().await.ok()?;
        let segments = body.get(0)?.as_array()?;
        let translated: String = segments
            .iter()
            .filter_map(|seg| seg.get(0)?.as_str())
            .collect();

        (!translated.is_empty()).then_some(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_text_pattern_splits_name_and_rank() {
        let caps = RANK_TEXT_RE.captures("水・ソフトドリンク 第12").unwrap();
        assert_eq!(&caps[1], "水・ソフトドリンク");
        assert_eq!(&caps[2], "12");
    }

    #[test]
    fn rank_text_pattern_rejects_plain_text() {
        assert!(RANK_TEXT_RE.captures("no rank here").is_none());
    }
}
