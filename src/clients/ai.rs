use crate::clients::http::MallClient;
use crate::config::AiConfig;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{info, warn};

const MAX_FEATURES: usize = 9;
const MAX_FEATURE_LEN: usize = 15;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Summarized review signal: recurring praise and concrete complaints.
#[derive(Debug, Clone)]
pub struct ReviewSummary {
    pub pros: String,
    pub complaints: String,
}

/// OpenAI-compatible chat-completions client used for feature extraction and
/// review/selling-point summaries. Every call is best-effort: a missing key
/// disables it and any failure yields the documented fallback.
#[derive(Debug, Clone)]
pub struct AiClient {
    client: Client,
    config: AiConfig,
}

impl AiClient {
    pub fn new(client: Client, config: AiConfig) -> Self {
        if config.enabled() {
            info!("AI feature extraction enabled (model {})", config.model);
        } else {
            info!("No AI API key, falling back to keyword matching");
        }
        Self { client, config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled()
    }

    async fn chat(&self, system: &str, user_content: Value, max_tokens: u32) -> Option<String> {
        if !self.enabled() {
            return None;
        }

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "temperature": 0,
            "max_tokens": max_tokens,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user_content},
            ],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            warn!("AI call returned HTTP {}", response.status());
            return None;
        }

        let parsed: ChatResponse = response.json().await.ok()?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
    }

    /// Extracts up to nine short product features from listing text, plus up
    /// to two product images analyzed visually. Empty on failure.
    pub async fn extract_features(
        &self,
        mall: &MallClient,
        title: &str,
        description: &str,
        specs: &str,
        image_urls: &[String],
    ) -> Vec<String> {
        let mut features = Vec::new();

        for url in image_urls.iter().take(2) {
            let Ok(bytes) = mall.fetch_bytes(url).await else {
                continue;
            };
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            let content = json!([
                {"type": "text", "text": "请从这张商品图片中提取产品特征，如材质、颜色、结构、功能等。只输出特征词，用逗号分隔。"},
                {"type": "image_url", "image_url": {"url": format!("data:image/jpeg;base64,{encoded}")}},
            ]);

            if let Some(result) = self
                .chat(
                    "你是产品特征识别助手。请识别图片中展示的产品特征，用简短中文描述（2-6字），逗号分隔。",
                    content,
                    200,
                )
                .await
            {
                merge_features(&mut features, &result);
            }
            sleep(std::time::Duration::from_millis(500)).await;
        }

        let title: String = title.chars().take(200).collect();
        let description: String = description.chars().take(500).collect();
        let specs: String = specs.chars().take(400).collect();
        let prompt = format!(
            "请从以下日本乐天商品信息中提取最多9个核心产品卖点特征。\n\n\
             要求：\n\
             1. 每个特征用简短中文描述（2-8个字）\n\
             2. 提取产品的核心卖点，如：材质、功能、设计、适用场景等\n\n\
             商品标题：{title}\n商品描述：{description}\n商品参数：{specs}\n\n\
             请直接返回9个特征，用逗号分隔，不要其他解释。"
        );

        if let Some(result) = self
            .chat(
                "你是一个产品特征提取助手，只输出简短的中文特征词，用逗号分隔。",
                json!(prompt),
                200,
            )
            .await
        {
            merge_features(&mut features, &result);
        }

        features.truncate(MAX_FEATURES);
        features
    }

    /// Condenses the raw Japanese selling points into a short Chinese
    /// summary. Returns the raw text unchanged on failure.
    pub async fn analyze_selling_points(&self, raw_points: &str, title: &str) -> String {
        if raw_points.is_empty() {
            return raw_points.to_string();
        }

        let title: String = title.chars().take(100).collect();
        let points: String = raw_points.chars().take(800).collect();
        let prompt = format!(
            "请分析以下日本乐天商品的核心卖点，用简洁的中文总结出3-5个核心卖点。\n\n\
             商品标题：{title}\n原始卖点描述：\n{points}\n\n\
             每个卖点用简短中文描述（10-20字），用换行分隔，直接输出卖点列表。"
        );

        match self
            .chat(
                "你是产品卖点分析师，擅长从日文商品描述中提取核心卖点并翻译成简洁中文。",
                json!(prompt),
                300,
            )
            .await
        {
            Some(result) if !result.is_empty() => result,
            _ => raw_points.to_string(),
        }
    }

    /// Boils review texts down to recurring pros and concrete complaints.
    /// Falls back to truncated raw reviews without AI.
    pub async fn summarize_reviews(&self, pros: &[String], cons: &[String]) -> ReviewSummary {
        let fallback = fallback_summary(pros, cons);
        if !self.enabled() || (pros.is_empty() && cons.is_empty()) {
            return fallback;
        }

        // Sample the pros evenly, complaints are few enough to use whole.
        let sampled: Vec<&String> = if pros.len() > 30 {
            pros.iter().step_by(pros.len() / 30).take(30).collect()
        } else {
            pros.iter().collect()
        };
        let pros_text: String = sampled
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .chars()
            .take(3000)
            .collect();
        let cons_text: String = cons
            .iter()
            .take(15)
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .chars()
            .take(1500)
            .collect();

        let prompt = format!(
            "请分析以下日本乐天商品的用户评论。\n\n\
             【好评内容】（共{}条）:\n{pros_text}\n\n\
             【差评/客诉】（{}条）:\n{cons_text}\n\n\
             请按以下格式输出（必须用中文）：\n\n\
             评论出现优点：[3-5个具体优点，用空格分隔，避免泛泛的词]\n\n\
             客诉点：[1-3个具体问题，没有差评写\"无明显差评\"]",
            pros.len(),
            cons.len()
        );

        let Some(result) = self
            .chat(
                "你是评论分析师，擅长从日文评论中提炼关键信息，输出简洁中文。",
                json!(prompt),
                200,
            )
            .await
        else {
            return fallback;
        };

        parse_review_summary(&result).unwrap_or(fallback)
    }
}

fn merge_features(features: &mut Vec<String>, raw: &str) {
    for feature in raw.split(['，', ',']) {
        let feature = feature.trim();
        if !feature.is_empty()
            && feature.chars().count() <= MAX_FEATURE_LEN
            && !features.iter().any(|f| f == feature)
        {
            features.push(feature.to_string());
        }
    }
}

static PROS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:评论出现)?优点[：:]\s*(.+?)(?:\n|客诉|$)").unwrap());
static CONS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)客诉点[：:]\s*(.+)$").unwrap());

fn parse_review_summary(result: &str) -> Option<ReviewSummary> {
    let pros = PROS_RE.captures(result)?;
    let complaints = CONS_RE
        .captures(result)
        .map(|caps| caps[1].trim().chars().take(100).collect())
        .unwrap_or_else(|| "无明显差评".to_string());

    Some(ReviewSummary {
        pros: pros[1].trim().chars().take(50).collect(),
        complaints,
    })
}

fn fallback_summary(pros: &[String], cons: &[String]) -> ReviewSummary {
    ReviewSummary {
        pros: pros
            .first()
            .map(|p| p.chars().take(50).collect())
            .unwrap_or_else(|| "暂无评论".to_string()),
        complaints: if cons.is_empty() {
            "无明显差评".to_string()
        } else {
            cons.iter()
                .take(3)
                .enumerate()
                .map(|(i, c)| format!("{}.{}", i + 1, c.chars().take(30).collect::<String>()))
                .collect::<Vec<_>>()
                .join("\n")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_features_dedups_and_splits_both_comma_kinds() {
        let mut features = vec!["防锈涂层".to_string()];
        merge_features(&mut features, "防锈涂层，大容量, 组装简单");
        assert_eq!(features, vec!["防锈涂层", "大容量", "组装简单"]);
    }

    #[test]
    fn review_summary_parses_labeled_sections() {
        let summary =
            parse_review_summary("评论出现优点：防锈好 承重强\n客诉点：1.螺丝生锈 2.说明书难懂")
                .unwrap();
        assert_eq!(summary.pros, "防锈好 承重强");
        assert!(summary.complaints.contains("螺丝生锈"));
    }

    #[test]
    fn fallback_summary_numbers_complaints() {
        let summary = fallback_summary(
            &["しっかりしている".to_string()],
            &["傷があった".to_string(), "梱包が雑".to_string()],
        );
        assert_eq!(summary.pros, "しっかりしている");
        assert_eq!(summary.complaints, "1.傷があった\n2.梱包が雑");
    }
}
