use crate::clients::ai::AiClient;
use crate::clients::http::MallClient;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

const MAX_FEATURES: usize = 9;

// Japanese keyword patterns mapped to the Chinese feature labels used in the
// report. Order matters: earlier rows are the more telling features.
static FEATURE_KEYWORDS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("オープン|開放|見せる収納", "开放式收纳"),
        ("扉付き|引き出し|隠す収納", "封闭式收纳"),
        ("スチール|鉄|金属|メタル", "钢铁材质"),
        ("木製|ウッド|天然木", "木质材质"),
        ("プラスチック|樹脂", "塑料材质"),
        ("ステンレス", "不锈钢材质"),
        ("防錆|サビ防止|錆びにくい|粉体塗装", "防锈涂层"),
        ("防水|耐水", "防水处理"),
        ("頑丈|丈夫|耐荷重|強い|堅牢", "坚固耐用"),
        ("軽量|軽い", "轻便"),
        ("キャスター|車輪|移動", "带轮可移动"),
        ("高さ調節|調整可能|可動", "高度可调"),
        ("メッシュ|網|通気|通風", "网状透气"),
        ("簡単組立|工具不要|ワンタッチ", "组装简单"),
        ("組み立て式", "需简单组装"),
        ("おしゃれ|スタイリッシュ|モダン", "外观时尚"),
        ("省スペース|スリム|コンパクト", "节省空间"),
        ("キッチン|台所", "适合厨房"),
        ("洗面所|浴室|バス", "适合浴室"),
        ("大容量|たっぷり収納", "大容量"),
        ("多機能|多用途", "多功能"),
        ("伸縮|拡張", "可伸缩"),
        (r"\d+段|\d+層", "多层设计"),
        ("日本製|国産", "日本制造"),
        ("業務用|プロ", "专业级"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).unwrap(), label))
    .collect()
});

static SIZE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(幅|奥行|高さ)[^\d]*\d+").unwrap());
static COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("(ブラック|ホワイト|シルバー|ブラウン|ナチュラル|黒|白|銀)").unwrap()
});

/// Keyword-matching fallback for product features, used whenever the AI
/// path is disabled or comes back empty.
pub fn keyword_features(title: &str, description: &str, specs: &str) -> Vec<String> {
    let all_text = format!("{title} {description} {specs}").to_lowercase();
    let mut features = Vec::new();

    for (re, label) in FEATURE_KEYWORDS.iter() {
        if re.is_match(&all_text) && !features.iter().any(|f| f == label) {
            features.push(label.to_string());
        }
    }

    // Pad thin results with what the parameters still give away.
    if features.len() < 5 {
        if SIZE_RE.is_match(&all_text) {
            features.push("尺寸规格明确".to_string());
        }
        let colors: std::collections::HashSet<&str> = COLOR_RE
            .find_iter(&all_text)
            .map(|m| m.as_str())
            .collect();
        if colors.len() > 1 {
            features.push("多色可选".to_string());
        } else if colors.len() == 1 {
            features.push("颜色简约".to_string());
        }
    }

    features.truncate(MAX_FEATURES);
    features
}

/// Nine product features, AI-first (text plus product images) with the
/// keyword matcher as backstop.
pub async fn extract_features(
    ai: &AiClient,
    mall: &MallClient,
    title: &str,
    description: &str,
    specs: &str,
    image_urls: &[String],
) -> Vec<String> {
    if ai.enabled() {
        let features = ai
            .extract_features(mall, title, description, specs, image_urls)
            .await;
        if !features.is_empty() {
            info!("AI extracted {} features", features.len());
            return features;
        }
    }

    keyword_features(title, description, specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_map_to_labels_without_duplicates() {
        let features = keyword_features(
            "スチールラック 5段",
            "キャスター付きで移動できる頑丈なスチール製",
            "【素材】: スチール",
        );

        assert!(features.contains(&"钢铁材质".to_string()));
        assert!(features.contains(&"坚固耐用".to_string()));
        assert!(features.contains(&"带轮可移动".to_string()));
        assert!(features.contains(&"多层设计".to_string()));
        assert_eq!(
            features.iter().filter(|f| *f == "钢铁材质").count(),
            1,
            "labels must be unique"
        );
    }

    #[test]
    fn thin_matches_get_padded_from_specs() {
        let features = keyword_features("商品", "", "幅54×高さ120cm ブラック");
        assert!(features.contains(&"尺寸规格明确".to_string()));
        assert!(features.contains(&"颜色简约".to_string()));
    }

    #[test]
    fn feature_count_is_capped_at_nine() {
        let text = "オープン 扉付き スチール 木製 樹脂 ステンレス 防錆 防水 頑丈 軽量 キャスター 高さ調節 メッシュ 工具不要";
        assert!(keyword_features(text, text, text).len() <= 9);
    }
}
