use crate::clients::translate::Translator;
use crate::detail::ProductDetails;
use crate::error::Result;
use crate::listing::ListedProduct;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One output row, column names matching the target spreadsheet. The last
/// block of columns is strategy notes filled in by hand downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRow {
    #[serde(rename = "品牌（店铺名）")]
    pub shop: String,
    #[serde(rename = "キーワード")]
    pub keyword: String,
    #[serde(rename = "キャッチコピー")]
    pub catch_copy: String,
    #[serde(rename = "url")]
    pub url: String,
    #[serde(rename = "主图")]
    pub main_image: String,

    #[serde(rename = "市场饱和度")]
    pub saturation: String,
    #[serde(rename = "小类排名")]
    pub minor_rank: String,
    #[serde(rename = "大类排名")]
    pub major_rank: String,
    #[serde(rename = "review数量")]
    pub review_count: u32,
    #[serde(rename = "review评分")]
    pub review_score: String,
    #[serde(rename = "价格（JPY)")]
    pub price: u64,
    #[serde(rename = "上线时长（月）")]
    pub launch_date: String,
    #[serde(rename = "预估月销")]
    pub est_monthly_sales: String,
    #[serde(rename = "月销售额")]
    pub monthly_revenue: String,

    #[serde(rename = "特征1")]
    pub feature1: String,
    #[serde(rename = "特征2")]
    pub feature2: String,
    #[serde(rename = "特征3")]
    pub feature3: String,
    #[serde(rename = "特征4")]
    pub feature4: String,
    #[serde(rename = "特征5")]
    pub feature5: String,
    #[serde(rename = "特征6")]
    pub feature6: String,
    #[serde(rename = "特征7")]
    pub feature7: String,
    #[serde(rename = "特征8")]
    pub feature8: String,
    #[serde(rename = "特征9")]
    pub feature9: String,

    #[serde(rename = "核心卖点分析")]
    pub selling_points: String,
    #[serde(rename = "评论出现优点")]
    pub review_pros: String,
    #[serde(rename = "客诉点")]
    pub complaints: String,
    #[serde(rename = "有无视频")]
    pub has_video: String,
    #[serde(rename = "备注")]
    pub note: String,

    #[serde(rename = "预估售价")]
    pub target_price: String,
    #[serde(rename = "供应商是否可以开发票")]
    pub supplier_invoice: String,
    #[serde(rename = "平均毛利率")]
    pub gross_margin: String,
    #[serde(rename = "促销频率")]
    pub promo_frequency: String,
    #[serde(rename = "可优化方向")]
    pub optimization: String,
    #[serde(rename = "优先级")]
    pub priority: String,
}

impl ProductRow {
    pub fn new(keyword: &str, listed: &ListedProduct, details: &ProductDetails) -> Self {
        // Detail-page rating backfills listings the search page showed bare.
        let review_count = match details.review_count {
            Some(supplement) if listed.review_count == 0 => supplement,
            _ => listed.review_count,
        };
        let review_score = match &details.review_score {
            Some(supplement) if listed.review_score == "0.0" => supplement.clone(),
            _ => listed.review_score.clone(),
        };
        let main_image = if listed.image.is_empty() {
            details.main_image.clone()
        } else {
            listed.image.clone()
        };

        let feature = |i: usize| details.features.get(i).cloned().unwrap_or_default();

        Self {
            shop: listed.shop.clone(),
            keyword: keyword.to_string(),
            catch_copy: listed.title.clone(),
            url: listed.url.clone(),
            main_image,
            saturation: listed.saturation.clone(),
            minor_rank: details.ranks.minor_rank.clone(),
            major_rank: details.ranks.major_rank.clone(),
            review_count,
            review_score,
            price: listed.price,
            launch_date: details.launch_date.clone(),
            est_monthly_sales: String::new(),
            monthly_revenue: String::new(),
            feature1: feature(0),
            feature2: feature(1),
            feature3: feature(2),
            feature4: feature(3),
            feature5: feature(4),
            feature6: feature(5),
            feature7: feature(6),
            feature8: feature(7),
            feature9: feature(8),
            selling_points: details.selling_points.clone(),
            review_pros: details.review_pros.clone(),
            complaints: details.complaints.clone(),
            has_video: if details.has_video { "有" } else { "无" }.to_string(),
            note: details.note.clone(),
            target_price: String::new(),
            supplier_invoice: String::new(),
            gross_margin: String::new(),
            promo_frequency: String::new(),
            optimization: String::new(),
            priority: String::new(),
        }
    }

    /// Chinese copy of the row: the text-bearing columns run through the
    /// translator, the rank columns keep their `第N` suffix intact.
    pub async fn translated(&self, translator: &Translator) -> Self {
        let mut row = self.clone();

        row.shop = translator.translate(&self.shop).await;
        row.catch_copy = translator.translate(&self.catch_copy).await;
        row.saturation = translator.translate(&self.saturation).await;
        row.selling_points = translator.translate(&self.selling_points).await;
        row.review_pros = translator.translate(&self.review_pros).await;
        row.complaints = translator.translate(&self.complaints).await;
        row.minor_rank = translator.translate_rank(&self.minor_rank).await;
        row.major_rank = translator.translate_rank(&self.major_rank).await;

        for feature in [
            &mut row.feature1,
            &mut row.feature2,
            &mut row.feature3,
            &mut row.feature4,
            &mut row.feature5,
            &mut row.feature6,
            &mut row.feature7,
            &mut row.feature8,
            &mut row.feature9,
        ] {
            if !feature.is_empty() {
                *feature = translator.translate(feature).await;
            }
        }

        row
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: i64,
    pub keyword: String,
    pub language: String,
    pub products: Vec<ProductRow>,
}

impl Manifest {
    pub fn new(keyword: &str, language: &str, products: Vec<ProductRow>) -> Self {
        Self {
            created_at: Utc::now().timestamp(),
            keyword: keyword.to_string(),
            language: language.to_string(),
            products,
        }
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let filename = format!("report_{}_{}.json", self.language, self.created_at);
        let path = data_dir.join(&filename);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Saved {} rows to {:?}", self.products.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RankResult;

    fn listed() -> ListedProduct {
        ListedProduct {
            shop: "ショップA".to_string(),
            title: "コカ・コーラ 500ml×24本".to_string(),
            url: "https://item.rakuten.co.jp/shopa/item1/".to_string(),
            review_url: None,
            image: String::new(),
            saturation: "商品数394,408件中, 自然1位".to_string(),
            review_count: 0,
            review_score: "0.0".to_string(),
            price: 2980,
            is_ad: false,
        }
    }

    #[test]
    fn detail_supplements_backfill_empty_listing_fields() {
        let details = ProductDetails {
            review_count: Some(169),
            review_score: Some("4.52".to_string()),
            main_image: "https://img.example/main.jpg".to_string(),
            ranks: RankResult {
                minor_rank: "水・ソフトドリンク 第3".to_string(),
                major_rank: String::new(),
            },
            features: vec!["大容量".to_string()],
            ..Default::default()
        };
        let row = ProductRow::new("コカコーラ", &listed(), &details);

        assert_eq!(row.review_count, 169);
        assert_eq!(row.review_score, "4.52");
        assert_eq!(row.main_image, "https://img.example/main.jpg");
        assert_eq!(row.minor_rank, "水・ソフトドリンク 第3");
        assert_eq!(row.feature1, "大容量");
        assert_eq!(row.feature2, "");
        assert_eq!(row.has_video, "无");
    }

    #[test]
    fn listing_fields_win_when_present() {
        let mut product = listed();
        product.review_count = 12;
        product.review_score = "4.10".to_string();
        let details = ProductDetails {
            review_count: Some(169),
            review_score: Some("4.52".to_string()),
            ..Default::default()
        };
        let row = ProductRow::new("コカコーラ", &product, &details);

        assert_eq!(row.review_count, 12);
        assert_eq!(row.review_score, "4.10");
    }
}
