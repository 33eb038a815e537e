use crate::clients::ai::AiClient;
use crate::clients::http::MallClient;
use crate::clients::translate::Translator;
use crate::config::Config;
use crate::detail::DetailScraper;
use crate::error::{Result, ScrapeError};
use crate::listing::{parse_list_page, ListedProduct};
use crate::report::{Manifest, ProductRow};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;
use tracing::{info, warn};

pub struct Pipeline {
    config: Config,
    mall: MallClient,
    translator: Translator,
    detail: DetailScraper,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let mall = MallClient::new(config.http_client.clone());
        let ai = AiClient::new(config.http_client.clone(), config.scraper.ai.clone());
        let detail = DetailScraper {
            mall: mall.clone(),
            ai,
            ranking: config.scraper.ranking.clone(),
        };

        Self {
            mall,
            translator: Translator::new(config.http_client.clone()),
            detail,
            config,
        }
    }

    pub async fn run(&self) -> Result<()> {
        self.config.ensure_directories()?;
        let keyword = &self.config.scraper.keyword;

        // Step 1: Collect listings from the search result pages
        info!("Step 1: Scraping search listings for '{keyword}'...");
        let products = self.scrape_listings(keyword).await?;
        if products.is_empty() {
            return Err(ScrapeError::Other(format!(
                "no products found for keyword '{keyword}'"
            )));
        }

        // Step 2: Deep scrape every product page
        info!("Step 2: Deep scraping {} products...", products.len());
        let rows = self.deep_scrape(keyword, &products).await?;

        // Step 3: Write the report manifests
        info!("Step 3: Writing report manifests...");
        self.write_reports(keyword, rows).await?;

        Ok(())
    }

    async fn scrape_listings(&self, keyword: &str) -> Result<Vec<ListedProduct>> {
        let mut products = Vec::new();

        for page in 1..=self.config.scraper.pages_to_scrape {
            let url = format!("https://search.rakuten.co.jp/search/mall/{keyword}/?p={page}");
            info!("Fetching list page {page}");

            let response = match self.mall.fetch(&url).await {
                Ok(response) if response.is_ok() => response,
                Ok(response) => {
                    warn!("List page {page} returned status {}", response.status);
                    continue;
                }
                Err(e) => {
                    warn!("List page {page} fetch failed: {e}");
                    continue;
                }
            };

            let page_products = parse_list_page(&response.text, self.config.scraper.list_limit);
            info!("Page {page}: {} products", page_products.len());
            products.extend(page_products);

            sleep(std::time::Duration::from_secs(2)).await;
        }

        Ok(products)
    }

    async fn deep_scrape(
        &self,
        keyword: &str,
        products: &[ListedProduct],
    ) -> Result<Vec<ProductRow>> {
        let limit = self
            .config
            .scraper
            .deep_limit
            .unwrap_or(products.len())
            .min(products.len());

        let pb = ProgressBar::new(limit as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .map_err(|e| ScrapeError::Other(e.to_string()))?,
        );

        let mut rows = Vec::with_capacity(limit);
        for product in &products[..limit] {
            pb.set_message(format!("Scraping {}", product.shop));

            let details = self
                .detail
                .scrape(
                    &product.url,
                    product.review_url.as_deref(),
                    product.review_count,
                )
                .await;

            let mut row = ProductRow::new(keyword, product, &details);
            // Spec lines stand in for the feature columns when extraction
            // came back empty.
            if row.feature1.is_empty() {
                for (slot, line) in [&mut row.feature1, &mut row.feature2, &mut row.feature3]
                    .into_iter()
                    .zip(details.specs.lines().take(3))
                {
                    *slot = line.chars().take(30).collect();
                }
            }
            rows.push(row);

            pb.inc(1);
            sleep(std::time::Duration::from_millis(1500)).await;
        }
        pb.finish_with_message("Deep scrape done");

        Ok(rows)
    }

    async fn write_reports(&self, keyword: &str, rows: Vec<ProductRow>) -> Result<()> {
        if self.config.scraper.enable_translation {
            info!("Translating {} rows to Chinese...", rows.len());
            let mut translated = Vec::with_capacity(rows.len());
            for row in &rows {
                translated.push(row.translated(&self.translator).await);
            }
            Manifest::new(keyword, "cn", translated).save(&self.config.args.data_dir)?;
        }

        Manifest::new(keyword, "jp", rows).save(&self.config.args.data_dir)?;
        Ok(())
    }
}
