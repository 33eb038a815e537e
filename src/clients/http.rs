use crate::error::Result;
use reqwest::Client;

/// Raw fetch result. Non-200 statuses are normal values here; callers decide
/// whether a bad status is fatal or just "no finding".
#[derive(Debug)]
pub struct PageResponse {
    pub status: u16,
    pub text: String,
    pub final_url: String,
}

impl PageResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Thin wrapper over the shared reqwest client. All marketplace traffic goes
/// through here, strictly sequentially per product.
#[derive(Debug, Clone)]
pub struct MallClient {
    client: Client,
}

impl MallClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &str) -> Result<PageResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let text = response.text().await?;

        Ok(PageResponse {
            status,
            text,
            final_url,
        })
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        Ok(response.bytes().await?.to_vec())
    }
}
