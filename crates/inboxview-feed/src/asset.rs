//! Asset fetching

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid asset url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
}

pub trait AssetLoader: Send + Sync {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Bytes, AssetError>>;
}

/// Completion of one asset fetch, applied back on the owner context
#[derive(Debug)]
pub struct AssetLoaded {
    pub row: usize,
    pub id: String,
    pub result: Result<Bytes, AssetError>,
}

/// Fetches assets over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpAssetLoader {
    client: reqwest::Client,
}

impl HttpAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl AssetLoader for HttpAssetLoader {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Bytes, AssetError>> {
        let client = self.client.clone();
        let parsed = reqwest::Url::parse(url).map_err(|_| AssetError::InvalidUrl(url.to_string()));

        async move {
            let url = parsed?;
            let response = client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(AssetError::HttpStatus(status.as_u16()));
            }
            Ok(response.bytes().await?)
        }
        .boxed()
    }
}
