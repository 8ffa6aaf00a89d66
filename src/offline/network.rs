//! Network backends the offline cache falls through to on a miss.

use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::time::Duration;

use super::http::{Request, Response};

/// Performs a real fetch. An `Err` means the request never produced a
/// response (offline, DNS failure, refused connection); HTTP error statuses
/// are returned as `Ok`.
pub trait Network: Send + Sync + 'static {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}

/// HTTP client backed by reqwest.
#[derive(Clone)]
pub struct HttpNetwork {
  client: reqwest::Client,
}

impl HttpNetwork {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl Network for HttpNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let response = self
      .client
      .request(request.method.clone(), request.url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;

    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", request.url, e))?
      .to_vec();

    Ok(Response {
      status,
      headers,
      body,
    })
  }
}
