//! Request and response values exchanged between callers, the cache and the network.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// What the caller intends to do with the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Destination {
  /// Full-page navigation; eligible for the cached shell page when offline
  Document,
  /// Programmatic fetch (datasets, JSON, assets)
  #[default]
  Empty,
}

#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub destination: Destination,
}

impl Request {
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      destination: Destination::default(),
    }
  }

  #[allow(dead_code)]
  pub fn with_method(mut self, method: Method) -> Self {
    self.method = method;
    self
  }

  pub fn with_destination(mut self, destination: Destination) -> Self {
    self.destination = destination;
    self
  }

  /// Only GET requests over http(s) go through the cache.
  pub fn is_interceptable(&self) -> bool {
    self.method == Method::GET && matches!(self.url.scheme(), "http" | "https")
  }

  pub fn path(&self) -> &str {
    self.url.path()
  }

  /// Lookup key shared by every bucket. The fragment never takes part in matching.
  pub fn cache_key(&self) -> String {
    cache_key(&self.url)
  }
}

/// Cache key for `url`: the URL without its fragment.
pub fn cache_key(url: &Url) -> String {
  let mut url = url.clone();
  url.set_fragment(None);
  url.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
  pub status: u16,
  /// Header names are stored lowercase
  pub headers: BTreeMap<String, String>,
  pub body: Vec<u8>,
}

/// JSON body of the synthetic offline response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflinePayload {
  pub error: String,
  pub message: String,
}

pub const OFFLINE_HEADER: &str = "x-offline";

impl Response {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: BTreeMap::new(),
      body: body.into(),
    }
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.insert(name.to_ascii_lowercase(), value.to_string());
    self
  }

  /// Placeholder returned when the network is unreachable and nothing cached fits.
  pub fn offline(message: &str) -> Self {
    let payload = OfflinePayload {
      error: "offline".to_string(),
      message: message.to_string(),
    };
    let body = serde_json::to_vec(&payload).unwrap_or_default();

    Self::new(503, body)
      .with_header("content-type", "application/json")
      .with_header(OFFLINE_HEADER, "true")
  }

  /// Only a plain 200 counts; other 2xx codes are never cached.
  pub fn is_success(&self) -> bool {
    self.status == 200
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .get(&name.to_ascii_lowercase())
      .map(String::as_str)
  }

  pub fn is_offline_placeholder(&self) -> bool {
    self.header(OFFLINE_HEADER) == Some("true")
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}
