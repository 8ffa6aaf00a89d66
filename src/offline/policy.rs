//! Bucket naming and the static/dynamic classification predicate.

use std::collections::BTreeSet;

use crate::config::CacheConfig;

/// Versioned bucket names for one deployed cache version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
  /// Bare version string recorded on activation (e.g. "v1.0.0")
  pub version: String,
  /// Name reported over the control channel
  pub release: String,
  pub static_bucket: String,
  pub dynamic_bucket: String,
}

impl CacheNames {
  pub fn new(app_name: &str, version: &str) -> Self {
    Self {
      version: version.to_string(),
      release: format!("{}-{}", app_name, version),
      static_bucket: format!("static-cache-{}", version),
      dynamic_bucket: format!("dynamic-cache-{}", version),
    }
  }

  pub fn is_current(&self, bucket: &str) -> bool {
    bucket == self.static_bucket || bucket == self.dynamic_bucket
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
  Static,
  Dynamic,
}

/// Decides which bucket, if any, a successful response belongs in.
#[derive(Debug, Clone)]
pub struct CachePolicy {
  /// Install manifest, in declaration order
  manifest: Vec<String>,
  manifest_set: BTreeSet<String>,
  data_prefix: String,
  dynamic_extensions: BTreeSet<String>,
}

impl CachePolicy {
  pub fn new(
    manifest: Vec<String>,
    data_prefix: impl Into<String>,
    dynamic_extensions: impl IntoIterator<Item = String>,
  ) -> Self {
    let manifest_set = manifest.iter().cloned().collect();
    Self {
      manifest,
      manifest_set,
      data_prefix: data_prefix.into(),
      dynamic_extensions: dynamic_extensions.into_iter().collect(),
    }
  }

  pub fn from_config(config: &CacheConfig) -> Self {
    Self::new(
      config.static_assets.clone(),
      config.data_prefix.clone(),
      config.dynamic_extensions.iter().cloned(),
    )
  }

  pub fn manifest(&self) -> &[String] {
    &self.manifest
  }

  pub fn classify(&self, path: &str) -> Option<BucketKind> {
    if self.manifest_set.contains(path) || path.starts_with(&self.data_prefix) {
      return Some(BucketKind::Static);
    }

    match extension(path) {
      Some(ext) if self.dynamic_extensions.contains(ext) => Some(BucketKind::Dynamic),
      _ => None,
    }
  }
}

/// Extension of the last path segment, without the dot.
fn extension(path: &str) -> Option<&str> {
  let segment = path.rsplit('/').next()?;
  segment.rsplit_once('.').map(|(_, ext)| ext)
}
