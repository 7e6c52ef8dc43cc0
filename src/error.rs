use std::fmt;
use std::sync::Arc;

/// Errors surfaced by table operations.
///
/// The variant is `Clone` because every waiter of a deduplicated load
/// receives the same result as the flight's leader.
#[derive(Debug, Clone)]
pub enum CacheError {
  /// The looked-up or deleted key is not present in the table (and no
  /// loader produced it).
  KeyNotFound,
  /// The caller-supplied loader failed. The original error is passed
  /// through unchanged.
  Loader(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl CacheError {
  /// Returns true for the `KeyNotFound` variant.
  pub fn is_key_not_found(&self) -> bool {
    matches!(self, CacheError::KeyNotFound)
  }
}

impl fmt::Display for CacheError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CacheError::KeyNotFound => write!(f, "key not found in cache"),
      CacheError::Loader(err) => write!(f, "data loader failed: {}", err),
    }
  }
}

impl std::error::Error for CacheError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      CacheError::KeyNotFound => None,
      CacheError::Loader(err) => {
        let err: &(dyn std::error::Error + 'static) = &**err;
        Some(err)
      }
    }
  }
}
