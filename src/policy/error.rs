use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a request against the policy service
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("invalid URL: {0}")]
  Url(#[from] url::ParseError),
  #[error("network error: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("server error ({status}){}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
  Server {
    status: StatusCode,
    message: Option<String>,
  },
  #[error("unexpected response: {0}")]
  Decode(String),
  #[error("invalid policy id: {0:?}")]
  InvalidId(String),
}

impl ApiError {
  /// Message supplied by the server, if any
  pub fn server_message(&self) -> Option<&str> {
    match self {
      ApiError::Server { message, .. } => message.as_deref(),
      _ => None,
    }
  }
}

/// Failure of the image host. Kept apart from [`ApiError`] so an upload
/// failure is never mistaken for a failed write.
#[derive(Debug, Error)]
pub enum UploadError {
  #[error("image upload is not configured (set TAKAFUL_UPLOAD_KEY)")]
  NotConfigured,
  #[error("image upload failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("image host rejected the upload ({0})")]
  Rejected(StatusCode),
  #[error("image host returned no URL")]
  MissingUrl,
  #[error("failed to read image {path}: {source}")]
  Read {
    path: String,
    source: std::io::Error,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_server_error_display() {
    let err = ApiError::Server {
      status: StatusCode::CONFLICT,
      message: Some("Duplicate title".to_string()),
    };
    assert_eq!(err.to_string(), "server error (409 Conflict): Duplicate title");
    assert_eq!(err.server_message(), Some("Duplicate title"));

    let err = ApiError::Server {
      status: StatusCode::BAD_GATEWAY,
      message: None,
    };
    assert_eq!(err.to_string(), "server error (502 Bad Gateway)");
    assert_eq!(err.server_message(), None);
  }
}
