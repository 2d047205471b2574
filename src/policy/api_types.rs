//! Serde-deserializable types matching the policy service responses.
//!
//! These types are separate from domain types so the accepted wire shapes are
//! spelled out in one place and converted into domain types explicitly.

use serde::Deserialize;

use super::types::{Policy, PolicyPage};

// ============================================================================
// Collection endpoint response
// ============================================================================

/// Response of `GET /policies`.
///
/// The envelope is the canonical shape. Older deployments answer with a bare
/// array, which is still accepted; any other shape fails to decode.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiPolicyList {
  Envelope(ApiPolicyEnvelope),
  Bare(Vec<Policy>),
}

#[derive(Debug, Deserialize)]
pub struct ApiPolicyEnvelope {
  #[serde(default)]
  pub policies: Vec<Policy>,
  pub total: Option<u64>,
}

impl From<ApiPolicyList> for PolicyPage {
  fn from(list: ApiPolicyList) -> Self {
    match list {
      ApiPolicyList::Envelope(env) => {
        let total = env.total.unwrap_or(env.policies.len() as u64);
        PolicyPage {
          items: env.policies,
          total,
        }
      }
      ApiPolicyList::Bare(items) => PolicyPage {
        total: items.len() as u64,
        items,
      },
    }
  }
}

// ============================================================================
// Error body
// ============================================================================

/// Error body returned by the service on non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<String>,
}

/// Extract the server's `message` from an error body, if there is one
pub fn server_message(body: &[u8]) -> Option<String> {
  serde_json::from_slice::<ApiErrorBody>(body)
    .ok()
    .and_then(|b| b.message)
    .map(|m| m.trim().to_string())
    .filter(|m| !m.is_empty())
}

// ============================================================================
// Image host response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUploadData {
  pub display_url: Option<String>,
  pub url: Option<String>,
}

/// Response of the image host (imgbb shape)
#[derive(Debug, Deserialize)]
pub struct ApiUploadResponse {
  pub data: ApiUploadData,
}

impl ApiUploadResponse {
  pub fn into_url(self) -> Option<String> {
    self
      .data
      .display_url
      .or(self.data.url)
      .filter(|u| !u.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn decode(json: &str) -> serde_json::Result<PolicyPage> {
    serde_json::from_str::<ApiPolicyList>(json).map(PolicyPage::from)
  }

  #[test]
  fn test_envelope_is_decoded() {
    let page = decode(r#"{"policies": [{"_id": "a"}, {"_id": "b"}], "total": 12}"#).unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 12);
  }

  #[test]
  fn test_bare_array_is_normalised() {
    let page = decode(r#"[{"_id": "a"}, {"_id": "b"}, {"_id": "c"}]"#).unwrap();
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total, 3);
  }

  #[test]
  fn test_envelope_without_array_is_empty() {
    let page = decode(r#"{"total": 0}"#).unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
  }

  #[test]
  fn test_unexpected_shape_is_a_decode_error() {
    assert!(decode(r#""nope""#).is_err());
    assert!(decode(r#"{"policies": "nope"}"#).is_err());
  }

  #[test]
  fn test_server_message() {
    assert_eq!(
      server_message(br#"{"message": "Title already exists"}"#),
      Some("Title already exists".to_string())
    );
    assert_eq!(server_message(br#"{"message": "  "}"#), None);
    assert_eq!(server_message(b"<html>bad gateway</html>"), None);
  }

  #[test]
  fn test_upload_url_prefers_display_url() {
    let resp: ApiUploadResponse = serde_json::from_str(
      r#"{"data": {"display_url": "https://i.ibb.co/x.png", "url": "https://i.ibb.co/raw.png"}}"#,
    )
    .unwrap();
    assert_eq!(resp.into_url().as_deref(), Some("https://i.ibb.co/x.png"));
  }
}
