use crate::config::Config;
use crate::policy::api_types::{server_message, ApiPolicyList};
use crate::policy::error::ApiError;
use crate::policy::types::{Policy, PolicyDraft, PolicyPage, PolicyQuery};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Policy service REST client
#[derive(Clone)]
pub struct PolicyClient {
  http: Client,
  base: Url,
  token: Option<String>,
}

impl PolicyClient {
  pub fn new(config: &Config) -> Result<Self, ApiError> {
    Self::with_base_url(&config.api.url, Config::get_api_token())
  }

  pub fn with_base_url(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
    // Join relative to the base path, so it must end with a slash
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let http = Client::builder()
      .user_agent(concat!("takaful/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self { http, base, token })
  }

  /// Resolve path segments against the base. Each segment is
  /// percent-encoded, so an id can never climb out of its resource.
  fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
    if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
      return Err(ApiError::InvalidId(bad.to_string()));
    }
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
    let url = self.url(segments)?;
    let req = self.http.request(method, url);
    Ok(match &self.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    })
  }

  /// Fetch one page of policies
  pub async fn list_policies(&self, query: &PolicyQuery) -> Result<PolicyPage, ApiError> {
    debug!(?query, "fetching policies");
    let resp = self
      .request(Method::GET, &["policies"])?
      .query(&query.params())
      .send()
      .await?;
    let list: ApiPolicyList = decode(resp).await?;
    Ok(list.into())
  }

  /// Fetch the whole collection without paging parameters
  pub async fn list_all_policies(&self) -> Result<PolicyPage, ApiError> {
    debug!("fetching all policies");
    let resp = self.request(Method::GET, &["policies"])?.send().await?;
    let list: ApiPolicyList = decode(resp).await?;
    Ok(list.into())
  }

  /// Get a single policy by id
  pub async fn get_policy(&self, id: &str) -> Result<Policy, ApiError> {
    debug!(id, "fetching policy");
    let resp = self
      .request(Method::GET, &["policies", id])?
      .send()
      .await?;
    decode(resp).await
  }

  /// Create a policy; the server assigns the id
  pub async fn create_policy(&self, draft: &PolicyDraft) -> Result<serde_json::Value, ApiError> {
    let resp = self
      .request(Method::POST, &["policies"])?
      .json(draft)
      .send()
      .await?;
    decode_ack(resp).await
  }

  /// Update an existing policy
  pub async fn update_policy(
    &self,
    id: &str,
    draft: &PolicyDraft,
  ) -> Result<serde_json::Value, ApiError> {
    let resp = self
      .request(Method::PATCH, &["policyUpdate", id])?
      .json(draft)
      .send()
      .await?;
    decode_ack(resp).await
  }

  /// Delete a policy by id
  pub async fn delete_policy(&self, id: &str) -> Result<serde_json::Value, ApiError> {
    let resp = self
      .request(Method::DELETE, &["policy", id])?
      .send()
      .await?;
    decode_ack(resp).await
  }
}

/// Fail on non-2xx, keeping the server's message when it sent one
async fn check_status(resp: Response) -> Result<Vec<u8>, ApiError> {
  let status = resp.status();
  let bytes = resp.bytes().await?;
  if !status.is_success() {
    return Err(ApiError::Server {
      status,
      message: server_message(&bytes),
    });
  }
  Ok(bytes.to_vec())
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
  let bytes = check_status(resp).await?;
  serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Write endpoints answer with the record or a driver acknowledgement;
/// an empty body is accepted too.
async fn decode_ack(resp: Response) -> Result<serde_json::Value, ApiError> {
  let bytes = check_status(resp).await?;
  if bytes.iter().all(u8::is_ascii_whitespace) {
    return Ok(serde_json::Value::Null);
  }
  serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use httpmock::prelude::*;
  use serde_json::json;

  fn client(server: &MockServer) -> PolicyClient {
    PolicyClient::with_base_url(&server.base_url(), Some("secret".to_string())).unwrap()
  }

  fn policies(range: std::ops::Range<u32>) -> serde_json::Value {
    json!(range
      .map(|i| json!({"_id": format!("p{i}"), "title": format!("Policy {i}"), "category": "Health"}))
      .collect::<Vec<_>>())
  }

  #[tokio::test]
  async fn test_list_policies_sends_filters_and_auth() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
      when
        .method(GET)
        .path("/policies")
        .query_param("page", "1")
        .query_param("limit", "9")
        .query_param("category", "Health")
        .query_param("search", "term")
        .header("authorization", "Bearer secret");
      then
        .status(200)
        .json_body(json!({"policies": policies(0..9), "total": 12}));
    });

    let page = client(&server)
      .list_policies(&PolicyQuery {
        page: 1,
        limit: 9,
        category: "Health".to_string(),
        search: "term".to_string(),
      })
      .await
      .unwrap();

    mock.assert();
    assert_eq!(page.items.len(), 9);
    assert_eq!(page.total, 12);
  }

  #[tokio::test]
  async fn test_second_page_keeps_filters() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
      when
        .method(GET)
        .path("/policies")
        .query_param("page", "2")
        .query_param("category", "Health")
        .query_param("search", "term");
      then
        .status(200)
        .json_body(json!({"policies": policies(9..12), "total": 12}));
    });

    let page = client(&server)
      .list_policies(&PolicyQuery {
        page: 2,
        limit: 9,
        category: "Health".to_string(),
        search: "term".to_string(),
      })
      .await
      .unwrap();

    mock.assert();
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.items[0].id, "p9");
  }

  #[tokio::test]
  async fn test_empty_filters_are_not_sent() {
    let server = MockServer::start();
    let with_category = server.mock(|when, then| {
      when.method(GET).path("/policies").query_param_exists("category");
      then.status(500);
    });
    let plain = server.mock(|when, then| {
      when.method(GET).path("/policies");
      then.status(200).json_body(json!([]));
    });

    let page = client(&server)
      .list_policies(&PolicyQuery {
        page: 1,
        limit: 9,
        category: String::new(),
        search: String::new(),
      })
      .await
      .unwrap();

    with_category.assert_hits(0);
    plain.assert();
    assert_eq!(page, PolicyPage::default());
  }

  #[tokio::test]
  async fn test_get_policy() {
    let server = MockServer::start();
    server.mock(|when, then| {
      when.method(GET).path("/policies/abc");
      then
        .status(200)
        .json_body(json!({"_id": "abc", "title": "Senior Care", "minAge": 60, "maxAge": 85}));
    });

    let policy = client(&server).get_policy("abc").await.unwrap();
    assert_eq!(policy.title, "Senior Care");
    assert_eq!(policy.min_age, 60);
  }

  #[tokio::test]
  async fn test_server_message_is_kept() {
    let server = MockServer::start();
    server.mock(|when, then| {
      when.method(POST).path("/policies");
      then
        .status(400)
        .json_body(json!({"message": "Title is required"}));
    });

    let err = client(&server)
      .create_policy(&PolicyDraft::default())
      .await
      .unwrap_err();
    assert_eq!(err.server_message(), Some("Title is required"));
  }

  #[tokio::test]
  async fn test_update_and_delete_paths() {
    let server = MockServer::start();
    let update = server.mock(|when, then| {
      when
        .method(PATCH)
        .path("/policyUpdate/p1")
        .json_body_includes(r#"{"title": "Renamed"}"#);
      then.status(200).json_body(json!({"modifiedCount": 1}));
    });
    let delete = server.mock(|when, then| {
      when.method(DELETE).path("/policy/p1");
      then.status(200).json_body(json!({"deletedCount": 1}));
    });

    let client = client(&server);
    let draft = PolicyDraft {
      title: "Renamed".to_string(),
      ..Default::default()
    };
    client.update_policy("p1", &draft).await.unwrap();
    client.delete_policy("p1").await.unwrap();

    update.assert();
    delete.assert();
  }

  #[tokio::test]
  async fn test_ids_stay_inside_their_resource() {
    let server = MockServer::start();
    let collection = server.mock(|when, then| {
      when.method(DELETE).path("/policies");
      then.status(200).json_body(json!({"deletedCount": 99}));
    });
    let single = server.mock(|when, then| {
      when.method(DELETE).path_prefix("/policy/");
      then.status(200).json_body(json!({"deletedCount": 1}));
    });

    let client = client(&server);
    client.delete_policy("../policies").await.unwrap();
    client.delete_policy("a/b?c#d").await.unwrap();

    collection.assert_hits(0);
    single.assert_hits(2);

    let url = client.url(&["policy", "a/b?c#d"]).unwrap();
    assert_eq!(url.path(), "/policy/a%2Fb%3Fc%23d");
    assert!(url.query().is_none());
  }

  #[tokio::test]
  async fn test_dot_ids_are_rejected() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
      when.method(DELETE);
      then.status(200);
    });

    let client = client(&server);
    for id in ["", ".", ".."] {
      let err = client.delete_policy(id).await.unwrap_err();
      assert!(matches!(err, ApiError::InvalidId(_)), "{id:?}: {err}");
    }
    any.assert_hits(0);
  }

  #[tokio::test]
  async fn test_base_path_is_preserved() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
      when.method(GET).path("/api/policies");
      then.status(200).json_body(json!({"policies": [], "total": 0}));
    });

    let client = PolicyClient::with_base_url(&server.url("/api"), None).unwrap();
    client.list_all_policies().await.unwrap();
    mock.assert();
  }
}
