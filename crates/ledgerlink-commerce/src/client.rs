// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commerce platform API client.
//!
//! Covers the non-accounting side of a sync: paginated record fetch for
//! inbound modules, single batch POST for outbound modules. Credentials
//! come from the config store as ciphertext and are decrypted through the
//! [`CredentialDecryptor`] seam at request time.

use std::time::{Duration, Instant};

use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use ledgerlink_core::types::{CommerceAuth, CommerceConfig};
use ledgerlink_core::{CredentialDecryptor, LedgerlinkError};

/// Pagination hard stop, matching the platform's own page-count guarantees.
const MAX_PAGES: u32 = 100;

/// Buffer subtracted from OAuth2 token lifetimes before expiry.
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Result of probing the configured endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommerceProbe {
    pub success: bool,
    pub status_code: u16,
    pub response_time_ms: u128,
    pub message: String,
}

/// Authenticated client for one module's commerce endpoint.
pub struct CommerceClient {
    config: CommerceConfig,
    http: reqwest::Client,
    decryptor: Arc<dyn CredentialDecryptor>,
    token_cache: Mutex<Option<CachedToken>>,
}

impl CommerceClient {
    pub fn new(
        config: CommerceConfig,
        decryptor: Arc<dyn CredentialDecryptor>,
    ) -> Result<Self, LedgerlinkError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                LedgerlinkError::Internal(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            config,
            http,
            decryptor,
            token_cache: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &CommerceConfig {
        &self.config
    }

    /// Build auth headers for the configured scheme.
    async fn auth_headers(&self) -> Result<HeaderMap, LedgerlinkError> {
        let mut headers = HeaderMap::new();
        match &self.config.auth {
            CommerceAuth::None => {}
            CommerceAuth::Bearer { token } => {
                let token = self.decryptor.decrypt(token)?;
                if token.is_empty() {
                    return Err(LedgerlinkError::Authentication(
                        "bearer token not configured".into(),
                    ));
                }
                headers.insert("authorization", header_value(&format!("Bearer {token}"))?);
            }
            CommerceAuth::ApiKey { header, key } => {
                let key = self.decryptor.decrypt(key)?;
                if key.is_empty() {
                    return Err(LedgerlinkError::Authentication(
                        "API key not configured".into(),
                    ));
                }
                headers.insert(header_name(header)?, header_value(&key)?);
            }
            CommerceAuth::Basic { username, password } => {
                let username = self.decryptor.decrypt(username)?;
                let password = self.decryptor.decrypt(password)?;
                if username.is_empty() {
                    return Err(LedgerlinkError::Authentication(
                        "basic auth credentials not configured".into(),
                    ));
                }
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                headers.insert("authorization", header_value(&format!("Basic {encoded}"))?);
            }
            CommerceAuth::OAuth2 { .. } => {
                let token = self.oauth2_token().await?;
                headers.insert("authorization", header_value(&format!("Bearer {token}"))?);
            }
        }
        Ok(headers)
    }

    /// OAuth2 client-credentials flow with token caching.
    async fn oauth2_token(&self) -> Result<String, LedgerlinkError> {
        {
            let cache = self.token_cache.lock().await;
            if let Some(cached) = cache.as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let CommerceAuth::OAuth2 {
            token_url,
            client_id,
            client_secret,
            scope,
        } = &self.config.auth
        else {
            return Err(LedgerlinkError::Internal(
                "oauth2_token called for non-OAuth2 config".into(),
            ));
        };

        let client_id = self.decryptor.decrypt(client_id)?;
        let client_secret = self.decryptor.decrypt(client_secret)?;
        if client_id.is_empty() || token_url.is_empty() {
            return Err(LedgerlinkError::Authentication(
                "OAuth2 client id or token URL not configured".into(),
            ));
        }

        let mut form = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        if let Some(scope) = scope {
            form.push(("scope", scope.clone()));
        }

        let response = self
            .http
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| LedgerlinkError::Authentication(format!(
                "OAuth2 token request failed: {e}"
            )))?;
        if !response.status().is_success() {
            return Err(LedgerlinkError::Authentication(format!(
                "OAuth2 token request failed: HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            LedgerlinkError::Authentication(format!("OAuth2 token response unreadable: {e}"))
        })?;
        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                LedgerlinkError::Authentication("OAuth2 response missing access_token".into())
            })?
            .to_string();
        let expires_in = body
            .get("expires_in")
            .and_then(Value::as_u64)
            .unwrap_or(3600);

        let expires_at = Instant::now() + Duration::from_secs(expires_in)
            - TOKEN_EXPIRY_BUFFER.min(Duration::from_secs(expires_in));
        *self.token_cache.lock().await = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });

        Ok(token)
    }

    /// One authenticated request; returns the parsed JSON body.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        params: &[(String, String)],
    ) -> Result<Value, LedgerlinkError> {
        let auth = self.auth_headers().await?;

        let mut builder = self.http.request(method, url).headers(auth);
        for (name, value) in &self.config.headers {
            builder = builder.header(header_name(name)?, header_value(value)?);
        }
        if !params.is_empty() {
            builder = builder.query(params);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LedgerlinkError::Timeout {
                    duration: Duration::from_millis(self.config.timeout_ms),
                }
            } else {
                LedgerlinkError::Api {
                    message: format!("commerce request failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            // Drop any cached token so the next call re-authenticates.
            *self.token_cache.lock().await = None;
            return Err(LedgerlinkError::Authentication(format!(
                "commerce API rejected credentials: HTTP {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerlinkError::Api {
                message: format!("commerce API returned HTTP {status}: {body}"),
                source: None,
            });
        }

        response.json().await.map_err(|e| LedgerlinkError::Api {
            message: format!("commerce response was not JSON: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Fetch every page of records from the configured endpoint.
    ///
    /// Stops on the first empty page, or at the 100-page safety cap.
    pub async fn fetch_all(&self) -> Result<Vec<Value>, LedgerlinkError> {
        let mut all = Vec::new();
        let mut page: u32 = 1;

        loop {
            let params = vec![(self.config.page_key.clone(), page.to_string())];
            let data = self
                .request(Method::GET, &self.config.endpoint, None, &params)
                .await?;
            let items = page_items(&data, &self.config.items_key);

            if items.is_empty() {
                break;
            }
            debug!(page, count = items.len(), "fetched commerce page");
            all.extend(items);
            page += 1;

            if page > MAX_PAGES {
                warn!("pagination safety limit reached ({MAX_PAGES} pages)");
                break;
            }
        }

        Ok(all)
    }

    /// Single POST of a batch payload to the configured endpoint.
    pub async fn post(&self, body: &Value) -> Result<Value, LedgerlinkError> {
        self.request(Method::POST, &self.config.endpoint, Some(body), &[])
            .await
    }

    /// Probe the endpoint for reachability. Never fails.
    pub async fn test_connection(&self) -> CommerceProbe {
        let start = Instant::now();
        let auth = match self.auth_headers().await {
            Ok(auth) => auth,
            Err(e) => {
                return CommerceProbe {
                    success: false,
                    status_code: 0,
                    response_time_ms: 0,
                    message: e.to_string(),
                }
            }
        };

        match self
            .http
            .get(&self.config.endpoint)
            .headers(auth)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status().as_u16();
                CommerceProbe {
                    // Server errors mean "reachable but unhappy"; only
                    // transport failures count as unreachable.
                    success: status < 500,
                    status_code: status,
                    response_time_ms: start.elapsed().as_millis(),
                    message: if status < 400 {
                        "connection successful".to_string()
                    } else {
                        format!("HTTP {status}")
                    },
                }
            }
            Err(e) => CommerceProbe {
                success: false,
                status_code: 0,
                response_time_ms: 0,
                message: e.to_string(),
            },
        }
    }
}

/// Records of one page, tolerating the platform's response-shape variants.
fn page_items(data: &Value, items_key: &str) -> Vec<Value> {
    for key in [items_key, "data", "results"] {
        if let Some(items) = data.get(key).and_then(Value::as_array) {
            return items.clone();
        }
    }
    if let Some(items) = data.as_array() {
        return items.clone();
    }
    Vec::new()
}

fn header_name(name: &str) -> Result<HeaderName, LedgerlinkError> {
    name.parse()
        .map_err(|_| LedgerlinkError::Config(format!("invalid header name: {name}")))
}

fn header_value(value: &str) -> Result<HeaderValue, LedgerlinkError> {
    value
        .parse()
        .map_err(|_| LedgerlinkError::Config("invalid header value".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlink_core::traits::secrets::PlaintextDecryptor;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, auth: CommerceAuth) -> CommerceClient {
        let config = CommerceConfig {
            endpoint: format!("{}/orders", server.uri()),
            auth,
            headers: Default::default(),
            timeout_ms: 5_000,
            page_key: "page".into(),
            items_key: "items".into(),
        };
        CommerceClient::new(config, Arc::new(PlaintextDecryptor)).unwrap()
    }

    #[tokio::test]
    async fn fetch_all_walks_pages_until_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": 1}, {"id": 2}]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orders"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": 3}]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orders"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let client = client_for(&server, CommerceAuth::None);
        let records = client.fetch_all().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2]["id"], 3);
    }

    #[tokio::test]
    async fn bearer_auth_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(
            &server,
            CommerceAuth::Bearer {
                token: "tok-123".into(),
            },
        );
        let records = client.fetch_all().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn api_key_uses_configured_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-api-key", "key-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(
            &server,
            CommerceAuth::ApiKey {
                header: "x-api-key".into(),
                key: "key-9".into(),
            },
        );
        client.fetch_all().await.unwrap();
    }

    #[tokio::test]
    async fn basic_auth_is_base64_encoded() {
        let server = MockServer::start().await;
        // base64("alice:s3cret")
        Mock::given(method("GET"))
            .and(header("authorization", "Basic YWxpY2U6czNjcmV0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(
            &server,
            CommerceAuth::Basic {
                username: "alice".into(),
                password: "s3cret".into(),
            },
        );
        client.fetch_all().await.unwrap();
    }

    #[tokio::test]
    async fn oauth2_token_is_fetched_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "oauth-tok",
                "expires_in": 3600
            })))
            .expect(1) // second request must reuse the cache
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer oauth-tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(
            &server,
            CommerceAuth::OAuth2 {
                token_url: format!("{}/token", server.uri()),
                client_id: "cid".into(),
                client_secret: "csec".into(),
                scope: None,
            },
        );
        client.fetch_all().await.unwrap();
        client.fetch_all().await.unwrap();
    }

    #[tokio::test]
    async fn unauthorized_surfaces_as_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server, CommerceAuth::None);
        let err = client.fetch_all().await.unwrap_err();
        assert!(matches!(err, LedgerlinkError::Authentication(_)));
    }

    #[tokio::test]
    async fn server_error_surfaces_as_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server, CommerceAuth::None);
        let err = client.fetch_all().await.unwrap_err();
        assert!(matches!(err, LedgerlinkError::Api { .. }));
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn post_sends_batch_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accepted": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, CommerceAuth::None);
        let reply = client
            .post(&json!({"items": [{"a": 1}, {"a": 2}]}))
            .await
            .unwrap();
        assert_eq!(reply["accepted"], 2);
    }

    #[tokio::test]
    async fn test_connection_reports_reachability() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = client_for(&server, CommerceAuth::None);
        let probe = client.test_connection().await;
        assert!(probe.success);
        assert_eq!(probe.status_code, 200);
    }

    #[test]
    fn page_items_tolerates_shape_variants() {
        assert_eq!(page_items(&json!({"items": [1, 2]}), "items").len(), 2);
        assert_eq!(page_items(&json!({"data": [1]}), "items").len(), 1);
        assert_eq!(page_items(&json!({"results": [1]}), "items").len(), 1);
        assert_eq!(page_items(&json!([1, 2, 3]), "items").len(), 3);
        assert!(page_items(&json!({"unrelated": 1}), "items").is_empty());
    }
}
