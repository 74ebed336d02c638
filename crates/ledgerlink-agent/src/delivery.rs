// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local delivery of proxied XML to the Tally engine.

use std::time::Duration;

use tracing::debug;

use ledgerlink_core::LedgerlinkError;

/// HTTP delivery to the Tally endpoint on the bridge's own network.
#[derive(Debug, Clone)]
pub struct LocalDelivery {
    client: reqwest::Client,
    tally_url: String,
    timeout: Duration,
}

impl LocalDelivery {
    /// `tally_url` is the full local endpoint, e.g. "http://localhost:9000".
    pub fn new(
        tally_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LedgerlinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                LedgerlinkError::Internal(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            tally_url: tally_url.into(),
            timeout,
        })
    }

    /// POST one XML payload to Tally and return the raw response body.
    pub async fn deliver(&self, xml: &str) -> Result<String, LedgerlinkError> {
        debug!(bytes = xml.len(), url = %self.tally_url, "delivering XML to local Tally");

        let response = self
            .client
            .post(&self.tally_url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(xml.to_string())
            .send()
            .await
            .map_err(|e| classify_transport_error(e, self.timeout))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LedgerlinkError::Protocol {
            message: format!("failed to read Tally response: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(LedgerlinkError::protocol(format!(
                "Tally returned HTTP {status}"
            )));
        }

        Ok(body)
    }
}

/// Map a reqwest failure onto the relay error taxonomy.
fn classify_transport_error(e: reqwest::Error, timeout: Duration) -> LedgerlinkError {
    if e.is_timeout() {
        LedgerlinkError::Timeout { duration: timeout }
    } else {
        LedgerlinkError::ConnectionUnavailable {
            message: format!("could not reach Tally: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn deliver_posts_xml_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Content-Type", "text/xml; charset=utf-8"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<ENVELOPE>ok</ENVELOPE>"))
            .mount(&server)
            .await;

        let delivery = LocalDelivery::new(server.uri(), Duration::from_secs(5)).unwrap();
        let body = delivery.deliver("<ENVELOPE/>").await.unwrap();
        assert_eq!(body, "<ENVELOPE>ok</ENVELOPE>");
    }

    #[tokio::test]
    async fn non_success_status_is_a_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let delivery = LocalDelivery::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = delivery.deliver("<ENVELOPE/>").await.unwrap_err();
        assert!(matches!(err, LedgerlinkError::Protocol { .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        // Nothing listens on this port.
        let delivery =
            LocalDelivery::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = delivery.deliver("<ENVELOPE/>").await.unwrap_err();
        assert!(matches!(err, LedgerlinkError::ConnectionUnavailable { .. }));
    }
}
