//! # Remote Client
//!
//! HTTP client for the sheet backend: one GET that returns everything,
//! one POST per mutation.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Remote Client Requests                               │
//! │                                                                         │
//! │  fetch_snapshot()                                                       │
//! │  ────────────────                                                       │
//! │  GET endpoint ──► status check ──► body text                           │
//! │                                       │                                 │
//! │                       HTML sniff ◄────┘                                 │
//! │                           │                                             │
//! │          starts with <!doctype / <html ──► Err(MarkupPayload)          │
//! │                           │                                             │
//! │                           ▼                                             │
//! │                      JSON parse ──► normalize_snapshot ──► AppData     │
//! │                                                                         │
//! │  send_mutation()                                                        │
//! │  ───────────────                                                        │
//! │  POST endpoint, Content-Type: text/plain;charset=utf-8                 │
//! │  Body: {action, sheet, data} ──► status check ──► done                 │
//! │  Response body is never read: the script's answer carries no data      │
//! │  the register needs.                                                    │
//! │                                                                         │
//! │  WHY SNIFF FOR HTML?                                                   │
//! │  Sheet script hosts answer auth failures and bad deployments with      │
//! │  HTTP 200 and an HTML login/error page. Parsing that as JSON would     │
//! │  produce a confusing error; detecting it early gives a clear one.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use caja_core::{normalize::normalize_snapshot, AppData};

use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};
use crate::protocol::OutboundMutation;
use crate::queue::MutationSender;

/// Content type for mutation posts.
///
/// The sheet script reads the raw body; a JSON content type would trigger
/// a CORS preflight the script host cannot answer.
const MUTATION_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// HTTP client for the sheet backend.
///
/// ## Usage
/// ```rust,ignore
/// let client = RemoteClient::new(&config.remote)?;
///
/// match client.fetch_snapshot().await {
///     Ok(data) => store.replace_all(data),
///     Err(e) => warn!("Fetch failed: {e}"),  // cache answers instead
/// };
/// ```
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl RemoteClient {
    /// Creates a client for the configured endpoint.
    ///
    /// Fails when no endpoint is configured or the URL does not parse.
    pub fn new(settings: &RemoteSettings) -> SyncResult<Self> {
        let endpoint = settings
            .endpoint_url
            .as_deref()
            .ok_or_else(|| SyncError::InvalidConfig("endpoint_url is required".into()))?;
        let endpoint = Url::parse(endpoint)?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.fetch_timeout_secs))
            .build()
            .map_err(|e| SyncError::RequestFailed(e.to_string()))?;

        Ok(RemoteClient { http, endpoint })
    }

    /// Returns the endpoint this client talks to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetches the full remote snapshot and normalizes it.
    ///
    /// Every failure mode surfaces as a [`SyncError`]; the caller decides
    /// whether to absorb it (reads do) or retry it (writes do).
    pub async fn fetch_snapshot(&self) -> SyncResult<AppData> {
        let response = self.http.get(self.endpoint.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if looks_like_html(&body) {
            return Err(SyncError::MarkupPayload);
        }

        let raw: serde_json::Value = serde_json::from_str(&body)?;
        let data = normalize_snapshot(&raw);

        debug!(
            products = data.products.len(),
            sales = data.sales.len(),
            customers = data.customers.len(),
            users = data.users.len(),
            apps = data.apps.len(),
            "Fetched remote snapshot"
        );

        Ok(data)
    }

    /// Delivers one mutation to the sheet backend.
    ///
    /// The response body is dropped without being read.
    pub async fn send_mutation(&self, mutation: &OutboundMutation) -> SyncResult<()> {
        let body = mutation.envelope_json()?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, MUTATION_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
            });
        }

        debug!(
            mutation = %mutation.describe(),
            correlation_id = %mutation.id,
            "Delivered mutation"
        );
        Ok(())
    }
}

#[async_trait]
impl MutationSender for RemoteClient {
    async fn deliver(&self, mutation: &OutboundMutation) -> SyncResult<()> {
        self.send_mutation(mutation).await
    }
}

/// Detects HTML bodies masquerading as data.
fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start().get(..15).unwrap_or(body.trim_start());
    let head = head.to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::stock_update;
    use httpmock::prelude::*;

    fn settings(server: &MockServer) -> RemoteSettings {
        RemoteSettings {
            endpoint_url: Some(server.base_url()),
            fetch_timeout_secs: 2,
        }
    }

    #[test]
    fn test_html_sniff() {
        assert!(looks_like_html("<!DOCTYPE html><html><body>Login</body>"));
        assert!(looks_like_html("  \n<html lang=\"en\">"));
        assert!(looks_like_html("<HTML>"));
        assert!(!looks_like_html("{\"products\": []}"));
        assert!(!looks_like_html("[1, 2, 3]"));
    }

    #[test]
    fn test_new_requires_endpoint() {
        let result = RemoteClient::new(&RemoteSettings::default());
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_normalizes_records() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).json_body(serde_json::json!({
                "products": [
                    { "ID": "p-1", "NOMBRE": "CARGADOR", "Precio": "$25.00", "Stock": "50" }
                ],
                "sales": [],
                "customers": [],
                "users": [],
                "apps": []
            }));
        });

        let client = RemoteClient::new(&settings(&server)).unwrap();
        let data = client.fetch_snapshot().await.unwrap();

        assert_eq!(data.products.len(), 1);
        assert_eq!(data.products[0].name, "CARGADOR");
        assert_eq!(data.products[0].price, caja_core::Money::from_cents(2500));
        assert_eq!(data.products[0].stock, 50);
        m.assert();
    }

    #[tokio::test]
    async fn test_fetch_snapshot_rejects_html_page() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .body("<!DOCTYPE html><html><body>Sign in</body></html>");
        });

        let client = RemoteClient::new(&settings(&server)).unwrap();
        let result = client.fetch_snapshot().await;

        assert!(matches!(result, Err(SyncError::MarkupPayload)));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_maps_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(500);
        });

        let client = RemoteClient::new(&settings(&server)).unwrap();
        let result = client.fetch_snapshot().await;

        assert!(matches!(
            result,
            Err(SyncError::HttpStatus { status: 500 })
        ));
    }

    #[tokio::test]
    async fn test_send_mutation_posts_opaque_text() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .header("content-type", MUTATION_CONTENT_TYPE)
                .body_includes("updateStock");
            then.status(200).body("ignored by the client");
        });

        let client = RemoteClient::new(&settings(&server)).unwrap();
        client.send_mutation(&stock_update("p-1", 3)).await.unwrap();

        m.assert();
    }

    #[tokio::test]
    async fn test_send_mutation_maps_client_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(403);
        });

        let client = RemoteClient::new(&settings(&server)).unwrap();
        let result = client.send_mutation(&stock_update("p-1", 3)).await;

        assert!(matches!(
            result,
            Err(SyncError::HttpStatus { status: 403 })
        ));
    }
}
