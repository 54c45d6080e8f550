use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use codecontext_core::{FetchError, SourceRelay};

const USER_AGENT: &str = concat!("CodeContext/", env!("CARGO_PKG_VERSION"));

/// Longest relay error body kept in a `FetchError::Unknown` message.
const MAX_ERROR_BODY: usize = 200;

/// Reads remote files through a prefix-style CORS relay (`<base><target-url>`).
pub struct RelayClient {
    client: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Full request URL for a target.
    pub fn relay_url(&self, target: &str) -> String {
        format!("{}{}", self.base_url, target)
    }
}

#[async_trait]
impl SourceRelay for RelayClient {
    async fn fetch_raw(&self, url: &str) -> Result<String, FetchError> {
        let start = Instant::now();
        let request_url = self.relay_url(url);

        debug!(target_url = %url, "Fetching source through relay");

        let response = self
            .client
            .get(&request_url)
            .header("User-Agent", USER_AGENT)
            // cors-anywhere refuses requests that carry neither Origin nor this header.
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| FetchError::Unknown {
                status: None,
                message: format!("relay request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            warn!(target_url = %url, status = status.as_u16(), "Relay returned error status");
            return Err(FetchError::from_status(url, status.as_u16(), &body));
        }

        let text = response.text().await.map_err(|e| FetchError::Unknown {
            status: Some(status.as_u16()),
            message: format!("failed to read relay body: {e}"),
        })?;

        debug!(
            target_url = %url,
            bytes = text.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Relay fetch complete"
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::{StatusCode, Uri}, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn relay_stub(State(hits): State<Arc<AtomicUsize>>, uri: Uri) -> (StatusCode, String) {
        hits.fetch_add(1, Ordering::SeqCst);
        let path = uri.path();
        if path.contains("missing") {
            (StatusCode::NOT_FOUND, "Not Found".into())
        } else if path.contains("limited") {
            (StatusCode::FORBIDDEN, "rate limited".into())
        } else if path.contains("broken") {
            (StatusCode::BAD_GATEWAY, "upstream exploded".into())
        } else {
            (StatusCode::OK, format!("source for {path}"))
        }
    }

    async fn spawn_relay() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .fallback(relay_stub)
            .with_state(Arc::clone(&hits));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/"), hits)
    }

    #[test]
    fn relay_url_is_plain_concatenation() {
        let relay = RelayClient::new("https://cors-anywhere.herokuapp.com/");
        assert_eq!(
            relay.relay_url("https://raw.githubusercontent.com/x/y/main/a.py"),
            "https://cors-anywhere.herokuapp.com/https://raw.githubusercontent.com/x/y/main/a.py"
        );
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let (base, hits) = spawn_relay().await;
        let relay = RelayClient::new(base);
        let text = relay
            .fetch_raw("https://raw.githubusercontent.com/x/y/main/a.py")
            .await
            .unwrap();
        assert!(text.starts_with("source for /https:"));
        assert!(text.ends_with("/x/y/main/a.py"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn classifies_404_and_403() {
        let (base, _) = spawn_relay().await;
        let relay = RelayClient::new(base);

        let err = relay.fetch_raw("https://raw.githubusercontent.com/x/missing.py").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));

        let err = relay.fetch_raw("https://raw.githubusercontent.com/x/limited.py").await.unwrap_err();
        assert!(matches!(err, FetchError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn other_status_is_unknown_with_body() {
        let (base, _) = spawn_relay().await;
        let relay = RelayClient::new(base);
        let err = relay.fetch_raw("https://raw.githubusercontent.com/x/broken.py").await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Unknown {
                status: Some(502),
                message: "upstream exploded".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_relay_is_unknown_without_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let relay = RelayClient::new(format!("http://{addr}/"));
        let err = relay.fetch_raw("https://raw.githubusercontent.com/x/a.py").await.unwrap_err();
        assert!(matches!(err, FetchError::Unknown { status: None, .. }));
    }
}
