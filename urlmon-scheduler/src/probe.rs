//! Single-attempt HTTP probe with latency measurement.

use reqwest::Client;
use std::time::{Duration, Instant};

/// Classified result of one probe attempt. A probe never fails as an error;
/// transport faults are part of the outcome.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub status_code: Option<i64>,
    pub latency_ms: f64,
    pub is_up: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct Prober {
    client: Client,
    timeout: Duration,
}

impl Prober {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    /// Issues one GET against `url`. Any HTTP response counts as reachable;
    /// `is_up` is true for status codes below 500. The timeout bounds the
    /// whole attempt, so a hung target cannot stall the caller.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();

        match tokio::time::timeout(self.timeout, self.client.get(url).send()).await {
            Ok(Ok(response)) => {
                let latency_ms = elapsed_ms(start);
                let status = response.status().as_u16() as i64;

                ProbeOutcome {
                    status_code: Some(status),
                    latency_ms,
                    is_up: status < 500,
                    error: None,
                }
            }
            Ok(Err(e)) => ProbeOutcome {
                status_code: None,
                latency_ms: elapsed_ms(start),
                is_up: false,
                error: Some(e.to_string()),
            },
            Err(_) => ProbeOutcome {
                status_code: None,
                latency_ms: elapsed_ms(start),
                is_up: false,
                error: Some(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs_f64()
                )),
            },
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn success_response_is_up_with_latency() {
        let base = serve(Router::new().route("/", get(|| async { "ok" }))).await;

        let outcome = Prober::new(Duration::from_secs(5)).probe(&base).await;

        assert_eq!(outcome.status_code, Some(200));
        assert!(outcome.is_up);
        assert!(outcome.error.is_none());
        assert!(outcome.latency_ms > 0.0);
    }

    #[tokio::test]
    async fn not_found_counts_as_up() {
        let base = serve(Router::new()).await;

        let outcome = Prober::new(Duration::from_secs(5))
            .probe(&format!("{}/missing", base))
            .await;

        assert_eq!(outcome.status_code, Some(404));
        assert!(outcome.is_up);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn server_error_counts_as_down() {
        let app = Router::new().route("/", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let base = serve(app).await;

        let outcome = Prober::new(Duration::from_secs(5)).probe(&base).await;

        assert_eq!(outcome.status_code, Some(503));
        assert!(!outcome.is_up);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn timeout_is_a_transport_fault_with_time_to_failure() {
        let app = Router::new().route(
            "/",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "too late"
            }),
        );
        let base = serve(app).await;

        let outcome = Prober::new(Duration::from_millis(200)).probe(&base).await;

        assert_eq!(outcome.status_code, None);
        assert!(!outcome.is_up);
        assert!(outcome.error.is_some());
        assert!(outcome.latency_ms >= 200.0);
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_fault() {
        // Bind then drop to get a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = Prober::new(Duration::from_secs(5))
            .probe(&format!("http://{}/", addr))
            .await;

        assert_eq!(outcome.status_code, None);
        assert!(!outcome.is_up);
        assert!(outcome.error.is_some());
    }
}
