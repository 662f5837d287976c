//! Single-shot HTTP retrieval and outcome classification.
//!
//! The transport is an injected [`HttpClient`]; [`fetch`] performs exactly one
//! request and turns whatever comes back into a [`FetchOutcome`]. Retrying is
//! left to the caller, which can consult [`FetchFailure::is_transient`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, ClientBuilder};
use thiserror::Error;
use url::Url;

use crate::config::MirrorConfig;

/// Transport-level problems, below any status code decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("body read failed: {0}")]
    Body(String),
}

impl TransportError {
    fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// What the transport hands back for one GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Where the response actually came from, after any redirects.
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    /// Read independently of the status line; may fail on its own.
    pub body: Result<Vec<u8>, TransportError>,
}

/// The network capability the mirror depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError>;
}

/// Production [`HttpClient`] backed by reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(config: &MirrorConfig) -> Result<Self, reqwest::Error> {
        let redirect = if config.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };

        let client = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .redirect(redirect)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let content_type = header_value(response.headers(), CONTENT_TYPE);
        let location = header_value(response.headers(), LOCATION);

        let body = response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| TransportError::from_reqwest(&e));

        Ok(HttpResponse {
            url: final_url,
            status,
            content_type,
            location,
            body,
        })
    }
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// A successfully retrieved body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Every way a single retrieval can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("HTTP {status} (client error)")]
    ClientError { status: u16 },
    #[error("HTTP {status} (server error)")]
    ServerError { status: u16 },
    #[error("HTTP {status} redirect to {}", .location.as_deref().unwrap_or("<no location>"))]
    Redirect { status: u16, location: Option<String> },
    #[error("transport failure: {0}")]
    TransportFailure(TransportError),
    #[error("failed to read response body: {0}")]
    BodyReadFailure(String),
}

impl FetchFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchFailure::ClientError { status }
            | FetchFailure::ServerError { status }
            | FetchFailure::Redirect { status, .. } => Some(*status),
            FetchFailure::TransportFailure(_) | FetchFailure::BodyReadFailure(_) => None,
        }
    }

    /// Whether trying again later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchFailure::ServerError { .. } => true,
            FetchFailure::ClientError { status } => *status == 429,
            FetchFailure::TransportFailure(e) => {
                matches!(e, TransportError::Timeout | TransportError::Connect(_))
            }
            FetchFailure::Redirect { .. } | FetchFailure::BodyReadFailure(_) => false,
        }
    }
}

pub type FetchOutcome = Result<Fetched, FetchFailure>;

/// Classifies a raw response. The status decides first; the body only
/// matters for 2xx.
pub fn classify(response: HttpResponse) -> FetchOutcome {
    let status = response.status;
    match status {
        200..=299 => match response.body {
            Ok(bytes) => Ok(Fetched {
                url: response.url,
                status,
                content_type: response.content_type,
                bytes,
            }),
            Err(TransportError::Timeout) => {
                Err(FetchFailure::TransportFailure(TransportError::Timeout))
            }
            Err(e) => Err(FetchFailure::BodyReadFailure(e.to_string())),
        },
        300..=399 => Err(FetchFailure::Redirect {
            status,
            location: response.location,
        }),
        400..=499 => Err(FetchFailure::ClientError { status }),
        _ => Err(FetchFailure::ServerError { status }),
    }
}

/// One network round trip for `url`.
pub async fn fetch<C>(client: &C, url: &Url) -> FetchOutcome
where
    C: HttpClient + ?Sized,
{
    match client.get(url).await {
        Ok(response) => classify(response),
        Err(e) => Err(FetchFailure::TransportFailure(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            url: url(),
            status,
            content_type: Some("image/png".to_string()),
            location: None,
            body: Ok(b"payload".to_vec()),
        }
    }

    fn url() -> Url {
        Url::parse("https://example.test/logo.png").unwrap()
    }

    #[tokio::test]
    async fn test_success() {
        let mut client = MockHttpClient::new();
        client
            .expect_get()
            .times(1)
            .returning(|_| Ok(response(200)));

        let fetched = fetch(&client, &url()).await.unwrap();
        assert_eq!(fetched.bytes, b"payload");
        assert_eq!(fetched.content_type.as_deref(), Some("image/png"));
        assert_eq!(fetched.url, url());
    }

    #[test]
    fn test_final_url_survives_classification() {
        let mut resp = response(200);
        resp.url = Url::parse("https://example.test/assets/logo.png").unwrap();
        let fetched = classify(resp).unwrap();
        assert_eq!(fetched.url.path(), "/assets/logo.png");
    }

    #[tokio::test]
    async fn test_status_classification() {
        let cases = vec![
            (404, FetchFailure::ClientError { status: 404 }),
            (403, FetchFailure::ClientError { status: 403 }),
            (500, FetchFailure::ServerError { status: 500 }),
            (503, FetchFailure::ServerError { status: 503 }),
            (
                301,
                FetchFailure::Redirect {
                    status: 301,
                    location: None,
                },
            ),
        ];

        for (status, expected) in cases {
            let mut client = MockHttpClient::new();
            client
                .expect_get()
                .times(1)
                .returning(move |_| Ok(response(status)));
            assert_eq!(fetch(&client, &url()).await, Err(expected), "status {}", status);
        }
    }

    #[test]
    fn test_redirect_keeps_location() {
        let mut resp = response(302);
        resp.location = Some("https://example.test/elsewhere.png".to_string());
        let failure = classify(resp).unwrap_err();
        assert_eq!(failure.status(), Some(302));
        assert!(failure.to_string().contains("elsewhere.png"));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let mut client = MockHttpClient::new();
        client
            .expect_get()
            .times(1)
            .returning(|_| Err(TransportError::Timeout));

        let failure = fetch(&client, &url()).await.unwrap_err();
        assert_eq!(failure, FetchFailure::TransportFailure(TransportError::Timeout));
        assert!(failure.is_transient());
    }

    #[test]
    fn test_body_read_failure_is_distinct() {
        let mut resp = response(200);
        resp.body = Err(TransportError::Body("connection reset".to_string()));
        assert!(matches!(classify(resp), Err(FetchFailure::BodyReadFailure(_))));
    }

    #[test]
    fn test_body_timeout_is_transport_failure() {
        let mut resp = response(200);
        resp.body = Err(TransportError::Timeout);
        assert_eq!(
            classify(resp),
            Err(FetchFailure::TransportFailure(TransportError::Timeout))
        );
    }

    #[test]
    fn test_body_ignored_for_error_status() {
        let mut resp = response(404);
        resp.body = Err(TransportError::Body("truncated".to_string()));
        assert_eq!(classify(resp), Err(FetchFailure::ClientError { status: 404 }));
    }

    #[test]
    fn test_transient_classification() {
        assert!(FetchFailure::ServerError { status: 502 }.is_transient());
        assert!(FetchFailure::ClientError { status: 429 }.is_transient());
        assert!(!FetchFailure::ClientError { status: 404 }.is_transient());
        assert!(!FetchFailure::BodyReadFailure("x".into()).is_transient());
    }
}
