//! HTTP transport for the auth and vehicle APIs
//!
//! The rest of the crate talks to the network through the [`Transport`] trait
//! so that the retry and control logic can be exercised against scripted
//! fakes. [`HttpTransport`] is the reqwest-backed implementation.

use crate::config::HttpConfig;
use crate::error::{Result, SurplusError};
use crate::logging::{StructuredLogger, get_logger};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use std::time::Duration;

const USER_AGENT: &str = concat!("surplus-charge/", env!("CARGO_PKG_VERSION"));

/// Longest body excerpt carried in an API error message
const ERROR_BODY_EXCERPT: usize = 256;

/// HTTP verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// A single request against one of the provider endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: RequestBody::Empty,
            bearer: None,
        }
    }

    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body,
            bearer: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::post(url, RequestBody::Json(body))
    }

    /// Attach a bearer token
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Raw request executor
///
/// Implementations return the response body on 2xx and classify failures
/// into [`SurplusError::Authentication`] (401), [`SurplusError::VehicleAsleep`]
/// (408) and everything else.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<String>;
}

/// reqwest-backed transport with a per-process cookie jar
pub struct HttpTransport {
    client: reqwest::Client,
    logger: StructuredLogger,
}

impl HttpTransport {
    /// Build a client with bounded connect and read timeouts
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SurplusError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            logger: get_logger("transport"),
        })
    }

    fn build(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        match &request.body {
            RequestBody::Empty if request.method == Method::Post => {
                // The API rejects bodiless POSTs without an explicit length
                builder.header(CONTENT_LENGTH, HeaderValue::from_static("0"))
            }
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder
                .header(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                )
                .body(encode_form(fields)),
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<String> {
        self.logger
            .trace(&format!("{:?} {}", request.method, request.url));

        let response = self.build(request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if (200..300).contains(&status) {
            Ok(body)
        } else {
            self.logger.debug(&format!(
                "{:?} {} answered HTTP {}",
                request.method, request.url, status
            ));
            Err(classify_status(status, &body))
        }
    }
}

/// Map a non-2xx status to the error taxonomy
pub fn classify_status(status: u16, body: &str) -> SurplusError {
    match status {
        401 => SurplusError::authentication(format!("HTTP 401: {}", excerpt(body))),
        408 => SurplusError::vehicle_asleep(format!("HTTP 408: {}", excerpt(body))),
        _ => SurplusError::api(format!("HTTP {}: {}", status, excerpt(body))),
    }
}

/// URL-encode form fields in order
pub fn encode_form(fields: &[(String, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn excerpt(body: &str) -> &str {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_EXCERPT {
        return trimmed;
    }
    let mut end = ERROR_BODY_EXCERPT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    &trimmed[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(401, "").is_authentication_failure());
        assert!(classify_status(408, "asleep").is_vehicle_asleep());

        let err = classify_status(500, "boom");
        assert!(matches!(err, SurplusError::Api { .. }));
        assert_eq!(err.to_string(), "API error: HTTP 500: boom");
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let body = "é".repeat(200);
        let cut = excerpt(&body);
        assert!(cut.len() <= ERROR_BODY_EXCERPT);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_encode_form() {
        let fields = vec![
            ("identity".to_string(), "a@b.c".to_string()),
            ("_csrf".to_string(), "x y".to_string()),
        ];
        assert_eq!(encode_form(&fields), "identity=a%40b.c&_csrf=x+y");
    }

    #[test]
    fn test_request_builders() {
        let req = HttpRequest::get("https://example.test/a").with_bearer("tok");
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.bearer.as_deref(), Some("tok"));
        assert_eq!(req.body, RequestBody::Empty);
    }
}
