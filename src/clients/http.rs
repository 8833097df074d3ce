use mcp_hub_core::base::{CallError, ErrorKind};
use mcp_hub_core::{logging, ClientRequest, Result, SubsystemClient};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Classification of a non-success HTTP status, `None` for 2xx.
pub fn classify_status(status: StatusCode) -> Option<ErrorKind> {
    if status.is_success() {
        return None;
    }
    let kind = match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::BadRequest,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Unauthorized,
        StatusCode::NOT_FOUND => ErrorKind::ResourceNotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ErrorKind::ConnectionTimeout,
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::ServiceUnavailable,
        s if s.is_server_error() => ErrorKind::ServiceUnavailable,
        s if s.is_client_error() => ErrorKind::BadRequest,
        // 1xx and 3xx are not followed up
        _ => ErrorKind::ServiceUnavailable,
    };
    Some(kind)
}

fn classify_transport(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() || err.is_connect() {
        ErrorKind::ConnectionTimeout
    } else if err.is_decode() || err.is_body() {
        ErrorKind::ServiceUnavailable
    } else if let Some(kind) = err.status().and_then(classify_status) {
        kind
    } else {
        ErrorKind::ServiceUnavailable
    }
}

/// `HttpSubsystemClient` posts each operation as JSON to `<base_url>/<operation>`.
#[derive(Debug, Clone)]
pub struct HttpSubsystemClient {
    name: String,
    base_url: String,
    http: reqwest::Client,
}

impl HttpSubsystemClient {
    pub fn new<S: Into<String>>(name: S, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpSubsystemClient {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            http,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self, operation: &str) -> String {
        format!("{}/{}", self.base_url, operation)
    }
}

impl SubsystemClient for HttpSubsystemClient {
    fn call(&self, request: ClientRequest) -> BoxFuture<'static, std::result::Result<Value, CallError>> {
        let http = self.http.clone();
        let url = self.endpoint(&request.operation);
        let name = self.name.clone();
        async move {
            let response = http
                .post(&url)
                .json(&request.payload)
                .send()
                .await
                .map_err(|err| CallError::new(classify_transport(&err), err.to_string()))?;
            let status = response.status();
            if let Some(kind) = classify_status(status) {
                let body = response.text().await.unwrap_or_default();
                logging::debug!("[HttpSubsystemClient] {} {} answered {}", name, url, status);
                let message = if body.is_empty() {
                    status.to_string()
                } else {
                    format!("{}: {}", status, body)
                };
                return Err(CallError::new(kind, message));
            }
            // an empty body is a valid answer of notification endpoints
            let bytes = response
                .bytes()
                .await
                .map_err(|err| CallError::new(classify_transport(&err), err.to_string()))?;
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_slice(&bytes).map_err(|err| {
                CallError::new(
                    ErrorKind::ServiceUnavailable,
                    format!("malformed answer from {}: {}", name, err),
                )
            })
        }
        .boxed()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(classify_status(StatusCode::NO_CONTENT), None);
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            Some(ErrorKind::BadRequest)
        );
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY),
            Some(ErrorKind::BadRequest)
        );
        assert_eq!(
            classify_status(StatusCode::CONFLICT),
            Some(ErrorKind::BadRequest)
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN),
            Some(ErrorKind::Unauthorized)
        );
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND),
            Some(ErrorKind::ResourceNotFound)
        );
        assert_eq!(
            classify_status(StatusCode::GATEWAY_TIMEOUT),
            Some(ErrorKind::ConnectionTimeout)
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(ErrorKind::ServiceUnavailable)
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            Some(ErrorKind::ServiceUnavailable)
        );
    }

    #[test]
    fn endpoint() {
        let client =
            HttpSubsystemClient::new("mes", "http://mes:8080/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.name(), "mes");
        assert_eq!(
            client.endpoint("getBatchInfo"),
            "http://mes:8080/api/getBatchInfo"
        );
    }
}
