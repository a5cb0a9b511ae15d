//! HTTP transport for the tax authority's REST API.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;

use super::config::AuthorityConfig;
use super::transport::{
    AuthorityResponse, AuthorityTransport, AuthorizationStatus, SignedSubmission, StatusResponse,
    TransportError,
};
use crate::core::FacturaError;

const SUBMIT_PATH: &str = "/fesv/recepciondte";
const STATUS_PATH: &str = "/fesv/consultadte";

/// Error body returned by the authority on non-2xx responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
}

/// [`AuthorityTransport`] over HTTPS with bearer-token authentication.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    pub fn new(config: &AuthorityConfig) -> Result<Self, FacturaError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FacturaError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<Reply<T>, TransportError> {
        let status = resp.status();
        let body = resp.text().await.map_err(map_reqwest)?;
        interpret(status, &body)
    }
}

/// What a completed HTTP exchange means to the gateway.
#[derive(Debug, PartialEq)]
enum Reply<T> {
    Answer(T),
    /// A 4xx whose body carries the authority's own response code.
    Refused { code: String, message: String },
}

fn interpret<T: serde::de::DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<Reply<T>, TransportError> {
    if status.is_server_error() {
        return Err(TransportError::Network(format!("HTTP {status}: {body}")));
    }
    if !status.is_success() {
        let error = serde_json::from_str::<ApiError>(body).ok();
        return match error {
            Some(ApiError {
                code: Some(code),
                message,
            }) if !code.trim().is_empty() => Ok(Reply::Refused {
                code: code.trim().to_string(),
                message: message.unwrap_or_else(|| format!("HTTP {status}")),
            }),
            Some(ApiError {
                message: Some(message),
                ..
            }) => Err(TransportError::Protocol(format!("HTTP {status}: {message}"))),
            _ => Err(TransportError::Protocol(format!("HTTP {status}: {body}"))),
        };
    }

    serde_json::from_str(body)
        .map(Reply::Answer)
        .map_err(|e: serde_json::Error| TransportError::Protocol(e.to_string()))
}

fn map_reqwest(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Network(format!("request timed out: {e}"))
    } else {
        TransportError::Network(e.to_string())
    }
}

#[async_trait]
impl AuthorityTransport for HttpTransport {
    async fn submit(
        &self,
        submission: &SignedSubmission,
    ) -> Result<AuthorityResponse, TransportError> {
        let resp = self
            .client
            .post(self.url(SUBMIT_PATH))
            .bearer_auth(&self.token)
            .json(submission)
            .send()
            .await
            .map_err(map_reqwest)?;
        Ok(match Self::read(resp).await? {
            Reply::Answer(response) => response,
            Reply::Refused { code, message } => AuthorityResponse {
                response_code: code,
                description: message,
                authorization_code: None,
                authorized_at: None,
                control_number: None,
            },
        })
    }

    async fn query_status(
        &self,
        authorization_code: &str,
    ) -> Result<StatusResponse, TransportError> {
        let resp = self
            .client
            .get(self.url(STATUS_PATH))
            .bearer_auth(&self.token)
            .query(&[("codigoGeneracion", authorization_code)])
            .send()
            .await
            .map_err(map_reqwest)?;
        Ok(match Self::read(resp).await? {
            Reply::Answer(response) => response,
            Reply::Refused { code, message } => StatusResponse {
                response_code: code,
                description: message,
                status: AuthorizationStatus::Unknown,
                queried_at: Utc::now(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_serializes_camel_case() {
        let submission = SignedSubmission {
            document_number: "FAC-00000001".into(),
            environment: "test".into(),
            payload: "<DTE/>".into(),
            content_hash: "ab".into(),
            signature: "c2ln".into(),
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["documentNumber"], "FAC-00000001");
        assert_eq!(json["contentHash"], "ab");
    }

    #[test]
    fn response_deserialization() {
        let json = r#"{
            "responseCode": "200",
            "description": "ok",
            "authorizationCode": "A1",
            "authorizedAt": "2024-03-15T10:00:00Z",
            "controlNumber": null
        }"#;
        let resp: AuthorityResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.authorization_code.as_deref(), Some("A1"));
        assert!(resp.control_number.is_none());
    }

    #[test]
    fn status_deserialization() {
        let json = r#"{
            "responseCode": "200",
            "description": "ok",
            "status": "authorized",
            "queriedAt": "2024-03-15T10:00:00Z"
        }"#;
        let resp: StatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, AuthorizationStatus::Authorized);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let config = AuthorityConfig {
            url: "https://example.test/".into(),
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.url(SUBMIT_PATH),
            "https://example.test/fesv/recepciondte"
        );
    }

    #[test]
    fn client_error_keeps_the_authority_code() {
        let body = r#"{"code": "004", "message": "NIT del emisor no registrado"}"#;
        let reply = interpret::<AuthorityResponse>(StatusCode::BAD_REQUEST, body).unwrap();
        assert_eq!(
            reply,
            Reply::Refused {
                code: "004".into(),
                message: "NIT del emisor no registrado".into(),
            }
        );
    }

    #[test]
    fn client_error_without_code_is_a_protocol_error() {
        let err = interpret::<AuthorityResponse>(StatusCode::UNAUTHORIZED, r#"{"message": "token vencido"}"#)
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::Protocol("HTTP 401 Unauthorized: token vencido".into())
        );

        let err = interpret::<AuthorityResponse>(StatusCode::FORBIDDEN, "<html/>").unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn server_error_is_transient() {
        let err = interpret::<AuthorityResponse>(StatusCode::BAD_GATEWAY, "upstream").unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn success_body_is_decoded() {
        let body = r#"{"responseCode": "200", "description": "ok", "authorizationCode": "A1"}"#;
        match interpret::<AuthorityResponse>(StatusCode::OK, body).unwrap() {
            Reply::Answer(resp) => assert_eq!(resp.authorization_code.as_deref(), Some("A1")),
            other => panic!("expected an answer, got {other:?}"),
        }
    }
}
