//! Renewal of an expired access token.

use async_trait::async_trait;
use log::debug;
use serde_json::json;
use std::sync::Arc;

use super::credential::Credential;
use crate::config::ClientConfig;
use crate::http::{ApiError, ApiRequest, Envelope, Outcome, Transport, classify};

/// Exchanges a refresh token for a new [`Credential`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, ApiError>;
}

/// Calls the backend refresh endpoint directly on the transport.
///
/// The call carries no Authorization header and has no expiry handling of its
/// own, so a rejected refresh token surfaces as an error instead of looping.
pub struct EndpointRefresher {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl EndpointRefresher {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl Refresher for EndpointRefresher {
    #[tracing::instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, ApiError> {
        let request = ApiRequest::post(self.config.refresh_path.as_str())
            .json(&json!({ "refresh_token": refresh_token }))?
            .skip_auth();
        let url = self.config.resolve(&request.path)?;

        debug!("Refreshing access token at {}...", url);
        let response = self.transport.send(&request, &url).await?;
        let envelope = Envelope::from_slice(&response.body)?;

        match classify(
            envelope.code,
            self.config.success_code,
            self.config.expired_code,
        ) {
            Outcome::Success => envelope.into_data(),
            _ => Err(ApiError::business(envelope)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ReqwestTransport;
    use mockito::Matcher;

    fn refresher(url: &str) -> EndpointRefresher {
        let config = ClientConfig::new(url);
        let transport = Arc::new(ReqwestTransport::from_config(&config).unwrap());
        EndpointRefresher::new(transport, config)
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/admin/auth/refresh")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::Json(json!({"refresh_token": "r1"})))
            .with_status(200)
            .with_body(
                r#"{"code":0,"message":"","data":{"access_token":"t2","refresh_token":"r2","expires_at":1999,"uid":"u1"}}"#,
            )
            .create_async()
            .await;

        let credential = refresher(&server.url()).refresh("r1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(credential.access_token, "t2");
        assert_eq!(credential.refresh_token, "r2");
        assert_eq!(credential.expires_at, 1999);
    }

    #[tokio::test]
    async fn test_refresh_rejected_token() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/admin/auth/refresh")
            .with_status(200)
            .with_body(r#"{"code":401,"message":"refresh token expired"}"#)
            .create_async()
            .await;

        let err = refresher(&server.url()).refresh("r1").await.unwrap_err();
        assert_eq!(err.code(), Some(401));
    }

    #[tokio::test]
    async fn test_refresh_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/admin/auth/refresh")
            .with_status(500)
            .create_async()
            .await;

        let err = refresher(&server.url()).refresh("r1").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn test_refresh_payload_missing_fields() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/admin/auth/refresh")
            .with_status(200)
            .with_body(r#"{"code":0,"data":{"access_token":"t2"}}"#)
            .create_async()
            .await;

        let err = refresher(&server.url()).refresh("r1").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
