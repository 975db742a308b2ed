//! Login, registration and logout against the admin auth endpoints.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use super::credential::{Credential, mask_token};
use crate::http::{ApiRequest, AuthClient};

#[derive(Serialize)]
struct AccountRequest<'a> {
    username: &'a str,
    password: &'a str,
}

pub struct AuthApi {
    client: AuthClient,
}

impl AuthApi {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// Signs in and makes the returned credential current.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Credential> {
        let request = ApiRequest::post(self.client.config().login_path.as_str())
            .json(&AccountRequest { username, password })?
            .skip_auth();

        let credential: Credential = self
            .client
            .request(request)
            .await
            .with_context(|| format!("Login failed for {}", username))?;

        debug!(
            "Logged in as uid {} with token {}",
            credential.uid,
            mask_token(&credential.access_token)
        );
        self.client
            .credentials()
            .set(credential.clone())
            .context("Failed to store credential")?;
        info!("Logged in as {}", username);

        Ok(credential)
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        let request = ApiRequest::post(self.client.config().register_path.as_str())
            .json(&AccountRequest { username, password })?
            .skip_auth();

        let _: Value = self
            .client
            .request(request)
            .await
            .with_context(|| format!("Registration failed for {}", username))?;

        info!("Registered {}", username);
        Ok(())
    }

    /// Drops the local credential. The backend keeps no logout route, so
    /// nothing is sent.
    pub fn logout(&self) -> Result<()> {
        self.client
            .credentials()
            .clear()
            .context("Failed to remove stored credential")?;
        info!("Logged out");
        Ok(())
    }
}
