//! Builds the authenticated client the commands run against.

use std::sync::Arc;

use anyhow::Result;

use crate::{
    auth::{AuthApi, CredentialStore, LogSessionListener},
    http::AuthClient,
    runtime::Runtime,
};

use super::config::Config;

/// Message logged when the session cannot be renewed.
pub const LOGIN_HINT: &str = "run `mall-auth login <USERNAME>` to sign in again";

/// Opens the persisted credential store for this configuration.
pub fn build_store<R: Runtime + 'static>(runtime: R, config: &Config) -> CredentialStore {
    CredentialStore::persistent(runtime, config.storage_path.clone())
}

/// Builds an [`AuthApi`] over a client backed by the persisted credential.
pub fn build_auth_api<R: Runtime + 'static>(runtime: R, config: &Config) -> Result<AuthApi> {
    let store = build_store(runtime, config);
    let client = AuthClient::builder(config.client.clone())
        .credentials(Arc::new(store))
        .listener(Arc::new(LogSessionListener::new(LOGIN_HINT)))
        .build()?;
    Ok(AuthApi::new(client))
}
