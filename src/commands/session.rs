use anyhow::Result;
use log::debug;

use crate::{
    auth::{CredentialStore, mask_token},
    runtime::Runtime,
};

use super::config::{Config, Options};
use super::services::{build_auth_api, build_store};

/// Sign in and persist the returned credential.
#[tracing::instrument(skip(runtime, options, password))]
pub async fn login<R: Runtime + 'static>(
    runtime: R,
    options: Options,
    username: &str,
    password: &str,
) -> Result<()> {
    let config = Config::load(&runtime, options)?;
    let api = build_auth_api(runtime, &config)?;

    let credential = api.login(username, password).await?;
    println!("Logged in as {} (uid {})", username, credential.uid);
    Ok(())
}

#[tracing::instrument(skip(runtime, options, password))]
pub async fn register<R: Runtime + 'static>(
    runtime: R,
    options: Options,
    username: &str,
    password: &str,
) -> Result<()> {
    let config = Config::load(&runtime, options)?;
    let api = build_auth_api(runtime, &config)?;

    api.register(username, password).await?;
    println!("Registered {}", username);
    Ok(())
}

/// Remove the stored credential, including a file that no longer parses.
#[tracing::instrument(skip(runtime, options))]
pub fn logout<R: Runtime + 'static>(runtime: R, options: Options) -> Result<()> {
    let config = Config::load(&runtime, options)?;
    let api = build_auth_api(runtime, &config)?;
    let logged_in = api.client().credentials().current().is_some();

    api.logout()?;
    if logged_in {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

/// Show the stored credential without revealing the tokens.
#[tracing::instrument(skip(runtime, options))]
pub fn status<R: Runtime + 'static>(runtime: R, options: Options) -> Result<()> {
    let config = Config::load(&runtime, options)?;
    let store = build_store(runtime, &config);
    println!("{}", describe(&store));
    Ok(())
}

fn describe(store: &CredentialStore) -> String {
    match store.current() {
        None => "Not logged in.".to_string(),
        Some(credential) => {
            debug!("Describing credential {:?}", credential);
            let state = if credential.is_expired() {
                "expired, will refresh on next request"
            } else {
                "valid"
            };
            format!(
                "Logged in as uid {}\nAccess token: {}\nExpires at: {} ({})",
                credential.uid,
                mask_token(&credential.access_token),
                credential.expires_at,
                state
            )
        }
    }
}
