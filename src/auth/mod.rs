//! Credential state and the collaborators the client calls on expiry.

mod api;
mod credential;
mod listener;
mod refresher;
mod store;

pub use api::AuthApi;
pub use credential::{Credential, mask_token};
pub use listener::{LogSessionListener, SessionListener};
pub use refresher::{EndpointRefresher, Refresher};
pub use store::CredentialStore;

#[cfg(test)]
pub use listener::MockSessionListener;
#[cfg(test)]
pub use refresher::MockRefresher;
