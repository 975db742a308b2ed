use log::warn;

/// Host-application hook for a session that cannot be recovered.
///
/// Fired once per failed refresh, after the credential has been cleared, so
/// the host can send the user back to a login surface.
#[cfg_attr(test, mockall::automock)]
pub trait SessionListener: Send + Sync {
    fn on_session_expired(&self);
}

/// Logs a hint telling the user how to sign in again.
pub struct LogSessionListener {
    login_hint: String,
}

impl LogSessionListener {
    pub fn new(login_hint: impl Into<String>) -> Self {
        Self {
            login_hint: login_hint.into(),
        }
    }
}

impl Default for LogSessionListener {
    fn default() -> Self {
        Self::new("log in again")
    }
}

impl SessionListener for LogSessionListener {
    fn on_session_expired(&self) {
        warn!("Session expired: {}", self.login_hint);
    }
}
