//! Client configuration: endpoint, envelope sentinels and the no-auth allow-list.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::http::TransportError;
use crate::runtime::Runtime;

/// Business code the backend uses for a successful call.
pub const DEFAULT_SUCCESS_CODE: i64 = 0;

/// Business code the backend uses for an expired access token.
pub const DEFAULT_EXPIRED_CODE: i64 = 401;

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// File name of the persisted credential inside the config directory.
pub const STORAGE_FILE_NAME: &str = "auth-storage.json";

const APP_DIR_NAME: &str = "mall-auth";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every relative request path is appended to.
    pub base_url: String,
    pub success_code: i64,
    pub expired_code: i64,
    /// Requests whose path contains any of these entries are sent without a
    /// credential and never trigger a refresh.
    pub allow_list: Vec<String>,
    pub login_path: String,
    pub register_path: String,
    pub refresh_path: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let login_path = "/admin/auth/login".to_string();
        let register_path = "/admin/auth/register".to_string();
        let refresh_path = "/admin/auth/refresh".to_string();

        Self {
            base_url: base_url.into(),
            success_code: DEFAULT_SUCCESS_CODE,
            expired_code: DEFAULT_EXPIRED_CODE,
            allow_list: vec![
                login_path.clone(),
                register_path.clone(),
                refresh_path.clone(),
            ],
            login_path,
            register_path,
            refresh_path,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("mall-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_success_code(mut self, code: i64) -> Self {
        self.success_code = code;
        self
    }

    pub fn with_expired_code(mut self, code: i64) -> Self {
        self.expired_code = code;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds an entry to the no-auth allow-list.
    pub fn allow(mut self, path: impl Into<String>) -> Self {
        self.allow_list.push(path.into());
        self
    }

    pub fn is_allow_listed(&self, path: &str) -> bool {
        self.allow_list
            .iter()
            .any(|entry| !entry.is_empty() && path.contains(entry.as_str()))
    }

    /// Checks that the base URL parses.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.base_url))?;
        Ok(())
    }

    /// Builds the full URL for a request path.
    ///
    /// Absolute URLs are used as-is; anything else is appended to the base
    /// URL, so a base of `http://host/api` and a path of `/users` resolves to
    /// `http://host/api/users`.
    pub fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| TransportError::InvalidUrl(e.to_string()));
        }

        let base = self.base_url.trim_end_matches('/');
        let joined = if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        };

        Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", joined, e)))
    }
}

/// Default location of the persisted credential: `<config dir>/mall-auth/auth-storage.json`.
pub fn default_storage_path<R: Runtime + ?Sized>(runtime: &R) -> Result<PathBuf> {
    let base = runtime
        .config_dir()
        .or_else(|| runtime.home_dir().map(|home| home.join(".config")))
        .context("Could not determine a configuration directory")?;
    Ok(base.join(APP_DIR_NAME).join(STORAGE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::test_utils::test_home;

    #[test]
    fn test_defaults_match_admin_backend() {
        let config = ClientConfig::new("http://localhost:8080");
        assert_eq!(config.success_code, 0);
        assert_eq!(config.expired_code, 401);
        assert_eq!(config.refresh_path, "/admin/auth/refresh");
        assert!(config.is_allow_listed("/admin/auth/login"));
        assert!(config.is_allow_listed("/admin/auth/refresh"));
        assert!(!config.is_allow_listed("/admin/users"));
    }

    #[test]
    fn test_allow_list_matches_substring() {
        let config = ClientConfig::new("http://localhost").allow("/v1/auth/login/phone");
        assert!(config.is_allow_listed("/v1/auth/login/phone?x=1"));
        assert!(config.is_allow_listed("http://other/admin/auth/register"));
    }

    #[test]
    fn test_empty_allow_list_entry_matches_nothing() {
        let config = ClientConfig::new("http://localhost").allow("");
        assert!(!config.is_allow_listed("/admin/users"));
    }

    #[test]
    fn test_sentinels_are_configurable() {
        let config = ClientConfig::new("http://localhost")
            .with_success_code(200)
            .with_expired_code(2001);
        assert_eq!(config.success_code, 200);
        assert_eq!(config.expired_code, 2001);
    }

    #[test]
    fn test_resolve_appends_to_base_path() {
        let config = ClientConfig::new("http://localhost:8080/api/");
        let url = config.resolve("/admin/users").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/admin/users");

        let url = config.resolve("admin/users").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/admin/users");
    }

    #[test]
    fn test_resolve_keeps_absolute_url() {
        let config = ClientConfig::new("http://localhost:8080");
        let url = config.resolve("https://example.com/x").unwrap();
        assert_eq!(url.as_str(), "https://example.com/x");
    }

    #[test]
    fn test_resolve_invalid_base_fails() {
        let config = ClientConfig::new("not a url");
        assert!(matches!(
            config.resolve("/x"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_storage_path_uses_config_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_config_dir()
            .returning(|| Some(test_home().join(".config")));

        let path = default_storage_path(&runtime).unwrap();
        assert_eq!(
            path,
            test_home()
                .join(".config")
                .join("mall-auth")
                .join("auth-storage.json")
        );
    }

    #[test]
    fn test_default_storage_path_falls_back_to_home() {
        let mut runtime = MockRuntime::new();
        runtime.expect_config_dir().returning(|| None);
        runtime.expect_home_dir().returning(|| Some(test_home()));

        let path = default_storage_path(&runtime).unwrap();
        assert!(path.starts_with(test_home()));
        assert!(path.ends_with("mall-auth/auth-storage.json"));
    }

    #[test]
    fn test_default_storage_path_without_dirs_fails() {
        let mut runtime = MockRuntime::new();
        runtime.expect_config_dir().returning(|| None);
        runtime.expect_home_dir().returning(|| None);

        assert!(default_storage_path(&runtime).is_err());
    }
}
