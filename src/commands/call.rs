use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::Method;
use serde_json::Value;

use crate::{http::ApiRequest, runtime::Runtime};

use super::config::{Config, Options};
use super::services::build_auth_api;

/// Parses a `key=value` query argument.
pub fn parse_query_pair(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("Invalid query parameter '{}'. Expected 'key=value'.", s),
    }
}

/// Builds the request for a `get`/`post`/`put`/`delete` invocation.
pub fn build_request(
    method: Method,
    path: &str,
    data: Option<&str>,
    query: &[String],
) -> Result<ApiRequest> {
    let mut request = ApiRequest::new(method, path);

    for pair in query {
        let (key, value) = parse_query_pair(pair)?;
        request = request.query(key, value);
    }

    if let Some(data) = data {
        let body: Value = serde_json::from_str(data).context("Request body is not valid JSON")?;
        request.body = Some(body);
    }

    Ok(request)
}

/// Perform an authenticated request and print the returned payload.
#[tracing::instrument(skip(runtime, options, data, query))]
pub async fn call<R: Runtime + 'static>(
    runtime: R,
    options: Options,
    method: Method,
    path: &str,
    data: Option<&str>,
    query: &[String],
) -> Result<()> {
    let config = Config::load(&runtime, options)?;
    let api = build_auth_api(runtime, &config)?;
    let request = build_request(method, path, data, query)?;

    debug!("Calling {} {}", request.method, request.path);
    let payload: Value = api
        .client()
        .request(request)
        .await
        .with_context(|| format!("Request to {} failed", path))?;

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use crate::test_utils::test_options;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_parse_query_pair() {
        assert_eq!(
            parse_query_pair("page=1").unwrap(),
            ("page".to_string(), "1".to_string())
        );
        assert_eq!(
            parse_query_pair("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_query_pair("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_query_pair("novalue").is_err());
        assert!(parse_query_pair("=1").is_err());
    }

    #[test]
    fn test_build_request_with_body_and_query() {
        let request = build_request(
            Method::POST,
            "/admin/users",
            Some(r#"{"username":"new"}"#),
            &["page=1".to_string()],
        )
        .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(json!({"username": "new"})));
        assert_eq!(request.query, vec![("page".to_string(), "1".to_string())]);
        assert!(!request.skip_auth);
    }

    #[test]
    fn test_build_request_invalid_json() {
        assert!(build_request(Method::POST, "/x", Some("{oops"), &[]).is_err());
    }

    #[tokio::test]
    async fn test_call_uses_stored_credential() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/admin/users")
            .match_query(mockito::Matcher::UrlEncoded("page".into(), "1".into()))
            .match_header("authorization", "Bearer t1")
            .with_status(200)
            .with_body(r#"{"code":0,"message":"","data":[]}"#)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let storage = dir.path().join("auth-storage.json");
        std::fs::write(
            &storage,
            r#"{"access_token":"t1","refresh_token":"r1","expires_at":999,"uid":"u1"}"#,
        )
        .unwrap();
        let mut options = test_options(&server.url());
        options.storage = Some(storage);

        call(
            RealRuntime,
            options,
            Method::GET,
            "/admin/users",
            None,
            &["page=1".to_string()],
        )
        .await
        .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_call_refresh_failure_removes_stored_credential() {
        let mut server = mockito::Server::new_async().await;
        let _profile = server
            .mock("GET", "/admin/profile")
            .with_status(200)
            .with_body(r#"{"code":401,"message":"token expired"}"#)
            .create_async()
            .await;
        let _refresh = server
            .mock("POST", "/admin/auth/refresh")
            .with_status(200)
            .with_body(r#"{"code":401,"message":"refresh token expired"}"#)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let storage = dir.path().join("auth-storage.json");
        std::fs::write(
            &storage,
            r#"{"access_token":"t1","refresh_token":"r1","expires_at":999,"uid":"u1"}"#,
        )
        .unwrap();
        let mut options = test_options(&server.url());
        options.storage = Some(storage.clone());

        let err = call(RealRuntime, options, Method::GET, "/admin/profile", None, &[])
            .await
            .unwrap_err();

        assert!(
            err.downcast_ref::<crate::http::ApiError>()
                .unwrap()
                .is_session_expired()
        );
        assert!(!storage.exists());
    }
}
