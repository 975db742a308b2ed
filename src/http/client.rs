//! HTTP client that attaches the current credential and recovers from expiry.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;

use super::envelope::{Envelope, Outcome, classify};
use super::error::{ApiError, TransportError};
use super::pending::{PendingQueue, RefreshOutcome};
use super::request::ApiRequest;
use super::transport::{ReqwestTransport, Transport};
use crate::auth::{CredentialStore, EndpointRefresher, LogSessionListener, Refresher, SessionListener};
use crate::config::ClientConfig;

/// Authenticated client for the mall API.
///
/// Every request gets `Authorization: Bearer <access token>` unless it is
/// allow-listed or marked `skip_auth`. When the backend answers with the
/// expired-credential code, exactly one refresh runs at a time: the first
/// caller performs it, concurrent callers are queued and re-issue their
/// requests with the new token once it lands. A failed refresh clears the
/// credential, fails every queued caller and notifies the [`SessionListener`].
///
/// Cloning is cheap; clones share credential and refresh state.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialStore>,
    refresher: Arc<dyn Refresher>,
    listener: Arc<dyn SessionListener>,
    refresh: Mutex<RefreshState>,
}

/// Guarded by one mutex that is never held across an await point.
#[derive(Debug, Default)]
struct RefreshState {
    in_flight: bool,
    pending: PendingQueue,
}

/// What a caller that hit an expired credential does next.
enum Ticket {
    /// Perform the refresh.
    Lead,
    /// Wait for the refresh someone else is performing.
    Wait(oneshot::Receiver<RefreshOutcome>),
    /// A refresh already completed after the request was sent.
    Retry(String),
    /// The session was torn down after the request was sent.
    Expired,
}

pub struct AuthClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    credentials: Option<Arc<CredentialStore>>,
    refresher: Option<Arc<dyn Refresher>>,
    listener: Option<Arc<dyn SessionListener>>,
}

impl AuthClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn credentials(mut self, credentials: Arc<CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn refresher(mut self, refresher: Arc<dyn Refresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Fills in defaults: a reqwest transport, an in-memory store, the
    /// endpoint refresher and a logging listener.
    pub fn build(self) -> Result<AuthClient> {
        self.config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&self.config)?),
        };
        let refresher = self.refresher.unwrap_or_else(|| {
            Arc::new(EndpointRefresher::new(
                Arc::clone(&transport),
                self.config.clone(),
            ))
        });
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(CredentialStore::in_memory()));
        let listener = self
            .listener
            .unwrap_or_else(|| Arc::new(LogSessionListener::default()));

        Ok(AuthClient {
            inner: Arc::new(Inner {
                config: self.config,
                transport,
                credentials,
                refresher,
                listener,
                refresh: Mutex::new(RefreshState::default()),
            }),
        })
    }
}

impl AuthClient {
    pub fn builder(config: ClientConfig) -> AuthClientBuilder {
        AuthClientBuilder {
            config,
            transport: None,
            credentials: None,
            refresher: None,
            listener: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.inner.credentials
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.state().in_flight
    }

    /// Number of callers currently waiting for a refresh to finish.
    pub fn pending_requests(&self) -> usize {
        self.inner.state().pending.len()
    }

    /// Performs `request` and unwraps the envelope's `data` into `T`.
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.request_envelope(request).await?.into_data()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::post(path).json(body).map_err(|e| {
            TransportError::Request(format!("Failed to serialize request body: {}", e))
        })?;
        self.request(request).await
    }

    /// Performs `request` and returns the whole success envelope.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn request_envelope(&self, mut request: ApiRequest) -> Result<Envelope<Value>, ApiError> {
        let config = &self.inner.config;
        let url = config.resolve(&request.path)?;
        let bypass = self.bypasses_auth(&request);
        let mut renewed: Option<String> = None;

        loop {
            let sent_token = match renewed.take() {
                Some(token) => {
                    request.set_bearer(&token);
                    Some(token)
                }
                None => self.authorize(&mut request),
            };

            let response = self
                .inner
                .transport
                .send(&request, &url)
                .await
                .inspect_err(|e| warn!("{} {} failed: {}", request.method, request.path, e))?;
            let envelope = Envelope::from_slice(&response.body)?;

            match classify(envelope.code, config.success_code, config.expired_code) {
                Outcome::Success => return Ok(envelope),
                Outcome::Expired if !bypass && !request.retried => {
                    debug!("Credential expired for {} {}", request.method, request.path);
                    request.retried = true;
                    renewed = Some(self.renew(sent_token.as_deref()).await?);
                }
                Outcome::Expired if !bypass => {
                    debug!(
                        "Credential rejected again after refresh for {} {}",
                        request.method, request.path
                    );
                    return Err(ApiError::business(envelope));
                }
                _ => return Err(ApiError::business(envelope)),
            }
        }
    }

    fn bypasses_auth(&self, request: &ApiRequest) -> bool {
        request.skip_auth || self.inner.config.is_allow_listed(&request.path)
    }

    /// Attaches the current access token unless the request bypasses auth.
    /// Returns the token that was attached.
    fn authorize(&self, request: &mut ApiRequest) -> Option<String> {
        if self.bypasses_auth(request) {
            return None;
        }

        let token = self.inner.credentials.access_token()?;
        request.set_bearer(&token);
        Some(token)
    }

    /// Obtains a usable access token after `sent_token` was rejected.
    async fn renew(&self, sent_token: Option<&str>) -> Result<String, ApiError> {
        loop {
            let ticket = {
                let mut state = self.inner.state();
                if state.in_flight {
                    let (tx, rx) = oneshot::channel();
                    state.pending.push(move |outcome| {
                        // The caller may have given up; nothing to deliver then.
                        let _ = tx.send(outcome);
                    });
                    Ticket::Wait(rx)
                } else {
                    match (self.inner.credentials.access_token(), sent_token) {
                        (Some(current), sent) if sent != Some(current.as_str()) => {
                            Ticket::Retry(current)
                        }
                        (None, Some(_)) => Ticket::Expired,
                        _ => {
                            state.in_flight = true;
                            Ticket::Lead
                        }
                    }
                }
            };

            match ticket {
                Ticket::Lead => return self.lead_refresh().await,
                Ticket::Wait(rx) => {
                    debug!("Refresh already in flight, waiting for it");
                    match rx.await {
                        Ok(RefreshOutcome::Renewed(token)) => return Ok(token),
                        Ok(RefreshOutcome::Failed) => return Err(ApiError::SessionExpired),
                        Ok(RefreshOutcome::Abandoned) | Err(_) => {
                            debug!("Refresh was abandoned, trying again");
                        }
                    }
                }
                Ticket::Retry(token) => {
                    debug!("Credential was renewed since the request was sent, retrying");
                    return Ok(token);
                }
                Ticket::Expired => return Err(ApiError::SessionExpired),
            }
        }
    }

    async fn lead_refresh(&self) -> Result<String, ApiError> {
        let in_flight = InFlight {
            inner: &self.inner,
            settled: false,
        };

        let result = match self.inner.credentials.current() {
            Some(credential) => {
                info!("Access token expired, refreshing...");
                self.inner.refresher.refresh(&credential.refresh_token).await
            }
            None => {
                debug!("No credential to refresh");
                Err(ApiError::SessionExpired)
            }
        };

        match result {
            Ok(credential) => {
                let token = credential.access_token.clone();
                if let Err(e) = self.inner.credentials.set(credential) {
                    warn!("Failed to persist refreshed credential: {:#}", e);
                }
                let resumed = in_flight.settle(RefreshOutcome::Renewed(token.clone()));
                info!("Access token refreshed, resuming {} queued request(s)", resumed);
                Ok(token)
            }
            Err(e) => {
                warn!("Failed to refresh access token: {}", e);
                if let Err(e) = self.inner.credentials.clear() {
                    warn!("Failed to remove stored credential: {:#}", e);
                }
                let failed = in_flight.settle(RefreshOutcome::Failed);
                debug!("Failed {} queued request(s)", failed);
                self.inner.listener.on_session_expired();
                Err(ApiError::SessionExpired)
            }
        }
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the in-flight flag and takes the queue in one step, then
    /// resumes every waiter in enqueue order.
    fn finish_refresh(&self, outcome: RefreshOutcome) -> usize {
        let pending = {
            let mut state = self.state();
            state.in_flight = false;
            std::mem::take(&mut state.pending)
        };
        pending.drain(outcome)
    }
}

/// Marks the refresh owned by the current caller. Dropping it unsettled
/// (the caller's future was cancelled) hands the refresh back to the queued
/// callers, the first of which takes it over.
struct InFlight<'a> {
    inner: &'a Inner,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: RefreshOutcome) -> usize {
        self.settled = true;
        self.inner.finish_refresh(outcome)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Refresh abandoned before completion, releasing queued requests");
            self.inner.finish_refresh(RefreshOutcome::Abandoned);
        }
    }
}
