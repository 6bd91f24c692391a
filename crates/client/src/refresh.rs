//! Single-flight coordination of the refresh-token exchange.
//!
//! At most one `POST /auth/refresh` is in flight system-wide. The first
//! caller that needs a refresh becomes the leader and spawns the exchange;
//! every caller arriving while it runs joins as a waiter and receives the
//! same outcome. Refresh tokens rotate server-side, so two concurrent
//! exchanges would invalidate each other and cascade into forced logouts.

use crate::credentials::CredentialStore;
use huddle_types::SessionExpiredHandler;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Why a refresh cycle failed. Cloneable so one failure can be fanned out to
/// every waiter of the cycle.
#[derive(Debug, Clone, thiserror::Error)]
#[error("token refresh failed: {message}")]
pub(crate) struct RefreshFailed {
    message: String,
}

impl RefreshFailed {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

type RefreshOutcome = Result<String, RefreshFailed>;

/// Wire body of the refresh exchange.
#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Idle/Refreshing state machine guarding the token exchange.
///
/// The slot holds the receiver of the in-flight cycle's broadcast channel:
/// `None` means Idle, `Some` means Refreshing. The check-and-set happens
/// under a plain mutex that is never held across an await, so the decision
/// is atomic under true parallelism.
pub(crate) struct RefreshCoordinator {
    inflight: Arc<Mutex<Option<watch::Receiver<Option<RefreshOutcome>>>>>,
    job: RefreshJob,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        http: reqwest::Client,
        refresh_url: String,
        credentials: CredentialStore,
        on_expired: Option<Arc<dyn SessionExpiredHandler>>,
        timeout: Duration,
    ) -> Self {
        Self {
            inflight: Arc::new(Mutex::new(None)),
            job: RefreshJob {
                http,
                refresh_url,
                credentials,
                on_expired,
                timeout,
            },
        }
    }

    /// Obtain a fresh access token, joining an in-flight exchange if one is
    /// already running.
    ///
    /// On success the new token pair is already persisted. On failure the
    /// stored tokens are cleared and the session-expiry hook has fired —
    /// exactly once for the whole cycle, no matter how many callers waited.
    pub(crate) async fn acquire_valid_token(&self) -> RefreshOutcome {
        let mut rx = self.join_or_start();
        match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => outcome
                .clone()
                .unwrap_or_else(|| Err(RefreshFailed::new("refresh ended without an outcome"))),
            // Sender dropped without broadcasting (the task was aborted or
            // panicked); waiters must fail rather than hang.
            Err(_) => Err(RefreshFailed::new("refresh task ended prematurely")),
        }
    }

    fn join_or_start(&self) -> watch::Receiver<Option<RefreshOutcome>> {
        let mut slot = self.inflight.lock().unwrap();
        if let Some(rx) = slot.as_ref() {
            tracing::debug!("joining in-flight token refresh");
            return rx.clone();
        }

        let (tx, rx) = watch::channel(None);
        *slot = Some(rx.clone());
        drop(slot);

        tracing::debug!("starting token refresh");
        let job = self.job.clone();
        let inflight = Arc::clone(&self.inflight);
        // Detached task: cancelling a waiting caller must never abort the
        // exchange the other waiters depend on.
        tokio::spawn(async move {
            let reset = ResetToIdle(inflight);
            let outcome = job.run().await;
            // Close the contention window before broadcasting; callers
            // arriving from here on start a fresh cycle instead of reading
            // a stale outcome.
            drop(reset);
            let _ = tx.send(Some(outcome));
        });
        rx
    }
}

/// Returns the coordinator to Idle on drop. Runs during unwind too, so a
/// cycle that panics cannot leave later callers joined to a dead receiver.
struct ResetToIdle(Arc<Mutex<Option<watch::Receiver<Option<RefreshOutcome>>>>>);

impl Drop for ResetToIdle {
    fn drop(&mut self) {
        *self.0.lock().unwrap() = None;
    }
}

/// One refresh cycle: exchange, persist, and on failure expire the session.
#[derive(Clone)]
struct RefreshJob {
    http: reqwest::Client,
    refresh_url: String,
    credentials: CredentialStore,
    on_expired: Option<Arc<dyn SessionExpiredHandler>>,
    timeout: Duration,
}

impl RefreshJob {
    async fn run(&self) -> RefreshOutcome {
        // The deadline covers the whole exchange, body read included; a
        // server that answers with headers and then stalls the body must
        // not hold the coordinator in Refreshing forever.
        let exchanged = tokio::time::timeout(self.timeout, self.exchange())
            .await
            .unwrap_or_else(|_| Err(RefreshFailed::new("refresh timed out")));
        match exchanged {
            Ok(token) => {
                tracing::debug!("token refresh succeeded");
                Ok(token)
            }
            Err(failure) => {
                tracing::warn!(error = %failure, "token refresh failed; expiring session");
                self.credentials.clear_access_token().await;
                self.credentials.clear_refresh_token().await;
                self.notify_expired().await;
                Err(failure)
            }
        }
    }

    async fn exchange(&self) -> RefreshOutcome {
        let refresh_token = self
            .credentials
            .refresh_token()
            .await
            .ok_or_else(|| RefreshFailed::new("no refresh token stored"))?;

        let response = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| RefreshFailed::new(format!("refresh transport error: {e}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RefreshFailed::new(format!("refresh transport error: {e}")))?;
        if !status.is_success() {
            return Err(RefreshFailed::new(format!(
                "refresh rejected: {}",
                crate::client::error_message(status, &body)
            )));
        }

        let tokens: RefreshResponse = serde_json::from_slice(&body)
            .map_err(|e| RefreshFailed::new(format!("malformed refresh response: {e}")))?;

        // Persist before any waiter is released, so every retry reads an
        // already-durable credential.
        self.credentials.set_access_token(&tokens.access_token).await;
        if let Some(rotated) = &tokens.refresh_token {
            self.credentials.set_refresh_token(rotated).await;
        }
        Ok(tokens.access_token)
    }

    async fn notify_expired(&self) {
        let Some(handler) = &self.on_expired else {
            return;
        };
        let handler = Arc::clone(handler);
        // Run on its own task so a panicking hook is contained and logged
        // instead of poisoning the refresh cycle.
        let hook = tokio::spawn(async move { handler.on_session_expired().await });
        if let Err(e) = hook.await {
            tracing::warn!(error = %e, "session-expiry handler panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_failed_display() {
        let err = RefreshFailed::new("no refresh token stored");
        assert_eq!(
            err.to_string(),
            "token refresh failed: no refresh token stored"
        );
    }

    #[test]
    fn test_refresh_response_tolerates_missing_rotation() {
        let parsed: RefreshResponse =
            serde_json::from_str(r#"{"access_token":"T2"}"#).unwrap();
        assert_eq!(parsed.access_token, "T2");
        assert!(parsed.refresh_token.is_none());
    }

    #[test]
    fn test_refresh_request_wire_shape() {
        let body = serde_json::to_value(RefreshRequest {
            refresh_token: "R1",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"refresh_token": "R1"}));
    }
}
