use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::Client;
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::classifier::{ExpiryClassifier, KeywordClassifier};
use crate::config::Config;
use crate::envelope::{OkCodes, unwrap_as, unwrap_envelope};
use crate::errors::Error;
use crate::executor::{Attempt, RequestExecutor};
use crate::request::{Method, Request, RequestOptions};
use crate::telemetry::refresh::{RefreshOutcome, RefreshTelemetry};
use crate::token::{RefreshedTokens, TokenProvider};

use super::RequestOutcome;

type SharedRefresh = Shared<BoxFuture<'static, bool>>;

/// The refresh currently in flight. Its presence in the slot is the
/// "refreshing" state; an empty slot means idle.
struct Episode {
    id: Uuid,
    outcome: SharedRefresh,
}

type EpisodeSlot = Arc<Mutex<Option<Episode>>>;

/// Authenticated requests with single-flight credential refresh.
///
/// When a call fails with an expired credential, the first caller starts a
/// refresh on a background task and every other caller that hits the same
/// expiry awaits that same task. Once it resolves, each caller re-sends its
/// request exactly once. A second expiry on the retry, or a failed refresh,
/// ends in [`Error::AuthExpired`].
///
/// Refreshes run on a spawned task, so calls must be made from within a Tokio
/// runtime. Clones share the same credentials and refresh episode.
#[derive(Clone)]
pub struct RefreshCoordinator {
    executor: RequestExecutor,
    refresher: Arc<Refresher>,
    tokens: Arc<dyn TokenProvider>,
    classifier: Arc<dyn ExpiryClassifier>,
    episode: EpisodeSlot,
}

impl RefreshCoordinator {
    pub fn new(config: Config, tokens: Arc<dyn TokenProvider>) -> Result<Self, Error> {
        Self::with_http_client(config, tokens, Client::new())
    }

    pub fn with_http_client(
        config: Config,
        tokens: Arc<dyn TokenProvider>,
        http_client: Client,
    ) -> Result<Self, Error> {
        let refresh_path = config.refresh_path.clone();
        let refresh_ok_codes = OkCodes::new(config.refresh_ok_codes.iter().copied());
        // The refresh call goes through its own executor so it can never
        // re-enter the coordinator.
        let refresh_executor =
            RequestExecutor::with_http_client(config.clone(), http_client.clone())?;
        let executor = RequestExecutor::with_http_client(config, http_client)?
            .with_credentials(Arc::clone(&tokens));
        Ok(Self {
            executor,
            refresher: Arc::new(Refresher {
                executor: refresh_executor,
                tokens: Arc::clone(&tokens),
                path: refresh_path,
                ok_codes: refresh_ok_codes,
            }),
            tokens,
            classifier: Arc::new(KeywordClassifier::default()),
            episode: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_classifier(mut self, classifier: impl ExpiryClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Envelope codes accepted from the refresh endpoint.
    pub fn with_refresh_ok_codes(mut self, ok_codes: impl Into<OkCodes>) -> Self {
        let refresher = Refresher {
            ok_codes: ok_codes.into(),
            ..Refresher::clone(&self.refresher)
        };
        self.refresher = Arc::new(refresher);
        self
    }

    pub fn tokens(&self) -> &Arc<dyn TokenProvider> {
        &self.tokens
    }

    pub fn config(&self) -> &Config {
        self.executor.config()
    }

    /// True while a refresh episode is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.episode
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: &RequestOptions,
    ) -> Result<Value, Error> {
        let mut request = Request::new(method, path);
        request.body = body;
        self.execute(&request, options).await
    }

    pub async fn execute(
        &self,
        request: &Request,
        options: &RequestOptions,
    ) -> Result<Value, Error> {
        let started = Instant::now();
        let mut attempts: u8 = 0;
        let mut is_retry = false;

        let result = loop {
            attempts += 1;
            let Attempt { bearer, result } = self.attempt(request, options, is_retry).await;
            let err = match result {
                Ok(value) => break Ok(value),
                Err(err) => err,
            };
            if !self.classifier.is_expired_credential(&err) {
                break Err(err);
            }
            if is_retry {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    error = %err,
                    "request.expired_after_refresh"
                );
                break Err(Error::auth_expired(format!(
                    "credential rejected again after refresh ({})",
                    err
                )));
            }
            if !self.await_fresh_credential(bearer.as_deref()).await {
                break Err(Error::auth_expired("credential refresh failed"));
            }
            info!(method = %request.method, path = %request.path, "request.retry");
            is_retry = true;
        };

        RequestOutcome {
            method: request.method,
            path: request.path.clone(),
            attempts,
            refreshed: is_retry,
            success: result.is_ok(),
            elapsed: started.elapsed(),
        }
        .log();
        result
    }

    /// Refresh the credential pair, joining a refresh already in flight.
    ///
    /// Returns `false` when the refresh failed, in which case both
    /// credentials have been cleared.
    pub async fn refresh(&self) -> bool {
        self.join_or_start("explicit").await
    }

    /// Forget both credentials.
    pub fn sign_out(&self) {
        info!("tokens.sign_out");
        self.tokens.clear_all();
    }

    async fn attempt(
        &self,
        request: &Request,
        options: &RequestOptions,
        is_retry: bool,
    ) -> Attempt {
        debug!(
            method = %request.method,
            path = %request.path,
            is_retry,
            "request.attempt"
        );
        let mut attempt = self.executor.attempt(request, options).await;
        if let Some(ok_codes) = &options.ok_codes {
            attempt.result = attempt
                .result
                .and_then(|payload| unwrap_envelope(payload, ok_codes));
        }
        attempt
    }

    async fn await_fresh_credential(&self, sent: Option<&str>) -> bool {
        // A different stored token means a refresh already finished after
        // this attempt was sent.
        if let Some(current) = self.tokens.access_token().filter(|t| !t.is_empty())
            && sent != Some(current.as_str())
        {
            debug!("credential already rotated; retrying without refresh");
            return true;
        }
        self.join_or_start("expired_credential").await
    }

    fn join_or_start(&self, context: &str) -> SharedRefresh {
        let mut slot = self.episode.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(episode) = slot.as_ref() {
            RefreshTelemetry::new(episode.id, context).emit_joined();
            return episode.outcome.clone();
        }

        let id = Uuid::new_v4();
        let telemetry = RefreshTelemetry::new(id, context);
        let refresher = Arc::clone(&self.refresher);
        let release = EpisodeRelease {
            slot: Arc::clone(&self.episode),
            id,
        };
        let handle = tokio::spawn(async move {
            let _release = release;
            refresher.run(&telemetry).await
        });
        let outcome = handle
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    error!(error = %e, "refresh task did not complete");
                    false
                })
            })
            .boxed()
            .shared();
        *slot = Some(Episode {
            id,
            outcome: outcome.clone(),
        });
        outcome
    }
}

/// Returns the slot to idle when the refresh task ends, even by panic.
struct EpisodeRelease {
    slot: EpisodeSlot,
    id: Uuid,
}

impl Drop for EpisodeRelease {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|episode| episode.id == self.id) {
            *slot = None;
        }
    }
}

/// Performs the physical refresh call and persists its result.
#[derive(Clone)]
struct Refresher {
    executor: RequestExecutor,
    tokens: Arc<dyn TokenProvider>,
    path: String,
    ok_codes: OkCodes,
}

impl Refresher {
    async fn run(&self, telemetry: &RefreshTelemetry) -> bool {
        telemetry.emit_start();
        let Some(refresh_token) = self.tokens.refresh_token().filter(|t| !t.is_empty()) else {
            telemetry.emit_failure(&"no refresh token stored");
            self.tokens.clear_all();
            return false;
        };

        let request = Request::post(self.path.as_str())
            .with_body(json!({ "refresh_token": refresh_token }));
        let refreshed = self
            .executor
            .execute(&request, &RequestOptions::default())
            .await
            .and_then(|payload| unwrap_as::<RefreshedTokens>(payload, &self.ok_codes));

        match refreshed {
            Ok(RefreshedTokens {
                token,
                refresh_token,
            }) if !token.is_empty() => {
                self.tokens.set_access_token(token);
                let outcome = match refresh_token.filter(|t| !t.is_empty()) {
                    Some(rotated) => {
                        self.tokens.set_refresh_token(rotated);
                        RefreshOutcome::Rotated
                    }
                    None => RefreshOutcome::Refreshed,
                };
                telemetry.emit_success(outcome);
                true
            }
            Ok(_) => {
                telemetry.emit_failure(&"refresh response carried an empty token");
                self.tokens.clear_all();
                false
            }
            Err(err) => {
                telemetry.emit_failure(&err);
                self.tokens.clear_all();
                false
            }
        }
    }
}
