use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::envelope::OkCodes;
use crate::errors::Error;
use crate::refresh::RefreshCoordinator;
use crate::request::{Request, RequestOptions};
use crate::token::TokenProvider;

/// Typed front door for the backend.
///
/// Every call goes through the [`RefreshCoordinator`], has its envelope
/// unwrapped (default ok set unless the call overrides it) and is
/// deserialized into the caller's type. Cloning is cheap and clones share
/// the same refresh state.
#[derive(Clone)]
pub struct ApiClient {
    coordinator: RefreshCoordinator,
    ok_codes: OkCodes,
}

impl ApiClient {
    pub fn new(config: Config, tokens: Arc<dyn TokenProvider>) -> Result<Self, Error> {
        Ok(Self::from_coordinator(RefreshCoordinator::new(config, tokens)?))
    }

    pub fn from_coordinator(coordinator: RefreshCoordinator) -> Self {
        Self {
            coordinator,
            ok_codes: OkCodes::default(),
        }
    }

    /// Envelope codes accepted when a call does not specify its own. The
    /// refresh endpoint is held to the same codes.
    pub fn with_ok_codes(mut self, ok_codes: impl Into<OkCodes>) -> Self {
        self.ok_codes = ok_codes.into();
        self.coordinator = self.coordinator.with_refresh_ok_codes(self.ok_codes.clone());
        self
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn tokens(&self) -> &Arc<dyn TokenProvider> {
        self.coordinator.tokens()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.send(Request::get(path), RequestOptions::default()).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Request::post(path).with_json(body)?, RequestOptions::default())
            .await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Request::put(path).with_json(body)?, RequestOptions::default())
            .await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Request::patch(path).with_json(body)?, RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.send(Request::delete(path), RequestOptions::default())
            .await
    }

    pub async fn send<T: DeserializeOwned>(
        &self,
        request: Request,
        mut options: RequestOptions,
    ) -> Result<T, Error> {
        if options.ok_codes.is_none() {
            options.ok_codes = Some(self.ok_codes.clone());
        }
        let data = self.coordinator.execute(&request, &options).await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn refresh(&self) -> bool {
        self.coordinator.refresh().await
    }

    pub fn sign_out(&self) {
        self.coordinator.sign_out();
    }
}
