//! Authenticated HTTP calls against a single backend origin.
//!
//! Requests carry a short-lived bearer token. When the backend reports the
//! token as expired, one refresh is performed no matter how many calls are in
//! flight, and each affected call is retried once with the new token.

mod client;
pub mod classifier;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod executor;
pub mod refresh;
pub mod request;
pub mod telemetry;
pub mod token;

pub use classifier::{ExpiryClassifier, KeywordClassifier};
pub use client::ApiClient;
pub use config::Config;
pub use envelope::{OkCodes, ResponseEnvelope, unwrap_as, unwrap_envelope};
pub use errors::{Error, ErrorKind};
pub use executor::RequestExecutor;
pub use refresh::RefreshCoordinator;
pub use request::{Method, Request, RequestOptions};
pub use token::{FileTokenProvider, MemoryTokenProvider, TokenPair, TokenProvider};
