//! Collaborators the registration workflow talks to.
//!
//! The identity provider, the token endpoint and the native calling SDK are
//! outside this crate. Each is reduced to a trait with a fixed success and
//! failure contract, so operations can be tested against scripted doubles
//! (see [`crate::mocks`]).
//!
//! The traits return `Pin<Box<dyn Future>>` instead of using `async fn` so
//! they can be held as `Arc<dyn Trait>`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Boxed future returned by collaborator calls
pub type ServiceFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Identity provider login/logout.
pub trait AuthProvider: Send + Sync {
    /// Sign the user in
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the user cancels or the provider fails.
    fn login(&self) -> ServiceFuture<'_, (), AuthError>;

    /// Sign the user out
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the provider fails.
    fn logout(&self) -> ServiceFuture<'_, (), AuthError>;
}

/// Exchanges the signed-in user's credentials for a calling access token.
pub trait TokenProvider: Send + Sync {
    /// Fetch a fresh access token.
    ///
    /// An empty string is a valid response meaning "no token issued".
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if the request fails.
    fn fetch_access_token(&self) -> ServiceFuture<'_, String, TokenError>;
}

/// Native calling SDK.
pub trait VoiceClient: Send + Sync {
    /// Register this client endpoint for incoming calls
    ///
    /// # Errors
    ///
    /// Returns [`VoiceError`] if the SDK rejects the registration.
    fn register<'a>(&'a self, access_token: &'a str) -> ServiceFuture<'a, (), VoiceError>;

    /// Remove the registration of this client endpoint
    ///
    /// # Errors
    ///
    /// Returns [`VoiceError`] if the SDK rejects the request.
    fn unregister<'a>(&'a self, access_token: &'a str) -> ServiceFuture<'a, (), VoiceError>;
}

/// Login provider failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The user dismissed the login prompt
    #[error("Login was cancelled by the user")]
    Cancelled,

    /// The identity provider returned an error
    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// Access token endpoint failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The endpoint answered with a non-success status
    #[error("Token endpoint returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The request never produced a response
    #[error("Token request failed: {0}")]
    Transport(String),
}

/// Error reported by the native calling SDK
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct VoiceError {
    /// SDK error code, kept on the serialized error
    pub code: String,
    /// Human-readable description
    pub message: String,
}

impl VoiceError {
    /// Create an SDK error
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The collaborators operations are built against.
#[derive(Clone)]
pub struct Services {
    /// Login provider
    pub auth: Arc<dyn AuthProvider>,
    /// Access token endpoint
    pub tokens: Arc<dyn TokenProvider>,
    /// Native calling SDK
    pub voice: Arc<dyn VoiceClient>,
}

impl Services {
    /// Bundle the three collaborators
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        tokens: Arc<dyn TokenProvider>,
        voice: Arc<dyn VoiceClient>,
    ) -> Self {
        Self { auth, tokens, voice }
    }
}
