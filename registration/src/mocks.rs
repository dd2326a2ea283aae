//! Scripted collaborators for tests and the demo binary.
//!
//! Each mock answers with a fixed outcome chosen at construction and counts
//! the calls it receives, so tests can assert that a guard prevented an SDK
//! call or that a compensation ran.

use crate::config::Scenario;
use crate::services::{
    AuthError, AuthProvider, ServiceFuture, Services, TokenError, TokenProvider, VoiceClient, VoiceError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock login provider.
#[derive(Debug, Default)]
pub struct MockAuthProvider {
    login_error: Option<AuthError>,
    logout_error: Option<AuthError>,
    logins: AtomicUsize,
    logouts: AtomicUsize,
}

impl MockAuthProvider {
    /// A provider where login and logout succeed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose login fails with `error`
    #[must_use]
    pub fn failing_login(error: AuthError) -> Self {
        Self {
            login_error: Some(error),
            ..Self::default()
        }
    }

    /// Make logout fail with `error`
    #[must_use]
    pub fn with_failing_logout(mut self, error: AuthError) -> Self {
        self.logout_error = Some(error);
        self
    }

    /// Number of login calls
    #[must_use]
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    /// Number of logout calls
    #[must_use]
    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

impl AuthProvider for MockAuthProvider {
    fn login(&self) -> ServiceFuture<'_, (), AuthError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        let outcome = self.login_error.clone().map_or(Ok(()), Err);
        Box::pin(async move { outcome })
    }

    fn logout(&self) -> ServiceFuture<'_, (), AuthError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        let outcome = self.logout_error.clone().map_or(Ok(()), Err);
        Box::pin(async move { outcome })
    }
}

/// Mock access token endpoint.
#[derive(Debug)]
pub struct MockTokenProvider {
    response: Result<String, TokenError>,
    fetches: AtomicUsize,
}

impl MockTokenProvider {
    /// An endpoint that issues `token`; an empty string means no token
    #[must_use]
    pub fn issuing(token: impl Into<String>) -> Self {
        Self {
            response: Ok(token.into()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// An endpoint that fails with `error`
    #[must_use]
    pub const fn failing(error: TokenError) -> Self {
        Self {
            response: Err(error),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of fetches
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl TokenProvider for MockTokenProvider {
    fn fetch_access_token(&self) -> ServiceFuture<'_, String, TokenError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let response = self.response.clone();
        Box::pin(async move { response })
    }
}

/// Mock native calling SDK.
///
/// Records the token every call was made with.
#[derive(Debug, Default)]
pub struct MockVoiceClient {
    register_error: Option<VoiceError>,
    unregister_error: Option<VoiceError>,
    registrations: Mutex<Vec<String>>,
    unregistrations: Mutex<Vec<String>>,
}

impl MockVoiceClient {
    /// An SDK that accepts every call
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An SDK whose register fails with `error`
    #[must_use]
    pub fn failing_register(error: VoiceError) -> Self {
        Self {
            register_error: Some(error),
            ..Self::default()
        }
    }

    /// Make unregister fail with `error`
    #[must_use]
    pub fn with_failing_unregister(mut self, error: VoiceError) -> Self {
        self.unregister_error = Some(error);
        self
    }

    /// Tokens of every register call, in order
    #[must_use]
    pub fn registrations(&self) -> Vec<String> {
        self.registrations.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Tokens of every unregister call, in order
    #[must_use]
    pub fn unregistrations(&self) -> Vec<String> {
        self.unregistrations.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

fn record(calls: &Mutex<Vec<String>>, access_token: &str) {
    if let Ok(mut calls) = calls.lock() {
        calls.push(access_token.to_string());
    }
}

impl VoiceClient for MockVoiceClient {
    fn register<'a>(&'a self, access_token: &'a str) -> ServiceFuture<'a, (), VoiceError> {
        record(&self.registrations, access_token);
        let outcome = self.register_error.clone().map_or(Ok(()), Err);
        Box::pin(async move { outcome })
    }

    fn unregister<'a>(&'a self, access_token: &'a str) -> ServiceFuture<'a, (), VoiceError> {
        record(&self.unregistrations, access_token);
        let outcome = self.unregister_error.clone().map_or(Ok(()), Err);
        Box::pin(async move { outcome })
    }
}

/// The three mocks together, kept as concrete types for inspection.
#[derive(Debug, Clone)]
pub struct MockServices {
    /// Login provider
    pub auth: Arc<MockAuthProvider>,
    /// Token endpoint
    pub tokens: Arc<MockTokenProvider>,
    /// Calling SDK
    pub voice: Arc<MockVoiceClient>,
}

impl MockServices {
    /// Bundle three mocks
    #[must_use]
    pub fn new(auth: MockAuthProvider, tokens: MockTokenProvider, voice: MockVoiceClient) -> Self {
        Self {
            auth: Arc::new(auth),
            tokens: Arc::new(tokens),
            voice: Arc::new(voice),
        }
    }

    /// Mocks for which every call succeeds and the token is `"token-123"`
    #[must_use]
    pub fn succeeding() -> Self {
        Self::new(
            MockAuthProvider::new(),
            MockTokenProvider::issuing("token-123"),
            MockVoiceClient::new(),
        )
    }

    /// Mocks scripted for one demo scenario
    #[must_use]
    pub fn for_scenario(scenario: Scenario) -> Self {
        match scenario {
            Scenario::Success => Self::succeeding(),
            Scenario::LoginFails => Self::new(
                MockAuthProvider::failing_login(AuthError::Cancelled),
                MockTokenProvider::issuing("token-123"),
                MockVoiceClient::new(),
            ),
            Scenario::TokenFails => Self::new(
                MockAuthProvider::new(),
                MockTokenProvider::failing(TokenError::Status { status: 503 }),
                MockVoiceClient::new(),
            ),
            Scenario::RegisterFails => Self::new(
                MockAuthProvider::new(),
                MockTokenProvider::issuing("token-123"),
                MockVoiceClient::failing_register(VoiceError::new("31301", "Registration failed")),
            ),
            Scenario::EmptyToken => Self::new(
                MockAuthProvider::new(),
                MockTokenProvider::issuing(""),
                MockVoiceClient::new(),
            ),
        }
    }

    /// The mocks as trait objects
    #[must_use]
    pub fn services(&self) -> Services {
        Services::new(
            Arc::clone(&self.auth) as Arc<dyn AuthProvider>,
            Arc::clone(&self.tokens) as Arc<dyn TokenProvider>,
            Arc::clone(&self.voice) as Arc<dyn VoiceClient>,
        )
    }
}
