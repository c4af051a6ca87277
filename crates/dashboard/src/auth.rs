//! Login and logout.
//!
//! One [`AuthMode`] is active per deployment. The flow moves through
//! `Anonymous -> Authenticating -> Authenticated | Failed`; a failure can be
//! retried or dismissed with [`AuthFlow::reset_failure_flag`], and logout
//! always returns to `Anonymous`.

use api_types::{
    auth::{FederatedLoginRequest, Identity, LoginRequest},
    envelope::{Envelope, ResponseStatus},
};
use reqwest::Url;
use thiserror::Error;

use crate::{
    client::{Client, ClientError},
    session::{Session, SessionError, SessionStorage},
    validation::{FormValues, ValidationErrors, login_schema},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// External identity provider; the backend is not told about logouts.
    Federated {
        endpoint: String,
        api_key: Option<String>,
    },
    /// Token-issuing API at `post-jwt-login`.
    Jwt,
    /// Generic API at `auth/signin` answering with a status envelope.
    Api,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated(Session),
    Failed(String),
}

impl AuthState {
    fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Authenticating => "authenticating",
            Self::Authenticated(_) => "authenticated",
            Self::Failed(_) => "failed",
        }
    }
}

/// Navigation targets handed to the caller's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    Login,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    fn to_form(&self) -> FormValues {
        FormValues::new()
            .with("email", self.email.as_str())
            .with("password", self.password.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Invalid(ValidationErrors),
    #[error("{0}")]
    Rejected(String),
    #[error("unexpected login response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to persist session: {0}")]
    Session(#[from] SessionError),
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

pub struct AuthFlow<S> {
    client: Client,
    mode: AuthMode,
    store: S,
    state: AuthState,
    failure: Option<String>,
}

impl<S: SessionStorage> AuthFlow<S> {
    pub fn new(client: Client, mode: AuthMode, store: S) -> Self {
        Self {
            client,
            mode,
            store,
            state: AuthState::Anonymous,
            failure: None,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn mode(&self) -> &AuthMode {
        &self.mode
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Sticky message of the last failed login.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Restores a persisted session at startup.
    pub fn bootstrap(&mut self) -> Result<Option<&Session>, AuthError> {
        let Some(session) = self.store.load()? else {
            return Ok(None);
        };
        if let Some(cookie) = &session.cookie {
            self.client.restore_cookies(cookie);
        }
        tracing::info!(user = session.identity.display_name(), "session restored");
        self.state = AuthState::Authenticated(session);
        Ok(self.session())
    }

    pub async fn submit_login(
        &mut self,
        credentials: &Credentials,
        navigate: impl FnOnce(Route),
    ) -> Result<Session, AuthError> {
        login_schema()
            .validate(&credentials.to_form())
            .map_err(AuthError::Invalid)?;

        match self.state {
            AuthState::Anonymous | AuthState::Failed(_) => {}
            ref other => {
                return Err(AuthError::InvalidTransition {
                    action: "log in",
                    state: other.name(),
                });
            }
        }
        self.state = AuthState::Authenticating;

        let identity = match self.request_identity(credentials).await {
            Ok(identity) => identity,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };

        let session = Session {
            identity,
            cookie: self.client.cookie_header(),
        };
        if let Err(err) = self.store.save(&session) {
            self.client.clear_cookies();
            let err = AuthError::from(err);
            self.fail(&err);
            return Err(err);
        }

        tracing::info!(user = session.identity.display_name(), "login succeeded");
        self.failure = None;
        self.state = AuthState::Authenticated(session.clone());
        navigate(Route::Landing);
        Ok(session)
    }

    fn fail(&mut self, err: &AuthError) {
        let message = err.to_string();
        tracing::warn!("login failed: {message}");
        self.failure = Some(message.clone());
        self.state = AuthState::Failed(message);
    }

    async fn request_identity(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let result = match &self.mode {
            AuthMode::Federated { endpoint, api_key } => {
                let mut url = Url::parse(endpoint)
                    .map_err(|err| ClientError::Url(format!("{endpoint}: {err}")))?;
                if let Some(key) = api_key {
                    url.query_pairs_mut().append_pair("key", key);
                }
                let body = FederatedLoginRequest {
                    email: credentials.email.clone(),
                    password: credentials.password.clone(),
                    return_secure_token: true,
                };
                self.client.post_login(url, &body).await
            }
            AuthMode::Jwt => {
                let url = self.client.endpoint("post-jwt-login")?;
                self.client.post_login(url, &login_request(credentials)).await
            }
            AuthMode::Api => {
                let url = self.client.endpoint("auth/signin")?;
                self.client.post_login(url, &login_request(credentials)).await
            }
        };

        let value = match result {
            Ok(value) => value,
            Err(ClientError::Unauthorized | ClientError::Forbidden) => {
                return Err(AuthError::Rejected("Invalid email or password".to_string()));
            }
            Err(ClientError::Validation(message) | ClientError::Conflict(message)) => {
                return Err(AuthError::Rejected(message));
            }
            Err(err) => return Err(err.into()),
        };

        if self.mode != AuthMode::Api {
            return Ok(serde_json::from_value(value)?);
        }

        let envelope: Envelope = serde_json::from_value(value)?;
        match (envelope.status, envelope.data) {
            (Some(ResponseStatus::Success), Some(data)) => Ok(serde_json::from_value(data)?),
            (_, _) => Err(AuthError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "Login failed".to_string()),
            )),
        }
    }

    /// Clears the sticky failure flag so an old error is not shown again.
    pub fn reset_failure_flag(&mut self) {
        self.failure = None;
        if matches!(self.state, AuthState::Failed(_)) {
            self.state = AuthState::Anonymous;
        }
    }

    /// Logs out. The local session is cleared first and regardless of the
    /// backend notification, which is best effort.
    pub async fn logout(&mut self, navigate: impl FnOnce(Route)) -> Result<(), AuthError> {
        let cleared = self.store.clear();

        if !matches!(self.mode, AuthMode::Federated { .. }) {
            if let Err(err) = self.client.logout().await {
                tracing::warn!("logout notification failed: {err}");
            }
        }

        self.client.clear_cookies();
        self.failure = None;
        self.state = AuthState::Anonymous;
        tracing::info!("logged out");
        navigate(Route::Login);

        cleared.map_err(AuthError::from)
    }
}

fn login_request(credentials: &Credentials) -> LoginRequest {
    LoginRequest {
        email: credentials.email.clone(),
        password: credentials.password.clone(),
    }
}
