//! HTTP client for the admin backend.
//!
//! Every request goes through one cookie jar, so once the login response
//! sets the session cookie all later calls carry it.

use std::sync::{Arc, RwLock};

use api_types::{
    crm::{CrmConfiguration, CrmFieldAttrs},
    envelope::{Envelope, ErrorBody},
    users::{UserAttrs, UsersSnapshot},
};
use reqwest::{
    Method, Url,
    cookie::{CookieStore, Jar},
    header::HeaderValue,
};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("invalid url: {0}")]
    Url(String),
    /// A 2xx answer whose body does not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("server unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// `true` for failures where the request never got an answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Cookie store whose jar can be swapped out on logout.
#[derive(Debug, Default)]
struct SessionCookies(RwLock<Arc<Jar>>);

impl SessionCookies {
    fn current(&self) -> Arc<Jar> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn reset(&self) {
        let mut guard = self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(Jar::default());
    }
}

impl CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.current().set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.current().cookies(url)
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
    cookies: Arc<SessionCookies>,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        // `Url::join` drops the last segment unless the base ends with a slash.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalized).map_err(|err| ClientError::Url(format!("{base_url}: {err}")))?;

        let cookies = Arc::new(SessionCookies::default());
        let http = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .build()?;

        Ok(Self {
            base_url,
            http,
            cookies,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ClientError::Url(format!("{path}: {err}")))
    }

    /// `Cookie` header value the jar would send to the backend.
    pub fn cookie_header(&self) -> Option<String> {
        self.cookies
            .cookies(&self.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Loads a previously captured `Cookie` header back into the jar.
    pub fn restore_cookies(&self, header: &str) {
        let jar = self.cookies.current();
        for pair in header.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
            jar.add_cookie_str(pair, &self.base_url);
        }
    }

    pub fn clear_cookies(&self) {
        self.cookies.reset();
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError> {
        tracing::debug!(%method, %url, "backend request");

        let mut req = self.http.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let res = req.send().await?;

        if res.status().is_success() {
            return Ok(res);
        }

        let status = res.status();
        let message = res
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| "unknown error".to_string());

        let err = match status.as_u16() {
            401 => ClientError::Unauthorized,
            403 => ClientError::Forbidden,
            404 => ClientError::NotFound,
            409 => ClientError::Conflict(message),
            422 => ClientError::Validation(message),
            _ => ClientError::Server(message),
        };
        Err(err)
    }

    async fn json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let res = self.send(method, url, body).await?;
        res.json::<T>().await.map_err(|err| {
            if err.is_decode() {
                ClientError::Decode(err.to_string())
            } else {
                ClientError::Transport(err)
            }
        })
    }

    /// Posts login credentials to `url` and returns the raw JSON answer.
    ///
    /// The url is absolute because the federated identity provider does not
    /// live under the backend base url.
    pub async fn post_login<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<serde_json::Value, ClientError> {
        self.json(Method::POST, url, Some(body)).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let url = self.endpoint("logout")?;
        self.send::<()>(Method::GET, url, None).await?;
        Ok(())
    }

    pub async fn crm_configuration(&self) -> Result<CrmConfiguration, ClientError> {
        let url = self.endpoint("crm-configuration")?;
        self.json::<(), _>(Method::GET, url, None).await
    }

    pub async fn create_crm_field(
        &self,
        admin_id: &str,
        campaign_id: &str,
        attrs: &CrmFieldAttrs,
    ) -> Result<Envelope, ClientError> {
        let url = self.endpoint(&format!(
            "{admin_id}/campaign/{campaign_id}/crm-field/create"
        ))?;
        self.json(Method::POST, url, Some(attrs)).await
    }

    pub async fn edit_crm_field(
        &self,
        admin_id: &str,
        campaign_id: &str,
        field_id: &str,
        attrs: &CrmFieldAttrs,
    ) -> Result<Envelope, ClientError> {
        let url = self.endpoint(&format!(
            "{admin_id}/campaign/{campaign_id}/crm-field/{field_id}/edit"
        ))?;
        self.json(Method::PATCH, url, Some(attrs)).await
    }

    pub async fn delete_crm_field(
        &self,
        admin_id: &str,
        campaign_id: &str,
        field_id: &str,
    ) -> Result<Envelope, ClientError> {
        let url = self.endpoint(&format!(
            "{admin_id}/campaign/{campaign_id}/crm-field/{field_id}/delete"
        ))?;
        self.json::<(), _>(Method::DELETE, url, None).await
    }

    pub async fn users(&self) -> Result<UsersSnapshot, ClientError> {
        let url = self.endpoint("users")?;
        self.json::<(), _>(Method::GET, url, None).await
    }

    pub async fn register_user(
        &self,
        admin_id: &str,
        attrs: &UserAttrs,
    ) -> Result<Envelope, ClientError> {
        let url = self.endpoint(&format!("{admin_id}/user/register"))?;
        self.json(Method::POST, url, Some(attrs)).await
    }

    pub async fn edit_user(
        &self,
        admin_id: &str,
        user_id: &str,
        attrs: &UserAttrs,
    ) -> Result<Envelope, ClientError> {
        let url = self.endpoint(&format!("{admin_id}/user/{user_id}/edit"))?;
        self.json(Method::PATCH, url, Some(attrs)).await
    }

    pub async fn delete_user(&self, admin_id: &str, user_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("{admin_id}/user/{user_id}/delete"))?;
        self.send::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }
}
