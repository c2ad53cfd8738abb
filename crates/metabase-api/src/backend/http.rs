//! Blocking HTTP backend for a live Metabase instance.
//!
//! Authentication happens once, in [`HttpBackend::connect`]: an API key is
//! attached as `x-api-key`, while username/password credentials are
//! exchanged for a session token sent as `X-Metabase-Session` on every
//! subsequent request.

use crate::backend::Backend;
use crate::config::{ClientConfig, Credentials};
use crate::error::{Error, Result};
use crate::types::{
    Database, DatabaseRequest, PermissionsGroup, PermissionsGroupRequest, User,
    UserCreateRequest, UserUpdateRequest,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-api-key";
const SESSION_HEADER: &str = "X-Metabase-Session";

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
}

#[derive(Deserialize)]
struct Created {
    id: i64,
}

/// What a request is about, for error reporting.
struct Target<'a> {
    kind: &'a str,
    id: String,
}

impl<'a> Target<'a> {
    fn new(kind: &'a str, id: impl ToString) -> Self {
        Self {
            kind,
            id: id.to_string(),
        }
    }
}

/// Metabase backend speaking the REST API over HTTP.
///
/// # Example
///
/// ```no_run
/// use metabase_api::backend::http::HttpBackend;
/// use metabase_api::backend::Backend;
/// use metabase_api::{ClientConfig, Credentials};
///
/// let config = ClientConfig::new(
///     "http://localhost:3000",
///     Credentials::ApiKey("mb_xxx".into()),
/// );
/// let backend = HttpBackend::connect(&config).unwrap();
/// let me = backend.get_current_user().unwrap();
/// println!("Authenticated as {}", me.email);
/// ```
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// `{host}/api`
    api_base: String,
    /// Authentication header, set once connected.
    auth: Option<(&'static str, String)>,
    /// Extra headers from configuration.
    headers: Vec<(String, String)>,
}

impl HttpBackend {
    /// Validate the config, build the agent and authenticate.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        let mut backend = Self {
            agent,
            api_base: config.api_base(),
            auth: None,
            headers: config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        backend.auth = Some(match &config.credentials {
            Credentials::ApiKey(key) => (API_KEY_HEADER, key.clone()),
            Credentials::Session { username, password } => {
                (SESSION_HEADER, backend.sign_in(username, password)?)
            }
        });

        log::debug!("Connected to {}", backend.api_base);
        Ok(backend)
    }

    /// Get the API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn sign_in(&self, username: &str, password: &str) -> Result<String> {
        let body = self
            .send(
                Method::Post,
                "/session",
                Some(&SessionRequest { username, password }),
                &Target::new("session", username),
            )
            .map_err(|e| match e {
                Error::Status { status: 400, message } => Error::Unauthorized(message),
                other => other,
            })?;
        let session: SessionResponse = serde_json::from_str(&body)?;
        Ok(session.id)
    }

    fn decorate<B>(&self, mut request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        request = request.header("Accept", "application/json");
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some((name, value)) = &self.auth {
            request = request.header(*name, value.as_str());
        }
        request
    }

    /// Issue a request and return the body of a successful response.
    fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        target: &Target<'_>,
    ) -> Result<String> {
        let url = format!("{}{}", self.api_base, path);
        log::debug!("{} {}", method.as_str(), path);

        let response = match method {
            Method::Get => self.decorate(self.agent.get(&url)).call()?,
            Method::Delete => self.decorate(self.agent.delete(&url)).call()?,
            Method::Post | Method::Put => {
                let request = if matches!(method, Method::Post) {
                    self.agent.post(&url)
                } else {
                    self.agent.put(&url)
                };
                let request = self.decorate(request);
                match body {
                    Some(body) => request.send_json(body)?,
                    None => request.send_empty()?,
                }
            }
        };

        Self::check(response, target)
    }

    fn check(
        mut response: ureq::http::Response<ureq::Body>,
        target: &Target<'_>,
    ) -> Result<String> {
        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string()?;
        log::trace!("<- {status} ({} bytes)", text.len());

        match status {
            200..=299 => Ok(text),
            404 => Err(Error::not_found(target.kind, &target.id)),
            401 | 403 => Err(Error::Unauthorized(text)),
            _ => Err(Error::status(status, text)),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, target: &Target<'_>) -> Result<T> {
        let body = self.send::<()>(Method::Get, path, None, target)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn create<B: Serialize>(&self, path: &str, body: &B, kind: &str) -> Result<i64> {
        let body = self.send(Method::Post, path, Some(body), &Target::new(kind, ""))?;
        let created: Created = serde_json::from_str(&body)?;
        Ok(created.id)
    }
}

impl Backend for HttpBackend {
    fn get_database(&self, id: i64) -> Result<Database> {
        self.get_json(&format!("/database/{id}"), &Target::new("database", id))
    }

    fn create_database(&self, request: &DatabaseRequest) -> Result<i64> {
        self.create("/database", request, "database")
    }

    fn update_database(&self, id: i64, request: &DatabaseRequest) -> Result<()> {
        self.send(
            Method::Put,
            &format!("/database/{id}"),
            Some(request),
            &Target::new("database", id),
        )
        .map(|_| ())
    }

    fn delete_database(&self, id: i64) -> Result<()> {
        self.send::<()>(
            Method::Delete,
            &format!("/database/{id}"),
            None,
            &Target::new("database", id),
        )
        .map(|_| ())
    }

    fn get_user(&self, id: i64) -> Result<User> {
        self.get_json(&format!("/user/{id}"), &Target::new("user", id))
    }

    fn get_current_user(&self) -> Result<User> {
        self.get_json("/user/current", &Target::new("user", "current"))
    }

    fn create_user(&self, request: &UserCreateRequest) -> Result<i64> {
        self.create("/user", request, "user")
    }

    fn update_user(&self, id: i64, request: &UserUpdateRequest) -> Result<()> {
        self.send(
            Method::Put,
            &format!("/user/{id}"),
            Some(request),
            &Target::new("user", id),
        )
        .map(|_| ())
    }

    fn reactivate_user(&self, id: i64) -> Result<()> {
        let result = self.send::<()>(
            Method::Put,
            &format!("/user/{id}/reactivate"),
            None,
            &Target::new("user", id),
        );
        // Metabase answers 400 when the user is already active.
        match result {
            Err(Error::Status { status: 400, .. })
                if self.get_user(id).is_ok_and(|u| u.is_active) =>
            {
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }

    fn disable_user(&self, id: i64) -> Result<()> {
        self.send::<()>(
            Method::Delete,
            &format!("/user/{id}"),
            None,
            &Target::new("user", id),
        )
        .map(|_| ())
    }

    fn get_permissions_group(&self, id: i64) -> Result<PermissionsGroup> {
        self.get_json(
            &format!("/permissions/group/{id}"),
            &Target::new("permissions group", id),
        )
    }

    fn create_permissions_group(&self, request: &PermissionsGroupRequest) -> Result<i64> {
        self.create("/permissions/group", request, "permissions group")
    }

    fn update_permissions_group(&self, id: i64, request: &PermissionsGroupRequest) -> Result<()> {
        self.send(
            Method::Put,
            &format!("/permissions/group/{id}"),
            Some(request),
            &Target::new("permissions group", id),
        )
        .map(|_| ())
    }

    fn delete_permissions_group(&self, id: i64) -> Result<()> {
        self.send::<()>(
            Method::Delete,
            &format!("/permissions/group/{id}"),
            None,
            &Target::new("permissions group", id),
        )
        .map(|_| ())
    }
}
