//! # metabase-api
//!
//! Blocking client for the administrative parts of the Metabase REST API.
//!
//! This crate provides:
//! - Typed request/response objects for databases, users and permissions groups
//! - A [`Backend`](backend::Backend) trait with an HTTP implementation and an
//!   in-memory [`MockBackend`] for tests
//! - A [`Client`] facade that is built once and shared by reference
//!
//! ## Example
//!
//! ```no_run
//! use metabase_api::{Client, ClientConfig, Credentials};
//!
//! let config = ClientConfig::new(
//!     "http://localhost:3000",
//!     Credentials::Session {
//!         username: "admin@example.com".into(),
//!         password: "secret".into(),
//!     },
//! );
//!
//! // Signs in once; the session token is reused for every call
//! let client = Client::connect(&config).expect("could not connect");
//!
//! let db = client.get_database(1).expect("lookup failed");
//! println!("{} ({})", db.name, db.engine);
//! ```
//!
//! ## Errors
//!
//! Every call returns [`Result`]. A missing object is always reported as
//! [`Error::NotFound`], so callers can treat it as "gone" rather than as a
//! failure.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod types;

pub use config::{ClientConfig, Credentials, DEFAULT_TIMEOUT};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    Database, DatabaseRequest, Details, Engine, GROUP_ADMINISTRATORS, GROUP_ALL_USERS,
    GroupMembership, PermissionsGroup, PermissionsGroupRequest, SCHEDULE_CACHE_FIELD_VALUES,
    SCHEDULE_METADATA_SYNC, ScheduleSettings, ScheduleType, Schedules, User, UserCreateRequest,
    UserUpdateRequest,
};

use backend::Backend;
pub use backend::{MOCK_REDACTED, MockBackend};
use backend::http::HttpBackend;

/// High-level client for Metabase operations.
///
/// The client owns one backend for its whole lifetime; construct it once
/// and pass `&Client` to whatever needs to talk to Metabase.
///
/// # Example
///
/// ```
/// use metabase_api::{Client, MockBackend, PermissionsGroupRequest};
///
/// let client = Client::with_backend(Box::new(MockBackend::with_reserved_groups()));
///
/// let id = client
///     .create_permissions_group(&PermissionsGroupRequest { name: "Analysts".into() })
///     .unwrap();
/// assert_eq!(client.get_permissions_group(id).unwrap().name, "Analysts");
/// ```
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Connect to a live Metabase instance over HTTP.
    ///
    /// Username/password credentials are exchanged for a session here.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            backend: Box::new(HttpBackend::connect(config)?),
        })
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Databases
    // =========================================================================

    /// Fetch a database by ID.
    pub fn get_database(&self, id: i64) -> Result<Database> {
        self.backend.get_database(id)
    }

    /// Create a database, returning its ID.
    pub fn create_database(&self, request: &DatabaseRequest) -> Result<i64> {
        self.backend.create_database(request)
    }

    /// Replace a database's configuration.
    pub fn update_database(&self, id: i64, request: &DatabaseRequest) -> Result<()> {
        self.backend.update_database(id, request)
    }

    /// Permanently delete a database.
    pub fn delete_database(&self, id: i64) -> Result<()> {
        self.backend.delete_database(id)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Fetch an active user by ID.
    pub fn get_user(&self, id: i64) -> Result<User> {
        self.backend.get_user(id)
    }

    /// Fetch the authenticated user.
    pub fn get_current_user(&self) -> Result<User> {
        self.backend.get_current_user()
    }

    /// Create a user, returning its ID.
    pub fn create_user(&self, request: &UserCreateRequest) -> Result<i64> {
        self.backend.create_user(request)
    }

    /// Replace a user's attributes and memberships.
    pub fn update_user(&self, id: i64, request: &UserUpdateRequest) -> Result<()> {
        self.backend.update_user(id, request)
    }

    /// Reactivate a deactivated user.
    pub fn reactivate_user(&self, id: i64) -> Result<()> {
        self.backend.reactivate_user(id)
    }

    /// Deactivate a user.
    pub fn disable_user(&self, id: i64) -> Result<()> {
        self.backend.disable_user(id)
    }

    // =========================================================================
    // Permissions groups
    // =========================================================================

    /// Fetch a permissions group by ID.
    pub fn get_permissions_group(&self, id: i64) -> Result<PermissionsGroup> {
        self.backend.get_permissions_group(id)
    }

    /// Create a permissions group, returning its ID.
    pub fn create_permissions_group(&self, request: &PermissionsGroupRequest) -> Result<i64> {
        self.backend.create_permissions_group(request)
    }

    /// Rename a permissions group.
    pub fn update_permissions_group(
        &self,
        id: i64,
        request: &PermissionsGroupRequest,
    ) -> Result<()> {
        self.backend.update_permissions_group(id, request)
    }

    /// Permanently delete a permissions group.
    pub fn delete_permissions_group(&self, id: i64) -> Result<()> {
        self.backend.delete_permissions_group(id)
    }
}
