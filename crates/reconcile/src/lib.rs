//! # Reconcile
//!
//! State reconciliation between declared configuration and a Metabase
//! instance.
//!
//! ## Core Concepts
//!
//! - **Attr**: a declared attribute that is absent, null, or a value
//! - **Resource**: a reconciler for one kind of Metabase object, with
//!   create/read/update/delete/import
//! - **Response**: what every operation returns; the new state plus
//!   diagnostics, never an `Err`
//! - **Planned**: the action a resource needs, derived from declared
//!   configuration and recorded state
//!
//! ## Example
//!
//! ```
//! use metabase_api::{Client, MockBackend};
//! use reconcile::{Attr, PermissionsGroupModel, PermissionsGroupResource, Resource};
//!
//! let client = Client::with_backend(Box::new(MockBackend::with_reserved_groups()));
//!
//! let response = PermissionsGroupResource.create(&client, &PermissionsGroupModel::new("Analysts"));
//! assert!(!response.has_error());
//!
//! let group = response.model().unwrap();
//! assert!(matches!(group.id, Attr::Value(_)));
//! ```
//!
//! Secrets in database connection details are split from public values by
//! [`secrets::partition`], and the reserved "All Users" and "Administrators"
//! groups are hidden from declared group lists by [`membership`].

pub mod address;
pub mod data_sources;
pub mod diagnostics;
pub mod mappers;
pub mod membership;
pub mod models;
pub mod plan;
pub mod resource;
pub mod resources;
pub mod secrets;
pub mod transforms;
pub mod validation;
pub mod value;

// Re-export main types at crate root
pub use address::{Address, AddressError, ResourceKind, Target};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use models::{
    DatabaseInfo, DatabaseModel, PermissionsGroupModel, ScheduleMap, ScheduleModel, UserModel,
};
pub use plan::{Action, FieldChange, Planned, plan_resource};
pub use resource::{NewState, Resource, Response};
pub use resources::{DatabaseResource, PermissionsGroupResource, UserResource};
pub use value::Attr;
