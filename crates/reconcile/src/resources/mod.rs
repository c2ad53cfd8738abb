//! Reconcilers for each managed Metabase object.

pub mod database;
pub mod permissions_group;
pub mod user;

pub use database::DatabaseResource;
pub use permissions_group::PermissionsGroupResource;
pub use user::UserResource;
