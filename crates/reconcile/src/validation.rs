//! Validation of declared configuration.
//!
//! Every check returns diagnostics rather than stopping at the first
//! problem, so one pass reports everything that needs fixing.

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::mappers;
use crate::membership;
use crate::models::{DatabaseModel, PermissionsGroupModel, UserModel};
use crate::value::Attr;
use metabase_api::{Details, Engine};

/// A required connection detail and the message shown when it is missing.
#[derive(Debug, Clone, Copy)]
pub struct RequiredDetail {
    /// Key in the combined details map
    pub key: &'static str,
    /// Error message
    pub message: &'static str,
}

const H2_REQUIRED: &[RequiredDetail] = &[RequiredDetail {
    key: "db",
    message: "you must provide the connection string in the 'db' property",
}];

const POSTGRES_REQUIRED: &[RequiredDetail] = &[
    RequiredDetail {
        key: "dbname",
        message: "you must provide the database name in the 'dbname' property",
    },
    RequiredDetail {
        key: "host",
        message: "you must provide the database hostname/ip in the 'host' property",
    },
    RequiredDetail {
        key: "user",
        message: "you must provide the auth username in the 'user' property",
    },
    RequiredDetail {
        key: "password",
        message: "you must provide the auth password in the 'password' property",
    },
];

/// Connection details an engine cannot work without.
///
/// Only engines with known rules return anything; all others pass through.
pub fn required_details(engine: &str) -> &'static [RequiredDetail] {
    match Engine::from_name(engine) {
        Some(Engine::H2) => H2_REQUIRED,
        Some(Engine::Postgres) => POSTGRES_REQUIRED,
        _ => &[],
    }
}

/// Check the combined details map against the engine's required keys.
///
/// A key set to JSON null counts as missing.
pub fn check_required_details(engine: &str, details: &Details) -> Diagnostics {
    required_details(engine)
        .iter()
        .filter(|rule| details.get(rule.key).is_none_or(serde_json::Value::is_null))
        .map(|rule| {
            Diagnostic::error(
                DiagnosticKind::Validation,
                "Missing required database configuration",
                rule.message,
            )
        })
        .collect::<Vec<_>>()
        .into()
}

/// Warn about an engine outside the allow-list.
pub fn check_engine(engine: &str) -> Option<Diagnostic> {
    if Engine::from_name(engine).is_some() {
        return None;
    }
    let known: Vec<&str> = Engine::ALL.iter().map(Engine::as_str).collect();
    Some(
        Diagnostic::warning(
            DiagnosticKind::UnrecognizedEngine,
            "Not a recognised database engine",
            format!(
                "Database engine '{engine}' is not a recognised type: {}. Applying is still \
                 possible, but the provider will not be able to validate the configuration.",
                known.join(", ")
            ),
        )
        .at("engine"),
    )
}

/// Reject an explicitly empty string.
pub fn check_non_empty(attribute: &str, value: &Attr<String>) -> Option<Diagnostic> {
    value.value().filter(|s| s.is_empty()).map(|_| {
        Diagnostic::error(
            DiagnosticKind::Validation,
            "Must not be empty string",
            format!("Attribute '{attribute}' must not be an empty string."),
        )
        .at(attribute)
    })
}

/// One error per reserved group ID in `group_ids`.
pub fn check_reserved_groups(group_ids: &Attr<Vec<i64>>) -> Diagnostics {
    group_ids
        .value()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter(|id| membership::is_reserved(**id))
        .map(|id| {
            Diagnostic::error(
                DiagnosticKind::Validation,
                "Must not contain reserved group ID",
                format!("Config contains reserved group ID {id} which must not be explicitly set."),
            )
            .at("group_ids")
        })
        .collect::<Vec<_>>()
        .into()
}

/// Validate a database and return its merged details when valid.
///
/// The engine warning never blocks; any error diagnostic does. Both details
/// attributes are decoded even if the first fails.
pub fn validate_database(model: &DatabaseModel) -> (Option<Details>, Diagnostics) {
    let mut diags = Diagnostics::new();
    if let Some(d) = check_non_empty("name", &Attr::Value(model.name.clone())) {
        diags.push(d);
    }
    if let Some(warning) = check_engine(&model.engine) {
        diags.push(warning);
    }

    let public = mappers::parse_details(&model.details, "details");
    let secure = mappers::parse_details(&model.details_secure, "details_secure");
    let (public, secure) = match (public, secure) {
        (Ok(public), Ok(secure)) => (public, secure),
        (public, secure) => {
            for d in [public.err(), secure.err()].into_iter().flatten() {
                diags.push(d);
            }
            return (None, diags);
        }
    };

    let combined = mappers::merge_details(public, secure);
    diags.extend(check_required_details(&model.engine, &combined));
    if diags.has_error() {
        (None, diags)
    } else {
        (Some(combined), diags)
    }
}

/// Validate a user.
pub fn validate_user(model: &UserModel) -> Diagnostics {
    let mut diags = Diagnostics::new();
    for (attribute, value) in [
        ("email", &Attr::Value(model.email.clone())),
        ("first_name", &model.first_name),
        ("last_name", &model.last_name),
    ] {
        if let Some(d) = check_non_empty(attribute, value) {
            diags.push(d);
        }
    }
    diags.extend(check_reserved_groups(&model.group_ids));
    diags
}

/// Validate a permissions group.
pub fn validate_permissions_group(model: &PermissionsGroupModel) -> Diagnostics {
    check_non_empty("name", &Attr::Value(model.name.clone()))
        .into_iter()
        .collect::<Vec<_>>()
        .into()
}
