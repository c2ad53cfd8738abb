//! Structural mappers for nested database configuration.
//!
//! Schedules map from API settings to [`ScheduleMap`] records, and connection
//! details convert between the JSON-object strings held in declared
//! configuration and the flat [`Details`] bag the API uses.

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::models::{ScheduleMap, ScheduleModel};
use crate::secrets;
use crate::transforms;
use crate::value::Attr;
use metabase_api::{
    Database, Details, SCHEDULE_CACHE_FIELD_VALUES, SCHEDULE_METADATA_SYNC, ScheduleSettings,
};
use serde_json::Value;

/// Schedules every scheduling-capable database reports.
pub const WELL_KNOWN_SCHEDULES: [&str; 2] = [SCHEDULE_METADATA_SYNC, SCHEDULE_CACHE_FIELD_VALUES];

/// Map one schedule's settings.
pub fn build_schedule_settings(settings: &ScheduleSettings) -> ScheduleModel {
    ScheduleModel {
        schedule_type: settings.schedule_type.as_str().to_string(),
        day: transforms::to_string(settings.day.clone()),
        frame: transforms::to_string(settings.frame.clone()),
        hour: transforms::to_int(settings.hour),
        minute: transforms::to_int(settings.minute),
    }
}

/// Map a database's schedules.
///
/// Always returns a collection. It is empty when the database has no
/// schedule support; otherwise both well-known schedules are present
/// (as `None` when unset) alongside any other named schedule.
pub fn build_schedules(database: &Database) -> ScheduleMap {
    let Some(remote) = &database.schedules else {
        return ScheduleMap::new();
    };

    let mut schedules: ScheduleMap = WELL_KNOWN_SCHEDULES
        .iter()
        .map(|name| ((*name).to_string(), None))
        .collect();
    for (name, settings) in remote {
        schedules.insert(name.clone(), settings.as_ref().map(build_schedule_settings));
    }
    schedules
}

/// Encode details as a canonical JSON object string.
pub fn encode_details(details: &Details) -> Result<String, serde_json::Error> {
    serde_json::to_string(details)
}

/// Split a database's details into `(details, details_secure)` strings.
///
/// Both are null when the database reports no details. An encoding failure
/// on one half is reported without discarding the other.
pub fn build_database_details(database: &Database) -> (Attr<String>, Attr<String>, Diagnostics) {
    let mut diags = Diagnostics::new();
    let Some(details) = &database.details else {
        return (Attr::Null, Attr::Null, diags);
    };

    let (public, secure) = secrets::partition(details);
    let mut encode = |half: &Details, attribute: &str| match encode_details(half) {
        Ok(s) => Attr::Value(s),
        Err(e) => {
            diags.add_error(
                DiagnosticKind::Serialization,
                format!("Error parsing {attribute} for database {}", database.id),
                e.to_string(),
            );
            Attr::Null
        }
    };
    let public = encode(&public, "details");
    let secure = encode(&secure, "details_secure");
    (public, secure, diags)
}

/// Decode a declared details string.
///
/// Absent and null decode to `None`. Anything other than a JSON object is a
/// validation error naming `attribute`.
pub fn parse_details(attr: &Attr<String>, attribute: &str) -> Result<Option<Details>, Diagnostic> {
    let Some(raw) = attr.value() else {
        return Ok(None);
    };
    let invalid = |detail: String| {
        Diagnostic::error(
            DiagnosticKind::Validation,
            "Configuration error",
            format!("Error processing {attribute} configuration: {detail}"),
        )
        .at(attribute)
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(invalid("expected a JSON object".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// Merge the public and secure halves; secure keys win on conflict.
pub fn merge_details(public: Option<Details>, secure: Option<Details>) -> Details {
    let mut combined = public.unwrap_or_default();
    combined.extend(secure.unwrap_or_default());
    combined
}

/// Whether every declared detail still has the same value remotely.
///
/// Extra remote keys (Metabase adds defaults) do not count as drift.
pub fn details_match(declared: &Details, remote: &Details) -> bool {
    declared
        .iter()
        .all(|(key, value)| remote.get(key) == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metabase_api::{ScheduleType, Schedules};
    use serde_json::json;

    fn database(details: Option<Value>, schedules: Option<Schedules>) -> Database {
        Database {
            id: 3,
            name: "Warehouse".into(),
            engine: "postgres".into(),
            features: vec![],
            details: details.map(|d| d.as_object().cloned().unwrap()),
            schedules,
            is_sample: false,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_no_schedule_support_is_empty_not_absent() {
        let schedules = build_schedules(&database(None, None));
        assert!(schedules.is_empty());
    }

    #[test]
    fn test_unset_schedules_are_explicit_nulls() {
        let schedules = build_schedules(&database(None, Some(Schedules::new())));
        assert_eq!(schedules.len(), 2);
        assert_eq!(schedules.get(SCHEDULE_METADATA_SYNC), Some(&None));
        assert_eq!(schedules.get(SCHEDULE_CACHE_FIELD_VALUES), Some(&None));
    }

    #[test]
    fn test_schedule_settings_mapping() {
        let mut remote = Schedules::new();
        remote.insert(
            SCHEDULE_METADATA_SYNC.into(),
            Some(ScheduleSettings {
                schedule_type: ScheduleType::Hourly,
                day: None,
                frame: None,
                hour: None,
                minute: Some(15),
            }),
        );
        remote.insert(
            "custom_refresh".into(),
            Some(ScheduleSettings {
                schedule_type: ScheduleType::Weekly,
                day: Some("mon".into()),
                frame: None,
                hour: Some(2),
                minute: None,
            }),
        );

        let schedules = build_schedules(&database(None, Some(remote)));
        assert_eq!(schedules.len(), 3);

        let sync = schedules[SCHEDULE_METADATA_SYNC].as_ref().unwrap();
        assert_eq!(sync.schedule_type, "hourly");
        assert_eq!(sync.minute, Attr::Value(15));
        assert_eq!(sync.hour, Attr::Null);

        let custom = schedules["custom_refresh"].as_ref().unwrap();
        assert_eq!(custom.day, Attr::Value("mon".into()));
        assert_eq!(schedules[SCHEDULE_CACHE_FIELD_VALUES], None);
    }

    #[test]
    fn test_build_database_details_without_details() {
        let (public, secure, diags) = build_database_details(&database(None, None));
        assert_eq!(public, Attr::Null);
        assert_eq!(secure, Attr::Null);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_build_database_details_partitions() {
        let (public, secure, diags) = build_database_details(&database(
            Some(json!({"host": "pg", "port": 5432, "password": "**MetabasePass**"})),
            None,
        ));
        assert!(diags.is_empty());
        assert_eq!(public, Attr::Value(r#"{"host":"pg","port":5432}"#.to_string()));
        assert_eq!(
            secure,
            Attr::Value(r#"{"password":"**MetabasePass**"}"#.to_string())
        );
    }

    #[test]
    fn test_parse_details() {
        assert_eq!(parse_details(&Attr::Absent, "details").unwrap(), None);
        assert_eq!(parse_details(&Attr::Null, "details").unwrap(), None);

        let parsed = parse_details(&Attr::Value(r#"{"db":"mem"}"#.into()), "details").unwrap();
        assert_eq!(parsed.unwrap()["db"], json!("mem"));

        let err = parse_details(&Attr::Value("[1]".into()), "details_secure").unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("details_secure"));
        assert!(parse_details(&Attr::Value("{".into()), "details").is_err());
    }

    #[test]
    fn test_merge_details_secure_wins() {
        let public = json!({"user": "a", "password": "plain"}).as_object().cloned();
        let secure = json!({"password": "secret"}).as_object().cloned();
        let merged = merge_details(public, secure);
        assert_eq!(merged["password"], json!("secret"));
        assert_eq!(merged["user"], json!("a"));
        assert!(merge_details(None, None).is_empty());
    }

    #[test]
    fn test_details_match_ignores_extra_remote_keys() {
        let declared = json!({"host": "pg"}).as_object().cloned().unwrap();
        let remote = json!({"host": "pg", "ssl": false}).as_object().cloned().unwrap();
        assert!(details_match(&declared, &remote));

        let changed = json!({"host": "other"}).as_object().cloned().unwrap();
        assert!(!details_match(&declared, &changed));
    }
}
