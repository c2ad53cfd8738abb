//! Secret partitioning for database connection details.
//!
//! Metabase redacts secret connection details on read, replacing them with
//! `**...**` markers. A detail is secure if its key is in
//! [`SENSITIVE_KEYS`] or its value is a string carrying the marker.

use metabase_api::Details;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Keys whose values are always secret.
pub const SENSITIVE_KEYS: [&str; 2] = ["password", "service-account-json"];

static REDACTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*.+\*\*$").expect("redaction pattern is valid"));

/// Whether a string is a Metabase redaction marker.
pub fn is_redacted(value: &str) -> bool {
    REDACTED.is_match(value)
}

/// Whether a single detail is secret.
pub fn is_sensitive(key: &str, value: &Value) -> bool {
    SENSITIVE_KEYS.contains(&key) || value.as_str().is_some_and(is_redacted)
}

/// Split details into `(public, secure)` halves.
///
/// Every entry lands in exactly one half.
pub fn partition(details: &Details) -> (Details, Details) {
    let mut public = Details::new();
    let mut secure = Details::new();
    for (key, value) in details {
        let half = if is_sensitive(key, value) {
            &mut secure
        } else {
            &mut public
        };
        half.insert(key.clone(), value.clone());
    }
    (public, secure)
}

/// Drop every secret entry.
///
/// Used where there is nowhere safe to put the secure half.
pub fn filter_public(details: &Details) -> Details {
    details
        .iter()
        .filter(|(key, value)| !is_sensitive(key, value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details(value: Value) -> Details {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_partition_by_key() {
        let (public, secure) = partition(&details(json!({
            "host": "pg",
            "password": "hunter2",
            "service-account-json": "{}",
        })));
        assert_eq!(public, details(json!({"host": "pg"})));
        assert_eq!(
            secure,
            details(json!({"password": "hunter2", "service-account-json": "{}"}))
        );
    }

    #[test]
    fn test_redacted_value_is_secure_regardless_of_key() {
        for key in ["ssl-key", "token", "anything"] {
            let input = details(json!({ key: "**MetabasePass**" }));
            let (public, secure) = partition(&input);
            assert!(public.is_empty());
            assert_eq!(secure, input);
        }
    }

    #[test]
    fn test_marker_must_wrap_something() {
        assert!(is_redacted("**x**"));
        assert!(!is_redacted("****"));
        assert!(!is_redacted("**x"));
        assert!(!is_redacted("x**"));
        assert!(!is_redacted(" **x**"));
    }

    #[test]
    fn test_only_strings_are_checked_for_marker() {
        let (public, secure) = partition(&details(json!({"port": 5432, "ssl": true})));
        assert_eq!(public.len(), 2);
        assert!(secure.is_empty());
    }

    #[test]
    fn test_partition_is_disjoint_union() {
        let input = details(json!({
            "host": "pg",
            "port": 5432,
            "user": "postgres",
            "password": "**MetabasePass**",
            "tunnel-pass": "**x**",
            "additional-options": null,
        }));
        let (public, secure) = partition(&input);

        assert_eq!(public.len() + secure.len(), input.len());
        for key in public.keys() {
            assert!(!secure.contains_key(key));
        }
        let mut union = public.clone();
        union.extend(secure);
        assert_eq!(union, input);
    }

    #[test]
    fn test_filter_public_drops_secrets() {
        let filtered = filter_public(&details(json!({
            "host": "pg",
            "password": "**MetabasePass**",
            "ssh-key": "**k**",
        })));
        assert_eq!(filtered, details(json!({"host": "pg"})));
    }
}
