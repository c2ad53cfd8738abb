//! Conversions between declared attributes and API values.
//!
//! `from_*` functions read a declared [`Attr`] into the optional value sent to
//! the API; `to_*` functions turn an API value into the attribute recorded in
//! state. Absent and null both read as `None`. `None` always writes back as
//! null, never absent, because nothing read from the API is "unknown".

use crate::value::Attr;

/// Declared string to API string.
pub fn from_string(attr: &Attr<String>) -> Option<String> {
    attr.value().cloned()
}

/// API string to declared string.
pub fn to_string(value: Option<String>) -> Attr<String> {
    Attr::from(value)
}

/// Declared bool to API bool.
pub fn from_bool(attr: &Attr<bool>) -> Option<bool> {
    attr.value().copied()
}

/// API bool to declared bool.
pub fn to_bool(value: Option<bool>) -> Attr<bool> {
    Attr::from(value)
}

/// Declared integer to API integer.
pub fn from_int(attr: &Attr<i64>) -> Option<i64> {
    attr.value().copied()
}

/// API integer to declared integer.
pub fn to_int(value: Option<i64>) -> Attr<i64> {
    Attr::from(value)
}

/// Declared integer list to API integer list.
pub fn from_int_list(attr: &Attr<Vec<i64>>) -> Option<Vec<i64>> {
    attr.value().cloned()
}

/// API integer list to declared integer list.
///
/// An empty list stays an empty list.
pub fn to_int_list(value: Option<Vec<i64>>) -> Attr<Vec<i64>> {
    Attr::from(value)
}

/// Declared string list to API string list.
pub fn from_string_list(attr: &Attr<Vec<String>>) -> Option<Vec<String>> {
    attr.value().cloned()
}

/// API string list to declared string list.
pub fn to_string_list(value: Option<Vec<String>>) -> Attr<Vec<String>> {
    Attr::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_absent_and_null_read_as_none() {
        assert_eq!(from_string(&Attr::Absent), None);
        assert_eq!(from_string(&Attr::Null), None);
        assert_eq!(from_string(&Attr::Value("a".into())), Some("a".into()));
    }

    #[test]
    fn test_none_writes_null_not_absent() {
        assert_eq!(to_string(None), Attr::Null);
        assert_eq!(to_bool(None), Attr::Null);
        assert_eq!(to_int(None), Attr::Null);
        assert_eq!(to_int_list(None), Attr::Null);
    }

    #[test]
    fn test_absent_round_trips_to_null() {
        assert_eq!(to_string(from_string(&Attr::Absent)), Attr::Null);
        assert_eq!(to_int_list(from_int_list(&Attr::Absent)), Attr::Null);
    }

    #[test]
    fn test_values_round_trip() {
        for v in [Some(true), Some(false), None] {
            assert_eq!(from_bool(&to_bool(v)), v);
        }
        for v in [Some(0), Some(-7), Some(i64::MAX), None] {
            assert_eq!(from_int(&to_int(v)), v);
        }
        for v in [Some(String::new()), Some("x".to_string()), None] {
            assert_eq!(from_string(&to_string(v.clone())), v);
        }
    }

    #[test]
    fn test_empty_list_stays_concrete() {
        assert_eq!(to_int_list(Some(vec![])), Attr::Value(vec![]));
        assert_eq!(from_int_list(&to_int_list(Some(vec![3, 1]))), Some(vec![3, 1]));
        assert_eq!(to_string_list(Some(vec![])), Attr::Value(vec![]));
        assert_eq!(from_string_list(&Attr::Absent), None);
    }
}
