//! Tri-state attribute values.
//!
//! A declared attribute is either left out by the operator, set explicitly to
//! null, or set to a value. Collapsing the first two into `Option::None` loses
//! the information needed to decide whether a freshly read value may replace
//! a planned one, so [`Attr`] keeps them apart.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An attribute that may be absent, explicitly null, or a concrete value.
///
/// Absent means "not specified, known after apply". Serialization writes
/// `Value` as the bare value and both other states as null; structs that want
/// to keep absence should pair fields with
/// `#[serde(default, skip_serializing_if = "Attr::is_absent")]`, in which case
/// a missing key reads back as `Absent` and a `null` as `Null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr<T> {
    /// Not specified; to be filled from prior state, a default, or the API.
    Absent,
    /// Explicitly null.
    Null,
    /// A concrete value.
    Value(T),
}

impl<T> Attr<T> {
    /// Whether this attribute is unspecified.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Whether this attribute is explicitly null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is known at plan time (null or concrete).
    pub fn is_known(&self) -> bool {
        !self.is_absent()
    }

    /// Borrow the concrete value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Take the concrete value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Convert `&Attr<T>` to `Attr<&T>`.
    pub fn as_ref(&self) -> Attr<&T> {
        match self {
            Self::Absent => Attr::Absent,
            Self::Null => Attr::Null,
            Self::Value(v) => Attr::Value(v),
        }
    }

    /// Map the concrete value, keeping absent and null as they are.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Self::Absent => Attr::Absent,
            Self::Null => Attr::Null,
            Self::Value(v) => Attr::Value(f(v)),
        }
    }

    /// Replace an absent attribute with `fallback`.
    pub fn or(self, fallback: Self) -> Self {
        match self {
            Self::Absent => fallback,
            known => known,
        }
    }

    /// Replace an absent attribute with a computed fallback.
    pub fn or_else(self, fallback: impl FnOnce() -> Self) -> Self {
        match self {
            Self::Absent => fallback(),
            known => known,
        }
    }

    /// Keep `self` unless `planned` is known, in which case take `planned`.
    ///
    /// This is the plan-consistency override: values the operator declared
    /// win over values echoed back by the API.
    pub fn prefer_known(self, planned: &Self) -> Self
    where
        T: Clone,
    {
        if planned.is_known() {
            planned.clone()
        } else {
            self
        }
    }
}

impl<T> Default for Attr<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_some(v),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}
