//! Resource trait for reconciling declared configuration with Metabase.
//!
//! A reconciler drives one kind of Metabase object through its lifecycle.
//! Operations take the client explicitly and never fail with `Err`; every
//! outcome is a [`Response`] carrying the new state and any diagnostics.

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use metabase_api::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// What the caller should record after an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum NewState<M> {
    /// Record this state.
    Set(M),
    /// The remote object is gone; stop tracking it.
    Removed,
    /// Keep whatever was recorded before (nothing, for a failed create).
    Retained,
}

/// Outcome of a lifecycle operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<M> {
    /// State transition
    pub state: NewState<M>,
    /// Errors and warnings raised along the way
    pub diagnostics: Diagnostics,
}

impl<M> Response<M> {
    /// Record `model`.
    pub fn set(model: M, diagnostics: Diagnostics) -> Self {
        Self {
            state: NewState::Set(model),
            diagnostics,
        }
    }

    /// Stop tracking the resource.
    pub fn removed(diagnostics: Diagnostics) -> Self {
        Self {
            state: NewState::Removed,
            diagnostics,
        }
    }

    /// Leave recorded state untouched.
    pub fn retained(diagnostics: Diagnostics) -> Self {
        Self {
            state: NewState::Retained,
            diagnostics,
        }
    }

    /// A single error, state untouched.
    pub fn error(diagnostic: Diagnostic) -> Self {
        Self::retained(vec![diagnostic].into())
    }

    /// Whether any diagnostic is an error.
    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }

    /// The state to record, if the operation produced one.
    pub fn model(&self) -> Option<&M> {
        match &self.state {
            NewState::Set(model) => Some(model),
            NewState::Removed | NewState::Retained => None,
        }
    }
}

/// A kind of Metabase object under management.
///
/// Implementations hold no state of their own; everything they need comes
/// in through the arguments.
pub trait Resource: fmt::Debug + Send + Sync {
    /// Declared configuration and reconciled state for this kind.
    type Model: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned;

    /// Resource type name, e.g. "database"
    const TYPE_NAME: &'static str;

    /// Normalize declared configuration into a plan.
    ///
    /// Fills schema defaults and carries over the recorded ID.
    fn plan(&self, declared: &Self::Model, prior: Option<&Self::Model>) -> Self::Model;

    /// Attributes whose values must never be displayed.
    fn sensitive_attributes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Check declared configuration without touching Metabase.
    fn validate(&self, plan: &Self::Model) -> Diagnostics;

    /// Create the object and return its full state.
    fn create(&self, client: &Client, plan: &Self::Model) -> Response<Self::Model>;

    /// Refresh recorded state from Metabase.
    fn read(&self, client: &Client, prior: &Self::Model) -> Response<Self::Model>;

    /// Replace the object's configuration with `plan`.
    fn update(
        &self,
        client: &Client,
        plan: &Self::Model,
        prior: &Self::Model,
    ) -> Response<Self::Model>;

    /// Remove the object. Success yields [`NewState::Removed`].
    fn delete(&self, client: &Client, prior: &Self::Model) -> Response<Self::Model>;

    /// Bring an existing object under management by its ID.
    fn import(&self, client: &Client, id: &str) -> Response<Self::Model>;

    /// Remote ID recorded in `model`, if known.
    fn id(&self, model: &Self::Model) -> Option<i64>;

    /// Whether moving from `prior` to `plan` needs delete-then-create.
    fn requires_replace(&self, _prior: &Self::Model, _plan: &Self::Model) -> bool {
        false
    }
}

/// Parse an import ID.
pub fn parse_import_id(kind: &str, id: &str) -> Result<i64, Diagnostic> {
    id.trim().parse::<i64>().map_err(|_| {
        Diagnostic::error(
            DiagnosticKind::Validation,
            format!("Invalid {kind} ID"),
            format!("Expected a numeric {kind} ID, got '{id}'."),
        )
    })
}

/// Error for an operation on state that has no ID.
pub fn missing_id(kind: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::Validation,
        format!("Missing {kind} ID"),
        format!("The recorded {kind} has no ID; import it or remove it from state."),
    )
    .at("id")
}
