// Reconciliation commands
pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod refresh;

// Read-only commands
pub mod lookup;
pub mod show;

use anyhow::{Context as AnyhowContext, Result, bail};
use metabase_api::Client;
use reconcile::Target;

use crate::Context;
use crate::config::ProviderConfig;
use crate::engine::Reported;
use crate::manifest::Manifest;
use crate::state::ProviderState;

/// Manifest, state and a connected client.
pub struct Session {
    pub manifest: Manifest,
    pub state: ProviderState,
    pub client: Client,
}

impl Session {
    /// Load the manifest and state, then connect.
    pub fn open(ctx: &Context) -> Result<Self> {
        let manifest = Manifest::load(&ctx.manifest)?;
        let state = ProviderState::load(&ctx.state)?;
        let client = manifest.provider.connect()?;
        Ok(Self {
            manifest,
            state,
            client,
        })
    }
}

/// Provider settings from the manifest, or from the environment alone when
/// there is no manifest.
pub fn provider_config(ctx: &Context) -> Result<ProviderConfig> {
    if ctx.manifest.exists() {
        Ok(Manifest::load(&ctx.manifest)?.provider)
    } else {
        log::debug!(
            "No manifest at {}, using environment only",
            ctx.manifest.display()
        );
        Ok(ProviderConfig::default())
    }
}

/// Parse a `--target` value.
pub fn parse_target(target: Option<&str>) -> Result<Option<Target>> {
    target
        .map(|t| {
            t.parse::<Target>()
                .with_context(|| format!("Invalid target '{t}'"))
        })
        .transpose()
}

/// Fail the command if any diagnostic is an error.
pub fn fail_on_errors(diagnostics: &[Reported], what: &str) -> Result<()> {
    let errors = diagnostics.iter().filter(|(_, d)| d.is_error()).count();
    if errors > 0 {
        bail!("{what} failed with {errors} error(s)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{Address, Diagnostic, DiagnosticKind, ResourceKind};

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target(None).unwrap(), None);
        let target = parse_target(Some("db")).unwrap().unwrap();
        assert_eq!(target.kind, ResourceKind::Database);
        assert!(parse_target(Some("widget")).is_err());
    }

    #[test]
    fn test_fail_on_errors_ignores_warnings() {
        let address = Address::new(ResourceKind::Database, "x");
        let warning = Diagnostic::warning(DiagnosticKind::UnrecognizedEngine, "w", "");
        assert!(fail_on_errors(&[(address.clone(), warning)], "Plan").is_ok());

        let error = Diagnostic::error(DiagnosticKind::Validation, "e", "");
        let err = fail_on_errors(&[(address, error)], "Plan").unwrap_err();
        assert_eq!(err.to_string(), "Plan failed with 1 error(s)");
    }
}
