use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::manifest::DEFAULT_MANIFEST;

#[derive(Parser)]
#[command(name = "mbprov")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative management of Metabase databases, users and permissions groups", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest declaring the desired configuration
    #[arg(short, long, global = true, default_value = DEFAULT_MANIFEST, env = "MBPROV_MANIFEST")]
    pub manifest: String,

    /// State file [default: metabase.state.json next to the manifest]
    #[arg(short, long, global = true, env = "MBPROV_STATE")]
    pub state: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    // ============================================================================
    // Reconciliation
    // ============================================================================
    /// Show what apply would change
    Plan(TargetArgs),

    /// Make Metabase match the manifest
    Apply(ApplyArgs),

    /// Update recorded state from Metabase without changing anything
    Refresh(TargetArgs),

    /// Bring an existing Metabase object under management
    ///
    /// Examples:
    ///   mbprov import user.ada 12
    ///   mbprov import database.warehouse 3
    Import {
        /// Address to record it under (<kind>.<label>)
        address: String,

        /// Metabase ID of the existing object
        id: String,
    },

    /// Delete every managed object
    Destroy(DestroyArgs),

    // ============================================================================
    // Read-only
    // ============================================================================
    /// Look up an object in Metabase without managing it
    #[command(subcommand)]
    Lookup(LookupCommand),

    /// Show recorded state
    State,

    // ============================================================================
    // Utilities
    // ============================================================================
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct TargetArgs {
    /// Limit to a kind or a single resource (e.g., user, user.ada)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ApplyArgs {
    /// Limit to a kind or a single resource (e.g., user, user.ada)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Skip refreshing state before planning
    #[arg(long)]
    pub no_refresh: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct DestroyArgs {
    /// Limit to a kind or a single resource (e.g., database)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum LookupCommand {
    /// A database, with secret connection details removed
    Database {
        /// Database ID
        id: i64,
    },
    /// A user
    User {
        /// User ID
        id: i64,
    },
    /// The user the provider authenticates as
    CurrentUser,
    /// A permissions group
    Group {
        /// Group ID
        id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::parse_from(["mbprov", "-vv", "apply", "--yes", "--target", "user.ada"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.manifest, DEFAULT_MANIFEST);
        match cli.command {
            Command::Apply(args) => {
                assert!(args.yes);
                assert_eq!(args.target.as_deref(), Some("user.ada"));
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_parse_lookup() {
        let cli = Cli::parse_from(["mbprov", "lookup", "group", "2", "--manifest", "x.toml"]);
        assert_eq!(cli.manifest, "x.toml");
        assert!(matches!(
            cli.command,
            Command::Lookup(LookupCommand::Group { id: 2 })
        ));
    }
}
