use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pamform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative configuration for privileged-access-management tenants", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Provider configuration file (default: ~/.config/pamform/provider.toml)
    #[arg(long, global = true, env = "PAMFORM_CONFIG")]
    pub config: Option<String>,

    /// State file
    #[arg(long, global = true, default_value = "pamform.state.json")]
    pub state: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the changes needed to converge the tenant on a manifest
    Plan(PlanArgs),

    /// Apply a manifest to the tenant
    Apply(ApplyArgs),

    /// Adopt an existing entity into state
    Import(ImportArgs),

    /// Re-read every tracked entity from the tenant
    Refresh,

    /// Inspect or edit the state file
    #[command(subcommand)]
    State(StateCommand),

    /// List the resource types this build manages
    Types,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Plan / Apply
// ============================================================================

#[derive(Parser)]
pub struct PlanArgs {
    /// Manifest describing the desired entities
    pub manifest: PathBuf,

    /// Only plan this address (`type.name`) or resource type
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip re-reading tracked entities before planning
    #[arg(long)]
    pub no_refresh: bool,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Manifest describing the desired entities
    pub manifest: PathBuf,

    /// Only apply this address (`type.name`) or resource type
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run - show what would be done
    #[arg(long)]
    pub dry_run: bool,

    /// Number of parallel operations
    #[arg(short, long, default_value_t = declarative::DEFAULT_JOBS)]
    pub jobs: usize,

    /// Skip re-reading tracked entities before planning
    #[arg(long)]
    pub no_refresh: bool,
}

// ============================================================================
// Import
// ============================================================================

#[derive(Parser)]
pub struct ImportArgs {
    /// Resource type, e.g. `profile_permission`
    pub resource_type: String,

    /// Local name to track the entity under
    pub name: String,

    /// Import id, in canonical or short form
    pub id: String,
}

// ============================================================================
// State Commands
// ============================================================================

#[derive(Subcommand)]
pub enum StateCommand {
    /// List tracked addresses
    List,

    /// Show the attributes of one address
    Show {
        /// Address (`type.name`)
        address: String,
    },

    /// Stop tracking an address without touching the tenant
    Rm {
        /// Address (`type.name`)
        address: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_defaults() {
        let cli = Cli::parse_from(["pamform", "apply", "tenant.toml"]);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.jobs, declarative::DEFAULT_JOBS);
        assert!(!args.yes);
        assert_eq!(cli.state, PathBuf::from("pamform.state.json"));
    }

    #[test]
    fn test_import_positionals() {
        let cli = Cli::parse_from([
            "pamform",
            "-vv",
            "import",
            "profile_permission",
            "viewer",
            "A/P/Viewer/role",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.resource_type, "profile_permission");
        assert_eq!(args.id, "A/P/Viewer/role");
    }
}
