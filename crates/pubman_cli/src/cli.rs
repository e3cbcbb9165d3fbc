//! Command-line surface.

use clap::{Args, Parser, Subcommand, ValueEnum};
use pubman_core::AttributeKind;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pubman",
    version,
    about = "Track publish and client-delivery status across production folders"
)]
pub struct Cli {
    /// Config file; defaults to `pubman.json` in the user data directory.
    #[arg(long, global = true, env = "PUBMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file, overriding the config.
    #[arg(long, global = true, env = "PUBMAN_DB")]
    pub db: Option<PathBuf>,

    #[arg(long, short = 'u', global = true, env = "PUBMAN_USER")]
    pub user: Option<String>,

    #[arg(long, short = 'p', global = true, env = "PUBMAN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create config, database and the admin account.
    Init,
    /// Manage user accounts (admin only).
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Print a folder tree with status badges.
    Tree {
        project: String,
        /// Directory to list, relative to the master path.
        dir: Option<PathBuf>,
    },
    /// Show current status and recent history of a path.
    Status { project: String, path: PathBuf },
    /// Set or clear an attribute on a path.
    Mark(MarkArgs),
    /// Copy client-marked files into the delivery folder.
    Send { project: String, dir: PathBuf },
    /// Write `published_sequence.xml` for published files.
    Export { project: String, dir: PathBuf },
    /// Create the production folder hierarchy.
    Scaffold { parent: PathBuf, name: String },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    List,
    Add {
        username: String,
        #[arg(value_name = "PASSWORD")]
        account_password: String,
    },
    Update {
        username: String,
        new_username: String,
        #[arg(long)]
        new_password: Option<String>,
    },
    Remove {
        username: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    Create(CreateProjectArgs),
    List,
    Rename { project: String, name: String },
    Comment { project: String, comment: String },
    /// Set the delivery date (`YYYY-MM-DD`, empty to clear).
    Date { project: String, date: String },
}

#[derive(Args, Debug)]
pub struct CreateProjectArgs {
    pub name: String,
    pub master_path: PathBuf,
    #[arg(long, default_value = "")]
    pub client: String,
    #[arg(long, default_value = "")]
    pub comment: String,
    #[arg(long, default_value = "")]
    pub date: String,
    /// Lay out the built-in production hierarchy under `<master>/<name>`.
    #[arg(long, conflicts_with = "template")]
    pub scaffold: bool,
    /// Copy a template hierarchy into `<master>/<name>`.
    #[arg(long)]
    pub template: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MarkArgs {
    pub project: String,
    pub path: PathBuf,
    /// `publish` or `to_client`.
    pub attribute: AttributeKind,
    pub value: Switch,
    /// Clear conflicting siblings without asking.
    #[arg(long, conflicts_with = "no")]
    pub yes: bool,
    /// Leave conflicting siblings and cancel the change.
    #[arg(long)]
    pub no: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn as_bool(self) -> bool {
        matches!(self, Self::On)
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, Switch};
    use clap::{CommandFactory, Parser};
    use pubman_core::AttributeKind;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn mark_parses_attribute_aliases() {
        let cli = Cli::try_parse_from([
            "pubman", "mark", "show", "renders/a001.png", "client", "on", "--yes",
        ])
        .unwrap();
        let Command::Mark(args) = cli.command else {
            panic!("expected mark");
        };
        assert_eq!(args.attribute, AttributeKind::ToClient);
        assert_eq!(args.value, Switch::On);
        assert!(args.yes);
    }

    #[test]
    fn yes_and_no_conflict() {
        assert!(Cli::try_parse_from([
            "pubman", "mark", "show", "a.png", "publish", "on", "--yes", "--no",
        ])
        .is_err());
    }
}
