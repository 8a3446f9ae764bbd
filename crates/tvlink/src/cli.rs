//! Clap derive structures for the `tvlink` CLI.
//!
//! Defines the command tree and global flags.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tvlink -- control a webOS TV from the command line
#[derive(Debug, Parser)]
#[command(
    name = "tvlink",
    version,
    about = "Control LG webOS televisions over the local network",
    long_about = "Connects to a webOS TV's local control socket, pairs once, and\n\
        then follows its power, volume and input state or sends it actions.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to use instead of the default location
    #[arg(long, short = 'C', env = "TVLINK_CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// TV hostname or IP address (overrides config)
    #[arg(long, short = 'H', global = true)]
    pub host: Option<String>,

    /// Connect over TLS on port 3001
    #[arg(long, short = 's', global = true)]
    pub secure: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect and print state changes until interrupted
    #[command(alias = "watch")]
    Run,

    /// Connect, send one action, and exit
    Send(SendArgs),

    /// List the actions `send` understands
    Actions,

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Send ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Action name, e.g. "volume.set" or "power.off"
    pub action: String,

    /// Action parameters as key=value pairs, e.g. "value=0.25"
    #[arg(value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Seconds to wait for the TV to accept the connection
    #[arg(long, short = 'w', default_value = "30")]
    pub wait: u64,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file for a TV
    Init {
        /// TV hostname or IP address
        host: String,

        /// Display name for the TV
        #[arg(long)]
        name: Option<String>,

        /// Overwrite an existing config file
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
