//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// CoreDNS Corefile manager: edit zones, plugins, properties and zone files, then deploy
#[derive(Parser, Debug)]
#[command(name = "corefile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the Corefile from the configured script, deploy it and start CoreDNS
    Start,

    /// Add a zone to the new Corefile
    AddZone {
        /// Zone name, e.g. `example.io` or `.`
        name: String,
        /// Listening port
        #[arg(short, long, allow_negative_numbers = true)]
        port: Option<i64>,
        /// Keep an existing zone with the same name
        #[arg(long)]
        no_replace: bool,
    },

    /// Remove a zone from the new Corefile
    RemoveZone {
        name: String,
    },

    /// Add a plugin to a zone of the new Corefile
    AddPlugin {
        /// Plugin name
        name: String,
        #[arg(short, long)]
        zone: String,
        /// Whitespace separated plugin arguments
        #[arg(short, long, allow_hyphen_values = true)]
        args: Option<String>,
        /// Keep an existing plugin with the same name
        #[arg(long)]
        no_replace: bool,
    },

    /// Remove a plugin from a zone of the new Corefile
    RemovePlugin {
        name: String,
        #[arg(short, long)]
        zone: String,
    },

    /// Add a property to a plugin of the new Corefile
    AddProperty {
        /// Property name
        name: String,
        #[arg(short, long)]
        zone: String,
        #[arg(short, long)]
        plugin: String,
        /// Whitespace separated property arguments
        #[arg(short, long, allow_hyphen_values = true)]
        args: Option<String>,
        /// Keep an existing property with the same name
        #[arg(long)]
        no_replace: bool,
    },

    /// Remove a property from a plugin of the new Corefile
    RemoveProperty {
        name: String,
        #[arg(short, long)]
        zone: String,
        #[arg(short, long)]
        plugin: String,
    },

    /// Run a mutation script against the new Corefile
    Exec {
        #[arg(value_hint = ValueHint::FilePath)]
        script: PathBuf,
    },

    /// Print the new Corefile (or the deployed one)
    PrintCorefile {
        /// Print the deployed Corefile
        #[arg(long)]
        current: bool,
    },

    /// Print one zone block
    PrintZone {
        zone: String,
        /// Read from the deployed Corefile
        #[arg(long)]
        current: bool,
    },

    /// Print a zone file
    PrintZonefile {
        zonefile: String,
    },

    /// Add a resource record to a zone file, creating it if needed
    AddRecord {
        /// Zone file name
        zonefile: String,
        hostname: String,
        /// Record type, e.g. A, CNAME, MX
        record_type: String,
        /// Record data
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
        /// Key of the record (default: hostname)
        #[arg(short, long)]
        name: Option<String>,
        /// Keep an existing record with the same key
        #[arg(long)]
        no_replace: bool,
    },

    /// Remove a resource record from a zone file
    RemoveRecord {
        zonefile: String,
        /// Key of the record
        name: String,
    },

    /// Deploy the new Corefile and restart CoreDNS
    Update,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
