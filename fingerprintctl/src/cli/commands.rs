//! CLI command and subcommand definitions

use clap::{Parser, Subcommand};

/// Fingerprint Bridge CLI
#[derive(Parser, Debug)]
#[command(name = "fingerprintctl")]
#[command(version, about = "Fingerprint attendance bridge CLI", long_about = None)]
pub struct Cli {
    /// Server URL (overrides config file)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Output format (overrides config file)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging (overrides config file)
    #[arg(short, long)]
    pub verbose: Option<bool>,

    /// Don't load config file
    #[arg(long)]
    pub no_config: bool,

    /// Config file path (default: ~/.config/fingerprintd/cli.toml)
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        }
    }
}

impl From<&OutputFormat> for crate::format::OutputFormat {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => crate::format::OutputFormat::Table,
            OutputFormat::Json => crate::format::OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show bridge information
    Info,

    /// Check server connectivity and health
    Health,

    /// List serial ports on the bridge host
    Ports {
        /// Include USB metadata for each port
        #[arg(short, long)]
        details: bool,
    },

    /// Show the serial link status
    Status,

    /// Open a serial device on the bridge
    Connect {
        /// Device path (e.g., /dev/ttyACM0, COM3)
        port: String,

        /// Baud rate (bridge default when omitted)
        #[arg(short, long)]
        baud_rate: Option<u32>,
    },

    /// Close the serial link
    Disconnect,

    /// Start fingerprint enrollment
    Register,

    /// Start a verification scan
    Verify,

    /// Abort the device's current operation
    Stop,

    /// Delete one stored fingerprint
    Delete {
        /// Fingerprint ID
        id: String,
    },

    /// Delete every stored fingerprint
    DeleteAll,

    /// Send a raw line to the device
    Send {
        /// Text written to the device
        text: String,
    },

    /// Tail the live push channel
    Watch {
        /// Reopen the channel every 3 seconds after it drops
        #[arg(short, long)]
        reconnect: bool,
    },

    /// Show or manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Commands {
    /// Whether the command talks to the bridge
    pub fn needs_client(&self) -> bool {
        !matches!(self, Commands::Config { .. } | Commands::Completion { .. })
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the config file path
    Path,

    /// Set configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Reset configuration to defaults
    Reset,
}
