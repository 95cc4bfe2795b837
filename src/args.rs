use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ztctl")]
#[command(version)]
#[command(about = "Manage the local ZeroTier backend", long_about = None)]
pub(crate) struct Cli {
    /// Run commands directly on the host instead of applying the sandbox-hop
    /// prefix. Can also be set via ZTCTL_DEBUG.
    #[arg(long, global = true)]
    pub host_direct: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List joined networks
    Networks,

    /// Show details for one joined network
    Info {
        /// 16-digit network ID
        network_id: String,
    },

    /// Join a network
    Join {
        /// 16-digit network ID
        network_id: String,
    },

    /// Leave a network
    Leave {
        /// 16-digit network ID
        network_id: String,
    },

    /// Change a per-network option (e.g. allowDNS 1)
    Set {
        /// 16-digit network ID
        network_id: String,
        /// Option name (allowDefault, allowGlobal, allowManaged, allowDNS)
        option: String,
        /// Option value (0 or 1)
        value: String,
    },

    /// List known peers
    Peers,

    /// Show physical paths for one peer
    Paths {
        /// Peer ZeroTier address
        address: String,
    },

    /// Show node identity and service state
    Status,

    /// Bring a backend-managed interface up or down
    Interface {
        /// Interface device name (e.g. ztabcdef01)
        device: String,
        #[arg(value_enum)]
        state: LinkState,
    },

    /// Control the backend service unit
    Service {
        #[arg(value_enum)]
        action: ServiceVerb,
    },

    /// Diagnose and self-repair a broken backend
    Doctor {
        /// Assume yes for operator prompts
        #[arg(long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum LinkState {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum ServiceVerb {
    Start,
    Stop,
    Enable,
    Disable,
    Show,
    IsActive,
    /// Start the unit when stopped, stop it when running
    Toggle,
}
