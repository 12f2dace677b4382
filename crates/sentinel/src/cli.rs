//! Clap derive structures for the `sentinel` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use sentinel_core::{Period, Severity, SortField, SortOrder};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sentinel -- watch a sentinel backend's incident feed from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "sentinel",
    version,
    about = "Monitor sentinel incidents from the command line",
    long_about = "Query, summarize and live-watch the incident feed of a sentinel\n\
        monitoring backend. Profiles live in the shared config file used by\n\
        sentinel-tui.",
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
    /// Backend profile to use
    #[arg(long, short = 'p', env = "SENTINEL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL, e.g. http://localhost:8000/v1 (overrides profile)
    #[arg(long, short = 'u', env = "SENTINEL_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SENTINEL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "SENTINEL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SENTINEL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List, summarize and watch incidents
    #[command(alias = "inc", alias = "i")]
    Incidents(IncidentsArgs),

    /// Show the user behind the active profile's credentials
    Whoami,

    /// Backend administration: test data generator and maintenance
    Admin(AdminArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Incidents ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct IncidentsArgs {
    #[command(subcommand)]
    pub command: IncidentsCommand,
}

#[derive(Debug, Subcommand)]
pub enum IncidentsCommand {
    /// Fetch the current incident list
    #[command(alias = "ls")]
    List(FilterArgs),

    /// Headline counts for the current incident list
    Summary(SummaryArgs),

    /// Poll the backend and print a line for every new incident
    Watch(WatchArgs),
}

/// Client-side filtering and ordering of the fetched list.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Only this severity (critical, high, medium, low, unknown)
    #[arg(long, short = 's')]
    pub severity: Option<Severity>,

    /// Only this incident type (case-insensitive)
    #[arg(long = "type", short = 't')]
    pub kind: Option<String>,

    /// Substring match over message, source, type and id
    #[arg(long, short = 'f')]
    pub search: Option<String>,

    /// Time window (all, last-hour, today, week, month)
    #[arg(long, default_value = "all")]
    pub period: Period,

    /// Sort field (timestamp, severity, score); backend order when omitted
    #[arg(long)]
    pub sort: Option<SortField>,

    /// Sort direction (asc, desc)
    #[arg(long, default_value = "desc", requires = "sort")]
    pub order: SortOrder,

    /// Show at most this many incidents
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Time window the counts are taken over (all, last-hour, today, week, month)
    #[arg(long, default_value = "all")]
    pub period: Period,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Don't ring the terminal bell for high and critical incidents
    #[arg(long)]
    pub no_bell: bool,
}

// ── Admin ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Stored incident totals and generator state
    Stats,

    /// Control the background incident generator
    #[command(alias = "gen")]
    Generator(GeneratorArgs),

    /// Create a batch of test incidents right away
    GenerateTest {
        /// Number of incidents to create
        #[arg(long, short = 'n', default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=1000))]
        count: u32,
    },

    /// Create a burst of 20 mostly anomalous incidents
    Crisis,

    /// Delete every incident stored on the backend
    ClearDb,
}

#[derive(Debug, Args)]
pub struct GeneratorArgs {
    #[command(subcommand)]
    pub command: GeneratorCommand,
}

#[derive(Debug, Subcommand)]
pub enum GeneratorCommand {
    /// Show whether the generator is running
    Status,

    /// Start generating incidents in the background
    Start {
        /// Seconds between incidents
        #[arg(long, short = 'i', default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        /// Percentage of incidents that are anomalies (0-100)
        #[arg(long, short = 'a', default_value_t = 30, value_parser = clap::value_parser!(u8).range(0..=100))]
        anomaly_rate: u8,
    },

    /// Stop the background generator
    Stop,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (passwords masked)
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
