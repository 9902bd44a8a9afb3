use clap::{Args, Parser, Subcommand, ValueEnum};
use nrgsuite::core::log::event::RankingMode;
use serde::Deserialize;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Francis Gaudreault, Eric Morin, Rafael Najmanovich",
    version,
    about = "NRGsuite CLI - Run the FlexAID docking engine and follow its simulation live, or replay a finished simulation log.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the docking engine and monitor the simulation until it ends.
    Run(RunArgs),
    /// Parse a finished simulation log and summarize it.
    Replay(ReplayArgs),
}

#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RankingArg {
    Energy,
    Fitness,
}

impl From<RankingArg> for RankingMode {
    fn from(arg: RankingArg) -> Self {
        match arg {
            RankingArg::Energy => RankingMode::ByEnergy,
            RankingArg::Fitness => RankingMode::ByFitness,
        }
    }
}

/// Settings shared by `run` and `replay` that describe the simulation.
#[derive(Args, Debug, Clone, Default)]
pub struct SimulationArgs {
    /// Path to the configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of generations the engine will run.
    #[arg(short = 'g', long, value_name = "INT")]
    pub generations: Option<u32>,

    /// Number of ranked chromosomes printed per generation.
    #[arg(short = 'n', long = "rows", value_name = "INT")]
    pub rows_per_generation: Option<u32>,

    /// Refresh the display every N generations (the final generation always refreshes).
    #[arg(long = "draw-every", value_name = "INT")]
    pub draw_frequency: Option<u32>,

    /// Which ranked block marks a generation as ready.
    #[arg(long = "ready-by", value_enum, value_name = "MODE")]
    pub ready_ranking: Option<RankingArg>,

    /// Track flexible ligand dihedrals (requires the ligand .inp and .ic files).
    #[arg(long)]
    pub flexible_dihedrals: bool,

    /// Ligand input file with HETTYP and FLEDIH records.
    #[arg(long, value_name = "PATH")]
    pub ligand_inp: Option<PathBuf>,

    /// Ligand internal coordinate file.
    #[arg(long, value_name = "PATH")]
    pub ligand_ic: Option<PathBuf>,

    /// Write every ready generation to this CSV file.
    #[arg(short = 't', long = "table", value_name = "PATH")]
    pub solution_table: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S simulation.generations=500
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub simulation: SimulationArgs,

    // --- Engine ---
    /// Path to the docking engine executable.
    #[arg(short, long, value_name = "PATH", conflicts_with = "shell_command")]
    pub engine: Option<PathBuf>,

    /// A complete command line run through the platform shell instead of --engine.
    #[arg(long, value_name = "CMD")]
    pub shell_command: Option<String>,

    /// Working directory of the engine process.
    #[arg(short = 'w', long, value_name = "PATH")]
    pub work_dir: Option<PathBuf>,

    // --- Output delivery ---
    /// Read the engine's stdout and stderr directly instead of polling a log file.
    #[arg(long, conflicts_with_all = ["log", "update_file"])]
    pub stream: bool,

    /// Log file the engine output is redirected to.
    #[arg(short, long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Incremental update file written by the engine after its ready signal.
    #[arg(short, long, value_name = "PATH")]
    pub update_file: Option<PathBuf>,

    /// Scratch copy used when polling the log.
    #[arg(long, value_name = "PATH")]
    pub scratch: Option<PathBuf>,

    // --- Polling ---
    /// Poll interval in milliseconds.
    #[arg(long, value_name = "MS")]
    pub poll_ms: Option<u64>,

    /// Give up on an unreadable log after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Arguments passed to the engine executable.
    #[arg(last = true, value_name = "ENGINE_ARGS")]
    pub engine_args: Vec<String>,
}

/// Arguments for the `replay` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ReplayArgs {
    /// The finished simulation log to parse.
    #[arg(required = true, value_name = "LOG")]
    pub log: PathBuf,

    #[command(flatten)]
    pub simulation: SimulationArgs,
}
