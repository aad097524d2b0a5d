const DEFAULT_AFTER_HELP: &str = "Refer to the crate's documentation for further help";

#[derive(clap::Parser, Debug)]
#[command(version, after_help=DEFAULT_AFTER_HELP)]
#[command(about="Reachability-based schedulability analysis of real-time workloads \
under a pluggable online scheduling policy")]
pub struct Args {
    /// System model data file (JSON)
    #[arg(short='i', value_name="MODEL FILE")]
    pub model_file: String,

    /// Maximum wall-clock time allowed, in seconds (zero means no limit)
    #[arg(short='l', long="time-limit", value_name="SECONDS", default_value_t=14400.0)]
    pub time_limit: f64,

    /// Use the naive exploration method: no state merging, no peeking
    #[arg(short='n', long="naive", action=clap::ArgAction::SetTrue)]
    pub naive: bool,

    /// Print the summary without formatting
    #[arg(short='r', long="raw", action=clap::ArgAction::SetTrue)]
    pub raw: bool,

    /// Name of the response-time output file; the DOT file shares its stem
    #[arg(short='o', long="output", value_name="PATH", default_value="out.csv")]
    pub output: String,

    /// Scheduling policy
    #[arg(short='a', long="policy", value_enum, default_value="earliest-deadline-first")]
    pub policy: PolicyChoice,

    /// Skip the resource-availability enumeration
    #[arg(long="no-resources", action=clap::ArgAction::SetTrue)]
    pub no_resources: bool,

    /// Keep the full transition graph for the DOT output
    #[arg(long="keep-graph", action=clap::ArgAction::SetTrue)]
    pub keep_graph: bool,

    /// Print log messages [0-5]
    #[arg(short='e', long="verbose", value_name="LEVEL", default_value_t=0)]
    pub verbose: u8,
}

#[derive(Debug, Clone)]
#[derive(PartialEq, Eq)]
#[derive(clap::ValueEnum)]
pub enum PolicyChoice {
    #[value(name = "earliest-deadline-first", alias("edf"))]
    EarliestDeadlineFirst,
    #[value(name = "fixed-priority", alias("fp"))]
    FixedPriority,
}
