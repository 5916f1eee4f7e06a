//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use devtail_types::{Platform, PriorityLevel};

/// Devtail - tail and filter Android logcat and iOS simulator logs
#[derive(Parser, Debug)]
#[command(name = "devtail")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Platform to tail
    #[arg(long, value_enum, default_value_t = PlatformArg::Android)]
    pub platform: PlatformArg,

    /// Use a custom path to adb
    #[arg(long, value_name = "PATH")]
    pub adb_path: Option<PathBuf>,

    #[command(flatten)]
    pub priorities: PriorityArgs,

    #[command(subcommand)]
    pub command: Option<FilterCommand>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PlatformArg {
    Android,
    Ios,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Android => Platform::Android,
            PlatformArg::Ios => Platform::Ios,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum FilterCommand {
    /// Show all entries
    All,

    /// Show entries matching the given tags
    Tag {
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Show entries from the application with the given identifier
    App { app_id: String },

    /// Show entries matching the given regexes
    Match {
        #[arg(required = true)]
        regexes: Vec<String>,
    },

    /// Filter using custom <tag>:<priority> patterns; `*` is a wildcard tag
    Custom {
        #[arg(required = true)]
        patterns: Vec<String>,
    },
}

/// Minimum-priority letter flags. The effective threshold is the least
/// severe of the selected levels; with none selected it is the platform's
/// lowest level.
#[derive(clap::Args, Debug, Default)]
pub struct PriorityArgs {
    /// Unknown priority and above
    #[arg(short = 'u', long)]
    pub unknown: bool,

    /// Verbose priority and above
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Debug priority and above
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Info priority and above
    #[arg(short = 'i', long)]
    pub info: bool,

    /// Warn priority and above
    #[arg(short = 'w', long)]
    pub warn: bool,

    /// Error priority and above
    #[arg(short = 'e', long)]
    pub error: bool,

    /// Fatal priority and above
    #[arg(short = 'f', long)]
    pub fatal: bool,

    /// Silent priority and above
    #[arg(short = 's', long)]
    pub silent: bool,
}

impl PriorityArgs {
    fn selected_letters(&self) -> Vec<char> {
        [
            (self.unknown, 'U'),
            (self.verbose, 'V'),
            (self.debug, 'D'),
            (self.info, 'I'),
            (self.warn, 'W'),
            (self.error, 'E'),
            (self.fatal, 'F'),
            (self.silent, 'S'),
        ]
        .into_iter()
        .filter(|(selected, _)| *selected)
        .map(|(_, letter)| letter)
        .collect()
    }

    /// Resolve the threshold on a platform's scale. Letters the platform
    /// does not know are ignored.
    pub fn min_priority<P: PriorityLevel>(&self) -> P {
        self.selected_letters()
            .into_iter()
            .filter_map(P::try_from_letter)
            .min()
            .unwrap_or(P::LOWEST)
    }
}
