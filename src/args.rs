use clap::{Parser, Subcommand};

/// Aggregates enrolment, biometric and demographic exports into a per-district summary table.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (directory, default: the current directory) The directory that is searched recursively
    /// for input files. The output file is written in this directory unless --out is given.
    #[clap(long, value_parser)]
    pub root: Option<String>,

    /// (file path, optional) A JSON file listing the input files with an explicit category.
    /// When provided, the input files are not discovered by keyword.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) If specified, the summary table is written to this location. Setting this
    /// option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference summary table. If provided, sentinel will check that the
    /// produced table matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Prints the briefing for a selection of districts, read from the summary table.
    Brief {
        /// (default: all the states) Restricts the briefing to one state.
        #[clap(long, value_parser)]
        state: Option<String>,

        /// (default: all the districts) Restricts the briefing to one district of the
        /// selected state. Ignored when no state is selected.
        #[clap(long, value_parser)]
        district: Option<String>,

        /// (file path, optional) Writes the selected rows of the summary table to this file.
        #[clap(long, value_parser)]
        export: Option<String>,
    },
}
