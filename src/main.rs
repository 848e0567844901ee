mod args;
mod sentinel;

use clap::Parser;
use log::{debug, info};

use std::path::{Path, PathBuf};

use crate::args::{Args, Command};
use crate::sentinel::briefing::{run_briefing, MasterCache, Selection};
use crate::sentinel::{run_pipeline, RunSettings, SentinelResult, DEFAULT_OUTPUT_FILE};

fn run(args: &Args) -> SentinelResult<()> {
    let root = PathBuf::from(args.root.clone().unwrap_or_else(|| ".".to_string()));
    let out = args.out.as_ref().map(PathBuf::from);

    match &args.command {
        None => {
            let settings = RunSettings {
                root,
                out,
                config: args.config.clone(),
                reference: args.reference.clone(),
            };
            let report = run_pipeline(&settings)?;
            info!("run: {:?}", report);
            Ok(())
        }
        Some(Command::Brief {
            state,
            district,
            export,
        }) => {
            let summary = out.unwrap_or_else(|| root.join(DEFAULT_OUTPUT_FILE));
            let mut cache = MasterCache::new(&summary);
            let selection = Selection::new(state.as_deref(), district.as_deref());
            run_briefing(&mut cache, &selection, export.as_deref().map(Path::new))?;
            Ok(())
        }
    }
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    debug!("args: {:?}", args);

    if let Err(e) = run(&args) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
