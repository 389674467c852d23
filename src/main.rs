mod cli;
mod config;
mod download;
mod io;
mod logging;
mod outside;
mod result;
mod task;
mod types;
mod url;

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use miette::Result;
use tracing::{debug, info};

use crate::{
    cli::Args,
    config::{FileConfig, Settings},
    outside::{Extractor, Ytdl},
    task::{DownloadRequest, TaskRunner},
    url::VideoReference,
};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version are printed through the same path
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            println!("{report:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    logging::init_logging(args.log_level)?;

    let settings = Settings::resolve(&args, FileConfig::load(args.config.as_deref())?);
    debug!("{settings:?}");

    let mut reference = VideoReference::parse(&args.url)?;
    if settings.clean {
        reference = reference.cleaned();
    }

    let extractor = load_extractor(settings.program.as_deref())?;
    info!("Saving into '{}'", settings.out_dir.display());

    let runner = TaskRunner::new(extractor);
    let task = runner.spawn(DownloadRequest {
        reference,
        out_dir: settings.out_dir,
        mode: settings.mode,
        naming: settings.naming,
    })?;

    for status in task.events() {
        println!("{status}");
    }

    let path = task.wait()?;
    println!("✓ Downloaded successfully to: {}", path.display());
    Ok(())
}

/// Load the external extraction program
fn load_extractor(program: Option<&str>) -> Result<Arc<dyn Extractor>> {
    let ytdl = match program {
        Some(program) => Ytdl::with_program(program)?,
        None => Ytdl::new()?,
    };
    debug!("Using {ytdl:?}");

    Ok(Arc::new(ytdl))
}
