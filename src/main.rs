use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::Arc;

use ringcount::cli::Args;
use ringcount::error::Result;
use ringcount::files;
use ringcount::formatter::write_summaries;
use ringcount::pipeline::Pipeline;
use ringcount::reassembler::{EventReassembler, order_files};

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut pipeline = Pipeline::new(args.pipeline_config())?;
    for analyzer in args.build_analyzers()? {
        pipeline.add_analyzer(analyzer);
    }

    let mut out: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let pattern = Arc::clone(pipeline.pattern());
    let events = if args.files.is_empty() {
        log::info!("reading events from stdin");
        EventReassembler::from_reader(io::stdin().lock(), pattern)
    } else {
        let paths = order_files(files::resolve(&args.files)?, &pattern)?;
        log::info!("reading {} file(s)", paths.len());
        EventReassembler::from_files(paths, pattern)
    };

    let stats = pipeline.run(events, &mut out)?;
    log::info!(
        "{} events, {} matched, {} skipped",
        stats.events,
        stats.matched,
        stats.skipped
    );

    let summaries = pipeline.summaries();
    if !summaries.is_empty() {
        write_summaries(&mut out, &summaries, args.json)?;
    }
    out.flush()?;
    Ok(())
}
