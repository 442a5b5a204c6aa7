use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use flowtrace::cli::{Cli, Commands, FormatArg, Target};
use flowtrace::config::FlowtraceConfig;
use flowtrace::core::Deadline;
use flowtrace::io::output::{create_writer, OutputFormat, ReportWriter};
use flowtrace::io::walker::find_source_files;
use flowtrace::query::{build_session, load_files, Session, TraceOptions};
use std::time::Duration;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Trace {
            target,
            direction,
            depth,
        } => {
            let (session, deadline) = open(&target)?;
            let options = TraceOptions {
                direction: direction.into(),
                max_depth: depth,
            };
            let report = session.trace(&target.variable, &options, &deadline)?;
            let export = match target.format {
                FormatArg::Dot => Some(session.export(&target.variable, &deadline)?),
                _ => None,
            };
            writer_for(&target).write_trace(&report, export.as_ref())
        }
        Commands::Impact { target } => {
            let (session, deadline) = open(&target)?;
            let report = session.impact(&target.variable, &deadline)?;
            writer_for(&target).write_impact(&report)
        }
        Commands::Path { target } => {
            let (session, deadline) = open(&target)?;
            let path = session.calculation(&target.variable, &deadline)?;
            writer_for(&target).write_calculation(&path)
        }
        Commands::Types { target } => {
            let (session, _) = open(&target)?;
            let evolution = session.type_evolution(&target.variable)?;
            writer_for(&target).write_types(&evolution)
        }
    }
}

fn open(target: &Target) -> Result<(Session, Deadline)> {
    let mut config = FlowtraceConfig::load();
    if let Some(depth) = target.max_call_depth {
        config.limits.max_call_depth = depth;
    }
    let paths = find_source_files(&target.path);
    if paths.is_empty() {
        bail!(
            "no supported source files under {}",
            target.path.display()
        );
    }

    let timeout = target.timeout_ms.or(config.limits.timeout_ms);
    let deadline = Deadline::new(timeout.map(Duration::from_millis));

    let files = load_files(&paths)?;
    let session = build_session(files, config, &deadline)
        .with_context(|| format!("analyzing {}", target.path.display()))?;

    for failure in &session.failures {
        eprintln!(
            "{} skipped {}: {}",
            "warning:".yellow(),
            failure.path.display(),
            failure.error
        );
    }
    if session.files_analyzed == 0 {
        bail!("every input file failed to parse");
    }
    Ok((session, deadline))
}

fn writer_for(target: &Target) -> Box<dyn ReportWriter> {
    let format: OutputFormat = target.format.into();
    create_writer(format, Box::new(std::io::stdout()))
}
