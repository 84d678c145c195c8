use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use shipyard::error::INTERRUPTED_EXIT;
use shipyard::redact::RedactingMakeWriter;
use shipyard::{Cli, Pipeline, Redactor, Session, SessionLog};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let redactor = Redactor::new();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("SHIPYARD_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(RedactingMakeWriter::new(redactor.clone())),
        )
        .init();

    let workdir = std::env::current_dir().context("cannot determine the working directory")?;
    let log = SessionLog::create(&workdir, redactor).context("cannot create the session log")?;

    let interrupt_log = log.clone();
    ctrlc::set_handler(move || {
        interrupt_log.error(format!(
            "Interrupted, exiting with code {INTERRUPTED_EXIT}. Full log: {}",
            interrupt_log.path().display()
        ));
        std::process::exit(INTERRUPTED_EXIT);
    })
    .context("cannot install the interrupt handler")?;

    let mut pipeline = Pipeline::new(Session::new(log, workdir));
    let stage = if cli.dry_run {
        pipeline.dry_run()
    } else {
        pipeline.run()
    };

    let code = stage.exit_code().unwrap_or(0);
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
