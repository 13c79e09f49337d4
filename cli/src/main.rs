use crate::cli::Cli;
use clap::Parser;
use std::path::MAIN_SEPARATOR;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let f_appender =
        tracing_appender::rolling::hourly(format!(".{}", MAIN_SEPARATOR), "albumgrab.log");
    let (non_blk, _guard) = tracing_appender::non_blocking(f_appender);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("libalbumgrab=debug,albumgrab=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .event_format(tracing_subscriber::fmt::format().pretty())
        .with_writer(non_blk)
        .init();
    let cli = Cli::parse();
    cli.run().await
}
