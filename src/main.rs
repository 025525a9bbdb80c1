use designmap::cli::{self, Args};
use log::{debug, LevelFilter};
use std::process::ExitCode;
use std::str::FromStr;

fn main() -> ExitCode {
    let args = Args::parse_args();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    debug!("Parsed arguments: {:?}", args);

    cli::run(args)
}
