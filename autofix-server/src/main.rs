use clap::{Args, Parser};
use std::path::PathBuf;
use std::process;

mod config;
mod logging;
mod statsd;

#[derive(Parser)]
enum CliCommand {
    /// Serve the autofix endpoints
    Run(ConfigArgs),
    /// Parse and validate a config file, then exit
    ValidateConfig(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    #[arg(long, short)]
    config_file_path: PathBuf,
}

fn load_config(args: &ConfigArgs) -> config::Config {
    match config::Config::from_file(&args.config_file_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

fn main() {
    let cli = CliCommand::parse();

    match &cli {
        CliCommand::Run(args) => {
            let config = load_config(args);
            let _sentry_guard = logging::init(&config.common.logging);

            if let Some(metrics_config) = &config.common.metrics {
                if let Err(err) = statsd::init(metrics_config) {
                    tracing::error!(error = %err, "Metrics are disabled");
                }
            }

            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    tracing::error!(error = %err, "Could not start runtime");
                    process::exit(1);
                }
            };

            tracing::info!("Starting autofix");
            if let Err(err) = runtime.block_on(autofix::run(config.autofix)) {
                tracing::error!(error = %err, "Autofix exited");
                process::exit(1);
            }
        }
        CliCommand::ValidateConfig(args) => {
            let config = load_config(args);
            match config.autofix.validate() {
                Ok(()) => println!("Config is valid"),
                Err(err) => {
                    eprintln!("Invalid config: {err}");
                    process::exit(1);
                }
            }
        }
    }
}
