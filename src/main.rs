//! cardiopipe CLI
//!
//! One subcommand per pipeline stage, plus interactive prediction and the
//! HTTP prediction server.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cardiopipe::cli::{
    run_bin, run_combine, run_extract, run_inspect, run_predict, run_relabel, run_train, Cli, Commands, ExtractArgs,
    TrainArgs,
};
use cardiopipe::pipeline::CombineConfig;
use cardiopipe::serve::{self, ServeConfig};
use cardiopipe::utils::print_banner;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Extract {
            year,
            data_dir,
            input,
            output,
            schema,
        } => {
            print_banner(env!("CARGO_PKG_VERSION"));
            let config = ExtractArgs {
                year,
                data_dir,
                input,
                output,
                schema,
            }
            .into_config()?;
            run_extract(&config)
        }
        Commands::Combine { inputs, output } => {
            print_banner(env!("CARGO_PKG_VERSION"));
            run_combine(&CombineConfig { inputs, output })
        }
        Commands::Bin { input, output, config } => {
            print_banner(env!("CARGO_PKG_VERSION"));
            run_bin(&input, &output, config.as_deref())
        }
        Commands::Relabel { input, output, column } => run_relabel(&input, output.as_deref(), &column),
        Commands::Inspect { input, limit } => run_inspect(&input, limit),
        Commands::Train {
            input,
            config,
            output,
            report,
            test_size,
            n_iter,
            cv_folds,
            seed,
            families,
        } => {
            print_banner(env!("CARGO_PKG_VERSION"));
            let config = TrainArgs {
                input,
                config,
                output,
                report,
                test_size,
                n_iter,
                cv_folds,
                seed,
                families,
            }
            .into_config()?;
            run_train(&config)
        }
        Commands::Predict { model } => run_predict(&model),
        Commands::Serve { model, host, port } => {
            let config = ServeConfig {
                host,
                port,
                model_path: model,
            };
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(serve::run(config))
        }
    }
}
