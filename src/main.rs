//! housing-ml command line: train, register, package, serve

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use housing_ml::artifact::Compression;
use housing_ml::dataset::HousingSource;
use housing_ml::registry::{load_registered_model, register_best_model, DEFAULT_MODEL_NAME};
use housing_ml::serve::{ServeConfig, ServeOverrides, DEFAULT_MODEL_PATH};
use housing_ml::tracking::{connect, TrackingContext};
use housing_ml::train::{
    train_in_context, TrainConfig, DEFAULT_EXPERIMENT_NAME, DEFAULT_RANDOM_STATE,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "housing-ml")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train all candidates, track them, and report the best
    Train {
        /// Experiment the runs are attributed to
        #[arg(long, default_value = DEFAULT_EXPERIMENT_NAME)]
        experiment_name: String,

        /// Tracking store (path, file:// URI or memory:); in-memory if unset
        #[arg(long, env = "TRACKING_URI")]
        tracking_uri: Option<String>,

        /// Seed for the split and stochastic candidates
        #[arg(long, default_value_t = DEFAULT_RANDOM_STATE)]
        random_state: u64,

        /// Parquet file with the housing columns; synthetic data if unset
        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,

        /// Register the best run under this model name
        #[arg(long, value_name = "MODEL_NAME")]
        register: Option<String>,
    },

    /// Register a run's model artifact as a new model version
    Register {
        /// Run holding the model artifact
        #[arg(long)]
        run_id: String,

        /// Registered model name
        #[arg(long, default_value = DEFAULT_MODEL_NAME)]
        model_name: String,

        /// Tracking store holding the run
        #[arg(long, env = "TRACKING_URI")]
        tracking_uri: String,
    },

    /// Write a registered model version to a standalone artifact file
    Package {
        /// Tracking store holding the registry
        #[arg(long, env = "TRACKING_URI")]
        tracking_uri: String,

        /// Registered model name
        #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
        model_name: String,

        /// Registered model version
        #[arg(long, env = "MODEL_VERSION", default_value_t = 1)]
        model_version: u32,

        /// Output file
        #[arg(long, short, default_value = DEFAULT_MODEL_PATH)]
        output: PathBuf,

        /// Payload compression (lz4 or zstd)
        #[arg(long, default_value = "lz4")]
        compression: Compression,
    },

    /// Serve predictions over HTTP
    ///
    /// Settings come from BIND_ADDR, MODEL_PATH, TRACKING_URI, MODEL_NAME and
    /// MODEL_VERSION; flags given here take precedence.
    Serve {
        /// Listen address [default: 0.0.0.0:8000]
        #[arg(long)]
        bind_addr: Option<SocketAddr>,

        /// Packaged model file, preferred when present [default: model.bin]
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Tracking store holding the registry
        #[arg(long)]
        tracking_uri: Option<String>,

        /// Registered model name [default: CaliforniaHousingRegressor]
        #[arg(long)]
        model_name: Option<String>,

        /// Registered model version [default: 1]
        #[arg(long)]
        model_version: Option<u32>,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train {
            experiment_name,
            tracking_uri,
            random_state,
            data,
            register,
        } => {
            let mut builder = TrainConfig::builder()
                .experiment_name(experiment_name)
                .random_state(random_state);
            if let Some(uri) = tracking_uri {
                builder = builder.tracking_uri(uri);
            }
            if let Some(path) = data {
                builder = builder.source(HousingSource::parquet(path));
            }
            train(&builder.build(), register.as_deref())
        }
        Commands::Register {
            run_id,
            model_name,
            tracking_uri,
        } => {
            let backend = connect(Some(tracking_uri.as_str()))
                .with_context(|| format!("opening tracking store {tracking_uri}"))?;
            let version = register_best_model(backend.as_ref(), &run_id, &model_name)
                .with_context(|| format!("registering run {run_id}"))?;
            println!("Registered model: {} v{}", version.name, version.version);
            Ok(())
        }
        Commands::Package {
            tracking_uri,
            model_name,
            model_version,
            output,
            compression,
        } => {
            let backend = connect(Some(tracking_uri.as_str()))
                .with_context(|| format!("opening tracking store {tracking_uri}"))?;
            let artifact = load_registered_model(backend.as_ref(), &model_name, model_version)
                .with_context(|| format!("loading {model_name} v{model_version}"))?;
            let bytes = artifact
                .encode(compression)
                .context("encoding model artifact")?;
            std::fs::write(&output, bytes)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "Packaged {model_name} v{model_version} ({}) to {}",
                artifact.model_name(),
                output.display()
            );
            Ok(())
        }
        Commands::Serve {
            bind_addr,
            model_path,
            tracking_uri,
            model_name,
            model_version,
        } => {
            let config = ServeConfig::from_env()
                .context("reading serving configuration from the environment")?
                .with_overrides(ServeOverrides {
                    bind_addr,
                    model_path,
                    tracking_uri,
                    model_name,
                    model_version,
                });
            let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
            runtime
                .block_on(housing_ml::serve::serve(config))
                .context("serving predictions")
        }
    }
}

fn train(config: &TrainConfig, register: Option<&str>) -> Result<()> {
    let backend = connect(config.tracking_uri()).context("opening tracking store")?;
    let ctx = TrackingContext::new(backend, config.experiment_name())
        .with_context(|| format!("resolving experiment {}", config.experiment_name()))?;

    let result = train_in_context(&ctx, config).context("training candidates")?;
    println!("{result}");

    if let Some(model_name) = register {
        let version = register_best_model(ctx.backend().as_ref(), &result.best_run_id, model_name)
            .context("registering best model")?;
        println!("Registered model: {} v{}", version.name, version.version);
    }
    Ok(())
}
