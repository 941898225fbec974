//! # Statute Search Engine Main Driver
//!
//! ## Purpose
//! Main entry point for the statute search engine. Drives the dataset
//! pipeline from the command line and serves the retrieval API.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, command line arguments, environment
//!   variables
//! - **Output**: Dataset files, index artifacts, or a running API server
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Dispatch: build/clean the dataset, build the index, search, or serve

use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use statute_semantic_search::{
    api::ApiServer,
    config::Config,
    dataset::DatasetBuilder,
    encoder,
    errors::{Result, SearchError},
    generation::RemoteGenerator,
    retrieval::RetrievalService,
    AppState,
};

#[actix_web::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .expect("config has a default value");
    let mut config = Config::from_file(config_path)?;

    init_logging(&config)?;
    info!("Configuration loaded from: {}", config_path);

    match matches.subcommand() {
        Some(("build-dataset", sub)) => {
            if let Some(input_dir) = sub.get_one::<String>("input-dir") {
                config.dataset.input_dir = PathBuf::from(input_dir);
            }
            if let Some(output) = sub.get_one::<String>("output") {
                config.dataset.dataset_path = PathBuf::from(output);
            }
            if let Some(chunk_size) = sub.get_one::<usize>("chunk-size") {
                config.dataset.chunk_size = *chunk_size;
            }
            if let Some(overlap) = sub.get_one::<usize>("overlap") {
                config.dataset.overlap = *overlap;
            }
            let report = DatasetBuilder::new(config.dataset.clone()).build()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(("clean-dataset", sub)) => {
            if let Some(input) = sub.get_one::<String>("input") {
                config.dataset.dataset_path = PathBuf::from(input);
            }
            if let Some(output) = sub.get_one::<String>("output") {
                config.dataset.clean_dataset_path = PathBuf::from(output);
            }
            let report = DatasetBuilder::new(config.dataset.clone()).clean()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(("build-index", _)) => {
            let encoder = encoder::from_config(&config.retrieval.encoder);
            let retrieval = RetrievalService::initialize(config.retrieval.clone(), encoder);
            let summary = retrieval.build_index().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Some(("search", sub)) => {
            let query = sub
                .get_one::<String>("query")
                .expect("query is a required argument");
            let top_k = *sub
                .get_one::<usize>("top-k")
                .expect("top-k has a default value");

            let encoder = encoder::from_config(&config.retrieval.encoder);
            let retrieval = RetrievalService::initialize(config.retrieval.clone(), encoder);
            let results = retrieval.search(query, top_k).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        _ => serve(config).await?,
    }

    Ok(())
}

fn cli() -> Command {
    Command::new("statute-search-server")
        .version("0.1.0")
        .author("Legal Search Team")
        .about("Semantic retrieval engine over segmented statute text")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml")
                .global(true),
        )
        .subcommand(Command::new("serve").about("Run the HTTP API server"))
        .subcommand(
            Command::new("build-dataset")
                .about("Build the lossless chunk dataset from statute text files")
                .arg(
                    Arg::new("input-dir")
                        .long("input-dir")
                        .value_name("DIR")
                        .help("Folder containing the statute .txt files"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_name("FILE")
                        .help("Output dataset path"),
                )
                .arg(
                    Arg::new("chunk-size")
                        .long("chunk-size")
                        .value_name("CHARS")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("overlap")
                        .long("overlap")
                        .value_name("CHARS")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("clean-dataset")
                .about("Post-process a dataset: strip TOCs, drop noise, re-chunk")
                .arg(
                    Arg::new("input")
                        .long("input")
                        .value_name("FILE")
                        .help("Input dataset path"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_name("FILE")
                        .help("Output dataset path"),
                ),
        )
        .subcommand(
            Command::new("build-index")
                .about("Encode the dataset and persist the index artifacts"),
        )
        .subcommand(
            Command::new("search")
                .about("Query the built index from the command line")
                .arg(
                    Arg::new("query")
                        .long("query")
                        .value_name("TEXT")
                        .required(true),
                )
                .arg(
                    Arg::new("top-k")
                        .long("top-k")
                        .value_name("N")
                        .default_value("5")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.logging.level).map_err(|_| {
        SearchError::Config {
            message: format!("Invalid log level: {}", config.logging.level),
        }
    })?;

    if config.logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

/// Initialize all application components and run the API server
async fn serve(config: Config) -> Result<()> {
    let config = Arc::new(config);

    info!("Initializing retrieval service...");
    let encoder = encoder::from_config(&config.retrieval.encoder);
    let retrieval = Arc::new(RetrievalService::initialize(
        config.retrieval.clone(),
        encoder,
    ));
    if retrieval.is_built().await {
        info!(
            "Retrieval index ready with {} chunks",
            retrieval.indexed_chunks().await
        );
    } else {
        info!("No persisted index found; POST /rag/build to create one");
    }

    let generator = Arc::new(RemoteGenerator::new(config.generation.clone()));
    let app_state = AppState {
        config: config.clone(),
        retrieval,
        generator,
    };

    info!(
        "Starting statute search engine on {}:{}",
        config.server.host, config.server.port
    );
    ApiServer::new(app_state).run().await
}
