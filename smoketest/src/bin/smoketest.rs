//! Command-line entry point.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use smoketest::config::SmokeTestConfig;
use smoketest::events::LoggingEventSink;
use smoketest::lifecycle::TestLifecycle;
use smoketest::local::LocalBackend;
use smoketest::logging::init_tracing;
use smoketest::pipeline::TopologyAssembler;
use smoketest::scenario::{SmokeTestScenario, WordCountScenario};
use smoketest::verify::Verifier;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const SAMPLE_WORDS: &str = "the quick brown fox jumps over the lazy dog \
                            the dog barks and the fox runs";

/// Pipeline smoke-test harness.
#[derive(Parser, Debug)]
#[command(name = "smoketest", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(flatten)]
    endpoints: EndpointArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct EndpointArgs {
    /// Queue coordination endpoint.
    #[arg(long, global = true)]
    queue_endpoint: Option<String>,

    /// Execution engine endpoint.
    #[arg(long, global = true)]
    compute_endpoint: Option<String>,

    /// File store URL.
    #[arg(long, global = true)]
    file_store_endpoint: Option<String>,

    /// Table store URL.
    #[arg(long, global = true)]
    table_store_endpoint: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resources and assembled topology as JSON.
    Plan(WordsArgs),

    /// Run the word-count scenario on the in-process backend.
    Local {
        #[command(flatten)]
        words: WordsArgs,

        /// Override the verification timeout.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct WordsArgs {
    /// File whose whitespace-separated words are fed to the pipeline.
    #[arg(long)]
    words_file: Option<PathBuf>,
}

impl WordsArgs {
    async fn words(&self) -> Result<Vec<String>> {
        let text = match &self.words_file {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
            None => SAMPLE_WORDS.to_string(),
        };
        Ok(text.split_whitespace().map(str::to_string).collect())
    }
}

impl Cli {
    async fn config(&self) -> Result<SmokeTestConfig> {
        let mut config = match &self.config {
            Some(path) => SmokeTestConfig::load(path).await?,
            None => SmokeTestConfig::default(),
        };

        let overrides = [
            (&self.log_level, &mut config.logging.level),
            (&self.log_format, &mut config.logging.format),
            (&self.endpoints.queue_endpoint, &mut config.endpoints.queue),
            (&self.endpoints.compute_endpoint, &mut config.endpoints.compute),
            (&self.endpoints.file_store_endpoint, &mut config.endpoints.file_store),
            (&self.endpoints.table_store_endpoint, &mut config.endpoints.table_store),
        ];
        for (flag, field) in overrides {
            if let Some(value) = flag {
                field.clone_from(value);
            }
        }
        if let Commands::Local {
            timeout_ms: Some(timeout_ms),
            ..
        } = &self.command
        {
            config.verification.timeout_ms = *timeout_ms;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.config().await?;
    init_tracing(&config.logging)?;

    match &cli.command {
        Commands::Plan(words) => {
            let scenario = WordCountScenario::new(&config.word_count, words.words().await?)?;
            let graph = TopologyAssembler::new().build(&config.context(), &scenario.pipeline())?;
            let plan = serde_json::json!({
                "scenario": scenario.name(),
                "resources": scenario.resources(),
                "graph": graph,
                "expectation": scenario.expectation(),
            });
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Local { words, .. } => {
            let scenario = WordCountScenario::new(&config.word_count, words.words().await?)?;
            let backend = LocalBackend::new()
                .with_input(scenario.input_file(), scenario.input_contents());

            let report = TestLifecycle::new(
                config.context().shared(),
                Arc::new(scenario),
                backend.provisioner(),
                Arc::new(backend.engine()),
                Verifier::new(backend.reader(), config.verification_policy()),
            )
            .with_events(Arc::new(LoggingEventSink::default()))
            .run()
            .await;

            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
