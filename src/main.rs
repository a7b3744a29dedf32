use anyhow::Context;
use ares_research::cli::init::{self, InitConfig, InitResult};
use ares_research::cli::output::Output;
use ares_research::cli::{Cli, Commands};
use ares_research::utils::toml_config::SearchBackend;
use ares_research::{ResearchConfig, WorkflowEngine};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    init_tracing(cli.log_json, cli.verbose);

    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match execute(cli, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so reports on stdout stay clean.
fn init_tracing(json: bool, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}

async fn execute(cli: Cli, output: &Output) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { path, force } => match init::run(InitConfig { path, force }, output) {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(e) => anyhow::bail!("init failed: {}", e),
        },
        Commands::Config => {
            let config = load_config(&cli.config)?;
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            output.header(&format!("Configuration ({})", cli.config.display()));
            println!("\n{}", rendered);
            Ok(())
        }
        Commands::Run {
            query,
            preset,
            no_clarify,
            mock_search,
            json,
            output: report_path,
        } => {
            let mut config = load_config(&cli.config)?;
            if let Some(preset) = preset {
                config.apply_preset(preset);
            }
            if no_clarify {
                config.research.allow_clarification = false;
            }
            if mock_search {
                config.search.provider = SearchBackend::Mock;
            }
            config.validate()?;

            let engine = WorkflowEngine::from_config(&config)?;
            let result = engine.run_query(&query).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output.research_output(&result);
            }

            if let Some(path) = report_path {
                std::fs::write(&path, result.text())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if !json {
                    output.success(&format!("Saved to {}", path.display()));
                }
            }
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<ResearchConfig> {
    ResearchConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}
