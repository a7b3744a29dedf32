//! Init command implementation
//!
//! Writes a starter `research.toml` and `.env.example` into a directory.

use super::output::Output;
use crate::utils::toml_config::STARTER_CONFIG;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// research.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
}

pub const CONFIG_FILE: &str = "research.toml";

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing research project");

    let base_path = &config.path;
    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
        output.created_dir(&base_path.display().to_string());
    }

    let config_path = base_path.join(CONFIG_FILE);
    if config_path.exists() && !config.force {
        output.warning(&format!("{} already exists!", CONFIG_FILE));
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if let Err(e) = write_file(&config_path, STARTER_CONFIG, config.force) {
        output.error(&format!("Failed to create {}: {}", CONFIG_FILE, e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", CONFIG_FILE);

    let env_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_path, &generate_env_example(), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    output.complete("Research project initialized");

    output.header("Next Steps");
    output.info("1. Set API keys for the providers you use:");
    output.command("cp .env.example .env");
    output.info("2. Start Ollama if you keep the local provider:");
    output.command("ollama pull llama3.2");
    output.info("3. Run a query:");
    output.command("ares-research run \"What changed in EU battery regulation in 2025?\"");
    output.hint("Use --mock-search to try the pipeline without a search API key");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_env_example() -> String {
    r#"# ares-research environment variables
# Copy this file to .env and fill in the values.

# Logging level (trace, debug, info, warn, error)
RUST_LOG=info,ares_research=debug

# OpenAI-compatible provider
# OPENAI_API_KEY=sk-...

# Tavily search (when [search] provider = "tavily")
# TAVILY_API_KEY=tvly-...
"#
    .to_string()
}
