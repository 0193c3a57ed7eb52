mod face;

use std::sync::Arc;

use anyhow::Result;
use browser_pilot::config::{DEFAULT_MODEL, DEFAULT_TARGET_URL};
use browser_pilot::{
    AgentConfig, AgentLoop, Brain, BrowserConfig, GeminiClient, ModelConfig, RetryPolicy, logging,
};
use clap::Parser;
use dotenvy::dotenv;
use tokio::sync::broadcast;
use tracing::info;

/// Web front end for the browser agent.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// First port to try; the next nine are fallbacks.
    #[arg(long, env = "PILOT_PORT", default_value_t = 3000)]
    port: u16,

    /// Site every session starts on.
    #[arg(long, env = "PILOT_TARGET_URL", default_value = DEFAULT_TARGET_URL)]
    target_url: String,

    #[arg(long, env = "PILOT_HEADLESS")]
    headless: bool,

    #[arg(long, env = "PILOT_MAX_STEPS", default_value_t = 6)]
    max_steps: usize,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    let model_config = ModelConfig {
        model: cli.model,
        ..ModelConfig::new(cli.api_key)
    };
    let agent_config = AgentConfig {
        target_url: cli.target_url,
        max_steps: cli.max_steps,
        ..AgentConfig::default()
    };
    let browser = BrowserConfig {
        headless: cli.headless,
        ..BrowserConfig::default()
    };

    let gemini = GeminiClient::new(&model_config)?;
    info!(model = gemini.model(), target = %agent_config.target_url, "agent configured");

    let (event_tx, _) = broadcast::channel(64);
    let agent = AgentLoop::new(Brain::new(gemini, RetryPolicy::from(&model_config)), agent_config)
        .with_events(event_tx.clone());

    let state = Arc::new(face::AppState {
        agent,
        browser,
        event_tx,
    });
    face::serve(state, cli.port).await
}
