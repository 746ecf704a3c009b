pub mod classify;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod providers;
pub mod repl;
pub mod roster;

use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use tracing::info;

use config::Config;
use conversation::Conversation;
use dispatch::Dispatcher;
use gateway::HttpGateway;
use providers::openrouter::OpenRouterEndpoint;
use repl::{SessionEnd, run_repl};
use roster::ModelRoster;

/// Wires the HTTP gateway, seeded conversation and roster described by `cfg`.
pub fn build_dispatcher(client: Client, cfg: &Config) -> Dispatcher<HttpGateway> {
    let gateway = HttpGateway::new(client, OpenRouterEndpoint::from_config(cfg));
    let conversation = Conversation::seeded(&cfg.system_prompt, &cfg.custom_context);
    Dispatcher::new(
        gateway,
        ModelRoster::new(cfg.models.iter().cloned()),
        conversation,
        cfg.max_tokens,
    )
}

/// Runs the client and reports how it ended. The log guard is dropped before
/// this returns, so a caller may exit the process on `SessionEnd::Interrupted`.
pub async fn run() -> Result<SessionEnd> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cfg = Config::from_env().context("Invalid configuration")?;
    info!(
        base_url = %cfg.base_url,
        models = ?cfg.models,
        max_tokens = cfg.max_tokens,
        model_timeout_secs = cfg.model_timeout_secs,
        "loaded runtime configuration"
    );

    let client = Client::builder()
        .build()
        .context("Failed to initialize HTTP client")?;
    let mut dispatcher = build_dispatcher(client, &cfg);

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        run_repl(&mut dispatcher).await
    } else {
        let prompt = args.join(" ");
        let reply = dispatcher.send_user_message(&prompt).await?;
        println!("{}", reply.content.trim());
        Ok(SessionEnd::Finished)
    }
}
