use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{load_settings, ChatController, ProviderMode, Settings};
use shared::{
    domain::SessionId,
    error::{ChatFailure, FailureKind},
};
use tokio::{io::BufReader, sync::broadcast::error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

mod render;
mod repl;

#[derive(Parser, Debug)]
#[command(name = "chat-desktop", about = "Terminal chat client for a /chat/completion backend")]
struct Args {
    /// Backend base url; overrides CHAT_API_URL and chat.toml.
    #[arg(long)]
    api_url: Option<String>,
    /// simulated, history or session
    #[arg(long)]
    mode: Option<ProviderMode>,
    #[arg(long)]
    session_id: Option<String>,
    /// Chat page url whose `session_id` query parameter names the session.
    #[arg(long)]
    page_url: Option<Url>,
    /// Start with the canned demo conversation.
    #[arg(long)]
    seed_greeting: bool,
    #[arg(long)]
    rng_seed: Option<u64>,
}

impl Args {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(v) = &self.api_url {
            settings.api_url = v.clone();
        }
        if let Some(v) = self.mode {
            settings.mode = v;
        }
        if let Some(v) = &self.session_id {
            settings.session_id = Some(v.clone());
        } else if let Some(id) = self.page_url.as_ref().and_then(SessionId::from_page_url) {
            settings.session_id = Some(id.to_string());
        }
        if let Some(v) = self.rng_seed {
            settings.rng_seed = Some(v);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    args.apply_to(&mut settings);
    let provider = match settings.build_provider() {
        Ok(provider) => provider,
        Err(err) => {
            let failure = ChatFailure::new(FailureKind::Configuration, err.to_string());
            eprintln!("! {}", failure.banner());
            return Err(err).context("failed to configure chat backend");
        }
    };
    info!(mode = ?settings.mode, api_url = %settings.api_url, "chat client ready");

    let seed = if args.seed_greeting {
        render::greeting_transcript()
    } else {
        Vec::new()
    };
    let controller = ChatController::with_transcript(provider, seed);

    println!("{}", render::HEADER);
    println!("{}", render::OPENING_LINE);
    for entry in controller.snapshot().await.transcript() {
        for line in render::render_entry(entry) {
            println!("{line}");
        }
    }

    let mut events = controller.subscribe_events();
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = render::render_event(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "renderer fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    repl::run(
        Arc::clone(&controller),
        BufReader::new(tokio::io::stdin()),
        &mut tokio::io::stdout(),
    )
    .await?;

    // Dropping the last handle closes the event channel and stops the renderer.
    drop(controller);
    let _ = renderer.await;

    Ok(())
}
