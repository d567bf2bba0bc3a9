use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use ledbot::config::BotConfig;
use ledbot::dispatch::{DispatchOutcome, EventDispatcher};
use ledbot::led::Led;
use ledbot::logging::{self, targets};
use ledbot::session::SocketModeSession;
use ledbot::web_api::WebApi;
use ledbot_net::http::HttpClient;
use ledbot_net::tls::install_crypto_provider;
use ledbot_net::websocket::WebSocketConfig;
use tracing::{error, info, warn};

/// Config file read when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "ledbot.toml";

#[derive(Parser, Debug)]
#[command(name = "ledbot", version)]
#[command(about = "Switch an LED from Slack app mentions over Socket Mode")]
struct Cli {
    /// Path to the TOML config file [default: ledbot.toml]
    #[arg(short, long, env = "LEDBOT_CONFIG")]
    config: Option<PathBuf>,

    /// App-level token (xapp-...), overrides the config file
    #[arg(long, env = "SLACK_APP_TOKEN", hide_env_values = true)]
    app_token: Option<String>,

    /// Bot token (xoxb-...), overrides the config file
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug);
    install_crypto_provider();

    let config = load_config(cli.config.as_deref())?
        .with_token_overrides(cli.app_token, cli.bot_token);
    let credentials = config.credentials()?;
    let tls = config.tls_config()?;

    let http = HttpClient::builder()
        .tls_config(tls.clone())
        .build()
        .context("failed to build HTTP client")?;
    let api = WebApi::new(
        http,
        config.api_base_url.as_str(),
        credentials.app_token,
        credentials.bot_token,
    );
    let led = Led::from_config(&config.led)?;

    let ws_config = WebSocketConfig::new()
        .tls_config(tls)
        .mask_frames(config.mask_frames);
    let mut session =
        SocketModeSession::new(api.clone(), ws_config).debug_reconnects(config.debug_reconnects);
    let mut dispatcher = EventDispatcher::new(led, api);

    info!(target: targets::APP, base_url = %config.api_base_url, "ledbot starting");

    if let Some(greeting) = &config.startup_message {
        match dispatcher
            .poster()
            .post_message(&greeting.channel, &greeting.text)
            .await
        {
            Ok(()) => info!(target: targets::APP, channel = %greeting.channel, "greeting posted"),
            Err(e) => warn!(target: targets::APP, "failed to post greeting: {}", e),
        }
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(target: targets::APP, "shutting down");
                break;
            }
            _ = step(&mut session, &mut dispatcher) => {}
        }
    }

    Ok(())
}

/// One poll of the session, dispatching whatever it yields.
///
/// Errors are logged; the next step retries from whatever state the session
/// is left in.
async fn step(session: &mut SocketModeSession, dispatcher: &mut EventDispatcher<Led, WebApi>) {
    match session.poll().await {
        Ok(Some(envelope)) => match dispatcher.dispatch(&envelope, session).await {
            Ok(DispatchOutcome::Acknowledged {
                envelope_id,
                command: Some(command),
                replied,
            }) => {
                info!(target: targets::APP, %envelope_id, ?command, replied, "command handled");
            }
            Ok(_) => {}
            Err(e) => error!(
                target: targets::APP,
                kind = %envelope.kind,
                "failed to handle envelope: {}",
                e
            ),
        },
        Ok(None) => tokio::task::yield_now().await,
        Err(e) => error!(
            target: targets::APP,
            state = %session.state(),
            "poll failed: {}",
            e
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<BotConfig> {
    match path {
        Some(path) => BotConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => BotConfig::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("failed to load config from {DEFAULT_CONFIG_PATH}")),
        None => {
            info!(
                target: targets::CONFIG,
                "no {} found, using defaults and environment", DEFAULT_CONFIG_PATH
            );
            Ok(BotConfig::default())
        }
    }
}
