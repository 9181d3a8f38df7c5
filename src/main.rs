//! Huddle CLI entry point.
//!
//! Provides `start` for running the bot, `parse` for one-shot extractor
//! debugging, and `auth`/`upcoming` for per-user calendar operations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use huddle::adapters::slack::{SlackAdapter, SlackConfig};
use huddle::adapters::{AdapterToRouter, RouterToAdapter};
use huddle::calendar::google::GoogleCalendarClient;
use huddle::calendar::oauth::{GoogleOauth, OauthConfig};
use huddle::clock::{Clock, SystemClock};
use huddle::config::HuddleConfig;
use huddle::intent;
use huddle::logging;
use huddle::providers::openai::OpenAiProvider;
use huddle::providers::LlmProvider;
use huddle::router::MessageRouter;

/// Buffer size for the adapter <-> router mpsc channels.
const CHANNEL_BUFFER: usize = 100;

/// Huddle — Slack bot that schedules meetings from chat messages.
#[derive(Parser)]
#[command(name = "huddle", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the Slack bot.
    Start,
    /// Parse a message and print the extracted meeting details as JSON.
    Parse {
        /// Message text to parse.
        text: String,
    },
    /// Complete the Google OAuth handshake for a user.
    Auth {
        /// Slack user ID the credentials belong to.
        #[arg(long)]
        user: String,
        /// Authorization code from the OAuth redirect.
        #[arg(long)]
        code: String,
    },
    /// List a user's upcoming calendar events.
    Upcoming {
        /// Slack user ID whose calendar to read.
        #[arg(long)]
        user: String,
        /// Maximum number of events to list.
        #[arg(long, default_value_t = huddle::calendar::google::DEFAULT_UPCOMING_LIMIT)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets usually come from a local .env in development.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Command::Start => handle_start().await,
        Command::Parse { text } => handle_parse(&text),
        Command::Auth { user, code } => handle_auth(&user, &code).await,
        Command::Upcoming { user, limit } => handle_upcoming(&user, limit).await,
    }
}

/// Run the bot: Socket Mode adapter plus the message router loop.
async fn handle_start() -> anyhow::Result<()> {
    let config = HuddleConfig::load().context("failed to load configuration")?;
    let _logging_guard = logging::init_production(&config.paths.logs_dir)?;

    info!("huddle starting");

    let bot_token = config
        .slack
        .bot_token
        .clone()
        .context("Slack bot token missing: set HUDDLE_SLACK_BOT_TOKEN or [slack].bot_token")?;
    let app_token = config
        .slack
        .app_token
        .clone()
        .context("Slack app token missing: set HUDDLE_SLACK_APP_TOKEN or [slack].app_token")?;
    let api_key = config
        .llm
        .api_key
        .clone()
        .context("OpenAI API key missing: set HUDDLE_OPENAI_API_KEY or [llm].api_key")?;

    let timezone = config.timezone()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let oauth = Arc::new(build_oauth(&config, Arc::clone(&clock))?);
    let calendar = Arc::new(GoogleCalendarClient::new(
        Arc::clone(&oauth),
        Arc::clone(&clock),
    ));
    let llm = Arc::new(OpenAiProvider::with_base_url(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        api_key,
    ));
    info!(model = %llm.model_id(), timezone = %timezone, "message router configured");

    let router = MessageRouter::new(llm, calendar, oauth, clock, timezone);

    let (to_router_tx, mut to_router_rx) = mpsc::channel::<AdapterToRouter>(CHANNEL_BUFFER);
    let (to_adapter_tx, to_adapter_rx) = mpsc::channel::<RouterToAdapter>(CHANNEL_BUFFER);

    let adapter = SlackAdapter::new(SlackConfig {
        bot_token,
        app_token,
        api_base: config.slack.api_base.clone(),
    });
    tokio::spawn(async move {
        if let Err(e) = adapter.run(to_router_tx, to_adapter_rx).await {
            error!(error = %e, "Slack adapter error");
        }
    });

    info!("huddle ready, listening for messages");

    loop {
        tokio::select! {
            msg = to_router_rx.recv() => {
                let Some(AdapterToRouter::Message(message)) = msg else {
                    info!("adapter channel closed");
                    break;
                };

                let reply = router.handle(&message).await;
                if to_adapter_tx
                    .send(RouterToAdapter::SendMessage {
                        channel_id: message.channel_id.clone(),
                        text: reply,
                    })
                    .await
                    .is_err()
                {
                    warn!("adapter outbound channel closed");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal");
                break;
            }
        }
    }

    let _ = to_adapter_tx.send(RouterToAdapter::Shutdown).await;
    info!("huddle shut down cleanly");
    Ok(())
}

/// Parse a message with the extractor and print the result as JSON.
fn handle_parse(text: &str) -> anyhow::Result<()> {
    logging::init_cli();
    let config = HuddleConfig::load().context("failed to load configuration")?;
    let timezone = config.timezone()?;

    if !intent::is_meeting_request(text) {
        anyhow::bail!("not a meeting request");
    }

    let now = SystemClock.now().with_timezone(&timezone).naive_local();
    let details = intent::extract_meeting_details(text, now)
        .context("failed to extract meeting details")?;
    println!("{}", serde_json::to_string_pretty(&details)?);
    Ok(())
}

/// Exchange an OAuth authorization code for stored credentials.
async fn handle_auth(user: &str, code: &str) -> anyhow::Result<()> {
    logging::init_cli();
    let config = HuddleConfig::load().context("failed to load configuration")?;
    let oauth = build_oauth(&config, Arc::new(SystemClock))?;

    oauth
        .exchange_code(user, code)
        .await
        .context("OAuth code exchange failed")?;
    println!("Credentials stored for {user}");
    Ok(())
}

/// List a user's upcoming calendar events.
async fn handle_upcoming(user: &str, limit: u32) -> anyhow::Result<()> {
    logging::init_cli();
    let config = HuddleConfig::load().context("failed to load configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let oauth = Arc::new(build_oauth(&config, Arc::clone(&clock))?);
    let calendar = GoogleCalendarClient::new(oauth, clock);

    let events = calendar
        .list_upcoming(user, limit)
        .await
        .context("failed to list upcoming events")?;
    if events.is_empty() {
        println!("No upcoming events for {user}");
        return Ok(());
    }
    for event in events {
        match event.link {
            Some(link) => println!("{}  {} ({link})", event.start_time, event.summary),
            None => println!("{}  {}", event.start_time, event.summary),
        }
    }
    Ok(())
}

/// Build the OAuth manager from config, failing fast on missing credentials.
fn build_oauth(config: &HuddleConfig, clock: Arc<dyn Clock>) -> anyhow::Result<GoogleOauth> {
    let client_id = config
        .google
        .client_id
        .clone()
        .context("Google client ID missing: set HUDDLE_GOOGLE_CLIENT_ID or [google].client_id")?;
    let client_secret = config.google.client_secret.clone().context(
        "Google client secret missing: set HUDDLE_GOOGLE_CLIENT_SECRET or [google].client_secret",
    )?;

    GoogleOauth::new(
        OauthConfig {
            client_id,
            client_secret,
            redirect_uri: config.google.redirect_uri.clone(),
            tokens_dir: config.google.tokens_dir.clone(),
        },
        clock,
    )
    .context("failed to initialise OAuth token store")
}
