use anyhow::{bail, Result};
use chatline_core::{
    clear_remote, ChatSettings, Config, HttpChatClient, RemoteChatClient, SessionController,
    SessionState,
};
use clap::{Parser, Subcommand};
use colored::*;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "chatline")]
#[command(version, about = "Terminal client for chat endpoints")]
struct Cli {
    /// Base URL of the chat endpoint
    #[arg(short, long, global = true)]
    endpoint: Option<String>,
    /// Model to request replies from
    #[arg(short, long, global = true)]
    model: Option<String>,
    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long, global = true)]
    temperature: Option<f64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Send {
        /// Message text
        message: String,
    },
    /// List models offered by the endpoint
    Models,
    /// Clear the endpoint's conversation history
    Clear,
    /// Check that the endpoint is up
    Health,
}

fn init_logging() -> Result<()> {
    use tracing_subscriber::EnvFilter;

    // Logs go to the config directory; stderr belongs to the TUI
    let log_dir = Config::config_dir()?;
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::File::create(log_dir.join("chatline.log"))?;

    let filter =
        EnvFilter::try_from_env("CHATLINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

/// File config, then environment, then command-line flags.
fn resolve_config(cli: &Cli) -> Config {
    let mut config = Config::load()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unreadable config file");
            Config::default()
        })
        .with_env_overrides();

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if let Some(temperature) = cli.temperature {
        config.temperature = Some(temperature);
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = init_logging() {
        eprintln!("{} {}", "warning: logging disabled:".yellow(), err);
    }

    let config = resolve_config(&cli);
    tracing::info!(endpoint = config.endpoint(), "starting");

    match cli.command {
        None => run_tui(&config).await,
        Some(Commands::Send { message }) => send_message(&config, message).await,
        Some(Commands::Models) => list_models(&config).await,
        Some(Commands::Clear) => clear_conversation(&config).await,
        Some(Commands::Health) => check_health(&config).await,
    }
}

async fn run_tui(config: &Config) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(config, events.sender())?;

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

fn client_for(config: &Config) -> Result<HttpChatClient> {
    Ok(HttpChatClient::with_timeout(
        config.endpoint(),
        config.timeout(),
    )?)
}

async fn send_message(config: &Config, message: String) -> Result<()> {
    let client = client_for(config)?;
    let settings: ChatSettings = config.chat_settings();
    let mut session = SessionController::new(settings);

    session.set_text(message)?;
    session.submit(&client).await?;

    match session.state() {
        SessionState::Error(message) => bail!("{}", message),
        _ => {
            if let Some(reply) = session.transcript().last() {
                println!(
                    "{} {}",
                    format!("{}:", "AI").yellow().bold(),
                    reply.content()
                );
            }
            Ok(())
        }
    }
}

async fn list_models(config: &Config) -> Result<()> {
    let client = client_for(config)?;
    let current = config.chat_settings();

    match client.list_models().await {
        Ok(models) if models.is_empty() => {
            println!("{}", "No models found".yellow());
        }
        Ok(models) => {
            println!("{}", "Available models:".bold().blue());
            for model in models {
                let marker = if model.id == current.model() { "*" } else { " " };
                match model.owned_by {
                    Some(owner) => println!(
                        "{} {} {}",
                        marker.green(),
                        model.id.green(),
                        format!("({})", owner).dimmed()
                    ),
                    None => println!("{} {}", marker.green(), model.id.green()),
                }
            }
        }
        Err(err) => bail!("Could not list models: {}", err.user_message()),
    }
    Ok(())
}

async fn clear_conversation(config: &Config) -> Result<()> {
    let client = client_for(config)?;
    clear_remote(&client).await;
    println!("{}", "Chat cleared".green());
    Ok(())
}

async fn check_health(config: &Config) -> Result<()> {
    let client = client_for(config)?;
    match client.health().await {
        Ok(status) => {
            println!(
                "{} {} {}",
                config.endpoint().bold(),
                status.status.green(),
                status.message.unwrap_or_default().dimmed()
            );
            Ok(())
        }
        Err(err) => bail!("{} is unreachable: {}", config.endpoint(), err),
    }
}
