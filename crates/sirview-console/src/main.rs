use anyhow::Context;
use clap::Parser;

use sirview_console::cli::{Cli, Command};
use sirview_console::console::{run_console, ViewerConsole};
use sirview_console::render::FrameRenderer;
use sirview_console::{headless, logging, Session, SessionSettings, ViewerConfig};
use sirview_network::TransportClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ViewerConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(url) = &cli.base_url {
        config.server.base_url = url.clone();
    }
    cli.params.apply(&mut config.simulation);
    config.validate()?;

    let command = cli.command.clone().unwrap_or(Command::Console);
    match &command {
        Command::Console => match config.logging.file_path() {
            Some(path) => logging::init_file(&config.logging.level, &path)?,
            None => logging::init_stderr("off")?,
        },
        _ => logging::init_stderr(&config.logging.level)?,
    }

    let client = TransportClient::new(config.transport())?;
    let params = config.simulation.to_params();
    tracing::debug!(base_url = %config.server.base_url, ?command, "Starting");

    let mut stdout = std::io::stdout();
    match command {
        Command::Console => {
            let settings = SessionSettings {
                tick_period: config.tick_period(),
                live_history: config.playback.live_history,
            };
            let (session, events) = Session::new(client, params, settings);
            let renderer = FrameRenderer::new(
                config.canvas.width,
                config.canvas.height,
                config.canvas.agent_radius,
            );
            run_console(ViewerConsole::new(session, renderer), events).await
        }
        Command::Run => headless::run_batch(&client, &params, &mut stdout).await,
        Command::Stream { limit } => headless::follow_stream(&client, &params, limit, &mut stdout)
            .await
            .map(|_| ()),
        Command::Health => headless::health(&client, &mut stdout).await,
    }
}
