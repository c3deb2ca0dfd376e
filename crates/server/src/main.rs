mod config;
mod server;
mod store;
mod tui;
mod wire;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use config::ServerConfig;
use server::{ServerEvent, ZoneServer};

#[derive(Parser)]
#[command(name = "outpost-server")]
#[command(about = "Zone server for one shard of the world partition")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    zone_id: Option<u32>,

    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    redis_host: Option<String>,

    #[arg(long)]
    redis_port: Option<u16>,

    #[arg(long)]
    scylla_host: Option<String>,

    #[arg(long)]
    scylla_port: Option<u16>,

    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(zone_id) = args.zone_id {
        config.zone_id = zone_id;
    }
    if let Some(bind) = args.bind {
        config.network.bind = bind;
    }
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(host) = args.redis_host {
        config.storage.redis_host = host;
    }
    if let Some(port) = args.redis_port {
        config.storage.redis_port = port;
    }
    if let Some(host) = args.scylla_host {
        config.storage.scylla_host = host;
    }
    if let Some(port) = args.scylla_port {
        config.storage.scylla_port = port;
    }

    let mut zone_server = ZoneServer::new(&config)?;
    let running = zone_server.running_flag();
    ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        log::info!("zone {} listening on {}", config.zone_id, zone_server.local_addr()?);
        zone_server.run();
        log::info!("zone {} shut down", config.zone_id);
    } else {
        run_with_tui(&mut zone_server)?;
    }

    Ok(())
}

/// Drives the same tick loop `ZoneServer::run` would, but interleaved with
/// terminal redraws and key handling instead of blocking for the process
/// lifetime. `q`/Esc requests shutdown; `k` kicks the first listed client.
fn run_with_tui(zone_server: &mut ZoneServer) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let running = zone_server.running_flag();
    let threads = zone_server.spawn_background_threads();

    while running.load(Ordering::SeqCst) {
        zone_server.tick_if_due(std::time::Instant::now());

        for event in zone_server.drain_events() {
            match event {
                ServerEvent::ClientConnected { connection_id, addr, entity } => {
                    log::info!("client {connection_id} connected from {addr} (entity {entity})");
                }
                ServerEvent::ClientDisconnected { connection_id, reason } => {
                    log::info!("client {connection_id} disconnected: {}", reason.as_str());
                }
                ServerEvent::ConnectionDenied { addr, reason } => {
                    log::warn!("connection denied to {addr}: {reason}");
                }
                ServerEvent::ZoneHandoffCompleted { player_id, target_zone } => {
                    log::info!("player {player_id} handed off to zone {target_zone}");
                }
                ServerEvent::Error { message } => {
                    log::error!("{message}");
                }
            }
        }

        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => running.store(false, Ordering::SeqCst),
                        KeyCode::Char('k') | KeyCode::Char('K') => {
                            if let Some((connection_id, _, _)) = zone_server.client_infos().first() {
                                zone_server.kick_client(*connection_id);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        let stats = zone_server.stats();
        terminal.draw(|frame| {
            tui::render(frame, &stats);
        })?;

        std::thread::sleep(Duration::from_millis(16));
    }

    zone_server.shutdown_connections();
    threads.join();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;
    Ok(())
}
