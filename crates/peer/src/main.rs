mod bot;
mod config;
mod tui;

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use bot::Bot;
use config::{PeerConfig, load_net_config, parse_mode, session_port};
use skirmish::{GameMode, Intent, Session, SessionEvent};
use tui::TuiState;

const STATS_INTERVAL: Duration = Duration::from_secs(5);
const GREETING: &str = "hello from the terminal";

#[derive(Parser)]
#[command(name = "skirmish-peer")]
#[command(about = "Skirmish arena peer: host a match or join one")]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, default_value = "player")]
    name: String,

    #[arg(long, default_value_t = 60)]
    fps: u32,

    #[arg(long)]
    headless: bool,

    #[arg(long, help = "Drive the local player with a scripted bot")]
    bot: bool,

    #[arg(long, help = "JSON file with network tuning")]
    config: Option<PathBuf>,

    #[arg(long, value_parser = parse_mode, help = "Starting mode when hosting (dm, tdm, ctf)")]
    mode: Option<GameMode>,

    #[arg(long, help = "Exit after this many seconds")]
    duration: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Host a match on the given port
    Host {
        #[arg(short, long, help = "Defaults to the config file's port, then 7777")]
        port: Option<u16>,
    },
    /// Join a host by name or address
    Join {
        host: String,
        #[arg(short, long, help = "Defaults to the config file's port, then 7777")]
        port: Option<u16>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut net = match &args.config {
        Some(path) => load_net_config(path)?,
        None => Default::default(),
    };
    if let Some(mode) = args.mode {
        net.initial_mode = mode;
    }

    let config = PeerConfig {
        name: args.name.clone(),
        fps: args.fps,
        bot: args.bot,
        net,
    };

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let mut session = Session::new(&config.name, config.net.clone());
    match &args.command {
        Command::Host { port } => session.start_host(session_port(*port, &config.net))?,
        Command::Join { host, port } => {
            session.join_host(host, session_port(*port, &config.net))?
        }
    }

    let deadline = args.duration.map(|secs| Instant::now() + Duration::from_secs(secs));

    if args.headless {
        log::info!(
            "{} as {} ({})",
            session.role().as_str(),
            config.name,
            session.local_id()
        );
        run_headless(&mut session, &config, deadline)?;
        log::info!("Peer shutting down");
    } else {
        run_with_tui(&mut session, &config, deadline)?;
    }

    session.leave_session();
    Ok(())
}

/// Advances the session by one fixed frame and sleeps off the remainder.
fn step(session: &mut Session, bot: Option<&mut Bot>, dt: f64, started: Instant) {
    let intent: Option<Intent> =
        bot.map(|bot| bot.intent(dt as f32, session.world().local_player()));
    session.update(dt, intent.as_ref());

    let budget = Duration::from_secs_f64(dt);
    let spent = started.elapsed();
    if spent < budget {
        thread::sleep(budget - spent);
    }
}

fn run_headless(
    session: &mut Session,
    config: &PeerConfig,
    deadline: Option<Instant>,
) -> Result<()> {
    let dt = config.frame_time();
    let mut bot = config.bot.then(Bot::new);
    let mut last_stats = Instant::now();

    loop {
        let started = Instant::now();
        if deadline.is_some_and(|d| started >= d) {
            break;
        }

        step(session, bot.as_mut(), dt, started);

        for event in session.drain_events() {
            match event {
                SessionEvent::LinkDown { .. } => log::warn!("{}", event.status_line()),
                SessionEvent::ReconnectFailed { .. } => log::error!("{}", event.status_line()),
                _ => log::info!("{}", event.status_line()),
            }
        }

        if last_stats.elapsed() >= STATS_INTERVAL {
            last_stats = Instant::now();
            log::debug!("{}", serde_json::to_string(&session.diagnostics())?);
        }
    }

    Ok(())
}

fn run_with_tui(
    session: &mut Session,
    config: &PeerConfig,
    deadline: Option<Instant>,
) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let dt = config.frame_time();
    let mut bot = config.bot.then(Bot::new);
    let mut tui_state = TuiState::new();
    let mut running = true;

    while running {
        let started = Instant::now();
        if deadline.is_some_and(|d| started >= d) {
            break;
        }

        step(session, bot.as_mut(), dt, started);

        for event in session.drain_events() {
            match event {
                SessionEvent::LinkDown { .. } => tui_state.log_warn(event.status_line()),
                SessionEvent::ReconnectFailed { .. } => tui_state.log_error(event.status_line()),
                _ => tui_state.log_info(event.status_line()),
            }
        }

        if event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => running = false,
                        KeyCode::Char('c') => session.send_chat(GREETING),
                        KeyCode::Char('m') => {
                            let next = session.world().mode().next();
                            session.change_mode(next);
                        }
                        _ => {}
                    }
                }
            }
        }

        let diag = session.diagnostics();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &diag, session.world());
        })?;
    }

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
