use std::collections::VecDeque;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use skirmish::world::TEAM_NAMES;
use skirmish::{Diagnostics, Role, World};

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn color(self) -> Color {
        match self {
            LogLevel::Info => Color::White,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }
}

pub struct TuiState {
    log: VecDeque<(LogLevel, String)>,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            log: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    fn push(&mut self, level: LogLevel, message: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back((level, message));
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, diag: &Diagnostics, world: &World) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(middle[1]);

    render_header(frame, chunks[0], diag, world);
    render_network(frame, chunks[1], diag);
    render_players(frame, middle[0], world);
    render_chat(frame, side[0], world);
    render_log(frame, side[1], state);
    render_help(frame, chunks[3]);
}

fn render_header(frame: &mut Frame, area: Rect, diag: &Diagnostics, world: &World) {
    let title = format!(" Skirmish Peer - Uptime: {} ", format_duration(diag.uptime as u64));

    let role_color = match diag.role {
        Role::Disconnected => Color::Red,
        Role::Hosting => Color::Green,
        Role::Joined => Color::Cyan,
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(role_color));

    let mut spans = vec![
        Span::styled(diag.role.as_str(), Style::default().fg(role_color)),
        Span::raw(format!(
            "  |  {}  |  Players: {}  |  Time left: {}",
            diag.mode.name(),
            diag.players,
            format_duration(world.time_left().max(0.0) as u64)
        )),
    ];
    if diag.mode.is_team_based() {
        let scores = world.team_scores();
        spans.push(Span::raw(format!(
            "  |  {} {} - {} {}",
            TEAM_NAMES[0], scores[0], scores[1], TEAM_NAMES[1]
        )));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_network(frame: &mut Frame, area: Rect, diag: &Diagnostics) {
    let block = Block::default()
        .title(" Network ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let net = &diag.stats;
    let addr = |a: Option<std::net::SocketAddr>| a.map_or("-".to_string(), |a| a.to_string());
    let ping = diag.ping_ms.map_or("-".to_string(), |p| format!("{:.1}ms", p));

    let lines = vec![
        Line::from(vec![
            Span::styled("Local: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} ({})", addr(diag.local_addr), diag.local_id),
                Style::default().fg(Color::White),
            ),
            Span::styled("  Host: ", Style::default().fg(Color::Gray)),
            Span::styled(addr(diag.host_addr), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Packets: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} sent / {} recv", net.packets_sent, net.packets_received),
                Style::default().fg(Color::White),
            ),
            Span::styled("  Bytes: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} sent / {} recv",
                    format_bytes(net.bytes_sent),
                    format_bytes(net.bytes_received)
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Ping: ", Style::default().fg(Color::Gray)),
            Span::styled(ping, Style::default().fg(Color::White)),
            Span::styled("  Peers: ", Style::default().fg(Color::Gray)),
            Span::styled(diag.peers.to_string(), Style::default().fg(Color::White)),
            Span::styled("  Malformed: ", Style::default().fg(Color::Gray)),
            Span::styled(net.malformed.to_string(), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Failures: ", Style::default().fg(Color::Gray)),
            Span::styled(
                diag.failures.to_string(),
                Style::default().fg(if diag.failures > 0 {
                    Color::Red
                } else {
                    Color::White
                }),
            ),
            Span::styled("  Reconnects: ", Style::default().fg(Color::Gray)),
            Span::styled(diag.reconnects.to_string(), Style::default().fg(Color::White)),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_players(frame: &mut Frame, area: Rect, world: &World) {
    let block = Block::default()
        .title(" Players ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let team_based = world.mode().is_team_based();
    let mut players: Vec<_> = world.players().collect();
    players.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.as_str().cmp(b.id.as_str())));

    let rows = players.into_iter().map(|p| {
        let style = if p.is_local {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if !p.is_alive() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        let team = if team_based {
            TEAM_NAMES[usize::from(p.team) % 2]
        } else {
            "-"
        };
        Row::new(vec![
            Cell::from(p.name.as_str().to_string()),
            Cell::from(team),
            Cell::from(format!("{:.0}", p.health.max(0.0))),
            Cell::from(format!("{:?}", p.weapon)),
            Cell::from(p.score.to_string()),
            Cell::from(format!("{}/{}", p.kills, p.deaths)),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(5),
            Constraint::Length(4),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(7),
        ],
    )
    .header(
        Row::new(vec!["Name", "Team", "HP", "Weapon", "Score", "K/D"])
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
    )
    .block(block);

    frame.render_widget(table, area);
}

fn render_chat(frame: &mut Frame, area: Rect, world: &World) {
    let block = Block::default()
        .title(" Chat ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let lines: Vec<Line> = world
        .chat()
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(format!("{}: ", entry.sender), Style::default().fg(Color::Gray)),
                Span::raw(entry.text.clone()),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .title(" Events ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let visible = area.height.saturating_sub(2) as usize;
    let skip = state.log.len().saturating_sub(visible);
    let lines: Vec<Line> = state
        .log
        .iter()
        .skip(skip)
        .map(|(level, message)| Line::styled(message.clone(), Style::default().fg(level.color())))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("'q'/ESC quit  |  'c' say hello  |  'm' next mode")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
