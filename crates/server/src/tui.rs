//! Ops dashboard: a read-only snapshot of `ServerStats` redrawn every
//! frame. No input handling of its own — `main.rs` owns the key loop and
//! decides when to quit or kick a client.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

use crate::server::ServerStats;

pub fn render(frame: &mut Frame, stats: &ServerStats) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(3), Constraint::Length(5), Constraint::Length(9), Constraint::Min(0)])
        .split(frame.area());

    render_header(frame, chunks[0], stats);
    render_status(frame, chunks[1], stats);
    render_subsystems(frame, chunks[2], stats);
    render_help(frame, chunks[3]);
}

fn render_header(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let title = format!(" Zone {} - Uptime: {} ", stats.zone_id, format_duration(stats.uptime_secs));
    let block = Block::default().title(title).borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan));
    let text = format!("Tick: {}  |  Players: {}  |  Entities: {}", stats.tick, stats.connected_players, stats.entities_active);
    let paragraph = Paragraph::new(text).block(block).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(format!(" QoS: {} | Circuit: {} ", stats.qos_level, stats.circuit_state))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(qos_color(stats.qos_level)));

    let ratio = (stats.connected_players as f64 / 64.0).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(format!("{} players", stats.connected_players));
    frame.render_widget(gauge, area);
}

fn render_subsystems(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default().title(" Subsystems ").borders(Borders::ALL).border_style(Style::default().fg(Color::Yellow));

    let lines = vec![
        Line::from(vec![
            Span::styled("Snapshots sent: ", Style::default().fg(Color::Gray)),
            Span::styled(stats.snapshots_sent.to_string(), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Inputs: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{} received / {} dropped", stats.inputs_received, stats.inputs_dropped), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Anti-cheat violations: ", Style::default().fg(Color::Gray)),
            Span::styled(
                stats.anticheat_violations.to_string(),
                Style::default().fg(if stats.anticheat_violations > 0 { Color::Red } else { Color::White }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Migrations: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} completed / {} failed", stats.migrations_completed, stats.migrations_failed),
                Style::default().fg(if stats.migrations_failed > 0 { Color::Red } else { Color::White }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Write queue dropped: ", Style::default().fg(Color::Gray)),
            Span::styled(
                stats.write_queue_dropped.to_string(),
                Style::default().fg(if stats.write_queue_dropped > 0 { Color::Red } else { Color::White }),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default().title(" Controls ").borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray));
    let text = Paragraph::new("Press 'q' or ESC to quit")
        .block(block)
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
    frame.render_widget(text, area);
}

fn qos_color(level: &str) -> Color {
    if level == "degraded" {
        Color::Red
    } else {
        Color::Green
    }
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{hours:02}:{mins:02}:{secs:02}")
}
