pub mod screen;

use std::time::Duration;

use folio::{config::Theme, notify::{Notification, NotificationKind}};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{ui::screen::current_screen, App};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const TOAST_MIN_WIDTH: u16 = 24;

const HELP: &str =
    "(space) play/pause  (n)ext  (p)rev  (1-9) select  (o)pen  (t)heme  (x) dismiss  (q)uit";

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub accent: Color,
    pub muted: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                muted: Color::DarkGray,
            },
            Theme::Dark => Self {
                fg: Color::Gray,
                bg: Color::Black,
                accent: Color::Magenta,
                muted: Color::DarkGray,
            },
        }
    }
}

pub fn draw(app: &App, f: &mut Frame, now: Duration) {
    let palette = Palette::for_theme(app.config.theme);
    let area = f.area();

    f.render_widget(
        Block::default().style(Style::default().fg(palette.fg).bg(palette.bg)),
        area,
    );
    current_screen(app).render(app, f, &palette, now);

    if let Some(notification) = app.page.notifier().visible() {
        render_toast(notification, f, area);
    }
}

/// `mm:ss`
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Cuts `text` to `width` display columns, marking the cut with an ellipsis
pub fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

pub(crate) fn render_loading(app: &App, f: &mut Frame, palette: &Palette, now: Duration) {
    let area = f.area();
    let page = &app.page;
    let fading = page.is_content_visible();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .split(area);

    let mut title_style = Style::default()
        .fg(palette.accent)
        .add_modifier(Modifier::BOLD);
    if fading {
        title_style = title_style.add_modifier(Modifier::DIM);
    }
    f.render_widget(
        Paragraph::new(Span::styled("folio", title_style)).alignment(Alignment::Center),
        chunks[1],
    );

    f.render_widget(
        Paragraph::new(hero_line(app, palette, now)).alignment(Alignment::Center),
        chunks[2],
    );

    let gate = page.gate();
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(palette.accent).bg(palette.bg))
        .ratio(gate.progress().clamp(0.0, 1.0))
        .label(format!(
            "{}/{} resources",
            gate.loaded_count().min(gate.resource_target()),
            gate.resource_target()
        ));
    f.render_widget(gauge, chunks[4]);
}

fn hero_line<'a>(app: &'a App, palette: &Palette, now: Duration) -> Line<'a> {
    let hero = app.page.hero();
    let mut spans = vec![Span::styled(
        hero.visible(now),
        Style::default().fg(palette.fg).add_modifier(Modifier::ITALIC),
    )];
    if hero.caret_visible(now) {
        spans.push(Span::styled("▏", Style::default().fg(palette.accent)));
    }
    Line::from(spans)
}

pub(crate) fn render_page(app: &App, f: &mut Frame, palette: &Palette, now: Duration) {
    let area = f.area();
    let session = app.page.session();
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(palette.muted);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // hero
            Constraint::Length(1),
            Constraint::Length(6), // now playing
            Constraint::Length(3), // session
            Constraint::Min(3),    // playlist
            Constraint::Length(1), // help
        ])
        .split(area);

    f.render_widget(Paragraph::new(hero_line(app, palette, now)), chunks[0]);

    let inner_width = chunks[2].width.saturating_sub(2) as usize;
    let track = session.current_track();
    let mut lines = vec![
        Line::from(Span::styled(fit(&track.title, inner_width), bold)),
        Line::from(Span::styled(fit(&track.artist, inner_width), muted)),
    ];
    if let Some(player) = session.player() {
        lines.push(Line::from(Span::styled(
            format!(
                "{} / {}",
                format_clock(player.position().as_secs() as u32),
                format_clock(player.track_length().as_secs() as u32)
            ),
            muted,
        )));
    }
    if app.page.is_player_unavailable() {
        lines.push(Line::from(Span::styled(
            "Player unavailable. Press (o) to listen in your browser.",
            Style::default().fg(Color::Red),
        )));
    } else if let Some(error) = session.last_error() {
        lines.push(Line::from(Span::styled(
            fit(error, inner_width),
            Style::default().fg(Color::Red),
        )));
    }
    let now_playing = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(muted)
                .title(Span::styled(
                    format!(
                        " {}  {}/{} ",
                        player_status(app),
                        session.current_index() + 1,
                        session.playlist().len()
                    ),
                    Style::default().fg(palette.accent),
                )),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(now_playing, chunks[2]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(muted)
                .title(" focus session "),
        )
        .gauge_style(Style::default().fg(palette.accent).bg(palette.bg))
        .ratio(session.progress().clamp(0.0, 1.0))
        .label(format!(
            "{} / {}",
            format_clock(session.elapsed_seconds()),
            format_clock(session.session_duration_secs())
        ));
    f.render_widget(gauge, chunks[3]);

    let items: Vec<ListItem> = session
        .playlist()
        .tracks()
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let label = format!("{:>2}. {} · {}", i + 1, t.title, t.artist);
            let label = fit(&label, chunks[4].width.saturating_sub(4) as usize);
            if i == session.current_index() {
                ListItem::new(Line::from(vec![
                    Span::styled("▶ ", Style::default().fg(palette.accent)),
                    Span::styled(label, bold.fg(palette.accent)),
                ]))
            } else {
                ListItem::new(Line::from(vec![Span::raw("  "), Span::raw(label)]))
            }
        })
        .collect();
    f.render_widget(
        List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(muted)
                .title(" playlist "),
        ),
        chunks[4],
    );

    f.render_widget(
        Paragraph::new(Span::styled(HELP, muted.add_modifier(Modifier::ITALIC)))
            .alignment(Alignment::Center),
        chunks[5],
    );
}

fn player_status(app: &App) -> &'static str {
    let session = app.page.session();
    if session.player().is_none() {
        if app.page.is_player_unavailable() {
            "offline"
        } else {
            "loading player"
        }
    } else if session.is_session_complete() {
        "session complete"
    } else if session.is_playing() {
        "playing"
    } else {
        "paused"
    }
}

fn render_toast(notification: &Notification, f: &mut Frame, area: Rect) {
    let color = match notification.kind {
        NotificationKind::Info => Color::Cyan,
        NotificationKind::Success => Color::Green,
        NotificationKind::Error => Color::Red,
    };
    let mut style = Style::default().fg(color);
    if notification.is_hiding() {
        style = style.add_modifier(Modifier::DIM);
    }

    let wanted = (notification.message.width() as u16).saturating_add(4);
    let width = wanted.max(TOAST_MIN_WIDTH).min(area.width);
    let toast = Rect {
        x: area.x + area.width - width,
        y: area.y + 1.min(area.height),
        width,
        height: 3,
    }
    .intersection(area);
    if toast.is_empty() {
        return;
    }

    f.render_widget(Clear, toast);
    f.render_widget(
        Paragraph::new(Span::styled(notification.message.as_str(), style))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(style)
                    .title(format!(" {} ", notification.kind)),
            )
            .wrap(Wrap { trim: true }),
        toast,
    );
}
