use ratatui::{prelude::*, widgets::*};

use crate::app::{AppState, CustomField, SettingsCategory, SettingsField, View, format_minutes, local_hour};
use crate::mode::Mode;
use crate::scene::{self, DayPeriod};
use crate::timer::Status;

// ============================================================================
// Palette
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub work_color: Color,
    pub short_break_color: Color,
    pub long_break_color: Color,
    pub custom_color: Color,
    pub border_color: Color,
    pub accent_color: Color,
    pub text_color: Color,
}

pub fn palette(period: DayPeriod) -> Theme {
    match period {
        DayPeriod::Day => Theme {
            work_color: Color::Rgb(255, 99, 71),
            short_break_color: Color::Rgb(56, 178, 172),
            long_break_color: Color::Rgb(66, 135, 245),
            custom_color: Color::Rgb(171, 71, 188),
            border_color: Color::Rgb(255, 170, 90),
            accent_color: Color::Rgb(255, 140, 0),
            text_color: Color::White,
        },
        DayPeriod::Night => Theme {
            work_color: Color::Rgb(189, 147, 249),
            short_break_color: Color::Rgb(80, 250, 123),
            long_break_color: Color::Rgb(139, 233, 253),
            custom_color: Color::Rgb(255, 121, 198),
            border_color: Color::Rgb(98, 114, 164),
            accent_color: Color::Rgb(255, 121, 198),
            text_color: Color::Gray,
        },
    }
}

impl Theme {
    fn mode_color(&self, mode: Mode) -> Color {
        match mode {
            Mode::Pomodoro => self.work_color,
            Mode::Short => self.short_break_color,
            Mode::Long => self.long_break_color,
            Mode::Custom => self.custom_color,
        }
    }
}

fn theme(app: &AppState) -> Theme {
    let choice = app.session.settings().general().theme;
    palette(scene::resolve_theme(choice, local_hour()))
}

// ============================================================================
// UI Rendering
// ============================================================================

pub fn render(f: &mut Frame, app: &AppState) {
    let theme = theme(app);
    match app.current_view {
        View::Timer => render_timer(f, app, &theme),
        View::Help => render_help(f, &theme),
        View::Settings => render_settings(f, app, &theme),
        View::CustomTimer => render_custom(f, app, &theme),
    }

    if !app.effects.celebration.is_zero() {
        render_celebration(f, app, &theme);
    }
    if let Some(target) = app.session.pending_switch() {
        render_prompt(
            f,
            &theme,
            "Switch timer?",
            &format!("Stop the running timer and switch to {}?", target.label()),
        );
    } else if app.confirming_reset {
        render_prompt(
            f,
            &theme,
            "Reset settings?",
            "Restore timer and general settings to their defaults?",
        );
    }
    render_toasts(f, app, &theme);
}

fn render_timer(f: &mut Frame, app: &AppState, theme: &Theme) {
    let show_player = app.spotify.is_enabled() && app.session.settings().general().show_spotify;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(if show_player { 4 } else { 0 }),
            Constraint::Length(3),
        ])
        .split(f.size());

    let countdown = app.session.countdown();
    let color = theme.mode_color(countdown.mode());

    let header = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border_color))
        .title(Span::styled(
            " 🍅 TOMATICK ",
            Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD),
        ))
        .title(
            block::Title::from(Span::styled(
                format!(" {} ", app.scene.label),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Right),
        );
    f.render_widget(header, chunks[0]);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(10),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Percentage(10),
        ])
        .split(chunks[1]);

    f.render_widget(mode_tabs(countdown.mode(), theme), sections[1]);

    f.render_widget(
        Paragraph::new(countdown.mode().name())
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        sections[3],
    );

    let secs = countdown.time_left();
    f.render_widget(
        Paragraph::new(format!("{:02}:{:02}", secs / 60, secs % 60))
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        sections[5],
    );

    let (status, status_color) = match countdown.status() {
        Status::Running => (
            format!("{} RUNNING", if app.animation_frame < 10 { "●" } else { "○" }),
            Color::Green,
        ),
        Status::Paused => (
            format!("⏸  PAUSED{}", ".".repeat((app.animation_frame / 5) as usize % 4)),
            Color::Yellow,
        ),
        Status::Idle => ("■ READY".to_string(), Color::Gray),
    };
    f.render_widget(
        Paragraph::new(status)
            .style(Style::default().fg(status_color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        sections[7],
    );

    f.render_widget(
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded))
            .gauge_style(Style::default().fg(color).bg(Color::Black))
            .percent((countdown.progress_ratio() * 100.0) as u16),
        sections[9],
    );

    if show_player {
        render_now_playing(f, app, theme, chunks[2]);
    }

    let controls = vec![
        Line::from(vec![
            span_key("Space", theme),
            Span::raw(" Start/Pause  •  "),
            span_key("R", theme),
            Span::raw(" Restart  •  "),
            span_key("1/2/3", theme),
            Span::raw(" Mode  •  "),
            span_key("C", theme),
            Span::raw(" Custom"),
        ]),
        Line::from(vec![
            span_key("D", theme),
            Span::raw(" Settings  •  "),
            span_key("H", theme),
            Span::raw(" Help  •  "),
            span_key("Q", theme),
            Span::raw(" Quit"),
        ]),
    ];
    f.render_widget(
        Paragraph::new(controls)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );
}

fn mode_tabs(current: Mode, theme: &Theme) -> Paragraph<'static> {
    let mut spans = Vec::new();
    for (i, mode) in Mode::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  │  ", Style::default().fg(Color::DarkGray)));
        }
        let style = if *mode == current {
            Style::default()
                .fg(theme.mode_color(*mode))
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(mode.label(), style));
    }
    Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
}

fn render_now_playing(f: &mut Frame, app: &AppState, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border_color))
        .title(" ♫ Spotify ");

    if !app.spotify.is_connected() {
        let hint = Paragraph::new(Line::from(vec![
            Span::raw("Not connected  •  "),
            span_key("D", theme),
            Span::raw(" → Account to connect"),
        ]))
        .style(Style::default().fg(Color::DarkGray))
        .block(block);
        f.render_widget(hint, area);
        return;
    }

    let now = app.spotify.now_playing();
    let Some(track) = now.track else {
        f.render_widget(
            Paragraph::new("Nothing playing")
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    };

    let inner = block.inner(area);
    f.render_widget(block, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let icon = if now.is_playing { "▶" } else { "⏸" };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("{icon} "), Style::default().fg(Color::Green)),
            Span::styled(track.name.clone(), Style::default().fg(theme.text_color).add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {}", track.artist_line()), Style::default().fg(Color::Gray)),
            Span::styled("   P play/pause  [ ] skip", Style::default().fg(Color::DarkGray)),
        ])),
        rows[0],
    );
    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
            .percent(now.progress as u16)
            .label(""),
        rows[1],
    );
}

fn span_key<'a>(text: &'a str, theme: &Theme) -> Span<'a> {
    Span::styled(text, Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD))
}

fn render_help(f: &mut Frame, theme: &Theme) {
    let area = centered_rect(70, 85, f.size());

    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "⌨️  KEYBOARD SHORTCUTS",
            Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  Timer:"),
        help_line("Space", "Start / pause"),
        help_line("R", "Restart current timer"),
        help_line("1 / 2 / 3", "Pomodoro / short break / long break"),
        help_line("C", "Set a custom timer"),
        help_line("Y / N", "Answer a switch prompt"),
        Line::from(""),
        Line::from("  Spotify:"),
        help_line("P", "Play / pause"),
        help_line("[ / ]", "Previous / next track"),
        Line::from(""),
        Line::from("  General:"),
        help_line("D", "Open settings"),
        help_line("H / ?", "Toggle help"),
        help_line("X", "Dismiss messages"),
        help_line("Q / Esc", "Exit / go back"),
        help_line("Ctrl+C", "Force quit"),
        Line::from(""),
        Line::from(Span::styled(
            "💡 Switching while a timer runs asks first; unanswered prompts keep the timer.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    f.render_widget(
        Paragraph::new(help_text).alignment(Alignment::Left).block(
            Block::default()
                .title(" Help ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.border_color)),
        ),
        area,
    );
}

fn help_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw("    "),
        Span::styled(key, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {}", desc)),
    ])
}

fn on_off(v: bool) -> String {
    if v { "ON".into() } else { "OFF".into() }
}

fn field_row(app: &AppState, field: SettingsField) -> (&'static str, String) {
    let settings = app.session.settings();
    let general = settings.general();
    let sounds = settings.sounds();
    let timers = settings.timers();
    match field {
        SettingsField::AutoStartBreaks => ("▶️  Auto-start breaks", on_off(general.auto_start_breaks)),
        SettingsField::AutoStartPomodoros => {
            ("▶️  Auto-start pomodoros", on_off(general.auto_start_pomodoros))
        }
        SettingsField::ShowNotifications => ("💬 Notifications", on_off(general.show_notifications)),
        SettingsField::ShowSpotify => ("♫  Show Spotify player", on_off(general.show_spotify)),
        SettingsField::PomodoroMinutes => {
            ("🎯 Pomodoro", format_minutes(timers.pomodoro) + " min")
        }
        SettingsField::ShortMinutes => ("☕ Short break", format_minutes(timers.short) + " min"),
        SettingsField::LongMinutes => ("🌴 Long break", format_minutes(timers.long) + " min"),
        SettingsField::SoundEnabled => ("🔔 Sound", on_off(sounds.enabled)),
        SettingsField::SoundType => ("🎵 Sound type", format!("< {} >", sounds.kind.as_str())),
        SettingsField::Volume => ("🔊 Volume", format!("< {}% >", sounds.volume)),
        SettingsField::Theme => ("🎨 Theme", format!("< {} >", general.theme.as_str())),
        SettingsField::Background => {
            let label = scene::find(&general.video_background)
                .map(|s| s.label)
                .unwrap_or("Auto (time of day)");
            ("🖼  Background", format!("< {label} >"))
        }
        SettingsField::SpotifyConnection => {
            let state = if !app.spotify.is_enabled() {
                "Disabled (no client id)".to_string()
            } else if app.spotify.is_connected() {
                "Connected  •  Enter to disconnect".to_string()
            } else {
                "Not connected  •  Enter to paste redirect URL".to_string()
            };
            ("♫  Spotify", state)
        }
    }
}

fn render_settings(f: &mut Frame, app: &AppState, theme: &Theme) {
    let area = centered_rect(70, 85, f.size());

    let tabs: Vec<Span> = SettingsCategory::ALL
        .iter()
        .flat_map(|c| {
            let style = if *c == app.settings_category {
                Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            [Span::styled(c.title(), style), Span::raw("   ")]
        })
        .collect();

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "⚙️  SETTINGS",
            Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(tabs),
        Line::from(""),
        Line::from(Span::styled(
            "  Tab: Category  •  ↑↓/jk: Navigate  •  Enter: Edit  •  Space: Toggle  •  ←→/hl: Cycle  •  R: Reset",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let selected_field = app.selected_field();
    for &field in app.settings_category.fields() {
        let (label, value) = field_row(app, field);
        let selected = selected_field == field;
        let editing = selected && app.settings_editing;

        lines.push(Line::from(""));

        if editing {
            lines.push(Line::from(vec![
                Span::styled("  > ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                Span::styled(label, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            ]));
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(
                    app.settings_input.as_str(),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                Span::styled("█", Style::default().fg(Color::Green)),
            ]));
        } else {
            let (prefix, label_style, value_style) = if selected {
                (
                    "  > ",
                    Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                )
            } else {
                ("    ", Style::default().fg(Color::Gray), Style::default().fg(Color::DarkGray))
            };

            lines.push(Line::from(vec![
                Span::styled(prefix, label_style),
                Span::styled(label, label_style),
            ]));
            lines.push(Line::from(vec![Span::raw("    "), Span::styled(value, value_style)]));
        }
    }

    if app.settings_category == SettingsCategory::Account {
        if let Some(url) = app.auth_url() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  Open this URL, approve, then paste the address you land on:",
                Style::default().fg(Color::Gray),
            )));
            lines.push(Line::from(Span::styled(
                format!("  {url}"),
                Style::default().fg(Color::Cyan),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  💾 Auto-saved",
        Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .title(" Settings ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.border_color)),
        ),
        area,
    );
}

fn render_custom(f: &mut Frame, app: &AppState, theme: &Theme) {
    let area = centered_rect(50, 50, f.size());

    let field = |name: &'static str, value: &str, active: bool| {
        let style = if active {
            Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let cursor = if active { "█" } else { "" };
        Line::from(vec![
            Span::styled(format!("  {name:<8}"), style),
            Span::styled(format!("{value}{cursor}"), style),
        ])
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "⏱  CUSTOM TIMER",
            Style::default().fg(theme.custom_color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        field("Minutes", &app.custom_minutes, app.custom_field == CustomField::Minutes),
        field("Seconds", &app.custom_seconds, app.custom_field == CustomField::Seconds),
        Line::from(""),
    ];
    if let Some(err) = &app.custom_error {
        lines.push(Line::from(Span::styled(
            format!("  {err}"),
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "  Tab: Switch field  •  Enter: Set  •  Esc: Cancel",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Custom ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.border_color)),
        ),
        area,
    );
}

// ============================================================================
// Overlays
// ============================================================================

fn render_prompt(f: &mut Frame, theme: &Theme, title: &str, question: &str) {
    let area = centered_rect(50, 20, f.size());
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(question.to_string(), Style::default().fg(theme.text_color))),
        Line::from(""),
        Line::from(vec![
            span_key("Y", theme),
            Span::raw(" Yes  •  "),
            span_key("N", theme),
            Span::raw(" No"),
        ]),
    ];
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(format!(" {title} "))
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(Color::Yellow)),
            ),
        area,
    );
}

fn render_toasts(f: &mut Frame, app: &AppState, theme: &Theme) {
    let screen = f.size();
    let width = screen.width.min(48);
    let mut y = screen.y + 1;
    for toast in app.effects.toasts.iter().rev().take(3) {
        if y + 4 > screen.bottom() {
            break;
        }
        let area = Rect::new(screen.right().saturating_sub(width + 1), y, width, 4);
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(toast.message.as_str())
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(theme.text_color))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .border_style(Style::default().fg(theme.accent_color)),
                ),
            area,
        );
        y += 4;
    }
}

const SPARKLES: [&str; 4] = ["✦", "✧", "★", "·"];

fn render_celebration(f: &mut Frame, app: &AppState, theme: &Theme) {
    let screen = f.size();
    if screen.width < 4 || screen.height < 4 {
        return;
    }
    let frame = app.animation_frame as u32;
    let buf = f.buffer_mut();
    for i in 0..24u32 {
        // scatter along a fixed pseudo-random lattice, shifted per frame
        let x = screen.x + ((i * 37 + frame * 3) % screen.width as u32) as u16;
        let y = screen.y + ((i * 17 + frame) % screen.height as u32) as u16;
        let glyph = SPARKLES[(i + frame) as usize % SPARKLES.len()];
        let color = if i % 2 == 0 { theme.accent_color } else { Color::Yellow };
        buf.get_mut(x, y).set_symbol(glyph).set_fg(color);
    }
}

fn centered_rect(w: u16, h: u16, r: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h) / 2),
            Constraint::Percentage(h),
            Constraint::Percentage((100 - h) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w) / 2),
            Constraint::Percentage(w),
            Constraint::Percentage((100 - w) / 2),
        ])
        .split(v[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_stays_inside() {
        let outer = Rect::new(0, 0, 100, 40);
        let inner = centered_rect(50, 50, outer);
        assert!(inner.x >= outer.x && inner.right() <= outer.right());
        assert!(inner.y >= outer.y && inner.bottom() <= outer.bottom());
        assert_eq!(inner.width, 50);
    }

    #[test]
    fn day_and_night_palettes_differ() {
        let day = palette(DayPeriod::Day);
        let night = palette(DayPeriod::Night);
        assert_ne!(day.work_color, night.work_color);
        assert_ne!(day.mode_color(Mode::Short), day.mode_color(Mode::Long));
    }
}
