use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph},
};

use crate::app::{App, Focus};
use crate::constants::constants;
use crate::session::View;
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn rounded(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  if app.session.view() == View::Playing {
    let [header_area, main_area, footer_area] =
      Layout::vertical([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());
    render_header(frame, theme, header_area);
    render_player(frame, app, main_area);
    render_footer(frame, app, footer_area);
    return;
  }

  let [header_area, main_area, endpoint_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, theme, header_area);
  if app.session.show_history && !app.history.is_empty() {
    render_history(frame, app, main_area);
  } else {
    render_welcome(frame, theme, main_area);
  }
  render_endpoint(frame, app, endpoint_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, theme: &Theme, area: Rect) {
  let left = Line::from(Span::styled(" ▶ vp ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let width = (version.len() as u16).min(area.width);
  let right_area = Rect { x: area.x + area.width - width, width, ..area };
  frame.render_widget(right, right_area);
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  Online video parsing", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Paste a video link, pick a parsing endpoint, watch.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("Type a link below and press Enter.", Style::default().fg(theme.muted))),
    Line::from(""),
    Line::from(Span::styled(
      "All resources come from public internet interfaces, for learning and exchange only.",
      Style::default().fg(theme.muted).add_modifier(Modifier::ITALIC),
    )),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(rounded(theme));
  frame.render_widget(paragraph, area);
}

fn render_history(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.focus == Focus::History;
  let inner_w = area.width.saturating_sub(4) as usize;

  let items: Vec<ListItem> = app
    .history
    .entries()
    .iter()
    .enumerate()
    .map(|(i, entry)| {
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      let right = format!("{}  {}", entry.endpoint_name, entry.created_at);
      let right_w = right.chars().count();
      let url = truncate_str(&entry.url, inner_w.saturating_sub(right_w + 2));
      let gap = inner_w.saturating_sub(url.chars().count() + right_w);
      let line = Line::from(vec![
        Span::styled(url, Style::default().fg(theme.fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(theme.muted)),
      ]);
      ListItem::new(line).bg(bg)
    })
    .collect();

  let border = if focused { theme.accent } else { theme.border };
  let list = List::new(items)
    .block(
      Block::bordered()
        .title(format!(" History ({}) ", app.history.len()))
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border)),
    )
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  if focused {
    frame.render_stateful_widget(list, area, &mut app.history_state);
  } else {
    frame.render_widget(list, area);
  }
}

fn render_endpoint(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let position = app.endpoints.position(&app.session.endpoint_id);
  let (name, url) = match app.endpoint() {
    Some(e) => (e.name.as_str(), e.url.as_str()),
    None => (constants().unknown_endpoint_label.as_str(), ""),
  };
  let index = position.map_or("-".to_string(), |i| (i + 1).to_string());
  let line = Line::from(vec![
    Span::styled("◀ ", Style::default().fg(theme.muted)),
    Span::styled(name, Style::default().fg(theme.fg).add_modifier(Modifier::BOLD)),
    Span::styled(" ▶  ", Style::default().fg(theme.muted)),
    Span::styled(format!("{}/{}  ", index, app.endpoints.len()), Style::default().fg(theme.muted)),
    Span::styled(truncate_str(url, area.width.saturating_sub(30) as usize), Style::default().fg(theme.muted)),
  ]);
  let block = rounded(theme)
    .title(" Parsing endpoint ")
    .title_style(Style::default().fg(theme.muted))
    .padding(Padding::horizontal(1));
  frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = app.session.error() {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(info) = &app.info_message {
    (format!(" ℹ  {}", info), Style::default().fg(theme.muted))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let active = app.focus == Focus::Input && app.session.view() == View::Home;
  let border_color = if active { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Video link ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let input = &app.session.input;
  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let paragraph = if input.is_empty() {
    Paragraph::new("https://v.youku.com/...").style(Style::default().fg(theme.muted))
  } else {
    let visible: String = input
      .chars()
      .scan(0usize, |col, c| {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        let start = *col;
        *col += w;
        Some((start, *col, c))
      })
      .skip_while(|(_, end, _)| *end <= app.input_scroll)
      .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
      .map(|(_, _, c)| c)
      .collect();
    Paragraph::new(visible).style(Style::default().fg(theme.fg))
  };
  frame.render_widget(paragraph.block(input_block), area);

  if active && inner_w > 0 {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_player(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let block = rounded(theme)
    .title(Span::styled(" Now Playing ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
    .padding(Padding::new(2, 2, 1, 1));

  let Some(target) = app.session.target() else {
    frame.render_widget(block, area);
    return;
  };

  let inner_w = area.width.saturating_sub(16) as usize;
  let row = |label: &'static str, value: String, style: Style| {
    Line::from(vec![
      Span::styled(format!("{:<10}", label), Style::default().fg(theme.muted)),
      Span::styled(value, style),
    ])
  };
  let mut lines = vec![
    row("Endpoint", target.endpoint_name.clone(), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD)),
    row("Video", truncate_str(&target.video_url, inner_w), Style::default().fg(theme.fg)),
    row(
      "Player",
      truncate_str(&target.composed, inner_w),
      Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
    ),
    Line::from(""),
  ];
  if let Some(path) = &app.page_path {
    lines.push(row("Page", truncate_str(&path.display().to_string(), inner_w), Style::default().fg(theme.muted)));
  }
  lines.push(row("Sandbox", constants().iframe_sandbox.clone(), Style::default().fg(theme.muted)));
  if let Some(err) = app.session.error() {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(format!("⚠  {}", err), Style::default().fg(theme.error))));
  }

  frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = match (app.session.view(), app.focus) {
    (View::Playing, _) => vec![("Enter", "Open"), ("Esc", "Back"), ("^t", "Theme"), ("q", "Quit")],
    (View::Loading, _) => vec![("Esc", "Cancel"), ("^t", "Theme")],
    (View::Home, Focus::History) => vec![("Enter", "Use"), ("j/k", "Navigate"), ("Esc", "Input")],
    (View::Home, Focus::Input) => {
      let mut k = vec![("Enter", "Play"), ("Tab", "Endpoint")];
      if !app.history.is_empty() {
        k.push(("^r", if app.session.show_history { "Hide history" } else { "History" }));
      }
      k.push(("^t", "Theme"));
      k.push(("Esc", "Quit"));
      k
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let width = (theme_label.len() as u16).min(area.width);
  let right_area = Rect { x: area.x + area.width - width, width, ..area };
  frame.render_widget(right, right_area);
}
