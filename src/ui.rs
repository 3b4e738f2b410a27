use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span, Text},
  widgets::{Block, BorderType, List, ListItem, ListState, Padding, Paragraph},
};
use unicode_width::UnicodeWidthChar;

use crate::app::{App, Focus};
use crate::chat::{ChatSession, Role};
use crate::constants::constants;
use crate::search::SearchState;
use crate::session::LoadedSession;
use crate::theme::Theme;
use crate::upload::UploadStatus;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
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

/// Greedy word wrap by display width. Words wider than `width` are split.
pub fn wrap_text(s: &str, width: usize) -> Vec<String> {
  let width = width.max(1);
  let mut lines = Vec::new();
  for paragraph in s.lines() {
    let mut line = String::new();
    let mut line_w = 0;
    for word in paragraph.split_whitespace() {
      let word_w: usize = word.chars().map(|c| c.width().unwrap_or(0)).sum();
      if line_w > 0 && line_w + 1 + word_w > width {
        lines.push(std::mem::take(&mut line));
        line_w = 0;
      }
      if line_w > 0 {
        line.push(' ');
        line_w += 1;
      }
      for c in word.chars() {
        let w = c.width().unwrap_or(0);
        if line_w + w > width && line_w > 0 {
          lines.push(std::mem::take(&mut line));
          line_w = 0;
        }
        line.push(c);
        line_w += w;
      }
    }
    lines.push(line);
  }
  if lines.is_empty() {
    lines.push(String::new());
  }
  lines
}

fn spinner(app: &App) -> &'static str {
  SPINNER[(app.started_at.elapsed().as_millis() / 100) as usize % SPINNER.len()]
}

fn pane_block<'a>(title: Line<'a>, theme: &Theme, focused: bool) -> Block<'a> {
  let border = if focused { theme.accent } else { theme.border };
  Block::bordered()
    .title(title)
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border))
    .padding(Padding::horizontal(1))
}

fn suggestion_items<'a>(suggestions: &'a [String], selected: Option<usize>, theme: &Theme) -> Vec<ListItem<'a>> {
  suggestions
    .iter()
    .enumerate()
    .map(|(i, s)| {
      let style = if Some(i) == selected {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg)
      } else {
        Style::default().fg(theme.accent)
      };
      ListItem::new(Line::from(vec![Span::raw("  › "), Span::styled(s.as_str(), style)]))
    })
    .collect()
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  match app.session.state().loaded() {
    Some(loaded) => render_workspace(frame, app, loaded, main_area),
    None => render_upload(frame, theme, main_area),
  }
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut spans = vec![Span::styled(" ◆ clipsage ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))];

  if let Some(loaded) = app.session.state().loaded() {
    let video = &loaded.video;
    spans.push(Span::styled(" ▶ ", Style::default().fg(theme.muted)));
    spans.push(Span::styled(truncate_str(video.name(), 48), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD)));
    spans.push(Span::styled(format!("  {}", video.size_label()), Style::default().fg(theme.muted)));
    let (upload, color) = match &loaded.upload {
      UploadStatus::Local => (String::new(), theme.muted),
      UploadStatus::InFlight => (format!("  {} uploading", spinner(app)), theme.status),
      UploadStatus::Done(_) => ("  ✓ uploaded".to_string(), theme.high),
      UploadStatus::Failed(_) => ("  ✗ upload failed".to_string(), theme.error),
    };
    spans.push(Span::styled(upload, Style::default().fg(color)));
  }
  frame.render_widget(Line::from(spans), area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_upload(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("◆  Drop a video to get started", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Search it in plain language. Ask it questions.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled(
      "Drag a file onto this window, or type its path below and press Enter.",
      Style::default().fg(theme.muted),
    )),
    Line::from(Span::styled("Any video format works: mp4, mov, webm, mkv…", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text)
    .alignment(Alignment::Center)
    .block(Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)));
  frame.render_widget(paragraph, area);
}

fn render_workspace(frame: &mut Frame, app: &App, loaded: &LoadedSession, area: Rect) {
  let [results_area, chat_area] = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
  render_results(frame, app, loaded, results_area);
  render_chat(frame, app, &loaded.chat, chat_area);
}

fn render_results(frame: &mut Frame, app: &App, loaded: &LoadedSession, area: Rect) {
  let theme = app.theme();
  let focused = app.focus == Focus::Search;
  let title_style = Style::default().fg(theme.accent).add_modifier(Modifier::BOLD);
  let inner_w = area.width.saturating_sub(4) as usize;

  match loaded.search.state() {
    SearchState::Idle => {
      let block = pane_block(Line::from(Span::styled(" Search ", title_style)), theme, focused);
      let mut items = vec![
        ListItem::new(Line::from(Span::styled("Describe a moment to find it.", Style::default().fg(theme.fg)))),
        ListItem::new(Line::from("")),
        ListItem::new(Line::from(Span::styled("Try searching for:", Style::default().fg(theme.muted)))),
      ];
      let selected = if focused { app.selected } else { None };
      items.extend(suggestion_items(&constants().search_suggestions, selected, theme));
      frame.render_widget(List::new(items).block(block), area);
    }
    SearchState::Pending(query) => {
      let block = pane_block(Line::from(Span::styled(" Search ", title_style)), theme, focused);
      let text = vec![
        Line::from(""),
        Line::from(vec![
          Span::styled(format!("{} ", spinner(app)), Style::default().fg(theme.status)),
          Span::styled(format!("Searching for \"{}\"…", truncate_str(query, inner_w.saturating_sub(20))), Style::default().fg(theme.fg)),
        ]),
      ];
      frame.render_widget(Paragraph::new(text).block(block), area);
    }
    SearchState::Failed { query, error } => {
      let block = pane_block(Line::from(Span::styled(" Search ", title_style)), theme, focused);
      let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("Search for \"{}\" failed.", query), Style::default().fg(theme.error))),
      ];
      lines.extend(wrap_text(error, inner_w).into_iter().map(|l| Line::from(Span::styled(l, Style::default().fg(theme.muted)))));
      lines.push(Line::from(""));
      lines.push(Line::from(vec![
        Span::styled(" ^y ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(" Retry", Style::default().fg(theme.muted)),
      ]));
      frame.render_widget(Paragraph::new(lines).block(block), area);
    }
    SearchState::Ready { query, segments } => {
      let count = match segments.len() {
        1 => "1 match found".to_string(),
        n => format!("{} matches found", n),
      };
      let title = Line::from(vec![
        Span::styled(format!(" Results for \"{}\" ", truncate_str(query, inner_w / 2)), title_style),
        Span::styled(format!("· {} ", count), Style::default().fg(theme.muted)),
      ]);
      let block = pane_block(title, theme, focused);

      if segments.is_empty() {
        let text = vec![
          Line::from(""),
          Line::from(Span::styled("No matches found.", Style::default().fg(theme.fg))),
          Line::from(Span::styled("Try different words or a broader description.", Style::default().fg(theme.muted))),
        ];
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
      }

      let items: Vec<ListItem> = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
          let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
          let mut lines = vec![Line::from(vec![
            Span::styled(segment.timestamp_display.clone(), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(segment.match_label(), Style::default().fg(theme.tier_color(segment.tier()))),
          ])];
          lines.extend(
            wrap_text(&segment.explanation, inner_w.saturating_sub(2))
              .into_iter()
              .map(|l| Line::from(Span::styled(l, Style::default().fg(theme.muted)))),
          );
          ListItem::new(Text::from(lines)).bg(bg)
        })
        .collect();

      let list = List::new(items)
        .block(block)
        .highlight_symbol("▶ ")
        .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg));
      let mut state = ListState::default().with_selected(if focused { app.selected } else { None });
      frame.render_stateful_widget(list, area, &mut state);
    }
  }
}

fn render_chat(frame: &mut Frame, app: &App, chat: &ChatSession, area: Rect) {
  let theme = app.theme();
  let focused = app.focus == Focus::Chat;
  let title = Line::from(Span::styled(" Chat ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  let block = pane_block(title, theme, focused);
  let inner = block.inner(area);
  let inner_w = inner.width as usize;

  let mut lines: Vec<Line> = Vec::new();
  for turn in chat.transcript() {
    let color = match turn.role {
      Role::User => theme.user,
      Role::Assistant => theme.assistant,
    };
    lines.push(Line::from(vec![
      Span::styled(turn.role.label(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
      Span::styled(format!(" · {}", turn.created_at.format("%H:%M")), Style::default().fg(theme.muted)),
    ]));
    lines.extend(wrap_text(&turn.text, inner_w).into_iter().map(|l| Line::from(Span::styled(l, Style::default().fg(theme.fg)))));
    lines.push(Line::from(""));
  }

  if chat.is_pending() {
    lines.push(Line::from(vec![
      Span::styled(Role::Assistant.label(), Style::default().fg(theme.assistant).add_modifier(Modifier::BOLD)),
      Span::styled(format!(" {} thinking…", spinner(app)), Style::default().fg(theme.muted)),
    ]));
  }

  let suggestions = chat.suggestions();
  if !suggestions.is_empty() {
    lines.push(Line::from(Span::styled("Try asking:", Style::default().fg(theme.muted))));
    for (i, s) in suggestions.iter().enumerate() {
      let style = if focused && app.selected == Some(i) {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg)
      } else {
        Style::default().fg(theme.accent)
      };
      lines.push(Line::from(vec![Span::raw("  › "), Span::styled(truncate_str(s, inner_w.saturating_sub(4)), style)]));
    }
  }

  // Keep the newest turn in view.
  let scroll = lines.len().saturating_sub(inner.height as usize) as u16;
  frame.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(msg) = app.status_message() {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(info) = &app.info_message {
    (format!(" ℹ  {}", info), Style::default().fg(theme.muted))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let title = match (app.has_video(), app.focus) {
    (false, _) => " Open a video ",
    (true, Focus::Search) => " Search the video ",
    (true, Focus::Chat) => " Ask about the video ",
  };
  let input_block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(theme.accent))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.accent))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = c.width().unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
  frame.set_cursor_position((cursor_x, area.y + 1));
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut keys: Vec<(&str, &str)> = Vec::new();
  match app.session.state().loaded() {
    None => {
      keys.push(("Enter", "Open"));
      keys.push(("^t", "Theme"));
      keys.push(("Esc", "Quit"));
    }
    Some(loaded) => {
      let action = match app.focus {
        Focus::Search => "Search",
        Focus::Chat => "Send",
      };
      keys.push(("Enter", action));
      keys.push(("Tab", if app.focus == Focus::Search { "Chat" } else { "Search" }));
      keys.push(("↑↓", "Select"));
      if loaded.search.retry_query().is_some() {
        keys.push(("^y", "Retry"));
      }
      keys.push(("^r", "New video"));
      keys.push(("^t", "Theme"));
      keys.push(("^c", "Quit"));
    }
  }

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

  let theme_label = format!("{} · {} ", app.focus.label(), theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let label_w = theme_label.chars().count() as u16;
  let right_area = Rect { x: area.x + area.width.saturating_sub(label_w), width: label_w.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

#[cfg(test)]
mod tests {
  use ratatui::{Terminal, backend::TestBackend};

  use super::*;
  use crate::app::tests::{loaded_app, test_app};

  fn render(app: &mut App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
    terminal.draw(|frame| ui(frame, app)).unwrap();
    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
      for x in 0..buffer.area.width {
        out.push_str(buffer[(x, y)].symbol());
      }
      out.push('\n');
    }
    out
  }

  #[test]
  fn wrap_respects_width() {
    assert_eq!(wrap_text("a quick brown fox", 7), vec!["a quick", "brown", "fox"]);
    assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
    assert_eq!(wrap_text("", 5), vec![String::new()]);
  }

  #[test]
  fn wrap_keeps_paragraphs() {
    assert_eq!(wrap_text("one\ntwo", 10), vec!["one", "two"]);
  }

  #[test]
  fn truncate_adds_ellipsis() {
    assert_eq!(truncate_str("clip.mp4", 20), "clip.mp4");
    assert_eq!(truncate_str("a_really_long_name.mp4", 8), "a_reall…");
  }

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("日本", 2), 4);
    assert_eq!(display_width("abc", 2), 2);
  }

  #[test]
  fn upload_screen_without_video() {
    let mut app = test_app();
    let screen = render(&mut app);
    assert!(screen.contains("Drop a video to get started"));
    assert!(screen.contains("Open a video"));
  }

  #[test]
  fn workspace_shows_video_and_greeting() {
    let mut app = loaded_app();
    let screen = render(&mut app);
    assert!(screen.contains("clip.mp4"));
    assert!(screen.contains("0.0 MB"));
    assert!(screen.contains("Try searching for:"));
    assert!(screen.contains("Try asking:"));
    assert!(screen.contains("Search the video"));
  }
}
