use ratatui::style::Color;

use crate::search::MatchTier;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub status: Color,
  pub error: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub key_fg: Color,
  pub key_bg: Color,
  pub user: Color,
  pub assistant: Color,
  pub high: Color,
  pub medium: Color,
  pub low: Color,
}

impl Theme {
  pub fn tier_color(&self, tier: MatchTier) -> Color {
    match tier {
      MatchTier::High => self.high,
      MatchTier::Medium => self.medium,
      MatchTier::Low => self.low,
    }
  }
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Nocturne",
    bg: Color::Rgb(18, 18, 28),
    fg: Color::Rgb(224, 222, 244),
    muted: Color::Rgb(110, 106, 134),
    accent: Color::Rgb(156, 132, 255),
    border: Color::Rgb(57, 53, 82),
    status: Color::Rgb(246, 193, 119),
    error: Color::Rgb(235, 111, 146),
    highlight_fg: Color::Rgb(18, 18, 28),
    highlight_bg: Color::Rgb(156, 132, 255),
    stripe_bg: Color::Rgb(24, 24, 36),
    key_fg: Color::Rgb(18, 18, 28),
    key_bg: Color::Rgb(110, 106, 134),
    user: Color::Rgb(156, 207, 216),
    assistant: Color::Rgb(196, 167, 231),
    high: Color::Rgb(74, 222, 128),
    medium: Color::Rgb(250, 204, 21),
    low: Color::Rgb(248, 113, 113),
  },
  Theme {
    name: "Dusk",
    bg: Color::Rgb(40, 42, 54),
    fg: Color::Rgb(248, 248, 242),
    muted: Color::Rgb(98, 114, 164),
    accent: Color::Rgb(255, 121, 198),
    border: Color::Rgb(68, 71, 90),
    status: Color::Rgb(241, 250, 140),
    error: Color::Rgb(255, 85, 85),
    highlight_fg: Color::Rgb(40, 42, 54),
    highlight_bg: Color::Rgb(255, 121, 198),
    stripe_bg: Color::Rgb(46, 48, 62),
    key_fg: Color::Rgb(40, 42, 54),
    key_bg: Color::Rgb(98, 114, 164),
    user: Color::Rgb(139, 233, 253),
    assistant: Color::Rgb(189, 147, 249),
    high: Color::Rgb(80, 250, 123),
    medium: Color::Rgb(241, 250, 140),
    low: Color::Rgb(255, 85, 85),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 248, 240),
    fg: Color::Rgb(40, 40, 40),
    muted: Color::Rgb(140, 136, 126),
    accent: Color::Rgb(0, 110, 160),
    border: Color::Rgb(210, 205, 190),
    status: Color::Rgb(170, 110, 0),
    error: Color::Rgb(190, 30, 45),
    highlight_fg: Color::Rgb(250, 248, 240),
    highlight_bg: Color::Rgb(0, 110, 160),
    stripe_bg: Color::Rgb(242, 239, 228),
    key_fg: Color::Rgb(250, 248, 240),
    key_bg: Color::Rgb(140, 136, 126),
    user: Color::Rgb(0, 110, 160),
    assistant: Color::Rgb(120, 60, 150),
    high: Color::Rgb(22, 130, 60),
    medium: Color::Rgb(170, 110, 0),
    low: Color::Rgb(190, 30, 45),
  },
];

pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(n))).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookup_by_name_ignores_case() {
    assert_eq!(theme_index(Some("dusk")), 1);
    assert_eq!(theme_index(Some("Paper")), 2);
  }

  #[test]
  fn unknown_theme_falls_back_to_first() {
    assert_eq!(theme_index(Some("neon")), 0);
    assert_eq!(theme_index(None), 0);
  }
}
