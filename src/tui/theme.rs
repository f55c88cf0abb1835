use ratatui::style::{Color, Modifier, Style};

use crate::render::palette_color;

/// Colors used when drawing widget visuals
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    pub foreground: Color,
    pub background: Color,
    pub border: Color,
    pub title: Color,

    // Table colors
    pub header_fg: Color,
    pub header_bg: Color,
    pub row_alt_bg: Color, // zebra striping

    pub axis: Color,
    pub muted: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "Default Dark".to_string(),
            foreground: Color::Gray,
            background: Color::Reset,
            border: Color::DarkGray,
            title: Color::Cyan,
            header_fg: Color::Cyan,
            header_bg: Color::Reset,
            row_alt_bg: Color::Rgb(25, 25, 35),
            axis: Color::DarkGray,
            muted: Color::DarkGray,
            error: Color::Red,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "Light".to_string(),
            foreground: Color::Black,
            background: Color::White,
            border: Color::Gray,
            title: Color::Blue,
            header_fg: Color::Blue,
            header_bg: Color::Rgb(240, 240, 240),
            row_alt_bg: Color::Rgb(250, 250, 250),
            axis: Color::Gray,
            muted: Color::Gray,
            error: Color::Red,
        }
    }

    /// Look up a theme by its `colorScheme` name; unknown names get the default
    pub fn named(scheme: &str) -> Self {
        match scheme.to_ascii_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.header_fg)
            .bg(self.header_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn normal_style(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.background)
    }

    pub fn alt_row_style(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.row_alt_bg)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn title_style(&self) -> Style {
        Style::default().fg(self.title).add_modifier(Modifier::BOLD)
    }

    pub fn axis_style(&self) -> Style {
        Style::default().fg(self.axis)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted).add_modifier(Modifier::ITALIC)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    /// Terminal color for a palette slot
    pub fn series_color(&self, index: usize) -> Color {
        parse_hex(palette_color(index)).unwrap_or(self.foreground)
    }
}

/// Parse `#rrggbb` into an RGB terminal color
pub fn parse_hex(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}
