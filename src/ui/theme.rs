use ratatui::style::Color;

/// Theme configuration for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub bg: Color,
    pub fg: Color,
    pub grid_active: Color,
    pub grid_inactive: Color,
    pub grid_cursor: Color,
    pub lane_label: Color,
    pub playhead: Color,
    pub toy: Color,
    pub border: Color,
    pub dimmed: Color,
}

impl Theme {
    /// Default theme - uses terminal's ANSI colors
    pub fn default_theme() -> Self {
        Self {
            name: "default",
            bg: Color::Reset,
            fg: Color::Reset,
            grid_active: Color::Green,
            grid_inactive: Color::DarkGray,
            grid_cursor: Color::Yellow,
            lane_label: Color::Cyan,
            playhead: Color::Magenta,
            toy: Color::Red,
            border: Color::White,
            dimmed: Color::DarkGray,
        }
    }

    /// Classic green CRT phosphor look
    pub fn phosphor_green() -> Self {
        Self {
            name: "phosphor-green",
            bg: Color::Black,
            fg: Color::Rgb(0, 255, 0),
            grid_active: Color::Rgb(0, 255, 0),
            grid_inactive: Color::Rgb(0, 80, 0),
            grid_cursor: Color::Rgb(180, 255, 180),
            lane_label: Color::Rgb(0, 200, 0),
            playhead: Color::Rgb(150, 255, 150),
            toy: Color::Rgb(220, 255, 220),
            border: Color::Rgb(0, 180, 0),
            dimmed: Color::Rgb(0, 60, 0),
        }
    }

    /// Warm amber monochrome CRT
    pub fn amber_crt() -> Self {
        Self {
            name: "amber-crt",
            bg: Color::Black,
            fg: Color::Rgb(255, 176, 0),
            grid_active: Color::Rgb(255, 176, 0),
            grid_inactive: Color::Rgb(80, 55, 0),
            grid_cursor: Color::Rgb(255, 220, 150),
            lane_label: Color::Rgb(200, 140, 0),
            playhead: Color::Rgb(255, 220, 150),
            toy: Color::Rgb(255, 240, 200),
            border: Color::Rgb(180, 125, 0),
            dimmed: Color::Rgb(60, 40, 0),
        }
    }

    /// Get theme by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default_theme()),
            "phosphor-green" => Some(Self::phosphor_green()),
            "amber-crt" => Some(Self::amber_crt()),
            _ => None,
        }
    }

    /// List all available theme names
    pub fn available_themes() -> &'static [&'static str] {
        &["default", "phosphor-green", "amber-crt"]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme()
    }
}
