//! Colour themes, selectable with `--theme`.

use ratatui::style::Color;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    /// Muted colours on black
    #[default]
    Nord,
    /// White on blue
    DosBlue,
    /// Amber on black
    AmberCrt,
    /// Green on black
    GreenPhosphor,
}

impl Theme {
    pub const ALL: [Theme; 4] = [
        Theme::Nord,
        Theme::DosBlue,
        Theme::AmberCrt,
        Theme::GreenPhosphor,
    ];

    pub fn colors(&self) -> ColorScheme {
        match self {
            Theme::Nord => ColorScheme::nord(),
            Theme::DosBlue => ColorScheme::dos_blue(),
            Theme::AmberCrt => ColorScheme::amber_crt(),
            Theme::GreenPhosphor => ColorScheme::green_phosphor(),
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "nord" => Ok(Theme::Nord),
            "dos" | "dosblue" | "dos-blue" => Ok(Theme::DosBlue),
            "amber" | "ambercrt" | "amber-crt" => Ok(Theme::AmberCrt),
            "green" | "greenphosphor" | "green-phosphor" => Ok(Theme::GreenPhosphor),
            _ => Err(anyhow::anyhow!(
                "Unknown theme '{s}'. Available: nord, dos-blue, amber-crt, green-phosphor"
            )),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Nord => write!(f, "nord"),
            Theme::DosBlue => write!(f, "dos-blue"),
            Theme::AmberCrt => write!(f, "amber-crt"),
            Theme::GreenPhosphor => write!(f, "green-phosphor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScheme {
    pub background: Color,
    pub text: Color,
    pub text_dim: Color,
    pub focus_border: Color,
    pub unfocused_border: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    /// Node ids and chain titles
    pub accent: Color,
    /// Public keys and hashes
    pub key: Color,
    /// "Complete" badge on finished games
    pub complete: Color,
    /// Pending entries and the "Updating…" indicator
    pub pending: Color,
    /// Error / no-data banner
    pub banner_error: Color,
}

impl ColorScheme {
    pub fn nord() -> Self {
        Self {
            background: Color::Black,
            text: Color::White,
            text_dim: Color::Gray,
            focus_border: Color::Yellow,
            unfocused_border: Color::Gray,
            selection_bg: Color::Yellow,
            selection_fg: Color::Black,
            accent: Color::Cyan,
            key: Color::LightBlue,
            complete: Color::Green,
            pending: Color::Yellow,
            banner_error: Color::Red,
        }
    }

    pub fn dos_blue() -> Self {
        Self {
            background: Color::Blue,
            text: Color::White,
            text_dim: Color::LightBlue,
            focus_border: Color::Yellow,
            unfocused_border: Color::Cyan,
            selection_bg: Color::Cyan,
            selection_fg: Color::Black,
            accent: Color::LightCyan,
            key: Color::LightYellow,
            complete: Color::LightGreen,
            pending: Color::Yellow,
            banner_error: Color::LightRed,
        }
    }

    pub fn amber_crt() -> Self {
        let amber = Color::Rgb(255, 176, 0);
        let amber_bright = Color::Rgb(255, 200, 100);
        let amber_dim = Color::Rgb(180, 120, 0);

        Self {
            background: Color::Black,
            text: amber,
            text_dim: amber_dim,
            focus_border: amber_bright,
            unfocused_border: amber_dim,
            selection_bg: amber,
            selection_fg: Color::Black,
            accent: amber_bright,
            key: amber_bright,
            complete: Color::Rgb(100, 255, 100),
            pending: amber_bright,
            banner_error: Color::Red,
        }
    }

    pub fn green_phosphor() -> Self {
        let green = Color::Rgb(0, 255, 0);
        let green_dim = Color::Rgb(0, 180, 0);
        let green_bright = Color::Rgb(100, 255, 100);

        Self {
            background: Color::Black,
            text: green,
            text_dim: green_dim,
            focus_border: green_bright,
            unfocused_border: green_dim,
            selection_bg: green,
            selection_fg: Color::Black,
            accent: green_bright,
            key: green_bright,
            complete: green_bright,
            pending: Color::Cyan,
            banner_error: Color::Red, // stands out against green
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::nord()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parsing() {
        assert_eq!("nord".parse::<Theme>().unwrap(), Theme::Nord);
        assert_eq!("NORD".parse::<Theme>().unwrap(), Theme::Nord);
        assert_eq!("dos".parse::<Theme>().unwrap(), Theme::DosBlue);
        assert_eq!("amber".parse::<Theme>().unwrap(), Theme::AmberCrt);
        assert_eq!("green-phosphor".parse::<Theme>().unwrap(), Theme::GreenPhosphor);
        assert!("invalid".parse::<Theme>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for theme in Theme::ALL {
            assert_eq!(theme.to_string().parse::<Theme>().unwrap(), theme);
        }
    }

    #[test]
    fn test_selection_is_readable() {
        for theme in Theme::ALL {
            let c = theme.colors();
            assert_ne!(c.selection_bg, c.selection_fg, "{theme}");
            assert_ne!(c.text, c.background, "{theme}");
        }
    }
}
