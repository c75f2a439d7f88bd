use serde::Serialize;

/// Cookie key holding the persisted preference.
pub const THEME_COOKIE: &str = "theme";

/// Persisted light/dark preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Parses a stored value; anything other than `"dark"` means light.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("dark") => Self::Dark,
            _ => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Label for the header toggle button.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Self::Light => "☀️ Light",
            Self::Dark => "🌙 Dark",
        }
    }

    /// Reads the theme from a raw `Cookie` header value.
    pub fn from_cookie_header(header: &str) -> Self {
        let stored = header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == THEME_COOKIE).then_some(value)
        });
        Self::from_stored(stored)
    }
}
