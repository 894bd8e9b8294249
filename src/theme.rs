//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::animator::MORPH_BANDS;
use crate::board::Occupancy;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Piece and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// "Black" pieces.
    pub dark_piece: Color,
    /// "White" pieces.
    pub light_piece: Color,
    /// Playfield background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, stats).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Incoming row and secondary text.
    pub inactive_fg: Color,
    /// Keyboard cursor outline.
    pub cursor: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const DARK_PIECE: Color = Color::Rgb(0x3E, 0x44, 0x51);
const LIGHT_PIECE: Color = Color::Rgb(0xDC, 0xDF, 0xE4);

impl Theme {
    /// One Dark defaults. Pieces are the darkest and lightest greys of the palette.
    pub fn onedark_default() -> Self {
        Self {
            dark_piece: DARK_PIECE,
            light_piece: LIGHT_PIECE,
            bg: Color::Rgb(0x28, 0x2C, 0x34),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
            cursor: Color::Rgb(0x61, 0xAF, 0xEF),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// One Dark with the palette override applied.
    pub fn default_for(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override piece colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.dark_piece = Color::Rgb(0x00, 0x00, 0x00);
                self.light_piece = Color::Rgb(0xFF, 0xFF, 0xFF);
                self.bg = Color::Rgb(0x80, 0x80, 0x80);
            }
            crate::Palette::Colorblind => {
                // Blue/orange pair reads well under the common deficiencies.
                self.dark_piece = Color::Rgb(0x00, 0x77, 0xBB);
                self.light_piece = Color::Rgb(0xEE, 0x77, 0x33);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let d = Self::onedark_default();
        Self {
            dark_piece: get("piece_black")
                .or_else(|| get("meter_bg"))
                .unwrap_or(d.dark_piece),
            light_piece: get("piece_white")
                .or_else(|| get("hi_fg"))
                .unwrap_or(d.light_piece),
            bg: get("main_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
            cursor: get("cursor").or_else(|| get("selected_bg")).unwrap_or(d.cursor),
        }
    }

    /// Colour of a settled piece; `None` for Empty.
    #[inline]
    pub fn piece_color(&self, occupancy: Occupancy) -> Option<Color> {
        match occupancy {
            Occupancy::Black => Some(self.dark_piece),
            Occupancy::White => Some(self.light_piece),
            Occupancy::Empty => None,
        }
    }

    /// Intermediate colour for morph band 0 (nearly dark) .. 3 (nearly light).
    pub fn morph_color(&self, band: usize) -> Color {
        let t = (band.min(MORPH_BANDS - 1) + 1) as f32 / (MORPH_BANDS + 1) as f32;
        blend(self.dark_piece, self.light_piece, t)
    }
}

/// Linear blend between two RGB colours; non-RGB colours snap at the midpoint.
pub fn blend(from: Color, to: Color, t: f32) -> Color {
    match (from, to) {
        (Color::Rgb(r1, g1, b1), Color::Rgb(r2, g2, b2)) => {
            let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
            Color::Rgb(mix(r1, r2), mix(g1, g2), mix(b1, b2))
        }
        _ if t < 0.5 => from,
        _ => to,
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&s[range], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}
