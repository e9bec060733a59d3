//! Fixed color palette for Hue light groups.
//!
//! Colors use the bridge's native `hue`/`sat`/`bri` triple: `hue` is a
//! 16-bit wheel position (0 = red, 25500 = green), `sat` and `bri` top out
//! at 254.

use serde::Serialize;

/// A named palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HueColor {
    #[serde(skip)]
    pub name: &'static str,
    pub hue: u16,
    pub sat: u8,
    pub bri: u8,
}

pub const RED: HueColor = HueColor {
    name: "red",
    hue: 0,
    sat: 254,
    bri: 254,
};

pub const YELLOW: HueColor = HueColor {
    name: "yellow",
    hue: 12750,
    sat: 254,
    bri: 254,
};

pub const GREEN: HueColor = HueColor {
    name: "green",
    hue: 25500,
    sat: 254,
    bri: 254,
};

/// Every color a configuration may reference.
pub static PALETTE: [HueColor; 3] = [RED, YELLOW, GREEN];

/// Look up a palette color by name (case-insensitive, surrounding whitespace ignored).
pub fn by_name(name: &str) -> Option<&'static HueColor> {
    let name = name.trim();
    PALETTE.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Comma-separated list of palette names, for error messages.
pub fn names() -> String {
    PALETTE
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}
