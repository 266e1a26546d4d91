//! The fixed Geomview palette used by OFF files that color with one index.

use polymesh_core::Color;

/// Gray level of each palette entry; all four channels share it.
const GEOMVIEW_LEVELS: [f32; 148] = [
    1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.7, 0.2,
    0.9, 0.1, 0.1, 0.8, 0.7, 0.7, 0.0, 0.9,
    0.2, 0.0, 0.75, 0.8, 0.8, 0.0, 0.0, 0.0,
    0.0, 0.4, 0.4, 0.8, 0.8, 0.7, 0.7, 0.7,
    0.7, 0.0, 0.9, 0.0, 0.0, 0.75, 0.8, 0.4,
    0.0, 0.0, 0.4, 0.8, 0.7, 0.7, 0.0, 0.9,
    0.0, 0.0, 0.75, 0.8, 0.4, 0.0, 0.0, 0.4,
    0.8, 0.7, 0.7, 0.0, 0.9, 0.0, 0.0, 0.75,
    0.8, 0.4, 0.0, 0.0, 0.4, 0.8, 1.0, 1.0,
    1.0, 1.0, 1.0, 1.0, 0.05, 0.7, 0.2, 0.9,
    0.0, 0.1, 0.8, 0.7, 0.7, 0.7, 0.7, 0.0,
    0.0, 0.9, 0.9, 0.0, 0.0, 0.0, 0.0, 0.75,
    0.75, 0.8, 0.8, 0.0, 0.0, 0.0, 0.0, 0.4,
    0.4, 0.8, 0.8, 0.7, 0.7, 0.7, 0.7, 0.0,
    0.9, 0.0, 0.0, 0.75, 0.8, 0.4, 0.0, 0.0,
    0.4, 0.8, 0.7, 0.7, 0.0, 0.9, 0.0, 0.0,
    0.75, 0.8, 0.4, 0.0, 0.0, 0.4, 0.8, 0.7,
    0.7, 0.0, 0.9, 0.0, 0.0, 0.75, 0.8, 0.4,
    0.0, 0.0, 0.4, 0.8,
];

pub const GEOMVIEW_PALETTE_LEN: usize = GEOMVIEW_LEVELS.len();

/// Color of palette entry `index`, or `None` past the end of the table.
pub fn geomview_color(index: usize) -> Option<Color> {
    GEOMVIEW_LEVELS.get(index).map(|level| {
        let c = (level * 255.0) as u8;
        Color::new(c, c, c, c)
    })
}
