/// An 8-bit-per-channel RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Builds a color from channels in the `[0, 1]` range, rounding to the
    /// nearest byte.
    pub fn from_unit(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::new(unit_to_byte(r), unit_to_byte(g), unit_to_byte(b), unit_to_byte(a))
    }

    pub fn red_f(&self) -> f32 {
        self.r as f32 / 255.0
    }

    pub fn green_f(&self) -> f32 {
        self.g as f32 / 255.0
    }

    pub fn blue_f(&self) -> f32 {
        self.b as f32 / 255.0
    }

    pub fn alpha_f(&self) -> f32 {
        self.a as f32 / 255.0
    }

    /// Channel by position: 0 red, 1 green, 2 blue, 3 alpha.
    pub fn channel(&self, i: usize) -> u8 {
        match i {
            0 => self.r,
            1 => self.g,
            2 => self.b,
            _ => self.a,
        }
    }

    pub fn set_channel(&mut self, i: usize, value: u8) {
        match i {
            0 => self.r = value,
            1 => self.g = value,
            2 => self.b = value,
            _ => self.a = value,
        }
    }

    /// Decodes a 5-5-5 word whose low five bits hold blue and high bits red.
    pub fn from_rgb5(word: u16) -> Self {
        let (low, mid, high) = split_555(word);
        Self::rgb(high, mid, low)
    }

    /// Decodes a 5-5-5 word whose low five bits hold red and high bits blue.
    pub fn from_bgr5(word: u16) -> Self {
        let (low, mid, high) = split_555(word);
        Self::rgb(low, mid, high)
    }

    pub fn to_rgb5(&self) -> u16 {
        join_555(self.b, self.g, self.r)
    }

    pub fn to_bgr5(&self) -> u16 {
        join_555(self.r, self.g, self.b)
    }
}

fn unit_to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn split_555(word: u16) -> (u8, u8, u8) {
    let low = (word % 32) * 8;
    let mid = ((word / 32) % 32) * 8;
    let high = ((word / 1024) % 32) * 8;
    (low as u8, mid as u8, high as u8)
}

fn join_555(low: u8, mid: u8, high: u8) -> u16 {
    (low as u16 / 8) + (mid as u16 / 8) * 32 + (high as u16 / 8) * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_555_packing_orders() {
        let c = Color::rgb(248, 16, 0);
        assert_eq!(Color::from_rgb5(c.to_rgb5()), c);
        assert_eq!(Color::from_bgr5(c.to_bgr5()), c);
        // red in the high bits for rgb5, low bits for bgr5
        assert_eq!(c.to_rgb5() >> 10, 31);
        assert_eq!(c.to_bgr5() & 0x1f, 31);
    }

    #[test]
    fn test_unit_conversion() {
        let c = Color::from_unit(1.0, 0.5, 0.0, 1.0);
        assert_eq!(c, Color::new(255, 128, 0, 255));
        let back = Color::new(1, 77, 254, 3);
        assert_eq!(Color::from_unit(back.red_f(), back.green_f(), back.blue_f(), back.alpha_f()), back);
        assert!((c.red_f() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_channels() {
        let mut c = Color::BLACK;
        c.set_channel(1, 200);
        c.set_channel(3, 10);
        assert_eq!(c, Color::new(0, 200, 0, 10));
        assert_eq!(c.channel(1), 200);
    }
}
