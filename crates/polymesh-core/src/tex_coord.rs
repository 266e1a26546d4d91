/// A texture coordinate together with the texture slot it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexCoord {
    pub u: f64,
    pub v: f64,
    pub index: u16,
}

impl TexCoord {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v, index: 0 }
    }

    pub fn with_index(mut self, index: u16) -> Self {
        self.index = index;
        self
    }
}
