use polymesh_core::{DataType, MeshInfo};

/// How an STL stream is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlMode {
    Ascii,
    Binary,
}

/// Options for every loader.
#[derive(Debug, Clone)]
pub struct LoadSettings {
    /// Enable optional mesh components that the file provides.
    pub enable_optional_components: bool,
    /// Forced STL encoding; `None` sniffs the first bytes of the file.
    pub stl_mode: Option<StlMode>,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            enable_optional_components: true,
            stl_mode: None,
        }
    }
}

impl LoadSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_optional_components(mut self, enable: bool) -> Self {
        self.enable_optional_components = enable;
        self
    }

    pub fn with_stl_mode(mut self, mode: StlMode) -> Self {
        self.stl_mode = Some(mode);
        self
    }
}

/// Options for every writer.
#[derive(Debug, Clone)]
pub struct SaveSettings {
    /// Components to save. `None` saves everything the mesh has; a request is
    /// always intersected with what the mesh really stores.
    pub info: Option<MeshInfo>,
    /// Binary output for PLY and STL.
    pub binary: bool,
    /// Pack STL colors the Materialise Magics way (BGR) instead of RGB.
    pub magics_mode: bool,
    /// PLY type used for positions, normals, quality and texture coordinates.
    pub real_type: DataType,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            info: None,
            binary: true,
            magics_mode: false,
            real_type: DataType::Float64,
        }
    }
}

impl SaveSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_info(mut self, info: MeshInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_magics_mode(mut self, magics: bool) -> Self {
        self.magics_mode = magics;
        self
    }

    pub fn with_real_type(mut self, real_type: DataType) -> Self {
        self.real_type = real_type;
        self
    }

    /// The components that will actually be written for `available`.
    pub fn effective_info(&self, available: &MeshInfo) -> MeshInfo {
        match &self.info {
            Some(requested) if !requested.is_empty() => requested.intersect(available),
            _ => available.clone(),
        }
    }
}
