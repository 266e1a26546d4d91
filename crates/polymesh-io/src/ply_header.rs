//! PLY header: the ordered element/property schema of a PLY body.
//!
//! ```text
//! ply
//! format binary_little_endian 1.0
//! comment TextureFile <this>.png
//! element vertex 8
//! property float x
//! property float y
//! property float z
//! element face 6
//! property list uchar uint vertex_indices
//! end_header
//! ```
//!
//! The order of elements and of their properties is exactly the order of
//! values in the body.

use std::fmt;
use std::io::{BufRead, Write};

use polymesh_core::{Component, DataType, Element, MeshInfo};

use crate::error::{MeshIoError, Result};
use crate::primitives::{Encoding, Endian, LineReader, Tokens};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl PlyFormat {
    pub fn encoding(self) -> Encoding {
        match self {
            PlyFormat::Ascii => Encoding::Ascii,
            PlyFormat::BinaryLittleEndian => Encoding::Binary(Endian::Little),
            PlyFormat::BinaryBigEndian => Encoding::Binary(Endian::Big),
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "ascii" => Some(PlyFormat::Ascii),
            "binary_little_endian" | "binary" => Some(PlyFormat::BinaryLittleEndian),
            "binary_big_endian" => Some(PlyFormat::BinaryBigEndian),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            PlyFormat::Ascii => "ascii",
            PlyFormat::BinaryLittleEndian => "binary_little_endian",
            PlyFormat::BinaryBigEndian => "binary_big_endian",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Vertex,
    Face,
    Edge,
    TriStrips,
    Other(String),
}

impl ElementKind {
    fn parse(token: &str) -> Self {
        match token {
            "vertex" => ElementKind::Vertex,
            "face" => ElementKind::Face,
            "edge" => ElementKind::Edge,
            "tristrips" => ElementKind::TriStrips,
            other => ElementKind::Other(other.to_string()),
        }
    }

    fn keyword(&self) -> &str {
        match self {
            ElementKind::Vertex => "vertex",
            ElementKind::Face => "face",
            ElementKind::Edge => "edge",
            ElementKind::TriStrips => "tristrips",
            ElementKind::Other(name) => name,
        }
    }
}

/// Property names with a meaning; anything else is kept as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyName {
    X,
    Y,
    Z,
    Nx,
    Ny,
    Nz,
    Red,
    Green,
    Blue,
    Alpha,
    Quality,
    TextureU,
    TextureV,
    TexNumber,
    VertexIndices,
    TexCoord,
    Vertex1,
    Vertex2,
    Unknown(String),
}

impl PropertyName {
    pub fn parse(token: &str) -> Self {
        match token {
            "x" => PropertyName::X,
            "y" => PropertyName::Y,
            "z" => PropertyName::Z,
            "nx" => PropertyName::Nx,
            "ny" => PropertyName::Ny,
            "nz" => PropertyName::Nz,
            "red" => PropertyName::Red,
            "green" => PropertyName::Green,
            "blue" => PropertyName::Blue,
            "alpha" => PropertyName::Alpha,
            "quality" | "scalar" => PropertyName::Quality,
            "texture_u" => PropertyName::TextureU,
            "texture_v" => PropertyName::TextureV,
            "texnumber" => PropertyName::TexNumber,
            "vertex_indices" => PropertyName::VertexIndices,
            "texcoord" => PropertyName::TexCoord,
            "vertex1" => PropertyName::Vertex1,
            "vertex2" => PropertyName::Vertex2,
            other => PropertyName::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PropertyName::X => "x",
            PropertyName::Y => "y",
            PropertyName::Z => "z",
            PropertyName::Nx => "nx",
            PropertyName::Ny => "ny",
            PropertyName::Nz => "nz",
            PropertyName::Red => "red",
            PropertyName::Green => "green",
            PropertyName::Blue => "blue",
            PropertyName::Alpha => "alpha",
            PropertyName::Quality => "quality",
            PropertyName::TextureU => "texture_u",
            PropertyName::TextureV => "texture_v",
            PropertyName::TexNumber => "texnumber",
            PropertyName::VertexIndices => "vertex_indices",
            PropertyName::TexCoord => "texcoord",
            PropertyName::Vertex1 => "vertex1",
            PropertyName::Vertex2 => "vertex2",
            PropertyName::Unknown(name) => name,
        }
    }

    /// Axis of a position or normal property, channel of a color property.
    pub fn axis(&self) -> Option<usize> {
        match self {
            PropertyName::X | PropertyName::Nx | PropertyName::Red => Some(0),
            PropertyName::Y | PropertyName::Ny | PropertyName::Green => Some(1),
            PropertyName::Z | PropertyName::Nz | PropertyName::Blue => Some(2),
            PropertyName::Alpha => Some(3),
            _ => None,
        }
    }

    pub fn is_position(&self) -> bool {
        matches!(self, PropertyName::X | PropertyName::Y | PropertyName::Z)
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, PropertyName::Nx | PropertyName::Ny | PropertyName::Nz)
    }

    pub fn is_color(&self) -> bool {
        matches!(
            self,
            PropertyName::Red | PropertyName::Green | PropertyName::Blue | PropertyName::Alpha
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyProperty {
    pub name: PropertyName,
    pub data_type: DataType,
    /// Type of the count prefix, for list properties.
    pub list_size: Option<DataType>,
}

impl PlyProperty {
    pub fn scalar(name: PropertyName, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            list_size: None,
        }
    }

    pub fn list(name: PropertyName, size_type: DataType, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            list_size: Some(size_type),
        }
    }

    pub fn is_list(&self) -> bool {
        self.list_size.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyElement {
    pub kind: ElementKind,
    pub count: usize,
    pub properties: Vec<PlyProperty>,
}

impl PlyElement {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            count: 0,
            properties: Vec::new(),
        }
    }

    pub fn has(&self, name: &PropertyName) -> bool {
        self.properties.iter().any(|p| &p.name == name)
    }
}

/// Type keyword to data type. Unrecognised types read as `uchar`.
pub fn parse_type(token: &str) -> DataType {
    match token {
        "char" | "int8" => DataType::Int8,
        "uchar" | "uint8" => DataType::Uint8,
        "short" | "int16" => DataType::Int16,
        "ushort" | "uint16" => DataType::Uint16,
        "int" | "int32" => DataType::Int32,
        "uint" | "uint32" => DataType::Uint32,
        "float" | "float32" => DataType::Float32,
        "double" | "float64" => DataType::Float64,
        other => {
            log::warn!("unknown PLY type '{other}', reading it as uchar");
            DataType::Uint8
        }
    }
}

pub fn type_keyword(ty: DataType) -> &'static str {
    match ty {
        DataType::Int8 => "char",
        DataType::Uint8 => "uchar",
        DataType::Int16 => "short",
        DataType::Uint16 => "ushort",
        DataType::Int32 => "int",
        DataType::Uint32 => "uint",
        DataType::Float32 => "float",
        DataType::Float64 => "double",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyHeader {
    pub format: PlyFormat,
    pub elements: Vec<PlyElement>,
    pub texture_files: Vec<String>,
}

impl PlyHeader {
    /// Parses a header up to and including `end_header`.
    ///
    /// `<this>` in a texture file comment is replaced by `file_stem`.
    pub fn read<R: BufRead>(lines: &mut LineReader<R>, file_stem: &str) -> Result<Self> {
        let magic = lines.read_line()?;
        if magic.as_deref().map(str::trim) != Some("ply") {
            return Err(MeshIoError::malformed("Header not valid: missing 'ply' magic"));
        }

        let mut format = None;
        let mut elements: Vec<PlyElement> = Vec::new();
        let mut texture_files = Vec::new();
        loop {
            let mut t = lines.expect_tokens("PLY header")?;
            let keyword = t.next_str()?.to_string();
            match keyword.as_str() {
                "end_header" => break,
                "format" => {
                    let token = t.next_str()?;
                    format = Some(PlyFormat::parse(token).ok_or_else(|| {
                        MeshIoError::malformed(format!("Unknown PLY format '{token}'"))
                    })?);
                }
                "comment" => {
                    if let Some(name) = texture_comment(&t, file_stem) {
                        texture_files.push(name);
                    }
                }
                "element" => {
                    let kind = ElementKind::parse(t.next_str()?);
                    let count = t
                        .next_parse()
                        .map_err(|_| MeshIoError::malformed("Bad element count in PLY header"))?;
                    elements.push(PlyElement {
                        kind,
                        count,
                        properties: Vec::new(),
                    });
                }
                "property" => {
                    let property = read_property(&mut t)?;
                    elements
                        .last_mut()
                        .ok_or_else(|| MeshIoError::malformed("PLY property outside of an element"))?
                        .properties
                        .push(property);
                }
                _ => {}
            }
        }

        let header = Self {
            format: format.ok_or_else(|| MeshIoError::malformed("PLY header has no format line"))?,
            elements,
            texture_files,
        };
        if header.element(&ElementKind::Vertex).is_none() {
            return Err(MeshIoError::malformed("Header not valid: no vertex element"));
        }
        Ok(header)
    }

    /// The header for saving the components of `info`.
    ///
    /// Element counts start at zero; set them with [`set_count`](Self::set_count).
    pub fn from_info(format: PlyFormat, info: &MeshInfo, real_type: DataType, texture_files: Vec<String>) -> Self {
        let mut elements = Vec::new();

        let mut vertex = PlyElement::new(ElementKind::Vertex);
        let has = |e, c| info.has_component(e, c);
        if has(Element::Vertex, Component::Coords) {
            for name in [PropertyName::X, PropertyName::Y, PropertyName::Z] {
                vertex.properties.push(PlyProperty::scalar(name, real_type));
            }
        }
        if has(Element::Vertex, Component::Normal) {
            for name in [PropertyName::Nx, PropertyName::Ny, PropertyName::Nz] {
                vertex.properties.push(PlyProperty::scalar(name, real_type));
            }
        }
        if has(Element::Vertex, Component::Color) {
            push_color(&mut vertex);
        }
        if has(Element::Vertex, Component::Quality) {
            vertex.properties.push(PlyProperty::scalar(PropertyName::Quality, real_type));
        }
        if has(Element::Vertex, Component::TexCoord) {
            vertex.properties.push(PlyProperty::scalar(PropertyName::TextureU, real_type));
            vertex.properties.push(PlyProperty::scalar(PropertyName::TextureV, real_type));
            vertex.properties.push(PlyProperty::scalar(PropertyName::TexNumber, DataType::Uint16));
        }
        push_custom(&mut vertex, info, Element::Vertex);
        elements.push(vertex);

        if info.has_element(Element::Face) {
            let mut face = PlyElement::new(ElementKind::Face);
            if has(Element::Face, Component::VertexRefs) {
                face.properties.push(PlyProperty::list(
                    PropertyName::VertexIndices,
                    DataType::Uint8,
                    DataType::Uint32,
                ));
            }
            if has(Element::Face, Component::Normal) {
                for name in [PropertyName::Nx, PropertyName::Ny, PropertyName::Nz] {
                    face.properties.push(PlyProperty::scalar(name, real_type));
                }
            }
            if has(Element::Face, Component::Color) {
                push_color(&mut face);
            }
            if has(Element::Face, Component::Quality) {
                face.properties.push(PlyProperty::scalar(PropertyName::Quality, real_type));
            }
            if has(Element::Face, Component::WedgeTexCoords) {
                face.properties.push(PlyProperty::list(PropertyName::TexCoord, DataType::Uint8, real_type));
                face.properties.push(PlyProperty::scalar(PropertyName::TexNumber, DataType::Uint16));
            }
            push_custom(&mut face, info, Element::Face);
            elements.push(face);
        }

        if info.has_element(Element::Edge) {
            let mut edge = PlyElement::new(ElementKind::Edge);
            if has(Element::Edge, Component::VertexRefs) {
                edge.properties.push(PlyProperty::scalar(PropertyName::Vertex1, DataType::Uint32));
                edge.properties.push(PlyProperty::scalar(PropertyName::Vertex2, DataType::Uint32));
            }
            if has(Element::Edge, Component::Color) {
                push_color(&mut edge);
            }
            if has(Element::Edge, Component::Quality) {
                edge.properties.push(PlyProperty::scalar(PropertyName::Quality, real_type));
            }
            push_custom(&mut edge, info, Element::Edge);
            elements.push(edge);
        }

        Self {
            format,
            elements,
            texture_files,
        }
    }

    pub fn element(&self, kind: &ElementKind) -> Option<&PlyElement> {
        self.elements.iter().find(|e| &e.kind == kind)
    }

    pub fn set_count(&mut self, kind: &ElementKind, count: usize) {
        if let Some(e) = self.elements.iter_mut().find(|e| &e.kind == kind) {
            e.count = count;
        }
    }

    /// What the body holds, in mesh terms.
    pub fn file_info(&self) -> MeshInfo {
        let mut info = MeshInfo::new();
        for element in &self.elements {
            let target = match element.kind {
                ElementKind::Vertex => Element::Vertex,
                ElementKind::Face | ElementKind::TriStrips => Element::Face,
                ElementKind::Edge => Element::Edge,
                ElementKind::Other(_) => continue,
            };
            info.set_element(target, true);
            for p in &element.properties {
                let component = match (&p.name, target) {
                    (name, Element::Vertex) if name.is_position() => Some(Component::Coords),
                    (PropertyName::VertexIndices, Element::Face) => Some(Component::VertexRefs),
                    (PropertyName::Vertex1 | PropertyName::Vertex2, Element::Edge) => {
                        Some(Component::VertexRefs)
                    }
                    (name, _) if name.is_normal() => Some(Component::Normal),
                    (name, _) if name.is_color() => Some(Component::Color),
                    (PropertyName::Quality, _) => Some(Component::Quality),
                    (PropertyName::TextureU, Element::Vertex) => Some(Component::TexCoord),
                    (PropertyName::TexCoord, Element::Face) => Some(Component::WedgeTexCoords),
                    (PropertyName::Unknown(name), _) => {
                        // Strips carry no per-face custom data.
                        if !p.is_list() && element.kind != ElementKind::TriStrips {
                            info.add_custom_component(target, name, p.data_type);
                        }
                        None
                    }
                    _ => None,
                };
                if let Some(c) = component {
                    info.set_component(target, c, true);
                }
            }
        }
        if !self.texture_files.is_empty() {
            info.set_textures(true);
        }
        info
    }

    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        write!(out, "{self}")?;
        Ok(())
    }
}

impl fmt::Display for PlyHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ply")?;
        writeln!(f, "format {} 1.0", self.format.keyword())?;
        writeln!(f, "comment Generated by polymesh")?;
        for texture in &self.texture_files {
            writeln!(f, "comment TextureFile {texture}")?;
        }
        for element in &self.elements {
            writeln!(f, "element {} {}", element.kind.keyword(), element.count)?;
            for p in &element.properties {
                match p.list_size {
                    Some(size) => writeln!(
                        f,
                        "property list {} {} {}",
                        type_keyword(size),
                        type_keyword(p.data_type),
                        p.name.as_str()
                    )?,
                    None => writeln!(f, "property {} {}", type_keyword(p.data_type), p.name.as_str())?,
                }
            }
        }
        writeln!(f, "end_header")
    }
}

fn read_property(t: &mut Tokens) -> Result<PlyProperty> {
    let first = t.next_str()?.to_string();
    if first == "list" {
        let size_type = parse_type(t.next_str()?);
        let data_type = parse_type(t.next_str()?);
        let name = PropertyName::parse(t.next_str()?);
        Ok(PlyProperty::list(name, size_type, data_type))
    } else {
        let data_type = parse_type(&first);
        let name = PropertyName::parse(t.next_str()?);
        Ok(PlyProperty::scalar(name, data_type))
    }
}

// `comment TextureFile <name>`, any comment word containing "texture".
fn texture_comment(t: &Tokens, file_stem: &str) -> Option<String> {
    let word = t.get(1)?;
    if !word.to_ascii_lowercase().contains("texture") {
        return None;
    }
    let name = t.get(2)?;
    Some(match name.to_ascii_lowercase().find("<this>") {
        Some(pos) => format!("{}{}{}", &name[..pos], file_stem, &name[pos + "<this>".len()..]),
        None => name.to_string(),
    })
}

fn push_color(element: &mut PlyElement) {
    for name in [PropertyName::Red, PropertyName::Green, PropertyName::Blue, PropertyName::Alpha] {
        element.properties.push(PlyProperty::scalar(name, DataType::Uint8));
    }
}

fn push_custom(element: &mut PlyElement, info: &MeshInfo, target: Element) {
    for custom in info.custom_components(target) {
        element
            .properties
            .push(PlyProperty::scalar(PropertyName::Unknown(custom.name.clone()), custom.data_type));
    }
}
