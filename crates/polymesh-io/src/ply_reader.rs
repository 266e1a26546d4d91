//! PLY format reader (ASCII, binary little and big endian).
//!
//! The body is traversed once, in header order. Every property is consumed
//! whether or not the mesh keeps it, so skipped data never shifts the
//! values that follow.

use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};

use polymesh_core::{Color, Component, DataType, Element, Mesh, MeshInfo, TexCoord, VertexIndex};

use crate::error::{MeshIoError, Result};
use crate::face_sink::FaceSink;
use crate::negotiate::negotiate_info;
use crate::ply_header::{ElementKind, PlyElement, PlyHeader, PropertyName};
use crate::primitives::{
    color_from_scalar, list_len, read_binary, read_binary_list, Encoding, Endian, LineReader, Tokens,
};
use crate::progress::Logger;
use crate::settings::LoadSettings;
use crate::traits::{check_readable, clear_on_error, file_stem, open_input, Reader};

/// PLY format reader.
#[derive(Debug)]
pub struct PlyReader {
    path: PathBuf,
}

impl PlyReader {
    /// Open a PLY file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_readable(&path)?;
        Ok(Self { path })
    }

    /// Parse only the header of the file.
    pub fn read_header(&self) -> Result<PlyHeader> {
        let mut lines = LineReader::new(open_input(&self.path)?);
        PlyHeader::read(&mut lines, &file_stem(&self.path))
    }
}

impl Reader for PlyReader {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        PlyReader::open(path)
    }

    fn read_into(
        &mut self,
        mesh: &mut Mesh,
        settings: &LoadSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo> {
        let input = open_input(&self.path)?;
        let stem = file_stem(&self.path);
        mesh.set_name(stem.as_str());
        read_ply(input, &stem, mesh, settings, logger)
    }
}

/// Loads a PLY stream into `mesh`.
///
/// `file_stem` replaces `<this>` in texture file comments.
pub fn read_ply<R: BufRead>(
    input: R,
    file_stem: &str,
    mesh: &mut Mesh,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    mesh.clear();
    let result = load(LineReader::new(input), file_stem, mesh, settings, logger);
    clear_on_error(mesh, result)
}

fn load<R: BufRead>(
    mut lines: LineReader<R>,
    file_stem: &str,
    mesh: &mut Mesh,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    let header = PlyHeader::read(&mut lines, file_stem)?;
    log::debug!("PLY header: {:?} with {} elements", header.format, header.elements.len());

    let loaded = negotiate_info(mesh, &header.file_info(), settings.enable_optional_components);
    if loaded.has_textures() {
        for path in &header.texture_files {
            mesh.push_texture_path(path.as_str());
        }
    }

    let body = Body {
        loaded: &loaded,
        sink: FaceSink::for_mesh(mesh),
    };
    match header.format.encoding() {
        Encoding::Ascii => {
            let mut src = AsciiValues {
                lines,
                tokens: Tokens::new(""),
            };
            body.read(&header, &mut src, mesh, logger)?;
        }
        Encoding::Binary(endian) => {
            let mut src = BinaryValues {
                reader: lines.get_mut(),
                endian,
            };
            body.read(&header, &mut src, mesh, logger)?;
        }
    }
    Ok(loaded)
}

// ============================================================================
// Value sources
// ============================================================================

/// Typed values of the body, in stream order.
trait ValueSource {
    /// Called before the first property of every element.
    fn begin_element(&mut self) -> Result<()>;
    fn value(&mut self, ty: DataType) -> Result<f64>;
    fn list(&mut self, size_ty: DataType, ty: DataType) -> Result<Vec<f64>>;
}

/// One element per line; an element continuing on the next line is
/// tolerated.
struct AsciiValues<R> {
    lines: LineReader<R>,
    tokens: Tokens,
}

impl<R: BufRead> ValueSource for AsciiValues<R> {
    fn begin_element(&mut self) -> Result<()> {
        self.tokens = self.lines.expect_tokens("PLY element")?;
        Ok(())
    }

    fn value(&mut self, ty: DataType) -> Result<f64> {
        while self.tokens.remaining() == 0 {
            self.tokens = self.lines.expect_tokens("PLY element")?;
        }
        self.tokens.next_value(ty)
    }

    fn list(&mut self, size_ty: DataType, ty: DataType) -> Result<Vec<f64>> {
        let count = list_len(self.value(size_ty)?)?;
        (0..count).map(|_| self.value(ty)).collect()
    }
}

struct BinaryValues<'a, R> {
    reader: &'a mut R,
    endian: Endian,
}

impl<R: Read> ValueSource for BinaryValues<'_, R> {
    fn begin_element(&mut self) -> Result<()> {
        Ok(())
    }

    fn value(&mut self, ty: DataType) -> Result<f64> {
        read_binary(&mut *self.reader, ty, self.endian)
    }

    fn list(&mut self, size_ty: DataType, ty: DataType) -> Result<Vec<f64>> {
        read_binary_list(&mut *self.reader, size_ty, ty, self.endian)
    }
}

// ============================================================================
// Body
// ============================================================================

struct Body<'a> {
    loaded: &'a MeshInfo,
    sink: Option<FaceSink>,
}

/// Per-element attributes gathered before the element is appended.
#[derive(Default)]
struct Attributes {
    normal: [f64; 3],
    color: Color,
    quality: f64,
    custom: Vec<(String, f64)>,
}

impl Attributes {
    /// Keeps a scalar shared by vertices, faces and edges; other properties
    /// are dropped.
    fn take(&mut self, name: &PropertyName, value: f64, ty: DataType) {
        match name {
            n if n.is_normal() => self.normal[n.axis().unwrap_or(0)] = value,
            n if n.is_color() => self.color.set_channel(n.axis().unwrap_or(3), color_from_scalar(value, ty)),
            PropertyName::Quality => self.quality = value,
            PropertyName::Unknown(custom) => self.custom.push((custom.clone(), value)),
            _ => {}
        }
    }

    fn apply(&self, mesh: &mut Mesh, loaded: &MeshInfo, element: Element, i: usize) {
        if loaded.has_component(element, Component::Normal) {
            mesh.set_normal(element, i, self.normal);
        }
        if loaded.has_component(element, Component::Color) {
            mesh.set_color(element, i, self.color);
        }
        if loaded.has_component(element, Component::Quality) {
            mesh.set_quality(element, i, self.quality);
        }
        for (name, value) in &self.custom {
            if loaded.has_custom_component(element, name) {
                mesh.set_custom_value(element, name, i, *value);
            }
        }
    }
}

impl Body<'_> {
    fn read<S: ValueSource>(
        &self,
        header: &PlyHeader,
        src: &mut S,
        mesh: &mut Mesh,
        logger: &mut dyn Logger,
    ) -> Result<()> {
        for element in &header.elements {
            match element.kind {
                ElementKind::Vertex => self.read_vertices(element, src, mesh, logger)?,
                ElementKind::Face => self.read_faces(element, src, mesh, logger)?,
                ElementKind::TriStrips => self.read_tristrips(element, src, mesh, logger)?,
                ElementKind::Edge => self.read_edges(element, src, mesh, logger)?,
                ElementKind::Other(ref name) => {
                    log::debug!("skipping {} '{}' PLY elements", element.count, name);
                    logger.start_progress("Reading unknown elements", element.count as u64);
                    for k in 0..element.count {
                        src.begin_element()?;
                        for p in &element.properties {
                            skip_property(src, p.list_size, p.data_type)?;
                        }
                        logger.progress(k as u64 + 1);
                    }
                    logger.end_progress();
                }
            }
        }
        Ok(())
    }

    fn read_vertices<S: ValueSource>(
        &self,
        element: &PlyElement,
        src: &mut S,
        mesh: &mut Mesh,
        logger: &mut dyn Logger,
    ) -> Result<()> {
        let tex_coords = self.loaded.has_component(Element::Vertex, Component::TexCoord);
        logger.start_progress("Reading vertices", element.count as u64);
        for k in 0..element.count {
            src.begin_element()?;
            let mut coords = [0.0; 3];
            let mut tc = TexCoord::default();
            let mut attrs = Attributes::default();
            for p in &element.properties {
                if let Some(size) = p.list_size {
                    src.list(size, p.data_type)?;
                    continue;
                }
                let v = src.value(p.data_type)?;
                match &p.name {
                    n if n.is_position() => coords[n.axis().unwrap_or(0)] = v,
                    PropertyName::TextureU => tc.u = v,
                    PropertyName::TextureV => tc.v = v,
                    PropertyName::TexNumber => tc.index = v as u16,
                    name => attrs.take(name, v, p.data_type),
                }
            }
            let vi = mesh.add_vertex(coords);
            attrs.apply(mesh, self.loaded, Element::Vertex, vi.index());
            if tex_coords {
                mesh.set_vertex_tex_coord(vi, tc);
            }
            logger.progress(k as u64 + 1);
        }
        logger.end_progress();
        Ok(())
    }

    fn read_faces<S: ValueSource>(
        &self,
        element: &PlyElement,
        src: &mut S,
        mesh: &mut Mesh,
        logger: &mut dyn Logger,
    ) -> Result<()> {
        let wedges = self.loaded.has_component(Element::Face, Component::WedgeTexCoords);
        logger.start_progress("Reading faces", element.count as u64);
        for k in 0..element.count {
            src.begin_element()?;
            let mut indices: Option<Vec<u32>> = None;
            let mut wedge_values: Option<Vec<f64>> = None;
            let mut texture = 0u16;
            let mut attrs = Attributes::default();
            for p in &element.properties {
                match (&p.name, p.list_size) {
                    (PropertyName::VertexIndices, Some(size)) => {
                        let list = src.list(size, p.data_type)?;
                        indices = Some(to_indices(&list, k)?);
                    }
                    (PropertyName::TexCoord, Some(size)) => wedge_values = Some(src.list(size, p.data_type)?),
                    (_, Some(size)) => {
                        src.list(size, p.data_type)?;
                    }
                    (PropertyName::TexNumber, None) => texture = src.value(p.data_type)? as u16,
                    (name, None) => {
                        let v = src.value(p.data_type)?;
                        attrs.take(name, v, p.data_type)
                    }
                }
            }

            let (Some(sink), Some(indices)) = (self.sink, indices) else {
                logger.progress(k as u64 + 1);
                continue;
            };
            let faces = sink.append_triangulated(mesh, &indices)?;
            for f in &faces {
                attrs.apply(mesh, self.loaded, Element::Face, f.face.index());
            }
            if let Some(values) = wedge_values.filter(|_| wedges) {
                if values.len() != indices.len() * 2 {
                    return Err(MeshIoError::malformed(format!(
                        "Face {k} has {} texcoord values for {} vertices",
                        values.len(),
                        indices.len()
                    )));
                }
                for f in &faces {
                    for (corner, &pos) in f.corners.iter().enumerate() {
                        let tc = TexCoord::new(values[2 * pos], values[2 * pos + 1]).with_index(texture);
                        mesh.set_wedge_tex_coord(f.face, corner, tc);
                    }
                    mesh.set_texture_index(f.face, texture);
                }
            }
            logger.progress(k as u64 + 1);
        }
        logger.end_progress();
        Ok(())
    }

    fn read_tristrips<S: ValueSource>(
        &self,
        element: &PlyElement,
        src: &mut S,
        mesh: &mut Mesh,
        logger: &mut dyn Logger,
    ) -> Result<()> {
        logger.start_progress("Reading tristrips", element.count as u64);
        for k in 0..element.count {
            src.begin_element()?;
            let mut strip = Vec::new();
            for p in &element.properties {
                match (&p.name, p.list_size) {
                    (PropertyName::VertexIndices, Some(size)) => strip = src.list(size, p.data_type)?,
                    (_, size) => skip_property(src, size, p.data_type)?,
                }
            }
            if let Some(sink) = self.sink {
                for tri in tristrip_triangles(&strip)? {
                    sink.append_triangulated(mesh, &tri)?;
                }
            }
            logger.progress(k as u64 + 1);
        }
        logger.end_progress();
        Ok(())
    }

    fn read_edges<S: ValueSource>(
        &self,
        element: &PlyElement,
        src: &mut S,
        mesh: &mut Mesh,
        logger: &mut dyn Logger,
    ) -> Result<()> {
        let store = self.loaded.has_component(Element::Edge, Component::VertexRefs);
        logger.start_progress("Reading edges", element.count as u64);
        for k in 0..element.count {
            src.begin_element()?;
            let mut ends = [None, None];
            let mut attrs = Attributes::default();
            for p in &element.properties {
                if let Some(size) = p.list_size {
                    src.list(size, p.data_type)?;
                    continue;
                }
                let v = src.value(p.data_type)?;
                match &p.name {
                    PropertyName::Vertex1 => ends[0] = Some(v),
                    PropertyName::Vertex2 => ends[1] = Some(v),
                    name => attrs.take(name, v, p.data_type),
                }
            }
            if let ([Some(a), Some(b)], true) = (ends, store) {
                let ids = to_indices(&[a, b], k)?;
                let e = mesh.add_edge(VertexIndex(ids[0]), VertexIndex(ids[1]))?;
                attrs.apply(mesh, self.loaded, Element::Edge, e.index());
            }
            logger.progress(k as u64 + 1);
        }
        logger.end_progress();
        Ok(())
    }
}

fn skip_property<S: ValueSource>(
    src: &mut S,
    list_size: Option<DataType>,
    ty: DataType,
) -> Result<()> {
    match list_size {
        Some(size) => src.list(size, ty).map(|_| ()),
        None => src.value(ty).map(|_| ()),
    }
}

fn to_indices(values: &[f64], element: usize) -> Result<Vec<u32>> {
    values
        .iter()
        .map(|v| {
            if *v < 0.0 || *v > u32::MAX as f64 {
                Err(MeshIoError::malformed(format!("Bad vertex index {v} in element {element}")))
            } else {
                Ok(*v as u32)
            }
        })
        .collect()
}

/// Expands a triangle strip. A negative index ends the current strip; the
/// winding flips on every other triangle and restarts after each end.
pub fn tristrip_triangles(strip: &[f64]) -> Result<Vec<[u32; 3]>> {
    let mut triangles = Vec::new();
    let mut parity = 0usize;
    for w in strip.windows(3) {
        if w.iter().any(|i| *i < 0.0) {
            parity = 0;
            continue;
        }
        let ids = to_indices(w, 0)?;
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        triangles.push(if parity % 2 == 0 { [a, b, c] } else { [b, a, c] });
        parity += 1;
    }
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullLogger;
    use polymesh_core::FaceIndex;
    use std::io::Cursor;

    fn load_bytes(bytes: Vec<u8>, mesh: &mut Mesh) -> Result<MeshInfo> {
        read_ply(Cursor::new(bytes), "test", mesh, &LoadSettings::default(), &mut NullLogger)
    }

    #[test]
    fn test_ascii_vertex_colors() {
        let text = "ply\nformat ascii 1.0\nelement vertex 3\n\
                    property float x\nproperty float y\nproperty float z\n\
                    property uchar red\nproperty uchar green\nproperty uchar blue\nend_header\n\
                    0 0 0 255 0 0\n1 0 0 0 255 0\n0 1 0 10 20 30\n";
        let mut mesh = Mesh::triangle_mesh();
        let info = load_bytes(text.into(), &mut mesh).unwrap();
        assert!(info.has_component(Element::Vertex, Component::Color));
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.coords(VertexIndex(1)), [1.0, 0.0, 0.0]);
        assert_eq!(mesh.color(Element::Vertex, 2), Some(Color::rgb(10, 20, 30)));
    }

    #[test]
    fn test_binary_big_endian_faces() {
        let mut body = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in p {
                body.extend_from_slice(&c.to_be_bytes());
            }
        }
        body.push(4);
        for i in [0u32, 1, 2, 3] {
            body.extend_from_slice(&i.to_be_bytes());
        }
        body.extend_from_slice(&7i16.to_be_bytes());

        let mut bytes = b"ply\nformat binary_big_endian 1.0\nelement vertex 4\n\
                          property float x\nproperty float y\nproperty float z\n\
                          element face 1\nproperty list uchar uint vertex_indices\nproperty short id\nend_header\n"
            .to_vec();
        bytes.extend_from_slice(&body);

        let mut mesh = Mesh::triangle_mesh();
        let info = load_bytes(bytes, &mut mesh).unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.face_vertices(FaceIndex(1)), &[VertexIndex(0), VertexIndex(2), VertexIndex(3)]);
        assert!(info.has_custom_component(Element::Face, "id"));
        assert_eq!(mesh.custom_value(Element::Face, "id", 1), Some(7.0));
    }

    #[test]
    fn test_unknown_list_keeps_alignment() {
        let text = "ply\nformat ascii 1.0\nelement vertex 2\n\
                    property float x\nproperty list uchar int junk\nproperty float y\nproperty float z\n\
                    property double weight\nend_header\n\
                    1 3 7 7 7 2 3 0.5\n4 0 5 6 0.25\n";
        let mut mesh = Mesh::point_cloud();
        let info = load_bytes(text.into(), &mut mesh).unwrap();
        assert_eq!(mesh.coords(VertexIndex(0)), [1.0, 2.0, 3.0]);
        assert_eq!(mesh.coords(VertexIndex(1)), [4.0, 5.0, 6.0]);
        assert!(!info.has_custom_component(Element::Vertex, "junk"));
        assert_eq!(
            info.custom_component(Element::Vertex, "weight").map(|c| c.data_type),
            Some(DataType::Float64)
        );
        assert_eq!(mesh.custom_value(Element::Vertex, "weight", 1), Some(0.25));
    }

    #[test]
    fn test_float_colors_are_scaled() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\n\
                    property float z\nproperty float red\nproperty float green\nproperty float blue\n\
                    property float alpha\nend_header\n0 0 0 1 0.5 0 0.2\n";
        let mut mesh = Mesh::point_cloud();
        load_bytes(text.into(), &mut mesh).unwrap();
        assert_eq!(mesh.color(Element::Vertex, 0), Some(Color::new(255, 128, 0, 51)));
    }

    #[test]
    fn test_tristrip_parity() {
        assert_eq!(
            tristrip_triangles(&[0.0, 1.0, 2.0, 3.0, -1.0, 4.0, 5.0, 6.0, 7.0]).unwrap(),
            vec![[0, 1, 2], [2, 1, 3], [4, 5, 6], [6, 5, 7]]
        );
        assert!(tristrip_triangles(&[0.0, 1.0]).unwrap().is_empty());
    }

    #[test]
    fn test_tristrips_element() {
        let text = "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\n\
                    property float z\nelement tristrips 1\nproperty list int int vertex_indices\n\
                    end_header\n0 0 0\n1 0 0\n0 1 0\n1 1 0\n4 0 1 2 3\n";
        let mut mesh = Mesh::triangle_mesh();
        let info = load_bytes(text.into(), &mut mesh).unwrap();
        assert!(info.has_component(Element::Face, Component::VertexRefs));
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.face_vertices(FaceIndex(1)), &[VertexIndex(2), VertexIndex(1), VertexIndex(3)]);
    }

    #[test]
    fn test_failures_clear_the_mesh() {
        let head = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\n\
                    property float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n\
                    0 0 0\n1 0 0\n0 1 0\n";
        let mut mesh = Mesh::triangle_mesh();
        let err = load_bytes(format!("{head}3 0 1 5\n").into(), &mut mesh).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(mesh.vertex_count(), 0);

        assert!(load_bytes(format!("{head}3 0 -1 2\n").into(), &mut mesh).is_err());
        assert!(load_bytes(format!("{head}3 0 1\n").into(), &mut mesh).is_err());

        let truncated = b"ply\nformat binary_little_endian 1.0\nelement vertex 2\nproperty double x\nend_header\n\
                          \x00\x00\x00\x00"
            .to_vec();
        assert!(load_bytes(truncated, &mut mesh).unwrap_err().is_malformed());
    }

    #[test]
    fn test_texture_comments_and_wedges() {
        let text = "ply\nformat ascii 1.0\ncomment TextureFile <this>.png\nelement vertex 3\n\
                    property float x\nproperty float y\nproperty float z\nelement face 1\n\
                    property list uchar int vertex_indices\nproperty list uchar float texcoord\n\
                    property ushort texnumber\nend_header\n0 0 0\n1 0 0\n0 1 0\n\
                    3 0 1 2 6 0 0 1 0 0 1 0\n";
        let mut mesh = Mesh::triangle_mesh();
        let info = load_bytes(text.into(), &mut mesh).unwrap();
        assert!(info.has_textures());
        assert_eq!(mesh.texture_paths(), &["test.png"]);
        assert!(info.has_component(Element::Face, Component::WedgeTexCoords));
        assert_eq!(mesh.wedge_tex_coords(FaceIndex(0)).unwrap()[1], TexCoord::new(1.0, 0.0));
    }
}
