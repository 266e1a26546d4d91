//! STL format reader.
//!
//! STL has no magic number telling the binary and ASCII encodings apart.
//! Unless [`LoadSettings::stl_mode`] forces one, the first kilobyte of the
//! stream is sniffed: any byte above 127 means binary.
//!
//! Binary layout, all little endian:
//!
//! ```text
//! u8[80]   header comment
//! u32      triangle count
//! per triangle:
//!   f32[3] normal
//!   f32[9] three vertices
//!   u16    attribute word (optional packed color)
//! ```
//!
//! Colors are a vendor extension. A header holding both `COLOR=` and
//! `MATERIAL=` was written by Materialise Magics and packs red in the low
//! bits; any other header packs blue in the low bits. A file counts as
//! colored when one of its first 1000 attribute words is not white.
//!
//! Every triangle appends three fresh vertices. Shared corners are not
//! merged.

use std::io::{BufRead, Cursor, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use polymesh_core::{Color, Component, Element, Mesh, MeshInfo, VertexIndex};

use crate::error::{MeshIoError, Result};
use crate::negotiate::negotiate;
use crate::primitives::{LineReader, Tokens};
use crate::progress::Logger;
use crate::settings::{LoadSettings, StlMode};
use crate::traits::{check_readable, clear_on_error, file_stem, open_input, Reader};

/// Size of the binary header comment.
pub const STL_HEADER_SIZE: usize = 80;

/// Bytes per binary triangle record.
pub const STL_TRIANGLE_SIZE: u64 = 50;

/// Bytes looked at when sniffing the encoding.
const SNIFF_LENGTH: usize = 1000;

/// Attribute words sampled for color detection.
const COLOR_SAMPLE: u32 = 1000;

/// STL format reader.
#[derive(Debug)]
pub struct StlReader {
    path: PathBuf,
}

impl StlReader {
    /// Open an STL file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_readable(&path)?;
        Ok(Self { path })
    }
}

impl Reader for StlReader {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        StlReader::open(path)
    }

    fn read_into(
        &mut self,
        mesh: &mut Mesh,
        settings: &LoadSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo> {
        let size = std::fs::metadata(&self.path)
            .map_err(|source| MeshIoError::CannotOpenFile {
                path: self.path.clone(),
                source,
            })?
            .len();
        let input = open_input(&self.path)?;
        mesh.set_name(file_stem(&self.path));
        read_stl(input, Some(size), mesh, settings, logger)
    }
}

/// Loads an STL stream into `mesh`.
///
/// `size` is the total length of the stream when known. Binary streams
/// whose declared triangle count disagrees with it by more than 5% are
/// rejected before anything is allocated.
pub fn read_stl<R: BufRead>(
    mut input: R,
    size: Option<u64>,
    mesh: &mut Mesh,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    mesh.clear();
    let mut prefix = Vec::with_capacity(SNIFF_LENGTH);
    (&mut input)
        .take(SNIFF_LENGTH as u64)
        .read_to_end(&mut prefix)?;
    let mode = settings.stl_mode.unwrap_or_else(|| sniff_mode(&prefix));
    log::debug!("reading STL as {:?}", mode);

    let stream = Cursor::new(prefix).chain(input);
    let result = match mode {
        StlMode::Binary => read_binary_stl(stream, size, mesh, settings, logger),
        StlMode::Ascii => read_ascii_stl(LineReader::new(stream), size, mesh, settings, logger),
    };
    clear_on_error(mesh, result)
}

/// Binary when any of the leading bytes is not 7-bit ASCII.
pub fn sniff_mode(prefix: &[u8]) -> StlMode {
    if prefix.iter().take(SNIFF_LENGTH).any(|b| *b > 127) {
        StlMode::Binary
    } else {
        StlMode::Ascii
    }
}

/// Size of a well-formed binary STL holding `count` triangles.
pub fn expected_binary_size(count: u32) -> u64 {
    (STL_HEADER_SIZE as u64 + 4) + count as u64 * STL_TRIANGLE_SIZE
}

/// Accepts sizes within 5% of the one implied by `count`.
pub fn check_binary_size(count: u32, actual: u64) -> Result<()> {
    let expected = expected_binary_size(count);
    if expected.abs_diff(actual) > actual / 20 {
        return Err(MeshIoError::malformed(format!(
            "STL declares {count} triangles ({expected} bytes) but has {actual} bytes"
        )));
    }
    Ok(())
}

/// Whether the header comment marks a Materialise Magics file.
pub fn is_magics_header(header: &[u8]) -> bool {
    contains(header, b"COLOR=") && contains(header, b"MATERIAL=")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// All three five-bit channels saturated.
fn is_white_word(attr: u16) -> bool {
    attr & 0x7fff == 0x7fff
}

fn decode_color(attr: u16, magics: bool) -> Color {
    if magics {
        Color::from_bgr5(attr)
    } else {
        Color::from_rgb5(attr)
    }
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    normal: [f64; 3],
    vertices: [[f64; 3]; 3],
    attr: u16,
}

impl Triangle {
    fn read<R: Read>(input: &mut R) -> Result<Self> {
        let normal = read_point(input)?;
        let vertices = [read_point(input)?, read_point(input)?, read_point(input)?];
        let attr = input.read_u16::<LittleEndian>()?;
        Ok(Self {
            normal,
            vertices,
            attr,
        })
    }
}

fn read_point<R: Read>(input: &mut R) -> Result<[f64; 3]> {
    Ok([
        input.read_f32::<LittleEndian>()? as f64,
        input.read_f32::<LittleEndian>()? as f64,
        input.read_f32::<LittleEndian>()? as f64,
    ])
}

/// Appends one triangle as three new vertices and, when the mesh has
/// faces, one face.
struct TriangleSink {
    has_faces: bool,
    store_normals: bool,
    store_colors: bool,
    magics: bool,
}

impl TriangleSink {
    fn new(mesh: &mut Mesh, loaded: &mut MeshInfo, colored: bool, magics: bool, enable: bool) -> Self {
        loaded.set_component(Element::Vertex, Component::Coords, true);
        let has_faces = mesh.face_arity().is_some();
        let (store_normals, store_colors) = if has_faces {
            loaded.set_component(Element::Face, Component::VertexRefs, true);
            (
                negotiate(mesh, loaded, Element::Face, Component::Normal, enable),
                colored && negotiate(mesh, loaded, Element::Face, Component::Color, enable),
            )
        } else {
            (false, false)
        };
        Self {
            has_faces,
            store_normals,
            store_colors,
            magics,
        }
    }

    fn push(&self, mesh: &mut Mesh, triangle: &Triangle) -> Result<()> {
        let first = mesh.vertex_count() as u32;
        for p in &triangle.vertices {
            mesh.add_vertex(*p);
        }
        if !self.has_faces {
            return Ok(());
        }
        let face = mesh.add_face(&[VertexIndex(first), VertexIndex(first + 1), VertexIndex(first + 2)])?;
        if self.store_normals {
            mesh.set_normal(Element::Face, face.index(), triangle.normal);
        }
        if self.store_colors {
            mesh.set_color(Element::Face, face.index(), decode_color(triangle.attr, self.magics));
        }
        Ok(())
    }
}

fn read_binary_stl<R: Read>(
    mut input: R,
    size: Option<u64>,
    mesh: &mut Mesh,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    let mut header = [0u8; STL_HEADER_SIZE];
    input.read_exact(&mut header)?;
    let count = input.read_u32::<LittleEndian>()?;
    if let Some(actual) = size {
        check_binary_size(count, actual)?;
    }
    let magics = is_magics_header(&header);

    // The color decision needs the sampled records, which are then stored
    // like the rest.
    let sample = (0..count.min(COLOR_SAMPLE))
        .map(|_| Triangle::read(&mut input))
        .collect::<Result<Vec<_>>>()?;
    let colored = sample.iter().any(|t| !is_white_word(t.attr));
    log::debug!(
        "binary STL: {} triangles, magics header: {}, colored: {}",
        count,
        magics,
        colored
    );

    let mut loaded = MeshInfo::new();
    let sink = TriangleSink::new(mesh, &mut loaded, colored, magics, settings.enable_optional_components);

    logger.start_progress("Reading triangles", count as u64);
    for (i, triangle) in sample.iter().enumerate() {
        sink.push(mesh, triangle)?;
        logger.progress(i as u64 + 1);
    }
    for i in sample.len() as u32..count {
        let triangle = Triangle::read(&mut input)?;
        sink.push(mesh, &triangle)?;
        logger.progress(i as u64 + 1);
    }
    logger.end_progress();
    Ok(loaded)
}

fn read_ascii_stl<R: BufRead>(
    mut lines: LineReader<R>,
    size: Option<u64>,
    mesh: &mut Mesh,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    let mut loaded = MeshInfo::new();
    let sink = TriangleSink::new(mesh, &mut loaded, false, false, settings.enable_optional_components);

    logger.start_progress("Reading facets", size.unwrap_or(0));
    while let Some(mut t) = lines.next_tokens()? {
        if t.peek() != Some("facet") {
            continue;
        }
        t.skip(1);
        let normal = if t.peek() == Some("normal") {
            t.skip(1);
            read3(&mut t)?
        } else {
            [0.0; 3]
        };
        let triangle = read_facet(&mut lines, normal)?;
        sink.push(mesh, &triangle)?;
        logger.progress(lines.bytes_read());
    }
    logger.end_progress();

    if mesh.vertex_count() == 0 {
        log::warn!("STL file has no facets");
        return Ok(MeshInfo::new());
    }
    Ok(loaded)
}

/// Reads the body of a facet up to its `endfacet`.
fn read_facet<R: BufRead>(lines: &mut LineReader<R>, normal: [f64; 3]) -> Result<Triangle> {
    let mut vertices = Vec::with_capacity(3);
    loop {
        let mut t = lines.expect_tokens("facet")?;
        let keyword = t.next_str()?.to_string();
        match keyword.as_str() {
            "vertex" => vertices.push(read3(&mut t)?),
            "endfacet" => break,
            _ => {}
        }
    }
    let vertices: [[f64; 3]; 3] = vertices
        .try_into()
        .map_err(|v: Vec<[f64; 3]>| MeshIoError::malformed(format!("Facet with {} vertices", v.len())))?;
    Ok(Triangle {
        normal,
        vertices,
        attr: 0x7fff,
    })
}

fn read3(t: &mut Tokens) -> Result<[f64; 3]> {
    Ok([t.next_f64()?, t.next_f64()?, t.next_f64()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullLogger;
    use byteorder::WriteBytesExt;
    use polymesh_core::FaceIndex;

    fn binary_stl(header: &[u8], triangles: &[([f32; 12], u16)]) -> Vec<u8> {
        let mut data = vec![0u8; STL_HEADER_SIZE];
        data[..header.len()].copy_from_slice(header);
        data.write_u32::<LittleEndian>(triangles.len() as u32).unwrap();
        for (floats, attr) in triangles {
            for f in floats {
                data.write_f32::<LittleEndian>(*f).unwrap();
            }
            data.write_u16::<LittleEndian>(*attr).unwrap();
        }
        data
    }

    const UNIT: [f32; 12] = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

    fn load(data: &[u8], mesh: &mut Mesh, settings: &LoadSettings) -> Result<MeshInfo> {
        read_stl(Cursor::new(data), Some(data.len() as u64), mesh, settings, &mut NullLogger)
    }

    #[test]
    fn test_size_tolerance() {
        let exact = expected_binary_size(100);
        assert_eq!(exact, 84 + 5000);
        assert!(check_binary_size(100, exact).is_ok());
        assert!(check_binary_size(100, exact - exact / 25).is_ok());
        assert!(check_binary_size(100, exact / 2).is_err());
    }

    #[test]
    fn test_oversized_count_rejected_before_reading() {
        let mut data = binary_stl(b"binary", &[(UNIT, 0x7fff)]);
        data[80..84].copy_from_slice(&u32::MAX.to_le_bytes());
        let mut mesh = Mesh::triangle_mesh();
        let settings = LoadSettings::default().with_stl_mode(StlMode::Binary);
        let err = load(&data, &mut mesh, &settings).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn test_binary_without_colors() {
        let data = binary_stl(b"plain", &[(UNIT, 0x7fff), (UNIT, 0xffff)]);
        let mut mesh = Mesh::triangle_mesh();
        let info = load(&data, &mut mesh, &LoadSettings::default()).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.face_count(), 2);
        assert!(info.has_component(Element::Face, Component::Normal));
        assert!(!info.has_component(Element::Face, Component::Color));
        assert_eq!(mesh.normal(Element::Face, 1), Some([0.0, 0.0, 1.0]));
        assert_eq!(
            mesh.face_vertices(FaceIndex(1)),
            &[VertexIndex(3), VertexIndex(4), VertexIndex(5)]
        );
    }

    #[test]
    fn test_colored_rgb_and_magics() {
        // Red in the high bits.
        let red_rgb = 31 << 10;
        let data = binary_stl(b"colors", &[(UNIT, 0x7fff), (UNIT, red_rgb)]);
        let mut mesh = Mesh::triangle_mesh();
        let info = load(&data, &mut mesh, &LoadSettings::default()).unwrap();
        assert!(info.has_component(Element::Face, Component::Color));
        assert_eq!(mesh.color(Element::Face, 1), Some(Color::rgb(248, 0, 0)));
        assert_eq!(mesh.color(Element::Face, 0), Some(Color::rgb(248, 248, 248)));

        let data = binary_stl(b"COLOR=xxxx MATERIAL=", &[(UNIT, 31)]);
        load(&data, &mut mesh, &LoadSettings::default()).unwrap();
        assert_eq!(mesh.color(Element::Face, 0), Some(Color::rgb(248, 0, 0)));
    }

    #[test]
    fn test_point_cloud_keeps_vertices() {
        let data = binary_stl(b"", &[(UNIT, 0)]);
        let mut mesh = Mesh::point_cloud();
        let settings = LoadSettings::default().with_stl_mode(StlMode::Binary);
        let info = load(&data, &mut mesh, &settings).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert!(!info.has_element(Element::Face));
    }

    #[test]
    fn test_truncated_stream() {
        let mut data = binary_stl(b"", &[(UNIT, 0), (UNIT, 0)]);
        data.truncate(data.len() - 20);
        let mut mesh = Mesh::triangle_mesh();
        let settings = LoadSettings::default().with_stl_mode(StlMode::Binary);
        let err = read_stl(Cursor::new(data), None, &mut mesh, &settings, &mut NullLogger).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn test_ascii_facets() {
        let text = "solid tri\n\
            facet normal 0 0 1\n  outer loop\n    vertex 0 0 0\n    vertex 1 0 0\n    vertex 0 1 0\n  endloop\nendfacet\n\
            facet normal 0 0 -1\n outer loop\n vertex 0 0 0\n vertex 0 1 0\n vertex 1 0 0\n endloop\n endfacet\n\
            endsolid tri\n";
        let mut mesh = Mesh::triangle_mesh();
        let info = load(text.as_bytes(), &mut mesh, &LoadSettings::default()).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.face_count(), 2);
        assert!(!info.has_component(Element::Face, Component::Color));
        assert_eq!(mesh.normal(Element::Face, 1), Some([0.0, 0.0, -1.0]));
        assert_eq!(mesh.coords(VertexIndex(4)), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_ascii_short_facet() {
        let text = "solid x\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\nendsolid\n";
        let mut mesh = Mesh::triangle_mesh();
        assert!(load(text.as_bytes(), &mut mesh, &LoadSettings::default()).is_err());
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn test_sniff() {
        assert_eq!(sniff_mode(b"solid cube\n"), StlMode::Ascii);
        assert_eq!(sniff_mode(&[b's', 0x80]), StlMode::Binary);
        assert!(is_magics_header(b"COLOR=\x01\x02\x03\x04 MATERIAL=abc"));
        assert!(!is_magics_header(b"COLOR= only"));
    }
}
