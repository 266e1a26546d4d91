//! OFF format reader.
//!
//! The header keyword doubles as a flag string: the letters in front of
//! `OFF` say which optional vertex fields every vertex line carries.
//!
//! ```text
//! [ST][C][N]OFF
//! nv nf ne
//! x y z [nx ny nz] [color] [u v]      (nv lines)
//! n i0 .. in-1 [color]                (nf lines)
//! ```
//!
//! A color is one Geomview palette index, or 3-4 components that are bytes
//! when any of red, green, blue exceeds 1 and unit floats otherwise.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use polymesh_core::{Color, Component, Element, Mesh, MeshInfo, TexCoord};

use crate::error::{MeshIoError, Result};
use crate::face_sink::FaceSink;
use crate::negotiate::negotiate;
use crate::off_palette::geomview_color;
use crate::primitives::{LineReader, Tokens};
use crate::progress::Logger;
use crate::settings::LoadSettings;
use crate::traits::{check_readable, clear_on_error, file_stem, open_input, Reader};

/// OFF format reader.
#[derive(Debug)]
pub struct OffReader {
    path: PathBuf,
}

impl OffReader {
    /// Open an OFF file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_readable(&path)?;
        Ok(Self { path })
    }
}

impl Reader for OffReader {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        OffReader::open(path)
    }

    fn read_into(
        &mut self,
        mesh: &mut Mesh,
        settings: &LoadSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo> {
        let input = open_input(&self.path)?;
        mesh.set_name(file_stem(&self.path));
        read_off(input, mesh, settings, logger)
    }
}

/// What the first lines of an OFF file declare.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffHeader {
    pub normals: bool,
    pub colors: bool,
    pub tex_coords: bool,
    pub vertex_count: usize,
    pub face_count: usize,
    pub edge_count: usize,
}

impl OffHeader {
    /// Decodes the flag letters in front of the last `OFF` of `keyword`.
    ///
    /// # Errors
    /// `MalformedFile` when `OFF` is missing or when the keyword asks for
    /// homogeneous (`4`) or n-dimensional (`n`) coordinates.
    pub fn from_keyword(keyword: &str) -> Result<Self> {
        let end = keyword
            .rfind("OFF")
            .ok_or_else(|| MeshIoError::malformed("Missing OFF header"))?;
        let bytes = keyword.as_bytes();
        let mut header = OffHeader::default();
        for u in (0..end).rev() {
            match bytes[u] {
                b'C' => header.colors = true,
                b'N' => header.normals = true,
                b'T' if u > 0 && bytes[u - 1] == b'S' => header.tex_coords = true,
                b'4' => return Err(MeshIoError::malformed("Unsupported homogeneous components in OFF")),
                b'n' => return Err(MeshIoError::malformed("Unsupported high dimension OFF")),
                _ => {}
            }
        }
        Ok(header)
    }

    /// Reads the keyword and the element counts.
    ///
    /// The counts normally sit on the line after the keyword; a keyword line
    /// with more tokens carries them itself. The edge count is optional.
    pub fn read<R: BufRead>(lines: &mut LineReader<R>) -> Result<Self> {
        let mut tokens = next_data_line(lines, "header")?;
        let mut header = Self::from_keyword(tokens.next_str()?)?;
        if tokens.remaining() == 0 {
            tokens = next_data_line(lines, "element counts")?;
        }
        header.vertex_count = tokens.next_parse()?;
        header.face_count = tokens.next_parse()?;
        if tokens.remaining() > 0 {
            header.edge_count = tokens.next_parse()?;
        }
        Ok(header)
    }

    /// The components present in the file.
    pub fn file_info(&self) -> MeshInfo {
        let mut info = MeshInfo::new();
        if self.vertex_count > 0 {
            info.set_component(Element::Vertex, Component::Coords, true);
            info.set_component(Element::Vertex, Component::Normal, self.normals);
            info.set_component(Element::Vertex, Component::Color, self.colors);
            info.set_component(Element::Vertex, Component::TexCoord, self.tex_coords);
        }
        if self.face_count > 0 {
            info.set_component(Element::Face, Component::VertexRefs, true);
        }
        info
    }
}

/// Loads an OFF stream into `mesh`.
///
/// The mesh is cleared first, and again if the stream turns out to be
/// malformed.
pub fn read_off<R: BufRead>(
    input: R,
    mesh: &mut Mesh,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    mesh.clear();
    let result = load(LineReader::new(input), mesh, settings, logger);
    clear_on_error(mesh, result)
}

fn load<R: BufRead>(
    mut lines: LineReader<R>,
    mesh: &mut Mesh,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    let header = OffHeader::read(&mut lines)?;
    log::debug!("OFF header: {:?}", header);

    let mut loaded = MeshInfo::new();
    if header.vertex_count == 0 {
        log::warn!("OFF file has no vertices");
        return Ok(loaded);
    }

    read_vertices(&mut lines, &header, mesh, &mut loaded, settings, logger)?;
    read_faces(&mut lines, &header, mesh, &mut loaded, settings, logger)?;
    Ok(loaded)
}

fn read_vertices<R: BufRead>(
    lines: &mut LineReader<R>,
    header: &OffHeader,
    mesh: &mut Mesh,
    loaded: &mut MeshInfo,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<()> {
    let enable = settings.enable_optional_components;
    loaded.set_component(Element::Vertex, Component::Coords, true);
    let store_normals =
        header.normals && negotiate(mesh, loaded, Element::Vertex, Component::Normal, enable);
    let store_colors =
        header.colors && negotiate(mesh, loaded, Element::Vertex, Component::Color, enable);
    let store_tex_coords =
        header.tex_coords && negotiate(mesh, loaded, Element::Vertex, Component::TexCoord, enable);
    let tex_coord_tokens = if header.tex_coords { 2 } else { 0 };

    logger.start_progress("Reading vertices", header.vertex_count as u64);
    for i in 0..header.vertex_count {
        let mut t = next_data_line(lines, "vertex")?;
        let v = mesh.add_vertex(read3(&mut t)?);

        if header.normals {
            let normal = read3(&mut t)?;
            if store_normals {
                mesh.set_normal(Element::Vertex, v.index(), normal);
            }
        }
        if header.colors {
            let components = t.remaining() as isize - tex_coord_tokens;
            let color = read_off_color(&mut t, components)?;
            if store_colors {
                mesh.set_color(Element::Vertex, v.index(), color);
            }
        }
        if header.tex_coords {
            let tc = TexCoord::new(t.next_f64()?, t.next_f64()?);
            if store_tex_coords {
                mesh.set_vertex_tex_coord(v, tc);
            }
        }
        logger.progress(i as u64 + 1);
    }
    logger.end_progress();
    Ok(())
}

fn read_faces<R: BufRead>(
    lines: &mut LineReader<R>,
    header: &OffHeader,
    mesh: &mut Mesh,
    loaded: &mut MeshInfo,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<()> {
    let sink = match FaceSink::for_mesh(mesh) {
        Some(sink) if header.face_count > 0 => sink,
        _ => {
            for _ in 0..header.face_count {
                next_data_line(lines, "face")?;
            }
            if header.face_count > 0 {
                log::debug!("mesh has no faces, skipped {} OFF faces", header.face_count);
            }
            return Ok(());
        }
    };
    loaded.set_component(Element::Face, Component::VertexRefs, true);

    // Decided on the first face that carries a color.
    let mut store_colors: Option<bool> = None;

    logger.start_progress("Reading faces", header.face_count as u64);
    for i in 0..header.face_count {
        let mut t = next_data_line(lines, "face")?;
        let n: usize = t.next_parse()?;
        let indices = (0..n).map(|_| t.next_u32()).collect::<Result<Vec<_>>>()?;
        let faces = sink.append_triangulated(mesh, &indices)?;

        let components = t.remaining() as isize;
        if components > 0 {
            let color = read_off_color(&mut t, components)?;
            let store = *store_colors.get_or_insert_with(|| {
                negotiate(
                    mesh,
                    loaded,
                    Element::Face,
                    Component::Color,
                    settings.enable_optional_components,
                )
            });
            if store {
                for f in &faces {
                    mesh.set_color(Element::Face, f.face.index(), color);
                }
            }
        }
        logger.progress(i as u64 + 1);
    }
    logger.end_progress();
    Ok(())
}

/// Reads a color made of `components` tokens.
fn read_off_color(t: &mut Tokens, components: isize) -> Result<Color> {
    match components {
        1 => {
            let k: usize = t.next_parse()?;
            geomview_color(k)
                .ok_or_else(|| MeshIoError::malformed(format!("Geomview color index {k} out of range")))
        }
        3 | 4 => {
            let r = t.next_f64()?;
            let g = t.next_f64()?;
            let b = t.next_f64()?;
            let a = if components == 4 { Some(t.next_f64()?) } else { None };
            let scale = if r > 1.0 || g > 1.0 || b > 1.0 { 1.0 } else { 255.0 };
            Ok(Color::new(
                to_byte(r * scale),
                to_byte(g * scale),
                to_byte(b * scale),
                a.map_or(255, |a| to_byte(a * scale)),
            ))
        }
        _ => Err(MeshIoError::malformed(format!(
            "Wrong number of color components in line: {components}"
        ))),
    }
}

fn to_byte(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn read3(t: &mut Tokens) -> Result<[f64; 3]> {
    Ok([t.next_f64()?, t.next_f64()?, t.next_f64()?])
}

/// Next non-empty line that is not a `#` comment.
fn next_data_line<R: BufRead>(lines: &mut LineReader<R>, what: &str) -> Result<Tokens> {
    loop {
        let tokens = lines.expect_tokens(what)?;
        if !tokens.get(0).map_or(false, |t| t.starts_with('#')) {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullLogger;
    use polymesh_core::{FaceIndex, VertexIndex};
    use std::io::Cursor;

    fn load_str(text: &str, mesh: &mut Mesh) -> Result<MeshInfo> {
        read_off(Cursor::new(text), mesh, &LoadSettings::default(), &mut NullLogger)
    }

    #[test]
    fn test_keyword_flags() {
        let h = OffHeader::from_keyword("STCNOFF").unwrap();
        assert!(h.tex_coords && h.colors && h.normals);
        let h = OffHeader::from_keyword("COFF").unwrap();
        assert!(h.colors && !h.normals && !h.tex_coords);
        let h = OffHeader::from_keyword("TOFF").unwrap();
        assert!(!h.tex_coords);
        assert!(OffHeader::from_keyword("4OFF").is_err());
        assert!(OffHeader::from_keyword("nOFF").is_err());
        assert!(OffHeader::from_keyword("PLY").is_err());
    }

    #[test]
    fn test_counts_on_header_line() {
        let text = "OFF 3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n";
        let mut mesh = Mesh::triangle_mesh();
        let info = load_str(text, &mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert!(info.has_component(Element::Face, Component::VertexRefs));
    }

    #[test]
    fn test_comments_and_normals() {
        let text = "NOFF\n# counts\n2 0\n0 0 0 0 0 1\n# second\n1 1 1 0 1 0\n";
        let mut mesh = Mesh::point_cloud();
        let info = load_str(text, &mut mesh).unwrap();
        assert!(info.has_component(Element::Vertex, Component::Normal));
        assert_eq!(mesh.normal(Element::Vertex, 1), Some([0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_color_forms() {
        let text = "COFF\n3 0 0\n0 0 0 0\n1 0 0 1 0.5 0\n0 1 0 10 20 30 40\n";
        let mut mesh = Mesh::point_cloud();
        load_str(text, &mut mesh).unwrap();
        assert_eq!(mesh.color(Element::Vertex, 0), Some(Color::new(255, 255, 255, 255)));
        assert_eq!(mesh.color(Element::Vertex, 1), Some(Color::new(255, 128, 0, 255)));
        assert_eq!(mesh.color(Element::Vertex, 2), Some(Color::new(10, 20, 30, 40)));
    }

    #[test]
    fn test_bad_color_count() {
        let text = "COFF\n1 0 0\n0 0 0 1 2\n";
        let mut mesh = Mesh::point_cloud();
        assert!(load_str(text, &mut mesh).unwrap_err().is_malformed());
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn test_palette_index_out_of_range() {
        let text = "COFF\n1 0 0\n0 0 0 500\n";
        let mut mesh = Mesh::point_cloud();
        assert!(load_str(text, &mut mesh).is_err());
    }

    #[test]
    fn test_colors_discarded_when_not_enabled() {
        let text = "STCOFF\n1 0 0\n0 0 0 1 0 0 0.25 0.75\n";
        let mut mesh = Mesh::point_cloud();
        let settings = LoadSettings::default().with_optional_components(false);
        let info = read_off(Cursor::new(text), &mut mesh, &settings, &mut NullLogger).unwrap();
        assert!(!info.has_component(Element::Vertex, Component::Color));
        assert!(!mesh.is_enabled(Element::Vertex, Component::TexCoord));
        assert_eq!(mesh.coords(VertexIndex(0)), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_face_color_replicated_over_fan() {
        let text = "OFF\n4 1 0\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3 255 0 0\n";
        let mut mesh = Mesh::triangle_mesh();
        let info = load_str(text, &mut mesh).unwrap();
        assert!(info.has_component(Element::Face, Component::Color));
        assert_eq!(mesh.face_count(), 2);
        for f in 0..2 {
            assert_eq!(mesh.color(Element::Face, f), Some(Color::rgb(255, 0, 0)));
        }
        assert_eq!(
            mesh.face_vertices(FaceIndex(1)),
            &[VertexIndex(0), VertexIndex(2), VertexIndex(3)]
        );
    }

    #[test]
    fn test_bad_face_index_clears_mesh() {
        let text = "OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 7\n";
        let mut mesh = Mesh::triangle_mesh();
        let err = load_str(text, &mut mesh).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn test_truncated_file() {
        let text = "OFF\n3 1 0\n0 0 0\n";
        let mut mesh = Mesh::triangle_mesh();
        assert!(load_str(text, &mut mesh).unwrap_err().is_malformed());
    }
}
