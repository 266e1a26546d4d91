//! OFF format writer.

use std::io::Write;
use std::path::Path;

use polymesh_core::{Color, Component, Element, FaceIndex, Mesh, MeshInfo, VertexIndex};

use crate::error::Result;
use crate::progress::Logger;
use crate::settings::SaveSettings;
use crate::traits::{compact_index, create_output, Writer};

/// OFF format writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct OffWriter;

impl Writer for OffWriter {
    fn new() -> Self {
        OffWriter
    }

    fn write<P: AsRef<Path>>(
        &self,
        path: P,
        mesh: &Mesh,
        settings: &SaveSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo> {
        let mut out = create_output(path.as_ref())?;
        let info = write_off(&mut out, mesh, settings, logger)?;
        out.flush()?;
        Ok(info)
    }
}

/// Everything an OFF file can carry.
pub fn off_capability() -> MeshInfo {
    MeshInfo::new()
        .with_component(Element::Vertex, Component::Coords)
        .with_component(Element::Vertex, Component::Normal)
        .with_component(Element::Vertex, Component::Color)
        .with_component(Element::Vertex, Component::TexCoord)
        .with_component(Element::Face, Component::VertexRefs)
        .with_component(Element::Face, Component::Color)
}

/// Writes `mesh` as OFF, returning the components saved.
pub fn write_off<W: Write>(
    out: &mut W,
    mesh: &Mesh,
    settings: &SaveSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    let info = settings
        .effective_info(&mesh.enabled_info())
        .intersect(&off_capability());
    let normals = info.has_component(Element::Vertex, Component::Normal);
    let colors = info.has_component(Element::Vertex, Component::Color);
    let tex_coords = info.has_component(Element::Vertex, Component::TexCoord);
    let faces = info.has_component(Element::Face, Component::VertexRefs);
    let face_colors = info.has_component(Element::Face, Component::Color);

    let mut keyword = String::new();
    if tex_coords {
        keyword.push_str("ST");
    }
    if colors {
        keyword.push('C');
    }
    if normals {
        keyword.push('N');
    }
    keyword.push_str("OFF");
    writeln!(out, "{keyword}")?;

    let face_count = if faces { mesh.live_count(Element::Face) } else { 0 };
    let vertex_count = mesh.live_count(Element::Vertex);
    writeln!(out, "{} {} 0", vertex_count, face_count)?;

    logger.start_progress("Writing vertices", vertex_count as u64);
    for (k, i) in mesh.live(Element::Vertex).enumerate() {
        let v = VertexIndex::from(i);
        let [x, y, z] = mesh.coords(v);
        write!(out, "{x} {y} {z}")?;
        if let Some([nx, ny, nz]) = mesh.normal(Element::Vertex, i).filter(|_| normals) {
            write!(out, " {nx} {ny} {nz}")?;
        }
        if let Some(c) = mesh.color(Element::Vertex, i).filter(|_| colors) {
            write_color(out, c)?;
        }
        if let Some(tc) = mesh.vertex_tex_coord(v).filter(|_| tex_coords) {
            write!(out, " {} {}", tc.u, tc.v)?;
        }
        writeln!(out)?;
        logger.progress(k as u64 + 1);
    }
    logger.end_progress();

    if faces {
        let compact = mesh.vertex_compact_indices();
        logger.start_progress("Writing faces", face_count as u64);
        for (k, f) in mesh.live(Element::Face).enumerate() {
            let vertices = mesh.face_vertices(FaceIndex::from(f));
            write!(out, "{}", vertices.len())?;
            for v in vertices {
                write!(out, " {}", compact_index(&compact, *v)?)?;
            }
            if let Some(c) = mesh.color(Element::Face, f).filter(|_| face_colors) {
                write_color(out, c)?;
            }
            writeln!(out)?;
            logger.progress(k as u64 + 1);
        }
        logger.end_progress();
    }
    Ok(info)
}

/// Bytes when any of red, green, blue exceeds 1, unit floats otherwise, so
/// the reader's byte/float rule decodes the same color.
fn write_color<W: Write>(out: &mut W, c: Color) -> Result<()> {
    if c.r > 1 || c.g > 1 || c.b > 1 {
        write!(out, " {} {} {} {}", c.r, c.g, c.b, c.a)?;
    } else {
        let unit = |v: u8| v as f64 / 255.0;
        write!(out, " {} {} {} {}", unit(c.r), unit(c.g), unit(c.b), unit(c.a))?;
    }
    Ok(())
}
