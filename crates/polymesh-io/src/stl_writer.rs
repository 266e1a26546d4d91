//! STL format writer.
//!
//! Only triangles exist in STL: polygons are written as triangle fans, and
//! each triangle repeats the coordinates of its corners. Face colors are
//! packed into the binary attribute word; ASCII output has no room for
//! them.

use std::io::Write;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use polymesh_core::{Color, Component, Element, FaceIndex, Mesh, MeshInfo, VertexIndex};

use crate::error::Result;
use crate::face_sink::fan_triangles;
use crate::progress::Logger;
use crate::settings::SaveSettings;
use crate::stl_reader::STL_HEADER_SIZE;
use crate::traits::{create_output, Writer};

/// Attribute word of an uncolored triangle.
const WHITE_WORD: u16 = 0x7fff;

/// STL format writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct StlWriter;

impl Writer for StlWriter {
    fn new() -> Self {
        StlWriter
    }

    fn write<P: AsRef<Path>>(
        &self,
        path: P,
        mesh: &Mesh,
        settings: &SaveSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo> {
        let mut out = create_output(path.as_ref())?;
        let info = write_stl(&mut out, mesh, settings, logger)?;
        out.flush()?;
        Ok(info)
    }
}

/// Everything an STL file can carry.
pub fn stl_capability(binary: bool) -> MeshInfo {
    let info = MeshInfo::new()
        .with_component(Element::Vertex, Component::Coords)
        .with_component(Element::Face, Component::VertexRefs)
        .with_component(Element::Face, Component::Normal);
    if binary {
        info.with_component(Element::Face, Component::Color)
    } else {
        info
    }
}

/// Writes `mesh` as STL, returning the components saved.
///
/// Triangles without a stored normal get the normal of their plane.
pub fn write_stl<W: Write>(
    out: &mut W,
    mesh: &Mesh,
    settings: &SaveSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    let info = settings
        .effective_info(&mesh.enabled_info())
        .intersect(&stl_capability(settings.binary));
    let triangles = collect_triangles(mesh, &info, settings.magics_mode);
    if triangles.is_empty() {
        log::warn!("saving an STL file without triangles");
    }

    let name = mesh.name().filter(|n| !n.is_empty()).unwrap_or("mesh");
    logger.start_progress("Writing triangles", triangles.len() as u64);
    if settings.binary {
        out.write_all(&binary_header(name, settings.magics_mode))?;
        out.write_u32::<LittleEndian>(triangles.len() as u32)?;
        for (i, t) in triangles.iter().enumerate() {
            for p in std::iter::once(&t.normal).chain(t.vertices.iter()) {
                for c in p {
                    out.write_f32::<LittleEndian>(*c as f32)?;
                }
            }
            out.write_u16::<LittleEndian>(t.attr)?;
            logger.progress(i as u64 + 1);
        }
    } else {
        writeln!(out, "solid {name}")?;
        for (i, t) in triangles.iter().enumerate() {
            let [nx, ny, nz] = t.normal;
            writeln!(out, "  facet normal {nx} {ny} {nz}")?;
            writeln!(out, "    outer loop")?;
            for [x, y, z] in &t.vertices {
                writeln!(out, "      vertex {x} {y} {z}")?;
            }
            writeln!(out, "    endloop")?;
            writeln!(out, "  endfacet")?;
            logger.progress(i as u64 + 1);
        }
        writeln!(out, "endsolid {name}")?;
    }
    logger.end_progress();
    Ok(info)
}

struct OutTriangle {
    normal: [f64; 3],
    vertices: [[f64; 3]; 3],
    attr: u16,
}

fn collect_triangles(mesh: &Mesh, info: &MeshInfo, magics: bool) -> Vec<OutTriangle> {
    if !info.has_component(Element::Face, Component::VertexRefs) {
        return Vec::new();
    }
    let normals = info.has_component(Element::Face, Component::Normal);
    let colors = info.has_component(Element::Face, Component::Color);

    let mut triangles = Vec::new();
    for f in mesh.live(Element::Face) {
        let corners: Vec<[f64; 3]> = mesh
            .face_vertices(FaceIndex::from(f))
            .iter()
            .map(|v: &VertexIndex| mesh.coords(*v))
            .collect();
        let stored = mesh.normal(Element::Face, f).filter(|_| normals);
        let attr = mesh
            .color(Element::Face, f)
            .filter(|_| colors)
            .map_or(WHITE_WORD, |c| encode_color(c, magics));
        for [a, b, c] in fan_triangles(corners.len()) {
            let vertices = [corners[a], corners[b], corners[c]];
            triangles.push(OutTriangle {
                normal: stored.unwrap_or_else(|| triangle_normal(&vertices)),
                vertices,
                attr,
            });
        }
    }
    triangles
}

fn encode_color(c: Color, magics: bool) -> u16 {
    if magics {
        c.to_bgr5()
    } else {
        c.to_rgb5()
    }
}

/// Unit normal of the triangle's plane, zero for degenerate triangles.
pub fn triangle_normal(p: &[[f64; 3]; 3]) -> [f64; 3] {
    let u = sub(p[1], p[0]);
    let v = sub(p[2], p[0]);
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len == 0.0 {
        [0.0; 3]
    } else {
        [n[0] / len, n[1] / len, n[2] / len]
    }
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// The 80-byte comment. Magics headers carry a default color and material.
fn binary_header(name: &str, magics: bool) -> [u8; STL_HEADER_SIZE] {
    let mut header = [b' '; STL_HEADER_SIZE];
    let mut text = format!("polymesh {name}").into_bytes();
    if magics {
        text.truncate(STL_HEADER_SIZE - 32);
        text.push(b' ');
        text.extend_from_slice(b"COLOR=");
        text.extend_from_slice(&[255; 4]);
        text.extend_from_slice(b",MATERIAL=");
        text.extend_from_slice(&[255; 12]);
    }
    text.truncate(STL_HEADER_SIZE);
    header[..text.len()].copy_from_slice(&text);
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullLogger;
    use crate::settings::{LoadSettings, StlMode};
    use crate::stl_reader::{expected_binary_size, is_magics_header, read_stl};
    use std::io::Cursor;

    fn quad(mesh: &mut Mesh) {
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
            mesh.add_vertex(p);
        }
        mesh.add_face(&[VertexIndex(0), VertexIndex(1), VertexIndex(2), VertexIndex(3)])
            .unwrap();
    }

    #[test]
    fn test_ascii_layout() {
        let mut mesh = Mesh::polygon_mesh();
        mesh.set_name("quad");
        quad(&mut mesh);
        let mut out = Vec::new();
        let settings = SaveSettings::default().with_binary(false);
        write_stl(&mut out, &mesh, &settings, &mut NullLogger).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("solid quad\n  facet normal 0 0 1\n    outer loop\n      vertex 0 0 0\n"));
        assert!(text.ends_with("endsolid quad\n"));
        assert_eq!(text.matches("endfacet").count(), 2);
    }

    #[test]
    fn test_binary_round_trip_with_colors() {
        let mut mesh = Mesh::polygon_mesh();
        mesh.enable(Element::Face, Component::Color);
        quad(&mut mesh);
        mesh.set_color(Element::Face, 0, Color::rgb(248, 0, 0));

        for magics in [false, true] {
            let mut out = Vec::new();
            let settings = SaveSettings::default().with_magics_mode(magics);
            let saved = write_stl(&mut out, &mesh, &settings, &mut NullLogger).unwrap();
            assert!(saved.has_component(Element::Face, Component::Color));
            assert_eq!(out.len() as u64, expected_binary_size(2));
            assert_eq!(is_magics_header(&out[..STL_HEADER_SIZE]), magics);

            let mut loaded = Mesh::triangle_mesh();
            let size = Some(out.len() as u64);
            let info = read_stl(Cursor::new(out), size, &mut loaded, &LoadSettings::default(), &mut NullLogger)
                .unwrap();
            assert!(info.has_component(Element::Face, Component::Color));
            assert_eq!(loaded.vertex_count(), 6);
            assert_eq!(loaded.color(Element::Face, 1), Some(Color::rgb(248, 0, 0)));
            assert_eq!(loaded.normal(Element::Face, 0), Some([0.0, 0.0, 1.0]));
        }
    }

    #[test]
    fn test_uncolored_binary_reloads_without_colors() {
        let mut mesh = Mesh::triangle_mesh();
        quad_as_triangles(&mut mesh);
        let mut out = Vec::new();
        write_stl(&mut out, &mesh, &SaveSettings::default(), &mut NullLogger).unwrap();
        let mut loaded = Mesh::triangle_mesh();
        let settings = LoadSettings::default().with_stl_mode(StlMode::Binary);
        let info = read_stl(Cursor::new(out), None, &mut loaded, &settings, &mut NullLogger).unwrap();
        assert!(!info.has_component(Element::Face, Component::Color));
        assert_eq!(loaded.face_count(), 2);
    }

    fn quad_as_triangles(mesh: &mut Mesh) {
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
            mesh.add_vertex(p);
        }
        mesh.add_face(&[VertexIndex(0), VertexIndex(1), VertexIndex(2)]).unwrap();
        mesh.add_face(&[VertexIndex(0), VertexIndex(2), VertexIndex(3)]).unwrap();
    }

    #[test]
    fn test_stored_normal_wins() {
        let mut mesh = Mesh::triangle_mesh();
        mesh.enable(Element::Face, Component::Normal);
        quad_as_triangles(&mut mesh);
        mesh.set_normal(Element::Face, 1, [0.0, 1.0, 0.0]);
        let mut out = Vec::new();
        let settings = SaveSettings::default().with_binary(false);
        let saved = write_stl(&mut out, &mesh, &settings, &mut NullLogger).unwrap();
        assert!(saved.has_component(Element::Face, Component::Normal));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("facet normal 0 1 0"));
    }

    #[test]
    fn test_degenerate_normal() {
        let p = [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]];
        assert_eq!(triangle_normal(&p), [0.0; 3]);
    }
}
