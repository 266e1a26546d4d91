//! PLY format writer.

use std::io::Write;
use std::path::Path;

use num_traits::ToPrimitive;
use polymesh_core::{Component, DataType, EdgeIndex, Element, FaceIndex, Mesh, MeshInfo, VertexIndex};

use crate::error::{MeshIoError, Result};
use crate::ply_header::{ElementKind, PlyElement, PlyFormat, PlyHeader, PlyProperty, PropertyName};
use crate::primitives::{color_to_scalar, write_value, Encoding};
use crate::progress::Logger;
use crate::settings::SaveSettings;
use crate::traits::{compact_index, create_output, Writer};

/// PLY format writer.
///
/// Binary output is little endian; see [`SaveSettings::binary`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PlyWriter;

impl Writer for PlyWriter {
    fn new() -> Self {
        PlyWriter
    }

    fn write<P: AsRef<Path>>(
        &self,
        path: P,
        mesh: &Mesh,
        settings: &SaveSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo> {
        let mut out = create_output(path.as_ref())?;
        let info = write_ply(&mut out, mesh, settings, logger)?;
        out.flush()?;
        Ok(info)
    }
}

/// Everything a PLY file can carry, custom components aside.
pub fn ply_capability() -> MeshInfo {
    MeshInfo::new()
        .with_component(Element::Vertex, Component::Coords)
        .with_component(Element::Vertex, Component::Normal)
        .with_component(Element::Vertex, Component::Color)
        .with_component(Element::Vertex, Component::Quality)
        .with_component(Element::Vertex, Component::TexCoord)
        .with_component(Element::Face, Component::VertexRefs)
        .with_component(Element::Face, Component::Normal)
        .with_component(Element::Face, Component::Color)
        .with_component(Element::Face, Component::Quality)
        .with_component(Element::Face, Component::WedgeTexCoords)
        .with_component(Element::Edge, Component::VertexRefs)
        .with_component(Element::Edge, Component::Color)
        .with_component(Element::Edge, Component::Quality)
        .with_textures()
}

/// Writes `mesh` as PLY, returning the components saved.
pub fn write_ply<W: Write>(
    out: &mut W,
    mesh: &Mesh,
    settings: &SaveSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    let requested = settings.effective_info(&mesh.enabled_info());
    let mut info = requested.intersect(&ply_capability());
    for element in Element::ALL {
        if !info.has_element(element) {
            continue;
        }
        for custom in requested.custom_components(element) {
            info.add_custom_component(element, &custom.name, custom.data_type);
        }
    }

    let format = if settings.binary {
        PlyFormat::BinaryLittleEndian
    } else {
        PlyFormat::Ascii
    };
    let textures = if info.has_textures() {
        mesh.texture_paths().to_vec()
    } else {
        Vec::new()
    };
    let mut header = PlyHeader::from_info(format, &info, settings.real_type, textures);
    header.set_count(&ElementKind::Vertex, mesh.live_count(Element::Vertex));
    header.set_count(&ElementKind::Face, mesh.live_count(Element::Face));
    header.set_count(&ElementKind::Edge, mesh.live_count(Element::Edge));
    header.write(out)?;

    let mut body = BodyWriter {
        out,
        mesh,
        encoding: format.encoding(),
        compact: mesh.vertex_compact_indices(),
    };
    for element in &header.elements {
        match element.kind {
            ElementKind::Vertex => body.write_vertices(element, logger)?,
            ElementKind::Face => body.write_faces(element, logger)?,
            ElementKind::Edge => body.write_edges(element, logger)?,
            _ => {}
        }
    }
    Ok(info)
}

struct BodyWriter<'a, W> {
    out: &'a mut W,
    mesh: &'a Mesh,
    encoding: Encoding,
    compact: Vec<Option<u32>>,
}

impl<W: Write> BodyWriter<'_, W> {
    fn value<T: ToPrimitive + Copy>(&mut self, value: T, ty: DataType) -> Result<()> {
        write_value(&mut *self.out, value, ty, self.encoding)
    }

    fn end_element(&mut self) -> Result<()> {
        if self.encoding == Encoding::Ascii {
            writeln!(self.out)?;
        }
        Ok(())
    }

    /// Writes a property every element kind can have. Returns false for any
    /// other property.
    fn shared(&mut self, element: Element, i: usize, p: &PlyProperty) -> Result<bool> {
        let mesh = self.mesh;
        match &p.name {
            n if n.is_normal() => {
                let normal = mesh.normal(element, i).unwrap_or_default();
                self.value(normal[n.axis().unwrap_or(0)], p.data_type)?;
            }
            n if n.is_color() => {
                let color = mesh.color(element, i).unwrap_or_default();
                let channel = color.channel(n.axis().unwrap_or(3));
                self.value(color_to_scalar(channel, p.data_type), p.data_type)?;
            }
            PropertyName::Quality => self.value(mesh.quality(element, i).unwrap_or_default(), p.data_type)?,
            PropertyName::Unknown(name) => {
                self.value(mesh.custom_value(element, name, i).unwrap_or_default(), p.data_type)?
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn write_vertices(&mut self, element: &PlyElement, logger: &mut dyn Logger) -> Result<()> {
        let mesh = self.mesh;
        logger.start_progress("Writing vertices", element.count as u64);
        for (k, i) in mesh.live(Element::Vertex).enumerate() {
            let v = VertexIndex::from(i);
            let tc = mesh.vertex_tex_coord(v).unwrap_or_default();
            for p in &element.properties {
                match &p.name {
                    n if n.is_position() => self.value(mesh.coords(v)[n.axis().unwrap_or(0)], p.data_type)?,
                    PropertyName::TextureU => self.value(tc.u, p.data_type)?,
                    PropertyName::TextureV => self.value(tc.v, p.data_type)?,
                    PropertyName::TexNumber => self.value(tc.index, p.data_type)?,
                    _ => {
                        if !self.shared(Element::Vertex, i, p)? {
                            return Err(unexpected_property(p));
                        }
                    }
                }
            }
            self.end_element()?;
            logger.progress(k as u64 + 1);
        }
        logger.end_progress();
        Ok(())
    }

    fn write_faces(&mut self, element: &PlyElement, logger: &mut dyn Logger) -> Result<()> {
        let mesh = self.mesh;
        logger.start_progress("Writing faces", element.count as u64);
        for (k, i) in mesh.live(Element::Face).enumerate() {
            let f = FaceIndex::from(i);
            for p in &element.properties {
                match (&p.name, p.list_size) {
                    (PropertyName::VertexIndices, Some(size)) => {
                        let vertices = mesh.face_vertices(f);
                        self.value(vertices.len(), size)?;
                        for v in vertices {
                            let index = compact_index(&self.compact, *v)?;
                            self.value(index, p.data_type)?;
                        }
                    }
                    (PropertyName::TexCoord, Some(size)) => {
                        let wedges = mesh.wedge_tex_coords(f).unwrap_or_default();
                        self.value(wedges.len() * 2, size)?;
                        for tc in wedges {
                            self.value(tc.u, p.data_type)?;
                            self.value(tc.v, p.data_type)?;
                        }
                    }
                    (PropertyName::TexNumber, None) => {
                        self.value(mesh.texture_index(f).unwrap_or_default(), p.data_type)?
                    }
                    _ => {
                        if !self.shared(Element::Face, i, p)? {
                            return Err(unexpected_property(p));
                        }
                    }
                }
            }
            self.end_element()?;
            logger.progress(k as u64 + 1);
        }
        logger.end_progress();
        Ok(())
    }

    fn write_edges(&mut self, element: &PlyElement, logger: &mut dyn Logger) -> Result<()> {
        let mesh = self.mesh;
        logger.start_progress("Writing edges", element.count as u64);
        for (k, i) in mesh.live(Element::Edge).enumerate() {
            let [a, b] = mesh.edge_vertices(EdgeIndex::from(i));
            for p in &element.properties {
                match &p.name {
                    PropertyName::Vertex1 => {
                        let index = compact_index(&self.compact, a)?;
                        self.value(index, p.data_type)?
                    }
                    PropertyName::Vertex2 => {
                        let index = compact_index(&self.compact, b)?;
                        self.value(index, p.data_type)?
                    }
                    _ => {
                        if !self.shared(Element::Edge, i, p)? {
                            return Err(unexpected_property(p));
                        }
                    }
                }
            }
            self.end_element()?;
            logger.progress(k as u64 + 1);
        }
        logger.end_progress();
        Ok(())
    }
}

fn unexpected_property(p: &PlyProperty) -> MeshIoError {
    MeshIoError::malformed(format!("Cannot write PLY property '{}'", p.name.as_str()))
}
