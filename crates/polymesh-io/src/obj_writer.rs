//! OBJ format writer.
//!
//! Colors and textures are expressed through materials, written to a `.mtl`
//! file next to the `.obj`. One material is emitted per distinct
//! (color, texture) pair actually used.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use polymesh_core::{Color, Component, EdgeIndex, Element, FaceIndex, Mesh, MeshInfo, VertexIndex};

use crate::error::{MeshIoError, Result};
use crate::obj_material::ObjMaterial;
use crate::progress::Logger;
use crate::settings::SaveSettings;
use crate::traits::{compact_index, create_output, file_stem, Writer};

/// OBJ format writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjWriter;

impl Writer for ObjWriter {
    fn new() -> Self {
        ObjWriter
    }

    fn write<P: AsRef<Path>>(
        &self,
        path: P,
        mesh: &Mesh,
        settings: &SaveSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo> {
        let path = path.as_ref();
        let mtl_name = format!("{}.mtl", file_stem(path));
        let mut mtl = Vec::new();

        let mut out = create_output(path)?;
        let target = MtlTarget {
            out: &mut mtl,
            file_name: &mtl_name,
        };
        let info = write_obj(&mut out, Some(target), mesh, settings, logger)?;
        out.flush()?;

        if !mtl.is_empty() {
            let mtl_path = path.with_file_name(&mtl_name);
            let mut mtl_out = create_output(&mtl_path)?;
            mtl_out.write_all(&mtl)?;
            mtl_out.flush()?;
        }
        Ok(info)
    }
}

/// Where the material library goes, and the name the OBJ refers to it by.
pub struct MtlTarget<'a> {
    pub out: &'a mut dyn Write,
    pub file_name: &'a str,
}

/// Everything an OBJ file can carry.
pub fn obj_capability() -> MeshInfo {
    MeshInfo::new()
        .with_component(Element::Vertex, Component::Coords)
        .with_component(Element::Vertex, Component::Normal)
        .with_component(Element::Vertex, Component::Color)
        .with_component(Element::Vertex, Component::TexCoord)
        .with_component(Element::Face, Component::VertexRefs)
        .with_component(Element::Face, Component::Color)
        .with_component(Element::Face, Component::WedgeTexCoords)
        .with_component(Element::Edge, Component::VertexRefs)
        .with_component(Element::Edge, Component::Color)
        .with_textures()
}

/// Writes `mesh` as OBJ, returning the components saved.
///
/// Without an `mtl` target colors and textures cannot be expressed and are
/// left out of the result.
pub fn write_obj<W: Write>(
    out: &mut W,
    mtl: Option<MtlTarget<'_>>,
    mesh: &Mesh,
    settings: &SaveSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    let mut info = settings
        .effective_info(&mesh.enabled_info())
        .intersect(&obj_capability());
    if info.has_component(Element::Face, Component::WedgeTexCoords) {
        info.set_component(Element::Vertex, Component::TexCoord, false);
    }
    if mtl.is_none() {
        for e in Element::ALL {
            info.set_component(e, Component::Color, false);
        }
        info.set_textures(false);
    }

    let mut materials = MaterialTable::new(mesh, &info);
    if materials.in_use() {
        if let Some(target) = &mtl {
            writeln!(out, "mtllib ./{}", target.file_name)?;
        }
    }

    let compact = mesh.vertex_compact_indices();
    let mut vt_written = 0usize;

    let vertex_count = mesh.live_count(Element::Vertex);
    writeln!(out, "\n# Vertices")?;
    logger.start_progress("Writing vertices", vertex_count as u64);
    for (k, i) in mesh.live(Element::Vertex).enumerate() {
        let v = VertexIndex::from(i);
        let tex = mesh.vertex_tex_coord(v).filter(|_| info.has_component(Element::Vertex, Component::TexCoord));
        let color = mesh.color(Element::Vertex, i).filter(|_| materials.vertex_colors);
        materials.select(out, color, tex.map(|t| t.index))?;

        let [x, y, z] = mesh.coords(v);
        writeln!(out, "v {x} {y} {z}")?;
        if let Some([nx, ny, nz]) = mesh
            .normal(Element::Vertex, i)
            .filter(|_| info.has_component(Element::Vertex, Component::Normal))
        {
            writeln!(out, "vn {nx} {ny} {nz}")?;
        }
        if let Some(tc) = tex {
            writeln!(out, "vt {} {}", tc.u, tc.v)?;
            vt_written += 1;
        }
        logger.progress(k as u64 + 1);
    }
    logger.end_progress();

    if info.has_component(Element::Face, Component::VertexRefs) {
        let wedges = info.has_component(Element::Face, Component::WedgeTexCoords);
        writeln!(out, "\n# Faces")?;
        logger.start_progress("Writing faces", mesh.live_count(Element::Face) as u64);
        for (k, i) in mesh.live(Element::Face).enumerate() {
            let f = FaceIndex::from(i);
            let color = mesh.color(Element::Face, i).filter(|_| materials.face_colors);
            let texture = mesh.texture_index(f).filter(|_| wedges);
            materials.select(out, color, texture)?;

            let vertices = mesh.face_vertices(f);
            let wedge_coords = mesh.wedge_tex_coords(f).filter(|_| wedges);
            if let Some(coords) = wedge_coords {
                for tc in coords {
                    writeln!(out, "vt {} {}", tc.u, tc.v)?;
                }
            }
            write!(out, "f")?;
            for (corner, v) in vertices.iter().enumerate() {
                write!(out, " {}", compact_index(&compact, *v)? + 1)?;
                if wedge_coords.is_some() {
                    write!(out, "/{}", vt_written + corner + 1)?;
                }
            }
            writeln!(out)?;
            if wedge_coords.is_some() {
                vt_written += vertices.len();
            }
            logger.progress(k as u64 + 1);
        }
        logger.end_progress();
    }

    if info.has_component(Element::Edge, Component::VertexRefs) {
        writeln!(out, "\n# Edges")?;
        logger.start_progress("Writing edges", mesh.live_count(Element::Edge) as u64);
        for (k, i) in mesh.live(Element::Edge).enumerate() {
            let color = mesh.color(Element::Edge, i).filter(|_| materials.edge_colors);
            materials.select(out, color, None)?;
            let [a, b] = mesh.edge_vertices(EdgeIndex::from(i));
            writeln!(out, "l {} {}", compact_index(&compact, a)? + 1, compact_index(&compact, b)? + 1)?;
            logger.progress(k as u64 + 1);
        }
        logger.end_progress();
    }

    if let Some(target) = mtl {
        materials.write_library(target.out)?;
    }
    Ok(info)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MaterialKey {
    color: Option<Color>,
    texture: Option<u16>,
}

/// Names handed out so far, in first-use order.
struct MaterialTable<'m> {
    texture_paths: &'m [String],
    vertex_colors: bool,
    face_colors: bool,
    edge_colors: bool,
    textures: bool,
    names: HashMap<MaterialKey, usize>,
    materials: Vec<ObjMaterial>,
    current: Option<usize>,
}

impl<'m> MaterialTable<'m> {
    fn new(mesh: &'m Mesh, info: &MeshInfo) -> Self {
        let textured = info.has_textures()
            && (info.has_component(Element::Vertex, Component::TexCoord)
                || info.has_component(Element::Face, Component::WedgeTexCoords));
        Self {
            texture_paths: mesh.texture_paths(),
            vertex_colors: info.has_component(Element::Vertex, Component::Color),
            face_colors: info.has_component(Element::Face, Component::Color),
            edge_colors: info.has_component(Element::Edge, Component::Color),
            textures: textured,
            names: HashMap::new(),
            materials: Vec::new(),
            current: None,
        }
    }

    fn in_use(&self) -> bool {
        self.vertex_colors || self.face_colors || self.edge_colors || self.textures
    }

    /// Emits `usemtl` when the material for the next primitive differs from
    /// the current one.
    fn select<W: Write>(&mut self, out: &mut W, color: Option<Color>, texture: Option<u16>) -> Result<()> {
        if !self.in_use() {
            return Ok(());
        }
        let texture = texture.filter(|t| self.textures && (*t as usize) < self.texture_paths.len());
        if color.is_none() && texture.is_none() {
            return Ok(());
        }
        let key = MaterialKey { color, texture };
        let id = match self.names.get(&key) {
            Some(id) => *id,
            None => {
                let id = self.materials.len();
                self.materials.push(self.material_for(key)?);
                self.names.insert(key, id);
                id
            }
        };
        if self.current != Some(id) {
            writeln!(out, "usemtl MATERIAL_{id}")?;
            self.current = Some(id);
        }
        Ok(())
    }

    fn material_for(&self, key: MaterialKey) -> Result<ObjMaterial> {
        let mut mat = ObjMaterial::default();
        if let Some(c) = key.color {
            mat.diffuse = [c.red_f(), c.green_f(), c.blue_f()];
            mat.dissolve = c.alpha_f();
            mat.has_color = true;
        }
        if let Some(t) = key.texture {
            let path = self
                .texture_paths
                .get(t as usize)
                .ok_or_else(|| MeshIoError::malformed(format!("No texture path for slot {t}")))?;
            mat.diffuse_map = Some(path.clone());
            mat.texture_id = t;
        }
        Ok(mat)
    }

    fn write_library(&self, out: &mut dyn Write) -> Result<()> {
        for (id, mat) in self.materials.iter().enumerate() {
            writeln!(out, "newmtl MATERIAL_{id}")?;
            mat.write_statements(out)?;
            writeln!(out)?;
        }
        Ok(())
    }
}
