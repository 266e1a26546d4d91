//! OBJ format reader.
//!
//! Reads `v`, `vn`, `vt`, `f` and `l` statements plus materials from
//! `mtllib` files. Some exporters append `r g b` (floats in `[0, 1]`) to
//! every `v` line; whether a file does so is decided on its first vertex.
//!
//! Face corners are `v`, `v/vt`, `v//vn` or `v/vt/vn`. Indices are 1-based,
//! negative indices count back from the last element read.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use polymesh_core::{Color, Component, Element, Mesh, MeshInfo, TexCoord, VertexIndex};

use crate::deferred::DeferredAttributes;
use crate::error::{MeshIoError, Result};
use crate::face_sink::FaceSink;
use crate::negotiate::negotiate;
use crate::obj_material::{MaterialLibrary, ObjMaterial};
use crate::primitives::{LineReader, Tokens};
use crate::progress::Logger;
use crate::settings::LoadSettings;
use crate::traits::{check_readable, clear_on_error, file_stem, open_input, Reader};

/// OBJ format reader.
///
/// Besides the `mtllib` files the OBJ names, a material file with the
/// same stem as the OBJ is loaded first when it exists.
#[derive(Debug)]
pub struct ObjReader {
    path: PathBuf,
}

impl ObjReader {
    /// Open an OBJ file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_readable(&path)?;
        Ok(Self { path })
    }

    fn load(&self, mesh: &mut Mesh, settings: &LoadSettings, logger: &mut dyn Logger) -> Result<MeshInfo> {
        let input = open_input(&self.path)?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        let total = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        let mut loader = ObjLoader::new(mesh, settings, Some(dir.to_path_buf()));
        let fallback = dir.join(format!("{}.mtl", file_stem(&self.path)));
        match open_input(&fallback) {
            Ok(mtl) => loader.read_materials(&fallback, mtl)?,
            Err(_) => log::debug!("no material file {}", fallback.display()),
        }
        loader.run(LineReader::new(input), total, logger)
    }
}

impl Reader for ObjReader {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        ObjReader::open(path)
    }

    fn read_into(
        &mut self,
        mesh: &mut Mesh,
        settings: &LoadSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo> {
        mesh.clear();
        mesh.set_name(file_stem(&self.path));
        let result = self.load(mesh, settings, logger);
        clear_on_error(mesh, result)
    }
}

/// Loads an OBJ stream into `mesh`.
///
/// `mtllib` statements are resolved against `material_dir`; without one
/// they are ignored.
pub fn read_obj<R: BufRead>(
    input: R,
    material_dir: Option<&Path>,
    mesh: &mut Mesh,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    mesh.clear();
    let loader = ObjLoader::new(mesh, settings, material_dir.map(Path::to_path_buf));
    let result = loader.run(LineReader::new(input), 0, logger);
    clear_on_error(mesh, result)
}

/// Per-call parsing state.
struct ObjLoader<'a> {
    mesh: &'a mut Mesh,
    enable: bool,
    material_dir: Option<PathBuf>,
    loaded: MeshInfo,
    materials: MaterialLibrary,
    material_files: Vec<PathBuf>,
    current: ObjMaterial,
    sink: Option<FaceSink>,
    normals: DeferredAttributes<[f64; 3]>,
    normal_count: usize,
    store_normals: bool,
    tex_coords: Vec<TexCoord>,
    vertex_colors: bool,
    face_colors: bool,
    wedges: bool,
    edge_colors: bool,
}

impl<'a> ObjLoader<'a> {
    fn new(mesh: &'a mut Mesh, settings: &LoadSettings, material_dir: Option<PathBuf>) -> Self {
        let sink = FaceSink::for_mesh(mesh);
        Self {
            mesh,
            enable: settings.enable_optional_components,
            material_dir,
            loaded: MeshInfo::new(),
            materials: MaterialLibrary::new(),
            material_files: Vec::new(),
            current: ObjMaterial::default(),
            sink,
            normals: DeferredAttributes::new(),
            normal_count: 0,
            store_normals: false,
            tex_coords: Vec::new(),
            vertex_colors: false,
            face_colors: false,
            wedges: false,
            edge_colors: false,
        }
    }

    /// Parses a material library once, however often it is referenced.
    fn read_materials<R: BufRead>(&mut self, path: &Path, input: R) -> Result<()> {
        if self.material_files.iter().any(|p| p.as_path() == path) {
            return Ok(());
        }
        self.material_files.push(path.to_path_buf());
        self.materials.read(input, self.mesh, &mut self.loaded)
    }

    fn run<R: BufRead>(mut self, mut lines: LineReader<R>, total: u64, logger: &mut dyn Logger) -> Result<MeshInfo> {
        logger.start_progress("Loading OBJ file", total);
        while let Some(mut t) = lines.next_tokens()? {
            let keyword = t.next_str()?.to_string();
            match keyword.as_str() {
                "mtllib" => self.mtllib(&mut t)?,
                "usemtl" => self.usemtl(&mut t)?,
                "v" => self.vertex(&mut t)?,
                "vn" => self.vertex_normal(&mut t)?,
                "vt" => self.tex_coord(&mut t)?,
                "f" => self.face(&mut t)?,
                "l" => self.edge(&mut t)?,
                _ => {}
            }
            logger.progress(lines.bytes_read());
        }
        self.finish();
        logger.end_progress();
        Ok(self.loaded)
    }

    fn mtllib(&mut self, t: &mut Tokens) -> Result<()> {
        let Some(dir) = self.material_dir.clone() else {
            return Ok(());
        };
        while t.remaining() > 0 {
            let path = dir.join(t.next_str()?);
            let input = open_input(&path)?;
            self.read_materials(&path, input)?;
        }
        Ok(())
    }

    fn usemtl(&mut self, t: &mut Tokens) -> Result<()> {
        let name = t.next_str()?;
        match self.materials.get(name) {
            Some(mat) => self.current = mat.clone(),
            None => log::warn!("Material {name} not found"),
        }
        Ok(())
    }

    fn vertex(&mut self, t: &mut Tokens) -> Result<()> {
        let v = self.mesh.add_vertex([t.next_f64()?, t.next_f64()?, t.next_f64()?]);
        self.loaded.set_component(Element::Vertex, Component::Coords, true);

        // Colors after the position, or a colored material: decided once.
        let inline_color = t.len() > 6;
        if v.index() == 0 && (inline_color || self.current.has_color) {
            self.vertex_colors = negotiate(self.mesh, &mut self.loaded, Element::Vertex, Component::Color, self.enable);
        }
        if self.vertex_colors {
            if inline_color {
                let (r, g, b) = (t.next_parse::<f32>()?, t.next_parse::<f32>()?, t.next_parse::<f32>()?);
                self.mesh.set_color(Element::Vertex, v.index(), Color::from_unit(r, g, b, 1.0));
            } else if self.current.has_color {
                self.mesh.set_color(Element::Vertex, v.index(), self.current.color());
            }
        }

        if let Some(n) = self.normals.take(v.index()) {
            self.mesh.set_normal(Element::Vertex, v.index(), n);
        }
        Ok(())
    }

    fn vertex_normal(&mut self, t: &mut Tokens) -> Result<()> {
        if self.normal_count == 0 {
            self.store_normals =
                negotiate(self.mesh, &mut self.loaded, Element::Vertex, Component::Normal, self.enable);
        }
        let i = self.normal_count;
        self.normal_count += 1;
        if !self.store_normals {
            return Ok(());
        }
        let n = [t.next_f64()?, t.next_f64()?, t.next_f64()?];
        if i < self.mesh.vertex_count() {
            self.mesh.set_normal(Element::Vertex, i, n);
        } else {
            self.normals.defer(i, n);
        }
        Ok(())
    }

    fn tex_coord(&mut self, t: &mut Tokens) -> Result<()> {
        let mut tc = TexCoord::new(t.next_f64()?, t.next_f64()?);
        if self.current.has_texture() {
            tc.index = self.current.texture_id;
        }
        self.tex_coords.push(tc);
        Ok(())
    }

    fn face(&mut self, t: &mut Tokens) -> Result<()> {
        self.loaded.set_element(Element::Face, true);
        let Some(sink) = self.sink else {
            return Ok(());
        };
        self.loaded.set_component(Element::Face, Component::VertexRefs, true);

        let mut vids = Vec::with_capacity(t.remaining());
        let mut wids = Vec::with_capacity(t.remaining());
        while t.remaining() > 0 {
            let corner = Tokens::with_delimiter(t.next_str()?, '/');
            vids.push(resolve_index(corner.get(0).unwrap_or(""), self.mesh.vertex_count())?);
            if let Some(w) = corner.get(1).filter(|w| !w.is_empty()) {
                wids.push(resolve_index(w, self.tex_coords.len())?);
            }
        }

        let first = self.mesh.face_count() == 0;
        let faces = sink.append_triangulated(self.mesh, &vids)?;

        if first && self.current.has_color {
            self.face_colors = negotiate(self.mesh, &mut self.loaded, Element::Face, Component::Color, self.enable);
        }
        if self.face_colors && self.current.has_color {
            let color = self.current.color();
            for f in &faces {
                self.mesh.set_color(Element::Face, f.face.index(), color);
            }
        }

        let has_wedges = !wids.is_empty() && wids.len() == vids.len();
        if first && has_wedges {
            self.wedges =
                negotiate(self.mesh, &mut self.loaded, Element::Face, Component::WedgeTexCoords, self.enable);
        }
        if self.wedges && has_wedges {
            for f in &faces {
                for (corner, &pos) in f.corners.iter().enumerate() {
                    let tc = self.tex_coords.get(wids[pos] as usize).copied().ok_or_else(|| {
                        MeshIoError::malformed(format!("Bad texcoord index for face {}", f.face.index()))
                    })?;
                    self.mesh.set_wedge_tex_coord(f.face, corner, tc);
                }
                if self.current.has_texture() {
                    self.mesh.set_texture_index(f.face, self.current.texture_id);
                }
            }
        }
        Ok(())
    }

    /// `l a b [c ..]`: a polyline, stored as one edge per segment.
    fn edge(&mut self, t: &mut Tokens) -> Result<()> {
        self.loaded.set_element(Element::Edge, true);
        if !self.mesh.supports_element(Element::Edge) {
            return Ok(());
        }
        self.loaded.set_component(Element::Edge, Component::VertexRefs, true);

        let mut ids = Vec::with_capacity(t.remaining());
        while t.remaining() > 0 {
            let corner = Tokens::with_delimiter(t.next_str()?, '/');
            ids.push(resolve_index(corner.get(0).unwrap_or(""), self.mesh.vertex_count())?);
        }
        if ids.len() < 2 {
            return Err(MeshIoError::malformed("Edge with less than two vertices"));
        }
        for pair in ids.windows(2) {
            let first = self.mesh.edge_count() == 0;
            let e = self.mesh.add_edge(VertexIndex(pair[0]), VertexIndex(pair[1]))?;
            if first && self.current.has_color {
                self.edge_colors =
                    negotiate(self.mesh, &mut self.loaded, Element::Edge, Component::Color, self.enable);
            }
            if self.edge_colors && self.current.has_color {
                self.mesh.set_color(Element::Edge, e.index(), self.current.color());
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        for (i, n) in self.normals.drain_ready(self.mesh.vertex_count()) {
            self.mesh.set_normal(Element::Vertex, i, n);
        }
        if !self.normals.is_empty() {
            log::debug!("{} normals have no matching vertex", self.normals.len());
        }

        let vertex_count = self.mesh.vertex_count();
        if !self.loaded.has_component(Element::Face, Component::WedgeTexCoords)
            && !self.tex_coords.is_empty()
            && self.tex_coords.len() == vertex_count
            && negotiate(self.mesh, &mut self.loaded, Element::Vertex, Component::TexCoord, self.enable)
        {
            for (i, tc) in self.tex_coords.iter().enumerate() {
                self.mesh.set_vertex_tex_coord(VertexIndex::from(i), *tc);
            }
        }
    }
}

/// Converts a 1-based (or negative, relative) OBJ index to a 0-based one.
fn resolve_index(token: &str, count: usize) -> Result<u32> {
    let i: i64 = token
        .parse()
        .map_err(|_| MeshIoError::malformed(format!("Cannot parse index '{token}'")))?;
    let resolved = match i {
        i if i > 0 => i - 1,
        i if i < 0 => count as i64 + i,
        _ => -1,
    };
    u32::try_from(resolved).map_err(|_| MeshIoError::malformed(format!("Bad index {token}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullLogger;
    use polymesh_core::FaceIndex;
    use std::io::Cursor;

    fn load_str(text: &str, mesh: &mut Mesh) -> Result<MeshInfo> {
        read_obj(Cursor::new(text), None, mesh, &LoadSettings::default(), &mut NullLogger)
    }

    #[test]
    fn test_quad_on_triangle_mesh() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mut mesh = Mesh::triangle_mesh();
        let info = load_str(text, &mut mesh).unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(
            mesh.face_vertices(FaceIndex(1)),
            &[VertexIndex(0), VertexIndex(2), VertexIndex(3)]
        );
        assert!(info.has_component(Element::Face, Component::VertexRefs));
        assert!(!info.has_component(Element::Vertex, Component::Color));
    }

    #[test]
    fn test_inline_vertex_colors() {
        let text = "v 0 0 0 1 0 0\nv 1 0 0 0 1 0\nv 0 1 0 0 0 1\n";
        let mut mesh = Mesh::point_cloud();
        let info = load_str(text, &mut mesh).unwrap();
        assert!(info.has_component(Element::Vertex, Component::Color));
        assert_eq!(mesh.color(Element::Vertex, 2), Some(Color::rgb(0, 0, 255)));
    }

    #[test]
    fn test_colors_decided_on_first_vertex() {
        let text = "v 0 0 0\nv 1 0 0 0 1 0\n";
        let mut mesh = Mesh::point_cloud();
        let info = load_str(text, &mut mesh).unwrap();
        assert!(!info.has_component(Element::Vertex, Component::Color));
        assert!(!mesh.is_enabled(Element::Vertex, Component::Color));
    }

    #[test]
    fn test_normals_before_vertices() {
        let text = "vn 0 0 1\nvn 0 1 0\nv 0 0 0\nv 1 0 0\nvn 1 0 0\nv 2 0 0\n";
        let mut mesh = Mesh::point_cloud();
        let info = load_str(text, &mut mesh).unwrap();
        assert!(info.has_component(Element::Vertex, Component::Normal));
        assert_eq!(mesh.normal(Element::Vertex, 0), Some([0.0, 0.0, 1.0]));
        assert_eq!(mesh.normal(Element::Vertex, 1), Some([0.0, 1.0, 0.0]));
        assert_eq!(mesh.normal(Element::Vertex, 2), Some([1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_wedge_tex_coords_follow_the_fan() {
        let text = "\
v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0
vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1
f 1/4 2/3 3/2 4/1
";
        let mut mesh = Mesh::triangle_mesh();
        let info = load_str(text, &mut mesh).unwrap();
        assert!(info.has_component(Element::Face, Component::WedgeTexCoords));
        assert!(!info.has_component(Element::Vertex, Component::TexCoord));
        let w = mesh.wedge_tex_coords(FaceIndex(1)).unwrap();
        assert_eq!(w, &[TexCoord::new(0.0, 1.0), TexCoord::new(1.0, 0.0), TexCoord::new(0.0, 0.0)]);
    }

    #[test]
    fn test_vertex_tex_coords_fallback() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nvt 1 0\nvt 0 1\nf 1 2 3\n";
        let mut mesh = Mesh::triangle_mesh();
        let info = load_str(text, &mut mesh).unwrap();
        assert!(info.has_component(Element::Vertex, Component::TexCoord));
        assert_eq!(mesh.vertex_tex_coord(VertexIndex(0)), Some(TexCoord::new(0.5, 0.5)));
    }

    #[test]
    fn test_negative_indices_and_normal_refs() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf -3//1 -2//1 -1//1\n";
        let mut mesh = Mesh::triangle_mesh();
        load_str(text, &mut mesh).unwrap();
        assert_eq!(
            mesh.face_vertices(FaceIndex(0)),
            &[VertexIndex(0), VertexIndex(1), VertexIndex(2)]
        );
    }

    #[test]
    fn test_polyline_edges() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nl 1 2 3\n";
        let mut mesh = Mesh::polygon_mesh();
        let info = load_str(text, &mut mesh).unwrap();
        assert!(info.has_component(Element::Edge, Component::VertexRefs));
        assert_eq!(mesh.edge_count(), 2);
    }

    #[test]
    fn test_bad_indices_clear_mesh() {
        let mut mesh = Mesh::triangle_mesh();
        let err = load_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n", &mut mesh).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(mesh.vertex_count(), 0);

        let err = load_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf 1/1 2/1 3/5\n", &mut mesh).unwrap_err();
        assert!(err.is_malformed());
        assert!(load_str("v 0 0 0\nf 0 1 1\n", &mut mesh).is_err());
    }

    #[test]
    fn test_unknown_material_is_tolerated() {
        let mut mesh = Mesh::triangle_mesh();
        load_str("usemtl missing\nv 0 0 0\n", &mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 1);
    }
}
