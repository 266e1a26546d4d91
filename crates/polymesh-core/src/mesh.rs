//! In-memory polygonal mesh with optional per-element components.
//!
//! Vertices always carry a position. Every other component (normals, colors,
//! quality, texture coordinates, custom scalars) is *optional*: it must be
//! both supported by the mesh capabilities and enabled before it holds data.
//! Readers use [`Mesh::supports`], [`Mesh::is_enabled`] and [`Mesh::enable`]
//! to decide what they can transfer.
//!
//! Elements are soft-deleted: deleting keeps the slot and marks it, so
//! indices stay stable until the caller compacts. Writers translate vertex
//! references through [`Mesh::vertex_compact_indices`].

use crate::color::Color;
use crate::data_types::DataType;
use crate::error::{MeshError, MeshResult};
use crate::geometry_indices::{EdgeIndex, FaceIndex, VertexIndex};
use crate::mesh_info::{Component, CustomComponentInfo, Element, MeshInfo};
use crate::tex_coord::TexCoord;

/// Number of vertices a face may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceArity {
    Fixed(usize),
    Variable,
}

#[derive(Debug, Clone, PartialEq)]
struct CustomColumn {
    name: String,
    data_type: DataType,
    values: Vec<f64>,
}

/// Optional storage shared by every element kind.
#[derive(Debug, Clone, Default)]
struct Columns {
    len: usize,
    deleted: Vec<bool>,
    normals: Option<Vec<[f64; 3]>>,
    colors: Option<Vec<Color>>,
    quality: Option<Vec<f64>>,
    tex_coords: Option<Vec<TexCoord>>,
    wedges: Option<Vec<Vec<TexCoord>>>,
    texture_indices: Option<Vec<u16>>,
    custom: Vec<CustomColumn>,
}

impl Columns {
    fn push(&mut self, corners: usize) {
        self.len += 1;
        self.deleted.push(false);
        if let Some(v) = &mut self.normals {
            v.push([0.0; 3]);
        }
        if let Some(v) = &mut self.colors {
            v.push(Color::default());
        }
        if let Some(v) = &mut self.quality {
            v.push(0.0);
        }
        if let Some(v) = &mut self.tex_coords {
            v.push(TexCoord::default());
        }
        if let Some(v) = &mut self.wedges {
            v.push(vec![TexCoord::default(); corners]);
        }
        if let Some(v) = &mut self.texture_indices {
            v.push(0);
        }
        for c in &mut self.custom {
            c.values.push(0.0);
        }
    }

    fn clear(&mut self) {
        self.len = 0;
        self.deleted.clear();
        if let Some(v) = &mut self.normals {
            v.clear();
        }
        if let Some(v) = &mut self.colors {
            v.clear();
        }
        if let Some(v) = &mut self.quality {
            v.clear();
        }
        if let Some(v) = &mut self.tex_coords {
            v.clear();
        }
        if let Some(v) = &mut self.wedges {
            v.clear();
        }
        if let Some(v) = &mut self.texture_indices {
            v.clear();
        }
        for c in &mut self.custom {
            c.values.clear();
        }
    }

    fn custom(&self, name: &str) -> Option<&CustomColumn> {
        self.custom.iter().find(|c| c.name == name)
    }

    fn custom_mut(&mut self, name: &str) -> Option<&mut CustomColumn> {
        self.custom.iter_mut().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    name: Option<String>,
    capabilities: MeshInfo,
    face_arity: Option<FaceArity>,
    custom_components: bool,
    coords: Vec<[f64; 3]>,
    vertex: Columns,
    faces: Vec<Vec<VertexIndex>>,
    face: Columns,
    edges: Vec<[VertexIndex; 2]>,
    edge: Columns,
    texture_paths: Vec<String>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::polygon_mesh()
    }
}

fn full_capabilities(faces: bool, edges: bool) -> MeshInfo {
    let mut caps = MeshInfo::new()
        .with_component(Element::Vertex, Component::Coords)
        .with_component(Element::Vertex, Component::Normal)
        .with_component(Element::Vertex, Component::Color)
        .with_component(Element::Vertex, Component::Quality)
        .with_component(Element::Vertex, Component::TexCoord)
        .with_textures();
    if faces {
        caps = caps
            .with_component(Element::Face, Component::VertexRefs)
            .with_component(Element::Face, Component::Normal)
            .with_component(Element::Face, Component::Color)
            .with_component(Element::Face, Component::Quality)
            .with_component(Element::Face, Component::WedgeTexCoords);
    }
    if edges {
        caps = caps
            .with_component(Element::Edge, Component::VertexRefs)
            .with_component(Element::Edge, Component::Normal)
            .with_component(Element::Edge, Component::Color)
            .with_component(Element::Edge, Component::Quality);
    }
    caps
}

impl Mesh {
    /// Triangle faces and edges; polygons must be split before insertion.
    pub fn triangle_mesh() -> Self {
        Self::with_capabilities(full_capabilities(true, true), Some(FaceArity::Fixed(3)), true)
    }

    /// Faces of any size, plus edges.
    pub fn polygon_mesh() -> Self {
        Self::with_capabilities(full_capabilities(true, true), Some(FaceArity::Variable), true)
    }

    /// Vertices only.
    pub fn point_cloud() -> Self {
        Self::with_capabilities(full_capabilities(false, false), None, true)
    }

    /// Builds a mesh able to store exactly what `capabilities` lists.
    ///
    /// Faces exist only when `face_arity` is given; vertex positions are
    /// always stored. Custom components of `capabilities` are ignored: use
    /// `custom_components` to allow them.
    pub fn with_capabilities(
        capabilities: MeshInfo,
        face_arity: Option<FaceArity>,
        custom_components: bool,
    ) -> Self {
        let mut caps = MeshInfo::new();
        for e in Element::ALL {
            for c in capabilities.components(e) {
                caps.set_component(e, c, true);
            }
        }
        caps.set_component(Element::Vertex, Component::Coords, true);
        if face_arity.is_some() {
            caps.set_component(Element::Face, Component::VertexRefs, true);
        } else {
            for c in Component::ALL {
                caps.set_component(Element::Face, c, false);
            }
            caps.set_element(Element::Face, false);
        }
        if capabilities.has_element(Element::Edge) {
            caps.set_component(Element::Edge, Component::VertexRefs, true);
        }
        caps.set_textures(capabilities.has_textures());

        Self {
            name: None,
            capabilities: caps,
            face_arity,
            custom_components,
            coords: Vec::new(),
            vertex: Columns::default(),
            faces: Vec::new(),
            face: Columns::default(),
            edges: Vec::new(),
            edge: Columns::default(),
            texture_paths: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Removes every element and texture path. Enabled components stay enabled.
    pub fn clear(&mut self) {
        self.coords.clear();
        self.vertex.clear();
        self.faces.clear();
        self.face.clear();
        self.edges.clear();
        self.edge.clear();
        self.texture_paths.clear();
    }

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    pub fn capabilities(&self) -> &MeshInfo {
        &self.capabilities
    }

    pub fn face_arity(&self) -> Option<FaceArity> {
        self.face_arity
    }

    pub fn supports_element(&self, element: Element) -> bool {
        self.capabilities.has_element(element)
    }

    pub fn supports(&self, element: Element, component: Component) -> bool {
        self.capabilities.has_component(element, component)
    }

    pub fn supports_textures(&self) -> bool {
        self.capabilities.has_textures()
    }

    pub fn supports_custom_components(&self) -> bool {
        self.custom_components
    }

    pub fn is_enabled(&self, element: Element, component: Component) -> bool {
        if !self.supports(element, component) {
            return false;
        }
        let cols = self.columns(element);
        match component {
            Component::Coords | Component::VertexRefs => true,
            Component::Normal => cols.normals.is_some(),
            Component::Color => cols.colors.is_some(),
            Component::Quality => cols.quality.is_some(),
            Component::TexCoord => cols.tex_coords.is_some(),
            Component::WedgeTexCoords => cols.wedges.is_some(),
        }
    }

    /// Enables an optional component. Returns false if the mesh cannot store it.
    pub fn enable(&mut self, element: Element, component: Component) -> bool {
        if !self.supports(element, component) {
            return false;
        }
        let corners: Vec<usize> = if component == Component::WedgeTexCoords {
            self.faces.iter().map(Vec::len).collect()
        } else {
            Vec::new()
        };
        let cols = self.columns_mut(element);
        let len = cols.len;
        match component {
            Component::Coords | Component::VertexRefs => {}
            Component::Normal => {
                cols.normals.get_or_insert_with(|| vec![[0.0; 3]; len]);
            }
            Component::Color => {
                cols.colors.get_or_insert_with(|| vec![Color::default(); len]);
            }
            Component::Quality => {
                cols.quality.get_or_insert_with(|| vec![0.0; len]);
            }
            Component::TexCoord => {
                cols.tex_coords.get_or_insert_with(|| vec![TexCoord::default(); len]);
            }
            Component::WedgeTexCoords => {
                cols.wedges.get_or_insert_with(|| {
                    corners.iter().map(|n| vec![TexCoord::default(); *n]).collect()
                });
                cols.texture_indices.get_or_insert_with(|| vec![0; len]);
            }
        }
        true
    }

    /// Disables an optional component and drops its data.
    pub fn disable(&mut self, element: Element, component: Component) {
        let cols = self.columns_mut(element);
        match component {
            Component::Coords | Component::VertexRefs => {}
            Component::Normal => cols.normals = None,
            Component::Color => cols.colors = None,
            Component::Quality => cols.quality = None,
            Component::TexCoord => cols.tex_coords = None,
            Component::WedgeTexCoords => {
                cols.wedges = None;
                cols.texture_indices = None;
            }
        }
    }

    /// Adds a custom scalar component to every element of a kind.
    ///
    /// Returns false when the mesh does not support custom components or the
    /// element kind. An existing component with the same name is kept.
    pub fn add_custom_component(&mut self, element: Element, name: &str, data_type: DataType) -> bool {
        if !self.custom_components || !self.supports_element(element) {
            return false;
        }
        let cols = self.columns_mut(element);
        if cols.custom(name).is_none() {
            let len = cols.len;
            cols.custom.push(CustomColumn {
                name: name.to_string(),
                data_type,
                values: vec![0.0; len],
            });
        }
        true
    }

    pub fn has_custom_component(&self, element: Element, name: &str) -> bool {
        self.columns(element).custom(name).is_some()
    }

    pub fn custom_components(&self, element: Element) -> Vec<CustomComponentInfo> {
        self.columns(element)
            .custom
            .iter()
            .map(|c| CustomComponentInfo {
                name: c.name.clone(),
                data_type: c.data_type,
            })
            .collect()
    }

    /// What the mesh currently stores.
    ///
    /// Faces and edges are reported only when at least one exists.
    pub fn enabled_info(&self) -> MeshInfo {
        let mut info = MeshInfo::new();
        for e in Element::ALL {
            let present = match e {
                Element::Vertex => true,
                Element::Face => self.supports_element(e) && !self.faces.is_empty(),
                Element::Edge => self.supports_element(e) && !self.edges.is_empty(),
            };
            if !present {
                continue;
            }
            info.set_element(e, true);
            for c in Component::ALL {
                if self.is_enabled(e, c) {
                    info.set_component(e, c, true);
                }
            }
            for cc in self.custom_components(e) {
                info.add_custom_component(e, &cc.name, cc.data_type);
            }
        }
        info.set_textures(!self.texture_paths.is_empty());
        info
    }

    // ------------------------------------------------------------------
    // Vertices
    // ------------------------------------------------------------------

    pub fn add_vertex(&mut self, coords: [f64; 3]) -> VertexIndex {
        let idx = VertexIndex::from(self.coords.len());
        self.coords.push(coords);
        self.vertex.push(0);
        idx
    }

    /// Appends `n` vertices at the origin and returns the index of the first.
    pub fn add_vertices(&mut self, n: usize) -> VertexIndex {
        let first = VertexIndex::from(self.coords.len());
        self.coords.reserve(n);
        for _ in 0..n {
            self.add_vertex([0.0; 3]);
        }
        first
    }

    /// Size of the vertex container, deleted vertices included.
    pub fn vertex_count(&self) -> usize {
        self.coords.len()
    }

    pub fn coords(&self, v: VertexIndex) -> [f64; 3] {
        self.coords[v.index()]
    }

    pub fn set_coords(&mut self, v: VertexIndex, coords: [f64; 3]) {
        self.coords[v.index()] = coords;
    }

    pub fn set_coord(&mut self, v: VertexIndex, axis: usize, value: f64) {
        self.coords[v.index()][axis] = value;
    }

    pub fn vertex_tex_coord(&self, v: VertexIndex) -> Option<TexCoord> {
        self.vertex.tex_coords.as_ref().map(|t| t[v.index()])
    }

    pub fn set_vertex_tex_coord(&mut self, v: VertexIndex, tc: TexCoord) {
        if let Some(t) = &mut self.vertex.tex_coords {
            t[v.index()] = tc;
        }
    }

    // ------------------------------------------------------------------
    // Faces
    // ------------------------------------------------------------------

    /// Appends a face, checking arity and vertex references.
    pub fn add_face(&mut self, vertices: &[VertexIndex]) -> MeshResult<FaceIndex> {
        let arity = self.face_arity.ok_or(MeshError::UnsupportedElement("face"))?;
        if vertices.len() < 3 {
            return Err(MeshError::DegeneratePolygon(vertices.len()));
        }
        if let FaceArity::Fixed(n) = arity {
            if vertices.len() != n {
                return Err(MeshError::ArityMismatch {
                    arity: n,
                    got: vertices.len(),
                });
            }
        }
        self.check_vertices(vertices)?;
        let idx = FaceIndex::from(self.faces.len());
        self.faces.push(vertices.to_vec());
        self.face.push(vertices.len());
        Ok(idx)
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn face_vertices(&self, f: FaceIndex) -> &[VertexIndex] {
        &self.faces[f.index()]
    }

    pub fn wedge_tex_coords(&self, f: FaceIndex) -> Option<&[TexCoord]> {
        self.face.wedges.as_ref().map(|w| w[f.index()].as_slice())
    }

    pub fn set_wedge_tex_coord(&mut self, f: FaceIndex, corner: usize, tc: TexCoord) {
        if let Some(w) = &mut self.face.wedges {
            if let Some(slot) = w[f.index()].get_mut(corner) {
                *slot = tc;
            }
        }
    }

    pub fn texture_index(&self, f: FaceIndex) -> Option<u16> {
        self.face.texture_indices.as_ref().map(|t| t[f.index()])
    }

    pub fn set_texture_index(&mut self, f: FaceIndex, index: u16) {
        if let Some(t) = &mut self.face.texture_indices {
            t[f.index()] = index;
        }
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    pub fn add_edge(&mut self, a: VertexIndex, b: VertexIndex) -> MeshResult<EdgeIndex> {
        if !self.supports_element(Element::Edge) {
            return Err(MeshError::UnsupportedElement("edge"));
        }
        self.check_vertices(&[a, b])?;
        let idx = EdgeIndex::from(self.edges.len());
        self.edges.push([a, b]);
        self.edge.push(0);
        Ok(idx)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_vertices(&self, e: EdgeIndex) -> [VertexIndex; 2] {
        self.edges[e.index()]
    }

    // ------------------------------------------------------------------
    // Components shared by every element kind
    // ------------------------------------------------------------------

    /// Container size of an element kind, deleted entries included.
    pub fn element_count(&self, element: Element) -> usize {
        self.columns(element).len
    }

    pub fn normal(&self, element: Element, i: usize) -> Option<[f64; 3]> {
        self.columns(element).normals.as_ref().map(|n| n[i])
    }

    pub fn set_normal(&mut self, element: Element, i: usize, normal: [f64; 3]) {
        if let Some(n) = &mut self.columns_mut(element).normals {
            n[i] = normal;
        }
    }

    pub fn color(&self, element: Element, i: usize) -> Option<Color> {
        self.columns(element).colors.as_ref().map(|c| c[i])
    }

    pub fn set_color(&mut self, element: Element, i: usize, color: Color) {
        if let Some(c) = &mut self.columns_mut(element).colors {
            c[i] = color;
        }
    }

    pub fn quality(&self, element: Element, i: usize) -> Option<f64> {
        self.columns(element).quality.as_ref().map(|q| q[i])
    }

    pub fn set_quality(&mut self, element: Element, i: usize, quality: f64) {
        if let Some(q) = &mut self.columns_mut(element).quality {
            q[i] = quality;
        }
    }

    pub fn custom_value(&self, element: Element, name: &str, i: usize) -> Option<f64> {
        self.columns(element).custom(name).map(|c| c.values[i])
    }

    pub fn set_custom_value(&mut self, element: Element, name: &str, i: usize, value: f64) {
        if let Some(c) = self.columns_mut(element).custom_mut(name) {
            c.values[i] = value;
        }
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    pub fn delete(&mut self, element: Element, i: usize) {
        self.columns_mut(element).deleted[i] = true;
    }

    pub fn is_deleted(&self, element: Element, i: usize) -> bool {
        self.columns(element).deleted[i]
    }

    /// Indices of the live elements of a kind, in container order.
    pub fn live(&self, element: Element) -> impl Iterator<Item = usize> + '_ {
        self.columns(element)
            .deleted
            .iter()
            .enumerate()
            .filter(|(_, d)| !**d)
            .map(|(i, _)| i)
    }

    pub fn live_count(&self, element: Element) -> usize {
        self.columns(element).deleted.iter().filter(|d| !**d).count()
    }

    /// Maps every vertex to its position among live vertices.
    pub fn vertex_compact_indices(&self) -> Vec<Option<u32>> {
        let mut next = 0u32;
        self.vertex
            .deleted
            .iter()
            .map(|deleted| {
                if *deleted {
                    None
                } else {
                    next += 1;
                    Some(next - 1)
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    pub fn texture_paths(&self) -> &[String] {
        &self.texture_paths
    }

    pub fn texture_count(&self) -> usize {
        self.texture_paths.len()
    }

    /// Registers a texture path and returns its slot.
    pub fn push_texture_path(&mut self, path: impl Into<String>) -> u16 {
        self.texture_paths.push(path.into());
        (self.texture_paths.len() - 1) as u16
    }

    fn check_vertices(&self, vertices: &[VertexIndex]) -> MeshResult<()> {
        let count = self.coords.len();
        match vertices.iter().find(|v| v.index() >= count) {
            Some(v) => Err(MeshError::VertexOutOfRange { index: v.0, count }),
            None => Ok(()),
        }
    }

    fn columns(&self, element: Element) -> &Columns {
        match element {
            Element::Vertex => &self.vertex,
            Element::Face => &self.face,
            Element::Edge => &self.edge,
        }
    }

    fn columns_mut(&mut self, element: Element) -> &mut Columns {
        match element {
            Element::Vertex => &mut self.vertex,
            Element::Face => &mut self.face,
            Element::Edge => &mut self.edge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn quad(mesh: &mut Mesh) -> Vec<VertexIndex> {
        vec![
            mesh.add_vertex([0.0, 0.0, 0.0]),
            mesh.add_vertex([1.0, 0.0, 0.0]),
            mesh.add_vertex([1.0, 1.0, 0.0]),
            mesh.add_vertex([0.0, 1.0, 0.0]),
        ]
    }

    #[test]
    fn test_optional_components_start_disabled() {
        let mut mesh = Mesh::triangle_mesh();
        assert!(mesh.supports(Element::Vertex, Component::Color));
        assert!(!mesh.is_enabled(Element::Vertex, Component::Color));
        assert!(mesh.is_enabled(Element::Vertex, Component::Coords));

        let v = mesh.add_vertex([1.0, 2.0, 3.0]);
        assert_eq!(mesh.color(Element::Vertex, v.index()), None);
        assert!(mesh.enable(Element::Vertex, Component::Color));
        assert_eq!(mesh.color(Element::Vertex, v.index()), Some(Color::WHITE));
        mesh.set_color(Element::Vertex, v.index(), Color::BLACK);
        assert_eq!(mesh.color(Element::Vertex, v.index()), Some(Color::BLACK));
    }

    #[test]
    fn test_point_cloud_rejects_faces() {
        let mut mesh = Mesh::point_cloud();
        let vs = quad(&mut mesh);
        assert!(!mesh.supports_element(Element::Face));
        assert!(!mesh.enable(Element::Face, Component::Color));
        assert_eq!(
            mesh.add_face(&vs[..3]),
            Err(MeshError::UnsupportedElement("face"))
        );
    }

    #[test]
    fn test_add_face_checks() {
        let mut tri = Mesh::triangle_mesh();
        let vs = quad(&mut tri);
        assert_eq!(
            tri.add_face(&vs),
            Err(MeshError::ArityMismatch { arity: 3, got: 4 })
        );
        assert_eq!(
            tri.add_face(&[vs[0], vs[1], VertexIndex(9)]),
            Err(MeshError::VertexOutOfRange { index: 9, count: 4 })
        );
        assert_eq!(tri.add_face(&vs[..3]), Ok(FaceIndex(0)));

        let mut poly = Mesh::polygon_mesh();
        let vs = quad(&mut poly);
        assert_eq!(poly.add_face(&vs), Ok(FaceIndex(0)));
        assert_eq!(poly.face_vertices(FaceIndex(0)).len(), 4);
        assert_eq!(poly.add_face(&vs[..2]), Err(MeshError::DegeneratePolygon(2)));
    }

    #[test]
    fn test_enable_wedges_after_faces() {
        let mut mesh = Mesh::polygon_mesh();
        let vs = quad(&mut mesh);
        let f = mesh.add_face(&vs).unwrap();
        assert!(mesh.enable(Element::Face, Component::WedgeTexCoords));
        assert_eq!(mesh.wedge_tex_coords(f).map(|w| w.len()), Some(4));
        mesh.set_wedge_tex_coord(f, 2, TexCoord::new(0.5, 0.25));
        assert_eq!(mesh.wedge_tex_coords(f).unwrap()[2], TexCoord::new(0.5, 0.25));
        assert_eq!(mesh.texture_index(f), Some(0));
    }

    #[test]
    fn test_custom_components() {
        let mut mesh = Mesh::triangle_mesh();
        mesh.add_vertex([0.0; 3]);
        assert!(mesh.add_custom_component(Element::Vertex, "weight", DataType::Float32));
        mesh.add_vertex([1.0; 3]);
        mesh.set_custom_value(Element::Vertex, "weight", 1, 0.75);
        assert_eq!(mesh.custom_value(Element::Vertex, "weight", 0), Some(0.0));
        assert_eq!(mesh.custom_value(Element::Vertex, "weight", 1), Some(0.75));
        assert_eq!(mesh.custom_value(Element::Vertex, "missing", 1), None);

        let info = mesh.enabled_info();
        assert_eq!(
            info.custom_component(Element::Vertex, "weight").map(|c| c.data_type),
            Some(DataType::Float32)
        );

        let mut fixed = Mesh::with_capabilities(MeshInfo::new(), None, false);
        fixed.add_vertex([0.0; 3]);
        assert!(!fixed.add_custom_component(Element::Vertex, "weight", DataType::Float32));
    }

    #[test]
    fn test_clear_keeps_enabled_components() {
        let mut mesh = Mesh::triangle_mesh();
        mesh.enable(Element::Vertex, Component::Normal);
        let vs = quad(&mut mesh);
        mesh.add_face(&vs[..3]).unwrap();
        mesh.push_texture_path("a.png");
        mesh.clear();
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.texture_count(), 0);
        assert!(mesh.is_enabled(Element::Vertex, Component::Normal));

        mesh.disable(Element::Vertex, Component::Normal);
        assert!(!mesh.is_enabled(Element::Vertex, Component::Normal));
    }

    #[test]
    fn test_enabled_info_reports_present_elements() {
        let mut mesh = Mesh::triangle_mesh();
        let vs = quad(&mut mesh);
        let info = mesh.enabled_info();
        assert!(info.has_element(Element::Vertex));
        assert!(!info.has_element(Element::Face));

        mesh.add_face(&vs[..3]).unwrap();
        mesh.enable(Element::Face, Component::Color);
        let info = mesh.enabled_info();
        assert!(info.has_component(Element::Face, Component::VertexRefs));
        assert!(info.has_component(Element::Face, Component::Color));
        assert!(!info.has_element(Element::Edge));
    }

    #[test]
    fn test_compact_indices_skip_deleted() {
        let mut mesh = Mesh::polygon_mesh();
        quad(&mut mesh);
        mesh.delete(Element::Vertex, 1);
        assert_eq!(
            mesh.vertex_compact_indices(),
            vec![Some(0), None, Some(1), Some(2)]
        );
        assert_eq!(mesh.live(Element::Vertex).collect::<Vec<_>>(), vec![0, 2, 3]);
        assert_eq!(mesh.live_count(Element::Vertex), 3);
    }

    proptest! {
        #[test]
        fn prop_compact_indices_are_dense(deleted in proptest::collection::vec(any::<bool>(), 0..64)) {
            let mut mesh = Mesh::point_cloud();
            mesh.add_vertices(deleted.len());
            for (i, d) in deleted.iter().enumerate() {
                if *d {
                    mesh.delete(Element::Vertex, i);
                }
            }
            let compact = mesh.vertex_compact_indices();
            let live: Vec<u32> = compact.iter().flatten().copied().collect();
            let expected: Vec<u32> = (0..live.len() as u32).collect();
            prop_assert_eq!(live, expected);
            for (i, d) in deleted.iter().enumerate() {
                prop_assert_eq!(compact[i].is_none(), *d);
            }
        }
    }
}
