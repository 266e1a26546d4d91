//! Capability descriptor exchanged between the codecs and a [`Mesh`].
//!
//! A `MeshInfo` says which elements (vertices, faces, edges) and which
//! per-element components are present. The same type describes three
//! different things depending on where it comes from:
//!
//! - what a mesh *can* store (its capabilities),
//! - what a mesh currently *has* enabled (`MeshInfo::from(&mesh)`),
//! - what a load or save call actually *transferred*.
//!
//! [`Mesh`]: crate::mesh::Mesh

use std::fmt;

use crate::data_types::DataType;
use crate::mesh::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    Vertex,
    Face,
    Edge,
}

impl Element {
    pub const ALL: [Element; 3] = [Element::Vertex, Element::Face, Element::Edge];

    pub(crate) fn slot(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Element::Vertex => "vertex",
            Element::Face => "face",
            Element::Edge => "edge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    /// Vertex position.
    Coords,
    /// Vertex references of a face or an edge.
    VertexRefs,
    Normal,
    Color,
    Quality,
    /// Per-vertex texture coordinate.
    TexCoord,
    /// Per-corner face texture coordinates plus the face texture index.
    WedgeTexCoords,
}

const COMPONENT_COUNT: usize = 7;

impl Component {
    pub const ALL: [Component; COMPONENT_COUNT] = [
        Component::Coords,
        Component::VertexRefs,
        Component::Normal,
        Component::Color,
        Component::Quality,
        Component::TexCoord,
        Component::WedgeTexCoords,
    ];

    pub(crate) fn slot(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Component::Coords => "coords",
            Component::VertexRefs => "vertex-refs",
            Component::Normal => "normal",
            Component::Color => "color",
            Component::Quality => "quality",
            Component::TexCoord => "texcoord",
            Component::WedgeTexCoords => "wedge-texcoords",
        }
    }
}

/// A named scalar attached to every element of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomComponentInfo {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshInfo {
    elements: [bool; 3],
    components: [[bool; COMPONENT_COUNT]; 3],
    custom: [Vec<CustomComponentInfo>; 3],
    textures: bool,
}

impl MeshInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        !self.textures
            && self.elements.iter().all(|e| !e)
            && self.components.iter().flatten().all(|c| !c)
            && self.custom.iter().all(Vec::is_empty)
    }

    pub fn has_element(&self, element: Element) -> bool {
        self.elements[element.slot()]
    }

    pub fn set_element(&mut self, element: Element, present: bool) {
        self.elements[element.slot()] = present;
    }

    pub fn has_component(&self, element: Element, component: Component) -> bool {
        self.components[element.slot()][component.slot()]
    }

    /// Sets a component flag. Setting a component marks its element present.
    pub fn set_component(&mut self, element: Element, component: Component, present: bool) {
        self.components[element.slot()][component.slot()] = present;
        if present {
            self.elements[element.slot()] = true;
        }
    }

    /// Components flagged for `element`, in declaration order.
    pub fn components(&self, element: Element) -> impl Iterator<Item = Component> + '_ {
        Component::ALL
            .into_iter()
            .filter(move |c| self.has_component(element, *c))
    }

    pub fn has_textures(&self) -> bool {
        self.textures
    }

    pub fn set_textures(&mut self, present: bool) {
        self.textures = present;
    }

    pub fn custom_components(&self, element: Element) -> &[CustomComponentInfo] {
        &self.custom[element.slot()]
    }

    pub fn custom_component(&self, element: Element, name: &str) -> Option<&CustomComponentInfo> {
        self.custom[element.slot()].iter().find(|c| c.name == name)
    }

    pub fn has_custom_component(&self, element: Element, name: &str) -> bool {
        self.custom_component(element, name).is_some()
    }

    /// Adds a custom component, replacing the type of one with the same name.
    pub fn add_custom_component(&mut self, element: Element, name: &str, data_type: DataType) {
        self.elements[element.slot()] = true;
        let list = &mut self.custom[element.slot()];
        match list.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.data_type = data_type,
            None => list.push(CustomComponentInfo {
                name: name.to_string(),
                data_type,
            }),
        }
    }

    pub fn remove_custom_component(&mut self, element: Element, name: &str) {
        self.custom[element.slot()].retain(|c| c.name != name);
    }

    /// Keeps only what is present in both descriptors.
    ///
    /// Custom components are matched by name; the entry of `self` is kept.
    pub fn intersect(&self, other: &MeshInfo) -> MeshInfo {
        let mut res = MeshInfo::new();
        for e in Element::ALL {
            let s = e.slot();
            res.elements[s] = self.elements[s] && other.elements[s];
            for c in Component::ALL {
                res.components[s][c.slot()] =
                    self.components[s][c.slot()] && other.components[s][c.slot()];
            }
            res.custom[s] = self.custom[s]
                .iter()
                .filter(|c| other.has_custom_component(e, &c.name))
                .cloned()
                .collect();
        }
        res.textures = self.textures && other.textures;
        res
    }

    // Builder-style helpers, handy for declaring capabilities and requests.

    pub fn with_element(mut self, element: Element) -> Self {
        self.set_element(element, true);
        self
    }

    pub fn with_component(mut self, element: Element, component: Component) -> Self {
        self.set_component(element, component, true);
        self
    }

    pub fn with_custom_component(mut self, element: Element, name: &str, data_type: DataType) -> Self {
        self.add_custom_component(element, name, data_type);
        self
    }

    pub fn with_textures(mut self) -> Self {
        self.textures = true;
        self
    }
}

impl From<&Mesh> for MeshInfo {
    fn from(mesh: &Mesh) -> Self {
        mesh.enabled_info()
    }
}

impl fmt::Display for MeshInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for e in Element::ALL {
            if !self.has_element(e) {
                continue;
            }
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}:", e.name())?;
            for c in self.components(e) {
                write!(f, " {}", c.name())?;
            }
            for cc in self.custom_components(e) {
                write!(f, " {}({:?})", cc.name, cc.data_type)?;
            }
        }
        if self.textures {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "textures")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_marks_element() {
        let mut info = MeshInfo::new();
        assert!(info.is_empty());
        info.set_component(Element::Face, Component::Color, true);
        assert!(info.has_element(Element::Face));
        assert!(info.has_component(Element::Face, Component::Color));
        assert!(!info.has_component(Element::Vertex, Component::Color));
        assert!(!info.is_empty());
    }

    #[test]
    fn test_intersect() {
        let a = MeshInfo::new()
            .with_component(Element::Vertex, Component::Coords)
            .with_component(Element::Vertex, Component::Color)
            .with_custom_component(Element::Vertex, "weight", DataType::Float32)
            .with_custom_component(Element::Vertex, "label", DataType::Int32)
            .with_textures();
        let b = MeshInfo::new()
            .with_component(Element::Vertex, Component::Coords)
            .with_component(Element::Vertex, Component::Normal)
            .with_custom_component(Element::Vertex, "weight", DataType::Float64);

        let i = a.intersect(&b);
        assert!(i.has_component(Element::Vertex, Component::Coords));
        assert!(!i.has_component(Element::Vertex, Component::Color));
        assert!(!i.has_component(Element::Vertex, Component::Normal));
        assert!(!i.has_textures());
        assert_eq!(i.custom_components(Element::Vertex).len(), 1);
        assert_eq!(
            i.custom_component(Element::Vertex, "weight").map(|c| c.data_type),
            Some(DataType::Float32)
        );
    }

    #[test]
    fn test_add_custom_replaces_type() {
        let mut info = MeshInfo::new();
        info.add_custom_component(Element::Face, "id", DataType::Uint8);
        info.add_custom_component(Element::Face, "id", DataType::Uint32);
        assert_eq!(info.custom_components(Element::Face).len(), 1);
        assert_eq!(info.custom_components(Element::Face)[0].data_type, DataType::Uint32);
        info.remove_custom_component(Element::Face, "id");
        assert!(!info.has_custom_component(Element::Face, "id"));
    }

    #[test]
    fn test_display() {
        let info = MeshInfo::new()
            .with_component(Element::Vertex, Component::Coords)
            .with_component(Element::Face, Component::VertexRefs);
        assert_eq!(info.to_string(), "vertex: coords; face: vertex-refs");
    }
}
