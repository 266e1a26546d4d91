//! Polymesh Core Library
//!
//! The in-memory mesh that the polymesh codecs read into and write from,
//! together with the capability descriptor ([`MeshInfo`]) used to negotiate
//! which attributes can be transferred.

// =============================================================================
// Attribute value types
// =============================================================================

pub mod color;
pub mod data_types;
pub mod geometry_indices;
pub mod tex_coord;

// =============================================================================
// Mesh and capabilities
// =============================================================================

pub mod error;
pub mod mesh;
pub mod mesh_info;

pub use color::Color;
pub use data_types::DataType;
pub use error::{MeshError, MeshResult};
pub use geometry_indices::{EdgeIndex, FaceIndex, VertexIndex};
pub use mesh::{FaceArity, Mesh};
pub use mesh_info::{Component, CustomComponentInfo, Element, MeshInfo};
pub use tex_coord::TexCoord;
