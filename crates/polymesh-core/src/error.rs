use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("Vertex index {index} out of range ({count} vertices)")]
    VertexOutOfRange { index: u32, count: usize },
    #[error("Degenerate polygon with {0} vertices")]
    DegeneratePolygon(usize),
    #[error("Polygon with {got} vertices does not fit faces of arity {arity}")]
    ArityMismatch { arity: usize, got: usize },
    #[error("Mesh cannot store {0} elements")]
    UnsupportedElement(&'static str),
}

pub type MeshResult<T> = Result<T, MeshError>;
