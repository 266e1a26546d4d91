//! Common traits for readers and writers.
//!
//! Every format implements [`Reader`] and [`Writer`], so loading and saving
//! can be written once for all of them:
//!
//! ```ignore
//! use polymesh_io::{NullLogger, LoadSettings, Reader, OffReader};
//!
//! fn load<R: Reader>(path: &str, mesh: &mut Mesh) -> Result<MeshInfo> {
//!     let mut reader = R::open(path)?;
//!     reader.read_into(mesh, &LoadSettings::default(), &mut NullLogger)
//! }
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use polymesh_core::{Mesh, MeshInfo, VertexIndex};

use crate::error::{MeshIoError, Result};
use crate::progress::{Logger, NullLogger};
use crate::settings::{LoadSettings, SaveSettings};

/// Common interface for mesh readers.
pub trait Reader: Sized {
    /// Open a file for reading.
    ///
    /// # Errors
    /// `CannotOpenFile` when the file does not exist or cannot be read.
    fn open<P: AsRef<Path>>(path: P) -> Result<Self>;

    /// Load the file into `mesh`, replacing its elements.
    ///
    /// Returns what was actually transferred. On error the mesh is left
    /// empty.
    fn read_into(
        &mut self,
        mesh: &mut Mesh,
        settings: &LoadSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo>;

    /// Load into a fresh polygon mesh with default settings.
    fn read_mesh(&mut self) -> Result<Mesh> {
        let mut mesh = Mesh::polygon_mesh();
        self.read_into(&mut mesh, &LoadSettings::default(), &mut NullLogger)?;
        Ok(mesh)
    }
}

/// Common interface for mesh writers.
pub trait Writer: Sized {
    /// Create a new writer instance.
    fn new() -> Self;

    /// Write `mesh` to `path`.
    ///
    /// Returns the components written: the request in `settings`
    /// intersected with what the mesh stores and the format can hold.
    fn write<P: AsRef<Path>>(
        &self,
        path: P,
        mesh: &Mesh,
        settings: &SaveSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo>;
}

// ============================================================================
// File helpers shared by the formats
// ============================================================================

pub(crate) fn check_readable(path: &Path) -> Result<()> {
    std::fs::metadata(path)
        .map(|_| ())
        .map_err(|source| MeshIoError::CannotOpenFile {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) fn open_input(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| MeshIoError::CannotOpenFile {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) fn create_output(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| MeshIoError::CannotOpenFile {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Clears `mesh` when a load failed, so no half-built mesh escapes.
pub(crate) fn clear_on_error<T>(mesh: &mut Mesh, result: Result<T>) -> Result<T> {
    if result.is_err() {
        mesh.clear();
    }
    result
}

/// Position of `v` among the live vertices, as written by every saver.
pub(crate) fn compact_index(compact: &[Option<u32>], v: VertexIndex) -> Result<u32> {
    compact
        .get(v.index())
        .copied()
        .flatten()
        .ok_or_else(|| MeshIoError::malformed(format!("Reference to deleted vertex {}", v.0)))
}
