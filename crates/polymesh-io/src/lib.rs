//! Polymesh I/O library for reading and writing polygonal mesh formats.
//!
//! Loaders fill a [`polymesh_core::Mesh`] whose attribute set is only
//! known at run time. Each optional attribute found in a file is
//! negotiated with the mesh (see [`negotiate`]): it is stored when the
//! mesh has it enabled or can enable it, and parsed then dropped
//! otherwise. Every load returns a [`MeshInfo`](polymesh_core::MeshInfo)
//! describing what was really transferred.
//!
//! # Supported Formats
//!
//! | Format | Read | Write | Notes                                        |
//! |--------|------|-------|----------------------------------------------|
//! | OBJ    | ✓    | ✓     | `.mtl` materials, wedge texcoords, polylines |
//! | OFF    | ✓    | ✓     | `[ST][C][N]OFF` flags, Geomview palette      |
//! | PLY    | ✓    | ✓     | ASCII and binary, custom properties, strips  |
//! | STL    | ✓    | ✓     | ASCII and binary, packed 5-5-5 face colors   |
//!
//! # Unified Trait API
//!
//! All readers implement [`Reader`] and all writers implement [`Writer`]:
//!
//! ```ignore
//! use polymesh_io::{NullLogger, LoadSettings, SaveSettings, Reader, Writer};
//! use polymesh_io::{ObjReader, PlyWriter};
//!
//! let mut mesh = ObjReader::open("input.obj")?.read_mesh()?;
//! PlyWriter::new().write("output.ply", &mesh, &SaveSettings::default(), &mut NullLogger)?;
//! ```
//!
//! # Picking the format from the path
//!
//! ```ignore
//! use polymesh_core::Mesh;
//! use polymesh_io::{load_mesh, save_mesh, LoadSettings, SaveSettings, LogProgress};
//!
//! let mut mesh = Mesh::triangle_mesh();
//! let loaded = load_mesh("bunny.PLY", &mut mesh, &LoadSettings::default(), &mut LogProgress::default())?;
//! println!("loaded {loaded}");
//!
//! // ASCII STL instead of the binary default
//! save_mesh("bunny.stl", &mesh, &SaveSettings::default().with_binary(false), &mut NullLogger)?;
//! ```
//!
//! # Stream-level functions
//!
//! Each format also exposes functions over `BufRead`/`Write` streams
//! ([`read_obj`], [`write_ply`], ...) so meshes can be decoded from memory.

// Shared building blocks
pub mod deferred;
pub mod error;
pub mod face_sink;
pub mod negotiate;
pub mod primitives;
pub mod progress;
pub mod settings;

// Format modules
pub mod obj_material;
pub mod obj_reader;
pub mod obj_writer;
pub mod off_palette;
pub mod off_reader;
pub mod off_writer;
pub mod ply_header;
pub mod ply_reader;
pub mod ply_writer;
pub mod stl_reader;
pub mod stl_writer;

pub mod format;
pub mod traits;

// Re-export main types for convenience
pub use error::{MeshIoError, Result};
pub use format::{load_mesh, save_mesh, supported_extensions, MeshFormat};
pub use obj_reader::{read_obj, ObjReader};
pub use obj_writer::{write_obj, MtlTarget, ObjWriter};
pub use off_reader::{read_off, OffReader};
pub use off_writer::{write_off, OffWriter};
pub use ply_reader::{read_ply, PlyReader};
pub use ply_writer::{write_ply, PlyWriter};
pub use progress::{LogProgress, Logger, NullLogger};
pub use settings::{LoadSettings, SaveSettings, StlMode};
pub use stl_reader::{read_stl, StlReader};
pub use stl_writer::{write_stl, StlWriter};
pub use traits::{Reader, Writer};
