//! Routing a path to the reader or writer of its format.

use std::fmt;
use std::path::Path;

use polymesh_core::{Mesh, MeshInfo};

use crate::error::{MeshIoError, Result};
use crate::obj_reader::ObjReader;
use crate::obj_writer::ObjWriter;
use crate::off_reader::OffReader;
use crate::off_writer::OffWriter;
use crate::ply_reader::PlyReader;
use crate::ply_writer::PlyWriter;
use crate::progress::Logger;
use crate::settings::{LoadSettings, SaveSettings};
use crate::stl_reader::StlReader;
use crate::stl_writer::StlWriter;
use crate::traits::{Reader, Writer};

/// A supported mesh file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    Obj,
    Off,
    Ply,
    Stl,
}

impl MeshFormat {
    pub const ALL: [MeshFormat; 4] = [MeshFormat::Obj, MeshFormat::Off, MeshFormat::Ply, MeshFormat::Stl];

    /// The format named by a file extension, ignoring case.
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(extension))
    }

    /// The format of `path`, judged by its extension only.
    ///
    /// # Errors
    /// `UnknownFileFormat` when the extension is missing or unsupported.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&extension).ok_or(MeshIoError::UnknownFileFormat { extension })
    }

    /// Lowercase extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::Obj => "obj",
            MeshFormat::Off => "off",
            MeshFormat::Ply => "ply",
            MeshFormat::Stl => "stl",
        }
    }

    /// Loads `path` into `mesh` with this format's reader.
    pub fn load_mesh<P: AsRef<Path>>(
        self,
        path: P,
        mesh: &mut Mesh,
        settings: &LoadSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo> {
        match self {
            MeshFormat::Obj => ObjReader::open(path)?.read_into(mesh, settings, logger),
            MeshFormat::Off => OffReader::open(path)?.read_into(mesh, settings, logger),
            MeshFormat::Ply => PlyReader::open(path)?.read_into(mesh, settings, logger),
            MeshFormat::Stl => StlReader::open(path)?.read_into(mesh, settings, logger),
        }
    }

    /// Saves `mesh` to `path` with this format's writer.
    pub fn save_mesh<P: AsRef<Path>>(
        self,
        path: P,
        mesh: &Mesh,
        settings: &SaveSettings,
        logger: &mut dyn Logger,
    ) -> Result<MeshInfo> {
        match self {
            MeshFormat::Obj => ObjWriter::new().write(path, mesh, settings, logger),
            MeshFormat::Off => OffWriter::new().write(path, mesh, settings, logger),
            MeshFormat::Ply => PlyWriter::new().write(path, mesh, settings, logger),
            MeshFormat::Stl => StlWriter::new().write(path, mesh, settings, logger),
        }
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

/// Extensions [`load_mesh`] and [`save_mesh`] accept.
pub fn supported_extensions() -> Vec<&'static str> {
    MeshFormat::ALL.iter().map(|f| f.extension()).collect()
}

/// Loads the file at `path` into `mesh`, picking the reader from the
/// extension.
///
/// Returns the components actually loaded. On failure `mesh` is empty.
pub fn load_mesh<P: AsRef<Path>>(
    path: P,
    mesh: &mut Mesh,
    settings: &LoadSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    let format = MeshFormat::from_path(&path)?;
    log::info!("loading {} as {}", path.as_ref().display(), format);
    format.load_mesh(path, mesh, settings, logger)
}

/// Saves `mesh` to `path`, picking the writer from the extension.
pub fn save_mesh<P: AsRef<Path>>(
    path: P,
    mesh: &Mesh,
    settings: &SaveSettings,
    logger: &mut dyn Logger,
) -> Result<MeshInfo> {
    let format = MeshFormat::from_path(&path)?;
    log::info!("saving {} as {}", path.as_ref().display(), format);
    format.save_mesh(path, mesh, settings, logger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_routing() {
        assert_eq!(MeshFormat::from_path("a/b/cube.OBJ").unwrap(), MeshFormat::Obj);
        assert_eq!(MeshFormat::from_path("x.Ply").unwrap(), MeshFormat::Ply);
        assert_eq!(MeshFormat::from_path("x.stl").unwrap(), MeshFormat::Stl);
        assert_eq!(MeshFormat::from_path("x.off").unwrap(), MeshFormat::Off);
    }

    #[test]
    fn test_unknown_extension() {
        match MeshFormat::from_path("scene.gltf") {
            Err(MeshIoError::UnknownFileFormat { extension }) => assert_eq!(extension, "gltf"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            MeshFormat::from_path("no_extension"),
            Err(MeshIoError::UnknownFileFormat { .. })
        ));
    }

    #[test]
    fn test_supported_extensions() {
        assert_eq!(supported_extensions(), vec!["obj", "off", "ply", "stl"]);
        assert_eq!(MeshFormat::Stl.to_string(), "STL");
    }
}
