//! Wavefront `.mtl` materials.
//!
//! Only the diffuse color, the dissolve factor and the diffuse texture map
//! reach the mesh; the other statements are parsed and kept on the
//! material so a bad file is still reported.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use polymesh_core::{Color, Mesh, MeshInfo};

use crate::error::Result;
use crate::negotiate::negotiate_textures;
use crate::primitives::{LineReader, Tokens};

#[derive(Debug, Clone, PartialEq)]
pub struct ObjMaterial {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    /// Opacity, 1 is opaque.
    pub dissolve: f32,
    pub shininess: f32,
    pub illumination: i32,
    pub diffuse_map: Option<String>,
    /// Set by a `Kd` statement.
    pub has_color: bool,
    /// Mesh texture slot of `diffuse_map`.
    pub texture_id: u16,
}

impl Default for ObjMaterial {
    fn default() -> Self {
        Self {
            ambient: [0.2; 3],
            diffuse: [1.0; 3],
            specular: [1.0; 3],
            dissolve: 1.0,
            shininess: 0.0,
            illumination: 2,
            diffuse_map: None,
            has_color: false,
            texture_id: 0,
        }
    }
}

impl ObjMaterial {
    pub fn has_texture(&self) -> bool {
        self.diffuse_map.is_some()
    }

    /// Diffuse color, with the dissolve factor as alpha.
    pub fn color(&self) -> Color {
        let [r, g, b] = self.diffuse;
        Color::from_unit(r, g, b, self.dissolve)
    }

    /// Writes the statements of this material after its `newmtl` line.
    pub fn write_statements<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        if self.has_color {
            let [r, g, b] = self.diffuse;
            writeln!(out, "Kd {r} {g} {b}")?;
            if self.dissolve < 1.0 {
                writeln!(out, "d {}", self.dissolve)?;
            }
        }
        if let Some(map) = &self.diffuse_map {
            writeln!(out, "map_Kd {map}")?;
        }
        Ok(())
    }
}

/// Materials by name, filled from one or more `.mtl` files.
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, ObjMaterial>,
    // Slots handed out when the mesh keeps no texture paths.
    unstored_textures: u16,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ObjMaterial> {
        self.materials.get(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Parses a `.mtl` stream. Diffuse maps are registered as mesh texture
    /// paths when the mesh keeps them.
    pub fn read<R: BufRead>(&mut self, input: R, mesh: &mut Mesh, loaded: &mut MeshInfo) -> Result<()> {
        let mut lines = LineReader::new(input);
        let mut current: Option<(String, ObjMaterial)> = None;

        while let Some(mut t) = lines.next_tokens()? {
            let keyword = t.next_str()?.to_string();
            if keyword == "newmtl" {
                if let Some((name, mat)) = current.take() {
                    self.materials.insert(name, mat);
                }
                current = Some((t.next_str()?.to_string(), ObjMaterial::default()));
                continue;
            }
            // Statements before the first `newmtl` have no material to go to.
            let Some((_, mat)) = current.as_mut() else {
                continue;
            };
            match keyword.as_str() {
                "Ka" => {
                    if let Some(c) = read_rgb(&mut t)? {
                        mat.ambient = c;
                    }
                }
                "Kd" => {
                    if let Some(c) = read_rgb(&mut t)? {
                        mat.diffuse = c;
                        mat.has_color = true;
                    }
                }
                "Ks" => {
                    if let Some(c) = read_rgb(&mut t)? {
                        mat.specular = c;
                    }
                }
                "d" => {
                    skip_option(&mut t);
                    mat.dissolve = t.next_parse()?;
                }
                "Tr" => {
                    skip_option(&mut t);
                    mat.dissolve = 1.0 - t.next_parse::<f32>()?;
                }
                "Ns" => mat.shininess = t.next_parse()?,
                "illum" => mat.illumination = t.next_parse()?,
                "map_Kd" => {
                    skip_map_options(&mut t);
                    let path = t.next_str()?.replace('\\', "/");
                    mat.texture_id = if negotiate_textures(mesh, loaded) {
                        mesh.push_texture_path(path.clone())
                    } else {
                        self.unstored_textures += 1;
                        self.unstored_textures - 1
                    };
                    mat.diffuse_map = Some(path);
                }
                _ => {}
            }
        }
        if let Some((name, mat)) = current {
            self.materials.insert(name, mat);
        }
        Ok(())
    }
}

/// `K? r g b`; the `spectral` and `xyz` forms are ignored.
fn read_rgb(t: &mut Tokens) -> Result<Option<[f32; 3]>> {
    if t.len() < 4 || matches!(t.peek(), Some("spectral") | Some("xyz")) {
        return Ok(None);
    }
    Ok(Some([t.next_parse()?, t.next_parse()?, t.next_parse()?]))
}

// `d -halo 0.5`
fn skip_option(t: &mut Tokens) {
    if t.peek().map_or(false, |s| s.starts_with('-')) {
        t.skip(1);
    }
}

fn skip_map_options(t: &mut Tokens) {
    while let Some(option) = t.peek() {
        if !option.starts_with('-') {
            break;
        }
        let values = match option {
            "-o" | "-s" | "-t" => 3,
            "-mm" => 2,
            "-blendu" | "-blendv" | "-bm" | "-boost" | "-cc" | "-clamp" | "-texres" => 1,
            _ => 0,
        };
        t.skip(1 + values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MTL: &str = "\
# materials
newmtl red
Ka 0.1 0.1 0.1
Kd 1 0 0
Ks spectral file.rfl
Tr 0.25
illum 1

newmtl wood
Kd xyz 1 1 1
d -halo 0.5
map_Kd -o 1 2 3 -clamp on -bm 2 textures\\wood.png
";

    #[test]
    fn test_parse_materials() {
        let mut mesh = Mesh::triangle_mesh();
        let mut loaded = MeshInfo::new();
        mesh.push_texture_path("existing.png");
        let mut lib = MaterialLibrary::new();
        lib.read(Cursor::new(MTL), &mut mesh, &mut loaded).unwrap();
        assert_eq!(lib.len(), 2);

        let red = lib.get("red").unwrap();
        assert!(red.has_color);
        assert_eq!(red.diffuse, [1.0, 0.0, 0.0]);
        assert_eq!(red.specular, [1.0; 3]);
        assert_eq!(red.dissolve, 0.75);
        assert_eq!(red.illumination, 1);
        assert_eq!(red.color(), Color::new(255, 0, 0, 191));
        assert!(!red.has_texture());

        let wood = lib.get("wood").unwrap();
        assert!(!wood.has_color);
        assert_eq!(wood.dissolve, 0.5);
        assert_eq!(wood.diffuse_map.as_deref(), Some("textures/wood.png"));
        assert_eq!(wood.texture_id, 1);
        assert_eq!(mesh.texture_paths(), &["existing.png", "textures/wood.png"]);
        assert!(loaded.has_textures());
    }

    #[test]
    fn test_write_statements() {
        let mat = ObjMaterial {
            diffuse: [0.5, 0.25, 1.0],
            has_color: true,
            diffuse_map: Some("a.png".into()),
            ..ObjMaterial::default()
        };
        let mut out = Vec::new();
        mat.write_statements(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Kd 0.5 0.25 1\nmap_Kd a.png\n");
    }
}
