//! Capability negotiation between what a file offers and what a mesh stores.
//!
//! Every optional component a file provides goes through [`negotiate`]:
//!
//! - already enabled on the mesh: recorded as loaded;
//! - supported but disabled, and optional components may be enabled: it is
//!   enabled, then recorded;
//! - otherwise the reader still parses the values to keep its position in
//!   the stream, and drops them.
//!
//! The returned `MeshInfo` is the load report handed back to the caller.

use polymesh_core::{Component, DataType, Element, Mesh, MeshInfo};

/// Decides whether `component` of `element` will be stored, recording it in
/// `loaded` when it will.
pub fn negotiate(
    mesh: &mut Mesh,
    loaded: &mut MeshInfo,
    element: Element,
    component: Component,
    enable_optional: bool,
) -> bool {
    let stored = if mesh.is_enabled(element, component) {
        true
    } else if enable_optional {
        mesh.enable(element, component)
    } else {
        false
    };
    if stored {
        loaded.set_component(element, component, true);
    } else {
        log::debug!(
            "discarding {} {} values: not stored by the mesh",
            element.name(),
            component.name()
        );
    }
    stored
}

/// [`negotiate`] for a named custom component.
pub fn negotiate_custom(
    mesh: &mut Mesh,
    loaded: &mut MeshInfo,
    element: Element,
    name: &str,
    data_type: DataType,
    enable_optional: bool,
) -> bool {
    let stored = mesh.has_custom_component(element, name)
        || (enable_optional && mesh.add_custom_component(element, name, data_type));
    if stored {
        loaded.add_custom_component(element, name, data_type);
    } else {
        log::debug!("discarding custom {} property '{}'", element.name(), name);
    }
    stored
}

/// Texture paths need no enabling, only a mesh that keeps them.
pub fn negotiate_textures(mesh: &Mesh, loaded: &mut MeshInfo) -> bool {
    if mesh.supports_textures() {
        loaded.set_textures(true);
        true
    } else {
        log::warn!("mesh cannot store texture paths, they are dropped");
        false
    }
}

/// Negotiates a whole file description at once, as the PLY reader does.
pub fn negotiate_info(mesh: &mut Mesh, file_info: &MeshInfo, enable_optional: bool) -> MeshInfo {
    let mut loaded = MeshInfo::new();
    for element in Element::ALL {
        if !file_info.has_element(element) {
            continue;
        }
        for component in file_info.components(element) {
            negotiate(mesh, &mut loaded, element, component, enable_optional);
        }
        for custom in file_info.custom_components(element) {
            negotiate_custom(
                mesh,
                &mut loaded,
                element,
                &custom.name,
                custom.data_type,
                enable_optional,
            );
        }
    }
    if file_info.has_textures() {
        negotiate_textures(mesh, &mut loaded);
    }
    loaded
}
