//! Binary STL export.

use std::fs;
use std::path::Path;

use crate::error::RenderError;
use crate::math::Vector3;

use super::SurfaceMesh;

/// Size of the fixed STL header in bytes.
const HEADER_LEN: usize = 80;

/// Bytes per triangle record: normal, three vertices, attribute count.
const RECORD_LEN: usize = 50;

/// Serializes a mesh as binary STL.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_binary_stl_bytes(mesh: &SurfaceMesh, header_name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 4 + mesh.faces.len() * RECORD_LEN);

    let mut header = [0u8; HEADER_LEN];
    let name_bytes = header_name.as_bytes();
    let copy_n = name_bytes.len().min(header.len());
    header[..copy_n].copy_from_slice(&name_bytes[..copy_n]);
    out.extend_from_slice(&header);

    out.extend_from_slice(&(mesh.faces.len() as u32).to_le_bytes());

    for (f, face) in mesh.faces.iter().enumerate() {
        let normal = mesh
            .face_normal(f)
            .try_normalize(0.0)
            .unwrap_or_else(Vector3::zeros);
        for c in normal.iter() {
            out.extend_from_slice(&(*c as f32).to_le_bytes());
        }
        for &i in face {
            for c in mesh.vertices[i as usize].iter() {
                out.extend_from_slice(&(*c as f32).to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    out
}

/// Writes a mesh to `path` as binary STL, creating missing parent
/// directories.
///
/// # Errors
///
/// Returns [`RenderError::Mesh`] if the directory or file cannot be written.
pub fn write_binary_stl(path: &Path, mesh: &SurfaceMesh, header_name: &str) -> Result<(), RenderError> {
    let mesh_error = |source| RenderError::Mesh {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(mesh_error)?;
    }
    fs::write(path, to_binary_stl_bytes(mesh, header_name)).map_err(mesh_error)
}
