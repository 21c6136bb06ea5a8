//! A renderable model: an ordered list of GPU meshes loaded from an OBJ file.
//!
//! Loading flattens the OBJ's material runs into [`Mesh`]es in file order and
//! resolves each run's texture maps relative to the OBJ's directory. Textures
//! are cached by path so maps shared between runs upload once. A texture that
//! fails to decode is reported and its slot left empty; the mesh still
//! renders with the scene pass defaults.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::gpu::GpuContext;
use crate::mesh::{MaterialSlots, Mesh};
use crate::obj::{self, ObjError, ObjMaterial};
use crate::texture::Texture;

/// Errors that can occur while loading a model.
#[derive(Debug)]
pub enum ModelError {
    /// The OBJ file itself could not be read or parsed.
    Obj(ObjError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Obj(e) => write!(f, "model load failed: {}", e),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Obj(e) => Some(e),
        }
    }
}

impl From<ObjError> for ModelError {
    fn from(e: ObjError) -> Self {
        ModelError::Obj(e)
    }
}

/// An ordered collection of GPU meshes drawn with one model matrix.
pub struct Model {
    pub meshes: Vec<Mesh>,
}

impl Model {
    /// Load a model from a Wavefront OBJ file.
    pub fn load<P: AsRef<Path>>(gpu: &GpuContext, path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let parsed = obj::parse_obj_file(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut cache: HashMap<String, Rc<Texture>> = HashMap::new();
        let mut meshes = Vec::with_capacity(parsed.meshes.len());

        for run in &parsed.meshes {
            let material = run
                .material
                .as_deref()
                .and_then(|name| parsed.materials.get(name))
                .map(|m| Self::resolve_material(gpu, base_dir, m, &mut cache))
                .unwrap_or_default();

            meshes.push(Mesh::new(gpu, &run.vertices, &run.indices, material));
        }

        log::info!(
            "loaded {} ({} meshes, {} textures)",
            path.display(),
            meshes.len(),
            cache.len()
        );

        Ok(Self { meshes })
    }

    /// Wrap already-built meshes into a model.
    pub fn from_meshes(meshes: Vec<Mesh>) -> Self {
        Self { meshes }
    }

    fn resolve_material(
        gpu: &GpuContext,
        base_dir: &Path,
        material: &ObjMaterial,
        cache: &mut HashMap<String, Rc<Texture>>,
    ) -> MaterialSlots {
        let mut load = |map: &Option<String>| -> Option<Rc<Texture>> {
            let name = map.as_deref()?;
            let full = base_dir.join(name).to_string_lossy().into_owned();
            if let Some(tex) = cache.get(&full) {
                return Some(tex.clone());
            }
            match Texture::from_file(gpu, &full) {
                Ok(tex) => {
                    let tex = Rc::new(tex);
                    cache.insert(full, tex.clone());
                    Some(tex)
                }
                Err(e) => {
                    log::warn!("failed to load texture {}: {}", full, e);
                    None
                }
            }
        };

        MaterialSlots {
            diffuse: load(&material.diffuse_map),
            specular: load(&material.specular_map),
            emissive: load(&material.emissive_map),
        }
    }
}
