//! Wavefront OBJ/MTL reader.
//!
//! Streaming parser for the common OBJ constructs (v, vt, vn, f, usemtl,
//! mtllib). Faces are fan-triangulated and split into one sub-mesh per
//! material run, so a file that alternates `usemtl` statements yields meshes
//! in file order with their own texture maps. Negative (relative) indices
//! are supported.
//!
//! The MTL side extracts texture maps only: `map_Kd` (diffuse), `map_Ks`
//! (specular), and `map_Ka`, which this renderer treats as the emissive map.
//! A missing MTL file is not fatal; the affected meshes render with default
//! materials.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::mesh::Vertex3d;

/// Errors that can occur while reading an OBJ file.
#[derive(Debug)]
pub enum ObjError {
    /// The file could not be opened or read.
    Io(std::io::Error),
    /// The file contents violate the format.
    Parse {
        /// 1-based line number of the offending statement.
        line: usize,
        message: String,
    },
}

impl fmt::Display for ObjError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjError::Io(e) => write!(f, "OBJ I/O error: {}", e),
            ObjError::Parse { line, message } => {
                write!(f, "OBJ parse error at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for ObjError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ObjError::Io(e) => Some(e),
            ObjError::Parse { .. } => None,
        }
    }
}

impl From<std::io::Error> for ObjError {
    fn from(e: std::io::Error) -> Self {
        ObjError::Io(e)
    }
}

/// Material definition parsed from an accompanying MTL file.
///
/// Only the texture maps the renderer binds are kept. When a material lists
/// several maps of one kind, the first one wins.
#[derive(Debug, Clone, Default)]
pub struct ObjMaterial {
    pub name: String,
    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
    pub emissive_map: Option<String>,
}

/// One material run of an OBJ file: a flat vertex/index stream plus the name
/// of the material active while its faces were emitted.
#[derive(Debug, Clone, Default)]
pub struct ObjMesh {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
    pub material: Option<String>,
}

/// Result of importing an OBJ file: sub-meshes in file order plus the
/// material table from any referenced MTL libraries.
#[derive(Debug, Clone, Default)]
pub struct ObjModel {
    pub meshes: Vec<ObjMesh>,
    pub materials: HashMap<String, ObjMaterial>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    vi: i32,
    vti: i32,
    vni: i32,
}

fn parse_vertex_triplet(tok: &str) -> VertexKey {
    let mut parts = tok
        .split('/')
        .map(|s| if s.is_empty() { None } else { s.parse::<i32>().ok() });
    let vi = parts.next().flatten().unwrap_or(0);
    let vti = parts.next().flatten().unwrap_or(0);
    let vni = parts.next().flatten().unwrap_or(0);
    VertexKey { vi, vti, vni }
}

/// OBJ indices are 1-based; negative values count back from the end.
fn index_fix(idx: i32, len: usize) -> usize {
    if idx > 0 {
        (idx as usize) - 1
    } else {
        (len as i32 + idx) as usize
    }
}

/// Parse an MTL library from a string.
pub fn parse_mtl_str(src: &str) -> HashMap<String, ObjMaterial> {
    let mut materials: HashMap<String, ObjMaterial> = HashMap::new();
    let mut current: Option<ObjMaterial> = None;

    for line in src.lines() {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let mut it = s.split_whitespace();
        let tag = it.next().unwrap_or("");
        match tag {
            "newmtl" => {
                if let Some(prev) = current.take() {
                    materials.insert(prev.name.clone(), prev);
                }
                let name = it.next().unwrap_or("").to_string();
                current = Some(ObjMaterial {
                    name,
                    ..Default::default()
                });
            }
            "map_Kd" => {
                if let Some(m) = current.as_mut() {
                    if let (Some(tex), None) = (it.next(), m.diffuse_map.as_ref()) {
                        m.diffuse_map = Some(tex.to_string());
                    }
                }
            }
            "map_Ks" => {
                if let Some(m) = current.as_mut() {
                    if let (Some(tex), None) = (it.next(), m.specular_map.as_ref()) {
                        m.specular_map = Some(tex.to_string());
                    }
                }
            }
            "map_Ka" => {
                if let Some(m) = current.as_mut() {
                    if let (Some(tex), None) = (it.next(), m.emissive_map.as_ref()) {
                        m.emissive_map = Some(tex.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(prev) = current.take() {
        materials.insert(prev.name.clone(), prev);
    }

    materials
}

fn parse_mtl_file(path: &Path) -> HashMap<String, ObjMaterial> {
    match std::fs::read_to_string(path) {
        Ok(src) => parse_mtl_str(&src),
        Err(e) => {
            // Missing or unreadable MTL degrades to default materials.
            log::warn!("could not read material library {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}

/// Parse an OBJ file, resolving `mtllib` statements relative to its parent
/// directory.
pub fn parse_obj_file<P: AsRef<Path>>(path: P) -> Result<ObjModel, ObjError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let base_dir = path.parent().map(|p| p.to_path_buf());

    let mut materials = HashMap::new();
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }

    // Material libraries are resolved up front so runs can reference them
    // regardless of where the mtllib statement appears.
    for s in &lines {
        let s = s.trim();
        let mut it = s.split_whitespace();
        if it.next() == Some("mtllib") {
            if let (Some(fname), Some(dir)) = (it.next(), base_dir.as_ref()) {
                materials.extend(parse_mtl_file(&dir.join(fname)));
            }
        }
    }

    let mut model = parse_obj_lines(lines.iter().map(|s| s.as_str()))?;
    model.materials = materials;
    Ok(model)
}

/// Parse OBJ geometry from a string. `mtllib` statements are ignored; attach
/// materials afterwards or use [`parse_obj_file`].
pub fn parse_obj_str(src: &str) -> Result<ObjModel, ObjError> {
    parse_obj_lines(src.lines())
}

fn parse_obj_lines<'a, I: Iterator<Item = &'a str>>(lines: I) -> Result<ObjModel, ObjError> {
    let mut pos: Vec<[f32; 3]> = Vec::new();
    let mut tex: Vec<[f32; 2]> = Vec::new();
    let mut nor: Vec<[f32; 3]> = Vec::new();

    let mut model = ObjModel::default();
    let mut run = ObjMesh::default();
    // Vertex dedup is per run; each sub-mesh indexes its own buffer.
    let mut map: HashMap<VertexKey, u32> = HashMap::new();

    let mut line_no: usize = 0;
    for line in lines {
        line_no += 1;
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let mut it = s.split_whitespace();
        let tag = it.next().unwrap_or("");
        match tag {
            "v" => {
                let x = it.next().and_then(|t| t.parse().ok()).unwrap_or(0.0);
                let y = it.next().and_then(|t| t.parse().ok()).unwrap_or(0.0);
                let z = it.next().and_then(|t| t.parse().ok()).unwrap_or(0.0);
                pos.push([x, y, z]);
            }
            "vt" => {
                let u = it.next().and_then(|t| t.parse().ok()).unwrap_or(0.0);
                let v = it.next().and_then(|t| t.parse().ok()).unwrap_or(0.0);
                tex.push([u, v]);
            }
            "vn" => {
                let x = it.next().and_then(|t| t.parse().ok()).unwrap_or(0.0);
                let y = it.next().and_then(|t| t.parse().ok()).unwrap_or(0.0);
                let z = it.next().and_then(|t| t.parse().ok()).unwrap_or(0.0);
                nor.push([x, y, z]);
            }
            "usemtl" => {
                let name = it.next().map(|n| n.to_string());
                if run.material != name {
                    if !run.indices.is_empty() {
                        model.meshes.push(std::mem::take(&mut run));
                        map.clear();
                    }
                    run.material = name;
                }
            }
            "f" => {
                let verts: Vec<VertexKey> = it.map(parse_vertex_triplet).collect();
                if verts.len() < 3 {
                    return Err(ObjError::Parse {
                        line: line_no,
                        message: "face has fewer than 3 vertices".into(),
                    });
                }
                if verts.iter().any(|vk| vk.vi == 0) {
                    return Err(ObjError::Parse {
                        line: line_no,
                        message: "face vertex missing position index".into(),
                    });
                }

                // Triangulate with a fan
                for t in 1..(verts.len() - 1) {
                    let tri = [verts[0], verts[t], verts[t + 1]];
                    for vk in tri.iter() {
                        let idx = if let Some(&i) = map.get(vk) {
                            i
                        } else {
                            let vi = index_fix(vk.vi, pos.len());
                            if vi >= pos.len() {
                                return Err(ObjError::Parse {
                                    line: line_no,
                                    message: format!(
                                        "position index {} out of bounds (1..={})",
                                        vk.vi,
                                        pos.len()
                                    ),
                                });
                            }

                            let mut uv = [0.0, 0.0];
                            if vk.vti != 0 {
                                let vti = index_fix(vk.vti, tex.len());
                                if vti >= tex.len() {
                                    return Err(ObjError::Parse {
                                        line: line_no,
                                        message: format!(
                                            "texcoord index {} out of bounds (1..={})",
                                            vk.vti,
                                            tex.len()
                                        ),
                                    });
                                }
                                uv = tex[vti];
                            }

                            let mut normal = [0.0, 0.0, 1.0];
                            if vk.vni != 0 {
                                let vni = index_fix(vk.vni, nor.len());
                                if vni >= nor.len() {
                                    return Err(ObjError::Parse {
                                        line: line_no,
                                        message: format!(
                                            "normal index {} out of bounds (1..={})",
                                            vk.vni,
                                            nor.len()
                                        ),
                                    });
                                }
                                normal = nor[vni];
                            }

                            let new_index = run.vertices.len() as u32;
                            run.vertices.push(Vertex3d::new(pos[vi], normal, uv));
                            map.insert(*vk, new_index);
                            new_index
                        };
                        run.indices.push(idx);
                    }
                }
            }
            _ => {}
        }
    }

    if !run.indices.is_empty() {
        model.meshes.push(run);
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn quad_fan_triangulates_and_dedups() {
        let model = parse_obj_str(QUAD).unwrap();
        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.indices.len(), 6);
        // Fan shares vertices 0 and 2 between the two triangles.
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let src = "\
v 0 0 0
v 1 0 0
v 1 1 0
f -3 -2 -1
";
        let model = parse_obj_str(src).unwrap();
        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[2].position, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn usemtl_splits_material_runs_in_file_order() {
        let src = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
usemtl wings
f 1 2 3
usemtl body
f 1 3 4
";
        let model = parse_obj_str(src).unwrap();
        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.meshes[0].material.as_deref(), Some("wings"));
        assert_eq!(model.meshes[1].material.as_deref(), Some("body"));
    }

    #[test]
    fn repeated_usemtl_of_same_material_does_not_split() {
        let src = "\
v 0 0 0
v 1 0 0
v 1 1 0
usemtl skin
f 1 2 3
usemtl skin
f 1 2 3
";
        let model = parse_obj_str(src).unwrap();
        assert_eq!(model.meshes.len(), 1);
    }

    #[test]
    fn degenerate_face_is_an_error() {
        let src = "v 0 0 0\nv 1 0 0\nf 1 2\n";
        let err = parse_obj_str(src).unwrap_err();
        match err {
            ObjError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn out_of_bounds_index_is_an_error() {
        let src = "v 0 0 0\nf 1 2 3\n";
        assert!(parse_obj_str(src).is_err());
    }

    #[test]
    fn missing_texcoords_default_to_zero() {
        let src = "\
v 0 0 0
v 1 0 0
v 1 1 0
vn 0 1 0
f 1//1 2//1 3//1
";
        let model = parse_obj_str(src).unwrap();
        let v = &model.meshes[0].vertices[0];
        assert_eq!(v.uv, [0.0, 0.0]);
        assert_eq!(v.normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn mtl_maps_land_in_their_slots() {
        let src = "\
newmtl lantern
map_Kd lantern_diffuse.png
map_Ks lantern_specular.png
map_Ka lantern_glow.png

newmtl plain
map_Kd plain.png
";
        let materials = parse_mtl_str(src);
        let lantern = &materials["lantern"];
        assert_eq!(lantern.diffuse_map.as_deref(), Some("lantern_diffuse.png"));
        assert_eq!(lantern.specular_map.as_deref(), Some("lantern_specular.png"));
        assert_eq!(lantern.emissive_map.as_deref(), Some("lantern_glow.png"));
        let plain = &materials["plain"];
        assert!(plain.specular_map.is_none());
        assert!(plain.emissive_map.is_none());
    }

    #[test]
    fn first_map_of_a_kind_wins() {
        let src = "\
newmtl doubled
map_Kd first.png
map_Kd second.png
";
        let materials = parse_mtl_str(src);
        assert_eq!(materials["doubled"].diffuse_map.as_deref(), Some("first.png"));
    }
}
