//! Minimal Wavefront OBJ reader satisfying the `MeshSource` collaborator
//! contract: `v` position lines and `f` face lines only, fan-triangulated.
//! No normals, UVs, materials, or multi-object semantics.

use std::path::Path;

use glam::Vec3;
use vmesh_core::{Error, MeshSource, Result};

pub struct ObjMesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
}

impl MeshSource for ObjMesh {
    fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    fn indices(&self) -> &[u32] {
        &self.indices
    }
}

impl ObjMesh {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::IoOpen {
            path: path.display().to_string(),
            source,
        })?;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for line in text.lines() {
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("v") => vertices.push(parse_vertex(line, tokens)?),
                Some("f") => append_face(line, tokens, vertices.len(), &mut indices)?,
                _ => {}
            }
        }

        if vertices.is_empty() {
            return Err(Error::InputParse(format!("{}: no vertices found", path.display())));
        }

        Ok(Self { vertices, indices })
    }
}

fn parse_vertex<'a>(line: &str, tokens: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let coords: Vec<f32> = tokens
        .take(3)
        .map(|t| t.parse::<f32>().map_err(|_| Error::InputParse(format!("bad vertex line: {line}"))))
        .collect::<Result<_>>()?;
    if coords.len() != 3 {
        return Err(Error::InputParse(format!("bad vertex line: {line}")));
    }
    Ok(Vec3::new(coords[0], coords[1], coords[2]))
}

fn append_face<'a>(
    line: &str,
    tokens: impl Iterator<Item = &'a str>,
    vertex_count: usize,
    indices: &mut Vec<u32>,
) -> Result<()> {
    let face: Vec<u32> = tokens
        .map(|t| parse_face_index(t, vertex_count))
        .collect::<Result<_>>()?;
    if face.len() < 3 {
        return Err(Error::InputParse(format!("face with fewer than 3 vertices: {line}")));
    }
    for i in 1..face.len() - 1 {
        indices.push(face[0]);
        indices.push(face[i]);
        indices.push(face[i + 1]);
    }
    Ok(())
}

/// OBJ face indices are 1-based, or negative to count back from the current
/// end of the vertex list (`-1` is the most recently declared vertex).
fn parse_face_index(token: &str, vertex_count: usize) -> Result<u32> {
    let v_str = token.split('/').next().unwrap_or(token);
    let v: i64 = v_str.parse().map_err(|_| Error::InputParse(format!("bad face index '{token}'")))?;
    let idx = if v > 0 { v - 1 } else { vertex_count as i64 + v };
    if idx < 0 || idx as usize >= vertex_count {
        return Err(Error::InputParse(format!("face index {v} out of range")));
    }
    Ok(idx as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> tempfile_path::TempObj {
        tempfile_path::TempObj::new(contents)
    }

    mod tempfile_path {
        use std::io::Write;
        use std::path::PathBuf;

        pub struct TempObj(pub PathBuf);

        impl TempObj {
            pub fn new(contents: &str) -> Self {
                let mut path = std::env::temp_dir();
                path.push(format!("vmesh-test-{}-{}.obj", std::process::id(), contents.len()));
                let mut f = std::fs::File::create(&path).unwrap();
                f.write_all(contents.as_bytes()).unwrap();
                Self(path)
            }
        }

        impl Drop for TempObj {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }
    }

    #[test]
    fn loads_triangle() {
        let obj = write_temp("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        let mesh = ObjMesh::load(&obj.0).unwrap();
        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.indices(), &[0, 1, 2]);
    }

    #[test]
    fn fan_triangulates_quad() {
        let obj = write_temp("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");
        let mesh = ObjMesh::load(&obj.0).unwrap();
        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn ignores_texture_and_normal_indices() {
        let obj = write_temp("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1/1 2/2/1 3/3/1\n");
        let mesh = ObjMesh::load(&obj.0).unwrap();
        assert_eq!(mesh.indices(), &[0, 1, 2]);
    }

    #[test]
    fn negative_face_indices_count_from_end() {
        let obj = write_temp("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n");
        let mesh = ObjMesh::load(&obj.0).unwrap();
        assert_eq!(mesh.indices(), &[0, 1, 2]);
    }

    #[test]
    fn ignores_unknown_lines() {
        let obj = write_temp("# comment\nmtllib foo.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf 1 2 3\n");
        let mesh = ObjMesh::load(&obj.0).unwrap();
        assert_eq!(mesh.vertices().len(), 3);
    }

    #[test]
    fn empty_mesh_is_input_parse_error() {
        let obj = write_temp("# nothing here\n");
        assert!(matches!(ObjMesh::load(&obj.0), Err(Error::InputParse(_))));
    }
}
