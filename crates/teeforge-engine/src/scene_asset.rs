use std::path::Path;

use anyhow::{Context, Result};
use gltf::Gltf;
use teeforge_contracts::scene::SceneNodeData;

const ROOT_NAME: &str = "Scene";

/// Extents are POSITION bounds times accumulated node scale. Rotation is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct GltfScene {
    root: SceneNodeData,
}

impl GltfScene {
    pub fn open(path: &Path) -> Result<Self> {
        let document =
            Gltf::open(path).with_context(|| format!("Failed to load glTF: {:?}", path))?;
        Ok(Self::from_document(&document.document))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let document = Gltf::from_slice(bytes).context("Failed to parse glTF")?;
        Ok(Self::from_document(&document.document))
    }

    fn from_document(document: &gltf::Document) -> Self {
        let roots: Vec<gltf::Node<'_>> = match document
            .default_scene()
            .or_else(|| document.scenes().next())
        {
            Some(scene) => scene.nodes().collect(),
            None => {
                let children: Vec<usize> = document
                    .nodes()
                    .flat_map(|node| node.children().map(|child| child.index()))
                    .collect();
                document
                    .nodes()
                    .filter(|node| !children.contains(&node.index()))
                    .collect()
            }
        };
        let children = roots
            .iter()
            .map(|node| convert_node(node, [1.0; 3]))
            .collect();
        Self {
            root: SceneNodeData::group(ROOT_NAME, children),
        }
    }

    pub fn root(&self) -> &SceneNodeData {
        &self.root
    }

    pub fn into_root(self) -> SceneNodeData {
        self.root
    }

    pub fn nodes(&self) -> Vec<&SceneNodeData> {
        self.root.flatten().into_iter().skip(1).collect()
    }
}

fn convert_node(node: &gltf::Node<'_>, parent_scale: [f32; 3]) -> SceneNodeData {
    let (_, _, scale) = node.transform().decomposed();
    let scale = [
        parent_scale[0] * scale[0].abs(),
        parent_scale[1] * scale[1].abs(),
        parent_scale[2] * scale[2].abs(),
    ];
    let mesh = node.mesh();
    let name = node
        .name()
        .or_else(|| mesh.as_ref().and_then(|mesh| mesh.name()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));
    let children = node
        .children()
        .map(|child| convert_node(&child, scale))
        .collect();

    let size = mesh.as_ref().and_then(mesh_extent).map(|extent| {
        [
            extent[0] * scale[0],
            extent[1] * scale[1],
            extent[2] * scale[2],
        ]
    });
    SceneNodeData {
        name,
        geometry: mesh.is_some(),
        size,
        children,
    }
}

fn mesh_extent(mesh: &gltf::Mesh<'_>) -> Option<[f32; 3]> {
    let mut bounds: Option<([f32; 3], [f32; 3])> = None;
    for primitive in mesh.primitives() {
        let Some(accessor) = primitive.get(&gltf::Semantic::Positions) else {
            continue;
        };
        let (Some(min), Some(max)) = (
            accessor.min().and_then(|value| serde_json::from_value::<[f32; 3]>(value).ok()),
            accessor.max().and_then(|value| serde_json::from_value::<[f32; 3]>(value).ok()),
        ) else {
            continue;
        };
        bounds = Some(match bounds {
            None => (min, max),
            Some((lo, hi)) => (
                [lo[0].min(min[0]), lo[1].min(min[1]), lo[2].min(min[2])],
                [hi[0].max(max[0]), hi[1].max(max[1]), hi[2].max(max[2])],
            ),
        });
    }
    bounds.map(|(min, max)| [max[0] - min[0], max[1] - min[1], max[2] - min[2]])
}

#[cfg(test)]
mod tests {
    use teeforge_contracts::scene::{
        resolve_by_name, resolve_by_size, MeshResolution, DEFAULT_CANDIDATE_NAMES,
        DEFAULT_MIN_SIZE,
    };

    use super::*;

    const SCENE_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "buffers": [
            {"byteLength": 36, "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"}
        ],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
             "min": [-0.5, -0.6, -0.1], "max": [0.5, 0.6, 0.1]}
        ],
        "meshes": [
            {"name": "ShirtMesh", "primitives": [{"attributes": {"POSITION": 0}}]}
        ],
        "nodes": [
            {"name": "Root", "children": [1, 2], "scale": [2.0, 2.0, 2.0]},
            {"name": "Tag", "mesh": 0, "scale": [0.1, 0.1, 0.1]},
            {"mesh": 0}
        ],
        "scenes": [{"nodes": [0]}],
        "scene": 0
    }"#;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn builds_tree_with_scaled_extents() -> Result<()> {
        let scene = GltfScene::from_slice(SCENE_GLTF.as_bytes())?;
        let names: Vec<&str> = scene.nodes().iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "Tag", "ShirtMesh"]);

        let nodes = scene.nodes();
        assert!(!nodes[0].geometry);
        assert!(close(nodes[1].size.unwrap_or_default(), [0.2, 0.24, 0.04]));
        assert!(close(nodes[2].size.unwrap_or_default(), [2.0, 2.4, 0.4]));
        Ok(())
    }

    #[test]
    fn size_search_skips_small_meshes() -> Result<()> {
        let scene = GltfScene::from_slice(SCENE_GLTF.as_bytes())?;
        let resolution = resolve_by_size(scene.root(), DEFAULT_MIN_SIZE);
        assert!(matches!(resolution, MeshResolution::Sized { .. }));
        assert_eq!(resolution.node_name(), Some("ShirtMesh"));

        let nodes = scene.nodes();
        let by_name = resolve_by_name(&nodes, DEFAULT_CANDIDATE_NAMES);
        assert!(matches!(by_name, MeshResolution::FirstGeometry { .. }));
        assert_eq!(by_name.node_name(), Some("Tag"));
        Ok(())
    }

    #[test]
    fn accessor_without_buffer_view_is_rejected() {
        let detached = SCENE_GLTF.replace("\"bufferView\": 0, ", "");
        assert_ne!(detached, SCENE_GLTF);
        assert!(GltfScene::from_slice(detached.as_bytes()).is_err());
    }

    #[test]
    fn open_reads_from_disk_and_reports_bad_files() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("shirt.gltf");
        std::fs::write(&path, SCENE_GLTF)?;
        assert_eq!(GltfScene::open(&path)?.nodes().len(), 3);

        let broken = temp.path().join("broken.gltf");
        std::fs::write(&broken, "{ nope")?;
        let err = GltfScene::open(&broken)
            .err()
            .map(|err| format!("{err:#}"))
            .unwrap_or_default();
        assert!(err.contains("broken.gltf"));
        Ok(())
    }
}
