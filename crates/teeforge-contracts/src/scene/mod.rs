mod placement;
mod resolver;

use serde::{Deserialize, Serialize};

pub use placement::{plan_texture, TexturePlan, TextureStrategy};
pub use resolver::{
    resolve_by_name, resolve_by_size, MeshResolution, DEFAULT_CANDIDATE_NAMES, DEFAULT_MIN_SIZE,
};

pub trait SceneNode {
    fn name(&self) -> &str;

    fn has_geometry(&self) -> bool;

    fn size(&self) -> Option<[f32; 3]>;

    fn children(&self) -> &[Self]
    where
        Self: Sized;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneNodeData {
    pub name: String,
    #[serde(default)]
    pub geometry: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneNodeData>,
}

impl SceneNodeData {
    pub fn group(name: impl Into<String>, children: Vec<SceneNodeData>) -> Self {
        Self {
            name: name.into(),
            geometry: false,
            size: None,
            children,
        }
    }

    pub fn mesh(name: impl Into<String>, size: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            geometry: true,
            size: Some(size),
            children: Vec::new(),
        }
    }

    pub fn flatten(&self) -> Vec<&SceneNodeData> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

impl SceneNode for SceneNodeData {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_geometry(&self) -> bool {
        self.geometry
    }

    fn size(&self) -> Option<[f32; 3]> {
        self.size
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_is_pre_order() {
        let root = SceneNodeData::group(
            "root",
            vec![
                SceneNodeData::group("a", vec![SceneNodeData::mesh("a1", [1.0; 3])]),
                SceneNodeData::mesh("b", [1.0; 3]),
            ],
        );
        let names: Vec<&str> = root.flatten().iter().map(|node| node.name()).collect();
        assert_eq!(names, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn deserializes_minimal_json_scene() -> anyhow::Result<()> {
        let node: SceneNodeData = serde_json::from_str(
            r#"{"name":"Scene","children":[{"name":"shirt","geometry":true,"size":[1,1.2,0.3]}]}"#,
        )?;
        assert!(!node.has_geometry());
        assert_eq!(node.children[0].size(), Some([1.0, 1.2, 0.3]));
        Ok(())
    }
}
