use serde::Serialize;

use super::{MeshResolution, SceneNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureStrategy {
    OverlayPlane,
    MaterialSwap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TexturePlan {
    OverlayPlane {
        mesh: String,
        width: f32,
        height: f32,
        offset: [f32; 3],
    },
    MaterialSwap {
        mesh: String,
        scale: f32,
        offset: [f32; 3],
    },
    Placeholder { color: &'static str, size: f32 },
}

pub fn plan_texture<N: SceneNode>(
    resolution: &MeshResolution<'_, N>,
    strategy: TextureStrategy,
) -> TexturePlan {
    let Some(mesh) = resolution.node_name() else {
        return TexturePlan::Placeholder {
            color: "red",
            size: 1.0,
        };
    };
    let mesh = mesh.to_string();
    // Size-resolved scenes are authored at a larger scale than named assets.
    let sized = matches!(resolution, MeshResolution::Sized { .. });
    match strategy {
        TextureStrategy::OverlayPlane if sized => TexturePlan::OverlayPlane {
            mesh,
            width: 0.8,
            height: 0.8,
            offset: [0.0, 0.0, 0.05],
        },
        TextureStrategy::OverlayPlane => TexturePlan::OverlayPlane {
            mesh,
            width: 0.6,
            height: 0.6,
            offset: [0.0, 0.0, 0.02],
        },
        TextureStrategy::MaterialSwap => TexturePlan::MaterialSwap {
            mesh,
            scale: 1.02,
            offset: [0.0, 0.0, 0.02],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{resolve_by_name, resolve_by_size, SceneNodeData, DEFAULT_MIN_SIZE};

    #[test]
    fn not_found_plans_red_placeholder() {
        let resolution = resolve_by_name::<SceneNodeData, &str>(&[], &[]);
        assert_eq!(
            plan_texture(&resolution, TextureStrategy::OverlayPlane),
            TexturePlan::Placeholder {
                color: "red",
                size: 1.0
            }
        );
    }

    #[test]
    fn named_mesh_gets_small_overlay_plane() {
        let shirt = SceneNodeData::mesh("shirt", [1.0; 3]);
        let resolution = resolve_by_name(&[&shirt], &["shirt"]);
        match plan_texture(&resolution, TextureStrategy::OverlayPlane) {
            TexturePlan::OverlayPlane {
                mesh,
                width,
                offset,
                ..
            } => {
                assert_eq!(mesh, "shirt");
                assert_eq!(width, 0.6);
                assert_eq!(offset[2], 0.02);
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn sized_mesh_gets_scaled_plane_or_material_swap() {
        let root = SceneNodeData::mesh("Mesh_9", [1.0, 1.0, 0.5]);
        let resolution = resolve_by_size(&root, DEFAULT_MIN_SIZE);
        assert!(matches!(
            plan_texture(&resolution, TextureStrategy::OverlayPlane),
            TexturePlan::OverlayPlane { width, .. } if width == 0.8
        ));
        assert!(matches!(
            plan_texture(&resolution, TextureStrategy::MaterialSwap),
            TexturePlan::MaterialSwap { ref mesh, .. } if mesh == "Mesh_9"
        ));
    }
}
