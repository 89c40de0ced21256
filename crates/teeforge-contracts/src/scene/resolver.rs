use super::SceneNode;

pub const DEFAULT_CANDIDATE_NAMES: &[&str] = &[
    "T_Shirt",
    "t_shirt",
    "shirt",
    "Shirt",
    "TShirt",
    "tshirt",
    "Body",
    "body",
    "Mesh",
    "mesh",
    "Object",
    "object",
    "t_shirt_site",
];

pub const DEFAULT_MIN_SIZE: [f32; 3] = [0.5, 0.5, 0.1];

#[derive(Debug, PartialEq)]
pub enum MeshResolution<'a, N> {
    Named { node: &'a N, candidate: String },
    FirstGeometry { node: &'a N },
    Sized { node: &'a N, size: [f32; 3] },
    NotFound,
}

impl<'a, N: SceneNode> MeshResolution<'a, N> {
    pub fn node(&self) -> Option<&'a N> {
        match self {
            Self::Named { node, .. } | Self::FirstGeometry { node } | Self::Sized { node, .. } => {
                Some(*node)
            }
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    pub fn node_name(&self) -> Option<&'a str> {
        self.node().map(SceneNode::name)
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Named { .. } => "name",
            Self::FirstGeometry { .. } => "first_geometry",
            Self::Sized { .. } => "size",
            Self::NotFound => "not_found",
        }
    }
}

pub fn resolve_by_name<'a, N, S>(nodes: &[&'a N], candidates: &[S]) -> MeshResolution<'a, N>
where
    N: SceneNode,
    S: AsRef<str>,
{
    for candidate in candidates {
        let candidate = candidate.as_ref();
        if let Some(node) = nodes
            .iter()
            .copied()
            .find(|node| node.name() == candidate && node.has_geometry())
        {
            tracing::debug!(mesh = candidate, "found garment mesh by name");
            return MeshResolution::Named {
                node,
                candidate: candidate.to_string(),
            };
        }
    }

    match nodes.iter().copied().find(|node| node.has_geometry()) {
        Some(node) => {
            tracing::debug!(mesh = node.name(), "using first mesh with geometry");
            MeshResolution::FirstGeometry { node }
        }
        None => {
            tracing::warn!("no mesh with geometry in scene");
            MeshResolution::NotFound
        }
    }
}

/// Depth-first. Every axis of the extent must exceed `min_size`.
pub fn resolve_by_size<N: SceneNode>(root: &N, min_size: [f32; 3]) -> MeshResolution<'_, N> {
    match find_sized(root, min_size) {
        Some((node, size)) => {
            tracing::debug!(mesh = node.name(), ?size, "found garment mesh by size");
            MeshResolution::Sized { node, size }
        }
        None => {
            tracing::warn!(?min_size, "no mesh large enough to carry a texture");
            MeshResolution::NotFound
        }
    }
}

fn find_sized<N: SceneNode>(node: &N, min_size: [f32; 3]) -> Option<(&N, [f32; 3])> {
    if node.has_geometry() {
        if let Some(size) = node.size() {
            if size.iter().zip(min_size.iter()).all(|(have, min)| have > min) {
                return Some((node, size));
            }
        }
    }
    node.children()
        .iter()
        .find_map(|child| find_sized(child, min_size))
}
