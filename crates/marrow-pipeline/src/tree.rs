//! Scene flattening
//!
//! One depth-first sweep over the provider graph produces a flat node
//! list that every later pass indexes into. Only mesh, joint and
//! transform nodes are retained (an explicit filter, not an omission);
//! other nodes are traversed through so their descendants still appear.
//! All pass state lives on the tree itself; nothing is process-wide.

use std::collections::HashMap;

use marrow_core::Result;
use tracing::debug;

use crate::provider::{Capability, NodeId, SceneProvider};

/// One retained scene node with its per-pass working flags
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: NodeId,
    pub name: String,
    pub capability: Capability,
    /// Nearest retained ancestor, by tree index
    pub parent_index: Option<usize>,
    /// Count of retained nodes whose parent_index points here
    pub num_children: usize,
    pub selected: bool,

    // skeleton pass
    pub is_bone: bool,
    pub in_skeleton: bool,
    pub no_export: bool,
    pub ignore_subtree: bool,
    /// Renumbered bone index once digested
    pub bone_index: Option<usize>,

    // skin pass
    pub is_skin: bool,
    pub is_smooth_skinned: bool,
}

/// Flat scene snapshot for one export pass
#[derive(Debug, Clone)]
pub struct SceneTree {
    pub nodes: Vec<NodeInfo>,
    index_by_id: HashMap<NodeId, usize>,
    /// Reference time for non-animated sampling, in frames
    pub static_time: f64,
}

impl SceneTree {
    /// Flatten the provider graph
    pub fn build(provider: &dyn SceneProvider) -> Result<Self> {
        let mut tree = Self {
            nodes: Vec::new(),
            index_by_id: HashMap::new(),
            static_time: provider.frame_range().0.max(0.0),
        };

        // Iterative DFS; children pushed in reverse so they pop in order.
        let mut stack: Vec<(NodeId, Option<usize>)> = Vec::new();
        for root in provider.roots().into_iter().rev() {
            stack.push((root, None));
        }

        while let Some((id, retained_ancestor)) = stack.pop() {
            let capability = provider.capability(id);
            let retained = !matches!(capability, Capability::Other);

            let my_index = if retained {
                let index = tree.nodes.len();
                tree.nodes.push(NodeInfo {
                    id,
                    name: provider.name(id),
                    capability,
                    parent_index: retained_ancestor,
                    num_children: 0,
                    selected: provider.is_selected(id),
                    is_bone: capability == Capability::Joint,
                    in_skeleton: false,
                    no_export: false,
                    ignore_subtree: false,
                    bone_index: None,
                    is_skin: capability == Capability::Mesh,
                    is_smooth_skinned: false,
                });
                tree.index_by_id.insert(id, index);
                Some(index)
            } else {
                retained_ancestor
            };

            for child in provider.children(id).into_iter().rev() {
                stack.push((child, my_index));
            }
        }

        for i in 0..tree.nodes.len() {
            if let Some(parent) = tree.nodes[i].parent_index {
                tree.nodes[parent].num_children += 1;
            }
        }

        debug!(
            nodes = tree.nodes.len(),
            static_time = tree.static_time,
            "Flattened scene"
        );
        Ok(tree)
    }

    /// Tree index of a provider node, when retained
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.index_by_id.get(&id).copied()
    }

    /// First retained node with this display name
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Retained children of a node, in traversal order
    pub fn children(&self, index: usize) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent_index == Some(index))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubScene;

    #[test]
    fn test_other_nodes_skipped_but_traversed() {
        let mut scene = StubScene::new();
        let root = scene.add_node("root", Capability::Transform, None);
        let camera = scene.add_node("camera", Capability::Other, Some(root));
        let _shape = scene.add_node("shape", Capability::Mesh, Some(camera));

        let tree = SceneTree::build(&scene).unwrap();
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.nodes[0].name, "root");
        // the mesh under the skipped camera reparents to the nearest
        // retained ancestor
        assert_eq!(tree.nodes[1].name, "shape");
        assert_eq!(tree.nodes[1].parent_index, Some(0));
    }

    #[test]
    fn test_traversal_order_and_child_counts() {
        let mut scene = StubScene::new();
        let root = scene.add_node("root", Capability::Transform, None);
        let a = scene.add_node("a", Capability::Joint, Some(root));
        let _b = scene.add_node("b", Capability::Joint, Some(a));
        let _c = scene.add_node("c", Capability::Joint, Some(root));

        let tree = SceneTree::build(&scene).unwrap();
        let names: Vec<_> = tree.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["root", "a", "b", "c"]);
        assert_eq!(tree.nodes[0].num_children, 2);
        assert_eq!(tree.nodes[1].num_children, 1);
    }

    #[test]
    fn test_empty_scene_yields_empty_tree() {
        let scene = StubScene::new();
        let tree = SceneTree::build(&scene).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_static_time_clamped_to_zero() {
        let mut scene = StubScene::new();
        scene.set_frame_range(-10.0, 40.0);
        let tree = SceneTree::build(&scene).unwrap();
        assert_eq!(tree.static_time, 0.0);
    }
}
