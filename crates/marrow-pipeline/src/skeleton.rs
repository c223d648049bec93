//! Skeleton evaluation and digesting
//!
//! Evaluation decides which tree nodes belong to the exported skeleton;
//! digesting renumbers the survivors into a contiguous bone list. Bone 0
//! is the root, sampled in world space with its parent index pointing at
//! itself; every other bone samples parent-local and points at an
//! earlier bone, so consumers can compose parent-to-child in one sweep.

use marrow_core::{Error, ExportConfig, Result, Vec3};
use marrow_format::{JointPos, RefBone};
use tracing::{debug, warn};

use crate::provider::SceneProvider;
use crate::tree::SceneTree;

/// Renumbered bone list plus its mapping back into the tree
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub bones: Vec<RefBone>,
    /// Tree index of each bone, parallel to `bones`
    pub bone_tree_index: Vec<usize>,
}

impl Skeleton {
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Bone index by name
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }
}

/// Runs the two skeleton passes over a flattened tree
pub struct SkeletonBuilder<'a> {
    config: &'a ExportConfig,
}

impl<'a> SkeletonBuilder<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Decide skeleton membership; returns the root's tree index
    pub fn evaluate(&self, tree: &mut SceneTree, provider: &dyn SceneProvider) -> Result<usize> {
        let root = match self.config.root_hint.as_deref() {
            Some(hint) => tree.find_by_name(hint).ok_or_else(|| {
                Error::structural(format!("root hint '{hint}' matches no retained node"))
            })?,
            None => tree
                .nodes
                .iter()
                .position(|n| n.is_bone)
                .ok_or_else(|| Error::structural("scene contains no joints"))?,
        };

        if self.config.root_hint.is_some() {
            // Hinted: membership through the provider's dependency relation.
            let root_id = tree.nodes[root].id;
            for node in tree.nodes.iter_mut() {
                node.in_skeleton =
                    node.id == root_id || (node.is_bone && provider.depends_on(node.id, root_id));
            }
            // A hinted root joins even when it is not a joint itself.
            tree.nodes[root].is_bone = true;
        } else {
            // Unhinted: flood the root's subtree, joints only.
            flood_bones(tree, root);
        }

        if !tree.nodes.iter().any(|n| n.in_skeleton) {
            return Err(Error::structural("skeleton membership came up empty"));
        }

        // Name-tag overrides, applied after membership.
        for node in tree.nodes.iter_mut() {
            if node.in_skeleton {
                let lower = node.name.to_lowercase();
                if lower.contains("noexport") {
                    node.is_bone = false;
                    node.no_export = true;
                }
                if lower.contains("ignore") {
                    node.is_bone = false;
                    node.ignore_subtree = true;
                }
            } else {
                node.no_export = true;
            }
        }

        // Parents precede children in traversal order, so one forward
        // pass propagates the subtree flag all the way down.
        for i in 0..tree.nodes.len() {
            if let Some(parent) = tree.nodes[i].parent_index {
                if tree.nodes[parent].ignore_subtree {
                    tree.nodes[i].is_bone = false;
                    tree.nodes[i].ignore_subtree = true;
                }
            }
        }

        debug!(
            root = %tree.nodes[root].name,
            members = tree.nodes.iter().filter(|n| n.in_skeleton && n.is_bone).count(),
            "Evaluated skeleton"
        );
        Ok(root)
    }

    /// Renumber surviving members into the contiguous bone list
    pub fn digest(
        &self,
        tree: &mut SceneTree,
        provider: &dyn SceneProvider,
    ) -> Result<Skeleton> {
        provider.set_time(tree.static_time);

        let mut bones: Vec<RefBone> = Vec::new();
        let mut bone_tree_index: Vec<usize> = Vec::new();

        for i in 0..tree.nodes.len() {
            if !(tree.nodes[i].in_skeleton && tree.nodes[i].is_bone) {
                continue;
            }

            let bone_index = bones.len();
            tree.nodes[i].bone_index = Some(bone_index);

            let parent_bone = nearest_renumbered_ancestor(tree, i).unwrap_or(0);

            let id = tree.nodes[i].id;
            let transform = if bone_index == 0 {
                provider.world_transform(id)?
            } else {
                provider.local_transform(id)?
            };

            // Skeleton scale lives on the parent in the source
            // convention; bake it into the child translation here.
            let parent_scale = match tree.nodes[i].parent_index {
                Some(p) if bone_index > 0 => {
                    provider.world_scale(tree.nodes[p].id).unwrap_or_else(|e| {
                        warn!(bone = %tree.nodes[i].name, error = %e, "Parent scale query failed");
                        Vec3::ONE
                    })
                }
                _ => Vec3::ONE,
            };

            let position = transform
                .position
                .mul_components(parent_scale)
                .scaled(self.config.point_scale);

            bones.push(RefBone {
                name: bone_name(&tree.nodes[i].name),
                flags: 0,
                num_children: 0,
                parent_index: parent_bone as i32,
                joint: JointPos {
                    orientation: transform.orientation,
                    position,
                    ..JointPos::default()
                },
            });
            bone_tree_index.push(i);
        }

        if bones.is_empty() {
            return Err(Error::structural("no bones survived skeleton evaluation"));
        }

        for i in 1..bones.len() {
            let parent = bones[i].parent_index as usize;
            bones[parent].num_children += 1;
        }

        debug!(bones = bones.len(), "Digested skeleton");
        Ok(Skeleton { bones, bone_tree_index })
    }
}

/// Recursive subtree flood restricted to joint nodes
fn flood_bones(tree: &mut SceneTree, index: usize) {
    if !tree.nodes[index].is_bone || tree.nodes[index].in_skeleton {
        return;
    }
    tree.nodes[index].in_skeleton = true;
    for child in tree.children(index) {
        flood_bones(tree, child);
    }
}

/// Nearest ancestor that already has a bone index
fn nearest_renumbered_ancestor(tree: &SceneTree, index: usize) -> Option<usize> {
    let mut cursor = tree.nodes[index].parent_index;
    while let Some(i) = cursor {
        if let Some(bone) = tree.nodes[i].bone_index {
            return Some(bone);
        }
        cursor = tree.nodes[i].parent_index;
    }
    None
}

/// Fixed-field bone name: spaces become underscores
fn bone_name(name: &str) -> String {
    name.replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Capability;
    use crate::stub::StubScene;
    use crate::tree::SceneTree;

    fn joint_chain(names: &[&str]) -> StubScene {
        let mut scene = StubScene::new();
        let mut parent = None;
        for name in names {
            parent = Some(scene.add_node(*name, Capability::Joint, parent));
        }
        scene
    }

    fn build(scene: &StubScene, config: &ExportConfig) -> (SceneTree, Skeleton) {
        let mut tree = SceneTree::build(scene).unwrap();
        let builder = SkeletonBuilder::new(config);
        builder.evaluate(&mut tree, scene).unwrap();
        let skeleton = builder.digest(&mut tree, scene).unwrap();
        (tree, skeleton)
    }

    #[test]
    fn test_root_parent_is_self_and_parents_precede() {
        let scene = joint_chain(&["root", "spine", "head"]);
        let (_, skeleton) = build(&scene, &ExportConfig::default());

        assert_eq!(skeleton.bones.len(), 3);
        assert_eq!(skeleton.bones[0].parent_index, 0);
        for (i, bone) in skeleton.bones.iter().enumerate().skip(1) {
            assert!((bone.parent_index as usize) < i);
        }
        assert_eq!(skeleton.bones[0].num_children, 1);
    }

    #[test]
    fn test_no_joints_is_structural_error() {
        let mut scene = StubScene::new();
        scene.add_node("group", Capability::Transform, None);

        let mut tree = SceneTree::build(&scene).unwrap();
        let config = ExportConfig::default();
        let err = SkeletonBuilder::new(&config).evaluate(&mut tree, &scene).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_noexport_tag_drops_bone_keeps_children() {
        let scene = joint_chain(&["root", "helper_noexport", "hand"]);
        let (_, skeleton) = build(&scene, &ExportConfig::default());

        assert_eq!(skeleton.bones.len(), 2);
        assert_eq!(skeleton.bones[1].name, "hand");
        // the dropped middle bone reparents the hand to the root
        assert_eq!(skeleton.bones[1].parent_index, 0);
    }

    #[test]
    fn test_ignore_tag_drops_whole_subtree() {
        let mut scene = StubScene::new();
        let root = scene.add_node("root", Capability::Joint, None);
        let ignored = scene.add_node("rig_ignore", Capability::Joint, Some(root));
        let _child = scene.add_node("twist", Capability::Joint, Some(ignored));
        let _kept = scene.add_node("spine", Capability::Joint, Some(root));

        let (tree, skeleton) = build(&scene, &ExportConfig::default());
        assert_eq!(skeleton.bones.len(), 2);
        assert_eq!(skeleton.bones[1].name, "spine");
        // every node under the tagged joint lost bone status
        assert!(tree.nodes.iter().filter(|n| n.ignore_subtree).count() >= 2);
    }

    #[test]
    fn test_hinted_root_uses_dependency_relation() {
        let mut scene = StubScene::new();
        let _stray = scene.add_node("stray", Capability::Joint, None);
        let root = scene.add_node("pelvis", Capability::Joint, None);
        let _leg = scene.add_node("leg", Capability::Joint, Some(root));

        let config = ExportConfig {
            root_hint: Some("pelvis".into()),
            ..ExportConfig::default()
        };
        let (_, skeleton) = build(&scene, &config);

        assert_eq!(skeleton.bones[0].name, "pelvis");
        assert_eq!(skeleton.bones.len(), 2);
        assert!(skeleton.find_bone("stray").is_none());
    }

    #[test]
    fn test_unhinted_picks_first_joint_in_traversal_order() {
        let mut scene = StubScene::new();
        let group = scene.add_node("group", Capability::Transform, None);
        let first = scene.add_node("first", Capability::Joint, Some(group));
        let _child = scene.add_node("child", Capability::Joint, Some(first));
        let _second = scene.add_node("second", Capability::Joint, None);

        let (_, skeleton) = build(&scene, &ExportConfig::default());
        assert_eq!(skeleton.bones[0].name, "first");
        // disconnected second skeleton is not flooded
        assert!(skeleton.find_bone("second").is_none());
    }

    #[test]
    fn test_parent_scale_bakes_into_child_translation() {
        let mut scene = StubScene::new();
        let root = scene.add_node("root", Capability::Joint, None);
        let child = scene.add_node("child", Capability::Joint, Some(root));
        scene.node_mut(root).world_scale = Vec3::new(2.0, 2.0, 2.0);
        scene.node_mut(child).local.position = Vec3::new(1.0, 0.0, 0.0);

        let (_, skeleton) = build(&scene, &ExportConfig::default());
        assert_eq!(skeleton.bones[1].joint.position, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_point_scale_applies_to_bones() {
        let mut scene = StubScene::new();
        let root = scene.add_node("root", Capability::Joint, None);
        scene.node_mut(root).world.position = Vec3::new(1.0, 1.0, 1.0);

        let config = ExportConfig { point_scale: 10.0, ..ExportConfig::default() };
        let (_, skeleton) = build(&scene, &config);
        assert_eq!(skeleton.bones[0].joint.position, Vec3::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn test_bone_names_replace_spaces() {
        let scene = joint_chain(&["left arm upper"]);
        let (_, skeleton) = build(&scene, &ExportConfig::default());
        assert_eq!(skeleton.bones[0].name, "left_arm_upper");
    }
}
