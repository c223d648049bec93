//! Skin assembly: merge per-mesh digests into one index space
//!
//! Each included mesh is digested in isolation and then appended to the
//! aggregate with running point/wedge bases added to every index, so N
//! independent index spaces become a single one.

use marrow_core::{Error, ExportConfig, Result};
use tracing::{debug, info};

use crate::mesh::{LocalSkin, MaterialRegistry, MeshDigester};
use crate::provider::SceneProvider;
use crate::skeleton::Skeleton;
use crate::tree::SceneTree;

/// Merges digested meshes into one aggregate skin
pub struct SkinAssembler<'a> {
    config: &'a ExportConfig,
}

impl<'a> SkinAssembler<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Digest every included mesh and merge the results
    ///
    /// A mesh is included when it is selected, or when its retained
    /// parent is; selection propagates exactly one level down.
    pub fn assemble(
        &self,
        provider: &dyn SceneProvider,
        tree: &mut SceneTree,
        skeleton: &Skeleton,
    ) -> Result<(LocalSkin, MaterialRegistry)> {
        provider.set_time(tree.static_time);

        let digester = MeshDigester::new(self.config);
        let mut registry = MaterialRegistry::new();
        let mut aggregate = LocalSkin::default();
        let mut meshes = 0usize;

        for i in 0..tree.nodes.len() {
            if !tree.nodes[i].is_skin {
                continue;
            }
            let selected = tree.nodes[i].selected
                || tree.nodes[i]
                    .parent_index
                    .is_some_and(|p| tree.nodes[p].selected);
            if !selected {
                continue;
            }

            let smooth = provider.skin_binding(tree.nodes[i].id)?.is_some();
            tree.nodes[i].is_smooth_skinned = smooth;

            let local = digester.digest(provider, tree, i, skeleton, smooth, &mut registry)?;
            merge(&mut aggregate, local)?;
            meshes += 1;
        }

        if meshes == 0 {
            return Err(Error::structural("no meshes selected for export"));
        }

        info!(
            meshes,
            points = aggregate.points.len(),
            wedges = aggregate.wedges.len(),
            faces = aggregate.faces.len(),
            materials = registry.shaders().len(),
            "Assembled skin"
        );
        Ok((aggregate, registry))
    }
}

/// Append `local` to `aggregate`, offsetting every index by the
/// pre-append totals
fn merge(aggregate: &mut LocalSkin, local: LocalSkin) -> Result<()> {
    let point_base = aggregate.points.len();
    let wedge_base = aggregate.wedges.len();

    if point_base + local.points.len() > u16::MAX as usize
        || wedge_base + local.wedges.len() > u16::MAX as usize
    {
        return Err(Error::structural(
            "merged skin exceeds the 16-bit point/wedge index limit",
        ));
    }

    aggregate.points.extend(local.points);

    for mut wedge in local.wedges {
        wedge.point_index += point_base as u16;
        aggregate.wedges.push(wedge);
    }
    for mut face in local.faces {
        for w in &mut face.wedge_index {
            *w += wedge_base as u16;
        }
        aggregate.faces.push(face);
    }
    for mut influence in local.influences {
        influence.point_index += point_base as i32;
        aggregate.influences.push(influence);
    }
    debug!(point_base, wedge_base, "Merged local skin");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Capability, PolyVertex, Polygon};
    use crate::skeleton::SkeletonBuilder;
    use crate::stub::{StubMesh, StubScene};
    use marrow_core::Vec3;
    use smallvec::SmallVec;

    fn tri_mesh(points: [Vec3; 3], shader: usize) -> StubMesh {
        StubMesh {
            points: points.to_vec(),
            polygons: vec![Polygon {
                vertices: SmallVec::from_vec(vec![
                    PolyVertex { point: 0, u: 0.0, v: 0.0 },
                    PolyVertex { point: 1, u: 1.0, v: 0.0 },
                    PolyVertex { point: 2, u: 0.0, v: 1.0 },
                ]),
                shader_slot: Some(0),
                smoothing_group: Some(0),
            }],
            shaders: vec![shader],
            binding: None,
            fail_shader_query: false,
        }
    }

    fn two_mesh_scene() -> StubScene {
        let mut scene = StubScene::new();
        let root = scene.add_node("root", Capability::Joint, None);
        scene.node_mut(root).selected = true;

        let shader_a = scene.add_shader("mat_a");
        let shader_b = scene.add_shader("mat_b");

        let mesh_a = scene.add_node("mesh_a", Capability::Mesh, Some(root));
        scene.set_mesh(
            mesh_a,
            tri_mesh(
                [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
                shader_a,
            ),
        );

        let mesh_b = scene.add_node("mesh_b", Capability::Mesh, Some(root));
        scene.set_mesh(
            mesh_b,
            tri_mesh(
                [Vec3::new(5.0, 0.0, 0.0), Vec3::new(6.0, 0.0, 0.0), Vec3::new(5.0, 1.0, 0.0)],
                shader_b,
            ),
        );
        scene
    }

    fn assemble(scene: &StubScene) -> (LocalSkin, MaterialRegistry, Skeleton) {
        let config = ExportConfig::default();
        let mut tree = SceneTree::build(scene).unwrap();
        let builder = SkeletonBuilder::new(&config);
        builder.evaluate(&mut tree, scene).unwrap();
        let skeleton = builder.digest(&mut tree, scene).unwrap();
        let (skin, registry) =
            SkinAssembler::new(&config).assemble(scene, &mut tree, &skeleton).unwrap();
        (skin, registry, skeleton)
    }

    #[test]
    fn test_merge_offsets_all_index_spaces() {
        let scene = two_mesh_scene();
        let (skin, registry, _) = assemble(&scene);

        assert_eq!(skin.points.len(), 6);
        assert_eq!(skin.wedges.len(), 6);
        assert_eq!(skin.faces.len(), 2);
        assert_eq!(registry.shaders().len(), 2);

        // second mesh's wedges and influences land past the first's
        assert!(skin.wedges[3..].iter().all(|w| w.point_index >= 3));
        assert!(skin.faces[1].wedge_index.iter().all(|&w| w >= 3));
        assert!(skin.influences[3..].iter().all(|i| i.point_index >= 3));
        // and reference the second material
        assert!(skin.wedges[3..].iter().all(|w| w.material_index == 1));
    }

    #[test]
    fn test_selection_propagates_one_level() {
        let mut scene = two_mesh_scene();
        // deselect the root: nothing is included any more
        scene.node_mut(0).selected = false;

        let config = ExportConfig::default();
        let mut tree = SceneTree::build(&scene).unwrap();
        let builder = SkeletonBuilder::new(&config);
        builder.evaluate(&mut tree, &scene).unwrap();
        let skeleton = builder.digest(&mut tree, &scene).unwrap();

        let err = SkinAssembler::new(&config)
            .assemble(&scene, &mut tree, &skeleton)
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_directly_selected_mesh_included() {
        let mut scene = two_mesh_scene();
        scene.node_mut(0).selected = false;
        // mesh_a is tree/stub node index 1
        scene.node_mut(1).selected = true;

        let (skin, _, _) = assemble(&scene);
        assert_eq!(skin.faces.len(), 1);
    }
}
