//! End-to-end pipeline tests over a stub scene
//!
//! These walk the full export path: tree snapshot, skeleton
//! evaluation, mesh digestion, material collection and animation
//! sampling, all against the in-memory provider.

use marrow_core::{ExportConfig, Vec3};
use marrow_pipeline::stub::{StubMesh, StubScene};
use marrow_pipeline::{
    export_skin, full_range, AnimationSampler, AnimationSession, Capability, NodeId,
    SceneTree, SkeletonBuilder, SkinBinding,
};

/// Root joint, one child joint, and a triangle fully bound to the child
fn rigged_triangle() -> StubScene {
    let mut scene = StubScene::new();
    let root = scene.add_node("thigh", Capability::Joint, None);
    scene.node_mut(root).selected = true;
    let calf = scene.add_node("calf", Capability::Joint, Some(root));

    let shader = scene.add_shader("foo_skin00");

    let mesh = scene.add_node("leg_mesh", Capability::Mesh, Some(root));
    scene.set_mesh(
        mesh,
        StubMesh {
            points: vec![
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            polygons: vec![StubScene::triangle(
                [0, 1, 2],
                [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
                Some(0),
            )],
            shaders: vec![shader],
            binding: Some(SkinBinding {
                influence_objects: vec![NodeId(calf as u64)],
                point_weights: vec![vec![(0, 1.0)]; 3],
            }),
            fail_shader_query: false,
        },
    );
    scene
}

#[test]
fn test_full_skin_export() {
    let scene = rigged_triangle();
    let skin = export_skin(&scene, &ExportConfig::default()).unwrap();

    assert_eq!(skin.bones.len(), 2);
    assert_eq!(skin.bones[0].parent_index, 0);
    assert_eq!(skin.bones[1].parent_index, 0);

    assert_eq!(skin.points.len(), 3);
    assert_eq!(skin.wedges.len(), 3);
    assert_eq!(skin.faces.len(), 1);

    // fully weighted to the child bone
    assert_eq!(skin.influences.len(), 3);
    assert!(skin.influences.iter().all(|w| w.bone_index == 1));
    assert!(skin.influences.iter().all(|w| (w.weight - 1.0).abs() < 1e-6));

    assert_eq!(skin.materials.len(), 1);
    assert_eq!(skin.materials[0].name, "foo_skin00");
    assert_eq!(skin.materials[0].texture_index, 0);
    assert_eq!(skin.materials[0].aux_flags, 1);

    skin.validate().unwrap();
}

#[test]
fn test_skin_and_anim_share_the_skeleton() {
    let mut scene = rigged_triangle();
    scene.set_frame_range(0.0, 4.0);

    let config = ExportConfig::default();
    let mut tree = SceneTree::build(&scene).unwrap();
    let builder = SkeletonBuilder::new(&config);
    builder.evaluate(&mut tree, &scene).unwrap();
    let skeleton = builder.digest(&mut tree, &scene).unwrap();

    let frames = full_range(0.0, 4.0);
    let clip = AnimationSampler::new(&config)
        .sample(&scene, &tree, &skeleton, &frames)
        .unwrap();
    assert_eq!(clip.frame_count, 5);
    assert_eq!(clip.bone_count, 2);
    assert_eq!(clip.keys.len(), 10);

    let mut session = AnimationSession::new();
    session.record("idle", clip).unwrap();
    let anim = session.into_anim_file(&skeleton).unwrap();
    anim.validate().unwrap();
    assert_eq!(anim.bones.len(), 2);
    assert_eq!(anim.clips[0].total_bones, 2);
}
