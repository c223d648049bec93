//! Marrow Export Pipeline
//!
//! Turns a live scene, reached through the [`SceneProvider`] trait,
//! into skeletal mesh and animation files:
//!
//! 1. [`SceneTree`] snapshots the scene graph into a flat node table.
//! 2. [`SkeletonBuilder`] selects and renumbers the bone hierarchy.
//! 3. [`SkinAssembler`] digests and merges the selected meshes.
//! 4. [`MaterialCollector`] builds and reorders the material table.
//! 5. [`AnimationSampler`] records clips frame by frame.
//!
//! Every pass reads through the provider with pass-scoped state only,
//! so a single provider can back repeated exports.

pub mod frames;
pub mod materials;
pub mod mesh;
pub mod provider;
pub mod report;
pub mod sampler;
pub mod skeleton;
pub mod skin;
pub mod stub;
pub mod tree;

pub use frames::{full_range, parse_frame_range};
pub use materials::{MaterialCollector, MaterialSet};
pub use mesh::{dedup_wedges, LocalSkin, MaterialRegistry, MeshDigester};
pub use provider::{Capability, NodeId, Polygon, PolyVertex, SceneProvider, ShaderId, SkinBinding, Transform};
pub use sampler::{AnimationSampler, AnimationSession, SampledClip};
pub use skeleton::{Skeleton, SkeletonBuilder};
pub use skin::SkinAssembler;
pub use tree::{NodeInfo, SceneTree};

use marrow_core::{ExportConfig, Result};
use marrow_format::skin::SkinFile;

/// Run the full mesh pipeline: tree, skeleton, skin, materials
pub fn export_skin(provider: &dyn SceneProvider, config: &ExportConfig) -> Result<SkinFile> {
    let mut tree = SceneTree::build(provider)?;
    let builder = SkeletonBuilder::new(config);
    builder.evaluate(&mut tree, provider)?;
    let skeleton = builder.digest(&mut tree, provider)?;

    let (mut skin, registry) =
        SkinAssembler::new(config).assemble(provider, &mut tree, &skeleton)?;
    let set = MaterialCollector::new(config).collect(provider, &registry, &mut skin)?;

    Ok(SkinFile {
        points: skin.points,
        wedges: skin.wedges,
        faces: skin.faces,
        materials: set.materials,
        bones: skeleton.bones,
        influences: skin.influences,
    })
}
