//! Human-readable export summaries

use std::fmt::Write;

use marrow_format::anim::AnimFile;
use marrow_format::skin::SkinFile;
use tracing::info;

/// Render a skin summary: totals, the material table with per-material
/// geometry counts, and the bone hierarchy
pub fn skin_report(skin: &SkinFile) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Skeletal mesh summary");
    let _ = writeln!(out);
    let _ = writeln!(out, " Points    {:6}", skin.points.len());
    let _ = writeln!(out, " Wedges    {:6}", skin.wedges.len());
    let _ = writeln!(out, " Faces     {:6}", skin.faces.len());
    let _ = writeln!(out, " Materials {:6}", skin.materials.len());
    let _ = writeln!(out, " Bones     {:6}", skin.bones.len());
    let _ = writeln!(out, " Weights   {:6}", skin.influences.len());
    let _ = writeln!(out);

    let _ = writeln!(out, " Materials:");
    for (i, material) in skin.materials.iter().enumerate() {
        let wedges = skin.wedges.iter().filter(|w| w.material_index as usize == i).count();
        let faces = skin.faces.iter().filter(|f| f.material_index as usize == i).count();
        let _ = writeln!(
            out,
            "  [{i:3}] {:<24} flags 0x{:02x} tex {:2}  wedges {wedges:6} faces {faces:6}",
            material.name, material.poly_flags, material.texture_index
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, " Bones:");
    for (i, bone) in skin.bones.iter().enumerate() {
        let weights = skin.influences.iter().filter(|w| w.bone_index as usize == i).count();
        let _ = writeln!(
            out,
            "  [{i:3}] {:<24} parent {:3} children {:2} weights {weights:6}",
            bone.name, bone.parent_index, bone.num_children
        );
    }

    info!(
        points = skin.points.len(),
        faces = skin.faces.len(),
        materials = skin.materials.len(),
        bones = skin.bones.len(),
        "Skin report rendered"
    );
    out
}

/// Render an animation summary with one row per clip
pub fn anim_report(anim: &AnimFile) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Animation summary");
    let _ = writeln!(out);
    let _ = writeln!(out, " Bones {:4}  Clips {:4}  Keys {:8}", anim.bones.len(),
        anim.clips.len(), anim.keys.len());
    let _ = writeln!(out);

    for (i, clip) in anim.clips.iter().enumerate() {
        let _ = writeln!(
            out,
            " * clip {:<24} {i:4}  track time {:8.3}  rate {:6.2}",
            clip.name, clip.track_time, clip.anim_rate
        );
        let _ = writeln!(
            out,
            "     first raw frame {:5}  raw frames {:5}  group [{}]",
            clip.first_raw_frame, clip.num_raw_frames, clip.group
        );
    }

    info!(clips = anim.clips.len(), keys = anim.keys.len(), "Animation report rendered");
    out
}
