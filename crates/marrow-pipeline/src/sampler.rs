//! Frame-by-frame animation sampling and clip recording
//!
//! Clips are sampled one frame at a time by driving the provider's
//! scene clock, producing a row-major frame-by-bone key stream. A
//! [`AnimationSession`] accumulates clips destined for one animation
//! file and enforces that they all share a bone count.

use marrow_core::{Error, ExportConfig, Result, RootMotion, Vec3};
use marrow_format::anim::AnimFile;
use marrow_format::records::{ClipInfo, QuatKey};
use tracing::{info, warn};

use crate::provider::SceneProvider;
use crate::skeleton::Skeleton;
use crate::tree::SceneTree;

pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// One sampled clip, not yet committed to a session
#[derive(Debug, Clone)]
pub struct SampledClip {
    pub keys: Vec<QuatKey>,
    pub frame_count: usize,
    pub bone_count: usize,
    pub rate: f32,
}

/// Samples bone transforms over a frame list
pub struct AnimationSampler<'a> {
    config: &'a ExportConfig,
}

impl<'a> AnimationSampler<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Sample every bone at every listed frame, row-major by frame
    pub fn sample(
        &self,
        provider: &dyn SceneProvider,
        tree: &SceneTree,
        skeleton: &Skeleton,
        frames: &[i32],
    ) -> Result<SampledClip> {
        if frames.is_empty() {
            return Err(Error::consistency("cannot sample an empty frame list"));
        }
        let rate = self
            .config
            .frame_rate_override
            .or_else(|| provider.frame_rate())
            .unwrap_or(DEFAULT_FRAME_RATE);
        let time_step = 1.0 / rate;

        let bone_count = skeleton.bone_count();
        let mut keys: Vec<QuatKey> = Vec::with_capacity(frames.len() * bone_count);

        for &frame in frames {
            provider.set_time(f64::from(frame));

            for (bone_index, &tree_index) in skeleton.bone_tree_index.iter().enumerate() {
                let id = tree.nodes[tree_index].id;
                let transform = if bone_index == 0 {
                    provider.world_transform(id)?
                } else {
                    provider.local_transform(id)?
                };

                // Same translation policy as the reference pose: bake
                // the parent's non-animated scale into the child.
                let parent_scale = match tree.nodes[tree_index].parent_index {
                    Some(p) if bone_index > 0 => {
                        provider.world_scale(tree.nodes[p].id).unwrap_or_else(|e| {
                            warn!(bone = %tree.nodes[tree_index].name, error = %e,
                                "Parent scale query failed");
                            Vec3::ONE
                        })
                    }
                    _ => Vec3::ONE,
                };

                keys.push(QuatKey {
                    position: transform
                        .position
                        .mul_components(parent_scale)
                        .scaled(self.config.point_scale),
                    orientation: transform.orientation,
                    time: time_step,
                });
            }
        }

        let mut clip =
            SampledClip { keys, frame_count: frames.len(), bone_count, rate };
        fix_root_motion(&mut clip, self.config.root_motion);
        Ok(clip)
    }
}

/// Rewrite the root bone's translation track per the configured policy
fn fix_root_motion(clip: &mut SampledClip, mode: RootMotion) {
    if mode == RootMotion::None || clip.frame_count < 2 {
        return;
    }
    let stride = clip.bone_count;
    let start = clip.keys[0].position;
    let end = clip.keys[(clip.frame_count - 1) * stride].position;

    match mode {
        RootMotion::None => {}
        // blend the end displacement back out so the clip loops in place
        RootMotion::Linear => {
            for n in 0..clip.frame_count {
                let alpha = n as f32 / (clip.frame_count - 1) as f32;
                let p = &mut clip.keys[n * stride].position;
                *p = *p + (start - end).scaled(alpha);
            }
        }
        RootMotion::Locked => {
            for n in 0..clip.frame_count {
                clip.keys[n * stride].position = start;
            }
        }
    }
}

/// Accumulates sampled clips bound for one animation file
#[derive(Debug, Default)]
pub struct AnimationSession {
    clips: Vec<ClipInfo>,
    keys: Vec<QuatKey>,
    bone_count: Option<usize>,
}

impl AnimationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn clips(&self) -> &[ClipInfo] {
        &self.clips
    }

    /// Commit a sampled clip under `name`
    ///
    /// Every clip in a session must carry the same bone count; a
    /// mismatch is rejected without touching recorded state.
    pub fn record(&mut self, name: &str, clip: SampledClip) -> Result<()> {
        if clip.frame_count == 0 || clip.bone_count == 0 {
            return Err(Error::consistency("refusing to record an empty clip"));
        }
        if let Some(expected) = self.bone_count {
            if clip.bone_count != expected {
                return Err(Error::consistency(format!(
                    "clip '{}' has {} bones, session has {}",
                    name, clip.bone_count, expected
                )));
            }
        }

        self.clips.push(ClipInfo {
            name: name.to_string(),
            group: "None".to_string(),
            total_bones: clip.bone_count as i32,
            root_include: 0,
            key_compression_style: 0,
            key_quotum: clip.keys.len() as i32,
            key_reduction: 1.0,
            track_time: clip.frame_count as f32,
            anim_rate: clip.rate,
            start_bone: 0,
            first_raw_frame: 0,
            num_raw_frames: clip.frame_count as i32,
        });
        self.bone_count = Some(clip.bone_count);
        self.keys.extend(clip.keys);

        info!(clip = name, clips = self.clips.len(), "Recorded clip");
        Ok(())
    }

    /// Assemble the recorded clips into an animation file
    pub fn into_anim_file(self, skeleton: &Skeleton) -> Result<AnimFile> {
        if self.clips.is_empty() {
            return Err(Error::consistency("session has no recorded clips"));
        }
        Ok(AnimFile {
            bones: skeleton.bones.clone(),
            clips: self.clips,
            keys: self.keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Capability, Transform};
    use crate::skeleton::SkeletonBuilder;
    use crate::stub::StubScene;
    use marrow_core::Quat;

    fn animated_scene(frames: usize) -> StubScene {
        let mut scene = StubScene::new();
        let root = scene.add_node("root", Capability::Joint, None);
        let child = scene.add_node("child", Capability::Joint, Some(root));

        // root translates one unit in x per frame, child holds still
        scene.node_mut(root).world_track = (0..frames)
            .map(|f| Transform {
                position: Vec3::new(f as f32, 0.0, 0.0),
                orientation: Quat::IDENTITY,
            })
            .collect();
        scene.node_mut(child).local_track = (0..frames)
            .map(|_| Transform {
                position: Vec3::new(0.0, 2.0, 0.0),
                orientation: Quat::IDENTITY,
            })
            .collect();
        scene.set_frame_range(0.0, frames as f64 - 1.0);
        scene
    }

    fn sample_with(
        scene: &StubScene,
        config: &ExportConfig,
        frames: &[i32],
    ) -> (SampledClip, Skeleton) {
        let mut tree = SceneTree::build(scene).unwrap();
        let builder = SkeletonBuilder::new(config);
        builder.evaluate(&mut tree, scene).unwrap();
        let skeleton = builder.digest(&mut tree, scene).unwrap();
        let clip = AnimationSampler::new(config)
            .sample(scene, &tree, &skeleton, frames)
            .unwrap();
        (clip, skeleton)
    }

    #[test]
    fn test_row_major_frame_by_bone_layout() {
        let scene = animated_scene(3);
        let config = ExportConfig::default();
        let (clip, _) = sample_with(&scene, &config, &[0, 1, 2]);

        assert_eq!(clip.keys.len(), 6);
        for f in 0..3 {
            assert_eq!(clip.keys[f * 2].position.x, f as f32);
            assert_eq!(clip.keys[f * 2 + 1].position.y, 2.0);
        }
    }

    #[test]
    fn test_key_time_is_frame_duration() {
        let mut scene = animated_scene(2);
        scene.set_frame_rate(60.0);
        let config = ExportConfig::default();
        let (clip, _) = sample_with(&scene, &config, &[0, 1]);
        assert_eq!(clip.rate, 60.0);
        assert!(clip.keys.iter().all(|k| (k.time - 1.0 / 60.0).abs() < 1e-6));
    }

    #[test]
    fn test_rate_override_beats_provider_rate() {
        let mut scene = animated_scene(2);
        scene.set_frame_rate(24.0);
        let config = ExportConfig { frame_rate_override: Some(15.0), ..Default::default() };
        let (clip, _) = sample_with(&scene, &config, &[0, 1]);
        assert_eq!(clip.rate, 15.0);
    }

    #[test]
    fn test_linear_root_fix_aligns_last_onto_first() {
        let scene = animated_scene(5);
        let config = ExportConfig { root_motion: RootMotion::Linear, ..Default::default() };
        let (clip, _) = sample_with(&scene, &config, &[0, 1, 2, 3, 4]);

        let first = clip.keys[0].position;
        let last = clip.keys[4 * 2].position;
        assert!((last.x - first.x).abs() < 1e-5);
        // interior frames keep a fraction of their displacement
        assert!(clip.keys[2 * 2].position.x > 0.0);
        // non-root keys untouched
        assert!(clip.keys.iter().skip(1).step_by(2).all(|k| k.position.y == 2.0));
    }

    #[test]
    fn test_single_frame_clip_survives_root_fix() {
        let scene = animated_scene(1);
        let config = ExportConfig { root_motion: RootMotion::Linear, ..Default::default() };
        let (clip, _) = sample_with(&scene, &config, &[0]);
        assert_eq!(clip.keys.len(), 2);
        assert_eq!(clip.keys[0].position.x, 0.0);
    }

    #[test]
    fn test_locked_root_pins_every_frame_to_first() {
        let scene = animated_scene(4);
        let config = ExportConfig { root_motion: RootMotion::Locked, ..Default::default() };
        let (clip, _) = sample_with(&scene, &config, &[0, 1, 2, 3]);
        for f in 0..4 {
            assert_eq!(clip.keys[f * 2].position.x, 0.0);
        }
    }

    #[test]
    fn test_session_rejects_bone_count_mismatch() {
        let scene = animated_scene(2);
        let config = ExportConfig::default();
        let (clip, _) = sample_with(&scene, &config, &[0, 1]);

        let mut session = AnimationSession::new();
        session.record("walk", clip.clone()).unwrap();

        let shrunk = SampledClip { bone_count: 1, ..clip };
        let err = session.record("run", shrunk).unwrap_err();
        assert!(err.is_consistency());
        assert_eq!(session.clip_count(), 1);
    }

    #[test]
    fn test_session_builds_anim_file_with_fixup_inputs() {
        let scene = animated_scene(3);
        let config = ExportConfig::default();
        let (clip, skeleton) = sample_with(&scene, &config, &[0, 1, 2]);

        let mut session = AnimationSession::new();
        session.record("walk", clip.clone()).unwrap();
        session.record("walk_b", clip).unwrap();

        let file = session.into_anim_file(&skeleton).unwrap();
        assert_eq!(file.bones.len(), 2);
        assert_eq!(file.clips.len(), 2);
        assert_eq!(file.keys.len(), 12);
        assert_eq!(file.clips[0].key_quotum, 6);
        assert_eq!(file.clips[0].track_time, 3.0);
    }
}
