//! Animation file: bone names, clip descriptors and the flat key stream
//!
//! Chunk sequence: `ANIMHEAD`, `BONENAMES`, `ANIMINFO`, `ANIMKEYS`.
//! Keys of all clips are concatenated in clip order; within a clip they
//! are row-major frame x bone. Existing files can be loaded and merged
//! with newly recorded clips, provided the bone count matches.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use marrow_core::{Error, Result};
use tracing::{info, warn};

use crate::chunk::{ChunkReader, ChunkTag, ChunkWriter};
use crate::records::{ClipInfo, QuatKey, RefBone};

/// In-memory animation asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimFile {
    pub bones: Vec<RefBone>,
    pub clips: Vec<ClipInfo>,
    pub keys: Vec<QuatKey>,
}

impl AnimFile {
    /// Total keys the clip descriptors claim
    fn declared_keys(&self) -> usize {
        self.clips
            .iter()
            .map(|c| c.total_bones as usize * c.num_raw_frames as usize)
            .sum()
    }

    /// Check clip descriptors against the bone list and key stream
    pub fn validate(&self) -> Result<()> {
        for clip in &self.clips {
            if clip.total_bones as usize != self.bones.len() {
                return Err(Error::consistency(format!(
                    "clip '{}' declares {} bones, file has {}",
                    clip.name,
                    clip.total_bones,
                    self.bones.len()
                )));
            }
        }
        let declared = self.declared_keys();
        if declared != self.keys.len() {
            return Err(Error::consistency(format!(
                "clips declare {} keys, stream holds {}",
                declared,
                self.keys.len()
            )));
        }
        Ok(())
    }

    /// Write the full chunk sequence
    ///
    /// Each clip's `first_raw_frame` is fixed up to its offset in the
    /// flat stream before writing; the in-memory value is ignored.
    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        self.validate()?;

        let mut fixed_clips = self.clips.clone();
        let mut total_keys = 0usize;
        for clip in &mut fixed_clips {
            let bones = clip.total_bones.max(1) as usize;
            clip.first_raw_frame = (total_keys / bones) as i32;
            total_keys += clip.total_bones as usize * clip.num_raw_frames as usize;
        }

        let mut chunks = ChunkWriter::new(writer);
        chunks.write_head(ChunkTag::AnimHead)?;
        chunks.write_records(ChunkTag::BoneNames, &self.bones)?;
        chunks.write_records(ChunkTag::AnimInfo, &fixed_clips)?;
        chunks.write_records(ChunkTag::AnimKeys, &self.keys)?;
        Ok(())
    }

    /// Read the full chunk sequence
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut chunks = ChunkReader::new(reader);
        chunks.expect_head(ChunkTag::AnimHead)?;
        let anim = Self {
            bones: chunks.read_records(ChunkTag::BoneNames)?,
            clips: chunks.read_records(ChunkTag::AnimInfo)?,
            keys: chunks.read_records(ChunkTag::AnimKeys)?,
        };
        chunks.expect_eof()?;
        anim.validate()?;
        Ok(anim)
    }

    /// Write to a file path
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        self.write(BufWriter::new(file))?;
        info!(
            path = %path.display(),
            bones = self.bones.len(),
            clips = self.clips.len(),
            keys = self.keys.len(),
            "Wrote anim file"
        );
        Ok(())
    }

    /// Read from a file path
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::read(BufReader::new(File::open(path)?))
    }

    /// Append another file's clips and keys
    ///
    /// A bone-count mismatch aborts before anything is appended; `self`
    /// is left exactly as it was. An empty target adopts the other
    /// file's skeleton.
    pub fn merge(&mut self, other: AnimFile) -> Result<()> {
        if self.bones.is_empty() && self.clips.is_empty() {
            *self = other;
            return Ok(());
        }

        if other.bones.len() != self.bones.len() {
            return Err(Error::consistency(format!(
                "cannot merge: {} bones vs {} bones",
                other.bones.len(),
                self.bones.len()
            )));
        }

        for clip in &other.clips {
            if self.clips.iter().any(|c| c.name == clip.name) {
                warn!(clip = %clip.name, "Merging a clip whose name already exists");
            }
        }

        self.clips.extend(other.clips);
        self.keys.extend(other.keys);
        Ok(())
    }
}
