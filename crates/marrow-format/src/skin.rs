//! Skin file: digested mesh, materials, reference skeleton and weights
//!
//! Chunk sequence is fixed:
//! `ACTRHEAD`, `PNTS0000`, `VTXW0000`, `FACE0000`, `MATT0000`,
//! `REFSKELT`, `RAWWEIGHTS`. Reads are strict: chunks out of order,
//! element-size disagreements or trailing bytes are hard errors.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use marrow_core::{Error, Result};
use tracing::info;

use crate::chunk::{ChunkReader, ChunkTag, ChunkWriter};
use crate::records::{Face, Material, Point, RawInfluence, RefBone, Wedge};

/// In-memory skin asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinFile {
    pub points: Vec<Point>,
    pub wedges: Vec<Wedge>,
    pub faces: Vec<Face>,
    pub materials: Vec<Material>,
    pub bones: Vec<RefBone>,
    pub influences: Vec<RawInfluence>,
}

impl SkinFile {
    /// Write the full chunk sequence
    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        let mut chunks = ChunkWriter::new(writer);
        chunks.write_head(ChunkTag::SkinHead)?;
        chunks.write_records(ChunkTag::Points, &self.points)?;
        chunks.write_records(ChunkTag::Wedges, &self.wedges)?;
        chunks.write_records(ChunkTag::Faces, &self.faces)?;
        chunks.write_records(ChunkTag::Materials, &self.materials)?;
        chunks.write_records(ChunkTag::RefSkeleton, &self.bones)?;
        chunks.write_records(ChunkTag::RawWeights, &self.influences)?;
        Ok(())
    }

    /// Read the full chunk sequence
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut chunks = ChunkReader::new(reader);
        chunks.expect_head(ChunkTag::SkinHead)?;
        let skin = Self {
            points: chunks.read_records(ChunkTag::Points)?,
            wedges: chunks.read_records(ChunkTag::Wedges)?,
            faces: chunks.read_records(ChunkTag::Faces)?,
            materials: chunks.read_records(ChunkTag::Materials)?,
            bones: chunks.read_records(ChunkTag::RefSkeleton)?,
            influences: chunks.read_records(ChunkTag::RawWeights)?,
        };
        chunks.expect_eof()?;
        Ok(skin)
    }

    /// Write to a file path
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        self.write(BufWriter::new(file))?;
        info!(
            path = %path.display(),
            points = self.points.len(),
            wedges = self.wedges.len(),
            faces = self.faces.len(),
            bones = self.bones.len(),
            "Wrote skin file"
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

    /// Sanity-check cross-chunk index references
    pub fn validate(&self) -> Result<()> {
        for (i, wedge) in self.wedges.iter().enumerate() {
            if wedge.point_index as usize >= self.points.len() {
                return Err(Error::structural(format!(
                    "wedge {} references point {} of {}",
                    i,
                    wedge.point_index,
                    self.points.len()
                )));
            }
        }
        for (i, face) in self.faces.iter().enumerate() {
            for &w in &face.wedge_index {
                if w as usize >= self.wedges.len() {
                    return Err(Error::structural(format!(
                        "face {} references wedge {} of {}",
                        i,
                        w,
                        self.wedges.len()
                    )));
                }
            }
        }
        for (i, influence) in self.influences.iter().enumerate() {
            if influence.bone_index as usize >= self.bones.len() {
                return Err(Error::structural(format!(
                    "influence {} references bone {} of {}",
                    i,
                    influence.bone_index,
                    self.bones.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::JointPos;
    use marrow_core::Vec3;

    fn make_test_skin() -> SkinFile {
        SkinFile {
            points: vec![
                Point { position: Vec3::new(0.0, 0.0, 0.0) },
                Point { position: Vec3::new(1.0, 0.0, 0.0) },
                Point { position: Vec3::new(0.0, 1.0, 0.0) },
            ],
            wedges: vec![
                Wedge { point_index: 0, u: 0.0, v: 1.0, material_index: 0 },
                Wedge { point_index: 1, u: 1.0, v: 1.0, material_index: 0 },
                Wedge { point_index: 2, u: 0.0, v: 0.0, material_index: 0 },
            ],
            faces: vec![Face {
                wedge_index: [0, 2, 1],
                material_index: 0,
                aux_material: 0,
                smoothing_groups: 1,
            }],
            materials: vec![Material {
                name: "body".into(),
                texture_index: 0,
                poly_flags: 0,
                aux_material: 0,
                aux_flags: 0,
                lod_bias: 5,
                lod_style: 0,
            }],
            bones: vec![RefBone {
                name: "root".into(),
                flags: 0,
                num_children: 0,
                parent_index: 0,
                joint: JointPos::default(),
            }],
            influences: vec![
                RawInfluence { weight: 1.0, point_index: 0, bone_index: 0 },
                RawInfluence { weight: 1.0, point_index: 1, bone_index: 0 },
                RawInfluence { weight: 1.0, point_index: 2, bone_index: 0 },
            ],
        }
    }

    #[test]
    fn test_skin_roundtrip_is_identical() {
        let skin = make_test_skin();

        let mut first = Vec::new();
        skin.write(&mut first).unwrap();

        let back = SkinFile::read(first.as_slice()).unwrap();
        assert_eq!(back, skin);

        let mut second = Vec::new();
        back.write(&mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_roundtrip_with_empty_material_and_weight_chunks() {
        // An unbound, untextured mesh still writes all seven chunks;
        // the material and weight chunks just carry zero records
        let mut skin = make_test_skin();
        skin.materials.clear();
        skin.influences.clear();

        let mut buf = Vec::new();
        skin.write(&mut buf).unwrap();

        let back = SkinFile::read(buf.as_slice()).unwrap();
        assert_eq!(back, skin);
        assert!(back.materials.is_empty());
        assert!(back.influences.is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_material_order() {
        let mut skin = make_test_skin();
        skin.materials.push(Material {
            name: "trim".into(),
            texture_index: 1,
            poly_flags: 0,
            aux_material: 1,
            aux_flags: 1,
            lod_bias: 5,
            lod_style: 0,
        });
        skin.wedges[2].material_index = 1;

        let mut buf = Vec::new();
        skin.write(&mut buf).unwrap();

        let back = SkinFile::read(buf.as_slice()).unwrap();
        assert_eq!(back, skin);
        assert_eq!(back.materials[0].name, "body");
        assert_eq!(back.materials[1].name, "trim");
        assert_eq!(back.wedges[2].material_index, 1);
    }

    #[test]
    fn test_validate_catches_dangling_wedge() {
        let mut skin = make_test_skin();
        skin.wedges[1].point_index = 99;
        assert!(skin.validate().unwrap_err().is_structural());
    }

    #[test]
    fn test_truncated_file_is_error() {
        let skin = make_test_skin();
        let mut buf = Vec::new();
        skin.write(&mut buf).unwrap();
        buf.truncate(buf.len() - 4);

        assert!(SkinFile::read(buf.as_slice()).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actor.psk");

        let skin = make_test_skin();
        skin.write_file(&path).unwrap();
        let back = SkinFile::read_file(&path).unwrap();
        assert_eq!(back, skin);
    }
}
