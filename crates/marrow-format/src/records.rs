//! Fixed-layout binary records
//!
//! Every record has a compile-time size and encodes/decodes itself field
//! by field in little-endian order, matching the packed C layouts of the
//! container format. Fixed 64-byte name fields are NUL-padded on write
//! (truncated at 63 bytes) and read back to the first NUL.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use marrow_core::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Length of fixed name fields
pub const NAME_LEN: usize = 64;

/// Polygon flag bits carried by materials
pub mod poly_flags {
    /// Normal one-sided
    pub const NORMAL: u32 = 0x00;
    /// Normal but two-sided
    pub const TWO_SIDED: u32 = 0x01;
    /// Translucent two-sided
    pub const TRANSLUCENT: u32 = 0x02;
    /// Masked two-sided
    pub const MASKED: u32 = 0x03;
    /// Modulation blended two-sided
    pub const MODULATE: u32 = 0x04;
    /// Placeholder triangle for weapon positioning, invisible
    pub const PLACEHOLDER: u32 = 0x08;
    /// Full brightness, no lighting
    pub const UNLIT: u32 = 0x10;
    /// Flat surface
    pub const FLAT: u32 = 0x20;
    /// Per-pixel alpha (shares the bit with FLAT)
    pub const ALPHA: u32 = 0x20;
    /// Environment mapped
    pub const ENVIRONMENT: u32 = 0x40;
    /// No bilinear filtering
    pub const NO_SMOOTH: u32 = 0x80;
}

/// A fixed-size binary record
pub trait Record: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Encode in little-endian wire order
    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    /// Decode from little-endian wire order
    fn decode<R: Read>(reader: &mut R) -> io::Result<Self>;
}

fn write_name<W: Write>(writer: &mut W, name: &str) -> io::Result<()> {
    let mut field = [0u8; NAME_LEN];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_LEN - 1);
    field[..len].copy_from_slice(&bytes[..len]);
    writer.write_all(&field)
}

fn read_name<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut field = [0u8; NAME_LEN];
    reader.read_exact(&mut field)?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    Ok(String::from_utf8_lossy(&field[..end]).into_owned())
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> io::Result<()> {
    writer.write_f32::<LittleEndian>(v.x)?;
    writer.write_f32::<LittleEndian>(v.y)?;
    writer.write_f32::<LittleEndian>(v.z)
}

fn read_vec3<R: Read>(reader: &mut R) -> io::Result<Vec3> {
    Ok(Vec3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

fn write_quat<W: Write>(writer: &mut W, q: Quat) -> io::Result<()> {
    writer.write_f32::<LittleEndian>(q.x)?;
    writer.write_f32::<LittleEndian>(q.y)?;
    writer.write_f32::<LittleEndian>(q.z)?;
    writer.write_f32::<LittleEndian>(q.w)
}

fn read_quat<R: Read>(reader: &mut R) -> io::Result<Quat> {
    Ok(Quat::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

/// Mesh point, world-space position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub position: Vec3,
}

impl Record for Point {
    const SIZE: usize = 12;

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_vec3(writer, self.position)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self { position: read_vec3(reader)? })
    }
}

/// Wedge: a point reference with UV and material
///
/// The packed layout pads the u16 point index to 4 bytes and the trailing
/// material/reserved bytes to another 4; pads are zero on write and
/// ignored on read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wedge {
    pub point_index: u16,
    pub u: f32,
    pub v: f32,
    pub material_index: u8,
}

impl Record for Wedge {
    const SIZE: usize = 16;

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.point_index)?;
        writer.write_u16::<LittleEndian>(0)?;
        writer.write_f32::<LittleEndian>(self.u)?;
        writer.write_f32::<LittleEndian>(self.v)?;
        writer.write_u8(self.material_index)?;
        writer.write_u8(0)?; // reserved
        writer.write_u16::<LittleEndian>(0)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let point_index = reader.read_u16::<LittleEndian>()?;
        let _pad = reader.read_u16::<LittleEndian>()?;
        let u = reader.read_f32::<LittleEndian>()?;
        let v = reader.read_f32::<LittleEndian>()?;
        let material_index = reader.read_u8()?;
        let _reserved = reader.read_u8()?;
        let _pad = reader.read_u16::<LittleEndian>()?;
        Ok(Self { point_index, u, v, material_index })
    }
}

/// Triangle over three wedges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub wedge_index: [u16; 3],
    pub material_index: u8,
    pub aux_material: u8,
    pub smoothing_groups: u32,
}

impl Record for Face {
    const SIZE: usize = 12;

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for &w in &self.wedge_index {
            writer.write_u16::<LittleEndian>(w)?;
        }
        writer.write_u8(self.material_index)?;
        writer.write_u8(self.aux_material)?;
        writer.write_u32::<LittleEndian>(self.smoothing_groups)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut wedge_index = [0u16; 3];
        for w in &mut wedge_index {
            *w = reader.read_u16::<LittleEndian>()?;
        }
        Ok(Self {
            wedge_index,
            material_index: reader.read_u8()?,
            aux_material: reader.read_u8()?,
            smoothing_groups: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// Export material
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub texture_index: i32,
    pub poly_flags: u32,
    /// Pre-sort index, used to remap wedge material indices after ordering
    pub aux_material: i32,
    /// 1 when the name carried an explicit skin tag
    pub aux_flags: u32,
    pub lod_bias: i32,
    pub lod_style: i32,
}

impl Record for Material {
    const SIZE: usize = NAME_LEN + 24;

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_name(writer, &self.name)?;
        writer.write_i32::<LittleEndian>(self.texture_index)?;
        writer.write_u32::<LittleEndian>(self.poly_flags)?;
        writer.write_i32::<LittleEndian>(self.aux_material)?;
        writer.write_u32::<LittleEndian>(self.aux_flags)?;
        writer.write_i32::<LittleEndian>(self.lod_bias)?;
        writer.write_i32::<LittleEndian>(self.lod_style)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            name: read_name(reader)?,
            texture_index: reader.read_i32::<LittleEndian>()?,
            poly_flags: reader.read_u32::<LittleEndian>()?,
            aux_material: reader.read_i32::<LittleEndian>()?,
            aux_flags: reader.read_u32::<LittleEndian>()?,
            lod_bias: reader.read_i32::<LittleEndian>()?,
            lod_style: reader.read_i32::<LittleEndian>()?,
        })
    }
}

/// Joint placement: rotation, translation and bounds hints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointPos {
    pub orientation: Quat,
    pub position: Vec3,
    pub length: f32,
    pub x_size: f32,
    pub y_size: f32,
    pub z_size: f32,
}

impl Default for JointPos {
    fn default() -> Self {
        Self {
            orientation: Quat::IDENTITY,
            position: Vec3::ZERO,
            length: 0.0,
            x_size: 0.0,
            y_size: 0.0,
            z_size: 0.0,
        }
    }
}

impl JointPos {
    const SIZE: usize = 44;

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_quat(writer, self.orientation)?;
        write_vec3(writer, self.position)?;
        writer.write_f32::<LittleEndian>(self.length)?;
        writer.write_f32::<LittleEndian>(self.x_size)?;
        writer.write_f32::<LittleEndian>(self.y_size)?;
        writer.write_f32::<LittleEndian>(self.z_size)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            orientation: read_quat(reader)?,
            position: read_vec3(reader)?,
            length: reader.read_f32::<LittleEndian>()?,
            x_size: reader.read_f32::<LittleEndian>()?,
            y_size: reader.read_f32::<LittleEndian>()?,
            z_size: reader.read_f32::<LittleEndian>()?,
        })
    }
}

/// Reference skeleton bone
///
/// The root bone's parent index points at itself (0); every other bone
/// points at an earlier bone in the list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefBone {
    pub name: String,
    pub flags: u32,
    pub num_children: i32,
    pub parent_index: i32,
    pub joint: JointPos,
}

impl Record for RefBone {
    const SIZE: usize = NAME_LEN + 12 + JointPos::SIZE;

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_name(writer, &self.name)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_i32::<LittleEndian>(self.num_children)?;
        writer.write_i32::<LittleEndian>(self.parent_index)?;
        self.joint.encode(writer)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            name: read_name(reader)?,
            flags: reader.read_u32::<LittleEndian>()?,
            num_children: reader.read_i32::<LittleEndian>()?,
            parent_index: reader.read_i32::<LittleEndian>()?,
            joint: JointPos::decode(reader)?,
        })
    }
}

/// One point-to-bone weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawInfluence {
    pub weight: f32,
    pub point_index: i32,
    pub bone_index: i32,
}

impl Record for RawInfluence {
    const SIZE: usize = 12;

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_f32::<LittleEndian>(self.weight)?;
        writer.write_i32::<LittleEndian>(self.point_index)?;
        writer.write_i32::<LittleEndian>(self.bone_index)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            weight: reader.read_f32::<LittleEndian>()?,
            point_index: reader.read_i32::<LittleEndian>()?,
            bone_index: reader.read_i32::<LittleEndian>()?,
        })
    }
}

/// Per-clip descriptor in an anim file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    pub name: String,
    pub group: String,
    pub total_bones: i32,
    pub root_include: i32,
    pub key_compression_style: i32,
    pub key_quotum: i32,
    pub key_reduction: f32,
    pub track_time: f32,
    pub anim_rate: f32,
    pub start_bone: i32,
    /// Offset of this clip's first frame in the flat key stream, in
    /// frames; fixed up at write time
    pub first_raw_frame: i32,
    pub num_raw_frames: i32,
}

impl Record for ClipInfo {
    const SIZE: usize = NAME_LEN * 2 + 40;

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_name(writer, &self.name)?;
        write_name(writer, &self.group)?;
        writer.write_i32::<LittleEndian>(self.total_bones)?;
        writer.write_i32::<LittleEndian>(self.root_include)?;
        writer.write_i32::<LittleEndian>(self.key_compression_style)?;
        writer.write_i32::<LittleEndian>(self.key_quotum)?;
        writer.write_f32::<LittleEndian>(self.key_reduction)?;
        writer.write_f32::<LittleEndian>(self.track_time)?;
        writer.write_f32::<LittleEndian>(self.anim_rate)?;
        writer.write_i32::<LittleEndian>(self.start_bone)?;
        writer.write_i32::<LittleEndian>(self.first_raw_frame)?;
        writer.write_i32::<LittleEndian>(self.num_raw_frames)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            name: read_name(reader)?,
            group: read_name(reader)?,
            total_bones: reader.read_i32::<LittleEndian>()?,
            root_include: reader.read_i32::<LittleEndian>()?,
            key_compression_style: reader.read_i32::<LittleEndian>()?,
            key_quotum: reader.read_i32::<LittleEndian>()?,
            key_reduction: reader.read_f32::<LittleEndian>()?,
            track_time: reader.read_f32::<LittleEndian>()?,
            anim_rate: reader.read_f32::<LittleEndian>()?,
            start_bone: reader.read_i32::<LittleEndian>()?,
            first_raw_frame: reader.read_i32::<LittleEndian>()?,
            num_raw_frames: reader.read_i32::<LittleEndian>()?,
        })
    }
}

/// One sampled bone pose at one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuatKey {
    pub position: Vec3,
    pub orientation: Quat,
    /// Seconds until the next key
    pub time: f32,
}

impl Record for QuatKey {
    const SIZE: usize = 32;

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_vec3(writer, self.position)?;
        write_quat(writer, self.orientation)?;
        writer.write_f32::<LittleEndian>(self.time)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            position: read_vec3(reader)?,
            orientation: read_quat(reader)?,
            time: reader.read_f32::<LittleEndian>()?,
        })
    }
}
