//! Chunked binary asset container
//!
//! Skin files carry a digested mesh plus its reference skeleton; anim
//! files carry bone names, clip descriptors and a flat key stream. Both
//! are sequences of tagged chunks:
//!
//! ```text
//! offset size field
//! 0      20   tag        ASCII, NUL-padded
//! 20     4    type_flag  format version on the head chunk, 0 elsewhere
//! 24     4    data_size  size of one element in bytes
//! 28     4    data_count number of elements
//! ```
//!
//! All integers and floats are little-endian. Element sizes are checked
//! on both sides: the writer asserts the encoded payload matches the
//! declared layout, the reader refuses a chunk whose header disagrees
//! with the expected record size.

pub mod anim;
pub mod chunk;
pub mod records;
pub mod skin;

pub use anim::AnimFile;
pub use chunk::{ChunkHeader, ChunkReader, ChunkTag, ChunkWriter, FORMAT_VERSION};
pub use records::{
    ClipInfo, Face, JointPos, Material, Point, QuatKey, RawInfluence, Record, RefBone, Wedge,
};
pub use skin::SkinFile;
