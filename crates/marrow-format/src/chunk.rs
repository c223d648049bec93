//! Chunk tags, headers, and the typed chunk reader/writer

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use marrow_core::{Error, Result};

use crate::records::Record;

/// Version sentinel carried in the type_flag of head chunks
pub const FORMAT_VERSION: i32 = 1999801;

/// Size of the fixed tag field in a chunk header
pub const TAG_LEN: usize = 20;

/// Chunk tags appearing in skin and anim files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkTag {
    /// Skin file head marker (no payload)
    SkinHead,
    /// Mesh points
    Points,
    /// Mesh wedges
    Wedges,
    /// Triangles
    Faces,
    /// Materials
    Materials,
    /// Reference skeleton bones
    RefSkeleton,
    /// Raw bone influences
    RawWeights,
    /// Anim file head marker (no payload)
    AnimHead,
    /// Skeleton bone names and hierarchy
    BoneNames,
    /// Per-clip descriptors
    AnimInfo,
    /// Flat key stream, all clips concatenated
    AnimKeys,
}

impl ChunkTag {
    /// The on-disk tag string
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkTag::SkinHead => "ACTRHEAD",
            ChunkTag::Points => "PNTS0000",
            ChunkTag::Wedges => "VTXW0000",
            ChunkTag::Faces => "FACE0000",
            ChunkTag::Materials => "MATT0000",
            ChunkTag::RefSkeleton => "REFSKELT",
            ChunkTag::RawWeights => "RAWWEIGHTS",
            ChunkTag::AnimHead => "ANIMHEAD",
            ChunkTag::BoneNames => "BONENAMES",
            ChunkTag::AnimInfo => "ANIMINFO",
            ChunkTag::AnimKeys => "ANIMKEYS",
        }
    }

    /// Parse a NUL-padded 20-byte tag field
    pub fn from_bytes(raw: &[u8; TAG_LEN]) -> Option<Self> {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(TAG_LEN);
        match &raw[..end] {
            b"ACTRHEAD" => Some(ChunkTag::SkinHead),
            b"PNTS0000" => Some(ChunkTag::Points),
            b"VTXW0000" => Some(ChunkTag::Wedges),
            b"FACE0000" => Some(ChunkTag::Faces),
            b"MATT0000" => Some(ChunkTag::Materials),
            b"REFSKELT" => Some(ChunkTag::RefSkeleton),
            b"RAWWEIGHTS" => Some(ChunkTag::RawWeights),
            b"ANIMHEAD" => Some(ChunkTag::AnimHead),
            b"BONENAMES" => Some(ChunkTag::BoneNames),
            b"ANIMINFO" => Some(ChunkTag::AnimInfo),
            b"ANIMKEYS" => Some(ChunkTag::AnimKeys),
            _ => None,
        }
    }

    /// Encode as the fixed 20-byte tag field
    pub fn to_bytes(self) -> [u8; TAG_LEN] {
        let mut out = [0u8; TAG_LEN];
        let s = self.as_str().as_bytes();
        out[..s.len()].copy_from_slice(s);
        out
    }

    /// Head chunks carry the version sentinel and no payload
    pub fn is_head(self) -> bool {
        matches!(self, ChunkTag::SkinHead | ChunkTag::AnimHead)
    }
}

/// 32-byte chunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Chunk tag
    pub tag: ChunkTag,
    /// Version sentinel on head chunks, 0 elsewhere
    pub type_flag: i32,
    /// Size of one payload element in bytes
    pub data_size: i32,
    /// Number of payload elements
    pub data_count: i32,
}

impl ChunkHeader {
    /// Encoded header size
    pub const SIZE: usize = TAG_LEN + 12;

    /// Read a header, reporting the raw tag when it is unknown
    pub fn read<R: Read>(reader: &mut R, offset: u64) -> Result<Self> {
        let mut raw_tag = [0u8; TAG_LEN];
        reader
            .read_exact(&mut raw_tag)
            .map_err(|_| Error::UnexpectedEof { offset })?;

        let tag = ChunkTag::from_bytes(&raw_tag).ok_or_else(|| Error::UnexpectedTag {
            expected: "a known chunk tag".into(),
            found: String::from_utf8_lossy(&raw_tag)
                .trim_end_matches('\0')
                .to_string(),
        })?;

        let type_flag = reader.read_i32::<LittleEndian>()?;
        let data_size = reader.read_i32::<LittleEndian>()?;
        let data_count = reader.read_i32::<LittleEndian>()?;

        if data_size < 0 || data_count < 0 {
            return Err(Error::CorruptedChunk {
                tag: tag.as_str().into(),
                offset,
                message: format!("negative size or count ({data_size}, {data_count})"),
            });
        }

        Ok(Self { tag, type_flag, data_size, data_count })
    }

    /// Write the header
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.tag.to_bytes())?;
        writer.write_i32::<LittleEndian>(self.type_flag)?;
        writer.write_i32::<LittleEndian>(self.data_size)?;
        writer.write_i32::<LittleEndian>(self.data_count)?;
        Ok(())
    }
}

/// Writes typed chunks, asserting the declared element layout
pub struct ChunkWriter<W: Write> {
    inner: W,
}

impl<W: Write> ChunkWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write a payload-free head chunk carrying the version sentinel
    pub fn write_head(&mut self, tag: ChunkTag) -> Result<()> {
        ChunkHeader {
            tag,
            type_flag: FORMAT_VERSION,
            data_size: 0,
            data_count: 0,
        }
        .write(&mut self.inner)
    }

    /// Write a record chunk
    ///
    /// The payload is encoded through the record layout first; a length
    /// that disagrees with `R::SIZE * count` is an internal error, never
    /// silently written.
    pub fn write_records<T: Record>(&mut self, tag: ChunkTag, records: &[T]) -> Result<()> {
        let mut payload = Vec::with_capacity(T::SIZE * records.len());
        for record in records {
            record.encode(&mut payload)?;
        }

        if payload.len() != T::SIZE * records.len() {
            return Err(Error::internal(format!(
                "chunk {}: encoded {} bytes for {} records of size {}",
                tag.as_str(),
                payload.len(),
                records.len(),
                T::SIZE
            )));
        }

        let count = i32::try_from(records.len()).map_err(|_| {
            Error::structural(format!("chunk {}: too many elements", tag.as_str()))
        })?;

        ChunkHeader {
            tag,
            type_flag: 0,
            data_size: T::SIZE as i32,
            data_count: count,
        }
        .write(&mut self.inner)?;
        self.inner.write_all(&payload)?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Upper bound on records preallocated from a declared count; anything
/// beyond this grows as the decode loop actually produces elements
const PREALLOC_RECORDS: usize = 1 << 16;

/// Reads typed chunks, refusing tag or element-size mismatches
pub struct ChunkReader<R: Read> {
    inner: R,
    offset: u64,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Current byte offset, for error reporting
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn read_header(&mut self, expected: ChunkTag) -> Result<ChunkHeader> {
        let header = ChunkHeader::read(&mut self.inner, self.offset)?;
        self.offset += ChunkHeader::SIZE as u64;

        if header.tag != expected {
            return Err(Error::UnexpectedTag {
                expected: expected.as_str().into(),
                found: header.tag.as_str().into(),
            });
        }
        Ok(header)
    }

    /// Consume a payload-free head chunk
    pub fn expect_head(&mut self, tag: ChunkTag) -> Result<()> {
        let header = self.read_header(tag)?;
        if header.data_size != 0 && header.data_count != 0 {
            // tolerate sloppy writers, but skip whatever they put there
            let skip = header.data_size as u64 * header.data_count as u64;
            std::io::copy(&mut self.inner.by_ref().take(skip), &mut std::io::sink())?;
            self.offset += skip;
        }
        Ok(())
    }

    /// Read a record chunk, checking the declared element size against
    /// the record layout
    pub fn read_records<T: Record>(&mut self, tag: ChunkTag) -> Result<Vec<T>> {
        let header = self.read_header(tag)?;

        if header.data_size as usize != T::SIZE {
            return Err(Error::ElementSizeMismatch {
                tag: tag.as_str().into(),
                expected: T::SIZE as u32,
                found: header.data_size as u32,
            });
        }

        // A hostile count is caught by the decode loop hitting EOF, so
        // never hand the raw header value to the allocator
        let count = header.data_count as usize;
        let mut records = Vec::with_capacity(count.min(PREALLOC_RECORDS));
        for _ in 0..count {
            let record = T::decode(&mut self.inner).map_err(|e| {
                Error::CorruptedChunk {
                    tag: tag.as_str().into(),
                    offset: self.offset,
                    message: e.to_string(),
                }
            })?;
            self.offset += T::SIZE as u64;
            records.push(record);
        }
        Ok(records)
    }

    /// Verify there is nothing after the final chunk
    pub fn expect_eof(&mut self) -> Result<()> {
        let mut probe = [0u8; 1];
        match self.inner.read(&mut probe)? {
            0 => Ok(()),
            _ => Err(Error::CorruptedChunk {
                tag: String::new(),
                offset: self.offset,
                message: "trailing data after final chunk".into(),
            }),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Point;
    use proptest::prelude::*;

    #[test]
    fn test_tag_roundtrip() {
        let tags = [
            ChunkTag::SkinHead,
            ChunkTag::Points,
            ChunkTag::RawWeights,
            ChunkTag::AnimKeys,
        ];

        for tag in tags {
            let bytes = tag.to_bytes();
            let restored = ChunkTag::from_bytes(&bytes);
            assert_eq!(restored, Some(tag));
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut raw = [0u8; TAG_LEN];
        raw[..4].copy_from_slice(b"WHAT");
        assert_eq!(ChunkTag::from_bytes(&raw), None);
    }

    #[test]
    fn test_element_size_mismatch_is_hard_error() {
        let mut buf = Vec::new();
        ChunkHeader {
            tag: ChunkTag::Points,
            type_flag: 0,
            data_size: 8, // Point is 12
            data_count: 1,
        }
        .write(&mut buf)
        .unwrap();
        buf.extend_from_slice(&[0u8; 8]);

        let mut reader = ChunkReader::new(buf.as_slice());
        let err = reader.read_records::<Point>(ChunkTag::Points).unwrap_err();
        assert!(matches!(
            err,
            marrow_core::Error::ElementSizeMismatch { expected: 12, found: 8, .. }
        ));
    }

    #[test]
    fn test_huge_declared_count_fails_at_eof() {
        let mut buf = Vec::new();
        ChunkHeader {
            tag: ChunkTag::Points,
            type_flag: 0,
            data_size: 12,
            data_count: i32::MAX,
        }
        .write(&mut buf)
        .unwrap();

        // No payload follows: the first decode must fail on EOF without
        // ever reserving space for the declared two billion records
        let mut reader = ChunkReader::new(buf.as_slice());
        let err = reader.read_records::<Point>(ChunkTag::Points).unwrap_err();
        assert!(matches!(err, marrow_core::Error::CorruptedChunk { .. }));
    }

    #[test]
    fn test_wrong_tag_rejected() {
        let mut buf = Vec::new();
        ChunkWriter::new(&mut buf).write_head(ChunkTag::AnimHead).unwrap();

        let mut reader = ChunkReader::new(buf.as_slice());
        let err = reader.expect_head(ChunkTag::SkinHead).unwrap_err();
        assert!(err.is_format_error());
    }

    proptest! {
        #[test]
        fn prop_header_roundtrip(type_flag in any::<i32>(), size in 0i32..1024, count in 0i32..4096) {
            let header = ChunkHeader {
                tag: ChunkTag::Wedges,
                type_flag,
                data_size: size,
                data_count: count,
            };

            let mut buf = Vec::new();
            header.write(&mut buf).unwrap();
            prop_assert_eq!(buf.len(), ChunkHeader::SIZE);

            let restored = ChunkHeader::read(&mut buf.as_slice(), 0).unwrap();
            prop_assert_eq!(restored, header);
        }
    }
}
