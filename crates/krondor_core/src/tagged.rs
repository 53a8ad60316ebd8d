//! Tagged resource files: a run of chunks, each a four-byte ASCII tag, a
//! little-endian u32 size and the payload. Bit 31 of the size marks a chunk
//! whose payload is itself a run of chunks.

use std::fmt;

use crate::error::{DecodeError, Result};

const CHUNK_HEADER_WIDTH: usize = 8;
const SIZE_MASK: u32 = 0x7fff_ffff;
const NESTED_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTag {
    Ads,
    App,
    Bin,
    Dat,
    Gid,
    Map,
    Res,
    Tag,
    Ttm,
    Ver,
}

impl DataTag {
    pub fn bytes(&self) -> &'static [u8; 4] {
        match self {
            Self::Ads => b"ADS:",
            Self::App => b"APP:",
            Self::Bin => b"BIN:",
            Self::Dat => b"DAT:",
            Self::Gid => b"GID:",
            Self::Map => b"MAP:",
            Self::Res => b"RES:",
            Self::Tag => b"TAG:",
            Self::Ttm => b"TT3:",
            Self::Ver => b"VER:",
        }
    }
}

impl fmt::Display for DataTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.bytes()))
    }
}

/// Payload of the first chunk tagged `tag`, searching nested chunks too.
/// A truncated chunk ends the search.
pub fn find_section(bytes: &[u8], tag: DataTag) -> Option<&[u8]> {
    let wanted = tag.bytes();
    let mut pos = 0;
    while pos + CHUNK_HEADER_WIDTH <= bytes.len() {
        let chunk_tag = &bytes[pos..pos + 4];
        let raw = u32::from_le_bytes([
            bytes[pos + 4],
            bytes[pos + 5],
            bytes[pos + 6],
            bytes[pos + 7],
        ]);
        let start = pos + CHUNK_HEADER_WIDTH;
        let end = start.checked_add((raw & SIZE_MASK) as usize)?;
        let payload = bytes.get(start..end)?;

        if chunk_tag == wanted {
            return Some(payload);
        }
        if raw & NESTED_FLAG != 0
            && let Some(found) = find_section(payload, tag)
        {
            return Some(found);
        }
        pos = end;
    }
    None
}

pub fn require_section(bytes: &[u8], tag: DataTag) -> Result<&[u8]> {
    find_section(bytes, tag).ok_or_else(|| DecodeError::MissingSection(tag.to_string()))
}
