use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DecodeError, Result};
use crate::reader::LittleEndianReader;
use crate::types::KeyTarget;

/// Encounter that blocks the party's path until its dialog has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub dialog: KeyTarget,
}

/// Decode a block table: a u32 count, then nine-byte records of three
/// opaque bytes, the dialog key and a u16 that is always zero.
pub fn decode_blocks(bytes: &[u8]) -> Result<Vec<Block>> {
    let mut r = LittleEndianReader::new(Cursor::new(bytes));
    let count = r.read_u32()?;
    let mut blocks = Vec::new();
    for _ in 0..count {
        r.skip(3)?;
        let target = r.read_u32()?;
        let address = r.position()?;
        let terminator = r.read_u16()?;
        if terminator != 0 {
            return Err(DecodeError::invariant(
                address,
                format!("block record ends with 0x{terminator:04x}, expected 0"),
            ));
        }
        blocks.push(Block {
            dialog: KeyTarget(target),
        });
    }
    Ok(blocks)
}

/// Load the block table of one tile. A tile with no data file has no
/// encounters; any other read failure is returned.
pub fn load_tile_blocks(path: &Path) -> Result<Vec<Block>> {
    match fs::read(path) {
        Ok(bytes) => decode_blocks(&bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no tile data, no encounters");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(target: u32, terminator: u16) -> Vec<u8> {
        let mut bytes = vec![0xaa, 0xbb, 0xcc];
        bytes.extend_from_slice(&target.to_le_bytes());
        bytes.extend_from_slice(&terminator.to_le_bytes());
        bytes
    }

    #[test]
    fn decodes_block_targets() {
        let mut bytes = 2u32.to_le_bytes().to_vec();
        bytes.extend(block(0x1c2d3, 0));
        bytes.extend(block(0x42, 0));

        let blocks = decode_blocks(&bytes).expect("blocks");
        assert_eq!(
            blocks.iter().map(|b| b.dialog).collect::<Vec<_>>(),
            vec![KeyTarget(0x1c2d3), KeyTarget(0x42)]
        );
    }

    #[test]
    fn non_zero_terminator_is_rejected() {
        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.extend(block(0x42, 1));
        assert!(matches!(
            decode_blocks(&bytes),
            Err(DecodeError::Invariant { address: 11, .. })
        ));
    }

    #[test]
    fn missing_tile_file_means_no_encounters() {
        let dir = std::env::temp_dir().join(format!("krondor_tile_{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");

        let missing = dir.join("T0101.DAT");
        let _ = fs::remove_file(&missing);
        assert!(load_tile_blocks(&missing).expect("missing tile").is_empty());

        let present = dir.join("T0102.DAT");
        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.extend(block(0x99, 0));
        fs::write(&present, bytes).expect("tile file");
        let blocks = load_tile_blocks(&present).expect("tile blocks");
        assert_eq!(blocks, vec![Block { dialog: KeyTarget(0x99) }]);
    }
}
