use std::collections::BTreeMap;
use std::io::Cursor;

use crate::error::Result;
use crate::reader::LittleEndianReader;

/// Id to name table, as found in `TAG:` sections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tags {
    tags: BTreeMap<u16, String>,
}

impl Tags {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = LittleEndianReader::new(Cursor::new(bytes));
        let count = r.read_u16()?;
        let mut tags = BTreeMap::new();
        for _ in 0..count {
            let id = r.read_u16()?;
            let name = r.read_c_string()?;
            tags.insert(id, name);
        }
        Ok(Self { tags })
    }

    pub fn tag(&self, id: u16) -> Option<&str> {
        self.tags.get(&id).map(String::as_str)
    }

    pub fn find_tag(&self, name: &str) -> Option<u16> {
        self.tags
            .iter()
            .find_map(|(&id, tag)| (tag == name).then_some(id))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_miss_without_failing() {
        let mut bytes = 2u16.to_le_bytes().to_vec();
        bytes.extend_from_slice(&7u16.to_le_bytes());
        bytes.extend_from_slice(b"gorath\0");
        bytes.extend_from_slice(&9u16.to_le_bytes());
        bytes.extend_from_slice(b"owyn\0");

        let tags = Tags::decode(&bytes).expect("tags");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.tag(7), Some("gorath"));
        assert_eq!(tags.tag(8), None);
        assert_eq!(tags.find_tag("owyn"), Some(9));
        assert_eq!(tags.find_tag("locklear"), None);
    }
}
