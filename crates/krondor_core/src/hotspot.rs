use std::fmt;
use std::io::Cursor;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::reader::LittleEndianReader;
use crate::types::KeyTarget;

const RESOURCE_NAME_WIDTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HotspotAction {
    Dialog,
    Exit,
    Goto,
    Barmaid,
    Shop,
    Inn,
    Container,
    Lute,
    Teleport,
    Temple,
    NotSure,
    Repair,
    Unknown(u16),
}

impl HotspotAction {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            2 => Self::Dialog,
            3 => Self::Exit,
            4 => Self::Goto,
            5 => Self::Barmaid,
            6 => Self::Shop,
            7 => Self::Inn,
            8 => Self::Container,
            9 => Self::Lute,
            11 => Self::Teleport,
            13 => Self::Temple,
            15 => Self::NotSure,
            16 => Self::Repair,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(&self) -> u16 {
        match *self {
            Self::Dialog => 2,
            Self::Exit => 3,
            Self::Goto => 4,
            Self::Barmaid => 5,
            Self::Shop => 6,
            Self::Inn => 7,
            Self::Container => 8,
            Self::Lute => 9,
            Self::Teleport => 11,
            Self::Temple => 13,
            Self::NotSure => 15,
            Self::Repair => 16,
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for HotspotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Unknown(v) => write!(f, "Unknown ({v})"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    pub index: u16,
    pub top_left: (u16, u16),
    pub dimensions: (u16, u16),
    pub keyword: u16,
    pub action: HotspotAction,
    pub action_arg1: u32,
    pub action_arg2: u32,
    pub tooltip: KeyTarget,
    pub dialog: KeyTarget,
}

/// Clickable regions of a building-interior scene (`.GDS`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneHotspots {
    pub scene_ttm: String,
    pub scene_ads: String,
    pub scene_index1: u16,
    pub scene_index2: u16,
    pub flavour_text: KeyTarget,
    pub hotspots: Vec<Hotspot>,
}

impl SceneHotspots {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = LittleEndianReader::new(Cursor::new(bytes));
        let _length = r.read_u16()?;
        let resource = r.read_fixed_string(RESOURCE_NAME_WIDTH)?.to_uppercase();
        r.skip(4 + 2 + 4 + 5)?;
        let scene_index1 = r.read_u16()?;
        r.skip(2)?;
        let scene_index2 = r.read_u16()?;
        let count = r.read_u16()?;
        let flavour_text = KeyTarget(r.read_u32()?);
        r.skip(4 + 4)?;
        debug!(%resource, scene_index1, scene_index2, count, "scene hotspots");

        let mut hotspots = Vec::with_capacity(usize::from(count));
        for index in 0..count {
            let x = r.read_u16()?;
            let y = r.read_u16()?;
            let w = r.read_u16()?;
            let h = r.read_u16()?;
            r.skip(2)?;
            let keyword = r.read_u16()?;
            let action = HotspotAction::from_raw(r.read_u16()?);
            let action_arg1 = r.read_u32()?;
            let action_arg2 = r.read_u32()?;
            let tooltip = KeyTarget(r.read_u32()?);
            r.skip(4)?;
            let dialog = KeyTarget(r.read_u32()?);
            r.skip(2)?;
            hotspots.push(Hotspot {
                index,
                top_left: (x, y),
                dimensions: (w, h),
                keyword,
                action,
                action_arg1,
                action_arg2,
                tooltip,
                dialog,
            });
        }

        Ok(Self {
            scene_ttm: format!("{resource}.TTM"),
            scene_ads: format!("{resource}.ADS"),
            scene_index1,
            scene_index2,
            flavour_text,
            hotspots,
        })
    }
}
