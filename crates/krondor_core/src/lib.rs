//! Decoding for Betrayal at Krondor save files and resource tables.
//!
//! [`GameData`] loads a whole save in one pass: party, world containers for
//! every zone and the building-interior shops. Event flags are read and
//! written in place on the save buffer through [`flags::EventFlags`].
//! Resource files (model tables, tag tables, scene hotspots, encounter
//! blocks) have their own decoders.

pub mod catalog;
pub mod character;
pub mod container;
pub mod encounter;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod fixture;
pub mod flags;
pub mod hotspot;
pub mod inventory;
pub mod layout;
pub mod model;
pub mod reader;
pub mod save;
pub mod tagged;
pub mod tags;
pub mod types;

pub use catalog::{ItemCatalog, ItemDefinition, ObjectCatalog};
pub use error::{DecodeError, ErrorCode, Result};
pub use layout::SaveLayout;
pub use model::ModelTable;
pub use save::GameData;
