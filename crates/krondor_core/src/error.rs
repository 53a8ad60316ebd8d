use std::io;

use thiserror::Error;

/// Coarse classification of a [`DecodeError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Io,
    Config,
    Structural,
    Catalog,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("unknown container type {tag} at 0x{address:x}")]
    UnknownContainerType { tag: u8, address: u64 },

    #[error("container header at 0x{address:x} has a {found} location, not a {expected} location")]
    LocationMismatch {
        expected: &'static str,
        found: &'static str,
        address: u64,
    },

    #[error("zone {0} is not supported")]
    UnsupportedZone(u8),

    #[error("event pointer 0x{base:x} + {index} is past the last flag")]
    EventPointerOverflow { base: u16, index: u16 },

    #[error("invariant violated at 0x{address:x}: {message}")]
    Invariant { address: u64, message: String },

    #[error("item index {item} at 0x{address:x} is not in the object catalog")]
    UnknownItem { item: u8, address: u64 },

    #[error("offset 0x{offset:x} is outside a buffer of {len} bytes")]
    OutOfRange { offset: u64, len: u64 },

    #[error("missing section {0}")]
    MissingSection(String),

    #[error("invalid layout: {0}")]
    Layout(String),
}

impl DecodeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::Io,
            Self::Config(_) | Self::Layout(_) => ErrorCode::Config,
            Self::UnknownItem { .. } => ErrorCode::Catalog,
            Self::UnknownContainerType { .. }
            | Self::LocationMismatch { .. }
            | Self::UnsupportedZone(_)
            | Self::EventPointerOverflow { .. }
            | Self::Invariant { .. }
            | Self::OutOfRange { .. }
            | Self::MissingSection(_) => ErrorCode::Structural,
        }
    }

    pub(crate) fn invariant(address: u64, message: impl Into<String>) -> Self {
        Self::Invariant {
            address,
            message: message.into(),
        }
    }
}

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;
