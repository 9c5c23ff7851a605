//! Single-line conduit layout strings for sharing builds between sessions.

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use chrono_weave_core::{CellCoord, Command, ConduitKind, Grid};
use serde::{Deserialize, Serialize};

const LAYOUT_DOMAIN: &str = "weave";
const LAYOUT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded layout payload.
pub(crate) const LAYOUT_HEADER: &str = "weave:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Conduits placed on a grid of a given size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ConduitLayout {
    /// Side length of the grid the layout was captured from.
    pub(crate) size: u32,
    /// Conduits composing the layout, in row-major order.
    pub(crate) conduits: Vec<PlacedConduit>,
}

impl ConduitLayout {
    /// Captures every conduit currently placed on `grid`.
    #[must_use]
    pub(crate) fn capture(grid: &Grid) -> Self {
        let conduits = grid
            .iter()
            .filter_map(|(cell, state)| {
                state
                    .conduit()
                    .map(|(kind, _)| PlacedConduit { kind, cell })
            })
            .collect();
        Self {
            size: grid.size(),
            conduits,
        }
    }

    /// Placement commands that rebuild the layout on an empty grid.
    #[must_use]
    pub(crate) fn commands(&self) -> Vec<Command> {
        self.conduits
            .iter()
            .map(|conduit| Command::PlaceConduit {
                cell: conduit.cell,
                kind: conduit.kind,
            })
            .collect()
    }

    /// Encodes the layout into a single-line string suitable for clipboard transfer.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = SerializableLayout {
            conduits: self.conduits.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!("{LAYOUT_HEADER}:{0}x{0}:{encoded}", self.size))
    }

    /// Decodes a layout from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let dimensions = parts
            .next()
            .ok_or(LayoutTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != LAYOUT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != LAYOUT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let size = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableLayout =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        Ok(Self {
            size,
            conduits: decoded.conduits,
        })
    }
}

/// Conduit captured within a layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PlacedConduit {
    /// Variant of the conduit.
    pub(crate) kind: ConduitKind,
    /// Cell occupied by the conduit.
    pub(crate) cell: CellCoord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableLayout {
    conduits: Vec<PlacedConduit>,
}

/// Errors that can occur while encoding or decoding layout strings.
#[derive(Debug)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the layout string.
    MissingPrefix,
    /// The layout string did not contain a version segment.
    MissingVersion,
    /// The layout string did not include grid dimensions.
    MissingDimensions,
    /// The layout string did not include the payload segment.
    MissingPayload,
    /// The layout string used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The layout string used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions were malformed or not square.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The payload could not be (de)serialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for LayoutTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "layout string was empty"),
            Self::MissingPrefix => write!(f, "layout string is missing the prefix"),
            Self::MissingVersion => write!(f, "layout string is missing the version"),
            Self::MissingDimensions => write!(f, "layout string is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "layout string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "layout prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "layout version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse square grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode layout payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not process layout payload: {error}")
            }
        }
    }
}

impl Error for LayoutTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<u32, LayoutTransferError> {
    let invalid = || LayoutTransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || columns != rows {
        return Err(invalid());
    }

    Ok(columns)
}
