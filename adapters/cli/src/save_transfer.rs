//! Single-line save strings for clipboard transfer of dungeon state.

#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use dungeon_warden_world::snapshot::DungeonSnapshot;
use dungeon_warden_world::{FLOOR_HEIGHT, FLOOR_WIDTH};

const SNAPSHOT_DOMAIN: &str = "dungeon";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub const SNAPSHOT_HEADER: &str = "dungeon:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Encodes a dungeon snapshot into a single-line save string.
#[must_use]
pub fn encode(snapshot: &DungeonSnapshot) -> String {
    let (width, height) = snapshot
        .floors
        .first()
        .map_or((FLOOR_WIDTH, FLOOR_HEIGHT), |floor| {
            (floor.width, floor.height)
        });
    let json = serde_json::to_vec(snapshot).expect("dungeon snapshot serialization never fails");
    let encoded = STANDARD_NO_PAD.encode(json);
    format!("{SNAPSHOT_HEADER}:{width}x{height}:{encoded}")
}

/// Decodes a snapshot from the provided save string.
pub fn decode(value: &str) -> Result<DungeonSnapshot, SaveTransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SaveTransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(SaveTransferError::MissingPrefix)?;
    let version = parts.next().ok_or(SaveTransferError::MissingVersion)?;
    let dimensions = parts.next().ok_or(SaveTransferError::MissingDimensions)?;
    let payload = parts.next().ok_or(SaveTransferError::MissingPayload)?;

    if domain != SNAPSHOT_DOMAIN {
        return Err(SaveTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != SNAPSHOT_VERSION {
        return Err(SaveTransferError::UnsupportedVersion(version.to_owned()));
    }

    let (width, height) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(SaveTransferError::InvalidEncoding)?;
    let decoded: DungeonSnapshot =
        serde_json::from_slice(&bytes).map_err(SaveTransferError::InvalidPayload)?;

    for floor in &decoded.floors {
        if floor.width != width || floor.height != height {
            return Err(SaveTransferError::DimensionMismatch {
                declared: (width, height),
                found: (floor.width, floor.height),
            });
        }
    }

    Ok(decoded)
}

/// Errors that can occur while decoding save strings.
#[derive(Debug)]
pub enum SaveTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the save string.
    MissingPrefix,
    /// The save string did not contain a version segment.
    MissingVersion,
    /// The save string did not include grid dimensions.
    MissingDimensions,
    /// The save string did not include the payload segment.
    MissingPayload,
    /// The save string used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The save string used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the save string.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
    /// A floor in the payload disagreed with the declared grid dimensions.
    DimensionMismatch {
        /// Dimensions declared in the save string header.
        declared: (u32, u32),
        /// Dimensions found on the offending floor.
        found: (u32, u32),
    },
}

impl fmt::Display for SaveTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "save string was empty"),
            Self::MissingPrefix => write!(f, "save string is missing the prefix"),
            Self::MissingVersion => write!(f, "save string is missing the version"),
            Self::MissingDimensions => write!(f, "save string is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "save string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "save prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "save version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode save payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse save payload: {error}")
            }
            Self::DimensionMismatch { declared, found } => {
                write!(
                    f,
                    "save declares a {}x{} grid but holds a {}x{} floor",
                    declared.0, declared.1, found.0, found.1
                )
            }
        }
    }
}

impl Error for SaveTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), SaveTransferError> {
    let (width, height) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| SaveTransferError::InvalidDimensions(dimensions.to_owned()))?;

    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|_| SaveTransferError::InvalidDimensions(dimensions.to_owned()))?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|_| SaveTransferError::InvalidDimensions(dimensions.to_owned()))?;

    if width == 0 || height == 0 {
        return Err(SaveTransferError::InvalidDimensions(
            dimensions.to_owned(),
        ));
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon_warden_core::{Command, FloorId, GridPos, Monster, Occupant};
    use dungeon_warden_world::{self as world, snapshot, Dungeon};

    #[test]
    fn round_trip_fresh_dungeon() {
        let snapshot = snapshot::capture(&Dungeon::new());

        let encoded = encode(&snapshot);
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:10x10:")));

        let decoded = decode(&encoded).expect("save string decodes");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn round_trip_multi_floor_dungeon() {
        let mut dungeon = Dungeon::new();
        let mut events = Vec::new();
        world::apply(&mut dungeon, Command::AddFloor, &mut events);
        world::apply(
            &mut dungeon,
            Command::PlaceOccupant {
                floor: FloorId::new(2),
                at: GridPos::new(4, 4),
                occupant: Occupant::Monster(Monster::from_level("Troll", 4)),
            },
            &mut events,
        );

        let snapshot = snapshot::capture(&dungeon);
        let decoded = decode(&encode(&snapshot)).expect("save string decodes");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn rejects_foreign_prefixes_and_versions() {
        let encoded = encode(&snapshot::capture(&Dungeon::new()));
        let foreign = encoded.replacen("dungeon", "cavern", 1);
        assert!(matches!(
            decode(&foreign),
            Err(SaveTransferError::InvalidPrefix(_))
        ));

        let outdated = encoded.replacen("v1", "v9", 1);
        assert!(matches!(
            decode(&outdated),
            Err(SaveTransferError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn rejects_garbage_payloads() {
        assert!(matches!(
            decode("   "),
            Err(SaveTransferError::EmptyPayload)
        ));
        assert!(matches!(
            decode("dungeon:v1:10x10:!!!not-base64!!!"),
            Err(SaveTransferError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decode("dungeon:v1:tenxten:abcd"),
            Err(SaveTransferError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn rejects_dimension_mismatches() {
        let encoded = encode(&snapshot::capture(&Dungeon::new()));
        let shrunk = encoded.replacen("10x10", "8x8", 1);
        assert!(matches!(
            decode(&shrunk),
            Err(SaveTransferError::DimensionMismatch { .. })
        ));
    }
}
