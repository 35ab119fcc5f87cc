//! Fatal configuration errors raised while building a world.

use std::{io, path::PathBuf};

use isocity_core::{BuildingId, Zoom};
use thiserror::Error;

/// Errors that abort world construction or reveal a broken building database.
///
/// Placement failures are not represented here; they are ordinary
/// [`isocity_core::PlacementError`] values.
#[derive(Debug, Error)]
pub enum WorldError {
    /// A file could not be read or written.
    #[error("failed to access {path}")]
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A document was not valid JSON for its expected shape.
    #[error("failed to parse {what}")]
    Json {
        /// Description of the document, usually its path.
        what: String,
        /// Underlying parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// The map declares a non-positive width or height.
    #[error("map dimensions {width}x{height} are invalid")]
    InvalidDimensions {
        /// Declared width.
        width: i64,
        /// Declared height.
        height: i64,
    },
    /// The map does not declare exactly a terrain and a buildings layer.
    #[error("map declares {found} layers, expected exactly 2")]
    LayerCount {
        /// Number of layers found.
        found: usize,
    },
    /// A layer entry does not hold exactly one named tile array.
    #[error("layer entry {index} must contain exactly one named tile array")]
    MalformedLayer {
        /// Position of the entry in the layer list.
        index: usize,
    },
    /// A layer name other than `terrain` or `buildings`.
    #[error("unknown layer `{name}`")]
    UnknownLayer {
        /// Offending name.
        name: String,
    },
    /// The same layer name appears twice.
    #[error("layer `{name}` is declared more than once")]
    DuplicateLayer {
        /// Offending name.
        name: String,
    },
    /// A layer's tile count differs from width×height.
    #[error("layer `{layer}` holds {found} tiles, expected {expected}")]
    TileCount {
        /// Layer name.
        layer: String,
        /// width×height.
        expected: usize,
        /// Tiles present.
        found: usize,
    },
    /// A tile references a negative id other than the empty sentinel.
    #[error("tile {index} of layer `{layer}` has invalid building id {id}")]
    InvalidBuildingId {
        /// Layer name.
        layer: String,
        /// Storage index of the tile.
        index: usize,
        /// Offending id.
        id: i64,
    },
    /// A tile orientation outside `0..=3`.
    #[error("tile {index} of layer `{layer}` has invalid rotation {value}")]
    InvalidOrientation {
        /// Layer name.
        layer: String,
        /// Storage index of the tile.
        index: usize,
        /// Offending value.
        value: u32,
    },
    /// A building id is missing from the building table.
    #[error("building {} is not defined in the building table", .id.get())]
    UnknownBuilding {
        /// Unresolved id.
        id: BuildingId,
    },
    /// The building table defines an id twice.
    #[error("building {} is defined more than once", .id.get())]
    DuplicateBuilding {
        /// Repeated id.
        id: BuildingId,
    },
    /// A sprite number is missing from the atlas at the given zoom.
    #[error("sprite {gfx} has no atlas entry at zoom {}", .zoom.name())]
    UnknownSprite {
        /// Unresolved sprite number.
        gfx: u32,
        /// Zoom level that was queried.
        zoom: Zoom,
    },
}
