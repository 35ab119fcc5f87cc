#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the isometric city engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! The [`geometry`] module carries the rotation, zoom and isometric
//! projection math every other crate agrees on.

pub mod geometry;

use serde::{Deserialize, Serialize};

pub use geometry::{
    rotate_position, unrotate_position, ChangeRotation, ChangeZoom, GridDimensions, Rotation,
    WorldPosition, Zoom,
};

/// Interaction mode selected by the player. Exactly one is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Placing buildings.
    #[default]
    Build,
    /// Removing buildings.
    Demolish,
    /// Inspecting tiles.
    Status,
    /// Settings panel.
    Options,
}

const ACTION_LABELS: [&str; Action::COUNT] = ["Build", "Demolish", "Status", "Options"];

impl Action {
    /// Number of distinct actions.
    pub const COUNT: usize = 4;

    /// Every action in menu order.
    pub const ALL: [Action; Action::COUNT] =
        [Self::Build, Self::Demolish, Self::Status, Self::Options];

    /// Zero-based position in menu order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Build => 0,
            Self::Demolish => 1,
            Self::Status => 2,
            Self::Options => 3,
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        ACTION_LABELS[self.index()]
    }

    /// Parses a label produced by [`Action::label`], ignoring ASCII case.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        ACTION_LABELS
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(label))
            .map(|index| Self::ALL[index])
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Turns the camera a quarter turn.
    RotateWorld {
        /// Direction of the turn.
        change: ChangeRotation,
    },
    /// Moves the camera one zoom level.
    ZoomWorld {
        /// Direction of the zoom step.
        change: ChangeZoom,
    },
    /// Switches the active interaction mode.
    SetAction {
        /// Mode to activate.
        action: Action,
    },
    /// Chooses the building the player intends to place, or clears the choice.
    SelectBuilding {
        /// Building and facing to stage for placement.
        selection: Option<BuildingSelection>,
    },
    /// Turns the staged building a quarter turn.
    RotateSelection {
        /// Direction of the turn.
        change: ChangeRotation,
    },
    /// Reports the world tile currently under the cursor.
    MouseMoved {
        /// Tile under the cursor, `None` when the cursor left the world.
        position: Option<WorldPosition>,
    },
    /// Reports a primary click resolved to a world tile.
    LeftMouseButtonPressed {
        /// Tile that was clicked.
        position: WorldPosition,
    },
    /// Requests placement of a building anchored at the provided origin.
    PlaceBuilding {
        /// Building and facing to place.
        selection: BuildingSelection,
        /// Upper-left tile of the footprint.
        origin: WorldPosition,
    },
    /// Requests removal of the building covering the provided tile.
    DemolishBuilding {
        /// Any tile of the building's footprint.
        position: WorldPosition,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The camera rotation changed.
    RotationChanged {
        /// Rotation now in effect.
        rotation: Rotation,
    },
    /// The zoom level changed.
    ZoomChanged {
        /// Zoom level now in effect.
        zoom: Zoom,
    },
    /// The interaction mode changed.
    ActionChanged {
        /// Mode now in effect.
        action: Action,
    },
    /// The staged building changed.
    SelectionChanged {
        /// Staged building, if any.
        selection: Option<BuildingSelection>,
    },
    /// A tile was selected for inspection.
    TileInspected {
        /// Tile that was selected.
        position: WorldPosition,
        /// Storage index of the tile.
        index: usize,
    },
    /// A building was written into the world.
    BuildingPlaced {
        /// Building and facing that were placed.
        selection: BuildingSelection,
        /// Upper-left tile of the footprint.
        origin: WorldPosition,
        /// Tiles covered by the building.
        cells: Vec<WorldPosition>,
    },
    /// A placement request was rejected. The world did not change.
    BuildingPlacementRejected {
        /// Building and facing that were requested.
        selection: BuildingSelection,
        /// Requested upper-left tile.
        origin: WorldPosition,
        /// Why the request failed.
        reason: PlacementError,
    },
    /// A building was removed from the world.
    BuildingDemolished {
        /// Identifier of the removed building.
        building: BuildingId,
        /// Upper-left tile of the former footprint.
        origin: WorldPosition,
        /// Tiles the building covered.
        cells: Vec<WorldPosition>,
    },
    /// A demolition request was rejected. The world did not change.
    DemolitionRejected {
        /// Requested tile.
        position: WorldPosition,
        /// Why the request failed.
        reason: DemolitionError,
    },
}

/// Identifier of a building definition in the building table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(u32);

impl BuildingId {
    /// Creates a new building identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Footprint of a building measured in whole tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FootprintSize {
    width: i32,
    height: i32,
}

impl FootprintSize {
    /// Creates a new footprint size.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Extent along the x axis.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Extent along the y axis.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Footprint after turning the building. Odd rotations swap the extents.
    #[must_use]
    pub const fn rotated(self, rotation: Rotation) -> Self {
        if rotation.is_odd() {
            Self::new(self.height, self.width)
        } else {
            self
        }
    }

    /// Whether the footprint covers more than one tile.
    #[must_use]
    pub const fn is_multi_tile(&self) -> bool {
        self.width > 1 || self.height > 1
    }
}

/// Terrain or structure category of a building definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// Buildable land such as grass or forest floor.
    Ground,
    /// Beach tiles along the shore.
    Coast,
    /// Breaking waves between coast and sea.
    Surf,
    /// Open water.
    Sea,
    /// Inland water.
    River,
    /// Impassable rock.
    Rock,
    /// Streets and paths.
    Road,
    /// Production buildings.
    Workshop,
    /// Anything else.
    Other,
}

impl BuildingKind {
    /// Whether the kind describes water or shoreline terrain.
    #[must_use]
    pub const fn is_water_or_coast(self) -> bool {
        matches!(self, Self::Coast | Self::Surf | Self::Sea | Self::River)
    }
}

/// Immutable definition of a building, loaded once from the building table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Identifier used by map tiles.
    pub id: BuildingId,
    /// Sprite number of the first variant.
    pub gfx: u32,
    /// Tiles covered when facing `DEG0`.
    pub size: FootprintSize,
    /// Sprite increment per quarter turn. Zero when the building has a
    /// single appearance.
    #[serde(default)]
    pub rotate: u32,
    /// Vertical sprite offset in pixels at full zoom.
    #[serde(default)]
    pub posoffs: i32,
    /// Category used by placement rules.
    pub kind: BuildingKind,
    /// Whether the building must stand on water or coast.
    #[serde(default)]
    pub coastal: bool,
}

impl Building {
    /// Whether each quarter turn shows a different sprite.
    #[must_use]
    pub const fn has_rotation_variants(&self) -> bool {
        self.rotate > 0
    }
}

/// Building staged for placement together with its facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingSelection {
    building: BuildingId,
    orientation: Rotation,
}

impl BuildingSelection {
    /// Creates a new selection.
    #[must_use]
    pub const fn new(building: BuildingId, orientation: Rotation) -> Self {
        Self {
            building,
            orientation,
        }
    }

    /// Identifier of the staged building.
    #[must_use]
    pub const fn building(&self) -> BuildingId {
        self.building
    }

    /// Facing of the staged building, independent of the camera.
    #[must_use]
    pub const fn orientation(&self) -> Rotation {
        self.orientation
    }

    /// Same building turned a quarter turn.
    #[must_use]
    pub const fn turned(self, change: ChangeRotation) -> Self {
        Self::new(self.building, self.orientation.changed(change))
    }
}

/// Reasons a building placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The world is not in build mode, so placement is disabled.
    InvalidMode,
    /// The footprint extends beyond the world bounds.
    OutOfBounds,
    /// A land building would cover water or coast.
    OnWaterOrCoast,
    /// The footprint overlaps an existing building.
    Occupied,
}

/// Reasons a demolition request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemolitionError {
    /// The world is not in demolish mode.
    InvalidMode,
    /// The position lies outside the world.
    OutOfBounds,
    /// No building covers the position.
    MissingBuilding,
}

/// Outcome of validating the staged building at the hovered tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementPreview {
    /// Building and facing being previewed.
    pub selection: BuildingSelection,
    /// Upper-left tile of the footprint.
    pub origin: WorldPosition,
    /// Footprint tiles that fall inside the world.
    pub cells: Vec<WorldPosition>,
    /// Why placing here would fail, `None` if it would succeed.
    pub rejection: Option<PlacementError>,
}

impl PlacementPreview {
    /// Whether confirming the preview would place the building.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.rejection.is_none()
    }
}
