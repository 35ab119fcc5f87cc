#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that produces fresh island maps.
//!
//! An island is grass surrounded by a one tile wide beach. Beach tiles face
//! away from the land: the top row faces `DEG180`, the bottom row `DEG0`, the
//! left column `DEG90` and the right column `DEG270`. The four corners use a
//! dedicated corner tile.

use std::path::Path;

use isocity_core::{BuildingId, GridDimensions, Rotation, WorldPosition};
use isocity_world::{MapDocument, TileRecord, WorldError};
use tracing::{info, warn};

/// Terrain building ids used to paint an island.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IslandPalette {
    /// Interior tile.
    pub grass: BuildingId,
    /// Straight beach tile.
    pub coast: BuildingId,
    /// Beach corner tile.
    pub coast_corner: BuildingId,
}

/// Generates island map documents.
#[derive(Clone, Debug)]
pub struct MapGenerator {
    palette: IslandPalette,
}

impl MapGenerator {
    /// Creates a generator painting with the provided palette.
    #[must_use]
    pub const fn new(palette: IslandPalette) -> Self {
        Self { palette }
    }

    /// Builds an island covering the whole grid with an empty buildings layer.
    #[must_use]
    pub fn generate(&self, dimensions: GridDimensions) -> MapDocument {
        let terrain = (0..dimensions.tile_count())
            .map(|index| self.terrain_at(dimensions, dimensions.position_of(index)))
            .collect();
        MapDocument::new(
            dimensions,
            terrain,
            vec![TileRecord::empty(); dimensions.tile_count()],
        )
    }

    /// Writes a generated island to `path`.
    ///
    /// Existing files are left alone; returns whether a file was written.
    pub fn write(&self, dimensions: GridDimensions, path: &Path) -> Result<bool, WorldError> {
        if path.exists() {
            warn!(path = %path.display(), "map file already exists, skipping generation");
            return Ok(false);
        }
        self.generate(dimensions).save(path)?;
        info!(
            path = %path.display(),
            width = dimensions.width(),
            height = dimensions.height(),
            "generated island map"
        );
        Ok(true)
    }

    fn terrain_at(&self, dimensions: GridDimensions, position: WorldPosition) -> TileRecord {
        let (last_x, last_y) = (dimensions.width() - 1, dimensions.height() - 1);
        let (x, y) = (position.x(), position.y());
        let corner = match (x, y) {
            (0, 0) => Some(Rotation::Deg90),
            (x, 0) if x == last_x => Some(Rotation::Deg180),
            (x, y) if x == last_x && y == last_y => Some(Rotation::Deg270),
            (0, y) if y == last_y => Some(Rotation::Deg0),
            _ => None,
        };
        if let Some(orientation) = corner {
            return TileRecord::building(self.palette.coast_corner, orientation);
        }

        let edge = if y == 0 {
            Some(Rotation::Deg180)
        } else if y == last_y {
            Some(Rotation::Deg0)
        } else if x == 0 {
            Some(Rotation::Deg90)
        } else if x == last_x {
            Some(Rotation::Deg270)
        } else {
            None
        };
        match edge {
            Some(orientation) => TileRecord::building(self.palette.coast, orientation),
            None => TileRecord::building(self.palette.grass, Rotation::Deg0),
        }
    }
}
