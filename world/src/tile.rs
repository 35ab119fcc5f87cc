//! Grid cell data and its per-rotation precomputation.

use glam::Vec2;
use isocity_core::{rotate_position, Building, BuildingId, GridDimensions, Rotation, WorldPosition, Zoom};

use crate::{resources::BuildingLookup, WorldError};

/// A single grid cell of a layer.
///
/// Geometry for every zoom and rotation is computed once by
/// [`Tile::pre_calc`] and only recomputed when the cell's building changes.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    position: WorldPosition,
    building: Option<BuildingId>,
    orientation: Rotation,
    footprint_offset: WorldPosition,
    screen_positions: [[Vec2; Rotation::COUNT]; Zoom::COUNT],
    indices: [usize; Rotation::COUNT],
    gfxs: Vec<u32>,
}

impl Tile {
    /// Creates a cell that has not been precomputed yet.
    ///
    /// `footprint_offset` locates the cell inside the tiles covered by its
    /// building, measured in world space from the footprint's upper-left
    /// tile.
    #[must_use]
    pub fn new(
        building: Option<BuildingId>,
        orientation: Rotation,
        footprint_offset: WorldPosition,
    ) -> Self {
        Self {
            position: WorldPosition::default(),
            building,
            orientation,
            footprint_offset,
            screen_positions: [[Vec2::ZERO; Rotation::COUNT]; Zoom::COUNT],
            indices: [0; Rotation::COUNT],
            gfxs: Vec::new(),
        }
    }

    /// Creates a cell without a building.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(None, Rotation::Deg0, WorldPosition::default())
    }

    /// Stores the world position and derives screen positions, draw-order
    /// keys and sprite candidates.
    ///
    /// The candidate list holds the base sprite and, for buildings with a
    /// rotation stride, the three sprites seen after each further quarter
    /// turn.
    pub fn pre_calc(
        &mut self,
        position: WorldPosition,
        dimensions: GridDimensions,
        buildings: &dyn BuildingLookup,
    ) -> Result<(), WorldError> {
        self.position = position;
        for zoom in Zoom::ALL {
            for rotation in Rotation::ALL {
                self.screen_positions[zoom.index()][rotation.index()] =
                    dimensions.world_to_screen(position, zoom, rotation);
            }
        }
        for rotation in Rotation::ALL {
            self.indices[rotation.index()] = dimensions.map_index(position, rotation);
        }

        self.gfxs.clear();
        if let Some(id) = self.building {
            let building = buildings.require(id)?;
            self.gfxs.push(building.gfx);
            if building.has_rotation_variants() {
                for step in 1..Rotation::COUNT as u32 {
                    self.gfxs.push(building.gfx + step * building.rotate);
                }
            }
        }
        Ok(())
    }

    /// Replaces the cell's building. Call [`Tile::pre_calc`] afterwards.
    pub(crate) fn assign(
        &mut self,
        building: Option<BuildingId>,
        orientation: Rotation,
        footprint_offset: WorldPosition,
    ) {
        self.building = building;
        self.orientation = orientation;
        self.footprint_offset = footprint_offset;
    }

    /// World position in the unrotated frame.
    #[must_use]
    pub const fn position(&self) -> WorldPosition {
        self.position
    }

    /// Building standing on the cell, if any.
    #[must_use]
    pub const fn building(&self) -> Option<BuildingId> {
        self.building
    }

    /// Whether a building stands on the cell.
    #[must_use]
    pub const fn has_building(&self) -> bool {
        self.building.is_some()
    }

    /// Facing of the building, independent of the camera.
    #[must_use]
    pub const fn orientation(&self) -> Rotation {
        self.orientation
    }

    /// Offset of the cell from its footprint's upper-left tile.
    #[must_use]
    pub const fn footprint_offset(&self) -> WorldPosition {
        self.footprint_offset
    }

    /// Top-left corner of the cell's bounding box on screen.
    #[must_use]
    pub const fn screen_position(&self, zoom: Zoom, rotation: Rotation) -> Vec2 {
        self.screen_positions[zoom.index()][rotation.index()]
    }

    /// Draw-order key of the cell under the provided rotation.
    #[must_use]
    pub const fn index(&self, rotation: Rotation) -> usize {
        self.indices[rotation.index()]
    }

    /// Sprite candidates, one per quarter turn for buildings with a stride.
    #[must_use]
    pub fn gfxs(&self) -> &[u32] {
        &self.gfxs
    }

    /// Sprite drawn for this cell when the camera uses `rotation`.
    ///
    /// Buildings with a stride pick the variant facing
    /// `orientation + rotation`; others always use their base sprite. Cells
    /// of a multi-tile footprint add the index of their sub-sprite: the
    /// cell's offset inside the occupied footprint, turned by the camera
    /// rotation and read row-major, so sub-sprites follow draw order.
    ///
    /// # Panics
    ///
    /// Panics when called on a cell that has no building or that was not
    /// precomputed against `building`.
    #[must_use]
    pub fn sprite(&self, rotation: Rotation, building: &Building) -> u32 {
        assert_eq!(
            self.building,
            Some(building.id),
            "sprite requested with a foreign building definition"
        );
        let base = if building.has_rotation_variants() {
            self.gfxs[self.orientation.compose(rotation).index()]
        } else {
            self.gfxs[0]
        };
        if !building.size.is_multi_tile() {
            return base;
        }

        let occupied = building.size.rotated(self.orientation);
        let local = rotate_position(
            self.footprint_offset,
            occupied.width(),
            occupied.height(),
            rotation,
        );
        let frame_width = occupied.rotated(rotation).width();
        base + (local.y() * frame_width + local.x()) as u32
    }
}
