//! Stateless placement checks run before a building is committed.

use isocity_core::{Building, GridDimensions, PlacementError, Rotation, WorldPosition};

use crate::{layer::Layer, resources::BuildingLookup, WorldError};

/// Tile of a footprint together with its offset from the upper-left tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FootprintCell {
    /// World position of the tile.
    pub position: WorldPosition,
    /// Offset from the footprint's upper-left tile.
    pub offset: WorldPosition,
}

/// Tiles covered by `building` anchored at `origin` and facing
/// `orientation`. Odd orientations swap the footprint's width and height.
pub fn footprint(
    origin: WorldPosition,
    building: &Building,
    orientation: Rotation,
) -> impl Iterator<Item = FootprintCell> {
    let occupied = building.size.rotated(orientation);
    (0..occupied.height()).flat_map(move |dy| {
        (0..occupied.width()).map(move |dx| FootprintCell {
            position: origin.offset(dx, dy),
            offset: WorldPosition::new(dx, dy),
        })
    })
}

/// Whether the position lies inside the world.
#[must_use]
pub fn is_position_in_world(dimensions: GridDimensions, position: WorldPosition) -> bool {
    dimensions.contains(position)
}

/// Whether any tile of the footprint falls outside the world.
#[must_use]
pub fn is_building_outside_the_world(
    dimensions: GridDimensions,
    origin: WorldPosition,
    building: &Building,
    orientation: Rotation,
) -> bool {
    footprint(origin, building, orientation).any(|cell| !dimensions.contains(cell.position))
}

/// Whether a land building would cover water or coast.
///
/// Buildings flagged as coastal are exempt. Tiles outside the world are
/// ignored; check [`is_building_outside_the_world`] first.
pub fn is_building_on_water_or_coast(
    terrain: &Layer,
    origin: WorldPosition,
    building: &Building,
    orientation: Rotation,
    buildings: &dyn BuildingLookup,
) -> Result<bool, WorldError> {
    if building.coastal {
        return Ok(false);
    }
    for cell in footprint(origin, building, orientation) {
        let Some(id) = terrain.tile_at(cell.position).and_then(|tile| tile.building()) else {
            continue;
        };
        if buildings.require(id)?.kind.is_water_or_coast() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Whether any tile of the footprint already holds a building.
#[must_use]
pub fn is_footprint_occupied(
    buildings_layer: &Layer,
    origin: WorldPosition,
    building: &Building,
    orientation: Rotation,
) -> bool {
    footprint(origin, building, orientation).any(|cell| {
        buildings_layer
            .tile_at(cell.position)
            .is_some_and(|tile| tile.has_building())
    })
}

/// Runs every check in order: bounds, terrain, occupancy.
///
/// Returns the first failing check, `None` when the building may be placed.
pub fn validate_placement(
    terrain: &Layer,
    buildings_layer: &Layer,
    origin: WorldPosition,
    building: &Building,
    orientation: Rotation,
    buildings: &dyn BuildingLookup,
) -> Result<Option<PlacementError>, WorldError> {
    if is_building_outside_the_world(terrain.dimensions(), origin, building, orientation) {
        return Ok(Some(PlacementError::OutOfBounds));
    }
    if is_building_on_water_or_coast(terrain, origin, building, orientation, buildings)? {
        return Ok(Some(PlacementError::OnWaterOrCoast));
    }
    if is_footprint_occupied(buildings_layer, origin, building, orientation) {
        return Ok(Some(PlacementError::Occupied));
    }
    Ok(None)
}
