#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the isometric city engine.
//!
//! A [`World`] is built once from a [`MapDocument`]: terrain and buildings
//! layers are created from the document, every tile is precomputed for each
//! zoom and rotation, the two layers are merged into the combined render
//! layer, and a grid overlay is derived from the terrain. Afterwards the world
//! only changes through [`apply`], which keeps the combined layer in sync with
//! every placed or demolished building.

pub mod error;
pub mod layer;
pub mod map_file;
pub mod placement;
pub mod resources;
pub mod tile;

use std::path::Path;

use isocity_core::{
    Action, BuildingSelection, Command, DemolitionError, Event, GridDimensions, PlacementError,
    Rotation, WorldPosition, Zoom,
};
use tracing::{debug, info};

pub use error::WorldError;
pub use layer::{InstanceBuffer, Layer, LayerKind, TileInstance};
pub use map_file::{MapDocument, MapTiles, TileRecord};
pub use resources::{
    AtlasLayout, AtlasPages, BuildingLookup, BuildingTable, SpriteAtlas, SpriteInfo, WorldContext,
};
pub use tile::Tile;

/// Represents the authoritative city state.
#[derive(Debug)]
pub struct World {
    dimensions: GridDimensions,
    layers: Vec<Layer>,
    rotation: Rotation,
    zoom: Zoom,
    action: Action,
    selection: Option<BuildingSelection>,
    hovered: Option<WorldPosition>,
    inspected_tile: Option<usize>,
    context: WorldContext,
}

impl World {
    /// Loads a map file and builds every layer.
    pub fn load(path: &Path, context: WorldContext) -> Result<Self, WorldError> {
        info!(path = %path.display(), "loading map");
        Self::from_document(MapDocument::load(path)?, context)
    }

    /// Builds every layer from an in-memory map document.
    pub fn from_document(document: MapDocument, context: WorldContext) -> Result<Self, WorldError> {
        let MapTiles {
            dimensions,
            terrain,
            buildings,
        } = document.into_tiles()?;
        let mut world = Self {
            dimensions,
            layers: Vec::with_capacity(LayerKind::COUNT),
            rotation: Rotation::default(),
            zoom: Zoom::default(),
            action: Action::default(),
            selection: None,
            hovered: None,
            inspected_tile: None,
            context,
        };

        world.create_terrain_and_buildings_layers(terrain, buildings);
        world.prepare_rendering()?;
        world.merge_terrain_and_buildings_layers();
        world.create_grid_layer();
        info!(
            width = dimensions.width(),
            height = dimensions.height(),
            "world ready"
        );
        Ok(world)
    }

    /// Captures the terrain and buildings layers in the map file shape.
    #[must_use]
    pub fn to_document(&self) -> MapDocument {
        MapDocument::from_tiles(
            self.dimensions,
            self.layer(LayerKind::Terrain).tiles(),
            self.layer(LayerKind::Buildings).tiles(),
        )
    }

    fn create_terrain_and_buildings_layers(&mut self, terrain: Vec<Tile>, buildings: Vec<Tile>) {
        self.layers
            .push(Layer::new(LayerKind::Terrain, self.dimensions, terrain));
        self.layers
            .push(Layer::new(LayerKind::Buildings, self.dimensions, buildings));
        assert_eq!(self.layers.len(), 2, "terrain and buildings layers expected");
        debug!("created terrain and buildings layers");
    }

    fn prepare_rendering(&mut self) -> Result<(), WorldError> {
        for layer in &mut self.layers {
            layer.pre_calc_tiles(self.context.buildings())?;
            layer.prepare_rendering(&self.context)?;
        }
        Ok(())
    }

    fn merge_terrain_and_buildings_layers(&mut self) {
        let merged = Layer::merged(
            self.layer(LayerKind::Terrain),
            self.layer(LayerKind::Buildings),
        );
        self.layers.push(merged);
        assert_eq!(self.layers.len(), 3, "merged layer expected");
    }

    fn create_grid_layer(&mut self) {
        let grid = Layer::grid_from(self.layer(LayerKind::Terrain));
        self.layers.push(grid);
        assert_eq!(self.layers.len(), LayerKind::COUNT, "grid layer expected");
    }

    fn layer(&self, kind: LayerKind) -> &Layer {
        &self.layers[kind.index()]
    }

    fn layers_mut(&mut self) -> [&mut Layer; LayerKind::COUNT] {
        let [terrain, buildings, merged, grid] = &mut self.layers[..] else {
            panic!("world must hold exactly {} layers", LayerKind::COUNT);
        };
        [terrain, buildings, merged, grid]
    }

    fn set_action(&mut self, action: Action, out_events: &mut Vec<Event>) {
        if self.action == action {
            return;
        }
        self.action = action;
        if action != Action::Status {
            self.inspected_tile = None;
        }
        if action != Action::Build && self.selection.take().is_some() {
            out_events.push(Event::SelectionChanged { selection: None });
        }
        out_events.push(Event::ActionChanged { action });
    }

    fn select_building(
        &mut self,
        selection: Option<BuildingSelection>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        if self.action != Action::Build {
            return Ok(());
        }
        if let Some(selection) = selection {
            let _ = self.context.buildings().require(selection.building())?;
        }
        self.selection = selection;
        out_events.push(Event::SelectionChanged { selection });
        Ok(())
    }

    fn inspect(&mut self, position: WorldPosition, out_events: &mut Vec<Event>) {
        if self.action != Action::Status || !self.dimensions.contains(position) {
            return;
        }
        let index = self.dimensions.map_index(position, Rotation::Deg0);
        self.inspected_tile = Some(index);
        out_events.push(Event::TileInspected { position, index });
    }

    fn place_building(
        &mut self,
        selection: BuildingSelection,
        origin: WorldPosition,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let rejection = if self.action == Action::Build {
            let building = self.context.buildings().require(selection.building())?;
            placement::validate_placement(
                self.layer(LayerKind::Terrain),
                self.layer(LayerKind::Buildings),
                origin,
                building,
                selection.orientation(),
                self.context.buildings(),
            )?
        } else {
            Some(PlacementError::InvalidMode)
        };
        if let Some(reason) = rejection {
            debug!(?selection, ?origin, ?reason, "placement rejected");
            out_events.push(Event::BuildingPlacementRejected {
                selection,
                origin,
                reason,
            });
            return Ok(());
        }

        let building = self.context.buildings().require(selection.building())?;
        let buildings = self.layer(LayerKind::Buildings);
        let mut replacements = Vec::new();
        let mut cells = Vec::new();
        for cell in placement::footprint(origin, building, selection.orientation()) {
            let index = self.dimensions.map_index(cell.position, Rotation::Deg0);
            let mut tile = buildings.tiles()[index].clone();
            tile.assign(Some(building.id), selection.orientation(), cell.offset);
            tile.pre_calc(cell.position, self.dimensions, self.context.buildings())?;
            replacements.push((index, tile));
            cells.push(cell.position);
        }
        let staged = buildings.stage_tiles(replacements, &self.context)?;

        let [terrain, buildings, merged, _] = self.layers_mut();
        let indices = buildings.commit_tiles(staged);
        merged.merge_tiles(terrain, buildings, &indices);

        info!(
            building = selection.building().get(),
            x = origin.x(),
            y = origin.y(),
            "building placed"
        );
        out_events.push(Event::BuildingPlaced {
            selection,
            origin,
            cells,
        });
        Ok(())
    }

    fn demolish_building(
        &mut self,
        position: WorldPosition,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let target = if self.action != Action::Demolish {
            Err(DemolitionError::InvalidMode)
        } else {
            match self.layer(LayerKind::Buildings).tile_at(position) {
                None => Err(DemolitionError::OutOfBounds),
                Some(tile) => match tile.building() {
                    None => Err(DemolitionError::MissingBuilding),
                    Some(id) => {
                        let offset = tile.footprint_offset();
                        Ok((
                            id,
                            tile.orientation(),
                            position.offset(-offset.x(), -offset.y()),
                        ))
                    }
                },
            }
        };
        let (id, orientation, origin) = match target {
            Ok(target) => target,
            Err(reason) => {
                debug!(?position, ?reason, "demolition rejected");
                out_events.push(Event::DemolitionRejected { position, reason });
                return Ok(());
            }
        };

        let building = self.context.buildings().require(id)?;
        let buildings = self.layer(LayerKind::Buildings);
        let mut replacements = Vec::new();
        let mut cells = Vec::new();
        for cell in placement::footprint(origin, building, orientation) {
            let covered = buildings
                .tile_at(cell.position)
                .is_some_and(|tile| tile.building() == Some(id));
            if !covered {
                continue;
            }
            let index = self.dimensions.map_index(cell.position, Rotation::Deg0);
            let mut tile = buildings.tiles()[index].clone();
            tile.assign(None, Rotation::Deg0, WorldPosition::default());
            tile.pre_calc(cell.position, self.dimensions, self.context.buildings())?;
            replacements.push((index, tile));
            cells.push(cell.position);
        }
        let staged = buildings.stage_tiles(replacements, &self.context)?;

        let [terrain, buildings, merged, _] = self.layers_mut();
        let indices = buildings.commit_tiles(staged);
        merged.merge_tiles(terrain, buildings, &indices);

        info!(
            building = id.get(),
            x = origin.x(),
            y = origin.y(),
            "building demolished"
        );
        out_events.push(Event::BuildingDemolished {
            building: id,
            origin,
            cells,
        });
        Ok(())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Rejected placements and demolitions are reported as events and leave the
/// world untouched. An error is only returned when the building database or
/// sprite atlas cannot resolve something the world depends on.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    match command {
        Command::RotateWorld { change } => {
            world.rotation = world.rotation.changed(change);
            out_events.push(Event::RotationChanged {
                rotation: world.rotation,
            });
        }
        Command::ZoomWorld { change } => {
            let zoom = world.zoom.changed(change);
            if zoom != world.zoom {
                world.zoom = zoom;
                out_events.push(Event::ZoomChanged { zoom });
            }
        }
        Command::SetAction { action } => world.set_action(action, out_events),
        Command::SelectBuilding { selection } => world.select_building(selection, out_events)?,
        Command::RotateSelection { change } => {
            if let Some(selection) = world.selection {
                let selection = Some(selection.turned(change));
                world.selection = selection;
                out_events.push(Event::SelectionChanged { selection });
            }
        }
        Command::MouseMoved { position } => world.hovered = position,
        Command::LeftMouseButtonPressed { position } => world.inspect(position, out_events),
        Command::PlaceBuilding { selection, origin } => {
            world.place_building(selection, origin, out_events)?;
        }
        Command::DemolishBuilding { position } => world.demolish_building(position, out_events)?,
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use glam::Vec2;
    use isocity_core::{
        Action, Building, BuildingId, BuildingSelection, GridDimensions, PlacementPreview,
        Rotation, WorldPosition, Zoom,
    };

    use super::{placement, Layer, LayerKind, Tile, World, WorldContext, WorldError};

    /// Width and height of the world.
    #[must_use]
    pub fn dimensions(world: &World) -> GridDimensions {
        world.dimensions
    }

    /// Current camera rotation.
    #[must_use]
    pub fn rotation(world: &World) -> Rotation {
        world.rotation
    }

    /// Current zoom level.
    #[must_use]
    pub fn zoom(world: &World) -> Zoom {
        world.zoom
    }

    /// Active interaction mode.
    #[must_use]
    pub fn current_action(world: &World) -> Action {
        world.action
    }

    /// Building staged for placement.
    #[must_use]
    pub fn selection(world: &World) -> Option<BuildingSelection> {
        world.selection
    }

    /// Tile last reported under the cursor.
    #[must_use]
    pub fn hovered_position(world: &World) -> Option<WorldPosition> {
        world.hovered
    }

    /// Layer of the requested kind.
    #[must_use]
    pub fn layer(world: &World, kind: LayerKind) -> &Layer {
        world.layer(kind)
    }

    /// Collaborators the world was built with.
    #[must_use]
    pub fn context(world: &World) -> &WorldContext {
        &world.context
    }

    /// Building definition registered under `id`.
    #[must_use]
    pub fn building(world: &World, id: BuildingId) -> Option<&Building> {
        world.context.buildings().building(id)
    }

    /// Storage index of the tile selected in status mode.
    #[must_use]
    pub fn inspected_index(world: &World) -> Option<usize> {
        world.inspected_tile
    }

    /// Combined-layer tile selected in status mode.
    #[must_use]
    pub fn inspected_tile(world: &World) -> Option<&Tile> {
        world
            .inspected_tile
            .and_then(|index| world.layer(LayerKind::TerrainAndBuildings).tiles().get(index))
    }

    /// Whether the position lies inside the world.
    #[must_use]
    pub fn is_position_in_world(world: &World, position: WorldPosition) -> bool {
        placement::is_position_in_world(world.dimensions, position)
    }

    /// Draw-order index of the position under the current rotation.
    ///
    /// # Panics
    ///
    /// Panics when the position lies outside the world.
    #[must_use]
    pub fn map_index(world: &World, position: WorldPosition) -> usize {
        world.dimensions.map_index(position, world.rotation)
    }

    /// Screen position of the tile under the current zoom and rotation.
    #[must_use]
    pub fn world_to_screen(world: &World, position: WorldPosition) -> Vec2 {
        world
            .dimensions
            .world_to_screen(position, world.zoom, world.rotation)
    }

    /// Tile under a screen pixel under the current zoom and rotation.
    #[must_use]
    pub fn screen_to_world(world: &World, screen: Vec2) -> Option<WorldPosition> {
        world
            .dimensions
            .screen_to_world(screen, world.zoom, world.rotation)
    }

    /// Validation result of the staged building at the hovered tile.
    ///
    /// `None` unless the world is in build mode with a staged building and a
    /// hovered tile.
    pub fn placement_preview(world: &World) -> Result<Option<PlacementPreview>, WorldError> {
        let (Action::Build, Some(selection), Some(origin)) =
            (world.action, world.selection, world.hovered)
        else {
            return Ok(None);
        };
        let building = world.context.buildings().require(selection.building())?;
        let rejection = placement::validate_placement(
            world.layer(LayerKind::Terrain),
            world.layer(LayerKind::Buildings),
            origin,
            building,
            selection.orientation(),
            world.context.buildings(),
        )?;
        let cells = placement::footprint(origin, building, selection.orientation())
            .map(|cell| cell.position)
            .filter(|position| world.dimensions.contains(*position))
            .collect();
        Ok(Some(PlacementPreview {
            selection,
            origin,
            cells,
            rejection,
        }))
    }
}
