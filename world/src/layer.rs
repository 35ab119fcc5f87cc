//! Layers of tiles and their draw-ordered GPU instance buffers.
//!
//! Tiles are stored row-major in the unrotated frame and never move. Each
//! rotation has its own draw order, the permutation of storage indices sorted
//! by that rotation's map index, and every `(zoom, rotation)` pair owns an
//! [`InstanceBuffer`] laid out in that draw order. Because all layers of a
//! world share the same grid, draw position `d` names the same world tile in
//! every layer; merging relies on that correspondence.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use isocity_core::{GridDimensions, Rotation, WorldPosition, Zoom};
use tracing::debug;

use crate::{resources::BuildingLookup, tile::Tile, WorldContext, WorldError};

/// Semantic role of a layer. The discriminant order is the world's layer
/// order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Ground, water and shore tiles.
    Terrain,
    /// Buildings placed on top of the terrain.
    Buildings,
    /// Terrain with buildings drawn over it.
    TerrainAndBuildings,
    /// Tile outlines.
    Grid,
}

impl LayerKind {
    /// Number of layer kinds.
    pub const COUNT: usize = 4;

    /// Every kind in world order.
    pub const ALL: [LayerKind; LayerKind::COUNT] = [
        Self::Terrain,
        Self::Buildings,
        Self::TerrainAndBuildings,
        Self::Grid,
    ];

    /// Position of the layer inside the world.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Terrain => 0,
            Self::Buildings => 1,
            Self::TerrainAndBuildings => 2,
            Self::Grid => 3,
        }
    }

    /// Name used in map documents and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Terrain => "terrain",
            Self::Buildings => "buildings",
            Self::TerrainAndBuildings => "terrain_and_buildings",
            Self::Grid => "grid",
        }
    }
}

/// Per-instance attributes consumed by the sprite shader.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct TileInstance {
    /// Column-major model matrix.
    pub transform: [[f32; 4]; 4],
    /// Top-left corner of the sprite cell inside its atlas page.
    pub texture_offset: [f32; 2],
    /// Atlas page, `-1` when the tile has no sprite.
    pub atlas_index: i32,
    /// Sprite height in pixels.
    pub texture_height: f32,
}

impl TileInstance {
    /// Atlas index of instances that draw nothing.
    pub const NO_SPRITE: i32 = -1;

    fn new(screen: Vec2, size: Vec2, atlas_index: i32, texture_offset: Vec2) -> Self {
        let transform = Mat4::from_translation(screen.extend(0.0))
            * Mat4::from_scale(Vec3::new(size.x, size.y, 1.0));
        Self {
            transform: transform.to_cols_array_2d(),
            texture_offset: texture_offset.to_array(),
            atlas_index,
            texture_height: size.y,
        }
    }

    /// Tile-sized quad without a sprite.
    fn blank(screen: Vec2, zoom: Zoom) -> Self {
        let size = Vec2::new(zoom.tile_width() as f32, zoom.tile_height() as f32);
        Self::new(screen, size, Self::NO_SPRITE, Vec2::ZERO)
    }

    /// Model matrix as a glam type.
    #[must_use]
    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.transform)
    }

    /// Whether the instance draws a sprite.
    #[must_use]
    pub const fn has_sprite(&self) -> bool {
        self.atlas_index != Self::NO_SPRITE
    }
}

/// Instances of one layer for one `(zoom, rotation)` pair, in draw order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceBuffer(Vec<TileInstance>);

impl InstanceBuffer {
    /// Number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer holds no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Instance at draw position `draw_position`.
    #[must_use]
    pub fn get(&self, draw_position: usize) -> Option<&TileInstance> {
        self.0.get(draw_position)
    }

    /// Instances in draw order.
    #[must_use]
    pub fn as_slice(&self) -> &[TileInstance] {
        &self.0
    }

    /// Raw bytes ready for a vertex buffer upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.0)
    }
}

type ZoomRotationTable<T> = [[T; Rotation::COUNT]; Zoom::COUNT];

#[derive(Debug)]
struct StagedTile {
    index: usize,
    tile: Tile,
    instances: ZoomRotationTable<TileInstance>,
}

/// Replacement tiles with their instances derived, see [`Layer::stage_tiles`].
#[derive(Debug)]
pub(crate) struct StagedTiles(Vec<StagedTile>);

/// Ordered tiles of one semantic layer plus their derived render data.
#[derive(Clone, Debug)]
pub struct Layer {
    kind: LayerKind,
    dimensions: GridDimensions,
    tiles: Vec<Tile>,
    sorted_tiles: [Vec<usize>; Rotation::COUNT],
    draw_positions: [Vec<usize>; Rotation::COUNT],
    buffers: ZoomRotationTable<InstanceBuffer>,
}

impl Layer {
    /// Creates a layer from tiles in row-major order.
    ///
    /// # Panics
    ///
    /// Panics when the number of tiles differs from the grid's tile count.
    #[must_use]
    pub fn new(kind: LayerKind, dimensions: GridDimensions, tiles: Vec<Tile>) -> Self {
        assert_eq!(
            tiles.len(),
            dimensions.tile_count(),
            "{} layer tile count does not match the grid",
            kind.name()
        );
        Self {
            kind,
            dimensions,
            tiles,
            sorted_tiles: Default::default(),
            draw_positions: Default::default(),
            buffers: Default::default(),
        }
    }

    /// Runs [`Tile::pre_calc`] for every tile in storage order.
    pub fn pre_calc_tiles(&mut self, buildings: &dyn BuildingLookup) -> Result<(), WorldError> {
        let dimensions = self.dimensions;
        for (index, tile) in self.tiles.iter_mut().enumerate() {
            tile.pre_calc(dimensions.position_of(index), dimensions, buildings)?;
        }
        debug!(layer = self.kind.name(), "precalculated tiles");
        Ok(())
    }

    /// Sorts the tiles into draw order for every rotation and derives the
    /// instance buffers for every `(zoom, rotation)` pair.
    ///
    /// Tiles without a building still receive an instance so that draw
    /// positions stay aligned across layers.
    pub fn prepare_rendering(&mut self, context: &WorldContext) -> Result<(), WorldError> {
        self.sort_tiles();
        for zoom in Zoom::ALL {
            for rotation in Rotation::ALL {
                let instances = self.sorted_tiles[rotation.index()]
                    .iter()
                    .map(|&index| Self::instance_for(&self.tiles[index], zoom, rotation, context))
                    .collect::<Result<Vec<_>, _>>()?;
                self.buffers[zoom.index()][rotation.index()] = InstanceBuffer(instances);
            }
        }
        debug!(
            layer = self.kind.name(),
            tiles = self.tiles.len(),
            "prepared instance buffers"
        );
        Ok(())
    }

    /// Builds the combined layer: terrain everywhere, overwritten by the
    /// buildings layer wherever a building stands.
    ///
    /// # Panics
    ///
    /// Panics when the inputs are not a prepared terrain and buildings layer
    /// over the same grid.
    #[must_use]
    pub fn merged(terrain: &Layer, buildings: &Layer) -> Self {
        assert_eq!(terrain.kind, LayerKind::Terrain, "first merge input must be terrain");
        assert_eq!(buildings.kind, LayerKind::Buildings, "second merge input must be buildings");
        assert_eq!(terrain.dimensions, buildings.dimensions, "merged layers must share a grid");
        assert_eq!(
            terrain.sorted_tiles, buildings.sorted_tiles,
            "merged layers must share their draw order"
        );

        let tiles = terrain
            .tiles
            .iter()
            .zip(&buildings.tiles)
            .map(|(ground, building)| {
                if building.has_building() {
                    building.clone()
                } else {
                    ground.clone()
                }
            })
            .collect();
        let mut merged = Self {
            kind: LayerKind::TerrainAndBuildings,
            dimensions: terrain.dimensions,
            tiles,
            sorted_tiles: terrain.sorted_tiles.clone(),
            draw_positions: terrain.draw_positions.clone(),
            buffers: terrain.buffers.clone(),
        };

        for zoom in Zoom::ALL {
            for rotation in Rotation::ALL {
                let target = &mut merged.buffers[zoom.index()][rotation.index()].0;
                let source = &buildings.buffers[zoom.index()][rotation.index()].0;
                for (draw_position, &index) in
                    buildings.sorted_tiles[rotation.index()].iter().enumerate()
                {
                    if buildings.tiles[index].has_building() {
                        target[draw_position] = source[draw_position];
                    }
                }
            }
        }
        assert_eq!(merged.tiles.len(), merged.dimensions.tile_count());
        debug!(tiles = merged.tiles.len(), "merged terrain and buildings");
        merged
    }

    /// Re-derives the merged tiles and instances at the given storage
    /// indices only.
    pub(crate) fn merge_tiles(&mut self, terrain: &Layer, buildings: &Layer, indices: &[usize]) {
        debug_assert_eq!(self.kind, LayerKind::TerrainAndBuildings);
        for &index in indices {
            let source = if buildings.tiles[index].has_building() {
                buildings
            } else {
                terrain
            };
            self.tiles[index] = source.tiles[index].clone();
            for rotation in Rotation::ALL {
                let draw_position = self.draw_positions[rotation.index()][index];
                for zoom in Zoom::ALL {
                    self.buffers[zoom.index()][rotation.index()].0[draw_position] =
                        source.buffers[zoom.index()][rotation.index()].0[draw_position];
                }
            }
        }
    }

    /// Builds the outline overlay from the terrain's geometry.
    #[must_use]
    pub fn grid_from(terrain: &Layer) -> Self {
        let tiles: Vec<Tile> = terrain
            .tiles
            .iter()
            .map(|tile| {
                let mut outline = tile.clone();
                outline.assign(None, Rotation::Deg0, WorldPosition::default());
                outline
            })
            .collect();
        let mut buffers: ZoomRotationTable<InstanceBuffer> = Default::default();
        for zoom in Zoom::ALL {
            for rotation in Rotation::ALL {
                buffers[zoom.index()][rotation.index()] = InstanceBuffer(
                    terrain.sorted_tiles[rotation.index()]
                        .iter()
                        .map(|&index| {
                            TileInstance::blank(tiles[index].screen_position(zoom, rotation), zoom)
                        })
                        .collect(),
                );
            }
        }
        debug!(tiles = tiles.len(), "created grid layer");
        Self {
            kind: LayerKind::Grid,
            dimensions: terrain.dimensions,
            tiles,
            sorted_tiles: terrain.sorted_tiles.clone(),
            draw_positions: terrain.draw_positions.clone(),
            buffers,
        }
    }

    /// Derives the instances of replacement tiles without touching the
    /// layer. Fails before anything is written when a sprite is missing.
    pub(crate) fn stage_tiles(
        &self,
        replacements: Vec<(usize, Tile)>,
        context: &WorldContext,
    ) -> Result<StagedTiles, WorldError> {
        let mut staged = Vec::with_capacity(replacements.len());
        for (index, tile) in replacements {
            let mut instances = [[TileInstance::zeroed(); Rotation::COUNT]; Zoom::COUNT];
            for zoom in Zoom::ALL {
                for rotation in Rotation::ALL {
                    instances[zoom.index()][rotation.index()] =
                        Self::instance_for(&tile, zoom, rotation, context)?;
                }
            }
            staged.push(StagedTile {
                index,
                tile,
                instances,
            });
        }
        Ok(StagedTiles(staged))
    }

    /// Writes staged tiles and their instances. Draw order is unaffected
    /// because tiles never move. Returns the storage indices written.
    pub(crate) fn commit_tiles(&mut self, staged: StagedTiles) -> Vec<usize> {
        let mut indices = Vec::with_capacity(staged.0.len());
        for StagedTile {
            index,
            tile,
            instances,
        } in staged.0
        {
            self.tiles[index] = tile;
            for rotation in Rotation::ALL {
                let draw_position = self.draw_positions[rotation.index()][index];
                for zoom in Zoom::ALL {
                    self.buffers[zoom.index()][rotation.index()].0[draw_position] =
                        instances[zoom.index()][rotation.index()];
                }
            }
            indices.push(index);
        }
        indices
    }

    fn sort_tiles(&mut self) {
        for rotation in Rotation::ALL {
            let mut order: Vec<usize> = (0..self.tiles.len()).collect();
            order.sort_by_key(|&index| self.tiles[index].index(rotation));
            let mut positions = vec![0; order.len()];
            for (draw_position, &index) in order.iter().enumerate() {
                positions[index] = draw_position;
            }
            self.sorted_tiles[rotation.index()] = order;
            self.draw_positions[rotation.index()] = positions;
        }
    }

    fn instance_for(
        tile: &Tile,
        zoom: Zoom,
        rotation: Rotation,
        context: &WorldContext,
    ) -> Result<TileInstance, WorldError> {
        let screen = tile.screen_position(zoom, rotation);
        let Some(id) = tile.building() else {
            return Ok(TileInstance::blank(screen, zoom));
        };
        let building = context.buildings().require(id)?;
        let sprite = context
            .atlas()
            .require_sprite(tile.sprite(rotation, building), zoom)?;
        let anchored = Vec2::new(
            screen.x,
            screen.y
                - (sprite.height - zoom.tile_height() as f32)
                - zoom.scale_offset(building.posoffs) as f32,
        );
        Ok(TileInstance::new(
            anchored,
            Vec2::new(sprite.width, sprite.height),
            sprite.atlas_index,
            sprite.texture_offset,
        ))
    }

    /// Semantic role of the layer.
    #[must_use]
    pub const fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Grid the layer covers.
    #[must_use]
    pub const fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    /// Tiles in row-major storage order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile at a world position, `None` outside the grid.
    #[must_use]
    pub fn tile_at(&self, position: WorldPosition) -> Option<&Tile> {
        if !self.dimensions.contains(position) {
            return None;
        }
        self.tiles
            .get(self.dimensions.map_index(position, Rotation::Deg0))
    }

    /// Storage indices in draw order for the rotation.
    #[must_use]
    pub fn sorted_tiles(&self, rotation: Rotation) -> &[usize] {
        &self.sorted_tiles[rotation.index()]
    }

    /// Draw position of a storage index under the rotation.
    #[must_use]
    pub fn draw_position(&self, rotation: Rotation, index: usize) -> Option<usize> {
        self.draw_positions[rotation.index()].get(index).copied()
    }

    /// Draw-ordered instances for the `(zoom, rotation)` pair.
    #[must_use]
    pub fn instances(&self, zoom: Zoom, rotation: Rotation) -> &InstanceBuffer {
        &self.buffers[zoom.index()][rotation.index()]
    }
}
