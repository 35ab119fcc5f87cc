//! JSON map documents.
//!
//! A map is `{"width": W, "height": H, "layers": [{"terrain": [...]},
//! {"buildings": [...]}]}` where each layer lists `W*H` tile records in
//! row-major order. A record's `id` is `-1` for an empty tile; `x` and `y`
//! locate the tile inside its building's footprint.

use std::{collections::BTreeMap, fs, path::Path};

use isocity_core::{BuildingId, GridDimensions, Rotation, WorldPosition};
use serde::{Deserialize, Serialize};

use crate::{layer::LayerKind, tile::Tile, WorldError};

/// One tile of a map document layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Building id, [`TileRecord::EMPTY_ID`] for none.
    pub id: i64,
    /// Building orientation in quarter turns.
    #[serde(default)]
    pub rotation: u32,
    /// Column inside the building footprint.
    #[serde(default)]
    pub x: i32,
    /// Row inside the building footprint.
    #[serde(default)]
    pub y: i32,
}

impl TileRecord {
    /// Id marking a tile without a building.
    pub const EMPTY_ID: i64 = -1;

    /// Record of an empty tile.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            id: Self::EMPTY_ID,
            rotation: 0,
            x: 0,
            y: 0,
        }
    }

    /// Record of a single-tile building, or the upper-left tile of a larger
    /// one.
    #[must_use]
    pub const fn building(id: BuildingId, orientation: Rotation) -> Self {
        Self {
            id: id.get() as i64,
            rotation: orientation.index() as u32,
            x: 0,
            y: 0,
        }
    }

    fn from_tile(tile: &Tile) -> Self {
        match tile.building() {
            Some(id) => Self {
                id: id.get() as i64,
                rotation: tile.orientation().index() as u32,
                x: tile.footprint_offset().x(),
                y: tile.footprint_offset().y(),
            },
            None => Self::empty(),
        }
    }

    fn into_tile(self, layer: &str, index: usize) -> Result<Tile, WorldError> {
        if self.rotation >= Rotation::COUNT as u32 {
            return Err(WorldError::InvalidOrientation {
                layer: layer.to_owned(),
                index,
                value: self.rotation,
            });
        }
        let orientation = Rotation::from_index(self.rotation as usize);
        let offset = WorldPosition::new(self.x, self.y);
        match self.id {
            Self::EMPTY_ID => Ok(Tile::empty()),
            id => match u32::try_from(id) {
                Ok(id) => Ok(Tile::new(Some(BuildingId::new(id)), orientation, offset)),
                Err(_) => Err(WorldError::InvalidBuildingId {
                    layer: layer.to_owned(),
                    index,
                    id,
                }),
            },
        }
    }
}

/// Serialized form of a world's terrain and buildings layers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDocument {
    /// Number of columns.
    pub width: i64,
    /// Number of rows.
    pub height: i64,
    /// Exactly two single-entry objects, `terrain` and `buildings`.
    pub layers: Vec<BTreeMap<String, Vec<TileRecord>>>,
}

/// Validated contents of a [`MapDocument`].
#[derive(Clone, Debug)]
pub struct MapTiles {
    /// Grid size.
    pub dimensions: GridDimensions,
    /// Terrain tiles in row-major order.
    pub terrain: Vec<Tile>,
    /// Building tiles in row-major order.
    pub buildings: Vec<Tile>,
}

impl MapDocument {
    /// Assembles a document from terrain and building records.
    #[must_use]
    pub fn new(
        dimensions: GridDimensions,
        terrain: Vec<TileRecord>,
        buildings: Vec<TileRecord>,
    ) -> Self {
        let layer = |kind: LayerKind, records| BTreeMap::from([(kind.name().to_owned(), records)]);
        Self {
            width: i64::from(dimensions.width()),
            height: i64::from(dimensions.height()),
            layers: vec![
                layer(LayerKind::Terrain, terrain),
                layer(LayerKind::Buildings, buildings),
            ],
        }
    }

    /// Captures the terrain and buildings tiles of a world.
    pub(crate) fn from_tiles(dimensions: GridDimensions, terrain: &[Tile], buildings: &[Tile]) -> Self {
        Self::new(
            dimensions,
            terrain.iter().map(TileRecord::from_tile).collect(),
            buildings.iter().map(TileRecord::from_tile).collect(),
        )
    }

    /// Parses a document from JSON text.
    pub fn from_json_str(json: &str, what: &str) -> Result<Self, WorldError> {
        serde_json::from_str(json).map_err(|source| WorldError::Json {
            what: what.to_owned(),
            source,
        })
    }

    /// Reads and parses a map file.
    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let json = fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json, &path.display().to_string())
    }

    /// Serializes the document to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, WorldError> {
        serde_json::to_string_pretty(self).map_err(|source| WorldError::Json {
            what: "map document".to_owned(),
            source,
        })
    }

    /// Writes the document to a file, replacing any existing content.
    pub fn save(&self, path: &Path) -> Result<(), WorldError> {
        let json = self.to_json_string()?;
        fs::write(path, json).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validates the document and converts its records to tiles.
    pub fn into_tiles(self) -> Result<MapTiles, WorldError> {
        let (width, height) = match (i32::try_from(self.width), i32::try_from(self.height)) {
            (Ok(width), Ok(height)) if width > 0 && height > 0 => (width, height),
            _ => {
                return Err(WorldError::InvalidDimensions {
                    width: self.width,
                    height: self.height,
                })
            }
        };
        let dimensions = GridDimensions::new(width, height);
        if self.layers.len() != 2 {
            return Err(WorldError::LayerCount {
                found: self.layers.len(),
            });
        }

        let mut terrain = None;
        let mut buildings = None;
        for (position, entry) in self.layers.into_iter().enumerate() {
            if entry.len() != 1 {
                return Err(WorldError::MalformedLayer { index: position });
            }
            for (name, records) in entry {
                let slot = if name == LayerKind::Terrain.name() {
                    &mut terrain
                } else if name == LayerKind::Buildings.name() {
                    &mut buildings
                } else {
                    return Err(WorldError::UnknownLayer { name });
                };
                if slot.is_some() {
                    return Err(WorldError::DuplicateLayer { name });
                }
                *slot = Some(records_to_tiles(&name, records, dimensions)?);
            }
        }

        match (terrain, buildings) {
            (Some(terrain), Some(buildings)) => Ok(MapTiles {
                dimensions,
                terrain,
                buildings,
            }),
            _ => Err(WorldError::LayerCount { found: 1 }),
        }
    }
}

fn records_to_tiles(
    layer: &str,
    records: Vec<TileRecord>,
    dimensions: GridDimensions,
) -> Result<Vec<Tile>, WorldError> {
    if records.len() != dimensions.tile_count() {
        return Err(WorldError::TileCount {
            layer: layer.to_owned(),
            expected: dimensions.tile_count(),
            found: records.len(),
        });
    }
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_tile(layer, index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_one() -> String {
        r#"{
            "width": 2,
            "height": 1,
            "layers": [
                { "terrain": [ { "id": 1, "rotation": 0, "x": 0, "y": 0 }, { "id": 1 } ] },
                { "buildings": [ { "id": -1 }, { "id": 5, "rotation": 3 } ] }
            ]
        }"#
        .to_owned()
    }

    #[test]
    fn document_converts_to_tiles() {
        let tiles = MapDocument::from_json_str(&two_by_one(), "inline")
            .and_then(MapDocument::into_tiles)
            .expect("valid map");

        assert_eq!(tiles.dimensions, GridDimensions::new(2, 1));
        assert_eq!(tiles.terrain.len(), 2);
        assert!(!tiles.buildings[0].has_building());
        assert_eq!(tiles.buildings[1].building(), Some(BuildingId::new(5)));
        assert_eq!(tiles.buildings[1].orientation(), Rotation::Deg270);
    }

    #[test]
    fn tile_count_mismatch_is_fatal() {
        let json = two_by_one().replace(r#", { "id": 1 } ]"#, " ]");
        let result = MapDocument::from_json_str(&json, "inline").and_then(MapDocument::into_tiles);
        assert!(matches!(
            result,
            Err(WorldError::TileCount { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn layer_count_must_be_two() {
        let mut document = MapDocument::from_json_str(&two_by_one(), "inline").expect("parses");
        let _ = document.layers.pop();
        assert!(matches!(
            document.into_tiles(),
            Err(WorldError::LayerCount { found: 1 })
        ));
    }

    #[test]
    fn unknown_and_duplicate_layers_are_fatal() {
        let json = two_by_one().replace("\"buildings\"", "\"roads\"");
        let result = MapDocument::from_json_str(&json, "inline").and_then(MapDocument::into_tiles);
        assert!(matches!(result, Err(WorldError::UnknownLayer { name }) if name == "roads"));

        let json = two_by_one().replace("\"buildings\"", "\"terrain\"");
        let result = MapDocument::from_json_str(&json, "inline").and_then(MapDocument::into_tiles);
        assert!(matches!(result, Err(WorldError::DuplicateLayer { .. })));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let json = two_by_one().replace("\"width\": 2", "\"width\": -2");
        let result = MapDocument::from_json_str(&json, "inline").and_then(MapDocument::into_tiles);
        assert!(matches!(result, Err(WorldError::InvalidDimensions { width: -2, .. })));

        let json = two_by_one().replace("\"rotation\": 3", "\"rotation\": 4");
        let result = MapDocument::from_json_str(&json, "inline").and_then(MapDocument::into_tiles);
        assert!(matches!(result, Err(WorldError::InvalidOrientation { value: 4, .. })));

        let json = two_by_one().replace("{ \"id\": -1 }", "{ \"id\": -7 }");
        let result = MapDocument::from_json_str(&json, "inline").and_then(MapDocument::into_tiles);
        assert!(matches!(result, Err(WorldError::InvalidBuildingId { id: -7, .. })));
    }

    #[test]
    fn saved_documents_load_back() {
        let document = MapDocument::from_json_str(&two_by_one(), "inline").expect("parses");
        let directory = tempfile::tempdir().expect("temp dir");
        let path = directory.path().join("map.json");
        document.save(&path).expect("saves");
        assert_eq!(MapDocument::load(&path).expect("loads"), document);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let directory = tempfile::tempdir().expect("temp dir");
        let path = directory.path().join("absent.json");
        assert!(matches!(
            MapDocument::load(&path),
            Err(WorldError::Io { path: reported, .. }) if reported == path
        ));
    }
}
