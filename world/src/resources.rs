//! Collaborators that resolve building definitions and sprite placement.
//!
//! The world never reaches for global caches. Everything it needs to turn a
//! building id into pixels is handed over through a [`WorldContext`].

use std::{collections::BTreeMap, fmt, fs, path::Path, sync::Arc};

use glam::Vec2;
use isocity_core::{Building, BuildingId, Zoom};
use serde::{Deserialize, Serialize};

use crate::WorldError;

/// Resolves building definitions by id.
pub trait BuildingLookup: fmt::Debug {
    /// Returns the definition registered under `id`.
    fn building(&self, id: BuildingId) -> Option<&Building>;

    /// Returns the definition registered under `id` or a fatal error.
    fn require(&self, id: BuildingId) -> Result<&Building, WorldError> {
        self.building(id).ok_or(WorldError::UnknownBuilding { id })
    }
}

/// Placement of a single sprite inside the texture atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteInfo {
    /// Sprite width in pixels.
    pub width: f32,
    /// Sprite height in pixels.
    pub height: f32,
    /// Atlas page holding the sprite.
    pub atlas_index: i32,
    /// Top-left corner of the sprite cell inside its page, in page units.
    pub texture_offset: Vec2,
}

/// Resolves sprite numbers to atlas placements.
pub trait SpriteAtlas: fmt::Debug {
    /// Returns the placement of sprite `gfx` at the given zoom.
    fn sprite(&self, gfx: u32, zoom: Zoom) -> Option<SpriteInfo>;

    /// Returns the placement of sprite `gfx` or a fatal error.
    fn require_sprite(&self, gfx: u32, zoom: Zoom) -> Result<SpriteInfo, WorldError> {
        self.sprite(gfx, zoom)
            .ok_or(WorldError::UnknownSprite { gfx, zoom })
    }
}

/// Shared collaborators handed to the world at construction.
#[derive(Clone, Debug)]
pub struct WorldContext {
    buildings: Arc<dyn BuildingLookup>,
    atlas: Arc<dyn SpriteAtlas>,
}

impl WorldContext {
    /// Bundles a building lookup and a sprite atlas.
    #[must_use]
    pub fn new(buildings: Arc<dyn BuildingLookup>, atlas: Arc<dyn SpriteAtlas>) -> Self {
        Self { buildings, atlas }
    }

    /// Building definitions.
    #[must_use]
    pub fn buildings(&self) -> &dyn BuildingLookup {
        self.buildings.as_ref()
    }

    /// Sprite placements.
    #[must_use]
    pub fn atlas(&self) -> &dyn SpriteAtlas {
        self.atlas.as_ref()
    }
}

#[derive(Deserialize)]
struct BuildingTableDocument {
    buildings: Vec<Building>,
}

/// Building definitions keyed by id, loaded from a JSON document of the form
/// `{ "buildings": [ ... ] }`.
#[derive(Clone, Debug, Default)]
pub struct BuildingTable {
    entries: BTreeMap<BuildingId, Building>,
}

impl BuildingTable {
    /// Builds a table from definitions, rejecting repeated ids.
    pub fn from_buildings<I>(buildings: I) -> Result<Self, WorldError>
    where
        I: IntoIterator<Item = Building>,
    {
        let mut entries = BTreeMap::new();
        for building in buildings {
            let id = building.id;
            if entries.insert(id, building).is_some() {
                return Err(WorldError::DuplicateBuilding { id });
            }
        }
        Ok(Self { entries })
    }

    /// Parses a table from JSON text.
    pub fn from_json_str(json: &str, what: &str) -> Result<Self, WorldError> {
        let document: BuildingTableDocument =
            serde_json::from_str(json).map_err(|source| WorldError::Json {
                what: what.to_owned(),
                source,
            })?;
        Self::from_buildings(document.buildings)
    }

    /// Reads and parses a table file.
    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let json = fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json, &path.display().to_string())
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over definitions in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        self.entries.values()
    }
}

impl BuildingLookup for BuildingTable {
    fn building(&self, id: BuildingId) -> Option<&Building> {
        self.entries.get(&id)
    }
}

/// Sprite grid of one zoom level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasPages {
    /// Sprites per row and per column of a square page.
    pub sprites_per_row: u32,
    /// Pixel height of every sprite, indexed by sprite number.
    pub heights: Vec<u32>,
}

impl AtlasPages {
    fn sprite(&self, gfx: u32, zoom: Zoom) -> Option<SpriteInfo> {
        let height = *self.heights.get(gfx as usize)?;
        let rows = self.sprites_per_row.max(1);
        let per_page = rows * rows;
        let slot = gfx % per_page;
        Some(SpriteInfo {
            width: zoom.tile_width() as f32,
            height: height as f32,
            atlas_index: (gfx / per_page) as i32,
            texture_offset: Vec2::new(
                (slot % rows) as f32 / rows as f32,
                (slot / rows) as f32 / rows as f32,
            ),
        })
    }
}

/// Texture atlas layout for every zoom level.
///
/// Pages are square grids of equally sized cells; a sprite's page and cell
/// follow from its number alone, so only the heights need to be stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasLayout {
    /// Layout at [`Zoom::Sgfx`].
    pub sgfx: AtlasPages,
    /// Layout at [`Zoom::Mgfx`].
    pub mgfx: AtlasPages,
    /// Layout at [`Zoom::Gfx`].
    pub gfx: AtlasPages,
}

impl AtlasLayout {
    /// Layout where `sprite_count` sprites share the same height, given at
    /// full zoom and scaled for the smaller levels.
    #[must_use]
    pub fn uniform(sprite_count: usize, gfx_height: u32) -> Self {
        let pages = |zoom: Zoom, sprites_per_row: u32| {
            let height = gfx_height * zoom.tile_height() as u32 / Zoom::Gfx.tile_height() as u32;
            AtlasPages {
                sprites_per_row,
                heights: vec![height; sprite_count],
            }
        };
        Self {
            sgfx: pages(Zoom::Sgfx, 64),
            mgfx: pages(Zoom::Mgfx, 32),
            gfx: pages(Zoom::Gfx, 16),
        }
    }

    /// Parses a layout from JSON text.
    pub fn from_json_str(json: &str, what: &str) -> Result<Self, WorldError> {
        serde_json::from_str(json).map_err(|source| WorldError::Json {
            what: what.to_owned(),
            source,
        })
    }

    /// Reads and parses a layout file.
    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let json = fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json, &path.display().to_string())
    }

    /// Grid used at the provided zoom.
    #[must_use]
    pub fn pages(&self, zoom: Zoom) -> &AtlasPages {
        match zoom {
            Zoom::Sgfx => &self.sgfx,
            Zoom::Mgfx => &self.mgfx,
            Zoom::Gfx => &self.gfx,
        }
    }
}

impl SpriteAtlas for AtlasLayout {
    fn sprite(&self, gfx: u32, zoom: Zoom) -> Option<SpriteInfo> {
        self.pages(zoom).sprite(gfx, zoom)
    }
}
