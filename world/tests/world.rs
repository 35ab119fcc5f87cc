use std::sync::Arc;

use glam::Vec2;
use isocity_core::{
    Action, Building, BuildingId, BuildingKind, BuildingSelection, ChangeRotation, Command,
    DemolitionError, Event, FootprintSize, GridDimensions, PlacementError, Rotation, WorldPosition,
    Zoom,
};
use isocity_world::{
    apply, query, AtlasLayout, BuildingTable, LayerKind, MapDocument, SpriteAtlas, TileRecord,
    World, WorldContext, WorldError,
};

const GRASS: u32 = 1;
const COAST_CORNER: u32 = 3;
const HOUSE: u32 = 10;
const BAKERY: u32 = 11;
const WAREHOUSE: u32 = 12;
const PIER: u32 = 13;
/// Points at a sprite past the end of the atlas.
const FOUNTAIN: u32 = 14;

fn definition(id: u32, gfx: u32, size: (i32, i32), rotate: u32, kind: BuildingKind) -> Building {
    Building {
        id: BuildingId::new(id),
        gfx,
        size: FootprintSize::new(size.0, size.1),
        rotate,
        posoffs: 0,
        kind,
        coastal: false,
    }
}

fn context() -> WorldContext {
    let mut pier = definition(PIER, 300, (1, 1), 0, BuildingKind::Other);
    pier.coastal = true;
    let table = BuildingTable::from_buildings([
        definition(GRASS, 0, (1, 1), 0, BuildingKind::Ground),
        definition(COAST_CORNER, 8, (1, 1), 1, BuildingKind::Coast),
        definition(HOUSE, 3760, (1, 1), 1, BuildingKind::Workshop),
        definition(BAKERY, 100, (2, 2), 4, BuildingKind::Workshop),
        definition(WAREHOUSE, 200, (2, 1), 2, BuildingKind::Workshop),
        definition(FOUNTAIN, 5000, (2, 1), 0, BuildingKind::Other),
        pier,
    ])
    .expect("building table");
    WorldContext::new(Arc::new(table), Arc::new(AtlasLayout::uniform(4000, 48)))
}

/// 4x4 grass island with a coast corner at (0, 0).
fn document() -> MapDocument {
    let dimensions = GridDimensions::new(4, 4);
    let mut terrain = vec![TileRecord::building(BuildingId::new(GRASS), Rotation::Deg0); 16];
    terrain[0] = TileRecord::building(BuildingId::new(COAST_CORNER), Rotation::Deg90);
    MapDocument::new(dimensions, terrain, vec![TileRecord::empty(); 16])
}

fn world() -> World {
    World::from_document(document(), context()).expect("world builds")
}

fn run(world: &mut World, commands: Vec<Command>) -> Vec<Event> {
    let mut events = Vec::new();
    for command in commands {
        apply(world, command, &mut events).expect("command applies");
    }
    events
}

fn place(world: &mut World, building: u32, orientation: Rotation, x: i32, y: i32) -> Vec<Event> {
    run(
        world,
        vec![Command::PlaceBuilding {
            selection: BuildingSelection::new(BuildingId::new(building), orientation),
            origin: WorldPosition::new(x, y),
        }],
    )
}

fn assert_merge_correspondence(world: &World) {
    let terrain = query::layer(world, LayerKind::Terrain);
    let buildings = query::layer(world, LayerKind::Buildings);
    let merged = query::layer(world, LayerKind::TerrainAndBuildings);
    for zoom in Zoom::ALL {
        for rotation in Rotation::ALL {
            let instances = merged.instances(zoom, rotation);
            assert_eq!(instances.len(), 16, "merged buffer must stay fully populated");
            for (draw_position, &index) in buildings.sorted_tiles(rotation).iter().enumerate() {
                let source = if buildings.tiles()[index].has_building() {
                    buildings
                } else {
                    terrain
                };
                assert_eq!(
                    instances.get(draw_position),
                    source.instances(zoom, rotation).get(draw_position),
                    "draw position {draw_position} diverged at {zoom:?} {rotation:?}"
                );
            }
        }
    }
}

#[test]
fn screen_extent_of_a_four_by_four_world() {
    let world = world();
    assert_eq!(query::world_to_screen(&world, WorldPosition::new(0, 0)), Vec2::ZERO);

    let far = query::world_to_screen(&world, WorldPosition::new(3, 3));
    let dimensions = query::dimensions(&world);
    let deepest = (0..16)
        .map(|index| query::world_to_screen(&world, dimensions.position_of(index)).y)
        .fold(f32::MIN, f32::max);
    assert_eq!(far, Vec2::new(0.0, 96.0));
    assert_eq!(far.y, deepest);
}

#[test]
fn map_index_locates_the_tile_in_draw_order() {
    for _ in 0..2 {
        let mut world = world();
        let _ = run(
            &mut world,
            vec![Command::RotateWorld {
                change: ChangeRotation::Right,
            }],
        );
        let position = WorldPosition::new(1, 2);
        let key = query::map_index(&world, position);
        assert_eq!(key, 10);

        let sorted = query::layer(&world, LayerKind::Terrain).sorted_tiles(Rotation::Deg90);
        assert_eq!(sorted[key], 9, "DEG90 key 10 must draw storage index 9");
    }
}

#[test]
fn draw_order_is_monotonic_in_every_layer() {
    let world = world();
    for kind in LayerKind::ALL {
        let layer = query::layer(&world, kind);
        for rotation in Rotation::ALL {
            let sorted = layer.sorted_tiles(rotation);
            let mut storage = sorted.to_vec();
            storage.sort_unstable();
            assert_eq!(storage, (0..16).collect::<Vec<_>>(), "{kind:?} {rotation:?}");
            for pair in sorted.windows(2) {
                assert!(
                    layer.tiles()[pair[0]].index(rotation) <= layer.tiles()[pair[1]].index(rotation)
                );
            }
        }
    }
}

#[test]
fn strided_building_changes_sprite_with_the_camera() {
    let mut world = world();
    let _ = place(&mut world, HOUSE, Rotation::Deg0, 2, 2);
    let context = context();
    let house = query::building(&world, BuildingId::new(HOUSE)).expect("house defined");
    let merged = query::layer(&world, LayerKind::TerrainAndBuildings);
    let tile = merged.tile_at(WorldPosition::new(2, 2)).expect("tile in world");

    assert_eq!(tile.sprite(Rotation::Deg0, house), 3760);
    assert_eq!(tile.sprite(Rotation::Deg90, house), 3761);

    let index = GridDimensions::new(4, 4).map_index(WorldPosition::new(2, 2), Rotation::Deg0);
    for (rotation, gfx) in [(Rotation::Deg0, 3760), (Rotation::Deg90, 3761)] {
        let draw_position = merged.draw_position(rotation, index).expect("indexed");
        let instance = merged
            .instances(Zoom::Gfx, rotation)
            .get(draw_position)
            .expect("instance");
        let sprite = context.atlas().sprite(gfx, Zoom::Gfx).expect("sprite");
        assert_eq!(instance.atlas_index, sprite.atlas_index);
        assert_eq!(instance.texture_offset, sprite.texture_offset.to_array());
    }
}

#[test]
fn placement_updates_the_merged_layer() {
    let mut world = world();
    let events = place(&mut world, BAKERY, Rotation::Deg0, 1, 1);
    assert_eq!(
        events,
        vec![Event::BuildingPlaced {
            selection: BuildingSelection::new(BuildingId::new(BAKERY), Rotation::Deg0),
            origin: WorldPosition::new(1, 1),
            cells: vec![
                WorldPosition::new(1, 1),
                WorldPosition::new(2, 1),
                WorldPosition::new(1, 2),
                WorldPosition::new(2, 2),
            ],
        }]
    );
    assert_merge_correspondence(&world);

    let _ = place(&mut world, WAREHOUSE, Rotation::Deg90, 3, 1);
    assert_merge_correspondence(&world);
    let buildings = query::layer(&world, LayerKind::Buildings);
    let lower = buildings.tile_at(WorldPosition::new(3, 2)).expect("tile");
    assert_eq!(lower.building(), Some(BuildingId::new(WAREHOUSE)));
    assert_eq!(lower.footprint_offset(), WorldPosition::new(0, 1));
}

#[test]
fn footprint_past_the_east_edge_is_rejected() {
    let mut world = world();
    let events = place(&mut world, WAREHOUSE, Rotation::Deg0, 3, 0);
    assert!(matches!(
        events.as_slice(),
        [Event::BuildingPlacementRejected {
            reason: PlacementError::OutOfBounds,
            ..
        }]
    ));

    let events = place(&mut world, WAREHOUSE, Rotation::Deg0, 2, 0);
    assert!(matches!(events.as_slice(), [Event::BuildingPlaced { .. }]));
}

#[test]
fn land_buildings_are_kept_off_the_coast() {
    let mut world = world();
    let events = place(&mut world, HOUSE, Rotation::Deg0, 0, 0);
    assert!(matches!(
        events.as_slice(),
        [Event::BuildingPlacementRejected {
            reason: PlacementError::OnWaterOrCoast,
            ..
        }]
    ));

    let events = place(&mut world, PIER, Rotation::Deg0, 0, 0);
    assert!(matches!(events.as_slice(), [Event::BuildingPlaced { .. }]));
}

#[test]
fn rejected_placement_leaves_every_layer_untouched() {
    let mut world = world();
    let _ = place(&mut world, HOUSE, Rotation::Deg0, 1, 1);
    let before = query::layer(&world, LayerKind::TerrainAndBuildings).clone();

    let events = place(&mut world, BAKERY, Rotation::Deg0, 0, 1);
    assert!(matches!(
        events.as_slice(),
        [Event::BuildingPlacementRejected {
            reason: PlacementError::Occupied,
            ..
        }]
    ));

    let after = query::layer(&world, LayerKind::TerrainAndBuildings);
    assert_eq!(after.tiles(), before.tiles());
    for zoom in Zoom::ALL {
        for rotation in Rotation::ALL {
            assert_eq!(after.instances(zoom, rotation), before.instances(zoom, rotation));
        }
    }
}

#[test]
fn missing_sprite_fails_placement_without_writing() {
    let mut world = world();
    let _ = place(&mut world, HOUSE, Rotation::Deg0, 1, 1);
    let document = world.to_document();
    let layers: Vec<_> = LayerKind::ALL
        .into_iter()
        .map(|kind| query::layer(&world, kind).clone())
        .collect();

    let mut events = Vec::new();
    let result = apply(
        &mut world,
        Command::PlaceBuilding {
            selection: BuildingSelection::new(BuildingId::new(FOUNTAIN), Rotation::Deg0),
            origin: WorldPosition::new(2, 2),
        },
        &mut events,
    );

    assert!(
        matches!(result, Err(WorldError::UnknownSprite { gfx: 5000, .. })),
        "unexpected result {result:?}"
    );
    assert!(events.is_empty(), "a failed placement reports nothing");
    assert_eq!(world.to_document(), document);
    for (kind, before) in LayerKind::ALL.into_iter().zip(&layers) {
        let after = query::layer(&world, kind);
        assert_eq!(after.tiles(), before.tiles(), "{} tiles changed", kind.name());
        for zoom in Zoom::ALL {
            for rotation in Rotation::ALL {
                assert_eq!(
                    after.instances(zoom, rotation),
                    before.instances(zoom, rotation),
                    "{} instances changed at {zoom:?} {rotation:?}",
                    kind.name()
                );
            }
        }
    }
    assert_merge_correspondence(&world);
}

#[test]
fn placement_requires_build_mode() {
    let mut world = world();
    let _ = run(
        &mut world,
        vec![Command::SetAction {
            action: Action::Status,
        }],
    );
    let events = place(&mut world, HOUSE, Rotation::Deg0, 1, 1);
    assert!(matches!(
        events.as_slice(),
        [Event::BuildingPlacementRejected {
            reason: PlacementError::InvalidMode,
            ..
        }]
    ));
}

#[test]
fn demolition_clears_the_whole_footprint() {
    let mut world = world();
    let pristine = query::layer(&world, LayerKind::TerrainAndBuildings).clone();
    let _ = place(&mut world, BAKERY, Rotation::Deg90, 1, 1);

    let events = run(
        &mut world,
        vec![
            Command::SetAction {
                action: Action::Demolish,
            },
            Command::DemolishBuilding {
                position: WorldPosition::new(2, 2),
            },
        ],
    );
    assert!(events.contains(&Event::BuildingDemolished {
        building: BuildingId::new(BAKERY),
        origin: WorldPosition::new(1, 1),
        cells: vec![
            WorldPosition::new(1, 1),
            WorldPosition::new(2, 1),
            WorldPosition::new(1, 2),
            WorldPosition::new(2, 2),
        ],
    }));

    let merged = query::layer(&world, LayerKind::TerrainAndBuildings);
    assert_eq!(merged.tiles(), pristine.tiles());
    for zoom in Zoom::ALL {
        for rotation in Rotation::ALL {
            assert_eq!(merged.instances(zoom, rotation), pristine.instances(zoom, rotation));
        }
    }

    let events = run(
        &mut world,
        vec![Command::DemolishBuilding {
            position: WorldPosition::new(2, 2),
        }],
    );
    assert_eq!(
        events,
        vec![Event::DemolitionRejected {
            position: WorldPosition::new(2, 2),
            reason: DemolitionError::MissingBuilding,
        }]
    );
}

#[test]
fn preview_follows_the_cursor_and_selection() {
    let mut world = world();
    let selection = BuildingSelection::new(BuildingId::new(WAREHOUSE), Rotation::Deg0);
    let _ = run(
        &mut world,
        vec![
            Command::SelectBuilding {
                selection: Some(selection),
            },
            Command::MouseMoved {
                position: Some(WorldPosition::new(3, 2)),
            },
        ],
    );
    let preview = query::placement_preview(&world)
        .expect("lookups resolve")
        .expect("preview available");
    assert_eq!(preview.rejection, Some(PlacementError::OutOfBounds));
    assert_eq!(preview.cells, vec![WorldPosition::new(3, 2)]);

    let events = run(
        &mut world,
        vec![Command::RotateSelection {
            change: ChangeRotation::Right,
        }],
    );
    assert_eq!(
        events,
        vec![Event::SelectionChanged {
            selection: Some(BuildingSelection::new(
                BuildingId::new(WAREHOUSE),
                Rotation::Deg90
            )),
        }]
    );
    let preview = query::placement_preview(&world)
        .expect("lookups resolve")
        .expect("preview available");
    assert!(preview.is_valid());
    assert_eq!(
        preview.cells,
        vec![WorldPosition::new(3, 2), WorldPosition::new(3, 3)]
    );
}

#[test]
fn leaving_build_mode_drops_the_selection() {
    let mut world = world();
    let selection = BuildingSelection::new(BuildingId::new(HOUSE), Rotation::Deg0);
    let events = run(
        &mut world,
        vec![
            Command::SelectBuilding {
                selection: Some(selection),
            },
            Command::SetAction {
                action: Action::Status,
            },
        ],
    );
    assert_eq!(
        events,
        vec![
            Event::SelectionChanged {
                selection: Some(selection)
            },
            Event::SelectionChanged { selection: None },
            Event::ActionChanged {
                action: Action::Status
            },
        ]
    );
    assert_eq!(query::selection(&world), None);
    assert_eq!(query::placement_preview(&world).expect("query"), None);
}

#[test]
fn status_inspection_reports_the_building_on_top() {
    let mut world = world();
    let _ = place(&mut world, HOUSE, Rotation::Deg0, 2, 3);
    let events = run(
        &mut world,
        vec![
            Command::SetAction {
                action: Action::Status,
            },
            Command::LeftMouseButtonPressed {
                position: WorldPosition::new(2, 3),
            },
        ],
    );
    assert!(events.contains(&Event::TileInspected {
        position: WorldPosition::new(2, 3),
        index: 14,
    }));
    let tile = query::inspected_tile(&world).expect("tile inspected");
    assert_eq!(tile.building(), Some(BuildingId::new(HOUSE)));
}

#[test]
fn exported_document_rebuilds_the_same_world() {
    let mut world = world();
    let _ = place(&mut world, BAKERY, Rotation::Deg180, 1, 1);
    let _ = place(&mut world, PIER, Rotation::Deg0, 0, 0);

    let directory = tempfile::tempdir().expect("temp dir");
    let path = directory.path().join("island.json");
    world.to_document().save(&path).expect("map saves");
    let restored = World::load(&path, context()).expect("map loads");

    let original = query::layer(&world, LayerKind::TerrainAndBuildings);
    let reloaded = query::layer(&restored, LayerKind::TerrainAndBuildings);
    assert_eq!(reloaded.tiles(), original.tiles());
    for zoom in Zoom::ALL {
        for rotation in Rotation::ALL {
            assert_eq!(reloaded.instances(zoom, rotation), original.instances(zoom, rotation));
        }
    }
}

#[test]
fn unknown_building_ids_abort_construction() {
    let mut document = document();
    let records = document.layers[1]
        .get_mut("buildings")
        .expect("buildings layer");
    records[5] = TileRecord::building(BuildingId::new(999), Rotation::Deg0);

    let result = World::from_document(document, context());
    assert!(matches!(
        result,
        Err(WorldError::UnknownBuilding { id }) if id == BuildingId::new(999)
    ));
}

#[test]
fn picking_resolves_rotated_views() {
    let mut world = world();
    let _ = run(
        &mut world,
        vec![Command::RotateWorld {
            change: ChangeRotation::Left,
        }],
    );
    let target = WorldPosition::new(1, 3);
    let centre = Vec2::new(32.0, 16.0);
    let screen = query::world_to_screen(&world, target) + centre;
    assert_eq!(query::screen_to_world(&world, screen), Some(target));
}
