use std::{mem::size_of, sync::Arc, time::Duration};

use glam::Vec2;
use isocity_core::{
    Building, BuildingId, BuildingKind, ChangeRotation, Command, FootprintSize, GridDimensions,
    Rotation, WorldPosition, Zoom,
};
use isocity_rendering::{
    frame_commands, pick_tile, Camera, Color, FrameInput, FrameSink, HeadlessBackend,
    Presentation, RenderingError, Scene,
};
use isocity_world::{
    apply, query, AtlasLayout, BuildingTable, LayerKind, MapDocument, TileInstance, TileRecord,
    World, WorldContext,
};

const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

fn grass_world(side: i32) -> World {
    let table = BuildingTable::from_buildings([Building {
        id: BuildingId::new(1),
        gfx: 0,
        size: FootprintSize::new(1, 1),
        rotate: 0,
        posoffs: 0,
        kind: BuildingKind::Ground,
        coastal: false,
    }])
    .expect("building table");
    let context = WorldContext::new(Arc::new(table), Arc::new(AtlasLayout::uniform(4, 32)));
    let dimensions = GridDimensions::new(side, side);
    let count = dimensions.tile_count();
    let document = MapDocument::new(
        dimensions,
        vec![TileRecord::building(BuildingId::new(1), Rotation::Deg0); count],
        vec![TileRecord::empty(); count],
    );
    World::from_document(document, context).expect("world builds")
}

fn centred_camera(world: &World) -> Camera {
    Camera::centered_on(
        query::dimensions(world),
        query::zoom(world),
        query::rotation(world),
        VIEWPORT,
    )
}

#[test]
fn cursor_resolves_to_the_tile_under_it() {
    let world = grass_world(4);
    let camera = centred_camera(&world);
    // The view centre sits on the seam above tile (2, 2); half a tile lower
    // is that tile's centre.
    let cursor = VIEWPORT / 2.0 + Vec2::new(0.0, 16.0);
    assert_eq!(
        pick_tile(&world, &camera, cursor),
        Some(WorldPosition::new(2, 2))
    );
    assert_eq!(pick_tile(&world, &camera, Vec2::new(-500.0, -500.0)), None);
}

#[test]
fn frame_input_becomes_commands_with_picking_first() {
    let world = grass_world(4);
    let camera = centred_camera(&world);
    let input = FrameInput {
        rotate: Some(ChangeRotation::Right),
        cursor: Some(VIEWPORT / 2.0 + Vec2::new(0.0, 16.0)),
        confirm_action: true,
        ..FrameInput::default()
    };

    let commands = frame_commands(&world, &camera, &input);
    let position = WorldPosition::new(2, 2);
    assert_eq!(
        commands,
        vec![
            Command::MouseMoved {
                position: Some(position)
            },
            Command::LeftMouseButtonPressed { position },
            Command::RotateWorld {
                change: ChangeRotation::Right
            },
        ]
    );
}

#[test]
fn clicks_off_the_map_are_dropped() {
    let world = grass_world(4);
    let camera = centred_camera(&world);
    let input = FrameInput {
        cursor: Some(Vec2::new(0.0, 0.0)),
        confirm_action: true,
        ..FrameInput::default()
    };
    assert_eq!(
        frame_commands(&world, &camera, &input),
        vec![Command::MouseMoved { position: None }]
    );
}

#[test]
fn headless_backend_counts_every_batch() {
    let mut world = grass_world(4);
    let scene = Scene::new(&world, LayerKind::TerrainAndBuildings, true).expect("scene");
    let presentation = Presentation::new("test", Color::from_rgb_u8(0, 0, 0), scene);
    let script = vec![
        FrameInput {
            rotate: Some(ChangeRotation::Right),
            ..FrameInput::default()
        };
        3
    ];
    let backend = HeadlessBackend::new(script, Duration::from_millis(16));

    let stats = backend
        .run_collecting(
            presentation,
            |_, input, scene: &mut Scene, sink: &mut dyn FrameSink| {
                let camera = centred_camera(&world);
                let mut events = Vec::new();
                for command in frame_commands(&world, &camera, &input) {
                    apply(&mut world, command, &mut events)?;
                }
                scene.sync(&world)?;
                scene.submit(&world, sink)?;
                Ok(())
            },
        )
        .expect("script runs");

    assert_eq!(stats.len(), 3, "one entry per scripted frame");
    for frame in &stats {
        assert_eq!(frame.batches, 2, "layer plus grid overlay");
        assert_eq!(frame.instances, 32);
        assert_eq!(frame.bytes, 32 * size_of::<TileInstance>());
    }
    assert_eq!(query::rotation(&world), Rotation::Deg270);
    assert_eq!(query::zoom(&world), Zoom::Gfx);
}

#[test]
fn grid_cannot_be_the_base_layer() {
    let world = grass_world(2);
    assert_eq!(
        Scene::new(&world, LayerKind::Grid, false),
        Err(RenderingError::OverlayAsBaseLayer)
    );
}

#[test]
fn batches_must_cover_the_whole_world() {
    let world = grass_world(4);
    let small = grass_world(2);
    let scene = Scene::new(&world, LayerKind::Terrain, false).expect("scene");
    let small_scene = Scene::new(&small, LayerKind::Terrain, false).expect("scene");
    let presentation = Presentation::new("test", Color::from_rgb_u8(0, 0, 0), scene);
    let backend = HeadlessBackend::new(vec![FrameInput::default()], Duration::ZERO);

    let error = backend
        .run_collecting(presentation, |_, _, _, sink: &mut dyn FrameSink| {
            small_scene.submit(&small, sink)?;
            Ok(())
        })
        .expect_err("short batch is rejected");

    assert_eq!(
        error.downcast_ref::<RenderingError>(),
        Some(&RenderingError::IncompleteBatch {
            layer: LayerKind::Terrain,
            expected: 16,
            found: 4,
        })
    );
}
