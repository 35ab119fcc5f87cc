#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for generating, inspecting and editing city maps.

mod config;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use glam::Vec2;
use isocity_core::{
    BuildingId, BuildingSelection, ChangeRotation, ChangeZoom, Command, Event, GridDimensions,
    Rotation, WorldPosition, Zoom,
};
use isocity_rendering::{
    frame_commands, Camera, Color, FrameInput, FrameSink, HeadlessBackend, Presentation, Scene,
};
use isocity_system_builder::{Builder, BuilderInput};
use isocity_system_map_generator::{IslandPalette, MapGenerator};
use isocity_world::{
    apply, query, AtlasLayout, BuildingTable, LayerKind, Tile, World, WorldContext,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

const VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);

#[derive(Debug, Parser)]
#[command(name = "isocity", about = "Isometric city map tooling")]
struct Cli {
    /// Configuration file; `isocity.toml` in the working directory is used
    /// when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Args)]
struct ResourceArgs {
    /// Map JSON file.
    #[arg(long)]
    map: Option<PathBuf>,
    /// Building table JSON file.
    #[arg(long)]
    buildings: Option<PathBuf>,
    /// Sprite atlas layout JSON file.
    #[arg(long)]
    atlas: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Writes a fresh island map unless the file already exists.
    Generate {
        #[arg(long, default_value_t = 32)]
        width: i32,
        #[arg(long, default_value_t = 32)]
        height: i32,
        /// Destination; defaults to the configured map path.
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        grass: u32,
        #[arg(long, default_value_t = 2)]
        coast: u32,
        #[arg(long, default_value_t = 3)]
        coast_corner: u32,
    },
    /// Loads a map and prints a summary of its layers.
    Inspect {
        #[command(flatten)]
        resources: ResourceArgs,
    },
    /// Places one building and optionally saves the result.
    Place {
        #[command(flatten)]
        resources: ResourceArgs,
        #[arg(long)]
        building: u32,
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
        /// DEG0, DEG90, DEG180 or DEG270.
        #[arg(long, default_value = "DEG0", value_parser = parse_rotation)]
        orientation: Rotation,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replays a scripted camera tour through the headless backend.
    Run {
        #[command(flatten)]
        resources: ResourceArgs,
        #[arg(long, default_value_t = 8)]
        frames: usize,
        #[arg(long, default_value = "terrain_and_buildings", value_parser = parse_layer)]
        layer: LayerKind,
        /// Draws the grid overlay on top of the layer.
        #[arg(long)]
        grid: bool,
        /// Building staged for placement at the view centre on the first frame.
        #[arg(long)]
        select: Option<u32>,
    },
}

fn parse_rotation(value: &str) -> Result<Rotation, String> {
    Rotation::from_name(value).ok_or_else(|| format!("unknown rotation `{value}`"))
}

fn parse_layer(value: &str) -> Result<LayerKind, String> {
    LayerKind::ALL
        .into_iter()
        .find(|kind| kind.name() == value)
        .ok_or_else(|| format!("unknown layer `{value}`"))
}

/// Entry point for the isocity command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter()))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        CliCommand::Generate {
            width,
            height,
            output,
            grass,
            coast,
            coast_corner,
        } => {
            if width <= 0 || height <= 0 {
                bail!("map dimensions must be positive, got {width}x{height}");
            }
            let path = match output {
                Some(path) => path,
                None => config.map()?.to_path_buf(),
            };
            let generator = MapGenerator::new(IslandPalette {
                grass: BuildingId::new(grass),
                coast: BuildingId::new(coast),
                coast_corner: BuildingId::new(coast_corner),
            });
            if generator.write(GridDimensions::new(width, height), &path)? {
                println!("wrote {width}x{height} map to {}", path.display());
            } else {
                println!("{} already exists, left untouched", path.display());
            }
        }
        CliCommand::Inspect { resources } => {
            let world = load_world(config.with_overrides(
                resources.map,
                resources.buildings,
                resources.atlas,
            ))?;
            print_summary(&world);
        }
        CliCommand::Place {
            resources,
            building,
            x,
            y,
            orientation,
            output,
        } => {
            let mut world = load_world(config.with_overrides(
                resources.map,
                resources.buildings,
                resources.atlas,
            ))?;
            place(&mut world, building, WorldPosition::new(x, y), orientation)?;
            if let Some(path) = output {
                world.to_document().save(&path)?;
                println!("saved map to {}", path.display());
            }
        }
        CliCommand::Run {
            resources,
            frames,
            layer,
            grid,
            select,
        } => {
            let world = load_world(config.with_overrides(
                resources.map,
                resources.buildings,
                resources.atlas,
            ))?;
            run(world, frames, layer, grid, select.map(BuildingId::new))?;
        }
    }
    Ok(())
}

fn load_world(config: Config) -> Result<World> {
    let buildings = BuildingTable::load(config.buildings()?)?;
    let atlas = AtlasLayout::load(config.atlas()?)?;
    info!(buildings = buildings.len(), "loaded building table");
    let context = WorldContext::new(Arc::new(buildings), Arc::new(atlas));
    let map = config.map()?;
    World::load(map, context).with_context(|| format!("failed to load map {}", map.display()))
}

fn print_summary(world: &World) {
    let dimensions = query::dimensions(world);
    println!(
        "world {}x{} ({} tiles)",
        dimensions.width(),
        dimensions.height(),
        dimensions.tile_count()
    );
    for kind in LayerKind::ALL {
        let layer = query::layer(world, kind);
        let occupied = layer.tiles().iter().filter(|tile| tile.has_building()).count();
        let sprites = layer
            .instances(Zoom::Gfx, Rotation::Deg0)
            .as_slice()
            .iter()
            .filter(|instance| instance.has_sprite())
            .count();
        println!(
            "{:>22}: {occupied} tiles with a building, {sprites} sprite instances",
            kind.name()
        );
    }
}

fn place(
    world: &mut World,
    building: u32,
    origin: WorldPosition,
    orientation: Rotation,
) -> Result<()> {
    let selection = BuildingSelection::new(BuildingId::new(building), orientation);
    let mut events = Vec::new();
    apply(
        world,
        Command::PlaceBuilding { selection, origin },
        &mut events,
    )?;
    for event in events {
        match event {
            Event::BuildingPlaced { cells, .. } => {
                println!("placed building {building} on {} tiles", cells.len());
            }
            Event::BuildingPlacementRejected { reason, .. } => {
                bail!("placement of building {building} at {origin:?} rejected: {reason:?}");
            }
            other => println!("{other:?}"),
        }
    }
    Ok(())
}

fn tour_script(frames: usize, stage_building: bool) -> Vec<FrameInput> {
    let centre = VIEWPORT / 2.0;
    (0..frames)
        .map(|frame| FrameInput {
            rotate: Some(ChangeRotation::Right),
            zoom: match frame % 8 {
                3 => Some(ChangeZoom::Out),
                7 => Some(ChangeZoom::In),
                _ => None,
            },
            action: None,
            cursor: Some(centre),
            confirm_action: stage_building && frame == 0,
            turn_selection: None,
        })
        .collect()
}

fn run(
    mut world: World,
    frames: usize,
    layer: LayerKind,
    show_grid: bool,
    select: Option<BuildingId>,
) -> Result<()> {
    let mut events = Vec::new();
    if let Some(building) = select {
        let selection = BuildingSelection::new(building, Rotation::Deg0);
        apply(
            &mut world,
            Command::SelectBuilding {
                selection: Some(selection),
            },
            &mut events,
        )?;
    }

    let scene = Scene::new(&world, layer, show_grid)?;
    let presentation = Presentation::new("isocity", Color::from_rgb_u8(24, 64, 96), scene);
    let backend = HeadlessBackend::new(
        tour_script(frames, select.is_some()),
        Duration::from_millis(16),
    );
    let mut builder = Builder::new();
    let mut placed = 0_usize;

    let stats = backend.run_collecting(
        presentation,
        |_delta, input: FrameInput, scene: &mut Scene, sink: &mut dyn FrameSink| {
            let camera = Camera::centered_on(
                query::dimensions(&world),
                query::zoom(&world),
                query::rotation(&world),
                VIEWPORT,
            );
            events.clear();
            for command in frame_commands(&world, &camera, &input) {
                apply(&mut world, command, &mut events)?;
            }

            let preview = query::placement_preview(&world)?;
            let builder_input = BuilderInput::new(
                input.confirm_action,
                input.turn_selection,
                query::hovered_position(&world),
            );
            let buildings = query::layer(&world, LayerKind::Buildings);
            let mut follow_up = Vec::new();
            builder.handle(
                &events,
                preview.as_ref(),
                builder_input,
                |position| buildings.tile_at(position).and_then(Tile::building),
                &mut follow_up,
            );
            for command in follow_up {
                apply(&mut world, command, &mut events)?;
            }
            placed += events
                .iter()
                .filter(|event| matches!(event, Event::BuildingPlaced { .. }))
                .count();

            scene.sync(&world)?;
            scene.submit(&world, sink)?;
            Ok(())
        },
    )?;

    let instances: usize = stats.iter().map(|frame| frame.instances).sum();
    let bytes: usize = stats.iter().map(|frame| frame.bytes).sum();
    println!(
        "rendered {} frames: {instances} instances, {bytes} bytes, {placed} buildings placed",
        stats.len()
    );
    println!(
        "final view: {} at {}",
        query::rotation(&world).name(),
        query::zoom(&world).name()
    );
    Ok(())
}
