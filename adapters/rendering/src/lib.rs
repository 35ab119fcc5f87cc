#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for isometric city adapters.
//!
//! Backends never interpret the world themselves. Each frame they hand the
//! adapter a [`FrameInput`], the adapter turns it into world commands with
//! [`frame_commands`], and the resulting [`Scene`] submits draw-ordered
//! instance buffers to the backend through a [`FrameSink`].

use std::time::Duration;

use anyhow::Result as AnyResult;
use glam::Vec2;
use isocity_core::{
    Action, ChangeRotation, ChangeZoom, Command, GridDimensions, PlacementPreview, Rotation,
    WorldPosition, Zoom,
};
use isocity_world::{query, InstanceBuffer, LayerKind, World, WorldError};
use thiserror::Error;
use tracing::trace;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Camera quarter turn requested on this frame.
    pub rotate: Option<ChangeRotation>,
    /// Zoom step requested on this frame.
    pub zoom: Option<ChangeZoom>,
    /// Interaction mode chosen from the menu on this frame.
    pub action: Option<Action>,
    /// Cursor position in window pixels.
    pub cursor: Option<Vec2>,
    /// Whether the primary button was pressed on this frame.
    pub confirm_action: bool,
    /// Quarter turn of the staged building requested on this frame.
    pub turn_selection: Option<ChangeRotation>,
}

/// Window placement over the projected world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Projected world pixel shown at the window's top-left corner.
    pub position: Vec2,
}

impl Camera {
    /// Camera whose window of `viewport` pixels is centred on the world.
    #[must_use]
    pub fn centered_on(
        dimensions: GridDimensions,
        zoom: Zoom,
        rotation: Rotation,
        viewport: Vec2,
    ) -> Self {
        let columns = dimensions.rotated_width(rotation) as f32;
        let rows = dimensions.rotated_height(rotation) as f32;
        let half_width = zoom.tile_width_half() as f32;
        let half_height = zoom.tile_height_half() as f32;
        let left = -(rows - 1.0) * half_width;
        let right = columns * half_width + half_width;
        let bottom = (columns + rows) * half_height;
        let centre = Vec2::new((left + right) / 2.0, bottom / 2.0);
        Self {
            position: centre - viewport / 2.0,
        }
    }

    /// Converts a window pixel to a projected world pixel.
    #[must_use]
    pub fn window_to_world(&self, window: Vec2) -> Vec2 {
        window + self.position
    }
}

/// Resolves the world tile under a window pixel.
#[must_use]
pub fn pick_tile(world: &World, camera: &Camera, cursor: Vec2) -> Option<WorldPosition> {
    query::screen_to_world(world, camera.window_to_world(cursor))
}

/// Translates one frame of input into world commands.
///
/// Mouse commands come before any camera change so that the cursor is
/// resolved against the view the player saw when acting.
#[must_use]
pub fn frame_commands(world: &World, camera: &Camera, input: &FrameInput) -> Vec<Command> {
    let picked = input
        .cursor
        .and_then(|cursor| pick_tile(world, camera, cursor));
    let mut commands = vec![Command::MouseMoved { position: picked }];
    if input.confirm_action {
        if let Some(position) = picked {
            commands.push(Command::LeftMouseButtonPressed { position });
        }
    }
    if let Some(action) = input.action {
        commands.push(Command::SetAction { action });
    }
    if let Some(change) = input.rotate {
        commands.push(Command::RotateWorld { change });
    }
    if let Some(change) = input.zoom {
        commands.push(Command::ZoomWorld { change });
    }
    commands
}

/// One instance buffer the backend should draw.
#[derive(Clone, Copy, Debug)]
pub struct DrawBatch<'a> {
    /// Layer the instances come from.
    pub layer: LayerKind,
    /// Zoom level the instances were derived for.
    pub zoom: Zoom,
    /// Rotation the instances were derived for.
    pub rotation: Rotation,
    /// Draw-ordered instances.
    pub instances: &'a InstanceBuffer,
}

/// Receives draw batches in back-to-front order.
pub trait FrameSink {
    /// Draws one batch on top of everything submitted earlier in the frame.
    fn draw(&mut self, batch: DrawBatch<'_>) -> Result<(), RenderingError>;
}

/// What the adapter wants shown on the next frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Tile layer drawn first.
    pub layer: LayerKind,
    /// Whether the grid overlay is drawn on top.
    pub show_grid: bool,
    /// Zoom level copied from the world.
    pub zoom: Zoom,
    /// Rotation copied from the world.
    pub rotation: Rotation,
    /// Number of tiles every batch must contain.
    pub tile_count: usize,
    /// Placement preview copied from the world.
    pub preview: Option<PlacementPreview>,
}

impl Scene {
    /// Creates a scene showing `layer`, which must be a tile layer rather
    /// than the grid overlay.
    pub fn new(world: &World, layer: LayerKind, show_grid: bool) -> Result<Self, RenderingError> {
        if layer == LayerKind::Grid {
            return Err(RenderingError::OverlayAsBaseLayer);
        }
        Ok(Self {
            layer,
            show_grid,
            zoom: query::zoom(world),
            rotation: query::rotation(world),
            tile_count: query::dimensions(world).tile_count(),
            preview: None,
        })
    }

    /// Copies the world's current view state.
    pub fn sync(&mut self, world: &World) -> Result<(), WorldError> {
        self.zoom = query::zoom(world);
        self.rotation = query::rotation(world);
        self.tile_count = query::dimensions(world).tile_count();
        self.preview = query::placement_preview(world)?;
        Ok(())
    }

    /// Submits the scene's batches, the tile layer before the overlay.
    pub fn submit(&self, world: &World, sink: &mut dyn FrameSink) -> Result<(), RenderingError> {
        let overlay = self.show_grid.then_some(LayerKind::Grid);
        for layer in std::iter::once(self.layer).chain(overlay) {
            let instances = query::layer(world, layer).instances(self.zoom, self.rotation);
            trace!(layer = layer.name(), instances = instances.len(), "submitting batch");
            sink.draw(DrawBatch {
                layer,
                zoom: self.zoom,
                rotation: self.rotation,
                instances,
            })?;
        }
        Ok(())
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting city scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the simulated frame delta
    /// and per-frame input captured by the backend. It applies the input to
    /// the world, updates the scene and submits the frame's batches to the
    /// sink.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene, &mut dyn FrameSink) -> AnyResult<()> + 'static;
}

/// Errors raised while presenting frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderingError {
    /// The grid overlay was chosen as the scene's base layer.
    #[error("the grid overlay cannot be the base layer of a scene")]
    OverlayAsBaseLayer,
    /// A batch did not cover every tile of the world.
    #[error("{} batch holds {found} instances, expected {expected}", .layer.name())]
    IncompleteBatch {
        /// Layer of the offending batch.
        layer: LayerKind,
        /// Tiles in the world.
        expected: usize,
        /// Instances submitted.
        found: usize,
    },
}

/// Counters gathered for one frame by [`HeadlessBackend`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Batches submitted.
    pub batches: usize,
    /// Instances across all batches.
    pub instances: usize,
    /// Bytes that would have been uploaded.
    pub bytes: usize,
}

#[derive(Default)]
struct HeadlessSink {
    stats: FrameStats,
    batches: Vec<(LayerKind, usize)>,
}

impl FrameSink for HeadlessSink {
    fn draw(&mut self, batch: DrawBatch<'_>) -> Result<(), RenderingError> {
        self.stats.batches += 1;
        self.stats.instances += batch.instances.len();
        self.stats.bytes += batch.instances.as_bytes().len();
        self.batches.push((batch.layer, batch.instances.len()));
        Ok(())
    }
}

/// Backend without a window that replays scripted input.
///
/// Every submitted batch must cover the whole world, mirroring what a GPU
/// backend relies on when it draws a fixed instance count.
#[derive(Clone, Debug)]
pub struct HeadlessBackend {
    script: Vec<FrameInput>,
    frame_duration: Duration,
}

impl HeadlessBackend {
    /// Creates a backend that runs one frame per scripted input.
    #[must_use]
    pub fn new(script: Vec<FrameInput>, frame_duration: Duration) -> Self {
        Self {
            script,
            frame_duration,
        }
    }

    /// Runs the script and returns the counters of every frame.
    pub fn run_collecting<F>(
        self,
        presentation: Presentation,
        mut update_scene: F,
    ) -> AnyResult<Vec<FrameStats>>
    where
        F: FnMut(Duration, FrameInput, &mut Scene, &mut dyn FrameSink) -> AnyResult<()>,
    {
        let mut scene = presentation.scene;
        let mut frames = Vec::with_capacity(self.script.len());
        for input in self.script {
            let mut sink = HeadlessSink::default();
            update_scene(self.frame_duration, input, &mut scene, &mut sink)?;
            for (layer, found) in sink.batches {
                if found != scene.tile_count {
                    return Err(RenderingError::IncompleteBatch {
                        layer,
                        expected: scene.tile_count,
                        found,
                    }
                    .into());
                }
            }
            frames.push(sink.stats);
        }
        Ok(frames)
    }
}

impl RenderingBackend for HeadlessBackend {
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene, &mut dyn FrameSink) -> AnyResult<()> + 'static,
    {
        let _ = self.run_collecting(presentation, update_scene)?;
        Ok(())
    }
}
