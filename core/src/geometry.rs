//! Rotation, zoom and isometric projection math.
//!
//! Every function in this module is pure. Positions are expressed in the
//! unrotated (`DEG0`) world frame unless stated otherwise. Rotating a
//! position yields its coordinates inside the rotated frame, whose width and
//! height swap for the odd rotations.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Discrete viewing rotation of the world, in clockwise quarter turns.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Rotation {
    /// Unrotated view.
    #[default]
    Deg0,
    /// Quarter turn.
    Deg90,
    /// Half turn.
    Deg180,
    /// Three quarter turns.
    Deg270,
}

const ROTATION_NAMES: [&str; Rotation::COUNT] = ["DEG0", "DEG90", "DEG180", "DEG270"];

impl Rotation {
    /// Number of distinct rotations.
    pub const COUNT: usize = 4;

    /// Every rotation in ascending order.
    pub const ALL: [Rotation; Rotation::COUNT] =
        [Self::Deg0, Self::Deg90, Self::Deg180, Self::Deg270];

    /// Zero-based index of the rotation, suitable for table lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }

    /// Maps any integer onto a rotation, wrapping modulo four.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::COUNT]
    }

    /// Next rotation clockwise, wrapping from `DEG270` to `DEG0`.
    #[must_use]
    pub const fn rotated_right(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Next rotation counter-clockwise, wrapping from `DEG0` to `DEG270`.
    #[must_use]
    pub const fn rotated_left(self) -> Self {
        Self::from_index(self.index() + Self::COUNT - 1)
    }

    /// Rotation that undoes `self`.
    #[must_use]
    pub const fn inverse(self) -> Self {
        Self::from_index(Self::COUNT - self.index())
    }

    /// Sum of two rotations.
    #[must_use]
    pub const fn compose(self, other: Rotation) -> Self {
        Self::from_index(self.index() + other.index())
    }

    /// Applies a rotate-left or rotate-right request.
    #[must_use]
    pub const fn changed(self, change: ChangeRotation) -> Self {
        match change {
            ChangeRotation::Left => self.rotated_left(),
            ChangeRotation::Right => self.rotated_right(),
        }
    }

    /// Whether the rotation swaps the width and height of a rectangle.
    #[must_use]
    pub const fn is_odd(self) -> bool {
        self.index() % 2 == 1
    }

    /// Canonical upper-case name, e.g. `"DEG90"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        ROTATION_NAMES[self.index()]
    }

    /// Parses a canonical name produced by [`Rotation::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ROTATION_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .map(Self::from_index)
    }
}

/// Direction of a user-driven rotation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeRotation {
    /// Counter-clockwise quarter turn.
    Left,
    /// Clockwise quarter turn.
    Right,
}

/// Discrete zoom level. Each level renders the diamond tile at a fixed size.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Zoom {
    /// Smallest sprites, 16×8 pixel tiles.
    Sgfx,
    /// Medium sprites, 32×16 pixel tiles.
    Mgfx,
    /// Full resolution sprites, 64×32 pixel tiles.
    #[default]
    Gfx,
}

const ZOOM_NAMES: [&str; Zoom::COUNT] = ["SGFX", "MGFX", "GFX"];

impl Zoom {
    /// Number of distinct zoom levels.
    pub const COUNT: usize = 3;

    /// Every zoom level from the farthest to the closest.
    pub const ALL: [Zoom; Zoom::COUNT] = [Self::Sgfx, Self::Mgfx, Self::Gfx];

    /// Zero-based index of the zoom level, suitable for table lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Sgfx => 0,
            Self::Mgfx => 1,
            Self::Gfx => 2,
        }
    }

    /// Width of a diamond tile in pixels.
    #[must_use]
    pub const fn tile_width(self) -> i32 {
        match self {
            Self::Sgfx => 16,
            Self::Mgfx => 32,
            Self::Gfx => 64,
        }
    }

    /// Height of a diamond tile in pixels.
    #[must_use]
    pub const fn tile_height(self) -> i32 {
        self.tile_width() / 2
    }

    /// Half the tile width, the horizontal isometric step.
    #[must_use]
    pub const fn tile_width_half(self) -> i32 {
        self.tile_width() / 2
    }

    /// Half the tile height, the vertical isometric step.
    #[must_use]
    pub const fn tile_height_half(self) -> i32 {
        self.tile_height() / 2
    }

    /// Scales a vertical offset authored at [`Zoom::Gfx`] resolution.
    #[must_use]
    pub const fn scale_offset(self, offset: i32) -> i32 {
        offset * self.tile_height() / Self::Gfx.tile_height()
    }

    /// One level closer. Saturates at [`Zoom::Gfx`].
    #[must_use]
    pub const fn zoomed_in(self) -> Self {
        match self {
            Self::Sgfx => Self::Mgfx,
            Self::Mgfx | Self::Gfx => Self::Gfx,
        }
    }

    /// One level farther. Saturates at [`Zoom::Sgfx`].
    #[must_use]
    pub const fn zoomed_out(self) -> Self {
        match self {
            Self::Gfx => Self::Mgfx,
            Self::Mgfx | Self::Sgfx => Self::Sgfx,
        }
    }

    /// Applies a zoom-in or zoom-out request.
    #[must_use]
    pub const fn changed(self, change: ChangeZoom) -> Self {
        match change {
            ChangeZoom::In => self.zoomed_in(),
            ChangeZoom::Out => self.zoomed_out(),
        }
    }

    /// Canonical upper-case name, e.g. `"MGFX"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        ZOOM_NAMES[self.index()]
    }

    /// Parses a canonical name produced by [`Zoom::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ZOOM_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .map(|index| Self::ALL[index])
    }
}

/// Direction of a user-driven zoom request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeZoom {
    /// Move one level closer.
    In,
    /// Move one level farther.
    Out,
}

/// Integer grid position. May lie outside the world, e.g. under the cursor.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WorldPosition {
    x: i32,
    y: i32,
}

impl WorldPosition {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column, increasing east.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row, increasing south.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Position shifted by the provided deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Rotates a position inside a `width`×`height` frame.
///
/// `DEG90` maps `(x, y)` to `(y, width-1-x)`, `DEG180` to
/// `(width-1-x, height-1-y)` and `DEG270` to `(height-1-y, x)`. Applying the
/// same rotation four times yields the original position. The result lives
/// in the rotated frame, which is `height`×`width` for odd rotations; see
/// [`unrotate_position`] for the inverse.
#[must_use]
pub const fn rotate_position(
    position: WorldPosition,
    width: i32,
    height: i32,
    rotation: Rotation,
) -> WorldPosition {
    let (x, y) = (position.x, position.y);
    match rotation {
        Rotation::Deg0 => WorldPosition::new(x, y),
        Rotation::Deg90 => WorldPosition::new(y, width - 1 - x),
        Rotation::Deg180 => WorldPosition::new(width - 1 - x, height - 1 - y),
        Rotation::Deg270 => WorldPosition::new(height - 1 - y, x),
    }
}

/// Maps a position from the rotated frame back into the `width`×`height`
/// frame it was rotated out of.
#[must_use]
pub const fn unrotate_position(
    position: WorldPosition,
    width: i32,
    height: i32,
    rotation: Rotation,
) -> WorldPosition {
    if rotation.is_odd() {
        rotate_position(position, height, width, rotation.inverse())
    } else {
        rotate_position(position, width, height, rotation.inverse())
    }
}

/// Width and height of a world grid in tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDimensions {
    width: i32,
    height: i32,
}

impl GridDimensions {
    /// Creates a new dimension descriptor. Callers validate positivity.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Total number of tiles.
    #[must_use]
    pub const fn tile_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Width of the frame seen under the provided rotation.
    #[must_use]
    pub const fn rotated_width(&self, rotation: Rotation) -> i32 {
        if rotation.is_odd() {
            self.height
        } else {
            self.width
        }
    }

    /// Height of the frame seen under the provided rotation.
    #[must_use]
    pub const fn rotated_height(&self, rotation: Rotation) -> i32 {
        if rotation.is_odd() {
            self.width
        } else {
            self.height
        }
    }

    /// Whether the position lies inside the grid.
    #[must_use]
    pub const fn contains(&self, position: WorldPosition) -> bool {
        position.x >= 0 && position.x < self.width && position.y >= 0 && position.y < self.height
    }

    /// Rotates a world position into the rotated frame.
    #[must_use]
    pub const fn rotate(&self, position: WorldPosition, rotation: Rotation) -> WorldPosition {
        rotate_position(position, self.width, self.height, rotation)
    }

    /// Maps a rotated-frame position back to world space.
    #[must_use]
    pub const fn unrotate(&self, position: WorldPosition, rotation: Rotation) -> WorldPosition {
        unrotate_position(position, self.width, self.height, rotation)
    }

    /// Row-major index of the position inside the rotated frame.
    ///
    /// Under `DEG0` this is the storage index `y*width + x`. Under any
    /// rotation it is the painter's order key: larger values are nearer to the
    /// camera.
    ///
    /// # Panics
    ///
    /// Panics when the position lies outside the grid.
    #[must_use]
    pub fn map_index(&self, position: WorldPosition, rotation: Rotation) -> usize {
        assert!(
            self.contains(position),
            "position {position:?} lies outside a {}x{} world",
            self.width,
            self.height
        );
        let rotated = self.rotate(position, rotation);
        (rotated.y * self.rotated_width(rotation) + rotated.x) as usize
    }

    /// Inverse of [`GridDimensions::map_index`] under `DEG0`.
    #[must_use]
    pub const fn position_of(&self, index: usize) -> WorldPosition {
        let index = index as i32;
        WorldPosition::new(index % self.width, index / self.width)
    }

    /// Top-left corner of the tile's bounding box on screen.
    #[must_use]
    pub fn world_to_screen(&self, position: WorldPosition, zoom: Zoom, rotation: Rotation) -> Vec2 {
        let rotated = self.rotate(position, rotation);
        project(rotated, zoom)
    }

    /// Resolves a screen pixel to the world tile whose diamond contains it.
    ///
    /// Returns `None` when the pixel falls outside every tile of the grid.
    #[must_use]
    pub fn screen_to_world(
        &self,
        screen: Vec2,
        zoom: Zoom,
        rotation: Rotation,
    ) -> Option<WorldPosition> {
        let half_width = zoom.tile_width_half() as f32;
        let half_height = zoom.tile_height_half() as f32;
        let across = (screen.x - half_width) / half_width;
        let down = (screen.y - half_height) / half_height;
        let rotated_x = ((across + down) / 2.0 + 0.5).floor() as i32;
        let rotated_y = ((down - across) / 2.0 + 0.5).floor() as i32;
        let inside = rotated_x >= 0
            && rotated_x < self.rotated_width(rotation)
            && rotated_y >= 0
            && rotated_y < self.rotated_height(rotation);
        if !inside {
            return None;
        }
        Some(self.unrotate(WorldPosition::new(rotated_x, rotated_y), rotation))
    }
}

/// Isometric projection of a rotated-frame position.
///
/// The arithmetic is carried out on integers so that the resulting pixels are
/// exact for every position a picker can produce.
#[must_use]
pub fn project(rotated: WorldPosition, zoom: Zoom) -> Vec2 {
    let screen_x = (rotated.x - rotated.y) * zoom.tile_width_half();
    let screen_y = (rotated.x + rotated.y) * zoom.tile_height_half();
    Vec2::new(screen_x as f32, screen_y as f32)
}
