#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system responsible for emitting building placement and demolition commands.

use isocity_core::{Action, BuildingId, ChangeRotation, Command, Event, PlacementPreview, WorldPosition};

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// Indicates whether the player confirmed the action on this frame.
    pub confirm_action: bool,
    /// Requested quarter turn of the staged building.
    pub turn_selection: Option<ChangeRotation>,
    /// Tile currently hovered by the cursor.
    pub cursor: Option<WorldPosition>,
}

impl BuilderInput {
    /// Creates a new input descriptor with explicit field values.
    #[must_use]
    pub const fn new(
        confirm_action: bool,
        turn_selection: Option<ChangeRotation>,
        cursor: Option<WorldPosition>,
    ) -> Self {
        Self {
            confirm_action,
            turn_selection,
            cursor,
        }
    }
}

/// System that translates preview + input into placement and demolition commands.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    action: Action,
}

impl Builder {
    /// Creates a new builder system instance tracking the world's default action.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Action the system believes is active.
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Consumes world events and adapter-derived input to emit builder commands.
    ///
    /// `preview` should come from the world's `query::placement_preview`.
    /// The `building_at` closure should report the building covering a tile so
    /// that demolition is only requested where something stands.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        preview: Option<&PlacementPreview>,
        input: BuilderInput,
        mut building_at: F,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(WorldPosition) -> Option<BuildingId>,
    {
        for event in events {
            if let Event::ActionChanged { action } = event {
                self.action = *action;
            }
        }

        match self.action {
            Action::Build => {
                if input.confirm_action {
                    if let Some(preview) = preview.filter(|preview| preview.is_valid()) {
                        out.push(Command::PlaceBuilding {
                            selection: preview.selection,
                            origin: preview.origin,
                        });
                    }
                }
                if let Some(change) = input.turn_selection {
                    out.push(Command::RotateSelection { change });
                }
            }
            Action::Demolish => {
                if !input.confirm_action {
                    return;
                }
                if let Some(position) = input.cursor {
                    if building_at(position).is_some() {
                        out.push(Command::DemolishBuilding { position });
                    }
                }
            }
            Action::Status | Action::Options => {}
        }
    }
}
