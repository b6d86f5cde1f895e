use tilescape_common::{CellCoord, Model};

/// A high-level action produced from viewer input.
///
/// The tile store and camera consume actions, never raw input events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Move the camera focus by a world-space delta.
    Move { dx: f32, dz: f32 },
    /// Step the selected model through the catalog.
    CycleModel(i32),
    /// Place a model at a cell.
    Place { model: Model, cell: CellCoord },
    /// Reset a cell to the default model.
    Erase(CellCoord),
    /// Mark the cell under the cursor.
    Highlight(CellCoord),
    /// No-op (input with no binding).
    Noop,
}

impl Action {
    /// Mouse wheel steps, one catalog entry per notch.
    pub fn from_wheel(lines: f32) -> Self {
        let steps = lines.round() as i32;
        if steps == 0 {
            Action::Noop
        } else {
            Action::CycleModel(steps)
        }
    }

    /// Edit driven by held mouse buttons at the picked cell. The right button
    /// places the selected model and takes priority over the left, which erases.
    pub fn from_pointer(buttons: PointerButtons, selected: Model, cell: CellCoord) -> Self {
        if buttons.right {
            Action::Place {
                model: selected,
                cell,
            }
        } else if buttons.left {
            Action::Erase(cell)
        } else {
            Action::Highlight(cell)
        }
    }

    /// The model and cell to write, for editing actions.
    pub fn edit(&self) -> Option<(Model, CellCoord)> {
        match *self {
            Action::Place { model, cell } => Some((model, cell)),
            Action::Erase(cell) => Some((Model::default(), cell)),
            _ => None,
        }
    }
}

/// Held mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerButtons {
    pub left: bool,
    pub right: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_notches_cycle() {
        assert_eq!(Action::from_wheel(1.0), Action::CycleModel(1));
        assert_eq!(Action::from_wheel(-2.0), Action::CycleModel(-2));
        assert_eq!(Action::from_wheel(0.2), Action::Noop);
    }

    #[test]
    fn right_button_places_selection() {
        let cell = CellCoord::new(3, -1);
        let buttons = PointerButtons {
            left: true,
            right: true,
        };
        let action = Action::from_pointer(buttons, Model::Tree1, cell);
        assert_eq!(
            action,
            Action::Place {
                model: Model::Tree1,
                cell
            }
        );
        assert_eq!(action.edit(), Some((Model::Tree1, cell)));
    }

    #[test]
    fn left_button_erases() {
        let cell = CellCoord::new(0, 2);
        let buttons = PointerButtons {
            left: true,
            right: false,
        };
        let action = Action::from_pointer(buttons, Model::Lava, cell);
        assert_eq!(action, Action::Erase(cell));
        assert_eq!(action.edit(), Some((Model::Dirt, cell)));
    }

    #[test]
    fn idle_pointer_highlights() {
        let cell = CellCoord::new(1, 1);
        let action = Action::from_pointer(PointerButtons::default(), Model::Sand, cell);
        assert_eq!(action, Action::Highlight(cell));
        assert_eq!(action.edit(), None);
    }
}
