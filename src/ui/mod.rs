pub mod panels;
pub mod state;
pub mod theme;

pub use panels::{UiActions, draw_help_overlay, draw_pick_marker, draw_point_labels, draw_side_panel};
pub use state::{PickedPoint, SceneSummary, UiState};
pub use theme::apply_theme;
