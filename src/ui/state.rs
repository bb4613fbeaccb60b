use crate::config::ViewerConfig;
use crate::renderer::CameraMode;
use crate::scene::{Scene, SceneStyle};

/// Read-only facts about the loaded mesh shown in the side panel.
pub struct SceneSummary {
    pub file_name: String,
    pub points: usize,
    pub cells: usize,
    pub triangles: usize,
    pub edges: usize,
    pub highlighted_cells: Vec<usize>,
}

impl SceneSummary {
    pub fn new(file_name: String, cells: usize, scene: &Scene) -> Self {
        Self {
            file_name,
            points: scene.markers.len(),
            cells,
            triangles: scene.base.triangles.len() / 3,
            edges: scene.base.edges.len(),
            highlighted_cells: scene.highlighted_cells.clone(),
        }
    }
}

/// A point chosen with the mouse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickedPoint {
    pub index: usize,
    pub position: [f32; 3],
}

pub struct UiState {
    pub style: SceneStyle,
    pub camera_mode: CameraMode,
    pub vsync_enabled: bool,
    pub show_panel: bool,
    pub picked: Option<PickedPoint>,
}

impl UiState {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            style: config.style,
            camera_mode: CameraMode::Orbital,
            vsync_enabled: config.vsync,
            show_panel: true,
            picked: None,
        }
    }
}
