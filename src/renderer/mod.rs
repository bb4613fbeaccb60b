pub mod camera;
pub mod gpu;
pub mod picking;
pub mod point_cloud;

pub use camera::{Camera, CameraMode};
pub use gpu::GpuState;
pub use picking::pick_point;
