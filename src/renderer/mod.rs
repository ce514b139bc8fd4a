//! WebGPU rendering module
//!
//! The scene is tessellated on the CPU into vertex-colored triangles and drawn
//! in a single pass. Text lives in DOM overlay elements (see [`crate::ui`]).

pub mod pipeline;
pub mod scene;
pub mod shapes;
pub mod vertex;

pub use pipeline::{RenderError, RenderState};
pub use scene::SceneOptions;
pub use vertex::Vertex;
