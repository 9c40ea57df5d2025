pub mod camera;
pub mod cli;
pub mod core;
pub mod geometry;
pub mod loaders;
pub mod renderer;
pub mod scene;
pub mod scenes;
pub mod stars;
pub mod state;
pub mod types;

pub use scenes::{create_portfolio_scene, SceneHandles};
pub use state::AppState;
