mod portfolio;

pub use portfolio::{create_portfolio_scene, SceneHandles};
