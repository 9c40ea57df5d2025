pub mod texture;

pub use texture::{TextureData, TextureHandle, TextureState};
