pub mod clock;
pub mod controller;
pub mod input_adapter;

pub use clock::Clock;
pub use controller::{Button, Controller};
pub use input_adapter::{wheel_delta_pixels, WinitController};
