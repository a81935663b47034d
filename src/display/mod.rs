pub mod presenter;
pub mod runner;
pub mod views;

pub use runner::DisplayLoop;
pub use views::{ConsoleRenderer, Renderer};
