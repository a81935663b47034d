pub mod config;
pub mod display;
pub mod models;
pub mod mqtt;
pub mod state;
pub mod utils;
