#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod catalog;
pub mod config;
pub mod drag;
pub mod export;
pub mod geometry;
pub mod graph;
pub mod reconcile;
pub mod save_load;
pub use app::App;
