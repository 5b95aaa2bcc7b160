pub mod accent;
pub mod app;
pub mod audio;
pub mod color;
pub mod config;
pub mod error;
pub mod hardware;
pub mod modes;
pub mod palette;
pub mod render;
pub mod selector;
pub mod show;
pub mod signals;
pub mod tempo;
pub mod terminal;
