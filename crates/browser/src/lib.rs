pub mod app;
pub mod controller;
pub mod editor;
pub mod error;
pub mod grid;
pub mod keymap;
pub mod scroll;
pub mod theme;

mod render;

pub use app::{BrowserConfig, run};
pub use controller::{Command, Controller, Focus, Message};
pub use error::BrowserError;
