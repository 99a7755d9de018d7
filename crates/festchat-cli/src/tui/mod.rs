//! Full-screen TUI mode.

mod app;
mod text;
mod ui;

pub use app::run;
