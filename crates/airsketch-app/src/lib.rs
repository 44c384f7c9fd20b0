//! airsketch Application
//!
//! The host-side shell: owns the drawing session and its display canvas,
//! drains pen events, dispatches UI actions and reports through the status line.

mod app;
pub mod replay;
mod ui;

pub use app::{App, AppConfig, AppError};
pub use ui::{UiAction, UiState};
