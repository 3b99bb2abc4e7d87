//! Web layer for the meet/pass scheduler.
//!
//! Provides JSON endpoints for loading a dataset, inspecting the time table
//! and conflicts, and running the resolution strategies.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, Workspace};
