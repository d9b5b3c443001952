//! Monitor state: target registry, bounded sample history and file persistence.

mod history;
mod models;
mod persistence;
mod registry;
mod state;

pub use models::*;
pub use registry::*;
pub use state::*;
