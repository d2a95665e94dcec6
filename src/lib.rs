mod classifier;
mod config;
pub mod constants;
mod errors;
mod loader;
mod model;
mod reconciler;
mod registry;
pub mod utils;
mod watcher;
mod writer;

pub use classifier::*;
pub use config::*;
pub use errors::*;
pub use loader::*;
pub use model::*;
pub use reconciler::*;
pub use registry::*;
pub use utils::*;
pub use watcher::*;
pub use writer::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
