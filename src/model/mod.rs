//! Domain model rebuilt from the registry on every reconciliation pass.
//!
//! - [`RawData`] - total accessors over an untyped registry value
//! - [`Service`] / [`TemplateModel`] - reverse-proxy service list
//! - [`Category`] / [`Entry`] / [`Categories`] - navigation menu
//! - [`PageModel`] - maintenance page

mod maintenance;
mod raw;
mod service;
mod warp;

pub use maintenance::*;
pub use raw::*;
pub use service::*;
pub use warp::*;
