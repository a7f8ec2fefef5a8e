//! Domain layer for the static policy plugin.

mod client;
mod facts;
pub mod service;

pub use service::Service;
