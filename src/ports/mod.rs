//! Port traits at the boundary between the import pipeline and the outside world.

pub mod config_port;
pub mod interaction_port;
pub mod source_port;
pub mod store_port;
