//! Command implementations

pub mod deploy;
pub mod launch;
pub mod provision;
pub mod render;
pub mod version;
