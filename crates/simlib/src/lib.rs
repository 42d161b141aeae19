pub mod discovery;
pub mod error;
pub mod etcd;
pub mod resources;
pub mod simulation;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

// convenience re-exports
pub use crate::error::Error;
pub use crate::simulation::{Context, Simulation};
