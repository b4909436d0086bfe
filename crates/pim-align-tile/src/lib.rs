//! Tile scheduler: the data model for one batch of alignment pairs
//! dispatched to one tile, and the cooperating worker-group pool that drains
//! it.

pub mod batch;
pub mod scheduler;

pub use batch::{DispatchMode, PairResult, TileBatch, TilePair, TileResult};
pub use scheduler::{run_tile, GROUP_SIZE};
