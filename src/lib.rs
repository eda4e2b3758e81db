pub mod network;

pub use network::Network;

pub mod weights;

pub use weights::{Weight, WeightBook, WeightRow};

pub mod cost;

pub use cost::CostEngine;

pub mod config;

pub use config::{Config, PathfindingType};

pub mod labeler;

pub use labeler::{Labeler, Labels};

pub mod enumerator;

pub use enumerator::Enumerator;

pub mod finalizer;

pub mod path;

pub use path::{Path, PathLink, Pathset};

pub mod dispatcher;

pub use dispatcher::{
    find_paths, run_iteration, CapacityState, Diagnostics, PathsetResult, Request, TimeTarget,
};

pub mod error;

pub use error::{PathfindingError, PathfindingResult};

pub mod utils;

#[cfg(test)]
pub(crate) mod fixtures;
