//! # fedcifar
//!
//! CIFAR-100 loading and preprocessing for federated-learning simulations.
//!
//! This is the top-level facade crate that re-exports everything you need.
//!
//! ## Usage
//!
//! ```no_run
//! use fedcifar::prelude::*;
//!
//! # fn main() -> fedcifar::Result<()> {
//! let source = Cifar100Dir::new("data/fed_cifar100");
//! let (train, test) = get_federated_datasets(&source, &FederatedConfig::default())?;
//! let client = train.client_ids().next().unwrap_or_default().to_string();
//! for batch in train.dataset_for_client(&client)?.iter() {
//!     assert_eq!(batch.shape().dims()[1..], [32, 32, 3]);
//! }
//! # let _ = test;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | `fedcifar-core` | Error, Shape, CropShape, DType, Image, constants |
//! | `fedcifar-data` | Records, image ops, ImageMap, PreprocessFn, ClientData, partition loaders |
//! | `fedcifar` | Configs and the federated / centralized dataset assemblers |

pub mod config;
pub mod datasets;

/// Re-export core types.
pub use fedcifar_core::{consts, CropShape, DType, Error, Image, Result, Shape};

/// Re-export data pipeline types.
pub use fedcifar_data::{
    augment, Batch, BatchIter, Cifar100Dir, ClientData, ElementSpec, FederatedDataset, ImageMap,
    Parallelism, PartitionSource, PipelineDataset, PreprocessFn, RawRecord, Split,
    SyntheticCifar100,
};

pub use config::{CentralizedConfig, FederatedConfig};
pub use datasets::{get_centralized_datasets, get_federated_datasets};

/// Convenience imports.
pub mod prelude {
    pub use crate::config::{CentralizedConfig, FederatedConfig};
    pub use crate::datasets::{get_centralized_datasets, get_federated_datasets};
    pub use fedcifar_core::{CropShape, Error, Result};
    pub use fedcifar_data::{
        Batch, Cifar100Dir, FederatedDataset, Parallelism, PartitionSource, PipelineDataset,
        PreprocessFn, SyntheticCifar100,
    };
}
