//! # fedcifar-data
//!
//! CIFAR-100 records and the preprocessing pipelines built on top of them.
//!
//! This crate provides:
//! - [`RawRecord`] / [`ElementSpec`] - raw CIFAR-100 elements and their declared schema
//! - [`augment`] - image ops: random crop, random flip, centered crop-or-pad,
//!   per-image standardization
//! - [`ImageMap`] - the per-record crop + normalize function
//! - [`PreprocessFn`] - shuffle → repeat → batch → map pipeline descriptor
//! - [`PipelineDataset`] / [`BatchIter`] - lazily preprocessed, batched datasets
//! - [`ClientData`] / [`FederatedDataset`] - per-client record collections
//! - [`PartitionSource`] - loaders for the federated CIFAR-100 partition
//!   ([`Cifar100Dir`], [`SyntheticCifar100`])

pub mod augment;
pub mod cifar100;
pub mod client_data;
pub mod dataset;
pub mod pipeline;
pub mod transform;

pub use cifar100::{Cifar100Dir, PartitionSource, Split, SyntheticCifar100};
pub use client_data::{ClientData, FederatedDataset};
pub use dataset::{ElementSpec, RawRecord, TensorSpec};
pub use pipeline::{normalize_shuffle_buffer, Batch, BatchIter, Parallelism, PipelineDataset, PreprocessFn};
pub use transform::ImageMap;
