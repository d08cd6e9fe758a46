// Federated and centralized CIFAR-100 assemblers
//
// Both assemblers validate their whole configuration and build the train and
// test `PreprocessFn`s before touching the partition source, so a bad config
// never triggers a load.
//
// Distortion policy:
//   federated    train distorted unless `serializable`, test never
//   centralized  train always distorted, test never

use tracing::info;

use fedcifar_core::{bail, CropShape, Error, Result};
use fedcifar_data::{FederatedDataset, PartitionSource, PipelineDataset, PreprocessFn};

use crate::config::{CentralizedConfig, FederatedConfig};

/// Load the federated partition and attach per-client preprocessing.
///
/// Returns `(train, test)`; `dataset_for_client` on either yields shuffled,
/// repeated, batched and standardized data for that client.
///
/// # Errors
/// - [`Error::CropShapeRank`] / [`Error::InvalidCropShape`] for a bad crop shape
/// - [`Error::InvalidArgument`] for a zero epoch count or batch size
/// - any error of the partition source
pub fn get_federated_datasets<S: PartitionSource + ?Sized>(
    source: &S,
    config: &FederatedConfig,
) -> Result<(FederatedDataset, FederatedDataset)> {
    let crop_shape = CropShape::try_from(config.crop_shape.as_slice())?;
    if config.train_client_epochs_per_round < 1 {
        bail!(
            "train_client_epochs_per_round must be a positive integer, got {}",
            config.train_client_epochs_per_round
        );
    }
    if config.test_client_epochs_per_round < 1 {
        bail!(
            "test_client_epochs_per_round must be a positive integer, got {}",
            config.test_client_epochs_per_round
        );
    }

    let train_fn = PreprocessFn::new(
        config.train_client_epochs_per_round,
        config.train_client_batch_size,
        config.train_shuffle_buffer_size,
        crop_shape,
        !config.serializable,
        config.parallelism,
    )?;
    let test_fn = PreprocessFn::new(
        config.test_client_epochs_per_round,
        config.test_client_batch_size,
        config.test_shuffle_buffer_size,
        crop_shape,
        false,
        config.parallelism,
    )?;

    let (train, test) = source.load_partition()?;
    info!(
        train_clients = train.num_clients(),
        test_clients = test.num_clients(),
        crop_shape = %crop_shape,
        distort_train = !config.serializable,
        "assembled federated CIFAR-100 datasets"
    );
    Ok((train.preprocess(train_fn), test.preprocess(test_fn)))
}

/// Load the federated partition, pool every split across clients and attach
/// one epoch of preprocessing.
///
/// Returns `(train, test)` datasets with client boundaries discarded.
///
/// # Errors
/// - [`Error::CropShapeCoercion`] when the crop shape does not have three
///   entries, [`Error::InvalidCropShape`] when it exceeds the image
/// - [`Error::InvalidArgument`] for a zero batch size
/// - any error of the partition source
pub fn get_centralized_datasets<S: PartitionSource + ?Sized>(
    source: &S,
    config: &CentralizedConfig,
) -> Result<(PipelineDataset, PipelineDataset)> {
    let crop_shape =
        CropShape::try_from(config.crop_shape.as_slice()).map_err(|e| match e {
            Error::CropShapeRank { .. } => Error::CropShapeCoercion {
                got: config.crop_shape.clone(),
            },
            other => other,
        })?;

    let train_fn = PreprocessFn::new(
        1,
        config.train_batch_size,
        config.train_shuffle_buffer_size,
        crop_shape,
        true,
        config.parallelism,
    )?;
    let test_fn = PreprocessFn::new(
        1,
        config.test_batch_size,
        config.test_shuffle_buffer_size,
        crop_shape,
        false,
        config.parallelism,
    )?;

    let (train, test) = source.load_partition()?;
    let train = train_fn.apply(train.create_dataset_from_all_clients());
    let test = test_fn.apply(test.create_dataset_from_all_clients());
    info!(
        train_examples = train.num_records(),
        test_examples = test.num_records(),
        crop_shape = %crop_shape,
        "assembled centralized CIFAR-100 datasets"
    );
    Ok((train, test))
}
