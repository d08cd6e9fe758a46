// Assembler tests - federated and centralized dataset construction

use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_relative_eq;
use fedcifar::prelude::*;
use fedcifar::ClientData;

/// Wraps a synthetic partition and counts how often it is loaded.
struct CountingSource {
    inner: SyntheticCifar100,
    loads: AtomicUsize,
}

impl CountingSource {
    fn new(inner: SyntheticCifar100) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
        }
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl PartitionSource for CountingSource {
    fn load_partition(&self) -> Result<(ClientData, ClientData)> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_partition()
    }
}

fn small_source() -> SyntheticCifar100 {
    SyntheticCifar100::new(3, 2, 10, 7)
}

fn client_images(fed: &FederatedDataset, client: &str, seed: u64) -> Vec<f32> {
    fed.dataset_for_client(client)
        .unwrap()
        .iter_seeded(seed)
        .flat_map(|b| b.images().to_vec())
        .collect()
}

// Federated

#[test]
fn federated_defaults_produce_full_size_batches() {
    let (train, test) = get_federated_datasets(&small_source(), &FederatedConfig::default()).unwrap();
    assert_eq!(train.num_clients(), 3);
    assert_eq!(test.num_clients(), 2);

    let ds = train.dataset_for_client("0").unwrap();
    let batches: Vec<Batch> = ds.iter().collect();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].shape().dims(), &[10, 32, 32, 3]);
    assert!(!train.preprocess_fn().is_stateless());
    assert!(test.preprocess_fn().is_stateless());
}

#[test]
fn federated_epochs_and_batching() {
    let config = FederatedConfig::default()
        .train_client_batch_size(4)
        .train_client_epochs_per_round(3)
        .test_client_batch_size(3)
        .test_client_epochs_per_round(2);
    let (train, test) = get_federated_datasets(&small_source(), &config).unwrap();

    let lens: Vec<usize> = train
        .dataset_for_client("1")
        .unwrap()
        .iter()
        .map(|b| b.len())
        .collect();
    // 3 epochs of 10 examples in batches of 4
    assert_eq!(lens, vec![4, 4, 4, 4, 4, 4, 4, 2]);

    let test_ds = test.dataset_for_client("0").unwrap();
    assert_eq!(test_ds.num_elements(), 20);
    assert_eq!(test_ds.num_batches(), 7);
}

#[test]
fn federated_crop_shape_sets_output_dims() {
    let config = FederatedConfig::default().crop_shape(CropShape::new(24, 28, 3).unwrap());
    let (train, test) = get_federated_datasets(&small_source(), &config).unwrap();

    let spec = train.element_spec();
    assert_eq!(spec.field("image").unwrap().shape.dims(), &[24, 28, 3]);
    for fed in [&train, &test] {
        let batch = fed.dataset_for_client("0").unwrap().iter().next().unwrap();
        assert_eq!(&batch.shape().dims()[1..], &[24, 28, 3]);
    }
}

#[test]
fn federated_images_are_standardized() {
    let (_, test) = get_federated_datasets(&small_source(), &FederatedConfig::default()).unwrap();
    let batch = test.dataset_for_client("1").unwrap().iter().next().unwrap();
    for i in 0..batch.len() {
        let img = batch.image(i);
        let n = img.len() as f64;
        let mean = img.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = img.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        assert_relative_eq!(mean, 0.0, epsilon = 1e-4);
        assert_relative_eq!(var, 1.0, epsilon = 1e-3);
    }
}

#[test]
fn serializable_disables_train_distortion() {
    let crop = CropShape::new(24, 24, 3).unwrap();
    let base = FederatedConfig::default()
        .crop_shape(crop)
        .train_shuffle_buffer_size(1);

    let (train, _) = get_federated_datasets(&small_source(), &base.clone().serializable(true)).unwrap();
    assert!(train.preprocess_fn().is_stateless());
    assert_eq!(client_images(&train, "2", 1), client_images(&train, "2", 2));

    let (train, _) = get_federated_datasets(&small_source(), &base.serializable(false)).unwrap();
    assert!(!train.preprocess_fn().is_stateless());
    assert_ne!(client_images(&train, "2", 1), client_images(&train, "2", 2));
}

#[test]
fn federated_rejects_wrong_rank_crop_before_loading() {
    let source = CountingSource::new(small_source());
    let mut config = FederatedConfig::default();
    config.crop_shape = vec![32, 32];

    let err = get_federated_datasets(&source, &config).unwrap_err();
    assert!(matches!(err, Error::CropShapeRank { got: 2 }));
    assert!(err.to_string().contains("crop_shape must have length 3"));
    assert_eq!(source.loads(), 0);
}

#[test]
fn federated_rejects_oversized_crop() {
    let source = CountingSource::new(small_source());
    let mut config = FederatedConfig::default();
    config.crop_shape = vec![40, 32, 3];
    assert!(matches!(
        get_federated_datasets(&source, &config),
        Err(Error::InvalidCropShape { .. })
    ));
    assert_eq!(source.loads(), 0);
}

#[test]
fn federated_rejects_zero_epochs() {
    let source = CountingSource::new(small_source());
    for config in [
        FederatedConfig::default().train_client_epochs_per_round(0),
        FederatedConfig::default().test_client_epochs_per_round(0),
    ] {
        let err = get_federated_datasets(&source, &config).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("epochs_per_round"));
    }
    assert_eq!(source.loads(), 0);
}

#[test]
fn federated_rejects_zero_batch_size() {
    let source = CountingSource::new(small_source());
    let config = FederatedConfig::default().test_client_batch_size(0);
    assert!(get_federated_datasets(&source, &config).is_err());
    assert_eq!(source.loads(), 0);
}

#[test]
fn federated_loads_once() {
    let source = CountingSource::new(small_source());
    get_federated_datasets(&source, &FederatedConfig::default()).unwrap();
    assert_eq!(source.loads(), 1);
}

#[test]
fn federated_from_toml_config() {
    let config = FederatedConfig::from_toml_str(
        r#"
        train_client_batch_size = 5
        test_client_batch_size = 10
        crop_shape = [28, 28, 3]
        parallelism = { fixed = 2 }
        "#,
    )
    .unwrap();
    let (train, _) = get_federated_datasets(&small_source(), &config).unwrap();
    let ds = train.dataset_for_client("0").unwrap();
    assert_eq!(ds.num_batches(), 2);
    assert_eq!(ds.preprocess_fn().parallelism(), Parallelism::Fixed(2));
}

// Centralized

#[test]
fn centralized_pools_all_clients() {
    let config = CentralizedConfig::default().train_batch_size(8).test_batch_size(6);
    let (train, test) = get_centralized_datasets(&small_source(), &config).unwrap();

    assert_eq!(train.num_records(), 30);
    assert_eq!(test.num_records(), 20);
    assert_eq!(train.num_batches(), 4);
    assert_eq!(test.num_batches(), 4);

    let lens: Vec<usize> = train.iter().map(|b| b.len()).collect();
    assert_eq!(lens, vec![8, 8, 8, 6]);
    assert!(!train.preprocess_fn().is_stateless());
    assert!(test.preprocess_fn().is_stateless());
}

#[test]
fn centralized_single_epoch() {
    let (train, test) = get_centralized_datasets(&small_source(), &CentralizedConfig::default()).unwrap();
    assert_eq!(train.preprocess_fn().num_epochs(), 1);
    assert_eq!(test.preprocess_fn().num_epochs(), 1);
    assert_eq!(train.num_elements(), train.num_records());
}

#[test]
fn centralized_test_order_is_stable() {
    let (_, test) = get_centralized_datasets(&small_source(), &CentralizedConfig::default()).unwrap();
    let a: Vec<i64> = test.iter_seeded(1).flat_map(|b| b.labels().to_vec()).collect();
    let b: Vec<i64> = test.iter_seeded(2).flat_map(|b| b.labels().to_vec()).collect();
    let raw: Vec<i64> = test.records().iter().map(|r| r.label).collect();
    assert_eq!(a, b);
    assert_eq!(a, raw);
}

#[test]
fn centralized_crop_shape_coercion_error() {
    let source = CountingSource::new(small_source());
    let mut config = CentralizedConfig::default();
    config.crop_shape = vec![24, 24];

    let err = get_centralized_datasets(&source, &config).unwrap_err();
    assert!(matches!(&err, Error::CropShapeCoercion { got } if got == &vec![24, 24]));
    assert_eq!(source.loads(), 0);
}

#[test]
fn centralized_invalid_crop_passes_through() {
    let mut config = CentralizedConfig::default();
    config.crop_shape = vec![24, 24, 1];
    assert!(matches!(
        get_centralized_datasets(&small_source(), &config),
        Err(Error::InvalidCropShape { .. })
    ));
}

#[test]
fn centralized_crop_shape() {
    let config = CentralizedConfig::default()
        .crop_shape(CropShape::new(16, 16, 3).unwrap())
        .parallelism(Parallelism::Fixed(1));
    let (train, _) = get_centralized_datasets(&small_source(), &config).unwrap();
    let batch = train.iter().next().unwrap();
    assert_eq!(batch.shape().dims(), &[20, 16, 16, 3]);
}
