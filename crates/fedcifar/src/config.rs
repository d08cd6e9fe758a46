// Assembler configuration
//
// Both configs can be built in code (builder-style setters) or deserialized
// from TOML.  The crop shape is kept as a plain list so that configuration
// text with the wrong arity still parses; each assembler validates it into a
// `CropShape` before any data is loaded.
//
// Example:
//
//   train_client_batch_size = 32
//   train_client_epochs_per_round = 2
//   crop_shape = [24, 24, 3]
//   serializable = true
//   parallelism = { fixed = 4 }

use serde::{Deserialize, Serialize};

use fedcifar_core::consts::{CENTRALIZED_SHUFFLE_BUFFER, CIFAR_SHAPE, NUM_EXAMPLES_PER_CLIENT};
use fedcifar_core::{CropShape, Error, Result};
use fedcifar_data::Parallelism;

/// Settings for [`get_federated_datasets`](crate::get_federated_datasets).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FederatedConfig {
    /// Batch size for every train client.
    pub train_client_batch_size: usize,
    /// Batch size for every test client.
    pub test_client_batch_size: usize,
    /// Local epochs per round for train clients (`>= 1`).
    pub train_client_epochs_per_round: usize,
    /// Local epochs per round for test clients (`>= 1`).
    pub test_client_epochs_per_round: usize,
    /// Shuffle buffer per train client; `<= 1` disables shuffling.
    pub train_shuffle_buffer_size: usize,
    /// Shuffle buffer per test client; `<= 1` disables shuffling.
    pub test_shuffle_buffer_size: usize,
    /// `[height, width, channels]` of preprocessed images.
    pub crop_shape: Vec<usize>,
    /// When set, train images are not randomly distorted so the pipelines
    /// stay deterministic and can be shipped to other processes.
    pub serializable: bool,
    /// Concurrency of the per-image map.
    pub parallelism: Parallelism,
}

impl Default for FederatedConfig {
    fn default() -> Self {
        Self {
            train_client_batch_size: 20,
            test_client_batch_size: 100,
            train_client_epochs_per_round: 1,
            test_client_epochs_per_round: 1,
            train_shuffle_buffer_size: NUM_EXAMPLES_PER_CLIENT,
            test_shuffle_buffer_size: 1,
            crop_shape: CIFAR_SHAPE.to_vec(),
            serializable: false,
            parallelism: Parallelism::Autotune,
        }
    }
}

impl FederatedConfig {
    pub fn train_client_batch_size(mut self, bs: usize) -> Self {
        self.train_client_batch_size = bs;
        self
    }

    pub fn test_client_batch_size(mut self, bs: usize) -> Self {
        self.test_client_batch_size = bs;
        self
    }

    pub fn train_client_epochs_per_round(mut self, n: usize) -> Self {
        self.train_client_epochs_per_round = n;
        self
    }

    pub fn test_client_epochs_per_round(mut self, n: usize) -> Self {
        self.test_client_epochs_per_round = n;
        self
    }

    pub fn train_shuffle_buffer_size(mut self, n: usize) -> Self {
        self.train_shuffle_buffer_size = n;
        self
    }

    pub fn test_shuffle_buffer_size(mut self, n: usize) -> Self {
        self.test_shuffle_buffer_size = n;
        self
    }

    pub fn crop_shape(mut self, shape: CropShape) -> Self {
        self.crop_shape = <[usize; 3]>::from(shape).to_vec();
        self
    }

    pub fn serializable(mut self, s: bool) -> Self {
        self.serializable = s;
        self
    }

    pub fn parallelism(mut self, p: Parallelism) -> Self {
        self.parallelism = p;
        self
    }

    /// Parse from TOML; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Settings for [`get_centralized_datasets`](crate::get_centralized_datasets).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CentralizedConfig {
    pub train_batch_size: usize,
    pub test_batch_size: usize,
    /// Shuffle buffer for the pooled train split; `<= 1` disables shuffling.
    pub train_shuffle_buffer_size: usize,
    /// Shuffle buffer for the pooled test split; `<= 1` disables shuffling.
    pub test_shuffle_buffer_size: usize,
    /// `[height, width, channels]` of preprocessed images.
    pub crop_shape: Vec<usize>,
    pub parallelism: Parallelism,
}

impl Default for CentralizedConfig {
    fn default() -> Self {
        Self {
            train_batch_size: 20,
            test_batch_size: 100,
            train_shuffle_buffer_size: CENTRALIZED_SHUFFLE_BUFFER,
            test_shuffle_buffer_size: 1,
            crop_shape: CIFAR_SHAPE.to_vec(),
            parallelism: Parallelism::Autotune,
        }
    }
}

impl CentralizedConfig {
    pub fn train_batch_size(mut self, bs: usize) -> Self {
        self.train_batch_size = bs;
        self
    }

    pub fn test_batch_size(mut self, bs: usize) -> Self {
        self.test_batch_size = bs;
        self
    }

    pub fn train_shuffle_buffer_size(mut self, n: usize) -> Self {
        self.train_shuffle_buffer_size = n;
        self
    }

    pub fn test_shuffle_buffer_size(mut self, n: usize) -> Self {
        self.test_shuffle_buffer_size = n;
        self
    }

    pub fn crop_shape(mut self, shape: CropShape) -> Self {
        self.crop_shape = <[usize; 3]>::from(shape).to_vec();
        self
    }

    pub fn parallelism(mut self, p: Parallelism) -> Self {
        self.parallelism = p;
        self
    }

    /// Parse from TOML; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn federated_defaults() {
        let c = FederatedConfig::default();
        assert_eq!(c.train_client_batch_size, 20);
        assert_eq!(c.test_client_batch_size, 100);
        assert_eq!(c.train_shuffle_buffer_size, 500);
        assert_eq!(c.test_shuffle_buffer_size, 1);
        assert_eq!(c.crop_shape, vec![32, 32, 3]);
        assert!(!c.serializable);
    }

    #[test]
    fn centralized_defaults() {
        let c = CentralizedConfig::default();
        assert_eq!(c.train_shuffle_buffer_size, 10_000);
        assert_eq!(c.crop_shape, vec![32, 32, 3]);
    }

    #[test]
    fn federated_from_toml() {
        let c = FederatedConfig::from_toml_str(
            r#"
            train_client_batch_size = 32
            crop_shape = [24, 24, 3]
            serializable = true
            parallelism = { fixed = 4 }
            "#,
        )
        .unwrap();
        assert_eq!(c.train_client_batch_size, 32);
        assert_eq!(c.test_client_batch_size, 100);
        assert_eq!(c.crop_shape, vec![24, 24, 3]);
        assert!(c.serializable);
        assert_eq!(c.parallelism, Parallelism::Fixed(4));
    }

    #[test]
    fn serializable_must_be_bool() {
        let err = FederatedConfig::from_toml_str("serializable = 1").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(CentralizedConfig::from_toml_str("num_epochs = 3").is_err());
    }

    #[test]
    fn wrong_arity_crop_shape_still_parses() {
        let c = CentralizedConfig::from_toml_str("crop_shape = [32, 32]").unwrap();
        assert_eq!(c.crop_shape, vec![32, 32]);
    }

    #[test]
    fn builder_crop_shape() {
        let c = FederatedConfig::default().crop_shape(CropShape::new(28, 24, 3).unwrap());
        assert_eq!(c.crop_shape, vec![28, 24, 3]);
    }
}
