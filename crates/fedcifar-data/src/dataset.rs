// Raw records and element schemas
//
// A raw CIFAR-100 element has three fields, in this order:
//   coarse_label  i64  []
//   image         u8   [32, 32, 3]
//   label         i64  []
//
// The order and dtypes are part of the contract with serialized pipelines, so
// they are declared explicitly by `ElementSpec::cifar100_raw`.

use serde::{Deserialize, Serialize};

use fedcifar_core::consts::{
    CIFAR_SHAPE, IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH, TOTAL_FEATURE_SIZE,
};
use fedcifar_core::{CropShape, DType, Error, Image, Result, Shape, WithDType};

/// One CIFAR-100 example as stored by the dataset provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Superclass index in `0..20`.
    pub coarse_label: i64,
    /// Pixels in `[H, W, C]` layout.
    pub image: Box<[u8; TOTAL_FEATURE_SIZE]>,
    /// Fine class index in `0..100`.
    pub label: i64,
}

impl RawRecord {
    /// Build a record from a flat `[32, 32, 3]` pixel buffer.
    pub fn new(coarse_label: i64, pixels: Vec<u8>, label: i64) -> Result<Self> {
        let got = pixels.len();
        let image: Box<[u8; TOTAL_FEATURE_SIZE]> =
            pixels
                .into_boxed_slice()
                .try_into()
                .map_err(|_| Error::ElementCountMismatch {
                    shape: Shape::from(CIFAR_SHAPE),
                    expected: TOTAL_FEATURE_SIZE,
                    got,
                })?;
        Ok(Self {
            coarse_label,
            image,
            label,
        })
    }

    /// The pixels as an owned [`Image`].
    pub fn to_image(&self) -> Image<u8> {
        let mut img = Image::full(0u8, IMAGE_HEIGHT, IMAGE_WIDTH, IMAGE_CHANNELS);
        img.as_mut_slice().copy_from_slice(&self.image[..]);
        img
    }
}

/// Declared dtype and per-element shape of one named field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, dtype: DType, shape: Shape) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
        }
    }
}

/// Ordered schema of a dataset element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementSpec {
    fields: Vec<TensorSpec>,
}

impl ElementSpec {
    pub fn new(fields: Vec<TensorSpec>) -> Self {
        Self { fields }
    }

    /// Schema of raw CIFAR-100 records: `coarse_label`, `image`, `label`.
    pub fn cifar100_raw() -> Self {
        Self::new(vec![
            TensorSpec::new("coarse_label", i64::DTYPE, Shape::scalar()),
            TensorSpec::new("image", u8::DTYPE, Shape::from(CIFAR_SHAPE)),
            TensorSpec::new("label", i64::DTYPE, Shape::scalar()),
        ])
    }

    /// Schema of one preprocessed element; batches add a leading dimension.
    pub fn cifar100_preprocessed(crop_shape: CropShape) -> Self {
        Self::new(vec![
            TensorSpec::new("image", f32::DTYPE, crop_shape.shape()),
            TensorSpec::new("label", i64::DTYPE, Shape::scalar()),
        ])
    }

    pub fn fields(&self) -> &[TensorSpec] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&TensorSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}
