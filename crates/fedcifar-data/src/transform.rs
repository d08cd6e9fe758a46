// ImageMap - crop and normalize a single raw record
//
//   raw u8 [32, 32, 3] ─► f32 ─► crop ─► per-image standardization ─► (image, label)
//
// With `distort` set, the crop is a random window followed by a random
// left-right mirror (training augmentation).  Without it, the image is
// center-cropped (or padded) to the target size and the map is deterministic.

use rand::Rng;
use serde::{Deserialize, Serialize};

use fedcifar_core::{CropShape, Image};

use crate::augment::{
    per_image_standardization, random_crop, random_flip_left_right, resize_with_crop_or_pad,
};
use crate::dataset::RawRecord;

/// Per-record preprocessing: crop then standardize, keeping the fine label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageMap {
    crop_shape: CropShape,
    distort: bool,
}

impl ImageMap {
    pub fn new(crop_shape: CropShape, distort: bool) -> Self {
        Self {
            crop_shape,
            distort,
        }
    }

    pub fn crop_shape(&self) -> CropShape {
        self.crop_shape
    }

    /// Whether random crops and flips are applied.
    pub fn is_distorting(&self) -> bool {
        self.distort
    }

    /// Map one record to `(standardized image, fine label)`.
    ///
    /// The coarse label is dropped.  `rng` is only consumed when distorting.
    pub fn apply<R: Rng + ?Sized>(&self, record: &RawRecord, rng: &mut R) -> (Image<f32>, i64) {
        let image = record.to_image().to_f32();
        let (h, w) = (self.crop_shape.height(), self.crop_shape.width());
        let cropped = if self.distort {
            let cropped = random_crop(&image, h, w, rng);
            random_flip_left_right(cropped, rng)
        } else {
            resize_with_crop_or_pad(&image, h, w)
        };
        (per_image_standardization(cropped), record.label)
    }
}
