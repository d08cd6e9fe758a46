// PreprocessFn - shuffle, repeat, batch, map
//
// A `PreprocessFn` is a plain descriptor: it holds no data and no generator
// state, so one instance can be applied to any number of client datasets and
// serialized alongside a training configuration.  Applying it yields a lazy
// `PipelineDataset`; work happens only while a `BatchIter` is pulled.
//
// Element flow for one iteration:
//
//   records ─► buffered shuffle ─► repeat ×num_epochs ─► batch ─► ImageMap (parallel)
//
// The shuffle is re-drawn on every repetition, and batches are cut from the
// repeated stream, so a batch may contain elements from two epochs.  The last
// batch of an iteration may be short.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use fedcifar_core::{bail, CropShape, Image, Result, Shape};

use crate::dataset::{ElementSpec, RawRecord};
use crate::transform::ImageMap;

/// Clamp a shuffle buffer size so that anything `<= 1` means "no shuffling".
pub fn normalize_shuffle_buffer(size: usize) -> usize {
    size.max(1)
}

/// How many elements of a batch may be mapped concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// Let the rayon pool decide.
    #[default]
    Autotune,
    /// At most this many concurrent map tasks; `1` maps sequentially.
    Fixed(usize),
}

// PreprocessFn

/// Declarative preprocessing pipeline for CIFAR-100 datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PreprocessFnRepr")]
pub struct PreprocessFn {
    num_epochs: usize,
    batch_size: usize,
    shuffle_buffer_size: usize,
    image_map: ImageMap,
    parallelism: Parallelism,
}

/// Unvalidated mirror of `PreprocessFn` used for deserialization.
#[derive(Deserialize)]
struct PreprocessFnRepr {
    num_epochs: usize,
    batch_size: usize,
    shuffle_buffer_size: usize,
    image_map: ImageMap,
    #[serde(default)]
    parallelism: Parallelism,
}

impl TryFrom<PreprocessFnRepr> for PreprocessFn {
    type Error = fedcifar_core::Error;

    fn try_from(r: PreprocessFnRepr) -> Result<Self> {
        PreprocessFn::new(
            r.num_epochs,
            r.batch_size,
            r.shuffle_buffer_size,
            r.image_map.crop_shape(),
            r.image_map.is_distorting(),
            r.parallelism,
        )
    }
}

impl PreprocessFn {
    /// Build a preprocessing pipeline.
    ///
    /// Fails if `num_epochs` or `batch_size` is zero, or if a fixed
    /// parallelism of zero is requested.  A `shuffle_buffer_size` of 0 or 1
    /// disables shuffling.
    pub fn new(
        num_epochs: usize,
        batch_size: usize,
        shuffle_buffer_size: usize,
        crop_shape: CropShape,
        distort_image: bool,
        parallelism: Parallelism,
    ) -> Result<Self> {
        if num_epochs < 1 {
            bail!("num_epochs must be a positive integer, got {}", num_epochs);
        }
        if batch_size < 1 {
            bail!("batch_size must be a positive integer, got {}", batch_size);
        }
        if parallelism == Parallelism::Fixed(0) {
            bail!("parallelism must allow at least one concurrent call");
        }
        let shuffle_buffer_size = normalize_shuffle_buffer(shuffle_buffer_size);
        debug!(
            num_epochs,
            batch_size,
            shuffle_buffer_size,
            crop_shape = %crop_shape,
            distort_image,
            "built preprocess fn"
        );
        Ok(Self {
            num_epochs,
            batch_size,
            shuffle_buffer_size,
            image_map: ImageMap::new(crop_shape, distort_image),
            parallelism,
        })
    }

    pub fn num_epochs(&self) -> usize {
        self.num_epochs
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Normalized buffer size (always `>= 1`).
    pub fn shuffle_buffer_size(&self) -> usize {
        self.shuffle_buffer_size
    }

    pub fn image_map(&self) -> ImageMap {
        self.image_map
    }

    pub fn crop_shape(&self) -> CropShape {
        self.image_map.crop_shape()
    }

    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    /// Whether the map is deterministic (no random crops or flips).
    ///
    /// Only stateless pipelines are safe to ship to another process and
    /// replay there with identical results.
    pub fn is_stateless(&self) -> bool {
        !self.image_map.is_distorting()
    }

    /// Schema of the elements this pipeline accepts.
    pub fn input_spec(&self) -> ElementSpec {
        ElementSpec::cifar100_raw()
    }

    /// Schema of one output element (before batching).
    pub fn output_spec(&self) -> ElementSpec {
        ElementSpec::cifar100_preprocessed(self.crop_shape())
    }

    /// Attach this pipeline to a sequence of records.
    pub fn apply(&self, records: impl Into<Arc<[RawRecord]>>) -> PipelineDataset {
        PipelineDataset {
            records: records.into(),
            preprocess: *self,
        }
    }
}

// PipelineDataset

/// Records with a preprocessing pipeline attached.
///
/// Cheap to clone: the records are shared.
#[derive(Debug, Clone)]
pub struct PipelineDataset {
    records: Arc<[RawRecord]>,
    preprocess: PreprocessFn,
}

impl PipelineDataset {
    /// Number of raw records (before repetition).
    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Number of elements one iteration yields (`num_records * num_epochs`),
    /// saturating at `usize::MAX`.
    pub fn num_elements(&self) -> usize {
        self.records.len().saturating_mul(self.preprocess.num_epochs)
    }

    /// Number of batches one iteration yields.
    pub fn num_batches(&self) -> usize {
        self.num_elements().div_ceil(self.preprocess.batch_size)
    }

    pub fn preprocess_fn(&self) -> &PreprocessFn {
        &self.preprocess
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// Iterate with a freshly drawn seed.
    pub fn iter(&self) -> BatchIter {
        self.iter_seeded(thread_rng().gen())
    }

    /// Iterate reproducibly: the same seed yields the same batches.
    pub fn iter_seeded(&self, seed: u64) -> BatchIter {
        BatchIter {
            records: self.records.clone(),
            preprocess: self.preprocess,
            seed,
            order: ShuffleStream::new(
                self.records.len(),
                self.preprocess.shuffle_buffer_size,
                self.preprocess.num_epochs,
                StdRng::seed_from_u64(seed),
            ),
            produced: 0,
            remaining: self.num_batches(),
        }
    }
}

impl<'a> IntoIterator for &'a PipelineDataset {
    type Item = Batch;
    type IntoIter = BatchIter;

    fn into_iter(self) -> BatchIter {
        self.iter()
    }
}

// ShuffleStream - buffered shuffle over repeated passes

/// Yields record indices for `epochs` passes, each drawn through a shuffle
/// buffer of `buffer_size` slots.
///
/// With a buffer of one the order is the identity; with a buffer at least as
/// large as the dataset every permutation is reachable.
struct ShuffleStream {
    len: usize,
    buffer_size: usize,
    epochs: usize,
    epoch: usize,
    next_input: usize,
    buffer: Vec<usize>,
    rng: StdRng,
}

impl ShuffleStream {
    fn new(len: usize, buffer_size: usize, epochs: usize, rng: StdRng) -> Self {
        Self {
            len,
            buffer_size,
            epochs,
            epoch: 0,
            next_input: 0,
            buffer: Vec::with_capacity(buffer_size.min(len)),
            rng,
        }
    }
}

impl Iterator for ShuffleStream {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        while self.epoch < self.epochs {
            while self.buffer.len() < self.buffer_size && self.next_input < self.len {
                self.buffer.push(self.next_input);
                self.next_input += 1;
            }
            match self.buffer.len() {
                0 => {
                    // Pass exhausted; start the next repetition.
                    self.epoch += 1;
                    self.next_input = 0;
                }
                1 => return self.buffer.pop(),
                n => {
                    let pick = self.rng.gen_range(0..n);
                    return Some(self.buffer.swap_remove(pick));
                }
            }
        }
        None
    }
}

// Batch

/// A batch of preprocessed images `[n, h, w, c]` and their fine labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    images: Vec<f32>,
    shape: Shape,
    labels: Vec<i64>,
}

impl Batch {
    fn collate(mapped: Vec<(Image<f32>, i64)>, crop_shape: CropShape) -> Self {
        let n = mapped.len();
        let mut images = Vec::with_capacity(n * crop_shape.elem_count());
        let mut labels = Vec::with_capacity(n);
        for (image, label) in mapped {
            images.extend_from_slice(image.as_slice());
            labels.push(label);
        }
        Self {
            images,
            shape: crop_shape.shape().with_leading(n),
            labels,
        }
    }

    /// Number of examples in the batch.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `[n, height, width, channels]`.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// All pixels, flattened in `[n, h, w, c]` order.
    pub fn images(&self) -> &[f32] {
        &self.images
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    /// Pixels of the `i`-th image.
    ///
    /// # Panics
    /// Panics if `i >= self.len()`.
    pub fn image(&self, i: usize) -> &[f32] {
        let per_image = self.images.len() / self.len().max(1);
        &self.images[i * per_image..(i + 1) * per_image]
    }

    /// Split into `(images, shape, labels)`.
    pub fn into_parts(self) -> (Vec<f32>, Shape, Vec<i64>) {
        (self.images, self.shape, self.labels)
    }
}

// BatchIter

/// Iterator over the batches of one pass through a [`PipelineDataset`].
pub struct BatchIter {
    records: Arc<[RawRecord]>,
    preprocess: PreprocessFn,
    seed: u64,
    order: ShuffleStream,
    /// Elements emitted so far; keys the per-element generator.
    produced: u64,
    remaining: usize,
}

/// Derive an independent generator seed for element `k` of an iteration
/// (splitmix64 finalizer), so random crops do not depend on thread scheduling.
fn element_seed(seed: u64, k: u64) -> u64 {
    let mut z = seed ^ k.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl BatchIter {
    /// The seed this iteration was started with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn map_batch(&self, indices: &[usize], first: u64) -> Batch {
        let image_map = self.preprocess.image_map;
        let records = &self.records;
        let seed = self.seed;
        let map_one = |(offset, &idx): (usize, &usize)| {
            let mut rng = StdRng::seed_from_u64(element_seed(seed, first + offset as u64));
            image_map.apply(&records[idx], &mut rng)
        };

        let mapped: Vec<(Image<f32>, i64)> = match self.preprocess.parallelism {
            Parallelism::Fixed(1) => indices.iter().enumerate().map(map_one).collect(),
            Parallelism::Fixed(n) => {
                // At most `n` chunks are handed to the pool.
                let chunk = indices.len().div_ceil(n).max(1);
                indices
                    .par_iter()
                    .enumerate()
                    .with_min_len(chunk)
                    .map(map_one)
                    .collect()
            }
            Parallelism::Autotune => indices.par_iter().enumerate().map(map_one).collect(),
        };
        Batch::collate(mapped, image_map.crop_shape())
    }
}

impl Iterator for BatchIter {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let indices: Vec<usize> = self
            .order
            .by_ref()
            .take(self.preprocess.batch_size)
            .collect();
        if indices.is_empty() {
            self.remaining = 0;
            return None;
        }
        let first = self.produced;
        self.produced += indices.len() as u64;
        self.remaining = self.remaining.saturating_sub(1);
        Some(self.map_batch(&indices, first))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for BatchIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use fedcifar_core::consts::TOTAL_FEATURE_SIZE;

    fn stream(len: usize, buffer: usize, epochs: usize, seed: u64) -> Vec<usize> {
        ShuffleStream::new(len, buffer, epochs, StdRng::seed_from_u64(seed)).collect()
    }

    #[test]
    fn normalize_clamps_to_one() {
        assert_eq!(normalize_shuffle_buffer(0), 1);
        assert_eq!(normalize_shuffle_buffer(1), 1);
        assert_eq!(normalize_shuffle_buffer(500), 500);
    }

    #[test]
    fn buffer_of_one_keeps_order() {
        assert_eq!(stream(5, 1, 1, 9), vec![0, 1, 2, 3, 4]);
        assert_eq!(stream(3, 1, 2, 9), vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn large_buffer_yields_permutation_per_epoch() {
        let out = stream(50, 1000, 2, 4);
        assert_eq!(out.len(), 100);
        for pass in out.chunks(50) {
            let mut sorted = pass.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        }
        assert_ne!(out[..50], (0..50).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn epochs_are_reshuffled() {
        let out = stream(30, 30, 2, 11);
        assert_ne!(out[..30], out[30..]);
    }

    #[test]
    fn empty_dataset_yields_nothing() {
        assert!(stream(0, 10, 3, 0).is_empty());
    }

    #[test]
    fn element_seeds_differ() {
        assert_ne!(element_seed(1, 0), element_seed(1, 1));
        assert_ne!(element_seed(1, 0), element_seed(2, 0));
        assert_eq!(element_seed(5, 7), element_seed(5, 7));
    }

    #[test]
    fn zero_epochs_rejected() {
        let err = PreprocessFn::new(0, 10, 1, CropShape::FULL, false, Parallelism::Autotune)
            .unwrap_err();
        assert!(err.to_string().contains("num_epochs must be a positive integer"));
    }

    #[test]
    fn zero_batch_and_zero_parallelism_rejected() {
        assert!(PreprocessFn::new(1, 0, 1, CropShape::FULL, false, Parallelism::Autotune).is_err());
        assert!(PreprocessFn::new(1, 4, 1, CropShape::FULL, false, Parallelism::Fixed(0)).is_err());
    }

    #[test]
    fn huge_epoch_count_does_not_overflow() {
        let records: Vec<RawRecord> = (0..3)
            .map(|l| RawRecord::new(0, vec![0u8; TOTAL_FEATURE_SIZE], l).unwrap())
            .collect();
        let f = PreprocessFn::new(usize::MAX / 2, 4, 1, CropShape::FULL, false, Parallelism::Fixed(1))
            .unwrap();
        let ds = f.apply(records);
        assert_eq!(ds.num_elements(), usize::MAX);
        assert_eq!(ds.num_batches(), usize::MAX.div_ceil(4));

        let mut it = ds.iter_seeded(0);
        assert_eq!(it.next().unwrap().labels(), &[0, 1, 2, 0]);
        assert_eq!(it.next().unwrap().labels(), &[1, 2, 0, 1]);
    }

    #[test]
    fn huge_epoch_count_on_empty_dataset_terminates() {
        let f = PreprocessFn::new(usize::MAX, 4, 10, CropShape::FULL, false, Parallelism::Autotune)
            .unwrap();
        let ds = f.apply(Vec::<RawRecord>::new());
        assert_eq!(ds.num_batches(), 0);
        assert_eq!(ds.iter_seeded(3).count(), 0);
    }
}
