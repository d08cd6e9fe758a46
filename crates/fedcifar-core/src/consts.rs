// Compile-time CIFAR-100 constants
//
// Every on-disk record and every raw image in the workspace has the layout
// described here.  Nothing in this module is configurable at runtime.

/// Height of a raw CIFAR-100 image.
pub const IMAGE_HEIGHT: usize = 32;

/// Width of a raw CIFAR-100 image.
pub const IMAGE_WIDTH: usize = 32;

/// Number of colour channels (RGB).
pub const IMAGE_CHANNELS: usize = 3;

/// Raw image shape as `[height, width, channels]`.
pub const CIFAR_SHAPE: [usize; 3] = [IMAGE_HEIGHT, IMAGE_WIDTH, IMAGE_CHANNELS];

/// Number of pixel values in one raw image.
pub const TOTAL_FEATURE_SIZE: usize = IMAGE_HEIGHT * IMAGE_WIDTH * IMAGE_CHANNELS;

/// Largest per-client dataset in the federated partition; the default train
/// shuffle buffer.
pub const NUM_EXAMPLES_PER_CLIENT: usize = 500;

/// Number of fine-grained classes (the `label` field).
pub const NUM_FINE_CLASSES: usize = 100;

/// Number of coarse-grained superclasses (the `coarse_label` field).
pub const NUM_COARSE_CLASSES: usize = 20;

/// Size of one binary record: coarse label byte, fine label byte, pixels.
pub const RECORD_BYTES: usize = 2 + TOTAL_FEATURE_SIZE;

/// Default shuffle buffer for the pooled (centralized) training split.
pub const CENTRALIZED_SHUFFLE_BUFFER: usize = 10_000;
