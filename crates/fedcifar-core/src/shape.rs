use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH};
use crate::error::{Error, Result};

// Shape - N-dimensional shape representation
//
// Used to declare element schemas (`[]` for a scalar label, `[32, 32, 3]` for
// a raw image) and to describe batches (`[n, h, w, c]`).

/// N-dimensional shape of an element or batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from a vector of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The scalar shape (0 dimensions).
    pub fn scalar() -> Self {
        Shape(Vec::new())
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions (0 for scalar).
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (product of all dimensions).
    /// A scalar shape [] has 1 element.
    pub fn elem_count(&self) -> usize {
        self.0.iter().product::<usize>()
    }

    /// Size of a specific dimension.
    pub fn dim(&self, d: usize) -> Option<usize> {
        self.0.get(d).copied()
    }

    /// Prepend a leading (batch) dimension.
    pub fn with_leading(&self, d: usize) -> Shape {
        let mut dims = Vec::with_capacity(self.rank() + 1);
        dims.push(d);
        dims.extend_from_slice(&self.0);
        Shape(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((d0, d1, d2): (usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2])
    }
}

impl From<[usize; 3]> for Shape {
    fn from(d: [usize; 3]) -> Self {
        Shape(d.to_vec())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

// CropShape - validated (height, width, channels) crop target

/// Target `(height, width, channels)` of preprocessed images.
///
/// Construction checks that height and width lie in `1..=32` and that the
/// channel count is 3, so every `CropShape` can be cut out of a raw CIFAR
/// image.  Serialized as a three-element sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[usize; 3]", into = "[usize; 3]")]
pub struct CropShape {
    height: usize,
    width: usize,
    channels: usize,
}

impl CropShape {
    /// The full, uncropped CIFAR image shape.
    pub const FULL: CropShape = CropShape {
        height: IMAGE_HEIGHT,
        width: IMAGE_WIDTH,
        channels: IMAGE_CHANNELS,
    };

    /// Create a crop shape, validating it against the raw image shape.
    pub fn new(height: usize, width: usize, channels: usize) -> Result<Self> {
        let ok = (1..=IMAGE_HEIGHT).contains(&height)
            && (1..=IMAGE_WIDTH).contains(&width)
            && channels == IMAGE_CHANNELS;
        if !ok {
            return Err(Error::InvalidCropShape {
                shape: Shape::from((height, width, channels)),
                max: Shape::from((IMAGE_HEIGHT, IMAGE_WIDTH, IMAGE_CHANNELS)),
                channels: IMAGE_CHANNELS,
            });
        }
        Ok(Self {
            height,
            width,
            channels,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of values in one cropped image.
    pub fn elem_count(&self) -> usize {
        self.height * self.width * self.channels
    }

    /// As a general [`Shape`].
    pub fn shape(&self) -> Shape {
        Shape::from((self.height, self.width, self.channels))
    }
}

impl Default for CropShape {
    fn default() -> Self {
        CropShape::FULL
    }
}

impl fmt::Display for CropShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.height, self.width, self.channels)
    }
}

impl TryFrom<[usize; 3]> for CropShape {
    type Error = Error;

    fn try_from([h, w, c]: [usize; 3]) -> Result<Self> {
        CropShape::new(h, w, c)
    }
}

impl TryFrom<(usize, usize, usize)> for CropShape {
    type Error = Error;

    fn try_from((h, w, c): (usize, usize, usize)) -> Result<Self> {
        CropShape::new(h, w, c)
    }
}

impl TryFrom<&[usize]> for CropShape {
    type Error = Error;

    fn try_from(dims: &[usize]) -> Result<Self> {
        match *dims {
            [h, w, c] => CropShape::new(h, w, c),
            _ => Err(Error::CropShapeRank { got: dims.len() }),
        }
    }
}

impl From<CropShape> for [usize; 3] {
    fn from(s: CropShape) -> Self {
        [s.height, s.width, s.channels]
    }
}
