// Image - owned pixel buffer in [H, W, C] layout
//
// Pixels are stored row-major with the channel dimension innermost, which is
// the layout of decoded CIFAR records and of the batches handed to models:
//
//   index(row, col, ch) = (row * width + col) * channels + ch

use crate::dtype::{DType, WithDType};
use crate::error::{Error, Result};
use crate::shape::Shape;

/// A single image of `height × width × channels` values of type `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    data: Vec<T>,
    height: usize,
    width: usize,
    channels: usize,
}

impl<T: WithDType> Image<T> {
    /// Wrap a flat `[H, W, C]` buffer.
    pub fn from_vec(data: Vec<T>, height: usize, width: usize, channels: usize) -> Result<Self> {
        let expected = height * width * channels;
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape: Shape::from((height, width, channels)),
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            height,
            width,
            channels,
        })
    }

    /// An image filled with `value`.
    pub fn full(value: T, height: usize, width: usize, channels: usize) -> Self {
        Self {
            data: vec![value; height * width * channels],
            height,
            width,
            channels,
        }
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

    /// `[height, width, channels]`.
    pub fn dims(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    pub fn shape(&self) -> Shape {
        Shape::from(self.dims())
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Number of values (`height * width * channels`).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat offset of `(row, col, ch)`.
    #[inline]
    pub fn index(&self, row: usize, col: usize, ch: usize) -> usize {
        (row * self.width + col) * self.channels + ch
    }

    /// Value at `(row, col, ch)`.
    ///
    /// # Panics
    /// Panics if the position is outside the image.
    #[inline]
    pub fn get(&self, row: usize, col: usize, ch: usize) -> T {
        self.data[self.index(row, col, ch)]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Convert every value to `f32`.
    pub fn to_f32(&self) -> Image<f32> {
        Image {
            data: self.data.iter().map(|&v| v.to_f32()).collect(),
            height: self.height,
            width: self.width,
            channels: self.channels,
        }
    }
}
