// Image ops - cropping, flipping and standardization
//
// All ops work on `Image<f32>` in [H, W, C] layout (channel-last, row-major).
// Random ops take the generator explicitly so pipelines can seed them per
// element and stay reproducible under parallel execution.

use rand::Rng;

use fedcifar_core::Image;

// Flip

/// Mirror an image left-right.
pub fn flip_left_right(image: &Image<f32>) -> Image<f32> {
    let [h, w, c] = image.dims();
    let src = image.as_slice();
    let mut flipped = Image::full(0.0f32, h, w, c);
    let dst = flipped.as_mut_slice();
    for row in 0..h {
        for col in 0..w {
            let s = (row * w + col) * c;
            let d = (row * w + (w - 1 - col)) * c;
            dst[d..d + c].copy_from_slice(&src[s..s + c]);
        }
    }
    flipped
}

/// Mirror an image left-right with probability 1/2.
pub fn random_flip_left_right<R: Rng + ?Sized>(image: Image<f32>, rng: &mut R) -> Image<f32> {
    if rng.gen_bool(0.5) {
        flip_left_right(&image)
    } else {
        image
    }
}

// Crop

/// Copy the `crop_h × crop_w` window whose top-left corner is `(y0, x0)`.
fn crop_window(image: &Image<f32>, y0: usize, x0: usize, crop_h: usize, crop_w: usize) -> Image<f32> {
    let [_, w, c] = image.dims();
    let src = image.as_slice();
    let mut cropped = Image::full(0.0f32, crop_h, crop_w, c);
    let dst = cropped.as_mut_slice();
    let row_len = crop_w * c;
    for row in 0..crop_h {
        let s = ((y0 + row) * w + x0) * c;
        let d = row * row_len;
        dst[d..d + row_len].copy_from_slice(&src[s..s + row_len]);
    }
    cropped
}

/// Crop a `crop_h × crop_w` window at a uniformly random position.
///
/// # Panics
/// Panics if the window is larger than the image.
pub fn random_crop<R: Rng + ?Sized>(
    image: &Image<f32>,
    crop_h: usize,
    crop_w: usize,
    rng: &mut R,
) -> Image<f32> {
    let [h, w, _] = image.dims();
    assert!(
        crop_h <= h && crop_w <= w,
        "random_crop: window {}x{} exceeds image {}x{}",
        crop_h,
        crop_w,
        h,
        w,
    );
    let y0 = rng.gen_range(0..=h - crop_h);
    let x0 = rng.gen_range(0..=w - crop_w);
    crop_window(image, y0, x0, crop_h, crop_w)
}

/// Resize to `target_h × target_w` by cropping or zero-padding around the
/// center.  Deterministic.
///
/// Along each axis, a larger source is cropped at offset `(src - target) / 2`
/// and a smaller one is padded with `(target - src) / 2` zeros before it.
pub fn resize_with_crop_or_pad(image: &Image<f32>, target_h: usize, target_w: usize) -> Image<f32> {
    let [h, w, c] = image.dims();
    if h == target_h && w == target_w {
        return image.clone();
    }

    // Signed shift from output coordinates to source coordinates.
    let shift = |src: usize, target: usize| -> isize {
        if src >= target {
            ((src - target) / 2) as isize
        } else {
            -(((target - src) / 2) as isize)
        }
    };
    let dy = shift(h, target_h);
    let dx = shift(w, target_w);

    let src = image.as_slice();
    let mut out = Image::full(0.0f32, target_h, target_w, c);
    let dst = out.as_mut_slice();
    for row in 0..target_h {
        let sy = row as isize + dy;
        if sy < 0 || sy >= h as isize {
            continue;
        }
        for col in 0..target_w {
            let sx = col as isize + dx;
            if sx < 0 || sx >= w as isize {
                continue;
            }
            let s = (sy as usize * w + sx as usize) * c;
            let d = (row * target_w + col) * c;
            dst[d..d + c].copy_from_slice(&src[s..s + c]);
        }
    }
    out
}

// Standardization

/// Scale an image to zero mean and unit variance.
///
/// Computes `(x - mean) / max(stddev, 1 / sqrt(N))` over all `N` values of the
/// image, so a constant image maps to all zeros instead of dividing by zero.
pub fn per_image_standardization(mut image: Image<f32>) -> Image<f32> {
    let n = image.len();
    if n == 0 {
        return image;
    }
    let values = image.as_mut_slice();
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    let min_stddev = 1.0 / (n as f64).sqrt();
    let adjusted_stddev = variance.sqrt().max(min_stddev);
    for v in values.iter_mut() {
        *v = ((*v as f64 - mean) / adjusted_stddev) as f32;
    }
    image
}

// Tests
