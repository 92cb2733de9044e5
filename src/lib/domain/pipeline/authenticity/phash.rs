//! 64-bit DCT perceptual hash.
//!
//! Geometry is fixed to guarantee interoperability with stored reference
//! hashes: 32x32 grayscale, top-left 8x8 DCT coefficients excluding the DC
//! term, median-thresholded to 64 bits.

const SIZE: usize = 32;
const LOW_FREQ: usize = 8;

/// Computes the 64-bit perceptual hash of `image_bytes`, emitted as 16 hex
/// characters. Deterministic: identical bytes always produce identical
/// output.
pub fn perceptual_hash(image_bytes: &[u8]) -> Result<String, image::ImageError> {
    let image = image::load_from_memory(image_bytes)?;
    let gray = image
        .resize_exact(SIZE as u32, SIZE as u32, image::imageops::FilterType::Lanczos3)
        .to_luma8();

    let mut pixels = [[0f64; SIZE]; SIZE];
    for y in 0..SIZE {
        for x in 0..SIZE {
            pixels[y][x] = gray.get_pixel(x as u32, y as u32).0[0] as f64;
        }
    }

    let dct = dct_2d(&pixels);

    // Top-left 8x8 block excluding the DC term (index [0][0]).
    let mut coefficients = Vec::with_capacity(LOW_FREQ * LOW_FREQ - 1);
    for y in 0..LOW_FREQ {
        for x in 0..LOW_FREQ {
            if y == 0 && x == 0 {
                continue;
            }
            coefficients.push(dct[y][x]);
        }
    }

    let median = median_of(&coefficients);

    let mut bits: u64 = 0;
    for (i, &coefficient) in coefficients.iter().enumerate() {
        if coefficient > median {
            bits |= 1 << i;
        }
    }

    Ok(format!("{bits:016x}"))
}

/// Hamming distance between two 16-hex-character hashes: count of
/// differing bits. Symmetric by construction.
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    let a = u64::from_str_radix(a, 16).ok()?;
    let b = u64::from_str_radix(b, 16).ok()?;
    Some((a ^ b).count_ones())
}

fn dct_2d(pixels: &[[f64; SIZE]; SIZE]) -> [[f64; SIZE]; SIZE] {
    let mut rows = [[0f64; SIZE]; SIZE];
    for (y, row) in pixels.iter().enumerate() {
        rows[y] = dct_1d(row);
    }
    let mut result = [[0f64; SIZE]; SIZE];
    for x in 0..SIZE {
        let column: [f64; SIZE] = std::array::from_fn(|y| rows[y][x]);
        let transformed = dct_1d(&column);
        for y in 0..SIZE {
            result[y][x] = transformed[y];
        }
    }
    result
}

/// 1D Discrete Cosine Transform (DCT-II) over a fixed-size input.
fn dct_1d(input: &[f64; SIZE]) -> [f64; SIZE] {
    let n = SIZE as f64;
    std::array::from_fn(|k| {
        let sum: f64 = input
            .iter()
            .enumerate()
            .map(|(i, &x)| x * (std::f64::consts::PI / n * (i as f64 + 0.5) * k as f64).cos())
            .sum();
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        sum * scale
    })
}

fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn sample_png_bytes() -> Vec<u8> {
        let mut img = ImageBuffer::<Rgb<u8>, Vec<u8>>::new(64, 64);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let value = ((x * 4 + y * 2) % 256) as u8;
            *pixel = Rgb([value, value, value]);
        }
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn hash_is_a_stable_function_of_image_bytes() {
        let bytes = sample_png_bytes();
        let hash1 = perceptual_hash(&bytes).unwrap();
        let hash2 = perceptual_hash(&bytes).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 16);
    }

    #[test]
    fn hamming_distance_is_symmetric() {
        let a = "00ff00ff00ff00ff";
        let b = "ff00ff00ff00ff00";
        assert_eq!(hamming_distance(a, b), hamming_distance(b, a));
    }

    #[test]
    fn hamming_distance_of_identical_hashes_is_zero() {
        let hash = "abcdef0123456789";
        assert_eq!(hamming_distance(hash, hash), Some(0));
    }
}
