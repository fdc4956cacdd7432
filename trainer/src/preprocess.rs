use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use image::imageops::FilterType;
use ndarray::Array3;
use shared::PreprocessingInfo;

use crate::config::IMG_SIZE;
use crate::db::Label;

/// Decode one source image and resize it to the fixed model resolution with
/// bilinear interpolation, normalized to [0, 1] in CHW layout.
///
/// 32x32 sources take the same resize path but are logged separately; the
/// AI-generated half of the corpus arrives at that resolution.
pub fn load_and_resize(path: &Path) -> Result<Array3<f32>, image::ImageError> {
    let img = image::open(path)?;
    if img.width() == 32 && img.height() == 32 {
        log::info!(
            "Upsampling image from 32x32 to {IMG_SIZE}x{IMG_SIZE}: {}",
            path.display()
        );
    }
    let resized = img
        .resize_exact(IMG_SIZE, IMG_SIZE, FilterType::Triangle)
        .to_rgb8();
    Ok(to_normalized_chw(&resized))
}

fn to_normalized_chw(img: &RgbImage) -> Array3<f32> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut out = Array3::<f32>::zeros((3, h, w));
    for (x, y, pixel) in img.enumerate_pixels() {
        for c in 0..3 {
            out[[c, y as usize, x as usize]] = f32::from(pixel[c]) / 255.0;
        }
    }
    out
}

/// Write the normalized tensor back out as an 8-bit image under
/// `<base>/<split_ratio>/<label>/<filename>`, for inspection. Best-effort:
/// the caller keeps using the in-memory tensor whether or not this succeeds.
pub fn save_preprocessed(
    tensor: &Array3<f32>,
    base: &Path,
    split_ratio: u32,
    label: Label,
    filename: &str,
) -> Option<PathBuf> {
    let dir = base.join(split_ratio.to_string()).join(label.as_str());
    if let Err(e) = fs::create_dir_all(&dir) {
        log::error!("Error saving preprocessed image: {e}");
        return None;
    }

    let (_, h, w) = tensor.dim();
    let mut raw = Vec::with_capacity(w * h * 3);
    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                raw.push((tensor[[c, y, x]] * 255.0).round().clamp(0.0, 255.0) as u8);
            }
        }
    }

    let path = dir.join(filename);
    let Some(img) = RgbImage::from_raw(w as u32, h as u32, raw) else {
        log::error!("Error saving preprocessed image: buffer size mismatch");
        return None;
    };
    match img.save(&path) {
        Ok(()) => Some(path),
        Err(e) => {
            log::error!("Error saving preprocessed image {}: {e}", path.display());
            None
        }
    }
}

/// Interpolate the midpoint of a 2x2 patch, logging the arithmetic behind
/// the upsampling path.
pub fn bilinear_example() -> f32 {
    let pixels = ndarray::arr2(&[[50.0_f32, 70.0], [30.0, 90.0]]);
    let (x, y) = (0.5_f32, 0.5_f32);
    let result = (1.0 - x) * (1.0 - y) * pixels[[0, 0]]
        + x * (1.0 - y) * pixels[[0, 1]]
        + (1.0 - x) * y * pixels[[1, 0]]
        + x * y * pixels[[1, 1]];
    log::info!("Bilinear interpolation example, 2x2 input {pixels:?}");
    log::info!("Interpolated value at (0.5, 0.5): {result}");
    result
}

pub fn preprocessing_info() -> PreprocessingInfo {
    PreprocessingInfo {
        method: "bilinear_interpolation".into(),
        input_size: "32x32 (AI generated)".into(),
        output_size: format!("{IMG_SIZE}x{IMG_SIZE}"),
        scale_factor: f64::from(IMG_SIZE) / 32.0,
        interpolation_type: "bilinear".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::tempdir;

    fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn resize_is_resolution_agnostic() {
        let dir = tempdir().unwrap();
        let small = write_test_image(dir.path(), "small.png", 32, 32);
        let large = write_test_image(dir.path(), "large.png", 640, 480);

        for path in [small, large] {
            let tensor = load_and_resize(&path).unwrap();
            assert_eq!(tensor.dim(), (3, IMG_SIZE as usize, IMG_SIZE as usize));
            assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn decode_failure_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"not an image").unwrap();
        assert!(load_and_resize(&path).is_err());
    }

    #[test]
    fn preprocessed_copy_lands_under_ratio_and_label() {
        let dir = tempdir().unwrap();
        let tensor = Array3::<f32>::from_elem((3, 8, 8), 0.5);
        let saved = save_preprocessed(&tensor, dir.path(), 80, Label::Fake, "img.png").unwrap();
        assert_eq!(saved, dir.path().join("80").join("fake").join("img.png"));

        let round_trip = image::open(&saved).unwrap().to_rgb8();
        assert_eq!(round_trip.dimensions(), (8, 8));
        // 0.5 * 255 rounds to 128.
        assert_eq!(round_trip.get_pixel(0, 0), &Rgb([128, 128, 128]));
    }

    #[test]
    fn unwritable_target_is_not_fatal() {
        let dir = tempdir().unwrap();
        let tensor = Array3::<f32>::from_elem((3, 8, 8), 0.5);
        // No extension, so the encoder cannot be inferred.
        assert!(save_preprocessed(&tensor, dir.path(), 80, Label::Real, "noext").is_none());
    }

    #[test]
    fn bilinear_example_matches_hand_computation() {
        assert!((bilinear_example() - 60.0).abs() < f32::EPSILON);
    }
}
