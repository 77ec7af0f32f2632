use std::f64::consts::PI;

use image::DynamicImage;
use image::imageops::{self, FilterType};

use super::{HashFamily, check_size, dct_1d};
use crate::error::{Error, Result};

const SIZE: u32 = 128;
const PROJECTIONS: usize = 180;
const COEFFICIENTS: usize = 40;

/// 径向方差哈希
///
/// 沿 180 个角度穿过图像中心做投影，取每条投影线上像素的方差，
/// 再做 DCT 并保留前 40 个系数，按最大最小值缩放到 0..=255
pub fn radial_variance_hash(img: &DynamicImage) -> Result<Vec<u8>> {
    check_size(HashFamily::RadialVariance, img)?;
    let gray = img.resize_exact(SIZE, SIZE, FilterType::Triangle).to_luma8();
    let gray = imageops::blur(&gray, 1.0);

    let (w, h) = (gray.width() as f64, gray.height() as f64);
    let (cx, cy) = (w / 2., h / 2.);
    let radius = cx.min(cy);

    let mut features = Vec::with_capacity(PROJECTIONS);
    for k in 0..PROJECTIONS {
        let theta = k as f64 * PI / PROJECTIONS as f64;
        let (sin, cos) = theta.sin_cos();
        let samples = (-(radius as i32)..radius as i32)
            .filter_map(|t| {
                let x = (cx + t as f64 * cos).round();
                let y = (cy + t as f64 * sin).round();
                if x < 0. || y < 0. || x >= w || y >= h {
                    return None;
                }
                Some(gray.get_pixel(x as u32, y as u32).0[0] as f64)
            })
            .collect::<Vec<_>>();
        features.push(variance(&samples));
    }

    let coeffs = dct_1d(&features, COEFFICIENTS);
    let (min, max) = coeffs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| (lo.min(c), hi.max(c)));
    if !min.is_finite() || !max.is_finite() {
        return Err(Error::HashComputation {
            family: HashFamily::RadialVariance,
            reason: "non-finite projection".to_string(),
        });
    }

    let range = max - min;
    Ok(coeffs
        .iter()
        .map(|&c| if range == 0. { 0 } else { (255. * (c - min) / range).round() as u8 })
        .collect())
}

fn variance(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n
}
