use image::DynamicImage;
use image::imageops::{self, FilterType};

use super::{HashFamily, check_size};
use crate::error::{Error, Result};

const SIZE: u32 = 512;
const BLUR_SIGMA: f32 = 1.0;

/// 颜色矩哈希
///
/// 在 HSV 和 YCbCr 两个色彩空间的 6 个通道上分别计算 7 个 Hu 不变矩，共 42 个浮点数
pub fn color_moment_hash(img: &DynamicImage) -> Result<Vec<f64>> {
    check_size(HashFamily::ColorMoment, img)?;
    let rgb = img.resize_exact(SIZE, SIZE, FilterType::CatmullRom).to_rgb8();
    let rgb = imageops::blur(&rgb, BLUR_SIGMA);

    let n = (SIZE * SIZE) as usize;
    let mut planes = vec![vec![0f64; n]; 6];
    for (i, pixel) in rgb.pixels().enumerate() {
        let [r, g, b] = pixel.0.map(|c| c as f64);
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let (y, cb, cr) = rgb_to_ycbcr(r, g, b);
        for (plane, value) in planes.iter_mut().zip([h, s, v, y, cb, cr]) {
            plane[i] = value;
        }
    }

    let mut hash = Vec::with_capacity(42);
    for plane in &planes {
        hash.extend(hu_moments(plane, SIZE as usize));
    }

    if hash.iter().any(|x| !x.is_finite()) {
        return Err(Error::HashComputation {
            family: HashFamily::ColorMoment,
            reason: "non-finite moment".to_string(),
        });
    }
    Ok(hash)
}

/// 输入输出范围均为 0..=255
fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let h = if delta == 0. {
        0.
    } else if max == r {
        60. * ((g - b) / delta).rem_euclid(6.)
    } else if max == g {
        60. * ((b - r) / delta + 2.)
    } else {
        60. * ((r - g) / delta + 4.)
    };
    let s = if max == 0. { 0. } else { delta / max * 255. };
    (h / 360. * 255., s, max)
}

fn rgb_to_ycbcr(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128. - 0.168736 * r - 0.331264 * g + 0.5 * b;
    let cr = 128. + 0.5 * r - 0.418688 * g - 0.081312 * b;
    (y, cb, cr)
}

/// 计算单通道图像的 7 个 Hu 不变矩，全零通道返回全零
fn hu_moments(plane: &[f64], width: usize) -> [f64; 7] {
    let (mut m00, mut m10, mut m01) = (0., 0., 0.);
    for (i, &f) in plane.iter().enumerate() {
        let (x, y) = ((i % width) as f64, (i / width) as f64);
        m00 += f;
        m10 += x * f;
        m01 += y * f;
    }
    if m00 == 0. {
        return [0.; 7];
    }
    let (xc, yc) = (m10 / m00, m01 / m00);

    let (mut mu20, mut mu02, mut mu11) = (0., 0., 0.);
    let (mut mu30, mut mu03, mut mu21, mut mu12) = (0., 0., 0., 0.);
    for (i, &f) in plane.iter().enumerate() {
        let dx = (i % width) as f64 - xc;
        let dy = (i / width) as f64 - yc;
        mu20 += dx * dx * f;
        mu02 += dy * dy * f;
        mu11 += dx * dy * f;
        mu30 += dx * dx * dx * f;
        mu03 += dy * dy * dy * f;
        mu21 += dx * dx * dy * f;
        mu12 += dx * dy * dy * f;
    }

    let eta = |mu: f64, order: i32| mu / m00.powf(1. + order as f64 / 2.);
    let (n20, n02, n11) = (eta(mu20, 2), eta(mu02, 2), eta(mu11, 2));
    let (n30, n03, n21, n12) = (eta(mu30, 3), eta(mu03, 3), eta(mu21, 3), eta(mu12, 3));

    let a = n30 + n12;
    let b = n21 + n03;
    [
        n20 + n02,
        (n20 - n02).powi(2) + 4. * n11 * n11,
        (n30 - 3. * n12).powi(2) + (3. * n21 - n03).powi(2),
        a * a + b * b,
        (n30 - 3. * n12) * a * (a * a - 3. * b * b) + (3. * n21 - n03) * b * (3. * a * a - b * b),
        (n20 - n02) * (a * a - b * b) + 4. * n11 * a * b,
        (3. * n21 - n03) * a * (a * a - 3. * b * b) - (n30 - 3. * n12) * b * (3. * a * a - b * b),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::euclidean;
    use crate::hash::gradient_image;

    #[test]
    fn test_hsv() {
        assert_eq!(rgb_to_hsv(255., 0., 0.), (0., 255., 255.));
        assert_eq!(rgb_to_hsv(0., 0., 0.), (0., 0., 0.));
        let (h, s, v) = rgb_to_hsv(0., 0., 255.);
        assert!((h - 170.).abs() < 1e-9);
        assert_eq!((s, v), (255., 255.));
    }

    #[test]
    fn test_hu_zero_plane() {
        assert_eq!(hu_moments(&[0.; 16], 4), [0.; 7]);
    }

    #[test]
    fn test_hu_translation_invariant() {
        // 同一个方块放在不同位置，不变矩相同
        let mut a = vec![0.; 64];
        let mut b = vec![0.; 64];
        for y in 0..3 {
            for x in 0..2 {
                a[y * 8 + x] = 1.;
                b[(y + 4) * 8 + x + 5] = 1.;
            }
        }
        let (ha, hb) = (hu_moments(&a, 8), hu_moments(&b, 8));
        for (x, y) in ha.iter().zip(&hb) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_color_moment_distinguishes() {
        let img = gradient_image(200, 150, 5);
        let solid = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(200, 150, image::Rgb([200, 10, 10])));
        let ha = color_moment_hash(&img).unwrap();
        let hb = color_moment_hash(&img).unwrap();
        let hc = color_moment_hash(&solid).unwrap();
        assert_eq!(ha.len(), 42);
        assert_eq!(euclidean(&ha, &hb).unwrap(), 0.);
        assert!(euclidean(&ha, &hc).unwrap() > 0.);
    }
}
