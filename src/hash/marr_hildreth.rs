use image::DynamicImage;
use image::imageops::{self, FilterType};

use super::{HashFamily, check_size};
use crate::error::Result;
use crate::record::BinaryHash;

const SIZE: usize = 128;
const GRID: usize = 16;
const KERNEL_RADIUS: i32 = 3;
const SIGMA: f64 = 1.4;

/// Marr-Hildreth 哈希
///
/// 对灰度图做 LoG 滤波，按 16x16 网格统计每块的响应总和，高于中位数的块记为 1
pub fn marr_hildreth_hash(img: &DynamicImage) -> Result<BinaryHash> {
    check_size(HashFamily::MarrHildreth, img)?;
    let gray = img.resize_exact(SIZE as u32, SIZE as u32, FilterType::Triangle).to_luma8();
    let gray = imageops::blur(&gray, 1.0);
    let pixels = gray.as_raw().iter().map(|&p| p as f64).collect::<Vec<_>>();

    let response = convolve(&pixels, SIZE, &log_kernel());

    let block = SIZE / GRID;
    let mut sums = vec![0f64; GRID * GRID];
    for (i, value) in response.iter().enumerate() {
        let (x, y) = (i % SIZE, i / SIZE);
        sums[(y / block) * GRID + x / block] += value;
    }

    let mut sorted = sums.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.;

    Ok(BinaryHash::new(pack_bits(sums.iter().map(|&s| s > median))))
}

/// 生成零和的 LoG 卷积核
fn log_kernel() -> Vec<f64> {
    let width = (2 * KERNEL_RADIUS + 1) as usize;
    let mut kernel = Vec::with_capacity(width * width);
    for y in -KERNEL_RADIUS..=KERNEL_RADIUS {
        for x in -KERNEL_RADIUS..=KERNEL_RADIUS {
            let r2 = (x * x + y * y) as f64 / (SIGMA * SIGMA);
            kernel.push((2. - r2) * (-r2 / 2.).exp());
        }
    }
    let mean = kernel.iter().sum::<f64>() / kernel.len() as f64;
    kernel.iter_mut().for_each(|k| *k -= mean);
    kernel
}

/// 边缘像素按最近值延拓
fn convolve(pixels: &[f64], size: usize, kernel: &[f64]) -> Vec<f64> {
    let clamp = |v: i32| v.clamp(0, size as i32 - 1) as usize;
    let mut output = vec![0f64; pixels.len()];
    for y in 0..size as i32 {
        for x in 0..size as i32 {
            let mut acc = 0.;
            let mut k = 0;
            for dy in -KERNEL_RADIUS..=KERNEL_RADIUS {
                for dx in -KERNEL_RADIUS..=KERNEL_RADIUS {
                    acc += kernel[k] * pixels[clamp(y + dy) * size + clamp(x + dx)];
                    k += 1;
                }
            }
            output[y as usize * size + x as usize] = acc;
        }
    }
    output
}

/// 高位在前打包成字节
pub(crate) fn pack_bits(bits: impl IntoIterator<Item = bool>) -> Vec<u8> {
    let mut bytes = vec![];
    for (i, bit) in bits.into_iter().enumerate() {
        if i % 8 == 0 {
            bytes.push(0);
        }
        if bit {
            let last = bytes.len() - 1;
            bytes[last] |= 0x80 >> (i % 8);
        }
    }
    bytes
}
