mod color_moment;
mod marr_hildreth;
mod radial_variance;

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use image::DynamicImage;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use log::debug;
use serde::{Deserialize, Serialize};

pub use self::color_moment::color_moment_hash;
pub use self::marr_hildreth::marr_hildreth_hash;
pub use self::radial_variance::radial_variance_hash;
use crate::error::{Error, Result};
use crate::record::{BinaryHash, HashRef, ImageRecord, next_image_id};

/// 支持的感知哈希算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFamily {
    Average,
    Difference,
    Median,
    ColorMoment,
    MarrHildreth,
    BlockMean,
    #[default]
    PHash,
    RadialVariance,
}

/// 距离度量方式，每种哈希算法固定绑定一种
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Hamming,
    Euclidean,
}

impl HashFamily {
    pub const ALL: [HashFamily; 8] = [
        Self::Average,
        Self::Difference,
        Self::Median,
        Self::ColorMoment,
        Self::MarrHildreth,
        Self::BlockMean,
        Self::PHash,
        Self::RadialVariance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Difference => "difference",
            Self::Median => "median",
            Self::ColorMoment => "colormoment",
            Self::MarrHildreth => "marrhildreth",
            Self::BlockMean => "blockmean",
            Self::PHash => "phash",
            Self::RadialVariance => "radialvariance",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.name()).collect()
    }

    pub fn metric(self) -> Metric {
        match self {
            Self::ColorMoment | Self::RadialVariance => Metric::Euclidean,
            _ => Metric::Hamming,
        }
    }

    /// 从记录中取出该算法对应的指纹
    pub fn select(self, record: &ImageRecord) -> HashRef<'_> {
        match self {
            Self::Average => HashRef::Binary(record.average_hash.as_bytes()),
            Self::Difference => HashRef::Binary(record.difference_hash.as_bytes()),
            Self::Median => HashRef::Binary(record.median_hash.as_bytes()),
            Self::ColorMoment => HashRef::Real(&record.color_moment_hash),
            Self::MarrHildreth => HashRef::Binary(record.marr_hildreth_hash.as_bytes()),
            Self::BlockMean => HashRef::Binary(record.block_mean_hash.as_bytes()),
            Self::PHash => HashRef::Binary(record.p_hash.as_bytes()),
            Self::RadialVariance => HashRef::SmallInt(&record.radial_variance_hash),
        }
    }
}

impl fmt::Display for HashFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        // 旧客户端使用的别名
        if lower == "phase" {
            return Ok(Self::PHash);
        }
        Self::ALL
            .into_iter()
            .find(|f| f.name() == lower)
            .ok_or_else(|| Error::UnknownHashFamily(s.to_string()))
    }
}

/// 计算一张图片的全部指纹
pub struct HashComputer {
    average: Hasher,
    difference: Hasher,
    median: Hasher,
    block_mean: Hasher,
    phash: Hasher,
}

impl Default for HashComputer {
    fn default() -> Self {
        Self::new()
    }
}

impl HashComputer {
    pub fn new() -> Self {
        let config = || HasherConfig::new().hash_size(8, 8);
        Self {
            average: config().hash_alg(HashAlg::Mean).to_hasher(),
            difference: config().hash_alg(HashAlg::Gradient).to_hasher(),
            median: config().hash_alg(HashAlg::Median).to_hasher(),
            block_mean: HasherConfig::new().hash_size(16, 16).hash_alg(HashAlg::Blockhash).to_hasher(),
            phash: config().hash_alg(HashAlg::Mean).preproc_dct().to_hasher(),
        }
    }

    /// 解码图片
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        let img = image::load_from_memory(bytes)?;
        Ok(img)
    }

    /// 只计算 phash，用于两张图片的直接对比
    pub fn phash(&self, img: &DynamicImage) -> Result<BinaryHash> {
        check_size(HashFamily::PHash, img)?;
        Ok(BinaryHash::from(self.phash.hash_image(img).as_bytes()))
    }

    /// 计算所有指纹并生成一条新记录，ID 和时间戳在此分配
    pub fn compute(&self, img: &DynamicImage) -> Result<ImageRecord> {
        let binary = |family: HashFamily, hasher: &Hasher| -> Result<BinaryHash> {
            check_size(family, img)?;
            Ok(BinaryHash::from(hasher.hash_image(img).as_bytes()))
        };

        let record = ImageRecord {
            average_hash: binary(HashFamily::Average, &self.average)?,
            difference_hash: binary(HashFamily::Difference, &self.difference)?,
            median_hash: binary(HashFamily::Median, &self.median)?,
            color_moment_hash: color_moment_hash(img)?,
            marr_hildreth_hash: marr_hildreth_hash(img)?,
            block_mean_hash: binary(HashFamily::BlockMean, &self.block_mean)?,
            p_hash: binary(HashFamily::PHash, &self.phash)?,
            radial_variance_hash: radial_variance_hash(img)?,
            inserted_at: Utc::now(),
            image_id: String::new(),
        };
        let image_id = next_image_id(record.inserted_at);
        debug!("计算指纹完成: {}x{} => {}", img.width(), img.height(), image_id);

        Ok(ImageRecord { image_id, ..record })
    }

    /// 解码并计算指纹
    pub fn compute_bytes(&self, bytes: &[u8]) -> Result<ImageRecord> {
        let img = Self::decode(bytes)?;
        self.compute(&img)
    }
}

/// 空图片无法计算任何指纹
pub(crate) fn check_size(family: HashFamily, img: &DynamicImage) -> Result<()> {
    if img.width() == 0 || img.height() == 0 {
        return Err(Error::HashComputation { family, reason: "empty image".to_string() });
    }
    Ok(())
}

/// 一维 DCT-II，只返回前 `n` 个系数
pub(crate) fn dct_1d(input: &[f64], n: usize) -> Vec<f64> {
    let len = input.len() as f64;
    (0..n.min(input.len()))
        .map(|k| {
            input
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    x * (std::f64::consts::PI * (2 * i + 1) as f64 * k as f64 / (2. * len)).cos()
                })
                .sum()
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn gradient_image(width: u32, height: u32, seed: u32) -> DynamicImage {
    use image::{Rgb, RgbImage};

    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let r = ((x * 255) / width.max(1)) as u8;
        let g = ((y * 255) / height.max(1)) as u8;
        let b = (((x ^ y).wrapping_mul(seed.wrapping_add(7))) % 256) as u8;
        Rgb([r, g, b])
    }))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("phash", HashFamily::PHash)]
    #[case("PHash", HashFamily::PHash)]
    #[case("phase", HashFamily::PHash)]
    #[case("average", HashFamily::Average)]
    #[case("ColorMoment", HashFamily::ColorMoment)]
    #[case("radialvariance", HashFamily::RadialVariance)]
    fn test_parse_family(#[case] input: &str, #[case] expected: HashFamily) {
        assert_eq!(input.parse::<HashFamily>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_family() {
        let err = "bogus".parse::<HashFamily>().unwrap_err();
        assert!(matches!(err, Error::UnknownHashFamily(ref s) if s == "bogus"));
    }

    #[test]
    fn test_metric_binding() {
        for family in HashFamily::ALL {
            let expected = match family {
                HashFamily::ColorMoment | HashFamily::RadialVariance => Metric::Euclidean,
                _ => Metric::Hamming,
            };
            assert_eq!(family.metric(), expected);
            assert_eq!(family.name().parse::<HashFamily>().unwrap(), family);
        }
        assert_eq!(HashFamily::default(), HashFamily::PHash);
    }

    #[test]
    fn test_compute_shapes() {
        let computer = HashComputer::new();
        let record = computer.compute(&gradient_image(64, 48, 1)).unwrap();
        assert_eq!(record.average_hash.bits(), 64);
        assert_eq!(record.difference_hash.bits(), 64);
        assert_eq!(record.median_hash.bits(), 64);
        assert_eq!(record.p_hash.bits(), 64);
        assert_eq!(record.block_mean_hash.bits(), 256);
        assert_eq!(record.marr_hildreth_hash.bits(), 256);
        assert_eq!(record.color_moment_hash.len(), 42);
        assert_eq!(record.radial_variance_hash.len(), 40);
        assert_eq!(record.image_id.len(), 16);
    }

    #[test]
    fn test_compute_deterministic() {
        let computer = HashComputer::new();
        let img = gradient_image(80, 60, 3);
        let a = computer.compute(&img).unwrap();
        let b = computer.compute(&img).unwrap();
        assert_ne!(a.image_id, b.image_id);
        for family in HashFamily::ALL {
            assert_eq!(family.select(&a), family.select(&b), "{family} differs");
        }
    }

    #[test]
    fn test_decode_garbage() {
        let err = HashComputer::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_dct_constant() {
        let coeffs = dct_1d(&[1.0; 8], 3);
        assert!((coeffs[0] - 8.0).abs() < 1e-9);
        assert!(coeffs[1].abs() < 1e-9);
        assert!(coeffs[2].abs() < 1e-9);
    }
}
