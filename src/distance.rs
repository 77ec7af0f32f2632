use std::cmp::Ordering;
use std::fmt;

use bytemuck::pod_read_unaligned;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// 两个指纹之间的距离
///
/// 汉明距离同样以浮点数保存，以便和欧氏距离放在同一个有序表里。
/// 距离一定是有限的非负数，因此可以安全地实现全序。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance(f64);

impl Distance {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<u32> for Distance {
    fn from(value: u32) -> Self {
        Self(value as f64)
    }
}

impl Eq for Distance {}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Distance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // f64 的 Display 会输出最短表示，3.0 输出为 "3"
        fmt::Display::fmt(&self.0, f)
    }
}

// 作为 JSON 对象的键使用，因此序列化为字符串
impl Serialize for Distance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn check_len(left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(Error::DimensionMismatch { left, right });
    }
    Ok(())
}

/// 计算两个等长位向量的汉明距离
pub fn hamming(va: &[u8], vb: &[u8]) -> Result<u32> {
    check_len(va.len(), vb.len())?;
    Ok(hamming_unchecked(va, vb))
}

#[inline(always)]
pub fn hamming_unchecked(va: &[u8], vb: &[u8]) -> u32 {
    let mut chunks_a = va.chunks_exact(8);
    let mut chunks_b = vb.chunks_exact(8);
    // 数据库里读出的切片不保证对齐，这里按 u64 非对齐读取
    let mut sum = chunks_a
        .by_ref()
        .zip(chunks_b.by_ref())
        .map(|(a, b)| (pod_read_unaligned::<u64>(a) ^ pod_read_unaligned::<u64>(b)).count_ones())
        .sum::<u32>();
    for (a, b) in chunks_a.remainder().iter().zip(chunks_b.remainder()) {
        sum += (a ^ b).count_ones();
    }
    sum
}

#[inline(always)]
pub fn hamming_naive(va: &[u8], vb: &[u8]) -> u32 {
    let mut sum = 0;
    for i in 0..va.len().min(vb.len()) {
        sum += (va[i] ^ vb[i]).count_ones();
    }
    sum
}

/// 计算两个等长数值向量的欧氏距离
pub fn euclidean<T>(va: &[T], vb: &[T]) -> Result<f64>
where
    T: Copy + Into<f64>,
{
    check_len(va.len(), vb.len())?;
    let sum = va
        .iter()
        .zip(vb)
        .map(|(&a, &b)| {
            let d = a.into() - b.into();
            d * d
        })
        .sum::<f64>();
    Ok(sum.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_identical() {
        let va = [0u8; 32];
        let vb = [0u8; 32];
        assert_eq!(hamming(&va, &vb).unwrap(), 0);
    }

    #[test]
    fn test_hamming_all_different() {
        let va = [0u8; 32];
        let vb = [255u8; 32];
        assert_eq!(hamming(&va, &vb).unwrap(), 256);
    }

    #[test]
    fn test_hamming_single_bit() {
        let va = [0u8; 1];
        let mut vb = [0u8; 1];
        vb[0] = 1; // 设置一个位为1
        assert_eq!(hamming(&va, &vb).unwrap(), 1);
    }

    #[test]
    fn test_hamming_unaligned_tail() {
        // 11 字节：一个 u64 块加 3 字节尾部
        let va = [0b1010_1010u8; 11];
        let vb = [0u8; 11];
        assert_eq!(hamming(&va, &vb).unwrap(), 44);
        assert_eq!(hamming_naive(&va, &vb), 44);
        assert_eq!(hamming(&va[1..], &vb[1..]).unwrap(), 40);
    }

    #[test]
    fn test_hamming_symmetric() {
        let va = [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x0f];
        let vb = [0xff, 0x00, 0xff, 0x00, 0xff, 0x00, 0xff, 0x00, 0xf0];
        assert_eq!(hamming(&va, &vb).unwrap(), hamming(&vb, &va).unwrap());
        assert_eq!(hamming(&va, &vb).unwrap(), hamming_naive(&va, &vb));
    }

    #[test]
    fn test_hamming_length_mismatch() {
        let err = hamming(&[0u8; 8], &[0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { left: 8, right: 4 }));
    }

    #[test]
    fn test_euclidean() {
        let va = [0.0f64, 0.0];
        let vb = [3.0f64, 4.0];
        assert_eq!(euclidean(&va, &vb).unwrap(), 5.0);
        assert_eq!(euclidean(&vb, &va).unwrap(), 5.0);
        assert_eq!(euclidean(&va, &va).unwrap(), 0.0);
    }

    #[test]
    fn test_euclidean_integer_components() {
        let va = [0u8, 255];
        let vb = [255u8, 0];
        let d = euclidean(&va, &vb).unwrap();
        assert!((d - (2.0f64 * 255.0 * 255.0).sqrt()).abs() < 1e-9);
        assert!(euclidean(&va, &[1u8]).is_err());
    }

    #[test]
    fn test_distance_display_and_order() {
        assert_eq!(Distance::from(3).to_string(), "3");
        assert_eq!(Distance::new(1.5).to_string(), "1.5");
        assert!(Distance::from(2) < Distance::new(2.5));
        assert_eq!(serde_json::to_string(&Distance::from(7)).unwrap(), r#""7""#);
    }
}
