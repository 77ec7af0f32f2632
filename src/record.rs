use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// 二进制指纹，按字节保存的位向量
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BinaryHash(Vec<u8>);

impl BinaryHash {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// 位数
    pub fn bits(&self) -> usize {
        self.0.len() * 8
    }

    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(self.0.len() * 2);
        for b in &self.0 {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }
}

impl From<&[u8]> for BinaryHash {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for BinaryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for BinaryHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BinaryHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl Visitor<'_> for HexVisitor {
            type Value = BinaryHash;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a hex encoded bit vector")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                BinaryHash::from_hex(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

/// 一张图片的全部指纹
///
/// 记录写入后不可修改，只能以同一 ID 整体覆盖。
/// 缺失的字段反序列化为空指纹，方便以后新增哈希算法。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(default)]
    pub average_hash: BinaryHash,
    #[serde(default)]
    pub difference_hash: BinaryHash,
    #[serde(default)]
    pub median_hash: BinaryHash,
    #[serde(default)]
    pub color_moment_hash: Vec<f64>,
    #[serde(default)]
    pub marr_hildreth_hash: BinaryHash,
    #[serde(default)]
    pub block_mean_hash: BinaryHash,
    #[serde(default)]
    pub p_hash: BinaryHash,
    #[serde(default)]
    pub radial_variance_hash: Vec<u8>,
    pub inserted_at: DateTime<Utc>,
    pub image_id: String,
}

/// 指纹的三种表示形式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HashRef<'a> {
    Binary(&'a [u8]),
    Real(&'a [f64]),
    SmallInt(&'a [u8]),
}

impl HashRef<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(v) | Self::SmallInt(v) => v.len(),
            Self::Real(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// 根据创建时间生成图片 ID
///
/// ID 为纳秒时间戳的 16 位十六进制，同一进程内严格递增，
/// 定长编码保证 LMDB 中的键序就是插入顺序。
pub fn next_image_id(now: DateTime<Utc>) -> String {
    let nanos = now.timestamp_nanos_opt().unwrap_or_default().max(0) as u64;
    let prev = LAST_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(nanos.max(last + 1)))
        .unwrap_or_else(|last| last);
    format!("{:016x}", nanos.max(prev + 1))
}

/// 测试用的完整记录
#[cfg(test)]
pub(crate) fn sample_record(id: &str) -> ImageRecord {
    ImageRecord {
        average_hash: BinaryHash::new(vec![0x0f; 8]),
        difference_hash: BinaryHash::new(vec![0xf0; 8]),
        median_hash: BinaryHash::new(vec![0xaa; 8]),
        color_moment_hash: vec![0.5; 42],
        marr_hildreth_hash: BinaryHash::new(vec![0x55; 32]),
        block_mean_hash: BinaryHash::new(vec![0x01; 32]),
        p_hash: BinaryHash::new(vec![0x80; 8]),
        radial_variance_hash: vec![7; 40],
        inserted_at: Utc::now(),
        image_id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let hash = BinaryHash::new(vec![0x00, 0x0f, 0xa0, 0xff]);
        assert_eq!(hash.to_hex(), "000fa0ff");
        assert_eq!(BinaryHash::from_hex("000fa0ff"), Some(hash));
        assert_eq!(BinaryHash::from_hex("abc"), None);
        assert_eq!(BinaryHash::from_hex("zz"), None);
    }

    #[test]
    fn test_record_json_fields() {
        let record = sample_record("0000000000000001");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["image_id"], "0000000000000001");
        assert_eq!(value["p_hash"], "8080808080808080");
        assert_eq!(value["radial_variance_hash"].as_array().unwrap().len(), 40);
        let back: ImageRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_missing_fields() {
        let json = r#"{"p_hash":"ff00","inserted_at":"2024-01-01T00:00:00Z","image_id":"a"}"#;
        let record: ImageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.p_hash.as_bytes(), &[0xff, 0x00]);
        assert!(record.average_hash.as_bytes().is_empty());
        assert!(record.color_moment_hash.is_empty());
    }

    #[test]
    fn test_image_id_unique() {
        let now = Utc::now();
        let handles = (0..8)
            .map(|_| thread::spawn(move || (0..1000).map(|_| next_image_id(now)).collect::<Vec<_>>()))
            .collect::<Vec<_>>();
        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert_eq!(id.len(), 16);
                assert!(ids.insert(id));
            }
        }
    }

    #[test]
    fn test_image_id_ordered() {
        let a = next_image_id(Utc::now());
        let b = next_image_id(Utc::now());
        assert!(a < b);
    }
}
