use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};

use crate::config::DataDir;
use crate::error::{Error, Result};
use crate::hash::{HashComputer, HashFamily};
use crate::matcher::{CancelToken, Comparison, Similarities, SimilarityMatcher, classify};
use crate::record::{ImageRecord, next_image_id};
use crate::store::{LmdbRecordStore, RecordReader, RecordStore};

/// ID 冲突时的最大重试次数
const MAX_ID_RETRIES: usize = 3;

/// 图片指纹数据库
///
/// 组合了指纹计算、记录存储和相似度匹配，存储通过构造函数注入，
/// 因此测试时可以换成内存存储。
pub struct IMDB<S = LmdbRecordStore> {
    store: S,
    computer: HashComputer,
}

impl IMDB<LmdbRecordStore> {
    /// 打开数据目录下的数据库
    ///
    /// # Arguments
    ///
    /// * `data_dir` - 数据目录
    /// * `map_size` - LMDB 内存映射大小（字节）
    pub fn open(data_dir: &DataDir, map_size: usize) -> Result<Self> {
        Self::open_path(data_dir.database(), map_size)
    }

    pub fn open_path(path: impl AsRef<Path>, map_size: usize) -> Result<Self> {
        Ok(Self::new(LmdbRecordStore::open(path, map_size)?))
    }
}

impl<S: RecordStore> IMDB<S> {
    pub fn new(store: S) -> Self {
        Self { store, computer: HashComputer::new() }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn computer(&self) -> &HashComputer {
        &self.computer
    }

    /// 数据库中的图片数量
    pub fn count(&self) -> Result<u64> {
        self.store.reader()?.len()
    }

    /// 计算图片指纹并保存，返回新记录
    ///
    /// 新记录绝不会覆盖已有记录，ID 冲突时重新分配。
    pub fn add_image(&self, bytes: &[u8]) -> Result<ImageRecord> {
        let start = Instant::now();
        let mut record = self.computer.compute_bytes(bytes)?;
        for _ in 0..MAX_ID_RETRIES {
            if self.store.insert(&record)? {
                debug!("添加图片 {} 耗时 {:.2}ms", record.image_id, start.elapsed().as_secs_f32() * 1000.);
                return Ok(record);
            }
            warn!("图片 ID 冲突: {}", record.image_id);
            // ID 由插入时间派生，两者需要一起更新
            let now = chrono::Utc::now();
            record.inserted_at = now;
            record.image_id = next_image_id(now);
        }
        Err(Error::IdExhausted)
    }

    /// 按 ID 获取记录
    pub fn get(&self, id: &str) -> Result<ImageRecord> {
        self.store.get(id)?.ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// 查找与指定图片相似的所有图片
    ///
    /// # Arguments
    ///
    /// * `id` - 查询图片 ID
    /// * `family` - 使用的哈希算法
    /// * `max_distance` - 最大距离（含）
    /// * `cancel` - 取消标记
    pub fn find_similar(
        &self,
        id: &str,
        family: HashFamily,
        max_distance: f64,
        cancel: &CancelToken,
    ) -> Result<Similarities> {
        let start = Instant::now();
        let query = self.get(id)?;
        let result = SimilarityMatcher::new(&self.store)
            .find_similar_cancellable(&query, family, max_distance, cancel)?;
        info!(
            "查询 {} ({}, <= {}): {} 组, 耗时 {:.2}ms",
            id,
            family,
            max_distance,
            result.len(),
            start.elapsed().as_secs_f32() * 1000.
        );
        Ok(result)
    }

    /// 用 phash 直接对比两张图片，不写入数据库
    pub fn diff(&self, a: &[u8], b: &[u8], tolerance: i64) -> Result<Comparison> {
        let ha = self.computer.phash(&HashComputer::decode(a)?)?;
        let hb = self.computer.phash(&HashComputer::decode(b)?)?;
        classify(&ha, &hb, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::thread::sleep;
    use std::time::Duration;

    use image::ImageFormat;
    use tempfile::tempdir;

    use super::*;
    use crate::hash::gradient_image;
    use crate::store::{MemoryRecordReader, MemoryRecordStore};

    fn png(seed: u32) -> Vec<u8> {
        let mut buf = Cursor::new(vec![]);
        gradient_image(64, 64, seed).write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    /// 拒绝前 `collisions` 次插入的存储，模拟 ID 冲突
    struct CollidingStore {
        inner: MemoryRecordStore,
        collisions: usize,
        rejected: Mutex<Vec<ImageRecord>>,
    }

    impl CollidingStore {
        fn new(collisions: usize) -> Self {
            Self { inner: MemoryRecordStore::new(), collisions, rejected: Mutex::new(vec![]) }
        }
    }

    impl RecordStore for CollidingStore {
        type Reader<'a>
            = MemoryRecordReader<'a>
        where
            Self: 'a;

        fn reader(&self) -> Result<Self::Reader<'_>> {
            self.inner.reader()
        }

        fn get(&self, id: &str) -> Result<Option<ImageRecord>> {
            self.inner.get(id)
        }

        fn put(&self, record: &ImageRecord) -> Result<()> {
            self.inner.put(record)
        }

        fn insert(&self, record: &ImageRecord) -> Result<bool> {
            let mut rejected = self.rejected.lock().unwrap();
            if rejected.len() < self.collisions {
                rejected.push(record.clone());
                sleep(Duration::from_millis(2));
                return Ok(false);
            }
            self.inner.insert(record)
        }
    }

    #[test]
    fn test_id_collision_refreshes_inserted_at() {
        let db = IMDB::new(CollidingStore::new(1));
        let record = db.add_image(&png(2)).unwrap();
        let rejected = db.store().rejected.lock().unwrap()[0].clone();
        assert_ne!(record.image_id, rejected.image_id);
        assert!(record.inserted_at > rejected.inserted_at);
        assert_eq!(db.get(&record.image_id).unwrap(), record);
    }

    #[test]
    fn test_id_exhausted() {
        let db = IMDB::new(CollidingStore::new(usize::MAX));
        assert!(matches!(db.add_image(&png(2)), Err(Error::IdExhausted)));
        assert_eq!(db.store().rejected.lock().unwrap().len(), MAX_ID_RETRIES);
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_add_and_get() {
        let db = IMDB::new(MemoryRecordStore::new());
        let record = db.add_image(&png(1)).unwrap();
        assert_eq!(db.get(&record.image_id).unwrap(), record);
        assert_eq!(db.count().unwrap(), 1);
        assert!(matches!(db.get("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_add_invalid_image_persists_nothing() {
        let db = IMDB::new(MemoryRecordStore::new());
        assert!(matches!(db.add_image(b"garbage"), Err(Error::Decode(_))));
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_same_image_twice() {
        let temp_dir = tempdir().unwrap();
        let db = IMDB::open_path(temp_dir.path(), 16 << 20).unwrap();
        let a = db.add_image(&png(3)).unwrap();
        let b = db.add_image(&png(3)).unwrap();
        assert_ne!(a.image_id, b.image_id);

        let result = db.find_similar(&a.image_id, HashFamily::PHash, 0., &CancelToken::new()).unwrap();
        let ids = result.values().flatten().map(|r| r.image_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids, vec![b.image_id.clone()]);
    }

    #[test]
    fn test_find_similar_not_found() {
        let db = IMDB::new(MemoryRecordStore::new());
        let err = db.find_similar("unknown", HashFamily::PHash, 10., &CancelToken::new()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_diff() {
        let db = IMDB::new(MemoryRecordStore::new());
        let result = db.diff(&png(5), &png(5), 10).unwrap();
        assert_eq!(result, Comparison { diff: 0, similar: true });
        assert!(db.diff(&png(5), b"garbage", 10).is_err());
        assert_eq!(db.count().unwrap(), 0);
    }
}
