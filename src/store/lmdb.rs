use std::fs;
use std::path::Path;

use heed::types::{SerdeJson, Str};
use heed::{Database, Env, EnvOpenOptions, RoTxn, WithoutTls};
use log::info;

use super::{RecordReader, RecordStore};
use crate::error::Result;
use crate::record::ImageRecord;

/// 存放图片记录的命名数据库
const IMAGES: &str = "images";

type ImagesDb = Database<Str, SerdeJson<ImageRecord>>;

/// 基于 LMDB 的记录存储
///
/// LMDB 本身保证同一时刻只有一个写事务，读事务互不阻塞且能看到一致的快照。
/// 读事务不使用线程局部存储，因此可以在 tokio 的阻塞线程池中随意创建。
/// 多个进程可以同时打开同一个目录，例如服务运行时用 `add` 批量导入。
pub struct LmdbRecordStore {
    env: Env<WithoutTls>,
    images: ImagesDb,
}

impl LmdbRecordStore {
    /// 打开数据库目录，不存在则创建
    ///
    /// # Arguments
    ///
    /// * `path` - LMDB 环境目录
    /// * `map_size` - 内存映射的最大大小（字节）
    pub fn open(path: impl AsRef<Path>, map_size: usize) -> Result<Self> {
        let path = path.as_ref();
        info!("打开数据库: {}", path.display());
        fs::create_dir_all(path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .read_txn_without_tls()
                .map_size(map_size)
                .max_dbs(1)
                .open(path)?
        };

        // `images` 在打开时就创建好，之后其他进程写入的记录立即可见
        let mut wtxn = env.write_txn()?;
        let images: ImagesDb = env.create_database(&mut wtxn, Some(IMAGES))?;
        wtxn.commit()?;

        Ok(Self { env, images })
    }

    fn write(&self, record: &ImageRecord, overwrite: bool) -> Result<bool> {
        let mut wtxn = self.env.write_txn()?;
        if !overwrite && self.images.get(&wtxn, &record.image_id)?.is_some() {
            return Ok(false);
        }
        self.images.put(&mut wtxn, &record.image_id, record)?;
        wtxn.commit()?;
        Ok(true)
    }
}

impl RecordStore for LmdbRecordStore {
    type Reader<'a>
        = LmdbRecordReader<'a>
    where
        Self: 'a;

    fn reader(&self) -> Result<Self::Reader<'_>> {
        let txn = self.env.read_txn()?;
        Ok(LmdbRecordReader { txn, db: self.images })
    }

    fn get(&self, id: &str) -> Result<Option<ImageRecord>> {
        let rtxn = self.env.read_txn()?;
        Ok(self.images.get(&rtxn, id)?)
    }

    fn put(&self, record: &ImageRecord) -> Result<()> {
        self.write(record, true)?;
        Ok(())
    }

    fn insert(&self, record: &ImageRecord) -> Result<bool> {
        self.write(record, false)
    }
}

pub struct LmdbRecordReader<'a> {
    txn: RoTxn<'a, WithoutTls>,
    db: ImagesDb,
}

impl RecordReader for LmdbRecordReader<'_> {
    fn len(&self) -> Result<u64> {
        Ok(self.db.len(&self.txn)?)
    }

    fn iter(&self) -> Result<Box<dyn Iterator<Item = Result<ImageRecord>> + '_>> {
        let iter = self.db.iter(&self.txn)?.map(|item| -> Result<ImageRecord> { Ok(item?.1) });
        Ok(Box::new(iter))
    }
}
