use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard};

use super::{RecordReader, RecordStore};
use crate::error::Result;
use crate::record::ImageRecord;

/// 内存中的记录存储，用于测试和临时使用
///
/// 读者在存活期间持有读锁，因此快照期间的写入会等待读者释放。
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, ImageRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    type Reader<'a>
        = MemoryRecordReader<'a>
    where
        Self: 'a;

    fn reader(&self) -> Result<Self::Reader<'_>> {
        Ok(MemoryRecordReader(self.records.read().expect("failed to acquire rw lock")))
    }

    fn get(&self, id: &str) -> Result<Option<ImageRecord>> {
        Ok(self.records.read().expect("failed to acquire rw lock").get(id).cloned())
    }

    fn put(&self, record: &ImageRecord) -> Result<()> {
        self.records
            .write()
            .expect("failed to acquire rw lock")
            .insert(record.image_id.clone(), record.clone());
        Ok(())
    }

    fn insert(&self, record: &ImageRecord) -> Result<bool> {
        let mut records = self.records.write().expect("failed to acquire rw lock");
        if records.contains_key(&record.image_id) {
            return Ok(false);
        }
        records.insert(record.image_id.clone(), record.clone());
        Ok(true)
    }
}

pub struct MemoryRecordReader<'a>(RwLockReadGuard<'a, BTreeMap<String, ImageRecord>>);

impl RecordReader for MemoryRecordReader<'_> {
    fn len(&self) -> Result<u64> {
        Ok(self.0.len() as u64)
    }

    fn iter(&self) -> Result<Box<dyn Iterator<Item = Result<ImageRecord>> + '_>> {
        Ok(Box::new(self.0.values().cloned().map(Ok)))
    }
}
