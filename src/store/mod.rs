mod lmdb;
mod memory;

pub use lmdb::*;
pub use memory::*;

use crate::error::Result;
use crate::record::ImageRecord;

/// 图片记录的持久化存储
///
/// 写入需要串行化，读取可以并发进行。
pub trait RecordStore: Send + Sync {
    type Reader<'a>: RecordReader
    where
        Self: 'a;

    /// 打开一个只读快照
    fn reader(&self) -> Result<Self::Reader<'_>>;

    /// 按 ID 查找记录，不存在时返回 `None` 而不是错误
    fn get(&self, id: &str) -> Result<Option<ImageRecord>>;

    /// 写入记录，如果 ID 已存在则覆盖
    fn put(&self, record: &ImageRecord) -> Result<()>;

    /// 仅当 ID 不存在时写入，返回是否写入成功
    fn insert(&self, record: &ImageRecord) -> Result<bool>;
}

pub trait RecordReader {
    /// 快照中的记录数量
    fn len(&self) -> Result<u64>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// 按键序遍历所有记录，每次调用都从头开始
    fn iter(&self) -> Result<Box<dyn Iterator<Item = Result<ImageRecord>> + '_>>;
}
