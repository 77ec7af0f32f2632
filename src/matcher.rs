use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use serde::Serialize;

use crate::distance::{Distance, euclidean, hamming};
use crate::error::{Error, Result};
use crate::hash::HashFamily;
use crate::record::{BinaryHash, HashRef, ImageRecord};
use crate::store::{RecordReader, RecordStore};

/// 按距离分组的相似图片，键按距离升序排列，组内按遍历顺序
pub type Similarities = BTreeMap<Distance, Vec<ImageRecord>>;

/// 取消扫描的标记，由请求方持有
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// 返回一个在 drop 时取消扫描的守卫
    pub fn drop_guard(&self) -> CancelGuard {
        CancelGuard(self.clone())
    }
}

pub struct CancelGuard(CancelToken);

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// 两张图片直接对比的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub diff: u32,
    pub similar: bool,
}

/// 计算两条记录在指定哈希算法下的距离
pub fn distance(family: HashFamily, a: &ImageRecord, b: &ImageRecord) -> Result<Distance> {
    match (family.select(a), family.select(b)) {
        (HashRef::Binary(va), HashRef::Binary(vb)) => Ok(hamming(va, vb)?.into()),
        (HashRef::Real(va), HashRef::Real(vb)) => Ok(Distance::new(euclidean(va, vb)?)),
        (HashRef::SmallInt(va), HashRef::SmallInt(vb)) => Ok(Distance::new(euclidean(va, vb)?)),
        (va, vb) => Err(Error::DimensionMismatch { left: va.len(), right: vb.len() }),
    }
}

/// 在全部记录中线性扫描相似图片
pub struct SimilarityMatcher<'s, S> {
    store: &'s S,
}

impl<'s, S: RecordStore> SimilarityMatcher<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// 查找距离不超过 `max_distance` 的所有记录，查询记录自身（按 ID）不会出现在结果中
    pub fn find_similar(
        &self,
        query: &ImageRecord,
        family: HashFamily,
        max_distance: f64,
    ) -> Result<Similarities> {
        self.find_similar_cancellable(query, family, max_distance, &CancelToken::new())
    }

    /// 同 [`find_similar`](Self::find_similar)，但每条记录之前检查一次取消标记
    pub fn find_similar_cancellable(
        &self,
        query: &ImageRecord,
        family: HashFamily,
        max_distance: f64,
        cancel: &CancelToken,
    ) -> Result<Similarities> {
        check_max_distance(max_distance)?;

        let reader = self.store.reader()?;
        let mut similarities = Similarities::new();
        let mut scanned = 0usize;
        for record in reader.iter()? {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let record = record?;
            scanned += 1;
            if record.image_id == query.image_id {
                continue;
            }
            let d = distance(family, query, &record)?;
            if d.value() <= max_distance {
                similarities.entry(d).or_default().push(record);
            }
        }

        debug!("扫描 {} 条记录，找到 {} 组相似图片", scanned, similarities.len());
        Ok(similarities)
    }
}

/// 直接比较两个二进制指纹
pub fn compare(a: &BinaryHash, b: &BinaryHash) -> Result<u32> {
    hamming(a.as_bytes(), b.as_bytes())
}

/// 比较两个指纹并根据容差判断是否相似，负的容差意味着任何图片都不相似
pub fn classify(a: &BinaryHash, b: &BinaryHash, tolerance: i64) -> Result<Comparison> {
    let diff = compare(a, b)?;
    Ok(Comparison { diff, similar: i64::from(diff) <= tolerance })
}

pub fn check_max_distance(max_distance: f64) -> Result<()> {
    if !max_distance.is_finite() || max_distance < 0. {
        return Err(Error::validation("max_distance must be a non-negative number"));
    }
    Ok(())
}
