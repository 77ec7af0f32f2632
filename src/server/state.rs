use std::sync::Arc;

use crate::IMDB;
use crate::cli::server::ServerCommand;

/// 应用状态
pub struct AppState {
    /// 图片数据库
    pub db: IMDB,
    /// 相似查询默认的最大距离
    pub max_distance: f64,
    /// 直接对比默认的容差
    pub tolerance: i64,
    /// 上传大小限制（字节）
    pub body_limit: usize,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(db: IMDB, opts: ServerCommand) -> Arc<Self> {
        Arc::new(AppState {
            db,
            max_distance: opts.max_distance,
            tolerance: opts.tolerance,
            body_limit: opts.body_limit.saturating_mul(1 << 20),
        })
    }
}
