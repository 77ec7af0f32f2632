use axum::body::Bytes;
use axum_typed_multipart::TryFromMultipart;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::matcher::Comparison;

/// 上传请求参数
#[derive(TryFromMultipart)]
pub struct UploadRequest {
    pub image: Option<Bytes>,
}

/// 上传表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct UploadForm {
    /// 上传的图片文件
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
}

/// 直接对比请求参数
#[derive(TryFromMultipart)]
pub struct DiffRequest {
    pub file1: Option<Bytes>,
    pub file2: Option<Bytes>,
    pub tolerance: Option<String>,
}

/// 直接对比表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct DiffForm {
    /// 第一张图片
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file1: String,
    /// 第二张图片
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file2: String,
    /// 汉明距离不超过该值时认为相似，默认为 10
    pub tolerance: Option<i64>,
}

/// 相似查询参数，全部以字符串接收，在处理函数中解析
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SimilarityQuery {
    /// 查询图片 ID
    pub id: Option<String>,
    /// 哈希算法，默认为 phash
    pub hash: Option<String>,
    /// 最大距离（含）
    pub max_distance: Option<String>,
}

/// 成功响应的统一外层
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub response: T,
}

impl<T> Envelope<T> {
    pub fn ok(response: T) -> Self {
        Self { ok: true, response }
    }
}

/// 直接对比的响应，字段与 [`Comparison`] 平铺在同一层
#[derive(Debug, Serialize, ToSchema)]
pub struct DiffResponse {
    pub ok: bool,
    /// 两张图片 phash 的汉明距离
    pub diff: u32,
    pub similar: bool,
}

impl From<Comparison> for DiffResponse {
    fn from(c: Comparison) -> Self {
        Self { ok: true, diff: c.diff, similar: c.similar }
    }
}

/// 服务信息
#[derive(Debug, Serialize, ToSchema)]
pub struct IndexResponse {
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
    /// 支持的哈希算法名称
    pub hashes: Vec<&'static str>,
}

/// 上传响应（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct UploadResponse {
    pub ok: bool,
    /// 新记录，包含 `image_id`、`inserted_at` 以及全部指纹
    pub response: serde_json::Value,
}

/// 相似查询响应（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct SimilaritiesResponse {
    pub ok: bool,
    /// 距离 → 该距离下的记录列表，距离按升序排列
    pub response: std::collections::BTreeMap<String, Vec<serde_json::Value>>,
}
