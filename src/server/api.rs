use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum_typed_multipart::{TypedMultipart, TypedMultipartError};
use log::info;
use tokio::task::spawn_blocking;

use super::error::{AppError, Result, bad_request};
use super::state::AppState;
use super::types::*;
use crate::hash::{HashComputer, HashFamily};
use crate::matcher::{CancelToken, Similarities, check_max_distance, classify};
use crate::metrics;
use crate::record::ImageRecord;

/// 服务信息，包括支持的哈希算法
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, body = IndexResponse),
    )
)]
pub async fn index_handler() -> Json<IndexResponse> {
    Json(IndexResponse {
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec!["/", "/upload", "/similarities", "/diff", "/metrics", "/docs"],
        hashes: HashFamily::names(),
    })
}

/// 上传一张图片，计算全部指纹并保存
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = UploadResponse),
        (status = 400, description = "缺少图片或图片无法解码"),
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    data: std::result::Result<TypedMultipart<UploadRequest>, TypedMultipartError>,
) -> Result<Json<Envelope<ImageRecord>>> {
    let result = async {
        let data = data.map_err(|e| bad_request(e.to_string()))?;
        let image = data.0.image.ok_or_else(|| bad_request("image not provided"))?;

        let db_state = state.clone();
        let record = spawn_blocking(move || db_state.db.add_image(&image)).await??;
        info!("添加图片: {}", record.image_id);
        Ok::<_, AppError>(Json(Envelope::ok(record)))
    }
    .await;

    metrics::inc_upload_count(result.is_ok());
    result
}

/// 查找与已有图片相似的图片
#[utoipa::path(
    get,
    path = "/similarities",
    params(SimilarityQuery),
    responses(
        (status = 200, body = SimilaritiesResponse),
        (status = 400, description = "参数错误或未知的哈希算法"),
        (status = 404, description = "图片 ID 不存在"),
    )
)]
pub async fn similarities_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SimilarityQuery>,
) -> Result<Json<Envelope<Similarities>>> {
    let id = query.id.filter(|id| !id.is_empty()).ok_or_else(|| bad_request("id not provided"))?;
    let family = match query.hash.as_deref() {
        None | Some("") => HashFamily::default(),
        Some(name) => name.parse::<HashFamily>()?,
    };
    let max_distance = match query.max_distance.as_deref() {
        None | Some("") => state.max_distance,
        Some(s) => s.parse::<f64>().map_err(|_| bad_request("max_distance must be a number"))?,
    };
    check_max_distance(max_distance)?;

    let start = Instant::now();

    // 请求被丢弃时 guard 也会被丢弃，从而中止后台的扫描
    let cancel = CancelToken::new();
    let _guard = cancel.drop_guard();
    let db_state = state.clone();
    let result =
        spawn_blocking(move || db_state.db.find_similar(&id, family, max_distance, &cancel)).await??;

    let matches = result.values().map(Vec::len).sum();
    metrics::observe_similarity(family, start.elapsed().as_secs_f32(), matches);

    Ok(Json(Envelope::ok(result)))
}

/// 直接对比两张图片的 phash，不保存
#[utoipa::path(
    post,
    path = "/diff",
    request_body(content = DiffForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = DiffResponse),
        (status = 400, description = "缺少文件、文件不是图片或容差不是整数"),
    )
)]
pub async fn diff_handler(
    State(state): State<Arc<AppState>>,
    data: std::result::Result<TypedMultipart<DiffRequest>, TypedMultipartError>,
) -> Result<Json<DiffResponse>> {
    let data = data.map_err(|e| bad_request(e.to_string()))?.0;

    let tolerance = match data.tolerance.as_deref().map(str::trim) {
        None | Some("") => state.tolerance,
        Some(s) => s.parse::<i64>().map_err(|_| bad_request("tolerance must be an integer"))?,
    };
    let file1 = data.file1.ok_or_else(|| bad_request("file1 not provided"))?;
    let file2 = data.file2.ok_or_else(|| bad_request("file2 not provided"))?;

    let comparison = spawn_blocking(move || -> Result<_> {
        let img1 = HashComputer::decode(&file1).map_err(|_| bad_request("file1 not an image"))?;
        let img2 = HashComputer::decode(&file2).map_err(|_| bad_request("file2 not an image"))?;
        let computer = state.db.computer();
        let h1 = computer.phash(&img1)?;
        let h2 = computer.phash(&img2)?;
        Ok(classify(&h1, &h2, tolerance)?)
    })
    .await??;

    metrics::inc_diff_count(comparison.similar);
    Ok(Json(comparison.into()))
}

/// Prometheus 指标
#[utoipa::path(get, path = "/metrics")]
pub async fn metrics_handler() -> Result<impl IntoResponse> {
    let text = metrics::gather_text()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text))
}
