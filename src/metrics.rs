use std::sync::LazyLock;

use prometheus::*;

use crate::hash::HashFamily;

static METRIC_UPLOAD_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("imdedup_upload_count", "count of uploaded images", &["result"]).unwrap()
});

static METRIC_SIMILARITY_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "imdedup_similarity_duration",
        "duration of the similarity scan in seconds",
        &["hash"]
    )
    .unwrap()
});

static METRIC_SIMILARITY_MATCHES: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "imdedup_similarity_matches",
        "number of matched images per similarity query",
        &["hash"],
        vec![0., 1., 2., 5., 10., 20., 50., 100., 500., 1000.]
    )
    .unwrap()
});

static METRIC_DIFF_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("imdedup_diff_count", "count of pairwise comparisons", &["similar"]).unwrap()
});

/// 记录一次上传，`ok` 表示是否成功
pub fn inc_upload_count(ok: bool) {
    METRIC_UPLOAD_COUNT.with_label_values(&[if ok { "ok" } else { "error" }]).inc();
}

pub fn observe_similarity(family: HashFamily, duration: f32, matches: usize) {
    METRIC_SIMILARITY_DURATION.with_label_values(&[family.name()]).observe(duration as f64);
    METRIC_SIMILARITY_MATCHES.with_label_values(&[family.name()]).observe(matches as f64);
}

pub fn inc_diff_count(similar: bool) {
    METRIC_DIFF_COUNT.with_label_values(&[if similar { "true" } else { "false" }]).inc();
}

/// 以文本格式导出默认注册表中的所有指标
pub fn gather_text() -> std::result::Result<String, prometheus::Error> {
    // 确保指标在第一次请求之前也会出现在输出中
    LazyLock::force(&METRIC_UPLOAD_COUNT);
    LazyLock::force(&METRIC_SIMILARITY_DURATION);
    LazyLock::force(&METRIC_SIMILARITY_MATCHES);
    LazyLock::force(&METRIC_DIFF_COUNT);
    TextEncoder::new().encode_to_string(&gather())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_text() {
        inc_upload_count(true);
        inc_diff_count(false);
        observe_similarity(HashFamily::PHash, 0.01, 3);
        let text = gather_text().unwrap();
        assert!(text.contains("imdedup_upload_count"));
        assert!(text.contains("imdedup_diff_count{similar=\"false\"}"));
        assert!(text.contains("imdedup_similarity_matches_bucket{hash=\"phash\""));
    }
}
