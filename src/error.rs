use thiserror::Error;

use crate::hash::HashFamily;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// 哈希类型错误时返回给用户的提示
pub const INVALID_HASH_MESSAGE: &str =
    "invalid hash type, send a GET request to / to see all available hashes";

#[derive(Debug, Error)]
pub enum Error {
    /// 图片无法解码
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// 某个哈希算法计算失败
    #[error("failed to compute {family} hash: {reason}")]
    HashComputation { family: HashFamily, reason: String },

    /// LMDB 读写失败
    #[error("storage error: {0}")]
    Storage(#[from] heed::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{INVALID_HASH_MESSAGE}")]
    UnknownHashFamily(String),

    #[error("image ID not found")]
    NotFound(String),

    /// 两个指纹长度不一致，通常意味着数据库中的记录来自不同版本的哈希实现
    #[error("fingerprint length mismatch: {left} != {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// 请求参数不合法
    #[error("{0}")]
    Validation(String),

    #[error("could not allocate a unique image id")]
    IdExhausted,

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 错误对应的 HTTP 状态码
    pub fn status(&self) -> u16 {
        match self {
            Self::Decode(_) | Self::UnknownHashFamily(_) | Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }

    /// 是否属于存储层错误
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Serialization(_) | Self::Io(_))
    }
}
