use curl::MultiError;
use std::result;
use thiserror::Error;

/// 会话队列错误
///
/// 只有这三类错误会以 `Err` 的形式返回给调用者，
/// 单个传输的失败通过返回值和 [`crate::CurlSessions::errors`] 报告。
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// 配置错误，对象无法使用
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 选项集合中存在非法的选项标识符，被配置的会话已经关闭
    #[error("Options contain invalid keys: {0}")]
    InvalidOptions(String),

    /// 并发执行时 Curl Multi 返回错误，整个批次被放弃
    #[error("Curl Multi read error: {0}")]
    BatchExecution(#[from] MultiError),
}

impl Error {
    /// 是否为配置错误
    #[inline]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// 是否为非法选项错误
    #[inline]
    pub fn is_invalid_options(&self) -> bool {
        matches!(self, Self::InvalidOptions(_))
    }

    /// 是否为批量执行错误
    #[inline]
    pub fn is_batch_execution(&self) -> bool {
        matches!(self, Self::BatchExecution(_))
    }
}

/// 会话队列结果
pub type Result<T> = result::Result<T, Error>;
