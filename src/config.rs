use super::{
    options::{CurlOption, OptionSet, OptionValue, RawOptions},
    Error, Result,
};
use serde_json::Value;
use std::time::Duration;

const RETRY_KEY: &str = "retry";
const MIN_WAIT_TIMEOUT: Duration = Duration::from_millis(10);

/// 会话队列配置
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    retry: usize,
    defaults: OptionSet,
    wait_timeout: Duration,
}

impl Config {
    /// 获取重试次数
    #[inline]
    pub fn retry(&self) -> usize {
        self.retry
    }

    /// 获取默认选项，将应用到每个新创建的会话上
    #[inline]
    pub fn defaults(&self) -> &OptionSet {
        &self.defaults
    }

    /// 获取并发执行时每次等待的最长时间
    #[inline]
    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// 创建配置构建器
    #[inline]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// 从 JSON 对象中读取配置
    ///
    /// `retry` 键为重试次数，必须是非负整数，其余的键都是选项标识符。
    /// 参数不是对象，`retry` 不合法，或是选项标识符不合法时返回 [`Error::Configuration`]
    pub fn from_json(value: &Value) -> Result<Self> {
        let mut settings = value
            .as_object()
            .ok_or_else(|| {
                Error::Configuration(format!("settings must be an object, got {}", value))
            })?
            .to_owned();
        let mut builder = Self::builder();
        if let Some(retry) = settings.remove(RETRY_KEY) {
            let retry = retry
                .as_u64()
                .and_then(|retry| usize::try_from(retry).ok())
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "retry must be a non-negative integer, got {}",
                        retry
                    ))
                })?;
            builder = builder.retry(retry);
        }
        let defaults = RawOptions::from_json(&Value::Object(settings))
            .and_then(OptionSet::try_from)
            .map_err(|err| Error::Configuration(err.to_string()))?;
        Ok(builder.default_options(defaults).build())
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            retry: 0,
            defaults: Default::default(),
            wait_timeout: Duration::from_secs(1),
        }
    }
}

/// 会话队列配置构建器
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {
    /// 设置重试次数，默认为 0
    ///
    /// 串行执行时最多共执行 `retry + 1` 次
    #[inline]
    pub fn retry(mut self, retry: usize) -> Self {
        self.inner.retry = retry;
        self
    }

    /// 追加一个默认选项，已经存在的选项将被覆盖
    #[inline]
    pub fn default_option(mut self, option: CurlOption, value: impl Into<OptionValue>) -> Self {
        self.inner.defaults.insert(option, value);
        self
    }

    /// 追加多个默认选项
    #[inline]
    pub fn default_options(mut self, options: OptionSet) -> Self {
        self.inner.defaults.extend(options);
        self
    }

    /// 设置并发执行时每次等待的最长时间，默认为 1 秒
    ///
    /// 不足 10 毫秒时按 10 毫秒处理
    #[inline]
    pub fn wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.inner.wait_timeout = wait_timeout.max(MIN_WAIT_TIMEOUT);
        self
    }

    #[inline]
    pub fn build(self) -> Config {
        self.inner
    }
}
