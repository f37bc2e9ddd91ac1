use super::{
    config::{Config, ConfigBuilder},
    diagnostics::{Info, InfoKind, TransferError},
    engine::{ExecOutput, ExecutionEngine},
    options::{CurlOption, OptionSet, OptionValue, RawOptions},
    session::{Session, SessionKey, SessionRegistry, UrlArgument},
    Error, Result,
};
use curl::{init as curl_init, Version};
use log::info;
use serde_json::Value;
use std::{collections::BTreeMap, time::Duration};

/// 基于 Curl 的 HTTP 会话队列
///
/// 管理多个传输会话，可以串行执行单个会话，也可以通过 Curl Multi 并发执行全部会话，
/// 状态码不在 `(0, 400)` 内的会话将按照重试次数重试
#[derive(Debug)]
pub struct CurlSessions {
    registry: SessionRegistry,
    retry: usize,
    wait_timeout: Duration,
}

impl CurlSessions {
    /// 使用默认配置创建会话队列
    #[inline]
    pub fn new() -> Result<Self> {
        Self::with_config(Default::default())
    }

    /// 使用指定配置创建会话队列
    ///
    /// 链接的 libcurl 不支持 HTTP 协议时返回 [`Error::Configuration`]
    pub fn with_config(config: Config) -> Result<Self> {
        let version = Version::get();
        if !version.protocols().any(|protocol| protocol == "http") {
            return Err(Error::Configuration(format!(
                "libcurl {} is built without HTTP support",
                version.version()
            )));
        }
        curl_init();
        info!(
            "Curl sessions are created, libcurl: {}, retry: {}",
            version.version(),
            config.retry()
        );
        Ok(Self {
            registry: SessionRegistry::new(config.defaults().to_owned()),
            retry: config.retry(),
            wait_timeout: config.wait_timeout(),
        })
    }

    /// 从 JSON 对象中读取配置并创建会话队列
    ///
    /// 格式为 `{"retry": n, "<选项标识符>": 默认值, ...}`
    #[inline]
    pub fn from_json(settings: &Value) -> Result<Self> {
        Self::with_config(Config::from_json(settings)?)
    }

    /// 创建配置构建器
    #[inline]
    pub fn builder() -> ConfigBuilder {
        Config::builder()
    }

    #[inline]
    pub fn retry(&self) -> usize {
        self.retry
    }

    #[inline]
    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    #[inline]
    pub fn defaults(&self) -> &OptionSet {
        self.registry.defaults()
    }

    /// 创建一个或多个会话，参见 [`SessionRegistry::init`]
    #[inline]
    pub fn init(&mut self, urls: impl Into<UrlArgument>, options: Option<&OptionSet>) -> bool {
        self.registry.init(urls, options)
    }

    /// 创建一个会话并返回会话编号
    #[inline]
    pub fn add(&mut self, url: &str, options: Option<&OptionSet>) -> Option<SessionKey> {
        self.registry.add(url, options)
    }

    /// 设置会话选项，未指定会话编号时设置 0 号会话
    #[inline]
    pub fn set_option(
        &mut self,
        option: CurlOption,
        value: impl Into<OptionValue>,
        key: Option<SessionKey>,
    ) -> bool {
        self.registry.set_option(option, value, key)
    }

    /// 批量设置会话选项，参见 [`SessionRegistry::set_options`]
    #[inline]
    pub fn set_options(
        &mut self,
        options: impl Into<RawOptions>,
        key: Option<SessionKey>,
    ) -> Result<bool> {
        self.registry.set_options(options, key)
    }

    /// 执行会话
    ///
    /// 指定会话编号时只串行执行该会话，只有一个会话时串行执行该会话，
    /// 否则通过 Curl Multi 并发执行全部会话。
    /// 没有会话，会话编号不存在，或串行执行失败时返回 `Ok(None)`。
    /// 并发执行时 Curl Multi 出错将返回 [`Error::BatchExecution`]
    #[inline]
    pub fn exec(&mut self, key: Option<SessionKey>) -> Result<Option<ExecOutput>> {
        self.exec_with_retry(key, self.retry)
    }

    /// 使用指定的重试次数执行会话，不影响配置的重试次数
    pub fn exec_with_retry(
        &mut self,
        key: Option<SessionKey>,
        retry: usize,
    ) -> Result<Option<ExecOutput>> {
        ExecutionEngine::new(&mut self.registry, retry, self.wait_timeout).exec(key)
    }

    /// 获取传输错误，未指定会话编号时返回全部会话的传输错误
    #[inline]
    pub fn errors(&self, key: Option<SessionKey>) -> BTreeMap<SessionKey, TransferError> {
        self.registry.errors(key)
    }

    /// 获取传输指标，参见 [`SessionRegistry::info`]
    #[inline]
    pub fn info(
        &mut self,
        key: Option<SessionKey>,
        kind: Option<InfoKind>,
    ) -> BTreeMap<SessionKey, Info> {
        self.registry.info(key, kind)
    }

    /// 关闭会话，未指定会话编号时关闭全部会话
    #[inline]
    pub fn close(&mut self, key: Option<SessionKey>) {
        self.registry.close(key)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.registry.clear()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = SessionKey> + '_ {
        self.registry.keys()
    }

    #[inline]
    pub fn session(&self, key: SessionKey) -> Option<&Session> {
        self.registry.session(key)
    }
}
