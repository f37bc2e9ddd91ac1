mod context;
mod registry;

pub(crate) use context::Context;
pub use registry::{SessionRegistry, UrlArgument};

use super::{
    diagnostics::{TransferError, TransferInfo},
    engine::Outcome,
    options::{apply_option, apply_options, CurlOption, OptionSet, OptionValue, Rejection},
};
use curl::{easy::Easy2, init as curl_init, Error as CurlError, Version};
use log::debug;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;

static DEFAULT_USER_AGENT: Lazy<String> = Lazy::new(|| {
    format!(
        "QiniuRust/qiniu-curl-sessions-{}/libcurl-{}",
        env!("CARGO_PKG_VERSION"),
        Version::get().version(),
    )
});

/// 会话编号
///
/// 按插入顺序递增，关闭其他会话不会改变已有会话的编号
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionKey(usize);

impl SessionKey {
    #[inline]
    pub const fn new(key: usize) -> Self {
        Self(key)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl From<usize> for SessionKey {
    #[inline]
    fn from(key: usize) -> Self {
        Self(key)
    }
}

impl From<SessionKey> for usize {
    #[inline]
    fn from(key: SessionKey) -> Self {
        key.0
    }
}

impl fmt::Display for SessionKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 传输状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferStatus {
    /// 尚未执行
    NotStarted,
    /// 正在执行
    Running,
    /// 传输完成，HTTP 状态码需要另外判断
    Completed,
    /// 传输失败
    Failed,
}

/// HTTP 状态码是否表示成功
#[inline]
pub(crate) fn is_success_code(code: u32) -> bool {
    code > 0 && code < 400
}

/// 传输会话
///
/// 独占一个 Curl 句柄，句柄随会话一同释放
#[derive(Debug)]
pub struct Session {
    key: SessionKey,
    url: String,
    options: OptionSet,
    status: TransferStatus,
    response_code: u32,
    last_error: Option<CurlError>,
    attempts: usize,
    easy: Option<Easy2<Context>>,
}

impl Session {
    pub(crate) fn open(key: SessionKey, url: String) -> Result<Self, CurlError> {
        curl_init();
        let mut easy = Easy2::new(Context::default());
        easy.url(&url)?;
        easy.useragent(&DEFAULT_USER_AGENT)?;
        Ok(Self {
            key,
            url,
            options: Default::default(),
            status: TransferStatus::NotStarted,
            response_code: 0,
            last_error: None,
            attempts: 0,
            easy: Some(easy),
        })
    }

    #[inline]
    pub fn key(&self) -> SessionKey {
        self.key
    }

    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 已经成功设置到该会话上的选项
    #[inline]
    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    #[inline]
    pub fn status(&self) -> TransferStatus {
        self.status
    }

    /// 最后一次传输的 HTTP 状态码，未收到响应时为 0
    #[inline]
    pub fn response_code(&self) -> u32 {
        self.response_code
    }

    /// 最后一次传输的错误信息
    #[inline]
    pub fn last_error(&self) -> TransferError {
        self.last_error.as_ref().into()
    }

    /// 最后一次传输收到的最终响应头
    #[inline]
    pub fn response_headers(&self) -> &[(String, String)] {
        self.easy
            .as_ref()
            .map(|easy| easy.get_ref().headers())
            .unwrap_or(&[])
    }

    /// 最近一次执行中实际发起的传输次数
    #[inline]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub(crate) fn set_option(
        &mut self,
        option: CurlOption,
        value: OptionValue,
    ) -> Result<(), Rejection> {
        let easy = self
            .easy
            .as_mut()
            .ok_or_else(|| Rejection::detached(option))?;
        apply_option(easy, option, &value)?;
        self.remember(option, value);
        Ok(())
    }

    /// 按顺序设置选项，被拒绝的选项及其后的选项都不会生效
    pub(crate) fn set_options(&mut self, options: &OptionSet) -> Result<(), Rejection> {
        let easy = match self.easy.as_mut() {
            Some(easy) => easy,
            None => match options.iter().next() {
                Some((option, _)) => return Err(Rejection::detached(option)),
                None => return Ok(()),
            },
        };
        let result = apply_options(easy, options);
        let rejected = result.as_ref().err().map(Rejection::option);
        for (option, value) in options
            .iter()
            .take_while(|(option, _)| Some(*option) != rejected)
        {
            self.remember(option, value.to_owned());
        }
        result
    }

    fn remember(&mut self, option: CurlOption, value: OptionValue) {
        if option == CurlOption::Url {
            if let Some(url) = value.as_text() {
                self.url = url.to_owned();
            }
        }
        self.options.insert(option, value);
    }

    #[inline]
    pub(crate) fn begin_exec(&mut self) {
        self.attempts = 0;
    }

    /// 执行一次单独传输
    ///
    /// 传输出错或状态码不在 `(0, 400)` 内时返回 [`Outcome::Failed`]
    pub(crate) fn perform(&mut self) -> Outcome {
        let result = match self.easy.as_mut() {
            Some(easy) => {
                easy.get_mut().reset();
                self.status = TransferStatus::Running;
                easy.perform()
            }
            None => {
                self.status = TransferStatus::Failed;
                return Outcome::Failed;
            }
        };
        self.attempts += 1;
        if self.record(Some(result)) && is_success_code(self.response_code) {
            self.take_content()
        } else {
            Outcome::Failed
        }
    }

    /// 将句柄借出给 Multi 使用
    pub(crate) fn lend(&mut self) -> Option<Easy2<Context>> {
        let mut easy = self.easy.take()?;
        easy.get_mut().reset();
        self.status = TransferStatus::Running;
        Some(easy)
    }

    /// 归还从 Multi 中移除的句柄，并记录传输结果
    pub(crate) fn restore(
        &mut self,
        easy: Easy2<Context>,
        result: Option<Result<(), CurlError>>,
    ) {
        self.easy = Some(easy);
        self.attempts += 1;
        self.record(result);
    }

    /// 句柄丢失，会话无法继续使用
    pub(crate) fn lose_handle(&mut self) {
        self.easy = None;
        self.status = TransferStatus::Failed;
    }

    /// 取出传输内容，非返回内容模式下只返回 [`Outcome::Done`]
    pub(crate) fn take_content(&mut self) -> Outcome {
        match self.easy.as_mut() {
            Some(easy) if easy.get_ref().return_transfer() => {
                Outcome::Content(easy.get_mut().take_body())
            }
            Some(_) => Outcome::Done,
            None => Outcome::Failed,
        }
    }

    fn record(&mut self, result: Option<Result<(), CurlError>>) -> bool {
        let easy = match self.easy.as_mut() {
            Some(easy) => easy,
            None => return false,
        };
        self.response_code = easy.response_code().unwrap_or_default();
        debug!(
            "Session {} attempt {} finished, response code: {}",
            self.key, self.attempts, self.response_code
        );
        match result {
            Some(Ok(())) => {
                self.status = TransferStatus::Completed;
                self.last_error = None;
                true
            }
            Some(Err(err)) => {
                debug!("Session {} transfer error: {}", self.key, err);
                self.status = TransferStatus::Failed;
                self.last_error = Some(err);
                false
            }
            None => {
                self.status = TransferStatus::Failed;
                self.last_error = None;
                false
            }
        }
    }

    pub(crate) fn transfer_info(&mut self) -> TransferInfo {
        self.easy
            .as_mut()
            .map(TransferInfo::gather)
            .unwrap_or_default()
    }
}
