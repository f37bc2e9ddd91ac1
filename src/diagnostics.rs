use super::session::Context;
use curl::{easy::Easy2, Error as CurlError};
use serde::Serialize;
use std::{fmt, time::Duration};

/// 传输错误信息
///
/// 传输成功时 `code` 为 0，`message` 为空字符串
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferError {
    code: i32,
    message: String,
}

impl TransferError {
    /// 获取 libcurl 错误码
    #[inline]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// 获取错误描述
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl From<Option<&CurlError>> for TransferError {
    fn from(err: Option<&CurlError>) -> Self {
        match err {
            Some(err) => Self {
                code: err.code() as i32,
                message: err
                    .extra_description()
                    .unwrap_or_else(|| err.description())
                    .to_owned(),
            },
            None => Default::default(),
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// 单项传输指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[non_exhaustive]
pub enum InfoKind {
    EffectiveUrl,
    ResponseCode,
    ConnectCode,
    ContentType,
    TotalTime,
    NameLookupTime,
    ConnectTime,
    AppConnectTime,
    PreTransferTime,
    StartTransferTime,
    RedirectTime,
    RedirectCount,
    RedirectUrl,
    DownloadSize,
    UploadSize,
    ContentLengthDownload,
    HeaderSize,
    RequestSize,
    PrimaryIp,
    PrimaryPort,
    LocalIp,
    LocalPort,
}

/// 单项传输指标的值，时长的单位为秒
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InfoValue {
    Text(Option<String>),
    Integer(u64),
    Float(f64),
}

impl InfoValue {
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => text.as_deref(),
            _ => None,
        }
    }

    #[inline]
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// 会话最后一次传输的全部指标
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferInfo {
    pub effective_url: Option<String>,
    pub response_code: u32,
    pub connect_code: u32,
    pub content_type: Option<String>,
    pub total_time: f64,
    pub namelookup_time: f64,
    pub connect_time: f64,
    pub appconnect_time: f64,
    pub pretransfer_time: f64,
    pub starttransfer_time: f64,
    pub redirect_time: f64,
    pub redirect_count: u32,
    pub redirect_url: Option<String>,
    pub download_size: f64,
    pub upload_size: f64,
    pub content_length_download: f64,
    pub header_size: u64,
    pub request_size: u64,
    pub primary_ip: Option<String>,
    pub primary_port: u16,
    pub local_ip: Option<String>,
    pub local_port: u16,
}

impl TransferInfo {
    /// 从 Curl 句柄读取指标，读取失败的指标保持默认值
    pub(crate) fn gather(easy: &mut Easy2<Context>) -> Self {
        return Self {
            effective_url: text(easy.effective_url()),
            response_code: easy.response_code().unwrap_or_default(),
            connect_code: easy.http_connectcode().unwrap_or_default(),
            content_type: text(easy.content_type()),
            total_time: secs(easy.total_time()),
            namelookup_time: secs(easy.namelookup_time()),
            connect_time: secs(easy.connect_time()),
            appconnect_time: secs(easy.appconnect_time()),
            pretransfer_time: secs(easy.pretransfer_time()),
            starttransfer_time: secs(easy.starttransfer_time()),
            redirect_time: secs(easy.redirect_time()),
            redirect_count: easy.redirect_count().unwrap_or_default(),
            redirect_url: text(easy.redirect_url()),
            download_size: easy.download_size().unwrap_or_default(),
            upload_size: easy.upload_size().unwrap_or_default(),
            content_length_download: easy.content_length_download().unwrap_or(-1.0),
            header_size: easy.header_size().unwrap_or_default(),
            request_size: easy.request_size().unwrap_or_default(),
            primary_ip: text(easy.primary_ip()),
            primary_port: easy.primary_port().unwrap_or_default(),
            local_ip: text(easy.local_ip()),
            local_port: easy.local_port().unwrap_or_default(),
        };

        #[inline]
        fn text(result: Result<Option<&str>, CurlError>) -> Option<String> {
            result.ok().flatten().map(ToOwned::to_owned)
        }

        #[inline]
        fn secs(result: Result<Duration, CurlError>) -> f64 {
            result.map_or(0.0, |duration| duration.as_secs_f64())
        }
    }

    /// 获取单项指标
    pub fn get(&self, kind: InfoKind) -> InfoValue {
        match kind {
            InfoKind::EffectiveUrl => InfoValue::Text(self.effective_url.to_owned()),
            InfoKind::ResponseCode => InfoValue::Integer(self.response_code.into()),
            InfoKind::ConnectCode => InfoValue::Integer(self.connect_code.into()),
            InfoKind::ContentType => InfoValue::Text(self.content_type.to_owned()),
            InfoKind::TotalTime => InfoValue::Float(self.total_time),
            InfoKind::NameLookupTime => InfoValue::Float(self.namelookup_time),
            InfoKind::ConnectTime => InfoValue::Float(self.connect_time),
            InfoKind::AppConnectTime => InfoValue::Float(self.appconnect_time),
            InfoKind::PreTransferTime => InfoValue::Float(self.pretransfer_time),
            InfoKind::StartTransferTime => InfoValue::Float(self.starttransfer_time),
            InfoKind::RedirectTime => InfoValue::Float(self.redirect_time),
            InfoKind::RedirectCount => InfoValue::Integer(self.redirect_count.into()),
            InfoKind::RedirectUrl => InfoValue::Text(self.redirect_url.to_owned()),
            InfoKind::DownloadSize => InfoValue::Float(self.download_size),
            InfoKind::UploadSize => InfoValue::Float(self.upload_size),
            InfoKind::ContentLengthDownload => InfoValue::Float(self.content_length_download),
            InfoKind::HeaderSize => InfoValue::Integer(self.header_size),
            InfoKind::RequestSize => InfoValue::Integer(self.request_size),
            InfoKind::PrimaryIp => InfoValue::Text(self.primary_ip.to_owned()),
            InfoKind::PrimaryPort => InfoValue::Integer(self.primary_port.into()),
            InfoKind::LocalIp => InfoValue::Text(self.local_ip.to_owned()),
            InfoKind::LocalPort => InfoValue::Integer(self.local_port.into()),
        }
    }
}

/// 会话的传输指标，全部指标或单项指标
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Info {
    Transfer(TransferInfo),
    Value(InfoValue),
}

impl Info {
    #[inline]
    pub fn as_transfer(&self) -> Option<&TransferInfo> {
        match self {
            Self::Transfer(info) => Some(info),
            _ => None,
        }
    }

    #[inline]
    pub fn as_value(&self) -> Option<&InfoValue> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curl_sys::CURLE_COULDNT_CONNECT;

    #[test]
    fn test_transfer_error_from_curl_error() {
        assert_eq!(TransferError::from(None), TransferError::default());
        assert!(TransferError::default().is_ok());
        assert_eq!(TransferError::default().message(), "");

        let err = CurlError::new(CURLE_COULDNT_CONNECT);
        let transfer_error = TransferError::from(Some(&err));
        assert_eq!(transfer_error.code(), 7);
        assert!(!transfer_error.message().is_empty());
        assert!(!transfer_error.is_ok());
    }

    #[test]
    fn test_single_metric() {
        let info = TransferInfo {
            effective_url: Some("http://example.org/".to_owned()),
            response_code: 404,
            total_time: 0.5,
            ..Default::default()
        };
        assert_eq!(info.get(InfoKind::ResponseCode).as_integer(), Some(404));
        assert_eq!(info.get(InfoKind::TotalTime).as_float(), Some(0.5));
        assert_eq!(
            info.get(InfoKind::EffectiveUrl).as_text(),
            Some("http://example.org/")
        );
        assert_eq!(info.get(InfoKind::ContentType).as_text(), None);
    }
}
