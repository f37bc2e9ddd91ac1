mod apply;

pub(crate) use apply::{apply_option, apply_options, Rejection};

use super::{Error, Result};
use curl_sys as sys;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// 返回内容模式的选项标识符，不在 libcurl 的选项编号范围内
pub const RETURN_TRANSFER_ID: i32 = 19913;

macro_rules! curl_options {
    ($($(#[$meta:meta])* $variant:ident = $id:expr,)*) => {
        /// 会话选项标识符
        ///
        /// 除 [`CurlOption::ReturnTransfer`] 外，每个标识符的数值都与 libcurl 的 `CURLOPT_*` 一致
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[non_exhaustive]
        pub enum CurlOption {
            $($(#[$meta])* $variant,)*
        }

        impl CurlOption {
            /// 获取选项的数值标识符
            #[inline]
            pub const fn id(self) -> i32 {
                match self {
                    $(Self::$variant => $id as i32,)*
                }
            }

            /// 通过数值标识符查找选项
            pub fn from_id(id: i32) -> Option<Self> {
                $(
                    if id == $id as i32 {
                        return Some(Self::$variant);
                    }
                )*
                None
            }
        }
    };
}

curl_options! {
    /// 请求地址
    Url = sys::CURLOPT_URL,
    /// 将响应体作为执行结果返回，而不是丢弃
    ReturnTransfer = RETURN_TRANSFER_ID,
    /// 跟随重定向
    FollowLocation = sys::CURLOPT_FOLLOWLOCATION,
    /// 最大重定向次数
    MaxRedirections = sys::CURLOPT_MAXREDIRS,
    /// 重定向时自动设置 Referer
    AutoReferer = sys::CURLOPT_AUTOREFERER,
    /// 请求超时时长，单位为秒
    Timeout = sys::CURLOPT_TIMEOUT,
    /// 请求超时时长，单位为毫秒
    TimeoutMs = sys::CURLOPT_TIMEOUT_MS,
    /// 连接超时时长，单位为秒
    ConnectTimeout = sys::CURLOPT_CONNECTTIMEOUT,
    /// 连接超时时长，单位为毫秒
    ConnectTimeoutMs = sys::CURLOPT_CONNECTTIMEOUT_MS,
    /// 低速传输的速度阈值，单位为字节每秒
    LowSpeedLimit = sys::CURLOPT_LOW_SPEED_LIMIT,
    /// 低速传输的持续时长，单位为秒
    LowSpeedTime = sys::CURLOPT_LOW_SPEED_TIME,
    /// User-Agent
    UserAgent = sys::CURLOPT_USERAGENT,
    /// Referer
    Referer = sys::CURLOPT_REFERER,
    /// 自定义 HTTP 头列表，每项格式为 `Name: Value`
    HttpHeaders = sys::CURLOPT_HTTPHEADER,
    /// 使用 GET 方法
    HttpGet = sys::CURLOPT_HTTPGET,
    /// 使用 POST 方法
    Post = sys::CURLOPT_POST,
    /// POST 请求体
    PostFields = sys::CURLOPT_POSTFIELDS,
    /// 自定义 HTTP 方法
    CustomRequest = sys::CURLOPT_CUSTOMREQUEST,
    /// 不获取响应体
    NoBody = sys::CURLOPT_NOBODY,
    /// 将响应头写入响应体
    Header = sys::CURLOPT_HEADER,
    /// HTTP 状态码大于等于 400 时视为传输失败
    FailOnError = sys::CURLOPT_FAILONERROR,
    /// Cookie
    Cookie = sys::CURLOPT_COOKIE,
    /// 读取 Cookie 的文件路径
    CookieFile = sys::CURLOPT_COOKIEFILE,
    /// 保存 Cookie 的文件路径
    CookieJar = sys::CURLOPT_COOKIEJAR,
    /// Accept-Encoding，空字符串表示所有支持的编码
    AcceptEncoding = sys::CURLOPT_ACCEPT_ENCODING,
    /// 请求范围，格式为 `X-Y`
    Range = sys::CURLOPT_RANGE,
    /// 代理地址
    Proxy = sys::CURLOPT_PROXY,
    /// 认证信息，格式为 `username:password`
    UserPwd = sys::CURLOPT_USERPWD,
    /// 认证用户名
    Username = sys::CURLOPT_USERNAME,
    /// 认证密码
    Password = sys::CURLOPT_PASSWORD,
    /// 校验服务器证书
    SslVerifyPeer = sys::CURLOPT_SSL_VERIFYPEER,
    /// 校验服务器证书中的主机名
    SslVerifyHost = sys::CURLOPT_SSL_VERIFYHOST,
    /// 输出详细日志到标准错误
    Verbose = sys::CURLOPT_VERBOSE,
}

impl fmt::Display for CurlOption {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.id())
    }
}

/// 选项值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// 布尔值
    Bool(bool),
    /// 整型值
    Integer(i64),
    /// 字符串值
    Text(String),
    /// 字符串列表
    List(Vec<String>),
}

impl OptionValue {
    /// 获取布尔值，整型值非零即为真
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// 获取整型值，布尔值转换为 0 或 1
    #[inline]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// 获取字符串值
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 获取字符串列表
    #[inline]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for OptionValue {
    #[inline]
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for OptionValue {
    #[inline]
    fn from(i: i32) -> Self {
        Self::Integer(i.into())
    }
}

impl From<u32> for OptionValue {
    #[inline]
    fn from(i: u32) -> Self {
        Self::Integer(i.into())
    }
}

impl From<&str> for OptionValue {
    #[inline]
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for OptionValue {
    #[inline]
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for OptionValue {
    #[inline]
    fn from(list: Vec<String>) -> Self {
        Self::List(list)
    }
}

impl From<Vec<&str>> for OptionValue {
    #[inline]
    fn from(list: Vec<&str>) -> Self {
        Self::List(list.into_iter().map(ToOwned::to_owned).collect())
    }
}

impl TryFrom<&Value> for OptionValue {
    type Error = String;

    fn try_from(value: &Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .ok_or_else(|| format!("number {} is not an integer", n)),
            Value::String(s) => Ok(Self::Text(s.to_owned())),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(ToOwned::to_owned)
                        .ok_or_else(|| format!("list item {} is not a string", item))
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Self::List),
            other => Err(format!("unsupported option value {}", other)),
        }
    }
}

/// 选项集合
///
/// 保持插入顺序，重复插入同一选项会原地替换其值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    entries: Vec<(CurlOption, OptionValue)>,
}

impl OptionSet {
    /// 创建空的选项集合
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// 插入选项，返回该选项原来的值
    pub fn insert(
        &mut self,
        option: CurlOption,
        value: impl Into<OptionValue>,
    ) -> Option<OptionValue> {
        let value = value.into();
        if let Some((_, existing)) = self.entries.iter_mut().find(|(o, _)| *o == option) {
            Some(std::mem::replace(existing, value))
        } else {
            self.entries.push((option, value));
            None
        }
    }

    /// 插入选项并返回自身
    #[inline]
    pub fn with(mut self, option: CurlOption, value: impl Into<OptionValue>) -> Self {
        self.insert(option, value);
        self
    }

    #[inline]
    pub fn get(&self, option: CurlOption) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(o, _)| *o == option)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, option: CurlOption) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(o, _)| *o == option)?;
        Some(self.entries.remove(index).1)
    }

    #[inline]
    pub fn contains(&self, option: CurlOption) -> bool {
        self.get(option).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (CurlOption, &OptionValue)> {
        self.entries.iter().map(|(option, value)| (*option, value))
    }

    /// 将当前集合覆盖在默认值之上，生成新的集合
    ///
    /// 当前集合的选项在前，默认值中未被覆盖的选项在后，`defaults` 本身不会被修改
    pub fn merged_over(&self, defaults: &OptionSet) -> OptionSet {
        let mut merged = self.to_owned();
        for (option, value) in defaults.iter() {
            if !merged.contains(option) {
                merged.entries.push((option, value.to_owned()));
            }
        }
        merged
    }
}

impl<V: Into<OptionValue>> FromIterator<(CurlOption, V)> for OptionSet {
    fn from_iter<T: IntoIterator<Item = (CurlOption, V)>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<V: Into<OptionValue>> Extend<(CurlOption, V)> for OptionSet {
    fn extend<T: IntoIterator<Item = (CurlOption, V)>>(&mut self, iter: T) {
        for (option, value) in iter {
            self.insert(option, value);
        }
    }
}

impl IntoIterator for OptionSet {
    type Item = (CurlOption, OptionValue);
    type IntoIter = std::vec::IntoIter<(CurlOption, OptionValue)>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// 未经校验的选项键
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOptionKey {
    /// 数值标识符
    Id(i32),
    /// 字符串键，永远不是合法的选项标识符
    Name(String),
}

impl From<CurlOption> for RawOptionKey {
    #[inline]
    fn from(option: CurlOption) -> Self {
        Self::Id(option.id())
    }
}

impl From<i32> for RawOptionKey {
    #[inline]
    fn from(id: i32) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for RawOptionKey {
    #[inline]
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for RawOptionKey {
    #[inline]
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for RawOptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => id.fmt(f),
            Self::Name(name) => write!(f, "{:?}", name),
        }
    }
}

/// 未经校验的选项集合
///
/// 用于接收来源不确定的选项，转换为 [`OptionSet`] 时校验每个键
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOptions {
    entries: Vec<(RawOptionKey, OptionValue)>,
}

impl RawOptions {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn push(&mut self, key: impl Into<RawOptionKey>, value: impl Into<OptionValue>) {
        self.entries.push((key.into(), value.into()));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 从 JSON 对象解析，可以解析为整数的键视为数值标识符
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            Error::InvalidOptions(format!("options must be an object, got {}", value))
        })?;
        object
            .iter()
            .map(|(key, value)| {
                let key = key
                    .parse::<i32>()
                    .map_or_else(|_| RawOptionKey::Name(key.to_owned()), RawOptionKey::Id);
                OptionValue::try_from(value)
                    .map(|value| (key, value))
                    .map_err(Error::InvalidOptions)
            })
            .collect()
    }
}

impl<K: Into<RawOptionKey>, V: Into<OptionValue>> FromIterator<(K, V)> for RawOptions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl From<OptionSet> for RawOptions {
    #[inline]
    fn from(set: OptionSet) -> Self {
        set.into_iter().collect()
    }
}

impl From<&OptionSet> for RawOptions {
    #[inline]
    fn from(set: &OptionSet) -> Self {
        set.to_owned().into()
    }
}

impl TryFrom<RawOptions> for OptionSet {
    type Error = Error;

    fn try_from(raw: RawOptions) -> Result<Self> {
        let mut set = OptionSet::new();
        for (key, value) in raw.entries {
            match &key {
                RawOptionKey::Id(id) => match CurlOption::from_id(*id) {
                    Some(option) => {
                        set.insert(option, value);
                    }
                    None => {
                        return Err(Error::InvalidOptions(format!(
                            "unknown option identifier {}",
                            key
                        )))
                    }
                },
                RawOptionKey::Name(_) => {
                    return Err(Error::InvalidOptions(format!(
                        "{} is not an option identifier",
                        key
                    )))
                }
            }
        }
        Ok(set)
    }
}
