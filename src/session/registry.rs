use super::{
    super::{
        diagnostics::{Info, InfoKind, TransferError},
        options::{CurlOption, OptionSet, OptionValue, RawOptions},
        Result,
    },
    Session, SessionKey,
};
use log::{info, warn};
use serde_json::Value;
use std::collections::BTreeMap;

/// 初始化会话时传入的 URL 参数
///
/// 字符串创建一个会话，数组为每个元素创建一个会话，其他类型的值都是非法参数
#[derive(Debug, Clone, PartialEq)]
pub struct UrlArgument(Value);

impl From<&str> for UrlArgument {
    #[inline]
    fn from(url: &str) -> Self {
        Self(Value::String(url.to_owned()))
    }
}

impl From<String> for UrlArgument {
    #[inline]
    fn from(url: String) -> Self {
        Self(Value::String(url))
    }
}

impl From<Vec<&str>> for UrlArgument {
    #[inline]
    fn from(urls: Vec<&str>) -> Self {
        Self(urls.into())
    }
}

impl From<Vec<String>> for UrlArgument {
    #[inline]
    fn from(urls: Vec<String>) -> Self {
        Self(urls.into())
    }
}

impl From<Value> for UrlArgument {
    #[inline]
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// 会话注册表
///
/// 按插入顺序保存会话，离开作用域时关闭全部会话
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionKey, Session>,
    next_key: usize,
    defaults: OptionSet,
}

impl SessionRegistry {
    /// 创建会话注册表，`defaults` 将应用到之后创建的每个会话上
    #[inline]
    pub fn new(defaults: OptionSet) -> Self {
        Self {
            sessions: Default::default(),
            next_key: 0,
            defaults,
        }
    }

    #[inline]
    pub fn defaults(&self) -> &OptionSet {
        &self.defaults
    }

    /// 创建一个或多个会话
    ///
    /// 数组中遇到非法元素时停止，该元素及其后的元素都不会创建会话，已经创建的会话保留。
    /// 所有元素都创建成功时返回 `true`
    pub fn init(&mut self, urls: impl Into<UrlArgument>, options: Option<&OptionSet>) -> bool {
        match urls.into().0 {
            Value::String(url) => self.add(&url, options).is_some(),
            Value::Array(urls) => {
                for url in urls {
                    match url {
                        Value::String(url) => {
                            if self.add(&url, options).is_none() {
                                return false;
                            }
                        }
                        other => {
                            warn!("Wrong URL parameter: {}, the rest are skipped", other);
                            return false;
                        }
                    }
                }
                true
            }
            other => {
                warn!("Wrong URL parameter: {}", other);
                false
            }
        }
    }

    /// 创建一个会话并返回会话编号
    ///
    /// 没有协议头的 URL 会补上 `http://`，`options` 覆盖在默认选项之上
    pub fn add(&mut self, url: &str, options: Option<&OptionSet>) -> Option<SessionKey> {
        let url = normalize_url(url);
        let key = SessionKey::new(self.next_key);
        let mut session = match Session::open(key, url) {
            Ok(session) => session,
            Err(err) => {
                warn!("Failed to open session {}: {}", key, err);
                return None;
            }
        };
        self.next_key += 1;

        let merged = options.map_or_else(
            || self.defaults.to_owned(),
            |options| options.merged_over(&self.defaults),
        );
        if !merged.is_empty() {
            if let Err(rejection) = session.set_options(&merged) {
                warn!("Session {} option is rejected: {}", key, rejection);
            }
        }
        info!("Session {} is initialized for {}", key, session.url());
        self.sessions.insert(key, session);
        Some(key)
    }

    /// 设置会话选项，未指定会话编号时设置 0 号会话
    pub fn set_option(
        &mut self,
        option: CurlOption,
        value: impl Into<OptionValue>,
        key: Option<SessionKey>,
    ) -> bool {
        let key = key.unwrap_or_default();
        match self.sessions.get_mut(&key) {
            Some(session) => match session.set_option(option, value.into()) {
                Ok(()) => true,
                Err(rejection) => {
                    warn!("Session {} option is rejected: {}", key, rejection);
                    false
                }
            },
            None => {
                warn!("Session {} is not found", key);
                false
            }
        }
    }

    /// 批量设置会话选项，未指定会话编号时设置 0 号会话
    ///
    /// 选项中存在非法的键时，一个选项都不会设置，该会话被关闭并返回 [`crate::Error::InvalidOptions`]。
    /// 某个选项被拒绝时返回 `Ok(false)`，其后的选项不再设置
    pub fn set_options(
        &mut self,
        options: impl Into<RawOptions>,
        key: Option<SessionKey>,
    ) -> Result<bool> {
        let key = key.unwrap_or_default();
        let options = match OptionSet::try_from(options.into()) {
            Ok(options) => options,
            Err(err) => {
                warn!("Session {} will be closed: {}", key, err);
                self.close(Some(key));
                return Err(err);
            }
        };
        match self.sessions.get_mut(&key) {
            Some(session) => match session.set_options(&options) {
                Ok(()) => Ok(true),
                Err(rejection) => {
                    warn!("Session {} option is rejected: {}", key, rejection);
                    Ok(false)
                }
            },
            None => {
                warn!("Session {} is not found", key);
                Ok(false)
            }
        }
    }

    /// 关闭会话，未指定会话编号时关闭全部会话
    pub fn close(&mut self, key: Option<SessionKey>) {
        match key {
            Some(key) => {
                if self.sessions.remove(&key).is_some() {
                    info!("Session {} is closed", key);
                }
            }
            None => self.clear(),
        }
    }

    /// 关闭全部会话，会话编号重新从 0 开始
    pub fn clear(&mut self) {
        if !self.sessions.is_empty() {
            info!("{} sessions are closed", self.sessions.len());
        }
        self.sessions.clear();
        self.next_key = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[inline]
    pub fn contains(&self, key: SessionKey) -> bool {
        self.sessions.contains_key(&key)
    }

    /// 按插入顺序返回全部会话编号
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = SessionKey> + '_ {
        self.sessions.keys().copied()
    }

    #[inline]
    pub fn session(&self, key: SessionKey) -> Option<&Session> {
        self.sessions.get(&key)
    }

    #[inline]
    pub(crate) fn session_mut(&mut self, key: SessionKey) -> Option<&mut Session> {
        self.sessions.get_mut(&key)
    }

    /// 获取传输错误，未指定会话编号时返回全部会话的传输错误
    pub fn errors(&self, key: Option<SessionKey>) -> BTreeMap<SessionKey, TransferError> {
        match key {
            Some(key) => self
                .sessions
                .get(&key)
                .map(|session| (key, session.last_error()))
                .into_iter()
                .collect(),
            None => self
                .sessions
                .iter()
                .map(|(key, session)| (*key, session.last_error()))
                .collect(),
        }
    }

    /// 获取传输指标，未指定会话编号时返回全部会话的传输指标，
    /// 指定 `kind` 时只返回该项指标
    pub fn info(
        &mut self,
        key: Option<SessionKey>,
        kind: Option<InfoKind>,
    ) -> BTreeMap<SessionKey, Info> {
        let describe = |session: &mut Session| {
            let info = session.transfer_info();
            match kind {
                Some(kind) => Info::Value(info.get(kind)),
                None => Info::Transfer(info),
            }
        };
        match key {
            Some(key) => self
                .sessions
                .get_mut(&key)
                .map(|session| (key, describe(session)))
                .into_iter()
                .collect(),
            None => self
                .sessions
                .iter_mut()
                .map(|(key, session)| (*key, describe(session)))
                .collect(),
        }
    }
}

impl Drop for SessionRegistry {
    #[inline]
    fn drop(&mut self) {
        self.clear();
    }
}

fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_owned()
    } else {
        format!("http://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::super::{diagnostics::InfoKind, options::RawOptionKey},
        *,
    };
    use serde_json::json;

    #[test]
    fn test_init_inserts_scheme() {
        let mut registry = SessionRegistry::default();
        assert!(registry.init("example.org", None));
        assert!(registry.init("https://example.org/path", None));
        assert_eq!(
            registry.session(SessionKey::new(0)).map(Session::url),
            Some("http://example.org")
        );
        assert_eq!(
            registry.session(SessionKey::new(1)).map(Session::url),
            Some("https://example.org/path")
        );
    }

    #[test]
    fn test_init_stops_at_wrong_url() {
        let mut registry = SessionRegistry::default();
        assert!(!registry.init(json!(["http://a", 123, "http://b"]), None));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.session(SessionKey::new(0)).map(Session::url),
            Some("http://a")
        );

        assert!(!registry.init(json!(42), None));
        assert!(!registry.init(json!({ "url": "http://c" }), None));
        assert_eq!(registry.len(), 1);

        assert!(registry.init(vec!["http://c", "d"], None));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_keys_are_stable() {
        let mut registry = SessionRegistry::default();
        assert!(registry.init(vec!["a", "b", "c"], None));
        registry.close(Some(SessionKey::new(1)));
        assert_eq!(
            registry.keys().map(SessionKey::get).collect::<Vec<_>>(),
            [0, 2]
        );
        assert_eq!(registry.add("d", None), Some(SessionKey::new(3)));
        assert!(registry.contains(SessionKey::new(2)));

        registry.close(None);
        assert!(registry.is_empty());
        assert_eq!(registry.add("e", None), Some(SessionKey::new(0)));
    }

    #[test]
    fn test_options_merged_over_defaults() {
        let defaults = OptionSet::new()
            .with(CurlOption::UserAgent, "default agent")
            .with(CurlOption::ReturnTransfer, true);
        let mut registry = SessionRegistry::new(defaults.to_owned());
        let overrides = OptionSet::new().with(CurlOption::UserAgent, "override agent");
        assert!(registry.init("a", Some(&overrides)));
        assert!(registry.init("b", None));

        let first = registry.session(SessionKey::new(0)).unwrap().options();
        assert_eq!(
            first.get(CurlOption::UserAgent),
            Some(&"override agent".into())
        );
        assert_eq!(first.get(CurlOption::ReturnTransfer), Some(&true.into()));
        let second = registry.session(SessionKey::new(1)).unwrap().options();
        assert_eq!(
            second.get(CurlOption::UserAgent),
            Some(&"default agent".into())
        );
        assert_eq!(registry.defaults(), &defaults);
    }

    #[test]
    fn test_rejected_default_keeps_session() {
        let defaults = OptionSet::new().with(CurlOption::Timeout, "never");
        let mut registry = SessionRegistry::new(defaults);
        assert!(registry.init("a", None));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_option() {
        let mut registry = SessionRegistry::default();
        assert!(registry.init(vec!["a", "b"], None));
        assert!(registry.set_option(CurlOption::FollowLocation, true, None));
        assert!(registry.set_option(CurlOption::MaxRedirections, 3, Some(SessionKey::new(1))));
        assert!(!registry.set_option(CurlOption::MaxRedirections, "three", None));
        assert!(!registry.set_option(CurlOption::FollowLocation, true, Some(SessionKey::new(9))));
        assert!(registry
            .session(SessionKey::new(0))
            .unwrap()
            .options()
            .contains(CurlOption::FollowLocation));
    }

    #[test]
    fn test_set_options_with_invalid_keys_closes_session() {
        let mut registry = SessionRegistry::default();
        assert!(registry.init(vec!["a", "b"], None));

        let raw: RawOptions = vec![
            (RawOptionKey::from(CurlOption::ReturnTransfer), OptionValue::from(true)),
            (RawOptionKey::from("useragent"), OptionValue::from("agent")),
        ]
        .into_iter()
        .collect();
        let err = registry.set_options(raw, Some(SessionKey::new(1))).unwrap_err();
        assert!(err.is_invalid_options());
        assert!(!registry.contains(SessionKey::new(1)));
        assert_eq!(registry.len(), 1);
        assert!(registry
            .session(SessionKey::new(0))
            .unwrap()
            .options()
            .is_empty());
    }

    #[test]
    fn test_set_options() -> Result<()> {
        let mut registry = SessionRegistry::default();
        assert!(registry.init("a", None));
        let options = OptionSet::new()
            .with(CurlOption::ReturnTransfer, true)
            .with(CurlOption::Timeout, 10);
        assert!(registry.set_options(&options, None)?);

        let rejected = OptionSet::new()
            .with(CurlOption::Referer, "http://referer")
            .with(CurlOption::Timeout, -1)
            .with(CurlOption::Verbose, false);
        assert!(!registry.set_options(rejected, None)?);
        let applied = registry.session(SessionKey::new(0)).unwrap().options();
        assert!(applied.contains(CurlOption::Referer));
        assert_eq!(applied.get(CurlOption::Timeout), Some(&10.into()));
        assert!(!applied.contains(CurlOption::Verbose));

        assert!(!registry.set_options(&options, Some(SessionKey::new(5)))?);
        Ok(())
    }

    #[test]
    fn test_diagnostics_before_execution() {
        let mut registry = SessionRegistry::default();
        assert!(registry.init(vec!["a", "b"], None));

        let errors = registry.errors(None);
        assert_eq!(errors.len(), 2);
        assert!(errors.values().all(TransferError::is_ok));
        assert_eq!(registry.errors(Some(SessionKey::new(1))).len(), 1);
        assert!(registry.errors(Some(SessionKey::new(7))).is_empty());

        let info = registry.info(Some(SessionKey::new(0)), Some(InfoKind::ResponseCode));
        assert_eq!(
            info.get(&SessionKey::new(0))
                .and_then(Info::as_value)
                .and_then(|value| value.as_integer()),
            Some(0)
        );
        let info = registry.info(None, None);
        assert_eq!(info.len(), 2);
        assert!(info.values().all(|info| info.as_transfer().is_some()));
    }
}
