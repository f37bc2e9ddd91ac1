mod multi;
mod single;

use super::{
    session::{SessionKey, SessionRegistry},
    Result,
};
use log::{info, warn};
use std::time::Duration;

/// 单个会话的执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 返回内容模式下的响应体
    Content(Vec<u8>),
    /// 传输成功，但未开启返回内容模式
    Done,
    /// 传输失败
    Failed,
}

impl Outcome {
    /// 是否为有效的结果
    ///
    /// [`Outcome::Failed`] 与空的响应体都不是有效的结果
    #[inline]
    pub fn is_success(&self) -> bool {
        match self {
            Self::Content(content) => !content.is_empty(),
            Self::Done => true,
            Self::Failed => false,
        }
    }

    #[inline]
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            Self::Content(content) => Some(content),
            _ => None,
        }
    }

    #[inline]
    pub fn into_content(self) -> Option<Vec<u8>> {
        match self {
            Self::Content(content) => Some(content),
            _ => None,
        }
    }
}

/// 执行结果
///
/// 只执行一个会话时为 [`ExecOutput::Single`]，
/// 并发执行多个会话时为 [`ExecOutput::Batch`]，其中的结果与会话编号的顺序一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutput {
    Single(Outcome),
    Batch(Vec<Outcome>),
}

impl ExecOutput {
    #[inline]
    pub fn as_single(&self) -> Option<&Outcome> {
        match self {
            Self::Single(outcome) => Some(outcome),
            _ => None,
        }
    }

    #[inline]
    pub fn as_batch(&self) -> Option<&[Outcome]> {
        match self {
            Self::Batch(outcomes) => Some(outcomes),
            _ => None,
        }
    }

    #[inline]
    pub fn into_single(self) -> Option<Outcome> {
        match self {
            Self::Single(outcome) => Some(outcome),
            _ => None,
        }
    }

    #[inline]
    pub fn into_batch(self) -> Option<Vec<Outcome>> {
        match self {
            Self::Batch(outcomes) => Some(outcomes),
            _ => None,
        }
    }

    fn is_success(&self) -> bool {
        match self {
            Self::Single(outcome) => outcome.is_success(),
            Self::Batch(_) => true,
        }
    }
}

/// 选择执行策略并执行会话
pub(crate) struct ExecutionEngine<'r> {
    registry: &'r mut SessionRegistry,
    retry: usize,
    wait_timeout: Duration,
}

impl<'r> ExecutionEngine<'r> {
    #[inline]
    pub(crate) fn new(
        registry: &'r mut SessionRegistry,
        retry: usize,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            retry,
            wait_timeout,
        }
    }

    /// 指定会话编号或只有一个会话时串行执行，否则并发执行全部会话
    ///
    /// 串行执行的结果无效时返回 `None`
    pub(crate) fn exec(self, key: Option<SessionKey>) -> Result<Option<ExecOutput>> {
        let output = match (self.registry.len(), key) {
            (0, _) => {
                info!("No session to execute");
                None
            }
            (1, None) => {
                let key = self.registry.keys().next();
                key.and_then(|key| self.exec_single(key))
            }
            (_, Some(key)) => self.exec_single(key),
            (_, None) => Some(ExecOutput::Batch(multi::exec_batch(
                self.registry,
                self.retry,
                self.wait_timeout,
            )?)),
        };
        Ok(output.filter(ExecOutput::is_success))
    }

    fn exec_single(self, key: SessionKey) -> Option<ExecOutput> {
        let session = match self.registry.session_mut(key) {
            Some(session) => session,
            None => {
                warn!("Session {} is not found", key);
                return None;
            }
        };
        session.begin_exec();
        Some(ExecOutput::Single(single::exec_single(session, self.retry)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success() {
        assert!(Outcome::Content(b"hello".to_vec()).is_success());
        assert!(Outcome::Done.is_success());
        assert!(!Outcome::Content(Vec::new()).is_success());
        assert!(!Outcome::Failed.is_success());
        assert_eq!(
            Outcome::Content(b"hello".to_vec()).content(),
            Some(&b"hello"[..])
        );
        assert_eq!(Outcome::Done.into_content(), None);
    }

    #[test]
    fn test_batch_output_is_always_success() {
        assert!(ExecOutput::Batch(vec![Outcome::Failed, Outcome::Failed]).is_success());
        assert!(ExecOutput::Batch(Vec::new()).is_success());
        assert!(!ExecOutput::Single(Outcome::Failed).is_success());
        assert!(ExecOutput::Single(Outcome::Done).is_success());
    }

    #[test]
    fn test_exec_empty_registry() -> anyhow::Result<()> {
        let mut registry = SessionRegistry::default();
        let engine = ExecutionEngine::new(&mut registry, 3, Duration::from_secs(1));
        assert_eq!(engine.exec(None)?, None);
        Ok(())
    }

    #[test]
    fn test_exec_unknown_key() -> anyhow::Result<()> {
        let mut registry = SessionRegistry::default();
        assert!(registry.init(vec!["a", "b"], None));
        let engine = ExecutionEngine::new(&mut registry, 0, Duration::from_secs(1));
        assert_eq!(engine.exec(Some(SessionKey::new(9)))?, None);
        Ok(())
    }
}
