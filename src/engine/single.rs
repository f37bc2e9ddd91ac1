use super::{
    super::session::{is_success_code, Session},
    Outcome,
};
use log::debug;

/// 串行执行单个会话
///
/// 响应状态码不在 `(0, 400)` 内时重试，最多共执行 `retry + 1` 次，返回最后一次执行的结果
pub(super) fn exec_single(session: &mut Session, retry: usize) -> Outcome {
    let mut outcome = session.perform();
    for retried in 1..=retry {
        if is_success_code(session.response_code()) {
            break;
        }
        debug!(
            "Session {} will retry ({}/{}), response code: {}",
            session.key(),
            retried,
            retry,
            session.response_code()
        );
        outcome = session.perform();
    }
    outcome
}
