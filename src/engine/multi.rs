use super::{
    super::{
        session::{is_success_code, Context, SessionKey, SessionRegistry},
        Error, Result,
    },
    single::exec_single,
    Outcome,
};
use curl::{
    multi::{Easy2Handle, Multi},
    Error as CurlError, MultiError,
};
use log::{debug, info, warn};
use std::{collections::HashMap, result, time::Duration};

/// Curl Multi 的驱动接口
pub(crate) trait MultiDriver {
    /// 推进所有传输，返回仍在进行中的传输数量
    fn perform(&self) -> result::Result<u32, MultiError>;

    /// 阻塞等待任意传输可以继续推进，最多等待 `timeout`
    fn wait(&self, timeout: Duration) -> result::Result<u32, MultiError>;
}

impl MultiDriver for Multi {
    #[inline]
    fn perform(&self) -> result::Result<u32, MultiError> {
        Multi::perform(self)
    }

    #[inline]
    fn wait(&self, timeout: Duration) -> result::Result<u32, MultiError> {
        Multi::wait(self, &mut [], timeout)
    }
}

/// 驱动所有传输直到全部结束
///
/// 任何一次推进或等待出错都会立即返回该错误
pub(crate) fn drive<D: MultiDriver + ?Sized>(
    driver: &D,
    wait_timeout: Duration,
) -> result::Result<(), MultiError> {
    let mut running = advance(driver)?;
    while running > 0 {
        driver.wait(wait_timeout)?;
        running = advance(driver)?;
    }
    return Ok(());

    fn advance<D: MultiDriver + ?Sized>(driver: &D) -> result::Result<u32, MultiError> {
        loop {
            match driver.perform() {
                Err(err) if err.is_call_perform() => continue,
                result => return result,
            }
        }
    }
}

/// 并发执行全部会话，结果按会话编号排列
///
/// 状态码不在 `(0, 400)` 内的会话，在 `retry > 0` 时以 `retry - 1` 次重试串行补执行一次
#[inline]
pub(super) fn exec_batch(
    registry: &mut SessionRegistry,
    retry: usize,
    wait_timeout: Duration,
) -> Result<Vec<Outcome>> {
    exec_batch_with(registry, retry, wait_timeout, |multi, wait_timeout| {
        drive(multi, wait_timeout)
    })
}

fn exec_batch_with<F>(
    registry: &mut SessionRegistry,
    retry: usize,
    wait_timeout: Duration,
    drive_all: F,
) -> Result<Vec<Outcome>>
where
    F: FnOnce(&Multi, Duration) -> result::Result<(), MultiError>,
{
    let keys: Vec<SessionKey> = registry.keys().collect();
    info!("Begin to execute {} sessions concurrently", keys.len());

    let multi = Multi::new();
    let mut handles = Vec::with_capacity(keys.len());
    for &key in keys.iter() {
        if let Some(session) = registry.session_mut(key) {
            session.begin_exec();
            if let Some(easy) = session.lend() {
                match multi.add2(easy) {
                    Ok(handle) => handles.push((key, handle)),
                    Err(err) => {
                        warn!("Session {} failed to join the batch: {}", key, err);
                        session.lose_handle();
                    }
                }
            }
        }
    }
    for (token, (key, handle)) in handles.iter_mut().enumerate() {
        if let Err(err) = handle.set_token(token) {
            warn!("Session {} failed to set token {}: {}", key, token, err);
        }
    }

    let driven = drive_all(&multi, wait_timeout);
    let mut results = HashMap::with_capacity(handles.len());
    multi.messages(|message| {
        if let (Some(result), Ok(token)) = (message.result(), message.token()) {
            results.insert(token, result);
        }
    });
    detach(&multi, handles, registry, results);

    if let Err(err) = driven {
        warn!("Batch is abandoned: {}", err);
        return Err(Error::BatchExecution(err));
    }

    let outcomes = keys
        .into_iter()
        .map(|key| match registry.session_mut(key) {
            Some(session) if is_success_code(session.response_code()) => session.take_content(),
            Some(session) if retry > 0 => {
                debug!(
                    "Session {} failed in batch, response code: {}",
                    key,
                    session.response_code()
                );
                match exec_single(session, retry - 1) {
                    outcome if is_success_code(session.response_code()) => outcome,
                    _ => Outcome::Failed,
                }
            }
            _ => Outcome::Failed,
        })
        .collect();
    info!("Batch is finished");
    Ok(outcomes)
}

/// 将全部句柄从 Multi 中移除并归还给对应的会话
fn detach(
    multi: &Multi,
    handles: Vec<(SessionKey, Easy2Handle<Context>)>,
    registry: &mut SessionRegistry,
    mut results: HashMap<usize, result::Result<(), CurlError>>,
) {
    for (token, (key, handle)) in handles.into_iter().enumerate() {
        let removed = multi.remove2(handle);
        if let Some(session) = registry.session_mut(key) {
            match removed {
                Ok(easy) => session.restore(easy, results.remove(&token)),
                Err(err) => {
                    warn!("Session {} failed to leave the batch: {}", key, err);
                    session.lose_handle();
                }
            }
        }
    }
}
