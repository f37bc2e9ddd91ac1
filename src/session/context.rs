use super::super::utils::header;
use curl::easy::{Handler, WriteError};
use std::mem::take;

/// 单个会话的传输上下文，收集响应体与响应头
#[derive(Debug, Default)]
pub(crate) struct Context {
    return_transfer: bool,
    body: Vec<u8>,
    headers: Vec<(String, String)>,
}

impl Context {
    #[inline]
    pub(crate) fn return_transfer(&self) -> bool {
        self.return_transfer
    }

    #[inline]
    pub(crate) fn set_return_transfer(&mut self, return_transfer: bool) {
        self.return_transfer = return_transfer;
    }

    #[inline]
    pub(crate) fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[inline]
    pub(crate) fn take_body(&mut self) -> Vec<u8> {
        take(&mut self.body)
    }

    /// 每次传输开始前调用，清空上次传输留下的数据
    pub(crate) fn reset(&mut self) {
        self.body.clear();
        self.headers.clear();
    }
}

impl Handler for Context {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.return_transfer {
            self.body.extend_from_slice(data);
        }
        Ok(data.len())
    }

    fn header(&mut self, line: &[u8]) -> bool {
        if header::is_ended_line(line) {
            true
        } else if header::is_status_line(line) {
            // 重定向或 100 Continue 之后只保留最终响应的头
            self.headers.clear();
            true
        } else {
            if let Some(header) = header::parse_header_line(line) {
                self.headers.push(header);
            }
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_body_only_in_return_transfer_mode() {
        let mut context = Context::default();
        assert_eq!(context.write(b"discarded").ok(), Some(9));
        assert!(context.take_body().is_empty());

        context.set_return_transfer(true);
        assert_eq!(context.write(b"hello ").ok(), Some(6));
        assert_eq!(context.write(b"world").ok(), Some(5));
        assert_eq!(context.take_body(), b"hello world");
        assert!(context.take_body().is_empty());
    }

    #[test]
    fn test_keeps_final_response_headers() {
        let mut context = Context::default();
        assert!(context.header(b"HTTP/1.1 301 Moved Permanently\r\n"));
        assert!(context.header(b"Location: /next\r\n"));
        assert!(context.header(b"\r\n"));
        assert!(context.header(b"HTTP/1.1 200 OK\r\n"));
        assert!(context.header(b"Content-Type: text/plain\r\n"));
        assert!(context.header(b"\r\n"));
        assert_eq!(
            context.headers(),
            &[("Content-Type".to_owned(), "text/plain".to_owned())]
        );

        context.reset();
        assert!(context.headers().is_empty());
    }
}
