use std::str::from_utf8;

#[inline]
pub(crate) fn is_status_line(line: &[u8]) -> bool {
    line.starts_with(b"HTTP/")
}

#[inline]
pub(crate) fn is_ended_line(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

#[inline]
pub(crate) fn parse_header_line(line: &[u8]) -> Option<(String, String)> {
    let line = from_utf8(line).ok()?;
    let (name, value) = line.trim().split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_owned(), value.trim().to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        assert!(is_status_line(b"HTTP/1.1 404 Not Found\r\n"));
        assert!(!is_status_line(b"Content-Type: text/plain\r\n"));
    }

    #[test]
    fn test_header_line() {
        assert!(is_ended_line(b"\r\n"));
        assert_eq!(
            parse_header_line(b"Content-Type:  text/plain \r\n"),
            Some(("Content-Type".to_owned(), "text/plain".to_owned()))
        );
        assert_eq!(
            parse_header_line(b"Location: http://example.org:8080/\r\n"),
            Some(("Location".to_owned(), "http://example.org:8080/".to_owned()))
        );
        assert_eq!(parse_header_line(b"garbage\r\n"), None);
        assert_eq!(parse_header_line(b": empty\r\n"), None);
    }
}
