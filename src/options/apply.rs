use super::{
    super::session::Context,
    CurlOption, OptionSet, OptionValue,
};
use curl::{
    easy::{Easy2, List},
    Error as CurlError,
};
use std::{fmt, time::Duration};

/// 选项被拒绝的原因
#[derive(Debug)]
pub(crate) struct Rejection {
    option: CurlOption,
    reason: Reason,
}

#[derive(Debug)]
enum Reason {
    Mismatch(&'static str),
    OutOfRange(i64),
    Curl(CurlError),
    Detached,
}

impl Rejection {
    #[inline]
    pub(crate) fn detached(option: CurlOption) -> Self {
        Self {
            option,
            reason: Reason::Detached,
        }
    }

    #[inline]
    pub(crate) fn option(&self) -> CurlOption {
        self.option
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Reason::Mismatch(expected) => write!(f, "{} expects {}", self.option, expected),
            Reason::OutOfRange(value) => {
                write!(f, "{} value {} is out of range", self.option, value)
            }
            Reason::Curl(err) => write!(f, "{} is rejected by curl: {}", self.option, err),
            Reason::Detached => write!(f, "{} can't be set, session has no handle", self.option),
        }
    }
}

/// 按顺序设置选项，遇到第一个被拒绝的选项立即返回
pub(crate) fn apply_options(easy: &mut Easy2<Context>, options: &OptionSet) -> Result<(), Rejection> {
    options
        .iter()
        .try_for_each(|(option, value)| apply_option(easy, option, value))
}

pub(crate) fn apply_option(
    easy: &mut Easy2<Context>,
    option: CurlOption,
    value: &OptionValue,
) -> Result<(), Rejection> {
    let handle = |result: Result<(), CurlError>| {
        result.map_err(|err| Rejection {
            option,
            reason: Reason::Curl(err),
        })
    };
    let args = Args { option, value };

    match option {
        CurlOption::Url => handle(easy.url(args.text()?)),
        CurlOption::ReturnTransfer => {
            easy.get_mut().set_return_transfer(args.flag()?);
            Ok(())
        }
        CurlOption::FollowLocation => handle(easy.follow_location(args.flag()?)),
        CurlOption::MaxRedirections => handle(easy.max_redirections(args.unsigned()?)),
        CurlOption::AutoReferer => handle(easy.autoreferer(args.flag()?)),
        CurlOption::Timeout => handle(easy.timeout(args.seconds()?)),
        CurlOption::TimeoutMs => handle(easy.timeout(args.millis()?)),
        CurlOption::ConnectTimeout => handle(easy.connect_timeout(args.seconds()?)),
        CurlOption::ConnectTimeoutMs => handle(easy.connect_timeout(args.millis()?)),
        CurlOption::LowSpeedLimit => handle(easy.low_speed_limit(args.unsigned()?)),
        CurlOption::LowSpeedTime => handle(easy.low_speed_time(args.seconds()?)),
        CurlOption::UserAgent => handle(easy.useragent(args.text()?)),
        CurlOption::Referer => handle(easy.referer(args.text()?)),
        CurlOption::HttpHeaders => {
            let mut header_list = List::new();
            for line in args.list()? {
                handle(header_list.append(line))?;
            }
            handle(easy.http_headers(header_list))
        }
        CurlOption::HttpGet => handle(easy.get(args.flag()?)),
        CurlOption::Post => handle(easy.post(args.flag()?)),
        CurlOption::PostFields => handle(easy.post_fields_copy(args.text()?.as_bytes())),
        CurlOption::CustomRequest => handle(easy.custom_request(args.text()?)),
        CurlOption::NoBody => handle(easy.nobody(args.flag()?)),
        CurlOption::Header => handle(easy.show_header(args.flag()?)),
        CurlOption::FailOnError => handle(easy.fail_on_error(args.flag()?)),
        CurlOption::Cookie => handle(easy.cookie(args.text()?)),
        CurlOption::CookieFile => handle(easy.cookie_file(args.text()?)),
        CurlOption::CookieJar => handle(easy.cookie_jar(args.text()?)),
        CurlOption::AcceptEncoding => handle(easy.accept_encoding(args.text()?)),
        CurlOption::Range => handle(easy.range(args.text()?)),
        CurlOption::Proxy => handle(easy.proxy(args.text()?)),
        CurlOption::UserPwd => {
            let credential = args.text()?;
            let (username, password) = credential.split_once(':').unwrap_or((credential, ""));
            handle(easy.username(username))?;
            handle(easy.password(password))
        }
        CurlOption::Username => handle(easy.username(args.text()?)),
        CurlOption::Password => handle(easy.password(args.text()?)),
        CurlOption::SslVerifyPeer => handle(easy.ssl_verify_peer(args.flag()?)),
        CurlOption::SslVerifyHost => handle(easy.ssl_verify_host(args.flag()?)),
        CurlOption::Verbose => handle(easy.verbose(args.flag()?)),
    }
}

struct Args<'v> {
    option: CurlOption,
    value: &'v OptionValue,
}

impl<'v> Args<'v> {
    #[inline]
    fn mismatch(&self, expected: &'static str) -> Rejection {
        Rejection {
            option: self.option,
            reason: Reason::Mismatch(expected),
        }
    }

    fn flag(&self) -> Result<bool, Rejection> {
        self.value.as_bool().ok_or_else(|| self.mismatch("a boolean"))
    }

    fn unsigned(&self) -> Result<u32, Rejection> {
        let value = self
            .value
            .as_integer()
            .ok_or_else(|| self.mismatch("an integer"))?;
        u32::try_from(value).map_err(|_| Rejection {
            option: self.option,
            reason: Reason::OutOfRange(value),
        })
    }

    #[inline]
    fn seconds(&self) -> Result<Duration, Rejection> {
        self.unsigned().map(|secs| Duration::from_secs(secs.into()))
    }

    #[inline]
    fn millis(&self) -> Result<Duration, Rejection> {
        self.unsigned().map(|millis| Duration::from_millis(millis.into()))
    }

    fn text(&self) -> Result<&'v str, Rejection> {
        self.value.as_text().ok_or_else(|| self.mismatch("a string"))
    }

    fn list(&self) -> Result<&'v [String], Rejection> {
        self.value
            .as_list()
            .ok_or_else(|| self.mismatch("a list of strings"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_easy() -> Easy2<Context> {
        curl::init();
        Easy2::new(Context::default())
    }

    #[test]
    fn test_apply_typed_values() {
        let mut easy = new_easy();
        let options = OptionSet::new()
            .with(CurlOption::ReturnTransfer, 1)
            .with(CurlOption::Timeout, 30)
            .with(CurlOption::UserAgent, "test agent")
            .with(CurlOption::HttpHeaders, vec!["X-Test: 1"]);
        assert!(apply_options(&mut easy, &options).is_ok());
        assert!(easy.get_ref().return_transfer());
    }

    #[test]
    fn test_reject_mismatched_values() {
        let mut easy = new_easy();
        let rejection =
            apply_option(&mut easy, CurlOption::UserAgent, &OptionValue::Bool(true)).unwrap_err();
        assert_eq!(rejection.option(), CurlOption::UserAgent);
        assert!(rejection.to_string().contains("expects a string"));

        let rejection =
            apply_option(&mut easy, CurlOption::Timeout, &OptionValue::Integer(-1)).unwrap_err();
        assert!(rejection.to_string().contains("out of range"));
    }

    #[test]
    fn test_bulk_apply_stops_at_first_rejection() {
        let mut easy = new_easy();
        let options = OptionSet::new()
            .with(CurlOption::FollowLocation, true)
            .with(CurlOption::MaxRedirections, "three")
            .with(CurlOption::ReturnTransfer, true);
        let rejection = apply_options(&mut easy, &options).unwrap_err();
        assert_eq!(rejection.option(), CurlOption::MaxRedirections);
        assert!(!easy.get_ref().return_transfer());
    }
}
