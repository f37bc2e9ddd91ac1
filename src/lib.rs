#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(unsafe_code)]

//! 基于 Curl 的 HTTP 会话队列
//!
//! 每个会话独占一个 Curl 句柄。指定会话编号或只有一个会话时串行执行，
//! 否则通过 Curl Multi 在当前线程内并发执行全部会话，
//! 状态码为 0 或不小于 400 的会话按照配置的重试次数重试。

mod client;
mod config;
mod diagnostics;
mod engine;
mod error;
mod options;
mod session;
mod utils;

pub use client::CurlSessions;
pub use config::{Config, ConfigBuilder};
pub use diagnostics::{Info, InfoKind, InfoValue, TransferError, TransferInfo};
pub use engine::{ExecOutput, Outcome};
pub use error::{Error, Result};
pub use options::{
    CurlOption, OptionSet, OptionValue, RawOptionKey, RawOptions, RETURN_TRANSFER_ID,
};
pub use session::{Session, SessionKey, SessionRegistry, TransferStatus, UrlArgument};
