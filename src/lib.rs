//! A synchronous client for the MikroTik RouterOS API.
//!
//! Speaks the sentence/word protocol exposed on port 8728 (plaintext)
//! and 8729 (TLS): length-prefixed words grouped into sentences, one
//! request sentence per reply. Both login flavours are supported, the
//! plain one of RouterOS 6.43+ and the older MD5 challenge/response.
//!
//! ```no_run
//! use routeros::{Client, Config};
//!
//! # fn main() -> routeros::Result<()> {
//! let config = Config::builder()
//!     .host("192.168.88.1")
//!     .user("admin")
//!     .pass("secret")
//!     .build()?;
//!
//! let mut client = Client::connect(config)?;
//! let reply = client.command("/interface/print", &[])?;
//! for row in &reply.rows {
//!     println!("{:?}", row.get("name"));
//! }
//! # Ok(()) }
//! ```
//!
//! # TLS
//!
//! With `ssl` enabled the connection is wrapped by `native-tls`, and
//! unlike most RouterOS clients certificate and hostname verification
//! are **on by default**. Routers commonly ship self-signed
//! certificates; talking to one requires opting out explicitly via
//! [`ConfigBuilder::accept_invalid_certs`] (and possibly
//! [`ConfigBuilder::accept_invalid_hostnames`]), which gives up
//! man-in-the-middle protection.

mod client;
mod config;
mod error;
mod protocol;

pub use client::{Client, ConnectionState, Transport};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use protocol::{ParsedReply, Terminator, MAX_WORD_LEN};
