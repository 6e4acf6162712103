//! IMAP over implicit TLS.

pub mod auth;
pub mod conn;

pub use auth::{ImapAuthenticator, PasswordLogin, XOAuth2Login, xoauth2_string};
pub use conn::ImapConnector;

use tokio::net::TcpStream;
use tokio_native_tls::TlsStream;
use tokio_util::compat::Compat;

/// Transport under the `async-imap` client.
pub type ImapStream = Compat<TlsStream<TcpStream>>;

pub type ImapClient = async_imap::Client<ImapStream>;
pub type ImapSession = async_imap::Session<ImapStream>;
