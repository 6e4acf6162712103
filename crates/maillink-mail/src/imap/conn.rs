//! Connector and session.

use std::sync::Arc;
use std::time::Duration;

use async_imap::types::Fetch;
use async_trait::async_trait;
use futures::TryStreamExt;
use maillink_types::MailboxConfig;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_native_tls::native_tls;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, info, warn};

use super::auth::ImapAuthenticator;
use super::ImapSession;
use crate::criteria::SelectionCriteria;
use crate::mailbox::{Access, Mailbox, MailboxConnector};
use crate::message::RawMessage;
use crate::MailError;

/// Bound on connect + TLS + login + folder selection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on each command once the session is open.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// `BODY.PEEK[]` returns the full message without setting `\Seen`.
const FETCH_QUERY: &str = "(UID BODY.PEEK[])";

/// Opens TLS sessions on the configured server and folder.
pub struct ImapConnector {
    config: MailboxConfig,
    auth: Arc<dyn ImapAuthenticator>,
}

impl ImapConnector {
    pub fn new(config: MailboxConfig, auth: Arc<dyn ImapAuthenticator>) -> Self {
        Self { config, auth }
    }

    async fn connect(&self, access: Access) -> Result<ImapSession, MailError> {
        let host = self.config.host.as_str();

        let tcp = TcpStream::connect((host, self.config.port))
            .await
            .map_err(|e| MailError::Connect(format!("{host}:{}: {e}", self.config.port)))?;

        let tls = native_tls::TlsConnector::builder()
            .build()
            .map_err(|e| MailError::Tls(e.to_string()))?;
        let tls_stream = tokio_native_tls::TlsConnector::from(tls)
            .connect(host, tcp)
            .await
            .map_err(|e| MailError::Tls(e.to_string()))?;

        let client = async_imap::Client::new(tls_stream.compat());
        let mut session = self.auth.login(client, &self.config.user).await?;

        let folder = self.config.folder.as_str();
        let selected = match access {
            Access::ReadOnly => session.examine(folder).await,
            Access::ReadWrite => session.select(folder).await,
        };
        if let Err(e) = selected {
            let _ = session.logout().await;
            return Err(MailError::Select {
                folder: folder.to_string(),
                reason: e.to_string(),
            });
        }

        info!(
            host = %host,
            folder = %folder,
            method = self.auth.method(),
            read_only = access == Access::ReadOnly,
            "mailbox opened"
        );
        Ok(session)
    }
}

#[async_trait]
impl MailboxConnector for ImapConnector {
    async fn open(&self, access: Access) -> Result<Box<dyn Mailbox>, MailError> {
        let session = timeout(CONNECT_TIMEOUT, self.connect(access))
            .await
            .map_err(|_| MailError::Timeout("connect"))??;
        Ok(Box::new(ImapMailbox { session }))
    }
}

/// A selected folder on a live session.
pub struct ImapMailbox {
    session: ImapSession,
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn search(&mut self, criteria: &SelectionCriteria) -> Result<Vec<u32>, MailError> {
        let query = criteria.to_imap_query();
        let found = timeout(COMMAND_TIMEOUT, self.session.uid_search(&query))
            .await
            .map_err(|_| MailError::Timeout("search"))?
            .map_err(|e| MailError::Search(e.to_string()))?;

        let mut uids: Vec<u32> = found.into_iter().collect();
        uids.sort_unstable();
        debug!(query = %query, count = uids.len(), "search done");
        Ok(uids)
    }

    async fn fetch(&mut self, uid: u32) -> Result<Option<RawMessage>, MailError> {
        let fetches = timeout(COMMAND_TIMEOUT, fetch_all(&mut self.session, uid))
            .await
            .map_err(|_| MailError::Timeout("fetch"))?
            .map_err(|e| MailError::Fetch(e.to_string()))?;

        Ok(fetches
            .iter()
            .find_map(|f| f.body().map(|body| RawMessage::new(uid, body))))
    }

    async fn mark_read(&mut self, uid: u32) -> Result<(), MailError> {
        timeout(COMMAND_TIMEOUT, store_seen(&mut self.session, uid))
            .await
            .map_err(|_| MailError::Timeout("store"))?
            .map_err(|e| MailError::Store(e.to_string()))?;

        debug!(uid, "marked read");
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), MailError> {
        match timeout(COMMAND_TIMEOUT, self.session.logout()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(error = %e, "logout failed");
                Err(MailError::Connect(e.to_string()))
            }
            Err(_) => Err(MailError::Timeout("logout")),
        }
    }
}

async fn fetch_all(session: &mut ImapSession, uid: u32) -> async_imap::error::Result<Vec<Fetch>> {
    let stream = session.uid_fetch(uid.to_string(), FETCH_QUERY).await?;
    stream.try_collect().await
}

async fn store_seen(session: &mut ImapSession, uid: u32) -> async_imap::error::Result<()> {
    let stream = session.uid_store(uid.to_string(), "+FLAGS (\\Seen)").await?;
    let _updated: Vec<Fetch> = stream.try_collect().await?;
    Ok(())
}
