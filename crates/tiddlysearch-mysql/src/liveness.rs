//! Connection Liveness Hook (§4.5): on each pool checkout, ping the server
//! and translate a known-transient error code into a signal the pool can
//! retry against a fresh connection, instead of handing a dead connection
//! to a caller.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// MySQL error codes that mean "the connection died quietly" rather than
/// "the query was wrong" — a stale TCP connection, a wait_timeout
/// disconnect, or the server going away mid-ping. Any other error from a
/// ping propagates unchanged, since it likely means something the caller
/// needs to see.
pub const TRANSIENT_ERROR_CODES: &[u16] = &[2006, 2013, 2014, 2045, 2055];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LivenessError {
    /// The ping failed with a recognized transient code; the pool should
    /// discard this connection and retry with a new one.
    #[error("connection is stale (MySQL error {0}), discard and retry")]
    Stale(u16),
    /// The ping failed with anything else; not ours to handle.
    #[error("ping failed: {0}")]
    Other(String),
}

/// The minimal connection surface the liveness hook needs. Abstracted so
/// the hook can be exercised against a scripted fake instead of a real
/// socket; `MysqlConnection` below is the adapter over `mysql_async`.
#[async_trait]
pub trait PingableConnection: Send {
    async fn ping(&mut self) -> Result<(), PingFailure>;
}

/// A ping's raw failure, before [`PoolEventHandler`] decides whether it's
/// transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingFailure {
    pub code: Option<u16>,
    pub message: String,
}

#[async_trait]
pub trait PoolEventHandler: Send + Sync {
    /// Called by the pool immediately after handing out a connection.
    /// `Ok(())` means the connection is good to use as-is.
    async fn on_checkout(
        &self,
        conn: &mut dyn PingableConnection,
    ) -> Result<(), LivenessError>;
}

/// The production hook: ping, and classify failures against
/// [`TRANSIENT_ERROR_CODES`].
#[derive(Debug, Default)]
pub struct MysqlLivenessHook;

#[async_trait]
impl PoolEventHandler for MysqlLivenessHook {
    async fn on_checkout(
        &self,
        conn: &mut dyn PingableConnection,
    ) -> Result<(), LivenessError> {
        match conn.ping().await {
            Ok(()) => Ok(()),
            Err(failure) => match failure.code {
                Some(code) if TRANSIENT_ERROR_CODES.contains(&code) => {
                    debug!(code, message = %failure.message, "checkout ping found a stale connection");
                    Err(LivenessError::Stale(code))
                }
                _ => Err(LivenessError::Other(failure.message)),
            },
        }
    }
}

/// Adapts a live `mysql_async` connection to [`PingableConnection`].
pub struct MysqlConnection<'a>(pub &'a mut mysql_async::Conn);

#[async_trait]
impl<'a> PingableConnection for MysqlConnection<'a> {
    async fn ping(&mut self) -> Result<(), PingFailure> {
        use mysql_async::prelude::Queryable;
        self.0.ping().await.map_err(|err| match &err {
            mysql_async::Error::Server(server_err) => PingFailure {
                code: Some(server_err.code),
                message: server_err.message.clone(),
            },
            other => PingFailure {
                code: None,
                message: other.to_string(),
            },
        })
    }
}
