// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::Arc;
use std::time::Instant;

use evlog_engine::{AppendError, Appender, DrainStatus, DrainTrigger, TriggerSource};
use thiserror::Error;
use tokio::net::UnixStream;
use tokio::sync::{watch, Notify};
use tracing::{debug, error, warn};

use crate::protocol::{self, ProtocolError, Request, Response, DEFAULT_TIMEOUT};

/// Everything a connection task needs; cheap to clone per connection
#[derive(Clone)]
pub struct ServerContext {
    pub appender: Appender,
    pub trigger: DrainTrigger,
    pub status: watch::Receiver<DrainStatus>,
    pub start_time: Instant,
    /// Notified when a client asks the daemon to stop
    pub shutdown: Arc<Notify>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

/// Handle a single client connection
pub async fn handle_connection(ctx: &ServerContext, stream: UnixStream) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    let response = handle_request(ctx, request).await;
    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Handle a single request and return a response
pub async fn handle_request(ctx: &ServerContext, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Append { events } => {
            debug!(records = events.len(), "append request");
            match ctx.appender.append(events).await {
                Ok(receipt) => Response::Appended {
                    count: receipt.records,
                },
                Err(e @ AppendError::MissingEventId { .. }) => {
                    warn!(error = %e, "rejected append");
                    Response::Error {
                        message: e.to_string(),
                    }
                }
                Err(e) => {
                    error!(error = %e, "append failed");
                    Response::Error {
                        message: e.to_string(),
                    }
                }
            }
        }

        Request::Drain => {
            if ctx.trigger.request(TriggerSource::Explicit) {
                Response::DrainRequested
            } else {
                warn!("drain requested but the worker is not running");
                Response::Error {
                    message: "drain worker is not running".to_string(),
                }
            }
        }

        Request::Status => {
            let status = ctx.status.borrow().clone();
            Response::Status {
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                passes: status.passes,
                draining: status.draining,
                last_error: status.last_error,
            }
        }

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
