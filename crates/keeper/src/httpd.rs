// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only HTTP status server.
//!
//! A deliberately small HTTP/1.1 surface over a TCP listener: GET only, a
//! static route table, connection closed after one response. Handlers parse
//! the config and state files fresh on every request; staleness is bounded
//! by the reconcile tick interval, so there is nothing to cache.
//!
//! The route table is always scanned to the end before a 404 is produced,
//! and a row without a handler never short-circuits the scan.

use crate::config::{KeeperConfig, NodeKind};
use crate::version;
use pgk_core::KeeperError;
use pgk_storage::StateStore;
use serde_json::json;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// Everything a handler may read. Paths only; the files are re-parsed per
/// request.
#[derive(Debug, Clone)]
pub struct RequestCtx {
    pub config_path: PathBuf,
    pub state_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    fn status_line(&self) -> &'static str {
        match self.status {
            200 => "200 OK",
            400 => "400 Bad Request",
            404 => "404 Not Found",
            405 => "405 Method Not Allowed",
            503 => "503 Service Unavailable",
            _ => "500 Internal Server Error",
        }
    }
}

pub type Handler = fn(&RequestCtx) -> Response;

/// One row of the routing table.
pub struct Route {
    pub path: &'static str,
    pub handler: Option<Handler>,
}

pub fn routes() -> Vec<Route> {
    vec![
        Route {
            path: "/",
            handler: Some(root),
        },
        Route {
            path: "/versions",
            handler: Some(versions),
        },
        Route {
            path: "/1.0/state",
            handler: Some(liveness),
        },
        Route {
            path: "/1.0/fsm/state",
            handler: Some(fsm_state),
        },
    ]
}

/// Find a handler for the path. The whole table is considered; only after
/// every row was scanned does a miss become a 404.
pub fn dispatch(table: &[Route], path: &str, ctx: &RequestCtx) -> Response {
    let mut matched: Option<Handler> = None;
    for route in table {
        if route.path == path {
            if let Some(handler) = route.handler {
                matched = Some(handler);
            }
        }
    }
    match matched {
        Some(handler) => handler(ctx),
        None => Response::text(404, "Not Found\n"),
    }
}

fn root(_ctx: &RequestCtx) -> Response {
    Response::text(200, "Hello, world!\n")
}

fn versions(_ctx: &RequestCtx) -> Response {
    Response::text(
        200,
        format!(
            "{}\n{}\n{}\n",
            version::CLI_VERSION,
            version::EXTENSION_VERSION,
            version::API_VERSION
        ),
    )
}

fn liveness(_ctx: &RequestCtx) -> Response {
    Response::text(200, "Ok\n")
}

/// Snapshot of the keeper FSM, parsed fresh from disk.
fn fsm_state(ctx: &RequestCtx) -> Response {
    let config = match KeeperConfig::load(&ctx.config_path) {
        Ok(config) => config,
        Err(e) => return Response::json(500, json!({ "error": e.to_string() })),
    };
    if config.pg_autoctl.role == NodeKind::Monitor {
        return Response::json(503, json!({ "error": "monitor nodes run no keeper fsm" }));
    }

    let state = match StateStore::new(&ctx.state_path).read() {
        Ok(state) => state,
        Err(e) => return Response::json(500, json!({ "error": e.to_string() })),
    };

    Response::json(
        200,
        json!({
            "postgres": {
                "pgdata": config.postgresql.pgdata,
                "pgport": config.postgresql.pgport,
                "pg_is_running": state.pg_is_running,
                "xlog_lag_bytes": state.xlog_lag_bytes,
                "sync_state": state.sync_state,
            },
            "fsm": {
                "current_role": state.current_role,
                "assigned_role": state.assigned_role,
            },
            "monitor": {
                "current_node_id": state.current_node_id,
                "current_group": state.current_group,
            },
        }),
    )
}

/// Bind and serve forever. Only returns on a listener error.
pub async fn serve(listen_address: &str, port: u16, ctx: RequestCtx) -> Result<(), KeeperError> {
    let listener = TcpListener::bind((listen_address, port))
        .await
        .map_err(|e| {
            KeeperError::InternalError(format!("httpd bind {listen_address}:{port}: {e}"))
        })?;
    serve_on(listener, ctx).await
}

/// Serve on an already-bound listener (tests bind to port 0 themselves).
pub async fn serve_on(listener: TcpListener, ctx: RequestCtx) -> Result<(), KeeperError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "status server listening");
    }
    loop {
        let (stream, _peer) = listener
            .accept()
            .await
            .map_err(|e| KeeperError::InternalError(format!("httpd accept: {e}")))?;
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &ctx).await {
                debug!(error = %e, "status request failed");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, ctx: &RequestCtx) -> std::io::Result<()> {
    let mut buf = vec![0u8; 4096];
    let mut filled = 0;
    loop {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
        if buf[..filled].windows(4).any(|w| w == b"\r\n\r\n") || filled == buf.len() {
            break;
        }
    }

    let request = String::from_utf8_lossy(&buf[..filled]).to_string();
    let response = match parse_request_line(&request) {
        Some(("GET", path)) => dispatch(&routes(), path, ctx),
        Some((_, _)) => Response::text(405, "Method Not Allowed\n"),
        None => Response::text(400, "Bad Request\n"),
    };
    write_response(&mut stream, &response).await
}

/// Split `GET /path HTTP/1.1` into method and path.
fn parse_request_line(request: &str) -> Option<(&str, &str)> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    Some((method, path))
}

async fn write_response(stream: &mut TcpStream, response: &Response) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status_line(),
        response.content_type,
        response.body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(response.body.as_bytes()).await?;
    stream.flush().await
}

#[cfg(test)]
#[path = "httpd_tests.rs"]
mod tests;
