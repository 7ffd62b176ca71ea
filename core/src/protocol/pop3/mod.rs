/*
 * mod.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Mailfetch, a POP3 mail retrieval engine.
 *
 * Mailfetch is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Mailfetch is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Mailfetch.  If not, see <http://www.gnu.org/licenses/>.
 */

//! POP3 retrieval: connect, authenticate with USER/PASS, fetch every listed
//! message, hand each to the caller and delete the accepted ones.

mod client;
mod line_reader;

pub use client::{
    check_credentials, parse_list, Command, ConnectionState, PendingMessage, Pop3ClientError,
    Pop3Session, Pop3Stream, SessionMachine,
};
pub use line_reader::{read_line, Answer, AnswerReader, ERR, OK};

use std::future::Future;
use std::time::Duration;

use log::{info, warn};

use crate::config::{parse_server, SessionConfig};
use crate::message::ParsedMessage;

/// Retrieve all messages from a POP3 mailbox.
///
/// `server` is `host` or `host:port` (port 110 when absent). Messages whose
/// LIST size exceeds `message_size_limit` are fetched headers-only and carry
/// a size-limit `parse_error`. `on_message` runs once per message; returning
/// true deletes that message from the server.
///
/// Returns the number of messages delivered to `on_message`. A fatal error
/// ends the session; messages already delivered stay delivered.
pub async fn download_messages<F>(
    server: &str,
    use_tls: bool,
    user: &str,
    password: &str,
    message_size_limit: u64,
    on_message: F,
) -> Result<usize, Pop3ClientError>
where
    F: FnMut(ParsedMessage) -> bool,
{
    let config = SessionConfig::new(server, use_tls, user, password, message_size_limit);
    download_with_config(&config, on_message).await
}

/// As [`download_messages`], with the session parameters (including the
/// per-answer timeout) taken from `config`.
pub async fn download_with_config<F>(config: &SessionConfig, on_message: F) -> Result<usize, Pop3ClientError>
where
    F: FnMut(ParsedMessage) -> bool,
{
    let result = run_session(config, on_message).await;
    match &result {
        Ok(delivered) => info!("POP3 session with {} done, {} messages delivered", config.server, delivered),
        Err(e) => warn!("POP3 session with {} failed: {}", config.server, e),
    }
    result
}

async fn run_session<F>(config: &SessionConfig, on_message: F) -> Result<usize, Pop3ClientError>
where
    F: FnMut(ParsedMessage) -> bool,
{
    let (host, port) =
        parse_server(&config.server).ok_or_else(|| Pop3ClientError::InvalidServer(config.server.clone()))?;
    check_credentials(&config.user, &config.password)?;
    let stream = with_timeout(
        config.command_timeout,
        Pop3Stream::connect(&host, port, config.use_tls),
    )
    .await?;
    info!(
        "connected to {}:{}{}",
        host,
        port,
        if config.use_tls { " (TLS)" } else { "" }
    );
    let machine = SessionMachine::new(
        config.user.as_str(),
        config.password.as_str(),
        config.message_size_limit,
    );
    Pop3Session::new(stream, machine, config.command_timeout)
        .run(on_message)
        .await
}

async fn with_timeout<T, Fut>(limit: Option<Duration>, fut: Fut) -> Result<T, Pop3ClientError>
where
    Fut: Future<Output = Result<T, Pop3ClientError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Pop3ClientError::Timeout(limit))?,
        None => fut.await,
    }
}
