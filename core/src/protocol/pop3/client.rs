/*
 * client.rs
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

//! POP3 protocol client: the retrieval state machine (USER, PASS, LIST,
//! RETR/HEAD, DELE, QUIT) and the async driver that feeds it server answers.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::time::Duration;

use log::{debug, info};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::line_reader::{Answer, AnswerReader};
use crate::buffer::ByteBuffer;
use crate::message::ParsedMessage;
use crate::mime::MimeError;
use crate::net::{PlainStream, TlsStreamWrapper};

/// Most bytes taken from the socket per read.
const READ_CHUNK: usize = 8192;

/// Body lines requested with HEAD for messages over the size limit.
const OVERSIZE_BODY_LINES: u32 = 2;

/// Fatal session error. The session is over when one of these is returned.
#[derive(Debug, Error)]
pub enum Pop3ClientError {
    #[error("network error: {0}")]
    Io(#[from] io::Error),
    #[error("TLS handshake failed: {0}")]
    Tls(io::Error),
    #[error("invalid server address {0:?}")]
    InvalidServer(String),
    #[error("server refused: {0}")]
    Negative(String),
    #[error("malformed server answer: {0:?}")]
    Malformed(String),
    #[error("{0} must not contain CR, LF or NUL")]
    InvalidCredentials(&'static str),
    #[error("no answer from server within {0:?}")]
    Timeout(Duration),
    #[error("connection closed by server")]
    Closed,
}

/// Stream for POP3: plain TCP or TLS.
pub enum Pop3Stream {
    Plain(PlainStream),
    Tls(TlsStreamWrapper),
}

impl Pop3Stream {
    /// Connect, and with `use_tls` complete the TLS handshake against `host`
    /// before any protocol bytes are exchanged.
    pub async fn connect(host: &str, port: u16, use_tls: bool) -> Result<Self, Pop3ClientError> {
        let plain = PlainStream::connect(host, port).await?;
        if use_tls {
            let tls = plain.upgrade_to_tls(host).await.map_err(Pop3ClientError::Tls)?;
            Ok(Pop3Stream::Tls(tls))
        } else {
            Ok(Pop3Stream::Plain(plain))
        }
    }
}

impl AsyncRead for Pop3Stream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        match self.get_mut() {
            Pop3Stream::Plain(s) => std::pin::Pin::new(s).poll_read(cx, buf),
            Pop3Stream::Tls(s) => std::pin::Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Pop3Stream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<io::Result<usize>> {
        match self.get_mut() {
            Pop3Stream::Plain(s) => std::pin::Pin::new(s).poll_write(cx, buf),
            Pop3Stream::Tls(s) => std::pin::Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        match self.get_mut() {
            Pop3Stream::Plain(s) => std::pin::Pin::new(s).poll_flush(cx),
            Pop3Stream::Tls(s) => std::pin::Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        match self.get_mut() {
            Pop3Stream::Plain(s) => std::pin::Pin::new(s).poll_shutdown(cx),
            Pop3Stream::Tls(s) => std::pin::Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Commands the engine issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    User(String),
    Pass(String),
    List,
    Retr(u32),
    /// Headers plus the given number of body lines.
    Head(u32, u32),
    Dele(u32),
    Quit,
}

impl Command {
    pub fn expects_multiline(&self) -> bool {
        matches!(self, Command::List | Command::Retr(_) | Command::Head(..))
    }

    /// Wire form, without the CRLF.
    pub fn to_wire(&self) -> String {
        match self {
            Command::Pass(password) => format!("PASS {}", password),
            other => other.to_string(),
        }
    }
}

/// Log-safe rendering: the password is masked.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::User(user) => write!(f, "USER {}", user),
            Command::Pass(_) => write!(f, "PASS ****"),
            Command::List => write!(f, "LIST"),
            Command::Retr(n) => write!(f, "RETR {}", n),
            Command::Head(n, lines) => write!(f, "HEAD {} {}", n, lines),
            Command::Dele(n) => write!(f, "DELE {}", n),
            Command::Quit => write!(f, "QUIT"),
        }
    }
}

/// Reject a user name or password that would break the command line it is sent on.
pub fn check_credentials(user: &str, password: &str) -> Result<(), Pop3ClientError> {
    let unsafe_char = |c: char| matches!(c, '\r' | '\n' | '\0');
    if user.contains(unsafe_char) {
        return Err(Pop3ClientError::InvalidCredentials("user"));
    }
    if password.contains(unsafe_char) {
        return Err(Pop3ClientError::InvalidCredentials("password"));
    }
    Ok(())
}

/// Where the session is; advanced only by a complete server answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingHandshake,
    AwaitingUserAck,
    AwaitingPasswordAck,
    AwaitingMessageList,
    AwaitingMessageBody,
    AwaitingDeleteAck,
    AwaitingQuitAck,
    Closed,
}

/// LIST entry: message number and size in octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMessage {
    pub server_index: u32,
    pub declared_size: u64,
}

/// Parse the body of a LIST answer. Any line that is not `index size` is fatal.
pub fn parse_list(lines: &[String]) -> Result<VecDeque<PendingMessage>, Pop3ClientError> {
    let mut pending = VecDeque::with_capacity(lines.len());
    for line in lines {
        let mut fields = line.split_whitespace();
        let (Some(index), Some(size), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(Pop3ClientError::Malformed(line.clone()));
        };
        match (index.parse(), size.parse()) {
            (Ok(server_index), Ok(declared_size)) => pending.push_back(PendingMessage {
                server_index,
                declared_size,
            }),
            _ => return Err(Pop3ClientError::Malformed(line.clone())),
        }
    }
    Ok(pending)
}

/// The POP3 retrieval state machine, free of I/O: feed it each complete
/// answer, send the command it returns, stop when it returns None.
#[derive(Debug)]
pub struct SessionMachine {
    state: ConnectionState,
    user: String,
    password: String,
    message_size_limit: u64,
    pending: VecDeque<PendingMessage>,
    current: Option<PendingMessage>,
    delivered: usize,
}

impl SessionMachine {
    pub fn new(user: impl Into<String>, password: impl Into<String>, message_size_limit: u64) -> Self {
        Self {
            state: ConnectionState::AwaitingHandshake,
            user: user.into(),
            password: password.into(),
            message_size_limit,
            pending: VecDeque::new(),
            current: None,
            delivered: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Messages handed to the callback so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Messages listed but not yet retrieved.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Consume one answer. `on_message` runs synchronously for each retrieved
    /// message; returning true deletes it from the server.
    pub fn advance<F>(&mut self, answer: Answer, on_message: &mut F) -> Result<Option<Command>, Pop3ClientError>
    where
        F: FnMut(ParsedMessage) -> bool,
    {
        if answer.is_negative() {
            return Err(Pop3ClientError::Negative(answer.status));
        }
        if !answer.is_positive() {
            return Err(Pop3ClientError::Malformed(answer.status));
        }
        let command = match self.state {
            ConnectionState::AwaitingHandshake => {
                check_credentials(&self.user, &self.password)?;
                self.state = ConnectionState::AwaitingUserAck;
                Some(Command::User(self.user.clone()))
            }
            ConnectionState::AwaitingUserAck => {
                self.state = ConnectionState::AwaitingPasswordAck;
                Some(Command::Pass(self.password.clone()))
            }
            ConnectionState::AwaitingPasswordAck => {
                self.state = ConnectionState::AwaitingMessageList;
                Some(Command::List)
            }
            ConnectionState::AwaitingMessageList => {
                self.pending = parse_list(&answer.lines)?;
                info!("{} messages waiting", self.pending.len());
                Some(self.next_pending())
            }
            ConnectionState::AwaitingMessageBody => {
                let Some(current) = self.current.take() else {
                    return Err(Pop3ClientError::Malformed(answer.status));
                };
                let message = if current.declared_size > self.message_size_limit {
                    ParsedMessage::parse_headers_only(
                        &answer.lines,
                        MimeError::SizeLimit {
                            size: current.declared_size,
                            limit: self.message_size_limit,
                        },
                    )
                } else {
                    ParsedMessage::parse(&answer.lines)
                };
                self.delivered += 1;
                if on_message(message) {
                    self.state = ConnectionState::AwaitingDeleteAck;
                    Some(Command::Dele(current.server_index))
                } else {
                    debug!("message {} kept on server", current.server_index);
                    Some(self.next_pending())
                }
            }
            ConnectionState::AwaitingDeleteAck => Some(self.next_pending()),
            ConnectionState::AwaitingQuitAck => {
                self.state = ConnectionState::Closed;
                None
            }
            ConnectionState::Closed => None,
        };
        Ok(command)
    }

    /// Request the next listed message, or QUIT when none are left.
    fn next_pending(&mut self) -> Command {
        match self.pending.pop_front() {
            Some(next) => {
                self.state = ConnectionState::AwaitingMessageBody;
                self.current = Some(next);
                if next.declared_size > self.message_size_limit {
                    Command::Head(next.server_index, OVERSIZE_BODY_LINES)
                } else {
                    Command::Retr(next.server_index)
                }
            }
            None => {
                self.state = ConnectionState::AwaitingQuitAck;
                Command::Quit
            }
        }
    }
}

/// One POP3 session over a connected stream: owns the buffer and the
/// state machine for the duration of a single `run`.
pub struct Pop3Session<S> {
    stream: S,
    buffer: ByteBuffer,
    machine: SessionMachine,
    command_timeout: Option<Duration>,
}

impl<S> Pop3Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, machine: SessionMachine, command_timeout: Option<Duration>) -> Self {
        Self {
            stream,
            buffer: ByteBuffer::new(),
            machine,
            command_timeout,
        }
    }

    /// Drive the session until the server acknowledges QUIT.
    /// Returns the number of messages delivered to `on_message`.
    pub async fn run<F>(mut self, mut on_message: F) -> Result<usize, Pop3ClientError>
    where
        F: FnMut(ParsedMessage) -> bool,
    {
        let mut reader = AnswerReader::new(false);
        while self.machine.state() != ConnectionState::Closed {
            let Some((answer, consumed)) = reader.poll(self.buffer.as_slice()) else {
                if self.fill().await? == 0 {
                    return Err(Pop3ClientError::Closed);
                }
                continue;
            };
            self.buffer.discard_front(consumed);
            debug!("S: {} ({} lines)", answer.status, answer.lines.len());
            match self.machine.advance(answer, &mut on_message)? {
                Some(command) => {
                    self.send(&command).await?;
                    reader = AnswerReader::new(command.expects_multiline());
                }
                None => break,
            }
        }
        let _ = self.stream.shutdown().await;
        Ok(self.machine.delivered())
    }

    /// Wait for more bytes from the server, bounded by the command timeout.
    async fn fill(&mut self) -> Result<usize, Pop3ClientError> {
        let read = self.buffer.append_from(&mut self.stream, READ_CHUNK);
        let n = match self.command_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| Pop3ClientError::Timeout(limit))??,
            None => read.await?,
        };
        Ok(n)
    }

    async fn send(&mut self, command: &Command) -> Result<(), Pop3ClientError> {
        debug!("C: {}", command);
        let mut line = command.to_wire();
        line.push_str("\r\n");
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn ok(status: &str) -> Answer {
        Answer {
            status: status.to_string(),
            lines: Vec::new(),
        }
    }

    fn ok_lines(lines: &[&str]) -> Answer {
        Answer {
            status: "+OK".to_string(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn command_wire_and_log_forms() {
        assert_eq!(Command::Pass("s3cret".into()).to_wire(), "PASS s3cret");
        assert_eq!(Command::Pass("s3cret".into()).to_string(), "PASS ****");
        assert_eq!(Command::Head(2, 2).to_wire(), "HEAD 2 2");
        assert!(Command::Retr(1).expects_multiline());
        assert!(!Command::Dele(1).expects_multiline());
    }

    #[test]
    fn list_parsing() {
        let lines = vec!["1 500".to_string(), "2 20000".to_string()];
        let pending = parse_list(&lines).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1], PendingMessage { server_index: 2, declared_size: 20000 });
        assert!(parse_list(&["1".to_string()]).is_err());
        assert!(parse_list(&["x 5".to_string()]).is_err());
    }

    #[test]
    fn state_table_with_size_limit() {
        let mut machine = SessionMachine::new("alice", "pw", 10000);
        let mut delivered = Vec::new();
        let mut accept = |m: ParsedMessage| {
            delivered.push(m);
            true
        };
        let script = vec![
            (ok("+OK POP3 ready"), ConnectionState::AwaitingUserAck),
            (ok("+OK"), ConnectionState::AwaitingPasswordAck),
            (ok("+OK"), ConnectionState::AwaitingMessageList),
            (ok_lines(&["1 500", "2 20000"]), ConnectionState::AwaitingMessageBody),
            (ok_lines(&["Subject: one", "", "body"]), ConnectionState::AwaitingDeleteAck),
            (ok("+OK deleted"), ConnectionState::AwaitingMessageBody),
            (ok_lines(&["Subject: two", "", "a", "b"]), ConnectionState::AwaitingDeleteAck),
            (ok("+OK deleted"), ConnectionState::AwaitingQuitAck),
            (ok("+OK bye"), ConnectionState::Closed),
        ];
        let mut commands = Vec::new();
        for (answer, expected_state) in script {
            commands.push(machine.advance(answer, &mut accept).unwrap());
            assert_eq!(machine.state(), expected_state);
        }

        assert_eq!(
            commands,
            vec![
                Some(Command::User("alice".into())),
                Some(Command::Pass("pw".into())),
                Some(Command::List),
                Some(Command::Retr(1)),
                Some(Command::Dele(1)),
                Some(Command::Head(2, 2)),
                Some(Command::Dele(2)),
                Some(Command::Quit),
                None,
            ]
        );
        assert_eq!(machine.delivered(), 2);
        assert_eq!(delivered.len(), 2);
        assert!(delivered[0].parse_error.is_none());
        assert!(delivered[1].parse_error.as_deref().unwrap().contains("exceeds limit"));
        assert_eq!(delivered[1].subject, "two");
        assert!(delivered[1].html_body.is_empty());
    }

    #[test]
    fn rejected_message_is_not_deleted() {
        let mut machine = SessionMachine::new("u", "p", 1000);
        let mut reject = |_m: ParsedMessage| false;
        machine.advance(ok("+OK"), &mut reject).unwrap();
        machine.advance(ok("+OK"), &mut reject).unwrap();
        machine.advance(ok("+OK"), &mut reject).unwrap();
        let cmd = machine.advance(ok_lines(&["7 10"]), &mut reject).unwrap();
        assert_eq!(cmd, Some(Command::Retr(7)));
        let cmd = machine.advance(ok_lines(&["", "hi"]), &mut reject).unwrap();
        assert_eq!(cmd, Some(Command::Quit));
        assert_eq!(machine.pending(), 0);
    }

    #[test]
    fn empty_mailbox_quits() {
        let mut machine = SessionMachine::new("u", "p", 1000);
        let mut never = |_m: ParsedMessage| -> bool { panic!("no messages expected") };
        for _ in 0..3 {
            machine.advance(ok("+OK"), &mut never).unwrap();
        }
        let cmd = machine.advance(ok_lines(&[]), &mut never).unwrap();
        assert_eq!(cmd, Some(Command::Quit));
    }

    #[test]
    fn negative_and_malformed_are_fatal() {
        let mut machine = SessionMachine::new("u", "p", 1000);
        let mut accept = |_m: ParsedMessage| true;
        machine.advance(ok("+OK"), &mut accept).unwrap();
        let err = machine.advance(ok("-ERR unknown user"), &mut accept).unwrap_err();
        assert!(matches!(err, Pop3ClientError::Negative(ref s) if s == "-ERR unknown user"));

        let mut machine = SessionMachine::new("u", "p", 1000);
        let err = machine.advance(ok("HELLO"), &mut accept).unwrap_err();
        assert!(matches!(err, Pop3ClientError::Malformed(_)));
    }

    #[test]
    fn line_breaks_in_credentials_rejected() {
        assert!(check_credentials("alice", "pw").is_ok());
        assert!(matches!(
            check_credentials("alice\r\nDELE 1", "pw"),
            Err(Pop3ClientError::InvalidCredentials("user"))
        ));
        assert!(matches!(
            check_credentials("alice", "pw\nQUIT"),
            Err(Pop3ClientError::InvalidCredentials("password"))
        ));

        let mut machine = SessionMachine::new("alice", "pw\r\nDELE 1", 1000);
        let mut accept = |_m: ParsedMessage| true;
        let err = machine.advance(ok("+OK ready"), &mut accept).unwrap_err();
        assert!(matches!(err, Pop3ClientError::InvalidCredentials("password")));
        assert_eq!(machine.state(), ConnectionState::AwaitingHandshake);
    }

    /// Scripted server over an in-memory pipe; returns the commands it saw.
    async fn scripted_server<T>(stream: T, list: &'static str, messages: &'static [&'static str]) -> Vec<String>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let (read_half, mut write_half) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);
        let mut seen = Vec::new();
        write_half.write_all(b"+OK POP3 ready\r\n").await.unwrap();
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            let command = line.trim_end().to_string();
            let reply = if command == "LIST" {
                format!("+OK\r\n{}.\r\n", list)
            } else if let Some(rest) = command.strip_prefix("RETR ").or_else(|| command.strip_prefix("HEAD ")) {
                let index: usize = rest.split(' ').next().unwrap().parse().unwrap();
                format!("+OK\r\n{}.\r\n", messages[index - 1])
            } else {
                "+OK\r\n".to_string()
            };
            write_half.write_all(reply.as_bytes()).await.unwrap();
            seen.push(command.clone());
            if command == "QUIT" {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn session_over_duplex() {
        let (client, server) = tokio::io::duplex(64);
        let server = tokio::spawn(scripted_server(
            server,
            "1 500\r\n2 20000\r\n",
            &[
                "From: Ann <ann@example.org>\r\nSubject: first\r\n\r\n..leading dot\r\n",
                "From: bob@example.org\r\nSubject: second\r\n\r\nline 1\r\nline 2\r\n",
            ],
        ));

        let mut received = Vec::new();
        let session = Pop3Session::new(
            client,
            SessionMachine::new("user", "secret", 10000),
            Some(Duration::from_secs(5)),
        );
        let delivered = session
            .run(|m| {
                received.push(m);
                true
            })
            .await
            .unwrap();

        let seen = server.await.unwrap();
        assert_eq!(
            seen,
            vec!["USER user", "PASS secret", "LIST", "RETR 1", "DELE 1", "HEAD 2 2", "DELE 2", "QUIT"]
        );
        assert_eq!(delivered, 2);
        assert_eq!(received[0].from_email, "ann@example.org");
        assert_eq!(received[0].html_body, "<p>.leading dot</p>");
        assert!(received[1].parse_error.is_some());
    }

    #[tokio::test]
    async fn server_hangup_is_fatal() {
        let (client, server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let mut server = server;
            server.write_all(b"+OK hi\r\n").await.unwrap();
            drop(server);
        });
        let session = Pop3Session::new(client, SessionMachine::new("u", "p", 100), None);
        let err = session.run(|_| true).await.unwrap_err();
        assert!(matches!(err, Pop3ClientError::Closed | Pop3ClientError::Io(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let (client, _server) = tokio::io::duplex(64);
        let session = Pop3Session::new(
            client,
            SessionMachine::new("u", "p", 100),
            Some(Duration::from_millis(50)),
        );
        let err = session.run(|_| true).await.unwrap_err();
        assert!(matches!(err, Pop3ClientError::Timeout(_)));
    }
}
