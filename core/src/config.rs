/*
 * config.rs
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

//! Session parameters: the typed `SessionConfig` and its XML file form.
//! All XML reading uses the quick_xml reader; no hand parsing.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

/// Port used when the server address carries none.
pub const DEFAULT_PORT: u16 = 110;

/// Default bound on the wait for any single server answer.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read mailbox config: {0}")]
    Io(#[from] io::Error),
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("mailbox config is missing <{0}>")]
    Missing(&'static str),
    #[error("invalid value {value:?} for <{element}>")]
    Invalid { element: &'static str, value: String },
}

/// Everything one `download_messages` call needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// `host` or `host:port`.
    pub server: String,
    pub use_tls: bool,
    pub user: String,
    pub password: String,
    /// Messages declared larger than this many bytes are fetched headers-only.
    pub message_size_limit: u64,
    pub command_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new(
        server: impl Into<String>,
        use_tls: bool,
        user: impl Into<String>,
        password: impl Into<String>,
        message_size_limit: u64,
    ) -> Self {
        Self {
            server: server.into(),
            use_tls,
            user: user.into(),
            password: password.into(),
            message_size_limit,
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
        }
    }

    /// `None` waits for the server indefinitely.
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn host_and_port(&self) -> Option<(String, u16)> {
        parse_server(&self.server)
    }
}

/// Split `host`, `host:port`, `[v6]` or `[v6]:port` into host and port.
/// Returns None for an empty host or an unparsable port.
pub fn parse_server(server: &str) -> Option<(String, u16)> {
    let server = server.trim();
    let (host, port) = if let Some(rest) = server.strip_prefix('[') {
        let close = rest.find(']')?;
        let host = &rest[..close];
        match &rest[close + 1..] {
            "" => (host, None),
            tail => (host, Some(tail.strip_prefix(':')?)),
        }
    } else {
        match server.rsplit_once(':') {
            // A bare IPv6 literal has more than one colon and no port.
            Some((host, _)) if host.contains(':') => (server, None),
            Some((host, port)) => (host, Some(port)),
            None => (server, None),
        }
    };
    if host.is_empty() {
        return None;
    }
    let port = match port {
        Some(p) => p.parse().ok()?,
        None => DEFAULT_PORT,
    };
    Some((host.to_string(), port))
}

/// Load a mailbox config file.
pub fn load_mailbox_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_mailbox_config(&content)
}

/// Parse `<mailbox><server/><tls/><user/><password/><size-limit/><timeout-secs/></mailbox>`.
/// `tls`, `size-limit` and `timeout-secs` are optional; a timeout of 0 disables it.
pub fn parse_mailbox_config(xml: &str) -> Result<SessionConfig, ConfigError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut element_name = Vec::<u8>::new();
    let mut server = None;
    let mut use_tls = false;
    let mut user = None;
    let mut password = None;
    let mut size_limit = u64::MAX;
    let mut timeout = Some(DEFAULT_COMMAND_TIMEOUT);

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                element_name.clear();
                element_name.extend_from_slice(e.name().as_ref());
            }
            Event::Text(e) => {
                if element_name.is_empty() {
                    continue;
                }
                let text = e.unescape()?.trim().to_string();
                match element_name.as_slice() {
                    b"server" => server = Some(text),
                    b"user" => user = Some(text),
                    b"password" => password = Some(text),
                    b"tls" => use_tls = parse_bool("tls", &text)?,
                    b"size-limit" => size_limit = parse_number("size-limit", &text)?,
                    b"timeout-secs" => {
                        timeout = match parse_number("timeout-secs", &text)? {
                            0 => None,
                            secs => Some(Duration::from_secs(secs)),
                        }
                    }
                    _ => {}
                }
                element_name.clear();
            }
            Event::End(_) => element_name.clear(),
            _ => {}
        }
        buf.clear();
    }

    let server = server.ok_or(ConfigError::Missing("server"))?;
    if parse_server(&server).is_none() {
        return Err(ConfigError::Invalid {
            element: "server",
            value: server,
        });
    }
    Ok(SessionConfig::new(
        server,
        use_tls,
        user.ok_or(ConfigError::Missing("user"))?,
        password.unwrap_or_default(),
        size_limit,
    )
    .with_command_timeout(timeout))
}

fn parse_bool(element: &'static str, text: &str) -> Result<bool, ConfigError> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::Invalid {
            element,
            value: text.to_string(),
        }),
    }
}

fn parse_number(element: &'static str, text: &str) -> Result<u64, ConfigError> {
    text.parse().map_err(|_| ConfigError::Invalid {
        element,
        value: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_forms() {
        assert_eq!(parse_server("pop.example.org"), Some(("pop.example.org".into(), 110)));
        assert_eq!(parse_server("pop.example.org:995"), Some(("pop.example.org".into(), 995)));
        assert_eq!(parse_server("[::1]:1110"), Some(("::1".into(), 1110)));
        assert_eq!(parse_server("[::1]"), Some(("::1".into(), 110)));
        assert_eq!(parse_server("fe80::1"), Some(("fe80::1".into(), 110)));
        assert_eq!(parse_server("host:port"), None);
        assert_eq!(parse_server(":110"), None);
        assert_eq!(parse_server(""), None);
    }

    #[test]
    fn full_mailbox_config() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<mailbox>
  <server>pop.example.org:995</server>
  <tls>true</tls>
  <user>alice</user>
  <password>s&amp;cret</password>
  <size-limit>10000</size-limit>
  <timeout-secs>30</timeout-secs>
</mailbox>"#;
        let config = parse_mailbox_config(xml).unwrap();
        assert_eq!(config.server, "pop.example.org:995");
        assert!(config.use_tls);
        assert_eq!(config.user, "alice");
        assert_eq!(config.password, "s&cret");
        assert_eq!(config.message_size_limit, 10000);
        assert_eq!(config.command_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.host_and_port(), Some(("pop.example.org".into(), 995)));
    }

    #[test]
    fn defaults_and_disabled_timeout() {
        let config = parse_mailbox_config(
            "<mailbox><server>h</server><user>u</user><timeout-secs>0</timeout-secs></mailbox>",
        )
        .unwrap();
        assert!(!config.use_tls);
        assert_eq!(config.password, "");
        assert_eq!(config.message_size_limit, u64::MAX);
        assert_eq!(config.command_timeout, None);
    }

    #[test]
    fn config_errors() {
        assert!(matches!(
            parse_mailbox_config("<mailbox><user>u</user></mailbox>"),
            Err(ConfigError::Missing("server"))
        ));
        assert!(matches!(
            parse_mailbox_config("<mailbox><server>h</server><user>u</user><tls>maybe</tls></mailbox>"),
            Err(ConfigError::Invalid { element: "tls", .. })
        ));
        assert!(matches!(
            parse_mailbox_config("<mailbox><server>h:x</server><user>u</user></mailbox>"),
            Err(ConfigError::Invalid { element: "server", .. })
        ));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("mailfetch-config-{}.xml", std::process::id()));
        fs::write(&path, "<mailbox><server>h</server><user>u</user></mailbox>").unwrap();
        let config = load_mailbox_config(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(config.host_and_port(), Some(("h".into(), 110)));
        assert!(matches!(
            load_mailbox_config(Path::new("/nonexistent/mailfetch.xml")),
            Err(ConfigError::Io(_))
        ));
    }
}
