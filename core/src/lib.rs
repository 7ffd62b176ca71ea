/*
 * lib.rs
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

//! Mailfetch core: a POP3 retrieval engine that downloads every message in a
//! mailbox, decodes it into sanitised HTML plus attachments, hands it to the
//! caller and deletes what the caller accepts.

pub mod buffer;
pub mod config;
pub mod message;
pub mod mime;
pub mod net;
pub mod protocol;
pub mod render;

pub use config::{load_mailbox_config, parse_mailbox_config, ConfigError, SessionConfig};
pub use message::{Attachment, ParsedMessage};
pub use mime::MimeError;
pub use protocol::pop3::{download_messages, download_with_config, Pop3ClientError};
