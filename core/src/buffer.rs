/*
 * buffer.rs
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

//! Growable byte buffer backing the POP3 line reader.
//!
//! Logical data always occupies `[0, len)`. Capacity doubles until an append
//! fits and is never given back, so a long-lived connection settles on one
//! allocation. `discard_front` compacts in place.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

const INITIAL_CAPACITY: usize = 4096;

/// Append-only byte accumulator with discard-from-front.
#[derive(Debug)]
pub struct ByteBuffer {
    data: Vec<u8>,
    length: usize,
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity.max(1)],
            length: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Buffered bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.length]
    }

    /// Grow (by doubling) until at least `additional` bytes are free after the logical end.
    fn reserve(&mut self, additional: usize) {
        if self.data.len() - self.length >= additional {
            return;
        }
        let mut capacity = self.data.len().max(1);
        while capacity - self.length < additional {
            capacity *= 2;
        }
        self.data.resize(capacity, 0);
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.data[self.length..self.length + bytes.len()].copy_from_slice(bytes);
        self.length += bytes.len();
    }

    /// Read at most `max_bytes` from `reader` straight into the free tail.
    /// Returns the number of bytes read; 0 means the peer closed the stream.
    pub async fn append_from<R>(&mut self, reader: &mut R, max_bytes: usize) -> io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        self.reserve(max_bytes);
        let n = reader
            .read(&mut self.data[self.length..self.length + max_bytes])
            .await?;
        self.length += n;
        Ok(n)
    }

    /// Drop the first `n` bytes. `n >= len` empties the buffer without copying.
    pub fn discard_front(&mut self, n: usize) {
        if n >= self.length {
            self.length = 0;
            return;
        }
        self.data.copy_within(n..self.length, 0);
        self.length -= n;
    }
}
