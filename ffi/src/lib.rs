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

//! C FFI for mailfetch core. One blocking entry point runs a whole POP3
//! session on a shared tokio runtime and presents each message to a C
//! callback. All string parameters are UTF-8 NUL-terminated.

use libc::{c_char, c_int, c_void, size_t};
use std::ffi::{CStr, CString};
use std::ptr;

use log::warn;
use mailfetch_core::{download_messages, Attachment, ParsedMessage};

/// Per-message callback. The message and everything it points to is only
/// valid for the duration of the call. Return non-zero to delete the message
/// from the server.
type OnMessage = extern "C" fn(*const MailfetchMessage, *mut c_void) -> c_int;

/// One attachment of a delivered message (borrowed).
#[repr(C)]
pub struct MailfetchAttachment {
    pub file_name: *const c_char,
    pub content_type: *const c_char,
    pub data: *const u8,
    pub data_len: size_t,
}

/// A delivered message (borrowed). Timestamps are seconds since the Unix epoch, UTC.
/// `parse_error` is null when the message decoded cleanly.
#[repr(C)]
pub struct MailfetchMessage {
    pub from_raw: *const c_char,
    pub from_email: *const c_char,
    pub subject: *const c_char,
    pub created_at: i64,
    pub received_at: i64,
    pub html_body: *const c_char,
    pub parse_error: *const c_char,
    pub attachment_count: size_t,
    pub attachments: *const MailfetchAttachment,
}

fn runtime() -> Option<&'static tokio::runtime::Runtime> {
    static RUNTIME: once_cell::sync::OnceCell<tokio::runtime::Runtime> = once_cell::sync::OnceCell::new();
    RUNTIME
        .get_or_try_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
        })
        .map_err(|e| warn!("failed to create tokio runtime: {}", e))
        .ok()
}

thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<CString>> = std::cell::RefCell::new(None);
}

fn set_last_error(message: &str) {
    let msg = to_cstring(message);
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

fn ptr_to_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string()) }
}

/// NUL cannot cross the C boundary; drop it.
fn to_cstring(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

/// Owned C strings behind a `MailfetchMessage`, kept alive across the callback.
struct MessageStrings {
    from_raw: CString,
    from_email: CString,
    subject: CString,
    html_body: CString,
    parse_error: Option<CString>,
    attachments: Vec<(CString, CString)>,
}

impl MessageStrings {
    fn new(message: &ParsedMessage) -> Self {
        Self {
            from_raw: to_cstring(&message.from_raw),
            from_email: to_cstring(&message.from_email),
            subject: to_cstring(&message.subject),
            html_body: to_cstring(&message.html_body),
            parse_error: message.parse_error.as_deref().map(to_cstring),
            attachments: message
                .attachments
                .iter()
                .map(|a: &Attachment| (to_cstring(&a.file_name), to_cstring(&a.content_type)))
                .collect(),
        }
    }
}

/// Present `message` to the C callback; true when it asks for deletion.
fn deliver(message: ParsedMessage, on_message: OnMessage, user_data: *mut c_void) -> bool {
    let strings = MessageStrings::new(&message);
    let attachments: Vec<MailfetchAttachment> = message
        .attachments
        .iter()
        .zip(&strings.attachments)
        .map(|(a, (name, content_type))| MailfetchAttachment {
            file_name: name.as_ptr(),
            content_type: content_type.as_ptr(),
            data: a.raw_bytes.as_ptr(),
            data_len: a.raw_bytes.len(),
        })
        .collect();
    let c_message = MailfetchMessage {
        from_raw: strings.from_raw.as_ptr(),
        from_email: strings.from_email.as_ptr(),
        subject: strings.subject.as_ptr(),
        created_at: message.created_at.timestamp(),
        received_at: message.received_at.timestamp(),
        html_body: strings.html_body.as_ptr(),
        parse_error: strings.parse_error.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
        attachment_count: attachments.len(),
        attachments: if attachments.is_empty() { ptr::null() } else { attachments.as_ptr() },
    };
    on_message(&c_message, user_data) != 0
}

/// Version string (static, do not free).
#[no_mangle]
pub extern "C" fn mailfetch_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Last error message from a failed call on this thread. Valid until the next
/// call. Do not free.
#[no_mangle]
pub extern "C" fn mailfetch_last_error() -> *const c_char {
    LAST_ERROR.with(|e| e.borrow().as_ref().map(|s| s.as_ptr()).unwrap_or(ptr::null()))
}

/// Download every message from a POP3 mailbox, blocking until the session ends.
/// `server` is `host` or `host:port` (default port 110). Messages declared
/// larger than `size_limit` bytes are delivered headers-only with `parse_error` set.
/// Returns the number of messages delivered, or -1 on a fatal error
/// (see `mailfetch_last_error`). Messages delivered before the error stay delivered.
#[no_mangle]
pub extern "C" fn mailfetch_download_messages(
    server: *const c_char,
    use_tls: c_int,
    user: *const c_char,
    password: *const c_char,
    size_limit: u64,
    on_message: Option<OnMessage>,
    user_data: *mut c_void,
) -> c_int {
    let Some(server) = ptr_to_str(server) else {
        set_last_error("server is null or not valid UTF-8");
        return -1;
    };
    let Some(user) = ptr_to_str(user) else {
        set_last_error("user is null or not valid UTF-8");
        return -1;
    };
    let Some(password) = ptr_to_str(password) else {
        set_last_error("password is null or not valid UTF-8");
        return -1;
    };
    let Some(on_message) = on_message else {
        set_last_error("on_message callback is null");
        return -1;
    };
    let Some(runtime) = runtime() else {
        set_last_error("failed to create tokio runtime");
        return -1;
    };
    let result = runtime.block_on(download_messages(
        &server,
        use_tls != 0,
        &user,
        &password,
        size_limit,
        |message| deliver(message, on_message, user_data),
    ));
    match result {
        Ok(delivered) => {
            clear_last_error();
            c_int::try_from(delivered).unwrap_or(c_int::MAX)
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn accept_all(_message: *const MailfetchMessage, _user_data: *mut c_void) -> c_int {
        1
    }

    fn last_error() -> String {
        let ptr = mailfetch_last_error();
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    #[test]
    fn version_is_nul_terminated() {
        let v = unsafe { CStr::from_ptr(mailfetch_version()) };
        assert_eq!(v.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn null_arguments_fail() {
        let user = CString::new("u").unwrap();
        let rc = mailfetch_download_messages(
            ptr::null(),
            0,
            user.as_ptr(),
            user.as_ptr(),
            100,
            Some(accept_all),
            ptr::null_mut(),
        );
        assert_eq!(rc, -1);
        assert!(last_error().contains("server"));

        let server = CString::new("localhost").unwrap();
        let rc = mailfetch_download_messages(
            server.as_ptr(),
            0,
            user.as_ptr(),
            user.as_ptr(),
            100,
            None,
            ptr::null_mut(),
        );
        assert_eq!(rc, -1);
        assert!(last_error().contains("callback"));
    }

    #[test]
    fn invalid_server_reported() {
        let server = CString::new("host:port").unwrap();
        let user = CString::new("u").unwrap();
        let rc = mailfetch_download_messages(
            server.as_ptr(),
            0,
            user.as_ptr(),
            user.as_ptr(),
            100,
            Some(accept_all),
            ptr::null_mut(),
        );
        assert_eq!(rc, -1);
        assert!(last_error().contains("invalid server address"));
    }

    extern "C" fn record(message: *const MailfetchMessage, user_data: *mut c_void) -> c_int {
        let message = unsafe { &*message };
        let seen = unsafe { &mut *(user_data as *mut Vec<(String, usize, bool)>) };
        let subject = unsafe { CStr::from_ptr(message.subject) }.to_string_lossy().into_owned();
        seen.push((subject, message.attachment_count, message.parse_error.is_null()));
        0
    }

    #[test]
    fn deliver_borrows_message_fields() {
        let lines = [
            "Subject: hello",
            "Content-Type: multipart/mixed; boundary=b",
            "",
            "--b",
            "Content-Type: application/octet-stream; name=a.bin",
            "Content-Transfer-Encoding: base64",
            "",
            "AAEC",
            "--b--",
        ];
        let message = ParsedMessage::parse(&lines);
        let mut seen: Vec<(String, usize, bool)> = Vec::new();
        let deleted = deliver(message, record, &mut seen as *mut _ as *mut c_void);
        assert!(!deleted);
        assert_eq!(seen, vec![("hello".to_string(), 1, true)]);
    }
}
