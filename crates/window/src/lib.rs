//! # jsoncheck window
//!
//! Turns a single byte offset reported by a JSON decoder into a short, readable snippet of the
//! surrounding lines.
//!
//! ```text
//!   ...            ┐
//!   line -2        │ scan backward until the 3rd '\n' (or index 0)
//!   line -1        │
//!   line  0  <── offset
//!   line +1        │ scan forward until the 2nd '\n' (or end of buffer)
//!   ...            ┘
//! ```
//!
//! The slice between the two stops is returned with any leading and trailing `\r` / `\n`
//! bytes trimmed.
//!
//! ## Example
//!
//! ```rust
//! use jsoncheck_window::extract_window;
//!
//! let buf = b"{\n  \"a\": 1\n  \"b\": 2\n}\n";
//! let window = extract_window(buf, 14);
//! assert_eq!(window, b"{\n  \"a\": 1\n  \"b\": 2\n}");
//! ```

use std::ops::Range;

/// Number of line terminators searched for before the offset.
pub const LEADING_LINES: usize = 3;

/// Number of line terminators searched for from the offset onward.
pub const TRAILING_LINES: usize = 2;

/// Returns the untrimmed `[start, end)` range of the window around `offset`.
///
/// `offset` past the end of `buf` is clamped to the last byte. An empty buffer yields `0..0`.
pub fn window_range(buf: &[u8], offset: usize) -> Range<usize> {
    if buf.is_empty() {
        return 0..0;
    }
    let offset = offset.min(buf.len() - 1);

    let mut newlines = 0;
    let mut start = offset;
    while start > 0 {
        if buf[start] == b'\n' {
            newlines += 1;
            if newlines == LEADING_LINES {
                break;
            }
        }
        start -= 1;
    }

    newlines = 0;
    let mut end = offset;
    while end < buf.len() {
        if buf[end] == b'\n' {
            newlines += 1;
            if newlines == TRAILING_LINES {
                break;
            }
        }
        end += 1;
    }

    start..end
}

/// Extracts the context window around `offset`, trimmed of line terminators on both ends.
pub fn extract_window(buf: &[u8], offset: usize) -> &[u8] {
    trim_line_terminators(&buf[window_range(buf, offset)])
}

fn trim_line_terminators(mut bytes: &[u8]) -> &[u8] {
    while let [b'\r' | b'\n', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b'\r' | b'\n'] = bytes {
        bytes = rest;
    }
    bytes
}
