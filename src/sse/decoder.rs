//! Frame decoder: raw byte chunks in, complete text lines out.
//!
//! Bytes are buffered undecoded and only split at `\n`. A newline byte never
//! occurs inside a multi-byte UTF-8 sequence, so a code point split across two
//! reads is always decoded once, from the complete line.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::traits::http::HttpError;

/// Streaming line splitter.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
    /// Bytes of `buffer` already known to contain no newline.
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a chunk without splitting it.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Buffer a chunk and iterate the lines that are now complete.
    ///
    /// The iterator is lazy: lines not pulled from it stay buffered and come
    /// out on the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.extend(chunk);
        Lines { decoder: self }
    }

    /// Next complete line, without its `\n` (and `\r`) terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let offset = self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == b'\n');

        let Some(offset) = offset else {
            self.scanned = self.buffer.len();
            return None;
        };

        let end = self.scanned + offset;
        let mut line = self.buffer.split_to(end + 1);
        self.scanned = 0;

        line.truncate(end);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Bytes waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// End of input. An unterminated remainder is not a line and is dropped;
    /// returns how many bytes were discarded.
    pub fn finish(&mut self) -> usize {
        let discarded = self.buffer.len();
        if discarded > 0 {
            debug!(bytes = discarded, "Discarding unterminated trailing fragment");
        }
        self.buffer.clear();
        self.scanned = 0;
        discarded
    }
}

/// Lines made complete by the last [`LineDecoder::push`].
pub struct Lines<'a> {
    decoder: &'a mut LineDecoder,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.decoder.next_line()
    }
}

/// Adapt a byte stream into a stream of complete lines.
///
/// A transport error is yielded once and ends the stream.
pub fn decode_lines<S>(bytes: S) -> impl Stream<Item = Result<String, HttpError>>
where
    S: Stream<Item = Result<Bytes, HttpError>> + Unpin,
{
    stream::unfold(
        (bytes, LineDecoder::new(), false),
        |(mut bytes, mut decoder, done)| async move {
            if done {
                return None;
            }
            loop {
                if let Some(line) = decoder.next_line() {
                    return Some((Ok(line), (bytes, decoder, false)));
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => decoder.extend(&chunk),
                    Some(Err(e)) => return Some((Err(e), (bytes, decoder, true))),
                    None => {
                        decoder.finish();
                        return None;
                    }
                }
            }
        },
    )
}
