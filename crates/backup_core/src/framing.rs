use std::fmt;

use encoding_rs::{Decoder, UTF_8};

/// Reassembles complete `\n`-terminated lines from arbitrarily split byte chunks.
///
/// Bytes are decoded with a streaming UTF-8 decoder, so a multi-byte character
/// split across two chunks is decoded once both halves have arrived. Malformed
/// sequences become U+FFFD rather than failing the stream.
pub struct LineFramer {
    decoder: Decoder,
    buffer: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_with_bom_removal(),
            buffer: String::new(),
        }
    }

    /// Accepts the next chunk and returns every line it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode_into_buffer(chunk, false);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);
        complete
            .strip_suffix('\n')
            .unwrap_or(&complete)
            .split('\n')
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Ends the stream: returns the trailing fragment (if any) and resets the framer.
    pub fn flush(&mut self) -> Option<String> {
        self.decode_into_buffer(&[], true);
        let rest = std::mem::take(&mut self.buffer);
        self.decoder = UTF_8.new_decoder_with_bom_removal();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    /// Number of decoded UTF-8 bytes waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    fn decode_into_buffer(&mut self, chunk: &[u8], last: bool) {
        let mut remaining = chunk;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(remaining.len())
                .unwrap_or(remaining.len().saturating_mul(3) + 4);
            self.buffer.reserve(needed);
            let (result, read, _had_replacements) =
                self.decoder
                    .decode_to_string(remaining, &mut self.buffer, last);
            remaining = &remaining[read..];
            if matches!(result, encoding_rs::CoderResult::InputEmpty) {
                break;
            }
        }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LineFramer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineFramer")
            .field("encoding", &self.decoder.encoding().name())
            .field("pending_len", &self.buffer.len())
            .finish()
    }
}
