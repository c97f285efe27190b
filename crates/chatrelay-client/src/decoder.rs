//! Stateful UTF-8 decoding across chunk boundaries.

/// Decodes a byte stream chunk by chunk, carrying an incomplete trailing
/// multi-byte sequence over to the next chunk.
///
/// Invalid sequences decode to U+FFFD rather than failing the stream.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, holding back an unfinished sequence at its end.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // `valid_up_to` marks a valid prefix, so this never falls back.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end: wait for more bytes.
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end of stream. A dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"data: hi\n"), "data: hi\n");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_multibyte_split_at_every_position() {
        let text = "héllo → 世界 🦀";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut decoder = Utf8Decoder::new();
            let mut out = decoder.decode(&bytes[..split]);
            out.push_str(&decoder.decode(&bytes[split..]));
            out.push_str(&decoder.finish());
            assert_eq!(out, text, "split at {split}");
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let text = "🦀🦀";
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        for byte in text.as_bytes() {
            out.push_str(&decoder.decode(std::slice::from_ref(byte)));
        }
        assert_eq!(out, text);
    }

    #[test]
    fn test_invalid_bytes_become_replacement() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_dangling_sequence_flushed_as_replacement() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&"é".as_bytes()[..1]), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert!(!decoder.has_pending());
    }
}
