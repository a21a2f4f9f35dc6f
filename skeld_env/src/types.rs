//! Common types for the Skeld environment abstraction.

/// Byte separating frames on the wire.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Longest inbound line accepted, delimiter excluded.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// One newline-delimited text frame.
///
/// The payload never contains the delimiter; `to_wire` appends it. Each frame
/// carries exactly one JSON value, but this layer does not look inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    /// Creates a frame, stripping any embedded line breaks.
    pub fn new(payload: impl Into<String>) -> Self {
        let payload = payload.into();
        if payload.contains(['\n', '\r']) {
            Self(payload.replace(['\n', '\r'], ""))
        } else {
            Self(payload)
        }
    }

    /// Builds a frame from one received line.
    ///
    /// Surrounding whitespace (including `\r\n`) is trimmed and blank lines
    /// yield `None`. Invalid UTF-8 is replaced lossily; the JSON layer above
    /// rejects whatever that produces.
    pub fn from_line(line: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the payload text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the frame and returns the payload.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns the payload plus delimiter as bytes.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() + 1);
        bytes.extend_from_slice(self.0.as_bytes());
        bytes.push(FRAME_DELIMITER);
        bytes
    }

    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_strips_line_breaks() {
        let frame = Frame::new("{\"a\":1}\n");
        assert_eq!(frame.as_str(), "{\"a\":1}");
        assert_eq!(frame.to_wire().last(), Some(&FRAME_DELIMITER));
    }

    #[test]
    fn test_from_line_trims_and_skips_blanks() {
        assert_eq!(Frame::from_line(b"[]\r\n"), Some(Frame::new("[]")));
        assert_eq!(Frame::from_line(b"  \n"), None);
        assert_eq!(Frame::from_line(b"\xff[]").map(|f| f.size()), Some(5));
    }
}
