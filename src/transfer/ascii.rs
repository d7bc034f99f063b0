//! ASCII mode line-end conversion
//!
//! Local files use LF, the wire wants CRLF. The encoder remembers the last
//! byte of the previous block so a CR/LF pair split across two writes is not
//! doubled.

/// Streaming LF to CRLF converter for one file.
#[derive(Debug, Default)]
pub struct AsciiEncoder {
    previous: Option<u8>,
    scratch: Vec<u8>,
}

impl AsciiEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous block, for the start of a new file.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Converts `block`, returning the bytes to put on the wire.
    pub fn encode(&mut self, block: &[u8]) -> &[u8] {
        self.scratch.clear();
        self.scratch.reserve(block.len() + block.len() / 8 + 1);

        let mut previous = self.previous;
        for &byte in block {
            if byte == b'\n' && previous != Some(b'\r') {
                self.scratch.push(b'\r');
            }
            self.scratch.push(byte);
            previous = Some(byte);
        }
        if !block.is_empty() {
            self.previous = previous;
        }
        &self.scratch
    }
}
