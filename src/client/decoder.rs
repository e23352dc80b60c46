//! Incremental decoder for back-to-back JSON documents.
//!
//! Change streams carry JSON values with no enclosing array and no
//! delimiter, split across arbitrary transport chunks.

use serde_json::{Deserializer, Value};

#[derive(Debug, Default)]
pub struct DocumentDecoder {
    buffer: Vec<u8>,
}

impl DocumentDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every document it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Value>, serde_json::Error> {
        self.buffer.extend_from_slice(chunk);

        let mut documents = Vec::new();
        let mut values = Deserializer::from_slice(&self.buffer).into_iter::<Value>();
        loop {
            match values.next() {
                Some(Ok(value)) => documents.push(value),
                Some(Err(err)) if err.is_eof() => break,
                Some(Err(err)) => return Err(err),
                None => break,
            }
        }

        let consumed = values.byte_offset();
        self.buffer.drain(..consumed);
        Ok(documents)
    }

    /// Bytes of an incomplete document still buffered.
    pub fn pending(&self) -> usize {
        self.buffer.iter().filter(|b| !b.is_ascii_whitespace()).count()
    }
}
