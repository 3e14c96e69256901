//! Incremental decoder for a top-level JSON array.
//!
//! Frames one element at a time out of an `AsyncRead` by tracking bracket
//! depth and string/escape state, then parses each frame with serde_json.
//! Memory is bounded by the largest single element rather than the input.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK: usize = 8 * 1024;

/// Decode failure, split by cause: the wrong top-level shape gets a
/// concise single-line diagnostic, everything else a detailed one.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Top-level value must be an array.")]
    TopLevelNotArray,

    /// Malformed JSON inside an element, with the parser's native message.
    #[error("invalid JSON in array element: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Structural failure while framing the array itself.
    #[error("{message} at byte {offset}")]
    Syntax { message: String, offset: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the opening `[`.
    Start,
    /// Right after `[`; expecting a value or `]`.
    FirstElement,
    /// After an element; expecting `,` or `]`.
    NextElement,
    /// After the closing `]`; only whitespace may follow.
    Finished,
}

/// Pull-based decoder yielding the elements of a top-level JSON array.
///
/// The sequence is finite and single-consumption: after `next_value`
/// returns `Ok(None)` or any error, further calls are not meaningful.
pub struct ArrayDecoder<R> {
    reader: R,
    buf: Vec<u8>,
    pos: usize,
    consumed: usize,
    state: State,
    eof: bool,
}

impl<R: AsyncRead + Unpin> ArrayDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            consumed: 0,
            state: State::Start,
            eof: false,
        }
    }

    /// Decode the next array element, or `None` once the array (and the
    /// input) has been fully consumed.
    pub async fn next_value(&mut self) -> Result<Option<Value>, DecodeError> {
        loop {
            match self.state {
                State::Start => {
                    let Some(b) = self.peek_nonws().await? else {
                        return Err(self.syntax("unexpected end of input"));
                    };
                    if b == b'[' {
                        self.pos += 1;
                        self.state = State::FirstElement;
                    } else if starts_json_value(b) {
                        return Err(DecodeError::TopLevelNotArray);
                    } else {
                        return Err(self.syntax("expected a JSON value"));
                    }
                }
                State::FirstElement => {
                    let Some(b) = self.peek_nonws().await? else {
                        return Err(self.syntax("unexpected end of input while parsing array"));
                    };
                    if b == b']' {
                        self.pos += 1;
                        self.state = State::Finished;
                        continue;
                    }
                    return self.parse_element().await.map(Some);
                }
                State::NextElement => {
                    let Some(b) = self.peek_nonws().await? else {
                        return Err(self.syntax("unexpected end of input while parsing array"));
                    };
                    match b {
                        b']' => {
                            self.pos += 1;
                            self.state = State::Finished;
                        }
                        b',' => {
                            self.pos += 1;
                            let Some(b) = self.peek_nonws().await? else {
                                return Err(
                                    self.syntax("unexpected end of input while parsing array")
                                );
                            };
                            if b == b']' {
                                return Err(self.syntax("trailing comma before `]`"));
                            }
                            return self.parse_element().await.map(Some);
                        }
                        _ => return Err(self.syntax("expected `,` or `]` after array element")),
                    }
                }
                State::Finished => {
                    if self.peek_nonws().await?.is_some() {
                        return Err(self.syntax("trailing characters after top-level array"));
                    }
                    return Ok(None);
                }
            }
        }
    }

    async fn parse_element(&mut self) -> Result<Value, DecodeError> {
        let range = self.scan_value().await?;
        let value = serde_json::from_slice(&self.buf[range])?;
        self.state = State::NextElement;
        Ok(value)
    }

    /// Frame one JSON value starting at the cursor (which points at a
    /// non-whitespace byte). Advances the cursor past the value and
    /// returns its byte range within the buffer.
    async fn scan_value(&mut self) -> Result<std::ops::Range<usize>, DecodeError> {
        let start = self.pos;
        let mut depth: u32 = 0;
        let mut in_string = false;
        let mut escaped = false;
        let mut i = self.pos;

        loop {
            if i == self.buf.len() && !self.fill().await? {
                return Err(DecodeError::Syntax {
                    message: "unexpected end of input while parsing array".to_string(),
                    offset: self.consumed + self.buf.len(),
                });
            }
            let b = self.buf[i];

            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                    i += 1;
                    if depth == 0 {
                        break;
                    }
                    continue;
                }
                i += 1;
                continue;
            }

            match b {
                b'"' => {
                    in_string = true;
                    i += 1;
                }
                b'{' | b'[' => {
                    depth += 1;
                    i += 1;
                }
                b'}' | b']' => {
                    if depth == 0 {
                        // scalar terminated by the enclosing array
                        break;
                    }
                    depth -= 1;
                    i += 1;
                    if depth == 0 {
                        break;
                    }
                }
                b',' | b' ' | b'\t' | b'\n' | b'\r' if depth == 0 => break,
                _ => i += 1,
            }
        }

        self.pos = i;
        Ok(start..i)
    }

    /// Advance to the next non-whitespace byte, refilling from the reader
    /// as needed. `None` at end of input.
    async fn peek_nonws(&mut self) -> Result<Option<u8>, DecodeError> {
        loop {
            while self.pos < self.buf.len() {
                match self.buf[self.pos] {
                    b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                    b => return Ok(Some(b)),
                }
            }
            self.compact();
            if !self.fill().await? {
                return Ok(None);
            }
        }
    }

    /// Drop bytes before the cursor. Only called between values, so
    /// nothing still referenced is discarded.
    fn compact(&mut self) {
        self.consumed += self.pos;
        self.buf.drain(..self.pos);
        self.pos = 0;
    }

    async fn fill(&mut self) -> Result<bool, DecodeError> {
        if self.eof {
            return Ok(false);
        }
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.reader.read(&mut chunk).await?;
        if n == 0 {
            self.eof = true;
            return Ok(false);
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(true)
    }

    fn syntax(&self, message: &str) -> DecodeError {
        DecodeError::Syntax {
            message: message.to_string(),
            offset: self.consumed + self.pos,
        }
    }
}

/// Whether `b` can begin a JSON value. Used to tell "valid JSON, wrong
/// top-level shape" apart from input that is not JSON at all.
fn starts_json_value(b: u8) -> bool {
    matches!(b, b'{' | b'"' | b'-' | b'0'..=b'9' | b't' | b'f' | b'n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    async fn collect(input: &str) -> Result<Vec<Value>, DecodeError> {
        collect_from(input.as_bytes()).await
    }

    async fn collect_from<R: AsyncRead + Unpin>(reader: R) -> Result<Vec<Value>, DecodeError> {
        let mut decoder = ArrayDecoder::new(reader);
        let mut values = Vec::new();
        while let Some(value) = decoder.next_value().await? {
            values.push(value);
        }
        Ok(values)
    }

    /// Reader that yields one byte per read call, to exercise refills at
    /// every possible frame boundary.
    struct OneByte<'a>(&'a [u8]);

    impl AsyncRead for OneByte<'_> {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let this = self.get_mut();
            if let Some((first, rest)) = this.0.split_first() {
                buf.put_slice(&[*first]);
                this.0 = rest;
            }
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn decodes_array_of_objects() {
        let values = collect(r#"[{"foo":"bar"},{"foo":"xyz"}]"#).await.unwrap();
        assert_eq!(values, vec![json!({"foo": "bar"}), json!({"foo": "xyz"})]);
    }

    #[tokio::test]
    async fn decodes_empty_array() {
        assert_eq!(collect("[]").await.unwrap(), Vec::<Value>::new());
        assert_eq!(collect("  [\n]\n").await.unwrap(), Vec::<Value>::new());
    }

    #[tokio::test]
    async fn decodes_scalars_and_whitespace() {
        let values = collect(" [ 1 , \"two\" , null , true ] ").await.unwrap();
        assert_eq!(values, vec![json!(1), json!("two"), json!(null), json!(true)]);
    }

    #[tokio::test]
    async fn brackets_inside_strings_do_not_frame() {
        let values = collect(r#"[{"a":[1,2,{"b":"]}"}]},"[\"]"]"#).await.unwrap();
        assert_eq!(values, vec![json!({"a": [1, 2, {"b": "]}"}]}), json!("[\"]")]);
    }

    #[tokio::test]
    async fn handles_escaped_quotes() {
        let values = collect(r#"["a\"b","c\\"]"#).await.unwrap();
        assert_eq!(values, vec![json!("a\"b"), json!("c\\")]);
    }

    #[tokio::test]
    async fn survives_single_byte_reads() {
        let input = br#"[{"foo":"bar"},[1,[2]],"x"]"#;
        let values = collect_from(OneByte(input)).await.unwrap();
        assert_eq!(values, vec![json!({"foo": "bar"}), json!([1, [2]]), json!("x")]);
    }

    #[tokio::test]
    async fn rejects_top_level_object() {
        let err = collect("{}").await.unwrap_err();
        assert!(matches!(err, DecodeError::TopLevelNotArray));
        assert_eq!(err.to_string(), "Top-level value must be an array.");
    }

    #[tokio::test]
    async fn rejects_top_level_scalars() {
        assert!(matches!(
            collect("42").await.unwrap_err(),
            DecodeError::TopLevelNotArray
        ));
        assert!(matches!(
            collect(r#""str""#).await.unwrap_err(),
            DecodeError::TopLevelNotArray
        ));
    }

    #[tokio::test]
    async fn rejects_non_json_input() {
        assert!(matches!(
            collect("@@").await.unwrap_err(),
            DecodeError::Syntax { .. }
        ));
        assert!(matches!(
            collect("").await.unwrap_err(),
            DecodeError::Syntax { .. }
        ));
    }

    #[tokio::test]
    async fn rejects_unterminated_array() {
        let err = collect(r#"[{"foo":"#).await.unwrap_err();
        assert!(err.to_string().contains("unexpected end of input"));
    }

    #[tokio::test]
    async fn rejects_missing_comma() {
        let err = collect("[1 2]").await.unwrap_err();
        assert!(err.to_string().contains("expected `,` or `]`"));
    }

    #[tokio::test]
    async fn rejects_trailing_characters() {
        let err = collect("[1] x").await.unwrap_err();
        assert!(err.to_string().contains("trailing characters"));
    }

    #[tokio::test]
    async fn rejects_invalid_element() {
        let err = collect("[nope]").await.unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
        assert!(err.to_string().starts_with("invalid JSON in array element:"));
    }

    #[tokio::test]
    async fn exhausted_decoder_stays_exhausted() {
        let mut decoder = ArrayDecoder::new(&b"[1]"[..]);
        assert_eq!(decoder.next_value().await.unwrap(), Some(json!(1)));
        assert_eq!(decoder.next_value().await.unwrap(), None);
        assert_eq!(decoder.next_value().await.unwrap(), None);
    }
}
