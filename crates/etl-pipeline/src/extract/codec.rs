//! Incremental decoding of a top-level JSON array of objects
//!
//! The body is consumed chunk by chunk; each array element is yielded as soon
//! as its closing brace arrives, so records flow before the response ends.

use bytes::{Buf, BytesMut};
use etl_common::{EtlError, Record};
use tokio_util::codec::Decoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for `[`
    Start,
    /// After `[`: an element or `]`
    FirstElement,
    /// After `,`: an element
    NextElement,
    /// After an element: `,` or `]`
    Separator,
    /// After `]`: only whitespace may follow
    Done,
}

/// Progress through a partially received element, so bytes are scanned once
#[derive(Debug, Default)]
struct Scan {
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

#[derive(Debug)]
pub struct JsonArrayDecoder {
    state: State,
    scan: Scan,
}

impl JsonArrayDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Start,
            scan: Scan::default(),
        }
    }

    /// Advance `scan` over `src`, returning the element length once complete
    fn element_end(&mut self, src: &[u8]) -> Option<usize> {
        let scan = &mut self.scan;

        for (offset, &byte) in src[scan.pos..].iter().enumerate() {
            if scan.in_string {
                if scan.escaped {
                    scan.escaped = false;
                } else if byte == b'\\' {
                    scan.escaped = true;
                } else if byte == b'"' {
                    scan.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => scan.in_string = true,
                b'{' | b'[' => scan.depth += 1,
                b'}' | b']' => {
                    scan.depth -= 1;
                    if scan.depth == 0 {
                        return Some(scan.pos + offset + 1);
                    }
                },
                _ => {},
            }
        }

        scan.pos = src.len();
        None
    }
}

impl Default for JsonArrayDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn skip_whitespace(src: &mut BytesMut) {
    let leading = src.iter().take_while(|b| b.is_ascii_whitespace()).count();
    src.advance(leading);
}

impl Decoder for JsonArrayDecoder {
    type Item = Record;
    type Error = EtlError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Record>, EtlError> {
        loop {
            // Mid-element: resume the scan without touching the buffer
            if self.scan.pos == 0 {
                skip_whitespace(src);
            }

            let Some(&next) = src.first() else {
                return Ok(None);
            };

            match self.state {
                State::Start => {
                    if next != b'[' {
                        return Err(EtlError::decode("expected start of JSON array"));
                    }
                    src.advance(1);
                    self.state = State::FirstElement;
                },
                State::FirstElement | State::NextElement => {
                    if next == b']' && self.state == State::FirstElement {
                        src.advance(1);
                        self.state = State::Done;
                        continue;
                    }
                    if next != b'{' {
                        return Err(EtlError::decode(format!(
                            "expected JSON object in array, found '{}'",
                            char::from(next)
                        )));
                    }

                    let Some(end) = self.element_end(&src[..]) else {
                        return Ok(None);
                    };

                    let frame = src.split_to(end);
                    self.scan = Scan::default();
                    self.state = State::Separator;

                    let record = serde_json::from_slice::<Record>(&frame)
                        .map_err(|e| EtlError::decode(format!("failed to decode JSON item: {}", e)))?;
                    return Ok(Some(record));
                },
                State::Separator => {
                    match next {
                        b',' => self.state = State::NextElement,
                        b']' => self.state = State::Done,
                        other => {
                            return Err(EtlError::decode(format!(
                                "expected ',' or ']' after array item, found '{}'",
                                char::from(other)
                            )))
                        },
                    }
                    src.advance(1);
                },
                State::Done => {
                    return Err(EtlError::decode("unexpected data after end of JSON array"));
                },
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Record>, EtlError> {
        if let Some(record) = self.decode(src)? {
            return Ok(Some(record));
        }

        if self.state != State::Done {
            return Err(EtlError::decode("failed to read end of JSON array"));
        }

        Ok(None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_all(chunks: &[&str]) -> Result<Vec<Record>, EtlError> {
        let mut decoder = JsonArrayDecoder::new();
        let mut buf = BytesMut::new();
        let mut out = Vec::new();

        for chunk in chunks {
            buf.extend_from_slice(chunk.as_bytes());
            while let Some(record) = decoder.decode(&mut buf)? {
                out.push(record);
            }
        }
        while let Some(record) = decoder.decode_eof(&mut buf)? {
            out.push(record);
        }
        Ok(out)
    }

    #[test]
    fn test_decodes_whole_array() {
        let records = decode_all(&[r#"[{"name":"Alice","age":30}, {"name":"Bob","age":25}]"#]).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], json!("Alice"));
        assert_eq!(records[1]["age"], json!(25));
    }

    #[test]
    fn test_element_split_across_chunks() {
        let records = decode_all(&[
            " [ {\"tags\": [\"a\", \"b",
            "]\"], \"note\": \"brace } inside \\\" string\"}",
            " ,{\"nested\": {\"deep\": [1, {\"x\": 2}]}} ]\n",
        ])
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["tags"], json!(["a", "b]"]));
        assert_eq!(records[0]["note"], json!("brace } inside \" string"));
        assert_eq!(records[1]["nested"]["deep"][1]["x"], json!(2));
    }

    #[test]
    fn test_empty_array() {
        assert!(decode_all(&["[ ]"]).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(decode_all(&[r#"{"not":"an array"}"#]).is_err());
        assert!(decode_all(&["[1, 2]"]).is_err());
        assert!(decode_all(&[r#"[{"a":1} {"b":2}]"#]).is_err());
        assert!(decode_all(&[r#"[{"a":1},]"#]).is_err());
        assert!(decode_all(&[r#"[{"a":1}] trailing"#]).is_err());
    }

    #[test]
    fn test_truncated_body_fails_at_eof() {
        let err = decode_all(&[r#"[{"a":1}, {"b":"#]).unwrap_err();
        assert!(matches!(err, EtlError::Decode(_)));

        assert!(decode_all(&[""]).is_err());
    }
}
