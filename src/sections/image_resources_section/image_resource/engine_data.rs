//! Engine data: the PDF-dictionary-like markup language Photoshop embeds in
//! type tool settings (`spec.md` §3.10 / §4.F).
//!
//! The format is a small recursive grammar of dicts (`<< /key value ... >>`),
//! arrays (`[ ... ]`), booleans, integers, decimals, UTF-16BE parenthesized
//! strings, and bare `/property` names, tokenized on whitespace with a
//! couple of irregular cases (parenthesized strings may contain whitespace;
//! `>>` may be followed by stray NUL padding bytes).

use std::fmt::Write as _;

use crate::error::EngineDataError;

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    DictStart,
    DictEnd,
    ArrayStart,
    ArrayEnd,
    Property(&'a str),
    String(String),
    Boolean(bool),
    Integer(i64),
    Float(f64),
}

struct Tokenizer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(data: &'a [u8]) -> Self {
        Tokenizer { data, index: 0 }
    }

    fn skip_whitespace(&mut self) {
        while self.index < self.data.len() && matches!(self.data[self.index], b' ' | b'\t' | b'\n' | b'\r') {
            self.index += 1;
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, EngineDataError> {
        self.skip_whitespace();
        if self.index >= self.data.len() {
            return Ok(None);
        }

        match self.data[self.index] {
            b'<' if self.data[self.index..].starts_with(b"<<") => {
                self.index += 2;
                Ok(Some(Token::DictStart))
            }
            b'>' => {
                // `>>` may trail with stray NUL padding bytes.
                if !self.data[self.index..].starts_with(b">>") {
                    return Err(EngineDataError::UnexpectedToken {
                        found: format!("{:?}", self.data[self.index]),
                    });
                }
                self.index += 2;
                while self.index < self.data.len() && self.data[self.index] == 0 {
                    self.index += 1;
                }
                Ok(Some(Token::DictEnd))
            }
            b'[' => {
                self.index += 1;
                Ok(Some(Token::ArrayStart))
            }
            b']' => {
                self.index += 1;
                Ok(Some(Token::ArrayEnd))
            }
            b'/' => {
                let start = self.index + 1;
                let mut end = start;
                while end < self.data.len()
                    && !matches!(self.data[end], b' ' | b'\t' | b'\n' | b'\r' | b'/' | b'[' | b']' | b'<' | b'>' | b'(' | b')')
                {
                    end += 1;
                }
                self.index = end;
                let name = std::str::from_utf8(&self.data[start..end])
                    .map_err(|_| EngineDataError::UnexpectedToken { found: "non-utf8 property".into() })?;
                Ok(Some(Token::Property(name)))
            }
            b'(' => {
                // Parenthesized UTF-16BE string, possibly with a leading
                // byte-order-mark and escaped parens/backslashes.
                let start = self.index + 1;
                let mut end = start;
                let mut depth = 0;
                loop {
                    if end >= self.data.len() {
                        return Err(EngineDataError::UnterminatedString);
                    }
                    match self.data[end] {
                        b'\\' => end += 2,
                        b'(' => {
                            depth += 1;
                            end += 1;
                        }
                        b')' if depth > 0 => {
                            depth -= 1;
                            end += 1;
                        }
                        b')' => break,
                        _ => end += 1,
                    }
                }
                let raw = &self.data[start..end];
                self.index = end + 1;
                Ok(Some(Token::String(decode_engine_string(raw))))
            }
            b'-' | b'0'..=b'9' => {
                let start = self.index;
                let mut end = start;
                if self.data[end] == b'-' {
                    end += 1;
                }
                let mut is_float = false;
                while end < self.data.len() && (self.data[end].is_ascii_digit() || self.data[end] == b'.') {
                    if self.data[end] == b'.' {
                        is_float = true;
                    }
                    end += 1;
                }
                self.index = end;
                let text = std::str::from_utf8(&self.data[start..end]).unwrap();
                if is_float {
                    let value: f64 = text
                        .parse()
                        .map_err(|_| EngineDataError::UnexpectedToken { found: text.into() })?;
                    Ok(Some(Token::Float(value)))
                } else {
                    let value: i64 = text
                        .parse()
                        .map_err(|_| EngineDataError::UnexpectedToken { found: text.into() })?;
                    Ok(Some(Token::Integer(value)))
                }
            }
            b't' if self.data[self.index..].starts_with(b"true") => {
                self.index += 4;
                Ok(Some(Token::Boolean(true)))
            }
            b'f' if self.data[self.index..].starts_with(b"false") => {
                self.index += 5;
                Ok(Some(Token::Boolean(false)))
            }
            other => Err(EngineDataError::UnexpectedToken {
                found: format!("{:?}", other as char),
            }),
        }
    }
}

fn decode_engine_string(raw: &[u8]) -> String {
    // Strip a leading UTF-16BE byte order mark if present, unescape
    // backslash-escaped parens, then decode as UTF-16BE.
    let raw = raw.strip_prefix(&[0xFE, 0xFF]).unwrap_or(raw);
    let mut unescaped = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && i + 1 < raw.len() && matches!(raw[i + 1], b'(' | b')' | b'\\') {
            unescaped.push(raw[i + 1]);
            i += 2;
        } else {
            unescaped.push(raw[i]);
            i += 1;
        }
    }
    let units: Vec<u16> = unescaped
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn encode_engine_string(value: &str) -> Vec<u8> {
    let mut out = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        let bytes = unit.to_be_bytes();
        for b in bytes {
            if b == b'(' || b == b')' || b == b'\\' {
                out.push(b'\\');
            }
            out.push(b);
        }
    }
    out
}

/// A parsed engine-data value: dict, array or scalar leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineValue {
    Dict(Vec<(String, EngineValue)>),
    Array(Vec<EngineValue>),
    String(String),
    Boolean(bool),
    Integer(i64),
    Float(f64),
}

impl EngineValue {
    /// Parse a top-level engine data dict from its raw markup bytes.
    pub fn parse(data: &[u8]) -> Result<EngineValue, EngineDataError> {
        let mut tokenizer = Tokenizer::new(data);
        let value = parse_value(&mut tokenizer)?;
        Ok(value)
    }

    /// Render back to the on-wire markup text.
    pub fn render(&self) -> Vec<u8> {
        let mut out = String::new();
        write_value(self, 0, &mut out);
        out.into_bytes()
    }

    /// Look up a dict entry by property name (does nothing on non-dicts).
    pub fn get(&self, key: &str) -> Option<&EngineValue> {
        match self {
            EngineValue::Dict(items) => items.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

fn parse_value(tokenizer: &mut Tokenizer) -> Result<EngineValue, EngineDataError> {
    match tokenizer.next_token()?.ok_or(EngineDataError::UnexpectedEof)? {
        Token::DictStart => parse_dict(tokenizer),
        Token::ArrayStart => parse_array(tokenizer),
        Token::String(s) => Ok(EngineValue::String(s)),
        Token::Boolean(b) => Ok(EngineValue::Boolean(b)),
        Token::Integer(n) => Ok(EngineValue::Integer(n)),
        Token::Float(f) => Ok(EngineValue::Float(f)),
        other => Err(EngineDataError::UnexpectedToken {
            found: format!("{:?}", other),
        }),
    }
}

fn parse_dict(tokenizer: &mut Tokenizer) -> Result<EngineValue, EngineDataError> {
    let mut items = Vec::new();
    loop {
        match tokenizer.next_token()?.ok_or(EngineDataError::UnexpectedEof)? {
            Token::DictEnd => return Ok(EngineValue::Dict(items)),
            Token::Property(name) => {
                let value = parse_value(tokenizer)?;
                items.push((name.to_string(), value));
            }
            other => {
                return Err(EngineDataError::UnexpectedToken {
                    found: format!("{:?}", other),
                })
            }
        }
    }
}

fn parse_array(tokenizer: &mut Tokenizer) -> Result<EngineValue, EngineDataError> {
    let mut items = Vec::new();
    loop {
        match tokenizer.next_token()?.ok_or(EngineDataError::UnexpectedEof)? {
            Token::ArrayEnd => return Ok(EngineValue::Array(items)),
            Token::DictStart => items.push(parse_dict(tokenizer)?),
            Token::ArrayStart => items.push(parse_array(tokenizer)?),
            Token::String(s) => items.push(EngineValue::String(s)),
            Token::Boolean(b) => items.push(EngineValue::Boolean(b)),
            Token::Integer(n) => items.push(EngineValue::Integer(n)),
            Token::Float(f) => items.push(EngineValue::Float(f)),
            other => {
                return Err(EngineDataError::UnexpectedToken {
                    found: format!("{:?}", other),
                })
            }
        }
    }
}

fn write_value(value: &EngineValue, indent: usize, out: &mut String) {
    match value {
        EngineValue::Dict(items) => {
            out.push_str("<<\n");
            for (key, v) in items {
                write_indent(indent + 1, out);
                let _ = write!(out, "/{} ", key);
                write_value(v, indent + 1, out);
                out.push('\n');
            }
            write_indent(indent, out);
            out.push_str(">>");
        }
        EngineValue::Array(items) => {
            out.push('[');
            for item in items {
                out.push(' ');
                write_value(item, indent, out);
            }
            out.push_str(" ]");
        }
        EngineValue::String(s) => {
            let encoded = encode_engine_string(s);
            out.push('(');
            for byte in encoded {
                out.push(byte as char);
            }
            out.push(')');
        }
        EngineValue::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        EngineValue::Integer(n) => {
            let _ = write!(out, "{}", n);
        }
        EngineValue::Float(f) => {
            let _ = write!(out, "{}", f);
        }
    }
}

fn write_indent(indent: usize, out: &mut String) {
    for _ in 0..indent {
        out.push('\t');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_dict() {
        let markup = b"<<\n/Text (\xfe\xffhi)\n/Size 12\n>>";
        let value = EngineValue::parse(markup).unwrap();
        assert_eq!(value.get("Text"), Some(&EngineValue::String("hi".into())));
        assert_eq!(value.get("Size"), Some(&EngineValue::Integer(12)));
    }

    #[test]
    fn parses_nested_dict_and_array() {
        let markup = b"<<\n/Font\n<<\n/Name (\xfe\xffHelvetica)\n/Values [ 1.0 0.0 0.5 ]\n>>\n>>";
        let value = EngineValue::parse(markup).unwrap();
        let font = value.get("Font").unwrap();
        assert_eq!(font.get("Name"), Some(&EngineValue::String("Helvetica".into())));
        assert_eq!(
            font.get("Values"),
            Some(&EngineValue::Array(vec![
                EngineValue::Float(1.0),
                EngineValue::Float(0.0),
                EngineValue::Float(0.5),
            ]))
        );
    }

    #[test]
    fn round_trips_through_render_and_reparse() {
        let markup = b"<<\n/Editor\n<<\n/Text (\xfe\xffedited)\n>>\n/Enabled true\n>>";
        let value = EngineValue::parse(markup).unwrap();
        let rendered = value.render();
        let reparsed = EngineValue::parse(&rendered).unwrap();
        assert_eq!(value, reparsed);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let markup = b"<<\n/Text (\xfe\xffoops\n>>";
        assert_eq!(EngineValue::parse(markup), Err(EngineDataError::UnterminatedString));
    }
}
