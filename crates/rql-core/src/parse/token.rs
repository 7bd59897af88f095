use crate::{stmt::Value, Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,

    /// Byte offset in the query text
    pub(crate) offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Word(String),
    Number(Value),
    String(String),
    Arg(String),
    Comma,
    Colon,
    LParen,
    RParen,
    Question,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
}

impl Token {
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        match &self.kind {
            TokenKind::Word(word) => word.eq_ignore_ascii_case(keyword),
            _ => false,
        }
    }
}

pub(crate) fn tokenize(text: &str) -> Result<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut toks = vec![];
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos];

        let kind = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
                continue;
            }
            b',' => single(&mut pos, TokenKind::Comma),
            b':' => single(&mut pos, TokenKind::Colon),
            b'(' => single(&mut pos, TokenKind::LParen),
            b')' => single(&mut pos, TokenKind::RParen),
            b'?' => single(&mut pos, TokenKind::Question),
            b'+' => single(&mut pos, TokenKind::Plus),
            b'-' => single(&mut pos, TokenKind::Minus),
            b'*' => single(&mut pos, TokenKind::Star),
            b'/' => single(&mut pos, TokenKind::Slash),
            b'=' => single(&mut pos, TokenKind::Eq),
            b'!' if bytes.get(pos + 1) == Some(&b'=') => {
                pos += 2;
                TokenKind::Ne
            }
            b'<' => match bytes.get(pos + 1) {
                Some(b'=') => {
                    pos += 2;
                    TokenKind::Le
                }
                Some(b'>') => {
                    pos += 2;
                    TokenKind::Ne
                }
                _ => single(&mut pos, TokenKind::Lt),
            },
            b'>' => match bytes.get(pos + 1) {
                Some(b'=') => {
                    pos += 2;
                    TokenKind::Ge
                }
                _ => single(&mut pos, TokenKind::Gt),
            },
            b'"' | b'\'' => {
                let (value, end) = string(text, pos)?;
                pos = end;
                TokenKind::String(value)
            }
            b'%' => {
                let (name, end) = arg(text, pos)?;
                pos = end;
                TokenKind::Arg(name)
            }
            b'0'..=b'9' => {
                let (value, end) = number(text, pos)?;
                pos = end;
                TokenKind::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                TokenKind::Word(text[start..pos].to_string())
            }
            _ => {
                let c = text[pos..].chars().next().unwrap_or('?');
                return Err(Error::syntax(format!("unexpected character `{c}`"), pos));
            }
        };

        toks.push(Token {
            kind,
            offset: start,
        });
    }

    Ok(toks)
}

fn single(pos: &mut usize, kind: TokenKind) -> TokenKind {
    *pos += 1;
    kind
}

fn string(text: &str, start: usize) -> Result<(String, usize)> {
    let quote = text.as_bytes()[start] as char;
    let mut value = String::new();
    let mut chars = text[start + 1..].char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, c)) => value.push(c),
                None => break,
            },
            c if c == quote => return Ok((value, start + 1 + i + 1)),
            c => value.push(c),
        }
    }

    Err(Error::syntax("unterminated string", start))
}

fn arg(text: &str, start: usize) -> Result<(String, usize)> {
    let rest = &text[start..];
    if let Some(inner) = rest.strip_prefix("%(") {
        if let Some(end) = inner.find(")s") {
            let name = &inner[..end];
            if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Ok((name.to_string(), start + 2 + end + 2));
            }
        }
    }
    Err(Error::syntax("invalid argument, expected `%(name)s`", start))
}

fn number(text: &str, start: usize) -> Result<(Value, usize)> {
    let bytes = text.as_bytes();
    let mut pos = start;
    let mut float = false;

    while pos < bytes.len() {
        match bytes[pos] {
            b'0'..=b'9' => pos += 1,
            b'.' if !float && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                float = true;
                pos += 1;
            }
            _ => break,
        }
    }

    let src = &text[start..pos];
    let value = if float {
        src.parse::<f64>().map(Value::F64).ok()
    } else {
        src.parse::<i64>().map(Value::I64).ok()
    };

    match value {
        Some(value) => Ok((value, pos)),
        None => Err(Error::syntax(format!("invalid number `{src}`"), start)),
    }
}
