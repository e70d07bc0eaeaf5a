//! Best-effort normalization of model output into JSON
//!
//! Agents are asked for structured replies but frequently wrap them in
//! markdown fences, leave trailing commas, forget quotes or stop mid-object.
//! `repair_json_output` never fails: it returns canonical JSON when any
//! repair attempt succeeds and the original text otherwise.

use regex::Regex;
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)```(?:json)?\s*([\s\S]*?)\s*```").expect("fenced block pattern is valid")
});

const MAX_DEPTH: usize = 256;

/// Repair potentially malformed JSON output from a model
pub fn repair_json_output(text: &str) -> String {
    if let Some(inner) = FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    {
        match serde_json::from_str::<Value>(inner) {
            Ok(value) => {
                if let Some(out) = canonical(&value) {
                    return out;
                }
            }
            Err(e) => {
                debug!("Fenced block is not strict JSON ({}), trying lenient repair", e);
                match parse_lenient(inner) {
                    Some(value) => {
                        if let Some(out) = canonical(&value) {
                            return out;
                        }
                    }
                    None => warn!("Failed to repair extracted JSON block"),
                }
            }
        }
    }

    if let Some(value) = parse_structured(text) {
        if let Some(out) = canonical(&value) {
            return out;
        }
    }

    debug!("Output is not repairable as JSON, keeping original text");
    text.to_string()
}

/// Parse text that is (or is nearly) a JSON object or array
///
/// Strict parsing is tried first, then the lenient pass. Text that does not
/// open with `{` or `[` is left alone.
pub fn parse_structured(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if !trimmed.starts_with(['{', '[']) {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Some(value),
        Err(_) => parse_lenient(trimmed),
    }
}

/// Lenient JSON parse
///
/// Accepts trailing or stray commas, unquoted keys and values, single
/// quotes, `//` and `/* */` comments, python-style literals and input that
/// is cut off before its closing brackets. The structure must start at the
/// first non-whitespace character and consume the whole input.
pub fn parse_lenient(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if !trimmed.starts_with(['{', '[']) {
        return None;
    }

    let mut parser = Lenient::new(trimmed);
    let value = parser.parse_value()?;
    parser.skip_insignificant();
    if parser.peek().is_some() {
        return None;
    }
    Some(value)
}

fn canonical(value: &Value) -> Option<String> {
    serde_json::to_string(value).ok()
}

struct Lenient {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Lenient {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Skip whitespace and comments
    fn skip_insignificant(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    while self.peek().is_some() {
                        if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn parse_value(&mut self) -> Option<Value> {
        self.skip_insignificant();
        match self.peek()? {
            '{' => self.parse_object(),
            '[' => self.parse_array(),
            q @ ('"' | '\'') => self.parse_string(q).map(Value::String),
            _ => Some(self.parse_bare_value()),
        }
    }

    fn parse_object(&mut self) -> Option<Value> {
        self.enter()?;
        self.pos += 1;
        let mut map = Map::new();

        loop {
            self.skip_insignificant();
            match self.peek() {
                // Truncated input: close what is open
                None => break,
                Some('}') | Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(',') => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }

            let key = self.parse_key()?;
            self.skip_insignificant();
            let value = if matches!(self.peek(), Some(':') | Some('=')) {
                self.pos += 1;
                self.skip_insignificant();
                match self.peek() {
                    None | Some(',') | Some('}') => Value::Null,
                    _ => self.parse_value()?,
                }
            } else {
                Value::Null
            };
            map.insert(key, value);
        }

        self.depth -= 1;
        Some(Value::Object(map))
    }

    fn parse_array(&mut self) -> Option<Value> {
        self.enter()?;
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_insignificant();
            match self.peek() {
                None => break,
                Some(']') | Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(',') => {
                    self.pos += 1;
                }
                _ => items.push(self.parse_value()?),
            }
        }

        self.depth -= 1;
        Some(Value::Array(items))
    }

    fn enter(&mut self) -> Option<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return None;
        }
        Some(())
    }

    fn parse_key(&mut self) -> Option<String> {
        match self.peek()? {
            q @ ('"' | '\'') => self.parse_string(q),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if matches!(c, ':' | '=' | ',' | '}' | ']' | '\n') {
                        break;
                    }
                    self.pos += 1;
                }
                Some(self.slice(start).trim().to_string())
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Option<String> {
        self.pos += 1;
        let mut out = String::new();

        while let Some(c) = self.bump() {
            if c == quote {
                return Some(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            match self.bump() {
                None => break,
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('b') => out.push('\u{0008}'),
                Some('f') => out.push('\u{000C}'),
                Some('u') => out.push(self.parse_unicode_escape()),
                Some(other) => out.push(other),
            }
        }

        // Unterminated string at end of input
        Some(out)
    }

    fn parse_unicode_escape(&mut self) -> char {
        let Some(high) = self.read_hex4() else {
            return char::REPLACEMENT_CHARACTER;
        };
        if (0xD800..0xDC00).contains(&high)
            && self.peek() == Some('\\')
            && self.peek_at(1) == Some('u')
        {
            let saved = self.pos;
            self.pos += 2;
            if let Some(low) = self.read_hex4() {
                if (0xDC00..0xE000).contains(&low) {
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER);
                }
            }
            self.pos = saved;
        }
        char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn read_hex4(&mut self) -> Option<u32> {
        let end = self.pos + 4;
        if end > self.chars.len() {
            return None;
        }
        let digits: String = self.chars[self.pos..end].iter().collect();
        let code = u32::from_str_radix(&digits, 16).ok()?;
        self.pos = end;
        Some(code)
    }

    fn parse_bare_value(&mut self) -> Value {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']' | '\n') {
                break;
            }
            // Trailing comment belongs to skip_insignificant
            if c == '/' && matches!(self.peek_at(1), Some('/') | Some('*')) {
                break;
            }
            self.pos += 1;
        }
        let token = self.slice(start);
        let token = token.trim();

        match token {
            "" | "null" | "None" | "undefined" => Value::Null,
            "true" | "True" => Value::Bool(true),
            "false" | "False" => Value::Bool(false),
            _ => parse_number(token)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(token.to_string())),
        }
    }

    fn slice(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }
}

fn parse_number(token: &str) -> Option<Number> {
    if let Ok(i) = token.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = token.parse::<u64>() {
        return Some(Number::from(u));
    }
    let looks_numeric = token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
    if !looks_numeric {
        return None;
    }
    token.parse::<f64>().ok().and_then(Number::from_f64)
}
