/// KSON lexer and recursive-descent parser.
///
/// KSON is a human-friendly JSON superset:
/// - `#` line comments
/// - commas optional inside objects and lists (newline-separated entries)
/// - bare (unquoted) keys and bare string values
/// - brace-free root objects (`key: value` lines without enclosing `{}`)
/// - dash lists (`- item` per line)
/// - embed blocks: `%tag`, raw content lines, closed by a `%%` line
///
/// Parsing never panics and never returns `Err`: problems become
/// `Diagnostic`s on the result, with `tree: None` when no tree could be
/// built. The token stream is produced even when the parse fails, and
/// always ends with an `Eof` sentinel token.
use tracing::debug;

use crate::value::{EmbedBlock, Location, ObjectMap, Value, ValueKind};

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Dash,
    String,
    Number,
    Bool,
    Null,
    /// A bare word used as a key or an unquoted string value.
    Ident,
    /// A `%tag ... %%` block; `text` holds the raw block including delimiters.
    Embed,
    /// End-of-input sentinel, always the last token.
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Unescaped content for strings, raw lexeme otherwise.
    pub text: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ParseResult {
    pub tree: Option<Value>,
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a KSON document.
pub fn parse(text: &str) -> ParseResult {
    let mut lexer = Lexer::new(text);
    lexer.run();
    let Lexer {
        tokens,
        mut diagnostics,
        ..
    } = lexer;

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        diagnostics: &mut diagnostics,
    };
    let tree = parser.parse_document();
    if tree.is_none() {
        debug!(count = diagnostics.len(), "parse produced no tree");
    }

    ParseResult {
        tree,
        tokens,
        diagnostics,
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

const STRUCTURAL: &[char] = &['{', '}', '[', ']', ',', ':', '#', '"', '\''];

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<char>,
    /// Byte offset of each char, plus a final entry holding `src.len()`.
    offsets: Vec<usize>,
    i: usize,
    line: u32,
    col: u32,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

/// A captured lexer position: (line, column, char index).
#[derive(Clone, Copy)]
struct Mark {
    line: u32,
    col: u32,
    i: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut chars = Vec::new();
        let mut offsets = Vec::new();
        for (off, ch) in src.char_indices() {
            offsets.push(off);
            chars.push(ch);
        }
        offsets.push(src.len());
        Lexer {
            src,
            chars,
            offsets,
            i: 0,
            line: 0,
            col: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.i).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.i + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.i += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn mark(&self) -> Mark {
        Mark {
            line: self.line,
            col: self.col,
            i: self.i,
        }
    }

    fn span(&self, start: Mark) -> Location {
        Location {
            start_line: start.line,
            start_column: start.col,
            end_line: self.line,
            end_column: self.col,
            start_offset: self.offsets[start.i],
            end_offset: self.offsets[self.i],
        }
    }

    fn raw(&self, start: Mark) -> &str {
        &self.src[self.offsets[start.i]..self.offsets[self.i]]
    }

    fn push(&mut self, kind: TokenKind, text: String, start: Mark) {
        let location = self.span(start);
        self.tokens.push(Token {
            kind,
            text,
            location,
        });
    }

    fn error(&mut self, message: impl Into<String>, start: Mark) {
        let location = self.span(start);
        self.diagnostics.push(Diagnostic {
            message: message.into(),
            location,
        });
    }

    fn run(&mut self) {
        loop {
            self.skip_trivia();
            let Some(ch) = self.peek() else { break };
            let start = self.mark();
            match ch {
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ':' => self.single(TokenKind::Colon),
                ',' => self.single(TokenKind::Comma),
                '"' | '\'' => self.lex_string(ch),
                '%' => self.lex_embed(),
                '-' if self.peek_at(1).is_none_or(char::is_whitespace) => {
                    self.bump();
                    self.push(TokenKind::Dash, "-".into(), start);
                }
                _ => self.lex_bare(),
            }
        }
        let start = self.mark();
        self.push(TokenKind::Eof, String::new(), start);
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.mark();
        let ch = self.bump().unwrap_or_default();
        self.push(kind, ch.to_string(), start);
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == '#' {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self, quote: char) {
        let start = self.mark();
        self.bump(); // opening quote
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.error("unterminated string", start);
                    break;
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') => out.push('\n'),
                        Some('r') => out.push('\r'),
                        Some('t') => out.push('\t'),
                        Some('u') => {
                            let mut hex = String::new();
                            for _ in 0..4 {
                                if let Some(h) = self.peek().filter(char::is_ascii_hexdigit) {
                                    hex.push(h);
                                    self.bump();
                                }
                            }
                            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                                Some(c) => out.push(c),
                                None => self.error("invalid unicode escape", start),
                            }
                        }
                        Some(other) => out.push(other),
                        None => {
                            self.error("unterminated string", start);
                            break;
                        }
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.bump();
                }
            }
        }
        self.push(TokenKind::String, out, start);
    }

    /// `%tag` line, raw content lines, then a line whose content is `%%`.
    fn lex_embed(&mut self) {
        let start = self.mark();
        self.bump(); // '%'
        // Tag runs to end of line.
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
        let mut closed = false;
        while self.peek().is_some() {
            self.bump(); // newline
            let line_start = self.i;
            while self.peek().is_some_and(|c| c != '\n') {
                self.bump();
            }
            let line: String = self.chars[line_start..self.i].iter().collect();
            if line.trim() == "%%" {
                closed = true;
                break;
            }
        }
        if !closed {
            self.error("unterminated embed block", start);
        }
        let raw = self.raw(start).to_string();
        self.push(TokenKind::Embed, raw, start);
    }

    fn lex_bare(&mut self) {
        let start = self.mark();
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && !STRUCTURAL.contains(&c))
        {
            self.bump();
        }
        let raw = self.raw(start).to_string();
        let kind = match raw.as_str() {
            "true" | "false" => TokenKind::Bool,
            "null" => TokenKind::Null,
            s if looks_like_number(s) => TokenKind::Number,
            _ => TokenKind::Ident,
        };
        self.push(kind, raw, start);
    }
}

fn looks_like_number(s: &str) -> bool {
    let rest = s.strip_prefix('-').unwrap_or(s);
    if rest.is_empty() {
        return false;
    }
    let (int_part, after_int) = split_digits(rest);
    if int_part.is_empty() {
        return false;
    }
    let after_frac = match after_int.strip_prefix('.') {
        Some(frac) => {
            let (digits, tail) = split_digits(frac);
            if digits.is_empty() {
                return false;
            }
            tail
        }
        None => after_int,
    };
    match after_frac.strip_prefix(['e', 'E']) {
        Some(exp) => {
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            let (digits, tail) = split_digits(exp);
            !digits.is_empty() && tail.is_empty()
        }
        None => after_frac.is_empty(),
    }
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    s.split_at(end)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        // The Eof sentinel guarantees this never runs off the end.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_ahead(&self, ahead: usize) -> TokenKind {
        self.tokens
            .get(self.pos + ahead)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error(&mut self, message: impl Into<String>) {
        let location = self.peek().location;
        self.diagnostics.push(Diagnostic {
            message: message.into(),
            location,
        });
    }

    fn parse_document(&mut self) -> Option<Value> {
        if self.peek_kind() == TokenKind::Eof {
            self.error("empty document");
            return None;
        }

        let tree = if self.at_member_start() {
            self.parse_plain_object()?
        } else {
            self.parse_value()?
        };

        if self.peek_kind() != TokenKind::Eof {
            self.error("unexpected trailing content");
            return None;
        }
        Some(tree)
    }

    /// `key ':'` at the current position marks an object member.
    fn at_member_start(&self) -> bool {
        let key_kind = matches!(
            self.peek_kind(),
            TokenKind::Ident
                | TokenKind::String
                | TokenKind::Number
                | TokenKind::Bool
                | TokenKind::Null
        );
        key_kind && self.peek_ahead(1) == TokenKind::Colon
    }

    /// A brace-free root object: members until end of input.
    fn parse_plain_object(&mut self) -> Option<Value> {
        let start = self.peek().location;
        let mut map = ObjectMap::new();
        let mut end = start;
        while self.peek_kind() != TokenKind::Eof {
            let (key, value) = self.parse_member()?;
            end = value.location;
            map.insert(key, value);
        }
        Some(Value::new(ValueKind::Object(map), merge(start, end)))
    }

    /// `key ':' value`, followed by an optional comma.
    fn parse_member(&mut self) -> Option<(String, Value)> {
        if !self.at_member_start() {
            self.error("expected a `key: value` member");
            return None;
        }
        let key = self.next().text;
        self.next(); // colon
        let value = self.parse_value()?;
        if self.peek_kind() == TokenKind::Comma {
            self.next();
        }
        Some((key, value))
    }

    fn parse_value(&mut self) -> Option<Value> {
        match self.peek_kind() {
            TokenKind::LBrace => self.parse_object(),
            TokenKind::LBracket => self.parse_list(),
            TokenKind::Dash => self.parse_dash_list(),
            TokenKind::String => {
                let tok = self.next();
                Some(Value::new(ValueKind::String(tok.text), tok.location))
            }
            TokenKind::Ident => {
                let tok = self.next();
                Some(Value::new(ValueKind::String(tok.text), tok.location))
            }
            TokenKind::Number => {
                let tok = self.next();
                Some(Value::new(ValueKind::Number(tok.text), tok.location))
            }
            TokenKind::Bool => {
                let tok = self.next();
                let b = tok.text == "true";
                Some(Value::new(ValueKind::Bool(b), tok.location))
            }
            TokenKind::Null => {
                let tok = self.next();
                Some(Value::new(ValueKind::Null, tok.location))
            }
            TokenKind::Embed => {
                let tok = self.next();
                let embed = embed_from_raw(&tok.text);
                Some(Value::new(ValueKind::Embed(embed), tok.location))
            }
            TokenKind::RBrace | TokenKind::RBracket | TokenKind::Colon | TokenKind::Comma => {
                self.error("expected a value");
                None
            }
            TokenKind::Eof => {
                self.error("expected a value, found end of input");
                None
            }
        }
    }

    fn parse_object(&mut self) -> Option<Value> {
        let start = self.next().location; // '{'
        let mut map = ObjectMap::new();
        loop {
            match self.peek_kind() {
                TokenKind::RBrace => {
                    let end = self.next().location;
                    return Some(Value::new(ValueKind::Object(map), merge(start, end)));
                }
                TokenKind::Eof => {
                    self.error("unterminated object");
                    return None;
                }
                _ => {
                    let (key, value) = self.parse_member()?;
                    map.insert(key, value);
                }
            }
        }
    }

    fn parse_list(&mut self) -> Option<Value> {
        let start = self.next().location; // '['
        let mut items = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::RBracket => {
                    let end = self.next().location;
                    return Some(Value::new(ValueKind::List(items), merge(start, end)));
                }
                TokenKind::Comma => {
                    self.next();
                }
                TokenKind::Eof => {
                    self.error("unterminated list");
                    return None;
                }
                _ => items.push(self.parse_value()?),
            }
        }
    }

    /// One or more `- value` entries.
    fn parse_dash_list(&mut self) -> Option<Value> {
        let start = self.peek().location;
        let mut items = Vec::new();
        let mut end = start;
        while self.peek_kind() == TokenKind::Dash {
            self.next();
            if self.peek_kind() == TokenKind::Dash {
                self.error("expected a value after `-`");
                return None;
            }
            let value = self.parse_value()?;
            end = value.location;
            items.push(value);
        }
        Some(Value::new(ValueKind::List(items), merge(start, end)))
    }
}

fn merge(start: Location, end: Location) -> Location {
    Location {
        start_line: start.start_line,
        start_column: start.start_column,
        end_line: end.end_line,
        end_column: end.end_column,
        start_offset: start.start_offset,
        end_offset: end.end_offset,
    }
}

fn embed_from_raw(raw: &str) -> EmbedBlock {
    let mut lines = raw.lines();
    let tag = lines
        .next()
        .unwrap_or("")
        .trim_start_matches('%')
        .trim()
        .to_string();
    let mut content: Vec<&str> = lines.collect();
    if content.last().is_some_and(|l| l.trim() == "%%") {
        content.pop();
    }
    EmbedBlock {
        tag,
        content: content.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(text: &str) -> Value {
        let result = parse(text);
        assert!(
            result.tree.is_some(),
            "expected a tree for {text:?}, got diagnostics {:?}",
            result.diagnostics
        );
        result.tree.unwrap()
    }

    #[test]
    fn parses_json_object() {
        let v = tree(r#"{"name": "kson", "count": 3}"#);
        assert_eq!(v.get("name").and_then(Value::as_str), Some("kson"));
        assert_eq!(v.get("count").and_then(Value::as_number_text), Some("3"));
    }

    #[test]
    fn parses_brace_free_root_object() {
        let v = tree("name: kson\ncount: 3\n");
        let map = v.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(v.get("name").and_then(Value::as_str), Some("kson"));
    }

    #[test]
    fn commas_are_optional() {
        let v = tree("{a: 1\n b: 2, c: 3}");
        assert_eq!(v.as_object().unwrap().len(), 3);
    }

    #[test]
    fn comments_are_skipped() {
        let v = tree("# header\nname: x # trailing\n");
        assert_eq!(v.get("name").and_then(Value::as_str), Some("x"));
    }

    #[test]
    fn parses_dash_list() {
        let v = tree("- one\n- 2\n- true\n");
        let items = v.as_list().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_str(), Some("one"));
        assert_eq!(items[1].as_number_text(), Some("2"));
        assert_eq!(items[2].as_bool(), Some(true));
    }

    #[test]
    fn parses_bracket_list_without_commas() {
        let v = tree("[1 2 3]");
        assert_eq!(v.as_list().unwrap().len(), 3);
    }

    #[test]
    fn number_keeps_lexical_form() {
        let v = tree("ratio: 1.50\n");
        assert_eq!(v.get("ratio").and_then(Value::as_number_text), Some("1.50"));
    }

    #[test]
    fn parses_embed_block() {
        let v = tree("script: %sql\nselect 1;\nselect 2;\n%%\n");
        let embed = match &v.get("script").unwrap().kind {
            ValueKind::Embed(e) => e,
            other => panic!("expected embed, got {other:?}"),
        };
        assert_eq!(embed.tag, "sql");
        assert_eq!(embed.content, "select 1;\nselect 2;");
    }

    #[test]
    fn quoted_strings_unescape() {
        let v = tree(r#"{msg: "a\nbA"}"#);
        assert_eq!(v.get("msg").and_then(Value::as_str), Some("a\nbA"));
    }

    #[test]
    fn single_quoted_strings() {
        let v = tree("{msg: 'hi there'}");
        assert_eq!(v.get("msg").and_then(Value::as_str), Some("hi there"));
    }

    #[test]
    fn missing_value_fails_with_diagnostic() {
        let result = parse("status:");
        assert!(result.tree.is_none());
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn unterminated_object_fails() {
        let result = parse("{a: 1");
        assert!(result.tree.is_none());
    }

    #[test]
    fn empty_document_has_no_tree() {
        let result = parse("   \n# only a comment\n");
        assert!(result.tree.is_none());
    }

    #[test]
    fn tokens_end_with_eof_sentinel() {
        let result = parse("a: 1");
        assert_eq!(result.tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn token_locations_are_zero_based() {
        let result = parse("key: value");
        let colon = result
            .tokens
            .iter()
            .find(|t| t.kind == TokenKind::Colon)
            .unwrap();
        assert_eq!(colon.location.start_line, 0);
        assert_eq!(colon.location.start_column, 3);
        assert_eq!(colon.location.end_column, 4);
    }

    #[test]
    fn value_locations_cover_source() {
        let v = tree("{a: [1, 2]}");
        assert_eq!(v.location.start_offset, 0);
        assert_eq!(v.location.end_offset, 11);
        let list = v.get("a").unwrap();
        assert_eq!(list.location.start_offset, 4);
        assert_eq!(list.location.end_offset, 10);
    }

    #[test]
    fn negative_number_vs_dash_list() {
        let v = tree("[-5]");
        assert_eq!(v.as_list().unwrap()[0].as_number_text(), Some("-5"));
        let v = tree("- 5");
        assert_eq!(v.as_list().unwrap()[0].as_number_text(), Some("5"));
    }

    #[test]
    fn nested_structures() {
        let v = tree("server: {host: localhost, ports: [80, 443]}\n");
        let ports = v.get("server").unwrap().get("ports").unwrap();
        assert_eq!(ports.as_list().unwrap().len(), 2);
    }

    #[test]
    fn number_classification() {
        assert!(looks_like_number("0"));
        assert!(looks_like_number("-12"));
        assert!(looks_like_number("3.14"));
        assert!(looks_like_number("1e10"));
        assert!(looks_like_number("-2.5E-3"));
        assert!(!looks_like_number("1."));
        assert!(!looks_like_number("abc"));
        assert!(!looks_like_number("1x"));
        assert!(!looks_like_number("-"));
    }
}
