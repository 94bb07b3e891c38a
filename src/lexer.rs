use crate::error::TokenizationError;
use crate::utils::line_and_column;
use crate::value::IntegerBase;
use miette::NamedSource;
use std::sync::Arc;

/// Represents the different kinds of tokens that the lexer can produce.
/// Each token is a meaningful unit of the document syntax.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    /// A comment, starting with `#` and continuing to the end of the line.
    /// The associated `String` contains the content of the comment.
    Comment(String),
    /// A line break (`\n` or `\r\n`). Statement boundaries are significant,
    /// so line breaks are tokens rather than skipped whitespace.
    EndOfLine,
    /// Equals: `=`
    Assignment,
    /// Dot: `.` (joins the segments of a dotted key)
    KeyJoin,
    /// Comma: `,`
    Separator,

    // == Raw bracket tokens ==
    // These exist only between the lexer and the disambiguator; the grammar
    // parser never sees them.
    /// A single `[` whose meaning is still unresolved.
    LeftBracket,
    /// A single `]` whose meaning is still unresolved.
    RightBracket,
    /// A `[[` pair whose meaning is still unresolved.
    DoubleLeftBracket,
    /// A `]]` pair whose meaning is still unresolved.
    DoubleRightBracket,

    // == Disambiguated bracket tokens ==
    /// `[` opening a table header.
    TableBegin,
    /// `]` closing a table header.
    TableEnd,
    /// `[` opening an array value.
    ArrayBegin,
    /// `]` closing an array value.
    ArrayEnd,
    /// `[[` opening a table-array header.
    TableArrayBegin,
    /// `]]` closing a table-array header.
    TableArrayEnd,

    /// Left Brace: `{`
    InlineTableBegin,
    /// Right Brace: `}`
    InlineTableEnd,

    // == Literals ==
    /// An unquoted key, restricted to ASCII letters, digits, `_` and `-`.
    BareString(String),
    /// A single-line string literal, basic (`"..."`, escapes processed) or
    /// literal (`'...'`, verbatim). The content is already unescaped.
    String(String),
    /// A multiline string literal (`"""..."""` or `'''...'''`) with the
    /// leading newline stripped and internal line endings normalized.
    MultilineString(String),
    /// An integer literal. The base it was written in is retained for
    /// display fidelity only.
    Integer { value: i64, base: IntegerBase },
    /// A float literal. `special` marks `inf`, `-inf` and `nan`.
    Float { value: f64, special: bool },
    /// A boolean literal, `true` or `false`.
    Boolean(bool),
}

/// A token with its type and position
#[derive(Debug, Clone)]
pub struct Token {
    pub ttype: TokenType,
    pub pos_start: usize,
    pub pos_end: usize,
}

impl Token {
    pub fn new(ttype: TokenType, pos_start: usize, pos_end: usize) -> Token {
        Token {
            ttype,
            pos_start,
            pos_end,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    src: Arc<NamedSource<String>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_name(input, "document.toml".to_string())
    }

    pub fn with_name(input: &'a str, name: String) -> Self {
        Self {
            input,
            position: 0,
            src: Arc::new(NamedSource::new(name, input.to_string())),
        }
    }

    /// Splits the whole input into tokens, or fails at the first offset where
    /// no lexical pattern matches.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, TokenizationError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_inline_whitespace();
            if self.position >= self.input.len() {
                break;
            }
            let start = self.position;
            let ttype = self.next_token()?;
            tokens.push(Token::new(ttype, start, self.position));
        }
        log::trace!(
            "tokenized {} bytes into {} tokens",
            self.input.len(),
            tokens.len()
        );
        Ok(tokens)
    }

    // The patterns overlap (a bare numeral is a prefix of both an integer and
    // a bare key; `"""` starts with `"`), so the order below is part of the
    // language definition and must not be rearranged.
    fn next_token(&mut self) -> Result<TokenType, TokenizationError> {
        if let Some(t) = self.read_comment() {
            return Ok(t);
        }
        if let Some(t) = self.read_end_of_line() {
            return Ok(t);
        }
        if let Some(t) = self.read_punctuation() {
            return Ok(t);
        }
        if let Some(t) = self.read_boolean() {
            return Ok(t);
        }
        if let Some(t) = self.read_special_float() {
            return Ok(t);
        }
        if let Some(t) = self.read_float() {
            return Ok(t);
        }
        if let Some(t) = self.read_prefixed_integer() {
            return Ok(t);
        }
        if let Some(t) = self.read_decimal_integer() {
            return Ok(t);
        }
        if let Some(t) = self.read_bare_key() {
            return Ok(t);
        }
        if let Some(t) = self.read_multiline_basic() {
            return Ok(t);
        }
        if let Some(t) = self.read_multiline_literal() {
            return Ok(t);
        }
        if let Some(t) = self.read_basic_string() {
            return Ok(t);
        }
        if let Some(t) = self.read_literal_string() {
            return Ok(t);
        }
        Err(self.no_match_error())
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn bump(&mut self, len: usize) {
        self.position += len;
    }

    fn skip_inline_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches(|c: char| c == ' ' || c == '\t');
        self.position += rest.len() - trimmed.len();
    }

    fn is_bare_key_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    }

    /// True when the text continues with a bare-key character at `at`,
    /// meaning a shorter literal ending there would split a word.
    fn continues_bare_key(rest: &str, at: usize) -> bool {
        rest[at..].chars().next().is_some_and(Self::is_bare_key_char)
    }

    fn read_comment(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        let body = rest.strip_prefix('#')?;
        let len = body.find('\n').unwrap_or(body.len());
        let text = body[..len].trim().to_string();
        self.bump(1 + len);
        Some(TokenType::Comment(text))
    }

    fn read_end_of_line(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        if rest.starts_with("\r\n") {
            self.bump(2);
            Some(TokenType::EndOfLine)
        } else if rest.starts_with('\n') {
            self.bump(1);
            Some(TokenType::EndOfLine)
        } else {
            None
        }
    }

    fn read_punctuation(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        // Double brackets before single ones; both stay raw until the
        // disambiguator decides what they mean.
        let (ttype, len) = if rest.starts_with('=') {
            (TokenType::Assignment, 1)
        } else if rest.starts_with('.') {
            (TokenType::KeyJoin, 1)
        } else if rest.starts_with("[[") {
            (TokenType::DoubleLeftBracket, 2)
        } else if rest.starts_with("]]") {
            (TokenType::DoubleRightBracket, 2)
        } else if rest.starts_with('[') {
            (TokenType::LeftBracket, 1)
        } else if rest.starts_with(']') {
            (TokenType::RightBracket, 1)
        } else if rest.starts_with('{') {
            (TokenType::InlineTableBegin, 1)
        } else if rest.starts_with('}') {
            (TokenType::InlineTableEnd, 1)
        } else if rest.starts_with(',') {
            (TokenType::Separator, 1)
        } else {
            return None;
        };
        self.bump(len);
        Some(ttype)
    }

    fn read_boolean(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        for (word, value) in [("true", true), ("false", false)] {
            if rest.starts_with(word) && !Self::continues_bare_key(rest, word.len()) {
                self.bump(word.len());
                return Some(TokenType::Boolean(value));
            }
        }
        None
    }

    fn read_special_float(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        let (sign_len, negative) = match rest.chars().next() {
            Some('+') => (1, false),
            Some('-') => (1, true),
            _ => (0, false),
        };
        let body = &rest[sign_len..];
        for (word, value) in [("inf", f64::INFINITY), ("nan", f64::NAN)] {
            if body.starts_with(word) && !Self::continues_bare_key(body, word.len()) {
                self.bump(sign_len + word.len());
                let value = if negative { -value } else { value };
                return Some(TokenType::Float {
                    value,
                    special: true,
                });
            }
        }
        None
    }

    /// Counts the bytes of a run of digits in `radix`, allowing `_` digit
    /// separators after the first digit. Returns 0 if the run does not start
    /// with a digit.
    fn scan_digits(s: &str, radix: u32) -> usize {
        let mut len = 0;
        let mut saw_digit = false;
        for c in s.chars() {
            if c.is_digit(radix) {
                saw_digit = true;
                len += c.len_utf8();
            } else if c == '_' && saw_digit {
                len += 1;
            } else {
                break;
            }
        }
        if saw_digit {
            len
        } else {
            0
        }
    }

    fn read_float(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let mut len = 0;
        if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
            len += 1;
        }
        let int_digits = Self::scan_digits(&rest[len..], 10);
        if int_digits == 0 {
            return None;
        }
        len += int_digits;
        let mut is_float = false;
        if bytes.get(len) == Some(&b'.') {
            let frac_digits = Self::scan_digits(&rest[len + 1..], 10);
            if frac_digits == 0 {
                return None;
            }
            len += 1 + frac_digits;
            is_float = true;
        }
        if matches!(bytes.get(len), Some(b'e') | Some(b'E')) {
            let mut exp_len = 1;
            if matches!(bytes.get(len + exp_len), Some(b'+') | Some(b'-')) {
                exp_len += 1;
            }
            let exp_digits = Self::scan_digits(&rest[len + exp_len..], 10);
            if exp_digits > 0 {
                len += exp_len + exp_digits;
                is_float = true;
            } else if is_float {
                return None; // dangling exponent, e.g. `1.5e`
            }
        }
        if !is_float || Self::continues_bare_key(rest, len) {
            return None;
        }
        let literal: String = rest[..len].chars().filter(|c| *c != '_').collect();
        let value = literal.parse::<f64>().ok()?;
        self.bump(len);
        Some(TokenType::Float {
            value,
            special: false,
        })
    }

    fn read_prefixed_integer(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        let (base, radix) = if rest.starts_with("0x") {
            (IntegerBase::Hexadecimal, 16)
        } else if rest.starts_with("0o") {
            (IntegerBase::Octal, 8)
        } else if rest.starts_with("0b") {
            (IntegerBase::Binary, 2)
        } else {
            return None;
        };
        let digits = Self::scan_digits(&rest[2..], radix);
        if digits == 0 {
            return None;
        }
        let len = 2 + digits;
        if Self::continues_bare_key(rest, len) {
            return None;
        }
        let literal: String = rest[2..len].chars().filter(|c| *c != '_').collect();
        let value = i64::from_str_radix(&literal, radix).ok()?;
        self.bump(len);
        Some(TokenType::Integer { value, base })
    }

    fn read_decimal_integer(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        let sign_len = usize::from(matches!(rest.chars().next(), Some('+') | Some('-')));
        let digits = Self::scan_digits(&rest[sign_len..], 10);
        if digits == 0 {
            return None;
        }
        let len = sign_len + digits;
        if Self::continues_bare_key(rest, len) {
            return None;
        }
        let literal: String = rest[..len].chars().filter(|c| *c != '_').collect();
        let value = literal.parse::<i64>().ok()?;
        self.bump(len);
        Some(TokenType::Integer {
            value,
            base: IntegerBase::Decimal,
        })
    }

    fn read_bare_key(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !Self::is_bare_key_char(c))
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        let text = rest[..len].to_string();
        self.bump(len);
        Some(TokenType::BareString(text))
    }

    fn read_multiline_basic(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        let body = rest.strip_prefix("\"\"\"")?;
        let mut value = String::new();
        // A newline immediately after the opening delimiter is trimmed.
        let mut i = if body.starts_with("\r\n") {
            2
        } else if body.starts_with('\n') {
            1
        } else {
            0
        };
        loop {
            let tail = &body[i..];
            if tail.starts_with("\"\"\"") {
                self.bump(3 + i + 3);
                return Some(TokenType::MultilineString(value));
            }
            let c = tail.chars().next()?;
            if c == '\\' {
                let after = &tail[1..];
                // A backslash at the end of a line swallows the break and all
                // whitespace up to the next non-blank character.
                let to_break = after.trim_start_matches(|c: char| c == ' ' || c == '\t');
                if to_break.starts_with('\n') || to_break.starts_with("\r\n") {
                    let blanks = after.len() - to_break.len();
                    let resumed =
                        to_break.trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'));
                    i += 1 + blanks + (to_break.len() - resumed.len());
                    continue;
                }
                let (decoded, used) = Self::decode_escape(after)?;
                value.push(decoded);
                i += 1 + used;
            } else if c == '\r' && tail[1..].starts_with('\n') {
                value.push('\n');
                i += 2;
            } else {
                value.push(c);
                i += c.len_utf8();
            }
        }
    }

    fn read_multiline_literal(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        let body = rest.strip_prefix("'''")?;
        let end = body.find("'''")?;
        let content = &body[..end];
        let content = content
            .strip_prefix("\r\n")
            .or_else(|| content.strip_prefix('\n'))
            .unwrap_or(content);
        self.bump(3 + end + 3);
        Some(TokenType::MultilineString(content.replace("\r\n", "\n")))
    }

    fn read_basic_string(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        let body = rest.strip_prefix('"')?;
        let mut value = String::new();
        let mut i = 0;
        loop {
            let tail = &body[i..];
            let c = tail.chars().next()?;
            match c {
                '"' => {
                    self.bump(1 + i + 1);
                    return Some(TokenType::String(value));
                }
                '\n' | '\r' => return None, // single-line strings do not span lines
                '\\' => {
                    let (decoded, used) = Self::decode_escape(&tail[1..])?;
                    value.push(decoded);
                    i += 1 + used;
                }
                _ => {
                    value.push(c);
                    i += c.len_utf8();
                }
            }
        }
    }

    fn read_literal_string(&mut self) -> Option<TokenType> {
        let rest = self.rest();
        let body = rest.strip_prefix('\'')?;
        let line_len = body
            .find(|c: char| c == '\n' || c == '\r')
            .unwrap_or(body.len());
        let end = body[..line_len].find('\'')?;
        self.bump(1 + end + 1);
        Some(TokenType::String(body[..end].to_string()))
    }

    /// Decodes the escape sequence following a backslash. Returns the decoded
    /// character and the number of bytes consumed after the backslash.
    fn decode_escape(s: &str) -> Option<(char, usize)> {
        let c = s.chars().next()?;
        match c {
            'b' => Some(('\u{0008}', 1)),
            't' => Some(('\t', 1)),
            'n' => Some(('\n', 1)),
            'f' => Some(('\u{000C}', 1)),
            'r' => Some(('\r', 1)),
            '"' => Some(('"', 1)),
            '\\' => Some(('\\', 1)),
            'u' => Self::decode_unicode_escape(&s[1..], 4).map(|ch| (ch, 5)),
            'U' => Self::decode_unicode_escape(&s[1..], 8).map(|ch| (ch, 9)),
            _ => None,
        }
    }

    fn decode_unicode_escape(s: &str, len: usize) -> Option<char> {
        if s.len() < len || !s.is_char_boundary(len) {
            return None;
        }
        let code = u32::from_str_radix(&s[..len], 16).ok()?;
        char::from_u32(code)
    }

    fn no_match_error(&self) -> TokenizationError {
        let rest = self.rest();
        let excerpt: String = rest.chars().take(12).collect();
        let (line, column) = line_and_column(self.input, self.position);
        TokenizationError::NoMatch {
            src: (*self.src).clone(),
            span: (self.position, excerpt.len()).into(),
            excerpt,
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tokens(input: &str, expected: Vec<TokenType>) {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize().expect("tokenization failed");
        let token_types: Vec<TokenType> = tokens.into_iter().map(|t| t.ttype).collect();
        assert_eq!(token_types, expected);
    }

    #[test]
    fn test_empty_input() {
        assert_tokens("", vec![]);
        assert_tokens("   \t  ", vec![]);
    }

    #[test]
    fn test_punctuation() {
        let input = "= . [ ] [[ ]] { } ,";
        let expected = vec![
            TokenType::Assignment,
            TokenType::KeyJoin,
            TokenType::LeftBracket,
            TokenType::RightBracket,
            TokenType::DoubleLeftBracket,
            TokenType::DoubleRightBracket,
            TokenType::InlineTableBegin,
            TokenType::InlineTableEnd,
            TokenType::Separator,
        ];
        assert_tokens(input, expected);
    }

    #[test]
    fn test_adjacent_brackets_pair_up() {
        assert_tokens(
            "[[[",
            vec![TokenType::DoubleLeftBracket, TokenType::LeftBracket],
        );
    }

    #[test]
    fn test_booleans_and_bare_keys() {
        let input = "true false truthy true_value is-set";
        let expected = vec![
            TokenType::Boolean(true),
            TokenType::Boolean(false),
            TokenType::BareString("truthy".to_string()),
            TokenType::BareString("true_value".to_string()),
            TokenType::BareString("is-set".to_string()),
        ];
        assert_tokens(input, expected);
    }

    #[test]
    fn test_integers_in_every_base() {
        let input = "255 0xFF 0o17 0b101 -42 +7 1_000";
        let expected = vec![
            TokenType::Integer {
                value: 255,
                base: IntegerBase::Decimal,
            },
            TokenType::Integer {
                value: 255,
                base: IntegerBase::Hexadecimal,
            },
            TokenType::Integer {
                value: 15,
                base: IntegerBase::Octal,
            },
            TokenType::Integer {
                value: 5,
                base: IntegerBase::Binary,
            },
            TokenType::Integer {
                value: -42,
                base: IntegerBase::Decimal,
            },
            TokenType::Integer {
                value: 7,
                base: IntegerBase::Decimal,
            },
            TokenType::Integer {
                value: 1000,
                base: IntegerBase::Decimal,
            },
        ];
        assert_tokens(input, expected);
    }

    #[test]
    fn test_floats() {
        let input = "1.5 -0.25 6.02e23 1e6";
        let expected = vec![
            TokenType::Float {
                value: 1.5,
                special: false,
            },
            TokenType::Float {
                value: -0.25,
                special: false,
            },
            TokenType::Float {
                value: 6.02e23,
                special: false,
            },
            TokenType::Float {
                value: 1e6,
                special: false,
            },
        ];
        assert_tokens(input, expected);
    }

    #[test]
    fn test_special_floats() {
        let mut lexer = Lexer::new("inf -inf +inf nan");
        let tokens = lexer.tokenize().unwrap();
        let values: Vec<f64> = tokens
            .iter()
            .map(|t| match t.ttype {
                TokenType::Float { value, special } => {
                    assert!(special);
                    value
                }
                _ => panic!("expected a float token, got {:?}", t.ttype),
            })
            .collect();
        assert_eq!(values[0], f64::INFINITY);
        assert_eq!(values[1], f64::NEG_INFINITY);
        assert_eq!(values[2], f64::INFINITY);
        assert!(values[3].is_nan());
    }

    #[test]
    fn test_infinity_is_not_a_prefix_of_a_key() {
        assert_tokens(
            "information",
            vec![TokenType::BareString("information".to_string())],
        );
    }

    #[test]
    fn test_basic_strings_with_escapes() {
        assert_tokens(
            r#""hello \"world\"\n" "tab\there""#,
            vec![
                TokenType::String("hello \"world\"\n".to_string()),
                TokenType::String("tab\there".to_string()),
            ],
        );
    }

    #[test]
    fn test_unicode_escapes() {
        assert_tokens(
            r#""A\U0001F600""#,
            vec![TokenType::String("A\u{1F600}".to_string())],
        );
    }

    #[test]
    fn test_literal_strings_take_content_verbatim() {
        assert_tokens(
            r"'no \escape here'",
            vec![TokenType::String(r"no \escape here".to_string())],
        );
    }

    #[test]
    fn test_multiline_basic_strips_leading_newline() {
        let input = "\"\"\"\nfirst\nsecond\"\"\"";
        assert_tokens(
            input,
            vec![TokenType::MultilineString("first\nsecond".to_string())],
        );
    }

    #[test]
    fn test_multiline_basic_line_ending_backslash() {
        let input = "\"\"\"one \\\n   two\"\"\"";
        assert_tokens(
            input,
            vec![TokenType::MultilineString("one two".to_string())],
        );
    }

    #[test]
    fn test_multiline_literal() {
        let input = "'''\nraw \\ text\r\nline'''";
        assert_tokens(
            input,
            vec![TokenType::MultilineString("raw \\ text\nline".to_string())],
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let input = "# heading\nkey = 1 # trailing\r\n";
        let expected = vec![
            TokenType::Comment("heading".to_string()),
            TokenType::EndOfLine,
            TokenType::BareString("key".to_string()),
            TokenType::Assignment,
            TokenType::Integer {
                value: 1,
                base: IntegerBase::Decimal,
            },
            TokenType::Comment("trailing".to_string()),
            TokenType::EndOfLine,
        ];
        assert_tokens(input, expected);
    }

    #[test]
    fn test_full_statement() {
        let input = "[server]\nhost = \"localhost\"";
        let expected = vec![
            TokenType::LeftBracket,
            TokenType::BareString("server".to_string()),
            TokenType::RightBracket,
            TokenType::EndOfLine,
            TokenType::BareString("host".to_string()),
            TokenType::Assignment,
            TokenType::String("localhost".to_string()),
        ];
        assert_tokens(input, expected);
    }

    #[test]
    fn test_no_match_reports_offset_and_excerpt() {
        let mut lexer = Lexer::new("key = @oops");
        let err = lexer.tokenize().unwrap_err();
        let TokenizationError::NoMatch {
            excerpt,
            line,
            column,
            ..
        } = err;
        assert!(excerpt.starts_with('@'));
        assert_eq!((line, column), (1, 7));
    }

    #[test]
    fn test_unterminated_string_fails() {
        let mut lexer = Lexer::new("key = \"unterminated");
        assert!(lexer.tokenize().is_err());
    }
}
