use crate::disambiguator::disambiguate;
use crate::error::{ParsingError, StructureError, TomlError};
use crate::lexer::{Lexer, Token, TokenType};
use crate::value::{Key, Sealed, TomlTable, TomlValue};
use miette::NamedSource;
use std::sync::Arc;

/// The states of the grammar machine. A token kind is legal only in a
/// specific subset of states; anything else aborts the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// At a statement boundary, inside a normal table.
    Base,
    /// A statement just finished; a newline is required before the next one.
    BaseEndOfLine,
    /// After `=`, expecting the value token.
    AssigningValue,
    KeyExpectingJoinerOrAssign,
    KeyJoinerExpectingString,
    TableNamingExpectingString,
    TableNamingExpectingEndOrJoiner,
    TableArrayNamingExpectingString,
    TableArrayNamingExpectingEndOrJoiner,
}

/// A state-machine parser consuming a disambiguated token sequence and
/// building a document tree.
#[derive(Debug)]
pub struct Parser<'a> {
    source: Arc<NamedSource<String>>,
    tokens: Vec<Token>,
    position: usize,
    source_text: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(source_text: &'a str) -> Result<Self, TomlError> {
        Self::new_with_name(source_text, "document.toml".to_string())
    }

    /// Runs the lexer and the disambiguator over `source_text` and readies
    /// the grammar machine. Fails if the text does not tokenize.
    pub fn new_with_name(source_text: &'a str, name: String) -> Result<Self, TomlError> {
        let mut lexer = Lexer::with_name(source_text, name.clone());
        let raw = lexer.tokenize()?;
        let tokens = disambiguate(source_text, raw);
        Ok(Self {
            source: Arc::new(NamedSource::new(name, source_text.to_string())),
            tokens,
            position: 0,
            source_text,
        })
    }

    /// Wraps an already-disambiguated token sequence. The tokens must have
    /// been produced from `source_text` for spans to line up.
    pub fn from_tokens(source_text: &'a str, name: String, tokens: Vec<Token>) -> Self {
        Self {
            source: Arc::new(NamedSource::new(name, source_text.to_string())),
            tokens,
            position: 0,
            source_text,
        }
    }

    /// Consumes the token stream and builds the document tree. The returned
    /// root is fully built; there is no partially-valid intermediate state.
    pub fn parse(&mut self) -> Result<TomlTable, TomlError> {
        let mut root = TomlTable::new();
        let mut state = State::Base;
        // Path of the table statements currently target, and the dotted name
        // being accumulated by the current statement.
        let mut current: Vec<String> = Vec::new();
        let mut name: Vec<String> = Vec::new();

        while let Some(token) = self.next_token() {
            match token.ttype.clone() {
                // Comments carry no grammar weight at statement level.
                TokenType::Comment(_) => {}

                TokenType::EndOfLine => {
                    self.assert_state(state, &[State::Base, State::BaseEndOfLine], &token)?;
                    state = State::Base;
                }

                TokenType::TableBegin => {
                    self.assert_state(state, &[State::Base], &token)?;
                    state = State::TableNamingExpectingString;
                }

                TokenType::TableEnd => {
                    self.assert_state(state, &[State::TableNamingExpectingEndOrJoiner], &token)?;
                    state = State::BaseEndOfLine;

                    let table_name = Key::new(std::mem::take(&mut name));
                    self.structure(
                        &token,
                        root.table_at_path(&current).map(|t| t.seal(Sealed::Partial)),
                    )?;
                    self.structure(&token, root.declare_table(&table_name))?;
                    log::trace!("entering table [{table_name}]");
                    current = table_name.segments().to_vec();
                }

                TokenType::TableArrayBegin => {
                    self.assert_state(state, &[State::Base], &token)?;
                    state = State::TableArrayNamingExpectingString;
                }

                TokenType::TableArrayEnd => {
                    self.assert_state(
                        state,
                        &[State::TableArrayNamingExpectingEndOrJoiner],
                        &token,
                    )?;
                    state = State::BaseEndOfLine;

                    let array_name = Key::new(std::mem::take(&mut name));
                    self.structure(
                        &token,
                        root.table_at_path(&current).map(|t| t.seal(Sealed::Partial)),
                    )?;
                    self.structure(&token, root.declare_table_array(&array_name))?;
                    log::trace!("appending element to [[{array_name}]]");
                    current = array_name.segments().to_vec();
                }

                TokenType::KeyJoin => {
                    self.assert_state(
                        state,
                        &[
                            State::KeyExpectingJoinerOrAssign,
                            State::TableNamingExpectingEndOrJoiner,
                            State::TableArrayNamingExpectingEndOrJoiner,
                        ],
                        &token,
                    )?;
                    state = match state {
                        State::KeyExpectingJoinerOrAssign => State::KeyJoinerExpectingString,
                        State::TableNamingExpectingEndOrJoiner => State::TableNamingExpectingString,
                        _ => State::TableArrayNamingExpectingString,
                    };
                }

                TokenType::Assignment => {
                    self.assert_state(state, &[State::KeyExpectingJoinerOrAssign], &token)?;
                    state = State::AssigningValue;
                }

                TokenType::ArrayBegin => {
                    self.assert_state(state, &[State::AssigningValue], &token)?;
                    let array = self.get_array()?;
                    self.assign(&mut root, &current, &mut name, &token, TomlValue::Array(array))?;
                    state = State::BaseEndOfLine;
                }

                TokenType::InlineTableBegin => {
                    self.assert_state(state, &[State::AssigningValue], &token)?;
                    let table = self.get_inline_table()?;
                    self.assign(&mut root, &current, &mut name, &token, TomlValue::Table(table))?;
                    state = State::BaseEndOfLine;
                }

                TokenType::BareString(text) => {
                    self.assert_state(
                        state,
                        &[
                            State::Base,
                            State::KeyJoinerExpectingString,
                            State::TableNamingExpectingString,
                            State::TableArrayNamingExpectingString,
                        ],
                        &token,
                    )?;
                    name.push(text);
                    state = Self::after_name_string(state);
                }

                TokenType::String(text) => {
                    self.assert_state(
                        state,
                        &[
                            State::Base,
                            State::KeyJoinerExpectingString,
                            State::TableNamingExpectingString,
                            State::TableArrayNamingExpectingString,
                            State::AssigningValue,
                        ],
                        &token,
                    )?;
                    if state == State::AssigningValue {
                        self.assign(&mut root, &current, &mut name, &token, TomlValue::String(text))?;
                        state = State::BaseEndOfLine;
                    } else {
                        name.push(text);
                        state = Self::after_name_string(state);
                    }
                }

                TokenType::MultilineString(text) => {
                    self.assert_state(state, &[State::AssigningValue], &token)?;
                    self.assign(&mut root, &current, &mut name, &token, TomlValue::String(text))?;
                    state = State::BaseEndOfLine;
                }

                TokenType::Integer { value, base } => {
                    self.assert_state(state, &[State::AssigningValue], &token)?;
                    self.assign(
                        &mut root,
                        &current,
                        &mut name,
                        &token,
                        TomlValue::Integer { value, base },
                    )?;
                    state = State::BaseEndOfLine;
                }

                TokenType::Float { value, special } => {
                    self.assert_state(state, &[State::AssigningValue], &token)?;
                    self.assign(
                        &mut root,
                        &current,
                        &mut name,
                        &token,
                        TomlValue::Float { value, special },
                    )?;
                    state = State::BaseEndOfLine;
                }

                TokenType::Boolean(value) => {
                    self.assert_state(state, &[State::AssigningValue], &token)?;
                    self.assign(&mut root, &current, &mut name, &token, TomlValue::Boolean(value))?;
                    state = State::BaseEndOfLine;
                }

                TokenType::ArrayEnd | TokenType::InlineTableEnd | TokenType::Separator => {
                    return Err(self.err_unexpected(&token, "a statement"));
                }

                TokenType::LeftBracket
                | TokenType::RightBracket
                | TokenType::DoubleLeftBracket
                | TokenType::DoubleRightBracket => {
                    return Err(self.err_unexpected(&token, "a disambiguated token stream"));
                }
            }
        }

        if !matches!(state, State::Base | State::BaseEndOfLine) {
            return Err(self.err_eof());
        }
        log::debug!("parsed document with {} top-level entries", root.len());
        Ok(root)
    }

    fn after_name_string(state: State) -> State {
        match state {
            State::Base | State::KeyJoinerExpectingString => State::KeyExpectingJoinerOrAssign,
            State::TableNamingExpectingString => State::TableNamingExpectingEndOrJoiner,
            _ => State::TableArrayNamingExpectingEndOrJoiner,
        }
    }

    /// Inserts `value` under the accumulated dotted key in the current
    /// table, clearing the accumulator.
    fn assign(
        &self,
        root: &mut TomlTable,
        current: &[String],
        name: &mut Vec<String>,
        token: &Token,
        value: TomlValue,
    ) -> Result<(), TomlError> {
        let key = Key::new(std::mem::take(name));
        let target = self.structure(token, root.table_at_path(current))?;
        self.structure(token, target.insert(&key, value))?;
        Ok(())
    }

    /// Parses the remainder of an array literal; the opening token has
    /// already been consumed. Line breaks and comments are insignificant
    /// inside arrays.
    fn get_array(&mut self) -> Result<Vec<TomlValue>, TomlError> {
        let mut values = Vec::new();
        let mut expecting_separator = false;
        while let Some(token) = self.next_token() {
            match &token.ttype {
                TokenType::EndOfLine | TokenType::Comment(_) => {}
                TokenType::ArrayEnd => return Ok(values),
                TokenType::Separator if expecting_separator => {
                    expecting_separator = false;
                }
                _ if expecting_separator => {
                    return Err(self.err_unexpected(&token, "a separator or the end of the array"));
                }
                TokenType::InlineTableBegin => {
                    values.push(TomlValue::Table(self.get_inline_table()?));
                    expecting_separator = true;
                }
                TokenType::ArrayBegin => {
                    values.push(TomlValue::Array(self.get_array()?));
                    expecting_separator = true;
                }
                TokenType::String(text) | TokenType::MultilineString(text) => {
                    values.push(TomlValue::String(text.clone()));
                    expecting_separator = true;
                }
                TokenType::Integer { value, base } => {
                    values.push(TomlValue::Integer {
                        value: *value,
                        base: *base,
                    });
                    expecting_separator = true;
                }
                TokenType::Float { value, special } => {
                    values.push(TomlValue::Float {
                        value: *value,
                        special: *special,
                    });
                    expecting_separator = true;
                }
                TokenType::Boolean(value) => {
                    values.push(TomlValue::Boolean(*value));
                    expecting_separator = true;
                }
                _ => return Err(self.err_unexpected(&token, "a value in the array")),
            }
        }
        Err(self.err_eof())
    }

    /// Parses the remainder of an inline table; the opening brace has
    /// already been consumed. The returned table is sealed and can never be
    /// reopened by a later statement.
    fn get_inline_table(&mut self) -> Result<TomlTable, TomlError> {
        let mut table = TomlTable::new();
        loop {
            let token = match self.next_token() {
                Some(t) => t,
                None => return Err(self.err_eof()),
            };
            if matches!(token.ttype, TokenType::InlineTableEnd) {
                table.seal(Sealed::Full);
                return Ok(table);
            }
            self.step_back();
            let key = self.get_next_key()?;

            let value_token = match self.next_token() {
                Some(t) => t,
                None => return Err(self.err_eof()),
            };
            let value = match &value_token.ttype {
                TokenType::InlineTableBegin => TomlValue::Table(self.get_inline_table()?),
                TokenType::ArrayBegin => TomlValue::Array(self.get_array()?),
                TokenType::String(text) | TokenType::MultilineString(text) => {
                    TomlValue::String(text.clone())
                }
                TokenType::Integer { value, base } => TomlValue::Integer {
                    value: *value,
                    base: *base,
                },
                TokenType::Float { value, special } => TomlValue::Float {
                    value: *value,
                    special: *special,
                },
                TokenType::Boolean(value) => TomlValue::Boolean(*value),
                _ => return Err(self.err_unexpected(&value_token, "a value in the inline table")),
            };
            self.structure(&value_token, table.insert(&key, value))?;

            let next = match self.next_token() {
                Some(t) => t,
                None => return Err(self.err_eof()),
            };
            match next.ttype {
                TokenType::InlineTableEnd => {
                    table.seal(Sealed::Full);
                    return Ok(table);
                }
                TokenType::Separator => {}
                _ => {
                    return Err(
                        self.err_unexpected(&next, "a separator or the end of the inline table")
                    )
                }
            }
        }
    }

    /// Parses a dotted key up to and including its assignment token.
    fn get_next_key(&mut self) -> Result<Key, TomlError> {
        let mut segments = Vec::new();
        let mut expecting_joiner_or_assign = false;
        while let Some(token) = self.next_token() {
            if expecting_joiner_or_assign {
                match &token.ttype {
                    TokenType::KeyJoin => expecting_joiner_or_assign = false,
                    TokenType::Assignment => return Ok(Key::new(segments)),
                    _ => return Err(self.err_unexpected(&token, "a key joiner or an assignment")),
                }
            } else {
                match &token.ttype {
                    TokenType::String(text) | TokenType::BareString(text) => {
                        segments.push(text.clone());
                        expecting_joiner_or_assign = true;
                    }
                    _ => return Err(self.err_unexpected(&token, "a string for a key segment")),
                }
            }
        }
        Err(self.err_eof())
    }

    // === Token cursor helpers ===

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn step_back(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    // === Error helpers ===

    fn token_span(token: &Token) -> miette::SourceSpan {
        (token.pos_start, token.pos_end - token.pos_start).into()
    }

    fn assert_state(
        &self,
        state: State,
        allowed: &[State],
        token: &Token,
    ) -> Result<(), TomlError> {
        if allowed.contains(&state) {
            return Ok(());
        }
        Err(ParsingError::IllegalState {
            src: (*self.source).clone(),
            span: Self::token_span(token),
            expected: format!("{allowed:?}"),
            state: format!("{state:?}"),
        }
        .into())
    }

    fn err_unexpected(&self, token: &Token, expected: &str) -> TomlError {
        ParsingError::UnexpectedToken {
            src: (*self.source).clone(),
            span: Self::token_span(token),
            expected: expected.to_string(),
        }
        .into()
    }

    fn err_eof(&self) -> TomlError {
        let pos = self.source_text.len().saturating_sub(1);
        ParsingError::UnexpectedEof {
            src: (*self.source).clone(),
            span: (pos, 0).into(),
        }
        .into()
    }

    fn structure<T>(
        &self,
        token: &Token,
        result: Result<T, StructureError>,
    ) -> Result<T, TomlError> {
        result.map_err(|conflict| {
            ParsingError::Structure {
                src: (*self.source).clone(),
                span: Self::token_span(token),
                conflict,
            }
            .into()
        })
    }
}
