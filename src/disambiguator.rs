use crate::lexer::{Token, TokenType};

/// Which kind of header name the pass is currently inside, if any. One state
/// per name class; a plain pair of booleans invites misclassification right
/// at the table/table-array boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderContext {
    None,
    Table,
    TableArray,
}

/// Rewrites every context-dependent token into an unambiguous kind in a
/// single forward pass. Bracket tokens become table-header, table-array or
/// array delimiters depending on position; `[[`/`]]` outside a header
/// position split into two single-bracket array tokens; integer, float and
/// boolean tokens directly followed by an assignment become bare keys.
///
/// A sequence without raw bracket tokens or numeric-looking keys passes
/// through unchanged. `source` is the text the tokens were produced from; it
/// is only sliced to recover the literal spelling of reinterpreted keys.
pub fn disambiguate(source: &str, tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut context = HeaderContext::None;
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        let Token {
            ttype,
            pos_start,
            pos_end,
        } = token;
        match ttype {
            TokenType::LeftBracket => {
                // Value position only directly after `=`, `,` or another
                // array opening; everywhere else this opens a table header.
                let value_position = matches!(
                    out.last().map(|t| &t.ttype),
                    Some(TokenType::Assignment)
                        | Some(TokenType::Separator)
                        | Some(TokenType::ArrayBegin)
                );
                let ttype = if value_position {
                    TokenType::ArrayBegin
                } else {
                    TokenType::TableBegin
                };
                out.push(Token::new(ttype, pos_start, pos_end));
            }
            TokenType::RightBracket => {
                let ttype = if context == HeaderContext::Table {
                    TokenType::TableEnd
                } else {
                    TokenType::ArrayEnd
                };
                out.push(Token::new(ttype, pos_start, pos_end));
            }
            TokenType::DoubleLeftBracket => {
                let at_line_start = matches!(
                    out.last().map(|t| &t.ttype),
                    None | Some(TokenType::EndOfLine)
                );
                if at_line_start {
                    out.push(Token::new(TokenType::TableArrayBegin, pos_start, pos_end));
                } else {
                    // An array nested as the first element of another array.
                    out.push(Token::new(TokenType::ArrayBegin, pos_start, pos_start + 1));
                    out.push(Token::new(TokenType::ArrayBegin, pos_start + 1, pos_end));
                }
            }
            TokenType::DoubleRightBracket => {
                if context == HeaderContext::TableArray {
                    out.push(Token::new(TokenType::TableArrayEnd, pos_start, pos_end));
                } else {
                    out.push(Token::new(TokenType::ArrayEnd, pos_start, pos_start + 1));
                    out.push(Token::new(TokenType::ArrayEnd, pos_start + 1, pos_end));
                }
            }
            TokenType::Integer { .. } | TokenType::Float { .. } | TokenType::Boolean(_)
                if matches!(iter.peek().map(|t| &t.ttype), Some(TokenType::Assignment)) =>
            {
                // Keys that look like numbers or booleans are legal bare
                // keys; restore the literal spelling from the source.
                let text = source[pos_start..pos_end].to_string();
                out.push(Token::new(TokenType::BareString(text), pos_start, pos_end));
            }
            other => out.push(Token::new(other, pos_start, pos_end)),
        }
        if let Some(last) = out.last() {
            context = next_context(context, &last.ttype);
        }
    }
    out
}

fn next_context(current: HeaderContext, emitted: &TokenType) -> HeaderContext {
    match emitted {
        TokenType::TableBegin => HeaderContext::Table,
        TokenType::TableArrayBegin => HeaderContext::TableArray,
        TokenType::KeyJoin | TokenType::BareString(_) | TokenType::String(_) => current,
        _ => HeaderContext::None,
    }
}
