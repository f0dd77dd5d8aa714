//! Hand-rolled tokenizer for the GoodWeb markup dialect.
//!
//! Three states: plain text, inside a tag, inside a quoted string. The
//! tokenizer never fails; structural problems (unterminated tags, stray
//! closers) are the tree builder's to report.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    TagOpen,
    TagClose,
    TagSlash,
    Equals,
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    InTag,
    InQuotedString,
}

/// Tokenize markup text into a flat token stream.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut state = State::Text;
    let mut buffer = String::new();

    for c in input.chars() {
        match state {
            State::Text => {
                if c == '<' {
                    flush(&mut buffer, &mut tokens);
                    tokens.push(Token::TagOpen);
                    state = State::InTag;
                } else {
                    buffer.push(c);
                }
            }
            State::InTag => match c {
                c if c.is_whitespace() => {
                    // Whitespace only separates names; it emits no token.
                    flush(&mut buffer, &mut tokens);
                }
                '=' => {
                    flush(&mut buffer, &mut tokens);
                    tokens.push(Token::Equals);
                }
                '"' => {
                    state = State::InQuotedString;
                }
                '>' => {
                    flush(&mut buffer, &mut tokens);
                    tokens.push(Token::TagClose);
                    state = State::Text;
                }
                '/' => {
                    flush(&mut buffer, &mut tokens);
                    tokens.push(Token::TagSlash);
                }
                _ => buffer.push(c),
            },
            State::InQuotedString => {
                // Verbatim until the closing quote; no escape sequences. The
                // run is emitted even when empty so `v=""` keeps its value.
                if c == '"' {
                    tokens.push(Token::Text(std::mem::take(&mut buffer)));
                    state = State::InTag;
                } else {
                    buffer.push(c);
                }
            }
        }
    }

    flush(&mut buffer, &mut tokens);
    tokens
}

fn flush(buffer: &mut String, tokens: &mut Vec<Token>) {
    if !buffer.is_empty() {
        tokens.push(Token::Text(std::mem::take(buffer)));
    }
}
