//! Tokenizer for Rye source code
//!
//! Produces the token stream consumed by the parser. Trivia (whitespace and
//! comments) is kept in the stream so tooling can reconstruct the source;
//! the parser filters it out.

use std::ops::Range;

/// Represents a token in the Rye language
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token kind
    pub kind: TokenKind,
    /// The source span (byte range)
    pub span: Range<usize>,
    /// The actual text of the token
    pub text: String,
}

/// Token kinds in the Rye language
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Module,
    Import,
    Let,
    Const,
    Alias,
    Use,
    Func,
    Inline,
    Class,
    Enum,
    Print,
    Return,
    If,
    Else,
    For,
    While,
    Try,
    Catch,
    New,
    SelfKw,
    True,
    False,
    Null,

    // Identifiers
    Ident(String),

    // Literals
    Int(i64),
    Float(f64),
    Str(String),

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    PlusEq,     // +=
    MinusEq,    // -=
    StarEq,     // *=
    SlashEq,    // /=
    Eq,         // =
    EqEq,       // ==
    NotEq,      // !=
    Lt,         // <
    Gt,         // >
    LtEq,       // <=
    GtEq,       // >=
    AndAnd,     // &&
    OrOr,       // ||
    Not,        // !
    DotDot,     // ..
    ColonColon, // ::

    // Punctuation
    Semicolon,    // ;
    Comma,        // ,
    Dot,          // .
    Colon,        // :
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    LeftBrace,    // {
    RightBrace,   // }
    DollarBrace,  // ${

    // Comments and whitespace (filtered out by the parser)
    LineComment(String),
    BlockComment(String),
    Whitespace,

    // Other
    Unknown,
    Eof,
}

impl TokenKind {
    /// True for whitespace and comment tokens.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment(_) | TokenKind::BlockComment(_)
        )
    }
}

fn keyword_kind(word: &str) -> Option<TokenKind> {
    let kind = match word {
        "module" => TokenKind::Module,
        "import" => TokenKind::Import,
        "let" => TokenKind::Let,
        "const" => TokenKind::Const,
        "alias" => TokenKind::Alias,
        "use" => TokenKind::Use,
        "func" => TokenKind::Func,
        "inline" => TokenKind::Inline,
        "class" => TokenKind::Class,
        "enum" => TokenKind::Enum,
        "print" => TokenKind::Print,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "try" => TokenKind::Try,
        "catch" => TokenKind::Catch,
        "new" => TokenKind::New,
        "self" => TokenKind::SelfKw,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        _ => return None,
    };
    Some(kind)
}

/// Tokenize a source string into a vector of tokens
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    let mut push = |kind: TokenKind, span: Range<usize>| {
        let text = source[span.clone()].to_string();
        tokens.push(Token { kind, span, text });
    };

    while let Some((pos, ch)) = chars.next() {
        match ch {
            // Whitespace
            ' ' | '\t' | '\r' | '\n' => {
                let mut end = pos + ch.len_utf8();
                while let Some((next_pos, next_ch)) = chars.peek().copied() {
                    if matches!(next_ch, ' ' | '\t' | '\r' | '\n') {
                        chars.next();
                        end = next_pos + next_ch.len_utf8();
                    } else {
                        break;
                    }
                }
                push(TokenKind::Whitespace, pos..end);
            }

            // Line comment
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                chars.next();
                let mut end = pos + 2;
                let mut comment = String::new();
                for (next_pos, next_ch) in chars.by_ref() {
                    end = next_pos + next_ch.len_utf8();
                    if next_ch == '\n' {
                        break;
                    }
                    comment.push(next_ch);
                }
                push(TokenKind::LineComment(comment), pos..end);
            }

            // Block comment
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut end = pos + 2;
                let mut comment = String::new();
                let mut prev = '/';
                for (next_pos, next_ch) in chars.by_ref() {
                    end = next_pos + next_ch.len_utf8();
                    if prev == '*' && next_ch == '/' {
                        comment.pop();
                        break;
                    }
                    comment.push(next_ch);
                    prev = next_ch;
                }
                push(TokenKind::BlockComment(comment), pos..end);
            }

            // String literals
            '"' => {
                let mut end = pos + 1;
                let mut value = String::new();
                let mut escaped = false;
                for (next_pos, next_ch) in chars.by_ref() {
                    end = next_pos + next_ch.len_utf8();
                    if escaped {
                        value.push(match next_ch {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '0' => '\0',
                            other => other,
                        });
                        escaped = false;
                    } else if next_ch == '\\' {
                        escaped = true;
                    } else if next_ch == '"' {
                        break;
                    } else {
                        value.push(next_ch);
                    }
                }
                push(TokenKind::Str(value), pos..end);
            }

            // Numbers
            '0'..='9' => {
                let mut end = pos + ch.len_utf8();
                let mut num_str = String::from(ch);
                let mut has_dot = false;

                while let Some((next_pos, next_ch)) = chars.peek().copied() {
                    match next_ch {
                        '0'..='9' => {
                            chars.next();
                            end = next_pos + next_ch.len_utf8();
                            num_str.push(next_ch);
                        }
                        // A dot only continues the number when a digit
                        // follows; `1..5` stays a range.
                        '.' if !has_dot
                            && source[next_pos + 1..]
                                .chars()
                                .next()
                                .is_some_and(|c| c.is_ascii_digit()) =>
                        {
                            chars.next();
                            end = next_pos + 1;
                            num_str.push('.');
                            has_dot = true;
                        }
                        _ => break,
                    }
                }

                let kind = if has_dot {
                    TokenKind::Float(num_str.parse::<f64>().unwrap_or(0.0))
                } else {
                    TokenKind::Int(num_str.parse::<i64>().unwrap_or(0))
                };
                push(kind, pos..end);
            }

            // Identifiers and keywords
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = pos + c.len_utf8();
                while let Some((next_pos, next_ch)) = chars.peek().copied() {
                    if next_ch.is_ascii_alphanumeric() || next_ch == '_' {
                        chars.next();
                        end = next_pos + next_ch.len_utf8();
                    } else {
                        break;
                    }
                }
                let word = &source[pos..end];
                let kind =
                    keyword_kind(word).unwrap_or_else(|| TokenKind::Ident(word.to_string()));
                push(kind, pos..end);
            }

            // Operators and punctuation
            '+' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    push(TokenKind::PlusEq, pos..pos + 2);
                } else {
                    push(TokenKind::Plus, pos..pos + 1);
                }
            }
            '-' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    push(TokenKind::MinusEq, pos..pos + 2);
                } else {
                    push(TokenKind::Minus, pos..pos + 1);
                }
            }
            '*' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    push(TokenKind::StarEq, pos..pos + 2);
                } else {
                    push(TokenKind::Star, pos..pos + 1);
                }
            }
            '/' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    push(TokenKind::SlashEq, pos..pos + 2);
                } else {
                    push(TokenKind::Slash, pos..pos + 1);
                }
            }
            '%' => push(TokenKind::Percent, pos..pos + 1),
            '=' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    push(TokenKind::EqEq, pos..pos + 2);
                } else {
                    push(TokenKind::Eq, pos..pos + 1);
                }
            }
            '!' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    push(TokenKind::NotEq, pos..pos + 2);
                } else {
                    push(TokenKind::Not, pos..pos + 1);
                }
            }
            '<' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    push(TokenKind::LtEq, pos..pos + 2);
                } else {
                    push(TokenKind::Lt, pos..pos + 1);
                }
            }
            '>' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    push(TokenKind::GtEq, pos..pos + 2);
                } else {
                    push(TokenKind::Gt, pos..pos + 1);
                }
            }
            '&' => {
                if matches!(chars.peek(), Some((_, '&'))) {
                    chars.next();
                    push(TokenKind::AndAnd, pos..pos + 2);
                } else {
                    push(TokenKind::Unknown, pos..pos + 1);
                }
            }
            '|' => {
                if matches!(chars.peek(), Some((_, '|'))) {
                    chars.next();
                    push(TokenKind::OrOr, pos..pos + 2);
                } else {
                    push(TokenKind::Unknown, pos..pos + 1);
                }
            }
            '.' => {
                if matches!(chars.peek(), Some((_, '.'))) {
                    chars.next();
                    push(TokenKind::DotDot, pos..pos + 2);
                } else {
                    push(TokenKind::Dot, pos..pos + 1);
                }
            }
            ':' => {
                if matches!(chars.peek(), Some((_, ':'))) {
                    chars.next();
                    push(TokenKind::ColonColon, pos..pos + 2);
                } else {
                    push(TokenKind::Colon, pos..pos + 1);
                }
            }
            '$' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    push(TokenKind::DollarBrace, pos..pos + 2);
                } else {
                    push(TokenKind::Unknown, pos..pos + 1);
                }
            }
            ';' => push(TokenKind::Semicolon, pos..pos + 1),
            ',' => push(TokenKind::Comma, pos..pos + 1),
            '(' => push(TokenKind::LeftParen, pos..pos + 1),
            ')' => push(TokenKind::RightParen, pos..pos + 1),
            '[' => push(TokenKind::LeftBracket, pos..pos + 1),
            ']' => push(TokenKind::RightBracket, pos..pos + 1),
            '{' => push(TokenKind::LeftBrace, pos..pos + 1),
            '}' => push(TokenKind::RightBrace, pos..pos + 1),

            _ => push(TokenKind::Unknown, pos..pos + ch.len_utf8()),
        }
    }

    let end = source.len();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: end..end,
        text: String::new(),
    });
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_declaration() {
        assert_eq!(
            kinds("let x = 5;"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("x".into()),
                TokenKind::Eq,
                TokenKind::Int(5),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn range_is_not_a_float() {
        assert_eq!(
            kinds("1..5"),
            vec![
                TokenKind::Int(1),
                TokenKind::DotDot,
                TokenKind::Int(5),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("1.5"), vec![TokenKind::Float(1.5), TokenKind::Eof]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\nb""#),
            vec![TokenKind::Str("a\nb".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn comments_are_trivia() {
        let toks = tokenize("let // c\n/* b */ x");
        assert!(toks.iter().any(|t| t.kind.is_trivia()));
        assert_eq!(
            kinds("let // c\n/* b */ x"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("x".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            kinds("a += b :: c.d"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::PlusEq,
                TokenKind::Ident("b".into()),
                TokenKind::ColonColon,
                TokenKind::Ident("c".into()),
                TokenKind::Dot,
                TokenKind::Ident("d".into()),
                TokenKind::Eof,
            ]
        );
    }
}
