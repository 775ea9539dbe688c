//! Lexer (tokenizer) for tree descriptions.

use crate::error::{Result, WdfError};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in the description language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element, junction or keyword name
    Identifier,
    /// A number, possibly with an engineering suffix
    Number,
    /// A directive (starts with '.')
    Directive,
    /// Open parenthesis '('
    OpenParen,
    /// Close parenthesis ')'
    CloseParen,
    /// Equals sign '='
    Equals,
    Newline,
    Eof,
}

/// Lexer for tokenizing a tree description.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;
        let token = |kind, text: String| Token {
            kind,
            text,
            line,
            column,
        };

        let ch = match self.chars.peek().copied() {
            Some(ch) => ch,
            None => return Ok(token(TokenKind::Eof, String::new())),
        };

        let single = |lexer: &mut Self, kind| {
            lexer.advance();
            token(kind, ch.to_string())
        };

        Ok(match ch {
            '\n' => single(self, TokenKind::Newline),
            '(' => single(self, TokenKind::OpenParen),
            ')' => single(self, TokenKind::CloseParen),
            '=' => single(self, TokenKind::Equals),
            '.' => {
                self.advance();
                let name = self.read_identifier();
                if name.is_empty() {
                    return Err(WdfError::lexer(line, column, "expected directive name after '.'"));
                }
                token(TokenKind::Directive, format!(".{name}"))
            }
            '-' | '+' | '0'..='9' => token(TokenKind::Number, self.read_number()),
            _ if ch.is_alphabetic() || ch == '_' => token(TokenKind::Identifier, self.read_identifier()),
            _ => {
                return Err(WdfError::lexer(
                    line,
                    column,
                    format!("unexpected character '{ch}'"),
                ));
            }
        })
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '#' || ch == ';' {
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();

        if let Some(&sign @ ('-' | '+')) = self.chars.peek() {
            text.push(sign);
            self.advance();
        }

        self.read_digits(&mut text);

        if let Some('.') = self.chars.peek() {
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }

        if let Some(&e @ ('e' | 'E')) = self.chars.peek() {
            text.push(e);
            self.advance();
            if let Some(&sign @ ('-' | '+')) = self.chars.peek() {
                text.push(sign);
                self.advance();
            }
            self.read_digits(&mut text);
        }

        if let Some(&suffix) = self.chars.peek() {
            if is_suffix(suffix) {
                text.push(suffix);
                self.advance();
            }
        }

        text
    }
}

fn is_suffix(ch: char) -> bool {
    matches!(ch, 'p' | 'n' | 'u' | 'µ' | 'm' | 'k' | 'K' | 'M' | 'G')
}

/// Parse a number string with optional engineering suffix.
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    let last = text.chars().last()?;

    let multiplier = match last {
        'p' => 1e-12,
        'n' => 1e-9,
        'u' | 'µ' => 1e-6,
        'm' => 1e-3,
        'k' | 'K' => 1e3,
        'M' => 1e6,
        'G' => 1e9,
        _ => return text.parse::<f64>().ok(),
    };
    text[..text.len() - last.len_utf8()]
        .parse::<f64>()
        .ok()
        .map(|v| v * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            out.push(tok.kind);
            if tok.kind == TokenKind::Eof {
                return out;
            }
        }
    }

    #[test]
    fn test_parse_value() {
        assert_relative_eq!(parse_value("10k").unwrap(), 10_000.0, max_relative = 1e-12);
        assert_relative_eq!(parse_value("100n").unwrap(), 100e-9, max_relative = 1e-12);
        assert_relative_eq!(parse_value("4.7u").unwrap(), 4.7e-6, max_relative = 1e-12);
        assert_relative_eq!(parse_value("25.85m").unwrap(), 25.85e-3, max_relative = 1e-12);
        assert_relative_eq!(parse_value("1M").unwrap(), 1e6, max_relative = 1e-12);
        assert_relative_eq!(parse_value("-2.2").unwrap(), -2.2, max_relative = 1e-12);
        assert_relative_eq!(parse_value("1e-9").unwrap(), 1e-9, max_relative = 1e-12);
        assert!(parse_value("k").is_none());
        assert!(parse_value("").is_none());
    }

    #[test]
    fn test_lexer_element_line() {
        let mut lexer = Lexer::new("RV VIN 1k 0.5");
        let tok = lexer.next_token().unwrap();
        assert_eq!((tok.kind, tok.text.as_str()), (TokenKind::Identifier, "RV"));
        let tok = lexer.next_token().unwrap();
        assert_eq!((tok.kind, tok.text.as_str()), (TokenKind::Identifier, "VIN"));
        let tok = lexer.next_token().unwrap();
        assert_eq!((tok.kind, tok.text.as_str()), (TokenKind::Number, "1k"));
        assert_eq!(tok.column, 8);
    }

    #[test]
    fn test_lexer_junction_line() {
        assert_eq!(
            kinds(".junction J1 (0 1) res(1 0 10k)"),
            vec![
                TokenKind::Directive,
                TokenKind::Identifier,
                TokenKind::OpenParen,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::CloseParen,
                TokenKind::Identifier,
                TokenKind::OpenParen,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::CloseParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_comments_and_lines() {
        let mut lexer = Lexer::new("# header\nR R1 1k ; trailing\nC C1 1u");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Newline);
        let tok = lexer.next_token().unwrap();
        assert_eq!((tok.text.as_str(), tok.line), ("R", 2));
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Newline);
        assert_eq!(lexer.next_token().unwrap().line, 3);
    }

    #[test]
    fn test_lexer_rejects_stray_character() {
        let mut lexer = Lexer::new("R R1 [1k]");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert!(matches!(err, WdfError::LexerError { line: 1, column: 6, .. }));
    }
}
