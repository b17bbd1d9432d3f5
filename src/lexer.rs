//! Byte-cursor scanner producing tokens on demand.
//!
//! The lexer never fails: bytes it does not understand come back as
//! `ILLEGAL` tokens and the parser reports them. Columns count bytes.

use crate::token::{Span, Token, TokenKind, lookup_ident};

pub struct Lexer<'a> {
    input: &'a str,
    /// Index of `current_char`.
    position: usize,
    /// One past `position`.
    reading_position: usize,
    current_char: u8,
    line: usize,
    column: usize,
    eof_emitted: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Self {
            input,
            position: 0,
            reading_position: 0,
            current_char: 0,
            line: 1,
            column: 0,
            eof_emitted: false,
        };
        lexer.consume_char();
        lexer
    }

    /// Returns the next token. Once the input is exhausted every call yields EOF.
    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace_and_comments();

        let start = self.position;
        let line = self.line;
        let column = self.column;

        let kind = match self.current_char {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b'+' => self.compound(
                &[(b'=', TokenKind::PlusEq), (b'+', TokenKind::Increment)],
                TokenKind::Plus,
            ),
            b'-' => self.compound(
                &[
                    (b'>', TokenKind::OpenBlock),
                    (b'=', TokenKind::MinusEq),
                    (b'-', TokenKind::Decrement),
                ],
                TokenKind::Minus,
            ),
            b'*' => self.compound(&[(b'=', TokenKind::MulEq)], TokenKind::Asterisk),
            b'/' => self.compound(&[(b'=', TokenKind::SlashEq)], TokenKind::Slash),
            b'<' => self.compound(&[(b'=', TokenKind::LtEq)], TokenKind::Lt),
            b'>' => self.compound(&[(b'=', TokenKind::GtEq)], TokenKind::Gt),
            b'=' => self.compound(&[(b'=', TokenKind::Eq)], TokenKind::Assign),
            b'!' => self.compound(&[(b'=', TokenKind::NotEq)], TokenKind::Bang),
            b'|' => self.compound(&[(b'|', TokenKind::Or)], TokenKind::Illegal),
            b'&' => self.compound(&[(b'&', TokenKind::And)], TokenKind::Illegal),
            b'"' => return self.read_string(start, line, column),
            0 if self.at_end() => {
                let span = self.span_from(start, line, column);
                return Token::eof(span);
            }
            c if is_letter(c) => return self.read_identifier(start, line, column),
            c if c.is_ascii_digit() => return self.read_integer(start, line, column),
            c if !c.is_ascii() => {
                // Keep the whole character so the literal stays valid UTF-8.
                let width = self.input[start..].chars().next().map_or(1, char::len_utf8);
                for _ in 1..width {
                    self.consume_char();
                }
                TokenKind::Illegal
            }
            _ => TokenKind::Illegal,
        };

        self.consume_char();
        let span = self.span_from(start, line, column);
        Token::new(kind, &self.input[start..span.end], span)
    }

    /// Picks the two-byte kind whose second byte matches the peeked byte, or
    /// `single` otherwise. Leaves the cursor on the last byte of the token.
    fn compound(&mut self, pairs: &[(u8, TokenKind)], single: TokenKind) -> TokenKind {
        let next = self.peek_char();
        match pairs.iter().find(|(byte, _)| *byte == next) {
            Some((_, kind)) => {
                self.consume_char();
                *kind
            }
            None => single,
        }
    }

    fn consume_char(&mut self) {
        if self.current_char == b'\n' {
            self.line += 1;
            self.column = 0;
        } else if self.reading_position > 0 && !self.at_end() {
            self.column += 1;
        }

        if self.reading_position >= self.input.len() {
            self.current_char = 0;
            self.position = self.input.len();
            self.reading_position = self.input.len() + 1;
        } else {
            self.current_char = self.input.as_bytes()[self.reading_position];
            self.position = self.reading_position;
            self.reading_position += 1;
        }
    }

    fn peek_char(&self) -> u8 {
        self.input
            .as_bytes()
            .get(self.reading_position)
            .copied()
            .unwrap_or(0)
    }

    fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.current_char, b' ' | b'\t' | b'\r' | b'\n') {
                self.consume_char();
            }
            if self.current_char != b'#' {
                return;
            }
            while self.current_char != b'\n' && !self.at_end() {
                self.consume_char();
            }
        }
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        while is_letter(self.current_char) {
            self.consume_char();
        }
        let literal = &self.input[start..self.position];
        Token::new(
            lookup_ident(literal),
            literal,
            self.span_from(start, line, column),
        )
    }

    fn read_integer(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        while self.current_char.is_ascii_digit() {
            self.consume_char();
        }
        Token::new(
            TokenKind::Int,
            &self.input[start..self.position],
            self.span_from(start, line, column),
        )
    }

    /// Reads up to the closing quote or the end of input; no escapes.
    fn read_string(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        loop {
            self.consume_char();
            if self.current_char == b'"' || self.at_end() {
                break;
            }
        }
        let content_end = self.position;
        self.consume_char();
        Token::new(
            TokenKind::String,
            &self.input[start + 1..content_end],
            self.span_from(start, line, column),
        )
    }

    fn span_from(&self, start: usize, line: usize, column: usize) -> Span {
        Span {
            start,
            end: self.position,
            line,
            column,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    /// Yields every token up to and including the first EOF, then stops.
    fn next(&mut self) -> Option<Self::Item> {
        if self.eof_emitted {
            return None;
        }
        let token = self.next_token();
        self.eof_emitted = token.is(TokenKind::Eof);
        Some(token)
    }
}

fn is_letter(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn test_simple_program() {
        let input = indoc! {r#"
            value add = fn(x, y) -> return x + y; end;
            update total = add(5, 10);
            if (total >= 15) -> "big" end else -> "small" end
        "#};
        let tokens = tokenize(input);
        let actual = tokens
            .iter()
            .map(|token| (token.kind, token.literal))
            .collect::<Vec<_>>();
        let expected = vec![
            (TokenKind::Value, "value"),
            (TokenKind::Ident, "add"),
            (TokenKind::Assign, "="),
            (TokenKind::Function, "fn"),
            (TokenKind::LParen, "("),
            (TokenKind::Ident, "x"),
            (TokenKind::Comma, ","),
            (TokenKind::Ident, "y"),
            (TokenKind::RParen, ")"),
            (TokenKind::OpenBlock, "->"),
            (TokenKind::Return, "return"),
            (TokenKind::Ident, "x"),
            (TokenKind::Plus, "+"),
            (TokenKind::Ident, "y"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::CloseBlock, "end"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Update, "update"),
            (TokenKind::Ident, "total"),
            (TokenKind::Assign, "="),
            (TokenKind::Ident, "add"),
            (TokenKind::LParen, "("),
            (TokenKind::Int, "5"),
            (TokenKind::Comma, ","),
            (TokenKind::Int, "10"),
            (TokenKind::RParen, ")"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::If, "if"),
            (TokenKind::LParen, "("),
            (TokenKind::Ident, "total"),
            (TokenKind::GtEq, ">="),
            (TokenKind::Int, "15"),
            (TokenKind::RParen, ")"),
            (TokenKind::OpenBlock, "->"),
            (TokenKind::String, "big"),
            (TokenKind::CloseBlock, "end"),
            (TokenKind::Else, "else"),
            (TokenKind::OpenBlock, "->"),
            (TokenKind::String, "small"),
            (TokenKind::CloseBlock, "end"),
            (TokenKind::Eof, ""),
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn disambiguates_compound_operators() {
        assert_eq!(
            kinds("+ += ++ - -= -- -> * *= / /= < <= > >= = == ! != || &&"),
            vec![
                TokenKind::Plus,
                TokenKind::PlusEq,
                TokenKind::Increment,
                TokenKind::Minus,
                TokenKind::MinusEq,
                TokenKind::Decrement,
                TokenKind::OpenBlock,
                TokenKind::Asterisk,
                TokenKind::MulEq,
                TokenKind::Slash,
                TokenKind::SlashEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Assign,
                TokenKind::Eq,
                TokenKind::Bang,
                TokenKind::NotEq,
                TokenKind::Or,
                TokenKind::And,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lone_pipe_and_ampersand_are_illegal() {
        let tokens = tokenize("a | b & c");
        assert_eq!(tokens[1].kind, TokenKind::Illegal);
        assert_eq!(tokens[1].literal, "|");
        assert_eq!(tokens[3].kind, TokenKind::Illegal);
        assert_eq!(tokens[3].literal, "&");
    }

    #[test]
    fn word_aliases_lex_as_boolean_operators() {
        assert_eq!(
            kinds("true and false or x"),
            vec![
                TokenKind::True,
                TokenKind::And,
                TokenKind::False,
                TokenKind::Or,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_comments_to_end_of_line() {
        let input = indoc! {"
            # leading comment
            value x = 1; # trailing comment
            #
            x # at eof"};
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Value,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Semicolon,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reads_strings_without_escapes_and_unterminated_to_eof() {
        let tokens = tokenize(r#""foo bar" "" "open"#);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, "foo bar");
        assert_eq!(tokens[1].literal, "");
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].literal, "open");
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn identifiers_are_letters_and_underscores_only() {
        let tokens = tokenize("new_adder x1");
        let actual = tokens
            .iter()
            .map(|token| (token.kind, token.literal))
            .collect::<Vec<_>>();
        assert_eq!(
            actual,
            vec![
                (TokenKind::Ident, "new_adder"),
                (TokenKind::Ident, "x"),
                (TokenKind::Int, "1"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn non_ascii_bytes_become_one_illegal_token_per_char() {
        let tokens = tokenize("é@");
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
        assert_eq!(tokens[0].literal, "é");
        assert_eq!(tokens[1].kind, TokenKind::Illegal);
        assert_eq!(tokens[1].literal, "@");
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }

    #[test]
    fn keeps_returning_eof_after_input_is_exhausted() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().kind, TokenKind::Ident);
        for _ in 0..3 {
            let token = lexer.next_token();
            assert_eq!(token.kind, TokenKind::Eof);
            assert_eq!(token.literal, "");
        }
    }

    #[test]
    fn tracks_lines_and_columns() {
        let tokens = tokenize("value x = 1;\n  x + 2");
        let plus = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Plus)
            .expect("plus token");
        assert_eq!(plus.span.line, 2);
        assert_eq!(plus.span.column, 4);
        assert_eq!(plus.span.start, 17);
        assert_eq!(plus.span.end, 18);
    }
}
