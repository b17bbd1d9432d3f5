use std::fmt;

/// Byte range of a token in the source, plus its 1-based line and 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Illegal,
    Eof,

    // Literals
    Ident,
    Int,
    String,

    // Operators
    Assign,    // =
    Plus,      // +
    Minus,     // -
    Bang,      // !
    Asterisk,  // *
    Slash,     // /
    Lt,        // <
    Gt,        // >
    LtEq,      // <=
    GtEq,      // >=
    Eq,        // ==
    NotEq,     // !=
    And,       // && / and
    Or,        // || / or
    PlusEq,    // +=
    MinusEq,   // -=
    MulEq,     // *=
    SlashEq,   // /=
    Increment, // ++
    Decrement, // --

    // Delimiters
    Comma,     // ,
    Colon,     // :
    Semicolon, // ;
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    OpenBlock, // ->

    // Keywords
    Value,
    Update,
    Return,
    If,
    Else,
    Function,
    True,
    False,
    CloseBlock,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Eof => "EOF",
            TokenKind::Ident => "IDENT",
            TokenKind::Int => "INT",
            TokenKind::String => "STRING",
            TokenKind::Assign => "=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Bang => "!",
            TokenKind::Asterisk => "*",
            TokenKind::Slash => "/",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            TokenKind::Eq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::MulEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::Increment => "++",
            TokenKind::Decrement => "--",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::OpenBlock => "->",
            TokenKind::Value => "value",
            TokenKind::Update => "update",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Function => "fn",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::CloseBlock => "end",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub literal: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, literal: &'a str, span: Span) -> Self {
        Self {
            kind,
            literal,
            span,
        }
    }

    pub fn eof(span: Span) -> Self {
        Self::new(TokenKind::Eof, "", span)
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// Promotes an identifier to its keyword kind, if it is one.
pub fn lookup_ident(ident: &str) -> TokenKind {
    match ident {
        "value" => TokenKind::Value,
        "update" => TokenKind::Update,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "fn" => TokenKind::Function,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "end" => TokenKind::CloseBlock,
        _ => TokenKind::Ident,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotes_keywords_and_aliases() {
        assert_eq!(lookup_ident("value"), TokenKind::Value);
        assert_eq!(lookup_ident("update"), TokenKind::Update);
        assert_eq!(lookup_ident("fn"), TokenKind::Function);
        assert_eq!(lookup_ident("end"), TokenKind::CloseBlock);
        assert_eq!(lookup_ident("and"), TokenKind::And);
        assert_eq!(lookup_ident("or"), TokenKind::Or);
        assert_eq!(lookup_ident("values"), TokenKind::Ident);
        assert_eq!(lookup_ident("_end"), TokenKind::Ident);
    }
}
