use std::rc::Rc;

use log::trace;

use crate::ast::{
    BlockStatement, Expression, FunctionLiteral, Identifier, InfixOperator, PrefixOperator,
    Program, Statement,
};
use crate::lexer::Lexer;
use crate::stack;
use crate::token::{Span, Token, TokenKind};

pub mod error;

pub use error::{ParseError, ParseErrors};

/// Deepest expression nesting the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    Logic,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

impl Precedence {
    fn of(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
            TokenKind::And | TokenKind::Or => Precedence::Logic,
            TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => {
                Precedence::LessGreater
            }
            TokenKind::Plus | TokenKind::Minus | TokenKind::PlusEq | TokenKind::MinusEq => {
                Precedence::Sum
            }
            TokenKind::Asterisk | TokenKind::Slash | TokenKind::MulEq | TokenKind::SlashEq => {
                Precedence::Product
            }
            TokenKind::LParen | TokenKind::LBracket => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }
}

type PrefixParseFn<'a, I> = fn(&mut Parser<'a, I>) -> Option<Expression>;
type InfixParseFn<'a, I> = fn(&mut Parser<'a, I>, Expression) -> Option<Expression>;

/// Pratt parser over any token stream. Errors are recorded rather than
/// returned; a statement that fails to parse is left out of the program.
pub struct Parser<'a, I>
where
    I: Iterator<Item = Token<'a>>,
{
    tokens: I,
    current: Token<'a>,
    peek: Token<'a>,
    errors: Vec<ParseError>,
    depth: usize,
}

impl<'a, I> Parser<'a, I>
where
    I: Iterator<Item = Token<'a>>,
{
    pub fn new<T>(tokens: T) -> Self
    where
        T: IntoIterator<Item = Token<'a>, IntoIter = I>,
    {
        let mut tokens = tokens.into_iter();
        let current = tokens
            .next()
            .unwrap_or_else(|| Token::eof(Span::default()));
        let peek = tokens.next().unwrap_or_else(|| eof_after(current.span));
        Self {
            tokens,
            current,
            peek,
            errors: Vec::new(),
            depth: 0,
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while !self.current.is(TokenKind::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }
        Program { statements }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        trace!("parse_statement: {}", self.current.kind);
        match self.current.kind {
            TokenKind::Value => self
                .parse_binding()
                .map(|(name, value)| Statement::Value { name, value }),
            TokenKind::Update => self
                .parse_binding()
                .map(|(name, value)| Statement::Update { name, value }),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    /// Shared shape of `value` and `update`: `<keyword> <ident> = <expr> [;]`.
    fn parse_binding(&mut self) -> Option<(Identifier, Expression)> {
        self.expect_peek(TokenKind::Ident)?;
        let name = Identifier::new(self.current.literal);
        self.expect_peek(TokenKind::Assign)?;
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek.is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some((name, value))
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest);

        // Everything up to the terminating semicolon belongs to the statement.
        while !self.current.is(TokenKind::Semicolon)
            && !self.peek.is(TokenKind::Eof)
            && !self.peek.is(TokenKind::CloseBlock)
        {
            self.next_token();
        }

        value.map(Statement::Return)
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let expression = self.parse_expression(Precedence::Lowest);
        if self.peek.is(TokenKind::Semicolon) {
            self.next_token();
        }
        expression.map(Statement::Expression)
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let depth = self.depth;
        let expression = stack::guarded(|| self.parse_nested_expression(precedence));
        self.depth = depth;
        expression
    }

    /// Every prefix or infix node adds a level of nesting, so a long operator
    /// chain counts as deep as the tree it builds.
    fn parse_nested_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        trace!("parse_expression: {} at {precedence:?}", self.current.kind);
        self.enter_nesting()?;
        let Some(prefix) = Self::prefix_parse_fn(self.current.kind) else {
            self.push_error(
                format!("no prefix parse function for {} found", self.current.kind),
                self.current.span,
            );
            return None;
        };

        let mut left = prefix(self)?;
        while !self.peek.is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            let Some(infix) = Self::infix_parse_fn(self.peek.kind) else {
                return Some(left);
            };
            self.next_token();
            self.enter_nesting()?;
            left = infix(self, left)?;
        }
        Some(left)
    }

    fn enter_nesting(&mut self) -> Option<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            self.push_error(
                format!("maximum nesting depth exceeded: {MAX_NESTING_DEPTH}"),
                self.current.span,
            );
            return None;
        }
        self.depth += 1;
        Some(())
    }

    fn prefix_parse_fn(kind: TokenKind) -> Option<PrefixParseFn<'a, I>> {
        let parse: PrefixParseFn<'a, I> = match kind {
            TokenKind::Ident => Self::parse_identifier,
            TokenKind::Int => Self::parse_integer_literal,
            TokenKind::String => Self::parse_string_literal,
            TokenKind::True | TokenKind::False => Self::parse_boolean,
            TokenKind::Bang | TokenKind::Minus | TokenKind::Increment | TokenKind::Decrement => {
                Self::parse_prefix_expression
            }
            TokenKind::LParen => Self::parse_grouped_expression,
            TokenKind::LBracket => Self::parse_array_literal,
            TokenKind::LBrace => Self::parse_map_literal,
            TokenKind::If => Self::parse_if_expression,
            TokenKind::Function => Self::parse_function_literal,
            _ => return None,
        };
        Some(parse)
    }

    fn infix_parse_fn(kind: TokenKind) -> Option<InfixParseFn<'a, I>> {
        let parse: InfixParseFn<'a, I> = match kind {
            TokenKind::LParen => Self::parse_call_expression,
            TokenKind::LBracket => Self::parse_index_expression,
            _ if infix_operator(kind).is_some() => Self::parse_infix_expression,
            _ => return None,
        };
        Some(parse)
    }

    fn parse_identifier(&mut self) -> Option<Expression> {
        Some(Expression::Identifier(Identifier::new(self.current.literal)))
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<i64>() {
            Ok(value) => Some(Expression::Integer(value)),
            Err(_) => {
                self.push_error(
                    format!("could not parse {:?} as integer", self.current.literal),
                    self.current.span,
                );
                None
            }
        }
    }

    fn parse_string_literal(&mut self) -> Option<Expression> {
        Some(Expression::String(self.current.literal.to_string()))
    }

    fn parse_boolean(&mut self) -> Option<Expression> {
        Some(Expression::Boolean(self.current.is(TokenKind::True)))
    }

    fn parse_prefix_expression(&mut self) -> Option<Expression> {
        trace!("parse_prefix_expression: {}", self.current.literal);
        let operator = match self.current.kind {
            TokenKind::Bang => PrefixOperator::Bang,
            TokenKind::Minus => PrefixOperator::Minus,
            TokenKind::Increment => PrefixOperator::Increment,
            TokenKind::Decrement => PrefixOperator::Decrement,
            _ => return None,
        };
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(&mut self, left: Expression) -> Option<Expression> {
        trace!("parse_infix_expression: {}", self.current.literal);
        let operator = infix_operator(self.current.kind)?;
        let precedence = self.current_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expression::Infix {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        Some(expression)
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        self.expect_peek(TokenKind::LParen)?;
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        self.expect_peek(TokenKind::OpenBlock)?;
        let consequence = self.parse_block_statement()?;

        let alternative = if self.peek.is(TokenKind::Else) {
            self.next_token();
            self.expect_peek(TokenKind::OpenBlock)?;
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        Some(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        self.expect_peek(TokenKind::LParen)?;
        let parameters = self.parse_function_parameters()?;
        self.expect_peek(TokenKind::OpenBlock)?;
        let body = self.parse_block_statement()?;
        Some(Expression::Function(Rc::new(FunctionLiteral {
            parameters,
            body,
        })))
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut parameters = Vec::new();
        if self.peek.is(TokenKind::RParen) {
            self.next_token();
            return Some(parameters);
        }

        self.expect_peek(TokenKind::Ident)?;
        parameters.push(Identifier::new(self.current.literal));
        while self.peek.is(TokenKind::Comma) {
            self.next_token();
            self.expect_peek(TokenKind::Ident)?;
            parameters.push(Identifier::new(self.current.literal));
        }

        self.expect_peek(TokenKind::RParen)?;
        Some(parameters)
    }

    /// Parses from the `->` through the matching `end`, leaving `end` current.
    fn parse_block_statement(&mut self) -> Option<BlockStatement> {
        trace!("parse_block_statement");
        let mut statements = Vec::new();
        self.next_token();

        while !self.current.is(TokenKind::CloseBlock) && !self.current.is(TokenKind::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }

        if self.current.is(TokenKind::Eof) {
            self.push_error(
                format!(
                    "expected next token to be {}, got {} instead",
                    TokenKind::CloseBlock,
                    TokenKind::Eof
                ),
                self.current.span,
            );
            return None;
        }

        Some(BlockStatement { statements })
    }

    fn parse_call_expression(&mut self, callee: Expression) -> Option<Expression> {
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expression::Call {
            callee: Box::new(callee),
            arguments,
        })
    }

    fn parse_index_expression(&mut self, collection: Expression) -> Option<Expression> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RBracket)?;
        Some(Expression::Index {
            collection: Box::new(collection),
            index: Box::new(index),
        })
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        self.parse_expression_list(TokenKind::RBracket)
            .map(Expression::Array)
    }

    fn parse_map_literal(&mut self) -> Option<Expression> {
        let mut pairs = Vec::new();
        while !self.peek.is(TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect_peek(TokenKind::Colon)?;
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.peek.is(TokenKind::RBrace) {
                self.expect_peek(TokenKind::Comma)?;
            }
        }
        self.expect_peek(TokenKind::RBrace)?;
        Some(Expression::Map(pairs))
    }

    /// Comma-separated expressions up to `end`; the opening delimiter is current.
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut list = Vec::new();
        if self.peek.is(end) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);
        while self.peek.is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Some(list)
    }

    fn next_token(&mut self) {
        let next = self
            .tokens
            .next()
            .unwrap_or_else(|| eof_after(self.peek.span));
        self.current = std::mem::replace(&mut self.peek, next);
    }

    fn expect_peek(&mut self, kind: TokenKind) -> Option<()> {
        if self.peek.is(kind) {
            self.next_token();
            Some(())
        } else {
            self.push_error(
                format!(
                    "expected next token to be {kind}, got {} instead",
                    self.peek.kind
                ),
                self.peek.span,
            );
            None
        }
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek.kind)
    }

    fn current_precedence(&self) -> Precedence {
        Precedence::of(self.current.kind)
    }

    fn push_error(&mut self, message: String, span: Span) {
        self.errors.push(ParseError::new(message, span));
    }
}

fn infix_operator(kind: TokenKind) -> Option<InfixOperator> {
    let operator = match kind {
        TokenKind::Plus => InfixOperator::Plus,
        TokenKind::Minus => InfixOperator::Minus,
        TokenKind::Asterisk => InfixOperator::Asterisk,
        TokenKind::Slash => InfixOperator::Slash,
        TokenKind::Lt => InfixOperator::Lt,
        TokenKind::Gt => InfixOperator::Gt,
        TokenKind::LtEq => InfixOperator::LtEq,
        TokenKind::GtEq => InfixOperator::GtEq,
        TokenKind::Eq => InfixOperator::Eq,
        TokenKind::NotEq => InfixOperator::NotEq,
        TokenKind::And => InfixOperator::And,
        TokenKind::Or => InfixOperator::Or,
        TokenKind::PlusEq => InfixOperator::PlusAssign,
        TokenKind::MinusEq => InfixOperator::MinusAssign,
        TokenKind::MulEq => InfixOperator::AsteriskAssign,
        TokenKind::SlashEq => InfixOperator::SlashAssign,
        _ => return None,
    };
    Some(operator)
}

fn eof_after(span: Span) -> Token<'static> {
    Token::eof(Span {
        start: span.end,
        ..span
    })
}

pub fn parse_tokens<'a, T>(tokens: T) -> Result<Program, ParseErrors>
where
    T: IntoIterator<Item = Token<'a>>,
{
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    if parser.errors.is_empty() {
        Ok(program)
    } else {
        Err(ParseErrors(parser.errors))
    }
}

pub fn parse(input: &str) -> Result<Program, ParseErrors> {
    parse_tokens(Lexer::new(input))
}
