use std::fmt;
use std::rc::Rc;

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// Statements between `->` and the closing `end`.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Identifier {
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    /// `value <name> = <value>;` binds in the current scope.
    Value { name: Identifier, value: Expression },
    /// `update <name> = <value>;` rebinds the nearest scope holding `name`.
    Update { name: Identifier, value: Expression },
    Return(Expression),
    Expression(Expression),
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionLiteral {
    pub parameters: Vec<Identifier>,
    pub body: BlockStatement,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Integer(i64),
    Boolean(bool),
    String(String),
    Identifier(Identifier),
    Prefix {
        operator: PrefixOperator,
        right: Box<Expression>,
    },
    Infix {
        operator: InfixOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    /// Shared so closures can hold the literal without copying the body.
    Function(Rc<FunctionLiteral>),
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Array(Vec<Expression>),
    Index {
        collection: Box<Expression>,
        index: Box<Expression>,
    },
    /// Pairs in source order; duplicates are resolved at evaluation time.
    Map(Vec<(Expression, Expression)>),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PrefixOperator {
    Bang,
    Minus,
    Increment,
    Decrement,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InfixOperator {
    Plus,
    Minus,
    Asterisk,
    Slash,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
    PlusAssign,
    MinusAssign,
    AsteriskAssign,
    SlashAssign,
}

impl InfixOperator {
    /// The arithmetic operator a compound assignment applies, if this is one.
    pub fn compound_base(self) -> Option<InfixOperator> {
        match self {
            InfixOperator::PlusAssign => Some(InfixOperator::Plus),
            InfixOperator::MinusAssign => Some(InfixOperator::Minus),
            InfixOperator::AsteriskAssign => Some(InfixOperator::Asterisk),
            InfixOperator::SlashAssign => Some(InfixOperator::Slash),
            _ => None,
        }
    }
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrefixOperator::Bang => "!",
            PrefixOperator::Minus => "-",
            PrefixOperator::Increment => "++",
            PrefixOperator::Decrement => "--",
        })
    }
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InfixOperator::Plus => "+",
            InfixOperator::Minus => "-",
            InfixOperator::Asterisk => "*",
            InfixOperator::Slash => "/",
            InfixOperator::Lt => "<",
            InfixOperator::Gt => ">",
            InfixOperator::LtEq => "<=",
            InfixOperator::GtEq => ">=",
            InfixOperator::Eq => "==",
            InfixOperator::NotEq => "!=",
            InfixOperator::And => "&&",
            InfixOperator::Or => "||",
            InfixOperator::PlusAssign => "+=",
            InfixOperator::MinusAssign => "-=",
            InfixOperator::AsteriskAssign => "*=",
            InfixOperator::SlashAssign => "/=",
        })
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, statement) in self.statements.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_separated(f, &self.statements, " ")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Value { name, value } => write!(f, "value {name} = {value};"),
            Statement::Update { name, value } => write!(f, "update {name} = {value};"),
            Statement::Return(value) => write!(f, "return {value};"),
            Statement::Expression(expression) => write!(f, "{expression}"),
        }
    }
}

impl fmt::Display for FunctionLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        write_separated(f, &self.parameters, ", ")?;
        write!(f, ") -> {} end", self.body)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Integer(value) => write!(f, "{value}"),
            Expression::Boolean(value) => write!(f, "{value}"),
            Expression::String(value) => write!(f, "\"{value}\""),
            Expression::Identifier(identifier) => write!(f, "{identifier}"),
            Expression::Prefix { operator, right } => write!(f, "({operator}{right})"),
            Expression::Infix {
                operator,
                left,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if ({condition}) -> {consequence} end")?;
                if let Some(alternative) = alternative {
                    write!(f, " else -> {alternative} end")?;
                }
                Ok(())
            }
            Expression::Function(literal) => write!(f, "{literal}"),
            Expression::Call { callee, arguments } => {
                write!(f, "{callee}(")?;
                write_separated(f, arguments, ", ")?;
                f.write_str(")")
            }
            Expression::Array(elements) => {
                f.write_str("[")?;
                write_separated(f, elements, ", ")?;
                f.write_str("]")
            }
            Expression::Index { collection, index } => write!(f, "({collection}[{index}])"),
            Expression::Map(pairs) => {
                f.write_str("{")?;
                for (position, (key, value)) in pairs.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_separated<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: &str,
) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_statements_as_source() {
        let program = Program {
            statements: vec![
                Statement::Value {
                    name: Identifier::new("total"),
                    value: Expression::Infix {
                        operator: InfixOperator::Plus,
                        left: Box::new(Expression::Identifier(Identifier::new("a"))),
                        right: Box::new(Expression::Prefix {
                            operator: PrefixOperator::Minus,
                            right: Box::new(Expression::Integer(2)),
                        }),
                    },
                },
                Statement::Return(Expression::Index {
                    collection: Box::new(Expression::Array(vec![
                        Expression::String("x".to_string()),
                        Expression::Boolean(true),
                    ])),
                    index: Box::new(Expression::Integer(0)),
                }),
            ],
        };

        assert_eq!(
            program.to_string(),
            "value total = (a + (-2));\nreturn ([\"x\", true][0]);"
        );
    }

    #[test]
    fn renders_functions_and_conditionals_with_blocks() {
        let function = Expression::Function(Rc::new(FunctionLiteral {
            parameters: vec![Identifier::new("x"), Identifier::new("y")],
            body: BlockStatement {
                statements: vec![Statement::Expression(Expression::If {
                    condition: Box::new(Expression::Identifier(Identifier::new("x"))),
                    consequence: BlockStatement {
                        statements: vec![Statement::Return(Expression::Identifier(
                            Identifier::new("y"),
                        ))],
                    },
                    alternative: Some(BlockStatement {
                        statements: vec![Statement::Expression(Expression::Integer(0))],
                    }),
                })],
            },
        }));

        assert_eq!(
            function.to_string(),
            "fn(x, y) -> if (x) -> return y; end else -> 0 end end"
        );
    }
}
