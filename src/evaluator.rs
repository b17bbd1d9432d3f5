use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::ast::{
    BlockStatement, Expression, Identifier, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::builtins::Builtin;
use crate::object::{Environment, Function, MapPair, Object};
use crate::stack;

mod error;

pub use error::RuntimeError;

/// Evaluator limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Nested closure calls allowed before evaluation fails. The host stack
    /// grows on demand, so this bounds memory rather than guarding a fixed
    /// thread stack.
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: 10_000,
        }
    }
}

/// Why evaluation stopped early. `Return` travels up to the nearest function
/// call (or the program); `Error` travels all the way out.
#[derive(Debug)]
enum Unwind {
    Return(Object),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

type EvalResult = Result<Object, Unwind>;

/// Tree-walking evaluator. Holds configuration, the current call depth and
/// every line written by `puts`.
#[derive(Debug, Default)]
pub struct Interpreter {
    config: Config,
    depth: usize,
    output: Vec<String>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Lines produced by `puts` so far.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Runs every statement in `env`. A top-level `return` ends the program
    /// with its value; otherwise the result is the last statement's value.
    pub fn eval_program(
        &mut self,
        program: &Program,
        env: &Environment,
    ) -> Result<Object, RuntimeError> {
        debug!(
            "evaluating program with {} statement(s)",
            program.statements.len()
        );
        let mut result = Object::Null;
        for statement in &program.statements {
            match self.eval_statement(statement, env) {
                Ok(value) => result = value,
                Err(Unwind::Return(value)) => return Ok(value),
                Err(Unwind::Error(error)) => {
                    debug!("program failed: {error}");
                    return Err(error);
                }
            }
        }
        Ok(result)
    }

    fn eval_block(&mut self, block: &BlockStatement, env: &Environment) -> EvalResult {
        let mut result = Object::Null;
        for statement in &block.statements {
            result = self.eval_statement(statement, env)?;
        }
        Ok(result)
    }

    fn eval_statement(&mut self, statement: &Statement, env: &Environment) -> EvalResult {
        match statement {
            Statement::Expression(expression) => self.eval_expression(expression, env),
            Statement::Value { name, value } => {
                let value = self.eval_expression(value, env)?;
                env.set(name.name.clone(), value);
                Ok(Object::Null)
            }
            Statement::Update { name, value } => {
                let value = self.eval_expression(value, env)?;
                rebind(env, name, value)?;
                Ok(Object::Null)
            }
            Statement::Return(value) => {
                let value = self.eval_expression(value, env)?;
                Err(Unwind::Return(value))
            }
        }
    }

    fn eval_expression(&mut self, expression: &Expression, env: &Environment) -> EvalResult {
        stack::guarded(|| self.eval_nested_expression(expression, env))
    }

    fn eval_nested_expression(
        &mut self,
        expression: &Expression,
        env: &Environment,
    ) -> EvalResult {
        match expression {
            Expression::Integer(value) => Ok(Object::Integer(*value)),
            Expression::Boolean(value) => Ok(Object::from(*value)),
            Expression::String(value) => Ok(Object::string(value.as_str())),
            Expression::Identifier(identifier) => Ok(resolve(env, identifier)?),
            Expression::Prefix { operator, right } => {
                self.eval_prefix_expression(*operator, right, env)
            }
            Expression::Infix {
                operator,
                left,
                right,
            } => match operator.compound_base() {
                Some(base) => self.eval_compound_assignment(base, left, right, env),
                None => {
                    // Right operand first, so its errors win.
                    let right = self.eval_expression(right, env)?;
                    let left = self.eval_expression(left, env)?;
                    Ok(eval_infix_expression(*operator, left, right)?)
                }
            },
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval_expression(condition, env)?;
                if condition.is_truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    Ok(Object::Null)
                }
            }
            Expression::Function(literal) => Ok(Object::Function(Rc::new(Function {
                literal: Rc::clone(literal),
                env: env.clone(),
            }))),
            Expression::Call { callee, arguments } => {
                let callee = self.eval_expression(callee, env)?;
                let arguments = self.eval_expressions(arguments, env)?;
                Ok(self.apply_function(callee, arguments)?)
            }
            Expression::Array(elements) => {
                let elements = self.eval_expressions(elements, env)?;
                Ok(Object::array(elements))
            }
            Expression::Index { collection, index } => {
                let collection = self.eval_expression(collection, env)?;
                let index = self.eval_expression(index, env)?;
                Ok(eval_index_expression(&collection, &index)?)
            }
            Expression::Map(pairs) => self.eval_map_literal(pairs, env),
        }
    }

    /// Evaluates left to right, stopping at the first failure.
    fn eval_expressions(
        &mut self,
        expressions: &[Expression],
        env: &Environment,
    ) -> Result<Vec<Object>, Unwind> {
        expressions
            .iter()
            .map(|expression| self.eval_expression(expression, env))
            .collect()
    }

    fn eval_prefix_expression(
        &mut self,
        operator: PrefixOperator,
        right: &Expression,
        env: &Environment,
    ) -> EvalResult {
        let value = self.eval_expression(right, env)?;
        match (operator, value) {
            (PrefixOperator::Bang, value) => Ok(Object::from(matches!(
                value,
                Object::Boolean(false) | Object::Null
            ))),
            (PrefixOperator::Minus, Object::Integer(value)) => {
                Ok(Object::Integer(value.wrapping_neg()))
            }
            (PrefixOperator::Increment | PrefixOperator::Decrement, Object::Integer(value)) => {
                let stepped = if operator == PrefixOperator::Increment {
                    value.wrapping_add(1)
                } else {
                    value.wrapping_sub(1)
                };
                let result = Object::Integer(stepped);
                if let Expression::Identifier(identifier) = right {
                    rebind(env, identifier, result.clone())?;
                }
                Ok(result)
            }
            (operator, value) => Err(RuntimeError::UnknownPrefixOperator {
                operator,
                right: value.type_name(),
            }
            .into()),
        }
    }

    /// `target op= value`: computes `target op value`, stores it back into
    /// `target` and yields it.
    fn eval_compound_assignment(
        &mut self,
        base: InfixOperator,
        target: &Expression,
        value: &Expression,
        env: &Environment,
    ) -> EvalResult {
        let Expression::Identifier(identifier) = target else {
            return Err(RuntimeError::InvalidAssignmentTarget {
                target: target.to_string(),
            }
            .into());
        };
        let value = self.eval_expression(value, env)?;
        let current = resolve(env, identifier)?;
        let result = eval_infix_expression(base, current, value)?;
        rebind(env, identifier, result.clone())?;
        Ok(result)
    }

    fn eval_map_literal(
        &mut self,
        pairs: &[(Expression, Expression)],
        env: &Environment,
    ) -> EvalResult {
        let mut map = IndexMap::with_capacity(pairs.len());
        for (key_expression, value_expression) in pairs {
            let key = self.eval_expression(key_expression, env)?;
            let map_key = key.map_key().ok_or(RuntimeError::UnusableMapKey {
                type_name: key.type_name(),
            })?;
            let value = self.eval_expression(value_expression, env)?;
            map.insert(map_key, MapPair { key, value });
        }
        Ok(Object::Map(Rc::new(map)))
    }

    fn apply_function(
        &mut self,
        callee: Object,
        arguments: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        let function = match callee {
            Object::Function(function) => function,
            Object::Builtin(builtin) => {
                debug!("calling builtin {}", builtin.name());
                return builtin.call(arguments, &mut self.output);
            }
            other => {
                return Err(RuntimeError::NotAFunction {
                    type_name: other.type_name(),
                });
            }
        };

        let parameters = &function.literal.parameters;
        if parameters.len() != arguments.len() {
            return Err(RuntimeError::WrongArgumentCount {
                want: parameters.len(),
                got: arguments.len(),
            });
        }
        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.config.max_call_depth,
            });
        }

        let scope = Environment::new_child(&function.env);
        for (parameter, argument) in parameters.iter().zip(arguments) {
            scope.set(parameter.name.clone(), argument);
        }

        self.depth += 1;
        debug!("calling {} at depth {}", function.literal, self.depth);
        let result = self.eval_block(&function.literal.body, &scope);
        self.depth -= 1;

        match result {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(error)) => Err(error),
        }
    }
}

/// Evaluates `program` in `env` with the default configuration. Output from
/// `puts` is discarded; use an [`Interpreter`] to read it.
pub fn evaluate(program: &Program, env: &Environment) -> Result<Object, RuntimeError> {
    Interpreter::new().eval_program(program, env)
}

/// Environment first, then builtins.
fn resolve(env: &Environment, identifier: &Identifier) -> Result<Object, RuntimeError> {
    env.get(&identifier.name)
        .or_else(|| Builtin::lookup(&identifier.name).map(Object::Builtin))
        .ok_or_else(|| RuntimeError::IdentifierNotFound {
            name: identifier.name.clone(),
        })
}

fn rebind(env: &Environment, identifier: &Identifier, value: Object) -> Result<(), RuntimeError> {
    if env.update(&identifier.name, value) {
        Ok(())
    } else {
        Err(RuntimeError::UnboundUpdate {
            name: identifier.name.clone(),
        })
    }
}

fn eval_infix_expression(
    operator: InfixOperator,
    left: Object,
    right: Object,
) -> Result<Object, RuntimeError> {
    match (&left, &right) {
        (Object::Integer(left), Object::Integer(right)) => {
            eval_integer_infix_expression(operator, *left, *right)
        }
        _ if operator == InfixOperator::Eq => Ok(Object::from(left.is_identical(&right))),
        _ if operator == InfixOperator::NotEq => Ok(Object::from(!left.is_identical(&right))),
        (Object::Boolean(left), Object::Boolean(right)) if operator == InfixOperator::And => {
            Ok(Object::from(*left && *right))
        }
        (Object::Boolean(left), Object::Boolean(right)) if operator == InfixOperator::Or => {
            Ok(Object::from(*left || *right))
        }
        _ if left.type_name() != right.type_name() => Err(RuntimeError::TypeMismatch {
            left: left.type_name(),
            operator,
            right: right.type_name(),
        }),
        (Object::String(left), Object::String(right)) if operator == InfixOperator::Plus => {
            let mut joined = String::with_capacity(left.len() + right.len());
            joined.push_str(left);
            joined.push_str(right);
            Ok(Object::string(joined))
        }
        _ => Err(RuntimeError::UnknownInfixOperator {
            left: left.type_name(),
            operator,
            right: right.type_name(),
        }),
    }
}

fn eval_integer_infix_expression(
    operator: InfixOperator,
    left: i64,
    right: i64,
) -> Result<Object, RuntimeError> {
    let value = match operator {
        InfixOperator::Plus => Object::Integer(left.wrapping_add(right)),
        InfixOperator::Minus => Object::Integer(left.wrapping_sub(right)),
        InfixOperator::Asterisk => Object::Integer(left.wrapping_mul(right)),
        InfixOperator::Slash => {
            if right == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Object::Integer(left.wrapping_div(right))
        }
        InfixOperator::Lt => Object::from(left < right),
        InfixOperator::Gt => Object::from(left > right),
        InfixOperator::LtEq => Object::from(left <= right),
        InfixOperator::GtEq => Object::from(left >= right),
        InfixOperator::Eq => Object::from(left == right),
        InfixOperator::NotEq => Object::from(left != right),
        InfixOperator::And
        | InfixOperator::Or
        | InfixOperator::PlusAssign
        | InfixOperator::MinusAssign
        | InfixOperator::AsteriskAssign
        | InfixOperator::SlashAssign => {
            return Err(RuntimeError::UnknownInfixOperator {
                left: "INTEGER",
                operator,
                right: "INTEGER",
            });
        }
    };
    Ok(value)
}

fn eval_index_expression(collection: &Object, index: &Object) -> Result<Object, RuntimeError> {
    match (collection, index) {
        (Object::Array(elements), Object::Integer(position)) => Ok(usize::try_from(*position)
            .ok()
            .and_then(|position| elements.get(position))
            .cloned()
            .unwrap_or(Object::Null)),
        (Object::Map(pairs), key) => {
            let map_key = key.map_key().ok_or(RuntimeError::UnusableMapKey {
                type_name: key.type_name(),
            })?;
            Ok(pairs
                .get(&map_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Object::Null))
        }
        (other, _) => Err(RuntimeError::IndexNotSupported {
            type_name: other.type_name(),
        }),
    }
}
