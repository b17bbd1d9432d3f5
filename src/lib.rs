//! Sepia: a small dynamically typed scripting language with block syntax,
//! first-class closures, arrays and maps, evaluated by walking its AST.

use thiserror::Error;

pub mod ast;
pub mod builtins;
pub mod evaluator;
pub mod lexer;
pub mod object;
pub mod parser;
mod stack;
pub mod token;

use evaluator::RuntimeError;
use object::{Environment, Object};
use parser::ParseErrors;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseErrors),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Lexes, parses and evaluates `source` in a fresh root environment.
pub fn run(source: &str) -> Result<Object, Error> {
    let program = parser::parse(source)?;
    let env = Environment::new_root();
    Ok(evaluator::evaluate(&program, &env)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn runs_whole_programs() {
        let source = indoc! {"
            # sum the first n integers
            value sum = fn(n) ->
                if (n == 0) -> return 0; end
                n + sum(n - 1);
            end;
            sum(10);
        "};
        let result = run(source).expect("run failed");
        assert_eq!(result.to_string(), "55");
    }

    #[test]
    fn separates_parse_and_runtime_failures() {
        assert!(matches!(run("value = 1;"), Err(Error::Parse(_))));
        assert!(matches!(
            run("5 + true;"),
            Err(Error::Runtime(RuntimeError::TypeMismatch { .. }))
        ));
    }
}
