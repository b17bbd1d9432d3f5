use anyhow::{Context, Result, ensure};
use std::path::Path;

use sepia::evaluator::{Config, Interpreter};
use sepia::object::Environment;
use sepia::parser;
use test_support::{Case, CaseClass, load_cases, normalize_output};

fn config_for(case: &Case) -> Config {
    let mut config = Config::default();
    if let Some(depth) = case.spec.max_call_depth {
        config.max_call_depth = depth;
    }
    config
}

fn expected_error(case: &Case) -> Result<&str> {
    case.spec
        .expected
        .error_contains
        .as_deref()
        .with_context(|| format!("Missing error_contains in {}", case.name))
}

fn run_case(case: &Case) -> Result<()> {
    if case.spec.bench.enabled {
        ensure!(
            !case.spec.bench.tags.is_empty(),
            "Case {} has bench enabled but no tags",
            case.name
        );
    }
    let source = case.source()?;

    match case.spec.class {
        CaseClass::RuntimeSuccess => {
            let expected = &case.spec.expected;
            ensure!(
                expected.result.is_some() || expected.stdout_file.is_some(),
                "Case {} expects neither a result nor stdout",
                case.name
            );
            let program =
                parser::parse(&source).with_context(|| format!("Parsing {}", case.name))?;
            let mut interpreter = Interpreter::with_config(config_for(case));
            let value = interpreter
                .eval_program(&program, &Environment::new_root())
                .with_context(|| format!("Evaluating {}", case.name))?;

            if let Some(result) = expected.result.as_deref() {
                assert_eq!(value.to_string(), result, "Result mismatch for {}", case.name);
            }
            if let Some(stdout_file) = expected.stdout_file.as_deref() {
                let expected_output = normalize_output(&case.read_text(stdout_file)?);
                let actual_output = normalize_output(&interpreter.output().join("\n"));
                assert_eq!(
                    actual_output, expected_output,
                    "Output mismatch for {}",
                    case.name
                );
            }
        }
        CaseClass::FrontendError => {
            let expected_error = expected_error(case)?;
            let parse_result = parser::parse(&source);
            ensure!(
                parse_result.is_err(),
                "Expected frontend error in {}, but parsing succeeded",
                case.name
            );
            let actual = parse_result
                .expect_err("parse_result checked as err")
                .to_string();
            ensure!(
                actual.contains(expected_error),
                "Expected frontend error containing '{expected_error}' in {}, got '{actual}'",
                case.name
            );
        }
        CaseClass::RuntimeError => {
            let expected_error = expected_error(case)?;
            let program =
                parser::parse(&source).with_context(|| format!("Parsing {}", case.name))?;
            let mut interpreter = Interpreter::with_config(config_for(case));
            let result = interpreter.eval_program(&program, &Environment::new_root());
            ensure!(
                result.is_err(),
                "Expected runtime error in {}",
                case.name
            );
            let actual = result.expect_err("result checked as err").to_string();
            ensure!(
                actual.contains(expected_error),
                "Expected runtime error containing '{expected_error}' in {}, got '{actual}'",
                case.name
            );
        }
    }

    Ok(())
}

#[test]
fn runs_program_fixtures() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;
    for case in &cases {
        run_case(case)?;
    }
    Ok(())
}

#[test]
fn fixtures_cover_every_class() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;
    for class in [
        CaseClass::RuntimeSuccess,
        CaseClass::FrontendError,
        CaseClass::RuntimeError,
    ] {
        ensure!(
            cases.iter().any(|case| case.spec.class == class),
            "No fixture of class {class:?}"
        );
    }
    Ok(())
}
