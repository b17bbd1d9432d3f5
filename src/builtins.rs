use std::rc::Rc;

use crate::evaluator::RuntimeError;
use crate::object::Object;

/// Native functions reachable by name when no binding shadows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Len,
    First,
    Last,
    Rest,
    Push,
    Puts,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Self::Len,
        Self::First,
        Self::Last,
        Self::Rest,
        Self::Push,
        Self::Puts,
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Len => "len",
            Self::First => "first",
            Self::Last => "last",
            Self::Rest => "rest",
            Self::Push => "push",
            Self::Puts => "puts",
        }
    }

    /// Runs the builtin. `puts` appends one line per argument to `output`.
    pub fn call(
        self,
        arguments: Vec<Object>,
        output: &mut Vec<String>,
    ) -> Result<Object, RuntimeError> {
        match self {
            Self::Len => {
                let [argument] = exact_arguments::<1>(arguments)?;
                match argument {
                    Object::String(text) => Ok(Object::Integer(text.len() as i64)),
                    Object::Array(elements) => Ok(Object::Integer(elements.len() as i64)),
                    other => Err(self.unsupported(&other)),
                }
            }
            Self::First => {
                let [argument] = exact_arguments::<1>(arguments)?;
                match argument {
                    Object::Array(elements) => {
                        Ok(elements.first().cloned().unwrap_or(Object::Null))
                    }
                    other => Err(self.unsupported(&other)),
                }
            }
            Self::Last => {
                let [argument] = exact_arguments::<1>(arguments)?;
                match argument {
                    Object::Array(elements) => {
                        Ok(elements.last().cloned().unwrap_or(Object::Null))
                    }
                    other => Err(self.unsupported(&other)),
                }
            }
            Self::Rest => {
                let [argument] = exact_arguments::<1>(arguments)?;
                match argument {
                    Object::Array(elements) if elements.is_empty() => Ok(Object::Null),
                    Object::Array(elements) => Ok(Object::array(elements[1..].to_vec())),
                    other => Err(self.unsupported(&other)),
                }
            }
            Self::Push => {
                let [collection, element] = exact_arguments::<2>(arguments)?;
                match collection {
                    Object::Array(elements) => {
                        let mut extended = Vec::with_capacity(elements.len() + 1);
                        extended.extend(elements.iter().cloned());
                        extended.push(element);
                        Ok(Object::Array(Rc::new(extended)))
                    }
                    other => Err(self.unsupported(&other)),
                }
            }
            Self::Puts => {
                output.extend(arguments.iter().map(Object::to_string));
                Ok(Object::Null)
            }
        }
    }

    fn unsupported(self, argument: &Object) -> RuntimeError {
        RuntimeError::UnsupportedArgument {
            builtin: self.name(),
            type_name: argument.type_name(),
        }
    }
}

fn exact_arguments<const N: usize>(
    arguments: Vec<Object>,
) -> Result<[Object; N], RuntimeError> {
    let got = arguments.len();
    <[Object; N]>::try_from(arguments)
        .map_err(|_| RuntimeError::WrongArgumentCount { want: N, got })
}
