use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    #[error("line {line}: variable `{name}` is not declared")]
    UndeclaredVariable { name: String, line: u32 },
    #[error("line {line}: procedure `{name}` is not defined")]
    UnknownProcedure { name: String, line: u32 },
    #[error("line {line}: `{name}` expects {expected} argument(s) but {found} were given")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        line: u32,
    },
    #[error("line {line}: procedure `{name}` is defined more than once")]
    DuplicateProcedure { name: String, line: u32 },
    #[error("line {line}: unknown pen colour `{name}`")]
    UnknownColor { name: String, line: u32 },
    #[error("line {line}: literal {value} does not fit in 32 bits")]
    LiteralOutOfRange { value: String, line: u32 },
    #[error("line {line}: `{kind}` cannot be used here")]
    UnsupportedNode { kind: &'static str, line: u32 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ast(#[from] syntax::AstError),
    #[error(transparent)]
    Gen(#[from] GenError),
}
