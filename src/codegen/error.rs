use thiserror::Error;

use crate::ast::AstError;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum CodegenError {
    #[error(transparent)]
    Ast(#[from] AstError),
    #[error("no storage allocated for '{0}'")]
    UnknownVariable(String),
    #[error("call to '{0}' before its code was generated")]
    UnknownSubprogram(String),
    #[error("real constants cannot be pushed on the target machine")]
    UnsupportedReal,
    #[error("cannot store into a character of string '{0}'")]
    StringElementStore(String),
}
