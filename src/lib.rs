pub mod analyzer;
pub mod ast;
pub mod codegen;
pub mod optimizer;

use thiserror::Error;
use tracing::debug;

use analyzer::{Analysis, Diagnostic, SemanticWarning};
use ast::Node;
use codegen::{Codegen, CodegenError, Instruction};
use optimizer::Optimizer;

#[derive(Debug, Error)]
pub enum Error {
    #[error("semantic analysis failed:\n{0}")]
    Semantic(Analysis),
    #[error("code generation failed: {0}")]
    Codegen(#[from] CodegenError),
    #[error("invalid AST: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Stdin(#[from] clap_stdin::StdinError),
}

#[derive(Clone, Copy, Debug)]
pub struct Options {
    pub optimize: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { optimize: true }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Compiled {
    pub instructions: Vec<Instruction>,
    pub warnings: Vec<Diagnostic<SemanticWarning>>,
    /// Rewrites applied by the optimizer, 0 when it did not run.
    pub optimizations: usize,
}

impl Compiled {
    /// One instruction per line, the format the machine loads.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for instruction in self.instructions.iter() {
            out.push_str(&instruction.to_string());
            out.push('\n');
        }
        out
    }
}

pub fn compile(program: &Node, options: &Options) -> Result<Compiled, Error> {
    debug!("semantic analysis");
    let (analysis, symbol_table) = analyzer::analyze(program);
    if !analysis.success() {
        return Err(Error::Semantic(analysis));
    }

    let mut optimizer = Optimizer::new();
    let program = if options.optimize {
        optimizer.run(program.clone())
    } else {
        program.clone()
    };

    debug!("code generation");
    let instructions = Codegen::new(symbol_table).generate(&program)?;

    Ok(Compiled {
        instructions,
        warnings: analysis.warnings,
        optimizations: optimizer.optimizations(),
    })
}

/// Parses a JSON-serialized tree and compiles it.
pub fn compile_json(source: &str, options: &Options) -> Result<Compiled, Error> {
    let program: Node = serde_json::from_str(source)?;
    compile(&program, options)
}
