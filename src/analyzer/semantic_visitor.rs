use tracing::debug;

use crate::ast::{AstError, Node, NodeKind, UnaryOpKind};

use super::{
    error::{Analysis, Diagnostic, SemanticError, SemanticWarning},
    symbol_table::{Symbol, SymbolTable},
    ty::type_of_node,
    Ty,
};

const IO_BUILTINS: [&str; 4] = ["write", "writeln", "read", "readln"];

type Visit<T> = Result<T, AstError>;

pub struct SemanticVisitor {
    symbol_table: SymbolTable,
    analysis: Analysis,
    in_assignment_target: bool,
}

impl Default for SemanticVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticVisitor {
    pub fn new() -> Self {
        Self {
            symbol_table: SymbolTable::new(),
            analysis: Analysis::default(),
            in_assignment_target: false,
        }
    }

    /// Checks the whole program and reports every violation found. A
    /// malformed tree ends the walk early with one `Internal` error.
    pub fn analyze(&mut self, program: &Node) -> Analysis {
        self.symbol_table = SymbolTable::new();
        self.analysis = Analysis::default();
        self.in_assignment_target = false;

        if let Err(e) = self.visit_node(program) {
            self.analysis.errors.push(Diagnostic {
                line: None,
                kind: SemanticError::Internal(e.to_string()),
            });
        }

        debug!(
            errors = self.analysis.errors.len(),
            warnings = self.analysis.warnings.len(),
            "semantic analysis finished"
        );
        self.analysis.clone()
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    pub fn into_symbol_table(self) -> SymbolTable {
        self.symbol_table
    }

    fn error(&mut self, line: Option<usize>, kind: SemanticError) {
        self.analysis.errors.push(Diagnostic { line, kind });
    }

    fn warning(&mut self, line: Option<usize>, kind: SemanticWarning) {
        self.analysis.warnings.push(Diagnostic { line, kind });
    }

    fn visit_node(&mut self, node: &Node) -> Visit<()> {
        match node.kind {
            NodeKind::Program => {
                if let Some(block) = node.children.first() {
                    self.visit_node(block)?;
                }
            }
            NodeKind::Block => self.visit_block(node)?,
            NodeKind::Declarations => {
                for d in node.children.iter().filter(|c| c.kind != NodeKind::Empty) {
                    self.visit_node(d)?;
                }
            }
            NodeKind::Declaration => self.visit_declaration(node)?,
            NodeKind::ProcedureDeclaration => self.visit_subprogram(node, false)?,
            NodeKind::FunctionDeclaration => self.visit_subprogram(node, true)?,
            NodeKind::AssignmentStatement => self.visit_assignment(node)?,
            NodeKind::IfStatement => self.visit_if(node)?,
            NodeKind::WhileStatement => self.visit_while(node)?,
            NodeKind::ForStatement => self.visit_for(node)?,
            NodeKind::ReadStatement => self.visit_read(&node.children, node.line)?,
            NodeKind::WriteStatement => self.visit_write(&node.children)?,
            NodeKind::ProcedureCall => self.visit_procedure_call(node)?,
            NodeKind::FunctionCall
            | NodeKind::VariableAccess
            | NodeKind::ArrayAccess
            | NodeKind::BinaryOp
            | NodeKind::UnaryOp => {
                self.visit_expr(node)?;
            }
            _ => {
                for child in node.children.iter() {
                    self.visit_node(child)?;
                }
            }
        };
        Ok(())
    }

    /// Variables first, then subprograms, then the body, whatever order the
    /// parser put them in.
    fn visit_block(&mut self, block: &Node) -> Visit<()> {
        for kind in [
            NodeKind::Declarations,
            NodeKind::FunctionDeclarations,
            NodeKind::CompoundStatement,
        ] {
            if let Some(child) = block.find_child(kind) {
                self.visit_node(child)?;
            }
        }
        Ok(())
    }

    fn resolve_type(&mut self, type_node: &Node) -> Visit<Ty> {
        if let Some(ty) = type_of_node(type_node)? {
            if let Some((lower, upper)) = ty.invalid_range() {
                self.error(
                    type_node.line,
                    SemanticError::InvalidRange { lower, upper },
                );
                return Ok(Ty::Error);
            }
            return Ok(ty);
        }
        let mut named = type_node;
        while named.kind == NodeKind::ArrayType {
            named = named.child(0)?;
        }
        self.error(
            type_node.line,
            SemanticError::UnknownType(named.name()?.to_string()),
        );
        Ok(Ty::Error)
    }

    fn visit_declaration(&mut self, declaration: &Node) -> Visit<()> {
        let ty = self.resolve_type(declaration.child(1)?)?;

        for id in declaration.child(0)?.identifiers() {
            let name = id.name()?;
            if self.symbol_table.lookup_current_scope(name).is_some() {
                self.error(
                    id.line.or(declaration.line),
                    SemanticError::DuplicateDeclaration(name.to_string()),
                );
            } else {
                self.symbol_table.add(name, Symbol::variable(ty.clone(), false));
            }
        }
        Ok(())
    }

    /// One `(name, line, type)` per formal parameter, in declaration order.
    fn formal_params<'a>(
        &mut self,
        params: &'a Node,
    ) -> Visit<Vec<(&'a str, Option<usize>, Ty)>> {
        let mut out = vec![];
        if params.kind != NodeKind::FormalParameters {
            return Ok(out);
        }
        for param in params.children.iter() {
            let ty = self.resolve_type(param.child(1)?)?;
            for id in param.child(0)?.identifiers() {
                out.push((id.name()?, id.line.or(param.line), ty.clone()));
            }
        }
        Ok(out)
    }

    fn visit_subprogram(&mut self, decl: &Node, is_function: bool) -> Visit<()> {
        let name = decl.name()?;
        let params = self.formal_params(decl.child(0)?)?;
        let ret = if is_function {
            Some(self.resolve_type(decl.child(1)?)?)
        } else {
            None
        };

        if self.symbol_table.lookup_current_scope(name).is_some() {
            self.error(
                decl.line,
                SemanticError::DuplicateDeclaration(name.to_string()),
            );
        } else {
            let param_types = params.iter().map(|(_, _, ty)| ty.clone()).collect();
            let symbol = match &ret {
                Some(ret) => Symbol::Function {
                    params: param_types,
                    ret: ret.clone(),
                },
                None => Symbol::Procedure {
                    params: param_types,
                },
            };
            self.symbol_table.add(name, symbol);
        }

        let scope = self.symbol_table.enter_scope();
        self.symbol_table.bind_subprogram_scope(name, scope);
        if let Some(ret) = ret {
            self.symbol_table.add(name, Symbol::variable(ret, false));
        }
        for (param, line, ty) in params {
            if self.symbol_table.lookup_current_scope(param).is_some() {
                self.error(line, SemanticError::DuplicateDeclaration(param.to_string()));
                continue;
            }
            self.symbol_table.add(param, Symbol::variable(ty, true));
        }

        let body = match decl.children.get(2) {
            Some(body) => self.visit_node(body),
            None => Ok(()),
        };
        self.symbol_table.exit_scope();
        body
    }

    fn visit_target(&mut self, target: &Node) -> Visit<Ty> {
        let prev = std::mem::replace(&mut self.in_assignment_target, true);
        let ty = self.visit_expr(target);
        self.in_assignment_target = prev;
        ty
    }

    fn visit_assignment(&mut self, stmt: &Node) -> Visit<()> {
        let target = stmt.child(0)?;
        let target_ty = self.visit_target(target)?;
        let value_ty = self.visit_expr(stmt.child(1)?)?;

        if !Ty::is_compatible(&target_ty, &value_ty) {
            self.error(
                stmt.line,
                SemanticError::TypeMismatch {
                    context: "assignment".to_string(),
                    expected: target_ty,
                    found: value_ty,
                },
            );
        }

        if target.kind == NodeKind::VariableAccess {
            self.symbol_table.mark_initialized(target.name()?);
        }
        Ok(())
    }

    fn check_condition(&mut self, stmt: &Node, construct: &'static str) -> Visit<()> {
        let cond = stmt.child(0)?;
        let ty = self.visit_expr(cond)?;
        if !matches!(ty, Ty::Boolean | Ty::Error) {
            self.error(
                cond.line.or(stmt.line),
                SemanticError::NonBooleanCondition {
                    construct,
                    found: ty,
                },
            );
        }
        Ok(())
    }

    fn visit_if(&mut self, stmt: &Node) -> Visit<()> {
        self.check_condition(stmt, "if")?;
        self.visit_node(stmt.child(1)?)?;
        if let Some(else_stmt) = stmt.children.get(2) {
            self.visit_node(else_stmt)?;
        }
        Ok(())
    }

    fn visit_while(&mut self, stmt: &Node) -> Visit<()> {
        self.check_condition(stmt, "while")?;
        self.visit_node(stmt.child(1)?)
    }

    fn visit_for(&mut self, stmt: &Node) -> Visit<()> {
        let var = stmt.child(0)?.name()?;
        if self.symbol_table.lookup(var).is_none() {
            self.error(
                stmt.line,
                SemanticError::UndeclaredIdentifier(var.to_string()),
            );
        } else {
            self.symbol_table.mark_initialized(var);
        }

        let start = self.visit_expr(stmt.child(1)?)?;
        let end = self.visit_expr(stmt.child(2)?)?;
        if !matches!(start, Ty::Integer | Ty::Error) || !matches!(end, Ty::Integer | Ty::Error) {
            self.error(stmt.line, SemanticError::NonIntegerForBound);
        }

        self.visit_node(stmt.child(3)?)
    }

    fn visit_read(&mut self, targets: &[Node], line: Option<usize>) -> Visit<()> {
        for target in targets {
            let ty = self.visit_target(target)?;
            if !matches!(ty, Ty::Integer | Ty::Real | Ty::String | Ty::Error) {
                self.error(
                    target.line.or(line),
                    SemanticError::InvalidReadTarget(ty),
                );
            }
            if target.kind == NodeKind::VariableAccess {
                self.symbol_table.mark_initialized(target.name()?);
            }
        }
        Ok(())
    }

    fn visit_write(&mut self, exprs: &[Node]) -> Visit<()> {
        for expr in exprs {
            self.visit_expr(expr)?;
        }
        Ok(())
    }

    /// `read(...)`/`write(...)` written as calls check like the statements.
    fn visit_io_call(&mut self, call: &Node, name: &str) -> Visit<()> {
        if name.to_ascii_lowercase().starts_with("read") {
            self.visit_read(call.args(), call.line)
        } else {
            self.visit_write(call.args())
        }
    }

    fn visit_expr(&mut self, expr: &Node) -> Visit<Ty> {
        let ty = match expr.kind {
            NodeKind::IntegerConstant => Ty::Integer,
            NodeKind::RealConstant => Ty::Real,
            NodeKind::StringConstant => Ty::String,
            NodeKind::BooleanConstant => Ty::Boolean,
            NodeKind::VariableAccess => self.visit_variable(expr)?,
            NodeKind::ArrayAccess => self.visit_array_access(expr)?,
            NodeKind::BinaryOp => self.visit_binary(expr)?,
            NodeKind::UnaryOp => self.visit_unary(expr)?,
            NodeKind::FunctionCall => self.visit_function_call(expr)?,
            _ => {
                self.visit_node(expr)?;
                Ty::Error
            }
        };
        Ok(ty)
    }

    fn visit_variable(&mut self, expr: &Node) -> Visit<Ty> {
        let name = expr.name()?;
        match self.symbol_table.lookup(name).cloned() {
            None => {
                self.error(
                    expr.line,
                    SemanticError::UndeclaredIdentifier(name.to_string()),
                );
                Ok(Ty::Error)
            }
            Some(Symbol::Variable { ty, initialized }) => {
                if !self.in_assignment_target && !initialized {
                    self.warning(
                        expr.line,
                        SemanticWarning::UninitializedRead(name.to_string()),
                    );
                }
                Ok(ty)
            }
            Some(other) => {
                self.error(
                    expr.line,
                    SemanticError::WrongCallableKind {
                        name: name.to_string(),
                        expected: "variable",
                        found: other.kind_name(),
                    },
                );
                Ok(Ty::Error)
            }
        }
    }

    fn visit_array_access(&mut self, expr: &Node) -> Visit<Ty> {
        let name = expr.name()?;
        let target = self
            .symbol_table
            .lookup(name)
            .map(|s| s.var_type().cloned());

        let index_node = expr.child(0)?;
        let prev = std::mem::replace(&mut self.in_assignment_target, false);
        let index = self.visit_expr(index_node);
        self.in_assignment_target = prev;
        let index = index?;

        if !matches!(index, Ty::Integer | Ty::Error) {
            self.error(
                index_node.line.or(expr.line),
                SemanticError::NonIntegerIndex(index),
            );
        }

        match target {
            None => {
                self.error(
                    expr.line,
                    SemanticError::UndeclaredIdentifier(name.to_string()),
                );
                Ok(Ty::Error)
            }
            Some(Some(Ty::String)) => Ok(Ty::String),
            Some(Some(Ty::Array { elem, .. })) => Ok(*elem),
            Some(Some(Ty::Error)) => Ok(Ty::Error),
            Some(_) => {
                self.error(expr.line, SemanticError::NotIndexable(name.to_string()));
                Ok(Ty::Error)
            }
        }
    }

    fn visit_binary(&mut self, expr: &Node) -> Visit<Ty> {
        let left = self.visit_expr(expr.child(0)?)?;
        let right = self.visit_expr(expr.child(1)?)?;
        let op = expr.bin_op()?;

        if left.is_error() || right.is_error() {
            return Ok(Ty::Error);
        }

        if op.is_arithmetic() {
            if left == Ty::Integer && right == Ty::Integer {
                return Ok(Ty::Integer);
            }
            if left.is_numeric() && right.is_numeric() {
                return Ok(Ty::Real);
            }
            self.error(
                expr.line,
                SemanticError::NonNumericOperand {
                    op: op.token(),
                    left,
                    right,
                },
            );
            return Ok(Ty::Error);
        }

        if op.is_relational() {
            if Ty::is_compatible(&left, &right) {
                return Ok(Ty::Boolean);
            }
            self.error(
                expr.line,
                SemanticError::TypeMismatch {
                    context: format!("comparison '{}'", op.token()),
                    expected: left,
                    found: right,
                },
            );
            return Ok(Ty::Error);
        }

        debug_assert!(op.is_logical());
        if left == Ty::Boolean && right == Ty::Boolean {
            return Ok(Ty::Boolean);
        }
        self.error(expr.line, SemanticError::NonBooleanOperand(op.token()));
        Ok(Ty::Error)
    }

    fn visit_unary(&mut self, expr: &Node) -> Visit<Ty> {
        let ty = self.visit_expr(expr.child(0)?)?;
        if ty.is_error() {
            return Ok(Ty::Error);
        }

        match expr.unary_op()? {
            UnaryOpKind::Not if ty == Ty::Boolean => Ok(ty),
            UnaryOpKind::Not => {
                self.error(expr.line, SemanticError::NonBooleanOperand("NOT"));
                Ok(Ty::Error)
            }
            UnaryOpKind::Neg if ty.is_numeric() => Ok(ty),
            UnaryOpKind::Neg => {
                self.error(expr.line, SemanticError::NonNumericNegation(ty));
                Ok(Ty::Error)
            }
        }
    }

    fn is_io_builtin(name: &str) -> bool {
        IO_BUILTINS.iter().any(|b| b.eq_ignore_ascii_case(name))
    }

    fn visit_function_call(&mut self, call: &Node) -> Visit<Ty> {
        let name = call.name()?;
        if name.eq_ignore_ascii_case("length") {
            self.check_args(call, name, &[Ty::String])?;
            return Ok(Ty::Integer);
        }
        if Self::is_io_builtin(name) {
            self.visit_io_call(call, name)?;
            return Ok(Ty::Error);
        }

        match self.callable(call, name, "function")? {
            Some(Symbol::Function { params, ret }) => {
                self.check_args(call, name, &params)?;
                Ok(ret)
            }
            _ => Ok(Ty::Error),
        }
    }

    fn visit_procedure_call(&mut self, call: &Node) -> Visit<()> {
        let name = call.name()?;
        if Self::is_io_builtin(name) {
            return self.visit_io_call(call, name);
        }

        if let Some(Symbol::Procedure { params }) = self.callable(call, name, "procedure")? {
            self.check_args(call, name, &params)?;
        }
        Ok(())
    }

    /// Resolves a call target, reporting a missing or wrong-kind callee.
    fn callable(
        &mut self,
        call: &Node,
        name: &str,
        expected: &'static str,
    ) -> Visit<Option<Symbol>> {
        let found = self.symbol_table.lookup_callable(name).cloned();

        match found {
            None => {
                self.error(
                    call.line,
                    SemanticError::UndeclaredIdentifier(name.to_string()),
                );
                Ok(None)
            }
            Some(symbol) if symbol.kind_name() == expected => Ok(Some(symbol)),
            Some(symbol) => {
                self.error(
                    call.line,
                    SemanticError::WrongCallableKind {
                        name: name.to_string(),
                        expected,
                        found: symbol.kind_name(),
                    },
                );
                Ok(None)
            }
        }
    }

    fn check_args(&mut self, call: &Node, name: &str, params: &[Ty]) -> Visit<()> {
        let mut given = vec![];
        for arg in call.args() {
            given.push(self.visit_expr(arg)?);
        }

        if given.len() != params.len() {
            self.error(
                call.line,
                SemanticError::WrongArity {
                    name: name.to_string(),
                    expected: params.len(),
                    found: given.len(),
                },
            );
            return Ok(());
        }

        for (i, (expected, found)) in params.iter().zip(given).enumerate() {
            if !Ty::is_compatible(expected, &found) {
                self.error(
                    call.line,
                    SemanticError::TypeMismatch {
                        context: format!("argument {} of '{}'", i + 1, name),
                        expected: expected.clone(),
                        found,
                    },
                );
            }
        }
        Ok(())
    }
}
