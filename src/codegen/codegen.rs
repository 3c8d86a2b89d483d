use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    analyzer::{type_of_node, ScopeId, Symbol, SymbolTable, Ty},
    ast::{BinOpKind, Literal, Node, NodeKind, UnaryOpKind},
};

use super::{
    frame::{Frame, Slot},
    CodegenError, Instruction,
};

type Gen = Result<(), CodegenError>;

pub struct Codegen {
    symbol_table: SymbolTable,
    code: Vec<Instruction>,
    label_index: usize,
    frame: Frame,
    /// Frames suspended while a subprogram is generated; the first one is
    /// the global segment.
    outer: Vec<Frame>,
    subprogram: Option<String>,
    entry_labels: HashMap<String, String>,
}

impl Codegen {
    pub fn new(symbol_table: SymbolTable) -> Self {
        Self {
            symbol_table,
            code: vec![],
            label_index: 0,
            frame: Frame::new(),
            outer: vec![],
            subprogram: None,
            entry_labels: HashMap::new(),
        }
    }

    pub fn generate(mut self, program: &Node) -> Result<Vec<Instruction>, CodegenError> {
        self.gen_node(program)?;
        debug!(
            instructions = self.code.len(),
            labels = self.label_index,
            "code generation finished"
        );
        Ok(self.code)
    }

    fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    fn new_label(&mut self) -> String {
        let s = format!("L{}", self.label_index);
        self.label_index += 1;
        s
    }

    fn slot(&self, name: &str) -> Result<Slot, CodegenError> {
        if let Some(slot) = self.frame.slot(name) {
            return Ok(slot);
        }
        self.outer
            .first()
            .and_then(|globals| globals.offset(name))
            .map(Slot::Global)
            .ok_or_else(|| CodegenError::UnknownVariable(name.to_string()))
    }

    fn scope(&self) -> ScopeId {
        self.subprogram
            .as_deref()
            .and_then(|s| self.symbol_table.subprogram_scope(s))
            .unwrap_or(ScopeId::GLOBAL)
    }

    /// Type of the value `name` yields: a variable's declared type or a
    /// function's result type.
    fn value_type(&self, name: &str) -> Option<&Ty> {
        match self.symbol_table.lookup_from(self.scope(), name)? {
            Symbol::Variable { ty, .. } => Some(ty),
            Symbol::Function { ret, .. } => Some(ret),
            Symbol::Procedure { .. } => None,
        }
    }

    fn is_string(&self, name: &str) -> bool {
        self.value_type(name) == Some(&Ty::String)
    }

    fn gen_node(&mut self, node: &Node) -> Gen {
        match node.kind {
            NodeKind::Program => self.gen_program(node)?,
            NodeKind::Block => self.gen_block(node)?,
            NodeKind::Declarations => self.gen_declarations(node)?,
            NodeKind::ProcedureDeclaration => self.gen_subprogram(node, false)?,
            NodeKind::FunctionDeclaration => self.gen_subprogram(node, true)?,
            NodeKind::AssignmentStatement => self.gen_assignment(node)?,
            NodeKind::IfStatement => self.gen_if(node)?,
            NodeKind::WhileStatement => self.gen_while(node)?,
            NodeKind::ForStatement => self.gen_for(node)?,
            NodeKind::ReadStatement => self.gen_read(&node.children)?,
            NodeKind::WriteStatement => self.gen_write(&node.children)?,
            NodeKind::ProcedureCall => self.gen_call(node)?,
            NodeKind::Empty => (),
            NodeKind::FunctionCall
            | NodeKind::VariableAccess
            | NodeKind::ArrayAccess
            | NodeKind::BinaryOp
            | NodeKind::UnaryOp
            | NodeKind::IntegerConstant
            | NodeKind::RealConstant
            | NodeKind::StringConstant
            | NodeKind::BooleanConstant => self.gen_expr(node)?,
            _ => {
                for child in node.children.iter() {
                    self.gen_node(child)?;
                }
            }
        };
        Ok(())
    }

    fn gen_program(&mut self, program: &Node) -> Gen {
        self.emit(Instruction::PushI(0));
        self.emit(Instruction::PushI(0));
        self.emit(Instruction::Start);
        if let Some(block) = program.children.first() {
            self.gen_node(block)?;
        }
        self.emit(Instruction::Stop);
        Ok(())
    }

    /// storage, jump over the subprograms, subprograms, entry label, body
    fn gen_block(&mut self, block: &Node) -> Gen {
        if let Some(decls) = block.find_child(NodeKind::Declarations) {
            self.gen_declarations(decls)?;
        }
        let main_label = self.new_label();
        self.emit(Instruction::Jump(main_label.clone()));
        if let Some(funcs) = block.find_child(NodeKind::FunctionDeclarations) {
            self.gen_node(funcs)?;
        }
        self.emit(Instruction::Label(main_label));
        if let Some(body) = block.find_child(NodeKind::CompoundStatement) {
            self.gen_node(body)?;
        }
        Ok(())
    }

    fn gen_declarations(&mut self, decls: &Node) -> Gen {
        let mut total = 0;
        for decl in decls
            .children
            .iter()
            .filter(|d| d.kind == NodeKind::Declaration)
        {
            let slots = type_of_node(decl.child(1)?)?.map_or(1, |ty| ty.slots());
            for id in decl.child(0)?.identifiers() {
                self.frame.allocate(id.name()?, slots);
                total += slots;
            }
        }
        if total > 0 {
            self.emit(Instruction::PushN(total));
        }
        Ok(())
    }

    fn gen_subprogram(&mut self, decl: &Node, is_function: bool) -> Gen {
        let name = decl.name()?;
        let params = decl.child(0)?;

        let label = self.new_label();
        trace!(subprogram = name, %label, "generating subprogram");
        self.entry_labels
            .insert(name.to_ascii_lowercase(), label.clone());
        self.emit(Instruction::Label(label));

        let mut names = vec![];
        if params.kind == NodeKind::FormalParameters {
            for param in params.children.iter() {
                for id in param.child(0)?.identifiers() {
                    names.push(id.name()?);
                }
            }
        }

        let saved = std::mem::replace(&mut self.frame, Frame::new());
        self.outer.push(saved);
        let saved_subprogram = self.subprogram.replace(name.to_string());

        self.frame.bind_params(&names);
        if is_function {
            self.frame.reserve_return_slot(name);
            self.emit(Instruction::PushI(0));
        }

        if let Some(body) = decl.children.get(2) {
            self.gen_node(body)?;
        }

        if let Some(ret) = self.frame.return_slot() {
            self.emit(Instruction::PushL(ret));
        }
        self.emit(Instruction::Return);

        self.subprogram = saved_subprogram;
        if let Some(saved) = self.outer.pop() {
            self.frame = saved;
        }
        Ok(())
    }

    fn gen_if(&mut self, stmt: &Node) -> Gen {
        let else_label = self.new_label();
        let end_label = self.new_label();

        self.gen_expr(stmt.child(0)?)?;
        self.emit(Instruction::Jz(else_label.clone()));
        self.gen_node(stmt.child(1)?)?;
        self.emit(Instruction::Jump(end_label.clone()));
        self.emit(Instruction::Label(else_label));
        if let Some(else_stmt) = stmt.children.get(2) {
            self.gen_node(else_stmt)?;
        }
        self.emit(Instruction::Label(end_label));
        Ok(())
    }

    fn gen_while(&mut self, stmt: &Node) -> Gen {
        let begin_label = self.new_label();
        let end_label = self.new_label();

        self.emit(Instruction::Label(begin_label.clone()));
        self.gen_expr(stmt.child(0)?)?;
        self.emit(Instruction::Jz(end_label.clone()));
        self.gen_node(stmt.child(1)?)?;
        self.emit(Instruction::Jump(begin_label));
        self.emit(Instruction::Label(end_label));
        Ok(())
    }

    /// The bound is evaluated again on every pass.
    fn gen_for(&mut self, stmt: &Node) -> Gen {
        let slot = self.slot(stmt.child(0)?.name()?)?;
        let descending = matches!(
            &stmt.literal,
            Some(Literal::Str(d)) if d.eq_ignore_ascii_case("downto")
        );

        self.gen_expr(stmt.child(1)?)?;
        self.emit(slot.store());

        let loop_label = self.new_label();
        let end_label = self.new_label();

        self.emit(Instruction::Label(loop_label.clone()));
        self.emit(slot.push());
        self.gen_expr(stmt.child(2)?)?;
        self.emit(if descending {
            Instruction::SupEq
        } else {
            Instruction::InfEq
        });
        self.emit(Instruction::Jz(end_label.clone()));

        self.gen_node(stmt.child(3)?)?;

        self.emit(slot.push());
        self.emit(Instruction::PushI(1));
        self.emit(if descending {
            Instruction::Sub
        } else {
            Instruction::Add
        });
        self.emit(slot.store());
        self.emit(Instruction::Jump(loop_label));
        self.emit(Instruction::Label(end_label));
        Ok(())
    }

    /// Pushes the address of `name[index]`: base + offset + index - lower.
    fn gen_array_addr(&mut self, access: &Node) -> Gen {
        let name = access.name()?;
        if self.is_string(name) {
            return Err(CodegenError::StringElementStore(name.to_string()));
        }
        let slot = self.slot(name)?;

        self.emit(slot.base());
        self.emit(Instruction::PushI(slot.offset()));
        self.emit(Instruction::PAdd);

        self.gen_expr(access.child(0)?)?;
        let lower = self.value_type(name).map_or(0, Ty::lower_bound);
        if lower != 0 {
            self.emit(Instruction::PushI(lower));
            self.emit(Instruction::Sub);
        }
        self.emit(Instruction::PAdd);
        Ok(())
    }

    /// Address before value: `STORE` pops the value off the address.
    fn gen_assignment(&mut self, stmt: &Node) -> Gen {
        let target = stmt.child(0)?;
        let value = stmt.child(1)?;

        if target.kind == NodeKind::ArrayAccess {
            self.gen_array_addr(target)?;
            self.gen_expr(value)?;
            self.emit(Instruction::Store(0));
        } else {
            self.gen_expr(value)?;
            let slot = self.slot(target.name()?)?;
            self.emit(slot.store());
        }
        Ok(())
    }

    fn gen_read(&mut self, targets: &[Node]) -> Gen {
        for target in targets {
            let name = target.name()?;
            let indexed = target.kind == NodeKind::ArrayAccess;
            if indexed {
                self.gen_array_addr(target)?;
            }

            self.emit(Instruction::Read);

            let ty = self.value_type(name);
            let value_ty = if indexed {
                ty.and_then(Ty::get_inner)
            } else {
                ty
            };
            if value_ty.is_some_and(Ty::is_numeric) {
                self.emit(Instruction::Atoi);
            }

            if indexed {
                self.emit(Instruction::Store(0));
            } else {
                let slot = self.slot(name)?;
                self.emit(slot.store());
            }
        }
        Ok(())
    }

    fn gen_write(&mut self, exprs: &[Node]) -> Gen {
        for expr in exprs {
            self.gen_expr(expr)?;
            let is_string = match expr.kind {
                NodeKind::StringConstant => true,
                NodeKind::VariableAccess | NodeKind::FunctionCall => self.is_string(expr.name()?),
                // indexing a string yields a character code
                NodeKind::ArrayAccess => {
                    self.value_type(expr.name()?).and_then(Ty::get_inner) == Some(&Ty::String)
                }
                _ => false,
            };
            self.emit(if is_string {
                Instruction::WriteS
            } else {
                Instruction::WriteI
            });
        }
        Ok(())
    }

    fn gen_call(&mut self, call: &Node) -> Gen {
        let name = call.name()?;
        match name.to_ascii_lowercase().as_str() {
            "length" => {
                if let Some(arg) = call.args().first() {
                    self.gen_expr(arg)?;
                }
                self.emit(Instruction::StrLen);
                return Ok(());
            }
            "write" | "writeln" => return self.gen_write(call.args()),
            "read" | "readln" => return self.gen_read(call.args()),
            _ => (),
        }

        for arg in call.args() {
            self.gen_expr(arg)?;
        }
        let label = self
            .entry_labels
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| CodegenError::UnknownSubprogram(name.to_string()))?;
        self.emit(Instruction::PushA(label));
        self.emit(Instruction::Call);
        Ok(())
    }

    fn gen_expr(&mut self, expr: &Node) -> Gen {
        match expr.kind {
            NodeKind::IntegerConstant => self.emit(Instruction::PushI(expr.int_value()?)),
            NodeKind::BooleanConstant => {
                self.emit(Instruction::PushI(i64::from(expr.bool_value()?)))
            }
            NodeKind::StringConstant => self.emit(Instruction::PushS(expr.name()?.to_string())),
            NodeKind::RealConstant => return Err(CodegenError::UnsupportedReal),
            NodeKind::VariableAccess => {
                let slot = self.slot(expr.name()?)?;
                self.emit(slot.push());
            }
            NodeKind::ArrayAccess => self.gen_array_access(expr)?,
            NodeKind::BinaryOp => self.gen_binary(expr)?,
            NodeKind::UnaryOp => {
                self.gen_expr(expr.child(0)?)?;
                match expr.unary_op()? {
                    UnaryOpKind::Not => self.emit(Instruction::Not),
                    UnaryOpKind::Neg => {
                        self.emit(Instruction::PushI(-1));
                        self.emit(Instruction::Mul);
                    }
                }
            }
            NodeKind::FunctionCall => self.gen_call(expr)?,
            _ => self.gen_node(expr)?,
        };
        Ok(())
    }

    /// Strings index through `CHARAT` with a 1-based index; arrays load
    /// through their computed address.
    fn gen_array_access(&mut self, access: &Node) -> Gen {
        let name = access.name()?;
        if !self.is_string(name) {
            self.gen_array_addr(access)?;
            self.emit(Instruction::Load(0));
            return Ok(());
        }

        let slot = self.slot(name)?;
        self.emit(slot.push());
        self.gen_expr(access.child(0)?)?;
        self.emit(Instruction::PushI(1));
        self.emit(Instruction::Sub);
        self.emit(Instruction::CharAt);
        Ok(())
    }

    fn gen_binary(&mut self, expr: &Node) -> Gen {
        let left = expr.child(0)?;
        let right = expr.child(1)?;
        let op = expr.bin_op()?;

        // comparing against a one-character literal compares char codes
        if let (BinOpKind::Equal | BinOpKind::NotEqual, Some(Literal::Str(s))) =
            (op, &right.literal)
        {
            let mut chars = s.chars();
            if let (NodeKind::StringConstant, Some(c), None) =
                (right.kind, chars.next(), chars.next())
            {
                self.gen_expr(left)?;
                self.emit(Instruction::PushI(i64::from(u32::from(c))));
                self.emit(Instruction::Equal);
                if op == BinOpKind::NotEqual {
                    self.emit(Instruction::Not);
                }
                return Ok(());
            }
        }

        self.gen_expr(left)?;
        self.gen_expr(right)?;
        match op {
            BinOpKind::Add => self.emit(Instruction::Add),
            BinOpKind::Sub => self.emit(Instruction::Sub),
            BinOpKind::Mul => self.emit(Instruction::Mul),
            BinOpKind::Slash | BinOpKind::Div => self.emit(Instruction::Div),
            BinOpKind::Mod => self.emit(Instruction::Mod),
            BinOpKind::Equal => self.emit(Instruction::Equal),
            BinOpKind::NotEqual => {
                self.emit(Instruction::Equal);
                self.emit(Instruction::Not);
            }
            BinOpKind::LessThan => self.emit(Instruction::Inf),
            BinOpKind::GreaterThan => self.emit(Instruction::Sup),
            BinOpKind::LessEqual => self.emit(Instruction::InfEq),
            BinOpKind::GreaterEqual => self.emit(Instruction::SupEq),
            BinOpKind::And => self.emit(Instruction::And),
            BinOpKind::Or => self.emit(Instruction::Or),
        }
        Ok(())
    }
}
