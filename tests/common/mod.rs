#![allow(dead_code)]

pub mod vm;

use pvmc::{
    analyzer::{analyze, SemanticError},
    ast::{Literal, Node, NodeKind},
    codegen::Instruction,
    compile, Options,
};

pub fn program(decls: Vec<Node>, subprograms: Vec<Node>, body: Vec<Node>) -> Node {
    Node::new(NodeKind::Program, vec![block(decls, subprograms, body)])
}

pub fn block(decls: Vec<Node>, subprograms: Vec<Node>, body: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Block,
        vec![
            Node::new(NodeKind::Declarations, decls),
            Node::new(NodeKind::FunctionDeclarations, subprograms),
            compound(body),
        ],
    )
}

pub fn compound(stmts: Vec<Node>) -> Node {
    Node::new(
        NodeKind::CompoundStatement,
        vec![Node::new(NodeKind::StatementList, stmts)],
    )
}

pub fn ty(name: &str) -> Node {
    Node::new_ident(NodeKind::BasicType, name)
}

pub fn array_of(lower: i64, upper: i64, elem: Node) -> Node {
    Node::new(NodeKind::ArrayType, vec![elem]).with_literal(Literal::Range(lower, upper))
}

pub fn ids(names: &[&str]) -> Node {
    Node::new(
        NodeKind::IdList,
        names
            .iter()
            .map(|n| Node::new_ident(NodeKind::Identifier, n))
            .collect(),
    )
}

pub fn var(names: &[&str], ty: Node) -> Node {
    Node::new(NodeKind::Declaration, vec![ids(names), ty])
}

pub fn param(names: &[&str], ty: Node) -> Node {
    Node::new(NodeKind::Parameter, vec![ids(names), ty])
}

fn formal(params: Vec<Node>) -> Node {
    if params.is_empty() {
        Node::empty()
    } else {
        Node::new(NodeKind::FormalParameters, params)
    }
}

pub fn procedure(name: &str, params: Vec<Node>, decls: Vec<Node>, body: Vec<Node>) -> Node {
    Node::new(
        NodeKind::ProcedureDeclaration,
        vec![formal(params), Node::empty(), block(decls, vec![], body)],
    )
    .with_literal(Literal::Str(name.to_string()))
}

pub fn function(
    name: &str,
    params: Vec<Node>,
    ret: Node,
    decls: Vec<Node>,
    body: Vec<Node>,
) -> Node {
    Node::new(
        NodeKind::FunctionDeclaration,
        vec![formal(params), ret, block(decls, vec![], body)],
    )
    .with_literal(Literal::Str(name.to_string()))
}

pub fn v(name: &str) -> Node {
    Node::new_ident(NodeKind::VariableAccess, name)
}

pub fn at(name: &str, index: Node) -> Node {
    Node::new(NodeKind::ArrayAccess, vec![index]).with_literal(Literal::Str(name.to_string()))
}

pub fn num(n: i64) -> Node {
    Node::new_number(n)
}

pub fn real(x: f64) -> Node {
    Node::leaf(NodeKind::RealConstant, Literal::Real(x))
}

pub fn string(s: &str) -> Node {
    Node::new_string(s)
}

pub fn boolean(b: bool) -> Node {
    Node::new_boolean(b)
}

pub fn bin(op: &str, left: Node, right: Node) -> Node {
    Node::new_binary(op, left, right)
}

pub fn assign(target: Node, value: Node) -> Node {
    Node::new(NodeKind::AssignmentStatement, vec![target, value])
}

fn arg_list(args: Vec<Node>) -> Vec<Node> {
    vec![Node::new(NodeKind::ArgList, args)]
}

pub fn call(name: &str, args: Vec<Node>) -> Node {
    Node::new(NodeKind::FunctionCall, arg_list(args)).with_literal(Literal::Str(name.to_string()))
}

pub fn pcall(name: &str, args: Vec<Node>) -> Node {
    Node::new(NodeKind::ProcedureCall, arg_list(args)).with_literal(Literal::Str(name.to_string()))
}

pub fn write(exprs: Vec<Node>) -> Node {
    Node::new(NodeKind::WriteStatement, exprs)
}

pub fn read(targets: Vec<Node>) -> Node {
    Node::new(NodeKind::ReadStatement, targets)
}

pub fn if_then(cond: Node, then: Node, otherwise: Option<Node>) -> Node {
    let mut children = vec![cond, then];
    children.extend(otherwise);
    Node::new(NodeKind::IfStatement, children)
}

pub fn while_do(cond: Node, body: Node) -> Node {
    Node::new(NodeKind::WhileStatement, vec![cond, body])
}

pub fn for_loop(var: &str, from: Node, direction: &str, to: Node, body: Node) -> Node {
    Node::new(NodeKind::ForStatement, vec![v(var), from, to, body])
        .with_literal(Literal::Str(direction.to_string()))
}

pub fn compile_ok(program: &Node) -> Vec<Instruction> {
    match compile(program, &Options::default()) {
        Ok(compiled) => compiled.instructions,
        Err(e) => panic!("compilation failed: {e}"),
    }
}

pub fn compile_unoptimized(program: &Node) -> Vec<Instruction> {
    match compile(program, &Options { optimize: false }) {
        Ok(compiled) => compiled.instructions,
        Err(e) => panic!("compilation failed: {e}"),
    }
}

pub fn errors(program: &Node) -> Vec<SemanticError> {
    let (analysis, _) = analyze(program);
    analysis.errors.into_iter().map(|d| d.kind).collect()
}

/// True when `needle` appears as a contiguous run inside `code`.
pub fn contains_seq(code: &[Instruction], needle: &[Instruction]) -> bool {
    code.windows(needle.len()).any(|w| w == needle)
}

pub fn label(name: &str) -> Instruction {
    Instruction::Label(name.to_string())
}
