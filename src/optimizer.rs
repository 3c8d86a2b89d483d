use tracing::{debug, trace};

use crate::ast::{BinOpKind, Literal, Node, NodeKind, UnaryOpKind};

/// Bottom-up constant folding and static `if` resolution.
///
/// Every rewrite replaces a whole subtree with a new node; nothing is
/// patched in place.
#[derive(Debug, Default)]
pub struct Optimizer {
    optimizations: usize,
}

impl Optimizer {
    pub fn new() -> Self {
        Self { optimizations: 0 }
    }

    /// Number of rewrites applied so far.
    pub fn optimizations(&self) -> usize {
        self.optimizations
    }

    pub fn run(&mut self, program: Node) -> Node {
        let before = self.optimizations;
        let program = self.optimize(program);
        debug!(
            rewrites = self.optimizations - before,
            "optimization finished"
        );
        program
    }

    pub fn optimize(&mut self, node: Node) -> Node {
        let Node {
            kind,
            children,
            literal,
            line,
        } = node;
        let children = children.into_iter().map(|c| self.optimize(c)).collect();
        let node = Node {
            kind,
            children,
            literal,
            line,
        };

        match node.kind {
            NodeKind::BinaryOp => self.fold_binary(node),
            NodeKind::UnaryOp => self.fold_unary(node),
            NodeKind::IfStatement => self.fold_if(node),
            _ => node,
        }
    }

    fn fold_binary(&mut self, node: Node) -> Node {
        let [left, right] = node.children.as_slice() else {
            return node;
        };
        if !left.is_integer_constant() || !right.is_integer_constant() {
            return node;
        }
        let (Ok(op), Ok(a), Ok(b)) = (node.bin_op(), left.int_value(), right.int_value()) else {
            return node;
        };

        match fold_integers(op, a, b) {
            Some(literal) => {
                trace!(op = op.token(), a, b, "folded binary op");
                self.optimizations += 1;
                let kind = match literal {
                    Literal::Bool(_) => NodeKind::BooleanConstant,
                    _ => NodeKind::IntegerConstant,
                };
                Node {
                    kind,
                    children: vec![],
                    literal: Some(literal),
                    line: node.line,
                }
            }
            None => node,
        }
    }

    fn fold_unary(&mut self, node: Node) -> Node {
        let [operand] = node.children.as_slice() else {
            return node;
        };
        if node.unary_op() != Ok(UnaryOpKind::Neg) || !operand.is_integer_constant() {
            return node;
        }
        let Some(negated) = operand.int_value().ok().and_then(i64::checked_neg) else {
            return node;
        };

        trace!(value = negated, "folded negation");
        self.optimizations += 1;
        Node {
            line: node.line,
            ..Node::new_number(negated)
        }
    }

    fn fold_if(&mut self, node: Node) -> Node {
        let cond = match node.children.first() {
            Some(c) if c.kind == NodeKind::BooleanConstant => c.bool_value(),
            _ => return node,
        };
        let Ok(cond) = cond else {
            return node;
        };

        trace!(cond, "resolved static if");
        self.optimizations += 1;
        let line = node.line;
        let mut branches = node.children.into_iter().skip(1);
        let then_branch = branches.next();
        let else_branch = branches.next();

        let taken = if cond { then_branch } else { else_branch };
        taken.unwrap_or_else(|| Node {
            line,
            ..Node::empty()
        })
    }
}

/// `DIV` truncates toward zero and `MOD` takes the sign of the divisor.
/// Zero divisors and overflow are left for the machine to fault on.
pub fn fold_integers(op: BinOpKind, a: i64, b: i64) -> Option<Literal> {
    let value = match op {
        BinOpKind::Add => a.checked_add(b)?,
        BinOpKind::Sub => a.checked_sub(b)?,
        BinOpKind::Mul => a.checked_mul(b)?,
        BinOpKind::Div => a.checked_div(b)?,
        BinOpKind::Mod => {
            let r = a.checked_rem(b)?;
            if r != 0 && (r < 0) != (b < 0) {
                r + b
            } else {
                r
            }
        }
        BinOpKind::Equal => return Some(Literal::Bool(a == b)),
        _ => return None,
    };
    Some(Literal::Int(value))
}
