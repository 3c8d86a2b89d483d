mod common;

use common::*;
use pvmc::{
    ast::{BinOpKind, Literal, Node, NodeKind},
    optimizer::{fold_integers, Optimizer},
};

fn optimize(node: Node) -> (Node, usize) {
    let mut optimizer = Optimizer::new();
    let node = optimizer.run(node);
    (node, optimizer.optimizations())
}

#[test]
fn folds_integer_arithmetic() {
    let (node, count) = optimize(bin("+", num(2), num(3)));
    assert_eq!(node, num(5));
    assert_eq!(count, 1);
}

#[test]
fn folds_bottom_up() {
    let (node, count) = optimize(bin("*", bin("+", num(2), num(3)), bin("-", num(10), num(6))));
    assert_eq!(node, num(20));
    assert_eq!(count, 3);
}

#[test]
fn keyword_operators_fold() {
    assert_eq!(optimize(bin("div", num(7), num(2))).0, num(3));
    assert_eq!(optimize(bin("MOD", num(7), num(3))).0, num(1));
}

#[test]
fn zero_divisor_is_left_alone() {
    let div = bin("DIV", num(1), num(0));
    let (node, count) = optimize(div.clone());
    assert_eq!(node, div);
    assert_eq!(count, 0);

    let rem = bin("MOD", num(1), num(0));
    assert_eq!(optimize(rem.clone()).0, rem);
}

#[test]
fn division_truncates_and_modulo_follows_divisor() {
    assert_eq!(fold_integers(BinOpKind::Div, -7, 2), Some(Literal::Int(-3)));
    assert_eq!(fold_integers(BinOpKind::Mod, -7, 2), Some(Literal::Int(1)));
    assert_eq!(fold_integers(BinOpKind::Mod, 7, -2), Some(Literal::Int(-1)));
    assert_eq!(fold_integers(BinOpKind::Mod, -6, 3), Some(Literal::Int(0)));
}

#[test]
fn overflow_is_left_alone() {
    assert_eq!(fold_integers(BinOpKind::Add, i64::MAX, 1), None);
    assert_eq!(fold_integers(BinOpKind::Div, i64::MIN, -1), None);
    let big = bin("*", num(i64::MAX), num(2));
    assert_eq!(optimize(big.clone()).0, big);
}

#[test]
fn equality_folds_to_boolean_other_comparisons_do_not() {
    assert_eq!(optimize(bin("=", num(4), num(4))).0, boolean(true));
    assert_eq!(optimize(bin("=", num(4), num(5))).0, boolean(false));

    let lt = bin("<", num(1), num(2));
    assert_eq!(optimize(lt.clone()).0, lt);
}

#[test]
fn slash_is_not_folded() {
    let slash = bin("/", num(6), num(3));
    assert_eq!(optimize(slash.clone()).0, slash);
}

#[test]
fn non_constant_operands_are_kept() {
    let expr = bin("+", v("x"), bin("*", num(2), num(4)));
    let (node, count) = optimize(expr);
    assert_eq!(node, bin("+", v("x"), num(8)));
    assert_eq!(count, 1);
}

#[test]
fn negation_of_constant_folds() {
    let (node, _) = optimize(Node::new_unary("-", num(5)));
    assert_eq!(node, num(-5));

    let not = Node::new_unary("not", boolean(true));
    assert_eq!(optimize(not.clone()).0, not);
}

#[test]
fn folded_node_keeps_line() {
    let (node, _) = optimize(bin("+", num(1), num(1)).at_line(4));
    assert_eq!(node.line, Some(4));
}

#[test]
fn static_if_keeps_taken_branch() {
    let then = write(vec![num(1)]);
    let otherwise = write(vec![num(2)]);

    let (node, _) = optimize(if_then(boolean(true), then.clone(), Some(otherwise.clone())));
    assert_eq!(node, then);

    let (node, _) = optimize(if_then(boolean(false), then.clone(), Some(otherwise.clone())));
    assert_eq!(node, otherwise);
}

#[test]
fn static_false_if_without_else_becomes_empty() {
    let (node, count) = optimize(if_then(boolean(false), write(vec![num(1)]), None).at_line(9));
    assert_eq!(node.kind, NodeKind::Empty);
    assert_eq!(node.line, Some(9));
    assert_eq!(count, 1);
}

#[test]
fn folded_condition_resolves_if() {
    let then = write(vec![num(1)]);
    let (node, count) = optimize(if_then(bin("=", num(1), num(1)), then.clone(), None));
    assert_eq!(node, then);
    assert_eq!(count, 2);
}

#[test]
fn dynamic_if_is_kept() {
    let stmt = if_then(bin("<", v("x"), num(3)), write(vec![num(1)]), None);
    assert_eq!(optimize(stmt.clone()).0, stmt);
}

#[test]
fn counter_accumulates_across_runs() {
    let mut optimizer = Optimizer::new();
    optimizer.run(bin("+", num(1), num(2)));
    optimizer.run(bin("-", num(1), num(2)));
    assert_eq!(optimizer.optimizations(), 2);
}
