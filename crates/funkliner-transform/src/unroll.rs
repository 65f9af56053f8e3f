//! Recognition of bounded counting loops.

use funkliner_parser::swc_ecma_ast::*;

/// What a `for` loop looks like to the unroller.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopShape {
    /// Unroll with `var` bound to each value in turn
    Counting { var: String, values: Vec<f64> },
    /// Counting loop with at least `limit` iterations
    TooLong { var: String, limit: usize },
    /// Not a counting loop; the reason is for logging
    Unrecognized(&'static str),
}

/// Classify `stmt`, simulating at most `max_unroll` iterations.
pub fn analyze_loop(stmt: &ForStmt, max_unroll: usize) -> LoopShape {
    let Some(VarDeclOrExpr::VarDecl(var)) = &stmt.init else {
        return LoopShape::Unrecognized("loop does not declare its counter");
    };
    let [decl] = var.decls.as_slice() else {
        return LoopShape::Unrecognized("loop declares more than one variable");
    };
    let (Pat::Ident(name), Some(init)) = (&decl.name, &decl.init) else {
        return LoopShape::Unrecognized("counter is not initialised");
    };
    let Some(start) = number(init) else {
        return LoopShape::Unrecognized("counter does not start at a number");
    };
    let counter = &*name.id.sym;

    let Some(step) = stmt.update.as_deref().and_then(|u| step_of(u, counter)) else {
        return LoopShape::Unrecognized("update is not a constant step");
    };
    let Some((op, bound)) = stmt.test.as_deref().and_then(|t| condition_of(t, counter)) else {
        return LoopShape::Unrecognized("condition is not a comparison with a number");
    };

    let ascending = matches!(op, BinaryOp::Lt | BinaryOp::LtEq);
    if (ascending && step <= 0.0) || (!ascending && step >= 0.0) {
        return LoopShape::Unrecognized("step moves away from the bound");
    }
    if jumps_out(&stmt.body, false, false) {
        return LoopShape::Unrecognized("body breaks or continues");
    }

    let mut values = Vec::new();
    let mut value = start;
    while holds(op, value, bound) {
        values.push(value);
        if values.len() >= max_unroll {
            return LoopShape::TooLong {
                var: counter.to_string(),
                limit: max_unroll,
            };
        }
        value += step;
    }

    LoopShape::Counting {
        var: counter.to_string(),
        values,
    }
}

/// Whether `stmt` has a `break` or `continue` that leaves the loop being
/// unrolled. `breakable` and `in_loop` describe the statements enclosing
/// `stmt` inside the body. Labeled jumps always count.
fn jumps_out(stmt: &Stmt, breakable: bool, in_loop: bool) -> bool {
    match stmt {
        Stmt::Break(jump) => jump.label.is_some() || !breakable,
        Stmt::Continue(jump) => jump.label.is_some() || !in_loop,
        Stmt::Block(block) => block.stmts.iter().any(|s| jumps_out(s, breakable, in_loop)),
        Stmt::If(s) => {
            jumps_out(&s.cons, breakable, in_loop)
                || s.alt.as_deref().is_some_and(|alt| jumps_out(alt, breakable, in_loop))
        }
        Stmt::Labeled(s) => jumps_out(&s.body, breakable, in_loop),
        Stmt::With(s) => jumps_out(&s.body, breakable, in_loop),
        Stmt::For(ForStmt { body, .. })
        | Stmt::ForIn(ForInStmt { body, .. })
        | Stmt::ForOf(ForOfStmt { body, .. })
        | Stmt::While(WhileStmt { body, .. })
        | Stmt::DoWhile(DoWhileStmt { body, .. }) => jumps_out(body, true, true),
        Stmt::Switch(s) => s
            .cases
            .iter()
            .flat_map(|case| &case.cons)
            .any(|s| jumps_out(s, true, in_loop)),
        Stmt::Try(s) => {
            s.block.stmts.iter().any(|s| jumps_out(s, breakable, in_loop))
                || s.handler
                    .as_ref()
                    .is_some_and(|h| h.body.stmts.iter().any(|s| jumps_out(s, breakable, in_loop)))
                || s.finalizer
                    .as_ref()
                    .is_some_and(|f| f.stmts.iter().any(|s| jumps_out(s, breakable, in_loop)))
        }
        _ => false,
    }
}

fn holds(op: BinaryOp, value: f64, bound: f64) -> bool {
    match op {
        BinaryOp::Lt => value < bound,
        BinaryOp::LtEq => value <= bound,
        BinaryOp::Gt => value > bound,
        BinaryOp::GtEq => value >= bound,
        _ => false,
    }
}

fn number(expr: &Expr) -> Option<f64> {
    match expr {
        Expr::Lit(Lit::Num(num)) => Some(num.value),
        Expr::Unary(unary) if unary.op == UnaryOp::Minus => number(&unary.arg).map(|n| -n),
        Expr::Paren(paren) => number(&paren.expr),
        _ => None,
    }
}

fn is_counter(expr: &Expr, counter: &str) -> bool {
    matches!(expr, Expr::Ident(ident) if &*ident.sym == counter)
}

/// Signed step of `i++`, `i -= 2`, `i = 1 + i` and friends.
fn step_of(update: &Expr, counter: &str) -> Option<f64> {
    match update {
        Expr::Update(update) if is_counter(&update.arg, counter) => match update.op {
            UpdateOp::PlusPlus => Some(1.0),
            UpdateOp::MinusMinus => Some(-1.0),
        },
        Expr::Assign(assign) => {
            let AssignTarget::Simple(SimpleAssignTarget::Ident(target)) = &assign.left else {
                return None;
            };
            if &*target.id.sym != counter {
                return None;
            }
            match assign.op {
                AssignOp::AddAssign => number(&assign.right),
                AssignOp::SubAssign => number(&assign.right).map(|n| -n),
                AssignOp::Assign => match &*assign.right {
                    Expr::Bin(bin) if bin.op == BinaryOp::Add => {
                        if is_counter(&bin.left, counter) {
                            number(&bin.right)
                        } else if is_counter(&bin.right, counter) {
                            number(&bin.left)
                        } else {
                            None
                        }
                    }
                    Expr::Bin(bin) if bin.op == BinaryOp::Sub && is_counter(&bin.left, counter) => {
                        number(&bin.right).map(|n| -n)
                    }
                    _ => None,
                },
                _ => None,
            }
        }
        Expr::Paren(paren) => step_of(&paren.expr, counter),
        _ => None,
    }
}

/// `i < n` as (op, n); `n > i` is read as `i < n`.
fn condition_of(test: &Expr, counter: &str) -> Option<(BinaryOp, f64)> {
    let Expr::Bin(bin) = test else {
        return None;
    };
    let flipped = match bin.op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::LtEq => BinaryOp::GtEq,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::GtEq => BinaryOp::LtEq,
        _ => return None,
    };
    if is_counter(&bin.left, counter) {
        number(&bin.right).map(|n| (bin.op, n))
    } else if is_counter(&bin.right, counter) {
        number(&bin.left).map(|n| (flipped, n))
    } else {
        None
    }
}
