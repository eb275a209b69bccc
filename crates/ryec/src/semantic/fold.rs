//! Compile-time constant folding.
//!
//! Used by the analyzer to classify declarations as literal-valued and to
//! suppress use counts for references that will be inlined. Folding is
//! best-effort: any sub-expression that is not a compile-time constant
//! simply stops the fold.

use rye_ast::{BinOp, Expr, FloatLit, IntLit, NodeId, Span, StrLit, UnOp};

/// Compile-time constant values.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConstValue {
    fn as_float(&self) -> Option<f64> {
        match self {
            ConstValue::Int(n) => Some(*n as f64),
            ConstValue::Float(n) => Some(*n),
            ConstValue::Str(_) => None,
        }
    }

    fn into_expr(self, span: Span) -> Expr {
        match self {
            ConstValue::Int(value) => Expr::Int(IntLit {
                id: NodeId::UNSET,
                value,
                span,
            }),
            ConstValue::Float(value) => Expr::Float(FloatLit {
                id: NodeId::UNSET,
                value,
                span,
            }),
            ConstValue::Str(value) => Expr::Str(StrLit {
                id: NodeId::UNSET,
                value,
                span,
            }),
        }
    }
}

/// Fold `expr` down to a literal expression, when possible.
///
/// Returns None when the expression is not a compile-time constant; the
/// caller then keeps the original tree.
pub fn fold_expr(expr: &Expr) -> Option<Expr> {
    let span = expr.span();
    eval(expr).map(|v| v.into_expr(span))
}

fn eval(expr: &Expr) -> Option<ConstValue> {
    match expr {
        Expr::Int(lit) => Some(ConstValue::Int(lit.value)),
        Expr::Float(lit) => Some(ConstValue::Float(lit.value)),
        Expr::Str(lit) => Some(ConstValue::Str(lit.value.clone())),
        Expr::Paren(inner) => eval(&inner.inner),
        Expr::Unary(unary) => {
            let value = eval(&unary.expr)?;
            match (unary.op, value) {
                (UnOp::Negate, ConstValue::Int(n)) => Some(ConstValue::Int(n.wrapping_neg())),
                (UnOp::Negate, ConstValue::Float(n)) => Some(ConstValue::Float(-n)),
                _ => None,
            }
        }
        Expr::Binary(binary) => {
            let left = eval(&binary.left)?;
            let right = eval(&binary.right)?;
            eval_binop(binary.op, left, right)
        }
        _ => None,
    }
}

fn eval_binop(op: BinOp, left: ConstValue, right: ConstValue) -> Option<ConstValue> {
    // String concatenation is the only folded string operation.
    if let (ConstValue::Str(a), ConstValue::Str(b)) = (&left, &right) {
        return match op {
            BinOp::Add => Some(ConstValue::Str(format!("{}{}", a, b))),
            _ => None,
        };
    }

    if let (ConstValue::Int(a), ConstValue::Int(b)) = (&left, &right) {
        let (a, b) = (*a, *b);
        return match op {
            BinOp::Add => Some(ConstValue::Int(a.wrapping_add(b))),
            BinOp::Subtract => Some(ConstValue::Int(a.wrapping_sub(b))),
            BinOp::Multiply => Some(ConstValue::Int(a.wrapping_mul(b))),
            BinOp::Divide if b != 0 => Some(ConstValue::Int(a.wrapping_div(b))),
            BinOp::Modulo if b != 0 => Some(ConstValue::Int(a.wrapping_rem(b))),
            _ => None,
        };
    }

    let a = left.as_float()?;
    let b = right.as_float()?;
    match op {
        BinOp::Add => Some(ConstValue::Float(a + b)),
        BinOp::Subtract => Some(ConstValue::Float(a - b)),
        BinOp::Multiply => Some(ConstValue::Float(a * b)),
        BinOp::Divide => Some(ConstValue::Float(a / b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rye_parser::parse_module;

    fn first_init(src: &str) -> Expr {
        let (module, errors) = parse_module(src);
        assert!(errors.is_empty());
        match module.body.into_iter().next() {
            Some(rye_ast::Stmt::VarDecl(decl)) => decl.init,
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn folds_integer_arithmetic() {
        let expr = first_init("let x = 2 + 3 * 4;");
        let folded = fold_expr(&expr).expect("foldable");
        assert!(matches!(folded, Expr::Int(IntLit { value: 14, .. })));
    }

    #[test]
    fn folds_through_parens_and_negation() {
        let expr = first_init("let x = -(2 + 1);");
        let folded = fold_expr(&expr).expect("foldable");
        assert!(matches!(folded, Expr::Int(IntLit { value: -3, .. })));
    }

    #[test]
    fn mixed_arithmetic_widens_to_float() {
        let expr = first_init("let x = 1 + 2.5;");
        let folded = fold_expr(&expr).expect("foldable");
        let Expr::Float(lit) = folded else {
            panic!("expected float literal");
        };
        assert_eq!(lit.value, 3.5);
    }

    #[test]
    fn folds_string_concatenation() {
        let expr = first_init("let x = \"a\" + \"b\";");
        let folded = fold_expr(&expr).expect("foldable");
        assert!(matches!(folded, Expr::Str(StrLit { ref value, .. }) if value == "ab"));
    }

    #[test]
    fn division_by_zero_does_not_fold() {
        let expr = first_init("let x = 1 / 0;");
        assert!(fold_expr(&expr).is_none());
    }

    #[test]
    fn variables_do_not_fold() {
        let expr = first_init("let x = y + 1;");
        assert!(fold_expr(&expr).is_none());
    }
}
