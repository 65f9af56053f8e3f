//! Dotted paths naming values in the environment.
//!
//! `this.cases[select]`, `object2.log` and `i++` all resolve to plain strings
//! that double as environment keys and as the replacement text for call
//! arguments.

use funkliner_parser::swc_ecma_ast::*;
use funkliner_parser::Spanned;

/// An expression that has no path form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedPath {
    pub span: swc_common::Span,
    pub shape: &'static str,
}

/// Resolve `expr` to its canonical path text.
pub fn resolve_path(expr: &Expr) -> Result<String, UnsupportedPath> {
    match expr {
        Expr::This(_) => Ok("this".to_string()),
        Expr::Ident(ident) => Ok(ident.sym.to_string()),
        Expr::Lit(Lit::Num(num)) => Ok(format_number(num.value)),
        Expr::Member(member) => {
            let object = resolve_path(&member.obj)?;
            match &member.prop {
                MemberProp::Ident(name) => Ok(format!("{}.{}", object, name.sym)),
                MemberProp::Computed(computed) => {
                    Ok(format!("{}[{}]", object, resolve_path(&computed.expr)?))
                }
                MemberProp::PrivateName(private) => Err(UnsupportedPath {
                    span: private.span,
                    shape: "private name",
                }),
            }
        }
        Expr::Update(update) => {
            let operand = resolve_path(&update.arg)?;
            let op = match update.op {
                UpdateOp::PlusPlus => "++",
                UpdateOp::MinusMinus => "--",
            };
            if update.prefix {
                Ok(format!("{}{}", op, operand))
            } else {
                Ok(format!("{}{}", operand, op))
            }
        }
        Expr::Bin(bin) if bin.op == BinaryOp::Mod => Ok(format!(
            "{}%{}",
            resolve_path(&bin.left)?,
            resolve_path(&bin.right)?
        )),
        other => Err(UnsupportedPath {
            span: other.span(),
            shape: expr_kind(other),
        }),
    }
}

/// Decimal text of a numeric literal; whole numbers print without a fraction.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Name of an expression's kind for diagnostics.
pub fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::This(_) => "this",
        Expr::Array(_) => "array literal",
        Expr::Object(_) => "object literal",
        Expr::Fn(_) => "function expression",
        Expr::Unary(_) => "unary expression",
        Expr::Update(_) => "update expression",
        Expr::Bin(_) => "binary expression",
        Expr::Assign(_) => "assignment",
        Expr::Member(_) => "member expression",
        Expr::SuperProp(_) => "super property",
        Expr::Cond(_) => "conditional expression",
        Expr::Call(_) => "call",
        Expr::New(_) => "new expression",
        Expr::Seq(_) => "sequence expression",
        Expr::Ident(_) => "identifier",
        Expr::Lit(_) => "literal",
        Expr::Tpl(_) | Expr::TaggedTpl(_) => "template literal",
        Expr::Arrow(_) => "arrow function",
        Expr::Paren(_) => "parenthesized expression",
        _ => "expression",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funkliner_parser::parse_script;

    fn path_of(source: &str) -> Result<String, &'static str> {
        let parsed = parse_script(source, "snippet.js").unwrap();
        match &parsed.script.body[0] {
            Stmt::Expr(stmt) => resolve_path(&stmt.expr).map_err(|e| e.shape),
            other => panic!("not an expression statement: {:?}", other),
        }
    }

    #[test]
    fn test_simple_paths() {
        assert_eq!(path_of("this").unwrap(), "this");
        assert_eq!(path_of("object2.log").unwrap(), "object2.log");
        assert_eq!(path_of("this .message").unwrap(), "this.message");
        assert_eq!(path_of("window.cases[select]").unwrap(), "window.cases[select]");
        assert_eq!(path_of("this.message[0]").unwrap(), "this.message[0]");
    }

    #[test]
    fn test_operator_paths() {
        assert_eq!(path_of("this.message++").unwrap(), "this.message++");
        assert_eq!(path_of("++this.message").unwrap(), "++this.message");
        assert_eq!(path_of("i--").unwrap(), "i--");
        assert_eq!(path_of("steps[i % 3]").unwrap(), "steps[i%3]");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(path_of("42").unwrap(), "42");
        assert_eq!(path_of("1.50").unwrap(), "1.5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.25), "0.25");
    }

    #[test]
    fn test_unsupported_shapes() {
        assert_eq!(path_of("a + b"), Err("binary expression"));
        assert_eq!(path_of("f().x"), Err("call"));
        assert_eq!(path_of("'text'"), Err("literal"));
    }
}
