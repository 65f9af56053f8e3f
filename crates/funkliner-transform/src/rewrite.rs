//! Parameter substitution inside function and loop bodies.
//!
//! The body is reconstructed from its own source text. Identifiers found in
//! the replacement map are swapped for argument text, `return` statements are
//! turned into plain expressions or temporary assignments, and everything else
//! is copied through unchanged.

use std::collections::HashMap;

use funkliner_parser::swc_ecma_ast::*;
use funkliner_parser::{ParsedScript, Spanned};

use crate::splice::Splicer;

/// Parameter name (or `this`) to argument text, for one call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements {
    map: HashMap<String, String>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.map.insert(name.into(), text.into());
    }

    pub fn bind_this(&mut self, text: impl Into<String>) {
        self.bind("this", text);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewrittenBody {
    pub text: String,
    /// The text declares and assigns the return-value temporary
    pub uses_temp: bool,
    /// Statements copied without looking inside them
    pub verbatim: Vec<swc_common::Span>,
}

/// Rewrite a function body for inlining.
///
/// `temp` names the return-value temporary the caller wants. It is declared
/// and assigned when the body does not start with `return`, or always when
/// `force_temp` is set.
pub fn rewrite_function_body(
    script: &ParsedScript,
    function: &Function,
    replacements: &Replacements,
    temp: Option<&str>,
    force_temp: bool,
) -> RewrittenBody {
    let stmts = function
        .body
        .as_ref()
        .map(|body| body.stmts.as_slice())
        .unwrap_or_default();

    let starts_with_return = matches!(stmts.first(), Some(Stmt::Return(_)));
    let uses_temp = temp.is_some() && (force_temp || !starts_with_return);
    let mut prefix = String::new();
    if let (true, Some(name)) = (uses_temp, temp) {
        prefix = format!("var {} = undefined;\n", name);
    }

    let Some(first) = stmts.first() else {
        return RewrittenBody {
            text: prefix,
            uses_temp,
            verbatim: Vec::new(),
        };
    };

    let start = script.range(first.span()).start;
    let mut rewriter = BodyRewriter::new(script, replacements, temp.filter(|_| uses_temp), start);
    rewriter.walk_stmts(stmts);
    rewriter.splicer.trim_terminator();

    let (text, verbatim) = rewriter.finish();
    RewrittenBody {
        text: prefix + text.as_str(),
        uses_temp,
        verbatim,
    }
}

/// Rewrite one copy of a loop body. A braced body loses its braces but keeps
/// the text between its last statement and the closing brace.
pub fn rewrite_loop_body(
    script: &ParsedScript,
    body: &Stmt,
    replacements: &Replacements,
) -> RewrittenBody {
    let (text, verbatim) = match body {
        Stmt::Block(block) => {
            let Some(first) = block.stmts.first() else {
                return RewrittenBody::default();
            };
            let close = script.range(block.span).end.saturating_sub(1);
            let mut rewriter = BodyRewriter::new(
                script,
                replacements,
                None,
                script.range(first.span()).start,
            );
            rewriter.walk_stmts(&block.stmts);
            rewriter.splicer.copy_to(close);
            rewriter.finish()
        }
        other => {
            let start = script.range(other.span()).start;
            let mut rewriter = BodyRewriter::new(script, replacements, None, start);
            rewriter.walk_stmt(other);
            rewriter.finish()
        }
    };

    RewrittenBody {
        text,
        uses_temp: false,
        verbatim,
    }
}

struct BodyRewriter<'s, 'r> {
    script: &'s ParsedScript,
    replacements: &'r Replacements,
    /// Set only when returns assign into a temporary
    temp: Option<&'r str>,
    splicer: Splicer<'s>,
    verbatim: Vec<swc_common::Span>,
}

impl<'s, 'r> BodyRewriter<'s, 'r> {
    fn new(
        script: &'s ParsedScript,
        replacements: &'r Replacements,
        temp: Option<&'r str>,
        start: usize,
    ) -> Self {
        Self {
            script,
            replacements,
            temp,
            splicer: Splicer::starting_at(&script.source, start),
            verbatim: Vec::new(),
        }
    }

    fn finish(self) -> (String, Vec<swc_common::Span>) {
        (self.splicer.finish(), self.verbatim)
    }

    fn walk_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Return(ret) => return self.walk_return(ret),
            Stmt::Expr(s) => self.walk_expr(&s.expr),
            Stmt::Decl(Decl::Var(var)) => self.walk_var(var),
            Stmt::If(s) => {
                self.walk_expr(&s.test);
                self.walk_stmt(&s.cons);
                if let Some(alt) = &s.alt {
                    self.walk_stmt(alt);
                }
            }
            Stmt::Block(block) => self.walk_stmts(&block.stmts),
            Stmt::For(s) => {
                match &s.init {
                    Some(VarDeclOrExpr::VarDecl(var)) => self.walk_var(var),
                    Some(VarDeclOrExpr::Expr(expr)) => self.walk_expr(expr),
                    None => {}
                }
                if let Some(test) = &s.test {
                    self.walk_expr(test);
                }
                if let Some(update) = &s.update {
                    self.walk_expr(update);
                }
                self.walk_stmt(&s.body);
            }
            Stmt::ForIn(s) => {
                self.walk_expr(&s.right);
                self.walk_stmt(&s.body);
            }
            Stmt::ForOf(s) => {
                self.walk_expr(&s.right);
                self.walk_stmt(&s.body);
            }
            Stmt::While(s) => {
                self.walk_expr(&s.test);
                self.walk_stmt(&s.body);
            }
            Stmt::DoWhile(s) => {
                self.walk_stmt(&s.body);
                self.walk_expr(&s.test);
            }
            Stmt::Labeled(s) => self.walk_stmt(&s.body),
            Stmt::Throw(s) => self.walk_expr(&s.arg),
            Stmt::Switch(s) => {
                self.walk_expr(&s.discriminant);
                for case in &s.cases {
                    if let Some(test) = &case.test {
                        self.walk_expr(test);
                    }
                    self.walk_stmts(&case.cons);
                }
            }
            Stmt::Try(s) => {
                self.walk_stmts(&s.block.stmts);
                if let Some(handler) = &s.handler {
                    self.walk_stmts(&handler.body.stmts);
                }
                if let Some(finalizer) = &s.finalizer {
                    self.walk_stmts(&finalizer.stmts);
                }
            }
            Stmt::Empty(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Debugger(_) => {}
            other => {
                log::debug!("copying statement without substitution");
                self.verbatim.push(other.span());
            }
        }
        self.splicer.copy_to(self.script.range(stmt.span()).end);
    }

    fn walk_var(&mut self, var: &VarDecl) {
        for decl in &var.decls {
            if let Some(init) = &decl.init {
                self.walk_expr(init);
            }
        }
    }

    fn walk_return(&mut self, ret: &ReturnStmt) {
        let range = self.script.range(ret.span);
        self.splicer.copy_to(range.start);

        let Some(arg) = &ret.arg else {
            self.splicer.skip_to(range.end);
            return;
        };

        let arg_range = self.script.range(arg.span());
        self.splicer.skip_to(arg_range.start);
        if let Some(temp) = self.temp {
            self.splicer.insert(format!("{} = ", temp));
        }
        self.walk_expr(arg);
        self.splicer.copy_to(arg_range.end);
        self.splicer.skip_to(range.end);
        if self.temp.is_some() {
            self.splicer.insert(";\n");
        }
    }

    fn substitute(&mut self, name: &str, span: swc_common::Span) {
        if let Some(text) = self.replacements.get(name) {
            let text = text.to_string();
            self.splicer.replace(self.script.range(span), text);
        }
    }

    fn walk_member(&mut self, member: &MemberExpr) {
        self.walk_expr(&member.obj);
        if let MemberProp::Computed(computed) = &member.prop {
            self.walk_expr(&computed.expr);
        }
    }

    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::This(this) => self.substitute("this", this.span),
            Expr::Ident(ident) => self.substitute(&ident.sym, ident.span),
            Expr::Member(member) => self.walk_member(member),
            Expr::Call(call) => {
                if let Callee::Expr(callee) = &call.callee {
                    self.walk_expr(callee);
                }
                for arg in &call.args {
                    self.walk_expr(&arg.expr);
                }
            }
            Expr::New(new) => {
                self.walk_expr(&new.callee);
                for arg in new.args.iter().flatten() {
                    self.walk_expr(&arg.expr);
                }
            }
            Expr::Bin(bin) => {
                self.walk_expr(&bin.left);
                self.walk_expr(&bin.right);
            }
            Expr::Unary(unary) => self.walk_expr(&unary.arg),
            Expr::Update(update) => self.walk_expr(&update.arg),
            Expr::Assign(assign) => {
                match &assign.left {
                    AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
                        self.substitute(&binding.id.sym, binding.id.span)
                    }
                    AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                        self.walk_member(member)
                    }
                    _ => {}
                }
                self.walk_expr(&assign.right);
            }
            Expr::Cond(cond) => {
                self.walk_expr(&cond.test);
                self.walk_expr(&cond.cons);
                self.walk_expr(&cond.alt);
            }
            Expr::Paren(paren) => self.walk_expr(&paren.expr),
            Expr::Seq(seq) => {
                for expr in &seq.exprs {
                    self.walk_expr(expr);
                }
            }
            Expr::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.walk_expr(&elem.expr);
                }
            }
            Expr::Object(object) => {
                for prop in &object.props {
                    match prop {
                        PropOrSpread::Spread(spread) => self.walk_expr(&spread.expr),
                        PropOrSpread::Prop(prop) => {
                            if let Prop::KeyValue(kv) = &**prop {
                                self.walk_expr(&kv.value);
                            }
                        }
                    }
                }
            }
            Expr::Tpl(tpl) => {
                for expr in &tpl.exprs {
                    self.walk_expr(expr);
                }
            }
            // literals and nested functions keep their text
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funkliner_parser::parse_script;

    fn first_function(script: &ParsedScript) -> &Function {
        match &script.script.body[0] {
            Stmt::Decl(Decl::Fn(decl)) => &decl.function,
            other => panic!("not a function declaration: {:?}", other),
        }
    }

    fn rewrite(library: &str, bindings: &[(&str, &str)], temp: Option<&str>, force: bool) -> RewrittenBody {
        let script = parse_script(library, "library.js").unwrap();
        let mut replacements = Replacements::new();
        for (name, text) in bindings {
            replacements.bind(*name, *text);
        }
        rewrite_function_body(&script, first_function(&script), &replacements, temp, force)
    }

    #[test]
    fn test_single_return_without_temp() {
        let body = rewrite(
            "function add(one, two) { return one + two; }",
            &[("one", "1"), ("two", "2")],
            Some("retx0"),
            false,
        );
        assert_eq!(body.text, "1 + 2");
        assert!(!body.uses_temp);
    }

    #[test]
    fn test_multi_statement_with_temp() {
        let body = rewrite(
            "function square(one) { var two = one; return one * two; }",
            &[("one", "2")],
            Some("retfinal0"),
            false,
        );
        assert_eq!(body.text, "var retfinal0 = undefined;\nvar two = 2; retfinal0 = 2 * two;\n");
        assert!(body.uses_temp);
    }

    #[test]
    fn test_forced_temp_on_single_return() {
        let body = rewrite(
            "function add(one, two) { return one + two; }",
            &[("one", "1"), ("two", "2")],
            Some("retx0"),
            true,
        );
        assert_eq!(body.text, "var retx0 = undefined;\nretx0 = 1 + 2;\n");
    }

    #[test]
    fn test_discarded_body_drops_terminator() {
        let body = rewrite(
            "function log(message) { if (typeof(console) != 'undefined') console.log(message); }",
            &[("message", "\"hi\"")],
            None,
            false,
        );
        assert_eq!(body.text, "if (typeof(console) != 'undefined') console.log(\"hi\")");
    }

    #[test]
    fn test_bare_return_is_dropped() {
        let body = rewrite(
            "function log(message) { if (ok) console.log(message); return}",
            &[("message", "\"hi\"")],
            None,
            false,
        );
        assert_eq!(body.text, "if (ok) console.log(\"hi\"); ");
    }

    #[test]
    fn test_this_and_member_base_only() {
        let body = rewrite(
            "function log(message) { this.reallog(message.message, other.message); }",
            &[("message", "m"), ("this", "object2")],
            None,
            false,
        );
        assert_eq!(body.text, "object2.reallog(m.message, other.message)");
    }

    #[test]
    fn test_literals_and_nested_functions_untouched() {
        let body = rewrite(
            "function f(a) { g('a', 1, function (a) { return a; }); }",
            &[("a", "x")],
            None,
            false,
        );
        assert_eq!(body.text, "g('a', 1, function (a) { return a; })");
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(rewrite("function f() {}", &[], None, false).text, "");
        let body = rewrite("function f() {}", &[], Some("ret0"), false);
        assert_eq!(body.text, "var ret0 = undefined;\n");
        assert!(body.uses_temp);
    }

    #[test]
    fn test_loop_body_keeps_trailing_text() {
        let script = parse_script("for (;;) { log(i); window.alert(i); }", "snippet.js").unwrap();
        let Stmt::For(for_stmt) = &script.script.body[0] else {
            panic!("expected a for loop")
        };
        let mut replacements = Replacements::new();
        replacements.bind("i", "3");

        let body = rewrite_loop_body(&script, &for_stmt.body, &replacements);
        assert_eq!(body.text, "log(3); window.alert(3); ");
    }

    #[test]
    fn test_verbatim_statements_are_reported() {
        let body = rewrite("function f(a) { function g() { return a; } g(); }", &[("a", "1")], None, false);
        assert_eq!(body.text, "function g() { return a; } g()");
        assert_eq!(body.verbatim.len(), 1);
    }
}
