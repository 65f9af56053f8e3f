//! Rewrites the snippet: resolves call sites against the environment and
//! splices in inlined bodies, unrolled loops and generated switches.

use funkliner_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use funkliner_parser::swc_ecma_ast::*;
use funkliner_parser::{ParsedScript, Spanned};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::env::{Environment, ObjectId};
use crate::inliner::{InlineOptions, InlineStats};
use crate::path::{format_number, resolve_path};
use crate::rewrite::{rewrite_function_body, rewrite_loop_body, Replacements, RewrittenBody};
use crate::splice::Splicer;
use crate::switch::{render_switch, DynamicCall, SwitchCase, Via};
use crate::unroll::{analyze_loop, LoopShape};

/// `/*:TypeName*/` right after a parameter.
static TYPE_ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*/\*\s*:\s*([a-zA-Z_$][a-zA-Z0-9_$.]*)\s*\*/")
        .expect("type annotation pattern is valid")
});

/// Rewrite `snippet` against an environment already populated from `library`.
pub(crate) fn rewrite_snippet<'a>(
    env: &mut Environment<'a>,
    library: &'a ParsedScript,
    snippet: &ParsedScript,
    options: &InlineOptions,
    diagnostics: &mut Diagnostics,
) -> (String, InlineStats) {
    let mut rewriter = SnippetRewriter {
        env,
        library,
        snippet,
        options,
        diagnostics,
        splicer: Splicer::new(&snippet.source),
        state: StatementState::default(),
        stats: InlineStats::default(),
        expansions: 0,
        limit_reported: false,
    };
    rewriter.walk_stmts(&snippet.script.body);
    rewriter.splicer.copy_to(snippet.source.len());
    if !rewriter.splicer.check_invariants() {
        log::error!("output pieces do not cover the snippet in order");
        rewriter.diagnostics.push(
            Diagnostic::new(
                DiagnosticCode::InternalError,
                "rewritten output does not cover the snippet exactly once",
            )
            .build(),
        );
    }

    let stats = rewriter.stats;
    (rewriter.splicer.finish(), stats)
}

/// Per-statement bookkeeping for return-value temporaries.
#[derive(Debug, Default)]
struct StatementState {
    /// Name the statement binds, used in temporary names
    name: String,
    calls: usize,
    /// Text hoisted in front of the statement
    preput: String,
    /// Several statements were spliced in where one was
    braces: bool,
}

struct SnippetRewriter<'a, 's, 'c> {
    env: &'c mut Environment<'a>,
    library: &'a ParsedScript,
    snippet: &'s ParsedScript,
    options: &'c InlineOptions,
    diagnostics: &'c mut Diagnostics,
    splicer: Splicer<'s>,
    state: StatementState,
    stats: InlineStats,
    expansions: usize,
    limit_reported: bool,
}

impl<'a, 's, 'c> SnippetRewriter<'a, 's, 'c> {
    fn walk_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.walk_stmt(stmt, true);
        }
    }

    /// `in_list` is false for the unbraced body of an `if` or loop, which
    /// gets braces if text is hoisted in front of it or it grows into
    /// several statements.
    fn walk_stmt(&mut self, stmt: &Stmt, in_list: bool) {
        match stmt {
            Stmt::Decl(Decl::Var(var)) => self.statement(stmt, in_list, |this| {
                for decl in &var.decls {
                    if let Some(init) = &decl.init {
                        this.state.name = match &decl.name {
                            Pat::Ident(binding) => binding.id.sym.to_string(),
                            _ => String::new(),
                        };
                        this.walk_expr(init, true);
                    }
                }
            }),
            Stmt::Expr(s) => self.statement(stmt, in_list, |this| this.walk_expr_stmt(&s.expr)),
            Stmt::Return(ret) => self.statement(stmt, in_list, |this| {
                if let Some(arg) = &ret.arg {
                    this.walk_expr(arg, true);
                }
            }),
            Stmt::Throw(s) => self.statement(stmt, in_list, |this| this.walk_expr(&s.arg, true)),
            Stmt::If(s) => {
                self.walk_stmt(&s.cons, false);
                if let Some(alt) = &s.alt {
                    self.walk_stmt(alt, false);
                }
            }
            Stmt::Block(block) => self.walk_stmts(&block.stmts),
            Stmt::For(s) => {
                if !self.try_unroll(s, in_list) {
                    self.walk_stmt(&s.body, false);
                }
            }
            Stmt::ForIn(s) => self.walk_stmt(&s.body, false),
            Stmt::ForOf(s) => self.walk_stmt(&s.body, false),
            Stmt::While(s) => self.walk_stmt(&s.body, false),
            Stmt::DoWhile(s) => self.walk_stmt(&s.body, false),
            Stmt::Labeled(s) => self.walk_stmt(&s.body, false),
            Stmt::Switch(s) => {
                for case in &s.cases {
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
            Stmt::Decl(Decl::Fn(decl)) => self.walk_function(&decl.function, None),
            _ => {}
        }
    }

    /// Walk one statement with fresh temporary bookkeeping, then hoist any
    /// collected preput in front of it.
    fn statement(&mut self, stmt: &Stmt, in_list: bool, walk: impl FnOnce(&mut Self)) {
        let range = self.snippet.range(stmt.span());
        let outer = std::mem::take(&mut self.state);
        self.splicer.copy_to(range.start);
        let mark = self.splicer.mark();

        walk(self);

        let state = std::mem::replace(&mut self.state, outer);
        if in_list {
            self.splicer.insert_at(mark, state.preput);
        } else if !state.preput.is_empty() || state.braces {
            self.splicer.copy_to(range.end);
            self.splicer.insert(" }");
            self.splicer.insert_at(mark, format!("{{ {}", state.preput));
        }
    }

    fn walk_expr_stmt(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign(assign) => {
                let target = match &assign.left {
                    AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
                        Some(binding.id.sym.to_string())
                    }
                    AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                        self.path_of(&Expr::Member(member.clone()))
                    }
                    _ => None,
                };
                self.state.name = target.clone().unwrap_or_default();

                match (&*assign.right, target) {
                    // Ctor.prototype.method = function (...) {...}
                    (Expr::Fn(f), Some(target)) => {
                        let parent = target.rsplit_once('.').and_then(|(p, _)| self.env.get(p));
                        let this = match parent {
                            Some(parent) => parent,
                            None => self.env.blank(),
                        };
                        self.walk_function(&f.function, Some(this));
                    }
                    _ => self.walk_expr(&assign.right, true),
                }
            }
            Expr::Call(call) => self.replace_call(call, false),
            other => self.walk_expr(other, true),
        }
    }

    /// Look for calls inside an expression. `used` tells whether the value
    /// of a call found at this position matters.
    fn walk_expr(&mut self, expr: &Expr, used: bool) {
        match expr {
            Expr::Call(call) => self.replace_call(call, used),
            Expr::Fn(f) => self.walk_function(&f.function, None),
            Expr::Paren(paren) => self.walk_expr(&paren.expr, used),
            Expr::Bin(bin) => {
                self.walk_expr(&bin.left, true);
                self.walk_expr(&bin.right, true);
            }
            Expr::Unary(unary) => self.walk_expr(&unary.arg, true),
            Expr::Update(update) => self.walk_expr(&update.arg, true),
            Expr::Assign(assign) => self.walk_expr(&assign.right, true),
            Expr::Cond(cond) => {
                self.walk_expr(&cond.test, true);
                self.walk_expr(&cond.cons, true);
                self.walk_expr(&cond.alt, true);
            }
            Expr::Seq(seq) => {
                for expr in &seq.exprs {
                    self.walk_expr(expr, true);
                }
            }
            Expr::Member(member) => {
                self.walk_expr(&member.obj, true);
                if let MemberProp::Computed(computed) = &member.prop {
                    self.walk_expr(&computed.expr, true);
                }
            }
            Expr::New(new) => {
                for arg in new.args.iter().flatten() {
                    self.walk_expr(&arg.expr, true);
                }
            }
            Expr::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.walk_expr(&elem.expr, true);
                }
            }
            Expr::Object(object) => {
                for prop in &object.props {
                    let PropOrSpread::Prop(prop) = prop else {
                        continue;
                    };
                    match &**prop {
                        Prop::KeyValue(kv) => self.walk_expr(&kv.value, true),
                        Prop::Method(method) => self.walk_function(&method.function, None),
                        _ => {}
                    }
                }
            }
            Expr::Tpl(tpl) => {
                for expr in &tpl.exprs {
                    self.walk_expr(expr, true);
                }
            }
            _ => {}
        }
    }

    /// Walk a snippet function with `this` and a fresh scope. Parameters
    /// annotated `/*:Type*/` become instances of `Type.prototype`.
    fn walk_function(&mut self, function: &Function, this: Option<ObjectId>) {
        let this = this.unwrap_or_else(|| self.env.current_this());
        self.env.push_this(this);
        self.env.push_scope();

        for param in &function.params {
            let Pat::Ident(binding) = &param.pat else {
                continue;
            };
            let after = self.snippet.range(binding.id.span).end;
            let Some(captures) = self
                .snippet
                .source
                .get(after..)
                .and_then(|rest| TYPE_ANNOTATION.captures(rest))
            else {
                continue;
            };
            let type_name = &captures[1];
            let prototype = self.env.get(&format!("{}.prototype", type_name));
            if prototype.is_none() {
                log::debug!("{}: type {} is not modeled", binding.id.sym, type_name);
            }
            let instance = self.env.derive(prototype);
            self.env.declare_local(&binding.id.sym, instance);
        }

        if let Some(body) = &function.body {
            self.walk_stmts(&body.stmts);
        }

        self.env.pop_scope();
        self.env.pop_this();
    }

    /// Search the callee and arguments of a call that is left in place.
    fn walk_call_parts(&mut self, call: &CallExpr) {
        if let Callee::Expr(callee) = &call.callee {
            self.walk_expr(callee, true);
        }
        for arg in &call.args {
            self.walk_expr(&arg.expr, true);
        }
    }

    fn replace_call(&mut self, call: &CallExpr, used: bool) {
        let index = self.state.calls;
        self.state.calls += 1;

        let Callee::Expr(callee) = &call.callee else {
            return self.walk_call_parts(call);
        };
        if let Some(dynamic) = DynamicCall::from_callee(callee) {
            return self.replace_dynamic_call(call, dynamic, used, index);
        }
        let Some(path) = self.path_of(callee) else {
            return self.walk_call_parts(call);
        };
        let (target, via_call) = match path.strip_suffix(".call") {
            Some(target) => (target.to_string(), true),
            None => (path, false),
        };

        let Some(function) = self.env.get(&target).and_then(|id| self.env.function(id)) else {
            log::debug!("{}: not a modeled function", target);
            self.report(
                DiagnosticCode::UnresolvedCallee,
                call.span,
                format!("no function known at `{}`", target),
            );
            return self.walk_call_parts(call);
        };
        let Some(mut args) = self.argument_texts(&call.args) else {
            return self.walk_call_parts(call);
        };

        let mut replacements = Replacements::new();
        if via_call {
            if !args.is_empty() {
                replacements.bind_this(args.remove(0));
            }
        } else if let Some((receiver, _)) = target.rsplit_once('.') {
            replacements.bind_this(receiver);
        }
        if !self.bind_params(function, &args, &mut replacements, call.span, &target) {
            return;
        }
        if !self.take_expansion(call.span) {
            return;
        }

        let temp = used.then(|| self.temp_name(index));
        let body = rewrite_function_body(self.library, function, &replacements, temp.as_deref(), false);
        self.report_verbatim(&body);
        self.stats.calls_inlined += 1;
        log::debug!("inlined {} ({} bytes)", target, body.text.len());

        let range = self.snippet.range(call.span);
        match temp {
            Some(temp) if body.uses_temp => {
                self.state.preput.push_str(&body.text);
                if !body.text.ends_with('\n') {
                    self.state.preput.push_str(";\n");
                }
                self.splicer.replace(range, temp);
            }
            _ if used => self.splicer.replace(range, format!("({})", body.text)),
            _ => {
                let statements = function.body.as_ref().map_or(0, |body| body.stmts.len());
                self.state.braces |= statements > 1;
                self.splicer.replace(range, body.text);
            }
        }
    }

    fn replace_dynamic_call(&mut self, call: &CallExpr, dynamic: DynamicCall<'_>, used: bool, index: usize) {
        let (Some(object_path), Some(key)) = (self.path_of(dynamic.object), self.path_of(dynamic.key))
        else {
            return self.walk_call_parts(call);
        };
        let Some(object) = self.env.get(&object_path) else {
            self.report(
                DiagnosticCode::UnresolvedCallee,
                call.span,
                format!("no object known at `{}`", object_path),
            );
            return self.walk_call_parts(call);
        };
        let Some((receiver, args)) = self.dispatch_arguments(call, dynamic.via, &object_path) else {
            return self.walk_call_parts(call);
        };

        let members: Vec<(String, &'a Function)> = self
            .env
            .members(object)
            .iter()
            .filter_map(|(name, id)| self.env.function(*id).map(|f| (name.clone(), f)))
            .collect();
        if members.is_empty() {
            log::debug!("{}: no callable members to dispatch to", object_path);
            return self.walk_call_parts(call);
        }

        let temp = used.then(|| self.temp_name(index));
        let mut cases = Vec::with_capacity(members.len());
        for (member, function) in members {
            let mut replacements = Replacements::new();
            replacements.bind_this(receiver.as_str());
            let target = format!("{}.{}", object_path, member);
            if !self.bind_params(function, &args, &mut replacements, call.span, &target) {
                continue;
            }
            let body = rewrite_function_body(self.library, function, &replacements, temp.as_deref(), true);
            cases.push(SwitchCase { member, body });
        }
        if cases.is_empty() {
            log::debug!("{}: no member can be inlined", object_path);
            return self.walk_call_parts(call);
        }
        if !self.take_expansion(call.span) {
            return;
        }
        for case in &cases {
            self.report_verbatim(&case.body);
        }

        let uses_temp = cases.iter().any(|case| case.body.uses_temp);
        let fallback = self.snippet.text(call.span);
        let text = render_switch(&key, &cases, fallback, temp.as_deref().filter(|_| uses_temp));
        self.stats.switches_generated += 1;
        log::debug!("dispatch on {} over {} cases", key, cases.len());

        let range = self.snippet.range(call.span);
        match temp {
            Some(temp) if uses_temp => {
                self.state.preput.push_str(&text);
                self.state.preput.push('\n');
                self.splicer.replace(range, temp);
            }
            _ => {
                self.splicer.replace(range, text);
                if matches!(self.splicer.peek(), Some(b';') | Some(b' ')) {
                    let next = self.splicer.cursor() + 1;
                    self.splicer.skip_to(next);
                }
            }
        }
    }

    /// Receiver text and remaining argument texts for a dynamic call.
    fn dispatch_arguments(&mut self, call: &CallExpr, via: Via, object_path: &str) -> Option<(String, Vec<String>)> {
        match via {
            Via::Direct => Some((object_path.to_string(), self.argument_texts(&call.args)?)),
            Via::Call => {
                let mut args = self.argument_texts(&call.args)?;
                let receiver = match args.is_empty() {
                    true => "undefined".to_string(),
                    false => args.remove(0),
                };
                Some((receiver, args))
            }
            Via::Apply => {
                let receiver = match call.args.first() {
                    Some(arg) => self.argument_text(arg)?,
                    None => "undefined".to_string(),
                };
                let args = match call.args.get(1).map(|arg| (&arg.spread, &*arg.expr)) {
                    None => Vec::new(),
                    Some((None, Expr::Array(array))) => {
                        let mut texts = Vec::with_capacity(array.elems.len());
                        for elem in &array.elems {
                            texts.push(match elem {
                                Some(elem) => self.argument_text(elem)?,
                                None => "undefined".to_string(),
                            });
                        }
                        texts
                    }
                    Some((_, other)) => {
                        self.report(
                            DiagnosticCode::UnresolvedArgument,
                            other.span(),
                            "`apply` needs an array literal to inline".to_string(),
                        );
                        return None;
                    }
                };
                Some((receiver, args))
            }
        }
    }

    /// Bind declared parameters to argument texts. Returns false when a
    /// parameter is not a plain identifier.
    fn bind_params(
        &mut self,
        function: &Function,
        args: &[String],
        replacements: &mut Replacements,
        span: swc_common::Span,
        target: &str,
    ) -> bool {
        let mut names = Vec::with_capacity(function.params.len());
        for param in &function.params {
            match &param.pat {
                Pat::Ident(binding) => names.push(binding.id.sym.to_string()),
                _ => {
                    log::debug!("{}: parameter pattern cannot be substituted", target);
                    self.report(
                        DiagnosticCode::UnresolvedArgument,
                        span,
                        format!("`{}` has a parameter that is not a plain name", target),
                    );
                    return false;
                }
            }
        }

        if args.len() > names.len() {
            log::warn!(
                "{}: dropping {} extra argument(s)",
                target,
                args.len() - names.len()
            );
            self.report(
                DiagnosticCode::ExtraArguments,
                span,
                format!(
                    "`{}` takes {} argument(s) but {} were passed",
                    target,
                    names.len(),
                    args.len()
                ),
            );
        }

        for (index, name) in names.into_iter().enumerate() {
            let text = args.get(index).map(String::as_str).unwrap_or("undefined");
            replacements.bind(name, text);
        }
        true
    }

    fn argument_texts(&mut self, args: &[ExprOrSpread]) -> Option<Vec<String>> {
        args.iter().map(|arg| self.argument_text(arg)).collect()
    }

    /// Text substituted for a parameter: literals as written, numbers and
    /// paths in resolved form.
    fn argument_text(&mut self, arg: &ExprOrSpread) -> Option<String> {
        if let Some(spread) = arg.spread {
            self.report(
                DiagnosticCode::UnresolvedArgument,
                spread,
                "spread arguments cannot be inlined".to_string(),
            );
            return None;
        }
        match &*arg.expr {
            Expr::Lit(Lit::Num(num)) => Some(format_number(num.value)),
            Expr::Lit(lit) => Some(self.snippet.text(lit.span()).to_string()),
            other => match resolve_path(other) {
                Ok(path) => Some(path),
                Err(unsupported) => {
                    log::debug!("argument is a {}", unsupported.shape);
                    self.report(
                        DiagnosticCode::UnresolvedArgument,
                        unsupported.span,
                        format!("{} cannot be passed into an inlined body", unsupported.shape),
                    );
                    None
                }
            },
        }
    }

    fn path_of(&mut self, expr: &Expr) -> Option<String> {
        match resolve_path(expr) {
            Ok(path) => Some(path),
            Err(unsupported) => {
                log::debug!("no path for {}", unsupported.shape);
                self.report(
                    DiagnosticCode::UnsupportedPath,
                    unsupported.span,
                    format!("{} cannot be resolved to a path", unsupported.shape),
                );
                None
            }
        }
    }

    /// Replace a counting loop with one copy of its body per iteration.
    /// Copies standing in for an unbraced body are wrapped in braces.
    fn try_unroll(&mut self, stmt: &ForStmt, in_list: bool) -> bool {
        match analyze_loop(stmt, self.options.max_unroll) {
            LoopShape::Counting { var, values } => {
                let copies: Vec<String> = values
                    .iter()
                    .map(|value| {
                        let mut replacements = Replacements::new();
                        replacements.bind(var.as_str(), format_number(*value));
                        rewrite_loop_body(self.snippet, &stmt.body, &replacements).text
                    })
                    .collect();
                log::debug!("unrolled loop over {} into {} copies", var, copies.len());
                let text = match in_list {
                    true => copies.join("\n"),
                    false => format!("{{ {} }}", copies.join("\n")),
                };
                self.splicer.replace(self.snippet.range(stmt.span), text);
                self.stats.loops_unrolled += 1;
                true
            }
            LoopShape::TooLong { var, limit } => {
                log::warn!("loop over {} runs {} or more times; left as is", var, limit);
                self.report(
                    DiagnosticCode::UnrollLimit,
                    stmt.span,
                    format!("loop over `{}` needs {} or more copies", var, limit),
                );
                false
            }
            LoopShape::Unrecognized(reason) => {
                log::debug!("loop not unrolled: {}", reason);
                false
            }
        }
    }

    fn take_expansion(&mut self, span: swc_common::Span) -> bool {
        if self.expansions < self.options.max_expansions {
            self.expansions += 1;
            return true;
        }
        if !self.limit_reported {
            self.limit_reported = true;
            log::warn!("expansion limit of {} reached", self.options.max_expansions);
            self.report(
                DiagnosticCode::ExpansionLimit,
                span,
                format!(
                    "{} calls already expanded in this pass; leaving the rest",
                    self.options.max_expansions
                ),
            );
        }
        false
    }

    fn temp_name(&self, index: usize) -> String {
        let name: String = self
            .state
            .name
            .chars()
            .map(|c| match c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                true => c,
                false => '_',
            })
            .collect();
        format!("ret{}{}", name, index)
    }

    fn report(&mut self, code: DiagnosticCode, span: swc_common::Span, message: String) {
        self.diagnostics.push(
            Diagnostic::new(code, message)
                .with_span(self.snippet.span(span))
                .build(),
        );
    }

    fn report_verbatim(&mut self, body: &RewrittenBody) {
        for span in &body.verbatim {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::UnsupportedStatement,
                    "statement inlined without parameter substitution",
                )
                .with_span(self.library.span(*span))
                .build(),
            );
        }
    }
}
