//! Populates an [`Environment`] from the library's declarations.
//!
//! Top-level statements are crawled in one pass. Function bodies, including
//! object literal methods, and `new` instantiations are queued and run after
//! the pass, so a function may refer to declarations that appear later in
//! the library.

use funkliner_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use funkliner_parser::swc_ecma_ast::*;
use funkliner_parser::{ParsedScript, Spanned};

use crate::env::{Environment, ObjectId, Slot};
use crate::path::{format_number, resolve_path};

/// Work postponed until the current statement list has been crawled.
#[derive(Debug)]
enum Deferred<'a> {
    /// Crawl a function body with `this` bound to its prototype.
    Constructor {
        prototype: ObjectId,
        body: &'a [Stmt],
    },
    /// Store a fresh instance of `constructor.prototype` in `target`.
    Instantiate { target: Slot, constructor: String },
}

/// Crawl the whole library into `env`.
pub fn crawl_library<'a>(
    env: &mut Environment<'a>,
    library: &'a ParsedScript,
    diagnostics: &mut Diagnostics,
) {
    let mut crawler = LibraryCrawler {
        env,
        library,
        diagnostics,
    };
    crawler.crawl(&library.script.body);
}

struct LibraryCrawler<'a, 'c> {
    env: &'c mut Environment<'a>,
    library: &'a ParsedScript,
    diagnostics: &'c mut Diagnostics,
}

impl<'a, 'c> LibraryCrawler<'a, 'c> {
    fn crawl(&mut self, stmts: &'a [Stmt]) {
        let mut deferred = Vec::new();
        for stmt in stmts {
            self.crawl_stmt(stmt, &mut deferred);
        }
        for work in deferred {
            self.run(work);
        }
    }

    fn run(&mut self, work: Deferred<'a>) {
        match work {
            Deferred::Constructor { prototype, body } => {
                self.env.push_this(prototype);
                self.crawl(body);
                self.env.pop_this();
            }
            Deferred::Instantiate {
                target,
                constructor,
            } => {
                let prototype = self.env.get(&format!("{}.prototype", constructor));
                if prototype.is_none() {
                    log::debug!("new {}: constructor is not modeled", constructor);
                }
                let instance = self.env.derive(prototype);
                self.env.store(&target, instance);
            }
        }
    }

    fn crawl_stmt(&mut self, stmt: &'a Stmt, deferred: &mut Vec<Deferred<'a>>) {
        match stmt {
            Stmt::Decl(Decl::Fn(decl)) => {
                self.bind_function(&decl.ident.sym, &decl.function, deferred);
            }
            Stmt::Decl(Decl::Var(var)) => {
                for decl in &var.decls {
                    if let (Pat::Ident(name), Some(init)) = (&decl.name, &decl.init) {
                        self.bind_value(&name.id.sym, init, deferred);
                    }
                }
            }
            Stmt::Expr(ExprStmt { expr, .. }) => {
                if let Expr::Assign(assign) = &**expr {
                    if assign.op != AssignOp::Assign {
                        return;
                    }
                    if let Some(target) = self.assign_target(&assign.left) {
                        self.bind_value(&target, &assign.right, deferred);
                    }
                }
            }
            _ => {}
        }
    }

    fn assign_target(&mut self, target: &AssignTarget) -> Option<String> {
        match target {
            AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
                Some(binding.id.sym.to_string())
            }
            AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                self.path(&Expr::Member(member.clone()))
            }
            _ => None,
        }
    }

    fn path(&mut self, expr: &Expr) -> Option<String> {
        match resolve_path(expr) {
            Ok(path) => Some(path),
            Err(unsupported) => {
                log::debug!("library: no path for {}", unsupported.shape);
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::UnsupportedPath,
                        format!("{} cannot name a library value", unsupported.shape),
                    )
                    .with_span(self.library.span(unsupported.span))
                    .build(),
                );
                None
            }
        }
    }

    /// Bind `name` to a callable object and give it a prototype. The body
    /// is queued to be crawled with `this` set to that prototype.
    fn bind_function(&mut self, name: &str, function: &'a Function, deferred: &mut Vec<Deferred<'a>>) {
        let id = match self.env.get(name) {
            Some(existing) => {
                self.env.attach_function(existing, function);
                existing
            }
            None => self.env.wrap_function(function),
        };
        if !self.env.set(name, id) {
            return;
        }

        let prototype_path = format!("{}.prototype", name);
        let prototype = match self.env.get(&prototype_path) {
            Some(existing) => existing,
            None => {
                let blank = self.env.blank();
                self.env.set(&prototype_path, blank);
                blank
            }
        };

        if let Some(body) = &function.body {
            deferred.push(Deferred::Constructor {
                prototype,
                body: &body.stmts,
            });
        }
    }

    /// Get or create a plain object at `name`.
    fn bind_object(&mut self, name: &str) -> Option<ObjectId> {
        let id = match self.env.get(name) {
            Some(existing) => existing,
            None => self.env.blank(),
        };
        self.env.set(name, id).then_some(id)
    }

    fn bind_value(&mut self, name: &str, value: &'a Expr, deferred: &mut Vec<Deferred<'a>>) {
        match value {
            Expr::Fn(f) => self.bind_function(name, &f.function, deferred),
            Expr::Paren(paren) => self.bind_value(name, &paren.expr, deferred),
            Expr::Object(object) => {
                let Some(id) = self.bind_object(name) else {
                    return;
                };
                self.env.push_this(id);
                for prop in &object.props {
                    self.crawl_property(prop, deferred);
                }
                self.env.pop_this();
            }
            Expr::Array(array) => {
                let Some(id) = self.bind_object(name) else {
                    return;
                };
                self.env.push_this(id);
                for (index, elem) in array.elems.iter().enumerate() {
                    if let Some(ExprOrSpread { spread: None, expr }) = elem {
                        self.bind_value(&format!("this.{}", index), expr, deferred);
                    }
                }
                self.env.pop_this();
            }
            Expr::Ident(_) | Expr::Member(_) | Expr::This(_) => {
                let Some(from) = self.path(value) else {
                    return;
                };
                match self.env.get(&from) {
                    Some(id) => {
                        self.env.set(name, id);
                    }
                    None => log::debug!("alias {} = {}: source is not modeled", name, from),
                }
            }
            Expr::New(new) => {
                let Some(constructor) = self.path(&new.callee) else {
                    return;
                };
                match self.env.slot(name) {
                    Some(target) => deferred.push(Deferred::Instantiate {
                        target,
                        constructor,
                    }),
                    None => log::debug!("new {}: cannot bind {}", constructor, name),
                }
            }
            _ => {}
        }
    }

    fn crawl_property(&mut self, prop: &'a PropOrSpread, deferred: &mut Vec<Deferred<'a>>) {
        let PropOrSpread::Prop(prop) = prop else {
            return;
        };
        match &**prop {
            Prop::KeyValue(kv) => {
                if let Some(key) = property_key(self.library, &kv.key) {
                    self.bind_value(&format!("this.{}", key), &kv.value, deferred);
                }
            }
            Prop::Method(method) => {
                if let Some(key) = property_key(self.library, &method.key) {
                    let name = format!("this.{}", key);
                    self.bind_function(&name, &method.function, deferred);
                }
            }
            Prop::Shorthand(ident) => match self.env.get(&ident.sym) {
                Some(id) => {
                    self.env.set(&format!("this.{}", ident.sym), id);
                }
                None => log::debug!("shorthand {}: source is not modeled", ident.sym),
            },
            _ => {
                log::debug!("skipping accessor at {:?}", self.library.range(prop.span()));
            }
        }
    }
}

/// Member name for an object literal key. String keys are taken from the
/// source text between their quotes.
pub fn property_key(script: &ParsedScript, key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(s) => {
            let raw = script.text(s.span);
            raw.get(1..raw.len().saturating_sub(1)).map(str::to_string)
        }
        PropName::Num(num) => Some(format_number(num.value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funkliner_parser::parse_script;

    fn with_library<F>(source: &str, check: F)
    where
        F: for<'a> FnOnce(&Environment<'a>, &Diagnostics),
    {
        let library = parse_script(source, "library.js").unwrap();
        let mut env = Environment::new();
        let mut diagnostics = Diagnostics::new();
        crawl_library(&mut env, &library, &mut diagnostics);
        check(&env, &diagnostics);
    }

    fn callable(env: &Environment<'_>, path: &str) -> bool {
        env.get(path).and_then(|id| env.function(id)).is_some()
    }

    #[test]
    fn test_function_declaration_and_prototype() {
        with_library("function add(one, two) { return one + two; }", |env, _| {
            assert!(callable(env, "add"));
            assert!(env.get("add.prototype").is_some());
            assert!(callable(env, "window.add"));
        });
    }

    #[test]
    fn test_object_literal_members() {
        let source = r#"
            object = {
                log: function (message) { this.reallog(message); },
                reallog: function (message) { console.log(message); },
                nested: { deep: function () {} },
                list: [function () {}],
                count: 3
            };
        "#;
        with_library(source, |env, _| {
            assert!(callable(env, "object.log"));
            assert!(callable(env, "object.reallog"));
            assert!(callable(env, "object.nested.deep"));
            assert!(callable(env, "object.list.0"));
            assert!(env.get("object.count").is_none());

            let object = env.get("object").unwrap();
            let names: Vec<_> = env.members(object).iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(names, ["log", "reallog", "nested", "list"]);
        });
    }

    #[test]
    fn test_constructor_prototype_and_new() {
        let source = r#"
            function Logger() {
                this.prefix = {};
            }
            Logger.prototype.log = function (message) { console.log(message); };
            var logger = new Logger();
        "#;
        with_library(source, |env, _| {
            assert!(callable(env, "logger.log"));
            assert!(env.get("logger.prefix").is_some());
        });
    }

    #[test]
    fn test_forward_reference_in_constructor() {
        let source = r#"
            function App() {
                this.helper = helper;
            }
            function helper() { return 1; }
            var app = new App();
        "#;
        with_library(source, |env, _| {
            assert!(callable(env, "app.helper"));
        });
    }

    #[test]
    fn test_method_bodies_see_later_prototypes() {
        let source = r#"
            var app = { start: function () { this.worker = new Worker(); } };
            function Worker() {}
            Worker.prototype.run = function (n) { return n + 1; };
        "#;
        with_library(source, |env, _| {
            assert!(callable(env, "app.start.prototype.worker.run"));
        });
    }

    #[test]
    fn test_aliases() {
        let source = r#"
            function log(message) { console.log(message); }
            object = { log: function () {} };
            object2 = object;
            window.log2 = log;
        "#;
        with_library(source, |env, _| {
            assert_eq!(env.get("object2"), env.get("object"));
            assert_eq!(env.get("log2"), env.get("log"));
            assert!(env.get("missing_alias").is_none());
        });
    }

    #[test]
    fn test_array_of_functions() {
        let source = "steps = [function () { this.a(); }, function () {}, 3];";
        with_library(source, |env, _| {
            assert!(callable(env, "steps.0"));
            assert!(callable(env, "steps.1"));
            assert!(env.get("steps.2").is_none());
            assert!(env.get("steps.0.prototype").is_some());
        });
    }

    #[test]
    fn test_keys_and_methods() {
        let source = r#"cases = { 0: function () {}, "two words": function () {}, m() {} };"#;
        with_library(source, |env, _| {
            assert!(callable(env, "cases.0"));
            assert!(callable(env, "cases.two words"));
            assert!(callable(env, "cases.m"));
        });
    }

    #[test]
    fn test_unsupported_target_reports() {
        with_library("f().x = function () {};", |env, diagnostics| {
            assert_eq!(diagnostics.count_code(DiagnosticCode::UnsupportedPath), 1);
            assert_eq!(env.members(env.root()).len(), 1);
        });
    }
}
