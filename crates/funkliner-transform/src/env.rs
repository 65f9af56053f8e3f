//! Static model of the values a library declares.
//!
//! Objects live in an arena owned by [`Environment`] and refer to each other
//! by [`ObjectId`], so cycles such as `window.window` need no reference
//! counting. Derived objects copy their parent's member table when they are
//! created; later changes to the parent are not seen by the copy.

use std::collections::HashMap;

use funkliner_parser::swc_ecma_ast::Function;

/// Index of an object in the environment's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// A modeled value: optionally callable, with named members.
#[derive(Debug, Clone, Default)]
pub struct ObjectModel<'a> {
    pub function: Option<&'a Function>,
    /// Members in insertion order
    pub members: Vec<(String, ObjectId)>,
}

impl<'a> ObjectModel<'a> {
    pub fn member(&self, name: &str) -> Option<ObjectId> {
        self.members
            .iter()
            .find(|(member, _)| member == name)
            .map(|&(_, id)| id)
    }

    fn set_member(&mut self, name: &str, id: ObjectId) {
        match self.members.iter_mut().find(|(member, _)| member == name) {
            Some(slot) => slot.1 = id,
            None => self.members.push((name.to_string(), id)),
        }
    }
}

/// Where a path's final segment lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Member `name` of an object
    Member(ObjectId, String),
    /// Variable in the top scope
    Local(String),
}

/// Objects reachable from the global object, plus the `this` and scope
/// stacks used while walking function bodies.
#[derive(Debug)]
pub struct Environment<'a> {
    objects: Vec<ObjectModel<'a>>,
    root: ObjectId,
    this_stack: Vec<ObjectId>,
    /// Only the top scope is consulted; there is no scope chain.
    scopes: Vec<HashMap<String, ObjectId>>,
}

impl<'a> Default for Environment<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Environment<'a> {
    /// A fresh environment whose root is `window`, with `window.window`
    /// pointing back at itself.
    pub fn new() -> Self {
        let root = ObjectId(0);
        let mut env = Self {
            objects: vec![ObjectModel::default()],
            root,
            this_stack: vec![root],
            scopes: vec![HashMap::new()],
        };
        env.objects[0].set_member("window", root);
        env
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    pub fn object(&self, id: ObjectId) -> &ObjectModel<'a> {
        &self.objects[id.0]
    }

    /// The function wrapped by `id`, if it is callable.
    pub fn function(&self, id: ObjectId) -> Option<&'a Function> {
        self.objects[id.0].function
    }

    pub fn members(&self, id: ObjectId) -> &[(String, ObjectId)] {
        &self.objects[id.0].members
    }

    pub fn blank(&mut self) -> ObjectId {
        self.alloc(ObjectModel::default())
    }

    pub fn wrap_function(&mut self, function: &'a Function) -> ObjectId {
        self.alloc(ObjectModel {
            function: Some(function),
            members: Vec::new(),
        })
    }

    /// A new object holding a snapshot of `parent`'s members.
    pub fn derive(&mut self, parent: Option<ObjectId>) -> ObjectId {
        let members = parent
            .map(|p| self.objects[p.0].members.clone())
            .unwrap_or_default();
        self.alloc(ObjectModel {
            function: None,
            members,
        })
    }

    /// Make an existing object callable unless it already is.
    pub fn attach_function(&mut self, id: ObjectId, function: &'a Function) {
        let object = &mut self.objects[id.0];
        if object.function.is_none() {
            object.function = Some(function);
        }
    }

    fn alloc(&mut self, object: ObjectModel<'a>) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn current_this(&self) -> ObjectId {
        self.this_stack.last().copied().unwrap_or(self.root)
    }

    pub fn push_this(&mut self, id: ObjectId) {
        self.this_stack.push(id);
    }

    pub fn pop_this(&mut self) {
        if self.this_stack.len() > 1 {
            self.this_stack.pop();
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declare `name` in the top scope.
    pub fn declare_local(&mut self, name: &str, id: ObjectId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), id);
        }
    }

    fn local(&self, name: &str) -> Option<ObjectId> {
        self.scopes.last().and_then(|scope| scope.get(name)).copied()
    }

    fn first_segment(&self, name: &str) -> Option<ObjectId> {
        if name == "this" {
            return Some(self.current_this());
        }
        self.local(name)
            .or_else(|| self.objects[self.root.0].member(name))
    }

    /// Look up a dotted path. Any missing segment yields `None`.
    pub fn get(&self, path: &str) -> Option<ObjectId> {
        let mut segments = path.split('.');
        let mut current = self.first_segment(segments.next()?)?;
        for segment in segments {
            current = self.objects[current.0].member(segment)?;
        }
        Some(current)
    }

    /// Find where assigning to `path` would store its value.
    pub fn slot(&self, path: &str) -> Option<Slot> {
        match path.rsplit_once('.') {
            Some((parent, name)) => {
                let owner = match parent {
                    "this" => self.current_this(),
                    _ if !parent.contains('.') => self.first_segment(parent)?,
                    _ => self.get(parent)?,
                };
                Some(Slot::Member(owner, name.to_string()))
            }
            None if self.local(path).is_some() => Some(Slot::Local(path.to_string())),
            None => Some(Slot::Member(self.root, path.to_string())),
        }
    }

    pub fn store(&mut self, slot: &Slot, id: ObjectId) {
        match slot {
            Slot::Member(owner, name) => self.objects[owner.0].set_member(name, id),
            Slot::Local(name) => self.declare_local(name, id),
        }
    }

    /// Bind `path` to `id`. Returns false when an intermediate object is
    /// missing, in which case nothing is stored.
    pub fn set(&mut self, path: &str, id: ObjectId) -> bool {
        match self.slot(path) {
            Some(slot) => {
                log::trace!("bind {} -> {:?}", path, id);
                self.store(&slot, id);
                true
            }
            None => {
                log::debug!("cannot bind {}: parent is not modeled", path);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_cycle() {
        let env = Environment::new();
        let root = env.root();
        assert_eq!(env.get("window"), Some(root));
        assert_eq!(env.get("window.window.window"), Some(root));
        assert_eq!(env.get("this"), Some(root));
        assert_eq!(env.get("this.window"), Some(root));
    }

    #[test]
    fn test_set_and_get_nested() {
        let mut env = Environment::new();
        let object = env.blank();
        let inner = env.blank();
        assert!(env.set("object", object));
        assert!(env.set("object.cases", inner));

        assert_eq!(env.get("object.cases"), Some(inner));
        assert_eq!(env.get("window.object.cases"), Some(inner));
        assert_eq!(env.get("object.missing"), None);
        assert_eq!(env.get("missing.cases"), None);
    }

    #[test]
    fn test_set_with_missing_parent_is_ignored() {
        let mut env = Environment::new();
        let value = env.blank();
        assert!(!env.set("nothing.here", value));
        assert_eq!(env.get("nothing.here"), None);
    }

    #[test]
    fn test_this_stack() {
        let mut env = Environment::new();
        let prototype = env.blank();
        let method = env.blank();

        env.push_this(prototype);
        assert!(env.set("this.log", method));
        assert_eq!(env.get("this.log"), Some(method));
        env.pop_this();

        assert_eq!(env.current_this(), env.root());
        assert_eq!(env.get("this.log"), None);
        assert_eq!(env.members(prototype).len(), 1);

        // the bottom of the stack is never popped
        env.pop_this();
        assert_eq!(env.current_this(), env.root());
    }

    #[test]
    fn test_top_scope_shadows_root() {
        let mut env = Environment::new();
        let global = env.blank();
        let local = env.blank();
        env.set("value", global);

        env.push_scope();
        env.declare_local("value", local);
        assert_eq!(env.get("value"), Some(local));
        assert!(env.set("value", global));
        assert_eq!(env.get("value"), Some(global));
        env.pop_scope();

        assert_eq!(env.get("value"), Some(global));
    }

    #[test]
    fn test_derive_is_a_snapshot() {
        let mut env = Environment::new();
        let prototype = env.blank();
        let log = env.blank();
        let logger = env.blank();
        env.set("Logger", logger);
        env.set("Logger.prototype", prototype);
        env.set("Logger.prototype.log", log);

        let parent = env.get("Logger.prototype");
        let instance = env.derive(parent);
        assert_eq!(env.object(instance).member("log"), Some(log));

        let later = env.blank();
        env.set("Logger.prototype.later", later);
        assert_eq!(env.object(instance).member("later"), None);
    }
}
