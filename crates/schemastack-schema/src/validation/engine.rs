//! Explicit-stack validation engine
//!
//! Validation is a loop over a `Vec` of tasks, never a recursive walk. An
//! `Eval` task evaluates one schema node against one instance location; the
//! node pushes further tasks for its children instead of calling into them.
//!
//! Forms that need a sub-result as a boolean (`anyOf`, `oneOf`, `not`,
//! `if`, `contains`, `propertyNames`) run their branches in an *isolated
//! scope*: a fresh error list that the outer result cannot see. They push a
//! `Join` task first and the branch evaluations after it, so under LIFO
//! order the join runs only once every task of its branches has finished.
//! The join then inspects the scope's errors and reports into the parent.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::error::{ErrorKind, ValidationError};
use super::path::{PathArena, PathId};
use crate::registry::Registry;
use crate::resolver::ResolverContext;
use crate::schema::{ConditionalSchema, Schema, SchemaRef};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashSet;

/// Index of an isolation scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScopeId(usize);

/// The value being validated at one location.
///
/// Property names checked by `propertyNames` are not JSON values in the
/// document, so they travel as `Key`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Instance<'a> {
    Value(&'a Value),
    Key(&'a str),
}

impl<'a> Instance<'a> {
    fn identity(&self) -> (usize, bool) {
        match self {
            Instance::Value(v) => (*v as *const Value as usize, false),
            Instance::Key(k) => (k.as_ptr() as usize, true),
        }
    }

    pub(crate) fn as_str(&self) -> Option<&'a str> {
        match self {
            Instance::Value(Value::String(s)) => Some(s.as_str()),
            Instance::Key(k) => Some(k),
            Instance::Value(_) => None,
        }
    }

    pub(crate) fn as_object(&self) -> Option<&'a Map<String, Value>> {
        match self {
            Instance::Value(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub(crate) fn as_array(&self) -> Option<&'a Vec<Value>> {
        match self {
            Instance::Value(Value::Array(items)) => Some(items),
            _ => None,
        }
    }

    pub(crate) fn as_number(&self) -> Option<&'a serde_json::Number> {
        match self {
            Instance::Value(Value::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub(crate) fn is_boolean(&self) -> bool {
        matches!(self, Instance::Value(Value::Bool(_)))
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(self, Instance::Value(Value::Null))
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Instance::Value(v) => schemastack_core::json::type_name(v),
            Instance::Key(_) => "string",
        }
    }

    /// The instance as a JSON value, allocating only for keys
    pub(crate) fn to_value(&self) -> Cow<'a, Value> {
        match self {
            Instance::Value(v) => Cow::Borrowed(v),
            Instance::Key(k) => Cow::Owned(Value::String((*k).to_string())),
        }
    }
}

/// One unit of deferred work
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame<'a> {
    pub(crate) path: PathId,
    pub(crate) schema: &'a Schema,
    pub(crate) instance: Instance<'a>,
    pub(crate) scope: ScopeId,
}

/// Completion step of an isolated evaluation
#[derive(Debug)]
pub(crate) enum Join<'a> {
    /// Branches run one at a time until one passes
    AnyOf {
        frame: Frame<'a>,
        branches: &'a [SchemaRef],
        current: usize,
        scope: ScopeId,
        collected: Vec<ValidationError>,
    },
    /// All branches run; exactly one may pass
    OneOf { frame: Frame<'a>, scopes: Vec<ScopeId> },
    /// The single branch must fail
    Not { frame: Frame<'a>, scope: ScopeId },
    /// `if` decides which branch is deferred
    Conditional {
        frame: Frame<'a>,
        schema: &'a ConditionalSchema,
        scope: ScopeId,
    },
    /// Count passing elements against contains bounds
    Contains {
        frame: Frame<'a>,
        min: u64,
        max: Option<u64>,
        scopes: Vec<ScopeId>,
    },
    /// Each key was checked in its own scope
    PropertyNames {
        frame: Frame<'a>,
        keys: Vec<(&'a str, ScopeId)>,
    },
}

#[derive(Debug)]
enum Task<'a> {
    Eval(Frame<'a>),
    Join(Join<'a>),
}

type VisitKey = (usize, usize, bool, PathId);

#[derive(Debug, Default)]
struct Scope {
    parent: Option<usize>,
    errors: Vec<ValidationError>,
    visited: HashSet<VisitKey>,
}

/// State of one validation call
pub(crate) struct Traversal<'a> {
    resolver: ResolverContext<'a>,
    tasks: Vec<Task<'a>>,
    scopes: Vec<Scope>,
    paths: PathArena<'a>,
    evaluated: usize,
}

impl<'a> Traversal<'a> {
    pub(crate) fn new(registry: &'a Registry) -> Self {
        Self {
            resolver: ResolverContext::new(registry.roots()),
            tasks: Vec::new(),
            scopes: vec![Scope::default()],
            paths: PathArena::new(),
            evaluated: 0,
        }
    }

    /// Validate `instance` against `root`, draining the task stack
    pub(crate) fn run(mut self, root: &'a Schema, instance: &'a Value) -> Vec<ValidationError> {
        let frame = Frame {
            path: self.paths.root(),
            schema: root,
            instance: Instance::Value(instance),
            scope: ScopeId(0),
        };
        self.tasks.push(Task::Eval(frame));

        while let Some(task) = self.tasks.pop() {
            match task {
                Task::Eval(frame) => {
                    if self.enter(&frame) {
                        self.evaluated += 1;
                        frame.schema.evaluate(&frame, &mut self);
                    }
                }
                Task::Join(join) => self.complete(join),
            }
        }

        tracing::trace!(frames = self.evaluated, scopes = self.scopes.len(), "validation drained");
        std::mem::take(&mut self.scopes[0].errors)
    }

    /// Mark a frame visited; false when it (or an enclosing scope) already
    /// evaluated the same schema at the same instance and path.
    fn enter(&mut self, frame: &Frame<'a>) -> bool {
        let (instance, is_key) = frame.instance.identity();
        let key = (frame.schema as *const Schema as usize, instance, is_key, frame.path);
        let mut scope = Some(frame.scope.0);
        while let Some(id) = scope {
            if self.scopes[id].visited.contains(&key) {
                return false;
            }
            scope = self.scopes[id].parent;
        }
        self.scopes[frame.scope.0].visited.insert(key);
        true
    }

    pub(crate) fn resolver(&self) -> &ResolverContext<'a> {
        &self.resolver
    }

    /// Record an error at the frame's own location
    pub(crate) fn report(&mut self, frame: &Frame<'a>, kind: ErrorKind, message: impl Into<String>) {
        self.report_at(frame.scope, frame.path, kind, message);
    }

    /// Record a type mismatch at the frame's location
    pub(crate) fn report_type(&mut self, frame: &Frame<'a>, expected: &str) {
        let message = format!("expected {}, found {}", expected, frame.instance.type_name());
        self.report(frame, ErrorKind::Type, message);
    }

    /// Record an error at an explicit location
    pub(crate) fn report_at(
        &mut self,
        scope: ScopeId,
        path: PathId,
        kind: ErrorKind,
        message: impl Into<String>,
    ) {
        let error = ValidationError::new(self.paths.render(path), kind, message);
        self.scopes[scope.0].errors.push(error);
    }

    /// Path of a property below `parent`
    pub(crate) fn property_path(&mut self, parent: PathId, name: &'a str) -> PathId {
        self.paths.property(parent, name)
    }

    /// Path of an array element below `parent`
    pub(crate) fn index_path(&mut self, parent: PathId, index: usize) -> PathId {
        self.paths.index(parent, index)
    }

    /// Defer `schema` against the frame's own instance and location
    pub(crate) fn defer(&mut self, frame: &Frame<'a>, schema: &'a Schema) {
        self.defer_at(frame.scope, frame.path, schema, frame.instance);
    }

    /// Defer `schema` against another instance location
    pub(crate) fn defer_at(
        &mut self,
        scope: ScopeId,
        path: PathId,
        schema: &'a Schema,
        instance: Instance<'a>,
    ) {
        self.tasks.push(Task::Eval(Frame {
            path,
            schema,
            instance,
            scope,
        }));
    }

    /// Open an isolated scope below `parent`
    pub(crate) fn isolate(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent.0),
            ..Scope::default()
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Push a join; its branch evaluations must be deferred after this call
    pub(crate) fn join(&mut self, join: Join<'a>) {
        self.tasks.push(Task::Join(join));
    }

    /// Take a finished scope's errors and release its visited set
    fn close(&mut self, scope: ScopeId) -> Vec<ValidationError> {
        let closed = &mut self.scopes[scope.0];
        closed.visited = HashSet::new();
        std::mem::take(&mut closed.errors)
    }

    fn extend(&mut self, scope: ScopeId, errors: Vec<ValidationError>) {
        self.scopes[scope.0].errors.extend(errors);
    }

    fn complete(&mut self, join: Join<'a>) {
        match join {
            Join::AnyOf {
                frame,
                branches,
                current,
                scope,
                mut collected,
            } => {
                let errors = self.close(scope);
                if errors.is_empty() {
                    return;
                }
                collected.extend(errors);
                let next = current + 1;
                match branches.get(next) {
                    Some(branch) => {
                        let scope = self.isolate(frame.scope);
                        self.join(Join::AnyOf {
                            frame,
                            branches,
                            current: next,
                            scope,
                            collected,
                        });
                        self.defer_at(scope, frame.path, branch, frame.instance);
                    }
                    None => self.extend(frame.scope, collected),
                }
            }
            Join::OneOf { frame, scopes } => {
                let results: Vec<Vec<ValidationError>> =
                    scopes.into_iter().map(|scope| self.close(scope)).collect();
                let matched = results.iter().filter(|errors| errors.is_empty()).count();
                match matched {
                    1 => {}
                    0 => {
                        if let Some(best) = best_error_set(results) {
                            self.extend(frame.scope, best);
                        }
                    }
                    n => self.report(
                        &frame,
                        ErrorKind::Ambiguous,
                        format!("oneOf: multiple schemas matched ({})", n),
                    ),
                }
            }
            Join::Not { frame, scope } => {
                if self.close(scope).is_empty() {
                    self.report(&frame, ErrorKind::Mismatch, "schema should not match");
                }
            }
            Join::Conditional {
                frame,
                schema,
                scope,
            } => {
                let branch = if self.close(scope).is_empty() {
                    schema.then_schema.as_deref()
                } else {
                    schema.else_schema.as_deref()
                };
                if let Some(branch) = branch {
                    self.defer(&frame, branch);
                }
            }
            Join::Contains {
                frame,
                min,
                max,
                scopes,
            } => {
                let mut matched = 0u64;
                for scope in scopes {
                    if self.close(scope).is_empty() {
                        matched += 1;
                    }
                }
                if matched < min {
                    self.report(
                        &frame,
                        ErrorKind::Count,
                        format!("array must contain at least {} matching element(s)", min),
                    );
                } else if let Some(max) = max.filter(|max| matched > *max) {
                    self.report(
                        &frame,
                        ErrorKind::Count,
                        format!("array must contain at most {} matching element(s)", max),
                    );
                }
            }
            Join::PropertyNames { frame, keys } => {
                for (key, scope) in keys {
                    if !self.close(scope).is_empty() {
                        let path = self.property_path(frame.path, key);
                        self.report_at(
                            frame.scope,
                            path,
                            ErrorKind::Property,
                            "property name violates propertyNames",
                        );
                    }
                }
            }
        }
    }
}

/// Pick the error set to report when no `oneOf` branch passed.
///
/// Prefers the smallest set. On equal size a later set replaces the current
/// one unless the later set holds a type mismatch and the current one does
/// not. This is a heuristic for "the branch the author probably meant".
fn best_error_set(results: Vec<Vec<ValidationError>>) -> Option<Vec<ValidationError>> {
    let has_type_mismatch = |errors: &[ValidationError]| errors.iter().any(|e| e.is_type_mismatch());
    let mut best: Option<Vec<ValidationError>> = None;
    for errors in results {
        let replace = match &best {
            None => true,
            Some(current) if errors.len() < current.len() => true,
            Some(current) if errors.len() == current.len() => {
                !has_type_mismatch(&errors) || has_type_mismatch(current)
            }
            Some(_) => false,
        };
        if replace {
            best = Some(errors);
        }
    }
    best
}
