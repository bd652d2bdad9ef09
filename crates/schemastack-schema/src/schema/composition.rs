//! `allOf`, `anyOf`, `oneOf`, `not` and `if`/`then`/`else`
//!
//! Only `allOf` evaluates its branches in the caller's scope. The others need
//! each branch's outcome as a boolean, so they isolate branches and settle
//! the result in a join task (see `validation::engine`).
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::SchemaRef;
use crate::validation::{Frame, Join, Traversal};

/// `if`/`then`/`else`; a missing branch accepts
#[derive(Debug)]
pub struct ConditionalSchema {
    pub(crate) if_schema: SchemaRef,
    pub(crate) then_schema: Option<SchemaRef>,
    pub(crate) else_schema: Option<SchemaRef>,
}

impl ConditionalSchema {
    pub(crate) fn evaluate<'a>(&'a self, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
        if self.then_schema.is_none() && self.else_schema.is_none() {
            return;
        }
        let scope = cx.isolate(frame.scope);
        cx.join(Join::Conditional {
            frame: *frame,
            schema: self,
            scope,
        });
        cx.defer_at(scope, frame.path, &self.if_schema, frame.instance);
    }
}

pub(crate) fn all_of<'a>(branches: &'a [SchemaRef], frame: &Frame<'a>, cx: &mut Traversal<'a>) {
    for branch in branches.iter().rev() {
        cx.defer(frame, branch);
    }
}

/// Branches run one at a time; the join schedules the next branch only
/// when the current one failed.
pub(crate) fn any_of<'a>(branches: &'a [SchemaRef], frame: &Frame<'a>, cx: &mut Traversal<'a>) {
    let Some(first) = branches.first() else {
        return;
    };
    let scope = cx.isolate(frame.scope);
    cx.join(Join::AnyOf {
        frame: *frame,
        branches,
        current: 0,
        scope,
        collected: Vec::new(),
    });
    cx.defer_at(scope, frame.path, first, frame.instance);
}

pub(crate) fn one_of<'a>(branches: &'a [SchemaRef], frame: &Frame<'a>, cx: &mut Traversal<'a>) {
    let scopes: Vec<_> = branches.iter().map(|_| cx.isolate(frame.scope)).collect();
    cx.join(Join::OneOf {
        frame: *frame,
        scopes: scopes.clone(),
    });
    for (branch, scope) in branches.iter().zip(scopes).rev() {
        cx.defer_at(scope, frame.path, branch, frame.instance);
    }
}

pub(crate) fn not<'a>(inner: &'a SchemaRef, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
    let scope = cx.isolate(frame.scope);
    cx.join(Join::Not {
        frame: *frame,
        scope,
    });
    cx.defer_at(scope, frame.path, inner, frame.instance);
}
