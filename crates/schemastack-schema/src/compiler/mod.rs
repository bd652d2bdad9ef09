//! Multi-document schema compiler
//!
//! Compilation drains a LIFO stack of document URIs. Each popped document is
//! fetched once (the entry document is supplied by the caller), walked into
//! schema nodes, and its `$ref`s are settled: local targets must exist in the
//! document (raw locations such as `definitions` members are compiled on
//! demand), remote targets are scheduled on the stack. Remote fragments are
//! checked once their documents are compiled. Finally every document goes
//! into a registry, local alias chains are checked for cycles, and the
//! registry is frozen.
//!
//! All of this state lives in one [`Session`] per `compile` call.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

mod classify;
mod document;
mod keywords;
mod pointer;

pub use classify::{classify, RefToken};

use crate::error::{CompileError, CompileResult};
use crate::options::{CompileOptions, JsonSchemaOptions};
use crate::registry::{fragment_key, CompiledRoot, PointerIndex, Registry, RegistryBuilder};
use crate::resolver::ResolverContext;
use crate::schema::{Schema, SchemaRef};
use document::{PendingRef, Walker, MAX_VALUE_DEPTH};
use schemastack_core::json::exceeds_depth;
use schemastack_core::{DocumentUri, FetchPolicy, FetchResult, RemoteFetcher, RemoteResolutionError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Root member that switches format assertion for the whole compilation
const FORMAT_ASSERTION_KEYWORD: &str = "formatAssertion";

/// Compile `schema` and every document it references into a frozen registry
pub(crate) fn compile_registry(
    schema: &Value,
    options: &JsonSchemaOptions,
    compile_options: &CompileOptions,
) -> CompileResult<Registry> {
    compile_options.fetch_policy().validate()?;
    let assert_formats = schema
        .get(FORMAT_ASSERTION_KEYWORD)
        .and_then(Value::as_bool)
        .unwrap_or(options.assert_formats);
    Session::new(compile_options, assert_formats).run(schema)
}

/// Reject documents too deep to copy or drop on the call stack. Runs before
/// the document is cloned or stored.
fn check_value_depth(uri: &DocumentUri, value: &Value) -> CompileResult<()> {
    if exceeds_depth(value, MAX_VALUE_DEPTH) {
        warn!(uri = %uri, limit = MAX_VALUE_DEPTH, "document nests too deeply");
        return Err(CompileError::invalid_schema(
            "#",
            format!("document {} nests deeper than {} levels", uri, MAX_VALUE_DEPTH),
        ));
    }
    Ok(())
}

struct DocumentState {
    raw: Arc<Value>,
    /// Root `$id` resolved against the document URI, or the URI itself
    base: DocumentUri,
    index: PointerIndex,
    root: Option<SchemaRef>,
    pending: Vec<PendingRef>,
}

/// A remote `$ref` whose fragment is checked after its document compiles
#[derive(Debug, Clone)]
struct RemoteTarget {
    target: DocumentUri,
    fragment: String,
    reference: String,
}

struct Session<'o> {
    fetcher: Arc<dyn RemoteFetcher>,
    policy: &'o FetchPolicy,
    assert_formats: bool,
    entry: DocumentUri,
    documents: HashMap<DocumentUri, DocumentState>,
    /// Load order, so the registry is filled deterministically
    order: Vec<DocumentUri>,
    stack: Vec<DocumentUri>,
    scheduled: HashSet<DocumentUri>,
    active: HashSet<DocumentUri>,
    compiled: HashSet<DocumentUri>,
    /// Document that first referenced each remote document
    parent: HashMap<DocumentUri, DocumentUri>,
    /// Root `$id` of a document to the URI it was loaded from
    aliases: HashMap<DocumentUri, DocumentUri>,
    remote_targets: Vec<RemoteTarget>,
    total_bytes: u64,
}

impl<'o> Session<'o> {
    fn new(options: &'o CompileOptions, assert_formats: bool) -> Self {
        Self {
            fetcher: options.effective_fetcher(),
            policy: options.fetch_policy(),
            assert_formats,
            entry: options.base_uri().clone(),
            documents: HashMap::new(),
            order: Vec::new(),
            stack: Vec::new(),
            scheduled: HashSet::new(),
            active: HashSet::new(),
            compiled: HashSet::new(),
            parent: HashMap::new(),
            aliases: HashMap::new(),
            remote_targets: Vec::new(),
            total_bytes: 0,
        }
    }

    fn run(mut self, schema: &Value) -> CompileResult<Registry> {
        let entry = self.entry.clone();
        debug!(entry = %entry, "compiling schema");
        check_value_depth(&entry, schema)?;
        self.load(entry.clone(), Arc::new(schema.clone()));
        self.scheduled.insert(entry.clone());
        self.stack.push(entry);

        loop {
            while let Some(uri) = self.stack.pop() {
                if self.compiled.contains(&uri) {
                    continue;
                }
                if self.active.contains(&uri) {
                    let mut chain = self.ancestry(&uri);
                    chain.push(uri.clone());
                    return Err(CompileError::remote_cycle(render(&chain)));
                }
                self.active.insert(uri.clone());
                if !self.documents.contains_key(&uri) {
                    let fetched = self.fetch(&uri)?;
                    check_value_depth(&uri, &fetched.document)?;
                    self.load(uri.clone(), fetched.document);
                }
                self.compile_document(&uri)?;
                self.active.remove(&uri);
                self.compiled.insert(uri);
            }
            if !self.settle_remote_targets()? {
                break;
            }
        }

        self.freeze()
    }

    /// Apply the fetch policy around one fetcher call
    fn fetch(&mut self, uri: &DocumentUri) -> CompileResult<FetchResult> {
        if !self.policy.allows_scheme(uri.scheme()) {
            warn!(uri = %uri, scheme = uri.scheme(), "fetch denied by scheme policy");
            return Err(RemoteResolutionError::policy_denied(uri.as_str(), "Scheme not allowed by policy").into());
        }
        if self.documents.len() >= self.policy.max_documents {
            warn!(uri = %uri, limit = self.policy.max_documents, "fetch denied by document limit");
            return Err(RemoteResolutionError::policy_denied(
                uri.as_str(),
                format!("Document limit of {} reached", self.policy.max_documents),
            )
            .into());
        }

        trace!(uri = %uri, "fetching document");
        let result = self.fetcher.fetch(uri, self.policy)?;
        if result.byte_size > self.policy.max_document_bytes {
            return Err(RemoteResolutionError::payload_too_large(uri.as_str(), self.policy.max_document_bytes).into());
        }
        self.total_bytes = self.total_bytes.saturating_add(result.byte_size);
        if self.total_bytes > self.policy.max_total_bytes {
            warn!(uri = %uri, total = self.total_bytes, "fetch denied by total byte limit");
            return Err(RemoteResolutionError::policy_denied(
                uri.as_str(),
                format!("Total fetched bytes exceed {}", self.policy.max_total_bytes),
            )
            .into());
        }
        if let Some(elapsed) = result.elapsed.filter(|elapsed| *elapsed > self.policy.timeout) {
            return Err(RemoteResolutionError::timeout(
                uri.as_str(),
                format!("Fetch took {:?}, limit is {:?}", elapsed, self.policy.timeout),
            )
            .into());
        }
        debug!(uri = %uri, bytes = result.byte_size, "document fetched");
        Ok(result)
    }

    fn load(&mut self, uri: DocumentUri, raw: Arc<Value>) {
        let base = match raw.get("$id").and_then(Value::as_str) {
            Some(id) => match uri.join(id) {
                Ok((base, _)) => base,
                Err(err) => {
                    warn!(uri = %uri, id, error = %err, "ignoring $id that does not resolve");
                    uri.clone()
                }
            },
            None => uri.clone(),
        };
        if base != uri {
            trace!(uri = %uri, id = %base, "document declares its own $id");
            self.aliases.entry(base.clone()).or_insert_with(|| uri.clone());
        }
        self.order.push(uri.clone());
        self.documents.insert(
            uri,
            DocumentState {
                raw,
                base,
                index: PointerIndex::new(),
                root: None,
                pending: Vec::new(),
            },
        );
    }

    fn compile_document(&mut self, uri: &DocumentUri) -> CompileResult<()> {
        let state = self.state_mut(uri)?;
        let raw = state.raw.clone();
        let root = self.walk(uri, &raw, "")?;
        self.state_mut(uri)?.root = Some(root);
        self.settle_document(uri)?;
        debug!(uri = %uri, nodes = self.state_mut(uri)?.index.len(), "document compiled");
        Ok(())
    }

    /// Compile the subschema of document `uri` at `pointer`
    fn walk(&mut self, uri: &DocumentUri, value: &Value, pointer: &str) -> CompileResult<SchemaRef> {
        let state = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| CompileError::unresolved(pointer, uri.as_str(), "document was never loaded"))?;
        let DocumentState {
            base,
            index,
            pending,
            ..
        } = state;
        Walker::new(uri, base, &self.aliases, self.assert_formats, index, pending).compile(value, pointer)
    }

    fn state_mut(&mut self, uri: &DocumentUri) -> CompileResult<&mut DocumentState> {
        self.documents
            .get_mut(uri)
            .ok_or_else(|| CompileError::unresolved("#", uri.as_str(), "document was never loaded"))
    }

    /// Resolve every `$ref` recorded in `uri` until none are left
    fn settle_document(&mut self, uri: &DocumentUri) -> CompileResult<()> {
        loop {
            let pending = std::mem::take(&mut self.state_mut(uri)?.pending);
            if pending.is_empty() {
                return Ok(());
            }
            for PendingRef { reference, token } in pending {
                match token {
                    RefToken::Local { fragment } => self.resolve_local(uri, &fragment, &reference)?,
                    RefToken::Remote {
                        target, fragment, ..
                    } => self.schedule_remote(uri, target, fragment.unwrap_or_default(), reference)?,
                }
            }
        }
    }

    fn resolve_local(&mut self, uri: &DocumentUri, fragment: &str, reference: &str) -> CompileResult<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        let max_depth = self.policy.max_depth;
        let state = self.state_mut(uri)?;
        if state.index.contains_key(&fragment_key(fragment)) {
            return Ok(());
        }
        let raw = state.raw.clone();
        let pointer_text = if fragment.starts_with('/') {
            fragment.to_string()
        } else {
            pointer::find_anchor(&raw, fragment).ok_or_else(|| {
                CompileError::unresolved(reference, uri.as_str(), format!("No anchor named '{}'", fragment))
            })?
        };
        let target = pointer::navigate(&raw, &pointer_text, max_depth, reference, uri.as_str())?;
        trace!(uri = %uri, pointer = %pointer_text, "compiling referenced location on demand");
        self.walk(uri, target, &pointer_text)?;
        Ok(())
    }

    fn schedule_remote(
        &mut self,
        from: &DocumentUri,
        target: DocumentUri,
        fragment: String,
        reference: String,
    ) -> CompileResult<()> {
        let ancestry = self.ancestry(from);
        if ancestry.contains(&target) {
            let mut chain = ancestry;
            chain.push(target);
            return Err(CompileError::remote_cycle(render(&chain)));
        }
        if target != self.entry && !self.parent.contains_key(&target) {
            self.parent.insert(target.clone(), from.clone());
        }
        if self.scheduled.insert(target.clone()) {
            trace!(from = %from, target = %target, "document scheduled");
            self.stack.push(target.clone());
        }
        if !fragment.is_empty() {
            self.remote_targets.push(RemoteTarget {
                target,
                fragment,
                reference,
            });
        }
        Ok(())
    }

    /// Documents from the entry down to `uri` along first-discoverer links
    fn ancestry(&self, uri: &DocumentUri) -> Vec<DocumentUri> {
        let mut chain = vec![uri.clone()];
        let mut seen: HashSet<&DocumentUri> = HashSet::from([uri]);
        let mut current = uri;
        while let Some(parent) = self.parent.get(current) {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Check remote fragments whose documents are compiled. Returns true
    /// when this scheduled more work.
    fn settle_remote_targets(&mut self) -> CompileResult<bool> {
        let targets = std::mem::take(&mut self.remote_targets);
        let mut waiting = Vec::new();
        for remote in targets {
            if !self.compiled.contains(&remote.target) {
                waiting.push(remote);
                continue;
            }
            self.resolve_remote(&remote)?;
            self.settle_document(&remote.target)?;
        }
        self.remote_targets.extend(waiting);
        Ok(!self.stack.is_empty() || !self.remote_targets.is_empty())
    }

    fn resolve_remote(&mut self, remote: &RemoteTarget) -> CompileResult<()> {
        let missing = || {
            CompileError::from(RemoteResolutionError::pointer_missing(
                format!("{}#{}", remote.target, remote.fragment),
                &remote.fragment,
            ))
        };
        let max_depth = self.policy.max_depth;
        let state = self.state_mut(&remote.target)?;
        if state.index.contains_key(&fragment_key(&remote.fragment)) {
            return Ok(());
        }
        let raw = state.raw.clone();
        let pointer_text = if remote.fragment.starts_with('/') {
            remote.fragment.clone()
        } else {
            pointer::find_anchor(&raw, &remote.fragment).ok_or_else(missing)?
        };
        let target = pointer::navigate(
            &raw,
            &pointer_text,
            max_depth,
            &remote.reference,
            remote.target.as_str(),
        )
        .map_err(|err| match err {
            CompileError::UnresolvedRef { .. } => missing(),
            other => other,
        })?;
        trace!(uri = %remote.target, pointer = %pointer_text, "compiling remote target on demand");
        self.walk(&remote.target, target, &pointer_text)?;
        Ok(())
    }

    fn freeze(mut self) -> CompileResult<Registry> {
        let mut builder = RegistryBuilder::new();
        for uri in std::mem::take(&mut self.order) {
            let Some(state) = self.documents.remove(&uri) else {
                continue;
            };
            let root = state
                .root
                .ok_or_else(|| CompileError::unresolved("#", uri.as_str(), "document was never compiled"))?;
            builder.insert(CompiledRoot::new(uri, root, state.index))?;
        }
        check_alias_cycles(&builder)?;
        let registry = builder.freeze();
        debug!(documents = registry.len(), fetched_bytes = self.total_bytes, "registry frozen");
        Ok(registry)
    }
}

fn render(chain: &[DocumentUri]) -> Vec<String> {
    chain.iter().map(DocumentUri::to_string).collect()
}

/// Fail when a chain of pure local `$ref`s comes back to one of its members.
///
/// Recursion through structural keywords is legal and is not followed here:
/// only nodes that are nothing but a `$ref` continue a chain.
fn check_alias_cycles(builder: &RegistryBuilder) -> CompileResult<()> {
    let resolver = ResolverContext::new(builder.roots());
    let mut cleared: HashSet<*const Schema> = HashSet::new();

    let mut documents: Vec<&CompiledRoot> = builder.roots().values().collect();
    documents.sort_by(|a, b| a.doc_uri().cmp(b.doc_uri()));
    for root in documents {
        let mut keys: Vec<&String> = root.pointer_index().keys().collect();
        keys.sort();
        for key in keys {
            let Some(start) = root.pointer_index().get(key) else {
                continue;
            };
            if cleared.contains(&Arc::as_ptr(start)) {
                continue;
            }

            let mut chain = vec![key.clone()];
            let mut visited = vec![Arc::as_ptr(start)];
            let mut current = start;
            loop {
                let (next_key, target) = match &**current {
                    Schema::RootRef(root_ref) => ("#".to_string(), resolver.root(&root_ref.doc)),
                    Schema::Ref(reference) if reference.token.is_local() => (
                        fragment_key(reference.token.fragment()),
                        resolver.resolve(&reference.doc, &reference.token),
                    ),
                    _ => break,
                };
                let Ok(target) = target else {
                    break;
                };
                chain.push(next_key);
                let id = Arc::as_ptr(target);
                if visited.contains(&id) {
                    return Err(CompileError::local_cycle(chain));
                }
                if cleared.contains(&id) {
                    break;
                }
                visited.push(id);
                current = target;
            }
            cleared.extend(visited);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CycleKind;
    use schemastack_core::{InMemoryFetcher, RemoteReason};
    use serde_json::json;

    fn compile(schema: Value) -> CompileResult<Registry> {
        compile_registry(&schema, &JsonSchemaOptions::default(), &CompileOptions::default())
    }

    fn with_documents(documents: &[(&str, Value)]) -> CompileOptions {
        let mut fetcher = InMemoryFetcher::new();
        for (uri, document) in documents {
            fetcher.insert(DocumentUri::parse(uri).unwrap(), document.clone());
        }
        CompileOptions::new()
            .with_base_uri(DocumentUri::parse("http://example.com/root.json").unwrap())
            .with_fetcher(fetcher)
    }

    #[test]
    fn test_single_document_registry() {
        let registry = compile(json!({"$defs": {"a": {"$ref": "#/$defs/b"}, "b": {"type": "string"}}})).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_definitions_compile_on_demand() {
        let registry = compile(json!({
            "$ref": "#/definitions/name",
            "definitions": {"name": {"type": "string"}, "unused": {"type": 7}}
        }))
        .unwrap();
        let root = registry.get(&DocumentUri::entry()).unwrap();
        assert!(root.get("/definitions/name").is_some());
        assert!(root.get("/definitions/unused").is_none());
    }

    #[test]
    fn test_local_alias_cycle_names_chain() {
        let err = compile(json!({"$defs": {"a": {"$ref": "#/$defs/b"}, "b": {"$ref": "#/$defs/a"}}})).unwrap_err();
        match err {
            CompileError::Cycle { kind, chain } => {
                assert_eq!(kind, CycleKind::Local);
                assert_eq!(chain, vec!["#/$defs/a", "#/$defs/b", "#/$defs/a"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = compile(json!({"$ref": "#"})).unwrap_err();
        assert_eq!(err.cycle_chain().unwrap(), ["#", "#"]);
    }

    #[test]
    fn test_structural_recursion_is_legal() {
        let registry = compile(json!({
            "type": "object",
            "properties": {"child": {"$ref": "#"}}
        }))
        .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unresolved_local_reference() {
        let err = compile(json!({"$ref": "#/$defs/missing"})).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedRef { .. }));
        let err = compile(json!({"$ref": "#nowhere"})).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedRef { .. }));
    }

    #[test]
    fn test_remote_documents_compile_once() {
        let options = with_documents(&[(
            "http://example.com/common.json",
            json!({"$defs": {"id": {"type": "integer"}, "name": {"type": "string"}}}),
        )]);
        let schema = json!({
            "properties": {
                "id": {"$ref": "common.json#/$defs/id"},
                "name": {"$ref": "common.json#/$defs/name"}
            }
        });
        let registry = compile_registry(&schema, &JsonSchemaOptions::default(), &options).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remote_cycle_names_documents() {
        let options = with_documents(&[
            ("http://example.com/a.json", json!({"$ref": "b.json"})),
            ("http://example.com/b.json", json!({"$ref": "a.json"})),
        ]);
        let err = compile_registry(&json!({"$ref": "a.json"}), &JsonSchemaOptions::default(), &options).unwrap_err();
        match err {
            CompileError::Cycle { kind, chain } => {
                assert_eq!(kind, CycleKind::Remote);
                assert_eq!(
                    chain,
                    vec![
                        "http://example.com/root.json",
                        "http://example.com/a.json",
                        "http://example.com/b.json",
                        "http://example.com/a.json",
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_remote_fragment_missing() {
        let options = with_documents(&[("http://example.com/common.json", json!({"$defs": {}}))]);
        let err = compile_registry(
            &json!({"$ref": "common.json#/$defs/absent"}),
            &JsonSchemaOptions::default(),
            &options,
        )
        .unwrap_err();
        assert_eq!(err.remote_reason(), Some(RemoteReason::PointerMissing));
    }

    #[test]
    fn test_default_fetcher_refuses_remote() {
        let options = CompileOptions::new()
            .with_base_uri(DocumentUri::parse("http://example.com/root.json").unwrap());
        let err = compile_registry(&json!({"$ref": "other.json"}), &JsonSchemaOptions::default(), &options)
            .unwrap_err();
        assert_eq!(err.remote_reason(), Some(RemoteReason::PolicyDenied));
    }

    #[test]
    fn test_root_id_sets_base() {
        let options = with_documents(&[("http://other.example/defs.json", json!({"type": "string"}))]);
        let schema = json!({"$id": "http://other.example/root.json", "$ref": "defs.json"});
        let registry = compile_registry(&schema, &JsonSchemaOptions::default(), &options).unwrap();
        assert!(registry.contains(&DocumentUri::parse("http://other.example/defs.json").unwrap()));
    }
}
