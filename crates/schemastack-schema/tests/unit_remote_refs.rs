//! Remote `$ref` resolution across documents
//!
//! Covers the fetch-once guarantee, the fetch policy guardrails, cycles that
//! span documents, and the filesystem fetcher's jail.


use pretty_assertions::assert_eq;
use schemastack_core::{
    DocumentUri, FetchCache, FetchPolicy, FetchResult, FileFetcher, InMemoryFetcher, RemoteFetcher,
    RemoteReason, RemoteResult,
};
use schemastack_schema::{compile, CompileError, CompileOptions, CycleKind, JsonSchemaOptions};
use serde_json::{json, Value};
use std::time::Duration;
use test_support::{compile_remote, documents, init_tracing, nested_nots, uri, CountingFetcher};

fn common() -> Value {
    json!({
        "$defs": {
            "id": {"type": "integer", "minimum": 1},
            "name": {"type": "string", "minLength": 1},
            "positive": {"$anchor": "positive", "exclusiveMinimum": 0}
        }
    })
}

fn compile_with_policy(value: Value, fetcher: InMemoryFetcher, policy: FetchPolicy) -> CompileError {
    init_tracing();
    let options = CompileOptions::new()
        .with_base_uri(uri("http://example.com/root.json"))
        .with_fetcher(fetcher)
        .with_fetch_policy(policy);
    match compile(&value, &JsonSchemaOptions::default(), &options) {
        Ok(_) => panic!("compilation should have failed"),
        Err(err) => err,
    }
}

#[cfg(test)]
mod deduplication {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_fetched_once_for_many_refs() {
        let fetcher = CountingFetcher::new(documents(&[("http://example.com/common.json", common())]));
        let schema = compile_remote(
            json!({
                "type": "object",
                "properties": {
                    "id": {"$ref": "common.json#/$defs/id"},
                    "name": {"$ref": "common.json#/$defs/name"},
                    "score": {"$ref": "common.json#positive"},
                    "all": {"$ref": "http://example.com/common.json"}
                }
            }),
            fetcher.clone(),
        )
        .unwrap();

        assert_eq!(fetcher.calls_for("http://example.com/common.json"), 1);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(schema.registry().len(), 2);
    }

    #[test]
    fn test_transitive_documents_fetched_once() {
        let fetcher = CountingFetcher::new(documents(&[
            ("http://example.com/a.json", json!({"$ref": "shared.json#/$defs/x"})),
            ("http://example.com/b.json", json!({"$ref": "shared.json#/$defs/x"})),
            ("http://example.com/shared.json", json!({"$defs": {"x": {"type": "string"}}})),
        ]));
        let schema = compile_remote(
            json!({"anyOf": [{"$ref": "a.json"}, {"$ref": "b.json"}]}),
            fetcher.clone(),
        )
        .unwrap();

        assert_eq!(fetcher.calls_for("http://example.com/shared.json"), 1);
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(schema.registry().len(), 4);
        assert!(schema.is_valid(&json!("text")));
        assert!(!schema.is_valid(&json!(3)));
    }

    #[test]
    fn test_shared_cache_spans_compilations() {
        init_tracing();
        let fetcher = CountingFetcher::new(documents(&[("http://example.com/common.json", common())]));
        let cache = FetchCache::new();
        let options = CompileOptions::new()
            .with_base_uri(uri("http://example.com/root.json"))
            .with_fetcher(fetcher.clone())
            .with_cache(cache.clone());
        let value = json!({"$ref": "common.json#/$defs/id"});

        for _ in 0..3 {
            compile(&value, &JsonSchemaOptions::default(), &options).unwrap();
        }
        assert_eq!(fetcher.calls(), 1);
        assert!(cache.contains(&uri("http://example.com/common.json")));
    }
}

#[cfg(test)]
mod resolution {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_remote_definitions_validate() {
        let schema = compile_remote(
            json!({
                "type": "object",
                "properties": {
                    "id": {"$ref": "common.json#/$defs/id"},
                    "name": {"$ref": "common.json#/$defs/name"}
                },
                "required": ["id"]
            }),
            documents(&[("http://example.com/common.json", common())]),
        )
        .unwrap();

        assert!(schema.is_valid(&json!({"id": 3, "name": "x"})));
        let result = schema.validate(&json!({"id": "3", "name": ""}));
        let found: Vec<(&str, &str)> = result
            .errors
            .iter()
            .map(|e| (e.path.as_str(), e.message.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("id", "expected integer, found string"),
                ("name", "string too short: expected at least 1 characters"),
            ]
        );
    }

    #[test]
    fn test_remote_anchor() {
        let schema = compile_remote(
            json!({"$ref": "common.json#positive"}),
            documents(&[("http://example.com/common.json", common())]),
        )
        .unwrap();
        assert!(schema.is_valid(&json!(1)));
        assert_eq!(
            schema.validate(&json!(0)).errors[0].message,
            "must be greater than 0"
        );
    }

    #[test]
    fn test_relative_refs_resolve_against_their_document() {
        let schema = compile_remote(
            json!({"$ref": "nested/a.json"}),
            documents(&[
                ("http://example.com/nested/a.json", json!({"$ref": "../c.json#/$defs/x"})),
                ("http://example.com/c.json", json!({"$defs": {"x": {"const": 42}}})),
            ]),
        )
        .unwrap();
        assert!(schema.registry().contains(&uri("http://example.com/c.json")));
        assert!(schema.is_valid(&json!(42)));
        assert!(!schema.is_valid(&json!(41)));
    }

    #[test]
    fn test_absolute_self_reference_stays_local() {
        let schema = compile_remote(
            json!({"$ref": "list.json"}),
            documents(&[(
                "http://example.com/list.json",
                json!({
                    "type": "array",
                    "items": {"$ref": "http://example.com/list.json#/$defs/item"},
                    "$defs": {"item": {"type": ["integer", "array"], "items": {"$ref": "#"}}}
                }),
            )]),
        )
        .unwrap();
        assert_eq!(schema.registry().len(), 2);
        assert!(schema.is_valid(&json!([1, [2, [3]]])));
        assert!(!schema.is_valid(&json!([1, ["x"]])));
    }

    #[test]
    fn test_missing_remote_fragment() {
        let err = compile_remote(
            json!({"$ref": "common.json#/$defs/absent"}),
            documents(&[("http://example.com/common.json", common())]),
        )
        .unwrap_err();
        assert_eq!(err.remote_reason(), Some(RemoteReason::PointerMissing));

        let err = compile_remote(
            json!({"$ref": "common.json#nowhere"}),
            documents(&[("http://example.com/common.json", common())]),
        )
        .unwrap_err();
        assert_eq!(err.remote_reason(), Some(RemoteReason::PointerMissing));
    }

    #[test]
    fn test_missing_document() {
        let err = compile_remote(json!({"$ref": "missing.json"}), InMemoryFetcher::new()).unwrap_err();
        assert_eq!(err.remote_reason(), Some(RemoteReason::NotFound));
    }
}

#[cfg(test)]
mod cycles {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_documents_referencing_each_other() {
        let err = compile_remote(
            json!({"$ref": "a.json"}),
            documents(&[
                ("http://example.com/a.json", json!({"properties": {"b": {"$ref": "b.json"}}})),
                ("http://example.com/b.json", json!({"properties": {"a": {"$ref": "a.json#/properties"}}})),
            ]),
        )
        .unwrap_err();

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
            other => panic!("expected a remote cycle, got {other}"),
        }
    }

    #[test]
    fn test_reference_back_to_entry() {
        let err = compile_remote(
            json!({"$ref": "a.json", "$defs": {"x": {"type": "string"}}}),
            documents(&[("http://example.com/a.json", json!({"$ref": "root.json#/$defs/x"}))]),
        )
        .unwrap_err();
        assert!(err.is_cycle());
        assert_eq!(
            err.cycle_chain().unwrap(),
            [
                "http://example.com/root.json",
                "http://example.com/a.json",
                "http://example.com/root.json",
            ]
        );
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let schema = compile_remote(
            json!({"allOf": [{"$ref": "left.json"}, {"$ref": "right.json"}]}),
            documents(&[
                ("http://example.com/left.json", json!({"$ref": "base.json"})),
                ("http://example.com/right.json", json!({"$ref": "base.json"})),
                ("http://example.com/base.json", json!({"type": "object"})),
            ]),
        )
        .unwrap();
        assert_eq!(schema.registry().len(), 4);
        assert!(!schema.is_valid(&json!([])));
    }
}

#[cfg(test)]
mod policy {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_documents() -> InMemoryFetcher {
        documents(&[
            ("http://example.com/a.json", json!({"type": "string"})),
            ("http://example.com/b.json", json!({"type": "integer"})),
        ])
    }

    fn two_refs() -> Value {
        json!({"anyOf": [{"$ref": "a.json"}, {"$ref": "b.json"}]})
    }

    #[test]
    fn test_fetching_disabled_by_default() {
        init_tracing();
        let options = CompileOptions::new().with_base_uri(uri("http://example.com/root.json"));
        let err = compile(&json!({"$ref": "a.json"}), &JsonSchemaOptions::default(), &options).unwrap_err();
        assert_eq!(err.remote_reason(), Some(RemoteReason::PolicyDenied));
    }

    #[test]
    fn test_scheme_not_allowed() {
        let policy = FetchPolicy::new().with_allowed_schemes(["https"]).unwrap();
        let err = compile_with_policy(two_refs(), two_documents(), policy);
        assert_eq!(err.remote_reason(), Some(RemoteReason::PolicyDenied));
        assert!(err.to_string().contains("Scheme not allowed"));
    }

    #[test]
    fn test_document_limit_counts_the_entry() {
        let policy = FetchPolicy::new().with_max_documents(2).unwrap();
        let err = compile_with_policy(two_refs(), two_documents(), policy);
        assert_eq!(err.remote_reason(), Some(RemoteReason::PolicyDenied));
        assert!(err.to_string().contains("Document limit of 2 reached"));

        let policy = FetchPolicy::new().with_max_documents(3).unwrap();
        let options = CompileOptions::new()
            .with_base_uri(uri("http://example.com/root.json"))
            .with_fetcher(two_documents())
            .with_fetch_policy(policy);
        assert!(compile(&two_refs(), &JsonSchemaOptions::default(), &options).is_ok());
    }

    #[test]
    fn test_document_too_large() {
        let policy = FetchPolicy::new().with_max_document_bytes(10).unwrap();
        let err = compile_with_policy(two_refs(), two_documents(), policy);
        assert_eq!(err.remote_reason(), Some(RemoteReason::PayloadTooLarge));
    }

    #[test]
    fn test_total_bytes_exceeded() {
        // {"type":"string"} is 17 bytes and {"type":"integer"} is 18.
        let policy = FetchPolicy::new().with_max_total_bytes(20).unwrap();
        let err = compile_with_policy(two_refs(), two_documents(), policy);
        assert_eq!(err.remote_reason(), Some(RemoteReason::PolicyDenied));
        assert!(err.to_string().contains("Total fetched bytes exceed 20"));
    }

    #[test]
    fn test_pointer_depth_limit() {
        let policy = FetchPolicy::new().with_max_depth(2).unwrap();
        let fetcher = documents(&[(
            "http://example.com/deep.json",
            json!({"a": {"b": {"c": {"type": "string"}}}}),
        )]);
        let err = compile_with_policy(json!({"$ref": "deep.json#/a/b/c"}), fetcher, policy);
        assert!(matches!(err, CompileError::PointerDepthExceeded { max: 2, .. }));
    }

    /// Serves documents but reports every fetch as taking `elapsed`
    struct SlowFetcher {
        inner: InMemoryFetcher,
        elapsed: Duration,
    }

    impl RemoteFetcher for SlowFetcher {
        fn fetch(&self, uri: &DocumentUri, policy: &FetchPolicy) -> RemoteResult<FetchResult> {
            let result = self.inner.fetch(uri, policy)?;
            Ok(FetchResult::new(result.document, result.byte_size, Some(self.elapsed)))
        }
    }

    #[test]
    fn test_slow_fetch_times_out() {
        init_tracing();
        let policy = FetchPolicy::new().with_timeout(Duration::from_secs(1)).unwrap();
        let slow = SlowFetcher {
            inner: two_documents(),
            elapsed: Duration::from_secs(30),
        };
        let options = CompileOptions::new()
            .with_base_uri(uri("http://example.com/root.json"))
            .with_fetcher(slow)
            .with_fetch_policy(policy.clone());
        let err = compile(&two_refs(), &JsonSchemaOptions::default(), &options).unwrap_err();
        assert_eq!(err.remote_reason(), Some(RemoteReason::Timeout));
        assert!(err.to_string().contains("(uri: http://example.com/"), "{err}");

        let quick = SlowFetcher {
            inner: two_documents(),
            elapsed: Duration::from_millis(200),
        };
        let options = CompileOptions::new()
            .with_base_uri(uri("http://example.com/root.json"))
            .with_fetcher(quick)
            .with_fetch_policy(policy);
        assert!(compile(&two_refs(), &JsonSchemaOptions::default(), &options).is_ok());
    }

    #[test]
    fn test_deeply_nested_remote_document_rejected() {
        let fetcher = documents(&[("http://example.com/deep.json", nested_nots(2_000))]);
        let err = compile_with_policy(json!({"$ref": "deep.json"}), fetcher, FetchPolicy::new());
        match err {
            CompileError::InvalidSchema { reason, .. } => {
                assert!(reason.contains("http://example.com/deep.json"), "{reason}")
            }
            other => panic!("expected InvalidSchema, got {other}"),
        }
    }

    #[test]
    fn test_unsatisfiable_policy_rejected_up_front() {
        let mut policy = FetchPolicy::new();
        policy.timeout = Duration::ZERO;
        let err = compile_with_policy(json!({}), InMemoryFetcher::new(), policy);
        assert!(matches!(err, CompileError::InvalidPolicy(_)));
    }
}

#[cfg(test)]
mod filesystem {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use url::Url;

    fn file_uri(path: &std::path::Path) -> schemastack_core::DocumentUri {
        schemastack_core::DocumentUri::from_url(Url::from_file_path(path).unwrap())
    }

    #[test]
    fn test_file_fetcher_resolves_relative_documents() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("defs")).unwrap();
        fs::write(
            dir.path().join("defs/person.json"),
            r#"{"type": "object", "properties": {"age": {"$ref": "numbers.json#/$defs/age"}}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("defs/numbers.json"),
            r#"{"$defs": {"age": {"type": "integer", "minimum": 0}}}"#,
        )
        .unwrap();

        let options = CompileOptions::new()
            .with_base_uri(file_uri(&dir.path().join("root.json")))
            .with_fetcher(FileFetcher::new(dir.path()).unwrap());
        let schema = compile(
            &json!({"$ref": "defs/person.json"}),
            &JsonSchemaOptions::default(),
            &options,
        )
        .unwrap();

        assert_eq!(schema.registry().len(), 3);
        assert!(schema.is_valid(&json!({"age": 30})));
        assert_eq!(schema.validate(&json!({"age": -1})).errors[0].path, "age");
    }

    #[test]
    fn test_file_fetcher_stays_in_its_root() {
        init_tracing();
        let outer = tempfile::tempdir().unwrap();
        let jail = outer.path().join("jail");
        fs::create_dir(&jail).unwrap();
        fs::write(outer.path().join("secret.json"), r#"{"type": "string"}"#).unwrap();

        let options = CompileOptions::new()
            .with_base_uri(file_uri(&jail.join("root.json")))
            .with_fetcher(FileFetcher::new(&jail).unwrap());
        let err = compile(
            &json!({"$ref": "../secret.json"}),
            &JsonSchemaOptions::default(),
            &options,
        )
        .unwrap_err();
        assert_eq!(err.remote_reason(), Some(RemoteReason::PolicyDenied));
    }

    #[test]
    fn test_file_fetcher_rejects_malformed_json() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dup.json"), r#"{"type": "string", "type": "integer"}"#).unwrap();

        let options = CompileOptions::new()
            .with_base_uri(file_uri(&dir.path().join("root.json")))
            .with_fetcher(FileFetcher::new(dir.path()).unwrap());
        let err = compile(&json!({"$ref": "dup.json"}), &JsonSchemaOptions::default(), &options).unwrap_err();
        assert!(err.remote_reason().is_some());
    }
}
