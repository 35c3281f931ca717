use pegasus::error::{PegasusError, Result};
use pegasus::filter::{
    CandidateFilter, validate_ids, validate_include, validate_where, validate_where_document,
    where_document_matches, where_matches,
};
use pegasus::types::{Include, Metadata, MetadataValue};
use serde_json::{Map, Value, json};

fn nested(op: &str, depth: usize, leaf: Value, sibling: &Value) -> Value {
    let mut expr = leaf;
    for _ in 0..depth {
        let mut node = Map::new();
        node.insert(op.to_string(), Value::Array(vec![expr, sibling.clone()]));
        expr = Value::Object(node);
    }
    expr
}

fn metadata(pairs: &[(&str, MetadataValue)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn well_formed_where_is_returned_unchanged() -> Result<()> {
    let filters = [
        json!({}),
        json!({"color": "red"}),
        json!({"price": 9.5}),
        json!({"age": {"$gte": 18}, "role": {"$ne": "guest"}}),
        json!({"$or": [{"age": {"$lt": 13}}, {"$and": [{"age": {"$gt": 65}}, {"vip": 1}]}]}),
    ];

    for filter in &filters {
        let validated = validate_where(filter)?;
        assert_eq!(validated, filter);
        assert!(validate_where(validated).is_ok());
    }
    Ok(())
}

#[test]
fn single_child_logical_list_is_rejected_at_any_depth() {
    let cases = [
        (json!({"$and": [{"age": {"$gt": 5}}]}), "where.$and"),
        (
            json!({"$or": [{"a": 1}, {"$and": [{"b": 2}]}]}),
            "where.$or[1].$and",
        ),
        (json!({"$or": []}), "where.$or"),
    ];

    for (filter, expected_path) in cases {
        match validate_where(&filter).unwrap_err() {
            PegasusError::Schema { path, .. } => assert_eq!(path, expected_path, "{filter}"),
            other => panic!("unexpected error for {filter}: {other:?}"),
        }
    }
}

#[test]
fn range_operator_with_string_operand_is_type_mismatch() {
    for op in ["$gt", "$gte", "$lt", "$lte"] {
        let filter = json!({"age": {op: "ten"}});
        let err = validate_where(&filter).unwrap_err();
        assert_eq!(err.kind(), "TypeMismatch", "{op}");
        assert_eq!(err.code(), 400);
    }

    assert!(validate_where(&json!({"name": {"$eq": "ten"}})).is_ok());
    assert!(validate_where(&json!({"name": {"$ne": "ten"}})).is_ok());
}

#[test]
fn unknown_operators_name_the_offender() {
    let err = validate_where(&json!({"age": {"$between": [1, 2]}})).unwrap_err();
    match err {
        PegasusError::UnknownOperator { path, operator, .. } => {
            assert_eq!(path, "where.age");
            assert_eq!(operator, "$between");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = validate_where_document(&json!({"$regex": "c.t"})).unwrap_err();
    assert_eq!(err.kind(), "UnknownOperator");
}

#[test]
fn where_document_shapes() -> Result<()> {
    let filter = json!({"$or": [{"$contains": "cat"}, {"$contains": "dog"}]});
    validate_where_document(&filter)?;
    assert!(where_document_matches(&filter, "a hot dog"));
    assert!(!where_document_matches(&filter, "a Cat"));

    let err = validate_where_document(&json!({"$contains": 5})).unwrap_err();
    assert_eq!(err.kind(), "TypeMismatch");

    let err = validate_where_document(&json!({"$and": [{"$contains": "x"}]})).unwrap_err();
    assert_eq!(err.kind(), "SchemaError");
    Ok(())
}

#[test]
fn evaluation_follows_the_grammar() -> Result<()> {
    let filter = json!({
        "$or": [
            {"age": {"$gte": 18}, "country": "jp"},
            {"role": "admin"}
        ]
    });
    validate_where(&filter)?;

    let adult_jp = metadata(&[
        ("age", MetadataValue::Int(30)),
        ("country", MetadataValue::from("jp")),
    ]);
    let adult_us = metadata(&[
        ("age", MetadataValue::Float(30.5)),
        ("country", MetadataValue::from("us")),
    ]);
    let admin = metadata(&[("role", MetadataValue::from("admin"))]);

    assert!(where_matches(&filter, &adult_jp));
    assert!(!where_matches(&filter, &adult_us));
    assert!(where_matches(&filter, &admin));
    assert!(!where_matches(&filter, &Metadata::new()));
    Ok(())
}

#[test]
fn candidate_filter_combines_both_dialects() -> Result<()> {
    let filter = CandidateFilter::new(
        Some(json!({"kind": "cat"})),
        Some(json!({"$contains": "tabby"})),
    )?;
    let cat = metadata(&[("kind", MetadataValue::from("cat"))]);

    assert!(filter.matches(Some(&cat), Some("a tabby cat")));
    assert!(!filter.matches(Some(&cat), Some("a black cat")));
    assert!(!filter.matches(Some(&cat), None));
    assert!(!filter.matches(None, Some("a tabby cat")));

    assert!(CandidateFilter::accept_all().matches(None, None));
    assert!(CandidateFilter::new(Some(json!({"$and": []})), None).is_err());
    Ok(())
}

#[test]
fn include_validation() -> Result<()> {
    assert_eq!(
        validate_include(&["metadatas", "distances"], true)?,
        vec![Include::Metadatas, Include::Distances]
    );
    let err = validate_include(&["distances"], false).unwrap_err();
    assert_eq!(err.kind(), "InvalidInclude");
    let err = validate_include(&["scores"], true).unwrap_err();
    assert_eq!(err.kind(), "InvalidInclude");
    Ok(())
}

#[test]
fn duplicate_ids_are_named_exactly() {
    let ids: Vec<String> = ["x", "y", "x", "z", "y", "x"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let err = validate_ids(&ids).unwrap_err();
    assert_eq!(err.kind(), "DuplicateID");
    assert_eq!(
        err.to_string(),
        "Expected IDs to be unique, found duplicates for: x, y"
    );

    let unique: Vec<String> = vec!["a".into(), "b".into()];
    assert_eq!(validate_ids(&unique).unwrap(), unique.as_slice());
}

#[test]
fn deeply_nested_filters_do_not_overflow() {
    let depth = 100_000;
    let filter = nested("$and", depth, json!({"age": {"$gt": 1}}), &json!({"ok": 1}));

    assert!(validate_where(&filter).is_ok());
    let meta = metadata(&[("age", MetadataValue::Int(2)), ("ok", MetadataValue::Int(1))]);
    assert!(where_matches(&filter, &meta));
    let young = metadata(&[("age", MetadataValue::Int(0)), ("ok", MetadataValue::Int(1))]);
    assert!(!where_matches(&filter, &young));

    // serde_json drops values recursively.
    std::mem::forget::<Value>(filter);
}

#[test]
fn deeply_nested_document_filters_do_not_overflow() {
    let depth = 100_000;
    let any_of = nested(
        "$or",
        depth,
        json!({"$contains": "tabby"}),
        &json!({"$contains": "calico"}),
    );
    validate_where_document(&any_of).unwrap();
    assert!(where_document_matches(&any_of, "a calico cat"));
    assert!(where_document_matches(&any_of, "a tabby cat"));
    assert!(!where_document_matches(&any_of, "a black cat"));

    let all_of = nested("$and", depth, json!({"$contains": "cat"}), &json!({"$contains": "a"}));
    validate_where_document(&all_of).unwrap();
    assert!(where_document_matches(&all_of, "a cat"));
    assert!(!where_document_matches(&all_of, "a dog"));

    let broken = nested("$and", depth, json!({"$contains": 7}), &json!({"$contains": "a"}));
    assert_eq!(validate_where_document(&broken).unwrap_err().kind(), "TypeMismatch");

    for tree in [any_of, all_of, broken] {
        std::mem::forget::<Value>(tree);
    }
}
