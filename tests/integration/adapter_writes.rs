#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::error::Error as _;
use std::sync::Arc;

use widecol::{
    adapter::Adapter,
    scope::RowLayout,
    statement::{compile_delete, ExecOptions, Statement, StoredAttributes},
    testkit::{MemoryConnection, StatementLog},
    types::{Consistency, Ids, RecordId, Result, WidecolError},
};

fn adapter(layout: RowLayout) -> (Adapter<MemoryConnection>, StatementLog) {
    let log = StatementLog::default();
    let mut conn = MemoryConnection::new();
    conn.create_table("Things", layout);
    (Adapter::new(conn).with_observer(Arc::new(log.clone())), log)
}

fn stored(pairs: &[(&str, Option<&str>)]) -> StoredAttributes {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.map(str::to_owned)))
        .collect()
}

#[test]
fn null_attributes_become_a_column_delete() -> Result<()> {
    let (mut adapter, log) = adapter(RowLayout::FixedSchema);
    let id = RecordId::from("k1");
    adapter.write("Things", &id, &stored(&[("a", Some("1")), ("b", Some("2"))]))?;
    log.clear();

    adapter.write("Things", &id, &stored(&[("a", Some("3")), ("b", None)]))?;
    assert_eq!(
        log.statements(),
        vec![
            "INSERT INTO Things ('KEY','a') VALUES ('k1','3')".to_owned(),
            "DELETE 'b' FROM Things WHERE KEY = 'k1'".to_owned(),
        ]
    );

    let row = adapter.connection().stored_row("Things", "k1").cloned();
    let expected: BTreeMap<String, String> = [("a".to_owned(), "3".to_owned())].into();
    assert_eq!(row, Some(expected));
    Ok(())
}

#[test]
fn only_null_attributes_issue_only_the_delete() -> Result<()> {
    let (mut adapter, log) = adapter(RowLayout::FixedSchema);
    adapter.write("Things", &"k".into(), &stored(&[("a", None), ("b", None)]))?;
    assert_eq!(
        log.statements(),
        vec!["DELETE 'a','b' FROM Things WHERE KEY = 'k'".to_owned()]
    );
    Ok(())
}

#[test]
fn insert_and_update_are_the_same_upsert() -> Result<()> {
    let (mut adapter, log) = adapter(RowLayout::FixedSchema);
    let id = RecordId::from("k");
    adapter.insert("Things", &id, &stored(&[("a", Some("1"))]))?;
    adapter.update("Things", &id, &stored(&[("a", Some("1"))]))?;
    let statements = log.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0], statements[1]);
    Ok(())
}

#[test]
fn consistency_clause_is_standalone_only_unless_wrapping_a_batch() -> Result<()> {
    let (mut adapter, log) = adapter(RowLayout::FixedSchema);
    adapter.set_consistency(Some(Consistency::LocalQuorum));

    adapter.write("Things", &"a".into(), &stored(&[("x", Some("1"))]))?;
    adapter.batch(|batch| {
        batch.write("Things", &"b".into(), &stored(&[("x", Some("2"))]))?;
        batch.delete("Things", "a")
    })?;

    assert_eq!(
        log.statements(),
        vec![
            "INSERT INTO Things ('KEY','x') VALUES ('a','1') USING CONSISTENCY LOCAL_QUORUM".to_owned(),
            "BEGIN BATCH USING CONSISTENCY LOCAL_QUORUM\n\
             INSERT INTO Things ('KEY','x') VALUES ('b','2')\n\
             DELETE FROM Things WHERE KEY = 'a'\n\
             APPLY BATCH"
                .to_owned(),
        ]
    );
    assert!(adapter.connection().stored_row("Things", "a").is_none());
    assert!(adapter.connection().stored_row("Things", "b").is_some());
    Ok(())
}

#[test]
fn no_consistency_configured_means_no_clause_anywhere() -> Result<()> {
    let (mut adapter, log) = adapter(RowLayout::FixedSchema);
    let s1 = Statement::new("INSERT INTO Things ('KEY','x') VALUES ('a','1')");
    let s2 = Statement::new("INSERT INTO Things ('KEY','x') VALUES ('b','2')");
    adapter.execute_batch(&[s1.clone(), s2.clone()])?;
    assert_eq!(
        log.statements(),
        vec![format!("BEGIN BATCH\n{s1}\n{s2}\nAPPLY BATCH")]
    );
    Ok(())
}

#[test]
fn singleton_delete_collapses_to_scalar_predicate() -> Result<()> {
    let opts = ExecOptions::default();
    let scalar = compile_delete("Things", Ids::from(42i64), &opts)?;
    let list = compile_delete("Things", Ids::from(vec![42i64]), &opts)?;
    assert_eq!(scalar, list);
    assert_eq!(scalar.as_str(), "DELETE FROM Things WHERE KEY = '42'");

    let many = compile_delete("Things", Ids::from(vec!["a", "b"]), &opts)?;
    assert_eq!(many.as_str(), "DELETE FROM Things WHERE KEY IN ('a','b')");
    Ok(())
}

#[test]
fn dropped_batch_guard_leaves_no_batching_state_behind() -> Result<()> {
    let (mut adapter, log) = adapter(RowLayout::FixedSchema);
    {
        let mut batch = adapter.begin_batch();
        batch.write("Things", &"a".into(), &stored(&[("x", Some("1"))]))?;
        assert_eq!(batch.len(), 1);
    }
    assert!(!adapter.is_batching());
    adapter.write("Things", &"b".into(), &stored(&[("x", Some("2"))]))?;
    assert_eq!(
        log.statements(),
        vec!["INSERT INTO Things ('KEY','x') VALUES ('b','2')".to_owned()]
    );
    Ok(())
}

#[test]
fn nested_batches_apply_once_at_the_outermost_guard() -> Result<()> {
    let (mut adapter, log) = adapter(RowLayout::FixedSchema);
    adapter.batch(|outer| {
        outer.write("Things", &"a".into(), &stored(&[("x", Some("1"))]))?;
        outer.batch(|inner| inner.write("Things", &"b".into(), &stored(&[("x", Some("2"))])))?;
        assert!(log.statements().is_empty());
        Ok(())
    })?;
    let statements = log.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].starts_with("BEGIN BATCH\n"));
    assert_eq!(statements[0].lines().count(), 4);
    Ok(())
}

#[test]
fn connection_errors_propagate_unchanged() {
    let (mut adapter, _log) = adapter(RowLayout::FixedSchema);
    adapter.connection_mut().fail_next("coordinator timed out");
    let err = adapter
        .write("Things", &"a".into(), &stored(&[("x", Some("1"))]))
        .unwrap_err();
    assert!(matches!(err, WidecolError::Connection(_)));
    assert_eq!(
        err.source().map(ToString::to_string).as_deref(),
        Some("coordinator timed out")
    );
}

#[test]
fn failing_batch_statement_rolls_back_the_whole_batch() -> Result<()> {
    let (mut adapter, _log) = adapter(RowLayout::FixedSchema);
    let result = adapter.batch(|batch| {
        batch.write("Things", &"a".into(), &stored(&[("x", Some("1"))]))?;
        batch.write("Missing", &"b".into(), &stored(&[("x", Some("2"))]))
    });
    assert!(matches!(result, Err(WidecolError::Connection(_))));
    assert!(adapter.connection().stored_row("Things", "a").is_none());
    assert!(!adapter.is_batching());
    Ok(())
}
