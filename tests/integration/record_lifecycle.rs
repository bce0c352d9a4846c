#![allow(missing_docs)]

use std::sync::Arc;

use time::macros::{date, datetime};
use time::OffsetDateTime;
use widecol::{
    adapter::Adapter,
    codec::{AttributeType, Value},
    model::{EntityDescriptor, CREATED_AT, UPDATED_AT},
    scope::RowLayout,
    testkit::{MemoryConnection, StatementLog},
    types::{Result, WidecolError},
};

fn products() -> Arc<EntityDescriptor> {
    EntityDescriptor::builder("Products")
        .attribute("name", AttributeType::String)
        .attribute("price", AttributeType::Float)
        .attribute("in_stock", AttributeType::Boolean)
        .attribute("released", AttributeType::Date)
        .attribute("specs", AttributeType::Json)
        .attribute("tags", AttributeType::Array)
        .timestamps()
        .build()
}

fn setup() -> (Adapter<MemoryConnection>, StatementLog) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let log = StatementLog::default();
    let mut conn = MemoryConnection::new();
    conn.create_table("Products", RowLayout::FixedSchema);
    (Adapter::new(conn).with_observer(Arc::new(log.clone())), log)
}

#[test]
fn every_type_survives_a_save_and_reload() -> Result<()> {
    let (mut adapter, _log) = setup();
    let products = products();
    let specs = serde_json::json!({"weight": 1.5, "colors": ["red", "blue"]});
    let saved = products.create(
        &mut adapter,
        [
            ("name", Value::from("lamp")),
            ("price", Value::from("19.99")),
            ("in_stock", Value::from("yes")),
            ("released", Value::from(date!(2023 - 11 - 05))),
            ("specs", Value::from(specs.clone())),
            ("tags", Value::from(vec!["home".to_owned(), "light".to_owned()])),
        ],
    )?;

    let fetched = products.scope().find(&mut adapter, saved.id().clone())?;
    assert_eq!(fetched.read_attribute("name"), &Value::from("lamp"));
    assert_eq!(fetched.read_attribute("price"), &Value::Float(19.99));
    assert_eq!(fetched.read_attribute("in_stock"), &Value::Boolean(true));
    assert_eq!(fetched.read_attribute("released"), &Value::Date(date!(2023 - 11 - 05)));
    assert_eq!(fetched.read_attribute("specs"), &Value::Json(specs));
    assert_eq!(
        fetched.read_attribute("tags"),
        &Value::Array(vec!["home".to_owned(), "light".to_owned()])
    );
    assert_eq!(fetched, saved);
    Ok(())
}

#[test]
fn saving_writes_only_dirty_attributes() -> Result<()> {
    let (mut adapter, log) = setup();
    let products = products();
    let mut product = products.create(&mut adapter, [("name", "desk"), ("price", "120.5")])?;
    let stamped = product.read_attribute(UPDATED_AT).clone();
    log.clear();

    product.write_attribute("price", "120.5")?;
    assert!(!product.changed());
    product.save(&mut adapter)?;
    assert!(log.statements().is_empty(), "unchanged save writes nothing");

    product.write_attribute("price", 99.0)?;
    product.write_attribute("name", Value::Null)?;
    assert_eq!(
        product.changed_attributes().collect::<Vec<_>>(),
        ["name", "price"]
    );
    product.save(&mut adapter)?;

    let statements = log.statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].starts_with(&format!(
        "INSERT INTO Products ('KEY','price','updated_at') VALUES ('{}','99'",
        product.id()
    )));
    assert_eq!(
        statements[1],
        format!("DELETE 'name' FROM Products WHERE KEY = '{}'", product.id())
    );
    assert!(!product.changed());
    assert!(product.previous_changes().contains_key("price"));
    assert_ne!(product.read_attribute(UPDATED_AT), &stamped);
    Ok(())
}

#[test]
fn created_at_is_only_filled_when_missing() -> Result<()> {
    let (mut adapter, _log) = setup();
    let products = products();
    let imported = datetime!(2020-02-02 2:02:02 UTC);
    let product = products.create(
        &mut adapter,
        [("name", Value::from("old")), (CREATED_AT, Value::from(imported))],
    )?;
    assert_eq!(product.read_attribute(CREATED_AT), &Value::Time(imported));
    assert!(matches!(product.read_attribute(UPDATED_AT), Value::Time(_)));

    let fresh = products.create(&mut adapter, [("name", "new")])?;
    match (fresh.read_attribute(CREATED_AT), fresh.read_attribute(UPDATED_AT)) {
        (Value::Time(created), Value::Time(updated)) => {
            assert_eq!(created, updated);
            assert!(*created <= OffsetDateTime::now_utc());
        }
        other => panic!("timestamps not set: {other:?}"),
    }
    Ok(())
}

#[test]
fn explicit_updated_at_is_kept_but_nil_is_replaced() -> Result<()> {
    let (mut adapter, _log) = setup();
    let products = products();
    let mut product = products.create(&mut adapter, [("name", "chair")])?;

    let chosen = datetime!(2021-06-01 12:00 UTC);
    product.update_attributes(&mut adapter, [(UPDATED_AT, chosen)])?;
    assert_eq!(product.read_attribute(UPDATED_AT), &Value::Time(chosen));

    product.update_attributes(&mut adapter, [(UPDATED_AT, Value::Null)])?;
    match product.read_attribute(UPDATED_AT) {
        Value::Time(at) => assert_ne!(*at, chosen),
        other => panic!("updated_at should be refreshed, got {other:?}"),
    }
    Ok(())
}

#[test]
fn reload_discards_unsaved_changes() -> Result<()> {
    let (mut adapter, _log) = setup();
    let products = products();
    let mut product = products.create(&mut adapter, [("name", "sofa")])?;
    product.write_attribute("name", "bed")?;
    product.reload(&mut adapter)?;
    assert_eq!(product.read_attribute("name"), &Value::from("sofa"));
    assert!(!product.changed());
    Ok(())
}

#[test]
fn destroyed_records_are_gone_and_cannot_be_saved() -> Result<()> {
    let (mut adapter, _log) = setup();
    let products = products();
    let mut product = products.create(&mut adapter, [("name", "vase")])?;
    product.destroy(&mut adapter)?;
    assert!(product.is_destroyed());
    assert!(products.scope().find_by_id(&mut adapter, product.id().clone())?.is_none());

    product.write_attribute("name", "again")?;
    assert!(matches!(product.save(&mut adapter), Err(WidecolError::Invalid(_))));
    Ok(())
}

#[test]
fn corrupt_stored_values_degrade_instead_of_failing() -> Result<()> {
    let (mut adapter, _log) = setup();
    adapter.execute(&widecol::statement::Statement::new(
        "INSERT INTO Products ('KEY','price','in_stock') VALUES ('p1','cheap','maybe')",
    ))?;

    let product = products().scope().find(&mut adapter, "p1")?;
    assert_eq!(product.read_attribute("price"), &Value::from("cheap"));
    assert_eq!(product.read_attribute("in_stock"), &Value::from("maybe"));
    Ok(())
}

#[test]
fn unknown_attributes_are_rejected_outside_schemaless() {
    let products = products();
    let err = products.new_record([("colour", "red")]).unwrap_err();
    assert!(matches!(err, WidecolError::Invalid(_)));

    let bags = EntityDescriptor::builder("Bags").layout(RowLayout::Schemaless).build();
    let bag = bags.new_record([("colour", "red")]).expect("schemaless accepts any name");
    assert_eq!(bag.read_attribute("colour"), &Value::from("red"));
}

#[test]
fn save_inside_a_discarded_batch_can_be_retried() -> Result<()> {
    let (mut adapter, _log) = setup();
    let products = products();
    let mut product = products.new_record([("name", "kettle")])?;

    let result: Result<()> = adapter.batch(|batch| {
        product.save(&mut **batch)?;
        Err(WidecolError::Invalid("abandon batch".into()))
    });
    assert!(result.is_err());
    assert!(product.changed());
    assert!(product.is_new_record());
    assert!(adapter.connection().stored_row("Products", product.id().as_str()).is_none());

    product.save(&mut adapter)?;
    assert!(!product.changed());
    let row = adapter.connection().stored_row("Products", product.id().as_str());
    assert_eq!(row.and_then(|r| r.get("name")).map(String::as_str), Some("kettle"));
    Ok(())
}

#[test]
fn buffered_save_is_confirmed_after_the_batch_applies() -> Result<()> {
    let (mut adapter, log) = setup();
    let products = products();
    let mut product = products.new_record([("name", "toaster")])?;

    adapter.batch(|batch| product.save(&mut **batch))?;
    assert!(product.changed(), "dirty until the caller confirms");
    assert_eq!(log.statements().len(), 1);
    product.mark_persisted();
    assert!(!product.changed());
    assert!(product.previous_changes().contains_key("name"));

    let fetched = products.scope().find(&mut adapter, product.id().clone())?;
    assert_eq!(fetched.read_attribute("name"), &Value::from("toaster"));
    Ok(())
}
