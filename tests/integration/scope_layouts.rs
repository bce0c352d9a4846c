#![allow(missing_docs)]

use std::sync::Arc;

use time::macros::datetime;
use widecol::{
    adapter::Adapter,
    codec::{AttributeType, Value},
    model::EntityDescriptor,
    scope::{AttributeSet, QueryContext, ResultItem, Results, RowLayout, ScopeHelper},
    testkit::{MemoryConnection, StatementLog},
    types::{RecordId, Result, WidecolError},
};

fn setup(
    table: &str,
    layout: RowLayout,
) -> (Adapter<MemoryConnection>, StatementLog) {
    let log = StatementLog::default();
    let mut conn = MemoryConnection::new();
    conn.create_table(table, layout);
    (Adapter::new(conn).with_observer(Arc::new(log.clone())), log)
}

fn issue_type() -> Arc<EntityDescriptor> {
    EntityDescriptor::builder("Issues")
        .layout(RowLayout::DynamicAttribute)
        .attribute("description", AttributeType::String)
        .attribute("updated_at", AttributeType::Time)
        .build()
}

#[test]
fn issue_round_trip_over_dynamic_attribute_cells() -> Result<()> {
    let (mut adapter, log) = setup("Issues", RowLayout::DynamicAttribute);
    let issues = issue_type();

    let mut issue = issues.create(&mut adapter, [("description", "foo")])?;
    let id = issue.id().clone();

    let fetched = issues.scope().find(&mut adapter, id.clone())?;
    assert_eq!(fetched.read_attribute("description"), &Value::from("foo"));
    assert!(fetched.read_attribute("updated_at").is_null());
    assert_eq!(fetched.attributes().len(), 1);

    let at = datetime!(2024-03-01 10:30:00 UTC);
    log.clear();
    issue.update_attributes(&mut adapter, [("updated_at", at)])?;
    let statements = log.statements();
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0],
        format!("INSERT INTO Issues ('KEY','updated_at') VALUES ('{id}','2024-03-01T10:30:00Z')")
    );

    let fetched = issues.scope().find(&mut adapter, id)?;
    assert_eq!(fetched.read_attribute("description"), &Value::from("foo"));
    assert_eq!(fetched.read_attribute("updated_at"), &Value::Time(at));
    Ok(())
}

#[test]
fn dynamic_limit_counts_records_not_cells() -> Result<()> {
    let (mut adapter, log) = setup("Issues", RowLayout::DynamicAttribute);
    let issues = issue_type();
    for n in 0..3 {
        issues.create(
            &mut adapter,
            [
                ("description", Value::from(format!("issue {n}"))),
                ("updated_at", Value::from(datetime!(2024-01-01 0:00 UTC))),
            ],
        )?;
    }
    log.clear();

    let records = issues.scope().limit(2).to_records(&mut adapter)?;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.attributes().len() == 2));
    assert!(!log.statements()[0].contains("LIMIT"));
    Ok(())
}

#[test]
fn fixed_schema_rows_decode_into_records() -> Result<()> {
    let (mut adapter, log) = setup("Users", RowLayout::FixedSchema);
    let users = EntityDescriptor::builder("Users")
        .attribute("name", AttributeType::String)
        .attribute("age", AttributeType::Integer)
        .attribute("admin", AttributeType::Boolean)
        .build();
    users.create(&mut adapter, [("name", Value::from("ann")), ("age", Value::from(41i64))])?;
    users.create(&mut adapter, [("name", Value::from("bob")), ("admin", Value::from(true))])?;
    log.clear();

    let output = users.scope().where_eq("name", "bob").execute(&mut adapter)?;
    assert!(!output.is_page());
    let records = output.into_results().into_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].read_attribute("admin"), &Value::Boolean(true));
    assert!(records[0].read_attribute("age").is_null());
    assert_eq!(log.statements(), vec!["SELECT * FROM Users WHERE name = 'bob'".to_owned()]);

    let limited = users.scope().limit(1).to_records(&mut adapter)?;
    assert_eq!(limited.len(), 1);
    assert!(log.statements()[1].ends_with("LIMIT 1"));
    Ok(())
}

#[test]
fn raw_response_carries_stored_forms() -> Result<()> {
    let (mut adapter, _log) = setup("Issues", RowLayout::DynamicAttribute);
    let issues = issue_type();
    let issue = issues.create(&mut adapter, [("description", "raw me")])?;

    let results = issues.scope().ids(issue.id().clone()).raw().execute(&mut adapter)?.into_results();
    let items = results.items().unwrap_or_default();
    assert_eq!(items.len(), 1);
    match &items[0] {
        ResultItem::Raw { id, attributes } => {
            assert_eq!(id, issue.id());
            assert_eq!(attributes.get("description"), Some("raw me"));
        }
        other => panic!("expected raw item, got {other:?}"),
    }
    Ok(())
}

#[test]
fn raw_cell_names_stand_in_for_present_columns() -> Result<()> {
    let (mut adapter, _log) = setup("Issues", RowLayout::DynamicAttribute);
    let issues = issue_type();
    let issue = issues.create(
        &mut adapter,
        [
            ("description", Value::from("x")),
            ("updated_at", Value::from(datetime!(2024-01-01 0:00 UTC))),
        ],
    )?;

    let results = issues
        .scope()
        .select(["column1"])
        .ids(issue.id().clone())
        .raw()
        .execute(&mut adapter)?
        .into_results();
    let item = &results.items().unwrap_or_default()[0];
    let ResultItem::Raw { attributes, .. } = item else {
        panic!("expected raw item");
    };
    assert_eq!(
        attributes,
        &AttributeSet::Names(vec!["description".to_owned(), "updated_at".to_owned()])
    );
    Ok(())
}

#[test]
fn schemaless_results_merge_into_one_mapping() -> Result<()> {
    let (mut adapter, _log) = setup("Bags", RowLayout::Schemaless);
    let bags = EntityDescriptor::builder("Bags").layout(RowLayout::Schemaless).build();
    let first = bags.create(&mut adapter, [("color", "red"), ("size", "m")])?;
    let second = bags.create(&mut adapter, [("shape", "round")])?;

    let results = bags.scope().execute(&mut adapter)?.into_results();
    let merged = match results {
        Results::Merged(map) => map,
        other => panic!("expected merged results, got {other:?}"),
    };
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[first.id()].get("color"), Some("red"));
    assert_eq!(merged[first.id()].names(), ["color", "size"]);
    assert_eq!(merged[second.id()].names(), ["shape"]);

    let only_color = bags
        .scope()
        .where_clause("column1 = 'color'")
        .execute(&mut adapter)?
        .into_results();
    let only_color = only_color.merged().cloned().unwrap_or_default();
    assert_eq!(only_color.len(), 1);
    assert!(only_color.contains_key(first.id()));
    Ok(())
}

#[test]
fn ghost_rows_left_by_column_deletes_are_not_reported() -> Result<()> {
    let (mut adapter, _log) = setup("Users", RowLayout::FixedSchema);
    let users = EntityDescriptor::builder("Users")
        .attribute("name", AttributeType::String)
        .build();
    let mut user = users.create(&mut adapter, [("name", "gone")])?;
    user.update_attributes(&mut adapter, [("name", Value::Null)])?;

    assert!(users.scope().to_records(&mut adapter)?.is_empty());
    let err = users.scope().find(&mut adapter, user.id().clone()).unwrap_err();
    assert!(matches!(err, WidecolError::NotFound(_)));
    Ok(())
}

#[test]
fn builder_errors_surface_on_execute() {
    let (mut adapter, log) = setup("Issues", RowLayout::DynamicAttribute);
    let err = issue_type().scope().limit(0).execute(&mut adapter).unwrap_err();
    assert!(matches!(err, WidecolError::Invalid(_)));
    let err = issue_type().scope().where_eq("missing", "x").execute(&mut adapter).unwrap_err();
    assert!(matches!(err, WidecolError::Invalid(_)));
    assert!(log.statements().is_empty());
}

struct OpenIssues;

impl<C: widecol::Connection> ScopeHelper<C> for OpenIssues {
    type Output = Vec<RecordId>;

    fn call(&self, ctx: &mut QueryContext<'_, C>) -> Result<Self::Output> {
        let scope = ctx
            .current_scope()
            .cloned()
            .ok_or_else(|| WidecolError::Invalid("no current scope".into()))?;
        let records = scope.where_clause("column1 = 'description'").to_records(ctx.adapter())?;
        Ok(records.into_iter().map(|r| r.id().clone()).collect())
    }
}

#[test]
fn helpers_run_with_the_forwarding_scope_installed() -> Result<()> {
    let (mut adapter, log) = setup("Issues", RowLayout::DynamicAttribute);
    let issues = issue_type();
    let issue = issues.create(&mut adapter, [("description", "open")])?;
    log.clear();

    let ids = issues.scope().ids(issue.id().clone()).forward(&mut adapter, &OpenIssues)?;
    assert_eq!(ids, vec![issue.id().clone()]);
    assert_eq!(
        log.statements(),
        vec![format!(
            "SELECT * FROM Issues WHERE column1 = 'description' AND KEY = '{}'",
            issue.id()
        )]
    );
    Ok(())
}
