#![forbid(unsafe_code)]

//! In-memory test double for [`Connection`].
//!
//! [`MemoryConnection`] understands exactly the statement shapes produced by
//! [`crate::statement`]: it is not a CQL implementation. Fixed-schema tables
//! answer with one row per key; dynamic-attribute and schemaless tables answer
//! with one `(KEY, column1, value)` row per stored cell.
//!
//! Compiled for the crate's own tests and behind the `testkit` feature.

mod lexer;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::adapter::{Connection, Cursor, KeyPage, Row, StatementObserver};
use crate::scope::RowLayout;
use crate::types::{RecordId, Result, WidecolError, KEY_COLUMN};

use lexer::Parser;

/// Column name of the cell-name column in cell layouts.
pub const CELL_NAME_COLUMN: &str = "column1";
/// Column name of the cell-value column in cell layouts.
pub const CELL_VALUE_COLUMN: &str = "value";

type Cells = BTreeMap<String, String>;

#[derive(Clone, Debug)]
struct Table {
    layout: RowLayout,
    rows: BTreeMap<String, Cells>,
}

#[derive(Debug)]
enum Predicate {
    Keys(Vec<String>),
    Column(String, String),
}

/// In-memory store keyed by table, row key and column.
#[derive(Clone, Debug, Default)]
pub struct MemoryConnection {
    tables: BTreeMap<String, Table>,
    fail_next: Option<String>,
    page_requests: usize,
}

impl MemoryConnection {
    /// Empty store without tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a table with the given layout.
    pub fn create_table(&mut self, name: &str, layout: RowLayout) {
        self.tables.insert(
            name.to_owned(),
            Table {
                layout,
                rows: BTreeMap::new(),
            },
        );
    }

    /// Makes the next `execute` fail with a driver error carrying `message`.
    pub fn fail_next(&mut self, message: impl Into<String>) {
        self.fail_next = Some(message.into());
    }

    /// Number of key-page requests served.
    pub fn page_requests(&self) -> usize {
        self.page_requests
    }

    /// Stored columns of one row, if the row exists.
    pub fn stored_row(&self, table: &str, key: &str) -> Option<&BTreeMap<String, String>> {
        self.tables.get(table)?.rows.get(key)
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| driver_error(format!("unconfigured columnfamily {name}")))
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| driver_error(format!("unconfigured columnfamily {name}")))
    }

    fn run(&mut self, cql: &str) -> Result<Vec<Row>> {
        let trimmed = cql.trim();
        if trimmed.starts_with("BEGIN BATCH") {
            return self.run_batch(trimmed);
        }
        let mut parser = Parser::new(trimmed)?;
        let rows = if parser.peek_keyword("SELECT") {
            self.run_select(&mut parser)?
        } else if parser.peek_keyword("INSERT") {
            self.run_insert(&mut parser)?;
            Vec::new()
        } else if parser.peek_keyword("DELETE") {
            self.run_delete(&mut parser)?;
            Vec::new()
        } else {
            return Err(parser.error("unsupported statement"));
        };
        if !parser.at_end() {
            return Err(parser.error("trailing input"));
        }
        Ok(rows)
    }

    fn run_batch(&mut self, cql: &str) -> Result<Vec<Row>> {
        let lines: Vec<&str> = cql.lines().map(str::trim).collect();
        let Some((last, body)) = lines[1..].split_last() else {
            return Err(driver_error("BEGIN BATCH without APPLY BATCH".to_owned()));
        };
        if *last != "APPLY BATCH" {
            return Err(driver_error("BEGIN BATCH without APPLY BATCH".to_owned()));
        }
        Parser::new(lines[0])?;
        let mut staged = self.clone();
        for statement in body {
            if statement.starts_with("SELECT") {
                return Err(driver_error("SELECT is not allowed in a batch".to_owned()));
            }
            staged.run(statement)?;
        }
        self.tables = staged.tables;
        Ok(Vec::new())
    }

    fn run_select(&mut self, parser: &mut Parser<'_>) -> Result<Vec<Row>> {
        parser.keyword("SELECT")?;
        let mut columns = Vec::new();
        if parser.peek_sym('*') {
            parser.sym('*')?;
        } else {
            columns.push(parser.word()?);
            while parser.peek_sym(',') {
                parser.sym(',')?;
                columns.push(parser.word()?);
            }
        }
        parser.keyword("FROM")?;
        let table_name = parser.word()?;
        parser.consistency()?;
        let predicates = parse_where(parser, false)?;
        let mut limit = None;
        if parser.peek_keyword("LIMIT") {
            parser.keyword("LIMIT")?;
            let n = parser.word()?;
            limit = Some(n.parse::<usize>().map_err(|_| parser.error("bad LIMIT"))?);
        }

        let table = self.table(&table_name)?;
        let requested: Vec<&String> = columns.iter().filter(|c| *c != KEY_COLUMN).collect();
        let mut out = Vec::new();
        for (key, cells) in &table.rows {
            if !row_matches(table.layout, key, cells, &predicates) {
                continue;
            }
            if table.layout.is_cell_layout() {
                let name_filter = predicates.iter().find_map(|p| match p {
                    Predicate::Column(col, v) if col == CELL_NAME_COLUMN => Some(v),
                    _ => None,
                });
                // Selecting `column1` projects the physical cell columns;
                // any other selection names the cells to return.
                let projected = requested.iter().any(|c| *c == CELL_NAME_COLUMN);
                let with_value = !projected || requested.iter().any(|c| *c == CELL_VALUE_COLUMN);
                for (name, value) in cells {
                    if !projected && !requested.is_empty() && !requested.contains(&name) {
                        continue;
                    }
                    if name_filter.is_some_and(|wanted| wanted != name) {
                        continue;
                    }
                    let mut row = Row::new()
                        .with(KEY_COLUMN, Some(key.as_str()))
                        .with(CELL_NAME_COLUMN, Some(name.as_str()));
                    if with_value {
                        row.push(CELL_VALUE_COLUMN, Some(value.clone()));
                    }
                    out.push(row);
                }
            } else {
                let mut row = Row::new().with(KEY_COLUMN, Some(key.as_str()));
                if requested.is_empty() {
                    for (name, value) in cells {
                        row.push(name.as_str(), Some(value.clone()));
                    }
                } else {
                    for name in &requested {
                        row.push(name.as_str(), cells.get(name.as_str()).cloned());
                    }
                }
                out.push(row);
            }
        }
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn run_insert(&mut self, parser: &mut Parser<'_>) -> Result<()> {
        parser.keyword("INSERT")?;
        parser.keyword("INTO")?;
        let table_name = parser.word()?;
        let columns = parser.literal_list()?;
        parser.keyword("VALUES")?;
        let values = parser.literal_list()?;
        parser.consistency()?;
        if columns.len() != values.len() {
            return Err(parser.error("column and value counts differ"));
        }
        let mut key = None;
        let mut cells = Vec::new();
        for (column, value) in columns.into_iter().zip(values) {
            if column == KEY_COLUMN {
                key = Some(value);
            } else {
                cells.push((column, value));
            }
        }
        let key = key.ok_or_else(|| parser.error("missing KEY column"))?;
        let table = self.table_mut(&table_name)?;
        table.rows.entry(key).or_default().extend(cells);
        Ok(())
    }

    fn run_delete(&mut self, parser: &mut Parser<'_>) -> Result<()> {
        parser.keyword("DELETE")?;
        let mut columns = Vec::new();
        if !parser.peek_keyword("FROM") {
            columns.push(parser.literal()?);
            while parser.peek_sym(',') {
                parser.sym(',')?;
                columns.push(parser.literal()?);
            }
        }
        parser.keyword("FROM")?;
        let table_name = parser.word()?;
        parser.consistency()?;
        let predicates = parse_where(parser, true)?;
        let keys = match predicates.as_slice() {
            [Predicate::Keys(keys)] => keys.clone(),
            _ => return Err(parser.error("DELETE requires a KEY predicate only")),
        };
        let table = self.table_mut(&table_name)?;
        for key in keys {
            if columns.is_empty() {
                table.rows.remove(&key);
            } else if let Some(cells) = table.rows.get_mut(&key) {
                for column in &columns {
                    cells.remove(column);
                }
            }
        }
        Ok(())
    }
}

fn parse_where(parser: &mut Parser<'_>, required: bool) -> Result<Vec<Predicate>> {
    let mut predicates = Vec::new();
    if !parser.peek_keyword("WHERE") {
        if required {
            return Err(parser.error("expected WHERE"));
        }
        return Ok(predicates);
    }
    parser.keyword("WHERE")?;
    loop {
        let column = parser.word()?;
        let predicate = if parser.peek_keyword("IN") {
            parser.keyword("IN")?;
            if column != KEY_COLUMN {
                return Err(parser.error("IN is only supported on KEY"));
            }
            Predicate::Keys(parser.literal_list()?)
        } else {
            parser.sym('=')?;
            let value = parser.literal()?;
            if column == KEY_COLUMN {
                Predicate::Keys(vec![value])
            } else {
                Predicate::Column(column, value)
            }
        };
        predicates.push(predicate);
        if parser.peek_keyword("AND") {
            parser.keyword("AND")?;
        } else {
            break;
        }
    }
    Ok(predicates)
}

fn row_matches(layout: RowLayout, key: &str, cells: &Cells, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|predicate| match predicate {
        Predicate::Keys(keys) => keys.iter().any(|k| k == key),
        Predicate::Column(column, _) if layout.is_cell_layout() && column == CELL_NAME_COLUMN => true,
        Predicate::Column(column, value) => cells.get(column) == Some(value),
    })
}

fn driver_error(message: String) -> WidecolError {
    WidecolError::connection(std::io::Error::new(std::io::ErrorKind::Other, message))
}

impl Connection for MemoryConnection {
    fn execute(&mut self, cql: &str) -> Result<Vec<Row>> {
        if let Some(message) = self.fail_next.take() {
            return Err(driver_error(message));
        }
        self.run(cql)
    }

    fn page_keys(
        &mut self,
        table: &str,
        page_size: Option<usize>,
        cursor: Option<&Cursor>,
    ) -> Result<KeyPage> {
        self.page_requests += 1;
        let after = match cursor {
            Some(cursor) => Some(
                String::from_utf8(cursor.paging_state()?)
                    .map_err(|_| WidecolError::invalid("cursor is not a row key"))?,
            ),
            None => None,
        };
        let table = self.table(table)?;
        let candidates = table
            .rows
            .iter()
            .filter(|(key, cells)| !cells.is_empty() && after.as_ref().map_or(true, |a| *key > a))
            .map(|(key, _)| RecordId::from(key.as_str()));
        let ids: Vec<RecordId> = match page_size {
            Some(size) => candidates.take(size).collect(),
            None => candidates.collect(),
        };
        let full = page_size.is_some_and(|size| ids.len() == size);
        let next_cursor = match ids.last() {
            Some(last) if full => Some(Cursor::from_paging_state(last.as_str().as_bytes())),
            _ => None,
        };
        Ok(KeyPage { ids, next_cursor })
    }
}

/// Observer that records every statement it sees.
#[derive(Clone, Debug, Default)]
pub struct StatementLog {
    statements: Arc<Mutex<Vec<String>>>,
}

impl StatementLog {
    /// Statements seen so far, oldest first.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    /// Forgets recorded statements.
    pub fn clear(&self) {
        self.statements.lock().clear();
    }
}

impl StatementObserver for StatementLog {
    fn statement(&self, cql: &str) {
        self.statements.lock().push(cql.to_owned());
    }
}
