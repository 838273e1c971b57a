//! Foreign key decomposition.
//!
//! Postgres reports a constraint as one definition string
//! (`pg_get_constraintdef`), which [`parse_definition`] splits into columns,
//! referenced table and actions. MySQL reports one row per key column, which
//! [`accumulate`] folds into constraints and renders back into a definition.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DriverError, DriverResult};
use crate::models::{EngineKind, ForeignKeyInfo, ReferentialAction};

/// A quoted identifier or any run of characters that are not quotes or parens.
const IDENT_LIST: &str = r#"(?:"(?:[^"]|"")*"|[^"()])+"#;

type Pattern = LazyLock<Result<Regex, regex::Error>>;

static FK_DEFINITION: Pattern = LazyLock::new(|| {
    let table = r#"(?:"(?:[^"]|"")*"|[^"(\s])+"#;
    Regex::new(&format!(
        r"(?is)^\s*FOREIGN\s+KEY\s*\((?P<source>{list})\)\s*REFERENCES\s+(?P<table>{table})\s*\((?P<target>{list})\)(?P<rest>.*)$",
        list = IDENT_LIST,
        table = table,
    ))
});

static ON_DELETE: Pattern = LazyLock::new(|| {
    Regex::new(r"(?i)ON\s+DELETE\s+(RESTRICT|NO\s+ACTION|CASCADE|SET\s+NULL|SET\s+DEFAULT)")
});

static ON_UPDATE: Pattern = LazyLock::new(|| {
    Regex::new(r"(?i)ON\s+UPDATE\s+(RESTRICT|NO\s+ACTION|CASCADE|SET\s+NULL|SET\s+DEFAULT)")
});

fn compiled(pattern: &'static Pattern) -> DriverResult<&'static Regex> {
    pattern
        .as_ref()
        .map_err(|e| DriverError::parse("foreign key pattern", e.to_string()))
}

/// Components of a Postgres foreign key definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDefinition {
    pub source: Vec<String>,
    /// Present when the referenced table was schema-qualified
    pub schema: Option<String>,
    pub table: String,
    pub target: Vec<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

/// Parse `FOREIGN KEY (a, b) REFERENCES s.t(x, y) [ON DELETE ..] [ON UPDATE ..]`.
///
/// Identifiers come back unquoted. Missing actions default to `NO ACTION`.
pub fn parse_definition(definition: &str) -> DriverResult<ParsedDefinition> {
    let caps = compiled(&FK_DEFINITION)?
        .captures(definition)
        .ok_or_else(|| DriverError::parse("foreign key definition", definition))?;

    let source = split_identifier_list(&caps["source"]);
    let target = split_identifier_list(&caps["target"]);
    if source.is_empty() || source.len() != target.len() {
        return Err(DriverError::parse("foreign key definition", definition));
    }

    let (schema, table) = split_qualified_name(&caps["table"]);
    let rest = &caps["rest"];

    Ok(ParsedDefinition {
        source,
        schema,
        table,
        target,
        on_delete: find_action(compiled(&ON_DELETE)?, rest)?,
        on_update: find_action(compiled(&ON_UPDATE)?, rest)?,
    })
}

fn find_action(pattern: &Regex, text: &str) -> DriverResult<ReferentialAction> {
    match pattern.captures(text) {
        Some(caps) => {
            let normalized = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
            normalized.parse()
        }
        None => Ok(ReferentialAction::NoAction),
    }
}

/// Split a comma-separated identifier list, honoring double quotes.
pub fn split_identifier_list(list: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in list.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                items.push(unquote(current.trim()));
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        items.push(unquote(current.trim()));
    }
    items.retain(|item| !item.is_empty());
    items
}

/// Split `schema.table`, honoring double quotes.
pub fn split_qualified_name(name: &str) -> (Option<String>, String) {
    let mut in_quotes = false;
    let mut dot = None;
    for (i, ch) in name.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => dot = Some(i),
            _ => {}
        }
    }

    match dot {
        Some(i) => (
            Some(unquote(name[..i].trim())),
            unquote(name[i + 1..].trim()),
        ),
        None => (None, unquote(name.trim())),
    }
}

/// Strip surrounding double quotes and collapse doubled inner quotes.
fn unquote(ident: &str) -> String {
    if ident.len() >= 2 && ident.starts_with('"') && ident.ends_with('"') {
        ident[1..ident.len() - 1].replace("\"\"", "\"")
    } else {
        ident.to_string()
    }
}

/// One row of MySQL's per-column foreign key listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyColumn {
    pub conname: String,
    pub source: String,
    pub ref_schema: String,
    pub ref_table: String,
    pub target: String,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

/// Fold per-column rows into constraints, in first-seen order.
///
/// The definition is rendered once all columns are known, so composite keys
/// list every column.
pub fn accumulate(rows: Vec<ForeignKeyColumn>) -> Vec<ForeignKeyInfo> {
    let mut keys: Vec<ForeignKeyInfo> = Vec::new();

    for row in rows {
        match keys.iter_mut().find(|k| k.conname == row.conname) {
            Some(key) => {
                key.source.push(row.source);
                key.target.push(row.target);
            }
            None => keys.push(ForeignKeyInfo {
                conname: row.conname,
                // MySQL constraints are never deferrable
                deferrable: false,
                definition: String::new(),
                source: vec![row.source],
                ns: row.ref_schema,
                table: row.ref_table,
                target: vec![row.target],
                on_delete: row.on_delete,
                on_update: row.on_update,
            }),
        }
    }

    for key in &mut keys {
        key.definition = render_definition(EngineKind::MySql, key);
    }
    keys
}

/// Render a definition in the shape Postgres reports it.
pub fn render_definition(engine: EngineKind, key: &ForeignKeyInfo) -> String {
    let columns = |cols: &[String]| {
        cols.iter()
            .map(|c| engine.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
        columns(&key.source),
        engine.quote_ident(&key.table),
        columns(&key.target),
        key.on_delete,
        key.on_update,
    )
}
