//! Warehouse DDL and the index lifecycle.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{error, info, warn};

pub const FACT_SALES: &str = "fact_sales";
pub const DIM_CUSTOMER: &str = "dim_customer";
pub const DIM_PRODUCT: &str = "dim_product";

pub(crate) const CREATE_DIM_CUSTOMER: &str = "CREATE TABLE dim_customer (
    CustomerID INTEGER PRIMARY KEY,
    Country TEXT NOT NULL
)";

pub(crate) const CREATE_DIM_PRODUCT: &str = "CREATE TABLE dim_product (
    StockCode TEXT PRIMARY KEY,
    Description TEXT NOT NULL
)";

pub(crate) const CREATE_FACT_SALES: &str = "CREATE TABLE fact_sales (
    InvoiceNo TEXT NOT NULL,
    InvoiceDate TEXT NOT NULL,
    CustomerID INTEGER,
    StockCode TEXT NOT NULL,
    Quantity INTEGER NOT NULL,
    UnitPrice REAL NOT NULL,
    total_amount REAL NOT NULL,
    UNIQUE (InvoiceNo, StockCode)
)";

/// Indexes created when no schema script is available.
pub const DEFAULT_INDEXES: [&str; 3] = [
    "CREATE INDEX idx_fact_date ON fact_sales(InvoiceDate)",
    "CREATE INDEX idx_fact_customer ON fact_sales(CustomerID)",
    "CREATE INDEX idx_fact_product ON fact_sales(StockCode)",
];

/// Where the index statements of a first-run pass came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSource {
    /// The built-in [`DEFAULT_INDEXES`].
    Default,
    /// A schema script, applied verbatim.
    Script(PathBuf),
}

impl fmt::Display for IndexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default indexes"),
            Self::Script(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Result of executing one index statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    Created,
    /// The object already existed; not an error.
    AlreadyExists,
    /// Any other failure. Logged and reported, never fatal.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub statement: String,
    pub outcome: IndexOutcome,
}

/// The single index pass performed on a first run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPass {
    pub source: IndexSource,
    pub reports: Vec<IndexReport>,
}

impl IndexPass {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, IndexOutcome::Created))
    }

    pub fn already_existed(&self) -> usize {
        self.count(|o| matches!(o, IndexOutcome::AlreadyExists))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, IndexOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&IndexOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Resolve the statements for the index pass.
///
/// A configured script that exists and is readable wins. A missing script, an unreadable one
/// (logged at error level) or one without statements falls back to [`DEFAULT_INDEXES`].
pub fn resolve_index_statements(script: Option<&Path>) -> (IndexSource, Vec<String>) {
    let defaults = || {
        (
            IndexSource::Default,
            DEFAULT_INDEXES.iter().map(|s| s.to_string()).collect(),
        )
    };

    let Some(path) = script else {
        return defaults();
    };
    if !path.exists() {
        info!(path = %path.display(), "schema script not found, using default indexes");
        return defaults();
    }

    match fs::read_to_string(path) {
        Ok(text) => {
            let statements = split_sql_script(&text);
            if statements.is_empty() {
                warn!(path = %path.display(), "schema script has no statements, using default indexes");
                return defaults();
            }
            (IndexSource::Script(path.to_path_buf()), statements)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "error reading schema script, using default indexes");
            defaults()
        }
    }
}

/// Execute each statement, classifying the outcome instead of failing.
pub fn apply_index_statements(conn: &Connection, statements: &[String]) -> Vec<IndexReport> {
    statements
        .iter()
        .map(|sql| {
            let outcome = match conn.execute_batch(sql) {
                Ok(()) => IndexOutcome::Created,
                Err(e) => classify_index_error(&e),
            };
            match &outcome {
                IndexOutcome::Created => {}
                IndexOutcome::AlreadyExists => info!(statement = %sql, "index already exists"),
                IndexOutcome::Failed(msg) => error!(statement = %sql, error = %msg, "index statement failed"),
            }
            IndexReport {
                statement: sql.clone(),
                outcome,
            }
        })
        .collect()
}

fn classify_index_error(e: &rusqlite::Error) -> IndexOutcome {
    // SQLite reports duplicates as a generic SQLITE_ERROR; only the message tells them apart.
    let msg = e.to_string();
    if msg.contains("already exists") {
        IndexOutcome::AlreadyExists
    } else {
        IndexOutcome::Failed(msg)
    }
}

/// Split a script into statements, each kept verbatim apart from surrounding whitespace.
///
/// A `;` ends a statement only where SQLite itself would consider the statement complete:
/// not inside a string, quoted identifier or comment, and not inside the `BEGIN ... END`
/// body of a `CREATE TRIGGER`. Chunks holding nothing but comments are dropped; leading
/// `--` comment lines stay attached to the statement that follows them.
pub fn split_sql_script(script: &str) -> Vec<String> {
    let bytes = script.as_bytes();
    let mut statements = Vec::new();
    let mut state = State::Start;
    let mut start = 0;
    let mut has_content = false;
    let mut pos = 0;

    while pos < bytes.len() {
        let (token, next) = next_token(bytes, pos);
        state = state.advance(token);
        match token {
            Token::Semi if state == State::Start => {
                if has_content {
                    statements.push(script[start..pos].trim().to_string());
                }
                start = next;
                has_content = false;
            }
            Token::Semi | Token::Space => {}
            _ => has_content = true,
        }
        pos = next;
    }
    if has_content {
        statements.push(script[start..].trim().to_string());
    }
    statements
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Semi,
    /// Whitespace and comments.
    Space,
    Other,
    Explain,
    Create,
    Temp,
    Trigger,
    End,
}

/// Statement-completeness states, after SQLite's `sqlite3_complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Normal,
    Explain,
    Create,
    /// Inside a trigger body.
    Trigger,
    /// Trigger body, just after a `;`.
    Semi,
    /// Trigger body, just after `; END`.
    End,
}

impl State {
    fn advance(self, token: Token) -> State {
        use Token as T;
        match (self, token) {
            (State::Trigger, T::Semi) => State::Semi,
            (State::Trigger, _) => State::Trigger,
            (State::Semi, T::Semi | T::Space) => State::Semi,
            (State::Semi, T::End) => State::End,
            (State::Semi, _) => State::Trigger,
            (State::End, T::Semi) => State::Start,
            (State::End, T::Space) => State::End,
            (State::End, _) => State::Trigger,
            (_, T::Semi) => State::Start,
            (State::Start, T::Space) => State::Start,
            (State::Start, T::Explain) => State::Explain,
            (State::Start, T::Create) => State::Create,
            (State::Start, _) | (State::Normal, _) => State::Normal,
            (State::Explain, T::Space | T::Other) => State::Explain,
            (State::Explain, T::Create) => State::Create,
            (State::Explain, _) => State::Normal,
            (State::Create, T::Space | T::Temp) => State::Create,
            (State::Create, T::Trigger) => State::Trigger,
            (State::Create, _) => State::Normal,
        }
    }
}

/// Token starting at `pos` and the offset just past it.
///
/// Offsets always land on ASCII bytes or the end of input, so they are valid `str` indices.
fn next_token(bytes: &[u8], pos: usize) -> (Token, usize) {
    let rest = &bytes[pos..];
    let skip_to = |from: usize, close: &[u8]| -> usize {
        rest[from..]
            .windows(close.len())
            .position(|w| w == close)
            .map_or(bytes.len(), |i| pos + from + i + close.len())
    };
    match rest[0] {
        b';' => (Token::Semi, pos + 1),
        b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' => (Token::Space, pos + 1),
        b'-' if rest.get(1) == Some(&b'-') => (Token::Space, skip_to(2, b"\n")),
        b'/' if rest.get(1) == Some(&b'*') => (Token::Space, skip_to(2, b"*/")),
        b'[' => (Token::Other, skip_to(1, b"]")),
        q @ (b'\'' | b'"' | b'`') => (Token::Other, skip_to(1, &[q])),
        c if is_ident_byte(c) => {
            let len = rest.iter().take_while(|&&b| is_ident_byte(b)).count();
            (keyword(&rest[..len]), pos + len)
        }
        _ => (Token::Other, pos + 1),
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn keyword(word: &[u8]) -> Token {
    const KEYWORDS: [(&str, Token); 6] = [
        ("create", Token::Create),
        ("trigger", Token::Trigger),
        ("explain", Token::Explain),
        ("temp", Token::Temp),
        ("temporary", Token::Temp),
        ("end", Token::End),
    ];
    KEYWORDS
        .iter()
        .find(|(kw, _)| word.eq_ignore_ascii_case(kw.as_bytes()))
        .map_or(Token::Other, |&(_, token)| token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact_only() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_FACT_SALES).unwrap();
        conn
    }

    #[test]
    fn split_drops_empty_and_comment_only_chunks() {
        let stmts = split_sql_script("-- a\nSELECT 1;\n\n;  -- trailing only\n");
        assert_eq!(stmts, vec!["-- a\nSELECT 1".to_string()]);
    }

    #[test]
    fn split_keeps_trigger_bodies_whole() {
        let script = "CREATE TEMP TRIGGER t AFTER INSERT ON fact_sales BEGIN\n  \
                      UPDATE x SET n = n + 1;\n  DELETE FROM y;\nEND;\nSELECT 2;";
        let stmts = split_sql_script(script);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("CREATE TEMP TRIGGER"));
        assert!(stmts[0].ends_with("DELETE FROM y;\nEND"));
        assert_eq!(stmts[1], "SELECT 2");
    }

    #[test]
    fn split_ignores_semicolons_in_strings_and_comments() {
        let script = "CREATE TABLE t (a TEXT DEFAULT 'x; y', \"b;c\" INT); -- one; two\n\
                      /* three; four */ SELECT [d;e] FROM t";
        let stmts = split_sql_script(script);
        assert_eq!(
            stmts,
            vec![
                "CREATE TABLE t (a TEXT DEFAULT 'x; y', \"b;c\" INT)".to_string(),
                "-- one; two\n/* three; four */ SELECT [d;e] FROM t".to_string(),
            ]
        );
    }

    #[test]
    fn end_outside_a_trigger_is_an_ordinary_word() {
        let stmts = split_sql_script("SELECT 1 AS end; SELECT 2");
        assert_eq!(stmts, vec!["SELECT 1 AS end".to_string(), "SELECT 2".to_string()]);
    }

    #[test]
    fn default_indexes_are_created_then_already_exist() {
        let conn = fact_only();
        let stmts: Vec<String> = DEFAULT_INDEXES.iter().map(|s| s.to_string()).collect();

        let first = apply_index_statements(&conn, &stmts);
        assert!(first.iter().all(|r| r.outcome == IndexOutcome::Created));

        let second = apply_index_statements(&conn, &stmts);
        assert!(second.iter().all(|r| r.outcome == IndexOutcome::AlreadyExists));
    }

    #[test]
    fn genuine_failures_are_not_hidden() {
        let conn = fact_only();
        let reports = apply_index_statements(&conn, &["CREATE INDEX idx_x ON no_such_table(a)".to_string()]);
        assert!(matches!(reports[0].outcome, IndexOutcome::Failed(ref m) if m.contains("no such table")));
    }

    #[test]
    fn missing_script_falls_back_to_defaults() {
        let (source, stmts) = resolve_index_statements(Some(Path::new("/definitely/not/here.sql")));
        assert_eq!(source, IndexSource::Default);
        assert_eq!(stmts.len(), DEFAULT_INDEXES.len());

        let (source, _) = resolve_index_statements(None);
        assert_eq!(source, IndexSource::Default);
    }

    #[test]
    fn unreadable_script_falls_back_to_defaults() {
        // A directory exists but cannot be read as a file.
        let dir = tempfile::tempdir().unwrap();
        let (source, stmts) = resolve_index_statements(Some(dir.path()));
        assert_eq!(source, IndexSource::Default);
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn readable_script_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.sql");
        fs::write(&path, "CREATE INDEX idx_qty ON fact_sales(Quantity);\n").unwrap();
        let (source, stmts) = resolve_index_statements(Some(&path));
        assert_eq!(source, IndexSource::Script(path.clone()));
        assert_eq!(stmts, vec!["CREATE INDEX idx_qty ON fact_sales(Quantity)".to_string()]);
    }
}
