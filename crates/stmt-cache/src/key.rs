//! Statement identity keys.
//!
//! A [`StatementKey`] is the immutable, value-comparable identity of a
//! prepared or callable statement: its normalized SQL text, the catalog it
//! was prepared against (when known), the statement kind, and exactly one
//! configuration shape. Two prepare requests that a server would satisfy
//! with the same statement metadata normalize to equal keys; any
//! metadata-affecting difference yields unequal keys.

/// Whether a key identifies a prepared or a callable statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// An ordinary parameterized statement.
    Prepared,
    /// A stored-procedure call.
    Callable,
}

/// Whether a statement returns server-generated keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoGeneratedKeys {
    /// Generated keys are made available after execution.
    Return,
    /// Generated keys are not requested.
    NoReturn,
}

/// Cursor traversal capability requested for a statement's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultSetType {
    /// The cursor may only move forward.
    ForwardOnly,
    /// Scrollable, insensitive to concurrent changes.
    ScrollInsensitive,
    /// Scrollable, sensitive to concurrent changes.
    ScrollSensitive,
}

/// Concurrency mode requested for a statement's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concurrency {
    /// Results may only be read.
    ReadOnly,
    /// Results may be updated in place.
    Updatable,
}

/// Cursor holdability across transaction commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Holdability {
    /// Cursors stay open when the transaction commits.
    HoldCursorsOverCommit,
    /// Cursors are closed when the transaction commits.
    CloseCursorsAtCommit,
}

/// The configuration shape a statement was requested with.
///
/// Exactly one shape is populated per key. Shapes are part of statement
/// identity: the same text prepared with different shapes produces distinct
/// cache entries, because the server-side metadata differs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementConfig {
    /// No additional configuration.
    Default,
    /// Auto-generated-key retrieval flag.
    GeneratedKeys(AutoGeneratedKeys),
    /// Generated keys identified by column indexes (order-sensitive).
    ColumnIndexes(Vec<u32>),
    /// Generated keys identified by column names (order-sensitive).
    ColumnNames(Vec<String>),
    /// Result-set type and concurrency.
    ResultSet {
        /// Cursor traversal capability.
        result_set_type: ResultSetType,
        /// Concurrency mode.
        concurrency: Concurrency,
    },
    /// Result-set type, concurrency, and holdability.
    ResultSetWithHoldability {
        /// Cursor traversal capability.
        result_set_type: ResultSetType,
        /// Concurrency mode.
        concurrency: Concurrency,
        /// Cursor holdability across commits.
        holdability: Holdability,
    },
}

/// Immutable identity of a cached statement.
///
/// Equality and hashing are structural over every field. The SQL text is
/// normalized at construction, so texts differing only in surrounding
/// whitespace compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementKey {
    sql: String,
    catalog: Option<String>,
    kind: StatementKind,
    config: StatementConfig,
}

impl StatementKey {
    /// Build a key from raw statement text and its creation configuration.
    ///
    /// The text is normalized (surrounding whitespace trimmed); a missing
    /// catalog is a valid, if coarser, key component.
    #[must_use]
    pub fn new(
        sql: &str,
        catalog: Option<String>,
        kind: StatementKind,
        config: StatementConfig,
    ) -> Self {
        Self {
            sql: normalize_sql(sql).to_owned(),
            catalog,
            kind,
            config,
        }
    }

    /// The normalized statement text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The catalog the statement was prepared against, when known.
    #[must_use]
    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    /// Whether this key identifies a prepared or callable statement.
    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// The configuration shape the statement was requested with.
    #[must_use]
    pub fn config(&self) -> &StatementConfig {
        &self.config
    }
}

/// Normalize statement text into the canonical form used for key identity.
///
/// Deterministic and side-effect-free: trims surrounding whitespace.
#[must_use]
pub fn normalize_sql(sql: &str) -> &str {
    sql.trim()
}
