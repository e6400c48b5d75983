//!
//! medplus table registry
//! ----------------------
//! Static mapping from a logical table identifier to its record schema
//! (editable columns and identifying key column) and its permission set.
//! The registry is plain configuration: table shapes are heterogeneous and
//! small in number, so enumerating them here keeps table-specific branching
//! out of the record manager.

use crate::error::{AppError, AppResult};

/// One editable column of a table: the human-facing label used by the UI
/// layer, and the column name used in storage queries.
#[derive(Clone, Copy, Debug)]
pub struct ColumnDef {
    pub label: &'static str,
    pub storage_column: &'static str,
}

/// Per-table write permissions. List is always available for registered
/// tables; a table with all three flags off is list-only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Perms {
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
}

impl Perms {
    pub const ALL: Perms = Perms { add: true, edit: true, delete: true };
    pub const LIST_ONLY: Perms = Perms { add: false, edit: false, delete: false };
}

/// Logical operations a record session can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Add,
    Edit,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Add => "add",
            Operation::Edit => "edit",
            Operation::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry entry describing one supported table.
///
/// Invariants: `display_columns` is non-empty and never contains
/// `key_column`; the key is addressed by value so numeric and string keys
/// both work.
#[derive(Clone, Copy, Debug)]
pub struct TableSchema {
    pub table_id: &'static str,
    pub display_columns: &'static [ColumnDef],
    pub key_column: &'static str,
    pub perms: Perms,
}

impl TableSchema {
    pub fn allows(&self, op: Operation) -> bool {
        match op {
            Operation::List => true,
            Operation::Add => self.perms.add,
            Operation::Edit => self.perms.edit,
            Operation::Delete => self.perms.delete,
        }
    }

    /// Resolve a caller-supplied field name (storage column or label,
    /// case-insensitive) to its column definition.
    pub fn display_column(&self, field: &str) -> Option<&'static ColumnDef> {
        self.display_columns.iter().find(|c| {
            c.storage_column.eq_ignore_ascii_case(field) || c.label.eq_ignore_ascii_case(field)
        })
    }

    pub fn storage_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.display_columns.iter().map(|c| c.storage_column)
    }
}

const HOSPITAL_COLUMNS: &[ColumnDef] = &[
    ColumnDef { label: "Name", storage_column: "name" },
    ColumnDef { label: "Address", storage_column: "address" },
    ColumnDef { label: "Contact", storage_column: "contact" },
];

const CONTACT_COLUMNS: &[ColumnDef] = &[
    ColumnDef { label: "Name", storage_column: "name" },
    ColumnDef { label: "Contact No", storage_column: "contact_no" },
];

// The username is the key column, so List already returns it at position 0.
const USER_COLUMNS: &[ColumnDef] = &[
    ColumnDef { label: "Role", storage_column: "role" },
];

static TABLES: &[TableSchema] = &[
    TableSchema {
        table_id: "hospitals",
        display_columns: HOSPITAL_COLUMNS,
        key_column: "id",
        perms: Perms::ALL,
    },
    TableSchema {
        table_id: "personal_contacts",
        display_columns: CONTACT_COLUMNS,
        key_column: "id",
        perms: Perms::ALL,
    },
    TableSchema {
        table_id: "emergency_contacts",
        display_columns: CONTACT_COLUMNS,
        key_column: "id",
        perms: Perms::ALL,
    },
    // Accounts are managed through registration; the editor only lists them.
    TableSchema {
        table_id: "users",
        display_columns: USER_COLUMNS,
        key_column: "username",
        perms: Perms::LIST_ONLY,
    },
];

/// All registered tables, in registration order.
pub fn all() -> &'static [TableSchema] {
    TABLES
}

/// Resolve a table identifier to its schema, case-insensitively.
pub fn resolve(table_id: &str) -> AppResult<&'static TableSchema> {
    TABLES
        .iter()
        .find(|t| t.table_id.eq_ignore_ascii_case(table_id))
        .ok_or_else(|| {
            AppError::unknown_table(
                "unknown_table",
                format!("table '{}' is not registered", table_id),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_known_tables() {
        for id in ["hospitals", "personal_contacts", "emergency_contacts", "users"] {
            let t = resolve(id).unwrap();
            assert_eq!(t.table_id, id);
        }
        // Case-insensitive lookup
        assert_eq!(resolve("Hospitals").unwrap().table_id, "hospitals");
    }

    #[test]
    fn resolve_unknown_table_fails() {
        let err = resolve("wards").unwrap_err();
        assert!(matches!(err, AppError::UnknownTable { .. }));
        assert!(err.message().contains("wards"));
    }

    #[test]
    fn display_columns_nonempty_and_exclude_key() {
        for t in all() {
            assert!(!t.display_columns.is_empty(), "{} has no columns", t.table_id);
            assert!(
                t.display_columns.iter().all(|c| c.storage_column != t.key_column),
                "{} lists its key column as editable",
                t.table_id
            );
        }
    }

    #[test]
    fn users_is_list_only() {
        let t = resolve("users").unwrap();
        assert!(t.allows(Operation::List));
        assert!(!t.allows(Operation::Add));
        assert!(!t.allows(Operation::Edit));
        assert!(!t.allows(Operation::Delete));
    }

    #[test]
    fn display_column_matches_label_or_storage_name() {
        let t = resolve("personal_contacts").unwrap();
        assert_eq!(t.display_column("contact_no").unwrap().label, "Contact No");
        assert_eq!(t.display_column("Contact No").unwrap().storage_column, "contact_no");
        assert!(t.display_column("id").is_none());
        assert!(t.display_column("missing").is_none());
        // The users key column is not an editable field
        assert!(resolve("users").unwrap().display_column("username").is_none());
    }
}
