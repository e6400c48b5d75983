use super::*;
use serde_json::json;

#[test]
fn bootstrap_creates_all_tables() {
    let store = SqliteStorage::open_in_memory().unwrap();
    for table in ["hospitals", "personal_contacts", "emergency_contacts", "users"] {
        let rows = store
            .fetch_all(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                &[json!(table)],
            )
            .unwrap();
        assert_eq!(rows.len(), 1, "missing table {}", table);
    }
}

#[test]
fn bootstrap_is_idempotent_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("medplus.db");
    {
        let store = SqliteStorage::open(&path).unwrap();
        let n = store
            .execute(
                "INSERT INTO hospitals (name, address, contact) VALUES (?, ?, ?)",
                &[json!("General"), json!("Main St"), json!("555-1234")],
            )
            .unwrap();
        assert_eq!(n, 1);
    }
    // Re-opening must not clobber existing rows
    let store = SqliteStorage::open(&path).unwrap();
    let rows = store.fetch_all("SELECT name FROM hospitals", &[]).unwrap();
    assert_eq!(rows, vec![vec![json!("General")]]);
}

#[test]
fn execute_reports_affected_rows() {
    let store = SqliteStorage::open_in_memory().unwrap();
    for name in ["a", "b", "c"] {
        store
            .execute(
                "INSERT INTO personal_contacts (name, contact_no) VALUES (?, ?)",
                &[json!(name), json!("123")],
            )
            .unwrap();
    }
    let n = store
        .execute("UPDATE personal_contacts SET contact_no = ?", &[json!("999")])
        .unwrap();
    assert_eq!(n, 3);
    let n = store
        .execute("DELETE FROM personal_contacts WHERE name = ?", &[json!("zzz")])
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn fetch_all_preserves_projection_order_and_types() {
    let store = SqliteStorage::open_in_memory().unwrap();
    store
        .execute(
            "INSERT INTO hospitals (name, address, contact) VALUES (?, ?, ?)",
            &[json!("City"), json!("High St"), json!("555-0000")],
        )
        .unwrap();
    let rows = store
        .fetch_all("SELECT id, name, address, contact FROM hospitals", &[])
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(row[0].is_i64(), "id should come back as an integer");
    assert_eq!(row[1], json!("City"));
    assert_eq!(row[2], json!("High St"));
    assert_eq!(row[3], json!("555-0000"));
}

#[test]
fn null_and_numeric_params_round_trip() {
    let store = SqliteStorage::open_in_memory().unwrap();
    let rows = store
        .fetch_all("SELECT ?, ?, ?", &[json!(42), json!(1.5), Value::Null])
        .unwrap();
    assert_eq!(rows, vec![vec![json!(42), json!(1.5), Value::Null]]);
}

#[test]
fn bad_sql_surfaces_storage_error() {
    let store = SqliteStorage::open_in_memory().unwrap();
    let err = store.fetch_all("SELECT * FROM no_such_table", &[]).unwrap_err();
    assert!(matches!(err, crate::error::AppError::Storage { .. }));
    assert!(err.message().contains("no_such_table"));
}
