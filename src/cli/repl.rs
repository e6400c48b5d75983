//!
//! medplus interactive shell
//! -------------------------
//! Line-oriented stand-in for the desktop dashboards: login/register, then
//! open one record editor at a time and list/add/edit/delete through it.
//! Table access follows the account role the way the dashboards do: USER
//! accounts manage their contact tables, ADMIN accounts manage hospitals
//! and the user list.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::{json, Value};

use crate::cli::print_records;
use crate::error::AppError;
use crate::identity::{AuthProvider, LocalAuthProvider, LoginRequest, LoginResponse, RegisterRequest, Role};
use crate::records::{RecordManager, RecordSession};
use crate::registry;

const HELP: &str = "Commands:
  register <username> <password> <USER|ADMIN>   create an account
  login <username> <password> <USER|ADMIN>      sign in
  logout                                        sign out (closes any open editor)
  tables                                        list tables available to your role
  open <table>                                  open a record editor
  close                                         close the editor
  list                                          refresh and show the table
  add                                           insert a record (prompts per field)
  edit <key> <field> <new value>                change one field of a record
  delete <key>                                  remove a record
  help                                          show this help
  quit | exit                                   leave the shell";

struct ReplState {
    manager: RecordManager,
    auth: LocalAuthProvider,
    principal: Option<LoginResponse>,
    session: Option<RecordSession>,
}

fn accessible_tables(role: Role) -> &'static [&'static str] {
    match role {
        Role::Admin => &["hospitals", "users"],
        Role::User => &["personal_contacts", "emergency_contacts"],
    }
}

pub fn run(manager: RecordManager, auth: LocalAuthProvider) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut state = ReplState { manager, auth, principal: None, session: None };

    println!("Type 'help' for commands. Try: login {} <password> USER", whoami::username());
    loop {
        let prompt = match (&state.principal, &state.session) {
            (_, Some(s)) => format!("medplus/{}> ", s.schema().table_id),
            (Some(p), None) => format!("medplus:{}> ", p.username),
            (None, None) => "medplus> ".to_string(),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str()).ok();
                if !dispatch(&mut state, &mut rl, &line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

// Returns false when the shell should exit.
fn dispatch(state: &mut ReplState, rl: &mut DefaultEditor, line: &str) -> bool {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let cmd = parts[0].to_ascii_lowercase();
    let result = match cmd.as_str() {
        "quit" | "exit" => return false,
        "help" => {
            println!("{}", HELP);
            Ok(())
        }
        "register" => cmd_register(state, &parts),
        "login" => cmd_login(state, &parts),
        "logout" => {
            state.session = None;
            state.principal = None;
            Ok(())
        }
        "tables" => cmd_tables(state),
        "open" => cmd_open(state, &parts),
        "close" => {
            state.session = None;
            Ok(())
        }
        "list" => cmd_list(state),
        "add" => cmd_add(state, rl),
        "edit" => cmd_edit(state, &parts),
        "delete" => cmd_delete(state, &parts),
        other => {
            println!("unknown command '{}'; type 'help'", other);
            Ok(())
        }
    };
    if let Err(e) = result {
        println!("error: {}", e);
    }
    true
}

fn parse_role(s: &str) -> Result<Role, AppError> {
    Role::parse(s)
        .ok_or_else(|| AppError::validation("unknown_role", format!("'{}' is not USER or ADMIN", s)))
}

// Keys are addressed by value: numeric input resolves integer ids, anything
// else resolves string keys such as usernames.
fn parse_key(s: &str) -> Value {
    match s.parse::<i64>() {
        Ok(n) => json!(n),
        Err(_) => json!(s),
    }
}

fn cmd_register(state: &mut ReplState, parts: &[&str]) -> Result<(), AppError> {
    if parts.len() != 4 {
        return Err(AppError::validation("usage", "usage: register <username> <password> <USER|ADMIN>"));
    }
    let req = RegisterRequest {
        username: parts[1].to_string(),
        password: parts[2].to_string(),
        role: parse_role(parts[3])?,
    };
    let message = state.auth.register(&req)?;
    println!("{}; please login", message);
    Ok(())
}

fn cmd_login(state: &mut ReplState, parts: &[&str]) -> Result<(), AppError> {
    if parts.len() != 4 {
        return Err(AppError::validation("usage", "usage: login <username> <password> <USER|ADMIN>"));
    }
    let req = LoginRequest {
        username: parts[1].to_string(),
        password: parts[2].to_string(),
        role: parse_role(parts[3])?,
    };
    let principal = state.auth.login(&req)?;
    println!("welcome, {} ({})", principal.username, principal.role);
    state.session = None;
    state.principal = Some(principal);
    Ok(())
}

fn require_login(state: &ReplState) -> Result<&LoginResponse, AppError> {
    state
        .principal
        .as_ref()
        .ok_or_else(|| AppError::auth("not_logged_in", "login first"))
}

fn cmd_tables(state: &ReplState) -> Result<(), AppError> {
    let principal = require_login(state)?;
    for id in accessible_tables(principal.role) {
        let schema = registry::resolve(id)?;
        let labels: Vec<&str> = schema.display_columns.iter().map(|c| c.label).collect();
        println!("{:<20} key={:<10} fields: {}", schema.table_id, schema.key_column, labels.join(", "));
    }
    Ok(())
}

fn cmd_open(state: &mut ReplState, parts: &[&str]) -> Result<(), AppError> {
    let principal = require_login(state)?;
    if parts.len() != 2 {
        return Err(AppError::validation("usage", "usage: open <table>"));
    }
    let table_id = parts[1];
    if !accessible_tables(principal.role).iter().any(|t| t.eq_ignore_ascii_case(table_id)) {
        return Err(AppError::permission_denied(
            "table_not_allowed",
            format!("table '{}' is not available to {} accounts", table_id, principal.role),
        ));
    }
    let mut session = state.manager.open(table_id)?;
    session.list()?;
    print_records(session.schema(), session.records());
    state.session = Some(session);
    Ok(())
}

fn open_session<'a>(state: &'a mut ReplState) -> Result<&'a mut RecordSession, AppError> {
    state
        .session
        .as_mut()
        .ok_or_else(|| AppError::validation("no_editor", "open a table first"))
}

fn cmd_list(state: &mut ReplState) -> Result<(), AppError> {
    let session = open_session(state)?;
    session.list()?;
    print_records(session.schema(), session.records());
    Ok(())
}

// Collect one value per editable column; abandoning input aborts the whole
// add with no side effect.
fn cmd_add(state: &mut ReplState, rl: &mut DefaultEditor) -> Result<(), AppError> {
    let session = open_session(state)?;
    let mut values: Vec<Value> = Vec::with_capacity(session.schema().display_columns.len());
    for col in session.schema().display_columns {
        match rl.readline(&format!("  {}: ", col.label)) {
            Ok(input) => values.push(json!(input.trim())),
            Err(_) => {
                println!("cancelled");
                return Ok(());
            }
        }
    }
    let record = session.add(&values)?;
    println!("added record {}", record.key());
    print_records(session.schema(), session.records());
    Ok(())
}

fn cmd_edit(state: &mut ReplState, parts: &[&str]) -> Result<(), AppError> {
    let session = open_session(state)?;
    if parts.len() < 4 {
        return Err(AppError::validation("usage", "usage: edit <key> <field> <new value>"));
    }
    let key = parse_key(parts[1]);
    let new_value = json!(parts[3..].join(" "));
    session.edit(&key, parts[2], &new_value)?;
    print_records(session.schema(), session.records());
    Ok(())
}

fn cmd_delete(state: &mut ReplState, parts: &[&str]) -> Result<(), AppError> {
    let session = open_session(state)?;
    if parts.len() != 2 {
        return Err(AppError::validation("usage", "usage: delete <key>"));
    }
    let key = parse_key(parts[1]);
    session.delete(&key)?;
    println!("deleted {}", parts[1]);
    print_records(session.schema(), session.records());
    Ok(())
}
