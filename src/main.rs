use std::env;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use medplus::config::Config;
use medplus::identity::LocalAuthProvider;
use medplus::records::RecordManager;
use medplus::storage::SqliteStorage;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--db <path>]\n\nFlags:\n  --db <path>   SQLite database file (default: MEDPLUS_DB_PATH or 'medplus.db')\n  -h, --help    Show this help"
    );
}

fn main() -> anyhow::Result<()> {
    println!(
        r"  __  __          _ ____  _
 |  \/  | ___  __| |  _ \| |_   _ ___
 | |\/| |/ _ \/ _` | |_) | | | | / __|
 | |  | |  __/ (_| |  __/| | |_| \__ \
 |_|  |_|\___|\__,_|_|   |_|\__,_|___/
        hospital records console"
    );

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let cfg = Config::from_env();
    let mut db_path = cfg.db_path;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--db" => {
                if i + 1 >= args.len() {
                    eprintln!("--db requires a value");
                    print_usage(&program);
                    std::process::exit(2);
                }
                db_path = args[i + 1].clone();
                i += 2;
                continue;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            other => {
                eprintln!("unknown flag '{}'", other);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }

    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "medplus", "MedPlus starting: RUST_LOG='{}', db='{}'", rust_log, db_path);

    let storage = Arc::new(SqliteStorage::open(&db_path)?);
    let manager = RecordManager::new(storage.clone());
    let auth = LocalAuthProvider::new(storage);
    medplus::cli::repl::run(manager, auth)
}
