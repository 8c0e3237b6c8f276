pub mod models;
pub mod settings;
pub mod store;
pub mod test_utils;

pub use settings::Settings;
pub use store::{EnrollmentMode, Store};

use migration::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

/// Connects to the configured SQLite database, running migrations, and
/// returns a ready-to-use connection. `database_url` is a filesystem path (as
/// in the teacher's convention); the `sqlite://` scheme and `mode=rwc` query
/// are added here so callers just point at a file.
pub async fn connect(database_url: &str) -> DatabaseConnection {
    if let Some(parent) = std::path::Path::new(database_url).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).expect("failed to create database directory");
        }
    }

    let connection_str = format!("sqlite://{}?mode=rwc", database_url);
    let mut opt = ConnectOptions::new(connection_str);
    opt.max_connections(num_cpus() * 2)
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("failed to connect to the database");

    Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");

    db
}

fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(4)
}
