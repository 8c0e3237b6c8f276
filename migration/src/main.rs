use migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "data/rollcall.sqlite".into());

    if let Some(parent) = std::path::Path::new(&database_url).parent() {
        std::fs::create_dir_all(parent).expect("failed to create database directory");
    }

    let connection_str = format!("sqlite://{}?mode=rwc", database_url);
    let db = sea_orm::Database::connect(&connection_str)
        .await
        .expect("failed to connect to database");

    Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");

    println!("migrations applied");
}
