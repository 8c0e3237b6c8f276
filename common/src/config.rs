use once_cell::sync::OnceCell;
use std::env;

/// Process-level configuration, loaded once at startup from `.env` + environment.
///
/// This is distinct from the persisted `Setting` rows in the `db` crate: those
/// back the scheduler/matcher knobs in the spec and can change at runtime;
/// this struct is the boot-time wiring (where the database lives, what to log,
/// which port to bind) and never changes after `init`.
#[derive(Debug)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub recognize_timeout_ms: u64,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let project_name = env::var("PROJECT_NAME").unwrap_or_else(|_| "rollcall-api".into());
            let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
            let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/api.log".into());
            let database_url =
                env::var("DATABASE_URL").unwrap_or_else(|_| "data/rollcall.sqlite".into());
            let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
            let port = env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000);
            let recognize_timeout_ms = env::var("RECOGNIZE_TIMEOUT_MS")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(5_000);

            if let Some(parent) = std::path::Path::new(&log_file).parent() {
                std::fs::create_dir_all(parent).expect("failed to create log directory");
            }

            Config {
                project_name,
                log_level,
                log_file,
                database_url,
                host,
                port,
                recognize_timeout_ms,
            }
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized, call Config::init first")
    }
}
