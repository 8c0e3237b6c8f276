use std::collections::HashMap;

/// Typed view over the persisted `settings` key/value rows (§6). Read-mostly;
/// `services::SettingsCache` is responsible for the per-tick version-counter
/// caching described in §5 — this struct is just the decoded snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub confidence_threshold: f32,
    pub late_threshold_default_minutes: i32,
    pub finalizer_buffer_minutes: i32,
    pub scheduler_tick_seconds: u64,
    pub activation_window_minutes: i32,
    pub enrollment_k_min: usize,
    pub enrollment_k_max: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.60,
            late_threshold_default_minutes: 5,
            finalizer_buffer_minutes: 5,
            scheduler_tick_seconds: 60,
            activation_window_minutes: 5,
            enrollment_k_min: 5,
            enrollment_k_max: 15,
        }
    }
}

impl Settings {
    pub fn from_rows(rows: HashMap<String, String>) -> Self {
        let mut settings = Settings::default();
        if let Some(v) = rows.get("confidence_threshold").and_then(|v| v.parse().ok()) {
            settings.confidence_threshold = v;
        }
        if let Some(v) = rows
            .get("late_threshold_default_minutes")
            .and_then(|v| v.parse().ok())
        {
            settings.late_threshold_default_minutes = v;
        }
        if let Some(v) = rows
            .get("finalizer_buffer_minutes")
            .and_then(|v| v.parse().ok())
        {
            settings.finalizer_buffer_minutes = v;
        }
        if let Some(v) = rows
            .get("scheduler_tick_seconds")
            .and_then(|v| v.parse().ok())
        {
            settings.scheduler_tick_seconds = v;
        }
        if let Some(v) = rows
            .get("activation_window_minutes")
            .and_then(|v| v.parse().ok())
        {
            settings.activation_window_minutes = v;
        }
        if let Some(v) = rows.get("enrollment_k_min").and_then(|v| v.parse().ok()) {
            settings.enrollment_k_min = v;
        }
        if let Some(v) = rows.get("enrollment_k_max").and_then(|v| v.parse().ok()) {
            settings.enrollment_k_max = v;
        }
        settings
    }
}
