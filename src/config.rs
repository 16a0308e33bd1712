use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the reconciliation engine. The defaults match the behavior
/// of the shipping app; tests override individual fields.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Two capture events whose creation times differ by less than this are
    /// treated as the same artifact when their paths differ (rename
    /// detection).
    pub rename_tolerance: Duration,
    /// The periodic dedupe sweep only runs once the store holds at least
    /// this many entries.
    pub sweep_min_entries: usize,
    /// Minimum spacing between two dedupe sweeps.
    pub sweep_interval: Duration,
    /// How long a producer-reported error stays visible in transient status.
    pub error_display_window: Duration,
    /// Capacity of the bounded ingest channel.
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rename_tolerance: Duration::from_secs(2),
            sweep_min_entries: 50,
            sweep_interval: Duration::from_secs(30),
            error_display_window: Duration::from_secs(5),
            event_channel_capacity: 256,
        }
    }
}

/// Resolves the default on-disk database location, creating the data
/// directory if needed.
pub fn default_db_path() -> std::io::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "chronicle").ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no home directory available")
    })?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.join("chronicle.db"))
}
