use std::path::PathBuf;

use directories::ProjectDirs;

pub const LOG_FILE: &str = "tomatick.log";

/// `--data-dir` (or `TOMATICK_DATA_DIR`, resolved by clap) wins, then the
/// platform data directory, then `./tomatick`.
pub fn resolve_data_dir(cli_value: Option<PathBuf>) -> PathBuf {
    if let Some(p) = cli_value {
        return p;
    }
    default_data_dir().unwrap_or_else(|| PathBuf::from(".").join("tomatick"))
}

pub fn default_data_dir() -> Option<PathBuf> {
    let pd = ProjectDirs::from("dev", "tomatick", "tomatick")?;
    Some(pd.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let p = PathBuf::from("/tmp/somewhere");
        assert_eq!(resolve_data_dir(Some(p.clone())), p);
    }

    #[test]
    fn default_ends_in_app_name() {
        let dir = resolve_data_dir(None);
        assert!(dir.to_string_lossy().to_lowercase().contains("tomatick"));
    }
}
