use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "placement";
const SEED_FILES: [&str; 2] = ["companies.json", "experiences.json"];

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub tips_model: Option<String>,
}

impl Config {
    pub fn resolve(data_dir: Option<PathBuf>, tips_model: Option<String>) -> Self {
        let data_dir = data_dir.or_else(|| default_data_dir().filter(|d| has_seed_files(d)));
        debug!(data_dir = ?data_dir, tips_model = ?tips_model, "config resolved");
        Self {
            data_dir,
            tips_model: tips_model.filter(|m| !m.trim().is_empty()),
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn tips_model(&self) -> Option<&str> {
        self.tips_model.as_deref()
    }
}

fn default_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().to_path_buf())
}

fn has_seed_files(dir: &Path) -> bool {
    SEED_FILES.iter().any(|f| dir.join(f).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_data_dir_wins() {
        let config = Config::resolve(Some(PathBuf::from("/tmp/seed")), None);
        assert_eq!(config.data_dir(), Some(Path::new("/tmp/seed")));
        assert_eq!(config.tips_model(), None);
    }

    #[test]
    fn test_blank_tips_model_is_ignored() {
        let config = Config::resolve(Some(PathBuf::from("/tmp/seed")), Some("  ".to_string()));
        assert_eq!(config.tips_model(), None);

        let config = Config::resolve(None, Some("gemini-flash".to_string()));
        assert_eq!(config.tips_model(), Some("gemini-flash"));
    }

    #[test]
    fn test_seed_files_detection() {
        let dir = std::env::temp_dir().join(format!("placement-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(!has_seed_files(&dir));

        std::fs::write(dir.join("experiences.json"), "[]").unwrap();
        assert!(has_seed_files(&dir));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
