use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{env_subst::substitute_env, schema::BackchannelConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "backchannel.toml",
    "backchannel.yaml",
    "backchannel.yml",
    "backchannel.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<BackchannelConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Find the first config file in standard locations.
///
/// Search order:
/// 1. `./backchannel.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/backchannel/backchannel.{toml,yaml,yml,json}` (user-global)
pub fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            debug!(path = %p.display(), "using project-local config");
            return Some(p);
        }
    }

    // User-global: ~/.config/backchannel/
    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/backchannel/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "backchannel").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<BackchannelConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("backchannel.toml");
        std::fs::write(&path, "[destinations.dm]\nenabled = true\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert!(cfg.destinations.dm.enabled);
    }

    #[test]
    fn parses_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("backchannel.json");
        std::fs::write(&path, r#"{"features":{"reply_resume":true}}"#).unwrap();
        let cfg = load_config(&path).unwrap();
        assert!(cfg.features.reply_resume);
    }

    #[test]
    fn missing_file_errors() {
        assert!(load_config(Path::new("/nonexistent/backchannel.toml")).is_err());
    }

    #[test]
    fn rejects_unknown_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("backchannel.ini");
        std::fs::write(&path, "x").unwrap();
        assert!(load_config(&path).is_err());
    }
}
