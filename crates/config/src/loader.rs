use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::RelayConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "smsrelay.toml",
    "smsrelay.yaml",
    "smsrelay.yml",
    "smsrelay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<RelayConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./smsrelay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/smsrelay/smsrelay.{toml,yaml,yml,json}` (user-global)
///
/// Returns `RelayConfig::default()` when no file exists. A file that exists
/// but cannot be loaded is an error: the relay refuses to start on a broken
/// config rather than silently falling back to defaults.
pub fn discover_and_load() -> Result<RelayConfig> {
    match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(RelayConfig::default())
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/smsrelay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "smsrelay").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<RelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest, std::io::Write};

    fn write_config(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[rstest]
    #[case("smsrelay.toml", "[irc]\nnick = \"pager\"\n")]
    #[case("smsrelay.yaml", "irc:\n  nick: pager\n")]
    #[case("smsrelay.yml", "irc:\n  nick: pager\n")]
    #[case("smsrelay.json", r#"{"irc": {"nick": "pager"}}"#)]
    fn loads_every_supported_format(#[case] name: &str, #[case] contents: &str) {
        let (_dir, path) = write_config(name, contents);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.irc.nick, "pager");
        assert_eq!(cfg.irc.channel, "#soulhack");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let (_dir, path) = write_config("smsrelay.ini", "nick=pager");
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { extension }) if extension == "ini"
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let (_dir, path) = write_config("smsrelay.toml", "[irc\nnick = ");
        assert!(matches!(load_config(&path), Err(Error::Parse { .. })));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn fallback_placeholder_is_substituted_before_parsing() {
        let (_dir, path) = write_config(
            "smsrelay.toml",
            "[irc]\nport = ${SMSRELAY_TEST_UNSET_PORT:-7000}\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.irc.port, 7000);
    }
}
