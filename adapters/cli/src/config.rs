//! `isocity.toml` parsing and resolution of resource paths.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

const SUPPORTED_CONFIG_VERSION: u32 = 1;
const DEFAULT_CONFIG_PATH: &str = "isocity.toml";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    version: u32,
    #[serde(default)]
    paths: PathsSection,
    #[serde(default)]
    log: LogSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathsSection {
    map: Option<PathBuf>,
    buildings: Option<PathBuf>,
    atlas: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogSection {
    filter: Option<String>,
}

/// Resolved configuration with command-line overrides applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Config {
    map: Option<PathBuf>,
    buildings: Option<PathBuf>,
    atlas: Option<PathBuf>,
    log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map: None,
            buildings: None,
            atlas: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

impl Config {
    /// Loads `explicit`, or `isocity.toml` from the working directory when it
    /// exists.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        parse_config(&contents, base)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Replaces configured paths with the ones given on the command line.
    #[must_use]
    pub(crate) fn with_overrides(
        mut self,
        map: Option<PathBuf>,
        buildings: Option<PathBuf>,
        atlas: Option<PathBuf>,
    ) -> Self {
        self.map = map.or(self.map);
        self.buildings = buildings.or(self.buildings);
        self.atlas = atlas.or(self.atlas);
        self
    }

    pub(crate) fn map(&self) -> Result<&Path> {
        required(self.map.as_deref(), "map", "--map")
    }

    pub(crate) fn buildings(&self) -> Result<&Path> {
        required(self.buildings.as_deref(), "buildings", "--buildings")
    }

    pub(crate) fn atlas(&self) -> Result<&Path> {
        required(self.atlas.as_deref(), "atlas", "--atlas")
    }

    pub(crate) fn log_filter(&self) -> &str {
        &self.log_filter
    }
}

fn required<'a>(path: Option<&'a Path>, key: &str, flag: &str) -> Result<&'a Path> {
    match path {
        Some(path) => Ok(path),
        None => bail!("no {key} path configured; pass {flag} or set paths.{key}"),
    }
}

fn parse_config(contents: &str, base_path: &Path) -> Result<Config> {
    let file: ConfigFile =
        toml::from_str(contents).context("failed to parse config toml contents")?;
    if file.version != SUPPORTED_CONFIG_VERSION {
        bail!(
            "unsupported config version {}; expected {}",
            file.version,
            SUPPORTED_CONFIG_VERSION
        );
    }
    let resolve = |path: Option<PathBuf>| path.map(|path| base_path.join(path));
    Ok(Config {
        map: resolve(file.paths.map),
        buildings: resolve(file.paths.buildings),
        atlas: resolve(file.paths.atlas),
        log_filter: file
            .log
            .filter
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_relative_to_the_config_directory() {
        let config = r#"
            version = 1

            [paths]
            map = "maps/island.json"
            buildings = "data/buildings.json"
            atlas = "/srv/atlas.json"

            [log]
            filter = "isocity_world=debug"
        "#;

        let parsed = parse_config(config, Path::new("root")).expect("config should parse");
        assert_eq!(
            parsed.map().expect("map"),
            Path::new("root/maps/island.json")
        );
        assert_eq!(
            parsed.buildings().expect("buildings"),
            Path::new("root/data/buildings.json")
        );
        assert_eq!(parsed.atlas().expect("atlas"), Path::new("/srv/atlas.json"));
        assert_eq!(parsed.log_filter(), "isocity_world=debug");
    }

    #[test]
    fn unsupported_versions_are_rejected() {
        let result = parse_config("version = 2", Path::new(""));
        assert!(result.is_err(), "only version 1 configs are understood");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let config = r#"
            version = 1

            [paths]
            tiles = "tiles.json"
        "#;
        assert!(
            parse_config(config, Path::new("")).is_err(),
            "misspelled keys must not be silently ignored"
        );
    }

    #[test]
    fn command_line_paths_override_the_file() {
        let parsed = parse_config(
            "version = 1\n[paths]\nmap = \"a.json\"\n",
            Path::new("cfg"),
        )
        .expect("config should parse")
        .with_overrides(Some(PathBuf::from("b.json")), None, None);

        assert_eq!(parsed.map().expect("map"), Path::new("b.json"));
        assert!(parsed.buildings().is_err(), "buildings stay unset");
        assert_eq!(parsed.log_filter(), "info");
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let directory = tempfile::tempdir().expect("temp dir");
        let path = directory.path().join("absent.toml");
        assert!(
            Config::load(Some(&path)).is_err(),
            "an explicitly requested config must exist"
        );
    }

    #[test]
    fn explicit_config_is_read_from_disk() {
        let directory = tempfile::tempdir().expect("temp dir");
        let path = directory.path().join("isocity.toml");
        fs::write(&path, "version = 1\n[paths]\natlas = \"atlas.json\"\n").expect("write");

        let config = Config::load(Some(&path)).expect("loads");
        assert_eq!(
            config.atlas().expect("atlas"),
            directory.path().join("atlas.json")
        );
    }
}
