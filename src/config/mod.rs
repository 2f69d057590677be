//! Warehouse configuration.
//!
//! A YAML file with one mapping per section:
//!
//! ```yaml
//! cluster:
//!   host: dwhcluster.abc123.us-west-2.redshift.amazonaws.com
//!   db_name: dwh
//!   db_user: dwhuser
//!   db_password: ${DWH_DB_PASSWORD}
//!   db_port: 5439
//! iam_role:
//!   arn: arn:aws:iam::123456789012:role/dwhRole
//! s3:
//!   log_data: s3://udacity-dend/log_data
//!   log_jsonpath: s3://udacity-dend/log_json_path.json
//!   song_data: s3://udacity-dend/song_data
//! ```
//!
//! `s3.region`, `cluster.sslmode` and the whole `etl` section are optional.
//! Section and key names are case-insensitive; values are kept as written.

pub mod sections;
mod vars;

pub use sections::Sections;

use crate::error::ConfigError;
use crate::schema::Dialect;
use crate::transform::SongplayDedup;
use crate::warehouse::CommitMode;
use serde::Deserialize;
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "DWH_CONFIG";
/// Config file used when `DWH_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "dwh.yaml";
pub const DEFAULT_REGION: &str = "us-west-2";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub iam_role_arn: String,
    pub storage: StorageConfig,
    pub etl: EtlOptions,
}

#[derive(Clone, PartialEq)]
pub struct ClusterConfig {
    pub host: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_port: u16,
    pub ssl_mode: SslMode,
}

// hand-written so the password never reaches a log line
impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &"***")
            .field("db_port", &self.db_port)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Where the raw JSON lives in S3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub log_data: String,
    pub log_jsonpath: String,
    pub song_data: String,
    pub region: String,
}

/// libpq-style `sslmode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Disable,
    Allow,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct EtlOptions {
    pub dialect: Dialect,
    pub commit: CommitMode,
    pub songplay_dedup: SongplayDedup,
}

// On-disk layout. Every field defaults so that a missing key is reported
// as `MissingKey` by `Config::from_file` rather than as a parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    cluster: ClusterSection,
    iam_role: IamRoleSection,
    s3: S3Section,
    etl: EtlOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClusterSection {
    host: String,
    db_name: String,
    db_user: String,
    db_password: String,
    db_port: String,
    sslmode: SslMode,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IamRoleSection {
    arn: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct S3Section {
    log_data: String,
    log_jsonpath: String,
    song_data: String,
    region: Option<String>,
}

impl Config {
    /// Load from `$DWH_CONFIG`, falling back to `./dwh.yaml`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let sections = load_sections(path)?;
        debug!(
            path = %path.display(),
            sections = ?sections.names().collect::<Vec<_>>(),
            "config sections loaded"
        );
        Self::from_sections(&sections)
    }

    pub fn from_sections(sections: &Sections) -> Result<Self, ConfigError> {
        let file: ConfigFile = sections
            .to_value()
            .and_then(serde_yaml::from_value)
            .map_err(|source| ConfigError::Layout { source })?;
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let ConfigFile {
            cluster,
            iam_role,
            s3,
            etl,
        } = file;

        let db_port = required("cluster", "db_port", cluster.db_port)?;
        let cluster = ClusterConfig {
            host: required("cluster", "host", cluster.host)?,
            db_name: required("cluster", "db_name", cluster.db_name)?,
            db_user: required("cluster", "db_user", cluster.db_user)?,
            db_password: required("cluster", "db_password", cluster.db_password)?,
            db_port: db_port.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    section: "cluster".to_string(),
                    key: "db_port".to_string(),
                    reason: e.to_string(),
                }
            })?,
            ssl_mode: cluster.sslmode,
        };

        let storage = StorageConfig {
            log_data: required("s3", "log_data", s3.log_data)?,
            log_jsonpath: required("s3", "log_jsonpath", s3.log_jsonpath)?,
            song_data: required("s3", "song_data", s3.song_data)?,
            region: s3.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
        };

        Ok(Self {
            cluster,
            iam_role_arn: required("iam_role", "arn", iam_role.arn)?,
            storage,
            etl,
        })
    }
}

#[cfg(test)]
impl Config {
    pub(crate) fn sample() -> Self {
        Config {
            cluster: ClusterConfig {
                host: "localhost".into(),
                db_name: "dwh".into(),
                db_user: "etl".into(),
                db_password: "pw".into(),
                db_port: 5439,
                ssl_mode: SslMode::Prefer,
            },
            iam_role_arn: "arn:aws:iam::123456789012:role/dwhRole".into(),
            storage: StorageConfig {
                log_data: "s3://udacity-dend/log_data".into(),
                log_jsonpath: "s3://udacity-dend/log_json_path.json".into(),
                song_data: "s3://udacity-dend/song_data".into(),
                region: DEFAULT_REGION.into(),
            },
            etl: EtlOptions::default(),
        }
    }
}

/// Read, interpolate and split `path` into its sections.
pub fn load_sections(path: &Path) -> Result<Sections, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let text = vars::interpolate(&raw).map_err(|errors| ConfigError::Interpolation { errors })?;

    Sections::from_yaml(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn required(section: &str, key: &str, value: String) -> Result<String, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
CLUSTER:
  HOST: dwhcluster.example.us-west-2.redshift.amazonaws.com
  DB_NAME: dwh
  DB_USER: dwhuser
  DB_PASSWORD: Passw0rd
  DB_PORT: 5439
IAM_ROLE:
  ARN: "'arn:aws:iam::123456789012:role/dwhRole'"
S3:
  LOG_DATA: "'s3://udacity-dend/log_data'"
  LOG_JSONPATH: "'s3://udacity-dend/log_json_path.json'"
  SONG_DATA: "'s3://udacity-dend/song_data'"
"#;

    fn write_config(body: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_legacy_style_config_with_defaults() {
        let f = write_config(FULL);
        let cfg = Config::load(f.path()).unwrap();

        assert_eq!(cfg.cluster.db_port, 5439);
        assert_eq!(cfg.cluster.db_name, "dwh");
        assert_eq!(cfg.cluster.ssl_mode, SslMode::Prefer);
        assert_eq!(cfg.iam_role_arn, "arn:aws:iam::123456789012:role/dwhRole");
        assert_eq!(cfg.storage.log_data, "s3://udacity-dend/log_data");
        assert_eq!(cfg.storage.region, DEFAULT_REGION);
        assert_eq!(cfg.etl, EtlOptions::default());
        assert_eq!(cfg.etl.dialect, Dialect::Redshift);
        assert_eq!(cfg.etl.commit, CommitMode::PerStatement);
        assert_eq!(cfg.etl.songplay_dedup, SongplayDedup::User);
    }

    #[test]
    fn reads_etl_options() {
        let body = format!(
            "{FULL}etl:\n  dialect: postgres\n  commit: atomic\n  songplay_dedup: event\n"
        );
        let f = write_config(&body);
        let cfg = Config::load(f.path()).unwrap();
        assert_eq!(cfg.etl.dialect, Dialect::Postgres);
        assert_eq!(cfg.etl.commit, CommitMode::Atomic);
        assert_eq!(cfg.etl.songplay_dedup, SongplayDedup::Event);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn missing_key_names_section_and_key() {
        let f = write_config(&FULL.replace("  SONG_DATA: \"'s3://udacity-dend/song_data'\"\n", ""));
        let err = Config::load(f.path()).unwrap_err();
        match err {
            ConfigError::MissingKey { section, key } => {
                assert_eq!(section, "s3");
                assert_eq!(key, "song_data");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_port_is_invalid_value() {
        let f = write_config(&FULL.replace("DB_PORT: 5439", "DB_PORT: redshift"));
        let err = Config::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "db_port"));
    }

    #[test]
    fn unknown_dialect_is_a_layout_error() {
        let f = write_config(&format!("{FULL}etl:\n  dialect: oracle\n"));
        let err = Config::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Layout { .. }));
    }

    #[test]
    fn credentials_that_look_numeric_are_kept_verbatim() {
        for pw in ["0x1F", "1e3", "+12", "1.50", "0o17"] {
            let f = write_config(&FULL.replace("Passw0rd", pw).replace("DB_USER: dwhuser", "DB_USER: 007"));
            let cfg = Config::load(f.path()).unwrap();
            assert_eq!(cfg.cluster.db_password, pw);
            assert_eq!(cfg.cluster.db_user, "007");
        }
    }

    #[test]
    fn mixed_case_keys_and_sslmode() {
        let body = FULL.replace("DB_PORT: 5439", "Db_Port: 5439\n  SslMode: verify-full");
        let f = write_config(&body);
        let cfg = Config::load(f.path()).unwrap();
        assert_eq!(cfg.cluster.db_port, 5439);
        assert_eq!(cfg.cluster.ssl_mode, SslMode::VerifyFull);
    }

    #[test]
    fn unset_env_var_is_an_interpolation_error() {
        let f = write_config(&FULL.replace("Passw0rd", "${SPARKIFY_TEST_SURELY_UNSET_PW}"));
        let err = Config::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Interpolation { .. }));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let f = write_config("cluster: [unterminated\n");
        let err = Config::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn debug_output_hides_password() {
        let f = write_config(FULL);
        let cfg = Config::load(f.path()).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("Passw0rd"));
        assert!(rendered.contains("***"));
    }
}
