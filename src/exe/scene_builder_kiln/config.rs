use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use scene_kiln::Primitive;

pub trait TomlRead: DeserializeOwned
{
    fn load(reader: &mut impl Read) -> Result<Self, ConfigError>
    {
        let mut buf = String::new();
        reader.read_to_string(&mut buf).map_err(ConfigError::Read)?;
        toml::from_str(&buf).map_err(ConfigError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError
{
    #[error("failed to open config {path:?}: {source}")]
    Open
    {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to read config: {0}")]
    Read(io::Error),
    #[error("failed to parse config: {0}")]
    Parse(toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig
{
    // where the asset name is read from
    pub asset_env_var: String,
    // copied verbatim into the build record
    pub captured_env_vars: Vec<String>,
    // sidecar written next to the scene
    pub metadata_file_name: String,
    pub primitive: Primitive,
    // reported as the engine's workspace root; defaults to the working dir
    pub workspace_root: Option<PathBuf>,
}
impl Default for BuilderConfig
{
    fn default() -> Self
    {
        Self
        {
            asset_env_var: "ASSET".to_string(),
            captured_env_vars: ["ASSET", "HOME", "USER"].map(String::from).to_vec(),
            metadata_file_name: "metadata.json".to_string(),
            primitive: Primitive::Sphere,
            workspace_root: None,
        }
    }
}
impl TomlRead for BuilderConfig { }
impl BuilderConfig
{
    pub const DEFAULT_FILE_NAME: &'static str = "kiln.toml";

    // An explicit path must exist; the default file in the working dir is optional
    pub fn load_for(explicit_path: Option<&Path>, working_dir: &Path) -> Result<Self, ConfigError>
    {
        let (path, required) = match explicit_path
        {
            Some(path) => (path.to_path_buf(), true),
            None => (working_dir.join(Self::DEFAULT_FILE_NAME), false),
        };

        let config = match std::fs::File::open(&path)
        {
            Ok(mut fin) =>
            {
                log::debug!("Loading config from {path:?}");
                Self::load(&mut fin)?
            }
            Err(err) if err.kind() == ErrorKind::NotFound && !required => Self::default(),
            Err(source) => return Err(ConfigError::Open { path, source }),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError>
    {
        if self.asset_env_var.trim().is_empty()
        {
            return Err(ConfigError::Invalid("asset_env_var must not be empty".to_string()));
        }

        let metadata_path = Path::new(&self.metadata_file_name);
        if metadata_path.file_name().is_none_or(|f| f != metadata_path.as_os_str())
        {
            return Err(ConfigError::Invalid(format!("metadata_file_name {:?} must be a plain file name", self.metadata_file_name)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults_without_file()
    {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(BuilderConfig::load_for(None, dir.path()).unwrap(), BuilderConfig::default());
    }

    #[test]
    fn explicit_file_must_exist()
    {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(BuilderConfig::load_for(Some(&missing), dir.path()), Err(ConfigError::Open { .. })));
    }

    #[test]
    fn partial_file_keeps_defaults()
    {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kiln.toml"), "asset_env_var = \"KILN_ASSET\"\nprimitive = \"cylinder\"\n").unwrap();

        let config = BuilderConfig::load_for(None, dir.path()).unwrap();
        assert_eq!(config.asset_env_var, "KILN_ASSET");
        assert_eq!(config.primitive, Primitive::Cylinder);
        assert_eq!(config.metadata_file_name, "metadata.json");
        assert_eq!(config.captured_env_vars, ["ASSET", "HOME", "USER"]);
    }

    #[test]
    fn rejects_bad_files()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");

        std::fs::write(&path, "asset_env = \"typo\"\n").unwrap();
        assert!(matches!(BuilderConfig::load_for(Some(&path), dir.path()), Err(ConfigError::Parse(_))));

        std::fs::write(&path, "primitive = \"torus\"\n").unwrap();
        assert!(matches!(BuilderConfig::load_for(Some(&path), dir.path()), Err(ConfigError::Parse(_))));

        std::fs::write(&path, "metadata_file_name = \"../metadata.json\"\n").unwrap();
        assert!(matches!(BuilderConfig::load_for(Some(&path), dir.path()), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "asset_env_var = \" \"\n").unwrap();
        assert!(matches!(BuilderConfig::load_for(Some(&path), dir.path()), Err(ConfigError::Invalid(_))));
    }
}
