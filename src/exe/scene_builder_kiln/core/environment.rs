use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::OsString;
use std::fmt::{Display, Formatter};

// Names the asset being built. Never empty, never padded with whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetId(String);
impl AssetId
{
    pub const GROUP_SUFFIX: &'static str = "_GRP";
    pub const GEOMETRY_SUFFIX: &'static str = "_geo";
    pub const SCENE_SUFFIX: &'static str = "_scene";

    #[must_use]
    pub fn new(raw: &str) -> Option<Self>
    {
        let trimmed = raw.trim();
        match trimmed.is_empty()
        {
            true => None,
            false => Some(Self(trimmed.to_string())),
        }
    }

    #[inline] #[must_use]
    #[cfg(test)]
    pub fn as_str(&self) -> &str { &self.0 }

    #[must_use]
    pub fn group_name(&self) -> String { format!("{}{}", self.0, Self::GROUP_SUFFIX) }
    #[must_use]
    pub fn geometry_name(&self) -> String { format!("{}{}", self.0, Self::GEOMETRY_SUFFIX) }
    #[must_use]
    pub fn scene_file_name(&self, extension: &str) -> String { format!("{}{}.{extension}", self.0, Self::SCENE_SUFFIX) }
}
impl Display for AssetId
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MissingInputError
{
    #[error("{0} environment variable not set")]
    Unset(String),
    #[error("{0} environment variable is blank")]
    Blank(String),
    #[error("{0} environment variable is not valid unicode")]
    NotUnicode(String),
}

// A snapshot of the process environment, taken once at startup
#[derive(Debug, Clone, Default)]
pub struct Environment
{
    vars: HashMap<String, String>,
    not_unicode: HashSet<String>, // names whose values couldn't be read
}
impl Environment
{
    #[must_use]
    pub fn capture() -> Self
    {
        Self::from_os_pairs(std::env::vars_os())
    }

    // Variables with non-unicode values are remembered by name only
    #[must_use]
    pub fn from_os_pairs(pairs: impl IntoIterator<Item = (OsString, OsString)>) -> Self
    {
        let mut environment = Self::default();
        for (name, value) in pairs
        {
            let name = match name.into_string()
            {
                Ok(name) => name,
                Err(name) =>
                {
                    log::debug!("Skipping environment variable with a non-unicode name {name:?}");
                    continue;
                }
            };

            match value.into_string()
            {
                Ok(value) => { environment.vars.insert(name, value); }
                Err(_) =>
                {
                    log::debug!("Skipping environment variable {name} with a non-unicode value");
                    environment.not_unicode.insert(name);
                }
            }
        }
        environment
    }

    #[must_use]
    #[cfg(test)]
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    {
        Self::from_os_pairs(pairs.into_iter().map(|(k, v)| (OsString::from(k.into()), OsString::from(v.into()))))
    }

    #[inline] #[must_use]
    pub fn get(&self, name: &str) -> Option<&str>
    {
        self.vars.get(name).map(String::as_str)
    }

    pub fn resolve_asset(&self, var: &str) -> Result<AssetId, MissingInputError>
    {
        if self.not_unicode.contains(var)
        {
            return Err(MissingInputError::NotUnicode(var.to_string()));
        }
        let raw = self.get(var).ok_or_else(|| MissingInputError::Unset(var.to_string()))?;
        AssetId::new(raw).ok_or_else(|| MissingInputError::Blank(var.to_string()))
    }

    // Login name, checked in the same order as python's getpass
    #[must_use]
    pub fn user(&self) -> String
    {
        ["LOGNAME", "USER", "LNAME", "USERNAME"].iter()
            .find_map(|var| self.get(var).filter(|v| !v.is_empty()))
            .unwrap_or("unknown")
            .to_string()
    }

    // Verbatim values for each name; unset variables map to None
    #[must_use]
    pub fn snapshot(&self, names: &[String]) -> BTreeMap<String, Option<String>>
    {
        names.iter()
            .map(|name| (name.clone(), self.get(name).map(str::to_string)))
            .collect()
    }
}
