use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::scene_file::SceneFileError;

// A handle to a scene object, as named by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef(String);
impl ObjectRef
{
    #[inline] #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}
impl From<&str> for ObjectRef
{
    fn from(name: &str) -> Self { Self(name.to_string()) }
}
impl From<String> for ObjectRef
{
    fn from(name: String) -> Self { Self(name) }
}
impl From<ObjectRef> for String
{
    fn from(obj: ObjectRef) -> Self { obj.0 }
}
impl Display for ObjectRef
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}
impl PartialEq<str> for ObjectRef
{
    fn eq(&self, other: &str) -> bool { self.0 == other }
}
impl PartialEq<&str> for ObjectRef
{
    fn eq(&self, other: &&str) -> bool { self.0 == *other }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
#[serde(rename_all = "lowercase")]
pub enum Primitive
{
    #[default]
    Sphere,
    Cube,
    Cylinder,
    Plane,
}
impl Primitive
{
    pub const ALL: [Primitive; 4] = [Primitive::Sphere, Primitive::Cube, Primitive::Cylinder, Primitive::Plane];

    #[must_use]
    pub const fn name(self) -> &'static str
    {
        match self
        {
            Primitive::Sphere => "sphere",
            Primitive::Cube => "cube",
            Primitive::Cylinder => "cylinder",
            Primitive::Plane => "plane",
        }
    }
}
impl Display for Primitive
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.name()) }
}
impl FromStr for Primitive
{
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        Primitive::ALL.into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SceneError::UnknownPrimitive(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub enum ObjectKind
{
    Group,
    Mesh(Primitive),
}
impl Display for ObjectKind
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            ObjectKind::Group => f.write_str("group"),
            ObjectKind::Mesh(primitive) => write!(f, "{primitive} mesh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneObject
{
    pub name: ObjectRef,
    pub kind: ObjectKind,
    pub parent: Option<ObjectRef>,
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError
{
    #[error("invalid object name {0:?}")]
    InvalidName(String),
    #[error("unknown primitive {0:?}")]
    UnknownPrimitive(String),
    #[error("no object named {0:?}")]
    NoSuchObject(String),
    #[error("cannot parent {child:?} under {parent:?}, which is a {parent_kind}")]
    IncompatibleParent
    {
        child: String,
        parent: String,
        parent_kind: ObjectKind,
    },
    #[error("cannot parent {child:?} under itself or its descendant {parent:?}")]
    CyclicParent
    {
        child: String,
        parent: String,
    },
    #[error("the scene has no file name, rename it before saving")]
    Untitled,
    #[error("invalid scene path {0:?}")]
    InvalidScenePath(PathBuf),
    #[error("scene file I/O failed on {path:?}: {source}")]
    Io
    {
        path: PathBuf,
        source: io::Error,
    },
    #[error("malformed scene file: {0}")]
    Format(#[from] SceneFileError),
    #[error("the engine runtime is already initialized in this process")]
    RuntimeAlreadyInitialized,
    #[error("the engine runtime is not running")]
    RuntimeNotRunning,
}

// The capabilities the scene builder needs from a 3D authoring engine.
// Object handles are engine-assigned names; creation may rename on collision.
pub trait SceneEngine
{
    // Lifecycle; called once by `EngineRuntime`
    fn startup(&mut self) -> Result<(), SceneError>;
    fn shutdown(&mut self);

    fn version(&self) -> String;
    // Extension of the engine's native binary scene format (omit . prefix)
    fn native_extension(&self) -> &'static str;
    fn workspace_root(&self) -> PathBuf;

    fn object_exists(&self, name: &str) -> bool;
    fn create_group(&mut self, name: &str) -> Result<ObjectRef, SceneError>;
    fn create_primitive(&mut self, name: &str, primitive: Primitive) -> Result<ObjectRef, SceneError>;
    fn reparent(&mut self, child: &ObjectRef, parent: &ObjectRef) -> Result<(), SceneError>;
    fn parent_of(&self, name: &str) -> Option<ObjectRef>;
    // All objects, in creation order
    fn objects(&self) -> Vec<SceneObject>;

    // Set the file the scene will be saved to
    fn rename_scene(&mut self, path: &Path) -> Result<(), SceneError>;
    // Save to the current scene file name, returning it
    fn save_scene(&mut self) -> Result<PathBuf, SceneError>;
    // Replace the current scene with the contents of a native scene file
    fn open_scene(&mut self, path: &Path) -> Result<(), SceneError>;
    // None while the scene is untitled
    fn scene_name(&self) -> Option<PathBuf>;
}

#[must_use]
pub fn is_valid_object_name(name: &str) -> bool
{
    let mut chars = name.chars();
    match chars.next()
    {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn object_names()
    {
        assert!(is_valid_object_name("hero01_GRP"));
        assert!(is_valid_object_name("_hidden"));
        assert!(!is_valid_object_name(""));
        assert!(!is_valid_object_name("01hero"));
        assert!(!is_valid_object_name("hero 01_geo"));
        assert!(!is_valid_object_name("hero-01_geo"));
    }

    #[test]
    fn primitive_parse()
    {
        assert_eq!("Sphere".parse::<Primitive>().ok(), Some(Primitive::Sphere));
        assert_eq!("plane".parse::<Primitive>().ok(), Some(Primitive::Plane));
        assert!(matches!("torus".parse::<Primitive>(), Err(SceneError::UnknownPrimitive(p)) if p == "torus"));
    }
}
