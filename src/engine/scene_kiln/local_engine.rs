use std::path::{Path, PathBuf};
use unicase::UniCase;
use crate::scene_file::{self, SceneDocument, SceneNode, SCENE_FILE_EXTENSION};
use crate::{is_valid_object_name, ObjectKind, ObjectRef, Primitive, SceneEngine, SceneError, SceneObject};

pub const ENGINE_NAME: &str = "Kiln Local Engine";

// Reference engine: keeps the scene graph in memory and saves it as a native scene file
pub struct LocalEngine
{
    workspace_root: PathBuf,
    scene_path: Option<PathBuf>,
    nodes: Vec<SceneNode>,
    running: bool,
}
impl LocalEngine
{
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self
    {
        Self
        {
            workspace_root: workspace_root.into(),
            scene_path: None,
            nodes: Vec::new(),
            running: false,
        }
    }

    fn find(&self, name: &str) -> Option<usize>
    {
        self.nodes.iter().position(|n| n.name == name)
    }

    fn require_running(&self) -> Result<(), SceneError>
    {
        match self.running
        {
            true => Ok(()),
            false => Err(SceneError::RuntimeNotRunning),
        }
    }

    // Collisions get the lowest free numeric suffix (name, name1, name2, ...)
    fn unique_name(&self, base: &str) -> String
    {
        if self.find(base).is_none()
        {
            return base.to_string();
        }

        let mut suffix = 1u32;
        loop
        {
            let candidate = format!("{base}{suffix}");
            if self.find(&candidate).is_none()
            {
                return candidate;
            }
            suffix += 1;
        }
    }

    fn create(&mut self, name: &str, kind: ObjectKind) -> Result<ObjectRef, SceneError>
    {
        self.require_running()?;
        if !is_valid_object_name(name)
        {
            return Err(SceneError::InvalidName(name.to_string()));
        }

        let name = self.unique_name(name);
        log::debug!("Creating {kind} {name}");
        self.nodes.push(SceneNode { name: name.clone(), kind, parent: None });
        Ok(ObjectRef::from(name))
    }

    fn is_ancestor_or_self(&self, ancestor: usize, mut node: usize) -> bool
    {
        // bounded so a malformed graph can't spin forever
        for _ in 0..=self.nodes.len()
        {
            if node == ancestor
            {
                return true;
            }
            match self.nodes[node].parent
            {
                Some(p) => node = p as usize,
                None => return false,
            }
        }
        true
    }

    fn document(&self) -> SceneDocument
    {
        SceneDocument
        {
            saved_by: self.version(),
            nodes: self.nodes.clone(),
        }
    }
}
impl SceneEngine for LocalEngine
{
    fn startup(&mut self) -> Result<(), SceneError>
    {
        if self.running
        {
            return Err(SceneError::RuntimeAlreadyInitialized);
        }
        self.running = true;
        Ok(())
    }

    fn shutdown(&mut self)
    {
        self.running = false;
    }

    fn version(&self) -> String
    {
        format!("{ENGINE_NAME} {}", env!("CARGO_PKG_VERSION"))
    }

    fn native_extension(&self) -> &'static str { SCENE_FILE_EXTENSION }

    fn workspace_root(&self) -> PathBuf { self.workspace_root.clone() }

    fn object_exists(&self, name: &str) -> bool
    {
        self.find(name).is_some()
    }

    fn create_group(&mut self, name: &str) -> Result<ObjectRef, SceneError>
    {
        self.create(name, ObjectKind::Group)
    }

    fn create_primitive(&mut self, name: &str, primitive: Primitive) -> Result<ObjectRef, SceneError>
    {
        self.create(name, ObjectKind::Mesh(primitive))
    }

    fn reparent(&mut self, child: &ObjectRef, parent: &ObjectRef) -> Result<(), SceneError>
    {
        self.require_running()?;
        let child_index = self.find(child.as_str()).ok_or_else(|| SceneError::NoSuchObject(child.to_string()))?;
        let parent_index = self.find(parent.as_str()).ok_or_else(|| SceneError::NoSuchObject(parent.to_string()))?;

        let parent_kind = self.nodes[parent_index].kind;
        if parent_kind != ObjectKind::Group
        {
            return Err(SceneError::IncompatibleParent
            {
                child: child.to_string(),
                parent: parent.to_string(),
                parent_kind,
            });
        }

        if self.is_ancestor_or_self(child_index, parent_index)
        {
            return Err(SceneError::CyclicParent { child: child.to_string(), parent: parent.to_string() });
        }

        self.nodes[child_index].parent = Some(parent_index as u32);
        Ok(())
    }

    fn parent_of(&self, name: &str) -> Option<ObjectRef>
    {
        let node = &self.nodes[self.find(name)?];
        node.parent.map(|p| ObjectRef::from(self.nodes[p as usize].name.as_str()))
    }

    fn objects(&self) -> Vec<SceneObject>
    {
        self.nodes.iter().map(|n| SceneObject
        {
            name: ObjectRef::from(n.name.as_str()),
            kind: n.kind,
            parent: n.parent.map(|p| ObjectRef::from(self.nodes[p as usize].name.as_str())),
        }).collect()
    }

    fn rename_scene(&mut self, path: &Path) -> Result<(), SceneError>
    {
        self.require_running()?;
        if path.file_name().is_none()
        {
            return Err(SceneError::InvalidScenePath(path.to_path_buf()));
        }
        self.scene_path = Some(path.to_path_buf());
        Ok(())
    }

    fn save_scene(&mut self) -> Result<PathBuf, SceneError>
    {
        self.require_running()?;
        let path = self.scene_path.clone().ok_or(SceneError::Untitled)?;

        let bytes = scene_file::encode(&self.document());
        std::fs::write(&path, bytes).map_err(|source| SceneError::Io { path: path.clone(), source })?;
        log::debug!("Wrote {} objects to {path:?}", self.nodes.len());
        Ok(path)
    }

    fn open_scene(&mut self, path: &Path) -> Result<(), SceneError>
    {
        self.require_running()?;
        let is_native = path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| UniCase::new(ext) == UniCase::new(SCENE_FILE_EXTENSION));
        if !is_native
        {
            return Err(SceneError::InvalidScenePath(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|source| SceneError::Io { path: path.to_path_buf(), source })?;
        let document = scene_file::decode(&bytes)?;
        log::debug!("Opened {path:?} ({} objects, saved by {})", document.nodes.len(), document.saved_by);

        self.nodes = document.nodes;
        self.scene_path = Some(path.to_path_buf());
        Ok(())
    }

    fn scene_name(&self) -> Option<PathBuf>
    {
        self.scene_path.clone()
    }
}
