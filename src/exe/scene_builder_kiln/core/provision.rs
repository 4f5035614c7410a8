use std::fmt::{Display, Formatter};
use scene_kiln::{ObjectRef, Primitive, SceneEngine, SceneError};
use super::{Advisories, Advisory, AssetId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedObjects
{
    pub container: ObjectRef,
    pub container_reused: bool,
    pub geometry: ObjectRef, // engine-assigned, may differ from the requested name
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneAction
{
    CreateContainer(String),
    CreateGeometry(String),
    Parent
    {
        child: String,
        parent: String,
    },
}
impl Display for SceneAction
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            SceneAction::CreateContainer(name) => write!(f, "creating group {name}"),
            SceneAction::CreateGeometry(name) => write!(f, "creating geometry {name}"),
            SceneAction::Parent { child, parent } => write!(f, "parenting {child} to {parent}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("scene operation failed while {action}: {source}")]
pub struct SceneOperationError
{
    pub action: SceneAction,
    pub source: SceneError,
}

// Ensure `<asset>_GRP` exists (reusing one that does) and hang a new `<asset>_geo` under it.
// Only the container is deduplicated; each call adds another geometry.
pub fn provision<E: SceneEngine + ?Sized>(
    engine: &mut E,
    asset: &AssetId,
    primitive: Primitive,
    advisories: &mut Advisories)
    -> Result<ProvisionedObjects, SceneOperationError>
{
    let group_name = asset.group_name();
    let (container, container_reused) = match engine.object_exists(&group_name)
    {
        true =>
        {
            advisories.raise(Advisory::ContainerReused { container: group_name.clone() });
            (ObjectRef::from(group_name), true)
        }
        false =>
        {
            let container = engine.create_group(&group_name).map_err(|source| SceneOperationError
            {
                action: SceneAction::CreateContainer(group_name.clone()),
                source,
            })?;
            log::info!("Created group: {container}");
            (container, false)
        }
    };

    let geometry_name = asset.geometry_name();
    let geometry = engine.create_primitive(&geometry_name, primitive).map_err(|source| SceneOperationError
    {
        action: SceneAction::CreateGeometry(geometry_name),
        source,
    })?;

    engine.reparent(&geometry, &container).map_err(|source| SceneOperationError
    {
        action: SceneAction::Parent { child: geometry.to_string(), parent: container.to_string() },
        source,
    })?;
    log::info!(primitive:% = primitive; "Created geometry: {geometry} and parented it to {container}");

    Ok(ProvisionedObjects { container, container_reused, geometry })
}
