use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use scene_kiln::SceneEngine;
use super::{AssetId, Environment, ProvisionedObjects};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectsCreated
{
    pub group: String,
    pub geometry: String,
}

// Audit trail for one successful build, written next to the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord
{
    pub asset: String,
    pub saved_scene: PathBuf,
    pub user: String,
    pub engine_scene_name: String, // as the engine reports it, empty if untitled
    pub export_time: chrono::DateTime<chrono::Local>,
    pub engine_version: String,
    pub workspace: PathBuf,
    pub environment_vars: BTreeMap<String, Option<String>>,
    pub objects_created: ObjectsCreated,
}
impl BuildRecord
{
    // Only call once the scene has been persisted
    pub fn capture<E: SceneEngine + ?Sized>(
        engine: &E,
        asset: &AssetId,
        saved_scene: &Path,
        objects: &ProvisionedObjects,
        environment: &Environment,
        captured_vars: &[String])
        -> Self
    {
        Self
        {
            asset: asset.to_string(),
            saved_scene: saved_scene.to_path_buf(),
            user: environment.user(),
            engine_scene_name: engine.scene_name().map(|p| p.display().to_string()).unwrap_or_default(),
            export_time: chrono::Local::now(),
            engine_version: engine.version(),
            workspace: engine.workspace_root(),
            environment_vars: environment.snapshot(captured_vars),
            objects_created: ObjectsCreated
            {
                group: objects.container.to_string(),
                geometry: objects.geometry.to_string(),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataExportError
{
    #[error("failed to serialize the build record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write metadata to {path:?}: {source}")]
    Write
    {
        path: PathBuf,
        source: io::Error,
    },
}

pub fn to_pretty_json(record: &BuildRecord) -> Result<String, serde_json::Error>
{
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    record.serialize(&mut serializer)?;
    out.push(b'\n');
    // serde_json only emits utf-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

// Overwrites any previous record at `output_path`
pub fn export(record: &BuildRecord, output_path: &Path) -> Result<(), MetadataExportError>
{
    let json = to_pretty_json(record)?;
    std::fs::write(output_path, json).map_err(|source| MetadataExportError::Write { path: output_path.to_path_buf(), source })?;
    log::info!("Metadata exported to: {}", output_path.display());
    Ok(())
}
