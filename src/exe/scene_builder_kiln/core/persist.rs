use std::path::{Path, PathBuf};
use scene_kiln::{SceneEngine, SceneError};
use super::{Advisories, Advisory, AssetId};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError
{
    #[error("failed to set the scene file name to {path:?}: {source}")]
    Rename
    {
        path: PathBuf,
        source: SceneError,
    },
    #[error("failed to save the scene to {path:?}: {source}")]
    Save
    {
        path: PathBuf,
        source: SceneError,
    },
}

// `<working_dir>/<asset>_scene.<ext>`
#[must_use]
pub fn scene_output_path(working_dir: &Path, asset: &AssetId, native_extension: &str) -> PathBuf
{
    working_dir.join(asset.scene_file_name(native_extension))
}

pub fn persist<E: SceneEngine + ?Sized>(
    engine: &mut E,
    asset: &AssetId,
    working_dir: &Path,
    advisories: &mut Advisories)
    -> Result<PathBuf, PersistenceError>
{
    if !working_dir.is_dir()
    {
        advisories.raise(Advisory::WorkingDirInvalid { path: working_dir.to_path_buf() });
    }

    let scene_path = scene_output_path(working_dir, asset, engine.native_extension());
    engine.rename_scene(&scene_path).map_err(|source| PersistenceError::Rename { path: scene_path.clone(), source })?;

    let saved_to = engine.save_scene().map_err(|source| PersistenceError::Save { path: scene_path.clone(), source })?;
    if saved_to != scene_path
    {
        log::warn!("Engine saved to {saved_to:?} instead of {scene_path:?}");
    }

    log::info!("Scene saved as: {}", scene_path.display());
    Ok(scene_path)
}
