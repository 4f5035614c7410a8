use std::path::{Path, PathBuf};
use nab_kiln::timing::Stopwatch;
use scene_kiln::SceneEngine;
use crate::config::BuilderConfig;
use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage
{
    Start,
    InputResolved,
    ObjectsProvisioned,
    ScenePersisted,
    RecordExported,
    Done,
    Aborted,
}

// Fatal failures; each one stops the build at the stage it happened in
#[derive(Debug, thiserror::Error)]
pub enum BuildError
{
    #[error(transparent)]
    MissingInput(#[from] MissingInputError),
    #[error(transparent)]
    SceneOperation(#[from] SceneOperationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
impl BuildError
{
    // The last stage that completed before the build aborted
    #[must_use]
    pub fn last_stage(&self) -> BuildStage
    {
        match self
        {
            BuildError::MissingInput(_) => BuildStage::Start,
            BuildError::SceneOperation(_) => BuildStage::InputResolved,
            BuildError::Persistence(_) => BuildStage::ObjectsProvisioned,
        }
    }
}

#[derive(Debug)]
pub enum MetadataOutcome
{
    Written(PathBuf),
    Failed(MetadataExportError),
}

#[derive(Debug)]
pub struct BuildReport
{
    pub asset: AssetId,
    pub objects: ProvisionedObjects,
    pub scene_path: PathBuf,
    pub record: BuildRecord,
    pub metadata: MetadataOutcome,
    pub advisories: Vec<Advisory>,
}

struct StageTracker
{
    stage: BuildStage,
    stopwatch: Stopwatch,
}
impl StageTracker
{
    fn new() -> Self
    {
        Self { stage: BuildStage::Start, stopwatch: Stopwatch::start_new() }
    }

    fn advance(&mut self, next: BuildStage)
    {
        let took = self.stopwatch.lap();
        log::info!("Stage {:?} -> {:?}", self.stage, next);
        log::debug!("{:?} took {took:?}", next);
        self.stage = next;
    }

    fn abort(&mut self, err: BuildError) -> BuildError
    {
        log::error!("{err}");
        log::info!("Stage {:?} -> {:?}", self.stage, BuildStage::Aborted);
        self.stage = BuildStage::Aborted;
        err
    }
}

// Runs one asset build: resolve -> provision -> persist -> record
pub struct BuildPipeline<'p>
{
    config: &'p BuilderConfig,
    environment: &'p Environment,
    working_dir: PathBuf,
}
impl<'p> BuildPipeline<'p>
{
    #[must_use]
    pub fn new(config: &'p BuilderConfig, environment: &'p Environment, working_dir: impl Into<PathBuf>) -> Self
    {
        Self
        {
            config,
            environment,
            working_dir: working_dir.into(),
        }
    }

    #[inline] #[must_use]
    pub fn working_dir(&self) -> &Path { &self.working_dir }

    #[must_use]
    pub fn metadata_path(&self) -> PathBuf
    {
        self.working_dir.join(&self.config.metadata_file_name)
    }

    pub fn run<E: SceneEngine + ?Sized>(&self, engine: &mut E) -> Result<BuildReport, BuildError>
    {
        log::info!("Starting build...");
        let mut tracker = StageTracker::new();
        let mut advisories = Advisories::default();

        let asset = self.environment.resolve_asset(&self.config.asset_env_var)
            .map_err(|e| tracker.abort(e.into()))?;
        log::info!(asset:% = asset; "Environment variable {} = {asset}", self.config.asset_env_var);
        tracker.advance(BuildStage::InputResolved);

        let objects = provision(engine, &asset, self.config.primitive, &mut advisories)
            .map_err(|e| tracker.abort(e.into()))?;
        tracker.advance(BuildStage::ObjectsProvisioned);

        let scene_path = persist(engine, &asset, &self.working_dir, &mut advisories)
            .map_err(|e| tracker.abort(e.into()))?;
        tracker.advance(BuildStage::ScenePersisted);

        let record = BuildRecord::capture(
            engine,
            &asset,
            &scene_path,
            &objects,
            self.environment,
            &self.config.captured_env_vars);
        let metadata_path = self.metadata_path();
        let metadata = match export(&record, &metadata_path)
        {
            Ok(()) => MetadataOutcome::Written(metadata_path),
            Err(err) =>
            {
                log::error!("Failed to write metadata JSON: {err}");
                MetadataOutcome::Failed(err)
            }
        };
        tracker.advance(BuildStage::RecordExported);

        tracker.advance(BuildStage::Done);
        log::info!("Build finished successfully.");

        Ok(BuildReport
        {
            asset,
            objects,
            scene_path,
            record,
            metadata,
            advisories: advisories.into_vec(),
        })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use scene_kiln::{LocalEngine, ObjectKind, Primitive, SceneError};

    fn local_engine(workspace: &Path) -> LocalEngine
    {
        let mut engine = LocalEngine::new(workspace);
        engine.startup().unwrap();
        engine
    }

    fn hero_env() -> Environment
    {
        Environment::from_pairs([("ASSET", "hero01"), ("HOME", "/home/alice"), ("USER", "alice")])
    }

    fn read_metadata(path: &Path) -> serde_json::Value
    {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn dir_entries(dir: &Path) -> usize
    {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn builds_hero01()
    {
        let dir = tempfile::tempdir().unwrap();
        let config = BuilderConfig::default();
        let env = hero_env();
        let mut engine = local_engine(dir.path());

        let report = BuildPipeline::new(&config, &env, dir.path()).run(&mut engine).unwrap();

        assert_eq!(report.asset.as_str(), "hero01");
        assert_eq!(report.objects.container, "hero01_GRP");
        assert_eq!(report.objects.geometry, "hero01_geo");
        assert_eq!(engine.parent_of("hero01_geo").unwrap(), "hero01_GRP");
        assert!(report.advisories.is_empty());

        let scene_path = dir.path().join("hero01_scene.kscn");
        assert_eq!(report.scene_path, scene_path);
        assert!(scene_path.is_file());

        let metadata_path = dir.path().join("metadata.json");
        assert!(matches!(&report.metadata, MetadataOutcome::Written(p) if *p == metadata_path));
        let metadata = read_metadata(&metadata_path);
        assert_eq!(metadata["asset"], "hero01");
        assert_eq!(metadata["objects_created"], serde_json::json!({ "group": "hero01_GRP", "geometry": "hero01_geo" }));
        assert_eq!(metadata["saved_scene"], scene_path.to_str().unwrap());
        assert_eq!(metadata["engine_scene_name"], scene_path.to_str().unwrap());
        assert_eq!(metadata["user"], "alice");
        assert_eq!(metadata["workspace"], dir.path().to_str().unwrap());
        assert_eq!(metadata["environment_vars"], serde_json::json!({ "ASSET": "hero01", "HOME": "/home/alice", "USER": "alice" }));
        assert!(metadata["engine_version"].as_str().unwrap().starts_with("Kiln Local Engine"));
    }

    #[test]
    fn second_run_reuses_container()
    {
        let dir = tempfile::tempdir().unwrap();
        let config = BuilderConfig::default();
        let env = hero_env();
        let mut engine = local_engine(dir.path());
        let pipeline = BuildPipeline::new(&config, &env, dir.path());

        pipeline.run(&mut engine).unwrap();
        let second = pipeline.run(&mut engine).unwrap();

        assert_eq!(second.advisories, [Advisory::ContainerReused { container: "hero01_GRP".to_string() }]);
        assert!(second.objects.container_reused);
        assert_eq!(second.objects.geometry, "hero01_geo1");

        let objects = engine.objects();
        let groups: Vec<_> = objects.iter().filter(|o| o.kind == ObjectKind::Group).collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "hero01_GRP");
        let meshes: Vec<_> = objects.iter().filter(|o| o.kind == ObjectKind::Mesh(Primitive::Sphere)).collect();
        assert_eq!(meshes.len(), 2);
        assert!(meshes.iter().all(|m| m.parent.as_ref().is_some_and(|p| p == "hero01_GRP")));

        // the sidecar reflects the latest run only
        let metadata = read_metadata(&dir.path().join("metadata.json"));
        assert_eq!(metadata["objects_created"]["geometry"], "hero01_geo1");

        // and the saved scene holds both geometries
        let mut reopened = local_engine(dir.path());
        reopened.open_scene(&second.scene_path).unwrap();
        assert_eq!(reopened.objects(), objects);
    }

    #[test]
    fn missing_asset_has_no_side_effects()
    {
        for env in [Environment::from_pairs([("HOME", "/home/alice")]), Environment::from_pairs([("ASSET", "  ")])]
        {
            let dir = tempfile::tempdir().unwrap();
            let config = BuilderConfig::default();
            let mut engine = local_engine(dir.path());

            let err = BuildPipeline::new(&config, &env, dir.path()).run(&mut engine).unwrap_err();
            assert!(matches!(err, BuildError::MissingInput(_)));
            assert_eq!(err.last_stage(), BuildStage::Start);
            assert!(engine.objects().is_empty());
            assert_eq!(engine.scene_name(), None);
            assert_eq!(dir_entries(dir.path()), 0);
        }
    }

    #[test]
    fn custom_asset_variable()
    {
        let dir = tempfile::tempdir().unwrap();
        let config = BuilderConfig { asset_env_var: "KILN_ASSET".to_string(), ..BuilderConfig::default() };
        let env = Environment::from_pairs([("ASSET", "ignored"), ("KILN_ASSET", "prop_barrel")]);
        let mut engine = local_engine(dir.path());

        let report = BuildPipeline::new(&config, &env, dir.path()).run(&mut engine).unwrap();
        assert_eq!(report.asset.as_str(), "prop_barrel");
        assert!(dir.path().join("prop_barrel_scene.kscn").is_file());
    }

    #[test]
    fn scene_operation_failure_aborts()
    {
        let dir = tempfile::tempdir().unwrap();
        let config = BuilderConfig::default();
        let env = Environment::from_pairs([("ASSET", "hero-01")]);
        let mut engine = local_engine(dir.path());

        let err = BuildPipeline::new(&config, &env, dir.path()).run(&mut engine).unwrap_err();
        assert!(matches!(&err, BuildError::SceneOperation(e) if matches!(e.source, SceneError::InvalidName(_))));
        assert_eq!(err.last_stage(), BuildStage::InputResolved);
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[test]
    fn persistence_failure_skips_metadata()
    {
        let dir = tempfile::tempdir().unwrap();
        let working_dir = dir.path().join("gone");
        let config = BuilderConfig::default();
        let env = hero_env();
        let mut engine = local_engine(dir.path());

        let pipeline = BuildPipeline::new(&config, &env, &working_dir);
        let err = pipeline.run(&mut engine).unwrap_err();
        assert!(matches!(err, BuildError::Persistence(PersistenceError::Save { .. })));
        assert_eq!(err.last_stage(), BuildStage::ObjectsProvisioned);

        assert!(!pipeline.metadata_path().exists());
        assert_eq!(dir_entries(dir.path()), 0);
        // provisioned objects are not rolled back
        assert!(engine.object_exists("hero01_GRP"));
    }

    #[test]
    fn metadata_failure_is_not_fatal()
    {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("metadata.json")).unwrap();
        let config = BuilderConfig::default();
        let env = hero_env();
        let mut engine = local_engine(dir.path());

        let report = BuildPipeline::new(&config, &env, dir.path()).run(&mut engine).unwrap();
        assert!(matches!(report.metadata, MetadataOutcome::Failed(MetadataExportError::Write { .. })));
        assert!(report.scene_path.is_file());
        assert_eq!(report.record.asset, "hero01");
    }

    #[test]
    fn configured_metadata_name_and_vars()
    {
        let dir = tempfile::tempdir().unwrap();
        let config = BuilderConfig
        {
            metadata_file_name: "hero01.build.json".to_string(),
            captured_env_vars: vec!["SHOT".to_string()],
            primitive: Primitive::Cube,
            ..BuilderConfig::default()
        };
        let env = hero_env();
        let mut engine = local_engine(dir.path());

        BuildPipeline::new(&config, &env, dir.path()).run(&mut engine).unwrap();
        assert!(!dir.path().join("metadata.json").exists());
        let metadata = read_metadata(&dir.path().join("hero01.build.json"));
        assert_eq!(metadata["environment_vars"], serde_json::json!({ "SHOT": null }));
        assert_eq!(engine.objects()[1].kind, ObjectKind::Mesh(Primitive::Cube));
    }
}
