mod config;
mod core;

use crate::config::BuilderConfig;
use crate::core::{BuildPipeline, BuildReport, Environment, MetadataOutcome};
use std::path::{Path, PathBuf};
use clap::{Parser, Subcommand};
use nab_kiln::app::{set_panic_hook, AppRun, ExitReason, LogStyle};
use scene_kiln::{scene_file, EngineRuntime, LocalEngine, ObjectRef, Primitive, SceneEngine, SceneError, SceneObject};
use unicase::UniCase;
use walkdir::WalkDir;

fn parse_primitive(s: &str) -> Result<Primitive, String>
{
    s.parse().map_err(|e: SceneError| e.to_string())
}

#[derive(Debug, Subcommand)]
pub enum CliCommands
{
    #[clap(about = "Build a starter scene for the asset named in the environment")]
    Build
    {
        // defaults to kiln.toml in the working directory, if present
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        working_dir: Option<PathBuf>,

        // start from an existing scene instead of an empty one
        #[arg(long)]
        scene: Option<PathBuf>,

        #[arg(long, value_parser = parse_primitive)]
        primitive: Option<Primitive>,
    },
    #[clap(about = "Print the object hierarchy of a scene file")]
    Inspect
    {
        scene: PathBuf,
    },
    #[clap(about = "List scene files under a directory")]
    Scenes
    {
        dir: Option<PathBuf>,
    },
}

#[derive(Debug, Parser)]
struct BuilderArgs
{
    #[command(subcommand)]
    command: CliCommands,

    #[arg(long, global = true, value_enum, default_value_t = LogStyle::Audit)]
    log_style: LogStyle,
}
impl nab_kiln::app::CliArgs for BuilderArgs
{
    fn log_style(&self) -> LogStyle { self.log_style }
}

fn current_dir() -> PathBuf
{
    match std::env::current_dir()
    {
        Ok(dir) => dir,
        Err(err) =>
        {
            log::warn!("Failed to get the working directory: {err}");
            PathBuf::from(".")
        }
    }
}

// On failure the cause has already been logged; only the exit reason is returned
fn build(
    config_path: Option<&Path>,
    working_dir: Option<&Path>,
    scene: Option<&Path>,
    primitive: Option<Primitive>,
    environment: &Environment)
    -> Result<BuildReport, ExitReason>
{
    let working_dir = working_dir.map_or_else(current_dir, Path::to_path_buf);

    let mut config = BuilderConfig::load_for(config_path, &working_dir).map_err(|err|
    {
        log::error!("{err}");
        ExitReason::BuildFailed
    })?;
    if let Some(primitive) = primitive
    {
        config.primitive = primitive;
    }

    let workspace_root = config.workspace_root.clone().unwrap_or_else(|| working_dir.clone());
    let mut runtime = EngineRuntime::initialize(LocalEngine::new(workspace_root)).map_err(|err|
    {
        log::error!("Failed to initialize the engine: {err}");
        ExitReason::BuildFailed
    })?;

    if let Some(scene) = scene
    {
        runtime.engine_mut().open_scene(scene).map_err(|err|
        {
            log::error!("Failed to open {scene:?}: {err}");
            ExitReason::BuildFailed
        })?;
        log::info!("Opened starting scene {}", scene.display());
    }

    let pipeline = BuildPipeline::new(&config, environment, working_dir);
    log::debug!("Building in {}", pipeline.working_dir().display());
    let result = pipeline.run(runtime.engine_mut());
    runtime.shutdown();

    match result
    {
        Ok(report) =>
        {
            match &report.metadata
            {
                MetadataOutcome::Written(path) => log::debug!("Build record at {}", path.display()),
                MetadataOutcome::Failed(err) => log::warn!("{} was built without a metadata record: {err}", report.asset),
            }
            log::debug!("Objects {} and {} recorded by {}", report.objects.container, report.objects.geometry, report.record.engine_version);
            for advisory in &report.advisories
            {
                log::debug!("Advisory: {advisory:?}");
            }
            log::info!("Built {} with {} advisories", report.scene_path.display(), report.advisories.len());
            Ok(report)
        }
        // the error itself was logged by the pipeline
        Err(err) =>
        {
            log::info!("Build aborted after reaching {:?}", err.last_stage());
            Err(ExitReason::BuildFailed)
        }
    }
}

fn print_hierarchy(objects: &[SceneObject], parent: Option<&ObjectRef>, depth: usize)
{
    for object in objects.iter().filter(|o| o.parent.as_ref() == parent)
    {
        println!("{:indent$}{} ({})", "", object.name, object.kind, indent = depth * 2);
        print_hierarchy(objects, Some(&object.name), depth + 1);
    }
}

fn inspect(scene: &Path) -> ExitReason
{
    let mut runtime = match EngineRuntime::initialize(LocalEngine::new(current_dir()))
    {
        Ok(runtime) => runtime,
        Err(err) =>
        {
            log::error!("Failed to initialize the engine: {err}");
            return ExitReason::BuildFailed;
        }
    };

    if let Err(err) = runtime.engine_mut().open_scene(scene)
    {
        log::error!("Failed to open {scene:?}: {err}");
        return ExitReason::BuildFailed;
    }

    print_hierarchy(&runtime.engine().objects(), None, 0);
    ExitReason::NormalExit
}

fn list_scenes(dir: &Path) -> ExitReason
{
    let extension = UniCase::new(scene_file::SCENE_FILE_EXTENSION);
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok)
    {
        let is_scene = entry.file_type().is_file() && entry.path().extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| UniCase::new(ext) == extension);
        if !is_scene
        {
            continue;
        }

        let summary = std::fs::read(entry.path())
            .map_err(|e| e.to_string())
            .and_then(|bytes| scene_file::decode(&bytes).map_err(|e| e.to_string()));
        match summary
        {
            Ok(document) => println!("{:?} {} objects, saved by {}", entry.path(), document.nodes.len(), document.saved_by),
            Err(err) => println!("{:?} {err}", entry.path()),
        }
    }
    ExitReason::NormalExit
}

fn main() -> ExitReason
{
    let app_run = AppRun::<BuilderArgs>::startup("Scene Builder", env!("CARGO_PKG_VERSION"));
    set_panic_hook();

    let exit_reason = match &app_run.args.command
    {
        CliCommands::Build { config, working_dir, scene, primitive } =>
        {
            let environment = Environment::capture();
            match build(config.as_deref(), working_dir.as_deref(), scene.as_deref(), *primitive, &environment)
            {
                Ok(_) => ExitReason::NormalExit,
                Err(reason) => reason,
            }
        }
        CliCommands::Inspect { scene } => inspect(scene),
        CliCommands::Scenes { dir } => list_scenes(&dir.clone().unwrap_or_else(current_dir)),
    };

    app_run.set_exit_reason(exit_reason);
    exit_reason
}
