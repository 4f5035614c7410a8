mod engine;
pub use engine::*;

mod local_engine;
pub use local_engine::LocalEngine;

mod runtime;
pub use runtime::EngineRuntime;

pub mod scene_file;
