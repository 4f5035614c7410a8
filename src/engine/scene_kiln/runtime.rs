use std::sync::atomic::{AtomicBool, Ordering};
use crate::{SceneEngine, SceneError};

static RUNTIME_LIVE: AtomicBool = AtomicBool::new(false);

// Owns the process-wide engine runtime. Only one may be live at a time.
pub struct EngineRuntime<E: SceneEngine>
{
    engine: E,
    live: bool,
}
impl<E: SceneEngine> EngineRuntime<E>
{
    pub fn initialize(mut engine: E) -> Result<Self, SceneError>
    {
        if RUNTIME_LIVE.swap(true, Ordering::SeqCst)
        {
            return Err(SceneError::RuntimeAlreadyInitialized);
        }

        if let Err(err) = engine.startup()
        {
            RUNTIME_LIVE.store(false, Ordering::SeqCst);
            return Err(err);
        }

        log::info!("Initialized engine runtime: {}", engine.version());
        Ok(Self { engine, live: true })
    }

    #[inline] #[must_use]
    pub fn engine(&self) -> &E { &self.engine }
    #[inline] #[must_use]
    pub fn engine_mut(&mut self) -> &mut E { &mut self.engine }

    pub fn shutdown(mut self)
    {
        self.release();
    }

    fn release(&mut self)
    {
        if !self.live
        {
            return;
        }

        self.engine.shutdown();
        self.live = false;
        RUNTIME_LIVE.store(false, Ordering::SeqCst);
        log::info!("Shut down engine runtime");
    }
}
impl<E: SceneEngine> Drop for EngineRuntime<E>
{
    fn drop(&mut self)
    {
        self.release();
    }
}
