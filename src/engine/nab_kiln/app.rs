use std::fmt::{Debug, Write as _};
use std::io::Write;
use std::panic::PanicHookInfo;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicI32, Ordering};
use clap::ValueEnum;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab_case")]
pub enum LogStyle
{
    // [time][LEVEL][file:line] message key=value
    #[default]
    Audit,
    // colog's coloured level prefixes
    Pretty,
}

pub trait CliArgs: clap::Parser + Debug
{
    fn log_style(&self) -> LogStyle;
}

fn join_args<I>(separator: &str, iter: I) -> String
where I: Iterator,
      I::Item: std::fmt::Display
{
    let mut out = String::new();
    for (i, arg) in iter.enumerate()
    {
        if i > 0 { out.push_str(separator); }
        let _ = write!(out, "{arg}");
    }
    out
}

fn crate_name<T>() -> &'static str
{
    let name = std::any::type_name::<T>();
    name.split("::").next().unwrap_or(name)
}

struct KeyValueWriter<'s>(&'s mut String);
impl<'kvs> log::kv::VisitSource<'kvs> for KeyValueWriter<'_>
{
    fn visit_pair(&mut self, key: log::kv::Key<'kvs>, value: log::kv::Value<'kvs>) -> Result<(), log::kv::Error>
    {
        let _ = write!(self.0, " {key}={value}");
        Ok(())
    }
}

// Renders a record the way batch pipelines expect to grep for it
pub fn format_audit_line(timestamp: &chrono::DateTime<chrono::Local>, record: &log::Record) -> String
{
    let mut line = format!("[{}][{}][{}:{}] {}",
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.file().map(|f| f.rsplit(['/', '\\']).next().unwrap_or(f)).unwrap_or("?"),
        record.line().unwrap_or(0),
        record.args());
    let _ = record.key_values().visit(&mut KeyValueWriter(&mut line));
    line
}

fn init_logger(style: LogStyle, crate_filters: &[&'static str])
{
    #[cfg(debug_assertions)]
    let default_log_levels = (log::LevelFilter::Warn, log::LevelFilter::Debug);
    #[cfg(not(debug_assertions))]
    let default_log_levels = (log::LevelFilter::Warn, log::LevelFilter::Info);

    let mut builder = colog::basic_builder();
    builder.filter_level(default_log_levels.0);
    for module in crate_filters
    {
        builder.filter_module(module, default_log_levels.1);
    }

    if style == LogStyle::Audit
    {
        builder.format(|buf, record|
        {
            writeln!(buf, "{}", format_audit_line(&chrono::Local::now(), record))
        });
    }

    // RUST_LOG wins over the defaults above
    builder.parse_default_env();
    if let Err(err) = builder.try_init()
    {
        eprintln!("Logger was already initialized: {err}");
    }
}

#[derive(Debug)]
pub struct AppRun<TCliArgs: CliArgs>
{
    pub app_name: &'static str,
    pub version_str: &'static str,

    pub start_time: chrono::DateTime<chrono::Local>,
    pub args: TCliArgs,
    pub pid: u32,
    pub is_elevated: bool,

    pub app_dir: PathBuf, // where the app exe is located (distinct from working dir)

    exit_reason: AtomicI32,
}
impl<TCliArgs: CliArgs> AppRun<TCliArgs>
{
    pub fn startup(app_name: &'static str, app_version: &'static str) -> Self
    {
        let args = TCliArgs::parse();

        let app_crate = crate_name::<TCliArgs>();
        init_logger(args.log_style(), &[app_crate, crate_name::<Self>(), "scene_kiln"]);

        let app_dir = match std::env::current_exe()
        {
            Ok(mut path) => { path.pop(); path }
            Err(err) =>
            {
                log::warn!(target: app_crate, "Failed to get the bin dir: {err}");
                PathBuf::new()
            }
        };

        let app_run = Self
        {
            app_name,
            version_str: app_version,
            start_time: chrono::Local::now(),
            args,
            pid: std::process::id(),
            is_elevated: is_root::is_root(),
            app_dir,
            exit_reason: AtomicI32::new(ExitReason::NormalExit as i32),
        };

        log::info!(target: app_crate,
            "=== Starting {} v{} [{}] (PID {}){} at {} ===",
            app_run.app_name,
            app_run.version_str,
            join_args(" ", std::env::args()),
            app_run.pid,
            if app_run.is_elevated { " elevated" } else { "" },
            app_run.start_time);

        app_run
    }

    pub fn set_exit_reason(&self, exit_reason: ExitReason)
    {
        self.exit_reason.store(exit_reason as i32, Ordering::SeqCst);
    }
    #[must_use]
    pub fn get_exit_reason(&self) -> ExitReason
    {
        ExitReason::from_raw(self.exit_reason.load(Ordering::SeqCst))
    }
}
impl<TCliArgs: CliArgs> Drop for AppRun<TCliArgs>
{
    fn drop(&mut self)
    {
        log::info!(target: crate_name::<TCliArgs>(),
            "Exiting {} (PID {}) at {} with reason {:?}",
            self.app_name,
            self.pid,
            chrono::Local::now(),
            self.get_exit_reason());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitReason
{
    Unset = !1, // this should never be set
    NormalExit = 0,
    BuildFailed = 1,
    Panic = -99,
}
impl ExitReason
{
    #[must_use]
    fn from_raw(raw: i32) -> Self
    {
        match raw
        {
            0 => Self::NormalExit,
            1 => Self::BuildFailed,
            -99 => Self::Panic,
            _ => Self::Unset,
        }
    }
}
impl std::process::Termination for ExitReason
{
    fn report(self) -> ExitCode
    {
        (self as i32 as u8).into()
    }
}

pub trait FatalErrorCode: Debug
{
    fn error_code(&self) -> u16;
}

#[derive(Clone, Copy)]
struct Panic<'p>(&'p PanicHookInfo<'p>);
impl FatalErrorCode for Panic<'_> { fn error_code(&self) -> u16 { 1u16 } }
impl Debug for Panic<'_>
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result
    {
        if let Some(payload_str) = self.0.payload().downcast_ref::<&str>()
        {
            f.write_fmt(format_args!("{payload_str}\n"))?;
        }
        else if let Some(payload_str) = self.0.payload().downcast_ref::<String>()
        {
            f.write_fmt(format_args!("{payload_str}\n"))?;
        }

        if let Some(location) = self.0.location()
        {
            Debug::fmt(&location, f)?
        }

        Ok(())
    }
}

pub fn set_panic_hook()
{
    let default_panic_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic|
    {
        default_panic_hook(panic);
        fatal_error(FatalError::Panic, Panic(panic))
    }));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalError
{
    Panic,
}
impl FatalError
{
    #[must_use]
    pub const fn short_name(self) -> &'static str
    {
        match self
        {
            FatalError::Panic => "PNC",
        }
    }
}

// Exit the process with a fatal error
pub fn fatal_error(fatal_error: FatalError, code: impl FatalErrorCode) -> !
{
    let mut error_msg = format!("{}-{:04X}", fatal_error.short_name(), code.error_code());
    if cfg!(debug_assertions)
    {
        let _ = write!(error_msg, "\n\n{:#?}", &code);
    }

    log::error!("!!! FATAL: {}", error_msg);

    eprintln!("Exiting (PID {}) at {} with reason {:?}",
              std::process::id(),
              chrono::Local::now(),
              ExitReason::Panic);

    std::process::exit(ExitReason::Panic as i32)
}
