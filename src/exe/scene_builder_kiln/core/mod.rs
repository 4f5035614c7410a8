mod environment;
pub use environment::*;

mod provision;
pub use provision::*;

mod persist;
pub use persist::*;

mod build_record;
pub use build_record::*;

mod pipeline;
pub use pipeline::*;

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

// Non-fatal conditions worth an operator's attention
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory
{
    ContainerReused
    {
        container: String,
    },
    WorkingDirInvalid
    {
        path: PathBuf,
    },
}
impl Display for Advisory
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Advisory::ContainerReused { container } =>
                write!(f, "Group {container} already exists. Using existing one."),
            Advisory::WorkingDirInvalid { path } =>
                write!(f, "Working directory {} is invalid. The engine may save elsewhere.", path.display()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Advisories(Vec<Advisory>);
impl Advisories
{
    // Log and keep an advisory
    pub fn raise(&mut self, advisory: Advisory)
    {
        log::warn!("{advisory}");
        self.0.push(advisory);
    }

    #[inline] #[must_use]
    #[cfg(test)]
    pub fn as_slice(&self) -> &[Advisory] { &self.0 }

    #[inline] #[must_use]
    pub fn into_vec(self) -> Vec<Advisory> { self.0 }
}
