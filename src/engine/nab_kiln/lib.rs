pub mod app;
pub mod timing;
