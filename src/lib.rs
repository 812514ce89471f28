pub mod config;
pub mod convert;
pub mod describe;
pub mod io;
pub mod pipeline;
pub mod recast;
