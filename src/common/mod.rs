mod fs;
mod polygon;

pub use fs::OverwritePolicy;
pub(crate) use fs::*;
pub(crate) use polygon::*;
