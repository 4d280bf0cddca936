mod algorithm;
mod device;
mod registry;

pub use algorithm::*;
pub use device::*;
pub use registry::*;
