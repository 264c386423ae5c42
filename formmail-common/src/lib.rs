pub mod address;
pub mod logging;
pub mod text;

pub use tracing;
