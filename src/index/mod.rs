pub mod builder;
pub mod cascade;
pub mod layer;
pub mod repeat;

pub use builder::{IndexBuilder, IndexMeta, MapperIndex};
pub use cascade::Cascade;
pub use layer::{BitFilterLayer, Layout};

/// Bases between build progress messages.
pub const PROGRESS_INTERVAL: usize = 10_000_000;
