pub mod item;
pub mod outcome;
pub mod sample;
pub mod status;

// Re-exports for convenience
pub use item::*;
pub use outcome::*;
pub use sample::*;
pub use status::*;
