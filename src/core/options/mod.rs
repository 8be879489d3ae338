pub mod patcher;

pub use patcher::{ConfigPatcher, PatchError, PatchStep};
