pub mod handle;
pub mod model;
pub mod pipeline;

pub use handle::{InstallHandle, Installer};
pub use model::{
    InstallEvent, InstallEventKind, InstallOutcome, InstallRequest, InstallStage,
    PerformancePreset, ShaderQuality,
};
pub use pipeline::InstallPipeline;
