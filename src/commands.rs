use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};

use crate::core::error::InstallerResult;
use crate::core::install::{
    InstallEventKind, InstallOutcome, InstallRequest, Installer, PerformancePreset, ShaderQuality,
};
use crate::core::progress::ProgressEvent;
use crate::core::state::InstallerConfig;

/// Exit status conventionally used after SIGINT.
const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Parser)]
#[command(
    name = "ultimaesperanca-installer",
    version,
    about = "Installs or updates the Última Esperança modpack"
)]
pub struct InstallArgs {
    /// Game directory to install into [default: the platform's minecraft folder]
    #[arg(long, short = 'd')]
    pub destination: Option<PathBuf>,

    /// Install with shaders turned off
    #[arg(long)]
    pub no_shader: bool,

    /// Shader quality: low, medium or high
    #[arg(long, default_value = "medium")]
    pub quality: ShaderQuality,

    /// Graphics preset: quality or performance
    #[arg(long, default_value = "quality")]
    pub preset: PerformancePreset,

    /// JSON file overriding the built-in installer settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn build_request(args: &InstallArgs) -> InstallerResult<InstallRequest> {
    let destination_path = match &args.destination {
        Some(path) => path.clone(),
        None => Installer::resolve_default_path()?,
    };

    Ok(InstallRequest {
        destination_path,
        shader_enabled: !args.no_shader,
        shader_quality: args.quality,
        performance_preset: args.preset,
    })
}

/// Runs one install to completion, printing progress and cancelling on Ctrl-C.
pub async fn install(args: InstallArgs) -> InstallerResult<InstallOutcome> {
    let config = InstallerConfig::load_or_default(args.config.as_deref())?;
    let request = build_request(&args)?;
    info!(
        "Installing into {:?} (shaders: {}, quality: {:?}, preset: {:?})",
        request.destination_path,
        request.shader_enabled,
        request.shader_quality,
        request.performance_preset
    );

    let installer = Installer::new(&config)?;
    let mut handle = installer.start_install(request);

    let token = handle.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the download");
            token.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        if let InstallEventKind::Progress(progress) = event.kind {
            render_progress(&progress);
        }
    }
    ctrl_c.abort();

    Ok(handle.wait().await)
}

fn render_progress(progress: &ProgressEvent) {
    println!("[{:>5.1}%] {}", progress.percent, progress.message);
}

pub fn exit_code(outcome: &InstallOutcome) -> ExitCode {
    ExitCode::from(exit_status(outcome))
}

fn exit_status(outcome: &InstallOutcome) -> u8 {
    match outcome {
        InstallOutcome::Success => 0,
        InstallOutcome::Cancelled => EXIT_CANCELLED,
        InstallOutcome::Failed(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_medium_shaders_with_quality_preset() {
        let args = InstallArgs::try_parse_from(["installer", "--destination", "/tmp/game"]).unwrap();
        let request = build_request(&args).unwrap();

        assert_eq!(request.destination_path, PathBuf::from("/tmp/game"));
        assert!(request.shader_enabled);
        assert_eq!(request.shader_quality, ShaderQuality::Medium);
        assert_eq!(request.performance_preset, PerformancePreset::Quality);
    }

    #[test]
    fn flags_map_onto_the_request() {
        let args = InstallArgs::try_parse_from([
            "installer",
            "-d",
            "/srv/mc",
            "--no-shader",
            "--quality",
            "low",
            "--preset",
            "performance",
        ])
        .unwrap();
        let request = build_request(&args).unwrap();

        assert!(!request.shader_enabled);
        assert_eq!(request.shader_quality, ShaderQuality::Low);
        assert_eq!(request.performance_preset, PerformancePreset::Performance);
    }

    #[test]
    fn unknown_quality_is_rejected() {
        assert!(InstallArgs::try_parse_from(["installer", "--quality", "ultra"]).is_err());
    }

    #[test]
    fn outcomes_map_to_exit_codes() {
        assert_eq!(exit_status(&InstallOutcome::Success), 0);
        assert_eq!(exit_status(&InstallOutcome::Failed("x".into())), 1);
        assert_eq!(exit_status(&InstallOutcome::Cancelled), 130);
    }
}
