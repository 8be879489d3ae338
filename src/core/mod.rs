// ─── Última Esperança Installer Core ───
// Backend for installing and updating the modpack into a game directory.
//
// Architecture:
//   core/
//     paths/      — Default game directory per OS
//     http/       — Shared reqwest client (headers, redirect policy)
//     downloader/ — Chunked archive download with progress + cancellation
//     archive/    — Zip extraction with path-traversal guard
//     options/    — Idempotent rewrites of options.txt and shader settings
//     progress/   — Stage ranges and monotonic progress reporting
//     install/    — Request model, pipeline state machine, run handles
//     state/      — Installer configuration

pub mod archive;
pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod options;
pub mod paths;
pub mod progress;
pub mod state;
