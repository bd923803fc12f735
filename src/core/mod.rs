// ─── jarlink core ───
// Fetches declared jars into a local cache and resolves names through an
// ordered chain of sources.
//
// Architecture:
//   core/
//     maven/      — Descriptors, meta-configuration, repository resolver
//     downloader/ — Transport trait + streaming reqwest downloader
//     sources/    — Directory, archive and classpath sources
//     registry/   — Ordered, concurrency-safe source chain
//     intercept/  — Host contexts + delegating intercepts with depth guard
//     state/      — Settings and the application state

pub mod downloader;
pub mod error;
pub mod http;
pub mod intercept;
pub mod maven;
pub mod registry;
pub mod sources;
pub mod state;
