//! Inbound trigger surface: the HTTP server and its event subscriber, the
//! two paths that both ultimately call `PipelineOrchestrator::run`.

pub mod events;
pub mod http;
