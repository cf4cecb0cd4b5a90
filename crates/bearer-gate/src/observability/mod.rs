//! Observability for the authentication gate.
//!
//! Only the `metrics` facade is used; the host installs the recorder and
//! exporter.

pub mod metrics;
