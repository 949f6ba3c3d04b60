//! Process wiring for the weatherbell background worker: startup gazetteer
//! import, the status endpoint and signal handling.

pub mod bootstrap;
pub mod shutdown;
pub mod status;
