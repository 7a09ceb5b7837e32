//! Services for faw-watcher

pub mod csv_sink;
pub mod extraction;
pub mod frame_pipeline;
pub mod scorer;
pub mod session_worker;
pub mod watcher;
