//! Batch stock-photo submission: upload images, attach context hints, run AI
//! metadata analysis, review the result, and publish through a remote
//! embed-and-transfer pipeline.
pub mod credentials;
pub mod service;
pub mod workflow;
pub mod workspace;
