pub mod app;
pub mod cli;
pub mod environment;
pub mod exerciser;
pub mod report;
pub mod runpod;
pub mod runtime;
pub mod smi;
