// THEORY:
// This file is the main entry point for the `ipts_touch` library crate. It turns
// raw Intel Precise Touch & Stylus reports into multi-touch contacts.
//
// The primary interface is `TouchPipeline` (with `TouchConfig` and the
// `ContactFrame` it returns). The stage modules in `core_modules` are public so
// tooling can run a single stage, but a driver only needs the pipeline, a
// `FrameReader` to feed it and a `ContactSink` to drain it.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod visual;

#[cfg(test)]
mod test_support;

pub use config::TouchConfig;
pub use core_modules::blob::{Blob, FrameBlobSet};
pub use core_modules::contact::{Contact, ContactFrame, InputEvent};
pub use core_modules::heatmap::Heatmap;
pub use error::{ConfigError, DecodeError, PipelineError};
pub use pipeline::TouchPipeline;
pub use sink::{ContactSink, FrameObserver, LogSink};
pub use source::{FrameReader, ReadMode, ReadOutcome};
