//! Streaming voice conversion over directories of recordings.
//!
//! # Architecture
//!
//! A session loads one [`ConversionEngine`], acquires one
//! [`TargetRepresentation`] and then converts files independently:
//!
//! 1. decode and resample to 16kHz, average channels to mono
//! 2. convert, either whole-file or in overlapping [`ChunkPlan`] windows
//! 3. resample back to the file's rate and fit to its frame count
//! 4. optionally peak-normalize, then write `<stem>.wav`
//!
//! # Chunking
//!
//! With chunk size `C`, each window holds three chunks of context and only
//! its middle chunk is kept:
//!
//! ```text
//! padded:  [ C zeros | input (L) | 4C zeros ]
//! window i:  [iC ........ iC+3C)
//! kept:          [iC+C .. iC+2C)
//! ```
//!
//! # Targets
//!
//! The target voice comes either from a reference recording (encoded by the
//! engine) or from an index file written by [`index::save_file`]. An index
//! path other than `none` always wins.

mod batch;
mod chunk;
mod config;
mod convertor;
pub mod dsp;
mod engine;
mod error;
pub mod index;
mod params;
pub mod pitch;
mod registry;
mod target;
mod vocoder;

pub use batch::{BatchReport, FileReport, FileStatus, Session, list_inputs};
pub use chunk::{ChunkPlan, ConversionMode, MAX_CHUNK_SIZE};
pub use config::ConvertConfig;
pub use convertor::{ConvertOptions, OUTPUT_EXTENSION, Stage, StreamingConvertor, output_path};
pub use dsp::{DspConfig, DspEngine};
pub use engine::{ConversionEngine, EngineOptions};
pub use error::ConvertError;
pub use params::{ConversionParams, Device, PitchAlgorithm};
pub use registry::{EngineLoader, MANIFEST_FILE, load_engine, register_engine, registered_engines};
pub use target::{NO_INDEX, TargetEncoder, TargetRepresentation, TargetSource};

pub use tokio_util::sync::CancellationToken;
