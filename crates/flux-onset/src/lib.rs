//! Spectral-flux onset detection for audio-reactive control parameters.
//!
//! A [`FluxMeasurement`] is fed one magnitude spectrum per analysis tick. For
//! every configured frequency band it computes the rectified spectral flux
//! against the previous tick, runs it through an [`OnsetEnvelope`] and writes
//! the calibrated result into the band's output parameter.

pub mod error;
pub mod spectrum;
pub mod bands;
pub mod envelope;
pub mod measurement;
pub mod handoff;
pub mod level;
pub mod config;

pub use error::{OnsetError, Result};
pub use spectrum::{band_average, spectral_flux, BinRange};
pub use bands::{hz_per_bin, resolve_bins, Band, BandConfig, BandRegistry};
pub use envelope::{BandState, OnsetEnvelope};
pub use measurement::FluxMeasurement;
pub use handoff::{SpectrumChannel, SpectrumSender};
pub use level::LevelMeter;
pub use config::{BandSpec, MeasurementConfig, MultiplySpec};
