use flux_core::{FloatParameter, Multiply, MultiplyParameter, ParameterSet, ParameterSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bands::{
    BandConfig, DEFAULT_EVALUATION_SAMPLE_COUNT, DEFAULT_ONSET_IMPACT, DEFAULT_SMOOTH_TIME,
};
use crate::error::Result;
use crate::measurement::FluxMeasurement;

/// On-disk description of a flux measurement setup.
///
/// Parameters are referenced by id. Ids declared in `parameters` are created
/// when the config is built; any other id must already exist in the
/// [`ParameterSet`] passed to [`MeasurementConfig::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub multiply: Vec<MultiplySpec>,
    pub bands: Vec<BandSpec>,
}

/// One band entry. Frequency defaults cover the full audible range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    #[serde(default)]
    pub min_hz: f32,
    #[serde(default = "default_max_hz")]
    pub max_hz: f32,
    #[serde(default = "default_onset_impact")]
    pub onset_impact: f32,
    #[serde(default = "default_smooth_time")]
    pub smooth_time: f32,
    #[serde(default = "default_evaluation_sample_count")]
    pub evaluation_sample_count: u32,
    pub parameter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_onset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stretch: Option<String>,
}

/// A derived `output = input * multiply` parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplySpec {
    pub input: String,
    pub output: String,
    #[serde(default = "default_multiply")]
    pub multiply: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiply_parameter: Option<String>,
}

fn default_enable() -> bool {
    true
}

fn default_max_hz() -> f32 {
    44100.0
}

fn default_onset_impact() -> f32 {
    DEFAULT_ONSET_IMPACT
}

fn default_smooth_time() -> f32 {
    DEFAULT_SMOOTH_TIME
}

fn default_evaluation_sample_count() -> u32 {
    DEFAULT_EVALUATION_SAMPLE_COUNT
}

fn default_multiply() -> f32 {
    1.0
}

impl BandSpec {
    fn resolve(&self, parameters: &ParameterSet) -> Result<BandConfig> {
        Ok(BandConfig {
            min_hz: self.min_hz,
            max_hz: self.max_hz,
            onset_impact: self.onset_impact,
            smooth_time: self.smooth_time,
            evaluation_sample_count: self.evaluation_sample_count,
            parameter: parameters.require(&self.parameter)?,
            multiplier: parameters.resolve(self.multiplier.as_deref())?,
            offset: parameters.resolve(self.offset.as_deref())?,
            decay: parameters.resolve(self.decay.as_deref())?,
            target_onset: parameters.resolve(self.target_onset.as_deref())?,
            stretch: parameters.resolve(self.stretch.as_deref())?,
        })
    }
}

impl MultiplySpec {
    fn resolve(&self, parameters: &ParameterSet) -> Result<MultiplyParameter> {
        let multiply = Multiply {
            value: self.multiply,
            parameter: parameters.resolve(self.multiply_parameter.as_deref())?,
        };
        Ok(MultiplyParameter::new(
            parameters.require(&self.input)?,
            multiply,
            parameters.require(&self.output)?,
        ))
    }
}

impl MeasurementConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save the config to disk as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Resolve every band against `parameters` plus the declared parameters
    /// and build the measurement. The declared parameters are added to
    /// `parameters` only when the build succeeds.
    pub fn build(
        &self,
        parameters: &mut ParameterSet,
        sample_rate: f32,
        bin_count: usize,
    ) -> Result<FluxMeasurement> {
        let mut scope = parameters.clone();
        for spec in &self.parameters {
            scope.insert(FloatParameter::from_spec(spec)?)?;
        }

        let configs = self
            .bands
            .iter()
            .map(|band| band.resolve(&scope))
            .collect::<Result<Vec<_>>>()?;
        let derived = self
            .multiply
            .iter()
            .map(|m| m.resolve(&scope))
            .collect::<Result<Vec<_>>>()?;

        let mut measurement = FluxMeasurement::new(configs, sample_rate, bin_count)?.with_derived(derived);
        measurement.set_enabled(self.enable);
        *parameters = scope;
        log::info!(
            "flux measurement built: {} bands, {} bins at {} Hz",
            measurement.bands().len(),
            bin_count,
            sample_rate
        );
        Ok(measurement)
    }
}
