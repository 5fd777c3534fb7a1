use napi::Result as NapiResult;
use napi_derive::napi;
use serde_json::Value;

use property_sim_core::{SimulatorConfig, SimulatorError};

/// Convert a simulator error into a napi::Error whose reason starts with the
/// machine-readable kind tag, e.g. `[unsafe_input] ...`.
fn to_napi_error(e: SimulatorError) -> napi::Error {
    napi::Error::from_reason(format!("[{}] {}", e.kind(), e))
}

/// Convert any other Display error into a napi::Error.
fn to_napi_reason(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_input(input_json: &str) -> NapiResult<Value> {
    serde_json::from_str(input_json).map_err(|e| to_napi_error(e.into()))
}

fn parse_config(config_json: Option<String>) -> NapiResult<SimulatorConfig> {
    match config_json {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| to_napi_error(e.into())),
        None => Ok(SimulatorConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[napi]
pub fn simulate(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let raw = parse_input(&input_json)?;
    let config = parse_config(config_json)?;
    let output = property_sim_core::run_simulation(&raw, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_reason)
}

#[napi]
pub fn loan_schedule(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let raw = parse_input(&input_json)?;
    let config = parse_config(config_json)?;
    let output = property_sim_core::loan_schedule(&raw, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_reason)
}

// ---------------------------------------------------------------------------
// Sanitisation
// ---------------------------------------------------------------------------

#[napi]
pub fn sanitize_input(input_json: String) -> NapiResult<String> {
    let raw = parse_input(&input_json)?;
    let sanitized = property_sim_core::sanitize::sanitize_input(&raw).map_err(to_napi_error)?;
    let output = serde_json::json!({
        "input": sanitized.input,
        "warnings": sanitized.warnings,
    });
    serde_json::to_string(&output).map_err(to_napi_reason)
}
