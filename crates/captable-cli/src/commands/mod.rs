pub mod cap_table;
pub mod conversion;
pub mod scenarios;
pub mod valuation;
pub mod waterfall;

use captable_core::model::ModelInput;

use crate::input;

/// Model input from `--input`, else piped stdin, else the built-in defaults
/// (which carry no projections).
pub fn load_model_input(path: Option<&str>) -> Result<ModelInput, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return input::file::read_input(path);
    }
    if let Some(data) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    log::info!("no input supplied; using default assumptions");
    Ok(ModelInput::default())
}

/// Hybrid pricing needs ARR at the close, so the priced commands refuse to run
/// on the bare defaults.
pub fn require_projections(model: &ModelInput) -> Result<(), Box<dyn std::error::Error>> {
    if model.projections.is_empty() {
        return Err(format!(
            "projections required: hybrid pricing needs ARR for {}; pass --input or pipe a \
             model input with a `projections` list",
            model.assumptions.hybrid.close_year()
        )
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_projections_are_refused() {
        let err = require_projections(&ModelInput::default()).unwrap_err();
        assert!(err.to_string().starts_with("projections required"), "got {err}");
    }

    #[test]
    fn test_projections_present_pass() {
        let model: ModelInput = serde_json::from_str(
            r#"{"projections": [{"year": 2026, "arr": "10000000", "ebitda": "0"}]}"#,
        )
        .unwrap();
        assert!(require_projections(&model).is_ok());
    }
}
