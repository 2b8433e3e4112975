use trialgen_core::errors::{ErrorInfo, TrialgenError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("index", "3")
        .with_context("label", "NP")
}

#[test]
fn config_error_surface() {
    let err = TrialgenError::Config(sample_info("CF001", "proportions do not sum to one"));
    assert_eq!(err.info().code, "CF001");
    assert!(err.info().context.contains_key("index"));
}

#[test]
fn infeasible_error_surface() {
    let err = TrialgenError::Infeasible(sample_info("IN001", "no previous singleton"));
    assert_eq!(err.info().code, "IN001");
    assert_eq!(err.info().context.get("label").map(String::as_str), Some("NP"));
}

#[test]
fn pool_and_layout_error_surface() {
    let pool = TrialgenError::Pool(sample_info("P001", "missing pool"));
    let layout = TrialgenError::Layout(sample_info("L001", "directory not empty"));
    assert_eq!(pool.info().code, "P001");
    assert_eq!(layout.info().code, "L001");
}

#[test]
fn display_includes_context_and_hint() {
    let err = TrialgenError::Serde(
        ErrorInfo::new("csv-read", "bad row")
            .with_context("path", "pool.csv")
            .with_hint("regenerate the pool"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("serde error: bad row (code: csv-read)"));
    assert!(rendered.contains("path=pool.csv"));
    assert!(rendered.contains("hint: regenerate the pool"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = TrialgenError::Rng(ErrorInfo::new("RN001", "invalid seed"));
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], "Rng");
    assert_eq!(json["detail"]["code"], "RN001");
    let back: TrialgenError = serde_json::from_value(json).unwrap();
    assert_eq!(back, err);
}
