use ssot_core::errors::{ErrorInfo, SsotError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("key", "geometry.k_gimel")
        .with_context("registry", "parameters")
}

#[test]
fn not_found_surface() {
    let err = SsotError::not_found("parameters", "geometry.k_gimel");
    assert_eq!(err.info().code, "registry.not_found");
    assert_eq!(err.family(), "NotFound");
    assert_eq!(
        err.info().context.get("key").map(String::as_str),
        Some("geometry.k_gimel")
    );
}

#[test]
fn duplicate_key_surface() {
    let err = SsotError::DuplicateKey(sample_info("registry.duplicate", "already registered"));
    assert_eq!(err.family(), "DuplicateKey");
    assert!(err.info().context.contains_key("registry"));
}

#[test]
fn missing_operand_surface() {
    let err = SsotError::missing_operand("alpha.inv", "no computed value");
    assert_eq!(err.info().code, "cert.missing_operand");
    assert_eq!(err.family(), "MissingOperand");
}

#[test]
fn display_includes_context_and_hint() {
    let err = SsotError::InvalidEntry(
        sample_info("quantity.name", "bad name").with_hint("use dotted names"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("invalid entry: bad name (code: quantity.name)"));
    assert!(rendered.contains("key=geometry.k_gimel, registry=parameters"));
    assert!(rendered.ends_with("hint: use dotted names"));
}

#[test]
fn error_serializes_with_family_tag() {
    let err = SsotError::Cancelled(ErrorInfo::new("audit.cancelled", "stop"));
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Cancelled");
    assert_eq!(json["detail"]["code"], "audit.cancelled");
    let decoded: SsotError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(decoded, err);
}

#[test]
fn runtime_surface() {
    let err = SsotError::Runtime(
        ErrorInfo::new("audit.thread_pool", "could not spawn worker").with_context("concurrency", "4"),
    );
    assert_eq!(err.family(), "Runtime");
    assert!(err.to_string().starts_with("runtime error: could not spawn worker"));
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Runtime");
}
