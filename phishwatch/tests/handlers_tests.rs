use phishwatch::handlers::*;
use phishwatch_core::{AnalysisError, RequestError};
use phishwatch_model::ModelError;
use std::io::Write;
use tempfile::NamedTempFile;
use url::Url;

fn test_options(api_key: Option<&str>) -> ModelOptions {
    ModelOptions {
        api_key: api_key.map(String::from),
        model: "gemini-2.5-flash".to_string(),
        api_base: Url::parse("http://127.0.0.1:9/v1beta").unwrap(),
        timeout_secs: 5,
    }
}

#[test]
fn test_load_request_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(
        temp_file,
        r#"{{"url": "https://example.com", "dom_signature": "<p></p>", "forms": []}}"#
    )?;

    let raw = load_request_file(temp_file.path())?;

    assert_eq!(raw["url"], "https://example.com");
    assert_eq!(raw["dom_signature"], "<p></p>");
    Ok(())
}

#[test]
fn test_load_request_file_invalid_json() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "not json").unwrap();

    let result = load_request_file(temp_file.path());

    assert!(result.is_err());
    assert!(result.unwrap_err().contains("Invalid JSON"));
}

#[test]
fn test_load_request_file_missing() {
    let result = load_request_file(std::path::Path::new("/nonexistent/request.json"));
    assert!(result.unwrap_err().contains("Failed to read request file"));
}

#[test]
fn test_build_model_client_applies_options() {
    let client = build_model_client(&test_options(Some("key"))).unwrap();

    assert!(client.has_api_key());
    assert_eq!(client.model(), "gemini-2.5-flash");
    assert_eq!(
        client.endpoint().unwrap().as_str(),
        "http://127.0.0.1:9/v1beta/models/gemini-2.5-flash:generateContent"
    );
}

#[test]
fn test_build_model_client_without_key_is_lazy() {
    let client = build_model_client(&test_options(None)).unwrap();
    assert!(!client.has_api_key());
}

#[test]
fn test_exit_codes() {
    let rejected = AnalysisError::from(RequestError::MissingRequiredField);
    let failed = AnalysisError::from(ModelError::EmptyResponse);

    assert_eq!(exit_code(&rejected), 2);
    assert_eq!(exit_code(&failed), 1);
}
