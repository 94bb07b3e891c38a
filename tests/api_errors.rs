// API error path tests
// These test error handling, conversions, and edge cases in the API layer

use toml_core::{error::TomlError, parse_document, parse_document_named};

#[test]
fn test_api_tokenization_error_kind() {
    let result = parse_document("a = @nonsense");
    assert!(result.is_err());
    if let Err(TomlError::Tokenization(_)) = result {
        // Success
    } else {
        panic!("Expected a tokenization error");
    }
}

#[test]
fn test_api_parsing_error_kind() {
    let result = parse_document("a = = 1");
    assert!(result.is_err());
    if let Err(TomlError::Parsing(_)) = result {
        // Success
    } else {
        panic!("Expected a parsing error");
    }
}

#[test]
fn test_api_structural_error_kind() {
    let result = parse_document("a = 1\na = 2\n");
    assert!(result.is_err());
    if let Err(TomlError::Parsing(_)) = result {
        // Success
    } else {
        panic!("Expected a parsing error");
    }
}

#[test]
fn test_api_errors_render_a_report() {
    let err = parse_document("key = \"unterminated").unwrap_err();
    let report = miette::Report::new(err);
    let rendered = format!("{report:?}");
    assert!(!rendered.is_empty());
}

#[test]
fn test_api_empty_source() {
    let result = parse_document("");
    assert!(result.is_ok());
    assert!(result.unwrap().root.is_empty());
}

#[test]
fn test_api_whitespace_only_source() {
    let result = parse_document("  \n\t\n  \n");
    assert!(result.is_ok());
}

#[test]
fn test_api_empty_filename() {
    let result = parse_document_named("a = 1\n", "");
    assert!(result.is_ok());
}

#[test]
fn test_api_special_chars_in_filename() {
    let result = parse_document_named("a = 1\n", "configs/app-v2_final.toml");
    assert!(result.is_ok());
}
