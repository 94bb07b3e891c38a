use toml_core::api::parse_document;
use toml_core::{Key, TomlValue, WriteOptions};

#[test]
fn test_parse_to_json() {
    let source = r#"
name = "My App"
version = 1.5
is_enabled = true
features = ["a", "b", "c"]

[config]
host = "localhost"
port = 8080
"#;

    let expected_json = serde_json::json!({
        "name": "My App",
        "version": 1.5,
        "is_enabled": true,
        "features": ["a", "b", "c"],
        "config": {
            "host": "localhost",
            "port": 8080,
        }
    });

    let document = parse_document(source).unwrap();
    let result = document.to_json().unwrap();
    let result_json: serde_json::Value = serde_json::from_str(&result).unwrap();

    assert_eq!(result_json, expected_json);
}

#[test]
fn test_parse_to_yaml() {
    let source = "name = \"My App\"\nversion = 1.5\nis_enabled = true\n";

    let expected_yaml = "is_enabled: true\nname: My App\nversion: 1.5\n";

    let document = parse_document(source).unwrap();
    let result = document.to_yaml().unwrap();

    assert_eq!(result, expected_yaml);
}

#[test]
fn test_document_write_uses_options() {
    let document = parse_document("[outer]\ninner = 1\n").unwrap();
    let narrow = document.write(&WriteOptions {
        indentation_step: 2,
        ..WriteOptions::default()
    });
    assert!(narrow.contains("\n  inner = 1\n"));
    let wide = document.write(&WriteOptions {
        indentation_step: 8,
        ..WriteOptions::default()
    });
    assert!(wide.contains("\n        inner = 1\n"));
}

#[test]
fn test_document_exposes_the_tree() {
    let document = parse_document("a = 1\n").unwrap();
    assert_eq!(
        document.root.get(&Key::from("a")).unwrap().as_integer(),
        Some(1)
    );
    assert!(matches!(
        document.root.get(&Key::from("a")),
        Some(TomlValue::Integer { .. })
    ));
}
