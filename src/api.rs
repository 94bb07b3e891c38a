use crate::error::TomlError;
use crate::parser::Parser;
use crate::serialization::{table_to_value, Value};
use crate::value::TomlTable;
use crate::writer::{self, WriteOptions};
use serde::{Serialize, Serializer};

/// The result of successfully parsing a document.
///
/// This struct owns the fully built document tree and provides methods for
/// rendering it back to text or exporting it to other formats, making it
/// suitable both for direct consumption and as the input to a mapping layer.
#[derive(Debug)]
pub struct TomlDocument {
    pub root: TomlTable,
}

impl Serialize for TomlDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

impl TomlDocument {
    /// Exports the document tree into a generic, serializable `Value`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        table_to_value(&self.root)
    }

    /// Exports the document into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Exports the document into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }

    /// Renders the document back to text with the given style options.
    #[must_use]
    pub fn write(&self, options: &WriteOptions) -> String {
        writer::write(&self.root, options)
    }
}

/// Parses a complete document from a string.
///
/// This is the primary entry point for reading documents. It composes the
/// three stages of the engine - tokenization, disambiguation and the grammar
/// machine - and returns a [`TomlDocument`] owning the finished tree.
///
/// # Errors
///
/// Returns a `TomlError` if tokenization or parsing fails. No partial tree
/// is produced on failure; the caller decides whether to propagate the error
/// or substitute a default document.
pub fn parse_document(source: &str) -> Result<TomlDocument, TomlError> {
    parse_document_named(source, "document.toml")
}

/// Parses a complete document, naming the source for error reporting.
///
/// # Errors
///
/// Returns a `TomlError` if tokenization or parsing fails.
pub fn parse_document_named(source: &str, name: &str) -> Result<TomlDocument, TomlError> {
    let mut parser = Parser::new_with_name(source, name.to_string())?;
    let root = parser.parse()?;
    Ok(TomlDocument { root })
}

/// Renders a document tree to text with the given style options.
#[must_use]
pub fn write_document(root: &TomlTable, options: &WriteOptions) -> String {
    writer::write(root, options)
}

#[cfg(test)]
mod tests {
    use crate::parse_document;

    #[test]
    fn test_simple_parse_to_json() {
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
    fn test_simple_parse_to_yaml() {
        let source = "name = \"My App\"\nversion = 1.5\nis_enabled = true\n";

        let expected_yaml = "is_enabled: true\nname: My App\nversion: 1.5\n";

        let document = parse_document(source).unwrap();
        let result = document.to_yaml().unwrap();

        assert_eq!(result, expected_yaml);
    }

    #[test]
    fn test_table_arrays_export_as_json_arrays() {
        let source = "[[user]]\nid = 1\n[[user]]\nid = 2\n";
        let document = parse_document(source).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&document.to_json().unwrap()).unwrap();
        assert_eq!(json["user"][0]["id"], 1);
        assert_eq!(json["user"][1]["id"], 2);
    }
}
