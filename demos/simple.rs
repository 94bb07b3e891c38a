use toml_core::{parse_document, WriteOptions};

fn main() {
    let toml_data = r#"
[user]
name = "John Doe"
email = "john.doe@example.com"
"#;

    match parse_document(toml_data) {
        Ok(document) => {
            let json_output = document.to_json().unwrap();
            println!("Successfully parsed TOML to JSON:\n{json_output}");
            println!(
                "\nRendered back to TOML:\n{}",
                document.write(&WriteOptions::default())
            );
        }
        Err(e) => {
            eprintln!("Failed to parse TOML: {e:?}");
        }
    }
}
