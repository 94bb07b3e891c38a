use crate::value::{Sealed, TomlTable, TomlValue};

/// How the writer orders keys within each tier of a table.
///
/// Value-position entries are always written before nested tables, and
/// nested tables before table-arrays; the sort mode only orders keys within
/// each of those tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySortMode {
    /// Keys appear in the order they were inserted into the table.
    #[default]
    DeclarationOrder,
    /// Keys are sorted alphabetically.
    Alphabetical,
}

/// Style options for rendering a document tree back to text.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Spaces added per table or array nesting level.
    pub indentation_step: usize,
    /// Maximum width comments are reflowed to, in characters.
    pub max_comment_width: usize,
    pub key_sort_mode: KeySortMode,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            indentation_step: 4,
            max_comment_width: 80,
            key_sort_mode: KeySortMode::DeclarationOrder,
        }
    }
}

/// Renders a document tree deterministically. The output re-parses to a
/// structurally equal tree; comments are emitted but not required to
/// round-trip.
#[must_use]
pub fn write(root: &TomlTable, options: &WriteOptions) -> String {
    let mut writer = Writer {
        options,
        out: String::new(),
    };
    writer.write_table(root, &mut Vec::new(), 0);
    writer.out
}

struct Writer<'a> {
    options: &'a WriteOptions,
    out: String,
}

impl Writer<'_> {
    fn write_table(&mut self, table: &TomlTable, path: &mut Vec<String>, depth: usize) {
        let mut values = Vec::new();
        let mut tables = Vec::new();
        let mut table_arrays = Vec::new();
        for (key, entry) in table.iter() {
            match &entry.value {
                TomlValue::Table(t) if t.sealed() != Sealed::Full => tables.push((key, entry, t)),
                TomlValue::TableArray(elements) => table_arrays.push((key, entry, elements)),
                _ => values.push((key, entry)),
            }
        }
        if self.options.key_sort_mode == KeySortMode::Alphabetical {
            values.sort_by_key(|(key, _)| *key);
            tables.sort_by_key(|(key, _, _)| *key);
            table_arrays.sort_by_key(|(key, _, _)| *key);
        }

        for (key, entry) in values {
            self.write_comments(&entry.comments, depth);
            self.push_indent(depth);
            self.out.push_str(&render_key(key));
            self.out.push_str(" = ");
            self.write_value(&entry.value, depth, false);
            self.out.push('\n');
        }

        for (key, entry, child) in tables {
            path.push(key.to_string());
            log::trace!("writing table [{}]", render_path(path));
            self.blank_line();
            self.write_comments(&entry.comments, depth);
            self.push_indent(depth);
            self.out.push('[');
            self.out.push_str(&render_path(path));
            self.out.push_str("]\n");
            self.write_table(child, path, depth + 1);
            path.pop();
        }

        for (key, entry, elements) in table_arrays {
            path.push(key.to_string());
            for element in elements {
                self.blank_line();
                self.write_comments(&entry.comments, depth);
                self.push_indent(depth);
                self.out.push_str("[[");
                self.out.push_str(&render_path(path));
                self.out.push_str("]]\n");
                self.write_table(element, path, depth + 1);
            }
            path.pop();
        }
    }

    fn write_value(&mut self, value: &TomlValue, depth: usize, force_inline: bool) {
        match value {
            TomlValue::String(text) => {
                self.out.push('"');
                self.out.push_str(&escape_basic(text));
                self.out.push('"');
            }
            TomlValue::Integer { value, .. } => self.out.push_str(&value.to_string()),
            TomlValue::Float { value, .. } => self.out.push_str(&render_float(*value)),
            TomlValue::Boolean(value) => self.out.push_str(if *value { "true" } else { "false" }),
            TomlValue::Array(values) => self.write_array(values, depth, force_inline),
            TomlValue::Table(table) => self.write_inline_table(table, depth),
            TomlValue::TableArray(elements) => {
                // Only reachable in hand-built trees; render as an array of
                // inline tables.
                let values: Vec<TomlValue> =
                    elements.iter().cloned().map(TomlValue::Table).collect();
                self.write_array(&values, depth, force_inline);
            }
        }
    }

    fn write_array(&mut self, values: &[TomlValue], depth: usize, force_inline: bool) {
        // An element starting a fresh line with `[` would read as a table
        // header, so an array holding arrays must stay on one line. Arrays
        // holding only inline tables may break across lines.
        let has_array = values
            .iter()
            .any(|v| matches!(v, TomlValue::Array(_) | TomlValue::TableArray(_)));
        let inline = force_inline || has_array || values.iter().all(is_scalar);
        self.out.push('[');
        if inline {
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.write_value(value, depth, true);
            }
            self.out.push(']');
        } else {
            self.out.push('\n');
            for value in values {
                self.push_indent(depth + 1);
                self.write_value(value, depth + 1, true);
                self.out.push_str(",\n");
            }
            self.push_indent(depth);
            self.out.push(']');
        }
    }

    fn write_inline_table(&mut self, table: &TomlTable, depth: usize) {
        if table.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{ ");
        for (i, (key, entry)) in table.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&render_key(key));
            self.out.push_str(" = ");
            self.write_value(&entry.value, depth, true);
        }
        self.out.push_str(" }");
    }

    fn write_comments(&mut self, comments: &[String], depth: usize) {
        for comment in comments {
            for line in reflow(comment, self.options.max_comment_width) {
                self.push_indent(depth);
                if line.is_empty() {
                    self.out.push_str("#\n");
                } else {
                    self.out.push_str("# ");
                    self.out.push_str(&line);
                    self.out.push('\n');
                }
            }
        }
    }

    fn blank_line(&mut self) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
    }

    fn push_indent(&mut self, depth: usize) {
        self.out
            .push_str(&" ".repeat(depth * self.options.indentation_step));
    }
}

fn is_scalar(value: &TomlValue) -> bool {
    matches!(
        value,
        TomlValue::String(_)
            | TomlValue::Integer { .. }
            | TomlValue::Float { .. }
            | TomlValue::Boolean(_)
    )
}

fn render_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_string()
    } else {
        format!("\"{}\"", escape_basic(key))
    }
}

fn render_path(path: &[String]) -> String {
    path.iter()
        .map(|segment| render_key(segment))
        .collect::<Vec<_>>()
        .join(".")
}

// Finite floats keep a fractional part so they re-parse as floats, not
// integers.
fn render_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn escape_basic(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{0008}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{000C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// Greedily packs words onto lines no wider than `width`; a single word
/// longer than the width goes alone on its own line.
fn reflow(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
        } else if line.len() + 1 + word.len() <= width {
            line.push(' ');
            line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        }
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Key, TomlValue};

    fn options() -> WriteOptions {
        WriteOptions::default()
    }

    #[test]
    fn test_empty_root_writes_nothing() {
        assert_eq!(write(&TomlTable::new(), &options()), "");
    }

    #[test]
    fn test_scalars_before_tables_before_table_arrays() {
        let mut root = TomlTable::new();
        root.insert(&Key::from(vec!["server", "host"]), TomlValue::string("x"))
            .unwrap();
        root.insert(&Key::from("port"), TomlValue::integer(1))
            .unwrap();
        root.declare_table_array(&Key::from("job")).unwrap();
        root.table_at_path(&["job".to_string()])
            .unwrap()
            .insert(&Key::from("id"), TomlValue::integer(7))
            .unwrap();

        let text = write(&root, &options());
        assert_eq!(
            text,
            "port = 1\n\
             \n\
             [server]\n\
             \x20   host = \"x\"\n\
             \n\
             [[job]]\n\
             \x20   id = 7\n"
        );
    }

    #[test]
    fn test_nested_table_headers_use_absolute_paths() {
        let mut root = TomlTable::new();
        root.insert(&Key::from(vec!["a", "b", "c"]), TomlValue::integer(1))
            .unwrap();
        let text = write(&root, &options());
        assert!(text.contains("[a]"));
        assert!(text.contains("    [a.b]"));
        assert!(text.contains("        c = 1"));
    }

    #[test]
    fn test_alphabetical_sort_within_tiers() {
        let mut root = TomlTable::new();
        root.insert(&Key::from("zeta"), TomlValue::integer(1))
            .unwrap();
        root.insert(&Key::from("alpha"), TomlValue::integer(2))
            .unwrap();
        let opts = WriteOptions {
            key_sort_mode: KeySortMode::Alphabetical,
            ..options()
        };
        let text = write(&root, &opts);
        assert!(text.find("alpha").unwrap() < text.find("zeta").unwrap());
    }

    #[test]
    fn test_scalar_array_renders_inline() {
        let mut root = TomlTable::new();
        root.insert(
            &Key::from("a"),
            TomlValue::Array(vec![
                TomlValue::integer(1),
                TomlValue::integer(2),
                TomlValue::integer(3),
            ]),
        )
        .unwrap();
        assert_eq!(write(&root, &options()), "a = [1, 2, 3]\n");
    }

    #[test]
    fn test_array_of_tables_breaks_across_lines() {
        let mut element = TomlTable::new();
        element
            .insert(&Key::from("x"), TomlValue::integer(1))
            .unwrap();
        let mut root = TomlTable::new();
        root.insert(
            &Key::from("a"),
            TomlValue::Array(vec![TomlValue::Table(element.clone()), TomlValue::Table(element)]),
        )
        .unwrap();
        let text = write(&root, &options());
        assert_eq!(text, "a = [\n    { x = 1 },\n    { x = 1 },\n]\n");
    }

    #[test]
    fn test_array_holding_arrays_stays_on_one_line() {
        let mut root = TomlTable::new();
        root.insert(
            &Key::from("a"),
            TomlValue::Array(vec![
                TomlValue::Array(vec![TomlValue::integer(1)]),
                TomlValue::Array(vec![TomlValue::integer(2)]),
            ]),
        )
        .unwrap();
        assert_eq!(write(&root, &options()), "a = [[1], [2]]\n");
    }

    #[test]
    fn test_floats_always_reparse_as_floats() {
        assert_eq!(render_float(1.0), "1.0");
        assert_eq!(render_float(0.5), "0.5");
        assert_eq!(render_float(f64::INFINITY), "inf");
        assert_eq!(render_float(f64::NEG_INFINITY), "-inf");
        assert_eq!(render_float(f64::NAN), "nan");
    }

    #[test]
    fn test_keys_needing_quotes_are_quoted() {
        let mut root = TomlTable::new();
        root.insert(&Key::from("my key"), TomlValue::integer(1))
            .unwrap();
        assert_eq!(write(&root, &options()), "\"my key\" = 1\n");
    }

    #[test]
    fn test_string_escaping() {
        let mut root = TomlTable::new();
        root.insert(&Key::from("s"), TomlValue::string("a\"b\\c\nd"))
            .unwrap();
        assert_eq!(write(&root, &options()), "s = \"a\\\"b\\\\c\\nd\"\n");
    }

    #[test]
    fn test_comment_reflow_breaks_at_word_boundaries() {
        let mut root = TomlTable::new();
        root.insert(&Key::from("k"), TomlValue::integer(1)).unwrap();
        root.add_comment(&Key::from("k"), "alpha beta gamma delta")
            .unwrap();
        let opts = WriteOptions {
            max_comment_width: 11,
            ..options()
        };
        let text = write(&root, &opts);
        assert_eq!(text, "# alpha beta\n# gamma delta\nk = 1\n");
    }

    #[test]
    fn test_overlong_word_goes_alone() {
        assert_eq!(
            reflow("a incomprehensibilities b", 10),
            vec![
                "a".to_string(),
                "incomprehensibilities".to_string(),
                "b".to_string(),
            ]
        );
    }

    #[test]
    fn test_comment_on_table_header() {
        let mut root = TomlTable::new();
        root.insert(&Key::from(vec!["t", "x"]), TomlValue::integer(1))
            .unwrap();
        root.add_comment(&Key::from("t"), "section").unwrap();
        let text = write(&root, &options());
        assert!(text.contains("# section\n[t]\n"));
    }

    #[test]
    fn test_full_tables_render_inline() {
        let mut inline = TomlTable::new();
        inline
            .insert(&Key::from("x"), TomlValue::integer(1))
            .unwrap();
        inline.seal(Sealed::Full);
        let mut root = TomlTable::new();
        root.insert(&Key::from("t"), TomlValue::Table(inline))
            .unwrap();
        assert_eq!(write(&root, &options()), "t = { x = 1 }\n");
    }

    #[test]
    fn test_open_tables_render_as_headers() {
        let mut root = TomlTable::new();
        root.insert(&Key::from("t"), TomlValue::Table(TomlTable::new()))
            .unwrap();
        assert_eq!(write(&root, &options()), "[t]\n");
    }
}
