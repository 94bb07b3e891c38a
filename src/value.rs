use crate::error::StructureError;
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::fmt;

/// The radix an integer literal was written in. Retained for display
/// fidelity; the writer always emits decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerBase {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

impl IntegerBase {
    #[must_use]
    pub fn radix(self) -> u32 {
        match self {
            IntegerBase::Binary => 2,
            IntegerBase::Octal => 8,
            IntegerBase::Decimal => 10,
            IntegerBase::Hexadecimal => 16,
        }
    }
}

/// The mutability phase of a table.
///
/// `Open` tables have not been declared yet; `Partial` tables were declared
/// by a header or dotted assignment and may still receive first-level keys;
/// `Full` tables came from an inline table literal and are permanently
/// closed. Transitions happen only inside the grammar parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sealed {
    #[default]
    Open,
    Partial,
    Full,
}

/// An ordered, non-empty sequence of name segments denoting a path through
/// nested tables. Segments compare verbatim; quoting is a lexical concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    segments: Vec<String>,
}

impl Key {
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Key { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl From<&str> for Key {
    fn from(segment: &str) -> Self {
        Key::new(vec![segment.to_string()])
    }
}

impl From<Vec<&str>> for Key {
    fn from(segments: Vec<&str>) -> Self {
        Key::new(segments.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// A single named slot in a table: the value plus any comment lines the
/// surrounding layer attached to it. Comments are consumed by the writer and
/// never produced by the parser.
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub value: TomlValue,
    pub comments: Vec<String>,
}

impl TableEntry {
    #[must_use]
    pub fn new(value: TomlValue) -> Self {
        TableEntry {
            value,
            comments: Vec::new(),
        }
    }
}

/// An insertion-ordered mapping from single segment names to child values.
#[derive(Debug, Clone, Default)]
pub struct TomlTable {
    entries: IndexMap<String, TableEntry>,
    seal: Sealed,
}

/// A document tree value. A closed set of variants; every consumer matches
/// exhaustively.
#[derive(Debug, Clone)]
pub enum TomlValue {
    String(String),
    Integer { value: i64, base: IntegerBase },
    Float { value: f64, special: bool },
    Boolean(bool),
    Array(Vec<TomlValue>),
    Table(TomlTable),
    TableArray(Vec<TomlTable>),
}

impl TomlValue {
    /// A decimal integer value.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        TomlValue::Integer {
            value,
            base: IntegerBase::Decimal,
        }
    }

    /// A float value; infinities and NaN are marked special automatically.
    #[must_use]
    pub fn float(value: f64) -> Self {
        TomlValue::Float {
            value,
            special: !value.is_finite(),
        }
    }

    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        TomlValue::String(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TomlValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            TomlValue::Integer { value, .. } => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            TomlValue::Float { value, .. } => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TomlValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[TomlValue]> {
        match self {
            TomlValue::Array(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_table(&self) -> Option<&TomlTable> {
        match self {
            TomlValue::Table(table) => Some(table),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_table_array(&self) -> Option<&[TomlTable]> {
        match self {
            TomlValue::TableArray(elements) => Some(elements),
            _ => None,
        }
    }
}

// Structural equality: nesting, ordering and scalar values. Seal states,
// attached comments and integer display bases are presentation details and
// do not participate; NaN floats compare equal to each other.
impl PartialEq for TomlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TomlValue::String(a), TomlValue::String(b)) => a == b,
            (TomlValue::Integer { value: a, .. }, TomlValue::Integer { value: b, .. }) => a == b,
            (TomlValue::Float { value: a, .. }, TomlValue::Float { value: b, .. }) => {
                (a.is_nan() && b.is_nan()) || a == b
            }
            (TomlValue::Boolean(a), TomlValue::Boolean(b)) => a == b,
            (TomlValue::Array(a), TomlValue::Array(b)) => a == b,
            (TomlValue::Table(a), TomlValue::Table(b)) => a == b,
            (TomlValue::TableArray(a), TomlValue::TableArray(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for TomlTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((ka, ea), (kb, eb))| ka == kb && ea.value == eb.value)
    }
}

impl TomlTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sealed(&self) -> Sealed {
        self.seal
    }

    // Only the grammar parser changes seal states. `Full` is permanent.
    pub(crate) fn seal(&mut self, seal: Sealed) {
        if self.seal != Sealed::Full {
            self.seal = seal;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Looks up a value through a dotted key. Intermediate table-array
    /// segments resolve to their most recently appended element.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&TomlValue> {
        let (last, parents) = key.segments().split_last()?;
        let mut table = self;
        for segment in parents {
            table = match &table.entries.get(segment)?.value {
                TomlValue::Table(t) => t,
                TomlValue::TableArray(elements) => elements.last()?,
                _ => return None,
            };
        }
        table.entries.get(last).map(|e| &e.value)
    }

    /// Inserts a value under a dotted key, creating intermediate tables on
    /// demand. Fails if an intermediate segment already resolves to a
    /// non-table or to a closed inline table, or if the final segment is
    /// already taken.
    pub fn insert(&mut self, key: &Key, value: TomlValue) -> Result<(), StructureError> {
        let (last, parents) = key.segments().split_last().ok_or(StructureError::EmptyKey)?;
        let mut table = self;
        let mut walked: Vec<&str> = Vec::new();
        for segment in parents {
            walked.push(segment.as_str());
            let entry = table
                .entries
                .entry(segment.clone())
                .or_insert_with(|| TableEntry::new(TomlValue::Table(TomlTable::new())));
            table = match &mut entry.value {
                TomlValue::Table(t) => {
                    if t.seal == Sealed::Full {
                        return Err(StructureError::SealedTable {
                            key: walked.join("."),
                        });
                    }
                    t
                }
                _ => {
                    return Err(StructureError::NotATable {
                        key: walked.join("."),
                    })
                }
            };
        }
        if table.entries.contains_key(last) {
            return Err(StructureError::DuplicateKey {
                key: key.to_string(),
            });
        }
        table.entries.insert(last.clone(), TableEntry::new(value));
        Ok(())
    }

    /// Attaches a comment line to an existing entry; the writer reflows and
    /// emits it above the key.
    pub fn add_comment(&mut self, key: &Key, text: &str) -> Result<(), StructureError> {
        let entry = self.entry_mut(key)?;
        entry.comments.push(text.to_string());
        Ok(())
    }

    fn entry_mut(&mut self, key: &Key) -> Result<&mut TableEntry, StructureError> {
        let (last, parents) = key.segments().split_last().ok_or(StructureError::EmptyKey)?;
        let mut table = self;
        let mut walked: Vec<&str> = Vec::new();
        for segment in parents {
            walked.push(segment.as_str());
            let entry = match table.entries.get_mut(segment) {
                Some(e) => e,
                None => {
                    return Err(StructureError::MissingKey {
                        key: walked.join("."),
                    })
                }
            };
            table = match &mut entry.value {
                TomlValue::Table(t) => t,
                TomlValue::TableArray(elements) => match elements.last_mut() {
                    Some(t) => t,
                    None => {
                        return Err(StructureError::NotATableArray {
                            key: walked.join("."),
                        })
                    }
                },
                _ => {
                    return Err(StructureError::NotATable {
                        key: walked.join("."),
                    })
                }
            };
        }
        match table.entries.get_mut(last) {
            Some(entry) => Ok(entry),
            None => Err(StructureError::MissingKey {
                key: key.to_string(),
            }),
        }
    }

    /// Resolves a `[name]` header against this table: reuses an existing
    /// table at the path or creates one, creating intermediates on demand.
    pub(crate) fn declare_table(&mut self, key: &Key) -> Result<(), StructureError> {
        let (last, parents) = key.segments().split_last().ok_or(StructureError::EmptyKey)?;
        let parent = self.descend_creating(parents)?;
        match parent.entries.entry(last.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(TableEntry::new(TomlValue::Table(TomlTable::new())));
                Ok(())
            }
            Entry::Occupied(slot) => match &slot.get().value {
                TomlValue::Table(t) if t.seal == Sealed::Full => Err(StructureError::SealedTable {
                    key: key.to_string(),
                }),
                TomlValue::Table(_) => Ok(()),
                _ => Err(StructureError::NotATable {
                    key: key.to_string(),
                }),
            },
        }
    }

    /// Resolves a `[[name]]` header against this table: appends a fresh
    /// element to the table-array at the path, creating the array if the
    /// path is vacant.
    pub(crate) fn declare_table_array(&mut self, key: &Key) -> Result<(), StructureError> {
        let (last, parents) = key.segments().split_last().ok_or(StructureError::EmptyKey)?;
        let parent = self.descend_creating(parents)?;
        match parent.entries.entry(last.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(TableEntry::new(TomlValue::TableArray(vec![TomlTable::new()])));
                Ok(())
            }
            Entry::Occupied(mut slot) => match &mut slot.get_mut().value {
                TomlValue::TableArray(elements) => {
                    elements.push(TomlTable::new());
                    Ok(())
                }
                _ => Err(StructureError::NotATableArray {
                    key: key.to_string(),
                }),
            },
        }
    }

    /// Navigates to the table at `path`, resolving table-array segments to
    /// their most recently appended element. The parser only passes paths it
    /// declared earlier in the same parse.
    pub(crate) fn table_at_path(&mut self, path: &[String]) -> Result<&mut TomlTable, StructureError> {
        let mut table = self;
        let mut walked: Vec<&str> = Vec::new();
        for segment in path {
            walked.push(segment.as_str());
            let entry = match table.entries.get_mut(segment) {
                Some(e) => e,
                None => {
                    return Err(StructureError::MissingKey {
                        key: walked.join("."),
                    })
                }
            };
            table = match &mut entry.value {
                TomlValue::Table(t) => t,
                TomlValue::TableArray(elements) => match elements.last_mut() {
                    Some(t) => t,
                    None => {
                        return Err(StructureError::NotATableArray {
                            key: walked.join("."),
                        })
                    }
                },
                _ => {
                    return Err(StructureError::NotATable {
                        key: walked.join("."),
                    })
                }
            };
        }
        Ok(table)
    }

    fn descend_creating(&mut self, segments: &[String]) -> Result<&mut TomlTable, StructureError> {
        let mut table = self;
        let mut walked: Vec<&str> = Vec::new();
        for segment in segments {
            walked.push(segment.as_str());
            let entry = table
                .entries
                .entry(segment.clone())
                .or_insert_with(|| TableEntry::new(TomlValue::Table(TomlTable::new())));
            table = match &mut entry.value {
                TomlValue::Table(t) => {
                    if t.seal == Sealed::Full {
                        return Err(StructureError::SealedTable {
                            key: walked.join("."),
                        });
                    }
                    t
                }
                TomlValue::TableArray(elements) => match elements.last_mut() {
                    Some(t) => t,
                    None => {
                        return Err(StructureError::NotATableArray {
                            key: walked.join("."),
                        })
                    }
                },
                _ => {
                    return Err(StructureError::NotATable {
                        key: walked.join("."),
                    })
                }
            };
        }
        Ok(table)
    }
}
