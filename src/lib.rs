pub mod api;
pub mod disambiguator;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod utils;
pub mod value;
pub mod writer;
mod serialization;

pub use api::{parse_document, parse_document_named, write_document, TomlDocument};
pub use error::TomlError;
pub use serialization::Value;
pub use value::{Key, TomlTable, TomlValue};
pub use writer::{KeySortMode, WriteOptions};
