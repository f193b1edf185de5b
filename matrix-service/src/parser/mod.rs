// Parser Module
// Tokenizes, substitutes and validates matrix declarations

pub mod config;
pub mod error;
pub mod ini;
pub mod models;
pub mod substitution;

pub use config::{config_dir_of, MatrixParser, ParserOptions};
pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use ini::IniDocument;
pub use models::{Matrix, MatrixBuilder, SubstitutionContext};
