//! Parser and formatter for Starlark BUILD and `.bzl` files.
//!
//! Parsing keeps every comment and enough layout information that
//! formatting a parsed file reproduces canonically formatted input byte for
//! byte, and formatting twice gives the same result as formatting once.
//!
//! ```
//! let file = bzlfmt::parse("BUILD", b"cc_library(name='x')\n", bzlfmt::FileType::Build).unwrap();
//! assert_eq!(bzlfmt::format(&file), b"cc_library(name = \"x\")\n");
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod printer;
pub mod quote;
pub mod result;
pub mod rule;
pub mod syntax;
pub mod utils;
pub mod walk;

use log::debug;

pub use error::{Error, Result};
pub use parser::ParseOptions;
pub use position::Position;
pub use printer::{format, format_expr, FormatMode, Formatter};
pub use quote::{quote, unquote};
pub use rule::Rule;
pub use syntax::{Expr, File, FileType};
pub use walk::{edit, walk, walk_once, walk_once_mut};

/// Parses the contents of `filename` as a file of the given type.
pub fn parse(filename: &str, data: &[u8], file_type: FileType) -> Result<File> {
    parse_with_options(filename, data, &ParseOptions::new(file_type))
}

pub fn parse_with_options(filename: &str, data: &[u8], options: &ParseOptions) -> Result<File> {
    let source = std::str::from_utf8(data).map_err(|err| {
        let valid = std::str::from_utf8(&data[..err.valid_up_to()]).unwrap_or_default();
        Error::InvalidUtf8 {
            path: filename.to_string(),
            pos: Position::new(1, 1, 0).add(valid),
        }
    })?;

    parser::parse_file(filename, source, options).inspect_err(|err| debug!("{err}"))
}

/// Parses `data`, guessing the file type from `filename`.
pub fn parse_guess(filename: &str, data: &[u8]) -> Result<File> {
    parse(filename, data, FileType::from_filename(filename))
}
