mod ast;
mod file_type;

pub use ast::*;
pub use file_type::FileType;
