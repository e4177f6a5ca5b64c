pub mod parser;
pub mod utils;
pub mod writer;

pub use parser::parse_csv;
pub use writer::to_csv;
