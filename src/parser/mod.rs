mod api;
pub mod ast;

pub use api::FilterQueryParser;
pub use api::Rule;
