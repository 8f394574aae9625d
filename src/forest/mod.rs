mod algorithm;
mod iter;
mod reader;
mod tree;

pub use algorithm::*;
pub use iter::*;
pub use reader::*;
pub use tree::*;
