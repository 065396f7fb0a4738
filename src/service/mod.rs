pub mod tag_table;

pub use tag_table::{GitTagRow, GitTagTable};
