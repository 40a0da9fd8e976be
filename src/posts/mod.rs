pub mod domain;
pub mod repository;

pub use domain::{Category, PostFields};
pub use repository::{DynPostRepository, PostRepository, SqlitePostRepository};
