#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AnswerChange, AttemptRepository, CatalogRepository, CatalogWriter, InMemoryRepository,
    ProgressRepository, Reselect, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository, SqliteSettings};
