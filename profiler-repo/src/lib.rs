mod directory;
mod file;
mod http;

pub use directory::DirectoryRepository;
pub use file::FileRepository;
pub use http::{HttpRepository, RepositoryUrlError};
