pub mod folder;
pub mod http;

pub use folder::FolderSource;
pub use http::PostsClient;
