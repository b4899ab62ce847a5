use crate::traits::ContentSource;
use crate::{Post, SourceError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// Offline content source: every text file under a folder is one post.
pub struct FolderSource {
    root: PathBuf,
}

impl FolderSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

pub fn discover_text_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_text = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                TEXT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if is_text {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[async_trait]
impl ContentSource for FolderSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", self.root.display()),
            )));
        }

        let mut posts = Vec::new();
        for path in discover_text_files(&self.root) {
            let content = tokio::fs::read_to_string(&path).await?;
            posts.push(Post {
                id: None,
                title: path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string),
                link: Some(path.to_string_lossy().to_string()),
                content,
            });
        }
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::{discover_text_files, FolderSource};
    use crate::traits::ContentSource;
    use crate::SourceError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovery_is_recursive_and_sorted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;
        fs::write(dir.path().join("b.txt"), "second")?;
        fs::write(nested.join("a.md"), "nested")?;
        fs::write(dir.path().join("skip.pdf"), "binary")?;

        let files = discover_text_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.windows(2).all(|pair| pair[0] <= pair[1]));
        Ok(())
    }

    #[tokio::test]
    async fn files_become_posts() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("one.txt"), "First post.")?;
        fs::write(dir.path().join("two.txt"), "Second post.")?;

        let posts = FolderSource::new(dir.path()).fetch_posts().await?;
        let contents: Vec<_> = posts.iter().map(|post| post.content.as_str()).collect();
        assert_eq!(contents, vec!["First post.", "Second post."]);
        assert_eq!(posts[0].title.as_deref(), Some("one"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() {
        let source = FolderSource::new("/definitely/not/here");
        let result = source.fetch_posts().await;
        assert!(
            matches!(&result, Err(SourceError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound),
            "{result:?}"
        );
    }
}
