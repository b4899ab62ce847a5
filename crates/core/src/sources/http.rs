use crate::ingest::parse_posts;
use crate::traits::ContentSource;
use crate::{Post, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const FETCH_POSTS_PATH: &str = "fetch-posts";

/// Client for a content service exposing `GET <base>/fetch-posts`.
pub struct PostsClient {
    client: Client,
    endpoint: Url,
}

impl PostsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, SourceError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client,
            endpoint: base.join(FETCH_POSTS_PATH)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ContentSource for PostsClient {
    fn describe(&self) -> String {
        self.endpoint.to_string()
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>, SourceError> {
        let response = self.client.get(self.endpoint.clone()).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::BackendResponse {
                status: response.status().as_u16(),
            });
        }

        let payload: Value = response.json().await.map_err(|error| {
            SourceError::MalformedSourceData(format!("response is not JSON: {error}"))
        })?;
        let posts = parse_posts(payload)?;
        debug!(endpoint = %self.endpoint, post_count = posts.len(), "fetched posts");
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> Result<String, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buffer = [0u8; 2048];
                let _ = socket.read(&mut buffer).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Ok(format!("http://{address}"))
    }

    fn client(base: &str) -> Result<PostsClient, SourceError> {
        let client = Client::builder().no_proxy().build()?;
        PostsClient::with_client(client, base)
    }

    #[test]
    fn endpoint_is_joined_under_the_base_path() -> Result<(), SourceError> {
        let root = client("http://127.0.0.1:8080")?;
        assert_eq!(root.endpoint().as_str(), "http://127.0.0.1:8080/fetch-posts");

        let nested = client("https://blog.example.org/api")?;
        assert_eq!(nested.endpoint().as_str(), "https://blog.example.org/api/fetch-posts");
        Ok(())
    }

    #[tokio::test]
    async fn fetches_and_validates_posts() -> Result<(), Box<dyn std::error::Error>> {
        let base = serve_once("200 OK", r#"[{"content":"Hello there."},{"content":"Bye."}]"#).await?;
        let posts = client(&base)?.fetch_posts().await?;
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1].content, "Bye.");
        Ok(())
    }

    #[tokio::test]
    async fn wrong_shape_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let base = serve_once("200 OK", r#"{"posts":[]}"#).await?;
        let result = client(&base)?.fetch_posts().await;
        assert!(matches!(result, Err(SourceError::MalformedSourceData(_))));
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let base = serve_once("503 Service Unavailable", "[]").await?;
        let result = client(&base)?.fetch_posts().await;
        assert!(matches!(
            result,
            Err(SourceError::BackendResponse { status: 503 })
        ));
        Ok(())
    }
}
