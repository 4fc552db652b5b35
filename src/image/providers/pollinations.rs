//! Pollinations.ai image generation provider.
//!
//! Pollinations renders an image for whatever prompt sits in the URL path, so a
//! generation is a single GET with no key, no job id and no polling.

use crate::error::{GenStudioError, Result};
use crate::image::provider::ImageProvider;
use crate::image::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageProviderKind,
};
use async_trait::async_trait;
use reqwest::Url;
use std::time::{Duration, Instant};

/// Public prompt endpoint; the prompt is appended as the last path segment.
pub const DEFAULT_BASE_URL: &str = "https://image.pollinations.ai/prompt/";

/// Upper bound on a single provider round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for PollinationsProvider.
#[derive(Debug, Clone)]
pub struct PollinationsProviderBuilder {
    base_url: Option<String>,
    timeout: Duration,
}

impl Default for PollinationsProviderBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PollinationsProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the prompt endpoint. Falls back to `POLLINATIONS_URL`, then
    /// to [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider, validating the endpoint URL.
    pub fn build(self) -> Result<PollinationsProvider> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var("POLLINATIONS_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let parsed = Url::parse(&base_url).map_err(|e| {
            GenStudioError::InvalidRequest(format!("invalid provider URL {base_url}: {e}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(GenStudioError::InvalidRequest(format!(
                "provider URL cannot carry a path: {base_url}"
            )));
        }

        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        Ok(PollinationsProvider {
            client,
            base_url: parsed,
            timeout: self.timeout,
        })
    }
}

/// Pollinations image generation provider.
pub struct PollinationsProvider {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl PollinationsProvider {
    /// Creates a new `PollinationsProviderBuilder`.
    pub fn builder() -> PollinationsProviderBuilder {
        PollinationsProviderBuilder::new()
    }

    /// Returns the configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the full GET URL for a request.
    ///
    /// The prompt is percent-encoded as a single path segment, so slashes and
    /// question marks in user text cannot change the route.
    pub fn prompt_url(&self, request: &GenerationRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GenStudioError::InvalidRequest(format!(
                    "provider URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(&request.prompt);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("width", &request.width.to_string())
                .append_pair("height", &request.height.to_string());
            if request.no_logo {
                query.append_pair("nologo", "true");
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl ImageProvider for PollinationsProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();
        let url = self.prompt_url(request)?;
        tracing::debug!(url = %url, "requesting image from provider");

        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenStudioError::Api {
                status: status.as_u16(),
                message: if text.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    text
                },
            });
        }

        let header_format = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(ImageFormat::from_mime_type);

        let data = response.bytes().await?.to_vec();
        let duration_ms = start.elapsed().as_millis() as u64;

        let format = ImageFormat::from_magic_bytes(&data)
            .or(header_format)
            .unwrap_or_default();

        Ok(GeneratedImage::new(
            data,
            format,
            ImageProviderKind::Pollinations,
            GenerationMetadata {
                source_url: Some(url.to_string()),
                duration_ms: Some(duration_ms),
            },
        ))
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Pollinations
    }

    async fn health_check(&self) -> Result<()> {
        let response = self.client.get(self.base_url.clone()).send().await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GenStudioError::Api {
                status: status.as_u16(),
                message: "provider unavailable".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

    #[derive(Clone)]
    struct FakeUpstream {
        status: StatusCode,
        body: Vec<u8>,
        seen: Seen,
    }

    async fn fake_prompt(
        State(upstream): State<FakeUpstream>,
        Path(prompt): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        upstream.seen.lock().unwrap().push((prompt, params));
        (
            upstream.status,
            [(header::CONTENT_TYPE, "image/jpeg")],
            upstream.body.clone(),
        )
    }

    async fn spawn_upstream(status: StatusCode, body: Vec<u8>) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/prompt/:prompt", get(fake_prompt))
            .with_state(FakeUpstream {
                status,
                body,
                seen: seen.clone(),
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/prompt/"), seen)
    }

    fn tiny_png() -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(4, 4, ::image::Rgb([200, 10, 10]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, ::image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_prompt_url_encodes_prompt_as_segment() {
        let provider = PollinationsProvider::builder().build().unwrap();
        let req =
            GenerationRequest::new("a cat. film noir style, dramatic shadows, high contrast");
        let url = provider.prompt_url(&req).unwrap();

        assert_eq!(
            url.as_str(),
            "https://image.pollinations.ai/prompt/a%20cat.%20film%20noir%20style,%20dramatic%20shadows,%20high%20contrast?width=1024&height=1024&nologo=true"
        );
    }

    #[test]
    fn test_prompt_url_escapes_slashes_and_queries() {
        let provider = PollinationsProvider::builder().build().unwrap();
        let url = provider
            .prompt_url(&GenerationRequest::new("cats/dogs?x=1"))
            .unwrap();

        assert!(url.path().ends_with("/prompt/cats%2Fdogs%3Fx=1"));
        assert_eq!(url.query(), Some("width=1024&height=1024&nologo=true"));
    }

    #[test]
    fn test_prompt_url_without_nologo() {
        let provider = PollinationsProvider::builder()
            .base_url("https://example.com/prompt")
            .build()
            .unwrap();
        let req = GenerationRequest::new("sky")
            .with_size(640, 480)
            .with_no_logo(false);
        let url = provider.prompt_url(&req).unwrap();

        assert_eq!(
            url.as_str(),
            "https://example.com/prompt/sky?width=640&height=480"
        );
    }

    #[test]
    fn test_builder_rejects_bad_url() {
        let result = PollinationsProvider::builder().base_url("not a url").build();
        assert!(matches!(result, Err(GenStudioError::InvalidRequest(_))));

        let result = PollinationsProvider::builder()
            .base_url("mailto:someone@example.com")
            .build();
        assert!(matches!(result, Err(GenStudioError::InvalidRequest(_))));
    }

    #[test]
    fn test_builder_timeout() {
        let provider = PollinationsProvider::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(provider.timeout(), Duration::from_secs(5));
        assert_eq!(provider.kind(), ImageProviderKind::Pollinations);
        assert_eq!(provider.name(), "Pollinations.ai");
    }

    #[tokio::test]
    async fn test_generate_sends_prompt_and_params() {
        let png = tiny_png();
        let (base, seen) = spawn_upstream(StatusCode::OK, png.clone()).await;
        let provider = PollinationsProvider::builder()
            .base_url(base)
            .build()
            .unwrap();

        let image = provider
            .generate(&GenerationRequest::new("a cat. film noir style"))
            .await
            .unwrap();

        assert_eq!(image.data, png);
        // Magic bytes win over the upstream's content type.
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!(image.provider, ImageProviderKind::Pollinations);
        assert!(image.metadata.duration_ms.is_some());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (prompt, params) = &seen[0];
        assert_eq!(prompt, "a cat. film noir style");
        assert_eq!(params.get("width").map(String::as_str), Some("1024"));
        assert_eq!(params.get("height").map(String::as_str), Some("1024"));
        assert_eq!(params.get("nologo").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_generate_non_success_is_api_error() {
        let (base, _) = spawn_upstream(StatusCode::BAD_GATEWAY, b"upstream down".to_vec()).await;
        let provider = PollinationsProvider::builder()
            .base_url(base)
            .build()
            .unwrap();

        let err = provider
            .generate(&GenerationRequest::new("anything"))
            .await
            .unwrap_err();

        match err {
            GenStudioError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_unreachable_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = PollinationsProvider::builder()
            .base_url(format!("http://{addr}/prompt/"))
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        let err = provider
            .generate(&GenerationRequest::new("anything"))
            .await
            .unwrap_err();
        assert!(err.is_provider_error());
        assert!(matches!(err, GenStudioError::Network(_)));
    }
}
