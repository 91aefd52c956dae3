//! Network adapter wrapping a `reqwest::Client`.

use async_trait::async_trait;
use bytes::Bytes;
use cachette_core::{Fetch, FetchError, Request, Response};
use reqwest::{Client, Url};
use tracing::debug;

/// [`Fetch`] implementation sending requests with `reqwest`.
///
/// Requests with an origin-relative URI (`/api/text`) are resolved against
/// the base URL; without one they fail with [`FetchError::Other`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetch {
    client: Client,
    base_url: Option<Url>,
}

impl ReqwestFetch {
    /// Create a new adapter around `client`.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Resolve origin-relative request URIs against `base_url`.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn resolve(&self, request: Request) -> Result<http::Request<Bytes>, FetchError> {
        let mut http_request = request.into_http();
        if http_request.uri().scheme().is_some() {
            return Ok(http_request);
        }

        let relative = http_request
            .uri()
            .path_and_query()
            .map_or("/", |path| path.as_str());
        let Some(base_url) = &self.base_url else {
            return Err(FetchError::Other(format!(
                "relative URL {relative} requires a base URL"
            )));
        };
        let absolute = base_url
            .join(relative)
            .map_err(|error| FetchError::Other(format!("cannot resolve {relative}: {error}")))?;
        *http_request.uri_mut() = absolute
            .as_str()
            .parse()
            .map_err(|error| FetchError::Other(format!("invalid URL {absolute}: {error}")))?;
        Ok(http_request)
    }
}

#[async_trait]
impl Fetch for ReqwestFetch {
    #[tracing::instrument(
        skip(self, request),
        fields(method = %request.method(), uri = %request.uri()),
        level = "trace"
    )]
    async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
        let http_request = self.resolve(request)?;
        let reqwest_request: reqwest::Request =
            http_request.try_into().map_err(FetchError::connection)?;

        let response = self
            .client
            .execute(reqwest_request)
            .await
            .map_err(FetchError::connection)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(FetchError::connection)?;
        debug!(%status, bytes = body.len(), "received network response");

        let mut http_response = http::Response::new(body);
        *http_response.status_mut() = status;
        *http_response.headers_mut() = headers;
        Ok(Response::from(http_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_url_without_base_is_rejected() {
        let fetch = ReqwestFetch::new(Client::new());
        let error = fetch
            .resolve(Request::get("/api/text").unwrap())
            .unwrap_err();
        assert_eq!(error.to_string(), "relative URL /api/text requires a base URL");
    }

    #[test]
    fn relative_url_is_joined_with_base() {
        let fetch = ReqwestFetch::new(Client::new())
            .with_base_url(Url::parse("http://localhost:8080/app/").unwrap());
        let resolved = fetch
            .resolve(Request::get("/api/text?q=1").unwrap())
            .unwrap();
        assert_eq!(resolved.uri(), "http://localhost:8080/api/text?q=1");
    }

    #[test]
    fn absolute_url_is_kept() {
        let fetch = ReqwestFetch::new(Client::new())
            .with_base_url(Url::parse("http://localhost:8080/").unwrap());
        let resolved = fetch
            .resolve(Request::get("https://example.com/a").unwrap())
            .unwrap();
        assert_eq!(resolved.uri(), "https://example.com/a");
    }
}
