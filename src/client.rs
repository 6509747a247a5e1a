//! REST client for the `/vessels` resource

use async_trait::async_trait;
use reqwest::{header::LOCATION, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::{
    config::BackendConfig,
    criteria::SearchRequest,
    errors::ConsoleError,
    models::Vessel,
};

/// Completed HTTP exchange
///
/// `body` is only decoded for the status the operation treats as success.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Option<T>,
}

impl<T> Reply<T> {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            location: None,
            body: None,
        }
    }

    pub fn with_body(mut self, body: T) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Identity carried by a `Location` header: the segment after the last `/`
pub fn identity_from_location(location: &str) -> Option<&str> {
    location
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

/// The five operations of the vessel registry
#[async_trait]
pub trait VesselsService: Send + Sync {
    /// `GET /vessels/{uuid}`, success is 200
    async fn load(&self, uuid: &str) -> Result<Reply<Vessel>, ConsoleError>;

    /// `POST /vessels`, success is 201 with the new identity in `Location`
    async fn create(&self, vessel: &Vessel) -> Result<Reply<()>, ConsoleError>;

    /// `PUT /vessels/{uuid}`, success is 200
    async fn update(&self, vessel: &Vessel) -> Result<Reply<()>, ConsoleError>;

    /// `GET /vessels?query=...` or `POST /vessels/search`, success is 200
    async fn search(&self, request: &SearchRequest) -> Result<Reply<Vec<Vessel>>, ConsoleError>;

    /// `DELETE /vessels/{uuid}`, success is 200
    async fn delete(&self, vessel: &Vessel) -> Result<Reply<()>, ConsoleError>;
}

/// [`VesselsService`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpVesselsService {
    http: Client,
    base_url: Url,
}

impl HttpVesselsService {
    pub fn new(config: &BackendConfig) -> Result<Self, ConsoleError> {
        config.validate()?;
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url()?,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ConsoleError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConsoleError::InvalidConfiguration {
                message: format!("Backend URL cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .push("vessels")
            .extend(segments);
        Ok(url)
    }

    fn identity(vessel: &Vessel) -> Result<&str, ConsoleError> {
        vessel.uuid.as_deref().ok_or(ConsoleError::MissingIdentity)
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        success: StatusCode,
    ) -> Result<Reply<T>, ConsoleError> {
        let status = response.status();
        debug!("Received status {}", status);
        let mut reply = Reply::new(status);
        if status == success {
            reply.body = Some(response.json().await?);
        }
        Ok(reply)
    }

    fn read_status(response: &Response) -> Reply<()> {
        let status = response.status();
        debug!("Received status {}", status);
        let mut reply = Reply::new(status);
        reply.location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        reply
    }
}

#[async_trait]
impl VesselsService for HttpVesselsService {
    async fn load(&self, uuid: &str) -> Result<Reply<Vessel>, ConsoleError> {
        let url = self.endpoint(&[uuid])?;
        debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        Self::read_json(response, StatusCode::OK).await
    }

    async fn create(&self, vessel: &Vessel) -> Result<Reply<()>, ConsoleError> {
        let url = self.endpoint(&[])?;
        debug!("POST {}", url);
        let response = self.http.post(url).json(vessel).send().await?;
        Ok(Self::read_status(&response))
    }

    async fn update(&self, vessel: &Vessel) -> Result<Reply<()>, ConsoleError> {
        let url = self.endpoint(&[Self::identity(vessel)?])?;
        debug!("PUT {}", url);
        let response = self.http.put(url).json(vessel).send().await?;
        Ok(Self::read_status(&response))
    }

    async fn search(&self, request: &SearchRequest) -> Result<Reply<Vec<Vessel>>, ConsoleError> {
        let response = match request {
            SearchRequest::Predicate(predicate) => {
                let mut url = self.endpoint(&[])?;
                url.query_pairs_mut()
                    .append_pair("query", &predicate.to_query_string()?);
                debug!("GET {}", url);
                self.http.get(url).send().await?
            }
            SearchRequest::Flat(query) => {
                let url = self.endpoint(&["search"])?;
                debug!("POST {}", url);
                self.http.post(url).json(query).send().await?
            }
        };
        Self::read_json(response, StatusCode::OK).await
    }

    async fn delete(&self, vessel: &Vessel) -> Result<Reply<()>, ConsoleError> {
        let url = self.endpoint(&[Self::identity(vessel)?])?;
        debug!("DELETE {}", url);
        let response = self.http.delete(url).send().await?;
        Ok(Self::read_status(&response))
    }
}
