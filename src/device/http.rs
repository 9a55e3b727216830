//! HTTPS access to the clock index, the poem service and the photographs

use std::time::Duration;

use anyhow::{bail, Context, Result};
use embedded_svc::http::client::Client;
use embedded_svc::http::{Method, Status};
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection, FollowRedirectsPolicy};
use log::{debug, info};
use serde::Serialize;

use stoppedclocks::catalog::{Catalog, CatalogLimits};
use stoppedclocks::config::Config;
use stoppedclocks::remote::{self, ComposeRequest, LikeRequest, StatusRequest, StatusResponse};
use stoppedclocks::source::{CatalogSource, Poem, PoemSource};

/// Largest JSON document accepted
const MAX_DOCUMENT_BYTES: usize = 256 * 1024;

/// Opens a fresh connection for every request
#[derive(Debug, Clone)]
pub struct HttpApi {
    compose_url: &'static str,
    status_url: &'static str,
    like_url: &'static str,
    index_url: &'static str,
    build_id: &'static str,
    token: Option<&'static str>,
    timeout: Duration,
    limits: CatalogLimits,
}

impl HttpApi {
    pub fn new(config: &Config) -> Self {
        Self {
            compose_url: config.compose_url,
            status_url: config.status_url,
            like_url: config.like_url,
            index_url: config.index_url,
            build_id: config.build_id,
            token: config.api_token,
            timeout: Duration::from_millis(config.http_timeout_ms),
            limits: config.catalog_limits,
        }
    }

    /// Announce this screen; the status endpoint takes no token
    pub fn register(&self, screen_id: &str) -> Result<()> {
        let body = self.post_json(
            self.status_url,
            &StatusRequest {
                screen_id,
                build_id: self.build_id,
            },
            false,
        )?;
        let status: StatusResponse = serde_json::from_slice(&body).context("status response is not valid JSON")?;
        if !status.success {
            bail!("Registration refused");
        }
        info!("Registered screen {}", screen_id);
        Ok(())
    }

    /// Plain GET without credentials, for the index and the photographs
    pub fn download(&self, url: &str, max_len: usize) -> Result<Vec<u8>> {
        self.send(Method::Get, url, None, false, max_len)
    }

    fn post_json<T: Serialize>(&self, url: &str, body: &T, authorize: bool) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(body)?;
        self.send(Method::Post, url, Some(&body), authorize, MAX_DOCUMENT_BYTES)
    }

    fn send(&self, method: Method, url: &str, body: Option<&[u8]>, authorize: bool, max_len: usize) -> Result<Vec<u8>> {
        debug!("{:?} {}", method, url);

        let connection = EspHttpConnection::new(&HttpConfiguration {
            timeout: Some(self.timeout),
            follow_redirects_policy: FollowRedirectsPolicy::FollowAll,
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })?;
        let mut client = Client::wrap(connection);

        let authorization = match (authorize, self.token) {
            (true, Some(token)) => Some(format!("Bearer {}", token)),
            _ => None,
        };
        let content_length = body.map(|body| body.len().to_string());

        let mut headers = vec![("accept", "application/json, image/png")];
        if let Some(length) = content_length.as_deref() {
            headers.push(("content-type", "application/json"));
            headers.push(("content-length", length));
        }
        if let Some(authorization) = authorization.as_deref() {
            headers.push(("authorization", authorization));
        }

        let mut request = client.request(method, url, &headers)?;
        if let Some(body) = body {
            request.write_all(body)?;
            request.flush()?;
        }
        let mut response = request.submit()?;

        let status = response.status();
        if !(200..300).contains(&status) {
            bail!("{} answered {}", url, status);
        }

        let mut data = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = response.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            if data.len() + read > max_len {
                bail!("{} sent more than {} bytes", url, max_len);
            }
            data.extend_from_slice(&chunk[..read]);
        }
        debug!("Downloaded {} bytes", data.len());

        Ok(data)
    }
}

impl CatalogSource for HttpApi {
    fn fetch_catalog(&mut self) -> Result<Catalog> {
        let body = self.download(self.index_url, MAX_DOCUMENT_BYTES)?;
        remote::parse_catalog(&body, &self.limits)
    }
}

impl PoemSource for HttpApi {
    fn compose(&mut self, time24: &str, screen_id: &str) -> Result<Poem> {
        let body = self.post_json(self.compose_url, &ComposeRequest { screen_id, time24 }, true)?;
        remote::parse_poem(&body)
    }

    fn like(&mut self, poem_id: &str, screen_id: &str) -> Result<()> {
        self.post_json(self.like_url, &LikeRequest { screen_id, poem_id }, true)?;
        Ok(())
    }
}
