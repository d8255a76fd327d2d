use std::collections::BTreeMap;

use thiserror::Error;
use url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: &str, body: &str) -> Self {
        HttpRequest {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// A POST carrying `fields` as `application/x-www-form-urlencoded`.
    pub fn form<'a>(url: &str, fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        HttpRequest {
            headers: vec![(
                "Content-Type".into(),
                "application/x-www-form-urlencoded".into(),
            )],
            ..HttpRequest::post(url, &body)
        }
    }
}

/// Status, headers and body of an HTTP answer. Header names are stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        HttpResponse {
            status,
            ..Default::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn body(self, body: &str) -> Self {
        HttpResponse {
            body: body.into(),
            ..self
        }
    }

    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// No connection could be established with the server.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("{0}")]
    Other(String),
}

/// Sends one request and returns the server's answer. Non-2xx statuses are
/// ordinary responses, not errors.
pub trait Transport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(HttpRequest) -> Result<HttpResponse, TransportError>,
{
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

#[cfg(feature = "http")]
pub use self::http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use reqwest::{blocking::Client, redirect::Policy, Proxy};

    use super::*;
    use crate::{CasConfig, CasError};

    /// Blocking HTTP(S) transport. Redirects are handed back to the caller
    /// instead of being followed.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: Client,
    }

    impl HttpTransport {
        pub fn new(config: &CasConfig) -> Result<Self, CasError> {
            let mut builder = Client::builder()
                .redirect(Policy::none())
                .danger_accept_invalid_certs(!config.force_ssl_verification);

            if let Some(host) = &config.proxy_host {
                let proxy = match config.proxy_port {
                    Some(port) => format!("http://{host}:{port}"),
                    None => format!("http://{host}"),
                };
                builder = builder
                    .proxy(Proxy::all(proxy).map_err(|err| CasError::Config(err.to_string()))?);
            }

            let client = builder
                .build()
                .map_err(|err| CasError::Transport(err.to_string()))?;
            Ok(HttpTransport { client })
        }
    }

    impl Transport for HttpTransport {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().map_err(|err| {
                if err.is_connect() {
                    TransportError::ConnectionRefused(err.to_string())
                } else {
                    TransportError::Other(err.to_string())
                }
            })?;

            let status = response.status().as_u16();
            let mut headers = BTreeMap::<String, Vec<String>>::new();
            for (name, value) in response.headers() {
                headers
                    .entry(name.as_str().to_owned())
                    .or_default()
                    .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
            }
            let body = response
                .text()
                .map_err(|err| TransportError::Other(err.to_string()))?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}
