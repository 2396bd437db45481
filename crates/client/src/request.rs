//! The intercepted request model.
//!
//! An [`InterceptedRequest`] exists for exactly one dispatch. It carries the
//! URL and method plus the hints the classifier uses to recognise documents.

use offline_core::{Error, RequestKey};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use crate::fetch::canonicalize;

/// How the request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    #[serde(other)]
    Cors,
}

/// What the response will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Style,
    Script,
    Image,
    Font,
    Manifest,
    #[default]
    #[serde(other)]
    Empty,
}

/// A request the agent was asked to answer.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub url: Url,
    pub method: Method,
    pub mode: RequestMode,
    pub destination: Destination,
    /// Raw `Accept` header, if the requester sent one.
    pub accept: Option<String>,
}

impl InterceptedRequest {
    /// A plain GET with no classification hints.
    pub fn get(url: Url) -> Self {
        Self { url, method: Method::GET, mode: RequestMode::default(), destination: Destination::default(), accept: None }
    }

    /// A top-level document navigation.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, destination: Destination::Document, ..Self::get(url) }
    }

    /// Canonicalize `url` and build a GET for it.
    pub fn parse(url: &str) -> Result<Self, Error> {
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::get(url))
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the method from its name, as sent by a host.
    pub fn with_method_name(self, method: &str) -> Result<Self, Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {method}")))?;
        Ok(self.with_method(method))
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Cache identity of this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.as_str(), &self.url)
    }
}
