//! Peer address descriptor.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// The remote endpoint a transport talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub address: String,
}

impl Peer {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Parse the address as an absolute `http` or `https` URL.
    pub fn url(&self) -> Result<Url, TransportError> {
        let url = Url::parse(&self.address).map_err(|e| {
            TransportError::Configuration(format!("invalid peer address {:?}: {e}", self.address))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(TransportError::Configuration(format!(
                "unsupported peer scheme {other:?} in {:?}",
                self.address
            ))),
        }
    }
}
