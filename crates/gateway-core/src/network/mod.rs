//! Network registry: resolves the chain id path segment to a node endpoint.

use crate::{config::NetworkConfig, proxy::errors::GatewayError};
use std::{collections::HashMap, sync::Arc};

/// A supported network and the node that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoint {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
}

/// Immutable lookup table built once at start-up.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    networks: HashMap<u64, Arc<NetworkEndpoint>>,
}

impl NetworkRegistry {
    #[must_use]
    pub fn new(networks: &[NetworkConfig]) -> Self {
        let networks = networks
            .iter()
            .map(|n| {
                let endpoint = NetworkEndpoint {
                    chain_id: n.chain_id,
                    name: n.name.clone(),
                    rpc_url: n.rpc_url.clone(),
                };
                (n.chain_id, Arc::new(endpoint))
            })
            .collect();

        Self { networks }
    }

    /// Resolves a raw path segment into a configured network.
    ///
    /// The segment must be a decimal chain id made only of ASCII digits; anything else
    /// (signs, whitespace, hex, overflow) is treated as unsupported.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnsupportedNetwork`] carrying the raw segment when the id is
    /// malformed or not configured.
    pub fn resolve(&self, segment: &str) -> Result<Arc<NetworkEndpoint>, GatewayError> {
        let unsupported = || GatewayError::UnsupportedNetwork(segment.to_string());

        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unsupported());
        }

        let chain_id: u64 = segment.parse().map_err(|_| unsupported())?;
        self.networks.get(&chain_id).cloned().ok_or_else(unsupported)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Configured networks ordered by chain id.
    #[must_use]
    pub fn endpoints(&self) -> Vec<Arc<NetworkEndpoint>> {
        let mut endpoints: Vec<_> = self.networks.values().cloned().collect();
        endpoints.sort_by_key(|e| e.chain_id);
        endpoints
    }
}
