use crate::{config::NameResolverConfig, types::JsonRpcRequest};
use std::collections::{HashMap, HashSet};

/// Decides which `eth_call`s are name-resolution reads and therefore safe to cache.
///
/// A call qualifies when its `to` is a resolver registered for the chain and its calldata
/// starts with one of the resolver selectors. Matching ignores case.
#[derive(Debug, Clone, Default)]
pub struct NameResolverGate {
    contracts: HashMap<u64, HashSet<String>>,
    selectors: Vec<String>,
}

impl NameResolverGate {
    #[must_use]
    pub fn new(resolvers: &[NameResolverConfig], selectors: &[String]) -> Self {
        let mut contracts: HashMap<u64, HashSet<String>> = HashMap::new();
        for chain in resolvers {
            contracts
                .entry(chain.chain_id)
                .or_default()
                .extend(chain.contracts.iter().map(|a| a.to_ascii_lowercase()));
        }

        Self { contracts, selectors: selectors.iter().map(|s| s.to_ascii_lowercase()).collect() }
    }

    /// True when `request` is an `eth_call` reading a known resolver on `chain_id`.
    #[must_use]
    pub fn allows(&self, chain_id: u64, request: &JsonRpcRequest) -> bool {
        let Some(resolvers) = self.contracts.get(&chain_id) else {
            return false;
        };
        let Some(call) = request.params.first() else {
            return false;
        };
        let (Some(to), Some(data)) =
            (call.get("to").and_then(|v| v.as_str()), call.get("data").and_then(|v| v.as_str()))
        else {
            return false;
        };

        let data = data.to_ascii_lowercase();
        resolvers.contains(&to.to_ascii_lowercase())
            && self.selectors.iter().any(|selector| data.starts_with(selector))
    }
}
