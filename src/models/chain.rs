/// Chains the ledger data service is queried for, by name
pub const SUPPORTED_CHAINS: &[(&str, u64)] = &[
    ("ethereum", 1),
    ("polygon", 137),
    ("base", 8453),
    ("optimism", 10),
    ("arbitrum", 42161),
];

/// Resolve a chain name or numeric chain id
pub fn resolve_chain_id(chain: &str) -> Option<u64> {
    let chain = chain.trim().to_lowercase();

    SUPPORTED_CHAINS
        .iter()
        .find(|(name, _)| *name == chain)
        .map(|(_, id)| *id)
        .or_else(|| chain.parse::<u64>().ok().filter(|id| *id > 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_chain_by_name() {
        assert_eq!(resolve_chain_id("ethereum"), Some(1));
        assert_eq!(resolve_chain_id("Polygon"), Some(137));
        assert_eq!(resolve_chain_id(" base "), Some(8453));
    }

    #[test]
    fn test_resolve_chain_by_id() {
        assert_eq!(resolve_chain_id("42161"), Some(42161));
        assert_eq!(resolve_chain_id("0"), None);
        assert_eq!(resolve_chain_id("solana"), None);
    }
}
