use crate::models::SymbolSignalState;
use std::collections::HashMap;

/// In-memory per-symbol signal state, living for the process lifetime.
///
/// Entries are created lazily on the first detection call for a symbol. Each
/// symbol's record is only touched from that symbol's evaluation path, so no
/// cross-symbol synchronization is needed.
#[derive(Debug, Default)]
pub struct SignalStateStore {
    states: HashMap<String, SymbolSignalState>,
}

impl SignalStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable state record for a symbol, created on first access
    pub fn state_mut(&mut self, symbol: &str) -> &mut SymbolSignalState {
        self.states.entry(symbol.to_string()).or_default()
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolSignalState> {
        self.states.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    #[test]
    fn test_lazy_creation() {
        let mut store = SignalStateStore::new();
        assert!(store.is_empty());
        assert!(store.get("BTC/USD").is_none());

        let state = store.state_mut("BTC/USD");
        assert!(state.last_direction.is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_states_are_per_symbol() {
        let mut store = SignalStateStore::new();
        store.state_mut("BTC/USD").last_direction = Some(Direction::Bullish);
        store.state_mut("ETH/USD").last_direction = Some(Direction::Bearish);

        assert_eq!(
            store.get("BTC/USD").unwrap().last_direction,
            Some(Direction::Bullish)
        );
        assert_eq!(
            store.get("ETH/USD").unwrap().last_direction,
            Some(Direction::Bearish)
        );
    }
}
