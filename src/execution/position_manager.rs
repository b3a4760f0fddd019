use std::collections::HashMap;

use thiserror::Error;

use crate::models::Position;
use crate::persistence::PositionMap;
use crate::strategy::{ExitReason, ExitRule};

#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("Already have open position for {0}")]
    AlreadyOpen(String),

    #[error("Position cap of {0} reached")]
    CapReached(usize),

    #[error("No open position for {0}")]
    NotFound(String),
}

/// In-memory book of open positions, at most one per symbol
pub struct PositionManager {
    positions: PositionMap,
    max_positions: usize,
    exit_rule: ExitRule,
}

impl PositionManager {
    pub fn new(max_positions: usize, exit_rule: ExitRule) -> Self {
        Self::with_positions(PositionMap::new(), max_positions, exit_rule)
    }

    /// Create PositionManager and restore from loaded positions
    pub fn with_positions(positions: PositionMap, max_positions: usize, exit_rule: ExitRule) -> Self {
        if positions.len() > max_positions {
            tracing::warn!(
                "Restored {} positions, above the cap of {}; no new entries until some close",
                positions.len(),
                max_positions
            );
        }

        Self {
            positions,
            max_positions,
            exit_rule,
        }
    }

    /// All open positions, keyed by symbol
    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn max_positions(&self) -> usize {
        self.max_positions
    }

    /// Room for another position under the cap
    pub fn can_open(&self) -> bool {
        self.positions.len() < self.max_positions
    }

    /// Check if we have open position for symbol
    pub fn has_open_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn get_open_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Symbols currently held, in key order
    pub fn symbols(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    /// Record a new position
    pub fn open_position(
        &mut self,
        symbol: &str,
        buy_price: f64,
        amount: f64,
    ) -> Result<(), PositionError> {
        if self.has_open_position(symbol) {
            return Err(PositionError::AlreadyOpen(symbol.to_string()));
        }
        if !self.can_open() {
            return Err(PositionError::CapReached(self.max_positions));
        }

        self.positions
            .insert(symbol.to_string(), Position::new(symbol, buy_price, amount));
        Ok(())
    }

    /// Remove a position, returning it
    pub fn close_position(&mut self, symbol: &str) -> Result<Position, PositionError> {
        self.positions
            .remove(symbol)
            .ok_or_else(|| PositionError::NotFound(symbol.to_string()))
    }

    /// Check if position should exit (returns exit reason if yes)
    pub fn should_exit(&self, symbol: &str, current_price: f64) -> Option<ExitReason> {
        let position = self.positions.get(symbol)?;
        self.exit_rule.check(position, current_price)
    }

    /// Unrealized P&L across open positions with a known price
    pub fn unrealized_pnl(&self, prices: &HashMap<String, f64>) -> f64 {
        self.positions
            .values()
            .filter_map(|p| prices.get(&p.symbol).map(|&price| p.pnl_at(price)))
            .sum()
    }

    /// Quote currency committed at entry prices
    pub fn committed_capital(&self) -> f64 {
        self.positions.values().map(|p| p.cost_basis()).sum()
    }
}
