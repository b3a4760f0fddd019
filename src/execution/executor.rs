use crate::execution::PositionManager;
use crate::models::Signal;
use crate::strategy::ExitReason;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAction {
    Execute { amount: f64 },
    Skip,
    Close { amount: f64, exit_reason: ExitReason },
}

#[derive(Debug, Clone)]
pub struct ExecutionDecision {
    pub action: ExecutionAction,
    pub reason: String,
}

impl ExecutionDecision {
    fn skip(reason: impl Into<String>) -> Self {
        Self {
            action: ExecutionAction::Skip,
            reason: reason.into(),
        }
    }
}

/// Turns signals and exit checks into order decisions
///
/// Sizing is a flat fraction of the quote balance observed at the start of
/// the cycle; capital already committed to open positions is not deducted.
pub struct Executor {
    capital_fraction: f64,
}

impl Executor {
    pub fn new(capital_fraction: f64) -> Self {
        Self { capital_fraction }
    }

    /// Process an entry signal and decide what to do
    pub fn process_signal(
        &self,
        pm: &PositionManager,
        signal: Signal,
        symbol: &str,
        current_price: f64,
        quote_balance: f64,
    ) -> ExecutionDecision {
        match signal {
            Signal::Buy => {
                // Check 1: Do we already have this symbol?
                if pm.has_open_position(symbol) {
                    return ExecutionDecision::skip("Already have open position");
                }

                // Check 2: Position cap
                if !pm.can_open() {
                    return ExecutionDecision::skip(format!(
                        "Position cap of {} reached",
                        pm.max_positions()
                    ));
                }

                // Check 3: Calculate size
                match self.calculate_position_size(quote_balance, current_price) {
                    Some(amount) => ExecutionDecision {
                        action: ExecutionAction::Execute { amount },
                        reason: format!(
                            "Buy signal, {:.0}% of {:.2} balance",
                            self.capital_fraction * 100.0,
                            quote_balance
                        ),
                    },
                    None => ExecutionDecision::skip(format!(
                        "Cannot size order (balance {:.2}, price {})",
                        quote_balance, current_price
                    )),
                }
            }

            Signal::Hold => ExecutionDecision::skip("Hold signal"),
        }
    }

    /// Decide whether a held position should be closed at `current_price`
    pub fn process_exit(
        &self,
        pm: &PositionManager,
        symbol: &str,
        current_price: f64,
    ) -> ExecutionDecision {
        let Some(position) = pm.get_open_position(symbol) else {
            return ExecutionDecision::skip("No position to sell");
        };

        let change_pct = (current_price - position.buy_price) / position.buy_price * 100.0;

        match pm.should_exit(symbol, current_price) {
            Some(exit_reason) => ExecutionDecision {
                action: ExecutionAction::Close {
                    amount: position.amount,
                    exit_reason,
                },
                reason: format!("{} at {:+.2}%", exit_reason, change_pct),
            },
            None => ExecutionDecision::skip(format!("Holding at {:+.2}%", change_pct)),
        }
    }

    /// Amount of base asset to buy: balance * fraction / price
    ///
    /// `None` when there is nothing to spend or the price is unusable.
    pub fn calculate_position_size(&self, quote_balance: f64, current_price: f64) -> Option<f64> {
        if !(current_price > 0.0) || !(quote_balance > 0.0) {
            return None;
        }

        let amount = quote_balance * self.capital_fraction / current_price;
        amount.is_finite().then_some(amount)
    }
}
