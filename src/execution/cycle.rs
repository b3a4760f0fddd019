use std::collections::HashMap;

use crate::config::BotConfig;
use crate::error::BotError;
use crate::execution::{ExecutionAction, Executor, MarketDataGateway, PositionManager};
use crate::persistence::PositionStore;
use crate::strategy::{self, ExitReason, ExitRule, Strategy};
use crate::Result;

/// Outcome of one trading cycle
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Symbols bought this cycle
    pub opened: Vec<String>,
    /// Symbols sold this cycle and why
    pub closed: Vec<(String, ExitReason)>,
    /// Per-symbol failures (symbol, cause); the batch continued past these
    pub symbol_errors: Vec<(String, String)>,
    /// Failure that prevented the entry scan (balance or candidate fetch)
    pub entry_scan_error: Option<BotError>,
    /// Positions tracked at the end of the cycle
    pub open_positions: usize,
}

impl CycleReport {
    /// A cycle is healthy unless its entry scan could not run
    pub fn is_healthy(&self) -> bool {
        self.entry_scan_error.is_none()
    }
}

/// One tick of the bot: entry scan over ranked candidates, then exit scan
/// over held positions
///
/// The position book lives here between cycles. It is reloaded from the
/// store at the start of a cycle only while the file is in sync with it; after
/// a failed write the book stays authoritative until the write succeeds.
pub struct TradingCycle {
    config: BotConfig,
    gateway: MarketDataGateway,
    store: PositionStore,
    strategy: Box<dyn Strategy>,
    executor: Executor,
    book: PositionManager,
    unsaved: bool,
}

impl TradingCycle {
    pub fn new(config: BotConfig, gateway: MarketDataGateway, store: PositionStore) -> Self {
        let strategy = strategy::from_config(&config);
        let executor = Executor::new(config.capital_fraction);
        let book = PositionManager::with_positions(
            store.load(),
            config.max_positions,
            ExitRule::from(&config),
        );
        Self {
            config,
            gateway,
            store,
            strategy,
            executor,
            book,
            unsaved: false,
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Open positions as currently tracked
    pub fn positions(&self) -> &PositionManager {
        &self.book
    }

    /// Run one cycle
    ///
    /// Per-symbol failures are logged and collected in the report. Failing
    /// to fetch the balance or candidates skips the entry scan but still runs
    /// exits. Only a failed store write aborts the cycle with an error; the
    /// next cycle retries that write before trading.
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        if self.unsaved {
            tracing::warn!(
                "Retrying write of {} position(s) to {}",
                self.book.len(),
                self.store.path().display()
            );
            self.persist()?;
        } else {
            self.book = PositionManager::with_positions(
                self.store.load(),
                self.config.max_positions,
                ExitRule::from(&self.config),
            );
            tracing::info!(
                "📂 Loaded {} open position(s) from {}",
                self.book.len(),
                self.store.path().display()
            );
        }

        if let Err(e) = self.scan_entries(&mut report).await {
            match e {
                BotError::Store(_) => return Err(e),
                other => {
                    tracing::error!("✗ Entry scan skipped: {}", other);
                    report.entry_scan_error = Some(other);
                }
            }
        }

        self.scan_exits(&mut report).await?;

        report.open_positions = self.book.len();
        tracing::info!(
            "📊 Cycle done: {} bought, {} sold, {} symbol error(s), {}/{} positions open",
            report.opened.len(),
            report.closed.len(),
            report.symbol_errors.len(),
            report.open_positions,
            self.config.max_positions
        );

        Ok(report)
    }

    /// Write the book to disk, remembering a failure for the next cycle
    fn persist(&mut self) -> Result<()> {
        match self.store.save(self.book.positions()) {
            Ok(()) => {
                self.unsaved = false;
                Ok(())
            }
            Err(e) => {
                self.unsaved = true;
                tracing::error!("✗ Failed to save positions: {}", e);
                Err(e.into())
            }
        }
    }

    async fn scan_entries(&mut self, report: &mut CycleReport) -> Result<()> {
        if !self.book.can_open() {
            tracing::info!(
                "Position cap of {} reached, skipping entry scan",
                self.config.max_positions
            );
            return Ok(());
        }

        let balance = self.gateway.balance(&self.config.quote_asset).await?;
        tracing::info!(
            "💵 {} balance: {:.2} ({:.2} committed to {} open position(s))",
            self.config.quote_asset,
            balance,
            self.book.committed_capital(),
            self.book.len()
        );

        let candidates = self
            .gateway
            .top_candidates(self.config.candidate_limit)
            .await?;

        for symbol in candidates {
            if self.book.has_open_position(&symbol) || !self.book.can_open() {
                continue;
            }

            match self.evaluate_entry(&symbol, balance).await {
                Ok(Some(price)) => {
                    let amount = self
                        .book
                        .get_open_position(&symbol)
                        .map(|p| p.amount)
                        .unwrap_or_default();
                    tracing::info!(
                        "📉 BUY: {} - {:.8} @ {} ({})",
                        symbol,
                        amount,
                        price,
                        self.strategy.name()
                    );
                    report.opened.push(symbol);
                    self.persist()?;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("✗ Error analyzing {}: {}", symbol, e);
                    report.symbol_errors.push((symbol, e.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Evaluate one candidate; returns the entry price if a buy was placed
    async fn evaluate_entry(&mut self, symbol: &str, balance: f64) -> Result<Option<f64>> {
        let candles = self
            .gateway
            .candles(
                symbol,
                &self.config.candle_timeframe,
                self.config.candle_lookback,
            )
            .await?;

        let signal = self.strategy.generate_signal(&candles)?;
        let price = candles
            .last()
            .map(|c| c.close)
            .ok_or(BotError::InsufficientData {
                have: 0,
                need: self.strategy.min_candles_required(),
            })?;

        let decision = self
            .executor
            .process_signal(&self.book, signal, symbol, price, balance);
        tracing::debug!("  {} @ {}: {:?} ({})", symbol, price, signal, decision.reason);

        match decision.action {
            ExecutionAction::Execute { amount } => {
                let ack = self.gateway.market_buy(symbol, amount).await?;
                tracing::debug!("  Order {} {}", ack.order_id, ack.status);

                if let Err(e) = self.book.open_position(symbol, price, amount) {
                    // Only reachable if the book changed between check and fill
                    tracing::error!("Bought {} but could not record it: {}", symbol, e);
                    return Ok(None);
                }
                Ok(Some(price))
            }
            _ => Ok(None),
        }
    }

    async fn scan_exits(&mut self, report: &mut CycleReport) -> Result<()> {
        let mut prices = HashMap::new();

        for symbol in self.book.symbols() {
            let price = match self.gateway.latest_price(&symbol).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("✗ Error checking sell for {}: {}", symbol, e);
                    report.symbol_errors.push((symbol, e.to_string()));
                    continue;
                }
            };
            prices.insert(symbol.clone(), price);

            let decision = self.executor.process_exit(&self.book, &symbol, price);
            tracing::debug!("  {} @ {}: {}", symbol, price, decision.reason);

            if let ExecutionAction::Close {
                amount,
                exit_reason,
            } = decision.action
            {
                tracing::info!("💰 SELLING: {} at {} ({})", symbol, price, decision.reason);

                if let Err(e) = self.gateway.market_sell(&symbol, amount).await {
                    tracing::warn!("✗ Error selling {}: {}", symbol, e);
                    report.symbol_errors.push((symbol, e.to_string()));
                    continue;
                }

                if let Ok(position) = self.book.close_position(&symbol) {
                    tracing::info!(
                        "  Closed {} ({}): P&L {:+.2}",
                        symbol,
                        exit_reason,
                        position.pnl_at(price)
                    );
                }
                report.closed.push((symbol, exit_reason));
                self.persist()?;
            }
        }

        if !self.book.is_empty() {
            tracing::info!(
                "📈 Unrealized P&L on {} held position(s): {:+.2}",
                self.book.len(),
                self.book.unrealized_pnl(&prices)
            );
        }

        Ok(())
    }
}
