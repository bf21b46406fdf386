//! Engine loop tying dispatch queue, router and ledger together.

use crate::ledger::PositionBook;
use crate::trailing::{TrailingConfig, adjust_trail_distance};
use copytrade_dispatch::{QueuedSignal, RateLimitedSignalQueue};
use copytrade_domain::math::calculate_swap_amount;
use copytrade_domain::{
    ExitSignal, MarketContext, PositionKey, PositionSnapshot, Price, RejectReason, SignalKind,
    TokenAmount, TradeSignal,
};
use copytrade_routing::QuoteRouter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// USDC mint address on Solana, the default quote asset.
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Configuration for the engine loop.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Mint entries spend and exits receive.
    pub quote_mint: String,
    /// Base trailing distance before market adjustment.
    pub trail_base_distance_bps: u32,
    /// Trailing activation distance.
    pub trail_activation_bps: u32,
    /// Trailing distance policy tuning.
    pub trailing: TrailingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quote_mint: USDC_MINT.to_string(),
            trail_base_distance_bps: 500, // 5%
            trail_activation_bps: 300,    // 3%
            trailing: TrailingConfig::default(),
        }
    }
}

/// Outputs emitted to reporting and persistence collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// An entry routed and filled.
    Filled {
        /// Originating signal.
        signal_id: Uuid,
        /// Winning liquidity source.
        source_name: String,
        /// Filled output in atomic units.
        amount_out: TokenAmount,
        /// Estimated price impact in basis points.
        price_impact_bps: u32,
    },
    /// An exit applied to a position.
    PositionExited {
        /// Originating signal.
        signal_id: Uuid,
        /// Atomic units sold.
        amount_sold: u64,
        /// Whether the position closed.
        is_closed: bool,
        /// Position state after the exit.
        snapshot: PositionSnapshot,
    },
    /// Trailing levels ratcheted across a mint's open positions.
    TrailingAdjusted {
        /// Mint the market tick described.
        mint: String,
        /// Adjusted distance in basis points.
        distance_bps: u32,
        /// Positions that accepted the ratchet.
        updated: usize,
    },
    /// A signal did not execute.
    Rejected {
        /// Originating signal, when known.
        signal_id: Option<Uuid>,
        /// Stable rejection cause.
        reason: RejectReason,
    },
}

/// The single logical consumer driving router and ledger.
///
/// Producers feed the dispatch queue concurrently; the engine drains it in
/// priority order, routes entries to the best available liquidity, and
/// applies exits through the position book. Market-context ticks drive
/// trailing adjustments independently of the queue.
pub struct Engine {
    queue: Arc<RateLimitedSignalQueue>,
    router: Arc<QuoteRouter>,
    book: Arc<PositionBook>,
    config: EngineConfig,
    events: mpsc::Sender<EngineEvent>,
    running: AtomicBool,
    shutdown: Notify,
}

impl Engine {
    /// Creates the engine and the receiving end of its event stream.
    pub fn new(
        queue: Arc<RateLimitedSignalQueue>,
        router: Arc<QuoteRouter>,
        book: Arc<PositionBook>,
        config: EngineConfig,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (events, receiver) = mpsc::channel(256);
        (
            Self {
                queue,
                router,
                book,
                config,
                events,
                running: AtomicBool::new(false),
                shutdown: Notify::new(),
            },
            receiver,
        )
    }

    /// Admits a signal into the dispatch queue. Risk-reducing signals
    /// bypass the rate limiter; entries consume their provider's quota.
    /// A rejection is surfaced to the caller and on the event stream.
    pub fn submit(&self, signal: TradeSignal) -> Result<(), RejectReason> {
        let signal_id = signal.id;
        let result = if signal.is_risk_reducing() {
            let priority = signal.default_priority();
            self.queue.push_bypass(signal, priority)
        } else {
            let provider_key = signal.provider_key.clone();
            self.queue.push(signal, &provider_key)
        };

        if let Err(reason) = result {
            self.emit(EngineEvent::Rejected {
                signal_id: Some(signal_id),
                reason,
            });
            return Err(reason);
        }
        Ok(())
    }

    /// Drains the queue until `stop()`. Blocks only while the queue is
    /// empty; per-signal failures are logged and never end the loop.
    pub async fn run(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!(quote_mint = %self.config.quote_mint, "engine started");

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                entry = self.queue.pop_wait() => {
                    self.handle_signal(entry).await;
                }
                _ = self.shutdown.notified() => {}
            }
        }

        info!("engine stopped");
    }

    /// Stops the engine loop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    /// Applies a market-context tick: derives the adjusted trailing
    /// distance and ratchets every open position on that mint.
    pub async fn on_market_tick(&self, context: &MarketContext) {
        let distance_bps = adjust_trail_distance(
            self.config.trail_base_distance_bps,
            context,
            &self.config.trailing,
        );
        let trail_stop_pct = Decimal::from(distance_bps) / Decimal::from(10_000);
        let trail_activation_pct =
            Decimal::from(self.config.trail_activation_bps) / Decimal::from(10_000);

        let updated = self
            .book
            .apply_trailing(&context.mint, trail_stop_pct, trail_activation_pct, context.price)
            .await;

        if updated > 0 {
            self.emit(EngineEvent::TrailingAdjusted {
                mint: context.mint.clone(),
                distance_bps,
                updated,
            });
        }
    }

    async fn handle_signal(&self, entry: QueuedSignal) {
        let signal = entry.signal;
        debug!(signal = %signal.id, priority = ?entry.priority, "dispatching signal");

        match &signal.kind {
            SignalKind::Entry { amount_in } => self.handle_entry(&signal, *amount_in).await,
            SignalKind::Exit(exit) => self.handle_exit(&signal, exit.clone()).await,
        }
    }

    async fn handle_entry(&self, signal: &TradeSignal, amount_in: TokenAmount) {
        let route = match self
            .router
            .find_best_route(&self.config.quote_mint, &signal.mint, amount_in)
            .await
        {
            Ok(route) => route,
            Err(e) => {
                warn!(signal = %signal.id, error = %e, "entry not routable");
                self.emit(EngineEvent::Rejected {
                    signal_id: Some(signal.id),
                    reason: e.reject_reason(),
                });
                return;
            }
        };

        let size = route.amount_out().as_u64();
        if size == 0 {
            warn!(signal = %signal.id, "route filled zero size");
            self.emit(EngineEvent::Rejected {
                signal_id: Some(signal.id),
                reason: RejectReason::NoRouteAvailable,
            });
            return;
        }
        let entry_price =
            Price::new(Decimal::from(amount_in.as_u64()) / Decimal::from(size));

        match self
            .book
            .open(&signal.wallet, &signal.mint, entry_price, size)
            .await
        {
            Ok(_) => {
                self.emit(EngineEvent::Filled {
                    signal_id: signal.id,
                    source_name: route.source_name.clone(),
                    amount_out: route.amount_out(),
                    price_impact_bps: route.quote.price_impact_bps,
                });
            }
            Err(e) => {
                warn!(signal = %signal.id, error = %e, "entry fill not bookable");
                self.emit(EngineEvent::Rejected {
                    signal_id: Some(signal.id),
                    reason: e.reject_reason(),
                });
            }
        }
    }

    async fn handle_exit(&self, signal: &TradeSignal, exit: ExitSignal) {
        let key = PositionKey::new(signal.wallet.clone(), signal.mint.clone());

        let Some(snapshot) = self.book.snapshot(&key).await else {
            self.emit(EngineEvent::Rejected {
                signal_id: Some(signal.id),
                reason: RejectReason::InvalidSignal,
            });
            return;
        };

        // Price discovery for the exit: route the quantity being sold
        // (or the full remainder for a pure level update).
        let probe_amount = if exit.exit_type.moves_size() {
            match calculate_swap_amount(snapshot.size_remaining, exit.size_pct) {
                Ok(amount) => amount,
                Err(e) => {
                    self.emit(EngineEvent::Rejected {
                        signal_id: Some(signal.id),
                        reason: e.reject_reason(),
                    });
                    return;
                }
            }
        } else {
            snapshot.size_remaining
        };
        if probe_amount == 0 {
            self.emit(EngineEvent::Rejected {
                signal_id: Some(signal.id),
                reason: RejectReason::InvalidSignal,
            });
            return;
        }

        let route = match self
            .router
            .find_best_route(&signal.mint, &self.config.quote_mint, TokenAmount::from(probe_amount))
            .await
        {
            Ok(route) => route,
            Err(e) => {
                warn!(signal = %signal.id, error = %e, "exit not routable");
                self.emit(EngineEvent::Rejected {
                    signal_id: Some(signal.id),
                    reason: e.reject_reason(),
                });
                return;
            }
        };

        let current_price = Price::new(
            Decimal::from(route.amount_out().as_u64()) / Decimal::from(probe_amount),
        );

        match self.book.apply_exit(&key, &exit, current_price).await {
            Ok(outcome) => {
                self.emit(EngineEvent::PositionExited {
                    signal_id: signal.id,
                    amount_sold: outcome.amount_sold,
                    is_closed: outcome.is_closed,
                    snapshot: outcome.position.snapshot(),
                });
            }
            Err(e) => {
                warn!(signal = %signal.id, error = %e, "exit rejected by ledger");
                self.emit(EngineEvent::Rejected {
                    signal_id: Some(signal.id),
                    reason: e.reject_reason(),
                });
            }
        }
    }

    fn emit(&self, event: EngineEvent) {
        if let Err(e) = self.events.try_send(event) {
            warn!(error = %e, "event channel saturated, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytrade_dispatch::ManualClock;
    use copytrade_routing::{LocalPoolSource, RouterConfig};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    const MEME_MINT: &str = "MemeMint1111111111111111111111111111111111";

    fn engine_fixture() -> (Arc<Engine>, mpsc::Receiver<EngineEvent>, Arc<PositionBook>) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("copytrade=debug")
            .try_init();

        let clock = Arc::new(ManualClock::new());
        let queue = Arc::new(RateLimitedSignalQueue::new(
            100,
            Duration::from_secs(1),
            64,
            clock,
        ));

        let mut router = QuoteRouter::new(RouterConfig {
            quote_timeout: Duration::from_millis(200),
        });
        router.register_source(Arc::new(LocalPoolSource::new(
            "local-amm",
            USDC_MINT,
            MEME_MINT,
            TokenAmount::from(1_000_000_000u64),
            TokenAmount::from(1_000_000_000u64),
            30,
        )));

        let book = Arc::new(PositionBook::new());
        let (engine, events) = Engine::new(
            queue,
            Arc::new(router),
            book.clone(),
            EngineConfig::default(),
        );
        (Arc::new(engine), events, book)
    }

    #[tokio::test]
    async fn test_entry_exit_lifecycle() {
        let (engine, mut events, book) = engine_fixture();
        let runner = tokio::spawn({
            let engine = engine.clone();
            async move { engine.run().await }
        });

        // Entry routes and opens a position.
        engine
            .submit(TradeSignal::entry(
                "wallet",
                MEME_MINT,
                "rpc",
                TokenAmount::from(1_000_000u64),
            ))
            .unwrap();

        let filled_size = match events.recv().await.unwrap() {
            EngineEvent::Filled {
                source_name,
                amount_out,
                ..
            } => {
                assert_eq!(source_name, "local-amm");
                amount_out.as_u64()
            }
            other => panic!("expected fill, got {other:?}"),
        };
        assert!(filled_size > 0);

        let key = PositionKey::new("wallet", MEME_MINT);
        let snap = book.snapshot(&key).await.unwrap();
        assert_eq!(snap.size_remaining, filled_size);

        // Partial exit halves the position.
        engine
            .submit(TradeSignal::exit(
                "wallet",
                MEME_MINT,
                "rpc",
                ExitSignal::partial(dec!(0.5)),
            ))
            .unwrap();

        match events.recv().await.unwrap() {
            EngineEvent::PositionExited {
                is_closed,
                snapshot,
                ..
            } => {
                assert!(!is_closed);
                assert_eq!(snapshot.size_remaining, filled_size - filled_size / 2);
            }
            other => panic!("expected exit, got {other:?}"),
        }

        // A market tick arms the trailing stop.
        engine
            .on_market_tick(&MarketContext::new(
                MEME_MINT,
                Price::new(dec!(1.2)),
                dec!(0.10),
                dec!(3),
            ))
            .await;
        match events.recv().await.unwrap() {
            EngineEvent::TrailingAdjusted { updated, .. } => assert_eq!(updated, 1),
            other => panic!("expected trailing adjustment, got {other:?}"),
        }
        assert!(book.snapshot(&key).await.unwrap().trail_stop_price.is_some());

        // Market close retires the position.
        engine
            .submit(TradeSignal::exit(
                "wallet",
                MEME_MINT,
                "rpc",
                ExitSignal::market_close(),
            ))
            .unwrap();

        match events.recv().await.unwrap() {
            EngineEvent::PositionExited {
                is_closed,
                snapshot,
                ..
            } => {
                assert!(is_closed);
                assert_eq!(snapshot.size_remaining, 0);
            }
            other => panic!("expected close, got {other:?}"),
        }
        assert!(book.open_positions().await.is_empty());

        engine.stop();
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn test_exit_without_position_is_rejected() {
        let (engine, mut events, _book) = engine_fixture();
        let runner = tokio::spawn({
            let engine = engine.clone();
            async move { engine.run().await }
        });

        engine
            .submit(TradeSignal::exit(
                "ghost",
                MEME_MINT,
                "rpc",
                ExitSignal::market_close(),
            ))
            .unwrap();

        match events.recv().await.unwrap() {
            EngineEvent::Rejected { reason, .. } => {
                assert_eq!(reason, RejectReason::InvalidSignal);
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        engine.stop();
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn test_unroutable_mint_is_rejected() {
        let (engine, mut events, _book) = engine_fixture();
        let runner = tokio::spawn({
            let engine = engine.clone();
            async move { engine.run().await }
        });

        engine
            .submit(TradeSignal::entry(
                "wallet",
                "UnknownMint111111111111111111111111111111",
                "rpc",
                TokenAmount::from(1_000u64),
            ))
            .unwrap();

        match events.recv().await.unwrap() {
            EngineEvent::Rejected { reason, .. } => {
                assert_eq!(reason, RejectReason::NoRouteAvailable);
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        engine.stop();
        runner.await.unwrap();
    }
}
