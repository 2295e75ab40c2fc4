//! Per-bar state machine for an open trade.

use quant_core::error::TradeError;
use quant_core::types::{Bar, Direction, ExitReason, Trade};
use quant_risk::TrailingStop;
use tracing::debug;

/// Walks an open trade through subsequent bars.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    trailing: TrailingStop,
    /// 0 disables the time exit.
    max_holding_bars: usize,
}

fn touched_favorable(direction: Direction, level: f64, bar: &Bar) -> bool {
    match direction {
        Direction::Long => bar.high >= level,
        Direction::Short => bar.low <= level,
    }
}

impl Lifecycle {
    pub fn new(trailing: TrailingStop, max_holding_bars: usize) -> Self {
        Self {
            trailing,
            max_holding_bars,
        }
    }

    /// Advance `trade` by one bar after entry. Returns true once closed.
    ///
    /// Exits in priority order: stop-loss, take-profit, trailing stop, time.
    /// A partial target touched on a bar that does not stop out is filled
    /// before the take-profit check. Breach exits fill at the breached level.
    /// The trailing stop is recomputed from the close and therefore only
    /// applies from the next bar.
    pub fn step(
        &self,
        trade: &mut Trade,
        bar: &Bar,
        index: usize,
        atr: Option<f64>,
    ) -> Result<bool, TradeError> {
        if trade.is_closed() {
            return Ok(true);
        }
        trade.bars_held += 1;
        let direction = trade.direction;

        if TrailingStop::is_breached(direction, trade.stop_loss, bar.low, bar.high) {
            return self.exit(trade, trade.stop_loss, bar, index, ExitReason::StopLoss);
        }

        if let Some(plan) = trade.partial {
            if plan.filled_at.is_none() && touched_favorable(direction, plan.price, bar) {
                trade.fill_partial(bar.timestamp);
                debug!(id = trade.id, price = plan.price, fraction = plan.fraction, "Partial close");
            }
        }

        if touched_favorable(direction, trade.take_profit, bar) {
            return self.exit(trade, trade.take_profit, bar, index, ExitReason::TakeProfit);
        }

        if let Some(stop) = trade.trailing_stop {
            if TrailingStop::is_breached(direction, stop, bar.low, bar.high) {
                return self.exit(trade, stop, bar, index, ExitReason::TrailingStop);
            }
        }

        if self.max_holding_bars > 0 && trade.bars_held >= self.max_holding_bars {
            return self.exit(trade, bar.close, bar, index, ExitReason::TimeExit);
        }

        let trailing_live = trade.trailing_stop.is_some()
            || self
                .trailing
                .should_activate(direction, trade.entry_price, bar.close);
        if trailing_live {
            if let Some(level) = self.trailing.level(direction, bar.close, atr) {
                if trade.ratchet_trailing(level) {
                    debug!(id = trade.id, level, "Trailing stop moved");
                }
            }
        }
        Ok(false)
    }

    /// Close whatever is still open at the final bar's close.
    pub fn finish(&self, trade: &mut Trade, bar: &Bar, index: usize) -> Result<(), TradeError> {
        if !trade.is_closed() {
            self.exit(trade, bar.close, bar, index, ExitReason::EndOfData)?;
        }
        Ok(())
    }

    fn exit(
        &self,
        trade: &mut Trade,
        price: f64,
        bar: &Bar,
        index: usize,
        reason: ExitReason,
    ) -> Result<bool, TradeError> {
        trade.close(price, bar.timestamp, index, reason)?;
        debug!(
            id = trade.id,
            symbol = %trade.symbol,
            %reason,
            price,
            bars_held = trade.bars_held,
            "Trade closed"
        );
        Ok(true)
    }
}
