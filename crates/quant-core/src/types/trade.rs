//! Simulated trades and their lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Direction, Signal};
use crate::error::TradeError;

/// Lifecycle status. Ordered; a trade only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Pending,
    Open,
    PartiallyClosed,
    TrailingActive,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    TimeExit,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::TrailingStop => "TRAILING_STOP",
            ExitReason::TimeExit => "TIME_EXIT",
            ExitReason::EndOfData => "END_OF_DATA",
        };
        f.write_str(s)
    }
}

/// Price levels fixed at entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Partial-close level and the fraction of the position closed there.
    pub partial: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialPlan {
    pub price: f64,
    pub fraction: f64,
    pub filled_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeExit {
    pub price: f64,
    pub timestamp: i64,
    pub index: usize,
    pub reason: ExitReason,
}

/// One hypothetical position from entry to exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: i64,
    pub entry_index: usize,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub partial: Option<PartialPlan>,
    pub trailing_stop: Option<f64>,
    /// Fraction of capital committed.
    pub position_size: f64,
    pub confidence: f64,
    pub status: TradeStatus,
    pub bars_held: usize,
    pub exit: Option<TradeExit>,
}

impl Trade {
    /// Create a pending trade from a signal, checking level ordering and size.
    pub fn new(
        id: u64,
        signal: &Signal,
        levels: TradeLevels,
        position_size: f64,
        max_fraction: f64,
    ) -> Result<Self, TradeError> {
        let entry = signal.reference_price;
        let direction = signal.direction;
        let invalid = || TradeError::InvalidLevels {
            direction,
            stop_loss: levels.stop_loss,
            entry,
            take_profit: levels.take_profit,
        };

        // Distances measured in the direction of profit.
        let risk = direction.sign() * (entry - levels.stop_loss);
        let reward = direction.sign() * (levels.take_profit - entry);
        if !(risk > 0.0 && reward > 0.0) {
            return Err(invalid());
        }
        if !(position_size > 0.0 && position_size <= max_fraction) {
            return Err(TradeError::InvalidSize {
                size: position_size,
                max: max_fraction,
            });
        }

        let partial = match levels.partial {
            Some((price, fraction)) => {
                let gain = direction.sign() * (price - entry);
                if !(gain > 0.0 && gain < reward && fraction > 0.0 && fraction < 1.0) {
                    return Err(invalid());
                }
                Some(PartialPlan {
                    price,
                    fraction,
                    filled_at: None,
                })
            }
            None => None,
        };

        Ok(Self {
            id,
            symbol: signal.symbol.clone(),
            direction,
            entry_price: entry,
            entry_time: signal.timestamp,
            entry_index: signal.index,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            partial,
            trailing_stop: None,
            position_size,
            confidence: signal.confidence,
            status: TradeStatus::Pending,
            bars_held: 0,
            exit: None,
        })
    }

    fn advance(&mut self, to: TradeStatus) {
        if to > self.status {
            self.status = to;
        }
    }

    pub fn open(&mut self) {
        self.advance(TradeStatus::Open);
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Record the partial close at its planned level.
    pub fn fill_partial(&mut self, timestamp: i64) {
        if let Some(plan) = self.partial.as_mut() {
            if plan.filled_at.is_none() {
                plan.filled_at = Some(timestamp);
                self.advance(TradeStatus::PartiallyClosed);
            }
        }
    }

    pub fn partial_filled(&self) -> bool {
        self.partial.map_or(false, |p| p.filled_at.is_some())
    }

    /// Move the trailing stop to `level` if that is favorable. Activates
    /// trailing on first call. Returns whether the stop moved.
    pub fn ratchet_trailing(&mut self, level: f64) -> bool {
        let moved = match self.trailing_stop {
            None => true,
            Some(current) => self.direction.sign() * (level - current) > 0.0,
        };
        if moved {
            self.trailing_stop = Some(level);
        }
        self.advance(TradeStatus::TrailingActive);
        moved
    }

    pub fn close(
        &mut self,
        price: f64,
        timestamp: i64,
        index: usize,
        reason: ExitReason,
    ) -> Result<(), TradeError> {
        if self.is_closed() {
            return Err(TradeError::AlreadyClosed(self.id));
        }
        self.exit = Some(TradeExit {
            price,
            timestamp,
            index,
            reason,
        });
        self.advance(TradeStatus::Closed);
        Ok(())
    }

    /// Directional return of a move from entry to `price`.
    #[inline]
    pub fn price_return(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price) / self.entry_price
    }

    /// Return of the whole position, weighting a filled partial close.
    pub fn realized_return(&self) -> Option<f64> {
        let exit = self.exit?;
        let remainder = self.price_return(exit.price);
        Some(match self.partial {
            Some(PartialPlan {
                price,
                fraction,
                filled_at: Some(_),
            }) => fraction * self.price_return(price) + (1.0 - fraction) * remainder,
            _ => remainder,
        })
    }

    /// Realized P&L in percent of capital at entry.
    pub fn pnl_pct(&self) -> Option<f64> {
        self.realized_return()
            .map(|r| r * self.position_size * 100.0)
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit.map(|e| e.reason)
    }
}
