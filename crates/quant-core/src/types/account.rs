//! Capital ledger for one simulated run.

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Trade;
use crate::error::TradeError;

/// Equity after a closed trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: Decimal,
}

/// Compounding account. Each closed trade moves equity by its P&L percent
/// applied to the equity at the time it closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub initial_capital: Decimal,
    pub equity: Decimal,
    pub peak_equity: Decimal,
    pub realized_pnl: Decimal,
    /// Deepest peak-to-trough decline, as a fraction of the peak.
    pub max_drawdown: Decimal,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            equity: initial_capital,
            peak_equity: initial_capital,
            realized_pnl: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            equity_curve: Vec::new(),
        }
    }

    /// Book a closed trade. Returns the P&L in account currency; open trades
    /// book nothing. A P&L with no decimal representation leaves the ledger
    /// untouched.
    pub fn apply_trade(&mut self, trade: &Trade) -> Result<Decimal, TradeError> {
        let (Some(pnl_pct), Some(exit)) = (trade.pnl_pct(), trade.exit) else {
            return Ok(Decimal::ZERO);
        };
        let unbookable = || TradeError::UnbookablePnl {
            id: trade.id,
            pnl_pct,
        };
        let pct = Decimal::try_from(pnl_pct).map_err(|_| unbookable())?;
        let pnl = self
            .equity
            .checked_mul(pct)
            .ok_or_else(unbookable)?
            .checked_div(Decimal::ONE_HUNDRED)
            .ok_or_else(unbookable)?
            .round_dp(8);

        self.equity += pnl;
        self.realized_pnl += pnl;
        if self.equity > self.peak_equity {
            self.peak_equity = self.equity;
        }
        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - self.equity) / self.peak_equity;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
        self.equity_curve.push(EquityPoint {
            timestamp: exit.timestamp,
            equity: self.equity,
        });
        Ok(pnl)
    }

    /// Compounded return in percent.
    pub fn total_return_pct(&self) -> f64 {
        if self.initial_capital.is_zero() {
            return 0.0;
        }
        ((self.equity - self.initial_capital) / self.initial_capital * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0)
    }

    pub fn max_drawdown_pct(&self) -> f64 {
        (self.max_drawdown * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, ExitReason, MarketRegime, Signal, TradeLevels};
    use rust_decimal_macros::dec;

    fn closed_trade(exit_price: f64, size: f64) -> Trade {
        let signal = Signal {
            symbol: "SOL".into(),
            index: 0,
            timestamp: 0,
            direction: Direction::Long,
            confidence: 0.5,
            score: 5.0,
            reasons: vec![],
            reference_price: 100.0,
            regime: MarketRegime::Uptrend,
        };
        let levels = TradeLevels {
            stop_loss: 90.0,
            take_profit: 120.0,
            partial: None,
        };
        let mut trade = Trade::new(7, &signal, levels, size, 1.0).unwrap();
        trade.open();
        trade.close(exit_price, 10, 5, ExitReason::TimeExit).unwrap();
        trade
    }

    #[test]
    fn test_compounding_and_drawdown() {
        let mut account = Account::new(dec!(10000));

        let pnl = account.apply_trade(&closed_trade(110.0, 0.5)).unwrap();
        assert_eq!(pnl, dec!(500));
        assert_eq!(account.equity, dec!(10500));

        let pnl = account.apply_trade(&closed_trade(90.0, 0.5)).unwrap();
        assert_eq!(pnl, dec!(-525));
        assert_eq!(account.equity, dec!(9975));
        assert_eq!(account.peak_equity, dec!(10500));
        assert!((account.max_drawdown_pct() - 5.0).abs() < 1e-9);
        assert!((account.total_return_pct() - (-0.25)).abs() < 1e-9);
        assert_eq!(account.equity_curve.len(), 2);
    }

    #[test]
    fn test_unbookable_pnl_is_an_error() {
        let mut account = Account::new(dec!(10000));
        let err = account.apply_trade(&closed_trade(f64::NAN, 0.5)).unwrap_err();
        assert!(matches!(err, TradeError::UnbookablePnl { id: 7, .. }));
        assert_eq!(account.equity, dec!(10000));
        assert!(account.equity_curve.is_empty());
    }
}
