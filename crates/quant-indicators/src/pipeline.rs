//! Per-bar indicator pipeline.
//!
//! [`IndicatorPipeline::compute`] evaluates every configured indicator over a
//! [`BarSeries`] and returns an [`IndicatorFrame`]. The frame has a single
//! warm-up length for the whole set: before it every value is unavailable,
//! from it on every indicator that can be computed is defined.

use std::collections::BTreeMap;
use std::ops::Range;

use quant_core::error::ConfigError;
use quant_core::traits::{ensure, BarIndicator, Indicator, Params};
use quant_core::types::{Bar, BarSeries, Timeframe};
use serde::{Deserialize, Serialize};

use crate::momentum::{Macd, Rsi};
use crate::moving_average::{Ema, Sma};
use crate::structure::SwingLevels;
use crate::volatility::{Atr, AtrSmoothing, BollingerBands};
use crate::volume::VolumeRatio;

/// Lookbacks for every indicator in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    pub atr_smoothing: AtrSmoothing,
    /// Window of the long-run ATR average used for the volatility ratio.
    pub atr_baseline_period: usize,
    pub ema_fast: usize,
    pub ema_mid: usize,
    pub ema_slow: usize,
    pub ema_long: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub volume_period: usize,
    pub swing_lookback: usize,
    pub swing_strength: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
            atr_smoothing: AtrSmoothing::Simple,
            atr_baseline_period: 50,
            ema_fast: 9,
            ema_mid: 21,
            ema_slow: 50,
            ema_long: 100,
            bb_period: 20,
            bb_std_dev: 2.0,
            volume_period: 20,
            swing_lookback: 30,
            swing_strength: 2,
        }
    }
}

impl Params for IndicatorSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.rsi_period >= 2, "indicators.rsi_period", self.rsi_period, ">= 2")?;
        ensure(self.macd_fast >= 1, "indicators.macd_fast", self.macd_fast, ">= 1")?;
        ensure(
            self.macd_slow > self.macd_fast,
            "indicators.macd_slow",
            self.macd_slow,
            "> macd_fast",
        )?;
        ensure(self.macd_signal >= 1, "indicators.macd_signal", self.macd_signal, ">= 1")?;
        ensure(self.atr_period >= 1, "indicators.atr_period", self.atr_period, ">= 1")?;
        ensure(
            self.atr_baseline_period >= 1,
            "indicators.atr_baseline_period",
            self.atr_baseline_period,
            ">= 1",
        )?;
        ensure(self.ema_fast >= 1, "indicators.ema_fast", self.ema_fast, ">= 1")?;
        ensure(self.ema_mid > self.ema_fast, "indicators.ema_mid", self.ema_mid, "> ema_fast")?;
        ensure(self.ema_slow > self.ema_mid, "indicators.ema_slow", self.ema_slow, "> ema_mid")?;
        ensure(self.ema_long > self.ema_slow, "indicators.ema_long", self.ema_long, "> ema_slow")?;
        ensure(self.bb_period >= 2, "indicators.bb_period", self.bb_period, ">= 2")?;
        ensure(
            self.bb_std_dev.is_finite() && self.bb_std_dev > 0.0,
            "indicators.bb_std_dev",
            self.bb_std_dev,
            "> 0",
        )?;
        ensure(self.volume_period >= 1, "indicators.volume_period", self.volume_period, ">= 1")?;
        ensure(
            self.swing_strength >= 1,
            "indicators.swing_strength",
            self.swing_strength,
            ">= 1",
        )?;
        ensure(
            self.swing_lookback > 2 * self.swing_strength,
            "indicators.swing_lookback",
            self.swing_lookback,
            "> 2 * swing_strength",
        )
    }
}

/// One named value per bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Rsi,
    Macd,
    MacdSignal,
    MacdHist,
    Atr,
    AtrBaseline,
    EmaFast,
    EmaMid,
    EmaSlow,
    EmaLong,
    BbUpper,
    BbMiddle,
    BbLower,
    BbPosition,
    VolumeRatio,
    Support,
    Resistance,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::Rsi,
        Field::Macd,
        Field::MacdSignal,
        Field::MacdHist,
        Field::Atr,
        Field::AtrBaseline,
        Field::EmaFast,
        Field::EmaMid,
        Field::EmaSlow,
        Field::EmaLong,
        Field::BbUpper,
        Field::BbMiddle,
        Field::BbLower,
        Field::BbPosition,
        Field::VolumeRatio,
        Field::Support,
        Field::Resistance,
    ];

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

type Column = Vec<Option<f64>>;

/// Configured indicator set.
#[derive(Debug, Clone)]
pub struct IndicatorPipeline {
    settings: IndicatorSettings,
    rsi: Rsi,
    macd: Macd,
    atr: Atr,
    atr_baseline: Sma,
    emas: [Ema; 4],
    bollinger: BollingerBands,
    volume: VolumeRatio,
    swing: SwingLevels,
    keys: Vec<String>,
    warmup: usize,
}

impl IndicatorPipeline {
    pub fn new(settings: IndicatorSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let rsi = Rsi::new(settings.rsi_period);
        let macd = Macd::with_periods(settings.macd_fast, settings.macd_slow, settings.macd_signal);
        let atr = Atr::with_smoothing(settings.atr_period, settings.atr_smoothing);
        let atr_baseline = Sma::new(settings.atr_baseline_period);
        let emas = [
            Ema::new(settings.ema_fast),
            Ema::new(settings.ema_mid),
            Ema::new(settings.ema_slow),
            Ema::new(settings.ema_long),
        ];
        let bollinger = BollingerBands::with_params(settings.bb_period, settings.bb_std_dev);
        let volume = VolumeRatio::new(settings.volume_period);
        let swing = SwingLevels::new(settings.swing_lookback, settings.swing_strength);

        let last_first_defined = [
            rsi.first_defined(),
            macd.first_defined(),
            atr.first_defined() + atr_baseline.first_defined(),
            emas[3].first_defined(),
            bollinger.first_defined(),
            volume.first_defined(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);

        let keys = Field::ALL
            .iter()
            .map(|field| match field {
                Field::Rsi => rsi.name().to_string(),
                Field::Macd => "macd".to_string(),
                Field::MacdSignal => "macd_signal".to_string(),
                Field::MacdHist => "macd_hist".to_string(),
                Field::Atr => atr.name().to_string(),
                Field::AtrBaseline => format!("atr_avg_{}", settings.atr_baseline_period),
                Field::EmaFast => emas[0].name().to_string(),
                Field::EmaMid => emas[1].name().to_string(),
                Field::EmaSlow => emas[2].name().to_string(),
                Field::EmaLong => emas[3].name().to_string(),
                Field::BbUpper => "bb_upper".to_string(),
                Field::BbMiddle => "bb_middle".to_string(),
                Field::BbLower => "bb_lower".to_string(),
                Field::BbPosition => "bb_position".to_string(),
                Field::VolumeRatio => volume.name().to_string(),
                Field::Support => "support".to_string(),
                Field::Resistance => "resistance".to_string(),
            })
            .collect();

        Ok(Self {
            settings,
            rsi,
            macd,
            atr,
            atr_baseline,
            emas,
            bollinger,
            volume,
            swing,
            keys,
            warmup: last_first_defined + 1,
        })
    }

    /// Number of leading bars without a snapshot.
    pub fn warmup(&self) -> usize {
        self.warmup
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    pub fn key(&self, field: Field) -> &str {
        &self.keys[field.slot()]
    }

    pub fn compute(&self, series: &BarSeries) -> IndicatorFrame {
        let bars = series.bars();
        let closes = series.closes();
        let len = bars.len();
        let mut columns: Vec<Column> = vec![vec![None; len]; Field::ALL.len()];

        columns[Field::Rsi.slot()] = self.rsi.aligned(&closes);

        let macd = self.macd.aligned(&closes);
        columns[Field::Macd.slot()] = macd.iter().map(|m| m.map(|m| m.macd)).collect();
        columns[Field::MacdSignal.slot()] = macd.iter().map(|m| m.map(|m| m.signal)).collect();
        columns[Field::MacdHist.slot()] = macd.iter().map(|m| m.map(|m| m.histogram)).collect();

        let atr = self.atr.calculate(bars);
        let baseline = self.atr_baseline.calculate(&atr);
        columns[Field::Atr.slot()] = pad(len, atr);
        columns[Field::AtrBaseline.slot()] = pad(len, baseline);

        let ema_fields = [Field::EmaFast, Field::EmaMid, Field::EmaSlow, Field::EmaLong];
        for (field, ema) in ema_fields.iter().zip(&self.emas) {
            columns[field.slot()] = ema.aligned(&closes);
        }

        let bands = self.bollinger.aligned(&closes);
        columns[Field::BbUpper.slot()] = bands.iter().map(|b| b.map(|b| b.upper)).collect();
        columns[Field::BbMiddle.slot()] = bands.iter().map(|b| b.map(|b| b.middle)).collect();
        columns[Field::BbLower.slot()] = bands.iter().map(|b| b.map(|b| b.lower)).collect();
        columns[Field::BbPosition.slot()] = bands.iter().map(|b| b.map(|b| b.position)).collect();

        columns[Field::VolumeRatio.slot()] = self.volume.aligned(bars);

        let swings = self.swing.calculate(bars);
        columns[Field::Support.slot()] = swings.iter().map(|s| s.support).collect();
        columns[Field::Resistance.slot()] = swings.iter().map(|s| s.resistance).collect();

        for column in &mut columns {
            for (i, value) in column.iter_mut().enumerate() {
                if i < self.warmup || value.is_some_and(|v| !v.is_finite()) {
                    *value = None;
                }
            }
        }

        IndicatorFrame {
            symbol: series.symbol.clone(),
            timeframe: series.timeframe,
            warmup: self.warmup,
            bars: bars.to_vec(),
            columns,
            keys: self.keys.clone(),
        }
    }
}

/// Right-align a tail-only output to `len` slots.
fn pad(len: usize, values: Vec<f64>) -> Column {
    let missing = len.saturating_sub(values.len());
    std::iter::repeat(None)
        .take(missing)
        .chain(values.into_iter().map(Some))
        .collect()
}

/// Indicator values for every bar of one series.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    symbol: String,
    timeframe: Timeframe,
    warmup: usize,
    bars: Vec<Bar>,
    columns: Vec<Column>,
    keys: Vec<String>,
}

impl IndicatorFrame {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn warmup(&self) -> usize {
        self.warmup
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn bar(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// False when the series is too short for any snapshot.
    pub fn has_snapshots(&self) -> bool {
        self.bars.len() > self.warmup
    }

    /// Bar indices that have a snapshot.
    pub fn ready_range(&self) -> Range<usize> {
        self.warmup.min(self.len())..self.len()
    }

    pub fn is_ready(&self, index: usize) -> bool {
        self.ready_range().contains(&index)
    }

    pub fn get(&self, field: Field, index: usize) -> Option<f64> {
        self.columns[field.slot()].get(index).copied().flatten()
    }

    pub fn key(&self, field: Field) -> &str {
        &self.keys[field.slot()]
    }

    /// Named values at `index`, or `None` during warm-up.
    pub fn snapshot(&self, index: usize) -> Option<IndicatorSnapshot> {
        if !self.is_ready(index) {
            return None;
        }
        let values = Field::ALL
            .iter()
            .map(|&field| (self.key(field).to_string(), self.get(field, index)))
            .collect();
        Some(IndicatorSnapshot {
            index,
            timestamp: self.bars[index].timestamp,
            close: self.bars[index].close,
            values,
        })
    }
}

/// Indicator values for one bar, keyed by name. `None` marks an indicator
/// that is unavailable on this bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub index: usize,
    pub timestamp: i64,
    pub close: f64,
    pub values: BTreeMap<String, Option<f64>>,
}

impl IndicatorSnapshot {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    pub fn is_unavailable(&self, name: &str) -> bool {
        self.get(name).is_none()
    }
}
