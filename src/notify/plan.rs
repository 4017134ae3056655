use crate::models::{Direction, SignalEvent};

/// ATR multiples shaping the published trade levels
#[derive(Debug, Clone)]
pub struct PlanParams {
    pub leverage: u32,
    /// Stop-loss distance in ATRs
    pub risk_atr: f64,
    /// Far edge of the entry band, in ATRs back from the close
    pub pull_lower: f64,
    /// Near edge of the entry band, in ATRs back from the close
    pub pull_upper: f64,
    /// Take-profit ladder, in ATRs beyond the close
    pub tp_multiples: Vec<f64>,
}

impl Default for PlanParams {
    fn default() -> Self {
        Self {
            leverage: 20,
            risk_atr: 2.2,
            pull_lower: 0.35,
            pull_upper: 0.20,
            tp_multiples: vec![0.8, 1.6, 2.4, 3.5, 4.2, 5.0],
        }
    }
}

/// Entry band, stop loss and target ladder derived from one signal's
/// close price and ATR. Longs retrace down into the band; shorts mirror up.
#[derive(Debug, Clone)]
pub struct TradePlan {
    pub leverage: u32,
    pub entry_high: f64,
    pub entry_low: f64,
    pub stop_loss: f64,
    pub take_profits: Vec<f64>,
}

impl TradePlan {
    pub fn for_event(event: &SignalEvent, params: &PlanParams) -> Self {
        let price = event.price;
        let atr = event.atr;

        match event.direction {
            Direction::Bullish => Self {
                leverage: params.leverage,
                entry_high: price - params.pull_upper * atr,
                entry_low: price - params.pull_lower * atr,
                stop_loss: price - params.risk_atr * atr,
                take_profits: params
                    .tp_multiples
                    .iter()
                    .map(|m| price + m * atr)
                    .collect(),
            },
            Direction::Bearish => Self {
                leverage: params.leverage,
                entry_high: price + params.pull_lower * atr,
                entry_low: price + params.pull_upper * atr,
                stop_loss: price + params.risk_atr * atr,
                take_profits: params
                    .tp_multiples
                    .iter()
                    .map(|m| price - m * atr)
                    .collect(),
            },
        }
    }
}
