//! Portfolio holdings

use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};

/// A position in one ticker, validated on construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHolding")]
pub struct Holding {
    ticker: String,
    quantity: f64,
    avg_price: f64,
    current_price: f64,
    stop_loss: Option<f64>,
    target_price: Option<f64>,
    days_held: u32,
}

/// Unchecked wire form of [`Holding`]
#[derive(Debug, Deserialize)]
struct RawHolding {
    ticker: String,
    quantity: f64,
    avg_price: f64,
    #[serde(default)]
    current_price: Option<f64>,
    #[serde(default)]
    stop_loss: Option<f64>,
    #[serde(default)]
    target_price: Option<f64>,
    #[serde(default)]
    days_held: u32,
}

impl TryFrom<RawHolding> for Holding {
    type Error = StockError;

    fn try_from(raw: RawHolding) -> Result<Self> {
        let mut holding = Holding::new(raw.ticker, raw.quantity, raw.avg_price)?
            .with_days_held(raw.days_held);
        if let Some(price) = raw.current_price {
            holding = holding.with_current_price(price)?;
        }
        if let Some(stop) = raw.stop_loss {
            holding = holding.with_stop_loss(stop)?;
        }
        if let Some(target) = raw.target_price {
            holding = holding.with_target_price(target)?;
        }
        Ok(holding)
    }
}

fn positive(ticker: &str, field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(StockError::InvalidHolding {
            ticker: ticker.to_string(),
            reason: format!("{field} must be positive, got {value}"),
        })
    }
}

impl Holding {
    /// Create a holding priced at its average cost
    ///
    /// # Errors
    ///
    /// Rejects an empty ticker and non-positive quantity or price.
    pub fn new(ticker: impl Into<String>, quantity: f64, avg_price: f64) -> Result<Self> {
        let ticker = ticker.into().trim().to_uppercase();
        if ticker.is_empty() {
            return Err(StockError::InvalidHolding {
                ticker,
                reason: "ticker must not be empty".to_string(),
            });
        }
        let quantity = positive(&ticker, "quantity", quantity)?;
        let avg_price = positive(&ticker, "avg_price", avg_price)?;

        Ok(Self {
            ticker,
            quantity,
            avg_price,
            current_price: avg_price,
            stop_loss: None,
            target_price: None,
            days_held: 0,
        })
    }

    pub fn with_current_price(mut self, price: f64) -> Result<Self> {
        self.current_price = positive(&self.ticker, "current_price", price)?;
        Ok(self)
    }

    pub fn with_stop_loss(mut self, stop_loss: f64) -> Result<Self> {
        self.stop_loss = Some(positive(&self.ticker, "stop_loss", stop_loss)?);
        Ok(self)
    }

    pub fn with_target_price(mut self, target: f64) -> Result<Self> {
        self.target_price = Some(positive(&self.ticker, "target_price", target)?);
        Ok(self)
    }

    pub fn with_days_held(mut self, days: u32) -> Self {
        self.days_held = days;
        self
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn avg_price(&self) -> f64 {
        self.avg_price
    }

    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    pub fn stop_loss(&self) -> Option<f64> {
        self.stop_loss
    }

    pub fn target_price(&self) -> Option<f64> {
        self.target_price
    }

    pub fn days_held(&self) -> u32 {
        self.days_held
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.avg_price
    }

    pub fn current_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    pub fn pnl(&self) -> f64 {
        self.current_value() - self.cost_basis()
    }

    /// Profit or loss relative to cost basis, in percent
    pub fn pnl_percent(&self) -> f64 {
        self.pnl() / self.cost_basis() * 100.0
    }

    /// Distance of the current price above the stop loss, in percent
    pub fn stop_loss_distance(&self) -> Option<f64> {
        self.stop_loss
            .map(|stop| (self.current_price - stop) / stop * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pnl() {
        let holding = Holding::new("tcs", 10.0, 100.0)
            .unwrap()
            .with_current_price(126.0)
            .unwrap();

        assert_eq!(holding.ticker(), "TCS");
        assert_eq!(holding.cost_basis(), 1000.0);
        assert_eq!(holding.current_value(), 1260.0);
        assert_eq!(holding.pnl(), 260.0);
        assert!((holding.pnl_percent() - 26.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_loss_distance() {
        let holding = Holding::new("INFY", 1.0, 100.0)
            .unwrap()
            .with_current_price(102.0)
            .unwrap()
            .with_stop_loss(100.0)
            .unwrap();
        let distance = holding.stop_loss_distance().unwrap();
        assert!((distance - 2.0).abs() < 1e-9);
        assert_eq!(Holding::new("INFY", 1.0, 100.0).unwrap().stop_loss_distance(), None);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            Holding::new("TCS", 0.0, 100.0),
            Err(StockError::InvalidHolding { .. })
        ));
        assert!(Holding::new("TCS", 1.0, -5.0).is_err());
        assert!(Holding::new("  ", 1.0, 5.0).is_err());
        assert!(Holding::new("TCS", f64::NAN, 5.0).is_err());
        assert!(Holding::new("TCS", 1.0, 5.0).unwrap().with_stop_loss(0.0).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let holding: Holding = serde_json::from_str(
            r#"{"ticker": "wipro", "quantity": 5, "avg_price": 400, "target_price": 480}"#,
        )
        .unwrap();
        assert_eq!(holding.ticker(), "WIPRO");
        assert_eq!(holding.current_price(), 400.0);
        assert_eq!(holding.target_price(), Some(480.0));

        let err = serde_json::from_str::<Holding>(
            r#"{"ticker": "WIPRO", "quantity": -1, "avg_price": 400}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("quantity must be positive"));
    }
}
