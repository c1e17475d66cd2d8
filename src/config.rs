use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{AccountId, TradingPair, MAX_ORDER_AMOUNT};

/// Settings for one order book instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub pair: TradingPair,
    /// Ledger account that holds every resting order's offered asset.
    pub custody: AccountId,
    #[serde(default = "default_max_order_amount")]
    pub max_order_amount: u128,
}

fn default_max_order_amount() -> u128 {
    MAX_ORDER_AMOUNT
}

impl EngineConfig {
    pub fn new(pair: TradingPair, custody: AccountId) -> Self {
        Self {
            pair,
            custody,
            max_order_amount: MAX_ORDER_AMOUNT,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pair.base.symbol().is_empty() || self.pair.quote.symbol().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.pair.base == self.pair.quote {
            return Err(ConfigError::SamePair(self.pair.base.to_string()));
        }
        if self.max_order_amount == 0 || self.max_order_amount > MAX_ORDER_AMOUNT {
            return Err(ConfigError::MaxOrderAmount {
                value: self.max_order_amount,
                max: MAX_ORDER_AMOUNT,
            });
        }
        Ok(())
    }
}
