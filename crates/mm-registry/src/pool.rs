//! Pool snapshot: the read-only view discovery hands the core each cycle.

use rust_decimal::Decimal;

/// A point-in-time snapshot of a DLMM pool, as produced by discovery.
///
/// The core never mutates a `PoolSnapshot` — pools are owned by discovery
/// and are read-only here, exactly as the teacher treats `AssetCtx` snapshots
/// coming off the exchange feed.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSnapshot {
    pub address: String,
    pub liquidity: Decimal,
    pub volume_24h: Decimal,
    pub swap_velocity: Decimal,
    pub bin_velocity: Decimal,
    pub fee_intensity: Decimal,
    pub migration_slope: Decimal,
    pub active_bin: i64,
    pub fee_rate: Decimal,
    pub bin_step: u32,
    pub price_velocity: Decimal,
    pub observed_at_ms: i64,
}

impl PoolSnapshot {
    /// `bin_stability` per the Opportunity Density Detector's derived input.
    pub fn bin_stability(&self) -> f64 {
        let slope_term = 0.6 * (1.0 - (self.migration_slope.abs().to_string().parse::<f64>().unwrap_or(0.0) / 0.15));
        let velocity_term = 0.4 * (1.0 - (self.bin_velocity.abs().to_string().parse::<f64>().unwrap_or(0.0) / 0.02));
        (slope_term + velocity_term).clamp(0.0, 1.0)
    }

    /// `churn_quality` per the Opportunity Density Detector's derived input.
    pub fn churn_quality(&self) -> f64 {
        let swap = self.swap_velocity.abs().to_string().parse::<f64>().unwrap_or(0.0);
        let price = self.price_velocity.abs().to_string().parse::<f64>().unwrap_or(0.0);
        (swap / price.max(1e-4)).min(50.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> PoolSnapshot {
        PoolSnapshot {
            address: "pool1".to_string(),
            liquidity: dec!(100000),
            volume_24h: dec!(50000),
            swap_velocity: dec!(0.02),
            bin_velocity: dec!(0.01),
            fee_intensity: dec!(0.05),
            migration_slope: dec!(0.05),
            active_bin: 100,
            fee_rate: dec!(0.003),
            bin_step: 10,
            price_velocity: dec!(0.01),
            observed_at_ms: 1_000,
        }
    }

    #[test]
    fn bin_stability_is_clamped_and_weighted() {
        let s = snapshot();
        let stability = s.bin_stability();
        assert!(stability > 0.0 && stability <= 1.0);
    }

    #[test]
    fn churn_quality_caps_at_fifty() {
        let mut s = snapshot();
        s.swap_velocity = dec!(10);
        s.price_velocity = dec!(0.0001);
        assert_eq!(s.churn_quality(), 50.0);
    }
}
