//! Normalized plan pricing record
//!
//! The unit of data returned to callers. Records are constructed only by the
//! response validator; a record that exists has passed every required-field
//! check.

use serde::{Deserialize, Serialize};

/// One retail electricity plan with its price points and contract attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
	/// Upstream plan identifier
	pub plan_id: String,
	/// Provider identifier
	pub provider_id: String,
	/// Provider display name
	pub provider_name: String,
	/// Plan display name
	pub plan_name: String,
	/// Average rate at 500 kWh usage, in cents per kWh
	pub rate_500_kwh: f64,
	/// Average rate at 1000 kWh usage, in cents per kWh
	pub rate_1000_kwh: f64,
	/// Average rate at 2000 kWh usage, in cents per kWh
	pub rate_2000_kwh: f64,
	/// Contract term length in months (0 = month-to-month)
	pub term_months: u32,
	/// Early termination fee in dollars
	pub early_termination_fee: f64,
	/// Whether the contract renews automatically at term end
	pub auto_renewal: bool,
	/// Renewable-energy percentage, clamped to [0, 100]
	pub renewable_pct: f64,
	/// Whether the provider requires a deposit
	pub deposit_required: bool,
	/// Whether pricing varies by time-of-use window
	pub time_of_use: bool,
}

impl PlanRecord {
	/// Whether at least one price point carries a usable (positive) rate
	pub fn has_usable_rate(&self) -> bool {
		self.rate_500_kwh > 0.0 || self.rate_1000_kwh > 0.0 || self.rate_2000_kwh > 0.0
	}
}
