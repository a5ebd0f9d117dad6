//! Normalized lookup key for plan pricing queries
//!
//! Two semantically-equal queries must produce the same key regardless of
//! parameter order or casing, so every cache tier hits consistently.

use crate::errors::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default usage display level when the caller does not specify one
pub const DEFAULT_USAGE_KWH: u32 = 1000;

/// Immutable, normalized identifier for one query's cache/fetch coordinates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupKey {
	territory: String,
	usage_kwh: u32,
	term_months: Option<u32>,
	min_renewable_pct: Option<u8>,
	prepaid_only: bool,
	time_of_use_only: bool,
}

impl LookupKey {
	/// Create a key for a utility territory at a usage display level
	///
	/// The territory code is trimmed and lowercased so casing differences
	/// between callers collapse to one key.
	pub fn new(territory: &str, usage_kwh: u32) -> GatewayResult<Self> {
		let territory = territory.trim().to_lowercase();
		if territory.is_empty() {
			return Err(GatewayError::InvalidParameters {
				reason: "territory must not be empty".to_string(),
			});
		}

		Ok(Self {
			territory,
			usage_kwh: if usage_kwh == 0 {
				DEFAULT_USAGE_KWH
			} else {
				usage_kwh
			},
			term_months: None,
			min_renewable_pct: None,
			prepaid_only: false,
			time_of_use_only: false,
		})
	}

	/// Filter on contract term length in months
	pub fn with_term_months(mut self, months: u32) -> Self {
		self.term_months = Some(months);
		self
	}

	/// Filter on minimum renewable-energy percentage, clamped to 100
	pub fn with_min_renewable_pct(mut self, pct: u8) -> Self {
		self.min_renewable_pct = Some(pct.min(100));
		self
	}

	/// Restrict to prepaid plans
	pub fn prepaid_only(mut self) -> Self {
		self.prepaid_only = true;
		self
	}

	/// Restrict to time-of-use plans
	pub fn time_of_use_only(mut self) -> Self {
		self.time_of_use_only = true;
		self
	}

	/// Build a key from loosely-typed caller parameters
	///
	/// Parameter names are matched case-insensitively and values are
	/// type-normalized, so `{"Territory": "ONCOR"}` and
	/// `{"territory": "oncor"}` produce identical keys.
	pub fn from_params(params: &HashMap<String, String>) -> GatewayResult<Self> {
		let lookup = |name: &str| -> Option<&str> {
			params
				.iter()
				.find(|(k, _)| k.eq_ignore_ascii_case(name))
				.map(|(_, v)| v.as_str())
		};

		let territory = lookup("territory").ok_or_else(|| GatewayError::InvalidParameters {
			reason: "missing required parameter: territory".to_string(),
		})?;

		let usage_kwh = match lookup("usage") {
			Some(raw) => raw
				.trim()
				.parse::<u32>()
				.map_err(|_| GatewayError::InvalidParameters {
					reason: format!("usage must be a positive integer, got '{}'", raw),
				})?,
			None => DEFAULT_USAGE_KWH,
		};

		let mut key = Self::new(territory, usage_kwh)?;

		if let Some(raw) = lookup("term") {
			let months = raw
				.trim()
				.parse::<u32>()
				.map_err(|_| GatewayError::InvalidParameters {
					reason: format!("term must be a number of months, got '{}'", raw),
				})?;
			key = key.with_term_months(months);
		}

		if let Some(raw) = lookup("renewable") {
			let pct = raw
				.trim()
				.parse::<u8>()
				.map_err(|_| GatewayError::InvalidParameters {
					reason: format!("renewable must be a percentage, got '{}'", raw),
				})?;
			key = key.with_min_renewable_pct(pct);
		}

		if parse_flag(lookup("prepaid")) {
			key = key.prepaid_only();
		}
		if parse_flag(lookup("time_of_use")) {
			key = key.time_of_use_only();
		}

		Ok(key)
	}

	pub fn territory(&self) -> &str {
		&self.territory
	}

	pub fn usage_kwh(&self) -> u32 {
		self.usage_kwh
	}

	pub fn term_months(&self) -> Option<u32> {
		self.term_months
	}

	pub fn min_renewable_pct(&self) -> Option<u8> {
		self.min_renewable_pct
	}

	/// Canonical cache key string, identical for semantically-equal queries
	pub fn cache_key(&self) -> String {
		let mut key = format!("plans:{}:u{}", self.territory, self.usage_kwh);
		if let Some(term) = self.term_months {
			key.push_str(&format!(":t{}", term));
		}
		if let Some(pct) = self.min_renewable_pct {
			key.push_str(&format!(":g{}", pct));
		}
		if self.prepaid_only {
			key.push_str(":pp");
		}
		if self.time_of_use_only {
			key.push_str(":tou");
		}
		key
	}

	/// Query parameters for the upstream HTTP call, in a fixed order
	pub fn query_params(&self) -> Vec<(String, String)> {
		let mut params = vec![
			("territory".to_string(), self.territory.clone()),
			("usage".to_string(), self.usage_kwh.to_string()),
		];
		if let Some(term) = self.term_months {
			params.push(("term".to_string(), term.to_string()));
		}
		if let Some(pct) = self.min_renewable_pct {
			params.push(("renewable".to_string(), pct.to_string()));
		}
		if self.prepaid_only {
			params.push(("prepaid".to_string(), "true".to_string()));
		}
		if self.time_of_use_only {
			params.push(("time_of_use".to_string(), "true".to_string()));
		}
		params
	}
}

fn parse_flag(raw: Option<&str>) -> bool {
	matches!(
		raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
		Some("true") | Some("1") | Some("yes")
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn territory_is_normalized() {
		let a = LookupKey::new("  ONCOR ", 1000).unwrap();
		let b = LookupKey::new("oncor", 1000).unwrap();
		assert_eq!(a, b);
		assert_eq!(a.cache_key(), b.cache_key());
	}

	#[test]
	fn empty_territory_rejected() {
		let err = LookupKey::new("   ", 1000).unwrap_err();
		assert!(matches!(err, GatewayError::InvalidParameters { .. }));
	}

	#[test]
	fn zero_usage_falls_back_to_default() {
		let key = LookupKey::new("oncor", 0).unwrap();
		assert_eq!(key.usage_kwh(), DEFAULT_USAGE_KWH);
	}

	#[test]
	fn param_order_and_casing_do_not_matter() {
		let mut first = HashMap::new();
		first.insert("Territory".to_string(), "CENTERPOINT".to_string());
		first.insert("usage".to_string(), "2000".to_string());
		first.insert("term".to_string(), "12".to_string());

		let mut second = HashMap::new();
		second.insert("term".to_string(), "12".to_string());
		second.insert("TERRITORY".to_string(), "centerpoint".to_string());
		second.insert("Usage".to_string(), "2000".to_string());

		let a = LookupKey::from_params(&first).unwrap();
		let b = LookupKey::from_params(&second).unwrap();
		assert_eq!(a, b);
		assert_eq!(a.cache_key(), b.cache_key());
	}

	#[test]
	fn from_params_rejects_garbage_numbers() {
		let mut params = HashMap::new();
		params.insert("territory".to_string(), "oncor".to_string());
		params.insert("usage".to_string(), "lots".to_string());

		let err = LookupKey::from_params(&params).unwrap_err();
		assert!(matches!(err, GatewayError::InvalidParameters { .. }));
	}

	#[test]
	fn cache_key_encodes_all_filters() {
		let key = LookupKey::new("oncor", 1000)
			.unwrap()
			.with_term_months(12)
			.with_min_renewable_pct(100)
			.prepaid_only()
			.time_of_use_only();
		assert_eq!(key.cache_key(), "plans:oncor:u1000:t12:g100:pp:tou");
	}

	#[test]
	fn renewable_pct_is_clamped() {
		let key = LookupKey::new("oncor", 1000)
			.unwrap()
			.with_min_renewable_pct(250);
		assert_eq!(key.min_renewable_pct(), Some(100));
	}

	#[test]
	fn query_params_have_fixed_order() {
		let key = LookupKey::new("oncor", 500).unwrap().with_term_months(24);
		let params = key.query_params();
		assert_eq!(params[0].0, "territory");
		assert_eq!(params[1], ("usage".to_string(), "500".to_string()));
		assert_eq!(params[2], ("term".to_string(), "24".to_string()));
	}
}
