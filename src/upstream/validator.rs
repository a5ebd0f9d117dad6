//! Upstream payload validation and transformation
//!
//! Two layers: the payload as a whole must be a JSON array (anything else is
//! a terminal structural error), then each entry must carry an identity, a
//! provider identity, and at least one usable price point. Entries that fail
//! the per-entry check are dropped with a warning; the batch always succeeds
//! with whatever valid subset remains.

use crate::errors::{GatewayError, GatewayResult};
use crate::models::PlanRecord;
use serde_json::Value;
use tracing::{debug, warn};

/// Structural validation: the payload must be a list
pub fn validate(raw: &Value) -> GatewayResult<&Vec<Value>> {
	raw.as_array().ok_or_else(|| GatewayError::DataValidation {
		reason: format!("expected a JSON array of plans, got {}", value_kind(raw)),
	})
}

/// Transform a raw payload into normalized records, dropping bad entries
pub fn transform(raw: &Value) -> GatewayResult<Vec<PlanRecord>> {
	let entries = validate(raw)?;

	let mut records = Vec::with_capacity(entries.len());
	let mut dropped = 0usize;

	for entry in entries {
		match transform_entry(entry) {
			Some(record) => records.push(record),
			None => {
				dropped += 1;
				warn!(
					"Dropping malformed plan entry (id: {})",
					entry_id(entry).unwrap_or("<missing>")
				);
			},
		}
	}

	debug!(
		"Transformed {} of {} upstream plan entries ({} dropped)",
		records.len(),
		entries.len(),
		dropped
	);

	Ok(records)
}

/// Map one raw entry; `None` drops it without failing the batch
fn transform_entry(entry: &Value) -> Option<PlanRecord> {
	let obj = entry.as_object()?;

	let plan_id = non_empty_string(obj.get("plan_id").or_else(|| obj.get("id")))?;
	let provider_id = non_empty_string(obj.get("provider_id"))?;
	let provider_name =
		non_empty_string(obj.get("provider_name")).unwrap_or_else(|| provider_id.clone());
	let plan_name = non_empty_string(obj.get("plan_name")).unwrap_or_else(|| plan_id.clone());

	let record = PlanRecord {
		plan_id,
		provider_id,
		provider_name,
		plan_name,
		rate_500_kwh: round_rate(numeric(obj.get("price_kwh500"))),
		rate_1000_kwh: round_rate(numeric(obj.get("price_kwh1000"))),
		rate_2000_kwh: round_rate(numeric(obj.get("price_kwh2000"))),
		term_months: numeric(obj.get("term_value")).max(0.0) as u32,
		early_termination_fee: round_rate(numeric(obj.get("cancel_fee")).max(0.0)),
		auto_renewal: boolean(obj.get("auto_renewal")),
		renewable_pct: clamp_pct(numeric(obj.get("renewable_energy_pct"))),
		deposit_required: boolean(obj.get("deposit_required")),
		time_of_use: boolean(obj.get("time_of_use")),
	};
	if !record.has_usable_rate() {
		return None;
	}

	Some(record)
}

/// Defensive numeric read: numbers, numeric strings, everything else zero
fn numeric(value: Option<&Value>) -> f64 {
	match value {
		Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()).unwrap_or(0.0),
		Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0),
		_ => 0.0,
	}
}

fn boolean(value: Option<&Value>) -> bool {
	match value {
		Some(Value::Bool(b)) => *b,
		Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
		Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
		_ => false,
	}
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
	let s = value?.as_str()?.trim();
	if s.is_empty() {
		None
	} else {
		Some(s.to_string())
	}
}

fn clamp_pct(value: f64) -> f64 {
	value.clamp(0.0, 100.0)
}

/// Monetary rates are carried to two decimal places
fn round_rate(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}

fn entry_id(entry: &Value) -> Option<&str> {
	entry
		.get("plan_id")
		.or_else(|| entry.get("id"))
		.and_then(|v| v.as_str())
}

fn value_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}
