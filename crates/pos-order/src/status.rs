//! Order status policy: transition table and display metadata lookups.
//!
//! Every function here is pure and total. Inputs may be typed
//! [`OrderStatus`] values or raw strings coming from remote records; raw
//! values that are not part of the lifecycle resolve to `Draft` metadata and
//! to an empty set of transitions.

use crate::OrderError;
use once_cell::sync::Lazy;
use pos_types::{OrderStatus, StatusMeta};
use std::collections::{BTreeSet, HashMap};

/// Static transition table. `Cancelled` is absorbing.
static TRANSITIONS: Lazy<HashMap<OrderStatus, BTreeSet<OrderStatus>>> = Lazy::new(|| {
	use pos_types::OrderStatus::*;

	HashMap::from([
		(Draft, BTreeSet::from([Placed, Cancelled])),
		(
			Placed,
			BTreeSet::from([PartiallyDelivered, Delivered, Cancelled]),
		),
		(PartiallyDelivered, BTreeSet::from([Delivered, Cancelled])),
		(Delivered, BTreeSet::from([Validated, Cancelled])),
		(Validated, BTreeSet::from([Cancelled])),
		(Cancelled, BTreeSet::new()),
	])
});

fn resolve(status: &str) -> Option<OrderStatus> {
	status.parse().ok()
}

/// Display metadata, falling back to `Draft` for unknown values.
pub fn status_meta(status: impl AsRef<str>) -> StatusMeta {
	resolve(status.as_ref())
		.unwrap_or(OrderStatus::Draft)
		.meta()
}

/// Human readable label, e.g. `Partially delivered`.
pub fn label_of(status: impl AsRef<str>) -> &'static str {
	status_meta(status).label
}

pub fn color_of(status: impl AsRef<str>) -> &'static str {
	status_meta(status).color
}

pub fn icon_of(status: impl AsRef<str>) -> &'static str {
	status_meta(status).icon
}

/// Statuses reachable in one step from `status`.
pub fn available_transitions(status: impl AsRef<str>) -> BTreeSet<OrderStatus> {
	resolve(status.as_ref())
		.and_then(|from| TRANSITIONS.get(&from))
		.cloned()
		.unwrap_or_default()
}

/// Returns true iff `to` is one of [`available_transitions`] of `from`.
pub fn is_valid_transition(from: impl AsRef<str>, to: impl AsRef<str>) -> bool {
	let Some(to) = resolve(to.as_ref()) else {
		return false;
	};
	available_transitions(from).contains(&to)
}

/// Local gate to run before any state-changing request.
pub fn check_transition(from: impl AsRef<str>, to: impl AsRef<str>) -> Result<(), OrderError> {
	let (from, to) = (from.as_ref(), to.as_ref());
	if is_valid_transition(from, to) {
		Ok(())
	} else {
		Err(OrderError::InvalidTransition {
			from: from.to_string(),
			to: to.to_string(),
		})
	}
}
