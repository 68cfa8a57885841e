//! Order status vocabularies.
//!
//! Two status vocabularies coexist in the system. [`OrderStatus`] is the
//! purchase-order lifecycle and the only one with a transition table.
//! [`ReceptionStatus`] is the procurement/reception vocabulary; it shares a few
//! near-synonymous labels with the order lifecycle but follows different rules,
//! so no conversion between the two is provided.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Static display metadata attached to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMeta {
	/// Human readable label.
	pub label: &'static str,
	/// Icon identifier understood by the presentation layer.
	pub icon: &'static str,
	/// Color class applied to badges and filters.
	pub color: &'static str,
}

/// Error returned when a raw value is not part of a status vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// Stage of a purchase order's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Order is being prepared and has not been sent to the supplier.
	Draft,
	/// Order has been sent to the supplier.
	Placed,
	/// Part of the ordered goods has arrived.
	PartiallyDelivered,
	/// All ordered goods have arrived.
	Delivered,
	/// Delivery has been checked and accepted.
	Validated,
	/// Order was abandoned. Terminal.
	Cancelled,
}

impl OrderStatus {
	/// Wire representation used by the remote order API.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Draft => "DRAFT",
			OrderStatus::Placed => "PLACED",
			OrderStatus::PartiallyDelivered => "PARTIALLY_DELIVERED",
			OrderStatus::Delivered => "DELIVERED",
			OrderStatus::Validated => "VALIDATED",
			OrderStatus::Cancelled => "CANCELLED",
		}
	}

	/// Returns the lifecycle in order.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Draft,
			Self::Placed,
			Self::PartiallyDelivered,
			Self::Delivered,
			Self::Validated,
			Self::Cancelled,
		]
		.into_iter()
	}

	/// Display metadata for this status.
	pub fn meta(&self) -> StatusMeta {
		match self {
			OrderStatus::Draft => StatusMeta {
				label: "Draft",
				icon: "file-pen",
				color: "bg-gray-100 text-gray-800",
			},
			OrderStatus::Placed => StatusMeta {
				label: "Placed",
				icon: "send",
				color: "bg-blue-100 text-blue-800",
			},
			OrderStatus::PartiallyDelivered => StatusMeta {
				label: "Partially delivered",
				icon: "truck",
				color: "bg-amber-100 text-amber-800",
			},
			OrderStatus::Delivered => StatusMeta {
				label: "Delivered",
				icon: "package-check",
				color: "bg-green-100 text-green-800",
			},
			OrderStatus::Validated => StatusMeta {
				label: "Validated",
				icon: "badge-check",
				color: "bg-emerald-100 text-emerald-800",
			},
			OrderStatus::Cancelled => StatusMeta {
				label: "Cancelled",
				icon: "circle-x",
				color: "bg-red-100 text-red-800",
			},
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl AsRef<str> for OrderStatus {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}

impl FromStr for OrderStatus {
	type Err = UnknownStatus;

	/// Parses a wire value. Matching ignores case and surrounding whitespace.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim();
		Self::all()
			.find(|status| status.as_str().eq_ignore_ascii_case(normalized))
			.ok_or_else(|| UnknownStatus(s.to_string()))
	}
}

/// Status of a procurement reception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceptionStatus {
	#[serde(rename = "EN_ATTENTE")]
	Pending,
	#[serde(rename = "EN_COURS")]
	InProgress,
	#[serde(rename = "CONFIRMEE")]
	Confirmed,
	#[serde(rename = "PARTIELLEMENT_RECUE")]
	PartiallyReceived,
	#[serde(rename = "RECUE")]
	Received,
	#[serde(rename = "VALIDEE")]
	Validated,
	#[serde(rename = "ANNULEE")]
	Cancelled,
}

impl ReceptionStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			ReceptionStatus::Pending => "EN_ATTENTE",
			ReceptionStatus::InProgress => "EN_COURS",
			ReceptionStatus::Confirmed => "CONFIRMEE",
			ReceptionStatus::PartiallyReceived => "PARTIELLEMENT_RECUE",
			ReceptionStatus::Received => "RECUE",
			ReceptionStatus::Validated => "VALIDEE",
			ReceptionStatus::Cancelled => "ANNULEE",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Pending,
			Self::InProgress,
			Self::Confirmed,
			Self::PartiallyReceived,
			Self::Received,
			Self::Validated,
			Self::Cancelled,
		]
		.into_iter()
	}

	pub fn meta(&self) -> StatusMeta {
		match self {
			ReceptionStatus::Pending => StatusMeta {
				label: "Awaiting",
				icon: "hourglass",
				color: "bg-yellow-100 text-yellow-800",
			},
			ReceptionStatus::InProgress => StatusMeta {
				label: "In progress",
				icon: "loader",
				color: "bg-sky-100 text-sky-800",
			},
			ReceptionStatus::Confirmed => StatusMeta {
				label: "Confirmed",
				icon: "check",
				color: "bg-indigo-100 text-indigo-800",
			},
			ReceptionStatus::PartiallyReceived => StatusMeta {
				label: "Partially received",
				icon: "truck",
				color: "bg-orange-100 text-orange-800",
			},
			ReceptionStatus::Received => StatusMeta {
				label: "Received",
				icon: "package-check",
				color: "bg-green-100 text-green-800",
			},
			ReceptionStatus::Validated => StatusMeta {
				label: "Checked",
				icon: "badge-check",
				color: "bg-teal-100 text-teal-800",
			},
			ReceptionStatus::Cancelled => StatusMeta {
				label: "Cancelled",
				icon: "circle-x",
				color: "bg-red-100 text-red-800",
			},
		}
	}

	/// Metadata for a raw value, falling back to [`ReceptionStatus::Pending`].
	pub fn meta_of(raw: &str) -> StatusMeta {
		raw.parse::<Self>().unwrap_or(Self::Pending).meta()
	}
}

impl fmt::Display for ReceptionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ReceptionStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim();
		Self::all()
			.find(|status| status.as_str().eq_ignore_ascii_case(normalized))
			.ok_or_else(|| UnknownStatus(s.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_order_status_parse_is_case_insensitive() {
		assert_eq!(
			"partially_delivered".parse::<OrderStatus>(),
			Ok(OrderStatus::PartiallyDelivered)
		);
		assert_eq!(" PLACED ".parse::<OrderStatus>(), Ok(OrderStatus::Placed));
		assert!("SHIPPED".parse::<OrderStatus>().is_err());
	}

	#[test]
	fn test_order_status_serde_uses_wire_values() {
		let json = serde_json::to_string(&OrderStatus::PartiallyDelivered).unwrap();
		assert_eq!(json, "\"PARTIALLY_DELIVERED\"");

		let parsed: OrderStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
		assert_eq!(parsed, OrderStatus::Cancelled);
	}

	#[test]
	fn test_reception_vocabulary_is_distinct() {
		// Wire values of one vocabulary are never accepted by the other.
		assert!("EN_ATTENTE".parse::<OrderStatus>().is_err());
		assert!("VALIDATED".parse::<ReceptionStatus>().is_err());
		assert_eq!(
			"en_cours".parse::<ReceptionStatus>(),
			Ok(ReceptionStatus::InProgress)
		);
	}

	#[test]
	fn test_reception_meta_falls_back_to_pending() {
		assert_eq!(
			ReceptionStatus::meta_of("NOT_A_STATUS"),
			ReceptionStatus::Pending.meta()
		);
		assert_eq!(
			ReceptionStatus::meta_of("RECUE").label,
			ReceptionStatus::Received.meta().label
		);
	}

	#[test]
	fn test_every_status_has_distinct_label() {
		let labels: std::collections::HashSet<_> =
			OrderStatus::all().map(|s| s.meta().label).collect();
		assert_eq!(labels.len(), OrderStatus::all().count());
	}
}
