use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::geo::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseEnumError {
	pub kind: &'static str,
}
impl fmt::Display for ParseEnumError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unrecognized {} value.", self.kind)
	}
}

impl std::error::Error for ParseEnumError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
	Lost,
	Found,
}
impl ItemType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Lost => "LOST",
			Self::Found => "FOUND",
		}
	}

	/// Items of this type are only ever matched against items of the returned type.
	pub fn opposite(self) -> Self {
		match self {
			Self::Lost => Self::Found,
			Self::Found => Self::Lost,
		}
	}
}
impl FromStr for ItemType {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"LOST" => Ok(Self::Lost),
			"FOUND" => Ok(Self::Found),
			_ => Err(ParseEnumError { kind: "item type" }),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
	Open,
	Matched,
	Claimed,
	Closed,
}
impl ItemStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Open => "OPEN",
			Self::Matched => "MATCHED",
			Self::Claimed => "CLAIMED",
			Self::Closed => "CLOSED",
		}
	}
}
impl FromStr for ItemStatus {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"OPEN" => Ok(Self::Open),
			"MATCHED" => Ok(Self::Matched),
			"CLAIMED" => Ok(Self::Claimed),
			"CLOSED" => Ok(Self::Closed),
			_ => Err(ParseEnumError { kind: "item status" }),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
	Phone,
	Wallet,
	Bag,
	Id,
	Jewelry,
	Electronics,
	Keys,
	Documents,
	Clothing,
	Accessories,
	Other,
}
impl Category {
	pub const ALL: [Self; 11] = [
		Self::Phone,
		Self::Wallet,
		Self::Bag,
		Self::Id,
		Self::Jewelry,
		Self::Electronics,
		Self::Keys,
		Self::Documents,
		Self::Clothing,
		Self::Accessories,
		Self::Other,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Phone => "phone",
			Self::Wallet => "wallet",
			Self::Bag => "bag",
			Self::Id => "id",
			Self::Jewelry => "jewelry",
			Self::Electronics => "electronics",
			Self::Keys => "keys",
			Self::Documents => "documents",
			Self::Clothing => "clothing",
			Self::Accessories => "accessories",
			Self::Other => "other",
		}
	}
}
impl FromStr for Category {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lowered = s.trim().to_ascii_lowercase();

		Self::ALL
			.into_iter()
			.find(|category| category.as_str() == lowered)
			.ok_or(ParseEnumError { kind: "category" })
	}
}
impl fmt::Display for Category {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchConfidence {
	High,
	Medium,
	Low,
}
impl MatchConfidence {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::High => "HIGH",
			Self::Medium => "MEDIUM",
			Self::Low => "LOW",
		}
	}
}
impl FromStr for MatchConfidence {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"HIGH" => Ok(Self::High),
			"MEDIUM" => Ok(Self::Medium),
			"LOW" => Ok(Self::Low),
			_ => Err(ParseEnumError { kind: "match confidence" }),
		}
	}
}

/// Matches are created as `Pending`; every later transition belongs to the confirmation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
	Pending,
	Contacted,
	Claimed,
	Rejected,
	Expired,
}
impl MatchStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "PENDING",
			Self::Contacted => "CONTACTED",
			Self::Claimed => "CLAIMED",
			Self::Rejected => "REJECTED",
			Self::Expired => "EXPIRED",
		}
	}
}
impl FromStr for MatchStatus {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"PENDING" => Ok(Self::Pending),
			"CONTACTED" => Ok(Self::Contacted),
			"CLAIMED" => Ok(Self::Claimed),
			"REJECTED" => Ok(Self::Rejected),
			"EXPIRED" => Ok(Self::Expired),
			_ => Err(ParseEnumError { kind: "match status" }),
		}
	}
}

/// The metadata the matcher compares between two items.
///
/// Built once per item from its stored row and never mutated afterwards, so every scoring
/// component reads the same snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
	pub item_id: Uuid,
	pub item_type: ItemType,
	pub category: Category,
	pub title: String,
	pub brand: Option<String>,
	pub color: Option<String>,
	pub location_name: String,
	pub coordinates: Option<Coordinates>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub occurred_at: Option<OffsetDateTime>,
}
