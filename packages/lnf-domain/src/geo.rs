use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6_371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
	pub latitude: f64,
	pub longitude: f64,
}
impl Coordinates {
	/// Returns `None` unless both values are finite and inside the WGS84 ranges.
	pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
		let valid = latitude.is_finite()
			&& longitude.is_finite()
			&& (-90.0..=90.0).contains(&latitude)
			&& (-180.0..=180.0).contains(&longitude);

		valid.then_some(Self { latitude, longitude })
	}

	/// Pairs two nullable columns; a half-filled pair counts as no coordinates at all.
	pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
		match (latitude, longitude) {
			(Some(latitude), Some(longitude)) => Self::new(latitude, longitude),
			_ => None,
		}
	}
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
	let lat1 = a.latitude.to_radians();
	let lat2 = b.latitude.to_radians();
	let delta_lat = (b.latitude - a.latitude).to_radians();
	let delta_lon = (b.longitude - a.longitude).to_radians();
	let h = (delta_lat / 2.0).sin().powi(2)
		+ lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
	let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

	EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_out_of_range_coordinates() {
		assert!(Coordinates::new(91.0, 0.0).is_none());
		assert!(Coordinates::new(0.0, -180.5).is_none());
		assert!(Coordinates::new(f64::NAN, 0.0).is_none());
		assert!(Coordinates::new(25.2, 55.3).is_some());
	}

	#[test]
	fn half_filled_pair_is_absent() {
		assert!(Coordinates::from_parts(Some(25.2), None).is_none());
		assert!(Coordinates::from_parts(None, Some(55.3)).is_none());
		assert!(Coordinates::from_parts(Some(25.2), Some(55.3)).is_some());
	}
}
