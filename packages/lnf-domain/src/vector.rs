/// Scales `vec` to unit length.
///
/// Returns `None` for empty vectors, vectors containing non-finite values, and zero vectors,
/// since none of them can take part in a dot-product comparison.
pub fn l2_normalize(vec: &[f32]) -> Option<Vec<f32>> {
	if vec.is_empty() || vec.iter().any(|value| !value.is_finite()) {
		return None;
	}

	let norm = vec.iter().map(|value| (*value as f64).powi(2)).sum::<f64>().sqrt();

	if norm <= f64::EPSILON {
		return None;
	}

	Some(vec.iter().map(|value| (*value as f64 / norm) as f32).collect())
}

/// Cosine similarity of two unit vectors, clamped into `[0, 1]`.
///
/// Mismatched lengths compare as `0.0`.
pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.is_empty() || a.len() != b.len() {
		return 0.0;
	}

	let dot = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum::<f64>();

	if !dot.is_finite() {
		return 0.0;
	}

	dot.clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_to_unit_length() {
		let vec = l2_normalize(&[3.0, 4.0]).expect("Vector must normalize.");

		assert!((vec[0] - 0.6).abs() < 1e-6);
		assert!((vec[1] - 0.8).abs() < 1e-6);
	}

	#[test]
	fn zero_and_non_finite_vectors_do_not_normalize() {
		assert!(l2_normalize(&[0.0, 0.0, 0.0]).is_none());
		assert!(l2_normalize(&[1.0, f32::NAN]).is_none());
		assert!(l2_normalize(&[]).is_none());
	}

	#[test]
	fn mismatched_lengths_compare_as_zero() {
		assert_eq!(similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
	}
}
