//! Constructor specificity.
//!
//! `a` dominates `b` when every argument signature of `b` appears in `a` and
//! `a` takes strictly more arguments. Dominance is a strict partial order, so
//! the survivors are exactly its maximal elements. Computing them directly
//! makes the result independent of the order constructors were declared in.

use crate::types::ConstructorDef;

/// Indices of the constructors in `defs` that no other constructor in `defs` dominates.
///
/// Indices are returned in ascending order. An empty input yields an empty result.
pub fn dominant_constructors(defs: &[&ConstructorDef]) -> Vec<usize> {
	(0..defs.len())
		.filter(|&i| {
			!defs
				.iter()
				.enumerate()
				.any(|(j, other)| j != i && other.is_more_specific_than(defs[i]))
		})
		.collect()
}
