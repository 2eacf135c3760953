//! Structural equality for JSON records.
//!
//! Semantics:
//! - object key order never matters
//! - an absent key is not equal to a key holding `null`
//! - arrays compare element-wise, in order
//! - numbers compare by value, so `1` equals `1.0`

use serde_json::{Map, Number, Value};

/// Returns true when `a` and `b` are value-equal at every depth.
pub fn structural_eq(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Null, Value::Null) => true,
		(Value::Bool(lhs), Value::Bool(rhs)) => lhs == rhs,
		(Value::Number(lhs), Value::Number(rhs)) => number_eq(lhs, rhs),
		(Value::String(lhs), Value::String(rhs)) => lhs == rhs,
		(Value::Array(lhs), Value::Array(rhs)) => lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(l, r)| structural_eq(l, r)),
		(Value::Object(lhs), Value::Object(rhs)) => object_eq(lhs, rhs, &[]),
		_ => false,
	}
}

/// Like [`structural_eq`], but skips the named top-level fields of objects.
///
/// Used to keep volatile fields such as `updated_at` from marking a record as
/// changed. Nested objects are compared in full.
pub fn structural_eq_ignoring(a: &Value, b: &Value, ignored: &[&str]) -> bool {
	match (a, b) {
		(Value::Object(lhs), Value::Object(rhs)) => object_eq(lhs, rhs, ignored),
		_ => structural_eq(a, b),
	}
}

fn object_eq(lhs: &Map<String, Value>, rhs: &Map<String, Value>, ignored: &[&str]) -> bool {
	let relevant = |key: &str| !ignored.contains(&key);

	if lhs.keys().filter(|k| relevant(k.as_str())).count() != rhs.keys().filter(|k| relevant(k.as_str())).count() {
		return false;
	}

	lhs.iter()
		.filter(|(key, _)| relevant(key.as_str()))
		.all(|(key, value)| rhs.get(key).is_some_and(|other| structural_eq(value, other)))
}

fn number_eq(lhs: &Number, rhs: &Number) -> bool {
	if let (Some(l), Some(r)) = (lhs.as_i64(), rhs.as_i64()) {
		return l == r;
	}
	if let (Some(l), Some(r)) = (lhs.as_u64(), rhs.as_u64()) {
		return l == r;
	}
	match (lhs.as_f64(), rhs.as_f64()) {
		(Some(l), Some(r)) => l == r,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serde_json::json;

	use super::*;

	#[rstest]
	#[case(json!(null), json!(null), true)]
	#[case(json!({"a": 1, "b": 2}), json!({"b": 2, "a": 1}), true)]
	#[case(json!({"a": 1}), json!({"a": 1, "b": null}), false)]
	#[case(json!({"a": null}), json!({"a": null}), true)]
	#[case(json!({"a": null}), json!({}), false)]
	#[case(json!([1, 2, 3]), json!([1, 2, 3]), true)]
	#[case(json!([1, 2, 3]), json!([3, 2, 1]), false)]
	#[case(json!([1, 2]), json!([1, 2, 3]), false)]
	#[case(json!(1), json!(1.0), true)]
	#[case(json!(-4), json!(-4), true)]
	#[case(json!(u64::MAX), json!(u64::MAX), true)]
	#[case(json!(1), json!("1"), false)]
	#[case(json!(0), json!(false), false)]
	#[case(json!({"van": {"tags": ["a", {"x": 1}]}}), json!({"van": {"tags": ["a", {"x": 1}]}}), true)]
	#[case(json!({"van": {"tags": ["a", {"x": 1}]}}), json!({"van": {"tags": ["a", {"x": 2}]}}), false)]
	fn structural_equality_table(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
		assert_eq!(structural_eq(&a, &b), expected, "{a} vs {b}");
		assert_eq!(structural_eq(&b, &a), expected, "symmetry: {b} vs {a}");
	}

	#[test]
	fn ignoring_skips_volatile_top_level_fields() {
		let a = json!({"id": 1, "status": "active", "updated_at": "2024-01-01T00:00:00Z"});
		let b = json!({"id": 1, "status": "active", "updated_at": "2024-06-01T00:00:00Z"});
		assert!(!structural_eq(&a, &b));
		assert!(structural_eq_ignoring(&a, &b, &["updated_at"]));
	}

	#[test]
	fn ignoring_tolerates_field_present_on_one_side() {
		let a = json!({"id": 1, "updated_at": "2024-01-01T00:00:00Z"});
		let b = json!({"id": 1});
		assert!(structural_eq_ignoring(&a, &b, &["updated_at"]));
	}

	#[test]
	fn ignoring_still_compares_other_fields() {
		let a = json!({"id": 1, "status": "active", "updated_at": 1});
		let b = json!({"id": 1, "status": "completed", "updated_at": 2});
		assert!(!structural_eq_ignoring(&a, &b, &["updated_at"]));
	}
}
