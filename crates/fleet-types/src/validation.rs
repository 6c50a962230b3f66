//! Validation of implementation-specific configuration tables.
//!
//! Storage and backend implementations receive their settings as raw TOML
//! tables. Each implementation describes the fields it understands with a
//! [`Schema`] and checks the table before building itself.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field has a value outside its allowed range.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong TOML type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Type of a configuration field.
#[derive(Debug, Clone)]
pub enum FieldType {
	String,
	/// An integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
}

impl FieldType {
	fn name(&self) -> &'static str {
		match self {
			FieldType::String => "string",
			FieldType::Integer { .. } => "integer",
			FieldType::Boolean => "boolean",
		}
	}
}

/// A named field of a schema.
#[derive(Debug, Clone)]
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
		}
	}
}

/// Required and optional fields of a configuration table.
///
/// Keys that are not declared are ignored.
#[derive(Debug, Clone, Default)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// # Errors
	///
	/// Returns an error if the value is not a table, a required field is
	/// missing, or a present field has the wrong type or is out of bounds.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			check_field(field, value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				check_field(field, value)?;
			}
		}

		Ok(())
	}
}

fn check_field(field: &Field, value: &toml::Value) -> Result<(), ValidationError> {
	let mismatch = || ValidationError::TypeMismatch {
		field: field.name.clone(),
		expected: field.field_type.name().to_string(),
		actual: value.type_str().to_string(),
	};

	match &field.field_type {
		FieldType::String => {
			value.as_str().ok_or_else(mismatch)?;
		},
		FieldType::Boolean => {
			value.as_bool().ok_or_else(mismatch)?;
		},
		FieldType::Integer { min, max } => {
			let int_val = value.as_integer().ok_or_else(mismatch)?;
			if let Some(min_val) = min.filter(|min_val| int_val < *min_val) {
				return Err(ValidationError::InvalidValue {
					field: field.name.clone(),
					message: format!("Value {} is less than minimum {}", int_val, min_val),
				});
			}
			if let Some(max_val) = max.filter(|max_val| int_val > *max_val) {
				return Err(ValidationError::InvalidValue {
					field: field.name.clone(),
					message: format!("Value {} is greater than maximum {}", int_val, max_val),
				});
			}
		},
	}
	Ok(())
}

/// Implemented by anything that can validate its own configuration table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("storage_path", FieldType::String)],
			vec![Field::new(
				"latency_ms",
				FieldType::Integer {
					min: Some(0),
					max: Some(60_000),
				},
			)],
		)
	}

	#[test]
	fn test_valid_table() {
		let config: toml::Value = toml::from_str(
			r#"
storage_path = "./data"
latency_ms = 25
"#,
		)
		.unwrap();
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let config: toml::Value = toml::from_str("latency_ms = 25").unwrap();
		let err = schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "storage_path"));
	}

	#[test]
	fn test_type_and_bounds() {
		let config: toml::Value = toml::from_str("storage_path = 5").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::TypeMismatch { .. })
		));

		let config: toml::Value = toml::from_str(
			r#"
storage_path = "./data"
latency_ms = -1
"#,
		)
		.unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { .. })
		));
	}
}
