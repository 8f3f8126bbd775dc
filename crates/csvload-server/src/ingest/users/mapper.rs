// Nested record -> users row mapping

use std::collections::BTreeMap;

use super::models::{NestedRecord, NestedValue, UserRecord};

/// Address parts copied into the `address` column
pub const ADDRESS_FIELDS: [&str; 4] = ["line1", "line2", "city", "state"];

/// Top-level keys consumed by `name`, `age` and `address`
pub const CLAIMED_KEYS: [&str; 3] = ["name", "age", "address"];

/// Reasons a row cannot become a user
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing mandatory field '{0}'")]
    MissingField(&'static str),

    #[error("age '{0}' is not a base-10 integer")]
    InvalidAge(String),
}

/// Validate a nested record and shape it into a `UserRecord`.
///
/// Checks run in order: first name, last name, age. The first failure is returned.
pub fn map_record(record: &NestedRecord) -> Result<UserRecord, ValidationError> {
    let first_name = record
        .scalar_at(&["name", "firstName"])
        .ok_or(ValidationError::MissingField("name.firstName"))?;
    let last_name = record
        .scalar_at(&["name", "lastName"])
        .ok_or(ValidationError::MissingField("name.lastName"))?;

    let raw_age = record
        .scalar_at(&["age"])
        .ok_or(ValidationError::MissingField("age"))?;
    let age = parse_age(raw_age).ok_or_else(|| ValidationError::InvalidAge(raw_age.to_string()))?;

    Ok(UserRecord {
        name: format!("{} {}", first_name, last_name).trim().to_string(),
        age,
        address: map_address(record),
        additional_info: map_additional_info(record),
    })
}

/// Read the leading base-10 integer of `raw`, ignoring whatever follows it.
///
/// `"30"`, `"30.0"` and `"25 years"` all parse. A value with no leading digits
/// after an optional sign, or one outside the `i32` range, does not.
fn parse_age(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits = unsigned.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let value: i64 = unsigned[..digits].parse().ok()?;
    let value = if negative { -value } else { value };
    i32::try_from(value).ok()
}

fn map_address(record: &NestedRecord) -> Option<BTreeMap<String, String>> {
    let address: BTreeMap<String, String> = ADDRESS_FIELDS
        .iter()
        .filter_map(|&field| {
            record
                .scalar_at(&["address", field])
                .map(|value| (field.to_string(), value.to_string()))
        })
        .collect();

    (!address.is_empty()).then_some(address)
}

fn map_additional_info(record: &NestedRecord) -> Option<BTreeMap<String, NestedValue>> {
    let residual: BTreeMap<_, _> = record
        .fields()
        .iter()
        .filter(|(key, _)| !CLAIMED_KEYS.contains(&key.as_str()))
        .filter_map(|(key, value)| value.pruned().map(|v| (key.clone(), v)))
        .collect();

    (!residual.is_empty()).then_some(residual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::users::parser::{build_record, parse_header};

    fn record(headers: &[&str], values: &[&str]) -> NestedRecord {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let values: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        build_record(&parse_header(&headers), &values)
    }

    #[test]
    fn test_maps_documented_example() {
        let nested = record(
            &["name.firstName", "name.lastName", "age", "address.city"],
            &["Ann", "Lee", "30", "Paris"],
        );
        let user = map_record(&nested).unwrap();

        assert_eq!(user.name, "Ann Lee");
        assert_eq!(user.age, 30);
        let address = user.address.unwrap();
        assert_eq!(address.len(), 1);
        assert_eq!(address.get("city").map(String::as_str), Some("Paris"));
        assert_eq!(user.additional_info, None);
    }

    #[test]
    fn test_name_is_trimmed_concatenation() {
        let mut nested = NestedRecord::new();
        let mut name = BTreeMap::new();
        name.insert("firstName".to_string(), NestedValue::Scalar("  Ann ".to_string()));
        name.insert("lastName".to_string(), NestedValue::Scalar(" Lee  ".to_string()));
        nested.fields_mut().insert("name".to_string(), NestedValue::Map(name));
        nested
            .fields_mut()
            .insert("age".to_string(), NestedValue::Scalar(" 41 ".to_string()));

        let user = map_record(&nested).unwrap();
        assert_eq!(user.name, "Ann Lee");
        assert_eq!(user.age, 41);
    }

    #[test]
    fn test_missing_first_name_is_invalid() {
        let nested = record(&["name.firstName", "name.lastName", "age"], &["", "Lee", "30"]);
        assert_eq!(
            map_record(&nested),
            Err(ValidationError::MissingField("name.firstName"))
        );
    }

    #[test]
    fn test_missing_last_name_is_invalid() {
        let nested = record(&["name.firstName", "age"], &["Ann", "30"]);
        assert_eq!(
            map_record(&nested),
            Err(ValidationError::MissingField("name.lastName"))
        );
    }

    #[test]
    fn test_missing_age_is_invalid() {
        let nested = record(&["name.firstName", "name.lastName", "age"], &["Ann", "Lee", ""]);
        assert_eq!(map_record(&nested), Err(ValidationError::MissingField("age")));
    }

    #[test]
    fn test_non_numeric_age_is_invalid() {
        for bad in ["thirty", "abc30", ".5", "-", "- 4", "99999999999", "-2147483649"] {
            let nested = record(&["name.firstName", "name.lastName", "age"], &["Ann", "Lee", bad]);
            assert_eq!(
                map_record(&nested),
                Err(ValidationError::InvalidAge(bad.to_string())),
                "age {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_age_uses_leading_digits() {
        let cases = [
            ("3.5", 3),
            ("30.0", 30),
            ("25 years", 25),
            ("30abc", 30),
            ("+7", 7),
            ("-4", -4),
            ("007", 7),
            ("2147483647", i32::MAX),
        ];
        for (raw, expected) in cases {
            let nested = record(&["name.firstName", "name.lastName", "age"], &["Ann", "Lee", raw]);
            assert_eq!(map_record(&nested).map(|u| u.age), Ok(expected), "age {raw:?}");
        }
    }

    #[test]
    fn test_name_given_as_scalar_is_invalid() {
        let nested = record(&["name", "age"], &["Ann Lee", "30"]);
        assert_eq!(
            map_record(&nested),
            Err(ValidationError::MissingField("name.firstName"))
        );
    }

    #[test]
    fn test_address_keeps_only_known_non_empty_parts() {
        let nested = record(
            &[
                "name.firstName",
                "name.lastName",
                "age",
                "address.line1",
                "address.line2",
                "address.city",
                "address.state",
                "address.zip",
            ],
            &["Ann", "Lee", "30", "1 Main St", "", "Pune", "MH", "411001"],
        );
        let address = map_record(&nested).unwrap().address.unwrap();

        assert_eq!(address.len(), 3);
        assert_eq!(address.get("line1").map(String::as_str), Some("1 Main St"));
        assert_eq!(address.get("state").map(String::as_str), Some("MH"));
        assert!(!address.contains_key("line2"));
        assert!(!address.contains_key("zip"));
    }

    #[test]
    fn test_empty_address_is_absent() {
        let nested = record(
            &["name.firstName", "name.lastName", "age", "address.city"],
            &["Ann", "Lee", "30", ""],
        );
        assert_eq!(map_record(&nested).unwrap().address, None);
    }

    #[test]
    fn test_residual_fields_become_additional_info() {
        let nested = record(
            &[
                "name.firstName",
                "name.lastName",
                "age",
                "gender",
                "contact.email",
                "contact.phone",
                "nickname",
            ],
            &["Ann", "Lee", "30", "female", "ann@example.com", "", ""],
        );
        let info = map_record(&nested).unwrap().additional_info.unwrap();

        assert_eq!(info.len(), 2);
        assert_eq!(info.get("gender"), Some(&NestedValue::Scalar("female".to_string())));
        let contact = info.get("contact").and_then(NestedValue::as_map).unwrap();
        assert_eq!(contact.len(), 1);
        assert!(!info.contains_key("nickname"));
    }

    #[test]
    fn test_blank_residual_fields_leave_additional_info_absent() {
        let nested = record(
            &["name.firstName", "name.lastName", "age", "gender"],
            &["Ann", "Lee", "30", ""],
        );
        assert_eq!(map_record(&nested).unwrap().additional_info, None);
    }
}
