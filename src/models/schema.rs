//! Field-level schema validation for entities and DTOs.
//!
//! Typed structs already rule out most structural errors, but data that
//! arrives as raw JSON (backend responses, provider output, user input)
//! is checked against a field table first so that every violation is
//! reported by field name instead of as a single opaque serde error.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Pattern for a plausible email address: `local@domain.tld`, no spaces.
static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// The constraint a field violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// A required field is absent or `null`.
    Missing,
    /// The field has the wrong JSON type.
    TypeMismatch {
        /// Human-readable name of the expected type.
        expected: &'static str,
    },
    /// The field is a string but not one of the allowed values.
    InvalidEnum {
        /// Allowed wire values.
        allowed: &'static [&'static str],
    },
    /// The field is not a valid email address.
    InvalidEmail,
    /// The field is not an ISO-8601 date or timestamp.
    InvalidDate,
    /// A monetary magnitude is below zero.
    Negative,
    /// An integer is outside its permitted range.
    OutOfRange {
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// The payload passed the field table but still failed to decode.
    Malformed(String),
}

impl core::fmt::Display for ViolationKind {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::Missing => f.write_str("is required"),
            Self::TypeMismatch { expected } => write!(f, "expected {expected}"),
            Self::InvalidEnum { allowed } => write!(f, "must be one of {}", allowed.join(", ")),
            Self::InvalidEmail => f.write_str("is not a valid email address"),
            Self::InvalidDate => f.write_str("is not an ISO-8601 date"),
            Self::Negative => f.write_str("must not be negative"),
            Self::OutOfRange { min, max } => write!(f, "must be between {min} and {max}"),
            Self::Malformed(ref detail) => write!(f, "is malformed: {detail}"),
        }
    }
}

/// A single field that violated a single constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Field name as it appears on the wire (e.g. `categoryId`).
    pub field: String,
    /// What was wrong with it.
    pub kind: ViolationKind,
}

impl Violation {
    /// Creates a violation for `field`.
    #[inline]
    #[must_use]
    pub fn new<F: Into<String>>(field: F, kind: ViolationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

impl core::fmt::Display for Violation {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.field, self.kind)
    }
}

/// Every violation found while validating one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    /// Returns the individual violations.
    #[inline]
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    /// Returns `true` if no violation was recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `field` has at least one violation.
    #[inline]
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|violation| violation.field == field)
    }

    /// Records a violation.
    pub(crate) fn push(&mut self, field: &str, kind: ViolationKind) {
        self.0.push(Violation::new(field, kind));
    }

    /// Converts to `Ok(())` when empty, `Err(self)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `self` if any violation was recorded.
    #[inline]
    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Prefixes every field name with `prefix.` (used for nested items).
    #[must_use]
    pub(crate) fn nested(self, prefix: &str) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|violation| Violation::new(format!("{prefix}.{}", violation.field), violation.kind))
                .collect(),
        )
    }

    /// Appends all violations of `other`.
    pub(crate) fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }
}

impl From<Vec<Violation>> for ValidationErrors {
    #[inline]
    fn from(violations: Vec<Violation>) -> Self {
        Self(violations)
    }
}

impl core::fmt::Display for ValidationErrors {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (index, violation) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            core::fmt::Display::fmt(violation, f)?;
        }
        Ok(())
    }
}

impl core::error::Error for ValidationErrors {}

/// JSON shape a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any string.
    String,
    /// Any finite number.
    Number,
    /// A non-negative number.
    Amount,
    /// An integer within an inclusive range.
    Integer {
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// One of a fixed set of strings.
    Enum(&'static [&'static str]),
    /// An email address.
    Email,
    /// An ISO-8601 date or timestamp string.
    Date,
}

/// One row of a schema's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Wire name.
    pub name: &'static str,
    /// Expected shape.
    pub kind: FieldKind,
    /// Whether the field must be present and non-null.
    pub required: bool,
}

impl Field {
    /// A field that must be present.
    #[inline]
    #[must_use]
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    /// A field that may be absent or `null`.
    #[inline]
    #[must_use]
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    /// Checks `value` (the field's raw JSON) against this row.
    fn check(&self, value: Option<&Value>, errors: &mut ValidationErrors) {
        let Some(value) = value.filter(|raw| !raw.is_null()) else {
            if self.required {
                errors.push(self.name, ViolationKind::Missing);
            }
            return;
        };
        if let Err(kind) = check_kind(self.kind, value) {
            errors.push(self.name, kind);
        }
    }
}

/// Checks one raw JSON value against a field kind.
fn check_kind(kind: FieldKind, value: &Value) -> Result<(), ViolationKind> {
    match kind {
        FieldKind::String => value
            .as_str()
            .map(|_| ())
            .ok_or(ViolationKind::TypeMismatch { expected: "string" }),
        FieldKind::Number => value
            .as_f64()
            .map(|_| ())
            .ok_or(ViolationKind::TypeMismatch { expected: "number" }),
        FieldKind::Amount => {
            let amount = value
                .as_f64()
                .ok_or(ViolationKind::TypeMismatch { expected: "number" })?;
            if amount < 0.0 { Err(ViolationKind::Negative) } else { Ok(()) }
        }
        FieldKind::Integer { min, max } => {
            let number = value
                .as_i64()
                .ok_or(ViolationKind::TypeMismatch { expected: "integer" })?;
            if (min..=max).contains(&number) {
                Ok(())
            } else {
                Err(ViolationKind::OutOfRange { min, max })
            }
        }
        FieldKind::Enum(allowed) => {
            let raw = value
                .as_str()
                .ok_or(ViolationKind::TypeMismatch { expected: "string" })?;
            if allowed.contains(&raw) {
                Ok(())
            } else {
                Err(ViolationKind::InvalidEnum { allowed })
            }
        }
        FieldKind::Email => {
            let raw = value
                .as_str()
                .ok_or(ViolationKind::TypeMismatch { expected: "string" })?;
            if is_valid_email(raw) { Ok(()) } else { Err(ViolationKind::InvalidEmail) }
        }
        FieldKind::Date => {
            let raw = value
                .as_str()
                .ok_or(ViolationKind::TypeMismatch { expected: "string" })?;
            parse_iso_date(raw).map(|_| ()).ok_or(ViolationKind::InvalidDate)
        }
    }
}

/// Checks a JSON object against a field table, collecting every violation.
///
/// # Errors
///
/// Returns all violations if `value` is not an object or any field fails.
#[inline]
pub fn check_fields(value: &Value, fields: &[Field]) -> Result<(), ValidationErrors> {
    let Some(object) = value.as_object() else {
        return Err(ValidationErrors::from(vec![Violation::new(
            "$",
            ViolationKind::TypeMismatch { expected: "object" },
        )]));
    };
    let mut errors = ValidationErrors::default();
    for field in fields {
        field.check(object.get(field.name), &mut errors);
    }
    errors.into_result()
}

/// Returns `true` if `raw` looks like an email address.
#[inline]
#[must_use]
pub fn is_valid_email(raw: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(raw))
}

/// Extracts the calendar date from an ISO-8601 date (`2024-01-15`) or
/// timestamp (`2024-01-15T10:30:00Z`, with or without offset).
#[inline]
#[must_use]
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|timestamp| timestamp.date())
}

/// Semantic checks on an already-typed value.
pub trait Validate {
    /// Checks every constraint the type cannot express.
    ///
    /// # Errors
    ///
    /// Returns every violated constraint, keyed by wire field name.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// A type with a field table that can be parsed from raw JSON.
pub trait Schema: DeserializeOwned + Validate {
    /// Field table used for structural checks.
    const FIELDS: &'static [Field];

    /// Validates `value` field by field, decodes it, then runs
    /// [`Validate::validate`].
    ///
    /// # Errors
    ///
    /// Returns every violation found in the first failing stage.
    #[inline]
    fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        check_fields(value, Self::FIELDS)?;
        let parsed: Self = serde_json::from_value(value.clone()).map_err(|err| {
            ValidationErrors::from(vec![Violation::new(
                "$",
                ViolationKind::Malformed(err.to_string()),
            )])
        })?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Parses a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FinanceError::Serialization`] for invalid
    /// JSON and [`crate::error::FinanceError::Validation`] for schema
    /// violations.
    #[inline]
    fn parse_str(json: &str) -> crate::error::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::parse(&value)?)
    }
}

/// Accumulates semantic violations for [`Validate`] implementations.
#[derive(Debug, Default)]
pub(crate) struct Checks(ValidationErrors);

impl Checks {
    /// Requires a finite, non-negative amount.
    pub(crate) fn amount(&mut self, field: &str, amount: f64) {
        if !amount.is_finite() {
            self.0.push(field, ViolationKind::TypeMismatch { expected: "finite number" });
        } else if amount < 0.0 {
            self.0.push(field, ViolationKind::Negative);
        }
    }

    /// Requires an ISO-8601 date string.
    pub(crate) fn date(&mut self, field: &str, raw: &str) {
        if parse_iso_date(raw).is_none() {
            self.0.push(field, ViolationKind::InvalidDate);
        }
    }

    /// Requires a plausible email address.
    pub(crate) fn email(&mut self, field: &str, raw: &str) {
        if !is_valid_email(raw) {
            self.0.push(field, ViolationKind::InvalidEmail);
        }
    }

    /// Requires an integer within `min..=max`.
    pub(crate) fn range(&mut self, field: &str, value: i64, min: i64, max: i64) {
        if !(min..=max).contains(&value) {
            self.0.push(field, ViolationKind::OutOfRange { min, max });
        }
    }

    /// Finishes the check.
    pub(crate) fn finish(self) -> Result<(), ValidationErrors> {
        self.0.into_result()
    }
}
