//! Pre-flight parameter checks.
//!
//! Arity and types are fixed by the parameter structs, so what remains to be
//! checked at runtime is value shape: required strings present, numbers in
//! range, ids safe to place in a URL path. Every present field is checked.

use crate::error::{ApiError, Result};
use crate::types::{CreateCharge, CreateToken, ListCharges};

/// Parameters that can be checked before a request is built.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl Validate for CreateCharge {
    fn validate(&self) -> Result<()> {
        currency("currency", &self.currency)?;
        if self.amount == 0 {
            return Err(ApiError::invalid("amount", "must be greater than zero"));
        }
        non_empty("card", &self.card)?;
        Ok(())
    }
}

impl Validate for ListCharges {
    fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(ApiError::invalid("limit", "must be at least 1"));
        }
        Ok(())
    }
}

impl Validate for CreateToken {
    fn validate(&self) -> Result<()> {
        digits("card[number]", &self.number)?;
        if !(1..=12).contains(&self.exp_month) {
            return Err(ApiError::invalid("card[exp_month]", "must be between 1 and 12"));
        }
        if self.exp_year == 0 {
            return Err(ApiError::invalid("card[exp_year]", "must be greater than zero"));
        }
        digits("card[cvc]", &self.cvc)?;
        if !(3..=4).contains(&self.cvc.len()) {
            return Err(ApiError::invalid("card[cvc]", "must be 3 or 4 digits"));
        }
        currency("currency", &self.currency)?;
        if let Some(email) = &self.email {
            if email.is_empty() || !email.contains('@') {
                return Err(ApiError::invalid("email", "must be an email address"));
            }
        }
        Ok(())
    }
}

/// Check an id that will be spliced into a URL path segment.
///
/// Only printable ASCII is accepted, and `.`/`..` are refused because URL
/// normalisation would turn them into a different resource.
pub fn resource_id(field: &'static str, id: &str) -> Result<()> {
    non_empty(field, id)?;
    if id == "." || id == ".." {
        return Err(ApiError::invalid(field, "must not be a dot segment"));
    }
    if id
        .chars()
        .any(|c| !c.is_ascii_graphic() || matches!(c, '/' | '?' | '#' | '%'))
    {
        return Err(ApiError::invalid(field, "contains characters not allowed in a path"));
    }
    Ok(())
}

fn non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid(field, "must not be empty"));
    }
    Ok(())
}

fn digits(field: &'static str, value: &str) -> Result<()> {
    non_empty(field, value)?;
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::invalid(field, "must contain only digits"));
    }
    Ok(())
}

fn currency(field: &'static str, value: &str) -> Result<()> {
    non_empty(field, value)?;
    if value.len() != 3 || !value.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(ApiError::invalid(field, "must be a three-letter currency code"));
    }
    Ok(())
}
