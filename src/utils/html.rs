/// True when `input` survives ammonia sanitization untouched.
///
/// Display names and labels are rendered by the page layer, so anything that
/// ammonia would rewrite (tags, attributes, bare `<` or `&`) is rejected at
/// write time instead of being stored and escaped later.
pub fn is_plain_text(input: &str) -> bool {
    ammonia::clean(input) == input
}

/// `validator` hook for free-text display fields.
pub fn validate_plain_text(input: &str) -> Result<(), validator::ValidationError> {
    if !is_plain_text(input) {
        let mut err = validator::ValidationError::new("markup_not_allowed");
        err.message = Some("Markup is not allowed in this field.".into());
        return Err(err);
    }
    if input.trim().is_empty() {
        let mut err = validator::ValidationError::new("blank");
        err.message = Some("Field must not be blank.".into());
        return Err(err);
    }
    Ok(())
}
