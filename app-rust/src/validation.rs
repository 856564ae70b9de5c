use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 8;

const PASSWORD_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

/// The first password rule that failed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password must be at least 8 characters long.")]
    TooShort,
    #[error("Password must contain at least one uppercase letter.")]
    MissingUppercase,
    #[error("Password must contain at least one lowercase letter.")]
    MissingLowercase,
    #[error("Password must contain at least one number.")]
    MissingDigit,
    #[error("Password must contain at least one symbol.")]
    MissingSymbol,
}

/// Check the registration password rules in order.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::MissingDigit);
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err(PasswordError::MissingSymbol);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_first_failing_rule() {
        assert_eq!(validate_password("Ab1!"), Err(PasswordError::TooShort));
        assert_eq!(validate_password("abcdefg1!"), Err(PasswordError::MissingUppercase));
        assert_eq!(validate_password("ABCDEFG1!"), Err(PasswordError::MissingLowercase));
        assert_eq!(validate_password("Abcdefgh!"), Err(PasswordError::MissingDigit));
        assert_eq!(validate_password("Abcdefgh1"), Err(PasswordError::MissingSymbol));
        assert_eq!(validate_password("Abcdefg1-"), Err(PasswordError::MissingSymbol));
    }

    #[test]
    fn accepts_strong_passwords() {
        assert_eq!(validate_password("Abcdefg1!"), Ok(()));
        assert_eq!(validate_password("Pa55word{}"), Ok(()));
    }

    #[test]
    fn messages_match_the_form_copy() {
        assert_eq!(
            PasswordError::MissingSymbol.to_string(),
            "Password must contain at least one symbol."
        );
    }
}
