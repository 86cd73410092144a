use crate::{AppError, AppResult};

/// Authenticated marketplace user acting on the consent engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    subject: String,
}

impl UserIdentity {
    /// Creates an identity for an already authenticated subject.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    /// Builds an identity from an upstream-asserted subject, rejecting blank values.
    pub fn from_subject(subject: &str) -> AppResult<Self> {
        let trimmed = subject.trim();
        if trimmed.is_empty() {
            return Err(AppError::Unauthorized(
                "caller subject must not be empty".to_owned(),
            ));
        }

        Ok(Self::new(trimmed))
    }

    /// Returns the stable marketplace user id.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }
}

#[cfg(test)]
mod tests {
    use crate::AppError;

    use super::UserIdentity;

    #[test]
    fn from_subject_rejects_blank_subject() {
        let result = UserIdentity::from_subject("   ");
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn from_subject_trims_subject() {
        let identity = UserIdentity::from_subject("  u1 ");
        assert!(identity.is_ok());
        assert_eq!(identity.map(|value| value.subject().to_owned()).ok(), Some("u1".to_owned()));
    }
}
