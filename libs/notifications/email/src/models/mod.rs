/// Email message to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Unique identifier, used as a fallback message ID
    pub id: String,
    /// Recipient email address
    pub to: String,
    /// Email subject
    pub subject: String,
    /// HTML body
    pub html_body: String,
}

impl Email {
    /// Create a new email with a fresh ID
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_email_has_unique_id() {
        let a = Email::new("a@example.com", "s", "<p>a</p>");
        let b = Email::new("a@example.com", "s", "<p>a</p>");
        assert_ne!(a.id, b.id);
        assert_eq!(a.to, "a@example.com");
    }
}
