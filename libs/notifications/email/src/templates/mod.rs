//! Email template rendering with Handlebars
//!
//! Templates are registered as a `<name>_subject` / `<name>_html` pair. The
//! engine runs in strict mode, so a template referencing a missing variable
//! fails to render instead of silently producing an empty string.

use crate::error::{NotificationError, NotificationResult};
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::HashSet;

/// Name of the processed-order confirmation template
pub const ORDER_PROCESSED: &str = "order_processed";

const ORDER_PROCESSED_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body { font-family: Arial, sans-serif; background-color: #f4f4f4; margin: 0; padding: 0; text-align: center; }
        .container { max-width: 600px; margin: 20px auto 0; background-color: #fff; padding: 20px; border-radius: 10px; }
        h1 { color: #333; }
        p { color: #555; }
        .cta-button { display: inline-block; padding: 10px 20px; background-color: #007BFF; color: #fff; text-decoration: none; border-radius: 5px; margin-top: 20px; }
        .footer { margin-top: 20px; color: #777; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Order Processed</h1>
        <p>Your order with ID: <strong>{{id}}</strong> has been successfully processed.</p>
        <a href="#" class="cta-button">View Details</a>
    </div>
    <div class="footer">
        <p>This is an automated email. Please do not reply.</p>
    </div>
</body>
</html>"##;

/// Rendered template result
#[derive(Debug, Clone)]
pub struct RenderedTemplate {
    pub subject: String,
    pub html: String,
}

/// Handlebars-based template engine
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
    names: HashSet<String>,
}

impl TemplateEngine {
    /// Create a new TemplateEngine with the built-in templates registered
    pub fn new() -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        let mut engine = Self {
            handlebars,
            names: HashSet::new(),
        };
        engine.register(ORDER_PROCESSED, "Order Processed", ORDER_PROCESSED_HTML)?;

        Ok(engine)
    }

    /// Register a template, replacing any existing one with the same name
    pub fn register(&mut self, name: &str, subject: &str, html: &str) -> NotificationResult<()> {
        self.handlebars
            .register_template_string(&format!("{}_subject", name), subject)?;
        self.handlebars
            .register_template_string(&format!("{}_html", name), html)?;
        self.names.insert(name.to_string());
        Ok(())
    }

    /// Render a template by name
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> NotificationResult<RenderedTemplate> {
        if !self.has_template(name) {
            return Err(NotificationError::Template(format!(
                "Template not found: {}",
                name
            )));
        }

        Ok(RenderedTemplate {
            subject: self.handlebars.render(&format!("{}_subject", name), data)?,
            html: self.handlebars.render(&format!("{}_html", name), data)?,
        })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}
