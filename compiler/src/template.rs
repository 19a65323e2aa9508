use crate::error::TemplateError;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap();
}

/// A named chunk of generated source with `{{slot}}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub name: &'static str,
    pub text: &'static str,
}

impl Template {
    pub const fn new(name: &'static str, text: &'static str) -> Template {
        Template { name, text }
    }

    /// Substitutes every placeholder from `vars`. A placeholder without a
    /// value, or a `{{` that never closes, is an error.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(self.text) {
            let (whole, key) = match (caps.get(0), caps.get(1)) {
                (Some(whole), Some(key)) => (whole, key.as_str()),
                _ => continue,
            };
            self.push_literal(&mut out, &self.text[last..whole.start()])?;

            let value = vars
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| *value)
                .ok_or_else(|| TemplateError::UnknownPlaceholder(key.to_string(), self.name))?;
            out.push_str(value);
            last = whole.end();
        }
        self.push_literal(&mut out, &self.text[last..])?;

        Ok(out)
    }

    fn push_literal(&self, out: &mut String, literal: &str) -> Result<(), TemplateError> {
        if literal.contains("{{") {
            return Err(TemplateError::Unterminated(self.name));
        }
        out.push_str(literal);
        Ok(())
    }
}
