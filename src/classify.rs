//! Ordered (pattern, role) table deciding which catch-all bag a key lands in.
//!
//! One table serves both sides: the domain builder reads it while modeling
//! pattern properties, and the compiler emitter renders [`Classifier::rules`]
//! as data so generated code constructs the very same `Classifier`.
use regex::Regex;

#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: String,
    pub role: String,
    regex: Regex,
}

impl Rule {
    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    /// Compile a table. Earlier entries take priority.
    pub fn new<I, P, R>(table: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (P, R)>,
        P: Into<String>,
        R: Into<String>,
    {
        let rules = table
            .into_iter()
            .map(|(pattern, role)| {
                let pattern = pattern.into();
                let regex = Regex::new(&pattern)?;
                Ok(Rule { pattern, role: role.into(), regex })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Role configured for a pattern exactly as it is spelled in a schema.
    pub fn role_for_pattern(&self, pattern: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.pattern == pattern)
            .map(|rule| rule.role.as_str())
    }

    /// First rule (in table order) whose role is one of `roles` and whose
    /// pattern matches `key`.
    pub fn classify(&self, key: &str, roles: &[&str]) -> Option<&str> {
        self.rules
            .iter()
            .filter(|rule| roles.contains(&rule.role.as_str()))
            .find(|rule| rule.is_match(key))
            .map(|rule| rule.role.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openapi() -> Classifier {
        Classifier::new([
            ("^x-", "vendorExtension"),
            ("^/", "path"),
            ("^([0-9]{3})$|^(default)$", "responseCode"),
        ])
        .unwrap()
    }

    #[test]
    fn classify_respects_allowed_roles() {
        let c = openapi();
        assert_eq!(c.classify("x-note", &["vendorExtension"]), Some("vendorExtension"));
        assert_eq!(c.classify("x-note", &["path"]), None);
        assert_eq!(c.classify("/pets", &["vendorExtension", "path"]), Some("path"));
        assert_eq!(c.classify("200", &["responseCode"]), Some("responseCode"));
        assert_eq!(c.classify("default", &["responseCode"]), Some("responseCode"));
        assert_eq!(c.classify("2000", &["responseCode"]), None);
    }

    #[test]
    fn table_order_is_priority() {
        let c = Classifier::new([("^x-", "first"), ("^x-a", "second")]).unwrap();
        assert_eq!(c.classify("x-a", &["first", "second"]), Some("first"));
        assert_eq!(c.classify("x-a", &["second"]), Some("second"));
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        assert!(Classifier::new([("^(x-", "broken")]).is_err());
    }

    #[test]
    fn role_lookup_by_pattern_text() {
        let c = openapi();
        assert_eq!(c.role_for_pattern("^/"), Some("path"));
        assert_eq!(c.role_for_pattern("^y-"), None);
    }
}
