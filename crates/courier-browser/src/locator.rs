//! Element locators resolved inside the page.
//!
//! A locator is a CSS selector optionally narrowed by visible text and
//! optionally scoped to the first match of another locator. Resolution runs
//! as a script in the page so text matching sees rendered content.

use std::fmt;

/// A CSS selector with optional text filter and scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    css: String,
    has_text: Option<String>,
    scope: Option<Box<Locator>>,
}

impl Locator {
    /// Match every element selected by `css`.
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            has_text: None,
            scope: None,
        }
    }

    /// Keep only elements whose text content contains `text`.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    /// Search inside the first element matched by `scope`.
    #[must_use]
    pub fn within(mut self, scope: Locator) -> Self {
        self.scope = Some(Box::new(scope));
        self
    }

    /// JavaScript expression evaluating to an `Array` of matched elements.
    ///
    /// Requires the `__courierFilter` helper from [`Locator::script`] in scope.
    fn elements_expr(&self) -> String {
        let css = js_string(&self.css);
        let text = self
            .has_text
            .as_deref()
            .map_or_else(|| "null".to_string(), js_string);

        match &self.scope {
            None => format!(
                "__courierFilter(Array.from(document.querySelectorAll({css})), {text})"
            ),
            Some(scope) => format!(
                "(() => {{ const root = ({})[0]; \
                 return root ? __courierFilter(Array.from(root.querySelectorAll({css})), {text}) : []; }})()",
                scope.elements_expr()
            ),
        }
    }

    /// Wrap `body` into a self-invoking script where `els` holds the matches.
    pub fn script(&self, body: &str) -> String {
        format!(
            "(() => {{ \
             const __courierFilter = (els, text) => text === null ? els \
               : els.filter(e => ((e.innerText || e.textContent || '')).includes(text)); \
             const els = {}; \
             {body} \
             }})()",
            self.elements_expr()
        )
    }
}

impl From<&str> for Locator {
    fn from(css: &str) -> Self {
        Self::css(css)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{scope} >> ")?;
        }
        write!(f, "{}", self.css)?;
        if let Some(text) = &self.has_text {
            write!(f, ":has-text({text:?})")?;
        }
        Ok(())
    }
}

/// Encode `s` as a JavaScript string literal.
pub(crate) fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
