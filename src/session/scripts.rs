//! JavaScript snippets evaluated against page elements
//!
//! Every snippet targets the first element matching a CSS selector. Snippets return `null`
//! when nothing matches; an invalid selector throws, which surfaces as
//! `Error::ScriptExecutionFailed`.

/// JavaScript code builder for one selector
#[derive(Debug, Clone)]
pub struct JsBuilder {
    selector: String,
}

impl JsBuilder {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    /// Escape a string for a single-quoted JavaScript literal
    ///
    /// # Examples
    /// ```
    /// use stepwright::session::scripts::JsBuilder;
    /// assert_eq!(JsBuilder::escape_js_str("test's"), "test\\'s");
    /// ```
    pub fn escape_js_str(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('\'', "\\'")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\r', "\\r")
    }

    /// Expression evaluating to the element, or null
    pub fn element_query(&self) -> String {
        format!(
            "document.querySelector('{}')",
            Self::escape_js_str(&self.selector)
        )
    }

    /// Wrap `js_code` so it runs with the element bound to `el`
    pub fn execute_on_element(&self, js_code: &str) -> String {
        format!(
            "(() => {{ const el = {}; if (!el) return null; {} }})()",
            self.element_query(),
            js_code
        )
    }

    /// Snapshot of attached/visible/enabled/checked
    pub fn state_script(&self) -> String {
        format!(
            r#"(() => {{
                const el = {};
                if (!el) return {{ attached: false, visible: false, enabled: false, checked: false }};
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                const visible = style.visibility !== 'hidden'
                    && style.display !== 'none'
                    && rect.width > 0
                    && rect.height > 0;
                return {{
                    attached: true,
                    visible: visible,
                    enabled: !el.disabled,
                    checked: !!el.checked
                }};
            }})()"#,
            self.element_query()
        )
    }

    /// Scroll into view and return the bounding box
    pub fn bounding_box_script(&self) -> String {
        self.execute_on_element(
            "el.scrollIntoView({ block: 'center', inline: 'center' }); \
             const r = el.getBoundingClientRect(); \
             return { x: r.x, y: r.y, width: r.width, height: r.height };",
        )
    }

    pub fn focus_script(&self) -> String {
        self.execute_on_element("el.focus(); return true;")
    }

    /// Replace the value, firing input and change like a user edit would
    pub fn fill_script(&self, value: &str) -> String {
        let value = Self::escape_js_str(value);
        self.execute_on_element(&format!(
            "el.focus(); \
             if (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement) {{ \
                 const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
                 Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, '{value}'); \
             }} else if (el.isContentEditable) {{ \
                 el.textContent = '{value}'; \
             }} else {{ \
                 el.value = '{value}'; \
             }} \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;"
        ))
    }

    /// Toggle through a real click only when the state differs; returns the final state
    pub fn set_checked_script(&self, checked: bool) -> String {
        self.execute_on_element(&format!(
            "if (el.checked !== {checked}) el.click(); return el.checked;"
        ))
    }

    /// Select the option whose value or label matches; returns whether one matched
    pub fn select_option_script(&self, value: &str) -> String {
        let value = Self::escape_js_str(value);
        self.execute_on_element(&format!(
            "const opt = Array.from(el.options || []).find(o => o.value === '{value}' || o.label === '{value}'); \
             if (!opt) return false; \
             el.value = opt.value; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;"
        ))
    }

    pub fn text_script(&self) -> String {
        self.execute_on_element("return el.innerText !== undefined ? el.innerText : el.textContent;")
    }
}

/// Current page URL
pub const LOCATION_HREF: &str = "window.location.href";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_js_str() {
        assert_eq!(JsBuilder::escape_js_str("test's"), "test\\'s");
        assert_eq!(JsBuilder::escape_js_str(r#"[name="q"]"#), r#"[name=\"q\"]"#);
        assert_eq!(JsBuilder::escape_js_str("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_element_query_quotes_selector() {
        let builder = JsBuilder::new(r#"input[name="user"]"#);
        assert_eq!(
            builder.element_query(),
            r#"document.querySelector('input[name=\"user\"]')"#
        );
    }

    #[test]
    fn test_fill_script_escapes_value() {
        let script = JsBuilder::new("#user-name").fill_script("O'Brien");
        assert!(script.contains("O\\'Brien"));
        assert!(script.contains("new Event('input'"));
    }

    #[test]
    fn test_state_script_reports_missing_element() {
        let script = JsBuilder::new("#gone").state_script();
        assert!(script.contains("attached: false"));
        assert!(script.contains("document.querySelector('#gone')"));
    }
}
