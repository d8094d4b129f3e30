//! Shared pieces of the restricted evaluation scope.
//!
//! Both backends expose the same console surface to the script: `log` and
//! `info` emit plain lines, `warn`/`error`/`debug` emit tagged lines, and
//! non-string values are serialized with `JSON.stringify` (falling back to
//! `String(...)` for circular or non-JSON values). Keeping the formatter in
//! one place keeps the capture contract identical across backends.

/// JavaScript argument formatter injected into every scope template.
pub(crate) const FORMAT_FN: &str = r"
const __fmt = (args) => args
  .map((value) => {
    if (typeof value === 'string') return value;
    try {
      const json = JSON.stringify(value);
      return json === undefined ? String(value) : json;
    } catch (_err) {
      return String(value);
    }
  })
  .join(' ');
";

/// Substitute the formatter and the submitted source into a scope template.
///
/// Templates carry a `__FORMAT__` and a `__SOURCE__` marker; the source is
/// substituted last so nothing inside it is ever treated as a marker.
pub(crate) fn render(template: &str, source: &str) -> String {
    template
        .replacen("__FORMAT__", FORMAT_FN, 1)
        .replacen("__SOURCE__", source, 1)
}
