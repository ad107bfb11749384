//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// Single left-to-right pass over the template: inserted values are never rescanned,
/// so a value containing `{other_key}` comes out verbatim. Unknown keys are kept as-is.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let value = after
      .find('}')
      .and_then(|close| pairs.iter().find(|(k, _)| *k == &after[..close]).map(|(_, v)| (close, *v)));
    match value {
      Some((close, v)) => {
        out.push_str(v);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Strip markdown code fences the model likes to wrap JSON in.
/// Handles a leading "```" / "```json" line and a trailing "```".
pub fn strip_code_fences(text: &str) -> String {
  let mut s = text.trim();
  if let Some(rest) = s.strip_prefix("```") {
    // Drop the language tag (if any) up to the first newline.
    s = match rest.find('\n') {
      Some(nl) => &rest[nl + 1..],
      None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
  }
  if let Some(rest) = s.trim_end().strip_suffix("```") {
    s = rest;
  }
  s.replace("```", "").trim().to_string()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) { end -= 1; }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}
