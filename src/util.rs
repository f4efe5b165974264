//! Small utility helpers used across modules.

use similar::TextDiff;

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Lower-case, trim and collapse inner whitespace so spoken answers compare cleanly.
pub fn normalize_answer(s: &str) -> String {
  s.split_whitespace()
    .map(|w| w.to_lowercase())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Character-level similarity in [0, 1]: 2*matches / (len(a) + len(b)).
pub fn similarity(a: &str, b: &str) -> f32 {
  TextDiff::from_chars(a, b).ratio()
}

/// Best candidate whose similarity to `target` reaches `cutoff`. Ties keep the earlier candidate.
pub fn closest_match<'a>(target: &str, candidates: &'a [String], cutoff: f32) -> Option<&'a str> {
  let mut best: Option<(f32, &'a str)> = None;
  for c in candidates {
    let score = similarity(target, c);
    if score < cutoff {
      continue;
    }
    match best {
      Some((s, _)) if s >= score => {}
      _ => best = Some((score, c.as_str())),
    }
  }
  best.map(|(_, c)| c)
}

/// Wrap plain text into an SSML document.
pub fn ssml(body: &str) -> String {
  format!("<speak>{}</speak>", body)
}

/// Escape the characters SSML treats as markup.
pub fn escape_ssml(s: &str) -> String {
  s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
