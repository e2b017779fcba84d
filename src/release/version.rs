/// Normalise a version string or release tag for comparison and storage.
///
/// Leading `v`/`V` characters and surrounding whitespace are dropped, then each of
/// `strip_words` is removed (case-insensitively) from the start and from the end, and finally
/// any dashes left at either edge are trimmed. `"v1.2.0-switch"` and `"Switch-1.2.0"` both
/// become `"1.2.0"` with the default strip word.
pub fn clean_version(version: &str, strip_words: &[String]) -> String {
  let mut version = version.trim_start_matches(['v', 'V']).trim();

  for word in strip_words.iter().filter(|word| !word.is_empty()) {
    if let Some(rest) = strip_prefix_ignore_case(version, word) {
      version = rest.trim();
    }
    if let Some(rest) = strip_suffix_ignore_case(version, word) {
      version = rest.trim();
    }
  }

  version.trim_matches('-').to_string()
}

fn strip_prefix_ignore_case<'a>(value: &'a str, word: &str) -> Option<&'a str> {
  let head = value.get(..word.len())?;
  head
    .eq_ignore_ascii_case(word)
    .then(|| &value[word.len()..])
}

fn strip_suffix_ignore_case<'a>(value: &'a str, word: &str) -> Option<&'a str> {
  let start = value.len().checked_sub(word.len())?;
  let tail = value.get(start..)?;
  tail
    .eq_ignore_ascii_case(word)
    .then(|| &value[..start])
}
