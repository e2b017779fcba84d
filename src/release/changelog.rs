use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Escape newlines the way package metadata stores them.
///
/// Every line feed becomes the two characters `\` and `n`; carriage returns are dropped.
pub fn escape_newlines(text: &str) -> String {
  text.replace('\n', "\\n").replace('\r', "")
}

/// Build the changelog stored after a bump: a version header, the escaped release notes and
/// the previous changelog separated by an escaped blank line.
pub fn compose_changelog(version: &str, notes: &str, previous: &str) -> String {
  let mut changelog = format!("v{version}\\n{}", escape_newlines(notes));
  if !previous.is_empty() {
    changelog.push_str("\\n\\n");
    changelog.push_str(previous);
  }
  changelog
}

/// Reduce markdown release notes to plain text.
///
/// Emphasis, links, images and inline HTML are dropped, list items become `- ` lines and a
/// leading "Changelog" heading is removed.
pub fn strip_markdown(text: &str) -> String {
  let mut lines: Vec<String> = Vec::new();
  let mut current = String::new();

  for event in Parser::new(text) {
    match event {
      Event::Start(Tag::Item) => {
        flush_line(&mut lines, &mut current);
        current.push_str("- ");
      }
      Event::Text(value) | Event::Code(value) => current.push_str(&value),
      Event::SoftBreak | Event::HardBreak => flush_line(&mut lines, &mut current),
      Event::End(TagEnd::Heading(_)) => {
        if lines.is_empty() && is_changelog_title(&current) {
          current.clear();
        } else {
          flush_line(&mut lines, &mut current);
        }
      }
      Event::End(TagEnd::Paragraph | TagEnd::Item | TagEnd::CodeBlock) => {
        flush_line(&mut lines, &mut current);
      }
      _ => {}
    }
  }
  flush_line(&mut lines, &mut current);

  lines.join("\n")
}

fn flush_line(lines: &mut Vec<String>, current: &mut String) {
  let line = current.trim_end();
  if !line.trim().is_empty() && line != "-" {
    lines.push(line.to_string());
  }
  current.clear();
}

fn is_changelog_title(value: &str) -> bool {
  value
    .trim()
    .trim_end_matches(':')
    .eq_ignore_ascii_case("changelog")
}
