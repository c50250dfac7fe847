// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Region tracking and comment toggling.
//!
//! A __region__ is a run of lines delimited by a begin directive and its
//! matching end directive. Regions nest, so open regions are kept on a stack
//! where the innermost region decides the comment token and indentation used
//! for every line it spans.
//!
//! Every line of a region is commented out at the same column, even when the
//! lines themselves are indented differently. That column is the smallest
//! indentation found from the begin line through the matching end line.
//! Whitespace-only lines do not count toward it.

use crate::tailor::{directive::DirectiveKind, Direction};

/// Leading indentation used when toggling comments.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Indent {
    width: usize,
    prefix: String,
}

impl Indent {
    /// Measure leading whitespace of line content.
    pub fn of(content: &str) -> Self {
        let prefix: String = content.chars().take_while(|c| c.is_whitespace()).collect();
        Self {
            width: prefix.chars().count(),
            prefix,
        }
    }

    /// Number of leading whitespace characters.
    pub fn width(&self) -> usize {
        self.width
    }
}

/// An open region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Comment token of the begin directive.
    pub token: String,

    /// Column to place comment token at.
    pub indent: Indent,

    /// One-based line number of the begin directive.
    pub begin_line: usize,
}

/// Stack of open regions.
///
/// # Invariant
///
/// - The top of the stack is the innermost open region.
/// - A region end always closes the innermost open region.
#[derive(Debug, Default)]
pub struct RegionTracker {
    stack: Vec<Region>,
}

impl RegionTracker {
    /// Construct new tracker with no open region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a region inside whatever region is currently open.
    pub fn enter(&mut self, region: Region) {
        self.stack.push(region);
    }

    /// Close innermost open region.
    ///
    /// Returns `None` if no region is open.
    pub fn leave(&mut self) -> Option<Region> {
        self.stack.pop()
    }

    /// Innermost open region, if any.
    pub fn current(&self) -> Option<&Region> {
        self.stack.last()
    }

    /// Number of open regions.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Outermost region left open, if any.
    pub fn unterminated(&self) -> Option<&Region> {
        self.stack.first()
    }
}

/// Compute indentation of a region by looking ahead to its matching end.
///
/// The span must start at the begin line of the region. Each item pairs the
/// line content with the kind of directive that applies to the current
/// device, if any. Nested begins and ends are counted so the scan stops at
/// the end that actually closes the region.
///
/// Returns `None` if the span runs out before the region is closed.
pub fn span_indent<'a>(
    span: impl IntoIterator<Item = (&'a str, Option<DirectiveKind>)>,
) -> Option<Indent> {
    let mut depth = 0usize;
    let mut indent: Option<Indent> = None;

    for (content, kind) in span {
        if !content.trim().is_empty() {
            let current = Indent::of(content);
            if indent.as_ref().map_or(true, |min| current.width < min.width) {
                indent = Some(current);
            }
        }

        match kind {
            Some(DirectiveKind::Begin) => depth += 1,
            Some(DirectiveKind::End) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(indent.unwrap_or_default());
                }
            }
            _ => {}
        }
    }

    None
}

/// Toggle comment state of line content in the polarity of `direction`.
///
/// Line content must not include its line ending.
pub fn toggle(content: &str, token: &str, indent: &Indent, direction: Direction) -> String {
    match direction {
        Direction::ToStore => comment(content, token, indent),
        Direction::ToDevice => uncomment(content, token),
    }
}

/// Comment out line content.
///
/// Places `token` followed by one space at the indent column. An empty line
/// becomes the indentation plus the bare token, with no trailing space.
/// Whitespace-only lines keep their whitespace after the token.
pub fn comment(content: &str, token: &str, indent: &Indent) -> String {
    if content.is_empty() {
        return format!("{}{}", indent.prefix, token);
    }

    // INVARIANT: Never split inside of the line's own text.
    let width = indent.width.min(Indent::of(content).width);
    let split = content
        .char_indices()
        .nth(width)
        .map_or(content.len(), |(idx, _)| idx);
    let (lead, rest) = content.split_at(split);

    format!("{lead}{token} {rest}")
}

/// Uncomment line content.
///
/// Strips the first occurrence of `token` followed by one space. Content
/// holding nothing but indentation and the bare token was an empty line.
pub fn uncomment(content: &str, token: &str) -> String {
    if content.trim_start() == token {
        return String::new();
    }

    content.replacen(&format!("{token} "), "", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("alias x=y", "", "# alias x=y"; "no indent")]
    #[test_case("    alias x=y", "    ", "    # alias x=y"; "same indent")]
    #[test_case("        alias x=y", "    ", "    #     alias x=y"; "deeper indent")]
    #[test_case("\talias x=y", "\t", "\t# alias x=y"; "tab indent")]
    #[test_case("", "    ", "    #"; "blank line")]
    #[test_case("   ", "  ", "  #  "; "whitespace only line")]
    #[test_case("\t", "    ", "\t# "; "lone tab")]
    #[test]
    fn comment_line(content: &str, indent: &str, expect: &str) {
        pretty_assertions::assert_eq!(comment(content, "#", &Indent::of(indent)), expect);
    }

    #[test_case("# alias x=y", "alias x=y"; "no indent")]
    #[test_case("    #     alias x=y", "        alias x=y"; "deeper indent")]
    #[test_case("    #", ""; "blank line")]
    #[test_case("alias x=y", "alias x=y"; "not commented")]
    #[test_case("x = 1 # {filetailor a}", "x = 1 {filetailor a}"; "first occurrence only")]
    #[test]
    fn uncomment_line(content: &str, expect: &str) {
        pretty_assertions::assert_eq!(uncomment(content, "#"), expect);
    }

    #[test]
    fn comment_never_splits_text() {
        let indent = Indent::of("        ");
        pretty_assertions::assert_eq!(comment("  x", "//", &indent), "  // x");
    }

    #[test_case("  fn main() {"; "same indent")]
    #[test_case("      body();"; "deeper indent")]
    #[test_case("  }"; "closing brace")]
    #[test_case(""; "empty")]
    #[test_case("   "; "spaces only")]
    #[test_case("\t"; "tab only")]
    #[test_case(" "; "narrower than indent")]
    #[test]
    fn comment_then_uncomment_restores(line: &str) {
        let commented = comment(line, "//", &Indent::of("  "));
        pretty_assertions::assert_eq!(uncomment(&commented, "//"), line);
    }

    #[test]
    fn span_indent_takes_minimum_over_span() {
        let span = [
            ("    #{begin filetailor a}", Some(DirectiveKind::Begin)),
            ("        deep", None),
            ("", None),
            ("      shallow", None),
            ("    #{end filetailor a}", Some(DirectiveKind::End)),
            ("x", None),
        ];
        let result = span_indent(span);
        pretty_assertions::assert_eq!(result, Some(Indent::of("    ")));
    }

    #[test]
    fn span_indent_skips_nested_end() {
        let span = [
            ("  #{begin filetailor a}", Some(DirectiveKind::Begin)),
            ("  //{begin filetailor a}", Some(DirectiveKind::Begin)),
            ("  //{end filetailor a}", Some(DirectiveKind::End)),
            ("body", None),
            ("  #{end filetailor a}", Some(DirectiveKind::End)),
        ];
        let result = span_indent(span);
        pretty_assertions::assert_eq!(result.map(|indent| indent.width()), Some(0));
    }

    #[test]
    fn span_indent_unterminated() {
        let span = [
            ("#{begin filetailor a}", Some(DirectiveKind::Begin)),
            ("body", None),
        ];
        pretty_assertions::assert_eq!(span_indent(span), None);
    }

    #[test]
    fn region_tracker_stack_discipline() {
        let mut tracker = RegionTracker::new();
        let outer = Region {
            token: "#".into(),
            indent: Indent::default(),
            begin_line: 1,
        };
        let inner = Region {
            token: "//".into(),
            indent: Indent::of("  "),
            begin_line: 2,
        };

        tracker.enter(outer.clone());
        tracker.enter(inner.clone());
        pretty_assertions::assert_eq!(tracker.depth(), 2);
        pretty_assertions::assert_eq!(tracker.current(), Some(&inner));
        pretty_assertions::assert_eq!(tracker.unterminated(), Some(&outer));

        pretty_assertions::assert_eq!(tracker.leave(), Some(inner));
        pretty_assertions::assert_eq!(tracker.current(), Some(&outer));
        pretty_assertions::assert_eq!(tracker.leave(), Some(outer));
        pretty_assertions::assert_eq!(tracker.leave(), None);
        pretty_assertions::assert_eq!(tracker.depth(), 0);
    }
}
