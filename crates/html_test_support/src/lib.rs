//! Shared helpers for the html crate's integration tests: fixture-block
//! parsing and line diffing.

use std::fmt::Write;

/// One tree-construction case from an embedded fixture block.
#[derive(Clone, Debug)]
pub struct TreeCase {
    pub name: String,
    pub input: String,
    /// Fragment context as `tag` or `ns tag` (e.g. `svg svg`), when present.
    pub fragment: Option<String>,
    pub expected: Vec<String>,
}

/// Parse fixture text of the form:
///
/// ```text
/// #case some-name
/// #input
/// <p>Hello</p>
/// #fragment div        (optional)
/// #tree
/// <html>
///   <head>
///   <body>
/// #end
/// ```
///
/// The input keeps interior newlines; the final newline before the next
/// directive is not part of it.
pub fn parse_tree_cases(fixture: &str) -> Vec<TreeCase> {
    let mut cases = Vec::new();
    let mut lines = fixture.lines().peekable();
    while let Some(line) = lines.next() {
        let Some(name) = line.strip_prefix("#case ") else {
            continue;
        };
        let mut input_lines: Vec<&str> = Vec::new();
        let mut expected: Vec<String> = Vec::new();
        let mut fragment = None;
        assert_eq!(lines.next(), Some("#input"), "case {name}: expected #input");
        for line in lines.by_ref() {
            if line == "#tree" {
                break;
            }
            if let Some(context) = line.strip_prefix("#fragment ") {
                fragment = Some(context.to_string());
                continue;
            }
            input_lines.push(line);
        }
        for line in lines.by_ref() {
            if line == "#end" {
                break;
            }
            expected.push(line.to_string());
        }
        cases.push(TreeCase {
            name: name.to_string(),
            input: input_lines.join("\n"),
            fragment,
            expected,
        });
    }
    cases
}

/// `None` when equal; otherwise a line-by-line report suitable for a panic
/// message.
pub fn diff_lines(expected: &[String], actual: &[String]) -> Option<String> {
    if expected == actual {
        return None;
    }
    let mut report = String::new();
    let _ = writeln!(
        report,
        "expected {} line(s), got {}",
        expected.len(),
        actual.len()
    );
    let max = expected.len().max(actual.len());
    for i in 0..max {
        let e = expected.get(i).map(String::as_str);
        let a = actual.get(i).map(String::as_str);
        if e == a {
            let _ = writeln!(report, "  {:>3} | {}", i + 1, e.unwrap_or(""));
        } else {
            let _ = writeln!(report, "E {:>3} | {}", i + 1, e.unwrap_or("<missing>"));
            let _ = writeln!(report, "A {:>3} | {}", i + 1, a.unwrap_or("<missing>"));
        }
    }
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tree_cases_reads_blocks() {
        let fixture = "\
#case one
#input
<p>x</p>
#tree
<html>
  <head>
#end

#case two
#input
<li>a
#fragment div
#tree
<li>
  \"a\"
#end
";
        let cases = parse_tree_cases(fixture);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "one");
        assert_eq!(cases[0].input, "<p>x</p>");
        assert!(cases[0].fragment.is_none());
        assert_eq!(cases[0].expected, vec!["<html>", "  <head>"]);
        assert_eq!(cases[1].fragment.as_deref(), Some("div"));
    }

    #[test]
    fn diff_lines_reports_first_divergence() {
        let expected = vec!["a".to_string(), "b".to_string()];
        let actual = vec!["a".to_string(), "c".to_string()];
        let report = diff_lines(&expected, &actual).expect("differs");
        assert!(report.contains("E   2 | b"));
        assert!(report.contains("A   2 | c"));
        assert!(diff_lines(&expected, &expected).is_none());
    }
}
