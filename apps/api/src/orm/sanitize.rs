//! Post-processing of raw model output: fence stripping and a lightweight
//! structural check. Pure string functions, no I/O.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::orm::prompts::QUERY_PREFIX;

fn leading_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // ``` plus an optional language hint; the hint is only consumed when
    // whitespace follows it, so ```CandidateProfile... keeps its first word
    RE.get_or_init(|| {
        Regex::new(r"^```(?:[ \t]*[A-Za-z0-9_+\-]*[ \t]*\r?\n|[A-Za-z0-9_+\-]+[ \t]+)?")
            .expect("valid regex")
    })
}

fn trailing_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*```\s*$").expect("valid regex"))
}

fn slice_ending() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\s*:\s*\d+\s*\]$").expect("valid regex"))
}

/// Removes a surrounding markdown code fence (```` ``` ```` or ```` ```python ````)
/// and trims whitespace. Text without fences is only trimmed.
pub fn strip_code_fences(raw: &str) -> String {
    let text = raw.trim();

    let text = leading_fence().replace(text, "");
    let text = trailing_fence().replace(&text, "");
    let text = text.trim();

    // Inline code span: `CandidateProfile.objects.filter(...)`
    match text
        .strip_prefix('`')
        .and_then(|inner| inner.strip_suffix('`'))
    {
        Some(inner) if !inner.contains('`') => inner.trim().to_string(),
        _ => text.to_string(),
    }
}

/// A reason the generated text does not look like a valid query line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureIssue {
    /// Does not start with `CandidateProfile.objects.`
    MissingPrefix,
    MultiLine,
    /// Parentheses, brackets or quotes do not pair up.
    Unbalanced,
    /// Ends in something other than `)` or a `[:N]` slice.
    UnexpectedEnding,
}

impl fmt::Display for StructureIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StructureIssue::MissingPrefix => "missing CandidateProfile.objects. prefix",
            StructureIssue::MultiLine => "spans multiple lines",
            StructureIssue::Unbalanced => "unbalanced brackets or quotes",
            StructureIssue::UnexpectedEnding => "unexpected ending",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureReport {
    pub issues: Vec<StructureIssue>,
}

impl StructureReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for StructureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Checks the sanitized output against the expected call shape.
/// This flags likely off-contract replies; it is not a parser.
pub fn check_structure(orm: &str) -> StructureReport {
    let mut issues = Vec::new();

    if !orm.starts_with(QUERY_PREFIX) {
        issues.push(StructureIssue::MissingPrefix);
    }
    if orm.contains('\n') || orm.contains('\r') {
        issues.push(StructureIssue::MultiLine);
    }
    if !is_balanced(orm) {
        issues.push(StructureIssue::Unbalanced);
    }
    if !(orm.ends_with(')') || slice_ending().is_match(orm)) {
        issues.push(StructureIssue::UnexpectedEnding);
    }

    StructureReport { issues }
}

/// Bracket pairing with string literals skipped.
fn is_balanced(text: &str) -> bool {
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in text.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' => stack.push(c),
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            _ => {}
        }
    }

    quote.is_none() && stack.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = "CandidateProfile.objects.filter(x=1)";

    #[test]
    fn test_strip_python_fence() {
        let raw = "```python\nCandidateProfile.objects.filter(x=1)\n```";
        assert_eq!(strip_code_fences(raw), CLEAN);
    }

    #[test]
    fn test_strip_untagged_fence() {
        let raw = "```\nCandidateProfile.objects.filter(x=1)\n```";
        assert_eq!(strip_code_fences(raw), CLEAN);
    }

    #[test]
    fn test_strip_other_language_hint() {
        let raw = "  ```py\r\nCandidateProfile.objects.filter(x=1)\r\n```  \n";
        assert_eq!(strip_code_fences(raw), CLEAN);
    }

    #[test]
    fn test_strip_single_line_fence() {
        let raw = "```CandidateProfile.objects.filter(x=1)```";
        assert_eq!(strip_code_fences(raw), CLEAN);
    }

    #[test]
    fn test_strip_tagged_single_line_fence() {
        let raw = "```python CandidateProfile.objects.filter(x=1)```";
        assert_eq!(strip_code_fences(raw), CLEAN);
    }

    #[test]
    fn test_strip_tab_separated_tag() {
        let raw = "```python\tCandidateProfile.objects.filter(x=1)\n```";
        assert_eq!(strip_code_fences(raw), CLEAN);
    }

    #[test]
    fn test_strip_spaced_tag_on_own_line() {
        let raw = "``` python \nCandidateProfile.objects.filter(x=1)\n```";
        assert_eq!(strip_code_fences(raw), CLEAN);
    }

    #[test]
    fn test_strip_inline_backticks() {
        assert_eq!(strip_code_fences("`CandidateProfile.objects.filter(x=1)`"), CLEAN);
    }

    #[test]
    fn test_strip_is_idempotent_on_clean_text() {
        assert_eq!(strip_code_fences(CLEAN), CLEAN);
        let once = strip_code_fences("```python\nCandidateProfile.objects.filter(x=1)\n```");
        assert_eq!(strip_code_fences(&once), once);
    }

    #[test]
    fn test_strip_trims_whitespace_only() {
        assert_eq!(strip_code_fences("\n  CandidateProfile.objects.count() \n"), "CandidateProfile.objects.count()");
    }

    #[test]
    fn test_strip_keeps_off_contract_text() {
        assert_eq!(
            strip_code_fences("Sorry, I cannot help with that."),
            "Sorry, I cannot help with that."
        );
    }

    #[test]
    fn test_check_accepts_documented_shapes() {
        let shapes = [
            "CandidateProfile.objects.filter(gender='female', placement_status=False)",
            "CandidateProfile.objects.filter(college__type__icontains='iti', placement_status=False).count()",
            "CandidateProfile.objects.filter(placement_status=False).all()[:5]",
            "CandidateProfile.objects.filter(Q(permanent_address_district__icontains='Chennai') | Q(permanent_address_district__icontains='Chengalpattu'), placement_status=False)",
        ];
        for shape in shapes {
            assert!(check_structure(shape).is_clean(), "flagged: {shape}");
        }
    }

    #[test]
    fn test_check_ignores_brackets_inside_strings() {
        let orm = "CandidateProfile.objects.filter(college__name__icontains='St. Joseph (Autonomous', placement_status=False)";
        assert!(check_structure(orm).is_clean());
    }

    #[test]
    fn test_check_flags_missing_prefix() {
        let report = check_structure("Candidate.objects.filter(x=1)");
        assert_eq!(report.issues, vec![StructureIssue::MissingPrefix]);
    }

    #[test]
    fn test_check_flags_prose() {
        let report = check_structure("Here is your query");
        assert!(report.issues.contains(&StructureIssue::MissingPrefix));
        assert!(report.issues.contains(&StructureIssue::UnexpectedEnding));
    }

    #[test]
    fn test_check_flags_multiline() {
        let report = check_structure("CandidateProfile.objects.filter(\n  x=1\n)");
        assert_eq!(report.issues, vec![StructureIssue::MultiLine]);
    }

    #[test]
    fn test_check_flags_truncated_output() {
        let report = check_structure("CandidateProfile.objects.filter(gender='female', placement_st");
        assert!(report.issues.contains(&StructureIssue::Unbalanced));
        assert!(report.issues.contains(&StructureIssue::UnexpectedEnding));
    }

    #[test]
    fn test_check_flags_unterminated_string() {
        let report = check_structure("CandidateProfile.objects.filter(gender='female)");
        assert!(report.issues.contains(&StructureIssue::Unbalanced));
    }

    #[test]
    fn test_report_display_lists_issues() {
        let report = StructureReport {
            issues: vec![StructureIssue::MissingPrefix, StructureIssue::MultiLine],
        };
        assert_eq!(
            report.to_string(),
            "missing CandidateProfile.objects. prefix, spans multiple lines"
        );
    }
}
