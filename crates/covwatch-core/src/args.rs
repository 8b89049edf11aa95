//! Argument strings for the coverage tool.
//!
//! These strings are passed verbatim to the external tool's own argument
//! parser, so ordering and spacing are byte-exact contracts — including the
//! trailing space after each target name and the leading space of the
//! final inclusion token.

const DLL_SUFFIX: &str = ".dll";
const INCLUDE_ALL: &str = " +[*]*";

/// Space-joined target file names for the wrapped test runner.
///
/// Each name is followed by a single space, in input order; empty input
/// yields the empty string.
pub fn target_args(names: &[String]) -> String {
    let mut out = String::new();
    for name in names {
        out.push_str(name);
        out.push(' ');
    }
    out
}

/// Inclusion/exclusion filter expression for the coverage tool.
///
/// Each file contributes an exclusion token `-[<stem>]*` (stem = file name
/// without the `.dll` suffix), and a single ` +[*]*` inclusion token is
/// appended at the end — also for an empty file set.
pub fn coverage_filters(names: &[String]) -> String {
    let mut out = String::new();
    for name in names {
        let stem = name.strip_suffix(DLL_SUFFIX).unwrap_or(name);
        out.push_str("-[");
        out.push_str(stem);
        out.push_str("]* ");
    }
    out.push_str(INCLUDE_ALL);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn target_args_of_empty_input_is_empty() {
        assert_eq!(target_args(&[]), "");
    }

    #[test]
    fn target_args_joins_names_with_trailing_space() {
        assert_eq!(
            target_args(&names(&["a.dll", "b.dll"])),
            "a.dll b.dll "
        );
    }

    #[test]
    fn filters_of_empty_input_is_the_inclusion_token() {
        assert_eq!(coverage_filters(&[]), " +[*]*");
    }

    #[test]
    fn filters_exclude_each_stem_then_include_all() {
        assert_eq!(
            coverage_filters(&names(&["file1.dll", "file2.dll"])),
            "-[file1]* -[file2]*  +[*]*"
        );
    }

    #[test]
    fn filter_stem_keeps_inner_dots() {
        assert_eq!(
            coverage_filters(&names(&["App.Test.dll"])),
            "-[App.Test]*  +[*]*"
        );
    }
}
