//! Glob matching for resource enumeration.
//!
//! Resource patterns such as `*.sublime-syntax` are matched against the
//! resource's file name only, never against its package directory. `*`
//! matches any run of characters and `?` matches exactly one.

/// Check if a pattern string contains glob characters (`*` or `?`).
pub fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Match a resource pattern against a file name.
///
/// Examples:
/// - `"*.tmLanguage"` matches `"Python.tmLanguage"`
/// - `"*.sublime-syntax"` does not match `"Python.tmLanguage"`
/// - `"Ruby*"` matches `"Ruby on Rails.sublime-syntax"`
pub fn resource_glob_matches(pattern: &str, file_name: &str) -> bool {
    if !is_glob_pattern(pattern) {
        return pattern == file_name;
    }
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = file_name.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position after the most recent `*`, and the text position it is anchored at
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p + 1, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((after_star, anchor)) => {
                    // Let the last `*` swallow one more character
                    backtrack = Some((after_star, anchor + 1));
                    p = after_star;
                    t = anchor + 1;
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
