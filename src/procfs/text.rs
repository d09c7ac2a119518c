//! Text transformations applied to the lines of a procfs file before their extraction
//!
//! Every transformation leaves its input untouched and returns a new sequence carrying the same
//! timestamp as its input.

use std::str::FromStr;

use regex::{NoExpand, Regex};

use crate::core::time::Timestamp;
use crate::procfs::ProcfsError;

/// Builds a regex which only matches a whole line, to be used with [`LineSequence::matching()`]
pub fn full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

/// Ordered lines of a file, captured at a given instant
#[derive(Debug, Clone)]
pub struct LineSequence {
    lines: Vec<String>,
    timestamp: Timestamp,
}

impl LineSequence {
    pub fn new(lines: Vec<String>, timestamp: Timestamp) -> Self {
        LineSequence { lines, timestamp }
    }

    /// Builds a line sequence from a multi-line string slice
    /// # Arguments
    ///  * `content` The string slice to split into lines
    ///  * `timestamp` The instant at which `content` was captured
    pub fn from_text(content: &str, timestamp: Timestamp) -> Self {
        Self::new(content.lines().map(String::from).collect(), timestamp)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn derive(&self, lines: Vec<String>) -> Self {
        LineSequence {
            lines,
            timestamp: self.timestamp,
        }
    }

    /// Only keeps the lines matched by `pattern`
    ///
    /// To select whole lines, `pattern` should be built with [`full_match()`].
    pub fn matching(&self, pattern: &Regex) -> Self {
        self.derive(self.lines.iter().filter(|l| pattern.is_match(l)).cloned().collect())
    }

    /// Replaces all occurrences of `pattern` in each line with the literal `replacement`
    pub fn replaced(&self, pattern: &Regex, replacement: &str) -> Self {
        self.derive(
            self.lines
                .iter()
                .map(|l| pattern.replace_all(l, NoExpand(replacement)).into_owned())
                .collect(),
        )
    }

    /// Replaces all occurrences of the literal `from` in each line with `to`
    pub fn replaced_literal(&self, from: &str, to: &str) -> Self {
        self.derive(self.lines.iter().map(|l| l.replace(from, to)).collect())
    }

    pub fn trimmed(&self) -> Self {
        self.derive(self.lines.iter().map(|l| l.trim().to_string()).collect())
    }

    /// Drops the lines which are empty or only contain whitespaces
    pub fn non_empty(&self) -> Self {
        self.derive(self.lines.iter().filter(|l| !l.trim().is_empty()).cloned().collect())
    }

    /// Pairs each line with its position in this sequence
    pub fn numbered(&self) -> Vec<(usize, &str)> {
        self.lines.iter().map(String::as_str).enumerate().collect()
    }

    /// Splits each line on every occurrence of `delimiter`, empty tokens included
    pub fn split(&self, delimiter: &str) -> TokenParser {
        self.tokenize(|l| l.split(delimiter).map(String::from).collect())
    }

    /// Splits each line on the first `limit - 1` occurrences of `delimiter`
    pub fn split_limit(&self, delimiter: &str, limit: usize) -> TokenParser {
        self.tokenize(|l| l.splitn(limit, delimiter).map(String::from).collect())
    }

    /// Splits each line on whitespaces, dropping empty tokens
    pub fn split_whitespace(&self) -> TokenParser {
        self.tokenize(|l| l.split_whitespace().map(String::from).collect())
    }

    /// Splits each line on whitespaces, except for the text enclosed between the first `open`
    /// and the last `close` characters, which forms a single token stripped of its delimiters.
    ///
    /// Lines without such a group are split on whitespaces only.
    pub fn split_grouped(&self, open: char, close: char) -> TokenParser {
        self.tokenize(|l| match (l.find(open), l.rfind(close)) {
            (Some(begin), Some(end)) if begin < end => l[..begin]
                .split_whitespace()
                .map(String::from)
                .chain(std::iter::once(l[begin + open.len_utf8()..end].to_string()))
                .chain(l[end + close.len_utf8()..].split_whitespace().map(String::from))
                .collect(),
            _ => l.split_whitespace().map(String::from).collect(),
        })
    }

    fn tokenize<F>(&self, split: F) -> TokenParser
    where
        F: Fn(&str) -> Vec<String>,
    {
        TokenParser {
            lines: self.lines.iter().map(|l| split(l)).collect(),
            timestamp: self.timestamp,
        }
    }
}

/// Tokens of each line of a `LineSequence`
#[derive(Debug, Clone)]
pub struct TokenParser {
    lines: Vec<Vec<String>>,
    timestamp: Timestamp,
}

impl TokenParser {
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn lines(&self) -> &[Vec<String>] {
        &self.lines
    }

    pub fn line(&self, line_no: usize) -> Option<&[String]> {
        self.lines.get(line_no).map(Vec::as_slice)
    }

    fn derive<F>(&self, filter: F) -> Self
    where
        F: Fn(&String) -> Option<String>,
    {
        TokenParser {
            lines: self
                .lines
                .iter()
                .map(|tokens| tokens.iter().filter_map(&filter).collect())
                .collect(),
            timestamp: self.timestamp,
        }
    }

    pub fn trimmed(&self) -> Self {
        self.derive(|t| Some(t.trim().to_string()))
    }

    /// Only keeps the tokens made of ASCII digits, lines keep their position even if they end up
    /// empty
    pub fn digits(&self) -> Self {
        self.derive(|t| (!t.is_empty() && t.bytes().all(|b| b.is_ascii_digit())).then(|| t.clone()))
    }

    /// Returns all tokens of all lines, in order
    ///
    /// Convenient for single line files.
    pub fn flatten(&self) -> Vec<String> {
        self.lines.iter().flatten().cloned().collect()
    }

    /// Get the value of a token from the parser
    /// # Arguments
    ///  * `line_no`: The line number from which to retrieve the token
    ///  * `pos`: The position of the token in the line (e.g. 1 for token 'b' in line 'a b c')
    pub fn token<T>(&self, line_no: usize, pos: usize) -> Result<T, ProcfsError>
    where
        T: FromStr,
    {
        let token = self
            .lines
            .get(line_no)
            .and_then(|tokens| tokens.get(pos))
            .ok_or_else(|| {
                ProcfsError::SchemaMismatch(format!("No token at line {} and position {}", line_no, pos))
            })?;

        token.parse::<T>().map_err(|_| {
            ProcfsError::SchemaMismatch(format!(
                "The token '{}' at line {} and position {} could not be parsed",
                token, line_no, pos
            ))
        })
    }
}

#[cfg(test)]
mod test_line_sequence {
    use regex::Regex;
    use rstest::*;
    use sn_fake_clock::FakeClock;

    use super::*;

    fn sequence(content: &str) -> LineSequence {
        LineSequence::from_text(content, Timestamp::now())
    }

    #[test]
    fn test_should_keep_timestamp_through_transformations() {
        FakeClock::set_time(4242);
        let lines = sequence("a  b\n\nc");
        let stamp = lines.timestamp();
        FakeClock::advance_time(1000);

        let transformed = lines.non_empty().trimmed().replaced_literal("a", "b");

        assert_eq!(transformed.timestamp(), stamp);
        assert_eq!(transformed.split(" ").timestamp(), stamp);
    }

    #[test]
    fn test_matching_should_only_keep_full_matches() {
        let pattern = full_match("Mem.*|Cached:.*").unwrap();
        let lines = sequence("MemTotal: 1\nSwapCached: 2\nCached: 3\nBuffers: 4");

        assert_eq!(lines.matching(&pattern).lines(), &["MemTotal: 1", "Cached: 3"]);
    }

    #[rstest]
    #[case("MemTotal: 1\nMemFree: 2\nBuffers: 3", "Mem.*")]
    #[case("cpu 1 2\ncpu0 1 2\nintr 3", r"cpu\d* .*")]
    #[case("", ".*")]
    fn test_matching_should_be_idempotent(#[case] content: &str, #[case] pattern: &str) {
        let pattern = full_match(pattern).unwrap();
        let lines = sequence(content);

        let once = lines.matching(&pattern);
        let twice = once.matching(&pattern);

        assert_eq!(once.lines(), twice.lines());
    }

    #[test]
    fn test_replaced_should_collapse_whitespaces() {
        let lines = sequence("model name\t: Intel  CPU");
        let whitespaces = Regex::new(r"\s+").unwrap();

        assert_eq!(lines.replaced(&whitespaces, " ").lines(), &["model name : Intel CPU"]);
    }

    #[test]
    fn test_replaced_should_not_expand_replacement() {
        let lines = sequence("a b");
        let pattern = Regex::new("a").unwrap();

        assert_eq!(lines.replaced(&pattern, "$0").lines(), &["$0 b"]);
    }

    #[test]
    fn test_non_empty_should_drop_blank_lines() {
        let lines = sequence("a\n\n  \nb\n");

        assert_eq!(lines.non_empty().lines(), &["a", "b"]);
    }

    #[test]
    fn test_numbered_should_pair_lines_with_position() {
        let lines = sequence("a\nb");

        assert_eq!(lines.numbered(), vec![(0, "a"), (1, "b")]);
    }

    #[test]
    fn test_split_limit_should_keep_remaining_delimiters() {
        let tokens = sequence("key: a: b").split_limit(":", 2);

        assert_eq!(tokens.line(0).unwrap(), &["key", " a: b"]);
    }

    #[test]
    fn test_split_should_keep_empty_tokens() {
        let tokens = sequence("power management:").split(":");

        assert_eq!(tokens.line(0).unwrap(), &["power management", ""]);
    }

    #[rstest]
    #[case("1 (bash) S 0", vec!["1", "bash", "S", "0"])]
    #[case("1 (tmux: server) S 0", vec!["1", "tmux: server", "S", "0"])]
    #[case("1 (a) (b)) R", vec!["1", "a) (b)", "R"])]
    #[case("1 2 3", vec!["1", "2", "3"])]
    fn test_split_grouped_should_keep_group_as_one_token(#[case] line: &str, #[case] expected: Vec<&str>) {
        let tokens = sequence(line).split_grouped('(', ')');

        assert_eq!(tokens.flatten(), expected);
    }
}
