// Per-file summaries of identifier references

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::engine::CONTEXT_LINES;
use crate::index::SearchMatch;

/// Prefix letters used by the engine's type naming convention
const TYPE_PREFIXES: &[char] = &['U', 'A', 'F', 'I', 'E', 'T', 'S'];

/// Matches on lines at most this far apart share a range
const MERGE_DISTANCE: usize = 3;

pub const DEFAULT_SAMPLES_PER_FILE: usize = 3;

const MAX_SAMPLE_CHARS: usize = 100;

/// Inclusive line span
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReferenceSample {
    pub line: usize,
    pub code: String,
}

/// All references to an identifier within one file
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FileReferences {
    pub file: PathBuf,
    pub count: usize,
    pub is_definition: bool,
    pub line_ranges: Vec<LineRange>,
    /// Empty for the definition file
    pub samples: Vec<ReferenceSample>,
    pub truncated: bool,
}

/// Where a class is used across the searched roots
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClassUsage {
    pub class_name: String,
    pub files: Vec<FileReferences>,
    pub total_references: usize,
    pub file_count: usize,
    /// The underlying reference search hit its cap
    pub truncated: bool,
}

/// Whether `file` is named after `identifier`, e.g. `Health.h` for `AHealth`.
pub fn is_definition_file(file: &Path, identifier: &str) -> bool {
    let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    if stem == identifier {
        return true;
    }
    let mut chars = identifier.chars();
    match chars.next() {
        Some(prefix) if TYPE_PREFIXES.contains(&prefix) => {
            let rest = chars.as_str();
            !rest.is_empty() && stem == rest
        }
        _ => false,
    }
}

/// Collapse sorted line numbers into ranges of nearby lines.
pub fn merge_lines(lines: &[usize]) -> Vec<LineRange> {
    let mut ranges: Vec<LineRange> = Vec::new();
    for &line in lines {
        match ranges.last_mut() {
            Some(range) if line <= range.end + MERGE_DISTANCE => range.end = range.end.max(line),
            _ => ranges.push(LineRange { start: line, end: line }),
        }
    }
    ranges
}

/// Group raw matches by file.
///
/// Files sort by descending match count with the definition file last.
pub fn aggregate_references(identifier: &str, matches: &[SearchMatch], samples_per_file: usize) -> Vec<FileReferences> {
    let mut by_file: BTreeMap<&Path, Vec<&SearchMatch>> = BTreeMap::new();
    for m in matches {
        by_file.entry(m.file.as_path()).or_default().push(m);
    }

    let mut summaries: Vec<FileReferences> = by_file
        .into_iter()
        .map(|(file, mut file_matches)| {
            file_matches.sort_by_key(|m| m.line);
            let lines: Vec<usize> = file_matches.iter().map(|m| m.line).collect();
            let is_definition = is_definition_file(file, identifier);

            let samples = if is_definition {
                Vec::new()
            } else {
                file_matches.iter().take(samples_per_file).map(|m| sample(m)).collect()
            };

            FileReferences {
                file: file.to_path_buf(),
                count: file_matches.len(),
                is_definition,
                line_ranges: merge_lines(&lines),
                truncated: !is_definition && file_matches.len() > samples_per_file,
                samples,
            }
        })
        .collect();

    summaries.sort_by_key(|s| (s.is_definition, Reverse(s.count)));
    summaries
}

fn sample(m: &SearchMatch) -> ReferenceSample {
    // The window starts up to CONTEXT_LINES above the hit
    let offset = m.line.saturating_sub(1).min(CONTEXT_LINES);
    let code = m.context.lines().nth(offset).unwrap_or("").trim();
    ReferenceSample {
        line: m.line,
        code: code.chars().take(MAX_SAMPLE_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(file: &str, line: usize, context: &str) -> SearchMatch {
        SearchMatch {
            file: PathBuf::from(file),
            line,
            column: 1,
            context: context.to_string(),
            matched_tokens: vec![],
            score: 1,
        }
    }

    #[test]
    fn test_definition_file_detection() {
        assert!(is_definition_file(Path::new("/S/Health.h"), "AHealth"));
        assert!(is_definition_file(Path::new("/S/AHealth.cpp"), "AHealth"));
        assert!(is_definition_file(Path::new("/S/Vector.h"), "FVector"));
        assert!(!is_definition_file(Path::new("/S/Health.h"), "BHealth"));
        assert!(!is_definition_file(Path::new("/S/ealth.h"), "AHealth"));
        assert!(!is_definition_file(Path::new("/S/.h"), "A"));
    }

    #[test]
    fn test_merge_lines() {
        let ranges = merge_lines(&[3, 5, 8, 20, 21, 40]);
        let shown: Vec<String> = ranges.iter().map(|r| r.to_string()).collect();
        assert_eq!(shown, vec!["3-8", "20-21", "40"]);
        assert!(merge_lines(&[]).is_empty());
    }

    #[test]
    fn test_definition_file_sorts_last_without_excerpt() {
        let mut matches = Vec::new();
        for line in [1, 2, 3, 10, 30] {
            matches.push(hit("/S/Health.h", line, "class AHealth"));
        }
        for line in [4, 12, 13] {
            matches.push(hit("/S/Weapon.cpp", line, "a\nb\nAHealth* Target = nullptr;\nc\nd"));
        }

        let files = aggregate_references("AHealth", &matches, DEFAULT_SAMPLES_PER_FILE);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file, PathBuf::from("/S/Weapon.cpp"));
        assert!(!files[0].is_definition);
        assert_eq!(files[0].count, 3);
        assert_eq!(files[0].samples.len(), 3);
        assert_eq!(files[0].samples[0].code, "AHealth* Target = nullptr;");
        assert!(!files[0].truncated);

        let def = &files[1];
        assert!(def.is_definition);
        assert_eq!(def.count, 5);
        assert!(def.samples.is_empty());
        assert_eq!(def.line_ranges.len(), 3);
    }

    #[test]
    fn test_non_definition_files_sort_by_count() {
        let matches = vec![
            hit("/S/A.cpp", 1, "x"),
            hit("/S/B.cpp", 1, "x"),
            hit("/S/B.cpp", 9, "x"),
            hit("/S/C.cpp", 1, "x"),
        ];
        let files = aggregate_references("UThing", &matches, 1);
        assert_eq!(files[0].file, PathBuf::from("/S/B.cpp"));
        assert!(files[0].truncated);
        // Ties keep path order
        assert_eq!(files[1].file, PathBuf::from("/S/A.cpp"));
        assert_eq!(files[2].file, PathBuf::from("/S/C.cpp"));
    }

    #[test]
    fn test_sample_uses_hit_line_near_file_start() {
        let m = hit("/S/A.cpp", 1, "AHealth first;\nnext\nnext2");
        assert_eq!(sample(&m).code, "AHealth first;");
        let long = hit("/S/A.cpp", 1, &"x".repeat(300));
        assert_eq!(sample(&long).code.len(), 100);
    }
}
