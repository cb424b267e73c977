// Reflection macro detection (UPROPERTY, UFUNCTION, UCLASS, ...)
//
// Works on raw text: the macros are line oriented and export tokens such as
// `ENGINE_API` confuse the grammar around them.

use regex::Regex;
use std::path::Path;

use crate::error::{AnalyzerError, Result};
use crate::index::{AnnotationKind, AnnotationMatch, ExposedApi};

/// Specifiers that make a declaration visible to Blueprint or the editor
pub const BLUEPRINT_SPECIFIERS: &[&str] = &[
    // Functions
    "BlueprintCallable",
    "BlueprintPure",
    "BlueprintImplementableEvent",
    "BlueprintNativeEvent",
    "BlueprintAuthorityOnly",
    "BlueprintCosmetic",
    // Properties
    "BlueprintReadOnly",
    "BlueprintReadWrite",
    "BlueprintGetter",
    "BlueprintSetter",
    // Classes
    "Blueprintable",
    "BlueprintType",
    "NotBlueprintable",
    // Editor
    "EditAnywhere",
    "EditDefaultsOnly",
    "EditInstanceOnly",
    "VisibleAnywhere",
    "VisibleDefaultsOnly",
    "VisibleInstanceOnly",
];

/// Specifiers that mark network replication
pub const REPLICATION_SPECIFIERS: &[&str] = &[
    "Replicated",
    "ReplicatedUsing",
    "NotReplicated",
    "Server",
    "Client",
    "NetMulticast",
    "Reliable",
    "Unreliable",
];

/// Macro names that tree-sitter may mistake for method declarations
pub const MACRO_NAMES: &[&str] = &[
    "UPROPERTY",
    "UFUNCTION",
    "UCLASS",
    "USTRUCT",
    "UENUM",
    "GENERATED_BODY",
    "GENERATED_UCLASS_BODY",
    "GENERATED_USTRUCT_BODY",
];

/// One macro invocation with its argument list
#[derive(Debug, Clone, PartialEq)]
pub struct MacroCall {
    pub kind: AnnotationKind,
    /// 1-based line of the macro name
    pub line: usize,
    /// 1-based line of the closing parenthesis
    pub end_line: usize,
    pub specifiers: Vec<String>,
    /// Byte offset just past the closing parenthesis
    pub end: usize,
}

/// Compiled regexes for the annotation family
pub struct AnnotationScanner {
    call: Regex,
    property: Regex,
    function: Regex,
    class: Regex,
    structure: Regex,
    enumeration: Regex,
}

impl AnnotationScanner {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| AnalyzerError::Parse(e.to_string()));
        Ok(Self {
            call: compile(
                r"\b(UPROPERTY|UFUNCTION|UCLASS|USTRUCT|UENUM|UINTERFACE|GENERATED_BODY|GENERATED_UCLASS_BODY|GENERATED_USTRUCT_BODY)\s*\(",
            )?,
            property: compile(r"^\s*(?:\w+_API\s+)?([\w\s\*<>:,&]+?)\s*[\*&]*\s*\b(\w+)\s*(?:=|;|\[|\{|:)")?,
            function: compile(r"^\s*(?:\w+_API\s+)?([\w\s\*<>:,&]+?)\s*[\*&]*\s*\b(\w+)\s*\(")?,
            class: compile(r"^\s*class\s+(?:\w+_API\s+)?(\w+)")?,
            structure: compile(r"^\s*struct\s+(?:\w+_API\s+)?(\w+)")?,
            enumeration: compile(r"^\s*enum\s+(?:class\s+)?(\w+)")?,
        })
    }

    /// Every recognised macro call in `content`, in source order.
    pub fn macro_calls(&self, content: &str) -> Vec<MacroCall> {
        let mut calls = Vec::new();
        let mut line = 1;
        let mut counted_to = 0;

        for caps in self.call.captures_iter(content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // Skip calls swallowed by an earlier argument list
            if whole.start() < calls.last().map_or(0, |c: &MacroCall| c.end) {
                continue;
            }
            let Some(kind) = AnnotationKind::from_macro(name.as_str()) else {
                continue;
            };
            let open = whole.end() - 1;
            let Some(close) = find_closing_paren(content, open) else {
                continue;
            };

            line += count_newlines(&content[counted_to..whole.start()]);
            counted_to = whole.start();
            let end_line = line + count_newlines(&content[whole.start()..close]);

            calls.push(MacroCall {
                kind,
                line,
                end_line,
                specifiers: parse_specifiers(&content[open + 1..close]),
                end: close + 1,
            });
        }
        calls
    }

    /// All annotations in `content` except body-generation markers, ordered by line.
    pub fn detect(&self, content: &str) -> Vec<AnnotationMatch> {
        let lines: Vec<&str> = content.split('\n').collect();
        let mut found = Vec::new();

        for call in self.macro_calls(content) {
            if call.kind == AnnotationKind::GeneratedBody {
                continue;
            }
            let rest = &content[call.end..];
            let Some(name) = self.subject_name(call.kind, rest) else {
                continue;
            };

            let names: Vec<&str> = call.specifiers.iter().map(|s| specifier_name(s)).collect();
            let is_exposed = names.iter().any(|n| BLUEPRINT_SPECIFIERS.contains(n));
            let is_replicated = names.iter().any(|n| REPLICATION_SPECIFIERS.contains(n));
            let suggestions = suggestions_for(call.kind, &names);

            found.push(AnnotationMatch {
                kind: call.kind,
                name,
                line: call.line,
                context: context_window(&lines, call.line),
                specifiers: call.specifiers,
                is_exposed,
                is_replicated,
                suggestions,
            });
        }
        found
    }

    fn subject_name(&self, kind: AnnotationKind, rest: &str) -> Option<String> {
        let (regex, group) = match kind {
            AnnotationKind::Property => (&self.property, 2),
            AnnotationKind::Function => (&self.function, 2),
            AnnotationKind::Class | AnnotationKind::Interface => (&self.class, 1),
            AnnotationKind::Struct => (&self.structure, 1),
            AnnotationKind::Enum => (&self.enumeration, 1),
            AnnotationKind::GeneratedBody => return None,
        };
        regex
            .captures(rest)
            .and_then(|caps| caps.get(group))
            .map(|m| m.as_str().to_string())
    }
}

/// Byte offset of the parenthesis closing the one at `open`.
///
/// Parentheses inside string and character literals are ignored.
pub fn find_closing_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Split a macro argument list on top-level commas.
///
/// Commas nested in parentheses or string literals stay inside their
/// specifier, so `meta=(ClampMin=0, ClampMax=1)` is one token.
pub fn parse_specifiers(args: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for ch in args.chars() {
        if in_string {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                current.push(ch);
            }
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth <= 0 => {
                push_trimmed(&mut result, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_trimmed(&mut result, &current);
    result
}

fn push_trimmed(out: &mut Vec<String>, token: &str) {
    let token = token.trim();
    if !token.is_empty() {
        out.push(token.to_string());
    }
}

/// `Category="Health"` -> `Category`
pub fn specifier_name(specifier: &str) -> &str {
    specifier.split('=').next().unwrap_or(specifier).trim()
}

pub fn has_specifier(specifiers: &[String], name: &str) -> bool {
    specifiers.iter().any(|s| specifier_name(s) == name)
}

/// Classify the Blueprint-facing declarations of one file
pub fn exposed_api(file: &Path, annotations: &[AnnotationMatch]) -> ExposedApi {
    let mut api = ExposedApi {
        file: file.to_path_buf(),
        ..Default::default()
    };

    for a in annotations {
        let has = |name: &str| has_specifier(&a.specifiers, name);
        match a.kind {
            AnnotationKind::Function => {
                if has("BlueprintCallable") {
                    api.callable_functions.push(a.name.clone());
                }
                if has("BlueprintPure") {
                    api.pure_functions.push(a.name.clone());
                }
                if has("BlueprintImplementableEvent") || has("BlueprintNativeEvent") {
                    api.events.push(a.name.clone());
                }
            }
            AnnotationKind::Property => {
                if has("BlueprintReadOnly") || has("BlueprintReadWrite") {
                    api.readable_properties.push(a.name.clone());
                }
                if has("BlueprintReadWrite") {
                    api.writable_properties.push(a.name.clone());
                }
            }
            AnnotationKind::Class => {
                if has("Blueprintable") {
                    api.blueprintable_classes.push(a.name.clone());
                }
            }
            _ => {}
        }
    }
    api
}

fn suggestions_for(kind: AnnotationKind, names: &[&str]) -> Vec<String> {
    let has = |n: &str| names.contains(&n);
    let has_category = names.iter().any(|n| n.eq_ignore_ascii_case("Category"));
    let mut out = Vec::new();

    match kind {
        AnnotationKind::Property => {
            if !has_category {
                out.push("Consider adding a Category for better organization".to_string());
            }
            if has("BlueprintReadWrite") && !names.iter().any(|n| n.eq_ignore_ascii_case("meta")) {
                out.push("Consider adding Meta specifiers for validation".to_string());
            }
        }
        AnnotationKind::Function => {
            if has("BlueprintCallable") && !has_category {
                out.push("Consider adding a Category for Blueprint organization".to_string());
            }
        }
        AnnotationKind::Class => {
            if !has("Blueprintable") && !has("NotBlueprintable") {
                out.push("Consider explicitly specifying Blueprintable or NotBlueprintable".to_string());
            }
        }
        _ => {}
    }
    out
}

/// One line before through three lines after `line` (1-based)
fn context_window(lines: &[&str], line: usize) -> String {
    let start = line.saturating_sub(2);
    let end = (line + 3).min(lines.len());
    if start >= end {
        return String::new();
    }
    lines[start..end].join("\n")
}

fn count_newlines(s: &str) -> usize {
    s.bytes().filter(|b| *b == b'\n').count()
}
