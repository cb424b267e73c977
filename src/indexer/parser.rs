// C++ parsing and class extraction

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tree_sitter::{Language, Node, Parser as TreeParser, Tree, TreeCursor};

use super::patterns::{find_closing_paren, AnnotationScanner, MacroCall, MACRO_NAMES};
use crate::error::{AnalyzerError, Result};
use crate::index::cache::ClassSource;
use crate::index::{
    classify_base_type, AnnotationKind, BaseKind, ClassKind, ClassRecord, MethodRecord, NamedLocation,
    ParameterRecord, PropertyRecord, Visibility,
};

/// How far above a class its `UCLASS`/`USTRUCT` macro may start
const CLASS_MACRO_WINDOW: usize = 10;

/// Macros blanked out before parsing, together with their argument lists
const MASKED_MACROS: &[&str] = &[
    "UPROPERTY",
    "UFUNCTION",
    "UCLASS",
    "USTRUCT",
    "UENUM",
    "UINTERFACE",
    "UDELEGATE",
    "UMETA",
    "UPARAM",
    "GENERATED_BODY",
    "GENERATED_UCLASS_BODY",
    "GENERATED_USTRUCT_BODY",
    "GENERATED_UINTERFACE_BODY",
    "GENERATED_IINTERFACE_BODY",
];

const SOURCE_EXTENSIONS: &[&str] = &["h", "hpp", "hh", "hxx", "inl", "cpp", "cc", "cxx", "c"];

/// A parsed file with the classes extracted from it
pub struct ParsedFile {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
    pub classes: Vec<Arc<ClassRecord>>,
}

impl ParsedFile {
    pub fn class(&self, name: &str) -> Option<&Arc<ClassRecord>> {
        self.classes.iter().find(|c| c.name == name)
    }
}

impl ClassSource for ParsedFile {
    fn class_records(&self) -> &[Arc<ClassRecord>] {
        &self.classes
    }
}

enum Member {
    Method(MethodRecord),
    Property(PropertyRecord),
}

/// Per-file lookup tables shared by every class in the file
struct FileContext<'a> {
    source: &'a str,
    path: &'a Path,
    calls: &'a [MacroCall],
    /// `UPROPERTY` calls keyed by the line of their closing parenthesis
    property_macros: HashMap<usize, &'a MacroCall>,
}

impl<'a> FileContext<'a> {
    fn new(source: &'a str, path: &'a Path, calls: &'a [MacroCall]) -> Self {
        let property_macros = calls
            .iter()
            .filter(|c| c.kind == AnnotationKind::Property)
            .map(|c| (c.end_line, c))
            .collect();
        Self {
            source,
            path,
            calls,
            property_macros,
        }
    }

    fn property_macro(&self, line: usize) -> Option<&'a MacroCall> {
        self.property_macros
            .get(&line)
            .or_else(|| line.checked_sub(1).and_then(|prev| self.property_macros.get(&prev)))
            .copied()
    }

    /// Nearest class-level macro directly above a class starting at `line`
    fn class_macro(&self, kind: ClassKind, line: usize, start_byte: usize) -> Option<&'a MacroCall> {
        let window_start = line.saturating_sub(CLASS_MACRO_WINDOW);
        self.calls
            .iter()
            .rev()
            .filter(|c| match kind {
                ClassKind::Class => matches!(c.kind, AnnotationKind::Class | AnnotationKind::Interface),
                ClassKind::Struct => c.kind == AnnotationKind::Struct,
            })
            .filter(|c| c.line < line && c.line >= window_start && c.end <= start_byte)
            .find(|c| is_trivia(&self.source[c.end..start_byte]))
    }
}

/// tree-sitter C++ parser with Unreal macro handling
pub struct CppParser {
    language: Language,
    scanner: AnnotationScanner,
    masked_call: Regex,
    export_token: Regex,
}

impl CppParser {
    pub fn new() -> Result<Self> {
        let pattern = format!(r"\b(?:{})\s*\(", MASKED_MACROS.join("|"));
        let masked_call = Regex::new(&pattern).map_err(|e| AnalyzerError::Parse(e.to_string()))?;
        let export_token = Regex::new(r"\b\w+_API\b").map_err(|e| AnalyzerError::Parse(e.to_string()))?;

        Ok(Self {
            language: tree_sitter_cpp::LANGUAGE.into(),
            scanner: AnnotationScanner::new()?,
            masked_call,
            export_token,
        })
    }

    pub fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }

    pub fn scanner(&self) -> &AnnotationScanner {
        &self.scanner
    }

    /// Blank out reflection macros and `*_API` export tokens.
    ///
    /// Replacement keeps byte offsets and newlines, so node positions in the
    /// masked tree index straight into the original text.
    pub fn mask_macros(&self, source: &str) -> Vec<u8> {
        let mut bytes = source.as_bytes().to_vec();
        let mut resume = 0;

        for m in self.masked_call.find_iter(source) {
            if m.start() < resume {
                continue;
            }
            let Some(close) = find_closing_paren(source, m.end() - 1) else {
                continue;
            };
            blank(&mut bytes[m.start()..=close]);
            resume = close + 1;
        }
        for m in self.export_token.find_iter(source) {
            blank(&mut bytes[m.range()]);
        }
        bytes
    }

    pub fn parse_tree(&self, source: &str) -> Result<Tree> {
        let masked = self.mask_macros(source);
        let mut parser = TreeParser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| AnalyzerError::Parse(e.to_string()))?;

        parser
            .parse(&masked, None)
            .ok_or_else(|| AnalyzerError::Parse("Failed to parse C++ code".to_string()))
    }

    pub fn parse_file(&self, path: &Path, source: String) -> Result<ParsedFile> {
        let tree = self.parse_tree(&source)?;
        let classes = self
            .extract_classes(&tree, &source, path)
            .into_iter()
            .map(Arc::new)
            .collect();

        Ok(ParsedFile {
            path: path.to_path_buf(),
            source,
            tree,
            classes,
        })
    }

    /// Every class or struct definition with a body, nested ones included
    pub fn extract_classes(&self, tree: &Tree, source: &str, path: &Path) -> Vec<ClassRecord> {
        let calls = self.scanner.macro_calls(source);
        let ctx = FileContext::new(source, path, &calls);

        let mut nodes = Vec::new();
        let mut cursor = tree.root_node().walk();
        collect_nodes(&mut cursor, &mut nodes, &|n| {
            matches!(n.kind(), "class_specifier" | "struct_specifier") && n.child_by_field_name("body").is_some()
        });

        nodes.into_iter().filter_map(|node| self.extract_class(node, &ctx)).collect()
    }

    fn extract_class(&self, node: Node, ctx: &FileContext) -> Option<ClassRecord> {
        let name = node_text(node.child_by_field_name("name")?, ctx.source).trim().to_string();
        if name.is_empty() {
            return None;
        }
        let kind = if node.kind() == "struct_specifier" {
            ClassKind::Struct
        } else {
            ClassKind::Class
        };
        let line = node.start_position().row + 1;

        let mut superclasses = Vec::new();
        let mut interfaces = Vec::new();
        for base in base_types(node, ctx.source) {
            match classify_base_type(&base) {
                BaseKind::Interface => interfaces.push(base),
                BaseKind::Superclass => superclasses.push(base),
            }
        }

        let exposure = ctx.class_macro(kind, line, node.start_byte());

        let mut methods = Vec::new();
        let mut properties = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut visibility = kind.default_visibility();
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                if child.kind() == "access_specifier" {
                    if let Some(v) = Visibility::from_label(node_text(child, ctx.source)) {
                        visibility = v;
                    }
                    continue;
                }
                match self.extract_member(child, visibility, ctx) {
                    Ok(Some(Member::Method(m))) => methods.push(m),
                    Ok(Some(Member::Property(p))) => properties.push(p),
                    Ok(None) => {}
                    Err(e) => debug!("Skipping member of {} in {}: {}", name, ctx.path.display(), e),
                }
            }
        }

        Some(ClassRecord {
            name,
            kind,
            file: ctx.path.to_path_buf(),
            line,
            superclasses,
            interfaces,
            methods,
            properties,
            comments: leading_comments(comment_anchor(node), ctx.source),
            is_exposed: exposure.is_some(),
            exposure_specifiers: exposure.map(|c| c.specifiers.clone()).unwrap_or_default(),
        })
    }

    fn extract_member(&self, node: Node, visibility: Visibility, ctx: &FileContext) -> Result<Option<Member>> {
        let Some(decl) = unwrap_template(node) else {
            return Ok(None);
        };
        if !matches!(decl.kind(), "function_definition" | "declaration" | "field_declaration") {
            return Ok(None);
        }
        let Some(declarator) = decl.child_by_field_name("declarator") else {
            return Ok(None);
        };

        let (leaf, suffix) = unwrap_declarator(declarator, ctx.source);
        let line = node.start_position().row + 1;
        let comments = leading_comments(node, ctx.source);

        match leaf {
            Some(func) if func.kind() == "function_declarator" => {
                extract_method(decl, func, &suffix, visibility, line, comments, ctx.source).map(|m| m.map(Member::Method))
            }
            Some(leaf) if decl.kind() == "field_declaration" => {
                if !matches!(leaf.kind(), "field_identifier" | "identifier") {
                    return Err(AnalyzerError::Extraction {
                        line,
                        reason: format!("unexpected field declarator '{}'", leaf.kind()),
                    });
                }
                let exposure = ctx.property_macro(line);
                let mut type_name = qualified_type(decl, ctx.source);
                type_name.push_str(&suffix);

                Ok(Some(Member::Property(PropertyRecord {
                    name: node_text(leaf, ctx.source).to_string(),
                    type_name: non_empty_or(type_name, "unknown"),
                    visibility,
                    is_static: has_storage_class(decl, "static", ctx.source),
                    is_exposed: exposure.is_some(),
                    exposure_specifiers: exposure.map(|c| c.specifiers.clone()).unwrap_or_default(),
                    comments,
                    line,
                })))
            }
            _ => Ok(None),
        }
    }

    /// `#include` targets without their delimiters
    pub fn includes(&self, tree: &Tree, source: &str) -> Vec<String> {
        let mut nodes = Vec::new();
        let mut cursor = tree.root_node().walk();
        collect_nodes(&mut cursor, &mut nodes, &|n| n.kind() == "preproc_include");

        nodes
            .into_iter()
            .filter_map(|n| n.child_by_field_name("path"))
            .map(|p| {
                node_text(p, source)
                    .trim()
                    .trim_matches(|c| c == '"' || c == '<' || c == '>')
                    .to_string()
            })
            .collect()
    }

    /// Class and struct definitions (name and line) in source order
    pub fn class_locations(&self, tree: &Tree, source: &str) -> Vec<NamedLocation> {
        let mut nodes = Vec::new();
        let mut cursor = tree.root_node().walk();
        collect_nodes(&mut cursor, &mut nodes, &|n| {
            matches!(n.kind(), "class_specifier" | "struct_specifier") && n.child_by_field_name("body").is_some()
        });

        nodes
            .into_iter()
            .filter_map(|n| {
                let name = node_text(n.child_by_field_name("name")?, source).trim().to_string();
                Some(NamedLocation {
                    name,
                    line: n.start_position().row + 1,
                })
            })
            .collect()
    }

    /// Function definitions outside class bodies, named as written (`AFoo::Bar`)
    pub fn function_definitions(&self, tree: &Tree, source: &str) -> Vec<NamedLocation> {
        let mut nodes = Vec::new();
        let mut cursor = tree.root_node().walk();
        collect_nodes(&mut cursor, &mut nodes, &|n| n.kind() == "function_definition" && !inside_class_body(*n));

        nodes
            .into_iter()
            .filter_map(|n| {
                let declarator = n.child_by_field_name("declarator")?;
                let (func, _) = unwrap_declarator(declarator, source);
                let name_node = func?.child_by_field_name("declarator")?;
                Some(NamedLocation {
                    name: node_text(name_node, source).to_string(),
                    line: n.start_position().row + 1,
                })
            })
            .collect()
    }
}

fn extract_method(
    decl: Node,
    func: Node,
    return_suffix: &str,
    visibility: Visibility,
    line: usize,
    comments: Vec<String>,
    source: &str,
) -> Result<Option<MethodRecord>> {
    let mut cursor = func.walk();
    let name = func
        .children(&mut cursor)
        .find(|c| matches!(c.kind(), "identifier" | "field_identifier" | "destructor_name"))
        .map(|n| node_text(n, source).to_string())
        .ok_or_else(|| AnalyzerError::Extraction {
            line,
            reason: "function declarator without a simple name".to_string(),
        })?;

    if MACRO_NAMES.contains(&name.as_str()) {
        return Ok(None);
    }

    // Modifiers are read from the declaration head, never from a body
    let head_end = decl
        .child_by_field_name("body")
        .map_or(decl.end_byte(), |body| body.start_byte());
    let head = source.get(decl.start_byte()..head_end).unwrap_or("");

    let mut cursor = func.walk();
    let const_qualified = func
        .children(&mut cursor)
        .any(|c| c.kind() == "type_qualifier" && node_text(c, source) == "const");
    let is_const = const_qualified || head.trim_end_matches(|c: char| c.is_whitespace() || c == ';').ends_with("const");

    let mut return_type = qualified_type(decl, source);
    if !return_type.is_empty() {
        return_type.push_str(return_suffix);
    }

    let parameters = match func.child_by_field_name("parameters") {
        Some(list) => {
            let mut cursor = list.walk();
            list.named_children(&mut cursor)
                .filter_map(|p| extract_parameter(p, source))
                .collect()
        }
        None => Vec::new(),
    };

    Ok(Some(MethodRecord {
        name,
        return_type,
        parameters,
        is_virtual: has_word(head, "virtual"),
        is_override: has_word(head, "override"),
        is_const,
        is_static: has_word(head, "static"),
        visibility,
        comments,
        line,
    }))
}

fn extract_parameter(param: Node, source: &str) -> Option<ParameterRecord> {
    if !matches!(
        param.kind(),
        "parameter_declaration" | "optional_parameter_declaration" | "variadic_parameter_declaration"
    ) {
        return None;
    }

    let base = qualified_type(param, source);
    let (name, suffix) = match param.child_by_field_name("declarator") {
        Some(d) => {
            let (leaf, suffix) = unwrap_declarator(d, source);
            (leaf.map(|l| node_text(l, source).to_string()), suffix)
        }
        None => (None, String::new()),
    };

    if name.is_none() && suffix.is_empty() && (base.is_empty() || base == "void") {
        return None;
    }

    Some(ParameterRecord {
        name: name.unwrap_or_else(|| "unnamed".to_string()),
        type_name: non_empty_or(format!("{}{}", base, suffix), "unknown"),
        default_value: param
            .child_by_field_name("default_value")
            .map(|v| node_text(v, source).trim().to_string()),
    })
}

/// Base type names from a class's inheritance clause, in declaration order
fn base_types(class_node: Node, source: &str) -> Vec<String> {
    let mut cursor = class_node.walk();
    let Some(clause) = class_node
        .children(&mut cursor)
        .find(|c| c.kind() == "base_class_clause")
    else {
        return Vec::new();
    };

    let mut cursor = clause.walk();
    clause
        .named_children(&mut cursor)
        .filter_map(|c| match c.kind() {
            "type_identifier" | "template_type" => Some(node_text(c, source).trim().to_string()),
            "qualified_identifier" => node_text(c, source).rsplit("::").next().map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Follow pointer/reference/array wrappers down to the named declarator,
/// collecting the `*`/`&` suffix on the way. Stops at a function declarator.
fn unwrap_declarator<'t>(node: Node<'t>, source: &str) -> (Option<Node<'t>>, String) {
    let mut suffix = String::new();
    let mut current = node;
    loop {
        match current.kind() {
            "pointer_declarator" | "abstract_pointer_declarator" => suffix.push('*'),
            "reference_declarator" | "abstract_reference_declarator" => {
                suffix.push_str(if node_text(current, source).starts_with("&&") { "&&" } else { "&" })
            }
            "parenthesized_declarator" | "array_declarator" | "attributed_declarator" | "init_declarator" => {}
            "function_declarator" | "identifier" | "field_identifier" | "destructor_name" | "qualified_identifier"
            | "operator_name" => return (Some(current), suffix),
            _ => return (None, suffix),
        }
        match inner_declarator(current) {
            Some(inner) => current = inner,
            None => return (None, suffix),
        }
    }
}

fn inner_declarator(node: Node) -> Option<Node> {
    if let Some(inner) = node.child_by_field_name("declarator") {
        return Some(inner);
    }
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind().ends_with("declarator") || c.kind().ends_with("identifier") || c.kind() == "destructor_name");
    found
}

/// `template <...> decl` -> `decl`
fn unwrap_template(node: Node) -> Option<Node> {
    if node.kind() != "template_declaration" {
        return Some(node);
    }
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .filter(|c| matches!(c.kind(), "function_definition" | "declaration" | "field_declaration"))
        .last();
    found
}

/// The `type` field with any leading cv-qualifiers, e.g. `const FString`
fn qualified_type(node: Node, source: &str) -> String {
    let Some(type_node) = node.child_by_field_name("type") else {
        return String::new();
    };
    let mut parts: Vec<&str> = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.start_byte() >= type_node.start_byte() {
            break;
        }
        if child.kind() == "type_qualifier" {
            parts.push(node_text(child, source));
        }
    }
    parts.push(node_text(type_node, source).trim());
    parts.join(" ")
}

fn has_storage_class(node: Node, keyword: &str, source: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| c.kind() == "storage_class_specifier" && node_text(c, source) == keyword);
    found
}

/// Nodes whose comments describe `node` (the wrapping declaration, if any)
fn comment_anchor(node: Node) -> Node {
    match node.parent() {
        Some(parent) if matches!(parent.kind(), "declaration" | "field_declaration" | "template_declaration") => parent,
        _ => node,
    }
}

/// The contiguous run of comment siblings directly before `node`
fn leading_comments(node: Node, source: &str) -> Vec<String> {
    let mut comments = Vec::new();
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        if sibling.kind() != "comment" {
            break;
        }
        comments.push(node_text(sibling, source).trim().to_string());
        prev = sibling.prev_sibling();
    }
    comments.reverse();
    comments
}

fn inside_class_body(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.kind() == "field_declaration_list" {
            return true;
        }
        current = parent.parent();
    }
    false
}

fn collect_nodes<'t, F>(cursor: &mut TreeCursor<'t>, out: &mut Vec<Node<'t>>, keep: &F)
where
    F: Fn(&Node<'t>) -> bool,
{
    let node = cursor.node();
    if keep(&node) {
        out.push(node);
    }
    if cursor.goto_first_child() {
        loop {
            collect_nodes(cursor, out, keep);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}

fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Whole-word search, so `UStaticMesh` does not count as `static`
fn has_word(text: &str, word: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    text.match_indices(word).any(|(i, _)| {
        let before = text[..i].chars().next_back();
        let after = text[i + word.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Only whitespace and comments
fn is_trivia(text: &str) -> bool {
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("//") {
            rest = after.find('\n').map_or("", |i| &after[i..]);
        } else if let Some(after) = rest.strip_prefix("/*") {
            match after.find("*/") {
                Some(i) => rest = &after[i + 2..],
                None => return false,
            }
        } else {
            return false;
        }
        rest = rest.trim_start();
    }
    true
}

fn blank(bytes: &mut [u8]) {
    for b in bytes.iter_mut() {
        if *b != b'\n' && *b != b'\r' {
            *b = b' ';
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CHARACTER_H: &str = r#"#pragma once

#include "CoreMinimal.h"
#include <GameFramework/Character.h>
#include "LyraCharacter.generated.h"

/**
 * Base character for the sample game.
 */
UCLASS(Config = Game, Blueprintable)
class LYRAGAME_API ALyraCharacter : public ACharacter, public IAbilitySystemInterface, public IGameplayTagAssetInterface
{
    GENERATED_BODY()

public:
    ALyraCharacter(const FObjectInitializer& ObjectInitializer = FObjectInitializer::Get());

    // Returns the ability component.
    UFUNCTION(BlueprintCallable, Category = "Lyra|Character")
    UAbilitySystemComponent* GetAbilitySystemComponent() const override;

    virtual void Tick(float DeltaSeconds) override;

    static FName GetDefaultTag();

    UStaticMeshComponent* GetMeshComponent() const;

    template <typename T>
    T* FindComponent(int32 Index, bool bRecurse = true);

    int32 GetHealth() const { return Health; }

protected:
    UPROPERTY(EditAnywhere, BlueprintReadWrite, Category = "Health")
    int32 Health = 100;

    UPROPERTY(VisibleAnywhere)
    TObjectPtr<UStaticMeshComponent> Mesh;

    int32 NotAProperty;

    static int32 InstanceCount;

private:
    float Speed;
};

struct FLyraStats
{
    int32 Kills;
    float Accuracy;
};

class FForwardDeclared;

void FreeFunction(int A)
{
}

void ALyraCharacter::Tick(float DeltaSeconds)
{
    static int Calls = 0;
}
"#;

    fn parser() -> CppParser {
        CppParser::new().unwrap()
    }

    fn parse(src: &str) -> Vec<ClassRecord> {
        let p = parser();
        let tree = p.parse_tree(src).unwrap();
        p.extract_classes(&tree, src, Path::new("/src/LyraCharacter.h"))
    }

    #[test]
    fn test_mask_preserves_length_and_lines() {
        let p = parser();
        let src = "UPROPERTY(EditAnywhere,\n  meta=(A=\"(\"))\nint32 X;\nclass ENGINE_API UFoo {};";
        let masked = p.mask_macros(src);
        assert_eq!(masked.len(), src.len());
        let masked = String::from_utf8(masked).unwrap();
        assert_eq!(masked.lines().count(), src.lines().count());
        assert!(!masked.contains("UPROPERTY"));
        assert!(!masked.contains("ENGINE_API"));
        assert!(masked.contains("int32 X;"));
        assert!(masked.contains("class"));
    }

    #[test]
    fn test_class_shape() {
        let classes = parse(CHARACTER_H);
        let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ALyraCharacter", "FLyraStats"]);

        let c = &classes[0];
        assert_eq!(c.kind, ClassKind::Class);
        assert_eq!(c.line, 11);
        assert_eq!(c.superclasses, vec!["ACharacter"]);
        assert_eq!(c.interfaces, vec!["IAbilitySystemInterface", "IGameplayTagAssetInterface"]);
        assert!(c.is_exposed);
        assert_eq!(c.exposure_specifiers, vec!["Config = Game", "Blueprintable"]);
        assert_eq!(c.comments.len(), 1);
        assert!(c.comments[0].contains("Base character"));
    }

    #[test]
    fn test_methods() {
        let classes = parse(CHARACTER_H);
        let c = &classes[0];

        let ctor = c.method("ALyraCharacter").unwrap();
        assert_eq!(ctor.visibility, Visibility::Public);
        assert_eq!(ctor.return_type, "");
        assert_eq!(ctor.parameters.len(), 1);
        assert_eq!(ctor.parameters[0].name, "ObjectInitializer");
        assert_eq!(ctor.parameters[0].type_name, "const FObjectInitializer&");
        assert_eq!(ctor.parameters[0].default_value.as_deref(), Some("FObjectInitializer::Get()"));

        let asc = c.method("GetAbilitySystemComponent").unwrap();
        assert_eq!(asc.return_type, "UAbilitySystemComponent*");
        assert!(asc.is_const && asc.is_override && !asc.is_virtual);
        assert_eq!(asc.comments, vec!["// Returns the ability component."]);

        let tick = c.method("Tick").unwrap();
        assert!(tick.is_virtual && tick.is_override && !tick.is_const);
        assert_eq!(tick.parameters[0].type_name, "float");

        assert!(c.method("GetDefaultTag").unwrap().is_static);
        // Substring of UStaticMeshComponent must not count
        assert!(!c.method("GetMeshComponent").unwrap().is_static);

        let find = c.method("FindComponent").unwrap();
        assert_eq!(find.parameters.len(), 2);
        assert_eq!(find.parameters[1].default_value.as_deref(), Some("true"));

        let inline = c.method("GetHealth").unwrap();
        assert!(inline.is_const);
        assert_eq!(inline.return_type, "int32");

        assert!(c.method("GENERATED_BODY").is_none());
    }

    #[test]
    fn test_properties() {
        let classes = parse(CHARACTER_H);
        let c = &classes[0];

        let health = c.property("Health").unwrap();
        assert_eq!(health.visibility, Visibility::Protected);
        assert_eq!(health.type_name, "int32");
        assert!(health.is_exposed);
        assert_eq!(health.exposure_specifiers, vec!["EditAnywhere", "BlueprintReadWrite", "Category = \"Health\""]);

        let mesh = c.property("Mesh").unwrap();
        assert_eq!(mesh.type_name, "TObjectPtr<UStaticMeshComponent>");
        assert!(mesh.is_exposed);

        // Two lines below a macro is out of reach
        assert!(!c.property("NotAProperty").unwrap().is_exposed);
        assert!(c.property("InstanceCount").unwrap().is_static);
        assert_eq!(c.property("Speed").unwrap().visibility, Visibility::Private);
        assert!(c.properties.iter().all(|p| p.name != "GetHealth"));
    }

    #[test]
    fn test_struct_defaults_to_public() {
        let classes = parse(CHARACTER_H);
        let s = &classes[1];
        assert_eq!(s.kind, ClassKind::Struct);
        assert!(!s.is_exposed);
        assert!(s.properties.iter().all(|p| p.visibility == Visibility::Public));
        assert_eq!(s.properties.len(), 2);
    }

    #[test]
    fn test_class_macro_must_directly_precede() {
        let src = "UCLASS(Blueprintable)\nclass UA : public UObject\n{\n};\n\nclass UB : public UObject\n{\n};\n";
        let classes = parse(src);
        assert!(classes[0].is_exposed);
        assert!(!classes[1].is_exposed);
    }

    #[test]
    fn test_nested_and_template_bases() {
        let src = "class FOuter : public TSharedFromThis<FOuter>\n{\n    struct FInner : Engine::FBase { int X; };\n};\n";
        let classes = parse(src);
        let outer = classes.iter().find(|c| c.name == "FOuter").unwrap();
        assert_eq!(outer.superclasses, vec!["TSharedFromThis<FOuter>"]);
        let inner = classes.iter().find(|c| c.name == "FInner").unwrap();
        assert_eq!(inner.superclasses, vec!["FBase"]);
        assert_eq!(inner.line, 3);
    }

    #[test]
    fn test_malformed_member_does_not_abort_class() {
        let src = "class FBroken\n{\npublic:\n    void (*Callback)(int);\n    int Good;\n    void Fine();\n};\n";
        let classes = parse(src);
        assert_eq!(classes.len(), 1);
        assert!(classes[0].property("Good").is_some());
        assert!(classes[0].method("Fine").is_some());
    }

    #[test]
    fn test_garbage_input_yields_nothing() {
        let classes = parse("}}} class { ;;; UCLASS( \n template<<<");
        assert!(classes.is_empty());
    }

    #[test]
    fn test_file_overview_helpers() {
        let p = parser();
        let tree = p.parse_tree(CHARACTER_H).unwrap();
        assert_eq!(
            p.includes(&tree, CHARACTER_H),
            vec!["CoreMinimal.h", "GameFramework/Character.h", "LyraCharacter.generated.h"]
        );
        let funcs: Vec<String> = p
            .function_definitions(&tree, CHARACTER_H)
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(funcs, vec!["FreeFunction", "ALyraCharacter::Tick"]);
        let classes = p.class_locations(&tree, CHARACTER_H);
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].name, "ALyraCharacter");
    }

    #[test]
    fn test_helpers() {
        assert!(has_word("static void F()", "static"));
        assert!(!has_word("UStaticMesh* M", "static"));
        assert!(!has_word("my_static", "static"));
        assert!(is_trivia("\n  // doc\n /* x */ \n"));
        assert!(!is_trivia("\nclass X {};\n"));
        assert!(parser().can_parse(Path::new("A/B.H")));
        assert!(!parser().can_parse(Path::new("A/B.cs")));
    }

    proptest! {
        #[test]
        fn prop_parse_is_deterministic(src in "[a-zA-Z_ :;{}(),*&<>\n]{0,200}") {
            let p = parser();
            let a = p.parse_tree(&src).unwrap();
            let b = p.parse_tree(&src).unwrap();
            prop_assert_eq!(a.root_node().to_sexp(), b.root_node().to_sexp());
        }
    }
}
