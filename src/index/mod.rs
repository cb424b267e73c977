// Extracted records, query results and the in-memory parse cache

pub mod cache;
pub mod roots;

use std::path::PathBuf;

/// Whether a record came from a `class` or a `struct` definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Class,
    Struct,
}

impl ClassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassKind::Class => "class",
            ClassKind::Struct => "struct",
        }
    }

    /// Access level a member gets before any access label is seen.
    pub fn default_visibility(&self) -> Visibility {
        match self {
            ClassKind::Class => Visibility::Private,
            ClassKind::Struct => Visibility::Public,
        }
    }
}

/// Member access levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().trim_end_matches(':').trim() {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// How a base type in an inheritance clause is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseKind {
    Superclass,
    Interface,
}

/// Classify a base type name by the engine naming convention.
///
/// `I` followed by an uppercase letter, or a name ending in `Interface`,
/// is an interface. Everything else is a superclass.
pub fn classify_base_type(name: &str) -> BaseKind {
    let mut chars = name.chars();
    let leading_i = matches!(
        (chars.next(), chars.next()),
        (Some('I'), Some(c)) if c.is_uppercase()
    );
    if leading_i || name.ends_with("Interface") {
        BaseKind::Interface
    } else {
        BaseKind::Superclass
    }
}

/// A class or struct definition with its members
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClassRecord {
    pub name: String,
    pub kind: ClassKind,
    pub file: PathBuf,
    pub line: usize,
    pub superclasses: Vec<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodRecord>,
    pub properties: Vec<PropertyRecord>,
    pub comments: Vec<String>,
    /// Preceded by a `UCLASS`/`UINTERFACE`/`USTRUCT` macro
    pub is_exposed: bool,
    pub exposure_specifiers: Vec<String>,
}

impl ClassRecord {
    pub fn method(&self, name: &str) -> Option<&MethodRecord> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyRecord> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MethodRecord {
    pub name: String,
    pub return_type: String,
    pub parameters: Vec<ParameterRecord>,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_const: bool,
    pub is_static: bool,
    pub visibility: Visibility,
    pub comments: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParameterRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PropertyRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    /// Preceded by a `UPROPERTY` macro
    pub is_exposed: bool,
    pub exposure_specifiers: Vec<String>,
    pub comments: Vec<String>,
    pub line: usize,
}

/// Node of an inheritance tree
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HierarchyNode {
    pub class_name: String,
    pub superclasses: Vec<HierarchyNode>,
    pub interfaces: Vec<String>,
    /// False when no definition was found in the searched roots
    pub resolved: bool,
    /// True when expansion stopped because the name already appears on the path
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cycle: bool,
}

impl HierarchyNode {
    pub fn leaf(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            superclasses: Vec::new(),
            interfaces: Vec::new(),
            resolved: false,
            cycle: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.superclasses.is_empty()
    }

    /// Longest path from this node to a terminal node, counting this node.
    pub fn depth(&self) -> usize {
        1 + self.superclasses.iter().map(|s| s.depth()).max().unwrap_or(0)
    }
}

/// Framework reflection macros recognised by the annotation detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AnnotationKind {
    #[serde(rename = "UPROPERTY")]
    Property,
    #[serde(rename = "UFUNCTION")]
    Function,
    #[serde(rename = "UCLASS")]
    Class,
    #[serde(rename = "USTRUCT")]
    Struct,
    #[serde(rename = "UENUM")]
    Enum,
    #[serde(rename = "UINTERFACE")]
    Interface,
    #[serde(rename = "GENERATED_BODY")]
    GeneratedBody,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Property => "UPROPERTY",
            AnnotationKind::Function => "UFUNCTION",
            AnnotationKind::Class => "UCLASS",
            AnnotationKind::Struct => "USTRUCT",
            AnnotationKind::Enum => "UENUM",
            AnnotationKind::Interface => "UINTERFACE",
            AnnotationKind::GeneratedBody => "GENERATED_BODY",
        }
    }

    pub fn from_macro(name: &str) -> Option<Self> {
        match name {
            "UPROPERTY" => Some(AnnotationKind::Property),
            "UFUNCTION" => Some(AnnotationKind::Function),
            "UCLASS" => Some(AnnotationKind::Class),
            "USTRUCT" => Some(AnnotationKind::Struct),
            "UENUM" => Some(AnnotationKind::Enum),
            "UINTERFACE" => Some(AnnotationKind::Interface),
            "GENERATED_BODY" | "GENERATED_UCLASS_BODY" | "GENERATED_USTRUCT_BODY" => {
                Some(AnnotationKind::GeneratedBody)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reflection macro with the declaration it applies to
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnnotationMatch {
    pub kind: AnnotationKind,
    pub name: String,
    pub specifiers: Vec<String>,
    pub line: usize,
    pub context: String,
    pub is_exposed: bool,
    pub is_replicated: bool,
    pub suggestions: Vec<String>,
}

/// Blueprint-facing surface of one file
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ExposedApi {
    pub file: PathBuf,
    pub callable_functions: Vec<String>,
    pub pure_functions: Vec<String>,
    pub events: Vec<String>,
    pub readable_properties: Vec<String>,
    pub writable_properties: Vec<String>,
    pub blueprintable_classes: Vec<String>,
}

impl ExposedApi {
    pub fn is_empty(&self) -> bool {
        self.callable_functions.is_empty()
            && self.pure_functions.is_empty()
            && self.events.is_empty()
            && self.readable_properties.is_empty()
            && self.writable_properties.is_empty()
            && self.blueprintable_classes.is_empty()
    }
}

/// A single line matched by a search
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchMatch {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub context: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_tokens: Vec<String>,
    pub score: usize,
}

/// A named declaration located in a file
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NamedLocation {
    pub name: String,
    pub line: usize,
}

/// Summary of one source file
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FileOverview {
    pub file: PathBuf,
    pub size_bytes: u64,
    pub total_chars: usize,
    pub preview: String,
    pub preview_chars: usize,
    pub is_truncated: bool,
    pub includes: Vec<String>,
    pub classes: Vec<NamedLocation>,
    pub functions: Vec<NamedLocation>,
    pub annotations: Vec<AnnotationMatch>,
}
