use anyhow::Result;
use std::sync::Arc;

use super::{print_json, run_query, OutputFormat};
use uegraph::index::roots::SearchScope;
use uegraph::index::HierarchyNode;
use uegraph::indexer::Analyzer;

pub async fn show_hierarchy(
    analyzer: &Arc<Analyzer>,
    name: String,
    include_interfaces: bool,
    scope: Option<SearchScope>,
    format: OutputFormat,
) -> Result<()> {
    let message = format!("Building hierarchy of {}", name);
    let tree = run_query(analyzer, &message, move |a| {
        a.find_class_hierarchy(&name, include_interfaces, scope)
    })
    .await?;

    match format {
        OutputFormat::Json => print_json(&tree),
        OutputFormat::Text => {
            let mut out = String::new();
            render(&tree, 0, &mut out);
            print!("{}", out);
            Ok(())
        }
    }
}

fn render(node: &HierarchyNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let marker = if depth == 0 { "" } else { "└─ " };
    out.push_str(&format!("{}{}{}", indent, marker, node.class_name));
    if node.cycle {
        out.push_str(" (cycle)");
    } else if !node.resolved {
        out.push_str(" (not indexed)");
    }
    if !node.interfaces.is_empty() {
        out.push_str(&format!("  implements {}", node.interfaces.join(", ")));
    }
    out.push('\n');
    for parent in &node.superclasses {
        render(parent, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_tree() {
        let mut root = HierarchyNode::leaf("AHealth");
        root.resolved = true;
        root.interfaces = vec!["IDamageable".to_string()];
        root.superclasses.push(HierarchyNode::leaf("AActor"));

        let mut out = String::new();
        render(&root, 0, &mut out);
        assert_eq!(out, "AHealth  implements IDamageable\n  └─ AActor (not indexed)\n");
    }
}
