use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{join_or_dash, print_json, run_query, OutputFormat};
use uegraph::index::{ClassRecord, MethodRecord, PropertyRecord};
use uegraph::index::roots::SearchScope;
use uegraph::indexer::Analyzer;

pub async fn show_class(
    analyzer: &Arc<Analyzer>,
    name: String,
    path: Option<PathBuf>,
    scope: Option<SearchScope>,
    format: OutputFormat,
) -> Result<()> {
    let message = format!("Looking up {}", name);
    let record = run_query(analyzer, &message, move |a| a.analyze_class(&name, path.as_deref(), scope)).await?;

    match format {
        OutputFormat::Json => print_json(record.as_ref()),
        OutputFormat::Text => {
            print_class(&record);
            Ok(())
        }
    }
}

fn print_class(record: &ClassRecord) {
    println!("{} ({}) at {}:{}", record.name, record.kind.as_str(), record.file.display(), record.line);
    for comment in &record.comments {
        println!("  {}", comment);
    }
    println!("  Superclasses: {}", join_or_dash(&record.superclasses));
    println!("  Interfaces:   {}", join_or_dash(&record.interfaces));
    if record.is_exposed {
        println!("  Reflected:    ({})", record.exposure_specifiers.join(", "));
    }

    println!("\n  Methods ({}):", record.methods.len());
    for method in &record.methods {
        println!("    {}", method_signature(method));
    }

    println!("\n  Properties ({}):", record.properties.len());
    for property in &record.properties {
        println!("    {}", property_line(property));
    }
}

fn method_signature(method: &MethodRecord) -> String {
    let params: Vec<String> = method
        .parameters
        .iter()
        .map(|p| match &p.default_value {
            Some(default) => format!("{} {} = {}", p.type_name, p.name, default),
            None => format!("{} {}", p.type_name, p.name),
        })
        .collect();

    let mut line = format!("{:<9} ", method.visibility.as_str());
    if method.is_static {
        line.push_str("static ");
    }
    if method.is_virtual {
        line.push_str("virtual ");
    }
    if !method.return_type.is_empty() {
        line.push_str(&method.return_type);
        line.push(' ');
    }
    line.push_str(&format!("{}({})", method.name, params.join(", ")));
    if method.is_const {
        line.push_str(" const");
    }
    if method.is_override {
        line.push_str(" override");
    }
    line.push_str(&format!("  :{}", method.line));
    line
}

fn property_line(property: &PropertyRecord) -> String {
    let mut line = format!("{:<9} ", property.visibility.as_str());
    if property.is_static {
        line.push_str("static ");
    }
    line.push_str(&format!("{} {}  :{}", property.type_name, property.name, property.line));
    if property.is_exposed {
        line.push_str(&format!("  [UPROPERTY({})]", property.exposure_specifiers.join(", ")));
    }
    line
}
