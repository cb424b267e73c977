use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::path::Path;
use tempfile::TempDir;

use uegraph::config::{Config, SourcesConfig};
use uegraph::indexer::parser::CppParser;
use uegraph::query::{QueryMode, SearchRequest};
use uegraph::Analyzer;

fn sample_header(index: usize) -> String {
    format!(
        r#"#pragma once

#include "CoreMinimal.h"
#include "Sample{index}.generated.h"

UCLASS(Blueprintable, BlueprintType)
class SAMPLE_API ASample{index} : public AActor, public IDamageable
{{
    GENERATED_BODY()

public:
    ASample{index}();

    UFUNCTION(BlueprintCallable, Category = "Sample")
    float GetHealth() const;

    UFUNCTION(Server, Reliable)
    void ServerApplyDamage(float Amount, AActor* Instigator = nullptr);

    virtual void Tick(float DeltaSeconds) override;

protected:
    UPROPERTY(EditAnywhere, BlueprintReadWrite, meta = (ClampMin = "0", ClampMax = "100"))
    float Health = 100.f;

    UPROPERTY(Replicated)
    int32 Armor;

private:
    TArray<TObjectPtr<UActorComponent>> Components;
}};
"#
    )
}

fn sample_tree(files: usize) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let source = dir.path().join("Source/Sample");
    std::fs::create_dir_all(&source).expect("source dir");
    for i in 0..files {
        std::fs::write(source.join(format!("Sample{i}.h")), sample_header(i)).expect("write header");
    }
    dir
}

fn analyzer_for(root: &Path, cache: bool) -> Analyzer {
    let mut config = Config::default();
    config.cache.enabled = cache;
    config.sources = SourcesConfig {
        project_source: Some(root.join("Source")),
        auto_detect: false,
        ..Default::default()
    };
    Analyzer::new(config, root).expect("analyzer")
}

fn bench_extraction(c: &mut Criterion) {
    let parser = CppParser::new().expect("parser");
    let source = (0..20).map(sample_header).collect::<Vec<_>>().join("\n");

    let mut group = c.benchmark_group("extraction");
    group.bench_function("mask_macros", |b| b.iter(|| black_box(parser.mask_macros(&source))));
    group.bench_function("parse_and_extract", |b| {
        b.iter_batched(
            || source.clone(),
            |src| black_box(parser.parse_file(Path::new("Bench.h"), src).expect("parse")),
            BatchSize::SmallInput,
        )
    });
    group.bench_function("detect_annotations", |b| b.iter(|| black_box(parser.scanner().detect(&source))));
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let tree = sample_tree(200);
    let analyzer = analyzer_for(tree.path(), true);

    let mut group = c.benchmark_group("queries");
    group.bench_function("search_tokens", |b| {
        let request = SearchRequest::new("Health Armor").mode(QueryMode::Tokens);
        b.iter(|| black_box(analyzer.search_code(&request).expect("search")))
    });
    group.bench_function("search_regex", |b| {
        let request = SearchRequest::new(r"UFUNCTION\(.*Server").mode(QueryMode::Regex);
        b.iter(|| black_box(analyzer.search_code(&request).expect("search")))
    });
    group.bench_function("class_cached", |b| {
        analyzer.analyze_class("ASample150", None, None).expect("warm cache");
        b.iter(|| black_box(analyzer.analyze_class("ASample150", None, None).expect("class")))
    });
    group.bench_function("class_cold", |b| {
        b.iter_batched(
            || analyzer_for(tree.path(), false),
            |cold| black_box(cold.analyze_class("ASample150", None, None).expect("class")),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_extraction, bench_queries);
criterion_main!(benches);
