use std::hint::black_box;
use std::io::Write;

use ai_session_sync::models::{AgentType, ProjectInfo};
use ai_session_sync::parsers::{parse_claude_session, parse_codex_session};
use ai_session_sync::sync::{SourceProjects, merge_projects};
use chrono::Utc;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tempfile::NamedTempFile;

/// Generate a synthetic Claude Code session with N user/assistant events
fn generate_claude_session(num_events: usize) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".jsonl").unwrap();

    for i in 0..num_events {
        let (kind, content) = if i % 2 == 0 {
            ("user", format!(r#""Test prompt {}""#, i))
        } else {
            ("assistant", format!(r#"[{{"type":"text","text":"Response {}"}},{{"type":"tool_use","id":"t{}","name":"Read","input":{{}}}}]"#, i, i))
        };
        let event = format!(
            r#"{{"type":"{kind}","message":{{"role":"{kind}","content":{content}}},"timestamp":"2026-01-{:02}T12:00:00Z","cwd":"/repo/app"}}"#,
            (i % 28) + 1
        );
        writeln!(file, "{}", event).unwrap();
    }

    file.flush().unwrap();
    file
}

/// Generate a synthetic Codex rollout with N message items
fn generate_codex_rollout(num_items: usize) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".jsonl").unwrap();
    writeln!(
        file,
        r#"{{"timestamp":"2026-01-06T12:00:00Z","type":"session_meta","payload":{{"id":"bench","cwd":"/repo/app"}}}}"#
    )
    .unwrap();

    for i in 0..num_items {
        let (role, part) = if i % 2 == 0 { ("user", "input_text") } else { ("assistant", "output_text") };
        writeln!(
            file,
            r#"{{"timestamp":"2026-01-06T12:00:01Z","type":"response_item","payload":{{"type":"message","role":"{role}","content":[{{"type":"{part}","text":"Item {i}"}}]}}}}"#
        )
        .unwrap();
    }

    file.flush().unwrap();
    file
}

fn bench_parse_claude(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_claude_session");

    for size in [100, 1_000, 10_000].iter() {
        let file = generate_claude_session(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| parse_claude_session(black_box(file.path())).unwrap());
        });
    }

    group.finish();
}

fn bench_parse_codex(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_codex_session");

    for size in [100, 1_000, 10_000].iter() {
        let file = generate_codex_rollout(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| parse_codex_session(black_box(file.path())).unwrap());
        });
    }

    group.finish();
}

fn bench_merge_projects(c: &mut Criterion) {
    let now = Utc::now();
    let sources: Vec<SourceProjects> = AgentType::ALL
        .iter()
        .map(|agent| SourceProjects {
            agent_type: *agent,
            projects: (0..1_000)
                .map(|i| {
                    let mut project = ProjectInfo::new(format!("p{}", i), format!("/repo/p{}", i), now);
                    *project.session_count_mut(*agent) = 3;
                    project
                })
                .collect(),
        })
        .collect();

    c.bench_function("merge_projects_4x1000", |b| {
        b.iter(|| merge_projects(black_box(&sources)));
    });
}

criterion_group!(benches, bench_parse_claude, bench_parse_codex, bench_merge_projects);
criterion_main!(benches);
