//! End-to-end scenarios through the public session API.

use flowtrace::analysis::{ExitKind, RiskLevel};
use flowtrace::config::FlowtraceConfig;
use flowtrace::core::{Deadline, Direction};
use flowtrace::query::{build_session, Session, SourceFile, TraceOptions};
use indoc::indoc;
use std::path::PathBuf;

fn session(files: &[(&str, &str)]) -> Session {
    let files = files
        .iter()
        .map(|(path, content)| SourceFile {
            path: PathBuf::from(path),
            content: content.to_string(),
        })
        .collect();
    build_session(files, FlowtraceConfig::default(), &Deadline::unbounded()).unwrap()
}

fn forward(session: &Session, name: &str) -> Vec<String> {
    let report = session
        .trace(
            name,
            &TraceOptions {
                direction: Direction::Forward,
                max_depth: None,
            },
            &Deadline::unbounded(),
        )
        .unwrap();
    report
        .forward
        .unwrap()
        .entries
        .into_iter()
        .map(|e| e.name)
        .collect()
}

fn backward(session: &Session, name: &str) -> Vec<String> {
    let report = session
        .trace(
            name,
            &TraceOptions {
                direction: Direction::Backward,
                max_depth: None,
            },
            &Deadline::unbounded(),
        )
        .unwrap();
    report
        .backward
        .unwrap()
        .entries
        .into_iter()
        .map(|e| e.name)
        .collect()
}

#[test]
fn test_forward_chain_with_flow_path() {
    let session = session(&[(
        "app.py",
        "x = 1\ny = x * 2\nz = y + 5\nresult = z * 3\n",
    )]);
    let report = session
        .trace(
            "x",
            &TraceOptions {
                direction: Direction::Forward,
                max_depth: None,
            },
            &Deadline::unbounded(),
        )
        .unwrap();
    let forward = report.forward.unwrap();
    assert_eq!(forward.total_count, 3);
    let names: Vec<_> = forward.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["y", "z", "result"]);
    assert_eq!(forward.flow_paths, vec!["x -> y -> z -> result"]);
}

#[test]
fn test_chained_assignment_binds_independently() {
    let session = session(&[("app.py", "a = b = c = 10\n")]);
    assert!(backward(&session, "a").is_empty());
    assert!(backward(&session, "b").is_empty());
    assert!(backward(&session, "c").is_empty());
}

#[test]
fn test_interprocedural_backward_trace() {
    let session = session(&[(
        "app.py",
        indoc! {"
            def f(x):
                return x * 2
            result = f(5)
        "},
    )]);
    let names = backward(&session, "result");
    assert!(names.contains(&"x".to_string()), "parameter in {names:?}");
    assert!(
        names.iter().any(|n| n.starts_with("return of f")),
        "return node in {names:?}"
    );
}

#[test]
fn test_logging_terminal_is_a_single_side_effect() {
    let session = session(&[(
        "app.py",
        indoc! {"
            amount = 125
            logger.info(amount)
        "},
    )]);
    let report = session.impact("amount", &Deadline::unbounded()).unwrap();
    let by_kind = |kind: ExitKind| {
        report
            .exit_points
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    };
    assert_eq!(by_kind(ExitKind::SideEffect), 1);
    assert_eq!(by_kind(ExitKind::Return), 0);
    assert_eq!(by_kind(ExitKind::StateChange), 0);
    assert_eq!(report.risk, RiskLevel::Medium);
}

#[test]
fn test_type_change_chain_with_null_warning() {
    let session = session(&[(
        "app.py",
        indoc! {"
            v = None
            v = {}
            v = SomeType()
        "},
    )]);
    let evolution = session.type_evolution("v").unwrap();
    assert_eq!(evolution.chain(), "NoneType -> dict -> SomeType");
    assert!(evolution.events[0].nullable);
    assert!(evolution
        .warnings
        .iter()
        .any(|w| w.to_string().contains("may be null")));
}

#[test]
fn test_typescript_source_traces_like_python() {
    let session = session(&[(
        "app.ts",
        indoc! {"
            const base: number = 10;
            const doubled = base * 2;
            let final_value = doubled + 1;
        "},
    )]);
    assert_eq!(forward(&session, "base"), vec!["doubled", "final_value"]);
    assert_eq!(backward(&session, "final_value"), vec!["doubled", "base"]);
}

#[test]
fn test_mixed_language_batch() {
    let session = session(&[
        ("calc.py", "rate = 0.2\n"),
        ("app.js", "const price = 100;\nconst total = price * 2;\n"),
    ]);
    assert_eq!(session.files_analyzed, 2);
    assert_eq!(forward(&session, "price"), vec!["total"]);
    // Variables from the other file are reachable by name too.
    assert!(backward(&session, "rate").is_empty());
}

#[test]
fn test_calculation_path_reads_in_source_order() {
    let session = session(&[(
        "bill.py",
        indoc! {"
            price = 100
            qty = 3
            subtotal = price * qty
            tax = subtotal * 0.2
            total = subtotal + tax
        "},
    )]);
    let path = session.calculation("total", &Deadline::unbounded()).unwrap();
    let names: Vec<_> = path.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["price", "qty", "subtotal", "tax", "total"]);
}

#[test]
fn test_augmented_accumulation_in_loop() {
    let session = session(&[(
        "acc.py",
        indoc! {"
            total = 0
            for n in items:
                total += n
        "},
    )]);
    let names = backward(&session, "total");
    assert!(names.contains(&"n".to_string()));
    // The loop rebind shows up in the type report as a conditional write.
    let evolution = session.type_evolution("total").unwrap();
    assert!(evolution
        .warnings
        .iter()
        .any(|w| w.to_string().contains("loop or conditional")));
}

#[test]
fn test_depth_limited_linking_marks_truncation() {
    let mut config = FlowtraceConfig::default();
    config.limits.max_call_depth = 1;
    let files = vec![SourceFile {
        path: PathBuf::from("deep.py"),
        content: indoc! {"
            def inner(x):
                return x + 1
            def outer(x):
                return inner(x)
            out = outer(3)
        "}
        .to_string(),
    }];
    let session = build_session(files, config, &Deadline::unbounded()).unwrap();
    let report = session
        .trace(
            "out",
            &TraceOptions {
                direction: Direction::Backward,
                max_depth: None,
            },
            &Deadline::unbounded(),
        )
        .unwrap();
    assert!(report
        .warnings
        .iter()
        .any(|w| w.to_string().contains("truncated at depth limit")));
    let names: Vec<_> = report
        .backward
        .unwrap()
        .entries
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert!(names.iter().any(|n| n.contains("not expanded")));
}
