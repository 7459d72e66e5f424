use std::io::{self, Cursor};
use std::sync::Arc;

use ringcount::analyzer::{
    Analyzer, DedupFilter, ErrorSummary, IndentFormatter, MethodCallSummary, MethodIsolation, Probe,
    Target, Timeline, Timer, TokenFilter, Trender,
};
use ringcount::analyzer::TraceEvent;
use ringcount::formatter::Summary;
use ringcount::layout::{CompiledPattern, DEFAULT_LAYOUT};
use ringcount::pipeline::{Pipeline, PipelineConfig, RunStats};
use ringcount::reassembler::EventReassembler;
use ringcount::stack::CallStackTracker;
use serde_json::json;

fn run_with(config: PipelineConfig, analyzer: Box<dyn Analyzer>, log: &str) -> (Summary, RunStats) {
    let mut pipeline = Pipeline::new(config).unwrap();
    pipeline.add_analyzer(analyzer);
    let events = EventReassembler::from_reader(Cursor::new(log.to_string()), Arc::clone(pipeline.pattern()));
    let stats = pipeline.run(events, &mut io::sink()).unwrap();
    let (_, summary) = pipeline.summaries().remove(0);
    (summary, stats)
}

fn run(analyzer: Box<dyn Analyzer>, log: &str) -> Summary {
    run_with(PipelineConfig::default(), analyzer, log).0
}

fn text(summary: Summary) -> String {
    match summary {
        Summary::Text(text) => text,
        other => panic!("expected text, got {:?}", other),
    }
}

fn table(summary: Summary) -> (Vec<String>, Vec<Vec<serde_json::Value>>) {
    match summary {
        Summary::Table { headers, rows } => (headers, rows),
        other => panic!("expected table, got {:?}", other),
    }
}

const TIMED: &str = "\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering X()
2025-03-21 14:00:00,100 DEBUG T1 a.Svc:2 - Exiting X = 1
2025-03-21 14:00:01,000 DEBUG T1 a.Svc:1 - Entering X()
2025-03-21 14:00:01,300 DEBUG T1 a.Svc:2 - Exiting X = 2
2025-03-21 14:00:02,000 DEBUG T2 a.Svc:1 - Entering X()
2025-03-21 14:00:02,050 DEBUG T2 a.Svc:2 - Exiting X = 3
";

#[test]
fn test_timer_statistics() {
    // drive the analyzer by hand to inspect its timers
    let mut timer = Timer::new();
    let stacks = CallStackTracker::new();
    let pattern = Arc::new(CompiledPattern::compile(DEFAULT_LAYOUT).unwrap());
    for event in EventReassembler::from_reader(Cursor::new(TIMED.to_string()), pattern) {
        let event = TraceEvent::parse(event.unwrap()).unwrap();
        assert!(timer.consume(&event, &stacks));
    }

    let stats = timer.get("T1", "a.Svc:X").unwrap().stats();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.min, 100);
    assert_eq!(stats.max, 300);
    assert_eq!(stats.mean, 200.0);
    assert_eq!(stats.total, 400);
    assert_eq!(timer.get("T2", "a.Svc:X").unwrap().order, 2);
}

#[test]
fn test_timer_with_weekday_layout() {
    let log = "\
Mon 10:00:00 DEBUG main - Entering run()
Mon 10:00:01 DEBUG main - Exiting run = ok
";
    let config = PipelineConfig {
        layout: "%d{EEE HH:mm:ss} %p %t - %m%n".to_string(),
        ..PipelineConfig::default()
    };
    let (_, rows) = table(run_with(config, Box::new(Timer::new()), log).0);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], json!("?:run"));
    assert_eq!(rows[0][4], json!(1000));
}

#[test]
fn test_timer_table() {
    let (headers, rows) = table(run(Box::new(Timer::new()), TIMED));
    assert_eq!(
        headers,
        vec!["thread", "method", "order", "calls", "shortest", "longest", "average", "total"]
    );
    assert_eq!(
        rows[0],
        vec![json!("T1"), json!("a.Svc:X"), json!(1), json!(2), json!(100), json!(300), json!(200.0), json!(400)]
    );
    assert_eq!(rows[1][0], json!("T2"));
}

#[test]
fn test_trender_fills_gaps() {
    let log = "\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering X()
2025-03-21 14:00:05,000 DEBUG T1 a.Svc:2 - Exiting X = 1
2025-03-21 14:00:06,000 DEBUG T1 a.Svc:1 - Entering Y()
2025-03-21 14:00:31,000 DEBUG T1 a.Svc:2 - Exiting Y = 1
2025-03-21 14:00:32,000 DEBUG T1 a.Svc:1 - Entering X()
2025-03-21 14:00:33,000 DEBUG T1 a.Svc:2 - Exiting X = 1
";
    let (headers, rows) = table(run(Box::new(Trender::new(10_000)), log));
    assert_eq!(
        headers,
        vec!["method", "2025-03-21 14:00:00", "2025-03-21 14:00:10", "2025-03-21 14:00:20", "2025-03-21 14:00:30"]
    );
    assert_eq!(rows[0], vec![json!("a.Svc:X"), json!(1), json!(0), json!(0), json!(1)]);
    assert_eq!(rows[1], vec![json!("a.Svc:Y"), json!(0), json!(0), json!(0), json!(1)]);
}

#[test]
fn test_trender_without_exits() {
    let (headers, rows) = table(run(Box::new(Trender::default()), "2025-03-21 14:00:00,000 INFO T1 a.Svc:1 - hi\n"));
    assert_eq!(headers, vec!["method"]);
    assert!(rows.is_empty());
}

#[test]
fn test_error_summary_shows_stack() {
    let log = "\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering run(id = 7)
2025-03-21 14:00:00,001 ERROR T1 a.Svc:2 - lookup failed
java.lang.IllegalStateException: closed
2025-03-21 14:00:00,002 DEBUG T1 a.Svc:3 - Exiting run = null
";
    let summary = text(run(Box::new(ErrorSummary::new()), log));
    assert!(summary.starts_with("a.Svc:run (\n\tid         : 7 )\n\n"));
    assert!(summary.contains("ERROR T1 a.Svc:2 - lookup failed\njava.lang.IllegalStateException: closed"));
    assert!(summary.contains("----------------------------------------------------"));
    assert!(!summary.contains("Exiting run"));
}

#[test]
fn test_error_summary_restores_thrown_frames() {
    let log = "\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering outer()
2025-03-21 14:00:00,001 DEBUG T1 a.Svc:2 - Entering save()
2025-03-21 14:00:00,002 DEBUG T1 a.Svc:3 - Throwing save - java.io.IOException: disk full
";
    let summary = text(run(Box::new(ErrorSummary::new()), log));
    let outer = summary.find("a.Svc:outer (").unwrap();
    let save = summary.find("a.Svc:save (").unwrap();
    let thrown = summary.find("Throwing save").unwrap();
    assert!(outer < save && save < thrown);
}

#[test]
fn test_isolation_keeps_events_beneath_target() {
    let log = "\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - before
2025-03-21 14:00:00,001 DEBUG T1 a.Svc:2 - Entering refresh()
2025-03-21 14:00:00,002 DEBUG T1 b.Dao:3 - Entering load()
2025-03-21 14:00:00,003  INFO T2 b.Dao:4 - other thread
2025-03-21 14:00:00,004 DEBUG T1 b.Dao:5 - Exiting load = x
2025-03-21 14:00:00,005 DEBUG T1 a.Svc:6 - Exiting refresh = ok
2025-03-21 14:00:00,006 DEBUG T1 a.Svc:7 - after
";
    let target = Target::new(Some("a.Svc".to_string()), "refresh");
    let kept = text(run(Box::new(MethodIsolation::new(target)), log));
    let lines: Vec<&str> = kept.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with("Entering refresh()"));
    assert!(lines[3].ends_with("Exiting refresh = ok"));
    assert!(!kept.contains("other thread"));
    assert!(!kept.contains("before"));
}

#[test]
fn test_method_call_summary() {
    let log = "\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering outer()
2025-03-21 14:00:00,001 DEBUG T1 b.Dao:2 - Entering load(id = 4, cache = true)
2025-03-21 14:00:00,002 DEBUG T1 b.Dao:3 - Exiting load = Link[4]
2025-03-21 14:00:00,003 DEBUG T1 a.Svc:4 - Exiting outer = ok
";
    let summary = text(run(Box::new(MethodCallSummary::new(Target::new(None, "load"))), log));
    assert!(summary.starts_with("a.Svc:outer ( )\n\nb.Dao:load (\n\tid         : 4\n\tcache      : true )\n\n"));
    assert!(summary.contains("Entering load(id = 4, cache = true)\n\n"));
    assert!(summary.contains("Exiting load = Link[4]\n\n---"));
    assert!(!summary.contains("Exiting outer"));
}

#[test]
fn test_dedup_drops_consecutive_repeats_only() {
    let log = "\
2025-03-21 14:00:00,000  INFO T1 a.Svc:1 - tick
2025-03-21 14:00:00,000  INFO T1 a.Svc:1 - tick
2025-03-21 14:00:00,000  INFO T2 a.Svc:1 - tick
2025-03-21 14:00:00,000  INFO T1 a.Svc:1 - tick
";
    let kept = text(run(Box::new(DedupFilter::new()), log));
    assert_eq!(kept.lines().count(), 3);
}

#[test]
fn test_token_filter_include_and_exclude() {
    let log = "\
2025-03-21 14:00:00,000  INFO T1 a.Svc:1 - one
2025-03-21 14:00:00,001  WARN T1 a.Svc:2 - two
2025-03-21 14:00:00,002 ERROR T2 a.Svc:3 - three
";
    let filters = || {
        vec![
            TokenFilter::parse_filter("p=WARN").unwrap(),
            TokenFilter::parse_filter("thread=T2").unwrap(),
        ]
    };

    let kept = text(run(Box::new(TokenFilter::new(filters(), false)), log));
    assert!(kept.contains("two") && kept.contains("three"));
    assert!(!kept.contains("one"));

    let kept = text(run(Box::new(TokenFilter::new(filters(), true)), log));
    assert_eq!(kept.lines().count(), 1);
    assert!(kept.contains("one"));
}

#[test]
fn test_indent_by_depth() {
    let log = "\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering run()
2025-03-21 14:00:00,001  INFO T1 a.Svc:2 - working
2025-03-21 14:00:00,002 DEBUG T1 a.Svc:3 - Exiting run = ok
";
    let indented = text(run(Box::new(IndentFormatter::new()), log));
    let lines: Vec<&str> = indented.lines().collect();
    assert!(lines[0].starts_with("   2025"));
    assert!(lines[1].starts_with("   2025"));
    assert!(lines[2].starts_with("   2025"));
    assert!(!lines[2].starts_with("      "));
}

#[test]
fn test_timeline_sorts_by_raw_timestamp() {
    let log = "\
2025-03-21 14:00:02,000  INFO T1 a.Svc:1 - second
2025-03-21 14:00:01,000  INFO T2 a.Svc:1 - first
2025-03-21 14:00:02,000  INFO T3 a.Svc:1 - third
";
    let config = PipelineConfig {
        correct_dates: false,
        ..PipelineConfig::default()
    };
    let ordered = text(run_with(config, Box::new(Timeline::new()), log).0);
    let lines: Vec<&str> = ordered.lines().collect();
    assert!(lines[0].ends_with("first"));
    assert!(lines[1].ends_with("second"));
    assert!(lines[2].ends_with("third"));
}

#[test]
fn test_probe_halts_after_five_events() {
    let log: String = (0..8)
        .map(|i| format!("2025-03-21 14:00:0{},000  INFO T1 a.Svc:1 - Entering step{}()\n", i, i))
        .collect();
    let (summary, stats) = run_with(PipelineConfig::default(), Box::new(Probe::new()), &log);
    assert!(stats.halted);
    assert_eq!(stats.events, 5);
    let (headers, rows) = table(summary);
    assert_eq!(headers, vec!["date", "thread", "category", "method", "message"]);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0][0], json!("2025-03-21 14:00:00.000"));
    assert_eq!(rows[0][3], json!("a.Svc:step0"));
}

#[test]
fn test_fast_mode_truncates_before_analysis() {
    let log = "\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering run(payload = aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa)
2025-03-21 14:00:00,001 ERROR T1 a.Svc:2 - boom bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb
2025-03-21 14:00:00,002 DEBUG T1 a.Svc:3 - Exiting run = ok
";
    let config = PipelineConfig {
        fast_limit: Some(70),
        ..PipelineConfig::default()
    };
    let summary = text(run_with(config, Box::new(ErrorSummary::new()), log).0);
    assert!(summary.contains("- boom bbbb"));
    assert!(!summary.contains(&"b".repeat(40)));
}
