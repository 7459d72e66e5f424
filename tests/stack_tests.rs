use std::io::{self, Cursor};
use std::sync::Arc;

use ringcount::pipeline::{Pipeline, PipelineConfig};
use ringcount::reassembler::EventReassembler;
use ringcount::stack::{CallFrame, CallStackTracker};

fn frame(signature: &str) -> CallFrame {
    CallFrame {
        signature: signature.to_string(),
        arguments: String::new(),
        entered: None,
    }
}

fn run(log: &str) -> Pipeline {
    let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let events = EventReassembler::from_reader(Cursor::new(log.to_string()), Arc::clone(pipeline.pattern()));
    pipeline.run(events, &mut io::sink()).unwrap();
    pipeline
}

#[test]
fn test_nested_calls_drain_cleanly() {
    let pipeline = run("\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering A.foo()
2025-03-21 14:00:00,001 DEBUG T1 a.Svc:2 - Entering A.bar()
2025-03-21 14:00:00,002 DEBUG T1 a.Svc:3 - Exiting A.bar()=1
2025-03-21 14:00:00,003 DEBUG T1 a.Svc:4 - Exiting A.foo()=2
");
    let tracker = pipeline.tracker();
    assert_eq!(tracker.depth("T1"), 0);
    assert_eq!(tracker.stray_exits(), 0);
    assert_eq!(tracker.mismatches(), 0);
}

#[test]
fn test_reversed_exits_unwind_with_one_mismatch() {
    let pipeline = run("\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering A.foo()
2025-03-21 14:00:00,001 DEBUG T1 a.Svc:2 - Entering A.bar()
2025-03-21 14:00:00,002 DEBUG T1 a.Svc:3 - Exiting A.foo()=2
2025-03-21 14:00:00,003 DEBUG T1 a.Svc:4 - Exiting A.bar()=1
");
    let tracker = pipeline.tracker();
    assert_eq!(tracker.depth("T1"), 0);
    assert_eq!(tracker.mismatches(), 1);
    // bar was already popped by foo's exit
    assert_eq!(tracker.stray_exits(), 1);
}

#[test]
fn test_threads_have_separate_stacks() {
    let pipeline = run("\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering run()
2025-03-21 14:00:00,001 DEBUG T2 a.Svc:1 - Entering run()
2025-03-21 14:00:00,002 DEBUG T2 a.Svc:1 - Entering step(n = 1)
2025-03-21 14:00:00,003 DEBUG T1 a.Svc:2 - Exiting run = ok
");
    let tracker = pipeline.tracker();
    assert_eq!(tracker.depth("T1"), 0);
    let snapshot = tracker.snapshot("T2");
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].signature, "a.Svc:run");
    assert_eq!(snapshot[1].signature, "a.Svc:step");
    assert_eq!(snapshot[1].arguments, "\tn          : 1");
}

#[test]
fn test_throwing_unwinds_like_exiting() {
    let pipeline = run("\
2025-03-21 14:00:00,000 DEBUG T1 a.Svc:1 - Entering save()
2025-03-21 14:00:00,001 ERROR T1 a.Svc:2 - Throwing save - java.io.IOException: disk full
");
    assert_eq!(pipeline.tracker().depth("T1"), 0);
    assert_eq!(pipeline.tracker().stray_exits(), 0);
}

#[test]
fn test_stray_exit_on_empty_stack_is_ignored() {
    let mut tracker = CallStackTracker::new();
    let unwind = tracker.exit("main", "a.B:run");
    assert!(unwind.popped.is_empty());
    assert!(!unwind.matched);
    assert_eq!(tracker.stray_exits(), 1);
}

#[test]
fn test_unwind_without_match_empties_the_stack() {
    let mut tracker = CallStackTracker::new();
    tracker.enter("main", frame("a.B:one"));
    tracker.enter("main", frame("a.B:two"));
    let unwind = tracker.exit("main", "a.B:three");
    assert!(!unwind.matched);
    assert_eq!(unwind.popped.len(), 2);
    assert_eq!(unwind.popped[0].signature, "a.B:two");
    assert_eq!(tracker.depth("main"), 0);
    assert_eq!(tracker.mismatches(), 2);
}
