//! End-to-end scenario coverage, one test per literal input/expected-output
//! pair plus the ambient-stack behaviours implementation relies on: parsing
//! a whole source string through `Interpreter::run_source` and inspecting
//! the resulting `Value`/`NemoError`.

use nemo::{
    error::{ErrorKind, NemoError},
    value::{Integer, Value},
    Interpreter,
};
use pretty_assertions::assert_eq;

fn run(source: &str) -> Result<Value, NemoError> {
    Interpreter::bootstrapped().run_source(source)
}

fn print(interp: &mut Interpreter, value: &Value) -> String {
    nemo::primitives::print_string(interp, value).expect("printString of a plain value never fails")
}

// ============================================================================
// S1-S6: literal scenarios
// ============================================================================

#[test]
fn s1_arithmetic() {
    let value = run("3 + 4.").unwrap();
    assert!(matches!(value, Value::Integer(Integer::Small(7))));
}

#[test]
fn s2_class_definition_and_method() {
    let source = r#"
        Point := Object derive: #(x y).
        Point>>sum [ ^ x + y ]
        p := Point new.
        p at: #x put: 3.
        p at: #y put: 4.
        p sum.
    "#;
    let value = run(source).unwrap();
    assert!(matches!(value, Value::Integer(Integer::Small(7))));
}

#[test]
fn s3_non_local_return() {
    let source = r#"
        Finder := Object derive.
        Finder>>findIn: arr [ arr do: [:e | (e > 10) ifTrue: [^ e]]. ^ nil ]
        (Finder new) findIn: #(3 7 15 22).
    "#;
    let value = run(source).unwrap();
    assert!(matches!(value, Value::Integer(Integer::Small(15))));
}

#[test]
fn s4_handler_resume() {
    let source = "[ 10 / 0 ] on: DivisionByZero do: [:ex | ex resume: 99 ].";
    let value = run(source).unwrap();
    assert!(matches!(value, Value::Integer(Integer::Small(99))));
}

#[test]
fn s5_multiple_inheritance_conflict_is_ambiguous() {
    let source = r#"
        A := Object derive. A>>x [^1]
        B := Object derive. B>>x [^2]
        C := A derive. C addParent: B.
        (C new) x.
    "#;
    let err = run(source).unwrap_err();
    match err {
        NemoError::Unhandled { kind, .. } => assert_eq!(kind, ErrorKind::AmbiguousMethod),
        other => panic!("expected an unhandled AmbiguousMethod signal, got {other:?}"),
    }
}

#[test]
fn s6_green_thread_fairness() {
    let source = r#"
        Counter := 0.
        Worker := Object derive.
        Worker>>run [
            1 to: 100 do: [:i | Counter := Counter + 1. Processor yield ]
        ]
        Processor fork: [ Worker new run ].
        Processor fork: [ Worker new run ].
        Counter.
    "#;
    // The top-level's final statement, `Counter.`, reads the shared global
    // before either forked process has run a single quantum (the top-level
    // sequence finishes before the scheduler drain starts), so it's always
    // 0; the scheduler only drains the two forks after `run_program`
    // evaluates the sequence. Re-read the global once the source finishes.
    let mut interp = Interpreter::bootstrapped();
    interp.run_source(source).unwrap();
    let counter = interp.globals.get("Counter").expect("Counter is a global");
    assert!(matches!(counter, Value::Integer(Integer::Small(200))));
}

// ============================================================================
// Boundary behaviours
// ============================================================================

#[test]
fn array_index_zero_is_out_of_bounds() {
    let err = run("#(1 2 3) at: 0.").unwrap_err();
    match err {
        NemoError::Unhandled { kind, .. } => assert_eq!(kind, ErrorKind::SubscriptOutOfBounds),
        other => panic!("expected SubscriptOutOfBounds, got {other:?}"),
    }
}

#[test]
fn array_index_past_size_is_out_of_bounds() {
    let err = run("#(1 2 3) at: 4.").unwrap_err();
    match err {
        NemoError::Unhandled { kind, .. } => assert_eq!(kind, ErrorKind::SubscriptOutOfBounds),
        other => panic!("expected SubscriptOutOfBounds, got {other:?}"),
    }
}

#[test]
fn integer_overflow_promotes_to_big_integer() {
    let mut interp = Interpreter::bootstrapped();
    let value = interp.run_source("9223372036854775807 + 1.").unwrap();
    assert!(matches!(value, Value::Integer(Integer::Big(_))));
    assert_eq!(print(&mut interp, &value), "9223372036854775808");
}

#[test]
fn empty_array_do_performs_zero_iterations() {
    let source = r#"
        Count := 0.
        #() do: [:e | Count := Count + 1 ].
        Count.
    "#;
    let value = run(source).unwrap();
    assert!(matches!(value, Value::Integer(Integer::Small(0))));
}

#[test]
fn empty_block_value_returns_nil() {
    let value = run("[] value.").unwrap();
    assert!(value.is_nil());
}

// ============================================================================
// Ambient stack: reflection, cascades, exceptions
// ============================================================================

#[test]
fn respond_to_reflects_the_merged_method_table() {
    let value = run("3 respondsTo: #+.").unwrap();
    assert!(matches!(value, Value::Boolean(true)));
    let value = run("3 respondsTo: #frobnicate.").unwrap();
    assert!(matches!(value, Value::Boolean(false)));
}

#[test]
fn cascade_sends_every_message_to_the_same_receiver() {
    let mut interp = Interpreter::bootstrapped();
    let arr = interp.run_source("a := Array new. a add: 1; add: 2; add: 3. a.").unwrap();
    assert_eq!(print(&mut interp, &arr), "(#(1 2 3))");
}

#[test]
fn ensure_runs_cleanup_on_both_normal_and_signalled_exit() {
    let normal = run(r#"
        Ran := 0.
        [ 1 + 1 ] ensure: [ Ran := 1 ].
        Ran.
    "#)
    .unwrap();
    assert!(matches!(normal, Value::Integer(Integer::Small(1))));

    let mut interp = Interpreter::bootstrapped();
    let result = interp.run_source(
        r#"
            Ran := 0.
            [[ 1 / 0 ] ensure: [ Ran := 1 ]] on: DivisionByZero do: [:ex | ex resume: 0 ].
            Ran.
        "#,
    );
    let value = result.unwrap();
    assert!(matches!(value, Value::Integer(Integer::Small(1))));
}

#[test]
fn while_true_loops_until_condition_is_false() {
    let source = r#"
        I := 0.
        [ I < 5 ] whileTrue: [ I := I + 1 ].
        I.
    "#;
    let value = run(source).unwrap();
    assert!(matches!(value, Value::Integer(Integer::Small(5))));
}

#[test]
fn table_at_put_and_keys_round_trip() {
    let mut interp = Interpreter::bootstrapped();
    let value = interp.run_source("t := #{}. t at: #a put: 1. t at: #b put: 2. t.").unwrap();
    assert_eq!(print(&mut interp, &value), "#{a -> 1. b -> 2}");
}
