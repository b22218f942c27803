//! End-to-end tests: source text through the parser and the stepping
//! evaluator, checking the program's completion value and resulting
//! global state.

extern crate jstep;

use jstep::parser::JsParser;
use jstep::runner::api::Interpreter;
use jstep::runner::ds::value::{JsNumberType, JsValue};
use jstep::runner::eval::types::CompletionType;

/// Owned projection of a value, so helpers can return results that do not
/// borrow the (local) program AST.
#[derive(Debug, PartialEq)]
enum V {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object,
    Function,
}

fn simplify(value: &JsValue) -> V {
    match value {
        JsValue::Undefined => V::Undefined,
        JsValue::Null => V::Null,
        JsValue::Boolean(b) => V::Bool(*b),
        JsValue::Number(JsNumberType::Integer(i)) => V::Int(*i),
        JsValue::Number(JsNumberType::Float(f)) => V::Float(*f),
        JsValue::Number(JsNumberType::NaN) => V::Float(f64::NAN),
        JsValue::Number(JsNumberType::PositiveInfinity) => V::Float(f64::INFINITY),
        JsValue::Number(JsNumberType::NegativeInfinity) => V::Float(f64::NEG_INFINITY),
        JsValue::String(s) => V::Str(s.clone()),
        JsValue::Object(_) => V::Object,
        JsValue::Function(_) => V::Function,
    }
}

fn run(code: &str) -> (CompletionType, V) {
    let program = JsParser::parse_to_ast_from_str(code).unwrap();
    let interpreter = Interpreter::new();
    let completion = interpreter.run(&program);
    (completion.completion_type, simplify(&completion.get_value()))
}

fn run_global(code: &str, name: &str) -> V {
    let program = JsParser::parse_to_ast_from_str(code).unwrap();
    let interpreter = Interpreter::new();
    let completion = interpreter.run(&program);
    assert_eq!(
        completion.completion_type,
        CompletionType::Normal,
        "program completed abruptly: {:?}",
        completion
    );
    simplify(&interpreter.get_global(name))
}

// ============================================================================
// Core scenarios
// ============================================================================

#[test]
fn test_while_loop_counts_to_three() {
    assert_eq!(
        run("var x = 0; while (x < 3) x = x + 1; x"),
        (CompletionType::Normal, V::Int(3))
    );
}

#[test]
fn test_labeled_break_exits_outer_loop() {
    let code = "
        var n = 0;
        outer: while (true) {
            while (true) {
                n = n + 1;
                break outer;
            }
            n = 99;
        }
        n
    ";
    assert_eq!(run(code), (CompletionType::Normal, V::Int(1)));
}

#[test]
fn test_function_call_adds_arguments() {
    assert_eq!(
        run("function f(a, b) { return a + b; } f(2, 3)"),
        (CompletionType::Normal, V::Int(5))
    );
}

#[test]
fn test_finalizer_normal_value_is_discarded() {
    assert_eq!(
        run("try { throw 42; } catch (e) { e + 1; } finally { 99; }"),
        (CompletionType::Normal, V::Int(43))
    );
}

#[test]
fn test_finalizer_throw_supersedes_pending_throw() {
    assert_eq!(
        run("try { throw 1; } catch (e) { throw e + 1; } finally { throw 99; }"),
        (CompletionType::Throw, V::Int(99))
    );
}

#[test]
fn test_object_property_read_modify_write() {
    assert_eq!(
        run("var o = {a: 1, b: 2}; o.a = o.a + o.b; o.a"),
        (CompletionType::Normal, V::Int(3))
    );
}

// ============================================================================
// Boundary behaviours
// ============================================================================

#[test]
fn test_empty_program() {
    assert_eq!(run(""), (CompletionType::Normal, V::Undefined));
}

#[test]
fn test_empty_block_completes_normal_undefined() {
    assert_eq!(run("{}"), (CompletionType::Normal, V::Undefined));
}

#[test]
fn test_false_while_never_runs_body() {
    assert_eq!(
        run_global("var ran = false; while (false) { ran = true; }", "ran"),
        V::Bool(false)
    );
    assert_eq!(
        run("while (false) { 1; }"),
        (CompletionType::Normal, V::Undefined)
    );
}

#[test]
fn test_unlabelled_break_stops_innermost_loop_only() {
    let code = "
        var inner = 0;
        var outer = 0;
        var i = 0;
        while (i < 3) {
            i = i + 1;
            while (true) {
                inner = inner + 1;
                break;
            }
            outer = outer + 1;
        }
    ";
    assert_eq!(run_global(code, "inner"), V::Int(3));
    assert_eq!(run_global(code, "outer"), V::Int(3));
}

#[test]
fn test_break_in_finally_supersedes_pending_throw() {
    let code = "
        var r = 0;
        loop: while (true) {
            try {
                throw 1;
            } finally {
                break loop;
            }
            r = 9;
        }
        r
    ";
    assert_eq!(run(code), (CompletionType::Normal, V::Int(0)));
}

#[test]
fn test_double_negation_is_to_boolean() {
    assert_eq!(run("!!5"), (CompletionType::Normal, V::Bool(true)));
    assert_eq!(run("!!''"), (CompletionType::Normal, V::Bool(false)));
    assert_eq!(run("!!0"), (CompletionType::Normal, V::Bool(false)));
    assert_eq!(run("!!{}"), (CompletionType::Normal, V::Bool(true)));
}

#[test]
fn test_self_assignment_is_a_noop() {
    assert_eq!(
        run("var x = 5; x = x; x"),
        (CompletionType::Normal, V::Int(5))
    );
}

#[test]
fn test_catch_completes_with_thrown_value() {
    assert_eq!(
        run("try { throw 42; } catch (e) { e; }"),
        (CompletionType::Normal, V::Int(42))
    );
}

// ============================================================================
// Evaluation order
// ============================================================================

#[test]
fn test_arguments_evaluate_left_to_right() {
    let code = "
        var log = '';
        function g() { log = log + 'g'; return 1; }
        function h() { log = log + 'h'; return 2; }
        function f(a, b) { return a + b; }
        var r = f(g(), h());
        log + r
    ";
    assert_eq!(run(code), (CompletionType::Normal, V::Str("gh3".to_string())));
}

#[test]
fn test_assignment_base_evaluates_before_right_side() {
    let code = "
        var log = '';
        var o = {b: 0};
        function base() { log = log + 'a'; return o; }
        function c() { log = log + 'c'; return 5; }
        base().b = c();
    ";
    assert_eq!(run_global(code, "log"), V::Str("ac".to_string()));
}

// ============================================================================
// Operators and assignment
// ============================================================================

#[test]
fn test_modulo_compound_assignment() {
    assert_eq!(
        run("var a = 7; a %= 3; a"),
        (CompletionType::Normal, V::Int(1))
    );
}

#[test]
fn test_arithmetic_compound_assignments() {
    assert_eq!(
        run("var a = 5; a += 2; a -= 1; a *= 3; a"),
        (CompletionType::Normal, V::Int(18))
    );
    assert_eq!(
        run("var a = 7; a /= 2; a"),
        (CompletionType::Normal, V::Float(3.5))
    );
}

#[test]
fn test_bitwise_compound_assignments() {
    assert_eq!(
        run("var a = 1; a <<= 4; a |= 2; a ^= 3; a &= 29; a"),
        (CompletionType::Normal, V::Int(17))
    );
}

#[test]
fn test_compound_assignment_through_member() {
    assert_eq!(
        run("var o = {n: 10}; o.n += 5; o.n"),
        (CompletionType::Normal, V::Int(15))
    );
}

#[test]
fn test_assignment_expression_yields_assigned_value() {
    assert_eq!(run("var x; x = 41 + 1"), (CompletionType::Normal, V::Int(42)));
}

#[test]
fn test_postfix_update_returns_old_value() {
    assert_eq!(
        run("var i = 5; var r = i++ + i; r"),
        (CompletionType::Normal, V::Int(11))
    );
}

#[test]
fn test_prefix_update_returns_new_value() {
    assert_eq!(run("var j = 5; ++j"), (CompletionType::Normal, V::Int(6)));
    assert_eq!(run_global("var j = 5; ++j;", "j"), V::Int(6));
}

#[test]
fn test_update_through_member_expression() {
    assert_eq!(
        run("var o = {n: 1}; o.n++; o.n"),
        (CompletionType::Normal, V::Int(2))
    );
    assert_eq!(
        run("var o = {}; o['k'] = 1; ++o['k']"),
        (CompletionType::Normal, V::Int(2))
    );
}

#[test]
fn test_sequence_expression_yields_last_value() {
    assert_eq!(
        run("var x = (1, 2, 3); x"),
        (CompletionType::Normal, V::Int(3))
    );
}

#[test]
fn test_conditional_expression_picks_branch() {
    assert_eq!(run("true ? 1 : 2"), (CompletionType::Normal, V::Int(1)));
    assert_eq!(run("false ? 1 : 2"), (CompletionType::Normal, V::Int(2)));
}

#[test]
fn test_string_concatenation_coerces() {
    assert_eq!(
        run("'a' + 1"),
        (CompletionType::Normal, V::Str("a1".to_string()))
    );
    assert_eq!(run("'5' * '2'"), (CompletionType::Normal, V::Int(10)));
}

#[test]
fn test_equality_operators() {
    assert_eq!(run("1 == '1'"), (CompletionType::Normal, V::Bool(true)));
    assert_eq!(run("1 === '1'"), (CompletionType::Normal, V::Bool(false)));
    assert_eq!(
        run("null == undefined"),
        (CompletionType::Normal, V::Bool(true))
    );
    assert_eq!(
        run("null === undefined"),
        (CompletionType::Normal, V::Bool(false))
    );
    assert_eq!(run("0 / 0 === 0 / 0"), (CompletionType::Normal, V::Bool(false)));
}

#[test]
fn test_unary_operators() {
    assert_eq!(run("-(3)"), (CompletionType::Normal, V::Int(-3)));
    assert_eq!(run("~0"), (CompletionType::Normal, V::Int(-1)));
    assert_eq!(run("void 0"), (CompletionType::Normal, V::Undefined));
}

#[test]
fn test_typeof_operator() {
    assert_eq!(
        run("typeof 1"),
        (CompletionType::Normal, V::Str("number".to_string()))
    );
    assert_eq!(
        run("typeof 'a'"),
        (CompletionType::Normal, V::Str("string".to_string()))
    );
    assert_eq!(
        run("typeof missing"),
        (CompletionType::Normal, V::Str("undefined".to_string()))
    );
    assert_eq!(
        run("typeof null"),
        (CompletionType::Normal, V::Str("object".to_string()))
    );
    assert_eq!(
        run("typeof function () {}"),
        (CompletionType::Normal, V::Str("function".to_string()))
    );
}

#[test]
fn test_logical_operators_short_circuit() {
    let code = "
        var x = 0;
        function boom() { x = 99; return true; }
        true || boom();
        false && boom();
    ";
    assert_eq!(run_global(code, "x"), V::Int(0));
}

#[test]
fn test_logical_operators_yield_operand_values() {
    assert_eq!(
        run("0 || 'dflt'"),
        (CompletionType::Normal, V::Str("dflt".to_string()))
    );
    assert_eq!(run("1 && 2"), (CompletionType::Normal, V::Int(2)));
    assert_eq!(run("0 && 2"), (CompletionType::Normal, V::Int(0)));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_do_while_runs_body_before_test() {
    assert_eq!(
        run("var n = 0; do { n = n + 1; } while (n < 3); n"),
        (CompletionType::Normal, V::Int(3))
    );
    assert_eq!(
        run("var k = 0; do { k = k + 1; } while (false); k"),
        (CompletionType::Normal, V::Int(1))
    );
}

#[test]
fn test_for_loop_sums_range() {
    assert_eq!(
        run("var sum = 0; for (var i = 0; i < 10; i = i + 1) { sum = sum + i; } sum"),
        (CompletionType::Normal, V::Int(45))
    );
}

#[test]
fn test_for_loop_with_empty_clauses() {
    assert_eq!(
        run("var i = 0; for (;;) { i = i + 1; if (i === 4) break; } i"),
        (CompletionType::Normal, V::Int(4))
    );
}

#[test]
fn test_labeled_break_exits_nested_for_loops() {
    let code = "
        var n = 0;
        search: for (var i = 0; i < 5; i = i + 1) {
            for (var j = 0; j < 5; j = j + 1) {
                n = n + 1;
                if (n === 3) break search;
            }
        }
        n
    ";
    assert_eq!(run(code), (CompletionType::Normal, V::Int(3)));
}

#[test]
fn test_labeled_continue_skips_rest_of_body() {
    let code = "
        var i = 0;
        var n = 0;
        outer: while (i < 3) {
            i = i + 1;
            if (i === 2) continue outer;
            n = n + 1;
        }
        n
    ";
    assert_eq!(run(code), (CompletionType::Normal, V::Int(2)));
}

#[test]
fn test_if_branch_value_in_tail_position() {
    assert_eq!(run("if (true) { 42; }"), (CompletionType::Normal, V::Int(42)));
    assert_eq!(
        run("if (false) { 1; } else { 2; }"),
        (CompletionType::Normal, V::Int(2))
    );
    assert_eq!(
        run("if (false) { 1; }"),
        (CompletionType::Normal, V::Undefined)
    );
}

#[test]
fn test_uncaught_throw_reaches_driver() {
    assert_eq!(run("throw 5;"), (CompletionType::Throw, V::Int(5)));
}

#[test]
fn test_throw_of_undefined_is_valid() {
    assert_eq!(run("throw undefined;"), (CompletionType::Throw, V::Undefined));
}

#[test]
fn test_try_without_throw_skips_handler() {
    let code = "
        var handled = false;
        var r = 0;
        try { r = 1; } catch (e) { handled = true; }
    ";
    assert_eq!(run_global(code, "r"), V::Int(1));
    assert_eq!(run_global(code, "handled"), V::Bool(false));
}

#[test]
fn test_rethrow_from_catch_propagates() {
    assert_eq!(
        run("try { throw 1; } catch (e) { throw e + 1; }"),
        (CompletionType::Throw, V::Int(2))
    );
}

// ============================================================================
// Functions and scope
// ============================================================================

#[test]
fn test_closure_captures_defining_scope() {
    let code = "
        function adder(x) { return function (y) { return x + y; }; }
        var add2 = adder(2);
        add2(3)
    ";
    assert_eq!(run(code), (CompletionType::Normal, V::Int(5)));
}

#[test]
fn test_closure_shares_mutable_state() {
    let code = "
        function counter() {
            var n = 0;
            return function () { n = n + 1; return n; };
        }
        var c = counter();
        c();
        c();
        c()
    ";
    assert_eq!(run(code), (CompletionType::Normal, V::Int(3)));
}

#[test]
fn test_function_declarations_hoist() {
    assert_eq!(
        run("var r = f(); function f() { return 42; } r"),
        (CompletionType::Normal, V::Int(42))
    );
}

#[test]
fn test_recursive_function() {
    assert_eq!(
        run("function fact(n) { if (n < 2) return 1; return n * fact(n - 1); } fact(5)"),
        (CompletionType::Normal, V::Int(120))
    );
}

#[test]
fn test_function_without_return_yields_undefined() {
    assert_eq!(
        run("function f() { 1; } f()"),
        (CompletionType::Normal, V::Undefined)
    );
}

#[test]
fn test_missing_arguments_read_as_undefined() {
    assert_eq!(
        run("function f(a, b) { return typeof b; } f(1)"),
        (CompletionType::Normal, V::Str("undefined".to_string()))
    );
}

#[test]
fn test_extra_arguments_are_evaluated_then_dropped() {
    let code = "
        var effects = 0;
        function bump() { effects = effects + 1; return effects; }
        function f(a) { return a; }
        var r = f(1, bump(), bump());
    ";
    assert_eq!(run_global(code, "r"), V::Int(1));
    assert_eq!(run_global(code, "effects"), V::Int(2));
}

#[test]
fn test_catch_parameter_shadows_outer_binding() {
    assert_eq!(
        run("var e = 'outer'; try { throw 'x'; } catch (e) { } e"),
        (CompletionType::Normal, V::Str("outer".to_string()))
    );
}

#[test]
fn test_catch_body_can_write_outer_scope() {
    assert_eq!(
        run("var captured = 0; try { throw 7; } catch (e) { captured = e; } captured"),
        (CompletionType::Normal, V::Int(7))
    );
}

#[test]
fn test_assignment_without_declaration_creates_global() {
    let code = "
        function f() { leaked = 9; }
        f();
        leaked
    ";
    assert_eq!(run(code), (CompletionType::Normal, V::Int(9)));
}

#[test]
fn test_multi_declarator_var_statement() {
    assert_eq!(
        run("var a = 1, b, c = 3; a + c"),
        (CompletionType::Normal, V::Int(4))
    );
    assert_eq!(
        run("var a = 1, b, c = 3; typeof b"),
        (CompletionType::Normal, V::Str("undefined".to_string()))
    );
}

// ============================================================================
// Objects and members
// ============================================================================

#[test]
fn test_computed_member_access() {
    assert_eq!(
        run("var o = {x: 7}; var k = 'x'; o[k] + o['x']"),
        (CompletionType::Normal, V::Int(14))
    );
}

#[test]
fn test_computed_member_write() {
    assert_eq!(
        run("var o = {}; o['a' + 'b'] = 4; o.ab"),
        (CompletionType::Normal, V::Int(4))
    );
}

#[test]
fn test_object_literal_string_and_number_keys() {
    assert_eq!(
        run("var o = {'s': 1, 2: 'two'}; o.s + o[2]"),
        (CompletionType::Normal, V::Str("1two".to_string()))
    );
}

#[test]
fn test_nested_object_literals() {
    assert_eq!(
        run("var o = {inner: {v: 5}}; o.inner.v"),
        (CompletionType::Normal, V::Int(5))
    );
}

#[test]
fn test_missing_property_reads_as_undefined() {
    assert_eq!(
        run("var o = {}; typeof o.nothing"),
        (CompletionType::Normal, V::Str("undefined".to_string()))
    );
}

#[test]
fn test_property_access_on_undefined_throws_type_error() {
    let code = "var o; var r = ''; try { o.a; } catch (e) { r = e; } r";
    match run(code) {
        (CompletionType::Normal, V::Str(s)) => {
            assert!(s.starts_with("TypeError"), "unexpected message: {}", s)
        }
        other => panic!("unexpected completion: {:?}", other),
    }
}

#[test]
fn test_calling_a_non_function_throws_type_error() {
    let code = "var r = ''; try { (5)(); } catch (e) { r = e; } r";
    match run(code) {
        (CompletionType::Normal, V::Str(s)) => {
            assert!(s.starts_with("TypeError"), "unexpected message: {}", s)
        }
        other => panic!("unexpected completion: {:?}", other),
    }
}

// ============================================================================
// Host-driven stepping
// ============================================================================

#[test]
fn test_manual_stepping_drives_to_completion() {
    let program = JsParser::parse_to_ast_from_str("var x = 2 * 21; x").unwrap();
    let interpreter = Interpreter::new();
    let mut state = Some(interpreter.start(&program));
    let mut cv = None;
    let mut steps = 0;
    while let Some(current) = state {
        let (next, next_cv) = jstep::runner::api::step(current, cv);
        state = next;
        cv = next_cv;
        steps += 1;
        assert!(steps < 10_000, "stepping failed to terminate");
    }
    let completion = cv.expect("program should produce a completion value");
    assert_eq!(completion.completion_type, CompletionType::Normal);
    assert_eq!(simplify(&completion.get_value()), V::Int(42));
    // A multi-statement program takes several driver round trips.
    assert!(steps > 5);
}

#[test]
fn test_two_programs_interleave_at_step_granularity() {
    let program_a = JsParser::parse_to_ast_from_str("var a = 0; while (a < 5) a = a + 1; a").unwrap();
    let program_b = JsParser::parse_to_ast_from_str("10 + 20 + 12").unwrap();
    let interp_a = Interpreter::new();
    let interp_b = Interpreter::new();
    let mut state_a = Some(interp_a.start(&program_a));
    let mut state_b = Some(interp_b.start(&program_b));
    let mut cv_a = None;
    let mut cv_b = None;
    let mut done_a = None;
    let mut done_b = None;
    while done_a.is_none() || done_b.is_none() {
        if let Some(current) = state_a.take() {
            let (next, next_cv) = current.step(cv_a.take());
            state_a = next;
            cv_a = next_cv;
            if state_a.is_none() {
                done_a = cv_a.take();
            }
        }
        if let Some(current) = state_b.take() {
            let (next, next_cv) = current.step(cv_b.take());
            state_b = next;
            cv_b = next_cv;
            if state_b.is_none() {
                done_b = cv_b.take();
            }
        }
    }
    assert_eq!(simplify(&done_a.unwrap().get_value()), V::Int(5));
    assert_eq!(simplify(&done_b.unwrap().get_value()), V::Int(42));
}
