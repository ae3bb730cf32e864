//! Integration tests for the Ember interpreter
//!
//! Runs whole programs through the full pipeline:
//! - Lexing and parsing
//! - Static checks
//! - Execution with captured output
//! - Runtime diagnostics

use ember::analyzer::Analyzer;
use ember::ast::Program;
use ember::error::CompileWarning;
use ember::interp::{
    render_runtime_error, Capture, ErrorKind, Host, InterpConfig, Interpreter, RuntimeError,
};
use ember::lexer::tokenize;
use ember::parser::parse;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use std::io;

/// Helper to lex, parse and check a program
fn compile(source: &str) -> ember::Result<(Program, Vec<CompileWarning>)> {
    let tokens = tokenize(source)?;
    let program = parse("test.em", source, tokens)?;
    let mut analyzer = Analyzer::new();
    analyzer.check_program(&program)?;
    Ok((program, analyzer.take_warnings()))
}

fn execute(source: &str, input: &str, config: InterpConfig) -> (Result<(), RuntimeError>, String) {
    let (program, _) = compile(source).expect("program should compile");
    let capture = Capture::new();
    let host = Host::new(capture.clone(), io::Cursor::new(input.as_bytes().to_vec()));
    let mut interp = Interpreter::with_host(host).with_config(config);
    let result = interp.run(&program);
    (result, capture.contents())
}

/// Helper to run a program and return everything it printed
fn run_ok(source: &str) -> String {
    run_with_input(source, "")
}

fn run_with_input(source: &str, input: &str) -> String {
    let (result, output) = execute(source, input, InterpConfig::default());
    if let Err(err) = result {
        panic!("unexpected runtime error: {err}\noutput so far:\n{output}");
    }
    output
}

/// Helper to run a program that must fault
fn run_err(source: &str) -> RuntimeError {
    execute(source, "", InterpConfig::default())
        .0
        .expect_err("program should fault")
}

// ============================================
// Whole programs
// ============================================

#[test]
fn test_fibonacci() {
    let source = "
        fn fib(n) {
            if n < 2 { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        for i < 0 .. 10 { print(fib(i)); }
    ";
    assert_snapshot!(run_ok(source).trim_end(), @r"
    0
    1
    1
    2
    3
    5
    8
    13
    21
    34
    ");
}

#[test]
fn test_fizzbuzz() {
    let source = r#"
        for n <= 1 .. 15 {
            if n % 15 == 0 { print("FizzBuzz"); }
            else if n % 3 == 0 { print("Fizz"); }
            else if n % 5 == 0 { print("Buzz"); }
            else { print(n); }
        }
    "#;
    let output = run_ok(source);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 15);
    assert_eq!(lines[2], "Fizz");
    assert_eq!(lines[4], "Buzz");
    assert_eq!(lines[14], "FizzBuzz");
}

#[test]
fn test_bubble_sort_in_place() {
    let source = "
        fn sort(xs) {
            n = len(xs);
            for i < 0 .. n {
                for j < 0 .. n - i - 1 {
                    if xs[j] > xs[j + 1] {
                        tmp = xs[j];
                        xs[j] = xs[j + 1];
                        xs[j + 1] = tmp;
                    }
                }
            }
        }
        data = [5, 2, 9, 1, 5, 6];
        sort(data);
        print(data);
    ";
    assert_eq!(run_ok(source), "[1, 2, 5, 5, 6, 9]\n");
}

#[test]
fn test_reading_input() {
    let source = "
        a = number(input());
        b = number(input());
        print(a + b);
        print(input());
    ";
    assert_eq!(run_with_input(source, "3\n4\n"), "7\nnil\n");
}

// ============================================
// Buffers and aliasing
// ============================================

#[test]
fn test_array_assignment_aliases() {
    let source = "
        a = [1, 2];
        b = a;
        b[0] = 10;
        append(a, 3);
        print(a, b);
    ";
    assert_eq!(run_ok(source), "[10, 2, 3] [10, 2, 3]\n");
}

#[test]
fn test_arguments_alias_caller_buffers() {
    let source = "
        fn fill(xs, n) { for i < 0 .. n { append(xs, i * i); } }
        squares = [];
        fill(squares, 4);
        print(squares);
    ";
    assert_eq!(run_ok(source), "[0, 1, 4, 9]\n");
}

#[test]
fn test_slices_copy() {
    let source = "
        xs = [1, 2, 3];
        ys = xs[0:2];
        append(ys, 99);
        print(xs, ys, len(xs[1:1]));
    ";
    assert_eq!(run_ok(source), "[1, 2, 3] [1, 2, 99] 0\n");
}

#[test]
fn test_string_buffers() {
    let source = r#"
        s = "hello";
        s[0] = "j";
        print(s, len(s), s[1:3], index(s, "llo"), count("banana", "an"));
        t = s;
        append(t, "!");
        print(s);
    "#;
    assert_eq!(run_ok(source), "jello 5 el 2 2\njello!\n");
}

#[test]
fn test_string_literals_are_fresh_each_evaluation() {
    let source = r#"
        fn greeting() { return "hi"; }
        g = greeting();
        append(g, "!!!");
        print(g, greeting());
    "#;
    assert_eq!(run_ok(source), "hi!!! hi\n");
}

#[test]
fn test_sequence_natives() {
    let source = "
        a = [1, 2];
        b = merge(a, [3], [4]);
        extend(a, [9]);
        insert(a, 0, 0);
        remove(b, 3);
        print(a, b);
        clear(a);
        print(len(a));
    ";
    assert_eq!(run_ok(source), "[0, 1, 2, 9] [1, 2, 4]\n0\n");
}

#[test]
fn test_append_len_pop() {
    let source = "
        xs = append([], 1, 2, 3);
        print(len(xs));
        print(pop(xs, 0), len(xs), xs);
        print(pop(xs, 0, 0), xs);
    ";
    assert_eq!(run_ok(source), "3\n1 2 [2, 3]\n[2, 3] []\n");
}

#[test]
fn test_pop_out_of_range_faults() {
    let err = run_err("xs = [1, 2]; pop(xs, 2);");
    assert_eq!(err.kind, ErrorKind::NativeArgument);
    assert_eq!(err.message, "pop: index 2 out of bounds for length 2");
}

#[test]
fn test_element_assignment_faults() {
    let cases = [
        ("a = [1]; a[1] = 2;", ErrorKind::IndexOutOfBounds),
        (r#"s = "ab"; s[2] = "c";"#, ErrorKind::IndexOutOfBounds),
        (r#"s = "ab"; s[0] = 1;"#, ErrorKind::TypeMismatch),
        ("x = 1; x[0] = 2;", ErrorKind::TypeMismatch),
        ("a = [1]; a[-1] = 2;", ErrorKind::InvalidIndex),
    ];
    for (source, kind) in cases {
        assert_eq!(run_err(source).kind, kind, "{source}");
    }
}

// ============================================
// Values and operators
// ============================================

#[test]
fn test_number_rendering() {
    assert_eq!(
        run_ok("print(1/0, -1/0, 0.1 + 0.2, 7 % 3, 2.5 * 2, -0.5);"),
        "inf -inf 0.30000000000000004 1 5 -0.5\n"
    );
}

#[test]
fn test_nested_rendering() {
    assert_eq!(run_ok(r#"print(["a", ["b", nil]], "a", print);"#), "[\"a\", [\"b\", nil]] a <native fn print>\n");
    assert_eq!(run_ok("print(fn(a, b) { });"), "<fn(a, b)>\n");
}

#[test]
fn test_equality_is_structural() {
    assert_eq!(
        run_ok(r#"print([1, [2]] == [1, [2]], "a" != "a", nil == false, [1] != [2]);"#),
        "true false false true\n"
    );
}

#[test]
fn test_equality_of_self_containing_arrays() {
    let source = "
        a = [1]; append(a, a);
        b = [1]; append(b, b);
        c = [2]; append(c, c);
        print(a == b, a == c, a != b);
    ";
    assert_eq!(run_ok(source), "true false false\n");
}

#[test]
fn test_truthiness() {
    let source = r#"
        for i < 0 .. 1 {
            if 0 { print("zero is truthy"); }
            if "" { print("empty string is truthy"); }
            if [] { print("empty array is truthy"); }
            if nil { print("unreachable"); } else { print("nil is falsy"); }
        }
    "#;
    assert_eq!(
        run_ok(source),
        "zero is truthy\nempty string is truthy\nempty array is truthy\nnil is falsy\n"
    );
}

#[test]
fn test_typeof_and_stringify() {
    assert_eq!(
        run_ok("print(typeof 1, typeof true, typeof \"\", typeof nil, typeof fn() { }, $1 + \"x\");"),
        "float bool string nil function 1x\n"
    );
}

#[test]
fn test_conditional_and_logic() {
    assert_eq!(
        run_ok(r#"print(len([]) == 0 ? "empty" : "full", nil or "default", 1 and 2);"#),
        "empty default 2\n"
    );
}

#[test]
fn test_clock_is_a_float() {
    assert_eq!(run_ok("t = clock(); print(typeof t, t > 0);"), "float true\n");
}

#[test]
fn test_type_mismatch_message() {
    let err = run_err(r#"x = "a" * 2;"#);
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.message, "unsupported operand types for `*`: string and float");
}

// ============================================
// Range loops
// ============================================

#[test]
fn test_range_ascending_exclusive() {
    let source = "seen = []; for i < 0 .. 5 { append(seen, i); } print(seen);";
    assert_eq!(run_ok(source), "[0, 1, 2, 3, 4]\n");
    assert_eq!(run_err("for i < 0 .. 5 { } print(i);").kind, ErrorKind::UnboundVariable);
}

#[test]
fn test_range_descending_exclusive() {
    let source = "seen = []; for i > 5 .. 0 { append(seen, i); } print(seen);";
    assert_eq!(run_ok(source), "[5, 4, 3, 2, 1]\n");
    assert_eq!(run_err("for i > 5 .. 0 { } print(i);").kind, ErrorKind::UnboundVariable);
}

#[test]
fn test_range_with_equal_bounds() {
    assert_eq!(run_ok("for i < 3 .. 3 { print(i); } for i <= 3 .. 3 { print(i); }"), "3\n");
}

#[test]
fn test_range_direction_fault() {
    let err = run_err("for i > 0 .. 5 { }");
    assert_eq!(err.kind, ErrorKind::InvalidRange);
    assert_eq!(err.message, "descending range cannot go from 0 to 5");
}

#[test]
fn test_range_bound_type_fault() {
    let err = run_err(r#"for i < 0 .. "5" { }"#);
    assert_eq!(err.kind, ErrorKind::InvalidRange);
    assert_eq!(err.message, "range bound must be an integer, got string");
}

#[test]
fn test_range_variable_lives_in_function_frame() {
    let source = "
        fn count_up(n) {
            total = 0;
            for k < 0 .. n { total = total + k; }
            return total;
        }
        print(count_up(4));
    ";
    assert_eq!(run_ok(source), "6\n");
}

// ============================================
// Control flow
// ============================================

#[test]
fn test_break_and_continue_affect_innermost_loop() {
    let source = "
        for i < 0 .. 3 {
            for j < 0 .. 3 {
                if j == 1 { continue; }
                if j == 2 { break; }
                print(i, j);
            }
        }
    ";
    assert_eq!(run_ok(source), "0 0\n1 0\n2 0\n");
}

#[test]
fn test_return_escapes_loops() {
    let source = "
        fn first_even(xs) {
            i = 0;
            while i < len(xs) {
                if xs[i] % 2 == 0 { return xs[i]; }
                i = i + 1;
            }
        }
        print(first_even([1, 3, 4, 6]), first_even([1]));
    ";
    assert_eq!(run_ok(source), "4 nil\n");
}

#[test]
fn test_control_flow_faults_without_analyzer() {
    // The analyzer rejects these; run the interpreter directly to see the runtime checks
    for (source, keyword) in [("break;", "break"), ("continue;", "continue"), ("return;", "return")] {
        let tokens = tokenize(source).unwrap();
        let program = parse("test.em", source, tokens).unwrap();
        let err = Interpreter::with_host(Host::new(Capture::new(), io::empty()))
            .run(&program)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ControlFlow);
        assert!(err.message.starts_with(&format!("`{keyword}` outside")), "{}", err.message);
    }
}

#[test]
fn test_stack_overflow_fault() {
    let config = InterpConfig { max_call_depth: 200 };
    let (result, _) = execute("fn f(n) { return f(n + 1); } f(0);", "", config);
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::StackOverflow);
}

// ============================================
// Bindings and scoping
// ============================================

#[test]
fn test_constant_reassignment_faults() {
    let err = run_err("x := 1; x = 2;");
    assert_eq!(err.kind, ErrorKind::ConstantReassignment);
    assert_eq!(run_ok("x = 1; x = 2; print(x);"), "2\n");
}

#[test]
fn test_function_declarations_are_constant() {
    let err = run_err("fn f() { } f = 1;");
    assert_eq!(err.kind, ErrorKind::ConstantReassignment);
}

#[test]
fn test_natives_are_constant() {
    assert_eq!(run_err("print = 1;").kind, ErrorKind::ConstantReassignment);
    // a function frame may shadow them
    assert_eq!(run_ok("fn f() { len = 3; return len; } print(f(), len([1]));"), "3 1\n");
}

#[test]
fn test_dynamic_scoping_uses_call_site() {
    let source = r#"
        fn make() {
            x = "definition";
            return fn() { return x; };
        }
        f := make();
        x = "call site";
        print(f());
    "#;
    assert_eq!(run_ok(source), "call site\n");
}

#[test]
fn test_callee_sees_caller_locals() {
    let source = "
        fn inner() { return depth; }
        fn outer(depth) { return inner(); }
        print(outer(7));
    ";
    assert_eq!(run_ok(source), "7\n");
}

#[test]
fn test_unqualified_write_shadows() {
    let source = "
        n = 1;
        fn f() { n = n + 1; return n; }
        print(f(), n);
    ";
    assert_eq!(run_ok(source), "2 1\n");
}

#[test]
fn test_global_counter() {
    let source = "
        calls = 0;
        fn tick() { global calls = global calls + 1; }
        for i < 0 .. 3 { tick(); }
        print(calls);
    ";
    assert_eq!(run_ok(source), "3\n");
}

#[test]
fn test_unbound_variable() {
    let err = run_err("print(missing);");
    assert_eq!(err.kind, ErrorKind::UnboundVariable);
    assert_eq!(err.message, "undefined variable `missing`");
}

// ============================================
// Static checks and diagnostics
// ============================================

#[test]
fn test_analyzer_rejects_structural_misuse() {
    assert!(compile("break;").is_err());
    assert!(compile("return 1;").is_err());
    assert!(compile("fn f(a, a) { }").is_err());
    assert!(compile("global x = 1;").is_err());
}

#[test]
fn test_analyzer_warnings() {
    let (_, warnings) = compile("fn f() { return 1; print(2); }").unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind(), "unreachable_code");
}

#[test]
fn test_fault_location() {
    let source = "x := 1;\nx = 2;\n";
    let err = run_err(source);
    assert_eq!(err.span.line_col(source), (2, 1));
    let rendered = render_runtime_error("test.em", source, &err);
    assert!(rendered.contains("cannot reassign constant `x`"));
}

#[test]
fn test_output_before_fault_is_kept() {
    let (result, output) = execute("print(1); x = nil + 1; print(2);", "", InterpConfig::default());
    assert!(result.is_err());
    assert_eq!(output, "1\n");
}
