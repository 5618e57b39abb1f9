// Expression and condition evaluation through whole sketches

use proptest::prelude::*;
use sketchsim::interpreter::{Interpreter, VirtualHost};

/// Start a sketch whose `setup()` computes values, and return the session
fn run_setup(setup_body: &str) -> Interpreter<VirtualHost> {
    let mut interpreter = Interpreter::new(VirtualHost::new());
    interpreter.set_code(format!("void setup() {{\n{setup_body}\n}}\nvoid loop() {{\n}}\n"));
    interpreter.start().expect("sketch should start");
    interpreter
}

#[test]
fn test_arithmetic_statements() {
    let interpreter = run_setup(
        "int a = 7;\n\
         int b = a * 3 + 1;\n\
         int c = (b - a) / 2;\n\
         int d = b % 5;\n\
         a += 10;\n\
         b -= 2;\n\
         c *= 3;\n\
         d /= 0;",
    );
    assert_eq!(interpreter.variable("a"), Some(17));
    assert_eq!(interpreter.variable("b"), Some(20));
    assert_eq!(interpreter.variable("c"), Some(21));
    assert_eq!(interpreter.variable("d"), Some(0));
}

#[test]
fn test_increment_and_decrement() {
    let interpreter = run_setup("int i = 5;\ni++;\n++i;\ni--;\nint j;\nj--;");
    assert_eq!(interpreter.variable("i"), Some(6));
    assert_eq!(interpreter.variable("j"), Some(-1));
}

#[test]
fn test_multiple_declarators() {
    let interpreter = run_setup("int x = 1, y = x + 1, z;");
    assert_eq!(interpreter.variable("x"), Some(1));
    assert_eq!(interpreter.variable("y"), Some(2));
    assert_eq!(interpreter.variable("z"), Some(0));
}

#[test]
fn test_literals_and_named_constants() {
    let interpreter = run_setup(
        "int h = 0x1F;\n\
         int b = 0b101;\n\
         unsigned long big = 1000UL;\n\
         char c = 'A';\n\
         int led = LED_BUILTIN;\n\
         int analog = A2;\n\
         bool flag = true;",
    );
    assert_eq!(interpreter.variable("h"), Some(31));
    assert_eq!(interpreter.variable("b"), Some(5));
    assert_eq!(interpreter.variable("big"), Some(1000));
    assert_eq!(interpreter.variable("c"), Some(65));
    assert_eq!(interpreter.variable("led"), Some(13));
    assert_eq!(interpreter.variable("analog"), Some(16));
    assert_eq!(interpreter.variable("flag"), Some(1));
}

#[test]
fn test_unknown_names_evaluate_to_zero() {
    let mut interpreter = Interpreter::new(VirtualHost::new());
    assert_eq!(interpreter.eval_expr("missing + 4"), 4);
    assert_eq!(interpreter.eval_expr("analogRead(A0)"), 0);
    assert_eq!(interpreter.eval_expr(""), 0);
}

#[test]
fn test_conditions() {
    let mut interpreter = run_setup("int x = 3;\nint y = 0;");
    assert!(interpreter.eval_condition("x == 3"));
    assert!(interpreter.eval_condition("x > 1 && x < 5"));
    assert!(!interpreter.eval_condition("x > 1 && y"));
    assert!(interpreter.eval_condition("y || x"));
    assert!(interpreter.eval_condition("!y"));
    assert!(interpreter.eval_condition("(x + 1) * 2 >= 8"));
    assert!(!interpreter.eval_condition(""));
}

proptest! {
    #[test]
    fn prop_matches_integer_arithmetic(a in 0i64..10_000, b in 0i64..10_000, c in 1i64..100) {
        let mut interpreter = Interpreter::new(VirtualHost::new());
        prop_assert_eq!(interpreter.eval_expr(&format!("{a} + {b} * {c}")), a + b * c);
        prop_assert_eq!(interpreter.eval_expr(&format!("({a} - {b}) / {c}")), (a - b) / c);
        prop_assert_eq!(interpreter.eval_expr(&format!("{a} % {c} - {b}")), a % c - b);
    }

    #[test]
    fn prop_comparisons_match(a in -1000i64..1000, b in -1000i64..1000) {
        let mut interpreter = Interpreter::new(VirtualHost::new());
        interpreter.set_code(format!("int a = {a};\nint b = {b};\nvoid setup() {{}}\nvoid loop() {{}}"));
        interpreter.start().unwrap();
        prop_assert_eq!(interpreter.eval_condition("a < b"), a < b);
        prop_assert_eq!(interpreter.eval_condition("a >= b"), a >= b);
        prop_assert_eq!(interpreter.eval_condition("a != b"), a != b);
    }
}
