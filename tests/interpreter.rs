#[cfg(test)]
mod interpreter_tests {
    use nox::error::NoxError;
    use nox::interpreter::Interpreter;
    use nox::parser::Parser;
    use nox::resolver::Resolver;
    use nox::scanner::Scanner;

    /// Run a program through the whole pipeline, capturing `print` output.
    fn run(source: &str) -> (String, Result<(), NoxError>) {
        let scanner = Scanner::new(source.as_bytes().to_vec());
        let mut parser = Parser::new(scanner);
        let statements = parser.parse().expect("source should parse");

        let mut interpreter = Interpreter::with_output(Vec::new());

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("source should resolve");

        let result = interpreter.interpret(&statements);
        let output = String::from_utf8(interpreter.into_output()).expect("output is UTF-8");

        (output, result)
    }

    fn run_ok(source: &str) -> String {
        let (output, result) = run(source);

        result.expect("program should run");
        output
    }

    fn run_err(source: &str) -> NoxError {
        let (_, result) = run(source);

        result.expect_err("program should fail")
    }

    // Printing and value formatting

    #[test]
    fn print_formats_primitives() {
        assert_eq!(run_ok("print nil;"), "nil\n");
        assert_eq!(run_ok("print true;"), "true\n");
        assert_eq!(run_ok("print false;"), "false\n");
        assert_eq!(run_ok("print \"hi\";"), "hi\n");
    }

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(run_ok("print 3.0;"), "3\n");
        assert_eq!(run_ok("print 100;"), "100\n");
        assert_eq!(run_ok("print 2.5;"), "2.5\n");
        assert_eq!(run_ok("print -3;"), "-3\n");
    }

    #[test]
    fn callables_print_their_names() {
        assert_eq!(run_ok("def f() { } print f;"), "<fn f>\n");
        assert_eq!(run_ok("class K { } print K;"), "K\n");
        assert_eq!(run_ok("class K { } print K();"), "K instance\n");
        assert_eq!(run_ok("print clock;"), "<native fn clock>\n");
    }

    // Operators

    #[test]
    fn arithmetic_and_grouping() {
        assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
        assert_eq!(run_ok("print 10 - 4 / 2;"), "8\n");
        assert_eq!(run_ok("print -(3 + 4);"), "-7\n");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn mixed_plus_is_a_type_error() {
        let err = run_err("print \"a\" + 1;");

        assert!(err
            .to_string()
            .contains("Operands must be two numbers or two strings."));
    }

    #[test]
    fn division_by_zero_follows_ieee() {
        assert_eq!(run_ok("print 1 / 0;"), "inf\n");
        assert_eq!(run_ok("print -1 / 0;"), "-inf\n");
        assert_eq!(run_ok("print 0 / 0;"), "NaN\n");
    }

    #[test]
    fn comparisons_require_numbers() {
        assert_eq!(run_ok("print 1 < 2;"), "true\n");
        assert_eq!(run_ok("print 2 <= 2;"), "true\n");
        assert_eq!(run_ok("print 1 > 2;"), "false\n");

        let err = run_err("print 1 < \"2\";");
        assert!(err.to_string().contains("Operands must be numbers."));
    }

    #[test]
    fn unary_minus_requires_a_number() {
        let err = run_err("print -\"a\";");

        assert!(err.to_string().contains("Operand must be a number."));
    }

    #[test]
    fn equality_semantics() {
        assert_eq!(run_ok("print 1 == 1;"), "true\n");
        assert_eq!(run_ok("print \"a\" == \"a\";"), "true\n");
        assert_eq!(run_ok("print nil == nil;"), "true\n");
        assert_eq!(run_ok("print nil == false;"), "false\n");
        assert_eq!(run_ok("print 0 == false;"), "false\n");
        assert_eq!(run_ok("print 1 != 2;"), "true\n");

        // IEEE-754: NaN is unequal to itself.
        assert_eq!(run_ok("print (0 / 0) == (0 / 0);"), "false\n");
    }

    #[test]
    fn instances_compare_by_identity() {
        assert_eq!(
            run_ok("class K { } var a = K(); var b = K(); print a == a; print a == b;"),
            "true\nfalse\n"
        );
    }

    #[test]
    fn logical_operators_yield_the_deciding_operand() {
        assert_eq!(run_ok("print \"a\" or \"b\";"), "a\n");
        assert_eq!(run_ok("print nil or \"b\";"), "b\n");
        assert_eq!(run_ok("print nil and 1;"), "nil\n");
        assert_eq!(run_ok("print 1 and 2;"), "2\n");
    }

    #[test]
    fn short_circuit_skips_the_right_operand() {
        assert_eq!(
            run_ok("def boom() { print \"boom\"; } true or boom(); false and boom();"),
            ""
        );
    }

    #[test]
    fn zero_and_empty_string_are_truthy() {
        assert_eq!(run_ok("if (0) print \"yes\";"), "yes\n");
        assert_eq!(run_ok("if (\"\") print \"yes\";"), "yes\n");
        assert_eq!(run_ok("if (nil) print \"no\"; else print \"else\";"), "else\n");
    }

    // Variables and scope

    #[test]
    fn assignment_evaluates_to_the_assigned_value() {
        assert_eq!(run_ok("var a = 1; print a = 2;"), "2\n");
    }

    #[test]
    fn blocks_shadow_and_restore() {
        assert_eq!(
            run_ok("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn undefined_variable_access_fails() {
        let err = run_err("print ghost;");
        assert!(err.to_string().contains("Undefined variable 'ghost'."));

        let err = run_err("ghost = 1;");
        assert!(err.to_string().contains("Undefined variable 'ghost'."));
    }

    #[test]
    fn errors_carry_the_originating_line() {
        let err = run_err("\n\nghost;");

        assert!(err.to_string().starts_with("[line 3]"));
    }

    #[test]
    fn shadowing_does_not_retroactively_capture() {
        assert_eq!(
            run_ok(
                r#"
                var a = "global";
                {
                    def show() { print a; }
                    show();
                    var a = "inner";
                    show();
                }
                "#
            ),
            "global\nglobal\n"
        );
    }

    // Loops and control flow

    #[test]
    fn while_loop_runs_to_completion() {
        assert_eq!(
            run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn break_exits_the_nearest_loop() {
        assert_eq!(
            run_ok("var i = 0; while (true) { i = i + 1; if (i == 3) break; } print i;"),
            "3\n"
        );
    }

    #[test]
    fn continue_skips_to_the_next_test() {
        assert_eq!(
            run_ok(
                "var i = 0; var s = 0;
                 while (i < 5) { i = i + 1; if (i == 2) continue; s = s + i; }
                 print s;"
            ),
            "13\n"
        );
    }

    #[test]
    fn for_loop_with_continue_still_increments() {
        assert_eq!(
            run_ok("for (var i = 0; i < 5; i = i + 1) { if (i == 2) continue; print i; }"),
            "0\n1\n3\n4\n"
        );
    }

    #[test]
    fn continued_iteration_runs_increment_exactly_once() {
        // If `continue` skipped the increment this would never terminate;
        // if it ran it twice the sum would be short.
        assert_eq!(
            run_ok(
                "var n = 0;
                 for (var i = 0; i < 3; i = i + 1) { n = n + 10; if (true) continue; n = n + 100; }
                 print n;"
            ),
            "30\n"
        );
    }

    #[test]
    fn break_inside_for_skips_the_increment() {
        assert_eq!(
            run_ok(
                "var last = nil;
                 for (var i = 0; i < 10; i = i + 1) { last = i; if (i == 4) break; }
                 print last;"
            ),
            "4\n"
        );
    }

    #[test]
    fn nested_loops_unwind_one_level() {
        assert_eq!(
            run_ok(
                "for (var i = 0; i < 2; i = i + 1) {
                     for (var j = 0; j < 5; j = j + 1) { if (j == 1) break; print j; }
                 }"
            ),
            "0\n0\n"
        );
    }

    // Functions and closures

    #[test]
    fn recursive_fib() {
        assert_eq!(
            run_ok("def fib(n) { if (n <= 1) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
            "55\n"
        );
    }

    #[test]
    fn bare_return_yields_nil() {
        assert_eq!(run_ok("def f() { return; } print f();"), "nil\n");
        assert_eq!(run_ok("def f() { } print f();"), "nil\n");
    }

    #[test]
    fn return_unwinds_nested_loops() {
        assert_eq!(
            run_ok("def f() { for (;;) { while (true) { return 7; } } } print f();"),
            "7\n"
        );
    }

    #[test]
    fn closure_over_mutable_local() {
        assert_eq!(
            run_ok(
                r#"
                def makeCounter() {
                    var count = 0;
                    def inc() { count = count + 1; print count; }
                    return inc;
                }
                var c = makeCounter();
                c(); c(); c();
                "#
            ),
            "1\n2\n3\n"
        );
    }

    #[test]
    fn sibling_closures_share_one_environment() {
        assert_eq!(
            run_ok(
                r#"
                def pair() {
                    var n = 0;
                    def bump() { n = n + 1; }
                    def read() { print n; }
                    bump(); bump(); read();
                }
                pair();
                "#
            ),
            "2\n"
        );
    }

    #[test]
    fn arity_must_match_exactly() {
        let err = run_err("def f(a, b) { } f(1);");
        assert!(err.to_string().contains("Expected 2 arguments but got 1."));

        let err = run_err("def f() { } f(1);");
        assert!(err.to_string().contains("Expected 0 arguments but got 1."));
    }

    #[test]
    fn only_callables_can_be_called() {
        let err = run_err("1();");

        assert!(err
            .to_string()
            .contains("Can only call functions and classes."));
    }

    #[test]
    fn clock_returns_a_positive_number() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
    }

    // Classes

    #[test]
    fn fields_are_per_instance() {
        assert_eq!(
            run_ok(
                "class Box { }
                 var a = Box(); var b = Box();
                 a.value = 1; b.value = 2;
                 print a.value; print b.value;"
            ),
            "1\n2\n"
        );
    }

    #[test]
    fn methods_bind_self() {
        assert_eq!(
            run_ok(
                "class Counter {
                     init() { self.n = 0; }
                     bump() { self.n = self.n + 1; return self.n; }
                 }
                 var c = Counter();
                 c.bump();
                 print c.bump();"
            ),
            "2\n"
        );
    }

    #[test]
    fn extracted_methods_stay_bound() {
        assert_eq!(
            run_ok(
                "class P {
                     init(n) { self.n = n; }
                     name() { return self.n; }
                 }
                 var m = P(\"x\").name;
                 print m();"
            ),
            "x\n"
        );
    }

    #[test]
    fn method_returning_self_returns_the_receiver() {
        assert_eq!(
            run_ok("class C { m() { return self; } } var c = C(); print c.m() == c;"),
            "true\n"
        );
    }

    #[test]
    fn init_returns_the_instance() {
        assert_eq!(
            run_ok("class P { init(x) { self.x = x; } } var p = P(7); print p.x;"),
            "7\n"
        );
    }

    #[test]
    fn bare_return_in_init_still_yields_the_instance() {
        assert_eq!(
            run_ok(
                "class P { init() { self.x = 1; return; self.x = 2; } }
                 print P().x;"
            ),
            "1\n"
        );
    }

    #[test]
    fn class_arity_comes_from_init() {
        let err = run_err("class P { init(x) { } } P();");

        assert!(err.to_string().contains("Expected 1 arguments but got 0."));
    }

    #[test]
    fn undefined_property_fails() {
        let err = run_err("class K { } K().missing;");

        assert!(err.to_string().contains("Undefined property 'missing'."));
    }

    #[test]
    fn property_access_requires_an_instance() {
        let err = run_err("var x = 1; x.y;");
        assert!(err.to_string().contains("Only instances have properties."));

        let err = run_err("1.x = 2;");
        assert!(err.to_string().contains("Only instances have fields."));
    }

    // Inheritance

    #[test]
    fn methods_are_inherited() {
        assert_eq!(
            run_ok("class A { who() { return \"A\"; } } class B : A { } print B().who();"),
            "A\n"
        );
    }

    #[test]
    fn subclasses_override() {
        assert_eq!(
            run_ok(
                "class A { who() { return \"A\"; } }
                 class B : A { who() { return \"B\"; } }
                 print B().who();"
            ),
            "B\n"
        );
    }

    #[test]
    fn super_dispatches_past_the_override() {
        assert_eq!(
            run_ok(
                "class A { greet() { print \"A\"; } }
                 class B : A { greet() { super.greet(); print \"B\"; } }
                 B().greet();"
            ),
            "A\nB\n"
        );
    }

    #[test]
    fn super_through_a_closure_uses_the_declaring_class() {
        assert_eq!(
            run_ok(
                r#"
                class A { say() { print "A"; } }
                class B : A {
                    getClosure() { def closure() { super.say(); } return closure; }
                    say() { print "B"; }
                }
                class C : B { say() { print "C"; } }
                C().getClosure()();
                "#
            ),
            "A\n"
        );
    }

    #[test]
    fn inherited_init_constructs_subclass_instances() {
        assert_eq!(
            run_ok(
                "class A { init(n) { self.n = n; } }
                 class B : A { }
                 print B(9).n;"
            ),
            "9\n"
        );
    }

    #[test]
    fn missing_super_method_fails() {
        let err = run_err(
            "class A { }
             class B : A { m() { super.nope(); } }
             B().m();",
        );

        assert!(err.to_string().contains("Undefined property 'nope'."));
    }

    #[test]
    fn superclass_must_be_a_class() {
        let err = run_err("var NotAClass = 1; class B : NotAClass { }");

        assert!(err.to_string().contains("Superclass must be a class."));
    }

    // Failure model

    #[test]
    fn output_before_a_runtime_error_is_kept() {
        let (output, result) = run("print 1; ghost;");

        assert_eq!(output, "1\n");
        assert!(result.is_err());
    }
}
