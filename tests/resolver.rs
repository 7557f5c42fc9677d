#[cfg(test)]
mod resolver_tests {
    use nox::error::NoxError;
    use nox::interpreter::Interpreter;
    use nox::parser::Parser;
    use nox::resolver::Resolver;
    use nox::scanner::Scanner;

    fn resolve(source: &str) -> Result<(), Vec<NoxError>> {
        let scanner = Scanner::new(source.as_bytes().to_vec());
        let mut parser = Parser::new(scanner);
        let statements = parser.parse().expect("source should parse");

        let mut interpreter = Interpreter::new();

        Resolver::new(&mut interpreter).resolve(&statements)
    }

    fn assert_resolve_error(source: &str, expected: &str) {
        let errors = resolve(source).expect_err("resolution should fail");

        assert!(
            errors.iter().any(|e| e.to_string().contains(expected)),
            "expected an error containing {:?}, got {:?}",
            expected,
            errors
        );
    }

    #[test]
    fn plain_programs_resolve() {
        assert!(resolve("var a = 1; { var b = a; print b; }").is_ok());
    }

    #[test]
    fn closures_resolve() {
        assert!(resolve(
            "def outer() { var x = 1; def inner() { return x; } return inner; }"
        )
        .is_ok());
    }

    #[test]
    fn classes_with_superclasses_resolve() {
        assert!(resolve(
            "class A { m() { return self; } } class B : A { m() { return super.m(); } }"
        )
        .is_ok());
    }

    #[test]
    fn return_outside_function() {
        assert_resolve_error("return 1;", "Can't return from top-level code.");
    }

    #[test]
    fn return_value_from_initializer() {
        assert_resolve_error(
            "class A { init() { return 1; } }",
            "Can't return a value from an initializer.",
        );
    }

    #[test]
    fn bare_return_from_initializer_is_fine() {
        assert!(resolve("class A { init() { return; } }").is_ok());
    }

    #[test]
    fn self_outside_class() {
        assert_resolve_error("print self;", "Can't use 'self' outside of a class.");
    }

    #[test]
    fn self_in_a_plain_function() {
        assert_resolve_error(
            "def f() { return self; }",
            "Can't use 'self' outside of a class.",
        );
    }

    #[test]
    fn super_outside_class() {
        assert_resolve_error("super.m();", "Can't use 'super' outside of a class.");
    }

    #[test]
    fn super_without_superclass() {
        assert_resolve_error(
            "class A { m() { super.m(); } }",
            "Can't use 'super' in a class with no superclass.",
        );
    }

    #[test]
    fn break_outside_loop() {
        assert_resolve_error("break;", "Can't use 'break' outside of a loop.");
    }

    #[test]
    fn continue_outside_loop() {
        assert_resolve_error("continue;", "Can't use 'continue' outside of a loop.");
    }

    #[test]
    fn break_in_function_inside_loop_is_still_outside() {
        // The function body is a fresh control-flow context.
        assert_resolve_error(
            "while (true) { def f() { break; } }",
            "Can't use 'break' outside of a loop.",
        );
    }

    #[test]
    fn break_inside_loop_resolves() {
        assert!(resolve("while (true) { break; }").is_ok());
        assert!(resolve("for (;;) { continue; }").is_ok());
    }

    #[test]
    fn redeclaration_in_local_scope() {
        assert_resolve_error(
            "{ var a = 1; var a = 2; }",
            "Already a variable with this name in this scope.",
        );
    }

    #[test]
    fn redeclaration_of_global_is_allowed() {
        assert!(resolve("var a = 1; var a = 2;").is_ok());
    }

    #[test]
    fn read_in_own_initializer() {
        assert_resolve_error(
            "{ var a = a; }",
            "Can't read local variable in its own initializer.",
        );
    }

    #[test]
    fn global_initializer_may_reference_itself() {
        // At global scope the reference falls through to the runtime
        // lookup, matching the evaluator's behavior.
        assert!(resolve("var a = 1; var b = b;").is_ok());
    }

    #[test]
    fn class_inheriting_from_itself() {
        assert_resolve_error("class A : A { }", "A class can't inherit from itself.");
    }

    #[test]
    fn all_violations_are_reported_together() {
        let errors = resolve("return 1;\nbreak;\nprint self;").expect_err("should fail");

        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn duplicate_parameters_are_rejected() {
        assert_resolve_error(
            "def f(a, a) { }",
            "Already a variable with this name in this scope.",
        );
    }
}
