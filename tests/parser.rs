#[cfg(test)]
mod parser_tests {
    use nox::error::NoxError;
    use nox::expr::Expr;
    use nox::parser::Parser;
    use nox::scanner::Scanner;
    use nox::stmt::Stmt;
    use nox::token::TokenType;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<NoxError>> {
        let scanner = Scanner::new(source.as_bytes().to_vec());

        Parser::new(scanner).parse()
    }

    fn parse_ok(source: &str) -> Vec<Stmt> {
        parse(source).expect("source should parse")
    }

    #[test]
    fn var_declaration_with_initializer() {
        let statements = parse_ok("var answer = 42;");

        assert_eq!(statements.len(), 1);

        match &statements[0] {
            Stmt::Var { name, initializer } => {
                assert_eq!(name.lexeme, "answer");
                assert!(initializer.is_some());
            }

            other => panic!("expected var declaration, got {:?}", other),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let statements = parse_ok("1 + 2 * 3;");

        let Stmt::Expression(Expr::Binary {
            operator, right, ..
        }) = &statements[0]
        else {
            panic!("expected binary expression statement");
        };

        assert_eq!(operator.token_type, TokenType::PLUS);

        assert!(matches!(
            right.as_ref(),
            Expr::Binary { operator, .. } if operator.token_type == TokenType::STAR
        ));
    }

    #[test]
    fn assignment_is_right_associative() {
        let statements = parse_ok("a = b = 1;");

        let Stmt::Expression(Expr::Assign { name, value, .. }) = &statements[0] else {
            panic!("expected assignment");
        };

        assert_eq!(name.lexeme, "a");
        assert!(matches!(value.as_ref(), Expr::Assign { name, .. } if name.lexeme == "b"));
    }

    #[test]
    fn assignment_to_property_becomes_set() {
        let statements = parse_ok("p.x = 1;");

        assert!(matches!(
            &statements[0],
            Stmt::Expression(Expr::Set { name, .. }) if name.lexeme == "x"
        ));
    }

    #[test]
    fn invalid_assignment_target() {
        let errors = parse("1 = 2;").expect_err("should fail");

        assert!(errors[0].to_string().contains("Invalid assignment target."));
    }

    #[test]
    fn call_and_property_chains() {
        let statements = parse_ok("obj.method(1, 2).field;");

        let Stmt::Expression(Expr::Get { object, name }) = &statements[0] else {
            panic!("expected trailing property access");
        };

        assert_eq!(name.lexeme, "field");
        assert!(matches!(object.as_ref(), Expr::Call { .. }));
    }

    #[test]
    fn class_with_superclass() {
        let statements = parse_ok("class B : A { method() { } }");

        match &statements[0] {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                assert_eq!(name.lexeme, "B");
                assert!(
                    matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A")
                );
                assert_eq!(methods.len(), 1);
                assert_eq!(methods[0].name.lexeme, "method");
            }

            other => panic!("expected class declaration, got {:?}", other),
        }
    }

    #[test]
    fn super_requires_a_method_name() {
        let errors = parse("class B : A { m() { super; } }").expect_err("should fail");

        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("Expect '.' after 'super'.")));
    }

    #[test]
    fn for_loop_clauses() {
        let statements = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");

        match &statements[0] {
            Stmt::For {
                initializer,
                condition,
                increment,
                ..
            } => {
                assert!(initializer.is_some());
                assert!(condition.is_some());
                assert!(increment.is_some());
            }

            other => panic!("expected for statement, got {:?}", other),
        }
    }

    #[test]
    fn for_loop_clauses_may_be_empty() {
        let statements = parse_ok("for (;;) break;");

        match &statements[0] {
            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                assert!(initializer.is_none());
                assert!(condition.is_none());
                assert!(increment.is_none());
                assert!(matches!(body.as_ref(), Stmt::Break(_)));
            }

            other => panic!("expected for statement, got {:?}", other),
        }
    }

    #[test]
    fn break_and_continue_statements() {
        let statements = parse_ok("while (true) { break; continue; }");

        let Stmt::While { body, .. } = &statements[0] else {
            panic!("expected while statement");
        };

        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected block body");
        };

        assert!(matches!(inner[0], Stmt::Break(_)));
        assert!(matches!(inner[1], Stmt::Continue(_)));
    }

    #[test]
    fn synchronization_reports_multiple_errors() {
        let errors = parse("var 1;\nprint;\n").expect_err("should fail");

        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("Expect variable name."));
        assert!(errors[1].to_string().contains("Expect expression."));
    }

    #[test]
    fn lexical_errors_surface_with_syntax_errors() {
        let errors = parse("var x = $;\n").expect_err("should fail");

        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("Unexpected character")));
    }

    #[test]
    fn argument_cap_is_enforced() {
        let args: Vec<String> = (0..=255).map(|i| format!("a{}", i)).collect();
        let source = format!("f({});", args.join(", "));

        let errors = parse(&source).expect_err("should fail");

        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("Can't have more than 255 arguments.")));
    }

    #[test]
    fn site_ids_are_unique_and_resume() {
        let scanner = Scanner::new("a = b;".as_bytes().to_vec());
        let mut parser = Parser::new(scanner);
        parser.parse().expect("source should parse");

        let next = parser.next_site();
        assert!(next >= 2); // one site for `b`, one for the assignment

        // A later parse resumes numbering past the first batch.
        let scanner = Scanner::new("c;".as_bytes().to_vec());
        let mut parser = Parser::with_first_site(scanner, next);
        let statements = parser.parse().expect("source should parse");

        match &statements[0] {
            Stmt::Expression(Expr::Variable { site, .. }) => assert_eq!(*site, next),
            other => panic!("expected variable expression, got {:?}", other),
        }
    }
}
