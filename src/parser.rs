use crate::Span;
use crate::ast::{BinaryOperator, Node, NodeKind, PropertyLiteral};
use crate::lexer::{LexerError, Token, TokenKind};
use std::iter::Peekable;
use std::rc::Rc;
use std::vec::IntoIter; // To iterate over Vec<Token>
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Parse Error: Unexpected token {found}, expected {expected}")]
    UnexpectedToken { found: Token, expected: String },
    #[error("Parse Error: Unexpected end of input during parsing. Expected {expected}")]
    UnexpectedEof { expected: String, span: Span },
    #[error("Lexer Error during parse: {0}")]
    LexerError(#[from] LexerError),
    #[error("Parse Error [at {span}]: constant '{name}' must be given a value")]
    ConstWithoutInitializer { name: String, span: Span },
    #[error("Parse Error [at {0}]: function parameters must be plain identifiers")]
    InvalidParameter(Span),
    #[error("Parse Error [at {span}]: invalid number literal '{text}'")]
    InvalidNumber { text: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { found, .. } => found.span,
            ParseError::UnexpectedEof { span, .. } => *span,
            ParseError::LexerError(lex_err) => lex_err.span,
            ParseError::ConstWithoutInitializer { span, .. } => *span,
            ParseError::InvalidParameter(span) => *span,
            ParseError::InvalidNumber { span, .. } => *span,
        }
    }
}

// Result type alias for convenience
pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser over an eagerly lexed token sequence.
///
/// Precedence, lowest first: assignment, object literal, additive,
/// multiplicative, call, member access, primary.
pub struct Parser {
    // Forward-only cursor; the parser never backtracks.
    tokens: Peekable<IntoIter<Token>>,
    // Where end-of-input errors point if the stream ran dry
    end: Span,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let end = tokens
            .last()
            .map(|token| Span::new(token.span.end, token.span.end))
            .unwrap_or_default();
        Parser {
            tokens: tokens.into_iter().peekable(),
            end,
        }
    }

    // Consumes the next token.
    fn next_token(&mut self, expected: &str) -> ParseResult<Token> {
        self.tokens.next().ok_or_else(|| ParseError::UnexpectedEof {
            expected: expected.to_string(),
            span: self.end,
        })
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.tokens
            .peek()
            .map_or(TokenKind::EndOfInput, |token| token.kind)
    }

    fn peek_operator(&mut self) -> Option<BinaryOperator> {
        match self.tokens.peek() {
            Some(token) if token.kind == TokenKind::BinaryOperator => {
                BinaryOperator::from_symbol(&token.value)
            }
            _ => None,
        }
    }

    fn unexpected(token: Token, expected: &str) -> ParseError {
        if token.kind == TokenKind::EndOfInput {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
                span: token.span,
            }
        } else {
            ParseError::UnexpectedToken {
                found: token,
                expected: expected.to_string(),
            }
        }
    }

    /// Consumes the next token, failing unless it has the given kind.
    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        let token = self.next_token(expected)?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(Self::unexpected(token, expected))
        }
    }

    /// Parses every statement up to the end of input into a Program node.
    pub fn parse(mut self) -> ParseResult<Node> {
        let mut body = Vec::new();
        while self.peek_kind() != TokenKind::EndOfInput {
            body.push(self.parse_statement()?);
        }
        let end = self.expect(TokenKind::EndOfInput, "end of input")?;
        Ok(Node::new(NodeKind::Program { body }, Span::new(0, end.span.end)))
    }

    fn parse_statement(&mut self) -> ParseResult<Node> {
        match self.peek_kind() {
            TokenKind::Let | TokenKind::Const => self.parse_variable_declaration(),
            TokenKind::Fn => self.parse_function_declaration(),
            _ => {
                let expr = self.parse_expression()?;
                if self.peek_kind() == TokenKind::Semicolon {
                    self.next_token("';'")?;
                }
                Ok(expr)
            }
        }
    }

    // let ident;  |  (let | const) ident = expr;
    fn parse_variable_declaration(&mut self) -> ParseResult<Node> {
        let keyword = self.next_token("'let' or 'const'")?;
        let constant = keyword.kind == TokenKind::Const;
        let identifier = self.expect(
            TokenKind::Identifier,
            "identifier name following 'let' or 'const'",
        )?;

        if self.peek_kind() == TokenKind::Semicolon {
            let semicolon = self.next_token("';'")?;
            let span = keyword.span.merge(semicolon.span);
            if constant {
                return Err(ParseError::ConstWithoutInitializer {
                    name: identifier.value,
                    span,
                });
            }
            return Ok(Node::new(
                NodeKind::VariableDecl {
                    identifier: identifier.value,
                    value: None,
                    constant: false,
                },
                span,
            ));
        }

        self.expect(
            TokenKind::Equals,
            "'=' or ';' following identifier in variable declaration",
        )?;
        let value = self.parse_expression()?;
        let semicolon = self.expect(
            TokenKind::Semicolon,
            "';' at the end of variable declaration",
        )?;
        Ok(Node::new(
            NodeKind::VariableDecl {
                identifier: identifier.value,
                value: Some(Box::new(value)),
                constant,
            },
            keyword.span.merge(semicolon.span),
        ))
    }

    // fn name(param, ...) { statement* }
    fn parse_function_declaration(&mut self) -> ParseResult<Node> {
        let keyword = self.next_token("'fn'")?;
        let name = self.expect(TokenKind::Identifier, "function name following 'fn'")?;

        let (arguments, _) = self.parse_arguments()?;
        let mut parameters = Vec::with_capacity(arguments.len());
        for argument in arguments {
            match argument.kind {
                NodeKind::Identifier { symbol } => parameters.push(symbol),
                _ => return Err(ParseError::InvalidParameter(argument.span)),
            }
        }

        self.expect(TokenKind::OpenBrace, "'{' to open function body")?;
        let mut body = Vec::new();
        while !matches!(
            self.peek_kind(),
            TokenKind::CloseBrace | TokenKind::EndOfInput
        ) {
            body.push(self.parse_statement()?);
        }
        let close = self.expect(TokenKind::CloseBrace, "'}' to close function body")?;

        Ok(Node::new(
            NodeKind::FunctionDecl {
                name: name.value,
                parameters,
                body: Rc::from(body),
            },
            keyword.span.merge(close.span),
        ))
    }

    fn parse_expression(&mut self) -> ParseResult<Node> {
        self.parse_assignment_expression()
    }

    // Right recursion makes `a = b = c` group as `a = (b = c)`.
    fn parse_assignment_expression(&mut self) -> ParseResult<Node> {
        let assignee = self.parse_object_expression()?;

        if self.peek_kind() == TokenKind::Equals {
            self.next_token("'='")?;
            let value = self.parse_assignment_expression()?;
            let span = assignee.span.merge(value.span);
            return Ok(Node::new(
                NodeKind::AssignmentExpr {
                    assignee: Box::new(assignee),
                    value: Box::new(value),
                },
                span,
            ));
        }

        Ok(assignee)
    }

    // { key, key: expr, ... }
    fn parse_object_expression(&mut self) -> ParseResult<Node> {
        if self.peek_kind() != TokenKind::OpenBrace {
            return self.parse_additive_expression();
        }

        let open = self.next_token("'{'")?;
        let mut properties = Vec::new();
        while !matches!(
            self.peek_kind(),
            TokenKind::CloseBrace | TokenKind::EndOfInput
        ) {
            let key = self.expect(TokenKind::Identifier, "object literal key")?;

            // Shorthand: { key } or { key, ... }
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.next_token("','")?;
                    properties.push(PropertyLiteral {
                        key: key.value,
                        value: None,
                        span: key.span,
                    });
                    continue;
                }
                TokenKind::CloseBrace => {
                    properties.push(PropertyLiteral {
                        key: key.value,
                        value: None,
                        span: key.span,
                    });
                    continue;
                }
                _ => {}
            }

            self.expect(
                TokenKind::Colon,
                "':' following identifier in object literal",
            )?;
            let value = self.parse_expression()?;
            properties.push(PropertyLiteral {
                key: key.value,
                span: key.span.merge(value.span),
                value: Some(Box::new(value)),
            });

            if self.peek_kind() != TokenKind::CloseBrace {
                self.expect(TokenKind::Comma, "',' or '}' following property")?;
            }
        }
        let close = self.expect(TokenKind::CloseBrace, "'}' to close object literal")?;

        Ok(Node::new(
            NodeKind::ObjectLiteral { properties },
            open.span.merge(close.span),
        ))
    }

    fn parse_additive_expression(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_multiplicative_expression()?;

        while let Some(operator) = self.peek_operator().filter(|op| op.is_additive()) {
            self.next_token("operator")?;
            let right = self.parse_multiplicative_expression()?;
            left = Node::new_binary(left, operator, right);
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_call_member_expression()?;

        while let Some(operator) = self.peek_operator().filter(|op| op.is_multiplicative()) {
            self.next_token("operator")?;
            let right = self.parse_call_member_expression()?;
            left = Node::new_binary(left, operator, right);
        }

        Ok(left)
    }

    fn parse_call_member_expression(&mut self) -> ParseResult<Node> {
        let member = self.parse_member_expression()?;

        if self.peek_kind() == TokenKind::OpenParen {
            return self.parse_call_expression(member);
        }

        Ok(member)
    }

    fn parse_call_expression(&mut self, caller: Node) -> ParseResult<Node> {
        let (arguments, close) = self.parse_arguments()?;
        let span = caller.span.merge(close);
        let call = Node::new(
            NodeKind::CallExpr {
                caller: Box::new(caller),
                arguments,
            },
            span,
        );

        // f()() calls whatever the first call returned
        if self.peek_kind() == TokenKind::OpenParen {
            return self.parse_call_expression(call);
        }

        Ok(call)
    }

    /// Parses `( expr, ... )`, returning the arguments and the closing span.
    fn parse_arguments(&mut self) -> ParseResult<(Vec<Node>, Span)> {
        self.expect(TokenKind::OpenParen, "'(' to open argument list")?;

        let mut arguments = Vec::new();
        if self.peek_kind() != TokenKind::CloseParen {
            arguments.push(self.parse_assignment_expression()?);
            while self.peek_kind() == TokenKind::Comma {
                self.next_token("','")?;
                arguments.push(self.parse_assignment_expression()?);
            }
        }

        let close = self.expect(TokenKind::CloseParen, "')' to close argument list")?;
        Ok((arguments, close.span))
    }

    fn parse_member_expression(&mut self) -> ParseResult<Node> {
        let mut object = self.parse_primary_expression()?;

        loop {
            let (property, computed, end) = match self.peek_kind() {
                TokenKind::Dot => {
                    self.next_token("'.'")?;
                    let name = self.expect(TokenKind::Identifier, "identifier following '.'")?;
                    let span = name.span;
                    (Node::new_identifier(name.value, span), false, span)
                }
                TokenKind::OpenBracket => {
                    self.next_token("'['")?;
                    let property = self.parse_expression()?;
                    let close = self.expect(
                        TokenKind::CloseBracket,
                        "']' to close computed member access",
                    )?;
                    (property, true, close.span)
                }
                _ => break,
            };

            let span = object.span.merge(end);
            object = Node::new(
                NodeKind::MemberExpr {
                    object: Box::new(object),
                    property: Box::new(property),
                    computed,
                },
                span,
            );
        }

        Ok(object)
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Node> {
        const EXPECTED: &str = "an identifier, a number or '('";
        let token = self.next_token(EXPECTED)?;

        match token.kind {
            TokenKind::Identifier => Ok(Node::new_identifier(token.value, token.span)),
            TokenKind::Number => match token.value.parse::<f64>() {
                Ok(value) => Ok(Node::new_number(value, token.span)),
                Err(_) => Err(ParseError::InvalidNumber {
                    text: token.value,
                    span: token.span,
                }),
            },
            TokenKind::OpenParen => {
                let value = self.parse_expression()?;
                self.expect(
                    TokenKind::CloseParen,
                    "')' to close parenthesized expression",
                )?;
                Ok(value)
            }
            _ => Err(Self::unexpected(token, EXPECTED)),
        }
    }
}

/// Tokenizes and parses source text into a Program node.
pub fn parse(input: &str) -> ParseResult<Node> {
    let tokens = crate::lexer::tokenize(input)?;
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::LexerErrorKind;
    use pretty_assertions::assert_eq;

    // Helper: parse and compare the source-like rendering of the program
    fn assert_parsed_string(input: &str, expected_output: &str) {
        let node = match parse(input) {
            Ok(result) => result,
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        };
        assert_eq!(node.to_string(), expected_output, "Input: '{}'", input);
    }

    // Helper for asserting parse errors by variant
    fn assert_parse_error(input: &str, expected_error_variant: ParseError) {
        match parse(input) {
            Ok(result) => panic!(
                "Expected parsing to fail for input '{}', but got: {:?}",
                input, result
            ),
            Err(e) => {
                assert_eq!(
                    std::mem::discriminant(&e),
                    std::mem::discriminant(&expected_error_variant),
                    "Input: '{}', Expected error variant like {:?}, got: {:?}",
                    input,
                    expected_error_variant,
                    e
                );
            }
        }
    }

    fn single_statement(input: &str) -> Node {
        match parse(input) {
            Ok(Node {
                kind: NodeKind::Program { mut body },
                ..
            }) if body.len() == 1 => body.remove(0),
            other => panic!("Expected a single statement for '{}', got {:?}", input, other),
        }
    }

    fn unexpected_eof() -> ParseError {
        ParseError::UnexpectedEof {
            expected: String::new(),
            span: Span::default(),
        }
    }

    fn unexpected_token() -> ParseError {
        ParseError::UnexpectedToken {
            found: Token::new(TokenKind::EndOfInput, "", Span::default()),
            expected: String::new(),
        }
    }

    #[test]
    fn test_parse_empty_program() {
        let program = parse("").unwrap();
        assert_eq!(program.kind, NodeKind::Program { body: vec![] });
        assert_eq!(program.span, Span::new(0, 0));
    }

    #[test]
    fn test_parse_atoms() {
        assert_eq!(single_statement("123"), Node::new_number(123.0, Span::new(0, 3)));
        assert_eq!(single_statement("4.5"), Node::new_number(4.5, Span::new(0, 3)));
        assert_eq!(
            single_statement("foo"),
            Node::new_identifier("foo", Span::new(0, 3))
        );
    }

    #[test]
    fn test_precedence() {
        assert_parsed_string("1 + 2 * 3", "(1 + (2 * 3))");
        assert_parsed_string("1 * 2 + 3", "((1 * 2) + 3)");
        assert_parsed_string("(1 + 2) * 3", "((1 + 2) * 3)");
        assert_parsed_string("10 % 4 / 2", "((10 % 4) / 2)");
    }

    #[test]
    fn test_left_associativity() {
        assert_parsed_string("1 - 2 - 3", "((1 - 2) - 3)");
        assert_parsed_string("8 / 4 / 2", "((8 / 4) / 2)");
    }

    #[test]
    fn test_binary_spans() {
        let node = single_statement("1 + 22");
        assert_eq!(node.span, Span::new(0, 6));
        match node.kind {
            NodeKind::BinaryExpr {
                left,
                right,
                operator,
            } => {
                assert_eq!(operator, BinaryOperator::Add);
                assert_eq!(left.span, Span::new(0, 1));
                assert_eq!(right.span, Span::new(4, 6));
            }
            other => panic!("Expected BinaryExpr, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_parsed_string("a = b = c", "(a = (b = c))");
        assert_parsed_string("x = 1 + 2;", "(x = (1 + 2))");
    }

    #[test]
    fn test_variable_declarations() {
        assert_parsed_string("let x = 10;", "let x = 10;");
        assert_parsed_string("const y = 1 + 1;", "const y = (1 + 1);");
        assert_parsed_string("let z;", "let z;");
        assert_parsed_string("let x = 10; x + 5;", "let x = 10;\n(x + 5)");

        match single_statement("let x;").kind {
            NodeKind::VariableDecl {
                identifier,
                value,
                constant,
            } => {
                assert_eq!(identifier, "x");
                assert_eq!(value, None);
                assert!(!constant);
            }
            other => panic!("Expected VariableDecl, got {:?}", other),
        }
    }

    #[test]
    fn test_variable_declaration_errors() {
        assert_parse_error(
            "const y;",
            ParseError::ConstWithoutInitializer {
                name: String::new(),
                span: Span::default(),
            },
        );
        assert_parse_error("let x = 1", unexpected_eof()); // missing ';'
        assert_parse_error("let = 1;", unexpected_token());
        assert_parse_error("let x 1;", unexpected_token());
    }

    #[test]
    fn test_function_declaration() {
        assert_parsed_string("fn add(x, y) { x + y }", "fn add(x, y) { (x + y) }");
        assert_parsed_string("fn noop() { }", "fn noop() { }");
        assert_parsed_string(
            "fn add(x, y) { x + y } add(2, 3);",
            "fn add(x, y) { (x + y) }\nadd(2, 3)",
        );

        match single_statement("fn f(a) { let b = a; b }").kind {
            NodeKind::FunctionDecl {
                name,
                parameters,
                body,
            } => {
                assert_eq!(name, "f");
                assert_eq!(parameters, vec!["a".to_string()]);
                assert_eq!(body.len(), 2);
            }
            other => panic!("Expected FunctionDecl, got {:?}", other),
        }
    }

    #[test]
    fn test_function_declaration_errors() {
        assert_parse_error(
            "fn f(x = 1) { x }",
            ParseError::InvalidParameter(Span::default()),
        );
        assert_parse_error(
            "fn f(1) { }",
            ParseError::InvalidParameter(Span::default()),
        );
        assert_parse_error("fn (x) { x }", unexpected_token());
        assert_parse_error("fn f(x) { x", unexpected_eof());
        assert_parse_error("fn f(x) x", unexpected_token());
    }

    #[test]
    fn test_object_literals() {
        assert_parsed_string("{ a: 1, b: 2 }", "{ a: 1, b: 2 }");
        assert_parsed_string("{ a, b: 2, c }", "{ a, b: 2, c }");
        assert_parsed_string("{ a: 1, }", "{ a: 1 }");
        assert_parsed_string("{}", "{ }");
        assert_parsed_string("{ inner: { x: 1 } }", "{ inner: { x: 1 } }");
        assert_parsed_string("let o = { a: 1 + 2 };", "let o = { a: (1 + 2) };");
    }

    #[test]
    fn test_object_literal_errors() {
        assert_parse_error("{ a: 1 b: 2 }", unexpected_token());
        assert_parse_error("{ 1: 2 }", unexpected_token());
        assert_parse_error("{ a: 1", unexpected_eof());
        assert_parse_error("{ a 1 }", unexpected_token());
    }

    #[test]
    fn test_calls() {
        assert_parsed_string("f()", "f()");
        assert_parsed_string("f(1, x)", "f(1, x)");
        assert_parsed_string("f()()", "f()()");
        assert_parsed_string("f(x = 1)", "f((x = 1))");
        assert_parsed_string("f(1) * 2", "(f(1) * 2)");
        assert_parsed_string("obj.method(1)", "obj.method(1)");
    }

    #[test]
    fn test_member_access() {
        assert_parsed_string("a.b.c", "a.b.c");
        assert_parsed_string("a[b + 1]", "a[(b + 1)]");
        assert_parsed_string("a.b[c].d", "a.b[c].d");

        match single_statement("a.b").kind {
            NodeKind::MemberExpr {
                object,
                property,
                computed,
            } => {
                assert_eq!(*object, Node::new_identifier("a", Span::new(0, 1)));
                assert_eq!(*property, Node::new_identifier("b", Span::new(2, 3)));
                assert!(!computed);
            }
            other => panic!("Expected MemberExpr, got {:?}", other),
        }
        match single_statement("a[1]").kind {
            NodeKind::MemberExpr { computed, .. } => assert!(computed),
            other => panic!("Expected MemberExpr, got {:?}", other),
        }
    }

    #[test]
    fn test_member_access_errors() {
        assert_parse_error("a.1", unexpected_token());
        assert_parse_error("a[1", unexpected_eof());
    }

    #[test]
    fn test_primary_errors() {
        assert_parse_error(")", unexpected_token());
        assert_parse_error("(1 + 2", unexpected_eof());
        assert_parse_error("1 +", unexpected_eof());
        assert_parse_error("let", unexpected_eof());
    }

    #[test]
    fn test_optional_semicolons() {
        assert_parsed_string("1; 2", "1\n2");
        assert_parsed_string("1 2", "1\n2");
    }

    #[test]
    fn test_parse_lexer_error_propagation() {
        assert_parse_error(
            "let x = 1 # 2;",
            ParseError::LexerError(LexerError {
                error: LexerErrorKind::UnrecognizedCharacter('#'),
                span: Span { start: 10, end: 11 },
            }),
        );
    }

    #[test]
    fn test_error_spans() {
        let err = parse("let x = 1 +;").unwrap_err();
        assert_eq!(err.span(), Span::new(11, 12));
        let err = parse("(1").unwrap_err();
        assert_eq!(err.span(), Span::new(2, 2));
    }

    #[test]
    fn test_parse_is_stable() {
        let input = "fn f(a, b) { let c = { a, b: b * 2 }; c.b } const r = f(1, 2); r";
        let first = parse(input).unwrap().to_record().unwrap();
        let second = parse(input).unwrap().to_record().unwrap();
        assert_eq!(first, second);
        assert_eq!(first["kind"], "Program");
        assert_eq!(first["body"][0]["kind"], "FunctionDecl");
        assert_eq!(first["body"][1]["kind"], "VariableDecl");
        assert_eq!(first["body"][1]["constant"], true);
        assert_eq!(first["body"][2]["kind"], "Identifier");
    }
}
