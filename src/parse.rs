//! Análisis sintáctico.
//!
//! Un parser de descenso recursivo con precedencia por niveles
//! consume la secuencia de tokens y construye un [`Program`]. Cada
//! no terminal de la gramática corresponde a un método de
//! [`Parser`]; los operadores binarios son asociativos a la
//! izquierda y la precedencia crece de `||` hacia los primarios:
//!
//! ```text
//! expr           := logic_or
//! logic_or       := logic_and  ( '||' logic_and )*
//! logic_and      := comparison ( '&&' comparison )*
//! comparison     := addition   ( ('=='|'!='|'<'|'>') addition )*
//! addition       := multiplication ( ('+'|'-') multiplication )*
//! multiplication := unary ( ('*'|'/') unary )*
//! unary          := ('-'|'!') unary | primary
//! primary        := literal | ident ( '(' args? ')' )? | '(' expr ')'
//! ```
//!
//! El primer error detiene el análisis por completo; no hay
//! recuperación ni resincronización. Todo error lleva la ubicación
//! del token ofensor.

use crate::{
    ast::{BinaryOp, Block, Expr, Function, Program, Stmt, UnaryOp},
    lex::{Keyword, Token, TokenKind},
    source::Located,
};
use thiserror::Error;

/// Longitud máxima de un identificador o nombre de función.
pub const MAX_ID_LEN: usize = 32;

/// Error de análisis sintáctico.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    /// Falta un terminal requerido en esta posición.
    #[error("expected {0}")]
    Expected(&'static str),

    /// El token actual no puede iniciar una expresión.
    #[error("expected expression")]
    ExpectedExpression,

    /// Un identificador supera la longitud máxima.
    #[error("identifier exceeds maximum length")]
    IdentifierTooLong,

    /// Un nombre de función supera la longitud máxima.
    #[error("function name exceeds maximum length")]
    FunctionNameTooLong,

    /// Una constante entera no cabe en 32 bits con signo.
    #[error("integer literal out of range")]
    IntLiteralOutOfRange,
}

pub type ParseResult<T> = Result<T, Located<ParserError>>;

/// Analiza una secuencia completa de tokens, producida por
/// [`crate::lex::Lexer`], y construye el programa. Una secuencia
/// sin funciones es válida y produce un programa vacío.
pub fn parse(tokens: &[Token<'_>]) -> ParseResult<Program> {
    let mut parser = Parser { tokens, current: 0 };
    parser.parse()
}

/// Estado del descenso recursivo: la secuencia de tokens y el
/// índice del token actual. El parser relee tokens pero nunca los
/// retiene más allá de [`parse`]; los nombres que terminan en el
/// árbol se copian a strings propios al construir cada nodo.
struct Parser<'a, 'b> {
    tokens: &'b [Token<'a>],
    current: usize,
}

impl<'a> Parser<'a, '_> {
    /********** NAVEGACIÓN DE TOKENS **********/

    /// Observa el token actual sin consumirlo.
    fn peek(&self) -> Token<'a> {
        self.tokens[self.current]
    }

    /// Observa el token siguiente al actual. El token de fin de
    /// archivo se repite si no hay más.
    fn peek_next(&self) -> Token<'a> {
        let last = self.tokens.len() - 1;
        self.tokens[(self.current + 1).min(last)]
    }

    /// Consume y retorna el token actual. El índice nunca avanza
    /// más allá del token de fin de archivo.
    fn advance(&mut self) -> Token<'a> {
        let token = self.peek();
        if !self.is_at_end() {
            self.current += 1;
        }

        token
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Determina si el token actual es de la clase dada.
    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consume el token actual si es de la clase dada.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Exige un token de la clase dada; error localizado si falta.
    fn expect(&mut self, kind: TokenKind, what: &'static str) -> ParseResult<Token<'a>> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(Located::at(ParserError::Expected(what), self.peek().location))
        }
    }

    /// Materializa el nombre de un token identificador, validando
    /// su longitud antes de crear nodo alguno.
    fn identifier_name(token: Token<'a>, error: ParserError) -> ParseResult<String> {
        if token.lexeme.len() > MAX_ID_LEN {
            return Err(Located::at(error, token.location));
        }

        Ok(token.lexeme.to_owned())
    }

    /********** EXPRESIONES **********/

    fn expression(&mut self) -> ParseResult<Expr> {
        self.logic_or()
    }

    fn logic_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.logic_and()?;

        while self.eat(TokenKind::Or) {
            let right = self.logic_and()?;
            left = binary(BinaryOp::Or, left, right);
        }

        Ok(left)
    }

    fn logic_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.comparison()?;

        while self.eat(TokenKind::And) {
            let right = self.comparison()?;
            left = binary(BinaryOp::And, left, right);
        }

        Ok(left)
    }

    /// Igualdad y relacionales comparten un mismo nivel.
    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.addition()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Equals => BinaryOp::Eq,
                TokenKind::NotEquals => BinaryOp::Ne,
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::Greater => BinaryOp::Gt,
                _ => break,
            };

            self.advance();
            let right = self.addition()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn addition(&mut self) -> ParseResult<Expr> {
        let mut left = self.multiplication()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };

            self.advance();
            let right = self.multiplication()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn multiplication(&mut self) -> ParseResult<Expr> {
        let mut left = self.unary()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Times => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };

            self.advance();
            let right = self.unary()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.primary(),
        };

        self.advance();
        let operand = self.unary()?;

        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        // Constante entera
        if self.check(TokenKind::IntLiteral) {
            let token = self.advance();
            let value = token
                .lexeme
                .parse()
                .map_err(|_| Located::at(ParserError::IntLiteralOutOfRange, token.location))?;

            return Ok(Expr::IntLiteral(value));
        }

        // Identificador, o llamada si le sigue `(`
        if self.check(TokenKind::Identifier) {
            let token = self.advance();
            let name = Self::identifier_name(token, ParserError::IdentifierTooLong)?;

            if self.eat(TokenKind::OpenParen) {
                let args = self.arguments()?;
                return Ok(Expr::Call { name, args });
            }

            return Ok(Expr::Identifier(name));
        }

        // Expresión entre paréntesis
        if self.eat(TokenKind::OpenParen) {
            let expr = self.expression()?;
            self.expect(TokenKind::CloseParen, "')' after expression")?;
            return Ok(expr);
        }

        Err(Located::at(
            ParserError::ExpectedExpression,
            self.peek().location,
        ))
    }

    /// Lista de argumentos de una llamada, tras consumir `(`.
    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();

        if !self.check(TokenKind::CloseParen) {
            loop {
                args.push(self.expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::CloseParen, "')' after arguments")?;

        Ok(args)
    }

    /********** SENTENCIAS **********/

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Int) => self.declaration(),
            TokenKind::Keyword(Keyword::Return) => self.return_statement(),
            TokenKind::Keyword(Keyword::If) => self.if_statement(),
            TokenKind::Keyword(Keyword::While) => self.while_statement(),
            TokenKind::OpenCurly => Ok(Stmt::Block(self.block()?)),
            _ => self.assignment_or_expr_stmt(),
        }
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::Keyword(Keyword::Int), "'int'")?;

        let name_token = self.expect(TokenKind::Identifier, "variable name")?;
        let name = Self::identifier_name(name_token, ParserError::IdentifierTooLong)?;

        let init = if self.eat(TokenKind::Assign) {
            Some(self.expression()?)
        } else {
            None
        };

        self.expect(TokenKind::Semicolon, "';' after declaration")?;

        Ok(Stmt::VarDecl { name, init })
    }

    /// Un identificador seguido de `=` es una asignación; cualquier
    /// otra cosa es una sentencia de expresión.
    fn assignment_or_expr_stmt(&mut self) -> ParseResult<Stmt> {
        if self.check(TokenKind::Identifier) && self.peek_next().kind == TokenKind::Assign {
            let name_token = self.advance();
            let name = Self::identifier_name(name_token, ParserError::IdentifierTooLong)?;

            self.advance(); // consume `=`
            let value = self.expression()?;
            self.expect(TokenKind::Semicolon, "';' after assignment")?;

            return Ok(Stmt::Assignment { name, value });
        }

        let expr = self.expression()?;
        self.expect(TokenKind::Semicolon, "';' after expression")?;

        Ok(Stmt::Expr(expr))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::Keyword(Keyword::Return), "'return'")?;
        let value = self.expression()?;
        self.expect(TokenKind::Semicolon, "';' after return value")?;

        Ok(Stmt::Return(value))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::Keyword(Keyword::If), "'if'")?;
        self.expect(TokenKind::OpenParen, "'(' after 'if'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::CloseParen, "')' after if condition")?;

        let then_block = self.block()?;

        Ok(Stmt::If {
            condition,
            then_block,
        })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::Keyword(Keyword::While), "'while'")?;
        self.expect(TokenKind::OpenParen, "'(' after 'while'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::CloseParen, "')' after while condition")?;

        let body = self.block()?;

        Ok(Stmt::While { condition, body })
    }

    fn block(&mut self) -> ParseResult<Block> {
        self.expect(TokenKind::OpenCurly, "'{'")?;

        let mut statements = Vec::new();
        while !self.check(TokenKind::CloseCurly) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        self.expect(TokenKind::CloseCurly, "'}'")?;

        Ok(Block { statements })
    }

    /********** FUNCIONES **********/

    fn function(&mut self) -> ParseResult<Function> {
        self.expect(TokenKind::Keyword(Keyword::Int), "'int' return type")?;

        let name_token = self.expect(TokenKind::Identifier, "function name")?;
        let name = Self::identifier_name(name_token, ParserError::FunctionNameTooLong)?;

        self.expect(TokenKind::OpenParen, "'(' after function name")?;
        let params = self.parameters()?;

        let body = self.block()?;

        Ok(Function { name, params, body })
    }

    /// Lista de parámetros, tras consumir `(`. Cada parámetro exige
    /// la anotación `int` aunque sea el único tipo del lenguaje.
    fn parameters(&mut self) -> ParseResult<Vec<String>> {
        let mut params = Vec::new();

        if !self.check(TokenKind::CloseParen) {
            loop {
                self.expect(TokenKind::Keyword(Keyword::Int), "'int' before parameter name")?;

                let name_token = self.expect(TokenKind::Identifier, "parameter name")?;
                params.push(Self::identifier_name(
                    name_token,
                    ParserError::IdentifierTooLong,
                )?);

                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::CloseParen, "')' after parameters")?;

        Ok(params)
    }

    fn parse(&mut self) -> ParseResult<Program> {
        let mut functions = Vec::new();

        while !self.is_at_end() {
            functions.push(self.function()?);
        }

        Ok(Program { functions })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Lexer;

    fn parse_source(source: &str) -> ParseResult<Program> {
        let tokens = Lexer::new(source).tokenize();
        parse(&tokens)
    }

    /// Analiza `int f () { return <fragment>; }` y extrae la
    /// expresión retornada.
    fn parse_expr(fragment: &str) -> Expr {
        let source = format!("int f () {{ return {}; }}", fragment);
        let mut program = parse_source(&source).expect("fragment should parse");

        match program.functions.remove(0).body.statements.remove(0) {
            Stmt::Return(expr) => expr,
            other => panic!("expected return statement, got {:?}", other),
        }
    }

    fn error_of(source: &str) -> Located<ParserError> {
        parse_source(source).expect_err("source should not parse")
    }

    #[test]
    fn empty_source_is_an_empty_program() {
        let program = parse_source("").unwrap();
        assert!(program.functions.is_empty());
    }

    #[test]
    fn literal_and_identifier_primaries() {
        assert_eq!(parse_expr("42"), Expr::IntLiteral(42));
        assert_eq!(parse_expr("x"), Expr::Identifier("x".to_owned()));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        // 1 + 2 * 3 === 1 + (2 * 3)
        match parse_expr("1 + 2 * 3") {
            Expr::Binary {
                op: BinaryOp::Add,
                left,
                right,
            } => {
                assert_eq!(*left, Expr::IntLiteral(1));
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }

            other => panic!("expected ADD at the root, got {:?}", other),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        // a && b || c === (a && b) || c
        match parse_expr("a && b || c") {
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                ..
            } => {
                assert!(matches!(
                    *left,
                    Expr::Binary {
                        op: BinaryOp::And,
                        ..
                    }
                ));
            }

            other => panic!("expected OR at the root, got {:?}", other),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        // (1 + 2) * 3
        match parse_expr("(1 + 2) * 3") {
            Expr::Binary {
                op: BinaryOp::Mul,
                left,
                right,
            } => {
                assert!(matches!(
                    *left,
                    Expr::Binary {
                        op: BinaryOp::Add,
                        ..
                    }
                ));
                assert_eq!(*right, Expr::IntLiteral(3));
            }

            other => panic!("expected MUL at the root, got {:?}", other),
        }
    }

    #[test]
    fn binary_operators_are_left_associative() {
        // 10 - 4 - 3 === (10 - 4) - 3
        match parse_expr("10 - 4 - 3") {
            Expr::Binary {
                op: BinaryOp::Sub,
                left,
                right,
            } => {
                assert!(matches!(
                    *left,
                    Expr::Binary {
                        op: BinaryOp::Sub,
                        ..
                    }
                ));
                assert_eq!(*right, Expr::IntLiteral(3));
            }

            other => panic!("expected SUB at the root, got {:?}", other),
        }
    }

    #[test]
    fn unary_negate_of_literal() {
        assert_eq!(
            parse_expr("-5"),
            Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(Expr::IntLiteral(5)),
            }
        );
    }

    #[test]
    fn unary_operators_nest() {
        assert_eq!(
            parse_expr("!!x"),
            Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(Expr::Identifier("x".to_owned())),
                }),
            }
        );
    }

    #[test]
    fn call_with_two_arguments() {
        assert_eq!(
            parse_expr("f(1, 2)"),
            Expr::Call {
                name: "f".to_owned(),
                args: vec![Expr::IntLiteral(1), Expr::IntLiteral(2)],
            }
        );
    }

    #[test]
    fn call_without_arguments() {
        assert_eq!(
            parse_expr("f()"),
            Expr::Call {
                name: "f".to_owned(),
                args: vec![],
            }
        );
    }

    #[test]
    fn equality_and_relational_share_a_level() {
        // Mismo nivel, asociativo a la izquierda:
        // 1 < 2 == 3 > 4 === (((1 < 2) == 3) > 4)
        match parse_expr("1 < 2 == 3 > 4") {
            Expr::Binary {
                op: BinaryOp::Gt,
                left,
                ..
            } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Eq, .. }));
            }

            other => panic!("expected GT at the root, got {:?}", other),
        }
    }

    #[test]
    fn declaration_with_and_without_initializer() {
        let program = parse_source("int f () { int x; int y = 3; }").unwrap();
        let statements = &program.functions[0].body.statements;

        assert_eq!(
            statements[0],
            Stmt::VarDecl {
                name: "x".to_owned(),
                init: None,
            }
        );
        assert_eq!(
            statements[1],
            Stmt::VarDecl {
                name: "y".to_owned(),
                init: Some(Expr::IntLiteral(3)),
            }
        );
    }

    #[test]
    fn assignment_is_distinguished_from_expression_statement() {
        let program = parse_source("int f () { x = 1; x; }").unwrap();
        let statements = &program.functions[0].body.statements;

        assert!(matches!(statements[0], Stmt::Assignment { .. }));
        assert!(matches!(statements[1], Stmt::Expr(_)));
    }

    #[test]
    fn if_and_while_statements() {
        let program = parse_source("int f () { if (x) { y = 1; } while (y) { y = 0; } }").unwrap();
        let statements = &program.functions[0].body.statements;

        assert!(matches!(statements[0], Stmt::If { .. }));
        assert!(matches!(statements[1], Stmt::While { .. }));
    }

    #[test]
    fn nested_blocks_parse_as_block_statements() {
        let program = parse_source("int f () { { int x; } }").unwrap();
        let statements = &program.functions[0].body.statements;

        match &statements[0] {
            Stmt::Block(block) => assert_eq!(block.statements.len(), 1),
            other => panic!("expected block statement, got {:?}", other),
        }
    }

    #[test]
    fn function_parameters_are_recorded_in_order() {
        let program = parse_source("int add (int a, int b) { return a + b; }").unwrap();
        assert_eq!(program.functions[0].params, vec!["a", "b"]);
    }

    #[test]
    fn whitespace_does_not_change_the_tree() {
        let compact = parse_source("int f(int a){return a+1;}").unwrap();
        let spaced = parse_source("int f (\n  int a\n) {\n  return a + 1;\n}\n").unwrap();
        assert_eq!(compact, spaced);
    }

    #[test]
    fn identifier_at_limit_is_accepted() {
        let name = "a".repeat(MAX_ID_LEN);
        let source = format!("int f () {{ int {}; }}", name);
        assert!(parse_source(&source).is_ok());
    }

    #[test]
    fn identifier_over_limit_is_rejected() {
        let name = "a".repeat(MAX_ID_LEN + 1);
        let source = format!("int f () {{ int {}; }}", name);
        let error = parse_source(&source).expect_err("long identifier should fail");
        assert_eq!(*error.val(), ParserError::IdentifierTooLong);
    }

    #[test]
    fn function_name_over_limit_is_rejected() {
        let name = "f".repeat(MAX_ID_LEN + 1);
        let source = format!("int {} () {{ return 0; }}", name);
        let error = parse_source(&source).expect_err("long function name should fail");
        assert_eq!(*error.val(), ParserError::FunctionNameTooLong);
    }

    #[test]
    fn int_literal_at_i32_limits() {
        assert_eq!(parse_expr("2147483647"), Expr::IntLiteral(i32::MAX));

        let error = error_of("int f () { return 2147483648; }");
        assert_eq!(*error.val(), ParserError::IntLiteralOutOfRange);
    }

    #[test]
    fn missing_semicolon_names_the_lexeme() {
        let error = error_of("int f () { return 1 }");
        assert!(error.val().to_string().contains("';'"));
    }

    #[test]
    fn missing_close_paren_names_the_lexeme() {
        let error = error_of("int f () { return (1; }");
        assert!(error.val().to_string().contains("')'"));
    }

    #[test]
    fn missing_expression_is_reported_as_such() {
        let error = error_of("int f () { return ; }");
        assert!(error.val().to_string().contains("expression"));
    }

    #[test]
    fn unknown_token_fails_where_an_expression_was_required() {
        let error = error_of("int f () { return @; }");
        assert_eq!(*error.val(), ParserError::ExpectedExpression);
    }

    #[test]
    fn error_location_points_at_the_offending_token() {
        let error = error_of("int f () {\n    return ;\n}");
        assert_eq!(error.location().line(), 2);
        assert_eq!(error.location().column(), 12);
    }

    #[test]
    fn malformed_parameter_list_is_rejected() {
        let error = error_of("int f (int) { return 0; }");
        assert_eq!(*error.val(), ParserError::Expected("parameter name"));

        let error = error_of("int f (a) { return 0; }");
        assert!(error.val().to_string().contains("'int'"));
    }

    #[test]
    fn statements_after_the_last_function_are_rejected() {
        let error = error_of("int f () { return 0; } return 1;");
        assert!(error.val().to_string().contains("'int'"));
    }
}
