use std::collections::VecDeque;

mod array_parser;
mod control_parser;
mod errors_parser;
mod fn_parser;
mod var_parser;

pub use crate::ast::{
    BinaryOp, Expr, ExpressionKind, LogicalOp, Program, StatementKind, Stmt, UnaryOp,
};
pub use crate::lexer::{Lexer, Token, TokenKind};
pub use errors_parser::ParserError;

use tools::errors::{ErrorEntry, Position, ReportCodeErr};
use tracing::debug;

/// What a front end hands to the evaluator: the recovered AST and every
/// lexical and syntactic error found on the way, in source order.
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub program: Program,
    pub errors: Vec<ErrorEntry>,
}

/// Anything able to turn source text into a `Program`.
pub trait FrontEnd {
    fn parse(&self, source: &str) -> ParseOutput;
}

/// The hand written lexer and recursive descent parser of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoliteFrontEnd;

impl FrontEnd for GoliteFrontEnd {
    fn parse(&self, source: &str) -> ParseOutput {
        let mut lexer = Lexer::new();
        lexer.tokenize(source);

        let mut errors: Vec<ErrorEntry> = lexer
            .errors
            .iter()
            .map(|(e, pos)| e.report(*pos))
            .collect();

        let mut parser = Parser::default();
        let program = parser.build_ast(lexer.tokens);

        errors.extend(parser.errors.iter().map(|(e, pos)| e.report(*pos)));
        // Stable, so a lexical error stays before a syntactic one at the same place
        errors.sort_by_key(|e| e.position());

        debug!(
            declarations = program.declarations.len(),
            errors = errors.len(),
            "source parsed"
        );

        ParseOutput { program, errors }
    }
}

#[derive(Default)]
pub struct Parser {
    tokens: VecDeque<Token>,
    // Returned by `at` once the buffer is drained
    eof: Token,
    // Set when an error refers to a token already consumed
    error_pos: Option<Position>,
    pub errors: Vec<(ParserError, Position)>,
}

impl Parser {
    pub fn build_ast(&mut self, tokens: VecDeque<Token>) -> Program {
        self.tokens = tokens;
        self.errors.clear();
        self.eof = self
            .tokens
            .back()
            .cloned()
            .unwrap_or_default();

        let mut declarations = vec![];

        loop {
            self.skip_semicolons();

            if self.is_eof() {
                break;
            }

            let remaining = self.tokens.len();

            match self.parse_top_level() {
                Ok(stmt) => declarations.push(stmt),
                Err(e) => self.recover(e, remaining, &[]),
            }
        }

        Program { declarations }
    }

    // Only declarations are allowed at top level. Short declarations are
    // parsed anyway so the evaluator can report them properly.
    fn parse_top_level(&mut self) -> Result<Stmt, ParserError> {
        match self.at().kind {
            TokenKind::Func => self.parse_fn_declaration(),
            TokenKind::Var => self.parse_var_declaration(),
            TokenKind::Const => self.parse_const_declaration(),
            TokenKind::Identifier if self.at_short_declaration() => {
                let stmt = self.parse_simple_statement()?;
                self.expect_statement_end()?;
                Ok(stmt)
            }
            _ => Err(ParserError::NonDeclarationAtTopLevel(self.at().describe())),
        }
    }

    // Entry point of statement parsing, inside a block
    fn parse_statement(&mut self) -> Result<Stmt, ParserError> {
        let pos = self.at().pos();

        match self.at().kind {
            TokenKind::Var => self.parse_var_declaration(),
            TokenKind::Const => self.parse_const_declaration(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::OpenBrace => {
                let body = self.parse_block()?;
                Ok(Stmt::new(StatementKind::Block(body), pos))
            }
            TokenKind::Func => {
                let name = self
                    .tokens
                    .get(1)
                    .map(|t| t.value.clone())
                    .unwrap_or_default();

                Err(ParserError::NestedFunction(name))
            }
            TokenKind::Break | TokenKind::Continue => {
                let kind = match self.eat().kind {
                    TokenKind::Break => StatementKind::Break,
                    _ => StatementKind::Continue,
                };
                self.expect_statement_end()?;

                Ok(Stmt::new(kind, pos))
            }
            TokenKind::Return => self.parse_return(),
            _ => {
                let stmt = self.parse_simple_statement()?;

                // A lonely expression is only allowed if it is a call
                if let StatementKind::Expression(expr) = &stmt.kind {
                    if !matches!(expr.kind, ExpressionKind::Call { .. }) {
                        self.error_pos = Some(expr.pos);
                        return Err(ParserError::UnusedExpression);
                    }
                }

                self.expect_statement_end()?;
                Ok(stmt)
            }
        }
    }

    // Statements of a `{...}` body or a switch clause, until one of the
    // closing tokens. Errors are recorded and parsing goes on.
    fn parse_statement_list(&mut self, closing: &[TokenKind]) -> Vec<Stmt> {
        let mut stmts = vec![];

        loop {
            self.skip_semicolons();

            if self.is_eof() || closing.contains(&self.at().kind) {
                break;
            }

            let remaining = self.tokens.len();

            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => self.recover(e, remaining, closing),
            }
        }

        stmts
    }

    // Records the error then skips to the next statement boundary: a
    // separator, or one of the closing tokens of the current level
    fn recover(&mut self, err: ParserError, remaining: usize, closing: &[TokenKind]) {
        let pos = self.error_pos.take().unwrap_or_else(|| self.at().pos());
        self.errors.push((err, pos));

        let mut depth = 0usize;
        while !self.is_eof() {
            match self.at().kind {
                kind if depth == 0 && closing.contains(&kind) => break,
                TokenKind::OpenBrace => depth += 1,
                TokenKind::CloseBrace => depth = depth.saturating_sub(1),
                TokenKind::Semicolon if depth == 0 => {
                    self.eat();
                    break;
                }
                _ => {}
            }
            self.eat();
        }

        // We always move forward, otherwise a stray token would loop forever
        if self.tokens.len() == remaining && !self.is_eof() {
            self.eat();
        }
    }

    fn expect_statement_end(&mut self) -> Result<(), ParserError> {
        match self.at().kind {
            TokenKind::Semicolon => {
                self.eat();
                Ok(())
            }
            TokenKind::CloseBrace | TokenKind::Case | TokenKind::Default | TokenKind::EOF => {
                Ok(())
            }
            _ => Err(ParserError::ExpectedStatementEnd(self.at().describe())),
        }
    }

    // -------------
    //  Expressions
    // -------------
    // Precedence, from lowest to highest:
    // or > and > equality > relational > additive > multiplicative > unary > primary
    pub(super) fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        self.parse_or_expr()
    }

    pub(super) fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParserError> {
        let mut exprs = vec![self.parse_expr()?];

        while self.at().kind == TokenKind::Comma {
            self.eat();
            exprs.push(self.parse_expr()?);
        }

        Ok(exprs)
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_and_expr()?;

        while self.at().kind == TokenKind::OrOr {
            self.eat();
            let right = self.parse_and_expr()?;
            left = logical(left, LogicalOp::Or, right);
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_equality_expr()?;

        while self.at().kind == TokenKind::AndAnd {
            self.eat();
            let right = self.parse_equality_expr()?;
            left = logical(left, LogicalOp::And, right);
        }

        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_relational_expr()?;

        loop {
            let op = match self.at().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.eat();

            let right = self.parse_relational_expr()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_additive_expr()?;

        loop {
            let op = match self.at().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.eat();

            let right = self.parse_additive_expr()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match self.at().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.eat();

            let right = self.parse_multiplicative_expr()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.at().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.eat();

            let right = self.parse_unary_expr()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParserError> {
        let pos = self.at().pos();

        let kind = match self.at().kind {
            TokenKind::Minus | TokenKind::Bang => {
                let op = match self.eat().kind {
                    TokenKind::Minus => UnaryOp::Neg,
                    _ => UnaryOp::Not,
                };

                ExpressionKind::Unary {
                    op,
                    operand: Box::new(self.parse_unary_expr()?),
                }
            }
            TokenKind::Amp => {
                self.eat();

                // We only take the address of variables
                if self.at().kind != TokenKind::Identifier {
                    return Err(ParserError::AddressOfNonIdentifier);
                }
                ExpressionKind::AddressOf(self.eat().value)
            }
            TokenKind::Star => {
                self.eat();
                ExpressionKind::Deref(Box::new(self.parse_unary_expr()?))
            }
            _ => return self.parse_primary_expr(),
        };

        Ok(Expr::new(kind, pos))
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParserError> {
        let pos = self.at().pos();

        let kind = match self.at().kind {
            TokenKind::Int => ExpressionKind::IntLiteral(self.eat().value),
            TokenKind::Float => ExpressionKind::FloatLiteral(self.eat().value),
            TokenKind::Str => ExpressionKind::StringLiteral(self.eat().value),
            TokenKind::Rune => ExpressionKind::RuneLiteral(self.eat().value),
            TokenKind::True | TokenKind::False => {
                ExpressionKind::BoolLiteral(self.eat().kind == TokenKind::True)
            }
            TokenKind::Nil => {
                self.eat();
                ExpressionKind::NilLiteral
            }
            TokenKind::OpenParen => {
                self.eat();
                let expr = self.parse_expr()?;
                self.expect_token(TokenKind::CloseParen)?;

                return Ok(expr);
            }
            TokenKind::OpenBracket => return self.parse_array_literal(),
            TokenKind::Identifier => return self.parse_identifier_expr(),
            _ => return Err(ParserError::UnexpectedToken(self.at().describe())),
        };

        Ok(Expr::new(kind, pos))
    }

    // Identifier, call (maybe qualified: fmt.Println) or array indexing
    fn parse_identifier_expr(&mut self) -> Result<Expr, ParserError> {
        let pos = self.at().pos();
        let mut name = self.eat().value;

        let qualified = self.at().kind == TokenKind::Dot;
        if qualified {
            self.eat();
            let member = self.expect_token(TokenKind::Identifier)?;
            name = format!("{name}.{}", member.value);
        }

        match self.at().kind {
            TokenKind::OpenParen => self.parse_call(name, pos),
            _ if qualified => {
                self.error_pos = Some(pos);
                Err(ParserError::QualifiedNameNotCalled(name))
            }
            TokenKind::OpenBracket => {
                let indices = self.parse_indices()?;
                Ok(Expr::new(ExpressionKind::Index { name, indices }, pos))
            }
            _ => Ok(Expr::new(ExpressionKind::Identifier(name), pos)),
        }
    }

    // ---------
    //  Helpers
    // ---------
    fn at(&self) -> &Token {
        self.tokens.front().unwrap_or(&self.eof)
    }

    fn peek(&self, offset: usize) -> &Token {
        self.tokens.get(offset).unwrap_or(&self.eof)
    }

    fn eat(&mut self) -> Token {
        self.tokens.pop_front().unwrap_or_else(|| self.eof.clone())
    }

    // Does not consume the token on failure, so errors point at it
    fn expect_token(&mut self, token_kind: TokenKind) -> Result<Token, ParserError> {
        if self.at().kind != token_kind {
            return Err(ParserError::FoundWrongToken(
                token_kind.label(),
                self.at().describe(),
            ));
        }

        Ok(self.eat())
    }

    fn skip_semicolons(&mut self) {
        while self.at().kind == TokenKind::Semicolon {
            self.eat();
        }
    }

    // Is end of file
    fn is_eof(&self) -> bool {
        self.at().kind == TokenKind::EOF
    }
}

fn binary(lhs: Expr, op: BinaryOp, rhs: Expr) -> Expr {
    let pos = lhs.pos;
    Expr::new(
        ExpressionKind::Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        },
        pos,
    )
}

fn logical(lhs: Expr, op: LogicalOp, rhs: Expr) -> Expr {
    let pos = lhs.pos;
    Expr::new(
        ExpressionKind::Logical {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        },
        pos,
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn parse(code: &str) -> ParseOutput {
        GoliteFrontEnd.parse(code)
    }

    pub(crate) fn parse_ok(code: &str) -> Program {
        let out = parse(code);
        assert!(out.errors.is_empty(), "unexpected errors: {:?}", out.errors);
        out.program
    }

    // Body of the first function of the program
    pub(crate) fn main_body(code: &str) -> Vec<Stmt> {
        match parse_ok(code).declarations.remove(0).kind {
            StatementKind::FnDeclaration(decl) => decl.body,
            other => panic!("expected a function, got {other:?}"),
        }
    }

    fn lit(value: &str, line: u32, column: u32) -> Expr {
        Expr::new(
            ExpressionKind::IntLiteral(value.into()),
            Position::new(line, column),
        )
    }

    #[test]
    fn parse_binary_precedence() {
        let body = main_body("func main() { x := 1 + 2 * 3 }");

        let StatementKind::ShortVarDeclaration { values, .. } = &body[0].kind else {
            panic!("expected a short declaration");
        };

        assert_eq!(
            values[0],
            binary(
                lit("1", 1, 20),
                BinaryOp::Add,
                binary(lit("2", 1, 24), BinaryOp::Mul, lit("3", 1, 28)),
            )
        );
    }

    #[test]
    fn parse_logical_precedence() {
        let body = main_body("func main() { x := a || b && !c }");

        let StatementKind::ShortVarDeclaration { values, .. } = &body[0].kind else {
            panic!("expected a short declaration");
        };

        let ExpressionKind::Logical { op, rhs, .. } = &values[0].kind else {
            panic!("expected a logical expression");
        };
        assert_eq!(*op, LogicalOp::Or);
        assert!(matches!(
            rhs.kind,
            ExpressionKind::Logical {
                op: LogicalOp::And,
                ..
            }
        ));
    }

    #[test]
    fn parse_qualified_call() {
        let body = main_body("func main() {\n fmt.Println(\"hi\", 2)\n}");

        assert_eq!(
            body[0].kind,
            StatementKind::Expression(Expr::new(
                ExpressionKind::Call {
                    callee: "fmt.Println".into(),
                    args: vec![
                        Expr::new(
                            ExpressionKind::StringLiteral("hi".into()),
                            Position::new(2, 14)
                        ),
                        lit("2", 2, 20),
                    ],
                },
                Position::new(2, 2)
            ))
        );
    }

    #[test]
    fn lonely_expression_is_rejected() {
        let out = parse("func main() {\n 5\n x := 1\n}");

        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].description, "expression is evaluated but not used");
        assert_eq!((out.errors[0].line, out.errors[0].column), (2, 2));
        // Parsing went on after the error
        let StatementKind::FnDeclaration(decl) = &out.program.declarations[0].kind else {
            panic!("expected a function");
        };
        assert_eq!(decl.body.len(), 1);
    }

    #[test]
    fn statements_at_top_level_are_rejected() {
        let out = parse("println(1)\nvar x int32 = 1");

        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].line, 1);
        assert_eq!(out.program.declarations.len(), 1);
    }

    #[test]
    fn recovers_from_many_errors() {
        let out = parse("func main() {\n x := )\n y = = 2\n z := 3\n}\nfunc f( {}");

        assert_eq!(out.errors.len(), 3);
        assert!(out.errors.iter().all(|e| e.kind == tools::errors::ErrorKind::Syntactic));
        assert_eq!(out.errors[0].line, 2);
        assert_eq!(out.errors[1].line, 3);
    }

    #[test]
    fn lexical_errors_come_first_at_same_position() {
        let out = parse("var s string = \"abc");

        assert_eq!(out.errors[0].kind, tools::errors::ErrorKind::Lexical);
    }
}
