use tools::errors::Position;

use super::errors_parser::ParserError;
use super::{Expr, ExpressionKind, Parser, StatementKind, Stmt, TokenKind};
use crate::ast::{FnDeclaration, Param, TypeExpr};

impl Parser {
    // Function declaration. The syntax is:
    // func add(x, y int32, p *int32) int32 {
    //    return x + y + *p
    // }
    // Several return types are put in parenthesis: func f() (int32, bool)
    pub(super) fn parse_fn_declaration(&mut self) -> Result<Stmt, ParserError> {
        self.expect_token(TokenKind::Func)?;
        let name = self.expect_token(TokenKind::Identifier)?;
        let pos = name.pos();

        self.expect_token(TokenKind::OpenParen)?;
        let params = self.parse_params()?;
        self.expect_token(TokenKind::CloseParen)?;

        let return_types = self.parse_return_types()?;
        let body = self.parse_block()?;

        Ok(Stmt::new(
            StatementKind::FnDeclaration(FnDeclaration {
                name: name.value,
                params,
                return_types,
                body,
            }),
            pos,
        ))
    }

    // Names without type take the type of the next typed one: (a, b int32)
    fn parse_params(&mut self) -> Result<Vec<Param>, ParserError> {
        let mut params = vec![];
        let mut pending: Vec<(String, Position)> = vec![];

        while self.at().kind != TokenKind::CloseParen {
            let name = self.expect_token(TokenKind::Identifier)?;
            let pos = name.pos();
            pending.push((name.value, pos));

            match self.at().kind {
                TokenKind::Comma => {
                    self.eat();
                    continue;
                }
                TokenKind::CloseParen => break,
                _ => {}
            }

            let ty = self.parse_type()?;
            params.extend(pending.drain(..).map(|(name, pos)| Param {
                name,
                ty: ty.clone(),
                pos,
            }));

            match self.at().kind {
                TokenKind::Comma => {
                    self.eat();
                }
                _ => break,
            }
        }

        if let Some((name, _)) = pending.first() {
            return Err(ParserError::MissingParamType(name.clone()));
        }

        Ok(params)
    }

    fn parse_return_types(&mut self) -> Result<Vec<TypeExpr>, ParserError> {
        match self.at().kind {
            TokenKind::OpenParen => {
                self.eat();
                let mut types = vec![];

                while self.at().kind != TokenKind::CloseParen {
                    types.push(self.parse_type()?);

                    if self.at().kind != TokenKind::Comma {
                        break;
                    }
                    self.eat();
                }
                self.expect_token(TokenKind::CloseParen)?;

                Ok(types)
            }
            kind if kind.starts_type() => Ok(vec![self.parse_type()?]),
            _ => Ok(vec![]),
        }
    }

    // Arguments of a call, the callee has already been eaten
    pub(super) fn parse_call(&mut self, callee: String, pos: Position) -> Result<Expr, ParserError> {
        self.expect_token(TokenKind::OpenParen)?;

        let mut args = vec![];
        while self.at().kind != TokenKind::CloseParen {
            args.push(self.parse_expr()?);

            if self.at().kind != TokenKind::Comma {
                break;
            }
            self.eat();
        }
        self.expect_token(TokenKind::CloseParen)?;

        Ok(Expr::new(ExpressionKind::Call { callee, args }, pos))
    }

    // return [expr {, expr}]
    pub(super) fn parse_return(&mut self) -> Result<Stmt, ParserError> {
        let pos = self.expect_token(TokenKind::Return)?.pos();

        let values = match self.at().kind {
            TokenKind::Semicolon
            | TokenKind::CloseBrace
            | TokenKind::Case
            | TokenKind::Default
            | TokenKind::EOF => vec![],
            _ => self.parse_expr_list()?,
        };

        self.expect_statement_end()?;

        Ok(Stmt::new(StatementKind::Return(values), pos))
    }
}
