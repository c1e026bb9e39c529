use super::errors_parser::ParserError;
use super::{Parser, StatementKind, Stmt, TokenKind};
use crate::ast::{IfBranch, SwitchCase};

impl Parser {
    // { statements }
    pub(super) fn parse_block(&mut self) -> Result<Vec<Stmt>, ParserError> {
        self.expect_token(TokenKind::OpenBrace)?;
        let body = self.parse_statement_list(&[TokenKind::CloseBrace]);
        self.expect_token(TokenKind::CloseBrace)?;

        Ok(body)
    }

    // if cond { } else if cond { } else { }
    pub(super) fn parse_if(&mut self) -> Result<Stmt, ParserError> {
        let pos = self.expect_token(TokenKind::If)?.pos();

        let mut branches = vec![self.parse_if_branch()?];
        let mut else_block = None;

        while self.at_else() {
            self.eat();

            if self.at().kind == TokenKind::If {
                self.eat();
                branches.push(self.parse_if_branch()?);
            } else {
                else_block = Some(self.parse_block()?);
                break;
            }
        }

        Ok(Stmt::new(
            StatementKind::If {
                branches,
                else_block,
            },
            pos,
        ))
    }

    fn parse_if_branch(&mut self) -> Result<IfBranch, ParserError> {
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;

        Ok(IfBranch { condition, body })
    }

    // `else` may also start the next line
    fn at_else(&mut self) -> bool {
        if self.at().kind == TokenKind::Semicolon
            && self.at().value == "\n"
            && self.peek(1).kind == TokenKind::Else
        {
            self.eat();
        }

        self.at().kind == TokenKind::Else
    }

    // Three forms:
    //   for { }
    //   for cond { }
    //   for init; cond; post { }
    // Every part of the last one is optional
    pub(super) fn parse_for(&mut self) -> Result<Stmt, ParserError> {
        let pos = self.expect_token(TokenKind::For)?.pos();

        let (init, condition, post) = match self.at().kind {
            TokenKind::OpenBrace => (None, None, None),
            TokenKind::Semicolon => self.parse_for_clauses(None)?,
            _ => {
                let first = self.parse_simple_statement()?;

                match (self.at().kind, first.kind) {
                    (TokenKind::Semicolon, kind) => {
                        self.parse_for_clauses(Some(Stmt::new(kind, first.pos)))?
                    }
                    (_, StatementKind::Expression(cond)) => (None, Some(cond), None),
                    _ => {
                        return Err(ParserError::FoundWrongToken(
                            TokenKind::Semicolon.label(),
                            self.at().describe(),
                        ))
                    }
                }
            }
        };

        let body = self.parse_block()?;

        Ok(Stmt::new(
            StatementKind::For {
                init: init.map(Box::new),
                condition,
                post: post.map(Box::new),
                body,
            },
            pos,
        ))
    }

    #[allow(clippy::type_complexity)]
    fn parse_for_clauses(
        &mut self,
        init: Option<Stmt>,
    ) -> Result<(Option<Stmt>, Option<super::Expr>, Option<Stmt>), ParserError> {
        self.expect_token(TokenKind::Semicolon)?;

        let condition = match self.at().kind {
            TokenKind::Semicolon => None,
            _ => Some(self.parse_expr()?),
        };
        self.expect_token(TokenKind::Semicolon)?;

        let post = match self.at().kind {
            TokenKind::OpenBrace => None,
            _ => Some(self.parse_simple_statement()?),
        };

        Ok((init, condition, post))
    }

    // switch expr {
    // case 1, 2:
    //     ...
    // default:
    //     ...
    // }
    pub(super) fn parse_switch(&mut self) -> Result<Stmt, ParserError> {
        let pos = self.expect_token(TokenKind::Switch)?.pos();
        let subject = self.parse_expr()?;

        self.expect_token(TokenKind::OpenBrace)?;

        let mut cases = vec![];
        let mut default = None;
        let clause_end = [TokenKind::Case, TokenKind::Default, TokenKind::CloseBrace];

        loop {
            self.skip_semicolons();

            match self.at().kind {
                TokenKind::Case => {
                    let case_pos = self.eat().pos();
                    let values = self.parse_expr_list()?;
                    self.expect_token(TokenKind::Colon)?;

                    let body = self.parse_statement_list(&clause_end);
                    cases.push(SwitchCase {
                        values,
                        body,
                        pos: case_pos,
                    });
                }
                TokenKind::Default => {
                    let default_pos = self.eat().pos();
                    self.expect_token(TokenKind::Colon)?;
                    let body = self.parse_statement_list(&clause_end);

                    // The first one is kept, parsing goes on
                    match default {
                        Some(_) => self.errors.push((ParserError::DuplicateDefault, default_pos)),
                        None => default = Some(body),
                    }
                }
                TokenKind::CloseBrace => break,
                _ => {
                    return Err(ParserError::FoundWrongToken(
                        "'case' or 'default'",
                        self.at().describe(),
                    ))
                }
            }
        }

        self.expect_token(TokenKind::CloseBrace)?;

        Ok(Stmt::new(
            StatementKind::Switch {
                subject,
                cases,
                default,
            },
            pos,
        ))
    }
}
