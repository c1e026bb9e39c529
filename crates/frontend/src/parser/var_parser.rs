use tools::errors::Position;

use super::errors_parser::ParserError;
use super::{Expr, ExpressionKind, Parser, StatementKind, Stmt, TokenKind};
use crate::ast::{AssignOp, AssignTarget, BinaryOp, IncDecOp};

impl Parser {
    // Variable declaration. The syntax is:
    //   var x int32
    //   var x, y int32 = 1, 2
    //   var x = 5
    // Without a type, an initial value is mandatory
    pub(super) fn parse_var_declaration(&mut self) -> Result<Stmt, ParserError> {
        let pos = self.expect_token(TokenKind::Var)?.pos();
        let names = self.parse_names()?;

        let var_type = match self.at().kind.starts_type() {
            true => Some(self.parse_type()?),
            false => None,
        };

        let values = match self.at().kind {
            TokenKind::Equals => {
                self.eat();
                self.parse_expr_list()?
            }
            _ => vec![],
        };

        if var_type.is_none() && values.is_empty() {
            return Err(ParserError::MissingVarTypeOrValue(names[0].0.clone()));
        }

        self.expect_statement_end()?;

        Ok(Stmt::new(
            StatementKind::VarDeclaration {
                names,
                var_type,
                values,
            },
            pos,
        ))
    }

    // const name [type] = value
    pub(super) fn parse_const_declaration(&mut self) -> Result<Stmt, ParserError> {
        self.expect_token(TokenKind::Const)?;
        let name = self.expect_token(TokenKind::Identifier)?;
        let pos = name.pos();

        let var_type = match self.at().kind.starts_type() {
            true => Some(self.parse_type()?),
            false => None,
        };

        // Constants must be initialized
        self.expect_token(TokenKind::Equals)?;
        let value = self.parse_expr()?;

        self.expect_statement_end()?;

        // The position of a constant is the one of its name, like variables
        Ok(Stmt::new(
            StatementKind::ConstDeclaration {
                name: name.value,
                var_type,
                value,
            },
            pos,
        ))
    }

    // ident {, ident}
    fn parse_names(&mut self) -> Result<Vec<(String, Position)>, ParserError> {
        let mut names = vec![];

        loop {
            let name = self.expect_token(TokenKind::Identifier)?;
            let pos = name.pos();
            names.push((name.value, pos));

            if self.at().kind != TokenKind::Comma {
                break;
            }
            self.eat();
        }

        Ok(names)
    }

    // Looks ahead for: ident {, ident} :=
    pub(super) fn at_short_declaration(&self) -> bool {
        let mut offset = 0;

        while self.peek(offset).kind == TokenKind::Identifier {
            match self.peek(offset + 1).kind {
                TokenKind::ColonEquals => return true,
                TokenKind::Comma => offset += 2,
                _ => return false,
            }
        }

        false
    }

    // Statements allowed in a for loop header: short declaration,
    // assignments, ++ / -- and bare expressions
    pub(super) fn parse_simple_statement(&mut self) -> Result<Stmt, ParserError> {
        let pos = self.at().pos();

        if self.at_short_declaration() {
            let names = self.parse_names()?;
            self.expect_token(TokenKind::ColonEquals)?;
            let values = self.parse_expr_list()?;

            return Ok(Stmt::new(
                StatementKind::ShortVarDeclaration { names, values },
                pos,
            ));
        }

        let left = self.parse_expr()?;

        let kind = match self.at().kind {
            TokenKind::Equals | TokenKind::CompoundAssign => {
                let target = self.to_assign_target(left)?;
                let op = match self.eat().value.as_str() {
                    "+" => AssignOp::Compound(BinaryOp::Add),
                    "-" => AssignOp::Compound(BinaryOp::Sub),
                    "*" => AssignOp::Compound(BinaryOp::Mul),
                    "/" => AssignOp::Compound(BinaryOp::Div),
                    _ => AssignOp::Assign,
                };
                let value = self.parse_expr()?;

                StatementKind::Assignment { target, op, value }
            }
            TokenKind::Increment | TokenKind::Decrement => {
                let target = self.to_assign_target(left)?;
                let op = match self.eat().kind {
                    TokenKind::Increment => IncDecOp::Inc,
                    _ => IncDecOp::Dec,
                };

                StatementKind::IncDec { target, op }
            }
            _ => StatementKind::Expression(left),
        };

        Ok(Stmt::new(kind, pos))
    }

    // Only a variable, a dereferenced variable or an array element can
    // receive a value
    fn to_assign_target(&mut self, expr: Expr) -> Result<AssignTarget, ParserError> {
        match expr.kind {
            ExpressionKind::Identifier(name) => Ok(AssignTarget::Identifier(name)),
            ExpressionKind::Index { name, indices } => Ok(AssignTarget::Index { name, indices }),
            ExpressionKind::Deref(inner) => match inner.kind {
                ExpressionKind::Identifier(name) => Ok(AssignTarget::Deref(name)),
                _ => {
                    self.error_pos = Some(expr.pos);
                    Err(ParserError::InvalidAssignTarget)
                }
            },
            _ => {
                self.error_pos = Some(expr.pos);
                Err(ParserError::InvalidAssignTarget)
            }
        }
    }
}
