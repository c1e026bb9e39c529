use super::errors_parser::ParserError;
use super::{Expr, ExpressionKind, Parser, TokenKind};
use crate::ast::TypeExpr;

impl Parser {
    // Types: int32, float32, bool, string, rune, [N]T and *T
    pub(super) fn parse_type(&mut self) -> Result<TypeExpr, ParserError> {
        let ty = match self.at().kind {
            TokenKind::Int32Type => TypeExpr::Int32,
            TokenKind::Float32Type => TypeExpr::Float32,
            TokenKind::BoolType => TypeExpr::Bool,
            TokenKind::StringType => TypeExpr::String,
            TokenKind::RuneType => TypeExpr::Rune,
            TokenKind::OpenBracket => {
                self.eat();
                let size = self.parse_expr()?;
                self.expect_token(TokenKind::CloseBracket)?;

                return Ok(TypeExpr::Array {
                    size: Box::new(size),
                    elem: Box::new(self.parse_type()?),
                });
            }
            TokenKind::Star => {
                self.eat();
                return Ok(TypeExpr::Pointer(Box::new(self.parse_type()?)));
            }
            _ => return Err(ParserError::ExpectedType(self.at().describe())),
        };

        self.eat();
        Ok(ty)
    }

    // One index per dimension: a[i][j]
    pub(super) fn parse_indices(&mut self) -> Result<Vec<Expr>, ParserError> {
        let mut indices = vec![];

        while self.at().kind == TokenKind::OpenBracket {
            self.eat();
            indices.push(self.parse_expr()?);
            self.expect_token(TokenKind::CloseBracket)?;
        }

        Ok(indices)
    }

    // [3]int32{1, 2, 3} or [2][2]int32{{1, 2}, {3, 4}}
    pub(super) fn parse_array_literal(&mut self) -> Result<Expr, ParserError> {
        let pos = self.at().pos();
        let ty = self.parse_type()?;

        let elements = self.parse_composite_list()?;

        Ok(Expr::new(ExpressionKind::ArrayLiteral { ty, elements }, pos))
    }

    // Elements between braces, nested lists are allowed. Newlines are
    // free inside the braces.
    fn parse_composite_list(&mut self) -> Result<Vec<Expr>, ParserError> {
        self.expect_token(TokenKind::OpenBrace)?;
        let mut elements = vec![];

        loop {
            self.skip_semicolons();

            if self.at().kind == TokenKind::CloseBrace {
                break;
            }

            let element = match self.at().kind {
                TokenKind::OpenBrace => {
                    let pos = self.at().pos();
                    Expr::new(
                        ExpressionKind::CompositeList(self.parse_composite_list()?),
                        pos,
                    )
                }
                _ => self.parse_expr()?,
            };
            elements.push(element);

            self.skip_semicolons();
            if self.at().kind != TokenKind::Comma {
                break;
            }
            self.eat();
        }

        self.skip_semicolons();
        self.expect_token(TokenKind::CloseBrace)?;

        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::main_body;
    use super::super::{StatementKind, Stmt};
    use super::*;
    use pretty_assertions::assert_eq;
    use tools::errors::Position;

    fn first_value(body: &[Stmt]) -> &Expr {
        match &body[0].kind {
            StatementKind::ShortVarDeclaration { values, .. } => &values[0],
            StatementKind::VarDeclaration { values, .. } => &values[0],
            other => panic!("expected a declaration, got {other:?}"),
        }
    }

    #[test]
    fn parse_array_types() {
        let body = main_body("func main() { var m [2][3]int32\n var p *[4]bool }");

        let StatementKind::VarDeclaration { var_type, .. } = &body[0].kind else {
            panic!("expected a var declaration");
        };
        let Some(TypeExpr::Array { size, elem }) = var_type else {
            panic!("expected an array type");
        };
        assert_eq!(size.kind, ExpressionKind::IntLiteral("2".into()));
        assert!(matches!(**elem, TypeExpr::Array { .. }));

        let StatementKind::VarDeclaration { var_type, .. } = &body[1].kind else {
            panic!("expected a var declaration");
        };
        assert!(matches!(var_type, Some(TypeExpr::Pointer(inner)) if matches!(**inner, TypeExpr::Array { .. })));
    }

    #[test]
    fn parse_flat_literal() {
        let body = main_body("func main() { a := [3]int32{1, 2, 3} }");

        let ExpressionKind::ArrayLiteral { ty, elements } = &first_value(&body).kind else {
            panic!("expected an array literal");
        };
        assert!(matches!(ty, TypeExpr::Array { .. }));
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn parse_nested_literal_over_lines() {
        let body = main_body(
            "func main() {
                m := [2][2]int32{
                    {1, 2},
                    {3, 4}
                }
            }",
        );

        let ExpressionKind::ArrayLiteral { elements, .. } = &first_value(&body).kind else {
            panic!("expected an array literal");
        };
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].pos, Position::new(4, 21));
        assert!(matches!(&elements[1].kind, ExpressionKind::CompositeList(inner) if inner.len() == 2));
    }

    #[test]
    fn parse_index_expression() {
        let body = main_body("func main() { x := m[i][j + 1] }");

        let ExpressionKind::Index { name, indices } = &first_value(&body).kind else {
            panic!("expected an index expression");
        };
        assert_eq!(name, "m");
        assert_eq!(indices.len(), 2);
    }
}
