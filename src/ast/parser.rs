use std::cell::RefCell;
use std::iter::Peekable;
use std::rc::Rc;

use crate::arena::TokenArena;
use crate::lexer::token::{Token, TokenKind};

use super::error::ParseError;
use super::node::{Args, BinaryOp, Expr, Ident, Node, UnaryOp};

/// Precedence-climbing parser over an eagerly lexed token slice.
///
/// Precedence, low to high: ternary (right-associative), `??`, equality,
/// comparison, additive, multiplicative, unary minus, postfix member
/// access/call, primary. Every other binary operator is left-associative.
pub struct Parser<'a> {
    tokens: Peekable<core::slice::Iter<'a, Rc<Token>>>,
    token_arena: Rc<RefCell<TokenArena>>,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: core::slice::Iter<'a, Rc<Token>>,
        token_arena: Rc<RefCell<TokenArena>>,
    ) -> Self {
        Self {
            tokens: tokens.peekable(),
            token_arena,
        }
    }

    /// Parses a single expression and requires it to consume the whole
    /// input: anything left over before `EOF` is a parse error.
    pub fn parse(&mut self) -> Result<Rc<Node>, ParseError> {
        let node = self.parse_expr()?;
        let token = self.next_token()?;

        if token.is_eof() {
            Ok(node)
        } else {
            Err(ParseError::UnexpectedToken((**token).clone()))
        }
    }

    fn node(&mut self, token: &Rc<Token>, expr: Expr) -> Rc<Node> {
        let token_id = self.token_arena.borrow_mut().alloc(Rc::clone(token));
        Rc::new(Node {
            token_id,
            expr: Rc::new(expr),
        })
    }

    fn next_token(&mut self) -> Result<&'a Rc<Token>, ParseError> {
        self.tokens.next().ok_or(ParseError::UnexpectedEOFDetected)
    }

    fn peek_kind(&mut self) -> Option<&TokenKind> {
        self.tokens.peek().map(|token| &token.kind)
    }

    fn parse_expr(&mut self) -> Result<Rc<Node>, ParseError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Rc<Node>, ParseError> {
        let cond = self.parse_null_coalesce()?;

        if matches!(self.peek_kind(), Some(TokenKind::Question)) {
            let token = self.next_token()?;
            let then = self.parse_ternary()?;
            let colon = self.next_token()?;
            if !matches!(colon.kind, TokenKind::Colon) {
                return Err(ParseError::ExpectedColon((**colon).clone()));
            }
            let otherwise = self.parse_ternary()?;
            Ok(self.node(
                token,
                Expr::Ternary {
                    cond,
                    then,
                    otherwise,
                },
            ))
        } else {
            Ok(cond)
        }
    }

    fn parse_null_coalesce(&mut self) -> Result<Rc<Node>, ParseError> {
        let mut lhs = self.parse_equality()?;

        while matches!(self.peek_kind(), Some(TokenKind::QuestionQuestion)) {
            let token = self.next_token()?;
            let rhs = self.parse_equality()?;
            lhs = self.node(token, Expr::Binary(BinaryOp::NullCoalesce, lhs, rhs));
        }

        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Rc<Node>, ParseError> {
        let mut lhs = self.parse_comparison()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => BinaryOp::Eq,
                Some(TokenKind::NeEq) => BinaryOp::Ne,
                _ => break,
            };
            let token = self.next_token()?;
            let rhs = self.parse_comparison()?;
            lhs = self.node(token, Expr::Binary(op, lhs, rhs));
        }

        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Rc<Node>, ParseError> {
        let mut lhs = self.parse_additive()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::Lte) => BinaryOp::Lte,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::Gte) => BinaryOp::Gte,
                _ => break,
            };
            let token = self.next_token()?;
            let rhs = self.parse_additive()?;
            lhs = self.node(token, Expr::Binary(op, lhs, rhs));
        }

        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Rc<Node>, ParseError> {
        let mut lhs = self.parse_multiplicative()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            let token = self.next_token()?;
            let rhs = self.parse_multiplicative()?;
            lhs = self.node(token, Expr::Binary(op, lhs, rhs));
        }

        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Rc<Node>, ParseError> {
        let mut lhs = self.parse_unary()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => break,
            };
            let token = self.next_token()?;
            let rhs = self.parse_unary()?;
            lhs = self.node(token, Expr::Binary(op, lhs, rhs));
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Rc<Node>, ParseError> {
        if matches!(self.peek_kind(), Some(TokenKind::Minus)) {
            let token = self.next_token()?;
            let rhs = self.parse_unary()?;
            Ok(self.node(token, Expr::Unary(UnaryOp::Negate, rhs)))
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Result<Rc<Node>, ParseError> {
        let mut node = self.parse_primary()?;

        while matches!(self.peek_kind(), Some(TokenKind::Dot)) {
            let _ = self.next_token()?;
            let member_token = self.next_token()?;
            let member = match &member_token.kind {
                TokenKind::Ident(name) => Ident::new(name),
                _ => return Err(ParseError::ExpectedMember((**member_token).clone())),
            };

            let access = self.node(member_token, Expr::Access(node, member));
            node = if matches!(self.peek_kind(), Some(TokenKind::LParen)) {
                let args = self.parse_args()?;
                self.node(member_token, Expr::Call(access, args))
            } else {
                access
            };
        }

        Ok(node)
    }

    fn parse_args(&mut self) -> Result<Args, ParseError> {
        let _ = self.next_token()?;
        let mut args = Args::new();

        if matches!(self.peek_kind(), Some(TokenKind::RParen)) {
            let _ = self.next_token()?;
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr()?);
            let token = self.next_token()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => break,
                _ => return Err(ParseError::ExpectedClosingParen((**token).clone())),
            }
        }

        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Rc<Node>, ParseError> {
        let token = self.next_token()?;

        match &token.kind {
            TokenKind::Number(n) => Ok(self.node(token, Expr::Number(*n))),
            TokenKind::Ident(name) => {
                let ident = Ident::new(name);
                Ok(self.node(token, Expr::Ident(ident)))
            }
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                let closing = self.next_token()?;
                match closing.kind {
                    TokenKind::RParen => Ok(inner),
                    _ => Err(ParseError::ExpectedClosingParen((**closing).clone())),
                }
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEOFDetected),
            _ => Err(ParseError::UnexpectedToken((**token).clone())),
        }
    }
}
