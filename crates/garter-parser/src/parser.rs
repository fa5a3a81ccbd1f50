use garter_lexer::Lexer;
use garter_syntax::ast::*;
use garter_syntax::error::{error_at, ErrorKind, Result};
use garter_syntax::token::{Token, TokenKind};

/// Recursive-descent parser for garter.
///
/// Tokens are pulled from the lexer only when a grammar rule needs to look
/// at them. After a statement's closing `;` (or block terminator) nothing
/// more is read, so an interactive session never waits for input it does
/// not need yet.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Option<Token>,
    lookahead: Option<Token>,
    reached_eof: bool,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            current: None,
            lookahead: None,
            reached_eof: false,
        }
    }

    /// `true` once [`parse_top_level_item`](Self::parse_top_level_item)
    /// has returned `Ok(None)` because the input is exhausted.
    pub fn reached_end_of_file(&self) -> bool {
        self.reached_eof
    }

    /// Parses the whole input. One malformed item fails the whole parse.
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut items = Vec::new();
        while let Some(item) = self.parse_top_level_item()? {
            items.push(item);
        }
        Ok(Program { items })
    }

    /// Parses a single function definition or statement.
    ///
    /// Returns `Ok(None)` at end of input. No attempt is made to
    /// resynchronize after an error.
    pub fn parse_top_level_item(&mut self) -> Result<Option<Item>> {
        let tk = self.current()?;
        if tk.is_eof() {
            self.reached_eof = true;
            return Ok(None);
        }
        if matches!(tk.kind, TokenKind::Def | TokenKind::Extern) {
            Ok(Some(Item::Function(self.parse_function()?)))
        } else {
            Ok(Some(Item::Stmt(self.parse_statement()?)))
        }
    }

    // ---- token plumbing ----

    fn next_raw(&mut self) -> Token {
        match self.lookahead.take() {
            Some(tk) => tk,
            None => self.lexer.next_token(),
        }
    }

    fn current(&mut self) -> Result<&Token> {
        let tk = match self.current.take() {
            Some(tk) => tk,
            None => self.next_raw(),
        };
        let tk = self.current.insert(tk);
        match tk.to_error() {
            Some(e) => Err(e),
            None => Ok(tk),
        }
    }

    /// The token after the current one.
    fn peek(&mut self) -> Result<&Token> {
        self.current()?;
        let tk = match self.lookahead.take() {
            Some(tk) => tk,
            None => self.lexer.next_token(),
        };
        let tk = self.lookahead.insert(tk);
        match tk.to_error() {
            Some(e) => Err(e),
            None => Ok(tk),
        }
    }

    fn bump(&mut self) -> Result<Token> {
        let tk = match self.current.take() {
            Some(tk) => tk,
            None => self.next_raw(),
        };
        match tk.to_error() {
            Some(e) => Err(e),
            None => Ok(tk),
        }
    }

    fn check(&mut self, kind: &TokenKind) -> Result<bool> {
        Ok(self.current()?.kind == *kind)
    }

    fn check_any(&mut self, kinds: &[TokenKind]) -> Result<bool> {
        let tk = self.current()?;
        Ok(kinds.contains(&tk.kind))
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool> {
        if self.check(kind)? {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn mismatch<T>(tk: &Token, expected: &str) -> Result<T> {
        error_at(
            ErrorKind::Syntax,
            tk.line,
            tk.col,
            format!("Expected {}, found {}", expected, tk.kind),
        )
    }

    fn unexpected<T>(&mut self, expected: &str) -> Result<T> {
        let tk = self.current()?;
        Self::mismatch(tk, expected)
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.check(&kind)? {
            self.bump()
        } else {
            self.unexpected(expected)
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<String> {
        let tk = self.bump()?;
        match tk.kind {
            TokenKind::Ident(name) => Ok(name),
            kind => Self::mismatch(&Token::new(kind, tk.line, tk.col), expected),
        }
    }

    // ---- items and statements ----

    fn parse_function(&mut self) -> Result<FunctionDef> {
        let is_extern = self.eat(&TokenKind::Extern)?;
        self.expect(TokenKind::Def, "'def'")?;
        let name = self.expect_ident("function name after 'def'")?;
        self.expect(TokenKind::LParen, "'('")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen)? {
            loop {
                let (line, col) = {
                    let tk = self.current()?;
                    (tk.line, tk.col)
                };
                let param = self.expect_ident("parameter name")?;
                if params.contains(&param) {
                    return error_at(
                        ErrorKind::Syntax,
                        line,
                        col,
                        format!("Duplicate parameter '{}' in function '{}'", param, name),
                    );
                }
                params.push(param);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "',' or ')' in parameter list")?;
        self.expect(TokenKind::Colon, "':' after function signature")?;
        let body = self.parse_block(&[TokenKind::EndDef])?;
        self.expect(TokenKind::EndDef, "'enddef'")?;

        Ok(FunctionDef {
            name,
            params,
            body,
            is_extern,
        })
    }

    /// Statements up to (not including) one of `terminators`.
    fn parse_block(&mut self, terminators: &[TokenKind]) -> Result<Vec<Stmt>> {
        let mut body = Vec::new();
        while !self.check_any(terminators)? {
            if self.current()?.is_eof() {
                let closer = terminators.last().map(|k| k.to_string()).unwrap_or_default();
                return self.unexpected(&closer);
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let kind = &self.current()?.kind;
        match kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Print => self.parse_print(),
            TokenKind::Return => {
                self.bump()?;
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon, "';' after return value")?;
                Ok(Stmt::Return(value))
            }
            TokenKind::Pass => {
                self.bump()?;
                self.expect(TokenKind::Semicolon, "';' after 'pass'")?;
                Ok(Stmt::Pass)
            }
            TokenKind::Ident(_) => {
                if self.peek()?.kind == TokenKind::Equal {
                    let target = self.expect_ident("assignment target")?;
                    self.bump()?;
                    let value = self.parse_expr()?;
                    self.expect(TokenKind::Semicolon, "';' after assignment")?;
                    Ok(Stmt::Assign { target, value })
                } else {
                    self.parse_expr_statement()
                }
            }
            TokenKind::Eof => self.unexpected("statement"),
            k if k.is_keyword() && !matches!(k, TokenKind::Not) => self.unexpected("statement"),
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_expr_statement(&mut self) -> Result<Stmt> {
        let e = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "';' after expression")?;
        Ok(Stmt::Expr(e))
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        const ARM_END: [TokenKind; 3] = [TokenKind::Elif, TokenKind::Else, TokenKind::EndIf];

        self.expect(TokenKind::If, "'if'")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Colon, "':' after condition")?;
        let body = self.parse_block(&ARM_END)?;

        let mut elifs = Vec::new();
        while self.eat(&TokenKind::Elif)? {
            let cond = self.parse_expr()?;
            self.expect(TokenKind::Colon, "':' after condition")?;
            let body = self.parse_block(&ARM_END)?;
            elifs.push(ElifClause { cond, body });
        }

        let mut else_body = Vec::new();
        if self.eat(&TokenKind::Else)? {
            self.expect(TokenKind::Colon, "':' after 'else'")?;
            else_body = self.parse_block(&[TokenKind::EndIf])?;
        }
        self.expect(TokenKind::EndIf, "'endif'")?;

        Ok(Stmt::If {
            cond,
            body,
            elifs,
            else_body,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::While, "'while'")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Colon, "':' after condition")?;
        let body = self.parse_block(&[TokenKind::EndWhile])?;
        self.expect(TokenKind::EndWhile, "'endwhile'")?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_print(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::Print, "'print'")?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::Semicolon)? {
            loop {
                args.push(self.parse_expr()?);
                if self.eat(&TokenKind::Comma)? {
                    continue;
                }
                self.expect(TokenKind::Semicolon, "',' or ';' in print statement")?;
                break;
            }
        }
        Ok(Stmt::Print(args))
    }

    // ---- expressions, loosest binding first ----

    /// Parses one expression.
    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or)? {
            let rhs = self.parse_and()?;
            lhs = Expr::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_not()?;
        while self.eat(&TokenKind::And)? {
            let rhs = self.parse_not()?;
            lhs = Expr::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat(&TokenKind::Not)? {
            let operand = self.parse_not()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.parse_comparison()
    }

    fn comparison_op(&mut self) -> Result<Option<BinaryOp>> {
        let op = match self.current()?.kind {
            TokenKind::Less => BinaryOp::Lt,
            TokenKind::Greater => BinaryOp::Gt,
            TokenKind::LessEq => BinaryOp::Le,
            TokenKind::GreaterEq => BinaryOp::Ge,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::Ne,
            TokenKind::In => BinaryOp::In,
            TokenKind::Not => BinaryOp::NotIn,
            _ => return Ok(None),
        };
        // `not` only continues a comparison as part of `not in`.
        if op == BinaryOp::NotIn && self.peek()?.kind != TokenKind::In {
            return Ok(None);
        }
        Ok(Some(op))
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        while let Some(op) = self.comparison_op()? {
            self.bump()?;
            if op == BinaryOp::NotIn {
                self.bump()?;
            }
            let rhs = self.parse_additive()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.current()?.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.bump()?;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current()?.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.bump()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.current()?.kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Plus => UnaryOp::Identity,
            _ => return self.parse_power(),
        };
        self.bump()?;
        let operand = self.parse_unary()?;
        Ok(Expr::unary(op, operand))
    }

    /// `primary (** unary)?`; the exponent recursing through `parse_unary`
    /// makes `**` right-associative and allows a signed exponent.
    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        if self.eat(&TokenKind::StarStar)? {
            let exponent = self.parse_unary()?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let tk = self.current()?;
        match tk.kind {
            TokenKind::Number(n) => {
                self.bump()?;
                Ok(Expr::Number(n))
            }
            TokenKind::Ident(_) => {
                let name = self.expect_ident("identifier")?;
                if self.eat(&TokenKind::LParen)? {
                    let args = self.parse_call_args()?;
                    Ok(Expr::Call { callee: name, args })
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            TokenKind::LParen => {
                self.bump()?;
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => self.unexpected("expression"),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen)? {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen, "',' or ')' in argument list")?;
        Ok(args)
    }
}
