//! Builds the template tree from the token stream.

use super::funcs::Func;
use super::lexer::{Token, TokenKind};
use super::TemplateError;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Output(Pipeline),
    If(IfNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    /// Condition and body for `if` and every `else if`, in order.
    pub branches: Vec<(Pipeline, Vec<Node>)>,
    pub otherwise: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Never empty. Every command after the first is a function call.
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Operand(Operand),
    Call { func: Func, args: Vec<Operand> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Flat lookup key; `.a.b` is stored as `a.b`.
    Field(String),
    Literal(Value),
    Nested(Box<Pipeline>),
}

enum Terminator {
    End,
    Else,
    ElseIf(Pipeline),
}

pub fn parse(src: &str, tokens: Vec<Token>) -> Result<Vec<Node>, TemplateError> {
    let mut parser = Parser { src, tokens, pos: 0 };
    let (nodes, terminator) = parser.parse_nodes()?;
    match terminator {
        None => Ok(nodes),
        Some((_, position)) => Err(parser.error(position, "unexpected end or else".into())),
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    /// Parses nodes until the input ends or a control action closes the list.
    fn parse_nodes(&mut self) -> Result<(Vec<Node>, Option<(Terminator, usize)>), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.next() {
            match token.kind {
                TokenKind::Text(text) => nodes.push(Node::Text(text)),
                TokenKind::Open => {
                    let open = token.position;
                    match self.peek_ident() {
                        Some("if") => {
                            self.pos += 1;
                            let condition = self.parse_pipeline(open)?;
                            self.expect_close(open)?;
                            nodes.push(Node::If(self.parse_if(condition, open)?));
                        }
                        Some("else") => {
                            self.pos += 1;
                            if self.peek_ident() == Some("if") {
                                self.pos += 1;
                                let condition = self.parse_pipeline(open)?;
                                self.expect_close(open)?;
                                return Ok((nodes, Some((Terminator::ElseIf(condition), open))));
                            }
                            self.expect_close(open)?;
                            return Ok((nodes, Some((Terminator::Else, open))));
                        }
                        Some("end") => {
                            self.pos += 1;
                            self.expect_close(open)?;
                            return Ok((nodes, Some((Terminator::End, open))));
                        }
                        _ => {
                            let pipeline = self.parse_pipeline(open)?;
                            self.expect_close(open)?;
                            nodes.push(Node::Output(pipeline));
                        }
                    }
                }
                _ => return Err(self.error(token.position, "unexpected token outside action".into())),
            }
        }
        Ok((nodes, None))
    }

    fn parse_if(&mut self, condition: Pipeline, open: usize) -> Result<IfNode, TemplateError> {
        let mut branches = Vec::new();
        let mut condition = condition;
        loop {
            let (body, terminator) = self.parse_nodes()?;
            branches.push((condition, body));
            match terminator {
                Some((Terminator::End, _)) => return Ok(IfNode { branches, otherwise: Vec::new() }),
                Some((Terminator::ElseIf(next), _)) => condition = next,
                Some((Terminator::Else, _)) => {
                    let (otherwise, terminator) = self.parse_nodes()?;
                    return match terminator {
                        Some((Terminator::End, _)) => Ok(IfNode { branches, otherwise }),
                        Some((_, position)) => {
                            Err(self.error(position, "unexpected else after else".into()))
                        }
                        None => Err(self.error(open, "unclosed if: missing end".into())),
                    };
                }
                None => return Err(self.error(open, "unclosed if: missing end".into())),
            }
        }
    }

    fn parse_pipeline(&mut self, open: usize) -> Result<Pipeline, TemplateError> {
        let mut commands = vec![self.parse_command(open, false)?];
        while matches!(self.peek_kind(), Some(TokenKind::Pipe)) {
            self.pos += 1;
            commands.push(self.parse_command(open, true)?);
        }
        Ok(Pipeline { commands })
    }

    fn parse_command(&mut self, open: usize, piped: bool) -> Result<Command, TemplateError> {
        let position = self.peek_position(open);
        if let Some(TokenKind::Ident(name)) = self.peek_kind().cloned() {
            self.pos += 1;
            let func = Func::from_name(&name).ok_or_else(|| {
                self.error(position, format!("function {name:?} not defined"))
            })?;
            let mut args = Vec::new();
            while !self.at_command_end() {
                args.push(self.parse_operand(open)?);
            }
            let given = args.len() + usize::from(piped);
            if given != func.arity() {
                return Err(self.error(
                    position,
                    format!(
                        "wrong number of args for {}: want {} got {}",
                        func.name(),
                        func.arity(),
                        given
                    ),
                ));
            }
            return Ok(Command::Call { func, args });
        }

        if piped {
            return Err(self.error(position, "non-function in pipeline".into()));
        }
        let operand = self.parse_operand(open)?;
        if !self.at_command_end() {
            let position = self.peek_position(open);
            return Err(self.error(position, "unexpected operand; only functions take arguments".into()));
        }
        Ok(Command::Operand(operand))
    }

    fn parse_operand(&mut self, open: usize) -> Result<Operand, TemplateError> {
        let Some(token) = self.next() else {
            return Err(self.error(open, "unclosed action".into()));
        };
        match token.kind {
            TokenKind::Field(segments) => Ok(Operand::Field(segments.join("."))),
            TokenKind::Str(s) => Ok(Operand::Literal(Value::String(s))),
            TokenKind::Number(n) => Ok(Operand::Literal(Value::Number(n))),
            TokenKind::Bool(b) => Ok(Operand::Literal(Value::Bool(b))),
            TokenKind::LParen => {
                let pipeline = self.parse_pipeline(token.position)?;
                match self.next() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(Operand::Nested(Box::new(pipeline))),
                    _ => Err(self.error(token.position, "unclosed left paren".into())),
                }
            }
            TokenKind::Ident(name) => Err(self.error(
                token.position,
                format!("function {name:?} used as an argument; wrap the call in parentheses"),
            )),
            TokenKind::Close => Err(self.error(token.position, "missing value in action".into())),
            _ => Err(self.error(token.position, "unexpected token in action".into())),
        }
    }

    fn expect_close(&mut self, open: usize) -> Result<(), TemplateError> {
        match self.next() {
            Some(Token { kind: TokenKind::Close, .. }) => Ok(()),
            Some(token) => Err(self.error(token.position, "unexpected token in action".into())),
            None => Err(self.error(open, "unclosed action".into())),
        }
    }

    fn at_command_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            None | Some(TokenKind::Pipe | TokenKind::Close | TokenKind::RParen)
        )
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek_kind() {
            Some(TokenKind::Ident(name)) => Some(name),
            _ => None,
        }
    }

    fn peek_position(&self, fallback: usize) -> usize {
        self.tokens.get(self.pos).map_or(fallback, |t| t.position)
    }

    fn error(&self, position: usize, message: String) -> TemplateError {
        TemplateError::parse(self.src, position, message)
    }
}
