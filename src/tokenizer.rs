//! Lexical analysis: turns the raw source text into a vector of tokens.
//!
//! Scanning never fails. Characters the language does not know become
//! `TokenKind::Unknown` tokens and it is up to the parser to reject them.
//! Two-character operators are matched before their one-character prefixes.

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  // keywords
  Program,
  Begin,
  End,
  Var,
  Const,
  If,
  Then,
  Else,
  While,
  Do,
  Read,
  Write,
  Integer,
  Boolean,

  // operators
  Plus,
  Minus,
  Star,
  Slash,
  Equal,
  NotEqual,
  Less,
  Greater,
  LessEqual,
  GreaterEqual,
  AndAnd,
  OrOr,
  Bang,
  Assign,

  // punctuation
  Semicolon,
  Colon,
  Comma,
  LeftParen,
  RightParen,

  IntLiteral,
  BoolLiteral,
  Ident,

  Eof,
  Unknown,
}

/// Value carried by literal tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
  Int(i64),
  Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub lexeme: String,
  pub line: usize,
  pub column: usize,
  /// `None` for non-literals and for integer literals that overflow `i64`.
  pub value: Option<Literal>,
}

impl Token {
  pub fn new(
    kind: TokenKind,
    lexeme: impl Into<String>,
    line: usize,
    column: usize,
    value: Option<Literal>,
  ) -> Self {
    Self {
      kind,
      lexeme: lexeme.into(),
      line,
      column,
      value,
    }
  }
}

const KEYWORDS: [(&str, TokenKind); 16] = [
  ("program", TokenKind::Program),
  ("begin", TokenKind::Begin),
  ("end", TokenKind::End),
  ("var", TokenKind::Var),
  ("const", TokenKind::Const),
  ("if", TokenKind::If),
  ("then", TokenKind::Then),
  ("else", TokenKind::Else),
  ("while", TokenKind::While),
  ("do", TokenKind::Do),
  ("read", TokenKind::Read),
  ("write", TokenKind::Write),
  ("integer", TokenKind::Integer),
  ("boolean", TokenKind::Boolean),
  ("true", TokenKind::BoolLiteral),
  ("false", TokenKind::BoolLiteral),
];

/// Operators that need a look-ahead character, longest first.
const TWO_CHAR_OPS: [(&str, TokenKind); 6] = [
  (":=", TokenKind::Assign),
  ("!=", TokenKind::NotEqual),
  ("<=", TokenKind::LessEqual),
  (">=", TokenKind::GreaterEqual),
  ("&&", TokenKind::AndAnd),
  ("||", TokenKind::OrOr),
];

fn single_char_op(c: char) -> Option<TokenKind> {
  let kind = match c {
    '(' => TokenKind::LeftParen,
    ')' => TokenKind::RightParen,
    ',' => TokenKind::Comma,
    ';' => TokenKind::Semicolon,
    ':' => TokenKind::Colon,
    '+' => TokenKind::Plus,
    '-' => TokenKind::Minus,
    '*' => TokenKind::Star,
    '/' => TokenKind::Slash,
    '=' => TokenKind::Equal,
    '!' => TokenKind::Bang,
    '<' => TokenKind::Less,
    '>' => TokenKind::Greater,
    _ => return None,
  };
  Some(kind)
}

fn is_ident_start(c: char) -> bool {
  c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> Vec<Token> {
  let mut tokens = Vec::new();
  let mut i = 0;
  let mut line = 1;
  let mut column = 1;

  while let Some(c) = input[i..].chars().next() {
    if c == '\n' {
      i += 1;
      line += 1;
      column = 1;
      continue;
    }

    if matches!(c, ' ' | '\t' | '\r') {
      i += 1;
      column += 1;
      continue;
    }

    // Line comment; the newline itself is left for the branch above.
    if input[i..].starts_with("//") {
      let len = input[i..].find('\n').unwrap_or(input.len() - i);
      column += input[i..i + len].chars().count();
      i += len;
      continue;
    }

    if c.is_ascii_digit() {
      let len = input[i..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len() - i);
      let text = &input[i..i + len];
      let value = text.parse::<i64>().ok().map(Literal::Int);
      tokens.push(Token::new(TokenKind::IntLiteral, text, line, column, value));
      i += len;
      column += len;
      continue;
    }

    if is_ident_start(c) {
      let len = input[i..]
        .find(|c: char| !is_ident_continue(c))
        .unwrap_or(input.len() - i);
      let text = &input[i..i + len];
      let lowered = text.to_ascii_lowercase();
      let kind = KEYWORDS
        .iter()
        .find(|(keyword, _)| *keyword == lowered)
        .map_or(TokenKind::Ident, |(_, kind)| *kind);
      let value = (kind == TokenKind::BoolLiteral).then(|| Literal::Bool(lowered == "true"));
      tokens.push(Token::new(kind, text, line, column, value));
      i += len;
      column += len;
      continue;
    }

    if let Some((op, kind)) = TWO_CHAR_OPS
      .iter()
      .find(|(op, _)| input[i..].starts_with(op))
    {
      tokens.push(Token::new(*kind, *op, line, column, None));
      i += op.len();
      column += 2;
      continue;
    }

    // A lone '&' or '|' falls through to here and becomes an unknown token.
    let kind = single_char_op(c).unwrap_or(TokenKind::Unknown);
    let len = c.len_utf8();
    tokens.push(Token::new(kind, &input[i..i + len], line, column, None));
    i += len;
    column += 1;
  }

  tokens.push(Token::new(TokenKind::Eof, "", line, column, None));
  tokens
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "end of input".to_string(),
      _ => t.lexeme.clone(),
    },
    None => "end of input".to_string(),
  }
}
