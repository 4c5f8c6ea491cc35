use std::fmt;

/// Types known to the checker.
///
/// `Error` never appears in a declaration; it is what an expression resolves
/// to once one of its rules has been violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
  Integer,
  Boolean,
  Error,
}

impl Type {
  pub fn is_integer(&self) -> bool {
    matches!(self, Type::Integer)
  }

  pub fn is_boolean(&self) -> bool {
    matches!(self, Type::Boolean)
  }

  pub fn name(&self) -> &'static str {
    match self {
      Type::Integer => "integer",
      Type::Boolean => "boolean",
      Type::Error => "error",
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
