//! Node path tokenizer and step parser

use crate::error::{Error, ErrorKind, Result, Span};
use crate::lexer::Cursor;
use crate::path::ast::{NameTest, NamespaceTest, Position, Predicate, Step};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    Star,
    At,
    Eq,
    NotEq,
    LeftBracket,
    RightBracket,
    Parens,
    Literal(String),
    Name(String),
}

fn tokenize(path: &str) -> Result<Vec<Token>> {
    let mut cursor = Cursor::new(path.as_bytes());
    let mut tokens = Vec::new();

    loop {
        cursor.skip_whitespace();
        let Some(b) = cursor.current() else {
            return Ok(tokens);
        };
        let token = match b {
            b'/' if cursor.peek(1) == Some(b'/') => {
                cursor.advance_by(2);
                Token::DoubleSlash
            }
            b'.' if cursor.peek(1) == Some(b'.') => {
                cursor.advance_by(2);
                Token::DotDot
            }
            b'!' if cursor.peek(1) == Some(b'=') => {
                cursor.advance_by(2);
                Token::NotEq
            }
            b'(' if cursor.peek(1) == Some(b')') => {
                cursor.advance_by(2);
                Token::Parens
            }
            b'/' | b'.' | b'*' | b'@' | b'=' | b'[' | b']' => {
                cursor.advance();
                match b {
                    b'/' => Token::Slash,
                    b'.' => Token::Dot,
                    b'*' => Token::Star,
                    b'@' => Token::At,
                    b'=' => Token::Eq,
                    b'[' => Token::LeftBracket,
                    _ => Token::RightBracket,
                }
            }
            b'\'' | b'"' => {
                cursor.advance();
                let start = cursor.pos();
                while cursor.current().is_some_and(|c| c != b) {
                    cursor.advance();
                }
                let literal = cursor.slice_from(start);
                if !cursor.consume(b) {
                    return Err(invalid(path));
                }
                Token::Literal(utf8(literal, path)?)
            }
            b'(' | b')' | b'!' => return Err(invalid(path)),
            _ => {
                let start = cursor.pos();
                if b == b'{' {
                    while cursor.current().is_some_and(|c| c != b'}') {
                        cursor.advance();
                    }
                    if !cursor.consume(b'}') {
                        return Err(invalid(path));
                    }
                }
                while cursor.current().is_some_and(is_name_byte) {
                    cursor.advance();
                }
                let name = utf8(cursor.slice_from(start), path)?;
                if name.ends_with('}') {
                    return Err(invalid(path));
                }
                Token::Name(name)
            }
        };
        tokens.push(token);
    }
}

fn is_name_byte(b: u8) -> bool {
    !matches!(
        b,
        b'/' | b'[' | b']' | b'(' | b')' | b'@' | b'!' | b'=' | b' ' | b'\t' | b'\r' | b'\n'
    )
}

fn utf8(bytes: &[u8], path: &str) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| invalid(path))
}

fn invalid(path: &str) -> Error {
    Error::new(
        ErrorKind::InvalidPath {
            path: path.to_string(),
        },
        Span::empty(),
    )
}

/// Split a name token into its namespace test and local part
fn name_test(raw: &str, path: &str) -> Result<NameTest> {
    if raw == "*" {
        return Ok(NameTest::Wildcard);
    }
    let (namespace, local) = if let Some(rest) = raw.strip_prefix('{') {
        let (uri, local) = rest.split_once('}').ok_or_else(|| invalid(path))?;
        let namespace = match uri {
            "" => NamespaceTest::NoNamespace,
            "*" => NamespaceTest::Any,
            uri => NamespaceTest::Uri(uri.to_string()),
        };
        (namespace, local)
    } else if let Some((prefix, local)) = raw.split_once(':') {
        if prefix.is_empty() {
            return Err(invalid(path));
        }
        (NamespaceTest::Prefix(prefix.to_string()), local)
    } else {
        (NamespaceTest::Unqualified, raw)
    };

    if local.is_empty() || local.contains(':') {
        return Err(invalid(path));
    }
    if local == "*" {
        return match namespace {
            NamespaceTest::Any | NamespaceTest::Unqualified => Ok(NameTest::Wildcard),
            _ => Err(invalid(path)),
        };
    }
    Ok(NameTest::Name {
        namespace,
        local: local.to_string(),
    })
}

/// Parser turning a token stream into steps
struct StepParser<'p> {
    path: &'p str,
    tokens: std::vec::IntoIter<Token>,
}

impl<'p> StepParser<'p> {
    fn next(&mut self) -> Result<Token> {
        self.tokens.next().ok_or_else(|| invalid(self.path))
    }

    fn parse(mut self) -> Result<Vec<Step>> {
        let mut steps = Vec::new();
        let mut token = self.next()?;
        if matches!(token, Token::Slash) {
            // absolute paths are meaningless when evaluated from an element
            return Err(invalid(self.path));
        }

        loop {
            let step = match token {
                Token::Name(name) => Step::Child(name_test(&name, self.path)?),
                Token::Star => Step::Child(NameTest::Wildcard),
                Token::Dot => Step::SelfNode,
                Token::DotDot => Step::Parent,
                Token::DoubleSlash => match self.next()? {
                    Token::Name(name) => Step::Descendant(name_test(&name, self.path)?),
                    Token::Star => Step::Descendant(NameTest::Wildcard),
                    _ => return Err(invalid(self.path)),
                },
                Token::LeftBracket => {
                    if steps.is_empty() {
                        return Err(invalid(self.path));
                    }
                    Step::Filter(self.predicate()?)
                }
                _ => return Err(invalid(self.path)),
            };
            steps.push(step);

            token = match self.tokens.next() {
                None => return Ok(steps),
                Some(Token::Slash) => self.next()?,
                Some(next @ (Token::LeftBracket | Token::DoubleSlash)) => next,
                Some(_) => return Err(invalid(self.path)),
            };
        }
    }

    /// Parse the inside of `[...]`, consuming the closing bracket
    fn predicate(&mut self) -> Result<Predicate> {
        let predicate = match self.next()? {
            Token::At => {
                let name = match self.next()? {
                    Token::Name(name) => name_test(&name, self.path)?,
                    _ => return Err(invalid(self.path)),
                };
                match self.comparison()? {
                    None => Predicate::HasAttribute(name),
                    Some((value, negated)) => Predicate::AttributeEquals {
                        name,
                        value,
                        negated,
                    },
                }
            }
            Token::Dot => match self.comparison()? {
                Some((value, negated)) => Predicate::TextEquals { value, negated },
                None => return Err(invalid(self.path)),
            },
            Token::Name(name) if name == "last" => {
                if self.next()? != Token::Parens {
                    return Err(invalid(self.path));
                }
                match self.next()? {
                    Token::RightBracket => return Ok(Predicate::Position(Position::FromLast(0))),
                    Token::Name(offset) => {
                        let back = offset
                            .strip_prefix('-')
                            .and_then(|n| n.parse::<usize>().ok())
                            .ok_or_else(|| invalid(self.path))?;
                        Predicate::Position(Position::FromLast(back))
                    }
                    _ => return Err(invalid(self.path)),
                }
            }
            Token::Name(name) if name.bytes().all(|b| b.is_ascii_digit()) => {
                match name.parse::<usize>() {
                    Ok(index) if index >= 1 => Predicate::Position(Position::Index(index)),
                    _ => return Err(invalid(self.path)),
                }
            }
            Token::Name(name) => {
                let child = name_test(&name, self.path)?;
                match self.comparison()? {
                    None => Predicate::HasChild(child),
                    Some((value, negated)) => Predicate::ChildTextEquals {
                        name: child,
                        value,
                        negated,
                    },
                }
            }
            Token::Star => match self.comparison()? {
                None => Predicate::HasChild(NameTest::Wildcard),
                Some((value, negated)) => Predicate::ChildTextEquals {
                    name: NameTest::Wildcard,
                    value,
                    negated,
                },
            },
            _ => return Err(invalid(self.path)),
        };

        if self.next()? != Token::RightBracket {
            return Err(invalid(self.path));
        }
        Ok(predicate)
    }

    /// Optional `='v'` / `!='v'` part of a predicate. Leaves the closing
    /// bracket for the caller.
    fn comparison(&mut self) -> Result<Option<(String, bool)>> {
        let negated = match self.tokens.as_slice().first() {
            Some(Token::Eq) => false,
            Some(Token::NotEq) => true,
            _ => return Ok(None),
        };
        self.next()?;
        match self.next()? {
            Token::Literal(value) => Ok(Some((value, negated))),
            _ => Err(invalid(self.path)),
        }
    }
}

/// Compile a node path into steps
pub fn parse_steps(path: &str) -> Result<Vec<Step>> {
    let tokens = tokenize(path)?;
    StepParser {
        path,
        tokens: tokens.into_iter(),
    }
    .parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(local: &str) -> NameTest {
        NameTest::Name {
            namespace: NamespaceTest::Unqualified,
            local: local.to_string(),
        }
    }

    #[test]
    fn test_tokenize_mixed() -> Result<()> {
        let tokens = tokenize("./a//b[@c!='d e']/..")?;
        assert_eq!(
            tokens,
            vec![
                Token::Dot,
                Token::Slash,
                Token::Name("a".to_string()),
                Token::DoubleSlash,
                Token::Name("b".to_string()),
                Token::LeftBracket,
                Token::At,
                Token::Name("c".to_string()),
                Token::NotEq,
                Token::Literal("d e".to_string()),
                Token::RightBracket,
                Token::Slash,
                Token::DotDot,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_parse_child_steps() -> Result<()> {
        let steps = parse_steps("./DataSets/DataSet")?;
        assert_eq!(
            steps,
            vec![
                Step::SelfNode,
                Step::Child(name("DataSets")),
                Step::Child(name("DataSet")),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_parse_attribute_predicate() -> Result<()> {
        let steps = parse_steps("DataSet[@Name='ARForm']/Fields")?;
        assert_eq!(
            steps,
            vec![
                Step::Child(name("DataSet")),
                Step::Filter(Predicate::AttributeEquals {
                    name: name("Name"),
                    value: "ARForm".to_string(),
                    negated: false,
                }),
                Step::Child(name("Fields")),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_parse_namespaced_names() -> Result<()> {
        let steps = parse_steps("ns:Item/{urn:x}Other/{*}Any/{}Bare/{*}*")?;
        assert_eq!(
            steps,
            vec![
                Step::Child(NameTest::Name {
                    namespace: NamespaceTest::Prefix("ns".to_string()),
                    local: "Item".to_string(),
                }),
                Step::Child(NameTest::Name {
                    namespace: NamespaceTest::Uri("urn:x".to_string()),
                    local: "Other".to_string(),
                }),
                Step::Child(NameTest::Name {
                    namespace: NamespaceTest::Any,
                    local: "Any".to_string(),
                }),
                Step::Child(NameTest::Name {
                    namespace: NamespaceTest::NoNamespace,
                    local: "Bare".to_string(),
                }),
                Step::Child(NameTest::Wildcard),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_parse_positions() -> Result<()> {
        let steps = parse_steps("a[2]/b[last()]/c[last()-1]")?;
        assert_eq!(
            steps,
            vec![
                Step::Child(name("a")),
                Step::Filter(Predicate::Position(Position::Index(2))),
                Step::Child(name("b")),
                Step::Filter(Predicate::Position(Position::FromLast(0))),
                Step::Child(name("c")),
                Step::Filter(Predicate::Position(Position::FromLast(1))),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_parse_text_predicates() -> Result<()> {
        let steps = parse_steps(".//item[name=\"x\"][.!='y'][tag]")?;
        assert_eq!(
            steps,
            vec![
                Step::SelfNode,
                Step::Descendant(name("item")),
                Step::Filter(Predicate::ChildTextEquals {
                    name: name("name"),
                    value: "x".to_string(),
                    negated: false,
                }),
                Step::Filter(Predicate::TextEquals {
                    value: "y".to_string(),
                    negated: true,
                }),
                Step::Filter(Predicate::HasChild(name("tag"))),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_rejects_malformed_paths() {
        for path in [
            "",
            "/root",
            "a/",
            "a//",
            "[1]",
            "a[0]",
            "a[@]",
            "a[@b='c'",
            "a[@b='c]",
            "a[.]",
            "a b",
            "@a",
            "{urn:x}",
            "a[last()+1]",
            ":a",
        ] {
            let result = parse_steps(path);
            assert!(
                matches!(
                    result.as_ref().map_err(Error::kind),
                    Err(ErrorKind::InvalidPath { .. })
                ),
                "{path:?} should be rejected, got {result:?}"
            );
        }
    }
}
