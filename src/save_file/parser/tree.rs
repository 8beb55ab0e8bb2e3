use derive_more::{Display, Error};

use super::{
    error::ParseError,
    game_object::{GameObjectMap, Node, ScalarKind},
    lexer::{Token, TokenKind, Tokenizer},
    types::{CancellationToken, Excerpt, Position},
};

/// How deep blocks may nest before we give up on the document.
pub const MAX_DEPTH: usize = 256;

const END_OF_INPUT: &str = "end of input";

/// A structural violation of the block grammar.
#[derive(Debug, Display, Error, Clone, PartialEq)]
#[display("expected {expected}, found {found} at {position}{}", Excerpt(excerpt))]
pub struct SyntaxError {
    pub position: Position,
    pub expected: &'static str,
    pub found: String,
    /// A short piece of the offending line
    pub excerpt: Option<String>,
}

/// What a block turned out to contain, decided by its first element
enum Block {
    Undecided,
    List(Vec<Node>),
    Map(GameObjectMap),
}

/// A recursive descent parser with a single token of lookahead.
/// The root of the document is an implicit map of `key = value` pairs.
pub struct TreeParser<'a> {
    tokens: Tokenizer<'a>,
    peeked: Option<Token>,
    text: &'a str,
}

impl<'a> TreeParser<'a> {
    pub fn new(tokens: Tokenizer<'a>) -> Self {
        let text = tokens.text();
        Self {
            tokens,
            peeked: None,
            text,
        }
    }

    fn error(&self, position: Position, expected: &'static str, found: String) -> ParseError {
        SyntaxError {
            position,
            expected,
            found,
            excerpt: position.excerpt(self.text),
        }
        .into()
    }

    fn advance(&mut self) -> Result<Option<Token>, ParseError> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => Ok(self.tokens.next().transpose()?),
        }
    }

    fn peek_kind(&mut self) -> Result<Option<&TokenKind>, ParseError> {
        if self.peeked.is_none() {
            self.peeked = self.tokens.next().transpose()?;
        }
        Ok(self.peeked.as_ref().map(|t| &t.kind))
    }

    fn next_is(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        Ok(self.peek_kind()? == Some(kind))
    }

    /// Consumes the whole document.
    pub fn parse_document(mut self) -> Result<GameObjectMap, ParseError> {
        let mut root = GameObjectMap::new();
        while let Some(token) = self.advance()? {
            let key = match token.kind {
                TokenKind::Scalar(key) => key.into_text(),
                kind => return Err(self.error(token.position, "a key", kind.to_string())),
            };
            self.expect_equals(token.position)?;
            let value = self.value(0)?;
            root.push(key, value);
        }
        Ok(root)
    }

    fn expect_equals(&mut self, key_position: Position) -> Result<(), ParseError> {
        match self.advance()? {
            Some(Token {
                kind: TokenKind::Equals,
                ..
            }) => Ok(()),
            Some(token) => Err(self.error(token.position, "`=`", token.kind.to_string())),
            None => Err(self.error(key_position, "`=`", END_OF_INPUT.to_owned())),
        }
    }

    /// Parses whatever follows a `=`. A tag in front of a block, like the
    /// `rgb` in `color = rgb { 1 2 3 }`, is dropped.
    fn value(&mut self, depth: usize) -> Result<Node, ParseError> {
        let token = match self.advance()? {
            Some(token) => token,
            None => {
                let position = self.tokens.current_position();
                return Err(self.error(position, "a value", END_OF_INPUT.to_owned()));
            }
        };
        match token.kind {
            TokenKind::Open => self.block(token.position, depth + 1),
            TokenKind::Scalar(tag)
                if tag.kind() == ScalarKind::Identifier && self.next_is(&TokenKind::Open)? =>
            {
                let open = self.advance()?.map(|t| t.position).unwrap_or(token.position);
                self.block(open, depth + 1)
            }
            TokenKind::Scalar(scalar) => Ok(Node::Scalar(scalar)),
            kind => Err(self.error(token.position, "a value", kind.to_string())),
        }
    }

    /// Parses the inside of a block whose `{` was at `open`.
    fn block(&mut self, open: Position, depth: usize) -> Result<Node, ParseError> {
        if depth > MAX_DEPTH {
            return Err(self.error(
                open,
                "a shallower block",
                format!("nesting deeper than {}", MAX_DEPTH),
            ));
        }
        let mut block = Block::Undecided;
        loop {
            let token = match self.advance()? {
                Some(token) => token,
                None => return Err(self.error(open, "`}`", END_OF_INPUT.to_owned())),
            };
            let element = match token.kind {
                TokenKind::Close => break,
                kind @ (TokenKind::Equals | TokenKind::Operator(_)) => {
                    return Err(self.error(token.position, "a key or a value", kind.to_string()))
                }
                TokenKind::Open => (None, self.block(token.position, depth + 1)?),
                TokenKind::Scalar(tag)
                    if tag.kind() == ScalarKind::Identifier
                        && self.next_is(&TokenKind::Open)? =>
                {
                    let nested = self.advance()?.map(|t| t.position).unwrap_or(token.position);
                    (None, self.block(nested, depth + 1)?)
                }
                TokenKind::Scalar(scalar) => {
                    if self.next_is(&TokenKind::Equals)? {
                        self.advance()?;
                        (Some(scalar.into_text()), self.value(depth)?)
                    } else {
                        (None, Node::Scalar(scalar))
                    }
                }
            };
            block = match (block, element) {
                (Block::Undecided, (Some(key), value)) => {
                    let mut map = GameObjectMap::new();
                    map.push(key, value);
                    Block::Map(map)
                }
                (Block::Undecided, (None, value)) => Block::List(vec![value]),
                (Block::Map(mut map), (Some(key), value)) => {
                    map.push(key, value);
                    Block::Map(map)
                }
                (Block::List(mut list), (None, value)) => {
                    list.push(value);
                    Block::List(list)
                }
                (Block::Map(_), (None, _)) => {
                    return Err(self.error(
                        token.position,
                        "a key = value pair",
                        "a bare value".to_owned(),
                    ))
                }
                (Block::List(_), (Some(key), _)) => {
                    return Err(self.error(
                        token.position,
                        "a value",
                        format!("a pair with key `{}`", key),
                    ))
                }
            };
        }
        Ok(match block {
            Block::Undecided => Node::Map(GameObjectMap::new()),
            Block::List(list) => Node::List(list),
            Block::Map(map) => Node::Map(map),
        })
    }
}

/// Parses decoded save file text into its root map.
pub fn parse(text: &str) -> Result<GameObjectMap, ParseError> {
    TreeParser::new(Tokenizer::new(text)).parse_document()
}

/// Same as [parse], but gives up with [ParseError::Cancelled] once the token
/// is cancelled.
pub fn parse_cancellable(
    text: &str,
    cancel: &CancellationToken,
) -> Result<GameObjectMap, ParseError> {
    TreeParser::new(Tokenizer::new(text).with_cancellation(cancel.clone())).parse_document()
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    fn syntax_error(text: &str) -> SyntaxError {
        match parse(text) {
            Err(ParseError::Syntax(err)) => err,
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_document() -> Result<(), Box<dyn Error>> {
        assert!(parse("")?.is_empty());
        assert!(parse("  # nothing here\n")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_nested() -> Result<(), Box<dyn Error>> {
        let root = parse(
            "
        test={
            test2={
                test3=1
            }
        }
        ",
        )?;
        let test2 = root.get("test").unwrap().as_map()?.get("test2").unwrap();
        assert_eq!(test2.as_map()?.get("test3").unwrap().as_integer()?, 1);
        Ok(())
    }

    #[test]
    fn test_array() -> Result<(), Box<dyn Error>> {
        let root = parse("test={ test2={ 1 2 3 } test3={a b c} }")?;
        let test = root.get("test").unwrap().as_map()?;
        let test2 = test.get("test2").unwrap().as_list()?;
        assert_eq!(test2.len(), 3);
        assert_eq!(test2[2].as_integer()?, 3);
        let test3 = test.get("test3").unwrap().as_list()?;
        assert_eq!(test3[1].as_string()?.as_ref(), "b");
        Ok(())
    }

    #[test]
    fn test_list_of_blocks() -> Result<(), Box<dyn Error>> {
        let root = parse("modifiers={ { key=a } { key=b } {} }")?;
        let list = root.get("modifiers").unwrap().as_list()?;
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].as_map()?.get("key").unwrap().as_string()?.as_ref(), "b");
        assert!(list[2].as_map()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_block_is_map() -> Result<(), Box<dyn Error>> {
        let root = parse("flags={ }")?;
        assert!(matches!(root.get("flags"), Some(Node::Map(m)) if m.is_empty()));
        assert!(root.get("flags").unwrap().as_list()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_repeated_keys_kept_in_order() -> Result<(), Box<dyn Error>> {
        let root = parse("fleet={ 1={ name=a } } version=1 fleet={ 2={ name=b } }")?;
        let keys: Vec<_> = root.iter().map(|(k, _)| k.as_ref()).collect();
        assert_eq!(keys, ["fleet", "version", "fleet"]);
        assert_eq!(root.get_all("fleet").count(), 2);
        Ok(())
    }

    #[test]
    fn test_tagged_block() -> Result<(), Box<dyn Error>> {
        let root = parse("color = rgb { 1 2 3 } colors={ hsv { 0.5 0.5 0.5 } }")?;
        let color = root.get("color").unwrap().as_list()?;
        assert_eq!(color.len(), 3);
        let colors = root.get("colors").unwrap().as_list()?;
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].as_list()?[0].as_real()?, 0.5);
        Ok(())
    }

    #[test]
    fn test_numeric_keys() -> Result<(), Box<dyn Error>> {
        let root = parse("country={ 0={ name=\"United Nations\" } 4294967295=none }")?;
        let country = root.get("country").unwrap().as_map()?;
        assert!(country.get("0").is_some());
        assert!(country.get("4294967295").unwrap().is_none_marker());
        Ok(())
    }

    #[test]
    fn test_round_trip_scalars() -> Result<(), Box<dyn Error>> {
        let root = parse("a=1 b=-2.5 c=yes d=\"quoted text\" e=ident f=2200.05.17")?;
        let rendered: Vec<_> = root
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.as_scalar().unwrap()))
            .collect();
        assert_eq!(
            rendered,
            [
                "a=1",
                "b=-2.5",
                "c=yes",
                "d=quoted text",
                "e=ident",
                "f=2200.05.17"
            ]
        );
        Ok(())
    }

    #[test]
    fn test_raw_keys_and_values() -> Result<(), Box<dyn Error>> {
        let root = parse("007=1 1.50=2 2200.1.1=3 v=007 w=1.50")?;
        let keys: Vec<_> = root.iter().map(|(k, _)| k.as_ref()).collect();
        assert_eq!(keys, ["007", "1.50", "2200.1.1", "v", "w"]);
        assert_eq!(root.get("v").unwrap().as_string()?.as_ref(), "007");
        assert_eq!(root.get("v").unwrap().as_integer()?, 7);
        assert_eq!(root.get("w").unwrap().as_string()?.as_ref(), "1.50");
        assert_eq!(root.get("w").unwrap().as_real()?, 1.5);
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result<(), Box<dyn Error>> {
        let text = "country={ 1={ name=\"A\" budget={ x={ 1 2 } } } } date=\"2200.01.01\"";
        assert_eq!(parse(text)?, parse(text)?);
        Ok(())
    }

    #[test]
    fn test_unclosed_block() {
        let text = "version=\"v3.0\"\ncountry={1={\n";
        let err = syntax_error(text);
        assert_eq!(err.position, Position::new(2, 12));
        assert_eq!(err.expected, "`}`");
        assert_eq!(err.found, END_OF_INPUT);
        assert_eq!(err.excerpt.as_deref(), Some("country={1={"));
        assert_eq!(
            err.to_string(),
            "expected `}`, found end of input at line 2, column 12 near `country={1={`"
        );
        // a malformed document will not change between attempts
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn test_stray_close() {
        let err = syntax_error("a=1\n}");
        assert_eq!(err.position, Position::new(2, 1));
        assert_eq!(err.expected, "a key");
    }

    #[test]
    fn test_missing_value() {
        let err = syntax_error("a=");
        assert_eq!(err.expected, "a value");
        let err = syntax_error("a={ b= }");
        assert_eq!(err.found, "`}`");
        let err = syntax_error("a b");
        assert_eq!(err.expected, "`=`");
        assert_eq!(err.position, Position::new(1, 3));
    }

    #[test]
    fn test_relational_operator() {
        let err = syntax_error("a=1\nb<2");
        assert_eq!(err.expected, "`=`");
        assert_eq!(err.found, "`<`");
        assert_eq!(err.position, Position::new(2, 2));
        let err = syntax_error("a={ b ?= c }");
        assert_eq!(err.found, "`?=`");
    }

    #[test]
    fn test_mixed_block() {
        let err = syntax_error("a={ b=1 c }");
        assert_eq!(err.position, Position::new(1, 9));
        let err = syntax_error("a={ c b=1 }");
        assert_eq!(err.position, Position::new(1, 7));
    }

    #[test]
    fn test_max_depth() {
        let deep = format!("a={}{}", "{".repeat(MAX_DEPTH), "}".repeat(MAX_DEPTH));
        assert!(parse(&deep).is_ok());
        let deeper = format!("a={}{}", "{".repeat(MAX_DEPTH + 1), "}".repeat(MAX_DEPTH + 1));
        assert!(syntax_error(&deeper).expected.contains("shallower"));
    }

    #[test]
    fn test_lex_error_propagates() {
        let text = "a=1\nb=\"open\nc=2";
        match parse(text) {
            Err(ParseError::Lex(err)) => assert_eq!(err.position().line, 2),
            other => panic!("expected a lex error, got {:?}", other),
        }
    }

    #[test]
    fn test_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(parse_cancellable("a=1", &cancel), Err(ParseError::Cancelled));
    }
}
