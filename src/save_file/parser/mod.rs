/// Commonly used types and other abstractions within the parser
pub mod types;

/// A submodule that provides the parser output objects.
/// The parser produces a tree of [Node] values, and the
/// [structures](crate::save_file::structures) are initialized from these
/// objects. This is our workaround for the lack of reflection in Rust, and it
/// puts one more layer of abstraction between the parser and the structures.
/// Save files decide whether a block is a list or a map only by what is in
/// it, and repeat keys freely, so a schema first deserializer won't do.
mod game_object;
pub use game_object::{
    format_date, ConversionError, GameObjectArray, GameObjectMap, GameObjectMapping, KeyError,
    Node, NodeKind, SaveObjectError, Scalar, ScalarKind,
};

/// The tokenizer, which turns decoded text into a lazy stream of [Token]s.
/// The heavy lifting is done by jomini's text reader.
mod lexer;
pub use lexer::{LexError, Token, TokenKind, Tokenizer};

/// The recursive descent parser turning tokens into a [GameObjectMap].
mod tree;
pub use tree::{parse, parse_cancellable, SyntaxError, TreeParser, MAX_DEPTH};

mod error;
pub use error::ParseError;

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_save_file() -> Result<(), Box<dyn Error>> {
        let root = parse(
            "
        version=\"Cepheus v3.14.159\"
        date=\"2250.03.01\"
        player={
            {
                name=\"Admiral\"
                country=0
            }
        }
        country={
            0={
                name={
                    key=\"EMPIRE_DESIGN_humans1\"
                }
                budget={
                    current_month={
                        income={
                            country_base={
                                energy=20
                                minerals=5.5
                            }
                        }
                    }
                }
            }
            1=none
        }
        ",
        )?;
        assert_eq!(
            root.get_string("version")?.as_ref(),
            "Cepheus v3.14.159"
        );
        let players = root.get_err("player")?.as_list()?;
        assert_eq!(players[0].as_map()?.get_game_id("country")?, 0);
        let country = root.get_map("country")?;
        let human = country.get_map("0")?;
        assert_eq!(
            human.get_map("name")?.get_string("key")?.as_ref(),
            "EMPIRE_DESIGN_humans1"
        );
        let energy = human
            .get_map("budget")?
            .get_map("current_month")?
            .get_map("income")?
            .get_map("country_base")?
            .get_real("minerals")?;
        assert_eq!(energy, 5.5);
        assert!(country.get_err("1")?.is_none_marker());
        Ok(())
    }

    #[test]
    fn test_weird_spacing() -> Result<(), Box<dyn Error>> {
        let root = parse("\t\r\n  test = {\ttest2={1=2\n3=4}\r\n test3 = { a b\nc}}   ")?;
        let test = root.get_map("test")?;
        assert_eq!(test.get_map("test2")?.get_integer("3")?, 4);
        assert_eq!(test.get_err("test3")?.as_list()?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_non_ascii() -> Result<(), Box<dyn Error>> {
        let root = parse("name=\"Tiyanki Matriarch ✦\" ключ=значение")?;
        assert_eq!(root.get_string("name")?.as_ref(), "Tiyanki Matriarch ✦");
        assert_eq!(root.get_string("ключ")?.as_ref(), "значение");
        Ok(())
    }

    #[test]
    fn test_fatal_unterminated_string() {
        let err = parse("a=1\nb=2\nc=\"oops\nd=4\n").unwrap_err();
        assert_eq!(err.position().map(|p| p.line), Some(3));
        assert!(err.to_string().contains("line 3"));
    }
}
