use stencil::lexer::{self, Block, Comment, Tag, Token};

#[test]
fn lex_text_only() {
    let tokens = lexer::collect("plain text", true);
    assert_eq!(1, tokens.len());
    assert!(matches!(tokens[0], Token::Block(Block::Text, _)));
}

#[test]
fn lex_statement() {
    let tokens = lexer::collect("{{ name }}", false);
    let kinds: Vec<&Token> = tokens.iter().collect();
    assert!(matches!(
        kinds[0],
        Token::Block(Block::StartEmit, _)
    ));
    assert!(matches!(
        kinds[1],
        Token::Tag(Tag::WhiteSpace, _)
    ));
    assert!(matches!(
        kinds[2],
        Token::Tag(Tag::Identifier, _)
    ));
    assert!(matches!(
        kinds[3],
        Token::Tag(Tag::WhiteSpace, _)
    ));
    assert!(matches!(kinds[4], Token::Tag(Tag::EndEmit, _)));
}

#[test]
fn lex_border_flags_ride_on_delimiters() {
    let tokens = lexer::collect("{%- x -%}", false);
    match &tokens[0] {
        Token::Block(Block::StartAction, span) => {
            assert_eq!(0..3, *span)
        }
        other => panic!("unexpected token {:?}", other),
    }
    match tokens.last() {
        Some(Token::Tag(Tag::EndAction, span)) => {
            assert_eq!(6..9, *span)
        }
        other => panic!("unexpected token {:?}", other),
    }
}

#[test]
fn lex_comment_mode() {
    let tokens = lexer::collect("{# {{ x }} #}", true);
    assert!(matches!(
        tokens[0],
        Token::Block(Block::StartComment, _)
    ));
    assert!(matches!(
        tokens[1],
        Token::Block(Block::Text, _)
    ));
    assert!(matches!(
        tokens.last(),
        Some(Token::Comment(Comment::End, _))
    ));
}

#[test]
fn lex_operators_and_literals() {
    let tokens = lexer::collect(r#"{{ 1 + 2.5 == "x" }}"#, false);
    let tags: Vec<Tag> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Tag(tag, _) if *tag != Tag::WhiteSpace => {
                Some(*tag)
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        vec![
            Tag::Integer,
            Tag::Plus,
            Tag::Float,
            Tag::Equal,
            Tag::DoubleString,
            Tag::EndEmit
        ],
        tags
    );
}

#[test]
fn lex_compartment_prefix_is_one_identifier() {
    let tokens = lexer::collect("{{ g@name }}", false);
    let idents: Vec<&Token> = tokens
        .iter()
        .filter(|t| matches!(t, Token::Tag(Tag::Identifier, _)))
        .collect();
    assert_eq!(1, idents.len());
    match idents[0] {
        Token::Tag(Tag::Identifier, span) => {
            assert_eq!(3..9, *span)
        }
        other => panic!("unexpected token {:?}", other),
    }
}

#[test]
fn lex_keywords() {
    let tokens = lexer::collect("{{ a and b or not c }}", false);
    let has = |needle: Tag| {
        tokens
            .iter()
            .any(|t| matches!(t, Token::Tag(tag, _) if *tag == needle))
    };
    assert!(has(Tag::And));
    assert!(has(Tag::Or));
    assert!(has(Tag::Not));
}
