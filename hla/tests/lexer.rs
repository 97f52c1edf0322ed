use hla::cpu::{Category, Mos6502};
use hla::error::ErrorKind;
use hla::grammer::lexer::{Lexer, Line};
use hla::grammer::token::{Directive, Keyword, Token, TokenKind};
use std::rc::Rc;

fn lex(code: &str) -> Result<Vec<Token>, hla::error::Error> {
    Lexer::new(&Mos6502).tokenize_str("test.hla", code)
}

fn case(code: &str, expects: Vec<TokenKind>) {
    let tokens = match lex(code) {
        Ok(tokens) => tokens,
        Err(e) => panic!("{code}: {e}"),
    };

    println!(" {code}");
    for (idx, token) in tokens.iter().enumerate() {
        println!("{:>2}: {:?} {}", idx, token.kind, token.pos);
    }

    let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
    assert_eq!(kinds, expects);
}

fn error(code: &str) -> ErrorKind {
    match lex(code) {
        Ok(tokens) => panic!("{code}: lexed as {tokens:?}"),
        Err(e) => e.kind,
    }
}

fn reserved(category: Category, word: &str) -> TokenKind {
    TokenKind::Reserved(category, word.to_string())
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Ident(name.to_string())
}

#[test]
fn numbers() {
    use TokenKind::*;
    case(
        "10 4K 0x1F $ff, %101",
        vec![Number(10), Number(4096), Number(31), Number(255), Comma, Number(5)],
    );
    // `%` after an operand is the remainder operator
    case("7 %10", vec![Number(7), Percent, Number(10)]);
    case("(n) %1", vec![LParen, ident("n"), RParen, Percent, Number(1)]);
}

#[test]
fn number_spelling() {
    let tokens = lex("$ff 2k").unwrap();
    assert_eq!(tokens[0].text, "$ff");
    assert_eq!(tokens[1].text, "2k");
    assert_eq!(tokens[1].kind, TokenKind::Number(2048));
}

#[test]
fn words() {
    use TokenKind::*;
    case(
        "LDA foo, X",
        vec![reserved(Category::Opcode, "lda"), ident("foo"), Comma, reserved(Category::Register, "x")],
    );
    case(
        "if (not Carry)",
        vec![
            Kw(Keyword::If),
            LParen,
            reserved(Category::Condition, "not"),
            reserved(Category::Condition, "carry"),
            RParen,
        ],
    );
    case(
        "pointer p byte b",
        vec![reserved(Category::Type, "pointer"), ident("p"), ident("byte"), ident("b")],
    );
    case(
        "lo(x) sizeof(word)",
        vec![
            Kw(Keyword::Lo),
            LParen,
            reserved(Category::Register, "x"),
            RParen,
            Kw(Keyword::Sizeof),
            LParen,
            ident("word"),
            RParen,
        ],
    );
}

#[test]
fn operators() {
    use TokenKind::*;
    case(
        "a<<2 >= b != c == d",
        vec![
            reserved(Category::Register, "a"),
            LAngleLAngle,
            Number(2),
            RAngleEqual,
            ident("b"),
            ExclEqual,
            ident("c"),
            EqualEqual,
            ident("d"),
        ],
    );
}

#[test]
fn comments() {
    case("byte /* inline */ count // tail", vec![ident("byte"), ident("count")]);

    let tokens = lex("a /* one\ntwo */ b").unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[1].kind, ident("b"));
    assert_eq!(tokens[1].pos.line, 2);
}

#[test]
fn comment_inside_logical_line() {
    let line = Line {
        text: "x /*\n\n*/ y".to_string(),
        file: Rc::from("test.hla"),
        line: 3,
        index: 0,
    };
    let tokens = Lexer::new(&Mos6502).tokenize(&line).unwrap();
    assert_eq!(tokens[0].pos.line, 3);
    assert_eq!(tokens[1].pos.line, 5);
    assert_eq!(tokens[1].pos.col, 4);
}

#[test]
fn strings() {
    case(r#""a\n\x41\"""#, vec![TokenKind::Text("a\nA\"".to_string())]);
}

#[test]
fn directives() {
    use TokenKind::*;
    case("#align 4", vec![Directive(self::Directive::Align), Number(4)]);
    case(
        "data: #incbin",
        vec![ident("data"), Colon, Directive(self::Directive::Incbin)],
    );
    // Not leading: an immediate operand
    case(
        "lda #1",
        vec![reserved(Category::Opcode, "lda"), Hash, Number(1)],
    );
}

#[test]
fn errors() {
    assert!(matches!(error("12ab"), ErrorKind::InvalidNumber(_)));
    assert!(matches!(error("$"), ErrorKind::InvalidNumber(_)));
    assert!(matches!(error("\"open"), ErrorKind::UnterminatedString));
    assert!(matches!(error("@"), ErrorKind::UnexpectedChar('@')));
    assert!(matches!(error("#bogus 1"), ErrorKind::UnknownDirective(name) if name == "bogus"));
}
