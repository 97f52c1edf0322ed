use hla::cpu::Mos6502;
use hla::error::{Error, ErrorKind};
use hla::grammer::token::{Token, TokenKind};
use hla::memory::{Padding, RegionKind};
use hla::preprocess::{Layout, MacroValue, MemLoader, Preprocessor};

fn run(loader: MemLoader, entry: &str) -> Result<Vec<Token>, Error> {
    let cpu = Mos6502;
    let mut pre = Preprocessor::new(&cpu, Box::new(loader));
    pre.include(entry, false)?;
    pre.collect()
}

fn files(files: &[(&str, &str)]) -> Result<Vec<Token>, Error> {
    let loader = files
        .iter()
        .fold(MemLoader::new(), |loader, (name, text)| loader.add(name, *text));
    run(loader, files[0].0)
}

fn case(code: &str, expects: &[&str]) {
    let tokens = match files(&[("main.hla", code)]) {
        Ok(tokens) => tokens,
        Err(e) => panic!("{e}"),
    };
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, expects, "{code}");
}

fn error(code: &str) -> ErrorKind {
    match files(&[("main.hla", code)]) {
        Ok(tokens) => panic!("{code}: preprocessed to {tokens:?}"),
        Err(e) => e.kind,
    }
}

#[test]
fn define_and_undef() {
    case("#define N 5\nlda #N\n#undef N\nlda #N", &["lda", "#", "5", "lda", "#", "N"]);
}

#[test]
fn whole_words_only() {
    case("#define X 1\nXY X_1 X", &["XY", "X_1", "1"]);
    case("#define X 1\n\"X\" X", &["\"X\"", "1"]);
    case("#define ff 1\nlda $ff", &["lda", "$ff"]);
}

#[test]
fn substitution_is_not_rescanned() {
    case("#define A B\n#define B 1\nA B", &["B", "1"]);
}

#[test]
fn define_evaluates() {
    case("#define W 4\n#define SIZE W * 2 + 1\nSIZE", &["9"]);
    case("#define NAME \"hi\"\nNAME", &["\"hi\""]);
    case("#define LONG 1 + \\\n 2\nLONG", &["3"]);
}

#[test]
fn undef_unknown_is_silent() {
    case("#undef NEVER\nnop", &["nop"]);
}

#[test]
fn flag_macro() {
    case("#define FLAG\n#ifdef FLAG\nbyte a\n#endif", &["byte", "a"]);
    case("#define FLAG\n#ifndef FLAG\nbyte a\n#endif\nnop", &["nop"]);
}

#[test]
fn nested_conditionals() {
    let code = "\
#define OUTER
#ifndef OUTER
  #ifdef OUTER
  one
  #else
  two
  #endif
#else
  three
#endif";
    case(code, &["three"]);

    let code = "\
#define OUTER
#ifdef OUTER
  #ifdef MISSING
  one
  #else
  two
  #endif
  three
#endif";
    case(code, &["two", "three"]);
}

#[test]
fn ignored_lines_skip_directives() {
    case("#ifdef NOPE\n#bogus\n#define X 1\n#endif\nX", &["X"]);
}

#[test]
fn conditional_errors() {
    assert!(matches!(error("#else"), ErrorKind::UnmatchedDirective(_)));
    assert!(matches!(error("#endif"), ErrorKind::UnmatchedDirective(_)));
    assert!(matches!(error("#ifdef A\nnop"), ErrorKind::UnclosedConditional));
}

#[test]
fn unclosed_conditional_position() {
    let e = files(&[("main.hla", "nop\n#ifdef A\n#ifdef B\n#endif")]).unwrap_err();
    assert!(matches!(e.kind, ErrorKind::UnclosedConditional));
    assert_eq!(e.pos.map(|p| p.line), Some(2));
}

#[test]
fn include_stack() {
    let tokens = files(&[
        ("main.hla", "#include \"lib/a.inc\"\nafter"),
        ("lib/a.inc", "#include \"b.inc\"\ninner"),
        ("lib/b.inc", "deep"),
    ])
    .unwrap();
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["deep", "inner", "after"]);
    assert_eq!(&*tokens[0].pos.file, "lib/b.inc");
}

#[test]
fn include_errors() {
    assert!(matches!(error("#include \"missing.inc\""), ErrorKind::FileNotFound(_)));
    assert!(matches!(error("#include missing.inc"), ErrorKind::Syntax(_)));
}

#[test]
fn recursive_include_stops() {
    let e = files(&[("main.hla", "#include \"main.hla\"")]).unwrap_err();
    assert!(matches!(e.kind, ErrorKind::Syntax(_)));
}

#[test]
fn continuation_joins_lines() {
    let tokens = files(&[("main.hla", "lda \\\n  #1\nnop")]).unwrap();
    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens[0].line, tokens[2].line);
    assert_ne!(tokens[2].line, tokens[3].line);
    assert_eq!(tokens[2].pos.line, 2);
}

#[test]
fn incbin_blob() {
    let loader = MemLoader::new()
        .add("main.hla", "sprite: #incbin \"sprite.bin\"")
        .add("sprite.bin", vec![0xAA, 0xBB, 0x00]);
    let tokens = run(loader, "main.hla").unwrap();
    assert_eq!(tokens.len(), 1);
    match &tokens[0].kind {
        TokenKind::Blob(blob) => {
            assert_eq!(blob.label.as_deref(), Some("sprite"));
            assert_eq!(&*blob.bytes, &[0xAA, 0xBB, 0x00]);
        }
        other => panic!("{other:?}"),
    }
}

#[test]
fn only_incbin_takes_a_label() {
    assert!(matches!(error("here: #align 2"), ErrorKind::Syntax(_)));
}

#[test]
fn layout_tokens() {
    let tokens = files(&[(
        "main.hla",
        "#rom.bank main, 16\n#ram.org $0200, $100\n#setpad \"ab\"\n#setpad $EA\n#align 4",
    )])
    .unwrap();
    let layouts: Vec<Layout> = tokens
        .into_iter()
        .filter_map(|t| match t.kind {
            TokenKind::Layout(layout) => Some(layout),
            _ => None,
        })
        .collect();
    assert_eq!(
        layouts,
        vec![
            Layout::Bank {
                tag: "main".to_string(),
                max_size: Some(16),
            },
            Layout::Org {
                kind: RegionKind::Ram,
                origin: 0x200,
                max_size: Some(0x100),
            },
            Layout::Pad(Padding::Text("ab".to_string())),
            Layout::Pad(Padding::Value(0xEA)),
            Layout::Align(4),
        ]
    );
}

#[test]
fn comment_opened_on_directive_line() {
    case("#define X 5 /* start\nend */\nbyte X", &["byte", "5"]);
    case("#ifdef NOPE\n#endif /* one\n#else\n*/ nop", &["nop"]);
}

#[test]
fn user_messages() {
    assert!(matches!(error("#error \"boom\""), ErrorKind::UserError(msg) if msg == "boom"));
    assert!(matches!(error("#fatal stop here"), ErrorKind::UserError(msg) if msg == "stop here"));
    case("#warning \"careful\"\n#todo later\nnop", &["nop"]);
}

#[test]
fn api() {
    let cpu = Mos6502;
    let mut pre = Preprocessor::new(&cpu, Box::new(MemLoader::new()));
    pre.define("X", Some(MacroValue::Number(1)));
    assert!(pre.macros().is_defined("X"));
    pre.undef("Y");
    pre.undef("X");
    assert!(pre.macros().is_empty());

    let pos = hla::grammer::token::Pos::new(&std::rc::Rc::from("cli"), 0, 0);
    pre.ifdef("X", true, pos.clone());
    assert!(pre.ignoring());
    pre.else_branch().unwrap();
    assert!(!pre.ignoring());
    pre.endif().unwrap();
    assert!(pre.endif().is_err());
}
