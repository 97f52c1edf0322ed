use hla::compile::{compile_source, Unit};
use hla::config::Config;
use hla::cpu::Mos6502;
use hla::error::{Error, ErrorKind};
use hla::grammer::ast::{CallKind, Def, Expr, Instr, Operand, Stmt};
use hla::symbols::Symbol;
use hla_arch::{Distance, Flag, Mode, Opcode, Register};

fn compile(code: &str) -> Result<Unit, Error> {
    compile_source("main.hla", code, &Config::new(), &Mos6502)
}

fn unit(code: &str) -> Unit {
    match compile(code) {
        Ok(unit) => unit,
        Err(e) => panic!("{code}\n{e}"),
    }
}

fn error(code: &str) -> ErrorKind {
    match compile(code) {
        Ok(unit) => panic!("{code}\nparsed as {:#?}", unit.ast),
        Err(e) => e.kind,
    }
}

fn stmts(code: &str) -> Vec<Stmt> {
    unit(code)
        .ast
        .0
        .into_iter()
        .filter_map(|def| match def {
            Def::Stmt(stmt) => Some(stmt),
            _ => None,
        })
        .collect()
}

fn instr(code: &str) -> Instr {
    match stmts(code).into_iter().next() {
        Some(Stmt::Instr(instr)) => instr,
        other => panic!("{code}: {other:?}"),
    }
}

fn body(unit: &Unit, name: &str) -> Vec<Stmt> {
    match unit.ctx.symbols.probe(name) {
        Some(Symbol::Function(f) | Symbol::Interrupt(f)) => f.body.clone(),
        Some(Symbol::Macro(m)) => m.body.clone(),
        other => panic!("{name}: {other:?}"),
    }
}

macro_rules! case {
    ($name:ident, $code:expr) => {
        #[test]
        fn $name() {
            unit($code);
        }
    };
}

case!(empty, "");
case!(decl_list, "byte a, b = 2, c[2]");
case!(shared_decl, "shared word counter");
case!(pointer_decl, "pointer p = $1234");
case!(string_init, "char greeting[] = \"hello\"");
case!(struct_then_vars, "struct V { byte x, y } origin, target");
case!(named_struct_var, "struct V { byte x }\nstruct V here\nV there");
case!(function_body, "function main() { lda #0\n sta $d020 }");
case!(noreturn_first, "noreturn function reset() { forever nop }");
case!(noreturn_after, "function noreturn reset() { forever { nop } }");
case!(local_decl, "function f() { byte scratch\n lda scratch }");
case!(semicolons, "lda #1; sta $10; ; rts");
case!(register_names, "byte a\nbyte x\na = 1");

#[test]
fn scalar_and_array() {
    let unit = unit("byte x = 5\nword y[3] = {1, 2, 3}");
    let ctx = &unit.ctx;
    assert_eq!(ctx.symbols.len(), 2);
    assert_eq!(ctx.types.user_types().count(), 0);

    let x = ctx.symbols.lookup("x").unwrap().as_variable().unwrap();
    assert_eq!(x.ty.to_string(), "byte");
    assert_eq!(x.values(), Some(vec![5]));
    assert!(!x.is_array());

    let y = ctx.symbols.lookup("y").unwrap().as_variable().unwrap();
    assert_eq!(y.ty.to_string(), "word[3]");
    assert_eq!(y.dims, vec![3]);
    assert_eq!(y.values(), Some(vec![1, 2, 3]));
    assert_eq!(y.size(), Some(6));

    assert_eq!(ctx.memory.regions()[0].content, vec![5, 1, 0, 2, 0, 3, 0]);
}

#[test]
fn conditional_declarations() {
    let unit = unit("#ifdef FOO\nbyte x\n#else\nbyte y\n#endif");
    let names: Vec<&str> = unit.ctx.symbols.iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["y"]);
}

#[test]
fn struct_members_keep_order() {
    let unit = unit("struct S { byte a; word b; byte c[4]; }");
    let ty = unit.ctx.types.lookup("S").unwrap();
    let s = ty.as_struct().unwrap();
    let names: Vec<&str> = s.members().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert_eq!(s.members()[2].len, Some(4));
    assert_eq!(ty.size(), Some(7));
    assert_eq!(unit.ctx.types.user_types().count(), 1);
    assert!(unit.ctx.symbols.is_empty());
}

#[test]
fn struct_then_next_line_declarations() {
    let unit = unit("struct P { byte a }\nP p\nstruct Q { word w }\nbyte q");
    let ctx = &unit.ctx;
    let names: Vec<&str> = ctx.symbols.iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["p", "q"]);
    assert_eq!(ctx.symbols.lookup("p").unwrap().as_variable().unwrap().ty.to_string(), "struct P");
    assert_eq!(ctx.symbols.lookup("q").unwrap().as_variable().unwrap().ty.to_string(), "byte");
    assert_eq!(ctx.memory.regions()[0].len(), 2);

    let listed = self::unit("struct P { byte a } first,\n second");
    assert_eq!(listed.ctx.symbols.len(), 2);
}

#[test]
fn array_size_inference() {
    let unit = unit("byte t[] = {1, 2, 3}\nbyte grid[][] = {{1, 2}, {3, 4}}\nbyte pad[4] = {9}");
    let var = |name| unit.ctx.symbols.lookup(name).unwrap().as_variable().unwrap().clone();
    assert_eq!(var("t").dims, vec![3]);
    assert_eq!(var("grid").dims, vec![2, 2]);
    assert_eq!(var("pad").dims, vec![4]);
    assert_eq!(unit.ctx.memory.regions()[0].content, vec![1, 2, 3, 1, 2, 3, 4, 9, 0, 0, 0]);
}

#[test]
fn array_shape_errors() {
    assert!(matches!(
        error("byte m[][] = {{1, 2}, {3, 4, 5}}"),
        ErrorKind::IrregularArrayShape(_)
    ));
    assert!(matches!(error("byte m[]"), ErrorKind::IrregularArrayShape(_)));
    assert!(matches!(error("byte m[2] = {1, 2, 3}"), ErrorKind::IrregularArrayShape(_)));
}

#[test]
fn array_of_structs_with_array_members() {
    let unit = unit("struct S { byte a; byte b[2] };\nS s[] = {{1, {2, 3}}, {4, {5, 6}}}");
    let s = unit.ctx.symbols.lookup("s").unwrap().as_variable().unwrap();
    assert_eq!(s.dims, vec![2]);
    assert_eq!(unit.ctx.memory.regions()[0].content, vec![1, 2, 3, 4, 5, 6]);
    assert!(matches!(
        error("struct S { byte a; byte b[2] };\nS s[] = {{1, {2, 3}}, {4, 5}}"),
        ErrorKind::IrregularArrayShape(_)
    ));
}

#[test]
fn initializers_fit_their_type() {
    let e = compile("byte ok = -1\nbyte x = 300").unwrap_err();
    assert!(matches!(e.kind, ErrorKind::ValueOutOfRange(300, 1)));
    assert_eq!(e.pos.map(|p| p.line), Some(2));
    assert!(matches!(error("word w[] = {1, $10000}"), ErrorKind::ValueOutOfRange(..)));
}

#[test]
fn fold_errors_carry_positions() {
    let cases = [
        ("byte a = 1\nbyte x = 1/0", (2, 6)),
        ("byte a[1/0]", (1, 6)),
        ("lda #1/0", (1, 1)),
        ("typedef byte t:1%0", (1, 14)),
    ];
    for (code, at) in cases {
        let e = compile(code).unwrap_err();
        assert!(matches!(e.kind, ErrorKind::DivisionByZero), "{code}: {e}");
        assert_eq!(e.pos.map(|p| (p.line, p.col)), Some(at), "{code}");
    }
}

#[test]
fn duplicates() {
    assert!(matches!(
        error("byte x = 1\nbyte x = 2"),
        ErrorKind::DuplicateSymbol(name) if name == "x"
    ));
    assert!(matches!(
        error("struct S { byte a }\nstruct S { word b }"),
        ErrorKind::DuplicateType(name) if name == "S"
    ));
    assert!(matches!(
        error("function f() { }\nbyte f"),
        ErrorKind::DuplicateSymbol(_)
    ));
    assert!(matches!(
        error("struct S { byte a, a }"),
        ErrorKind::DuplicateSymbol(name) if name == "S.a"
    ));
}

#[test]
fn duplicate_reports_second_position() {
    let e = compile("byte x\n\nbyte x").unwrap_err();
    assert_eq!(e.pos.map(|p| (p.line, p.col)), Some((3, 6)));
}

#[test]
fn typedefs() {
    let unit = unit("typedef word addr\ntypedef byte row[8]\naddr p = $1234\nrow r");
    let ctx = &unit.ctx;
    assert_eq!(ctx.types.user_types().count(), 2);
    assert_eq!(ctx.types.lookup("row").unwrap().size(), Some(8));
    let p = ctx.symbols.lookup("p").unwrap().as_variable().unwrap();
    assert_eq!(p.values(), Some(vec![0x1234]));
    assert_eq!(ctx.memory.regions()[0].len(), 10);

    assert!(matches!(error("typedef missing t"), ErrorKind::UnknownType(name) if name == "missing"));
    assert!(matches!(error("struct Nope n"), ErrorKind::UnknownType(_)));
}

#[test]
fn fixed_address_is_not_placed() {
    let unit = unit("byte port:$2000\ntypedef byte hwreg:$d000\nhwreg border");
    let ctx = &unit.ctx;
    let port = ctx.symbols.lookup("port").unwrap().as_variable().unwrap();
    assert_eq!(port.address, Some(0x2000));
    assert_eq!(port.placement, None);
    let border = ctx.symbols.lookup("border").unwrap().as_variable().unwrap();
    assert_eq!(border.address, Some(0xd000));
    assert!(ctx.memory.regions()[0].is_empty());
}

#[test]
fn opcode_names_are_rejected() {
    assert!(matches!(error("byte lda"), ErrorKind::UnexpectedToken(_)));
}

#[test]
fn addressing_modes() {
    let cases = [
        ("lda #1", Mode::Immediate, Some(1)),
        ("asl a", Mode::Accumulator, None),
        ("ror reg.a", Mode::Accumulator, None),
        ("rts", Mode::Implied, None),
        ("jmp ($1234)", Mode::Indirect, Some(0x1234)),
        ("lda ($10,x)", Mode::IndexedIndirect, Some(0x10)),
        ("lda ($10),y", Mode::IndirectIndexed, Some(0x10)),
        ("lda $10,x", Mode::DirectX, Some(0x10)),
        ("lda $1000,Y", Mode::DirectY, Some(0x1000)),
        ("lda ($10)+1", Mode::Direct, Some(0x11)),
        ("lda $10", Mode::Direct, Some(0x10)),
        ("lda #lo($1234)", Mode::Immediate, Some(0x34)),
        ("lda #hi($1234)", Mode::Immediate, Some(0x12)),
        ("lda #nylo($ab)", Mode::Immediate, Some(0x0b)),
        ("lda #nyhi($ab)", Mode::Immediate, Some(0x0a)),
        ("lda #sizeof(word)", Mode::Immediate, Some(2)),
        ("lda #sizeof(pointer)", Mode::Immediate, Some(2)),
        ("lda #sizeof($1234)", Mode::Immediate, Some(2)),
        ("lda later", Mode::Direct, None),
    ];
    for (code, mode, value) in cases {
        let instr = instr(code);
        assert_eq!(instr.operand.mode(), mode, "{code}");
        assert_eq!(instr.value, value, "{code}");
    }
}

#[test]
fn operand_ends_with_the_line() {
    let stmts = stmts("rts\nlda #1");
    assert_eq!(stmts.len(), 2);
    match &stmts[0] {
        Stmt::Instr(instr) => assert_eq!(instr.operand, Operand::Implied),
        other => panic!("{other:?}"),
    }
}

#[test]
fn accumulator_named_variable() {
    let instr = instr("sta a + 1");
    assert!(matches!(instr.operand, Operand::Direct(Expr::Binary(..))));
}

#[test]
fn wrong_index_register() {
    for code in ["lda ($10,y)", "lda ($10),x", "lda $10,a", "lda reg.x"] {
        assert!(
            matches!(error(code), ErrorKind::InvalidAddressingMode(_)),
            "{code}"
        );
    }
    assert!(matches!(error("lda #sizeof(1 + 2)"), ErrorKind::InvalidAddressingMode(_)));
}

#[test]
fn member_addresses() {
    let code = "\
struct P { byte x; byte y }
P pt:$10
P many[2]:$20
lda pt.y
lda #sizeof(pt)
lda #sizeof(many)
lda #sizeof(P)";
    let values: Vec<Option<i64>> = stmts(code)
        .into_iter()
        .filter_map(|stmt| match stmt {
            Stmt::Instr(instr) => Some(instr.value),
            _ => None,
        })
        .collect();
    assert_eq!(values, [Some(0x11), Some(2), Some(4), Some(2)]);
}

#[test]
fn clauses() {
    match &stmts("if (carry) { clc }")[0] {
        Stmt::If(clause, _, None) => {
            assert_eq!(clause.flag, Flag::Carry);
            assert_eq!(clause.distance, Distance::Near);
            assert_eq!(clause.branch(), Opcode::BCS);
            assert_eq!(clause.skip(), Opcode::BCC);
        }
        other => panic!("{other:?}"),
    }
    match &stmts("while (far not zero) dex")[0] {
        Stmt::While(clause, _) => {
            assert_eq!(clause.flag, Flag::False);
            assert!(clause.negated);
            assert_eq!(clause.distance, Distance::Far);
            assert_eq!(clause.branch(), Opcode::BNE);
            assert_eq!(clause.skip(), Opcode::BNE);
        }
        other => panic!("{other:?}"),
    }
    match &stmts("do { dex } while (1)")[0] {
        Stmt::DoWhile(_, clause) => assert_eq!(clause.flag, Flag::True),
        other => panic!("{other:?}"),
    }
    match &stmts("if (is minus) nop\nelse { inx }")[0] {
        Stmt::If(clause, _, Some(_)) => assert_eq!(clause.branch(), Opcode::BMI),
        other => panic!("{other:?}"),
    }
    assert!(matches!(error("if (sideways) nop"), ErrorKind::UnexpectedToken(_)));
}

#[test]
fn switch_cases() {
    let code = "\
switch reg.x {
    case #1
        inx
    case 2: dex
    default
        nop
}";
    match &stmts(code)[0] {
        Stmt::Switch(switch) => {
            assert_eq!(switch.register, Register::X);
            assert_eq!(switch.cases.len(), 2);
            assert_eq!(switch.cases[0].0, Expr::Number(1));
            assert!(switch.default.is_some());
        }
        other => panic!("{other:?}"),
    }
    match &stmts("switch (A) { case 0 { nop } }")[0] {
        Stmt::Switch(switch) => assert_eq!(switch.register, Register::A),
        other => panic!("{other:?}"),
    }
}

#[test]
fn labels_and_assignments() {
    let stmts = stmts("byte v\nloop:\n  dex\n  bne loop\nv = 3");
    assert!(matches!(&stmts[0], Stmt::Label(name, _) if name == "loop"));
    assert!(matches!(&stmts[3], Stmt::Assign(path, Expr::Number(3), _) if path == &["v"]));
}

#[test]
fn calls_resolve_forward() {
    let code = "\
function main() {
    helper()
    twice(1, 2)
    main()
}
inline twice(a, b) { nop }
function helper() { rts }";
    let unit = unit(code);
    let kinds: Vec<CallKind> = body(&unit, "main")
        .into_iter()
        .filter_map(|stmt| match stmt {
            Stmt::Call(call) => Some(call.kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, [CallKind::Function, CallKind::Macro, CallKind::Function]);
    match unit.ctx.symbols.probe("twice") {
        Some(Symbol::Macro(m)) => assert_eq!(m.params, ["a", "b"]),
        other => panic!("{other:?}"),
    }
}

#[test]
fn call_errors() {
    assert!(matches!(
        error("inline m(a) { nop }\nm(1, 2)"),
        ErrorKind::MacroArityMismatch(name, 1, 2) if name == "m"
    ));
    assert!(matches!(
        error("function f() { m(1) }\ninline m(a, b) { nop }"),
        ErrorKind::MacroArityMismatch(name, 2, 1) if name == "m"
    ));
    assert!(matches!(
        error("function f() { if (carry) { ghost() } }"),
        ErrorKind::UnknownCall(name) if name == "ghost"
    ));
    assert!(matches!(error("byte v\nv()"), ErrorKind::NotCallable(_)));
    assert!(matches!(error("interrupt.nmi irq() { rti }\nirq()"), ErrorKind::NotCallable(_)));
    assert!(matches!(error("function g() { }\ng(1)"), ErrorKind::MacroArityMismatch(_, 0, 1)));
    assert!(matches!(error("function f(a) { }"), ErrorKind::Syntax(_)));
}

#[test]
fn interrupt_vector() {
    let unit = unit("interrupt.nmi on_nmi() { rti }");
    match unit.ctx.symbols.probe("on_nmi") {
        Some(Symbol::Interrupt(f)) => {
            assert_eq!(f.vector.as_deref(), Some("nmi"));
            assert_eq!(f.body.len(), 1);
        }
        other => panic!("{other:?}"),
    }
}

#[test]
fn syntax_errors() {
    assert!(matches!(error("function f() { nop"), ErrorKind::UnexpectedEOF));
    assert!(matches!(error("}"), ErrorKind::UnexpectedToken(_)));
    assert!(matches!(error("lda #"), ErrorKind::UnexpectedEOF));
}

#[test]
fn lexer_errors_win() {
    // The bad number ends the stream; it is reported instead of the unfinished block
    assert!(matches!(error("function f() {\n lda 12ab"), ErrorKind::InvalidNumber(_)));
}
