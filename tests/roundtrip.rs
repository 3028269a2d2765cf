use std::fs;

use bzlfmt::syntax::{End, ParenExpr};
use bzlfmt::{format, parse, parse_guess, Expr, File, FileType};

fn parse_default(source: &str) -> File {
    parse("test", source.as_bytes(), FileType::Default).unwrap()
}

fn format_string(file: &File) -> String {
    String::from_utf8(format(file)).unwrap()
}

/// The node kinds and names of `file` in walk order, which ignores
/// positions, source spellings and layout hints.
fn shape(file: &File) -> Vec<String> {
    let mut out = Vec::new();
    file.walk(&mut |x: &Expr, stack: &[&Expr]| {
        let detail = match x {
            Expr::Ident(ident) => ident.name.clone(),
            Expr::Literal(lit) => lit.token.clone(),
            Expr::String(s) => format!("{:?}", s.value),
            Expr::Binary(binary) => binary.op.clone(),
            Expr::Assign(assign) => assign.op.clone(),
            Expr::Unary(unary) => unary.op.clone(),
            Expr::Dot(dot) => dot.name.clone(),
            Expr::Def(def) => def.name.clone(),
            _ => String::new(),
        };
        out.push(format!("{}{} {}", " ".repeat(stack.len()), x.kind(), detail));
    });
    out
}

/// The operator of a binary node and the operators of its two operands.
fn binary_nesting(x: &Expr) -> (String, String, String) {
    let op = |x: &Expr| match x {
        Expr::Binary(binary) => binary.op.clone(),
        _ => String::new(),
    };
    match x {
        Expr::Binary(binary) => (binary.op.clone(), op(&binary.x), op(&binary.y)),
        _ => panic!("expected a binary expression, got {}", x.kind()),
    }
}

#[test]
fn test_precedence_is_kept_with_parens() {
    let file = parse_default("\"x\" \"y\" % foo\n");
    assert_eq!(format_string(&file), "(\"x\" + \"y\") % foo\n");
}

#[test]
fn test_modulo_binds_tighter_than_plus() {
    let first = parse_default("\"x\" + \"y\" % foo\n");
    let nesting = binary_nesting(&first.stmt[0]);
    assert_eq!(nesting, ("+".to_string(), String::new(), "%".to_string()));

    let formatted = format_string(&first);
    assert_eq!(formatted, "\"x\" + \"y\" % foo\n");
    let second = parse_default(&formatted);
    assert_eq!(binary_nesting(&second.stmt[0]), nesting);

    let first = parse_default("(\"x\" + \"y\") % foo\n");
    let formatted = format_string(&first);
    assert_eq!(formatted, "(\"x\" + \"y\") % foo\n");
    let second = parse_default(&formatted);
    let Expr::Binary(binary) = &second.stmt[0] else {
        panic!("expected a binary expression");
    };
    assert_eq!(binary.op, "%");
    let Expr::Paren(paren) = &binary.x else {
        panic!("expected parens around the sum, got {}", binary.x.kind());
    };
    assert!(matches!(&paren.x, Expr::Binary(sum) if sum.op == "+"));
}

#[test]
fn test_bzl_literals_keep_their_layout() {
    let source = "x = [1, 2]\ny = {a, b}\nz = [\n    1,\n    2,\n]\n";
    let file = parse("defs.bzl", source.as_bytes(), FileType::Bzl).unwrap();
    assert_eq!(format_string(&file), source);
}

#[test]
fn test_def_header_comment_is_stable() {
    for source in [
        "def f(a, b = 1):  # hdr\n    pass\n",
        "def f(\n    a,  # pa\n    b):  # hdr\n    return a  # ret\n",
    ] {
        let first = format(&parse("defs.bzl", source.as_bytes(), FileType::Bzl).unwrap());
        let second = format(&parse("defs.bzl", &first, FileType::Bzl).unwrap());
        assert_eq!(String::from_utf8_lossy(&second), String::from_utf8_lossy(&first));
    }
}

#[test]
fn test_edit_adds_parens() {
    let mut file = parse_default("1 + 2");
    assert_eq!(format_string(&file), "1 + 2\n");

    file.edit(&mut |x: &Expr, stack: &[Expr]| {
        if matches!(stack.last(), Some(Expr::Paren(_))) {
            return None;
        }
        match x {
            Expr::Literal(_) => Some(Expr::Paren(Box::new(ParenExpr {
                start: Default::default(),
                x: x.clone(),
                end: End::default(),
                force_multi_line: false,
                comments: Default::default(),
            }))),
            _ => None,
        }
    });
    assert_eq!(format_string(&file), "(1) + (2)\n");
}

#[test]
fn test_edit_removes_parens() {
    let mut file = parse_default("((((1))) + 2) + (3 + 4) * 5");
    assert_eq!(format_string(&file), "((((1))) + 2) + (3 + 4) * 5\n");

    file.edit(&mut |x: &Expr, _: &[Expr]| {
        let Expr::Paren(_) = x else {
            return None;
        };
        let mut inner = x;
        while let Expr::Paren(paren) = inner {
            inner = &paren.x;
        }
        Some(inner.clone())
    });
    // The printer adds back the parens the operator precedence needs.
    assert_eq!(format_string(&file), "1 + 2 + (3 + 4) * 5\n");
}

#[test]
fn test_reparse_gives_same_tree() {
    for entry in fs::read_dir("tests/fixtures/format/source").unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let data = fs::read(&path).unwrap();

        let first = parse_guess(&name, &data).unwrap();
        let formatted = format(&first);
        let second = parse_guess(&name, &formatted).unwrap();

        assert_eq!(shape(&first), shape(&second), "{}", name);
        assert_eq!(format(&second), formatted, "{}", name);
    }
}
