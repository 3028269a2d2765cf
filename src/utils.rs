//! Small queries over syntax trees.

use crate::syntax::{Expr, Ident};

/// The identifier a function parameter binds, together with its `*` or `**`
/// prefix. A bare `*` separating keyword-only parameters binds nothing.
pub fn get_param_ident(param: &Expr) -> Option<(&Ident, &str)> {
    match param {
        Expr::Ident(ident) => Some((ident, "")),
        Expr::TypedIdent(typed) => Some((&typed.ident, "")),
        Expr::Assign(assign) => get_param_ident(&assign.lhs),
        Expr::Unary(unary) => {
            let (ident, _) = get_param_ident(unary.x.as_ref()?)?;
            Some((ident, unary.op.as_str()))
        }
        _ => None,
    }
}

/// Like `get_param_ident`, with the name only.
pub fn get_param_name(param: &Expr) -> Option<(&str, &str)> {
    get_param_ident(param).map(|(ident, op)| (ident.name.as_str(), op))
}

/// Whether `x` is a call of the global function `name`.
pub fn is_call(x: &Expr, name: &str) -> bool {
    matches!(x, Expr::Call(call) if matches!(&call.x, Expr::Ident(ident) if ident.name == name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_file, ParseOptions};
    use crate::syntax::FileType;

    fn params(source: &str) -> Vec<Expr> {
        let options = ParseOptions::new(FileType::Bzl).with_type_annotations(true);
        let mut file = parse_file("test.bzl", source, &options).unwrap();
        match file.stmt.remove(0) {
            Expr::Def(def) => def.params,
            other => panic!("expected a def, got {}", other.kind()),
        }
    }

    #[test]
    fn test_get_param_name() {
        let params = params("def f(a, b = 1, c: int = 2, *args, **kwargs):\n    pass\n");
        let names: Vec<_> = params.iter().map(get_param_name).collect();
        assert_eq!(
            names,
            vec![
                Some(("a", "")),
                Some(("b", "")),
                Some(("c", "")),
                Some(("args", "*")),
                Some(("kwargs", "**")),
            ]
        );
    }

    #[test]
    fn test_keyword_only_marker_has_no_name() {
        let params = params("def f(a, *, b):\n    pass\n");
        assert_eq!(get_param_name(&params[1]), None);
        assert_eq!(get_param_name(&params[2]), Some(("b", "")));
    }

    #[test]
    fn test_is_call() {
        let file = parse_file("BUILD", "load(\":a.bzl\", \"a\")\nfoo(1)\nx.foo(2)\n", &Default::default()).unwrap();
        assert!(!is_call(&file.stmt[0], "load"));
        assert!(is_call(&file.stmt[1], "foo"));
        assert!(!is_call(&file.stmt[2], "foo"));
    }
}
