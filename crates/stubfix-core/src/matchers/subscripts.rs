//! Lowering of subscripted typing generics to their builtin spelling.

use std::collections::BTreeSet;

use tree_sitter::Node;

use crate::patch::PatchLedger;
use crate::syntax::visitor::subscript_parts;
use crate::syntax::{visit, walk_children, SourceFile, Visitor};

struct SubscriptLowerer<'f, 'n> {
    file: &'f SourceFile,
    names: &'n BTreeSet<String>,
    ledger: PatchLedger,
}

impl<'t> Visitor<'t> for SubscriptLowerer<'_, '_> {
    fn visit_subscript(&mut self, node: Node<'t>) {
        if let Some((value, _)) = subscript_parts(node) {
            if value.kind() == "identifier" {
                let name = self.file.node_text(value);
                if self.names.contains(name) {
                    self.ledger.replace_every(
                        value.start_position().row,
                        format!("{name}["),
                        format!("{}[", name.to_lowercase()),
                    );
                }
            }
        }
        walk_children(self, node);
    }
}

/// Rewrite `Name[` to `name[` on every line that subscripts one of `names`.
pub fn lower_subscripts(file: &SourceFile, names: &BTreeSet<String>) -> PatchLedger {
    let mut lowerer = SubscriptLowerer {
        file,
        names,
        ledger: PatchLedger::new(),
    };
    if !names.is_empty() {
        visit(&mut lowerer, file.root());
    }
    lowerer.ledger
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::apply;

    fn lower(source: &str, names: &[&str]) -> Vec<String> {
        let file = SourceFile::parse("a.pyi", source).unwrap();
        let names: BTreeSet<String> = names.iter().map(|n| n.to_string()).collect();
        apply(&file.lines, &lower_subscripts(&file, &names)).unwrap()
    }

    #[test]
    fn test_lowers_annotations_and_expressions() {
        let out = lower(
            "def f(x: List[int]) -> Dict[str, List[int]]: ...\n_A = Tuple[int, ...]\n",
            &["List", "Dict", "Tuple"],
        );
        assert_eq!(
            out,
            vec![
                "def f(x: list[int]) -> dict[str, list[int]]: ...",
                "_A = tuple[int, ...]",
            ]
        );
    }

    #[test]
    fn test_only_listed_names() {
        let out = lower("x: List[int]\ny: Set[int]\n", &["Set"]);
        assert_eq!(out, vec!["x: List[int]", "y: set[int]"]);
    }

    #[test]
    fn test_compound_names_lowered_whole() {
        let out = lower("x: DefaultDict[str, FrozenSet[int]]\n", &["DefaultDict", "FrozenSet"]);
        assert_eq!(out, vec!["x: defaultdict[str, frozenset[int]]"]);
    }

    #[test]
    fn test_attribute_subscripts_untouched() {
        let file = SourceFile::parse("a.pyi", "x: typing.List[int]\n").unwrap();
        let names: BTreeSet<String> = ["List".to_string()].into();
        assert!(lower_subscripts(&file, &names).is_empty());
    }
}
