use std::{env, path::PathBuf};
use synan_runtime::grammar::Grammar;

fn grammar_path(name: &str) -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
        .join("tests/grammars")
        .join(format!("{}.json", name))
}

macro_rules! define_tests {
    ($($name:ident => $has_conflicts:expr),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = Grammar::from_file(grammar_path(stringify!($name))).unwrap();
            let generated = synan::compute(&grammar);
            assert!(!generated.automaton.is_empty());
            assert_eq!(generated.conflict_count() > 0, $has_conflicts);
        }
    )*};
}

define_tests! {
    balanced => false,
    arithmetic => false,
    ambiguous => true,
    statements => true,
}
