//! Property-based tests for the parser.
//!
//! The parser must accept any input: the tree is lossless, every error lies
//! inside the text, and analysis never fails on a tree the parser built.
#![cfg(feature = "proptest")]

use proptest::prelude::*;
use servicedsl::FileId;
use servicedsl::hir::{BuildOptions, analyze};
use servicedsl::parser::parse;

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

/// Fragments that look like the language, so the grammar gets exercised
/// beyond the first token.
fn arb_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("service ".to_string()),
        Just("op ".to_string()),
        Just("type ".to_string()),
        Just("import ".to_string()),
        Just("extends ".to_string()),
        Just("calls ".to_string()),
        Just("{".to_string()),
        Just("}".to_string()),
        Just("(".to_string()),
        Just(")".to_string()),
        Just(":".to_string()),
        Just(";".to_string()),
        Just(",".to_string()),
        Just(".*".to_string()),
        Just("[]".to_string()),
        Just(" = ".to_string()),
        Just("/* c */".to_string()),
        Just("// c\n".to_string()),
        "[A-Za-z_][A-Za-z0-9_]{0,6}",
        "[ \n\t]{1,3}",
    ]
}

fn arb_source() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_fragment(), 0..40).prop_map(|parts| parts.concat())
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn parse_is_lossless(text in arb_source()) {
        let parse = parse(&text);
        prop_assert_eq!(parse.syntax().to_string(), text);
    }

    #[test]
    fn parse_is_lossless_on_arbitrary_text(text in "\\PC{0,64}") {
        let parse = parse(&text);
        prop_assert_eq!(parse.syntax().to_string(), text);
    }

    #[test]
    fn errors_stay_inside_text(text in arb_source()) {
        let parse = parse(&text);
        let len = text.len() as u32;
        for error in parse.errors() {
            prop_assert!(u32::from(error.range.end()) <= len);
        }
    }

    #[test]
    fn analysis_never_faults(text in arb_source()) {
        let analysis = analyze(FileId::new(0), &text, &BuildOptions::default());
        prop_assert!(analysis.is_ok(), "internal fault on {:?}", text);
    }
}
