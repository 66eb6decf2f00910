extern crate indexmap;
#[macro_use]
extern crate log;
extern crate regex;

use {
    core::gen::sink::FsSink,
    std::path::Path,
};

mod core;

pub use core::bnf::attrs::AttrValue;
pub use core::bnf::{Expression, Grammar, GrammarBuilder, Rule};
pub use core::gen::graph::{Cardinality, ChildRef, MapGraphHelper, RuleGraphHelper};
pub use core::gen::sink::{MemSink, Sink};
pub use core::gen::{GenError, ParserGenerator};

/// Generates the parser units, the element-type holder, and (unless
/// disabled) the PSI hierarchy for `grammar`, writing one file per emitted
/// class under `root_path`.
///
/// The `helper` is the external cardinality analyzer consulted for PSI
/// accessors.
pub fn generate(
    grammar: &Grammar,
    root_path: &Path,
    helper: &dyn RuleGraphHelper,
) -> Result<(), GenError> {
    let mut sink = FsSink::new(root_path);
    generate_into(grammar, &mut sink, helper)
}

/// Like [generate], but writing through an arbitrary sink.
pub fn generate_into(
    grammar: &Grammar,
    sink: &mut dyn Sink,
    helper: &dyn RuleGraphHelper,
) -> Result<(), GenError> {
    let mut generator = ParserGenerator::new(grammar)?;
    generator.generate(sink, helper)
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn empty_grammar_fails_to_generate() {
        //setup
        let grammar = GrammarBuilder::new().build();
        let mut sink = MemSink::new();
        let helper = MapGraphHelper::new();

        //exercise
        let res = generate_into(&grammar, &mut sink, &helper);

        //verify
        assert!(res.is_err());

        let err = res.err().unwrap();
        assert_eq!(format!("{}", err), "Grammar contains no rules");
        assert!(err.source().is_none());
        assert!(sink.class_names().is_empty());
    }

    #[test]
    fn minimal_grammar_generates_all_units() {
        //setup
        let mut builder = GrammarBuilder::new();
        builder.rule("file", Expression::reference("stmt"));
        builder.rule(
            "stmt",
            Expression::Sequence(vec![
                Expression::reference("ident"),
                Expression::reference("semi"),
            ]),
        );
        let grammar = builder.build();

        let mut sink = MemSink::new();
        let helper = MapGraphHelper::new();

        //exercise
        generate_into(&grammar, &mut sink, &helper).unwrap();

        //verify
        assert_eq!(
            sink.class_names(),
            vec![
                "generated.Parser".to_string(),
                "generated.ParserTypes".to_string(),
                "generated.psi.File".to_string(),
                "generated.psi.Stmt".to_string(),
                "generated.psi.impl.FileImpl".to_string(),
                "generated.psi.impl.StmtImpl".to_string(),
            ]
        );
    }
}
