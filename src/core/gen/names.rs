use core::{
    bnf::{Grammar, Rule},
    util::string_utils,
};

/// The element-type constant emitted for a rule's node: the `elementType`
/// attribute (default: the rule name), uppercased and prefixed with
/// `elementTypePrefix`.
pub fn element_type(grammar: &Grammar, rule: &Rule) -> String {
    let element_type = rule.attr_str(grammar, "elementType", rule.name());
    let prefix = rule.attr_str(grammar, "elementTypePrefix", "");
    format!("{}{}", prefix, element_type.to_uppercase())
}

/// The element-type constant emitted for a simple token reference.
pub fn token_element_type(grammar: &Grammar, token: &str) -> String {
    let prefix = grammar.root_attr_str("elementTypePrefix", "");
    format!("{}{}", prefix, token.to_uppercase())
}

/// The PSI class name derived from `name`, optionally carrying the
/// `psiClassPrefix` attribute resolved against `rule`.
pub fn psi_class_name(grammar: &Grammar, rule: &Rule, name: &str, with_prefix: bool) -> String {
    let prefix = if with_prefix {
        rule.attr_str(grammar, "psiClassPrefix", "")
    } else {
        String::new()
    };
    format!("{}{}", prefix, string_utils::pascal_case(name))
}

/// The function name of the `index`th sub-expression of `func`.
pub fn next_name(func: &str, index: usize) -> String {
    format!("{}_{}", func, index)
}

/// Stable 64-bit hash of a function name, used to key memoization entries in
/// the emitted parser.
pub fn func_hash(name: &str) -> i64 {
    let mut hash: i64 = 0;
    for c in name.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(c as i64);
    }
    hash
}
