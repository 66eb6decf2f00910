use std::collections::HashMap;

/// How often a child node is observed under a rule's node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    Required,
    Optional,
    AnyNumber,
    AtLeastOne,
}

impl Cardinality {
    pub fn is_many(&self) -> bool {
        match *self {
            Cardinality::AnyNumber | Cardinality::AtLeastOne => true,
            _ => false,
        }
    }
}

/// A child slot of a rule's node: either another rule's node or a token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChildRef {
    Rule(String),
    Token(String),
}

/// External cardinality analyzer consulted by the PSI emitter. Maps each
/// rule to its observable children; string-literal children are never
/// reported.
pub trait RuleGraphHelper {
    fn children_for(&self, rule_name: &str) -> Vec<(ChildRef, Cardinality)>;
}

/// Trivial map-backed helper implementation.
pub struct MapGraphHelper {
    map: HashMap<String, Vec<(ChildRef, Cardinality)>>,
}

impl MapGraphHelper {
    pub fn new() -> MapGraphHelper {
        MapGraphHelper {
            map: HashMap::new(),
        }
    }

    pub fn add(&mut self, rule_name: &str, child: ChildRef, cardinality: Cardinality) {
        self.map
            .entry(rule_name.to_string())
            .or_insert_with(Vec::new)
            .push((child, cardinality));
    }
}

impl RuleGraphHelper for MapGraphHelper {
    fn children_for(&self, rule_name: &str) -> Vec<(ChildRef, Cardinality)> {
        self.map.get(rule_name).cloned().unwrap_or_else(Vec::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_helper_returns_registered_children() {
        //setup
        let mut helper = MapGraphHelper::new();
        helper.add(
            "stmt",
            ChildRef::Rule("expr".to_string()),
            Cardinality::Required,
        );
        helper.add(
            "stmt",
            ChildRef::Token("semi".to_string()),
            Cardinality::Optional,
        );

        //exercise
        let children = helper.children_for("stmt");

        //verify
        assert_eq!(children.len(), 2);
        assert_eq!(
            children[0],
            (ChildRef::Rule("expr".to_string()), Cardinality::Required)
        );
        assert!(helper.children_for("missing").is_empty());
    }

    #[test]
    fn cardinality_many() {
        //verify
        assert!(Cardinality::AnyNumber.is_many());
        assert!(Cardinality::AtLeastOne.is_many());
        assert!(!Cardinality::Required.is_many());
        assert!(!Cardinality::Optional.is_many());
    }
}
