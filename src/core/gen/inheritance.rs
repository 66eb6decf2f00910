use {
    core::{
        bnf::Grammar,
        data::ordered::OrderedMultiMap,
        gen::names,
    },
    std::collections::HashSet,
};

/// The rule-extends relation over element types, transitively closed and
/// reflexive on public element types, plus the set of rules participating in
/// inheritance on either side.
pub struct Inheritance {
    extends_map: OrderedMultiMap<String, String>,
    with_inheritance: HashSet<String>,
}

impl Inheritance {
    pub fn extends_map(&self) -> &OrderedMultiMap<String, String> {
        &self.extends_map
    }

    pub fn involves(&self, rule_name: &str) -> bool {
        self.with_inheritance.contains(rule_name)
    }
}

/// Builds the inheritance analysis. Runs once, before any code emission.
///
/// For each public rule with an `extends` attribute naming a known rule, an
/// edge from the super element type to the sub element type is recorded; the
/// edge set is then relaxed to its transitive closure (cycles are accepted),
/// and every key denoting a public element type is added to its own
/// descendant set.
pub fn analyze(grammar: &Grammar) -> Inheritance {
    let mut extends_map: OrderedMultiMap<String, String> = OrderedMultiMap::new();
    let mut with_inheritance: HashSet<String> = HashSet::new();
    let mut public_types: HashSet<String> = HashSet::new();

    for rule in grammar.rules() {
        if rule.is_private() || rule.is_external() {
            continue;
        }

        let element_type = names::element_type(grammar, rule);
        public_types.insert(element_type.clone());

        let super_rule = match rule
            .attr_str_opt(grammar, "extends")
            .and_then(|name| grammar.rule(&name))
        {
            Some(super_rule) => super_rule,
            None => continue,
        };

        extends_map.put(names::element_type(grammar, super_rule), element_type);
        with_inheritance.insert(rule.name().to_string());
        with_inheritance.insert(super_rule.name().to_string());
    }

    loop {
        let mut changed = false;
        let parents: Vec<String> = extends_map.keys().cloned().collect();
        for parent in &parents {
            let children: Vec<String> =
                extends_map.get(parent).unwrap().iter().cloned().collect();
            for child in children {
                let descendants: Vec<String> = match extends_map.get(&child) {
                    Some(descendants) => descendants.iter().cloned().collect(),
                    None => continue,
                };
                for descendant in descendants {
                    changed |= extends_map.put(parent.clone(), descendant);
                }
            }
        }
        if !changed {
            break;
        }
    }

    let parents: Vec<String> = extends_map.keys().cloned().collect();
    for parent in parents {
        if public_types.contains(&parent) {
            extends_map.put(parent.clone(), parent);
        }
    }

    Inheritance {
        extends_map,
        with_inheritance,
    }
}
