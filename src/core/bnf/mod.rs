use {
    core::bnf::attrs::{AttrValue, Attrs},
    std::path::{Path, PathBuf},
};

pub mod attrs;

/// An in-memory BNF grammar: an ordered sequence of rules plus a root
/// attribute bag. The first rule is the grammar root.
pub struct Grammar {
    rules: Vec<Rule>,
    attrs: Attrs,
    source_dir: Option<PathBuf>,
}

impl Grammar {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// The directory class-header file references are resolved against.
    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_ref().map(|dir| &**dir)
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn root_attr(&self, name: &str, target: Option<&str>) -> Option<&AttrValue> {
        self.attrs.lookup(name, target)
    }

    pub fn root_attr_str(&self, name: &str, default: &str) -> String {
        self.root_attr_str_opt(name)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn root_attr_str_opt(&self, name: &str) -> Option<String> {
        self.attrs
            .lookup(name, None)
            .and_then(AttrValue::as_str)
            .map(String::from)
    }

    pub fn root_attr_bool(&self, name: &str, default: bool) -> bool {
        self.attrs
            .lookup(name, None)
            .and_then(AttrValue::as_bool)
            .unwrap_or(default)
    }
}

/// A single grammar rule: a name, a body expression, and rule-local
/// attributes.
pub struct Rule {
    name: String,
    expression: Expression,
    attrs: Attrs,
}

impl Rule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Resolves an attribute from the rule outward to the grammar root. The
    /// match target defaults to the rule name.
    pub fn attr<'a>(
        &'a self,
        grammar: &'a Grammar,
        name: &str,
        target: Option<&str>,
    ) -> Option<&'a AttrValue> {
        let target = match target {
            Some(target) => Some(target),
            None => Some(&self.name[..]),
        };

        self.attrs
            .lookup(name, target)
            .or_else(|| grammar.attrs.lookup(name, target))
    }

    pub fn attr_str(&self, grammar: &Grammar, name: &str, default: &str) -> String {
        self.attr_str_opt(grammar, name)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn attr_str_opt(&self, grammar: &Grammar, name: &str) -> Option<String> {
        self.attr(grammar, name, None)
            .and_then(AttrValue::as_str)
            .map(String::from)
    }

    /// Rule-local string attribute, without the root fallback.
    pub fn local_attr_str(&self, name: &str) -> Option<String> {
        self.attrs
            .lookup(name, Some(&self.name))
            .and_then(AttrValue::as_str)
            .map(String::from)
    }

    fn local_flag(&self, name: &str) -> bool {
        self.attrs
            .lookup(name, Some(&self.name))
            .and_then(AttrValue::as_bool)
            .unwrap_or(false)
    }

    /// Private rules produce no node and no PSI class.
    pub fn is_private(&self) -> bool {
        self.local_flag("private")
    }

    /// External rules delegate to an external parser function.
    pub fn is_external(&self) -> bool {
        self.local_flag("external")
    }

    /// Meta rules take other parsers as parameters.
    pub fn is_meta(&self) -> bool {
        self.local_flag("meta")
    }

    /// Descends through trivial wrappers to the first expression with its own
    /// parsing semantics.
    pub fn first_non_trivial(&self) -> &Expression {
        let mut node = &self.expression;
        while node.is_trivial() {
            node = node.children()[0];
        }
        node
    }
}

/// A grammar expression, one variant per BNF construct.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Reference(String),
    StringLiteral(String),
    NumberLiteral(String),
    Sequence(Vec<Expression>),
    Choice(Vec<Expression>),
    Optional(Box<Expression>),
    ZeroOrMore(Box<Expression>),
    OneOrMore(Box<Expression>),
    And(Box<Expression>),
    Not(Box<Expression>),
    Parenthesized(Box<Expression>),
    External(Vec<Expression>),
}

impl Expression {
    pub fn reference(name: &str) -> Expression {
        Expression::Reference(name.to_string())
    }

    pub fn string(value: &str) -> Expression {
        Expression::StringLiteral(value.to_string())
    }

    pub fn number(text: &str) -> Expression {
        Expression::NumberLiteral(text.to_string())
    }

    pub fn optional(child: Expression) -> Expression {
        Expression::Optional(Box::new(child))
    }

    pub fn zero_or_more(child: Expression) -> Expression {
        Expression::ZeroOrMore(Box::new(child))
    }

    pub fn one_or_more(child: Expression) -> Expression {
        Expression::OneOrMore(Box::new(child))
    }

    pub fn and_predicate(child: Expression) -> Expression {
        Expression::And(Box::new(child))
    }

    pub fn not_predicate(child: Expression) -> Expression {
        Expression::Not(Box::new(child))
    }

    pub fn parenthesized(child: Expression) -> Expression {
        Expression::Parenthesized(Box::new(child))
    }

    /// The immediate sub-expressions, in declaration order.
    pub fn children(&self) -> Vec<&Expression> {
        match *self {
            Expression::Sequence(ref children)
            | Expression::Choice(ref children)
            | Expression::External(ref children) => children.iter().collect(),
            Expression::Optional(ref child)
            | Expression::ZeroOrMore(ref child)
            | Expression::OneOrMore(ref child)
            | Expression::And(ref child)
            | Expression::Not(ref child)
            | Expression::Parenthesized(ref child) => vec![child],
            _ => Vec::new(),
        }
    }

    /// Trivial expressions are pure single-child groupings: they compile to a
    /// tail call rather than a parsing frame.
    pub fn is_trivial(&self) -> bool {
        match *self {
            Expression::Parenthesized(_) => true,
            Expression::Sequence(ref children) | Expression::Choice(ref children) => {
                children.len() == 1
            }
            _ => false,
        }
    }

    /// Renders the expression back to grammar source text. Pin patterns are
    /// matched against this rendering, and it names meta-rule parameters.
    pub fn text(&self) -> String {
        match *self {
            Expression::Reference(ref name) => name.clone(),
            Expression::StringLiteral(ref value) => format!("'{}'", value),
            Expression::NumberLiteral(ref text) => text.clone(),
            Expression::Sequence(ref children) => {
                let texts: Vec<String> = children.iter().map(Expression::text).collect();
                texts.join(" ")
            }
            Expression::Choice(ref children) => {
                let texts: Vec<String> = children.iter().map(Expression::text).collect();
                texts.join(" | ")
            }
            Expression::Optional(ref child) => Expression::quantified_text(child, "?"),
            Expression::ZeroOrMore(ref child) => Expression::quantified_text(child, "*"),
            Expression::OneOrMore(ref child) => Expression::quantified_text(child, "+"),
            Expression::And(ref child) => format!("&{}", Expression::grouped_text(child)),
            Expression::Not(ref child) => format!("!{}", Expression::grouped_text(child)),
            Expression::Parenthesized(ref child) => format!("({})", child.text()),
            Expression::External(ref children) => {
                let texts: Vec<String> = children.iter().map(Expression::text).collect();
                format!("<<{}>>", texts.join(" "))
            }
        }
    }

    fn quantified_text(child: &Expression, suffix: &str) -> String {
        format!("{}{}", Expression::grouped_text(child), suffix)
    }

    fn grouped_text(child: &Expression) -> String {
        match *child {
            Expression::Sequence(ref children) | Expression::Choice(ref children)
                if children.len() > 1 =>
            {
                format!("({})", child.text())
            }
            _ => child.text(),
        }
    }
}

/// Assembles a [Grammar] rule by rule, in the declaration order consumers
/// will observe.
pub struct GrammarBuilder {
    rules: Vec<Rule>,
    attrs: Attrs,
    source_dir: Option<PathBuf>,
}

impl GrammarBuilder {
    pub fn new() -> GrammarBuilder {
        GrammarBuilder {
            rules: Vec::new(),
            attrs: Attrs::new(),
            source_dir: None,
        }
    }

    pub fn rule(&mut self, name: &str, expression: Expression) {
        self.rules.push(Rule {
            name: name.to_string(),
            expression,
            attrs: Attrs::new(),
        });
    }

    pub fn rule_attr(&mut self, rule: &str, name: &str, value: AttrValue) {
        self.rule_mut(rule).attrs.insert(name, value);
    }

    pub fn rule_attr_scoped(&mut self, rule: &str, name: &str, pattern: &str, value: AttrValue) {
        self.rule_mut(rule).attrs.insert_scoped(name, pattern, value);
    }

    pub fn attr(&mut self, name: &str, value: AttrValue) {
        self.attrs.insert(name, value);
    }

    pub fn attr_scoped(&mut self, name: &str, pattern: &str, value: AttrValue) {
        self.attrs.insert_scoped(name, pattern, value);
    }

    pub fn source_dir(&mut self, dir: &Path) {
        self.source_dir = Some(dir.to_path_buf());
    }

    pub fn build(self) -> Grammar {
        for (i, rule) in self.rules.iter().enumerate() {
            if self.rules[..i].iter().any(|other| other.name == rule.name) {
                panic!("Duplicate rule definition: '{}'", rule.name);
            }
        }

        Grammar {
            rules: self.rules,
            attrs: self.attrs,
            source_dir: self.source_dir,
        }
    }

    fn rule_mut(&mut self, name: &str) -> &mut Rule {
        match self.rules.iter_mut().find(|rule| rule.name == name) {
            Some(rule) => rule,
            None => panic!("No such rule: '{}'", name),
        }
    }
}
