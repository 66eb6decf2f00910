use {
    core::{
        bnf::{attrs::AttrValue, Rule},
        gen::{
            buffer::Buffer,
            graph::{Cardinality, ChildRef, RuleGraphHelper},
            names,
            sink::Sink,
            GenError, ParserGenerator, PSI_ELEMENT_CLASS,
        },
        util::string_utils,
    },
    std::collections::{BTreeMap, BTreeSet, HashMap},
};

/// A resolved accessor child of a rule's node.
enum PsiChild<'g> {
    Rule(&'g Rule),
    Token(String),
}

impl<'g> ParserGenerator<'g> {
    /// Emits one interface and one implementation file per public,
    /// non-external rule. Interfaces are emitted first so the interface name
    /// map is complete before implementations reference it.
    pub fn generate_psi_classes(
        &mut self,
        sink: &mut dyn Sink,
        helper: &dyn RuleGraphHelper,
    ) -> Result<(), GenError> {
        let grammar = self.grammar();
        let psi_package = grammar.root_attr_str("psiPackage", "generated.psi");
        let impl_package = grammar.root_attr_str("psiImplPackage", "generated.psi.impl");
        let suffix = grammar.root_attr_str("psiImplClassSuffix", "Impl");

        let mut intf_classes: HashMap<String, String> = HashMap::new();
        for rule in grammar.rules() {
            if rule.is_private() || rule.is_external() {
                continue;
            }
            let psi_class = format!(
                "{}.{}",
                psi_package,
                names::psi_class_name(grammar, rule, rule.name(), true)
            );
            intf_classes.insert(rule.name().to_string(), psi_class.clone());

            debug!("Generating PSI interface {}", psi_class);
            let supers = self.super_interface_names(rule, &psi_package);
            let mut buf = Buffer::new(sink.open(&psi_class)?);
            self.generate_psi_interface(&mut buf, helper, rule, &psi_class, &supers)?;
        }

        for rule in grammar.rules() {
            if rule.is_private() || rule.is_external() {
                continue;
            }
            let psi_class = format!(
                "{}.{}{}",
                impl_package,
                names::psi_class_name(grammar, rule, rule.name(), true),
                suffix
            );
            let super_interface = intf_classes[rule.name()].clone();
            let super_class = self.super_class_name(rule, &impl_package, &suffix);

            debug!("Generating PSI implementation {}", psi_class);
            let mut buf = Buffer::new(sink.open(&psi_class)?);
            self.generate_psi_impl(&mut buf, helper, rule, &psi_class, &super_interface, &super_class)?;
        }
        Ok(())
    }

    /// The interfaces a rule's PSI interface extends: the parent rule's
    /// interface (if `extends` names a rule) followed by the `implements`
    /// attribute entries, with rule names mapped to their interfaces and
    /// entries already covered by the parent's `implements` dropped.
    fn super_interface_names(&self, rule: &'g Rule, psi_package: &str) -> Vec<String> {
        let grammar = self.grammar();
        let mut supers: Vec<String> = Vec::new();
        let mut super_rule_implements = String::new();

        if let Some(super_rule) = rule
            .attr_str_opt(grammar, "extends")
            .and_then(|name| self.rule(&name))
        {
            super_rule_implements =
                super_rule.attr_str(grammar, "implements", "generated.CompositeElement");
            supers.push(format!(
                "{}.{}",
                psi_package,
                names::psi_class_name(grammar, super_rule, super_rule.name(), true)
            ));
        }

        let implements = rule.attr_str(grammar, "implements", "generated.CompositeElement");
        for super_intf in implements.split(',') {
            match self.rule(super_intf) {
                Some(super_intf_rule) => supers.push(format!(
                    "{}.{}",
                    psi_package,
                    names::psi_class_name(grammar, super_intf_rule, super_intf_rule.name(), true)
                )),
                None => {
                    if !super_rule_implements.contains(super_intf) {
                        supers.push(super_intf.to_string());
                    }
                }
            }
        }
        supers
    }

    /// The implementation base class: the parent rule's implementation class
    /// when `extends` names a rule, the raw attribute value otherwise.
    fn super_class_name(&self, rule: &'g Rule, impl_package: &str, suffix: &str) -> String {
        let grammar = self.grammar();
        let super_rule_name = rule.attr_str(grammar, "extends", "generated.CompositeElementImpl");
        match self.rule(&super_rule_name) {
            Some(super_rule) => format!(
                "{}.{}{}",
                impl_package,
                names::psi_class_name(grammar, super_rule, super_rule.name(), true),
                suffix
            ),
            None => super_rule_name,
        }
    }

    fn generate_psi_interface(
        &mut self,
        buf: &mut Buffer,
        helper: &dyn RuleGraphHelper,
        rule: &'g Rule,
        psi_class: &str,
        psi_supers: &[String],
    ) -> Result<(), GenError> {
        let accessors = helper.children_for(rule.name());
        let rule_children = self.sorted_rule_children(&accessors);
        let token_children = self.sorted_token_children(&accessors);

        let mut imports = vec![
            "java.util.List".to_string(),
            "org.jetbrains.annotations.*".to_string(),
            PSI_ELEMENT_CLASS.to_string(),
        ];
        imports.extend(psi_supers.iter().cloned());
        imports.extend(self.accessor_classes(rule, &rule_children));

        let supers: Vec<&str> = psi_supers.iter().map(|name| &name[..]).collect();
        self.generate_class_header(buf, psi_class, &imports, "", true, &supers)?;

        for (child, cardinality) in rule_children {
            self.generate_psi_accessor(buf, rule, &PsiChild::Rule(child), cardinality, true)?;
        }
        for (token, cardinality) in token_children {
            self.generate_psi_accessor(buf, rule, &PsiChild::Token(token), cardinality, true)?;
        }
        buf.line("}")?;
        Ok(())
    }

    fn generate_psi_impl(
        &mut self,
        buf: &mut Buffer,
        helper: &dyn RuleGraphHelper,
        rule: &'g Rule,
        psi_class: &str,
        super_interface: &str,
        super_class: &str,
    ) -> Result<(), GenError> {
        let grammar = self.grammar();
        let type_holder = grammar.root_attr_str("elementTypeHolderClass", "generated.ParserTypes");
        // The mixin attribute overrides the computed base class.
        let impl_super = rule.attr_str(grammar, "mixin", super_class);

        let accessors = helper.children_for(rule.name());
        let rule_children = self.sorted_rule_children(&accessors);
        let token_children = self.sorted_token_children(&accessors);

        let mut imports = vec![
            "java.util.List".to_string(),
            "org.jetbrains.annotations.*".to_string(),
            "com.intellij.lang.ASTNode".to_string(),
            PSI_ELEMENT_CLASS.to_string(),
            "com.intellij.psi.util.PsiTreeUtil".to_string(),
            format!("static {}.*", type_holder),
        ];
        if !impl_super.is_empty() {
            imports.push(impl_super.clone());
        }
        imports.push(format!("{}.*", string_utils::package_name(super_interface)));
        imports.extend(self.accessor_classes(rule, &rule_children));

        let supers = [
            string_utils::short_name(&impl_super),
            string_utils::short_name(super_interface),
        ];
        self.generate_class_header(buf, psi_class, &imports, "", false, &supers)?;

        buf.line(&format!(
            "public {}(ASTNode node) {{",
            string_utils::short_name(psi_class)
        ))?;
        buf.line("super(node);")?;
        buf.line("}")?;
        buf.blank()?;

        for (child, cardinality) in rule_children {
            self.generate_psi_accessor(buf, rule, &PsiChild::Rule(child), cardinality, false)?;
        }
        for (token, cardinality) in token_children {
            self.generate_psi_accessor(buf, rule, &PsiChild::Token(token), cardinality, false)?;
        }
        buf.line("}")?;
        Ok(())
    }

    /// Emits one typed getter. Token children are limited to single,
    /// lowercase-named references; mixed-case names would not map back to a
    /// token constant unambiguously.
    fn generate_psi_accessor(
        &self,
        buf: &mut Buffer,
        rule: &'g Rule,
        child: &PsiChild<'g>,
        cardinality: Cardinality,
        intf: bool,
    ) -> Result<(), GenError> {
        let grammar = self.grammar();
        let many = cardinality.is_many();

        let child_name = match *child {
            PsiChild::Rule(child_rule) => child_rule.name().to_string(),
            PsiChild::Token(ref token) => {
                if token.to_lowercase() != *token || many {
                    return Ok(());
                }
                token.clone()
            }
        };

        let getter_base = rule
            .attr(grammar, "methodRenames", Some(&child_name))
            .and_then(AttrValue::as_str)
            .map(String::from)
            .unwrap_or_else(|| {
                format!(
                    "get{}",
                    names::psi_class_name(grammar, rule, &child_name, false)
                )
            });
        let getter = format!("{}{}", getter_base, if many { "List" } else { "" });

        if !intf {
            buf.line("@Override")?;
        }
        match cardinality {
            Cardinality::Optional => buf.line("@Nullable")?,
            _ => buf.line("@NotNull")?,
        }

        let accessor_class = match *child {
            PsiChild::Rule(child_rule) => self.accessor_type(rule, child_rule),
            PsiChild::Token(_) => PSI_ELEMENT_CLASS.to_string(),
        };
        let class_name = string_utils::short_name(&accessor_class).to_string();

        buf.line(&format!(
            "public {}{}{}{}{}",
            if many { "List<" } else { "" },
            class_name,
            if many { "> " } else { " " },
            getter,
            if intf { "();" } else { "() {" }
        ))?;

        if !intf {
            match *child {
                PsiChild::Token(ref token) => {
                    buf.line(&format!(
                        "ASTNode child = getNode().findChildByType({});",
                        names::token_element_type(grammar, token)
                    ))?;
                    buf.line("return child == null? null : child.getPsi();")?;
                }
                PsiChild::Rule(_) => {
                    if many {
                        buf.line(&format!(
                            "return PsiTreeUtil.getChildrenOfTypeAsList(this, {}.class);",
                            class_name
                        ))?;
                    } else {
                        buf.line(&format!(
                            "return PsiTreeUtil.getChildOfType(this, {}.class);",
                            class_name
                        ))?;
                    }
                }
            }
            buf.line("}")?;
        }
        buf.blank()?;
        Ok(())
    }

    /// The getter return type for a rule child: external rules surface
    /// through their `implements` attribute, other rules through their PSI
    /// interface.
    fn accessor_type(&self, rule: &'g Rule, child: &'g Rule) -> String {
        let grammar = self.grammar();
        if child.is_external() {
            child.attr_str(grammar, "implements", PSI_ELEMENT_CLASS)
        } else {
            names::psi_class_name(grammar, rule, child.name(), true)
        }
    }

    fn accessor_classes(
        &self,
        rule: &'g Rule,
        children: &[(&'g Rule, Cardinality)],
    ) -> Vec<String> {
        let mut classes: BTreeSet<String> = BTreeSet::new();
        for &(child, _) in children {
            classes.insert(self.accessor_type(rule, child));
        }
        classes.into_iter().collect()
    }

    /// Public rule children of the accessor map, sorted by rule name.
    fn sorted_rule_children(
        &self,
        accessors: &[(ChildRef, Cardinality)],
    ) -> Vec<(&'g Rule, Cardinality)> {
        let mut sorted: BTreeMap<String, (&'g Rule, Cardinality)> = BTreeMap::new();
        for &(ref child, cardinality) in accessors {
            if let ChildRef::Rule(ref name) = *child {
                if let Some(child_rule) = self.rule(name) {
                    if !child_rule.is_private() {
                        sorted.insert(name.clone(), (child_rule, cardinality));
                    }
                }
            }
        }
        sorted.into_iter().map(|(_, entry)| entry).collect()
    }

    /// Token children of the accessor map restricted to recorded simple
    /// tokens, sorted by token name.
    fn sorted_token_children(
        &self,
        accessors: &[(ChildRef, Cardinality)],
    ) -> Vec<(String, Cardinality)> {
        let mut sorted: BTreeMap<String, Cardinality> = BTreeMap::new();
        for &(ref child, cardinality) in accessors {
            if let ChildRef::Token(ref name) = *child {
                if self.simple_tokens().contains(name) {
                    sorted.insert(name.clone(), cardinality);
                }
            }
        }
        sorted.into_iter().collect()
    }
}
