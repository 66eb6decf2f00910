use {
    core::{
        gen::{buffer::Buffer, names, GenError, ParserGenerator, IELEMENTTYPE_CLASS,
              PSI_ELEMENT_CLASS},
        util::string_utils,
    },
    std::collections::HashSet,
};

impl<'g> ParserGenerator<'g> {
    /// Emits the element-type holder unit: one constant per distinct public
    /// rule element type, one constant per referenced simple token, and the
    /// PSI element factory when PSI generation is on.
    pub fn generate_element_types_holder(
        &mut self,
        buf: &mut Buffer,
        class_name: &str,
        generate_psi: bool,
    ) -> Result<(), GenError> {
        let grammar = self.grammar();
        let impl_package = grammar.root_attr_str("psiImplPackage", "generated.psi.impl");
        let element_type_class = grammar.root_attr_str("elementTypeClass", IELEMENTTYPE_CLASS);
        let element_type_factory = grammar.root_attr_str_opt("elementTypeFactory");
        let token_type_class = grammar.root_attr_str("tokenTypeClass", IELEMENTTYPE_CLASS);
        let token_type_factory = grammar.root_attr_str_opt("tokenTypeFactory");

        let mut imports = vec![
            IELEMENTTYPE_CLASS.to_string(),
            PSI_ELEMENT_CLASS.to_string(),
            "com.intellij.lang.ASTNode".to_string(),
            element_type_class.clone(),
        ];
        if let Some(ref factory) = element_type_factory {
            imports.push(format!("static {}", factory));
        }
        imports.push(token_type_class.clone());
        if let Some(ref factory) = token_type_factory {
            imports.push(format!("static {}", factory));
        }
        if generate_psi {
            imports.push(format!("{}.*", impl_package));
        }
        self.generate_class_header(buf, class_name, &imports, "", true, &[])?;

        let element_create = match element_type_factory {
            Some(ref factory) => string_utils::short_name(factory).to_string(),
            None => format!("new {}", string_utils::short_name(&element_type_class)),
        };
        let mut visited: HashSet<String> = HashSet::new();
        for rule in grammar.rules() {
            if rule.is_private() || rule.is_external() || rule.name() == self.grammar_root() {
                continue;
            }
            let element_type = names::element_type(grammar, rule);
            if !visited.insert(element_type.clone()) {
                continue;
            }
            buf.line(&format!(
                "IElementType {} = {}(\"{}\");",
                element_type, element_create, element_type
            ))?;
        }
        buf.blank()?;

        let token_create = match token_type_factory {
            Some(ref factory) => string_utils::short_name(factory).to_string(),
            None => format!("new {}", string_utils::short_name(&token_type_class)),
        };
        let tokens: Vec<String> = self.simple_tokens().iter().cloned().collect();
        for token in &tokens {
            let display = grammar.root_attr_str(token, token);
            buf.line(&format!(
                "IElementType {} = {}(\"{}\");",
                names::token_element_type(grammar, token),
                token_create,
                display
            ))?;
        }
        buf.blank()?;

        if generate_psi {
            let suffix = grammar.root_attr_str("psiImplClassSuffix", "Impl");
            buf.line("class Factory {")?;
            buf.line("public static PsiElement createElement(ASTNode node) {")?;
            buf.line("IElementType type = node.getElementType();")?;
            visited.clear();
            let mut first = true;
            for rule in grammar.rules() {
                if rule.is_private() || rule.is_external() || rule.name() == self.grammar_root() {
                    continue;
                }
                let psi_class = format!(
                    "{}{}",
                    names::psi_class_name(grammar, rule, rule.name(), true),
                    suffix
                );
                let element_type = names::element_type(grammar, rule);
                if !visited.insert(element_type.clone()) {
                    continue;
                }
                buf.line(&format!(
                    "{}if (type == {}) {{",
                    if first { "" } else { "else " },
                    element_type
                ))?;
                buf.line(&format!("return new {}(node);", psi_class))?;
                first = false;
                buf.line("}")?;
            }
            buf.line("throw new AssertionError(\"Unknown element type: \" + type);")?;
            buf.line("}")?;
            buf.line("}")?;
        }
        buf.line("}")?;
        Ok(())
    }
}
