use {
    core::{
        bnf::{Grammar, Rule},
        data::ordered::OrderedSet,
        gen::{
            buffer::Buffer,
            graph::RuleGraphHelper,
            inheritance::Inheritance,
            sink::Sink,
        },
        util::string_utils,
    },
    std::{
        collections::{HashMap, HashSet},
        error, fmt, fs, io,
    },
};

pub mod buffer;
pub mod element_types;
pub mod expr;
pub mod graph;
pub mod inheritance;
pub mod names;
pub mod psi;
pub mod sink;

pub static IELEMENTTYPE_CLASS: &'static str = "com.intellij.psi.tree.IElementType";
pub static PSI_ELEMENT_CLASS: &'static str = "com.intellij.psi.PsiElement";

static DEFAULT_FILE_HEADER: &'static str =
    "// This is a generated file. Not intended for manual editing.";
static DEFAULT_PARSER_CLASS: &'static str = "generated.Parser";
static DEFAULT_TYPE_HOLDER_CLASS: &'static str = "generated.ParserTypes";

static RULE_SEPARATOR: &'static str =
    "/* ********************************************************** */";

/// Emits a recursive-descent parser, an element-type holder, and a PSI class
/// hierarchy from an in-memory BNF grammar.
///
/// Construction precomputes the derived rule maps and the inheritance
/// analysis; `generate` then runs a single forward pass over the output
/// units. The set of referenced simple tokens is accumulated as a side
/// effect of parser emission (per parser unit in sorted-unit order, rules in
/// declaration order, tokens in textual order within a rule) and read back
/// by the element-type and PSI emitters.
pub struct ParserGenerator<'g> {
    grammar: &'g Grammar,
    rule_index: HashMap<String, usize>,
    rule_parser_classes: HashMap<String, String>,
    grammar_root: String,
    inheritance: Inheritance,
    simple_tokens: OrderedSet<String>,
    memoize: bool,
}

impl<'g> ParserGenerator<'g> {
    pub fn new(grammar: &'g Grammar) -> Result<ParserGenerator<'g>, GenError> {
        if grammar.rules().is_empty() {
            return Err(GenError::EmptyGrammarErr);
        }

        let mut rule_index: HashMap<String, usize> = HashMap::new();
        let mut rule_parser_classes: HashMap<String, String> = HashMap::new();
        for (i, rule) in grammar.rules().iter().enumerate() {
            rule_index.insert(rule.name().to_string(), i);
            rule_parser_classes.insert(
                rule.name().to_string(),
                rule.attr_str(grammar, "parserClass", DEFAULT_PARSER_CLASS),
            );
        }

        Ok(ParserGenerator {
            grammar,
            rule_index,
            rule_parser_classes,
            grammar_root: grammar.rules()[0].name().to_string(),
            inheritance: inheritance::analyze(grammar),
            simple_tokens: OrderedSet::new(),
            memoize: grammar.root_attr_bool("memoization", false),
        })
    }

    /// Runs the full generation pass: parser units, the element-type holder,
    /// and (unless `generatePsi` is off) PSI interfaces and implementations.
    pub fn generate(
        &mut self,
        sink: &mut dyn Sink,
        helper: &dyn RuleGraphHelper,
    ) -> Result<(), GenError> {
        self.generate_parsers(sink)?;

        let generate_psi = self.grammar.root_attr_bool("generatePsi", true);
        let holder_class = self
            .grammar
            .root_attr_str("elementTypeHolderClass", DEFAULT_TYPE_HOLDER_CLASS);
        {
            debug!("Generating element type holder {}", holder_class);
            let mut buf = Buffer::new(sink.open(&holder_class)?);
            self.generate_element_types_holder(&mut buf, &holder_class, generate_psi)?;
        }

        if generate_psi {
            self.generate_psi_classes(sink, helper)?;
        }
        Ok(())
    }

    fn generate_parsers(&mut self, sink: &mut dyn Sink) -> Result<(), GenError> {
        let mut classes: Vec<String> = self.rule_parser_classes.values().cloned().collect();
        classes.sort();
        classes.dedup();

        let grammar = self.grammar;
        for class in classes {
            let rule_names: Vec<String> = grammar
                .rules()
                .iter()
                .filter(|rule| self.rule_parser_classes[rule.name()] == class)
                .map(|rule| rule.name().to_string())
                .collect();

            debug!("Generating parser class {}", class);
            let mut buf = Buffer::new(sink.open(&class)?);
            self.generate_parser_unit(&mut buf, &class, &rule_names)?;
        }
        Ok(())
    }

    fn generate_parser_unit(
        &mut self,
        buf: &mut Buffer,
        parser_class: &str,
        rule_names: &[String],
    ) -> Result<(), GenError> {
        let holder_class = self
            .grammar
            .root_attr_str("elementTypeHolderClass", DEFAULT_TYPE_HOLDER_CLASS);
        let stub_parser = self
            .grammar
            .root_attr_str("stubParserClass", "generated.ParserUtil");
        let root_parser_class = self.rule_parser_classes[&self.grammar_root].clone();
        let root_parser = parser_class == root_parser_class;

        let mut imports = vec![
            "org.jetbrains.annotations.*".to_string(),
            "com.intellij.lang.LighterASTNode".to_string(),
            "com.intellij.lang.PsiBuilder".to_string(),
            "com.intellij.lang.PsiBuilder.Marker".to_string(),
            "com.intellij.openapi.diagnostic.Logger".to_string(),
            format!("static {}.*", holder_class),
            format!("static {}.*", stub_parser),
        ];
        if root_parser {
            imports.push(IELEMENTTYPE_CLASS.to_string());
            imports.push("com.intellij.lang.ASTNode".to_string());
            imports.push("com.intellij.psi.tree.TokenSet".to_string());
            imports.push("com.intellij.lang.PsiParser".to_string());
        } else {
            imports.push(format!("static {}.*", root_parser_class));
        }
        if let Some(extra) = self.grammar.root_attr_str_opt("parserImports") {
            for import in extra.split(';') {
                if !import.is_empty() {
                    imports.push(import.to_string());
                }
            }
        }

        let supers = ["", if root_parser { "PsiParser" } else { "" }];
        self.generate_class_header(
            buf,
            parser_class,
            &imports,
            "@SuppressWarnings({\"SimplifiableIfStatement\", \"UnusedAssignment\"})",
            false,
            &supers,
        )?;

        buf.line(&format!(
            "public static Logger LOG_ = Logger.getInstance(\"{}\");",
            parser_class
        ))?;
        buf.blank()?;

        if root_parser {
            self.generate_root_parser_content(buf, rule_names)?;
        }

        for name in rule_names {
            let rule = match self.rule(name) {
                Some(rule) => rule,
                None => continue,
            };
            if rule.is_external() {
                continue;
            }
            buf.line(RULE_SEPARATOR)?;
            let mut visited = HashSet::new();
            self.generate_node(buf, rule, rule.expression(), rule.is_private(), name, &mut visited)?;
            buf.blank()?;
        }

        buf.line("}")?;
        Ok(())
    }

    /// Emits the public `parse` entry point of the root unit, dispatching on
    /// the requested root element type, plus the `EXTENDS_SETS_` table and
    /// the `type_extends_` predicate when inheritance is present.
    fn generate_root_parser_content(
        &mut self,
        buf: &mut Buffer,
        own_rule_names: &[String],
    ) -> Result<(), GenError> {
        buf.line("@NotNull")?;
        buf.line("public ASTNode parse(final IElementType root_, final PsiBuilder builder_) {")?;
        buf.line("final int level_ = 0;")?;
        buf.line("boolean result_;")?;

        let mut first = true;
        for name in own_rule_names {
            let rule = match self.rule(name) {
                Some(rule) => rule,
                None => continue,
            };
            if rule.is_private() || rule.is_external() || self.grammar_root == *name {
                continue;
            }
            let element_type = names::element_type(self.grammar, rule);
            buf.line(&format!(
                "{}if (root_ == {}) {{",
                if first { "" } else { "else " },
                element_type
            ))?;
            let node_call = self.generate_node_call(rule, None, name);
            buf.line(&format!("result_ = {};", node_call))?;
            buf.line("}")?;
            first = false;
        }

        let root_name = self.grammar_root.clone();
        let root_rule = self.rule(&root_name).unwrap();
        let node_call = self.generate_node_call(root_rule, None, &root_name);
        if !first {
            buf.line("else {")?;
        }
        buf.line("Marker marker_ = builder_.mark();")?;
        buf.line("try {")?;
        buf.line(&format!("result_ = {};", node_call))?;
        buf.line("while (builder_.getTokenType() != null) {")?;
        buf.line("builder_.advanceLexer();")?;
        buf.line("}")?;
        buf.line("}")?;
        buf.line("finally {")?;
        buf.line("marker_.done(root_);")?;
        buf.line("}")?;
        if !first {
            buf.line("}")?;
        }
        buf.line("return builder_.getTreeBuilt();")?;
        buf.line("}")?;
        buf.blank()?;

        if !self.inheritance.extends_map().is_empty() {
            buf.line("private static final TokenSet[] EXTENDS_SETS_ = new TokenSet[] {")?;
            let parents: Vec<String> = self.inheritance.extends_map().keys().cloned().collect();
            for parent in &parents {
                let mut sb = String::new();
                for (i, element_type) in self
                    .inheritance
                    .extends_map()
                    .get(parent)
                    .unwrap()
                    .iter()
                    .enumerate()
                {
                    if i > 0 && i % 4 == 0 {
                        sb.push_str(",\n");
                    } else if i > 0 {
                        sb.push_str(", ");
                    }
                    sb.push_str(element_type);
                }
                buf.line(&format!("TokenSet.create({}),", sb))?;
            }
            buf.line("};")?;
            buf.line(
                "public static boolean type_extends_(IElementType child_, IElementType parent_) {",
            )?;
            buf.line("for (TokenSet set : EXTENDS_SETS_) {")?;
            buf.line("if (set.contains(child_) && set.contains(parent_)) return true;")?;
            buf.line("}")?;
            buf.line("return false;")?;
            buf.line("}")?;
            buf.blank()?;
        }
        Ok(())
    }

    /// Emits the file header, package declaration, imports, annotations and
    /// the class/interface declaration line. The first entry of `supers` is
    /// the extended type, the second (for classes) the implemented one;
    /// empty entries are skipped.
    fn generate_class_header(
        &self,
        buf: &mut Buffer,
        class_name: &str,
        imports: &[String],
        annos: &str,
        intf: bool,
        supers: &[&str],
    ) -> Result<(), GenError> {
        let header_attr = self
            .grammar
            .root_attr("classHeader", Some(class_name))
            .and_then(|value| value.as_str())
            .unwrap_or(DEFAULT_FILE_HEADER)
            .to_string();
        let header = self.class_header_text(&header_attr);
        let package = string_utils::package_name(class_name);

        buf.line(&header)?;
        buf.line(&format!("package {};", package))?;
        buf.blank()?;

        for import in imports {
            if !import.contains('.') {
                continue;
            }
            if !package.is_empty() && import.starts_with(&format!("{}.", package)) {
                let rest = &import[package.len() + 1..];
                if !rest.contains('.') {
                    continue;
                }
            }
            buf.line(&format!("import {};", import))?;
        }
        buf.blank()?;

        let mut sb = String::new();
        for (i, &super_name) in supers.iter().enumerate() {
            if super_name.is_empty() {
                continue;
            }
            let known = imports.iter().any(|import| {
                import == super_name || import.ends_with(&format!(".{}", super_name))
            });
            let name = if known {
                string_utils::short_name(super_name)
            } else {
                super_name
            };
            if i == 0 {
                sb.push_str(&format!(" extends {}", name));
            } else if !intf && i == 1 {
                sb.push_str(&format!(" implements {}", name));
            } else {
                sb.push_str(&format!(", {}", name));
            }
        }

        if !annos.is_empty() {
            buf.line(annos)?;
        }
        buf.line(&format!(
            "public {} {}{} {{",
            if intf { "interface" } else { "class" },
            string_utils::short_name(class_name),
            sb
        ))?;
        buf.blank()?;
        Ok(())
    }

    /// Resolves the `classHeader` attribute: a path of an existing file
    /// under the grammar source directory is replaced by that file's
    /// contents; on a read failure the literal value is used instead.
    fn class_header_text(&self, value: &str) -> String {
        let dir = match self.grammar.source_dir() {
            Some(dir) => dir,
            None => return value.to_string(),
        };

        let path = dir.join(value);
        if !path.exists() {
            return value.to_string();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => contents.trim_end_matches('\n').to_string(),
            Err(err) => {
                error!("Failed to read class header {}: {}", path.display(), err);
                value.to_string()
            }
        }
    }

    pub fn rule(&self, name: &str) -> Option<&'g Rule> {
        self.rule_index
            .get(name)
            .map(|&index| &self.grammar.rules()[index])
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn grammar_root(&self) -> &str {
        &self.grammar_root
    }

    pub fn parser_class_of(&self, rule_name: &str) -> &str {
        &self.rule_parser_classes[rule_name]
    }

    pub fn inheritance(&self) -> &Inheritance {
        &self.inheritance
    }

    pub fn simple_tokens(&self) -> &OrderedSet<String> {
        &self.simple_tokens
    }

    pub fn record_simple_token(&mut self, token: &str) {
        self.simple_tokens.insert(token.to_string());
    }

    pub fn is_rule_name(&self, name: &str) -> bool {
        self.rule_index.contains_key(name)
    }

    pub fn memoize(&self) -> bool {
        self.memoize
    }
}

#[derive(Debug)]
pub enum GenError {
    IoErr(io::Error),
    EmptyGrammarErr,
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GenError::IoErr(ref err) => write!(f, "Output error: {}", err),
            GenError::EmptyGrammarErr => write!(f, "Grammar contains no rules"),
        }
    }
}

impl error::Error for GenError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            GenError::IoErr(ref err) => Some(err),
            GenError::EmptyGrammarErr => None,
        }
    }
}

impl From<io::Error> for GenError {
    fn from(err: io::Error) -> GenError {
        GenError::IoErr(err)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        core::bnf::{attrs::AttrValue, Expression, GrammarBuilder},
        core::gen::{graph::MapGraphHelper, sink::MemSink},
    };

    fn generate_all(grammar: &Grammar) -> MemSink {
        let mut sink = MemSink::new();
        let helper = MapGraphHelper::new();
        let mut generator = ParserGenerator::new(grammar).unwrap();
        generator.generate(&mut sink, &helper).unwrap();
        sink
    }

    #[test]
    fn empty_grammar_is_rejected() {
        //setup
        let grammar = GrammarBuilder::new().build();

        //exercise
        let res = ParserGenerator::new(&grammar);

        //verify
        assert!(res.is_err());
        assert_eq!(
            format!("{}", res.err().unwrap()),
            "Grammar contains no rules"
        );
    }

    #[test]
    fn one_file_per_parser_class() {
        //setup
        let mut builder = GrammarBuilder::new();
        builder.rule("a", Expression::reference("b"));
        builder.rule("b", Expression::reference("x"));
        builder.attr("generatePsi", AttrValue::Bool(false));
        builder.rule_attr(
            "b",
            "parserClass",
            AttrValue::Str("gen.OtherParser".to_string()),
        );
        let grammar = builder.build();

        //exercise
        let sink = generate_all(&grammar);

        //verify
        assert_eq!(
            sink.class_names(),
            vec![
                "gen.OtherParser".to_string(),
                "generated.Parser".to_string(),
                "generated.ParserTypes".to_string(),
            ]
        );
    }

    #[test]
    fn cross_unit_rule_calls_are_qualified() {
        //setup
        let mut builder = GrammarBuilder::new();
        builder.rule("a", Expression::reference("b"));
        builder.rule("b", Expression::reference("x"));
        builder.attr("generatePsi", AttrValue::Bool(false));
        builder.rule_attr(
            "b",
            "parserClass",
            AttrValue::Str("gen.OtherParser".to_string()),
        );
        let grammar = builder.build();

        //exercise
        let sink = generate_all(&grammar);

        //verify
        let root_unit = sink.content("generated.Parser").unwrap();
        assert!(root_unit.contains("return OtherParser.b(builder_, level_ + 1);"));

        let other_unit = sink.content("gen.OtherParser").unwrap();
        assert!(other_unit.contains("import static generated.Parser.*;"));
        assert!(!other_unit.contains("PsiParser"));
    }

    #[test]
    fn root_unit_parse_dispatches_on_public_rules() {
        //setup
        let mut builder = GrammarBuilder::new();
        builder.rule("file", Expression::reference("stmt"));
        builder.rule("stmt", Expression::reference("x"));
        builder.attr("generatePsi", AttrValue::Bool(false));
        let grammar = builder.build();

        //exercise
        let sink = generate_all(&grammar);

        //verify
        let unit = sink.content("generated.Parser").unwrap();
        assert!(unit.contains(
            "public ASTNode parse(final IElementType root_, final PsiBuilder builder_) {"
        ));
        assert!(unit.contains("if (root_ == STMT) {"));
        assert!(unit.contains("marker_.done(root_);"));
        assert!(unit.contains("while (builder_.getTokenType() != null) {"));
        assert!(unit.contains("return builder_.getTreeBuilt();"));
    }

    #[test]
    fn extends_sets_emitted_only_with_inheritance() {
        //setup
        let mut builder = GrammarBuilder::new();
        builder.rule("file", Expression::reference("expr"));
        builder.rule("expr", Expression::reference("x"));
        builder.attr("generatePsi", AttrValue::Bool(false));
        let grammar = builder.build();

        let mut builder = GrammarBuilder::new();
        builder.rule("file", Expression::reference("expr"));
        builder.rule("expr", Expression::reference("add_expr"));
        builder.rule("add_expr", Expression::reference("x"));
        builder.rule_attr("add_expr", "extends", AttrValue::Str("expr".to_string()));
        builder.attr("generatePsi", AttrValue::Bool(false));
        let extends_grammar = builder.build();

        //exercise
        let plain = generate_all(&grammar);
        let with_extends = generate_all(&extends_grammar);

        //verify
        assert!(!plain
            .content("generated.Parser")
            .unwrap()
            .contains("EXTENDS_SETS_"));

        let unit = with_extends.content("generated.Parser").unwrap();
        assert!(unit.contains("TokenSet.create(ADD_EXPR, EXPR),"));
        assert!(unit
            .contains("public static boolean type_extends_(IElementType child_, IElementType parent_) {"));
    }

    #[test]
    fn parser_imports_are_appended_to_the_unit() {
        //setup
        let mut builder = GrammarBuilder::new();
        builder.rule("file", Expression::reference("stmt"));
        builder.rule("stmt", Expression::reference("x"));
        builder.attr("generatePsi", AttrValue::Bool(false));
        builder.attr(
            "parserImports",
            AttrValue::Str("java.util.ArrayList;static my.lang.MyUtil.*".to_string()),
        );
        let grammar = builder.build();

        //exercise
        let sink = generate_all(&grammar);

        //verify
        let unit = sink.content("generated.Parser").unwrap();
        assert!(unit.contains("import java.util.ArrayList;"));
        assert!(unit.contains("import static my.lang.MyUtil.*;"));
    }

    #[test]
    fn class_header_attribute_is_pattern_scopable() {
        //setup
        let mut builder = GrammarBuilder::new();
        builder.rule("a", Expression::reference("x"));
        builder.attr("generatePsi", AttrValue::Bool(false));
        builder.attr_scoped(
            "classHeader",
            ".*Parser",
            AttrValue::Str("// custom header".to_string()),
        );
        let grammar = builder.build();

        //exercise
        let sink = generate_all(&grammar);

        //verify
        let unit = sink.content("generated.Parser").unwrap();
        assert!(unit.starts_with("// custom header\npackage generated;\n"));

        let holder = sink.content("generated.ParserTypes").unwrap();
        assert!(holder
            .starts_with("// This is a generated file. Not intended for manual editing.\n"));
    }
}
