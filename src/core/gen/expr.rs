use {
    core::{
        bnf::{attrs::AttrValue, Expression, Rule},
        gen::{buffer::Buffer, names, GenError, ParserGenerator},
        util::string_utils,
    },
    regex::Regex,
    std::collections::HashSet,
};

/// The parsing frame an expression compiles to. Trivial groupings and plain
/// references never reach a frame.
#[derive(Clone, Copy, PartialEq)]
enum FrameType {
    Sequence,
    Choice,
    Optional,
    ZeroOrMore,
    OneOrMore,
    And,
    Not,
}

fn frame_type(node: &Expression) -> Option<FrameType> {
    match *node {
        Expression::Sequence(_) => Some(FrameType::Sequence),
        Expression::Choice(_) => Some(FrameType::Choice),
        Expression::Optional(_) => Some(FrameType::Optional),
        Expression::ZeroOrMore(_) => Some(FrameType::ZeroOrMore),
        Expression::OneOrMore(_) => Some(FrameType::OneOrMore),
        Expression::And(_) => Some(FrameType::And),
        Expression::Not(_) => Some(FrameType::Not),
        _ => None,
    }
}

fn node_id(node: &Expression) -> usize {
    node as *const Expression as usize
}

fn generate_consume_text_token(token_text: &str) -> String {
    format!("consumeToken(builder_, \"{}\")", token_text)
}

impl<'g> ParserGenerator<'g> {
    /// Emits the parser function for `node` and recursively for every named
    /// sub-expression under it. The visited set prevents re-emission of
    /// shared nodes; literals and non-body references never become
    /// functions.
    pub fn generate_node(
        &mut self,
        buf: &mut Buffer,
        rule: &'g Rule,
        node: &'g Expression,
        should_be_private: bool,
        func: &str,
        visited: &mut HashSet<usize>,
    ) -> Result<(), GenError> {
        match *node {
            Expression::StringLiteral(_) | Expression::NumberLiteral(_) => return Ok(()),
            Expression::Reference(_) if !same_node(node, rule.expression()) => return Ok(()),
            _ => {}
        }
        if !visited.insert(node_id(node)) {
            return Ok(());
        }

        // An external expression only contributes thunk functions for its
        // parenthesized arguments.
        if let Expression::External(ref exprs) = *node {
            for (i, expr) in exprs.iter().enumerate().skip(1) {
                if let Expression::Parenthesized(_) = *expr {
                    self.generate_node(buf, rule, expr, true, &names::next_name(func, i - 1), visited)?;
                }
            }
            return Ok(());
        }

        let is_private = should_be_private || self.grammar_root() == rule.name();
        for line in node.text().split('\n') {
            buf.line(&format!("// {}", line))?;
        }

        let is_rule = same_node(node, rule.expression());
        let first_non_trivial = same_node(node, rule.first_non_trivial());
        let recover_until = if first_non_trivial {
            rule.local_attr_str("recoverUntil")
        } else {
            None
        };
        let can_collapse = first_non_trivial && self.inheritance().involves(rule.name());

        let mut children = node.children();
        let modifier = if !is_rule {
            "private "
        } else if is_private {
            ""
        } else {
            "public "
        };
        buf.line(&format!(
            "{}static boolean {}(PsiBuilder builder_, final int level_{}) {{",
            modifier,
            func,
            self.collect_extra_arguments(rule, true)
        ))?;

        let mut frame = frame_type(node);
        if let Expression::Reference(_) = *node {
            if is_private {
                let node_call = self.generate_node_call(rule, Some(node), &names::next_name(func, 0));
                buf.line(&format!("return {};", node_call))?;
                buf.line("}")?;
                return Ok(());
            }
            children = vec![node];
            frame = Some(FrameType::Sequence);
        }

        if children.is_empty() {
            buf.line("return true;")?;
            buf.line("}")?;
            return Ok(());
        }

        buf.line(&format!(
            "if (!recursion_guard_(builder_, level_, \"{}\")) return false;",
            func
        ))?;

        if node.is_trivial() {
            let child = children[0];
            let node_call = self.generate_node_call(rule, Some(child), &names::next_name(func, 0));
            buf.line(&format!("return {};", node_call))?;
            buf.line("}")?;
            buf.blank()?;
            self.generate_node(buf, rule, child, should_be_private, &names::next_name(func, 0), visited)?;
            return Ok(());
        }

        let frame = match frame {
            Some(frame) => frame,
            None => panic!(
                "Unexpected expression in rule '{}': {}",
                rule.name(),
                node.text()
            ),
        };

        let func_id = names::func_hash(func);
        if self.memoize() {
            buf.line(&format!(
                "if (memoizedFalseBranch(builder_, {}L)) return false;",
                func_id
            ))?;
        }

        let pin_value: Option<AttrValue> = if frame == FrameType::Sequence {
            let pin_target = if first_non_trivial {
                rule.name().to_string()
            } else {
                func.to_string()
            };
            rule.attr(self.grammar(), "pin", Some(&pin_target)).cloned()
        } else {
            None
        };
        let pin_index: Option<usize> = pin_value
            .as_ref()
            .and_then(AttrValue::as_int)
            .and_then(|index| if index > 0 { Some(index as usize) } else { None });
        let pin_pattern: Option<Regex> = pin_value
            .as_ref()
            .and_then(AttrValue::as_str)
            .and_then(|pattern| {
                Regex::new(&format!("^(?:{})$", string_utils::unescape(pattern))).ok()
            });
        let pin_display: String = match pin_value {
            Some(AttrValue::Int(index)) => index.to_string(),
            Some(AttrValue::Str(ref pattern)) => pattern.clone(),
            _ => String::new(),
        };
        let pinned = pin_index.is_some() || pin_pattern.is_some();
        let mut pin_applied = false;

        let seed = frame == FrameType::ZeroOrMore || frame == FrameType::Optional;
        buf.line(&format!("boolean result_ = {};", seed))?;
        if pinned {
            buf.line("boolean pinned_ = false;")?;
        }
        if !is_private && can_collapse {
            buf.line("final int start_ = builder_.getCurrentOffset();")?;
        }
        buf.line("final Marker marker_ = builder_.mark();")?;
        buf.line("try {")?;

        let section = if recover_until.is_some() {
            Some("_SECTION_RECOVER_")
        } else if frame == FrameType::And {
            Some("_SECTION_AND_")
        } else if frame == FrameType::Not {
            Some("_SECTION_NOT_")
        } else if pinned {
            Some("_SECTION_GENERAL_")
        } else {
            None
        };
        if let Some(section) = section {
            buf.line(&format!(
                "enterErrorRecordingSection(builder_, level_, {});",
                section
            ))?;
        }

        for (i, &child) in children.iter().enumerate() {
            let node_call = self.generate_node_call(rule, Some(child), &names::next_name(func, i));
            match frame {
                FrameType::Choice => {
                    buf.line(&format!(
                        "{}result_ = {};",
                        if i > 0 { "if (!result_) " } else { "" },
                        node_call
                    ))?;
                }
                FrameType::Sequence => {
                    if i > 0 {
                        buf.line(&format!("result_ = result_ && {};", node_call))?;
                    } else {
                        buf.line(&format!("result_ = {};", node_call))?;
                    }
                    let pin_hit = !pin_applied
                        && (pin_index == Some(i + 1)
                            || pin_pattern
                                .as_ref()
                                .map(|pattern| pattern.is_match(&child.text()))
                                .unwrap_or(false));
                    if pin_hit {
                        pin_applied = true;
                        buf.line(&format!("pinned_ = result_; // pin = {}", pin_display))?;
                    }
                }
                FrameType::Optional => {
                    buf.line(&format!("{};", node_call))?;
                }
                FrameType::OneOrMore | FrameType::ZeroOrMore => {
                    if frame == FrameType::OneOrMore {
                        buf.line(&format!("result_ = {};", node_call))?;
                    }
                    buf.line("int offset_ = builder_.getCurrentOffset();")?;
                    buf.line("while (result_ && !builder_.eof()) {")?;
                    buf.line(&format!("if (!{}) break;", node_call))?;
                    buf.line("if (offset_ == builder_.getCurrentOffset()) {")?;
                    buf.line(&format!(
                        "builder_.error(\"Empty element parsed in {}\");",
                        func
                    ))?;
                    buf.line("break;")?;
                    buf.line("}")?;
                    buf.line("offset_ = builder_.getCurrentOffset();")?;
                    buf.line("}")?;
                }
                FrameType::And => {
                    buf.line(&format!("result_ = {};", node_call))?;
                }
                FrameType::Not => {
                    buf.line(&format!("result_ = !{};", node_call))?;
                }
            }
        }
        buf.line("}")?;
        buf.line("finally {")?;

        if frame == FrameType::And || frame == FrameType::Not {
            buf.line("marker_.rollbackTo();")?;
        } else if !is_private {
            let element_type = names::element_type(self.grammar(), rule);
            if can_collapse {
                buf.line("LighterASTNode last_ = result_? builder_.getLatestDoneMarker() : null;")?;
                buf.line(&format!(
                    "if (last_ != null && last_.getStartOffset() == start_ && type_extends_(last_.getTokenType(), {})) {{",
                    element_type
                ))?;
                buf.line("marker_.drop();")?;
                buf.line("}")?;
                buf.line(&format!(
                    "else if (result_{}) {{",
                    if pinned { " || pinned_" } else { "" }
                ))?;
            } else {
                buf.line(&format!(
                    "if (result_{}) {{",
                    if pinned { " || pinned_" } else { "" }
                ))?;
            }
            buf.line(&format!("marker_.done({});", element_type))?;
            buf.line("}")?;
            buf.line("else {")?;
            buf.line("marker_.rollbackTo();")?;
            buf.line("}")?;
        } else if frame == FrameType::Optional || frame == FrameType::ZeroOrMore {
            buf.line("marker_.drop();")?;
        } else {
            buf.line(&format!(
                "if (!result_{}) {{",
                if pinned { " && !pinned_" } else { "" }
            ))?;
            buf.line("marker_.rollbackTo();")?;
            buf.line("}")?;
            buf.line("else {")?;
            buf.line("marker_.drop();")?;
            buf.line("}")?;
        }

        if let Some(section) = section {
            let until_call = recover_until
                .as_ref()
                .and_then(|name| self.rule(name))
                .map(|until_rule| {
                    let name = until_rule.name().to_string();
                    self.generate_wrapped_node_call(rule, None, &name)
                });
            let pinned_expr = if pinned { "pinned_" } else { "false" };
            match until_call {
                Some(until_call) => buf.line(&format!(
                    "result_ = exitErrorRecordingSection(builder_, result_, level_, {}, {}, {});",
                    pinned_expr, section, until_call
                ))?,
                None => buf.line(&format!(
                    "result_ = exitErrorRecordingSection(builder_, result_, level_, {}, {}, null);",
                    pinned_expr, section
                ))?,
            }
        }
        buf.line("}")?;

        if self.memoize() {
            buf.line(&format!(
                "if (!result_{}) memoizeFalseBranch(builder_, {}L);",
                if pinned { " && !pinned_" } else { "" },
                func_id
            ))?;
        }
        buf.line(&format!(
            "return result_{};",
            if pinned { " || pinned_" } else { "" }
        ))?;
        buf.line("}")?;
        buf.blank()?;

        for (i, &child) in children.iter().enumerate() {
            self.generate_node(buf, rule, child, true, &names::next_name(func, i), visited)?;
        }
        Ok(())
    }

    /// Emits the call expression for `node` as seen from `rule`'s unit: a
    /// rule call (qualified across units), an external call, a token
    /// consumption, or a call to the named sub-expression function. A `None`
    /// node stands for a reference to `next_name`.
    pub fn generate_node_call(
        &mut self,
        rule: &'g Rule,
        node: Option<&'g Expression>,
        next_name: &str,
    ) -> String {
        match node {
            None => self.generate_reference_call(rule, next_name, next_name),
            Some(&Expression::StringLiteral(ref value)) => {
                match self.token_alias_name(rule, value) {
                    Some(token) => self.generate_consume_token(&token),
                    None => generate_consume_text_token(value),
                }
            }
            Some(&Expression::NumberLiteral(ref text)) => generate_consume_text_token(text),
            Some(&Expression::Reference(ref text)) => {
                let text = text.clone();
                self.generate_reference_call(rule, &text, next_name)
            }
            Some(&Expression::External(ref exprs)) => {
                if exprs.len() == 1 && rule.is_meta() {
                    format!("{}.parse(builder_)", exprs[0].text())
                } else {
                    let arg_refs: Vec<&'g Expression> = exprs.iter().collect();
                    let mut clause = String::new();
                    let method = self.generate_external_call(rule, &mut clause, &arg_refs, next_name);
                    format!("{}(builder_, level_ + 1{})", method, clause)
                }
            }
            Some(_) => format!(
                "{}(builder_, level_ + 1{})",
                next_name,
                self.collect_extra_arguments(rule, false)
            ),
        }
    }

    fn generate_reference_call(&mut self, rule: &'g Rule, text: &str, next_name: &str) -> String {
        let sub_rule = match self.rule(text) {
            Some(sub_rule) => sub_rule,
            None => return self.generate_consume_token(text),
        };

        if sub_rule.is_external() {
            let body_exprs: Vec<&'g Expression> = match *sub_rule.expression() {
                Expression::Sequence(ref children) => children.iter().collect(),
                ref single => vec![single],
            };
            let mut clause = String::new();
            let method = self.generate_external_call(rule, &mut clause, &body_exprs, next_name);
            return format!("{}(builder_, level_ + 1{})", method, clause);
        }

        let parser_class = self.parser_class_of(sub_rule.name()).to_string();
        let own_class = self.parser_class_of(rule.name()).to_string();
        let method = if parser_class == own_class {
            sub_rule.name().to_string()
        } else {
            format!(
                "{}.{}",
                string_utils::short_name(&parser_class),
                sub_rule.name()
            )
        };
        format!(
            "{}(builder_, level_ + 1{})",
            method,
            self.collect_extra_arguments(rule, false)
        )
    }

    /// Renders the argument clause of an external (or meta) call. Rule-name
    /// arguments and parenthesized sub-grammars are reified as parser
    /// thunks; anything else is passed through as raw text.
    fn generate_external_call(
        &mut self,
        rule: &'g Rule,
        clause: &mut String,
        exprs: &[&'g Expression],
        next_name: &str,
    ) -> String {
        let method = match exprs.first() {
            Some(head) => head.text(),
            None => String::new(),
        };

        for (i, &nested) in exprs.iter().enumerate().skip(1) {
            clause.push_str(", ");
            match *nested {
                Expression::Reference(ref name) => {
                    if self.is_rule_name(name) {
                        let name = name.clone();
                        let wrapped = self.generate_wrapped_node_call(rule, Some(nested), &name);
                        clause.push_str(&wrapped);
                    } else {
                        clause.push_str(name);
                    }
                }
                Expression::Parenthesized(_) => {
                    let wrapped = self.generate_wrapped_node_call(
                        rule,
                        Some(nested),
                        &names::next_name(next_name, i - 1),
                    );
                    clause.push_str(&wrapped);
                }
                _ => clause.push_str(&nested.text()),
            }
        }
        method
    }

    /// Wraps a node call in an anonymous `Parser` thunk for recovery and
    /// external-argument positions.
    fn generate_wrapped_node_call(
        &mut self,
        rule: &'g Rule,
        node: Option<&'g Expression>,
        text: &str,
    ) -> String {
        format!(
            "\nnew Parser() {{ public boolean parse(PsiBuilder builder_) {{ return {}; }}}}",
            self.generate_node_call(rule, node, text)
        )
    }

    fn generate_consume_token(&mut self, token: &str) -> String {
        self.record_simple_token(token);
        format!(
            "consumeToken(builder_, {})",
            names::token_element_type(self.grammar(), token)
        )
    }

    /// Reverse token-alias lookup: a string literal whose text is the value
    /// of some attribute consumes that attribute's name as its token.
    fn token_alias_name(&self, rule: &Rule, value: &str) -> Option<String> {
        rule.attrs()
            .find_name_by_value(value)
            .or_else(|| self.grammar().attrs().find_name_by_value(value))
            .map(String::from)
    }

    /// For meta rules, the formal parameter (or call-site argument) list
    /// derived from single-argument external expressions in the rule body,
    /// in first-occurrence order.
    pub fn collect_extra_arguments(&self, rule: &Rule, declaration: bool) -> String {
        if !rule.is_meta() {
            return String::new();
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut clause = String::new();
        for child in rule.expression().children() {
            collect_parser_params(child, &mut visited, &mut clause, declaration);
        }
        clause
    }
}

fn same_node(a: &Expression, b: &Expression) -> bool {
    node_id(a) == node_id(b)
}

fn collect_parser_params(
    node: &Expression,
    visited: &mut HashSet<String>,
    clause: &mut String,
    declaration: bool,
) {
    if let Expression::External(ref exprs) = *node {
        if exprs.len() == 1 {
            let text = exprs[0].text();
            if visited.insert(text.clone()) {
                clause.push_str(", ");
                if declaration {
                    clause.push_str("Parser ");
                }
                clause.push_str(&text);
            }
        }
    }

    for child in node.children() {
        collect_parser_params(child, visited, clause, declaration);
    }
}
