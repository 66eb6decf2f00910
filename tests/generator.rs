extern crate bnfgen;

use bnfgen::{
    AttrValue, Cardinality, ChildRef, Expression, Grammar, GrammarBuilder, MapGraphHelper,
    MemSink,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

fn generate(grammar: &Grammar, helper: &MapGraphHelper) -> MemSink {
    let mut sink = MemSink::new();
    bnfgen::generate_into(grammar, &mut sink, helper).unwrap();
    sink
}

#[test]
fn simple_choice_parser_unit() {
    //setup
    let mut builder = GrammarBuilder::new();
    builder.rule("file", Expression::reference("expr"));
    builder.rule(
        "expr",
        Expression::Choice(vec![Expression::string("a"), Expression::string("b")]),
    );
    builder.attr("a_", AttrValue::Str("a".to_string()));
    builder.attr("b_", AttrValue::Str("b".to_string()));
    builder.attr("generatePsi", AttrValue::Bool(false));
    let grammar = builder.build();

    //exercise
    let sink = generate(&grammar, &MapGraphHelper::new());

    //verify
    let unit = sink.content("generated.Parser").unwrap();
    assert_eq!(
        unit,
        "// This is a generated file. Not intended for manual editing.
package generated;

import org.jetbrains.annotations.*;
import com.intellij.lang.LighterASTNode;
import com.intellij.lang.PsiBuilder;
import com.intellij.lang.PsiBuilder.Marker;
import com.intellij.openapi.diagnostic.Logger;
import static generated.ParserTypes.*;
import static generated.ParserUtil.*;
import com.intellij.psi.tree.IElementType;
import com.intellij.lang.ASTNode;
import com.intellij.psi.tree.TokenSet;
import com.intellij.lang.PsiParser;

@SuppressWarnings({\"SimplifiableIfStatement\", \"UnusedAssignment\"})
public class Parser implements PsiParser {

  public static Logger LOG_ = Logger.getInstance(\"generated.Parser\");

  @NotNull
  public ASTNode parse(final IElementType root_, final PsiBuilder builder_) {
    final int level_ = 0;
    boolean result_;
    if (root_ == EXPR) {
      result_ = expr(builder_, level_ + 1);
    }
    else {
      Marker marker_ = builder_.mark();
      try {
        result_ = file(builder_, level_ + 1);
        while (builder_.getTokenType() != null) {
          builder_.advanceLexer();
        }
      }
      finally {
        marker_.done(root_);
      }
    }
    return builder_.getTreeBuilt();
  }

  /* ********************************************************** */
  // expr
  static boolean file(PsiBuilder builder_, final int level_) {
    return expr(builder_, level_ + 1);
  }

  /* ********************************************************** */
  // 'a' | 'b'
  public static boolean expr(PsiBuilder builder_, final int level_) {
    if (!recursion_guard_(builder_, level_, \"expr\")) return false;
    boolean result_ = false;
    final Marker marker_ = builder_.mark();
    try {
      result_ = consumeToken(builder_, A_);
      if (!result_) result_ = consumeToken(builder_, B_);
    }
    finally {
      if (result_) {
        marker_.done(EXPR);
      }
      else {
        marker_.rollbackTo();
      }
    }
    return result_;
  }


}
"
    );
}

#[test]
fn simple_choice_element_types() {
    //setup
    let mut builder = GrammarBuilder::new();
    builder.rule("file", Expression::reference("expr"));
    builder.rule(
        "expr",
        Expression::Choice(vec![Expression::string("a"), Expression::string("b")]),
    );
    builder.attr("a_", AttrValue::Str("a".to_string()));
    builder.attr("b_", AttrValue::Str("b".to_string()));
    builder.attr("generatePsi", AttrValue::Bool(false));
    let grammar = builder.build();

    //exercise
    let sink = generate(&grammar, &MapGraphHelper::new());

    //verify
    let holder = sink.content("generated.ParserTypes").unwrap();
    assert_eq!(
        holder,
        "// This is a generated file. Not intended for manual editing.
package generated;

import com.intellij.psi.tree.IElementType;
import com.intellij.psi.PsiElement;
import com.intellij.lang.ASTNode;
import com.intellij.psi.tree.IElementType;
import com.intellij.psi.tree.IElementType;

public interface ParserTypes {

  IElementType EXPR = new IElementType(\"EXPR\");

  IElementType A_ = new IElementType(\"a\");
  IElementType B_ = new IElementType(\"b\");

}
"
    );
}

#[test]
fn pinned_sequence_reports_instead_of_backtracking() {
    //setup
    let mut builder = GrammarBuilder::new();
    builder.rule("file", Expression::reference("stmt"));
    builder.rule(
        "stmt",
        Expression::Sequence(vec![
            Expression::string("if"),
            Expression::reference("cond"),
            Expression::string("then"),
            Expression::reference("body"),
        ]),
    );
    builder.rule("cond", Expression::reference("ident"));
    builder.rule("body", Expression::reference("ident"));
    builder.rule_attr("stmt", "pin", AttrValue::Int(2));
    builder.attr("generatePsi", AttrValue::Bool(false));
    let grammar = builder.build();

    //exercise
    let sink = generate(&grammar, &MapGraphHelper::new());

    //verify
    let unit = sink.content("generated.Parser").unwrap();
    assert!(unit.contains("boolean pinned_ = false;"));
    assert!(unit.contains(
        "result_ = result_ && cond(builder_, level_ + 1);\n      pinned_ = result_; // pin = 2"
    ));
    assert!(unit.contains("enterErrorRecordingSection(builder_, level_, _SECTION_GENERAL_);"));
    assert!(unit.contains("if (result_ || pinned_) {"));
    assert!(unit.contains("marker_.done(STMT);"));
    assert!(unit.contains(
        "result_ = exitErrorRecordingSection(builder_, result_, level_, pinned_, _SECTION_GENERAL_, null);"
    ));
    assert!(unit.contains("return result_ || pinned_;"));

    // the pin commits exactly once
    assert_eq!(unit.matches("pinned_ = result_;").count(), 1);
}

#[test]
fn nullable_repetition_guards_progress() {
    //setup
    let mut builder = GrammarBuilder::new();
    builder.rule("file", Expression::reference("list"));
    builder.rule("list", Expression::zero_or_more(Expression::reference("item")));
    builder.rule("item", Expression::optional(Expression::reference("ident")));
    builder.attr("generatePsi", AttrValue::Bool(false));
    let grammar = builder.build();

    //exercise
    let sink = generate(&grammar, &MapGraphHelper::new());

    //verify
    let unit = sink.content("generated.Parser").unwrap();
    assert!(unit.contains("boolean result_ = true;"));
    assert!(unit.contains("int offset_ = builder_.getCurrentOffset();"));
    assert!(unit.contains("while (result_ && !builder_.eof()) {"));
    assert!(unit.contains("if (!item(builder_, level_ + 1)) break;"));
    assert!(unit.contains("if (offset_ == builder_.getCurrentOffset()) {"));
    assert!(unit.contains("builder_.error(\"Empty element parsed in list\");"));
    assert!(unit.contains("break;"));
    assert!(unit.contains("offset_ = builder_.getCurrentOffset();"));
}

#[test]
fn inheritance_collapse_and_type_extends() {
    //setup
    let mut builder = GrammarBuilder::new();
    builder.rule("file", Expression::reference("expr"));
    builder.rule(
        "expr",
        Expression::Choice(vec![
            Expression::reference("add_expr"),
            Expression::reference("lit_expr"),
        ]),
    );
    builder.rule(
        "add_expr",
        Expression::Sequence(vec![
            Expression::reference("lit_expr"),
            Expression::string("+"),
            Expression::reference("lit_expr"),
        ]),
    );
    builder.rule("lit_expr", Expression::reference("number"));
    builder.rule_attr("add_expr", "extends", AttrValue::Str("expr".to_string()));
    builder.rule_attr("lit_expr", "extends", AttrValue::Str("expr".to_string()));
    builder.attr("generatePsi", AttrValue::Bool(false));
    let grammar = builder.build();

    //exercise
    let sink = generate(&grammar, &MapGraphHelper::new());

    //verify
    let unit = sink.content("generated.Parser").unwrap();
    assert!(unit.contains("private static final TokenSet[] EXTENDS_SETS_ = new TokenSet[] {"));
    assert!(unit.contains("TokenSet.create(ADD_EXPR, LIT_EXPR, EXPR),"));
    assert!(unit.contains(
        "public static boolean type_extends_(IElementType child_, IElementType parent_) {"
    ));
    assert!(unit.contains("if (set.contains(child_) && set.contains(parent_)) return true;"));

    // the expr frame collapses onto an already-done subtype marker
    assert!(unit.contains("final int start_ = builder_.getCurrentOffset();"));
    assert!(unit.contains("LighterASTNode last_ = result_? builder_.getLatestDoneMarker() : null;"));
    assert!(unit.contains(
        "if (last_ != null && last_.getStartOffset() == start_ && type_extends_(last_.getTokenType(), EXPR)) {"
    ));
    assert!(unit.contains("marker_.drop();"));

    let holder = sink.content("generated.ParserTypes").unwrap();
    assert!(holder.contains("IElementType EXPR = new IElementType(\"EXPR\");"));
    assert!(holder.contains("IElementType ADD_EXPR = new IElementType(\"ADD_EXPR\");"));
    assert!(holder.contains("IElementType LIT_EXPR = new IElementType(\"LIT_EXPR\");"));
}

#[test]
fn meta_rule_takes_parser_parameters_and_call_sites_pass_thunks() {
    //setup
    let mut builder = GrammarBuilder::new();
    builder.rule(
        "file",
        Expression::Sequence(vec![Expression::External(vec![
            Expression::reference("comma_list"),
            Expression::reference("item"),
        ])]),
    );
    builder.rule(
        "comma_list",
        Expression::Sequence(vec![
            Expression::External(vec![Expression::reference("p")]),
            Expression::zero_or_more(Expression::Sequence(vec![
                Expression::string(","),
                Expression::External(vec![Expression::reference("p")]),
            ])),
        ]),
    );
    builder.rule("item", Expression::reference("ident"));
    builder.rule_attr("comma_list", "meta", AttrValue::Bool(true));
    builder.rule_attr("comma_list", "private", AttrValue::Bool(true));
    builder.attr("generatePsi", AttrValue::Bool(false));
    let grammar = builder.build();

    //exercise
    let sink = generate(&grammar, &MapGraphHelper::new());

    //verify
    let unit = sink.content("generated.Parser").unwrap();
    assert!(unit.contains(
        "static boolean comma_list(PsiBuilder builder_, final int level_, Parser p) {"
    ));
    assert!(unit.contains("result_ = p.parse(builder_);"));
    assert!(unit.contains(
        "private static boolean comma_list_1(PsiBuilder builder_, final int level_, Parser p) {"
    ));
    assert!(unit.contains("comma_list_1(builder_, level_ + 1, p)"));
    assert!(unit.contains("comma_list_1_0(builder_, level_ + 1, p)"));
    assert!(unit.contains("return comma_list(builder_, level_ + 1, \n"));
    assert!(unit.contains(
        "new Parser() { public boolean parse(PsiBuilder builder_) { return item(builder_, level_ + 1); }});"
    ));
}

#[test]
fn negative_lookahead_with_recovery() {
    //setup
    let mut builder = GrammarBuilder::new();
    builder.rule("file", Expression::reference("decl"));
    builder.rule(
        "decl",
        Expression::Sequence(vec![
            Expression::not_predicate(Expression::string("}")),
            Expression::reference("keyword"),
            Expression::reference("name"),
        ]),
    );
    builder.rule("stmt_end", Expression::reference("semi"));
    builder.rule_attr(
        "decl",
        "recoverUntil",
        AttrValue::Str("stmt_end".to_string()),
    );
    builder.attr("generatePsi", AttrValue::Bool(false));
    let grammar = builder.build();

    //exercise
    let sink = generate(&grammar, &MapGraphHelper::new());

    //verify
    let unit = sink.content("generated.Parser").unwrap();

    // outer frame: recovery section around the whole declaration
    assert!(unit.contains("// !'}' keyword name"));
    assert!(unit.contains("enterErrorRecordingSection(builder_, level_, _SECTION_RECOVER_);"));
    assert!(unit.contains(
        "result_ = exitErrorRecordingSection(builder_, result_, level_, false, _SECTION_RECOVER_, \n"
    ));
    assert!(unit.contains(
        "new Parser() { public boolean parse(PsiBuilder builder_) { return stmt_end(builder_, level_ + 1); }});"
    ));

    // inner frame: the negative lookahead always rolls back
    assert!(unit.contains("private static boolean decl_0(PsiBuilder builder_, final int level_) {"));
    assert!(unit.contains("enterErrorRecordingSection(builder_, level_, _SECTION_NOT_);"));
    assert!(unit.contains("result_ = !consumeToken(builder_, \"}\");"));
    assert!(unit.contains(
        "result_ = exitErrorRecordingSection(builder_, result_, level_, false, _SECTION_NOT_, null);"
    ));
}

#[test]
fn psi_interface_and_impl_for_public_rule() {
    //setup
    let mut builder = GrammarBuilder::new();
    builder.rule("file", Expression::reference("stmt"));
    builder.rule(
        "stmt",
        Expression::Sequence(vec![
            Expression::reference("expr"),
            Expression::reference("semi"),
        ]),
    );
    builder.rule("expr", Expression::reference("ident"));
    let grammar = builder.build();

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
    let sink = generate(&grammar, &helper);

    //verify
    let intf = sink.content("generated.psi.Stmt").unwrap();
    assert_eq!(
        intf,
        "// This is a generated file. Not intended for manual editing.
package generated.psi;

import java.util.List;
import org.jetbrains.annotations.*;
import com.intellij.psi.PsiElement;
import generated.CompositeElement;

public interface Stmt extends CompositeElement {

  @NotNull
  public Expr getExpr();

  @Nullable
  public PsiElement getSemi();

}
"
    );

    let imp = sink.content("generated.psi.impl.StmtImpl").unwrap();
    assert_eq!(
        imp,
        "// This is a generated file. Not intended for manual editing.
package generated.psi.impl;

import java.util.List;
import org.jetbrains.annotations.*;
import com.intellij.lang.ASTNode;
import com.intellij.psi.PsiElement;
import com.intellij.psi.util.PsiTreeUtil;
import static generated.ParserTypes.*;
import generated.CompositeElementImpl;
import generated.psi.*;

public class StmtImpl extends CompositeElementImpl implements Stmt {

  public StmtImpl(ASTNode node) {
    super(node);
  }

  @Override
  @NotNull
  public Expr getExpr() {
    return PsiTreeUtil.getChildOfType(this, Expr.class);
  }

  @Override
  @Nullable
  public PsiElement getSemi() {
    ASTNode child = getNode().findChildByType(SEMI);
    return child == null? null : child.getPsi();
  }

}
"
    );
}

#[test]
fn fs_sink_writes_package_layout() {
    //setup
    let root: PathBuf = env::temp_dir().join(format!("bnfgen_test_{}", process::id()));
    let _ = fs::remove_dir_all(&root);

    let mut builder = GrammarBuilder::new();
    builder.rule("file", Expression::reference("stmt"));
    builder.rule("stmt", Expression::reference("semi"));
    builder.attr("generatePsi", AttrValue::Bool(false));
    let grammar = builder.build();

    //exercise
    bnfgen::generate(&grammar, &root, &MapGraphHelper::new()).unwrap();

    //verify
    let parser = fs::read_to_string(root.join("generated").join("Parser.java")).unwrap();
    assert!(parser.contains("public class Parser implements PsiParser {"));

    let holder = fs::read_to_string(root.join("generated").join("ParserTypes.java")).unwrap();
    assert!(holder.contains("IElementType STMT = new IElementType(\"STMT\");"));

    fs::remove_dir_all(&root).unwrap();
}
