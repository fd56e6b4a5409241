use crate::til_frontend::sexpr_builder::{CallingContext, SExprBuilder};
use crate::til_frontend::source::source_nodes::{DeclId, ExprKind};
use crate::til_frontend::test_support::{UnitBuilder, build_with_builder, straight_line};
use crate::til_frontend::til::til_display::render_sexpr;
use crate::til_frontend::til::til_nodes::{SExpr, SExprId};
use crate::til_frontend::til_errors::{ErrorMetaDataKey, ErrorType};
use crate::til_frontend::til_warnings::WarningKind;

fn show(builder: &SExprBuilder<'_>, id: SExprId) -> String {
    render_sexpr(builder.scfg(), Some(builder.ast()), id)
}

// A procedure with no statements, so every attribute is translated against an empty scope
fn empty_caller(unit: &mut UnitBuilder) -> DeclId {
    unit.function("caller", &["p"]).0
}

#[test]
fn substituted_argument_matches_direct_translation() {
    // int *get_mu(Lockable *a) RETURNS(a->mu);   ... get_mu(obj)
    let mut unit = UnitBuilder::new();
    let caller = empty_caller(&mut unit);
    let mu = unit.field("mu");
    let (get_mu, params) = unit.function("get_mu", &["a"]);
    let a = unit.read(params[0]);
    let attr = unit.member(a, mu, true);
    unit.set_returned(get_mu, attr);

    let obj = unit.var("obj");
    let argument = unit.read(obj);
    let call = unit.call(get_mu, vec![argument]);

    let cfg = straight_line();
    let mut builder = build_with_builder(&unit.ast, &cfg, caller);

    let substituted = builder
        .translate_attr_at_call(call, get_mu, attr, None)
        .expect("attribute translation should succeed");
    let direct = builder.translate_attr_expr(argument, None);

    let Some(SExpr::Project {
        record,
        field,
        arrow,
    }) = builder.scfg().get(substituted).cloned()
    else {
        panic!("attribute should translate to a projection");
    };

    assert_eq!(field, mu);
    assert!(arrow);
    assert_eq!(show(&builder, record), show(&builder, direct));
    assert_eq!(show(&builder, substituted), "&obj->mu");
    assert!(builder.warnings().is_empty());
}

#[test]
fn attribute_of_a_redeclaration_substitutes_through_canonical_function() {
    let mut unit = UnitBuilder::new();
    let caller = empty_caller(&mut unit);
    let mu = unit.field("mu");
    let (canonical, _) = unit.function("get_mu", &["a"]);
    let (redeclared, params) = unit.function("get_mu", &["a"]);
    unit.set_canonical(redeclared, canonical);

    // Written against the redeclaration's own formal
    let a = unit.read(params[0]);
    let attr = unit.member(a, mu, true);
    unit.set_returned(canonical, attr);

    let obj = unit.var("obj");
    let argument = unit.read(obj);
    let call = unit.call(redeclared, vec![argument]);

    let cfg = straight_line();
    let mut builder = build_with_builder(&unit.ast, &cfg, caller);

    let value = builder
        .translate_attr_at_call(call, redeclared, attr, None)
        .expect("attribute translation should succeed");
    assert_eq!(show(&builder, value), "&obj->mu");
}

#[test]
fn returned_attribute_hops_through_nested_calls() {
    // inner(b) RETURNS(b.lock), outer(a) RETURNS(inner(a)) ... outer(obj)
    let mut unit = UnitBuilder::new();
    let caller = empty_caller(&mut unit);
    let lock = unit.field("lock");

    let (inner, inner_params) = unit.function("inner", &["b"]);
    let b = unit.decl_ref(inner_params[0]);
    let inner_attr = unit.member(b, lock, false);
    unit.set_returned(inner, inner_attr);

    let (outer, outer_params) = unit.function("outer", &["a"]);
    let a = unit.read(outer_params[0]);
    let outer_attr = unit.call(inner, vec![a]);
    unit.set_returned(outer, outer_attr);

    let obj = unit.var("obj");
    let argument = unit.read(obj);
    let call = unit.call(outer, vec![argument]);

    let cfg = straight_line();
    let mut builder = build_with_builder(&unit.ast, &cfg, caller);

    let value = builder
        .translate_attr_at_call(call, outer, outer_attr, None)
        .expect("attribute translation should succeed");

    assert_eq!(show(&builder, value), "&obj.lock");
    assert!(builder.warnings().is_empty());
}

#[test]
fn receiver_replaces_implicit_this_with_call_site_access() {
    // Mutex *get_mu() RETURNS(this->mu);   obj.get_mu(), p->get_mu()
    let mut unit = UnitBuilder::new();
    let caller = empty_caller(&mut unit);
    let mu = unit.field("mu");

    let this = unit.this();
    let attr = unit.member(this, mu, true);
    let (get_mu, _) = unit.function_with("get_mu", &[], Some(attr), true);

    let obj = unit.var("obj");
    let object = unit.decl_ref(obj);
    let dot_call = unit.member_call(object, get_mu, false, Vec::new());

    let ptr = unit.var("ptr");
    let pointer = unit.decl_ref(ptr);
    let arrow_call = unit.member_call(pointer, get_mu, true, Vec::new());

    let cfg = straight_line();
    let mut builder = build_with_builder(&unit.ast, &cfg, caller);

    let through_dot = builder
        .translate_attr_at_call(dot_call, get_mu, attr, None)
        .expect("dot call should translate");
    let through_arrow = builder
        .translate_attr_at_call(arrow_call, get_mu, attr, None)
        .expect("arrow call should translate");

    assert_eq!(show(&builder, through_dot), "&obj.mu");
    assert_eq!(show(&builder, through_arrow), "&ptr->mu");

    // Without a context the receiver stays the reserved variable
    let unsubstituted = builder.translate_attr_expr(attr, None);
    assert_eq!(show(&builder, unsubstituted), "this->mu");
}

#[test]
fn member_operator_call_takes_receiver_from_first_argument() {
    let mut unit = UnitBuilder::new();
    let caller = empty_caller(&mut unit);
    let mu = unit.field("mu");

    let this = unit.this();
    let attr = unit.member(this, mu, true);
    let (call_operator, _) = unit.function_with("operator()", &[], Some(attr), true);

    let obj = unit.var("obj");
    let callee = unit.decl_ref(call_operator);
    let receiver = unit.decl_ref(obj);
    let call = unit.expr(ExprKind::OperatorCall {
        callee,
        args: vec![receiver],
        operator: String::from("()"),
    });

    let cfg = straight_line();
    let mut builder = build_with_builder(&unit.ast, &cfg, caller);

    // The annotated operator is replaced by its attribute
    let value = builder.translate_attr_expr(call, None);
    assert_eq!(show(&builder, value), "&obj.mu");
}

#[test]
fn smart_pointer_access_names_the_pointee() {
    let mut unit = UnitBuilder::new();
    let (caller, params) = unit.function("caller", &["p"]);
    let (arrow, _) = unit.function("operator->", &["p"]);

    let callee = unit.decl_ref(arrow);
    let pointer = unit.decl_ref(params[0]);
    let call = unit.expr(ExprKind::OperatorCall {
        callee,
        args: vec![pointer],
        operator: String::from("->"),
    });

    let cfg = straight_line();
    let mut builder = build_with_builder(&unit.ast, &cfg, caller);

    let value = builder.translate_attr_expr(call, None);
    assert_eq!(show(&builder, value), "&p");
}

#[test]
fn annotated_call_that_does_not_fit_falls_back_to_plain_call() {
    // outer(a) RETURNS(inner()) but inner takes one argument
    let mut unit = UnitBuilder::new();
    let caller = empty_caller(&mut unit);
    let lock = unit.field("lock");

    let (inner, inner_params) = unit.function("inner", &["b"]);
    let b = unit.decl_ref(inner_params[0]);
    let inner_attr = unit.member(b, lock, false);
    unit.set_returned(inner, inner_attr);

    let (outer, _) = unit.function("outer", &["a"]);
    let bad_call = unit.call(inner, Vec::new());
    unit.set_returned(outer, bad_call);

    let obj = unit.var("obj");
    let argument = unit.read(obj);
    let call = unit.call(outer, vec![argument]);

    let cfg = straight_line();
    let mut builder = build_with_builder(&unit.ast, &cfg, caller);

    let value = builder
        .translate_attr_at_call(call, outer, bad_call, None)
        .expect("outer call itself fits");

    assert_eq!(show(&builder, value), "call &inner()");
    assert_eq!(builder.warnings().len(), 1);
    assert_eq!(builder.warnings()[0].warning_kind, WarningKind::ArityMismatch);
    assert_eq!(builder.warnings()[0].location.expr, Some(bad_call));
}

// ------------------------
//   Frames
// ------------------------

#[test]
fn frame_with_wrong_argument_count_is_rejected() {
    let mut unit = UnitBuilder::new();
    let (function, _) = unit.function("pair", &["a", "b"]);
    let one = unit.int(1);
    let args = [one];

    let error = CallingContext::new(&unit.ast, function, None, false, Some(&args[..]), None)
        .expect_err("one argument for two formals should fail");

    assert_eq!(error.error_type, ErrorType::CallingContext);
    assert!(error.msg.contains("takes 2 argument(s)"));
    assert_eq!(
        error.metadata.get(&ErrorMetaDataKey::CompilationStage),
        Some(&"Attribute Translation")
    );

    // The same mismatch through a call expression points at the call
    let call = unit.call(function, vec![one]);
    let error = CallingContext::from_call(&unit.ast, call, function, None)
        .expect_err("call with a missing argument should fail");
    assert_eq!(error.location.expr, Some(call));
}

#[test]
fn frame_needs_a_call_expression() {
    let mut unit = UnitBuilder::new();
    let (function, _) = unit.function("f", &[]);
    let literal = unit.int(3);

    let error = CallingContext::from_call(&unit.ast, literal, function, None)
        .expect_err("a literal is not a call");

    assert_eq!(error.error_type, ErrorType::CallingContext);
    assert_eq!(error.location.expr, Some(literal));
}

#[test]
fn frames_chain_outwards() {
    let mut unit = UnitBuilder::new();
    let (outer, _) = unit.function("outer", &["a"]);
    let (inner, _) = unit.function("inner", &["b"]);
    let receiver = unit.this();
    let outer_arg = unit.int(1);
    let inner_arg = unit.int(2);
    let outer_args = [outer_arg];
    let inner_args = [inner_arg];

    let first = CallingContext::new(&unit.ast, outer, None, false, Some(&outer_args[..]), None)
        .expect("outer frame should fit");
    let second = CallingContext::new(
        &unit.ast,
        inner,
        Some(receiver),
        true,
        Some(&inner_args[..]),
        Some(&first),
    )
    .expect("inner frame should fit");

    assert_eq!(first.depth(), 1);
    assert_eq!(second.depth(), 2);
    assert_eq!(second.arg(0), Some(inner_arg));
    assert_eq!(second.arg(1), None);
    assert_eq!(second.prev.and_then(|prev| prev.arg(0)), Some(outer_arg));

    let without_args = CallingContext::new(&unit.ast, inner, None, false, None, None)
        .expect("a frame without arguments skips the arity check");
    assert_eq!(without_args.arg(0), None);
}
