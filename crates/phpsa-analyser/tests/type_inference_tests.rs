//! `Scope::resolve_type` over every inference rule, in precedence order.

use std::rc::Rc;

use phpsa_analyser::extension::DynamicMethodReturnTypeExtension;
use phpsa_analyser::reflection::MethodFact;
use phpsa_analyser::{AnalysisError, AnalysisResult, Broker, Scope, Type, Universe};
use phpsa_types::ast::{
    Arg, AssignOp, BinaryOp, CastKind, Expr, ExprKind, MemberName, NameRef, VarName,
};
use phpsa_types::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn universe() -> Universe {
    Universe::from_json(include_str!("fixtures/universe.json")).unwrap()
}

fn scope() -> Scope {
    Scope::new(Rc::new(Broker::new(universe())), "test.php", false)
}

fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::default())
}

fn var(name: &str) -> Expr {
    expr(ExprKind::Variable(VarName::Named(name.to_string())))
}

fn int(value: i64) -> Expr {
    expr(ExprKind::LNumber(value))
}

fn float(value: f64) -> Expr {
    expr(ExprKind::DNumber(value))
}

fn string(value: &str) -> Expr {
    expr(ExprKind::String(value.to_string()))
}

fn constant(name: &str) -> Expr {
    expr(ExprKind::ConstFetch(name.to_string()))
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    expr(ExprKind::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn assign_op(op: AssignOp, var: Expr, value: Expr) -> Expr {
    expr(ExprKind::AssignOp {
        op,
        var: Box::new(var),
        expr: Box::new(value),
    })
}

fn cast(kind: CastKind, value: Expr) -> Expr {
    expr(ExprKind::Cast {
        kind,
        expr: Box::new(value),
    })
}

fn new(class: &str) -> Expr {
    expr(ExprKind::New {
        class: NameRef::Named(class.to_string()),
        args: vec![],
    })
}

fn class_const(class: &str, name: &str) -> Expr {
    expr(ExprKind::ClassConstFetch {
        class: NameRef::Named(class.to_string()),
        name: name.to_string(),
    })
}

fn method_call(receiver: Expr, name: &str) -> Expr {
    expr(ExprKind::MethodCall {
        var: Box::new(receiver),
        name: MemberName::Ident(name.to_string()),
        args: vec![],
    })
}

fn property(receiver: Expr, name: &str) -> Expr {
    expr(ExprKind::PropertyFetch {
        var: Box::new(receiver),
        name: MemberName::Ident(name.to_string()),
    })
}

fn func_call(name: &str, args: Vec<Arg>) -> Expr {
    expr(ExprKind::FuncCall {
        name: NameRef::Named(name.to_string()),
        args,
    })
}

fn resolve(scope: &Scope, e: &Expr) -> Type {
    scope.resolve_type(e).unwrap()
}

// ══════════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_logical_operators_are_boolean() {
    let s = scope();
    for op in [
        BinaryOp::BooleanAnd,
        BinaryOp::BooleanOr,
        BinaryOp::LogicalAnd,
        BinaryOp::LogicalOr,
        BinaryOp::LogicalXor,
    ] {
        assert_eq!(resolve(&s, &binary(op, var("a"), int(1))), Type::boolean(false));
    }
    let not = expr(ExprKind::BooleanNot(Box::new(string("x"))));
    assert_eq!(resolve(&s, &not), Type::boolean(false));
}

#[test]
fn test_unary_operators_keep_operand_type() {
    let s = scope().assign_variable("f", Some(Type::float(true)));
    let minus = expr(ExprKind::UnaryMinus(Box::new(var("f"))));
    let plus = expr(ExprKind::UnaryPlus(Box::new(int(3))));
    assert_eq!(resolve(&s, &minus), Type::float(true));
    assert_eq!(resolve(&s, &plus), Type::integer(false));
}

#[test]
fn test_division_is_always_float() {
    let s = scope().assign_variable("n", Some(Type::integer(false)));
    assert_eq!(resolve(&s, &binary(BinaryOp::Div, int(4), int(2))), Type::float(false));
    assert_eq!(resolve(&s, &assign_op(AssignOp::Div, var("n"), int(2))), Type::float(false));
}

#[test]
fn test_modulo_is_always_integer() {
    let s = scope();
    assert_eq!(resolve(&s, &binary(BinaryOp::Mod, int(7), int(2))), Type::integer(false));
    assert_eq!(
        resolve(&s, &binary(BinaryOp::Mod, float(7.5), string("2"))),
        Type::integer(false)
    );
}

#[test]
fn test_arithmetic_promotion() {
    let s = scope()
        .assign_variable("i", Some(Type::integer(false)))
        .assign_variable("b", Some(Type::boolean(true)))
        .assign_variable("f", Some(Type::float(false)));

    assert_eq!(resolve(&s, &binary(BinaryOp::Plus, int(1), int(2))), Type::integer(false));
    assert_eq!(resolve(&s, &binary(BinaryOp::Mul, var("i"), float(2.0))), Type::float(false));
    assert_eq!(resolve(&s, &binary(BinaryOp::Minus, var("b"), var("i"))), Type::integer(false));
    assert_eq!(resolve(&s, &binary(BinaryOp::Pow, var("f"), var("b"))), Type::float(false));
    assert_eq!(resolve(&s, &assign_op(AssignOp::Plus, var("i"), int(1))), Type::integer(false));
}

#[test]
fn test_arithmetic_on_non_numbers_falls_through() {
    let s = scope();
    assert_eq!(
        resolve(&s, &binary(BinaryOp::Plus, string("a"), int(1))),
        Type::mixed(false)
    );
    assert_eq!(
        resolve(&s, &binary(BinaryOp::Plus, var("unknown"), int(1))),
        Type::mixed(false)
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Literals, casts, new
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_literals() {
    let s = scope();
    assert_eq!(resolve(&s, &int(1)), Type::integer(false));
    assert_eq!(resolve(&s, &float(1.5)), Type::float(false));
    assert_eq!(resolve(&s, &string("x")), Type::string(false));
    assert_eq!(resolve(&s, &constant("true")), Type::boolean(false));
    assert_eq!(resolve(&s, &constant("FALSE")), Type::boolean(false));
    assert_eq!(resolve(&s, &constant("null")), Type::null());
    assert_eq!(resolve(&s, &expr(ExprKind::Array(vec![]))), Type::array(false));
    assert_eq!(resolve(&s, &constant("PHP_EOL")), Type::mixed(false));
}

#[test]
fn test_casts() {
    let s = scope();
    let cases = [
        (CastKind::Int, Type::integer(false)),
        (CastKind::Double, Type::float(false)),
        (CastKind::String, Type::string(false)),
        (CastKind::Bool, Type::boolean(false)),
        (CastKind::Array, Type::array(false)),
        (CastKind::Object, Type::object("stdClass", false)),
        (CastKind::Unset, Type::null()),
    ];
    for (kind, expected) in cases {
        assert_eq!(resolve(&s, &cast(kind, var("x"))), expected);
    }
}

#[test]
fn test_new() {
    let s = scope();
    assert_eq!(resolve(&s, &new("Foo")), Type::object("Foo", false));
    assert_eq!(resolve(&s, &new("\\App\\Foo")), Type::object("App\\Foo", false));
    assert_eq!(resolve(&s, &new("static")), Type::mixed(true));

    let in_class = s.enter_class("Bar");
    assert_eq!(resolve(&in_class, &new("self")), Type::object("Bar", false));
}

#[test]
fn test_new_with_dynamic_class_is_mixed() {
    let s = scope();
    let dynamic = expr(ExprKind::New {
        class: NameRef::Dynamic(Box::new(var("class"))),
        args: vec![],
    });
    assert_eq!(resolve(&s, &dynamic), Type::mixed(false));
}

#[test]
fn test_class_constants() {
    let s = scope();
    assert_eq!(resolve(&s, &class_const("Foo", "LIMIT")), Type::integer(false));
    assert_eq!(resolve(&s, &class_const("Foo", "RATIO")), Type::float(false));
    assert_eq!(resolve(&s, &class_const("Foo", "ENABLED")), Type::boolean(false));
    assert_eq!(resolve(&s, &class_const("Foo", "NOTHING")), Type::null());
    assert_eq!(resolve(&s, &class_const("Foo", "NAMES")), Type::array(false));
    // inherited from Base
    assert_eq!(resolve(&s, &class_const("Foo", "VERSION")), Type::string(false));
    assert_eq!(resolve(&s, &class_const("Foo", "MISSING")), Type::mixed(false));
    assert_eq!(resolve(&s, &class_const("Nope", "LIMIT")), Type::mixed(false));

    let in_foo = s.enter_class("Foo");
    assert_eq!(resolve(&in_foo, &class_const("self", "LIMIT")), Type::integer(false));
}

// ══════════════════════════════════════════════════════════════════════════════
// Narrowing & variables
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_assigned_variable_resolves_to_bound_type() {
    let s = scope();
    for ty in [
        Type::integer(false),
        Type::object("Foo", true),
        Type::null(),
        Type::static_type("Foo", false),
    ] {
        let derived = s.assign_variable("v", Some(ty.clone()));
        assert_eq!(resolve(&derived, &var("v")), ty);
    }
    let unknown = s.assign_variable("v", None);
    assert_eq!(resolve(&unknown, &var("v")), Type::mixed(true));
}

#[test]
fn test_unbound_variable_is_nullable_mixed() {
    let s = scope();
    assert_eq!(resolve(&s, &var("x")), Type::mixed(true));
    assert_eq!(
        s.get_variable_type("x"),
        Err(AnalysisError::UndefinedVariable("x".to_string()))
    );
}

#[test]
fn test_narrowing_overrides_generic_rules() {
    let s = scope().assign_variable("foo", Some(Type::object("Foo", false)));
    let fetch = property(var("foo"), "bar");
    assert_eq!(resolve(&s, &fetch), Type::object("Bar", false));

    let narrowed = s.specify_object_type(&fetch, "Child");
    assert_eq!(resolve(&narrowed, &fetch), Type::object("Child", false));
    // structurally identical expression shares the narrowing
    assert_eq!(
        resolve(&narrowed, &property(var("foo"), "bar")),
        Type::object("Child", false)
    );
    // a differently printed one does not
    assert_eq!(
        resolve(&narrowed, &property(var("foo"), "name")),
        Type::string(false)
    );
    // the parent scope is untouched
    assert_eq!(resolve(&s, &fetch), Type::object("Bar", false));
}

#[test]
fn test_literals_win_over_narrowing() {
    let s = scope().specify_object_type(&int(1), "Foo");
    assert_eq!(resolve(&s, &int(1)), Type::integer(false));
}

// ══════════════════════════════════════════════════════════════════════════════
// Members & functions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_method_call_uses_declared_return_type() {
    let s = scope().assign_variable("foo", Some(Type::object("Foo", false)));
    assert_eq!(resolve(&s, &method_call(var("foo"), "count")), Type::integer(false));
    assert_eq!(resolve(&s, &method_call(var("foo"), "bar")), Type::object("Bar", false));
    assert_eq!(resolve(&s, &method_call(var("foo"), "same")), Type::object("Foo", false));
    assert_eq!(resolve(&s, &method_call(var("foo"), "configure")), Type::null());
    // overridden in Foo
    assert_eq!(resolve(&s, &method_call(var("foo"), "describe")), Type::string(true));
}

#[test]
fn test_method_call_chains() {
    let s = scope().assign_variable("foo", Some(Type::object("Foo", false)));
    let chain = method_call(method_call(var("foo"), "bar"), "baz");
    assert_eq!(resolve(&s, &chain), Type::string(false));
}

#[test]
fn test_static_return_type_follows_receiver() {
    let s = scope()
        .assign_variable("child", Some(Type::object("Child", false)))
        .assign_variable("maybe_child", Some(Type::object("Child", true)));

    // declared on Base as `static`
    assert_eq!(
        resolve(&s, &method_call(var("child"), "create")),
        Type::object("Child", false)
    );
    assert_eq!(
        resolve(&s, &method_call(var("maybe_child"), "create")),
        Type::object("Child", true)
    );
    // declared on Foo as `?static`
    assert_eq!(
        resolve(&s, &method_call(var("child"), "maybe")),
        Type::object("Child", true)
    );
}

#[test]
fn test_unknown_method_on_known_class_is_nullable_mixed() {
    let s = scope().assign_variable("foo", Some(Type::object("Foo", false)));
    assert_eq!(resolve(&s, &method_call(var("foo"), "nope")), Type::mixed(true));
}

#[test]
fn test_method_call_on_unknown_receiver_is_mixed() {
    let s = scope()
        .assign_variable("ghost", Some(Type::object("Ghost", false)))
        .assign_variable("n", Some(Type::integer(false)));
    assert_eq!(resolve(&s, &method_call(var("ghost"), "run")), Type::mixed(false));
    assert_eq!(resolve(&s, &method_call(var("n"), "run")), Type::mixed(false));
}

#[test]
fn test_dynamic_method_name_is_mixed() {
    let s = scope().assign_variable("foo", Some(Type::object("Foo", false)));
    let call = expr(ExprKind::MethodCall {
        var: Box::new(var("foo")),
        name: MemberName::Dynamic(Box::new(var("m"))),
        args: vec![],
    });
    assert_eq!(resolve(&s, &call), Type::mixed(false));
}

#[test]
fn test_property_fetch() {
    let s = scope().assign_variable("bar", Some(Type::object("Bar", false)));
    assert_eq!(resolve(&s, &property(var("bar"), "next")), Type::object("Bar", true));
    assert_eq!(
        resolve(&s, &property(property(var("bar"), "next"), "next")),
        Type::object("Bar", true)
    );
    assert_eq!(resolve(&s, &property(var("bar"), "missing")), Type::mixed(true));
}

#[test]
fn test_this_inside_class() {
    let s = scope().enter_class("Foo");
    assert_eq!(resolve(&s, &property(var("this"), "bar")), Type::object("Bar", false));
    assert_eq!(resolve(&s, &method_call(var("this"), "count")), Type::integer(false));
}

#[test]
fn test_function_calls() {
    let s = scope();
    assert_eq!(
        resolve(&s, &func_call("strlen", vec![Arg::new(string("x"))])),
        Type::integer(false)
    );
    assert_eq!(resolve(&s, &func_call("ARRAY_MAP", vec![])), Type::array(false));
    assert_eq!(resolve(&s, &func_call("undefinedFunc", vec![])), Type::mixed(true));
    assert!(!s.broker().has_function("undefinedFunc"));
}

#[test]
fn test_fallback_is_non_nullable_mixed() {
    let s = scope();
    let assign = expr(ExprKind::Assign {
        var: Box::new(var("a")),
        expr: Box::new(int(1)),
    });
    assert_eq!(resolve(&s, &assign), Type::mixed(false));
    assert_eq!(
        resolve(&s, &binary(BinaryOp::Concat, string("a"), string("b"))),
        Type::mixed(false)
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Return type extensions & faults
// ══════════════════════════════════════════════════════════════════════════════

struct DescribeAsArray {
    class: &'static str,
    result: Type,
}

impl DynamicMethodReturnTypeExtension for DescribeAsArray {
    fn class(&self) -> &str {
        self.class
    }

    fn is_method_supported(&self, method: &MethodFact) -> bool {
        method.name == "describe"
    }

    fn type_from_method_call(
        &self,
        _method: &MethodFact,
        _call: &Expr,
        _scope: &Scope,
    ) -> AnalysisResult<Type> {
        Ok(self.result.clone())
    }
}

#[test]
fn test_return_type_extension_overrides_declared_type() {
    let broker = Broker::new(universe()).with_dynamic_method_return_type_extension(
        DescribeAsArray {
            class: "Base",
            result: Type::array(false),
        },
    );
    let s = Scope::new(Rc::new(broker), "test.php", false)
        .assign_variable("child", Some(Type::object("Child", false)))
        .assign_variable("foo", Some(Type::object("Foo", false)));

    assert_eq!(resolve(&s, &method_call(var("child"), "describe")), Type::array(false));
    // unsupported methods keep their declared type
    assert_eq!(resolve(&s, &method_call(var("foo"), "count")), Type::integer(false));
}

#[test]
fn test_nearest_return_type_extension_wins() {
    let broker = Broker::new(universe())
        .with_dynamic_method_return_type_extension(DescribeAsArray {
            class: "Base",
            result: Type::array(false),
        })
        .with_dynamic_method_return_type_extension(DescribeAsArray {
            class: "Foo",
            result: Type::callable(false),
        });
    let s = Scope::new(Rc::new(broker), "test.php", false)
        .assign_variable("child", Some(Type::object("Child", false)));
    assert_eq!(resolve(&s, &method_call(var("child"), "describe")), Type::callable(false));
}

#[test]
fn test_autoload_fault_propagates() {
    let s = scope().assign_variable("broken", Some(Type::object("Broken", false)));
    let result = s.resolve_type(&method_call(var("broken"), "run"));
    assert!(matches!(
        result,
        Err(AnalysisError::ClassAutoloading { ref class, .. }) if class == "Broken"
    ));
}
