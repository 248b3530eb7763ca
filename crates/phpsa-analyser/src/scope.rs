//! Flow-sensitive type state and the inference engine.
//!
//! A [`Scope`] is an immutable snapshot of what is known at one program
//! position: the lexical context (namespace, class, function), the type
//! of every bound variable, and narrowed types of arbitrary expressions.
//! Every transition returns a new scope and leaves the receiver intact, so
//! the driver can hand the same scope to both arms of a branch and merge
//! them with [`Scope::intersect_variables`] afterwards.
//!
//! Maps are shared between derived scopes and copied on first write.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use phpsa_types::ast::{
    AssignOp, BinaryOp, CastKind, ClosureUse, Expr, ExprKind, MemberName, NameRef, Param, VarName,
};
use phpsa_types::print_expr;

use crate::broker::Broker;
use crate::error::{AnalysisError, AnalysisResult};
use crate::reflection::{ClassFact, ClassMember, ParametersAcceptor, Visibility};
use crate::ty::{Type, TypeKind};

type TypeMap = FxHashMap<String, Type>;

#[derive(Debug, Clone)]
pub struct Scope {
    broker: Rc<Broker>,
    file: Rc<str>,
    declare_strict_types: bool,
    class: Option<String>,
    function: Option<String>,
    namespace: Option<String>,
    variable_types: Rc<TypeMap>,
    in_closure_bind: bool,
    anonymous_class: Option<Rc<ClassFact>>,
    in_function_call: Option<String>,
    /// Printed expression → narrowed type.
    more_specific_types: Rc<TypeMap>,
    currently_assigned: Rc<FxHashSet<String>>,
}

impl Scope {
    /// The scope at the top of a file.
    pub fn new(broker: Rc<Broker>, file: impl Into<String>, declare_strict_types: bool) -> Self {
        Self {
            broker,
            file: Rc::from(file.into()),
            declare_strict_types,
            class: None,
            function: None,
            namespace: None,
            variable_types: Rc::default(),
            in_closure_bind: false,
            anonymous_class: None,
            in_function_call: None,
            more_specific_types: Rc::default(),
            currently_assigned: Rc::default(),
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ══════════════════════════════════════════════════════════════════════════

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn is_declare_strict_types(&self) -> bool {
        self.declare_strict_types
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn function_name(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_in_closure_bind(&self) -> bool {
        self.in_closure_bind
    }

    pub fn is_in_anonymous_class(&self) -> bool {
        self.anonymous_class.is_some()
    }

    pub fn anonymous_class(&self) -> Option<&Rc<ClassFact>> {
        self.anonymous_class.as_ref()
    }

    /// Name of the function call whose arguments are being resolved.
    pub fn in_function_call(&self) -> Option<&str> {
        self.in_function_call.as_deref()
    }

    pub fn has_variable_type(&self, name: &str) -> bool {
        self.variable_types.contains_key(name)
    }

    /// Type of a bound variable. Unlike [`Scope::resolve_type`], an unbound
    /// name is an error.
    pub fn get_variable_type(&self, name: &str) -> AnalysisResult<Type> {
        self.variable_types
            .get(name)
            .cloned()
            .ok_or_else(|| AnalysisError::UndefinedVariable(name.to_string()))
    }

    /// Bound variable names, sorted.
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variable_types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_in_variable_assign(&self, name: &str) -> bool {
        self.currently_assigned.contains(name)
    }

    /// True if `expr` has a narrowed type recorded in this scope.
    pub fn is_specified(&self, expr: &Expr) -> bool {
        !self.more_specific_types.is_empty()
            && self.more_specific_types.contains_key(&print_expr(expr))
    }

    /// Copy for a transition. The assignment guard never outlives the
    /// scope it was entered in.
    fn derive(&self) -> Scope {
        Scope {
            currently_assigned: Rc::default(),
            ..self.clone()
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Entering constructs
    // ══════════════════════════════════════════════════════════════════════════

    /// Everything but the file and the strict-types flag is reset.
    pub fn enter_namespace(&self, namespace: impl Into<String>) -> Scope {
        Scope {
            namespace: Some(namespace.into()),
            ..Scope::new(Rc::clone(&self.broker), self.file.to_string(), self.declare_strict_types)
        }
    }

    pub fn enter_class(&self, class_name: impl Into<String>) -> Scope {
        let class_name = class_name.into();
        let mut variables = TypeMap::default();
        variables.insert("this".to_string(), Type::object(class_name.clone(), false));
        Scope {
            class: Some(class_name),
            function: None,
            variable_types: Rc::new(variables),
            in_closure_bind: false,
            anonymous_class: None,
            in_function_call: None,
            more_specific_types: Rc::default(),
            ..self.derive()
        }
    }

    /// Binds every declared parameter on top of the current variables.
    pub fn enter_function(&self, function: &dyn ParametersAcceptor) -> Scope {
        let mut variable_types = Rc::clone(&self.variable_types);
        let variables = Rc::make_mut(&mut variable_types);
        for parameter in function.parameters() {
            variables.insert(parameter.name.clone(), parameter.ty.clone());
        }
        Scope {
            function: Some(function.name().to_string()),
            variable_types,
            in_closure_bind: false,
            anonymous_class: None,
            in_function_call: None,
            more_specific_types: Rc::default(),
            ..self.derive()
        }
    }

    /// Member visibility is not enforced inside the returned scope.
    pub fn enter_closure_bind(&self) -> Scope {
        Scope {
            in_closure_bind: true,
            ..self.derive()
        }
    }

    pub fn enter_anonymous_class(&self, class: Rc<ClassFact>) -> Scope {
        let mut variables = TypeMap::default();
        variables.insert("this".to_string(), Type::mixed(false));
        Scope {
            class: None,
            function: None,
            variable_types: Rc::new(variables),
            anonymous_class: Some(class),
            more_specific_types: Rc::default(),
            ..self.derive()
        }
    }

    /// Fresh variables for a closure body: the parameters, then the
    /// captured variables already known here. A by-reference capture of an
    /// unknown variable is bound as `?mixed`; a by-value one is left out.
    pub fn enter_anonymous_function(&self, params: &[Param], uses: &[ClosureUse]) -> Scope {
        let mut variables = TypeMap::default();
        for param in params {
            let ty = Type::from_hint(
                param.type_hint.as_ref(),
                param.defaults_to_null(),
                self.class.as_deref(),
            );
            variables.insert(param.name.clone(), ty);
        }

        for captured in uses {
            match self.variable_types.get(&captured.var) {
                Some(ty) => {
                    variables.insert(captured.var.clone(), ty.clone());
                }
                None if captured.by_ref => {
                    variables.insert(captured.var.clone(), Type::mixed(true));
                }
                None => {}
            }
        }

        if let Some(class) = &self.class {
            variables.insert("this".to_string(), Type::object(class.clone(), false));
        }

        Scope {
            variable_types: Rc::new(variables),
            more_specific_types: Rc::default(),
            ..self.derive()
        }
    }

    pub fn enter_foreach(&self, value_name: &str, key_name: Option<&str>) -> Scope {
        let mut scope = self.assign_variable(value_name, None);
        if let Some(key_name) = key_name {
            scope = scope.assign_variable(key_name, Some(Type::mixed(false)));
        }
        scope.in_function_call = None;
        scope
    }

    pub fn enter_catch(&self, exception_class: impl Into<String>, variable_name: &str) -> Scope {
        let mut scope =
            self.assign_variable(variable_name, Some(Type::object(exception_class, false)));
        scope.in_function_call = None;
        scope
    }

    pub fn enter_function_call(&self, function_name: impl Into<String>) -> Scope {
        Scope {
            in_function_call: Some(function_name.into()),
            ..self.derive()
        }
    }

    /// Marks `name` as being assigned, so resolving its own initializer
    /// can tell.
    pub fn enter_variable_assign(&self, name: &str) -> Scope {
        let mut currently_assigned = Rc::clone(&self.currently_assigned);
        Rc::make_mut(&mut currently_assigned).insert(name.to_string());
        Scope {
            currently_assigned,
            ..self.derive()
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Variable state
    // ══════════════════════════════════════════════════════════════════════════

    /// Binds `name`; an unknown type binds `?mixed`.
    pub fn assign_variable(&self, name: &str, ty: Option<Type>) -> Scope {
        let mut variable_types = Rc::clone(&self.variable_types);
        Rc::make_mut(&mut variable_types)
            .insert(name.to_string(), ty.unwrap_or_else(|| Type::mixed(true)));
        Scope {
            variable_types,
            ..self.derive()
        }
    }

    pub fn unset_variable(&self, name: &str) -> AnalysisResult<Scope> {
        if !self.has_variable_type(name) {
            return Err(AnalysisError::UndefinedVariable(name.to_string()));
        }
        let mut variable_types = Rc::clone(&self.variable_types);
        Rc::make_mut(&mut variable_types).remove(name);
        Ok(Scope {
            variable_types,
            ..self.derive()
        })
    }

    /// Narrows `expr` to a non-null instance of `class_name`.
    ///
    /// A plain variable is rebound; any other expression is recorded under
    /// its printed form.
    pub fn specify_object_type(&self, expr: &Expr, class_name: &str) -> Scope {
        let ty = Type::object(class_name, false);
        if let Some(name) = expr.as_variable_name() {
            return self.assign_variable(name, Some(ty));
        }

        let key = print_expr(expr);
        trace!(expr = %key, class = %class_name, "narrowed expression");
        let mut more_specific_types = Rc::clone(&self.more_specific_types);
        Rc::make_mut(&mut more_specific_types).insert(key, ty);
        Scope {
            more_specific_types,
            ..self.derive()
        }
    }

    /// Join of two branches: only variables bound in both survive, each
    /// with the combined type.
    pub fn intersect_variables(&self, other: &Scope) -> Scope {
        let variables: TypeMap = self
            .variable_types
            .iter()
            .filter_map(|(name, ty)| {
                other
                    .variable_types
                    .get(name)
                    .map(|other_ty| (name.clone(), ty.combine(other_ty)))
            })
            .collect();
        Scope {
            variable_types: Rc::new(variables),
            ..self.derive()
        }
    }

    /// Union of bindings; `other` wins on collisions.
    pub fn add_variables(&self, other: &Scope) -> Scope {
        let mut variable_types = Rc::clone(&self.variable_types);
        let variables = Rc::make_mut(&mut variable_types);
        for (name, ty) in other.variable_types.iter() {
            variables.insert(name.clone(), ty.clone());
        }
        Scope {
            variable_types,
            ..self.derive()
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Type inference
    // ══════════════════════════════════════════════════════════════════════════

    /// Infers the type of `expr`.
    ///
    /// Never fails on a modeling gap: unknown variables, classes, members
    /// and functions give `mixed`. Only autoloading faults and internal
    /// faults from the broker are propagated.
    pub fn resolve_type(&self, expr: &Expr) -> AnalysisResult<Type> {
        match &expr.kind {
            ExprKind::BinaryOp { op, .. } if op.is_logical() => return Ok(Type::boolean(false)),
            ExprKind::BooleanNot(_) => return Ok(Type::boolean(false)),
            ExprKind::UnaryMinus(operand) | ExprKind::UnaryPlus(operand) => {
                return self.resolve_type(operand)
            }
            ExprKind::BinaryOp { op: BinaryOp::Div, .. }
            | ExprKind::AssignOp { op: AssignOp::Div, .. } => return Ok(Type::float(false)),
            ExprKind::BinaryOp { op: BinaryOp::Mod, .. } => return Ok(Type::integer(false)),
            _ => {}
        }

        if let Some(ty) = self.resolve_arithmetic(expr)? {
            return Ok(ty);
        }

        if let Some(ty) = self.resolve_literal(expr)? {
            return Ok(ty);
        }

        if !self.more_specific_types.is_empty() {
            if let Some(ty) = self.more_specific_types.get(&print_expr(expr)) {
                trace!(ty = %ty, "narrowed type hit");
                return Ok(ty.clone());
            }
        }

        match &expr.kind {
            ExprKind::Variable(VarName::Named(name)) => Ok(self
                .variable_types
                .get(name)
                .cloned()
                .unwrap_or_else(|| Type::mixed(true))),
            ExprKind::MethodCall {
                var,
                name: MemberName::Ident(method_name),
                ..
            } => {
                let receiver = self.resolve_type(var)?;
                match self.method_call_type(expr, &receiver, method_name)? {
                    Some(ty) => Ok(ty),
                    None => Ok(Type::mixed(false)),
                }
            }
            ExprKind::PropertyFetch {
                var,
                name: MemberName::Ident(property_name),
            } => {
                let receiver = self.resolve_type(var)?;
                if let Some(class_name) = receiver.class_name() {
                    if self.broker.has_class(class_name)? {
                        let class = self.broker.get_class(class_name)?;
                        return Ok(match class.property(property_name) {
                            Some(property) => property.ty.clone(),
                            None => Type::mixed(true),
                        });
                    }
                }
                Ok(Type::mixed(false))
            }
            ExprKind::FuncCall {
                name: NameRef::Named(function_name),
                ..
            } => {
                if !self.broker.has_function(function_name) {
                    return Ok(Type::mixed(true));
                }
                Ok(self.broker.get_function(function_name)?.return_type.clone())
            }
            _ => Ok(Type::mixed(false)),
        }
    }

    /// `+ - * **` and compound assignments over numbers. `None` when the
    /// operands are not both numeric.
    fn resolve_arithmetic(&self, expr: &Expr) -> AnalysisResult<Option<Type>> {
        let (left, right) = match &expr.kind {
            ExprKind::BinaryOp {
                op: BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Mul | BinaryOp::Pow,
                left,
                right,
            } => (left, right),
            ExprKind::AssignOp { var, expr: value, .. } => (var, value),
            _ => return Ok(None),
        };

        let numeric = |ty: Type| match ty.kind() {
            TypeKind::Boolean => Type::integer(ty.is_nullable()),
            _ => ty,
        };
        let left = numeric(self.resolve_type(left)?);
        let right = numeric(self.resolve_type(right)?);

        Ok(match (left.kind(), right.kind()) {
            (TypeKind::Float, _) | (_, TypeKind::Float) => Some(Type::float(false)),
            (TypeKind::Integer, TypeKind::Integer) => Some(Type::integer(false)),
            _ => None,
        })
    }

    /// Literals, casts, `new` and class constants.
    fn resolve_literal(&self, expr: &Expr) -> AnalysisResult<Option<Type>> {
        let ty = match &expr.kind {
            ExprKind::LNumber(_) => Type::integer(false),
            ExprKind::DNumber(_) => Type::float(false),
            ExprKind::String(_) => Type::string(false),
            ExprKind::ConstFetch(name) => {
                if name.eq_ignore_ascii_case("true") || name.eq_ignore_ascii_case("false") {
                    Type::boolean(false)
                } else if name.eq_ignore_ascii_case("null") {
                    Type::null()
                } else {
                    return Ok(None);
                }
            }
            ExprKind::Cast { kind, .. } => match kind {
                CastKind::Int => Type::integer(false),
                CastKind::Double => Type::float(false),
                CastKind::String => Type::string(false),
                CastKind::Bool => Type::boolean(false),
                CastKind::Array => Type::array(false),
                CastKind::Object => Type::object("stdClass", false),
                CastKind::Unset => Type::null(),
            },
            ExprKind::New {
                class: NameRef::Named(class_name),
                ..
            } => match class_name.as_str() {
                "static" => Type::mixed(true),
                "self" => match &self.class {
                    Some(class) => Type::object(class.clone(), false),
                    None => return Ok(None),
                },
                other => Type::object(other.trim_start_matches('\\'), false),
            },
            ExprKind::Array(_) => Type::array(false),
            ExprKind::ClassConstFetch {
                class: NameRef::Named(class_name),
                name,
            } => return self.class_constant_type(class_name, name),
            _ => return Ok(None),
        };
        Ok(Some(ty))
    }

    fn class_constant_type(&self, class_name: &str, constant: &str) -> AnalysisResult<Option<Type>> {
        let class_name = if class_name == "self" {
            match &self.class {
                Some(class) => class.as_str(),
                None => return Ok(None),
            }
        } else {
            class_name.trim_start_matches('\\')
        };

        if !self.broker.has_class(class_name)? {
            return Ok(None);
        }
        let class = self.broker.get_class(class_name)?;
        Ok(class.constant(constant).map(|value| value.ty()))
    }

    /// `None` when the receiver is not a known class.
    fn method_call_type(
        &self,
        call: &Expr,
        receiver: &Type,
        method_name: &str,
    ) -> AnalysisResult<Option<Type>> {
        let Some(class_name) = receiver.class_name() else {
            return Ok(None);
        };
        if !self.broker.has_class(class_name)? {
            return Ok(None);
        }

        let class = self.broker.get_class(class_name)?;
        let Some(method) = class.method(method_name) else {
            return Ok(Some(Type::mixed(true)));
        };

        for extension in self.broker.get_return_type_extensions_for_class(class_name)? {
            if !extension.is_method_supported(method) {
                continue;
            }
            trace!(
                class = %class_name,
                method = %method_name,
                extension = %extension.class(),
                "dynamic return type extension hit"
            );
            return extension.type_from_method_call(method, call, self).map(Some);
        }

        let declared = &method.return_type;
        if declared.is_static() {
            return Ok(Some(if declared.is_nullable() {
                receiver.make_nullable()
            } else {
                receiver.clone()
            }));
        }
        Ok(Some(declared.clone()))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Visibility
    // ══════════════════════════════════════════════════════════════════════════

    pub fn can_access_property(&self, property: &dyn ClassMember) -> AnalysisResult<bool> {
        self.can_access_class_member(property)
    }

    pub fn can_call_method(&self, method: &dyn ClassMember) -> AnalysisResult<bool> {
        self.can_access_class_member(method)
    }

    /// Fails when the protected check has to load a current class the
    /// broker cannot provide.
    fn can_access_class_member(&self, member: &dyn ClassMember) -> AnalysisResult<bool> {
        if self.in_closure_bind {
            return Ok(true);
        }
        let Some(current) = self.class.as_deref() else {
            return Ok(member.visibility() == Visibility::Public);
        };

        let declaring = member.declaring_class();
        Ok(match member.visibility() {
            Visibility::Public => true,
            Visibility::Private => current == declaring,
            Visibility::Protected => {
                current == declaring || self.broker.get_class(current)?.is_subclass_of(declaring)
            }
        })
    }
}
