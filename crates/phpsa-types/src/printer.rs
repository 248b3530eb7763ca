//! Canonical source printer for expressions.
//!
//! The printed form is the key under which narrowed expression types are
//! stored, so two structurally identical expressions must print the same
//! string regardless of spans. Nested operator expressions are always
//! parenthesised to keep differently-associated trees apart.

use std::fmt::Write;

use crate::ast::*;

/// Print an expression in canonical PHP-like form.
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(expr);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
}

impl Printer {
    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Variable(name) => self.var_name(name),
            ExprKind::LNumber(value) => {
                let _ = write!(self.out, "{value}");
            }
            ExprKind::DNumber(value) => {
                let _ = write!(self.out, "{value:?}");
            }
            ExprKind::String(value) => self.string_literal(value),
            ExprKind::ConstFetch(name) => self.out.push_str(name),
            ExprKind::Array(items) => {
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if let Some(key) = &item.key {
                        self.expr(key);
                        self.out.push_str(" => ");
                    }
                    if item.by_ref {
                        self.out.push('&');
                    }
                    self.expr(&item.value);
                }
                self.out.push(']');
            }
            ExprKind::BinaryOp { op, left, right } => {
                self.operand(left);
                let _ = write!(self.out, " {} ", op.as_str());
                self.operand(right);
            }
            ExprKind::BooleanNot(inner) => {
                self.out.push('!');
                self.operand(inner);
            }
            ExprKind::UnaryMinus(inner) => {
                self.out.push('-');
                self.operand(inner);
            }
            ExprKind::UnaryPlus(inner) => {
                self.out.push('+');
                self.operand(inner);
            }
            ExprKind::Assign { var, expr } => {
                self.expr(var);
                self.out.push_str(" = ");
                self.operand(expr);
            }
            ExprKind::AssignOp { op, var, expr } => {
                self.expr(var);
                let _ = write!(self.out, " {} ", op.as_str());
                self.operand(expr);
            }
            ExprKind::Cast { kind, expr } => {
                self.out.push_str(kind.as_str());
                self.out.push(' ');
                self.operand(expr);
            }
            ExprKind::Instanceof { expr, class } => {
                self.operand(expr);
                self.out.push_str(" instanceof ");
                self.name_ref(class);
            }
            ExprKind::New { class, args } => {
                self.out.push_str("new ");
                self.name_ref(class);
                self.args(args);
            }
            ExprKind::ClassConstFetch { class, name } => {
                self.name_ref(class);
                self.out.push_str("::");
                self.out.push_str(name);
            }
            ExprKind::MethodCall { var, name, args } => {
                self.dereferenceable(var);
                self.out.push_str("->");
                self.member_name(name);
                self.args(args);
            }
            ExprKind::StaticCall { class, name, args } => {
                self.name_ref(class);
                self.out.push_str("::");
                self.member_name(name);
                self.args(args);
            }
            ExprKind::PropertyFetch { var, name } => {
                self.dereferenceable(var);
                self.out.push_str("->");
                self.member_name(name);
            }
            ExprKind::StaticPropertyFetch { class, name } => {
                self.name_ref(class);
                self.out.push_str("::$");
                self.member_name(name);
            }
            ExprKind::FuncCall { name, args } => {
                self.name_ref(name);
                self.args(args);
            }
            ExprKind::Closure(closure) => self.closure(closure),
        }
    }

    /// Operands that are themselves operator expressions get parentheses.
    fn operand(&mut self, expr: &Expr) {
        let needs_parens = matches!(
            expr.kind,
            ExprKind::BinaryOp { .. }
                | ExprKind::Assign { .. }
                | ExprKind::AssignOp { .. }
                | ExprKind::Instanceof { .. }
                | ExprKind::Cast { .. }
                | ExprKind::BooleanNot(_)
                | ExprKind::UnaryMinus(_)
                | ExprKind::UnaryPlus(_)
                | ExprKind::Closure(_)
        );
        if needs_parens {
            self.out.push('(');
            self.expr(expr);
            self.out.push(')');
        } else {
            self.expr(expr);
        }
    }

    fn dereferenceable(&mut self, expr: &Expr) {
        if matches!(expr.kind, ExprKind::New { .. }) {
            self.out.push('(');
            self.expr(expr);
            self.out.push(')');
        } else {
            self.operand(expr);
        }
    }

    fn var_name(&mut self, name: &VarName) {
        match name {
            VarName::Named(name) => {
                self.out.push('$');
                self.out.push_str(name);
            }
            VarName::Dynamic(expr) => {
                self.out.push_str("${");
                self.expr(expr);
                self.out.push('}');
            }
        }
    }

    fn name_ref(&mut self, name: &NameRef) {
        match name {
            NameRef::Named(name) => self.out.push_str(name),
            NameRef::Dynamic(expr) => self.operand(expr),
        }
    }

    fn member_name(&mut self, name: &MemberName) {
        match name {
            MemberName::Ident(name) => self.out.push_str(name),
            MemberName::Dynamic(expr) => {
                self.out.push('{');
                self.expr(expr);
                self.out.push('}');
            }
        }
    }

    fn args(&mut self, args: &[Arg]) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if arg.by_ref {
                self.out.push('&');
            }
            if arg.unpack {
                self.out.push_str("...");
            }
            self.expr(&arg.value);
        }
        self.out.push(')');
    }

    fn string_literal(&mut self, value: &str) {
        self.out.push('\'');
        for c in value.chars() {
            if c == '\'' || c == '\\' {
                self.out.push('\\');
            }
            self.out.push(c);
        }
        self.out.push('\'');
    }

    fn type_hint(&mut self, hint: &TypeHint) {
        if hint.nullable {
            self.out.push('?');
        }
        self.out.push_str(&hint.name);
    }

    fn closure(&mut self, closure: &Closure) {
        if closure.is_static {
            self.out.push_str("static ");
        }
        self.out.push_str("function ");
        if closure.by_ref {
            self.out.push('&');
        }
        self.out.push('(');
        for (i, param) in closure.params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if let Some(hint) = &param.type_hint {
                self.type_hint(hint);
                self.out.push(' ');
            }
            if param.by_ref {
                self.out.push('&');
            }
            if param.variadic {
                self.out.push_str("...");
            }
            self.out.push('$');
            self.out.push_str(&param.name);
            if let Some(default) = &param.default {
                self.out.push_str(" = ");
                self.expr(default);
            }
        }
        self.out.push(')');
        if !closure.uses.is_empty() {
            self.out.push_str(" use (");
            for (i, closure_use) in closure.uses.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                if closure_use.by_ref {
                    self.out.push('&');
                }
                self.out.push('$');
                self.out.push_str(&closure_use.var);
            }
            self.out.push(')');
        }
        if let Some(hint) = &closure.return_type {
            self.out.push_str(": ");
            self.type_hint(hint);
        }
        self.out.push_str(" { }");
    }
}
