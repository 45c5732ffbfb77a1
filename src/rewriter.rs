//! Decoder-call rewriting.
//!
//! Obfuscated scripts hide their string constants behind calls such as
//! `Ot(5)`, usually through a chain of aliases:
//!
//! ```javascript
//! var a = Ot;
//! function f() {
//!     var b = a;
//!     console.log(b(5));
//! }
//! ```
//!
//! This pass follows those aliases through declarations and assignments,
//! scoped per function, and replaces every resolvable `alias(<number>)` call
//! with the string the matching decoder returns. Calls that fail to decode
//! are left exactly as written.

use swc_core::common::{SourceMap, Span};
use swc_core::ecma::ast::{
    ArrowExpr, AssignExpr, AssignOp, AssignTarget, CallExpr, Callee, Constructor, Expr,
    Function, GetterProp, Ident, Lit, ParenExpr, Pat, Program, SetterProp, SimpleAssignTarget,
    Str, VarDeclarator,
};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};
use tracing::{debug, info, warn};

use crate::codegen::{self, Position};
use crate::error::DecodeError;
use crate::registry::{DecoderKey, DecoderRegistry};
use crate::scope::AliasEnvironment;

/// Largest integer a numeric literal can hold exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A call that resolved to a decoder but could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeFailure {
    /// Name the decoder was called through.
    pub callee: String,
    /// Decoder the callee resolved to.
    pub key: DecoderKey,
    /// The numeric argument as written.
    pub argument: f64,
    pub position: Option<Position>,
    pub error: DecodeError,
}

/// Outcome of one decoder pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeSummary {
    /// Number of calls replaced by string literals.
    pub decoded: usize,
    pub failures: Vec<DecodeFailure>,
}

/// Replaces resolvable decoder calls in `program` with string literals.
///
/// Every registry key starts out bound to itself; aliases are picked up in
/// program order. `source_map` is only used to put line/column information
/// into failure diagnostics.
pub fn decode_strings(
    program: &mut Program,
    registry: &DecoderRegistry,
    source_map: Option<&SourceMap>,
) -> DecodeSummary {
    if registry.is_empty() {
        debug!("no decoders registered, skipping decoder pass");
        return DecodeSummary::default();
    }

    let mut decoder = StringDecoder {
        registry,
        source_map,
        env: AliasEnvironment::seeded(registry),
        summary: DecodeSummary::default(),
    };
    program.visit_mut_with(&mut decoder);

    info!(
        decoders = registry.len(),
        decoded = decoder.summary.decoded,
        failed = decoder.summary.failures.len(),
        "decoder pass finished"
    );
    decoder.summary
}

struct StringDecoder<'a> {
    registry: &'a DecoderRegistry,
    source_map: Option<&'a SourceMap>,
    env: AliasEnvironment,
    summary: DecodeSummary,
}

impl StringDecoder<'_> {
    /// Runs `visit` against a copy of the current environment and restores
    /// the enclosing environment afterwards.
    fn in_function_scope(&mut self, visit: impl FnOnce(&mut Self)) {
        let enclosing = self.env.clone();
        visit(self);
        self.env = enclosing;
    }

    fn record_alias(&mut self, target: &Ident, source: &Expr) {
        if let Expr::Ident(source) = unparen(source) {
            if let Some(key) = self.env.propagate(&target.sym, &source.sym) {
                debug!(alias = %target.sym, decoder = %key, "recorded decoder alias");
            }
        }
    }

    /// Returns the decoded string if `call` is a one-argument numeric call
    /// through a known alias and the decoder accepts the argument.
    fn try_decode(&mut self, call: &CallExpr) -> Option<String> {
        let Callee::Expr(callee) = &call.callee else {
            return None;
        };
        let Expr::Ident(callee) = unparen(callee) else {
            return None;
        };
        let key = self.env.resolve(&callee.sym)?.clone();

        let [argument] = call.args.as_slice() else {
            return None;
        };
        if argument.spread.is_some() {
            return None;
        }
        let Expr::Lit(Lit::Num(number)) = unparen(&argument.expr) else {
            return None;
        };

        let decoded = index_of(number.value)
            .and_then(|index| self.registry.decode(key.as_str(), index));
        match decoded {
            Ok(value) => {
                debug!(callee = %callee.sym, decoder = %key, argument = number.value, %value, "decoded call");
                self.summary.decoded += 1;
                Some(value)
            }
            Err(error) => {
                let position = self.position(call.span);
                warn!(
                    callee = %callee.sym,
                    decoder = %key,
                    argument = number.value,
                    position = ?position,
                    %error,
                    "failed to decode call, leaving it unchanged"
                );
                self.summary.failures.push(DecodeFailure {
                    callee: callee.sym.to_string(),
                    key,
                    argument: number.value,
                    position,
                    error,
                });
                None
            }
        }
    }

    fn position(&self, span: Span) -> Option<Position> {
        codegen::position(self.source_map?, span)
    }
}

impl VisitMut for StringDecoder<'_> {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if let Expr::Call(call) = expr {
            let span = call.span;
            if let Some(value) = self.try_decode(call) {
                *expr = Expr::Lit(Lit::Str(Str {
                    span,
                    value: value.into(),
                    raw: None,
                }));
                return;
            }
        }
        expr.visit_mut_children_with(self);
    }

    fn visit_mut_var_declarator(&mut self, declarator: &mut VarDeclarator) {
        if let (Pat::Ident(binding), Some(init)) = (&declarator.name, &declarator.init) {
            self.record_alias(&binding.id, init);
        }
        declarator.visit_mut_children_with(self);
    }

    fn visit_mut_assign_expr(&mut self, assign: &mut AssignExpr) {
        if assign.op == AssignOp::Assign {
            if let AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) = &assign.left {
                self.record_alias(&binding.id, &assign.right);
            }
        }
        assign.visit_mut_children_with(self);
    }

    // Function-like nodes own their subtree: children are visited here, once,
    // under a scoped copy of the environment.

    fn visit_mut_function(&mut self, function: &mut Function) {
        self.in_function_scope(|this| function.visit_mut_children_with(this));
    }

    fn visit_mut_arrow_expr(&mut self, arrow: &mut ArrowExpr) {
        self.in_function_scope(|this| arrow.visit_mut_children_with(this));
    }

    fn visit_mut_constructor(&mut self, constructor: &mut Constructor) {
        self.in_function_scope(|this| constructor.visit_mut_children_with(this));
    }

    fn visit_mut_getter_prop(&mut self, getter: &mut GetterProp) {
        self.in_function_scope(|this| getter.visit_mut_children_with(this));
    }

    fn visit_mut_setter_prop(&mut self, setter: &mut SetterProp) {
        self.in_function_scope(|this| setter.visit_mut_children_with(this));
    }
}

fn unparen(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(ParenExpr { expr, .. }) => unparen(expr),
        _ => expr,
    }
}

fn index_of(value: f64) -> Result<i64, DecodeError> {
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        Ok(value as i64)
    } else {
        Err(DecodeError::NonIntegerIndex(value))
    }
}
