use std::sync::LazyLock;

use regex::Regex;
use swc_core::ecma::ast::{ComputedPropName, Expr, Ident, Lit, MemberProp, Program, SuperProp};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};
use tracing::info;

static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_$][a-zA-Z_$0-9]*$").unwrap());

/// Checks whether `value` can be written after a dot, as in `obj.value`.
///
/// # Examples
///
/// ```rust
/// assert!(deobfuscator_rs::is_identifier_name("validName"));
/// assert!(deobfuscator_rs::is_identifier_name("$_x1"));
/// assert!(!deobfuscator_rs::is_identifier_name("not-valid"));
/// assert!(!deobfuscator_rs::is_identifier_name("123x"));
/// assert!(!deobfuscator_rs::is_identifier_name(""));
/// ```
#[inline]
pub fn is_identifier_name(value: &str) -> bool {
    IDENTIFIER_REGEX.is_match(value)
}

/// Rewrites `obj["name"]` into `obj.name` wherever `name` is a plain
/// identifier, returning how many accesses were rewritten.
///
/// Only string-literal properties are touched, so the result is
/// semantically identical to the input and running it again changes nothing.
pub fn normalize_members(program: &mut Program) -> usize {
    let mut normalizer = MemberNormalizer::default();
    program.visit_mut_with(&mut normalizer);

    info!(normalized = normalizer.normalized, "member normalization finished");
    normalizer.normalized
}

#[derive(Default)]
struct MemberNormalizer {
    normalized: usize,
}

impl VisitMut for MemberNormalizer {
    fn visit_mut_member_prop(&mut self, prop: &mut MemberProp) {
        prop.visit_mut_children_with(self);

        if let MemberProp::Computed(computed) = prop {
            if let Some(ident) = dotted_name(computed) {
                *prop = MemberProp::Ident(ident);
                self.normalized += 1;
            }
        }
    }

    fn visit_mut_super_prop(&mut self, prop: &mut SuperProp) {
        prop.visit_mut_children_with(self);

        if let SuperProp::Computed(computed) = prop {
            if let Some(ident) = dotted_name(computed) {
                *prop = SuperProp::Ident(ident);
                self.normalized += 1;
            }
        }
    }
}

fn dotted_name(computed: &ComputedPropName) -> Option<Ident> {
    match &*computed.expr {
        Expr::Lit(Lit::Str(name)) if is_identifier_name(&name.value) => {
            Some(Ident::new(name.value.clone(), name.span))
        }
        _ => None,
    }
}
