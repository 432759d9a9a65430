//! Overload resolution for function calls and operators.
//!
//! Selects the best matching function from a candidate set based on the
//! conversion each argument needs.
//!
//! ## Algorithm
//!
//! 1. Collapse candidates seen through more than one scope (same hash)
//! 2. Discard candidates whose parameter count differs from the argument count
//! 3. Find the cheapest conversion for every argument; any missing one
//!    discards the candidate
//! 4. Keep the candidates no other viable candidate dominates
//! 5. A single survivor wins; otherwise apply the member-vs-free rule or
//!    report the first two survivors as ambiguous
//!
//! Member candidates receive the call's object as a `C*` receiver argument.
//! For operators the object is the left operand, so free candidates take it
//! as their first parameter instead.

mod ranking;

pub use ranking::{dominates, find_best_match};

use std::borrow::Cow;

use ember_core::{
    CompilationError, DataType, FunctionEntry, IntrinsicOp, Param, RefKind, Span, TypeHash,
};

use crate::bound::FunctionRef;
use crate::context::CompilationContext;
use crate::conversion::{ArgDesc, Conversion, ConversionMode, find_conversion};

/// A function considered by overload resolution.
#[derive(Debug, Clone)]
pub struct Candidate<'reg> {
    pub entry: Cow<'reg, FunctionEntry>,
}

impl<'reg> Candidate<'reg> {
    pub fn registered(entry: &'reg FunctionEntry) -> Self {
        Self {
            entry: Cow::Borrowed(entry),
        }
    }

    /// A function with no registry entry (synthesized pointer operators).
    pub fn synthesized(entry: FunctionEntry) -> Self {
        Self {
            entry: Cow::Owned(entry),
        }
    }

    pub fn hash(&self) -> TypeHash {
        self.entry.hash
    }

    pub fn is_member(&self) -> bool {
        self.entry.has_receiver()
    }
}

/// Registered candidates for a list of function hashes.
pub fn registered_candidates<'reg>(
    ctx: &CompilationContext<'reg>,
    hashes: &[TypeHash],
) -> Vec<Candidate<'reg>> {
    hashes
        .iter()
        .filter_map(|h| ctx.function(*h))
        .map(Candidate::registered)
        .collect()
}

/// The arguments of one call.
#[derive(Debug, Clone, Copy)]
pub struct CallShape<'a> {
    /// Object of a member-style call, or the left operand of an operator.
    pub object: Option<&'a ArgDesc>,
    pub args: &'a [ArgDesc],
    /// Free candidates take `object` as their first argument.
    pub object_is_operand: bool,
}

impl<'a> CallShape<'a> {
    pub fn free(args: &'a [ArgDesc]) -> Self {
        Self {
            object: None,
            args,
            object_is_operand: false,
        }
    }

    pub fn method(object: &'a ArgDesc, args: &'a [ArgDesc]) -> Self {
        Self {
            object: Some(object),
            args,
            object_is_operand: false,
        }
    }

    pub fn operator(left: &'a ArgDesc, rest: &'a [ArgDesc]) -> Self {
        Self {
            object: Some(left),
            args: rest,
            object_is_operand: true,
        }
    }

    fn argument_count(&self) -> usize {
        self.args.len() + usize::from(self.object_is_operand && self.object.is_some())
    }
}

/// Result of successful overload resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadMatch {
    pub function: FunctionRef,
    pub is_member: bool,
    /// Conversion of the call's object: the `C*` receiver of a member, or
    /// the left operand of a free operator.
    pub receiver: Option<Conversion>,
    /// Conversions of the remaining arguments, in order.
    pub conversions: Vec<Conversion>,
}

impl OverloadMatch {
    /// Parameter types matched against `conversions`.
    pub fn arg_params(&self) -> &[DataType] {
        if self.receiver.is_some() {
            self.function.params.get(1..).unwrap_or(&[])
        } else {
            &self.function.params
        }
    }

    /// Parameter the receiver conversion targets.
    pub fn receiver_param(&self) -> Option<DataType> {
        self.receiver
            .as_ref()
            .and_then(|_| self.function.params.first().copied())
    }

    /// Sum of all conversion costs.
    pub fn total_cost(&self) -> u32 {
        self.receiver
            .iter()
            .chain(self.conversions.iter())
            .map(|c| c.cost)
            .sum()
    }

    /// `(total cost, total distance)` over every conversion, receiver
    /// included.
    pub fn total_rank(&self) -> (u32, u32) {
        let distance = self
            .receiver
            .iter()
            .chain(self.conversions.iter())
            .map(|c| c.distance)
            .sum();
        (self.total_cost(), distance)
    }
}

/// Resolve a call of the group `name` among `candidates`.
pub fn resolve(
    ctx: &CompilationContext<'_>,
    name: &str,
    candidates: &[Candidate<'_>],
    call: CallShape<'_>,
    mode: ConversionMode,
    span: Span,
) -> Result<OverloadMatch, CompilationError> {
    let mut unique: Vec<&Candidate<'_>> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.iter().any(|c| c.hash() == candidate.hash()) {
            unique.push(candidate);
        }
    }

    let viable: Vec<OverloadMatch> = unique
        .iter()
        .filter_map(|c| match_candidate(ctx, c, call, mode))
        .collect();

    tracing::trace!(
        name,
        candidates = unique.len(),
        viable = viable.len(),
        "resolving overload"
    );

    if viable.is_empty() {
        return Err(no_match_error(ctx, name, &unique, call, span));
    }
    find_best_match(ctx, name, viable, span)
}

/// Try to match the call against one candidate.
fn match_candidate(
    ctx: &CompilationContext<'_>,
    candidate: &Candidate<'_>,
    call: CallShape<'_>,
    mode: ConversionMode,
) -> Option<OverloadMatch> {
    let entry = candidate.entry.as_ref();
    let params: Vec<DataType> = entry.params.iter().map(|p| p.data_type).collect();

    let (receiver, arg_params) = if entry.has_receiver() {
        let object = call.object?;
        let this = ArgDesc::rvalue(object.ty.without_reference().pointer_to());
        let conversion = find_conversion(ctx, &this, params[0], mode)?;
        (Some(conversion), &params[1..])
    } else if call.object_is_operand {
        let object = call.object?;
        let first = params.first()?;
        let conversion = find_conversion(ctx, object, *first, mode)?;
        (Some(conversion), &params[1..])
    } else {
        (None, &params[..])
    };

    if arg_params.len() != call.args.len() {
        return None;
    }

    let conversions = call
        .args
        .iter()
        .zip(arg_params)
        .map(|(arg, param)| find_conversion(ctx, arg, *param, mode))
        .collect::<Option<Vec<_>>>()?;

    Some(OverloadMatch {
        function: FunctionRef::from_entry(entry),
        is_member: entry.has_receiver(),
        receiver,
        conversions,
    })
}

fn no_match_error(
    ctx: &CompilationContext<'_>,
    name: &str,
    candidates: &[&Candidate<'_>],
    call: CallShape<'_>,
    span: Span,
) -> CompilationError {
    let found = call.argument_count();
    if let [only] = candidates {
        let expected = if only.is_member() && !call.object_is_operand {
            only.entry.arity() - 1
        } else {
            only.entry.arity()
        };
        if expected != found {
            return CompilationError::ArgumentCountMismatch {
                name: name.to_string(),
                expected,
                found,
                span,
            };
        }
    }

    let args = call
        .object
        .filter(|_| call.object_is_operand)
        .into_iter()
        .chain(call.args.iter())
        .map(|a| ctx.type_name(&a.ty))
        .collect::<Vec<_>>()
        .join(", ");
    CompilationError::NoMatchingOverload {
        name: name.to_string(),
        args,
        span,
    }
}

/// `name(T1, T2)` of a candidate for diagnostics.
pub(crate) fn signature(ctx: &CompilationContext<'_>, function: &FunctionRef) -> String {
    let params = if function.receiver.is_some() {
        function.params.get(1..).unwrap_or(&[])
    } else {
        &function.params[..]
    };
    let params: Vec<String> = params.iter().map(|p| ctx.type_name(p)).collect();
    match function.receiver {
        Some(receiver) => format!(
            "{}::{}({})",
            ctx.type_name(&DataType::simple(receiver.base)),
            function.name,
            params.join(", ")
        ),
        None => format!("{}({})", function.name, params.join(", ")),
    }
}

// ============================================================================
// Pointer Operators
// ============================================================================

/// Raw pointer operators for the pointer operands of an operator call.
///
/// Pointer types have no registry entries, so `+`, `-`, `==`, `<`, `++` and
/// `--` on pointers are synthesized per pointer type seen among the operands.
pub fn pointer_operators(name: &str, operands: &[&ArgDesc]) -> Vec<Candidate<'static>> {
    let long = DataType::basic(ember_core::BasicKind::Long);
    let mut out: Vec<Candidate<'static>> = Vec::new();

    for operand in operands {
        let ptr = operand.ty.without_reference();
        if ptr.pointers == 0 {
            continue;
        }
        let ptr_ref = ptr.with_reference(RefKind::LValue);
        let entries = match name {
            "operator+" => vec![raw(IntrinsicOp::PtrOffset, &[ptr, long], ptr)],
            "operator-" => vec![
                raw(IntrinsicOp::PtrNegOffset, &[ptr, long], ptr),
                raw(IntrinsicOp::PtrDiff, &[ptr, ptr], long),
            ],
            "operator==" => vec![raw(IntrinsicOp::Equal, &[ptr, ptr], DataType::bool())],
            "operator<" => vec![raw(IntrinsicOp::Less, &[ptr, ptr], DataType::bool())],
            "operator++" => vec![raw(IntrinsicOp::Increment, &[ptr_ref], ptr_ref)],
            "operator--" => vec![raw(IntrinsicOp::Decrement, &[ptr_ref], ptr_ref)],
            _ => Vec::new(),
        };
        for entry in entries {
            if !out.iter().any(|c| c.hash() == entry.hash) {
                out.push(Candidate::synthesized(entry));
            }
        }
    }

    out
}

fn raw(op: IntrinsicOp, params: &[DataType], result: DataType) -> FunctionEntry {
    let params = params
        .iter()
        .enumerate()
        .map(|(i, ty)| Param::new(format!("p{i}"), *ty))
        .collect();
    FunctionEntry::free(op.group_name(), params, result)
        .with_intrinsic(op)
}
