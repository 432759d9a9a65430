//! Ranking of viable overload candidates.
//!
//! Candidates compare argument by argument on each conversion's
//! `(cost, distance)`. A candidate dominates another when it is no worse on
//! every argument and strictly better on at least one; the receiver takes
//! part only when both candidates have one.
//!
//! When member and free candidates survive together, a single member whose
//! object needs no conversion wins. Otherwise the lowest total rank, receiver
//! conversion included, wins; a tie is ambiguous.

use ember_core::{CompilationError, Span};

use super::{OverloadMatch, signature};
use crate::context::CompilationContext;

/// Whether `a` is a strictly better match than `b`.
pub fn dominates(a: &OverloadMatch, b: &OverloadMatch) -> bool {
    let mut pairs: Vec<((u32, u32), (u32, u32))> = a
        .conversions
        .iter()
        .zip(&b.conversions)
        .map(|(x, y)| (x.rank(), y.rank()))
        .collect();
    if let (Some(x), Some(y)) = (&a.receiver, &b.receiver) {
        pairs.push((x.rank(), y.rank()));
    }

    pairs.iter().all(|(x, y)| x <= y) && pairs.iter().any(|(x, y)| x < y)
}

/// Select the best of the viable candidates.
pub fn find_best_match(
    ctx: &CompilationContext<'_>,
    name: &str,
    viable: Vec<OverloadMatch>,
    span: Span,
) -> Result<OverloadMatch, CompilationError> {
    let maximal: Vec<&OverloadMatch> = viable
        .iter()
        .filter(|m| !viable.iter().any(|other| dominates(other, m)))
        .collect();

    match maximal.as_slice() {
        [] => Err(CompilationError::internal(format!(
            "overload resolution of '{name}' left no undominated candidate"
        ))),
        [only] => Ok((*only).clone()),
        [first, second, ..] => {
            if let Some(member) = preferred_member(&maximal) {
                tracing::trace!(name, function = %member.function.name, "member preferred over free");
                return Ok(member.clone());
            }
            if let Some(best) = lowest_total_rank(&maximal) {
                tracing::trace!(
                    name,
                    function = %best.function.name,
                    rank = ?best.total_rank(),
                    "member and free resolved by total rank"
                );
                return Ok(best.clone());
            }
            Err(CompilationError::AmbiguousOverload {
                name: name.to_string(),
                first: signature(ctx, &first.function),
                second: signature(ctx, &second.function),
                span,
            })
        }
    }
}

/// A single member candidate whose object needs no conversion wins over
/// equally good free candidates.
fn preferred_member<'a>(maximal: &[&'a OverloadMatch]) -> Option<&'a OverloadMatch> {
    let mut members = maximal.iter().filter(|m| m.is_member);
    let member = members.next()?;
    if members.next().is_some() {
        return None;
    }
    member
        .receiver
        .as_ref()
        .is_some_and(|r| r.is_exact())
        .then_some(*member)
}

/// The unique lowest total rank among mixed member and free survivors.
fn lowest_total_rank<'a>(maximal: &[&'a OverloadMatch]) -> Option<&'a OverloadMatch> {
    let mixed = maximal.iter().any(|m| m.is_member) && maximal.iter().any(|m| !m.is_member);
    if !mixed {
        return None;
    }
    let best = maximal.iter().map(|m| m.total_rank()).min()?;
    let mut lowest = maximal.iter().filter(|m| m.total_rank() == best);
    let winner = lowest.next()?;
    lowest.next().is_none().then_some(*winner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::FunctionRef;
    use crate::conversion::{Conversion, ConversionKind};
    use ember_core::{BasicKind, DataType, FunctionEntry, TypeHash};
    use ember_registry::SymbolRegistry;

    fn widening() -> Conversion {
        Conversion::implicit(
            ConversionKind::Basic {
                from: BasicKind::Int,
                to: BasicKind::Long,
            },
            Conversion::COST_WIDENING,
        )
    }

    /// A match whose parameters are `long`, one per argument, after a `C*`
    /// receiver for members.
    fn make_match(
        name: &str,
        member: bool,
        receiver: Option<Conversion>,
        args: Vec<Conversion>,
    ) -> OverloadMatch {
        let mut function =
            FunctionRef::from_entry(&FunctionEntry::free(name, vec![], DataType::void()));
        function.hash = TypeHash::from_name(name);
        function.params = args.iter().map(|_| DataType::basic(BasicKind::Long)).collect();
        if member {
            let this = DataType::simple(TypeHash::from_name("C")).pointer_to();
            function.receiver = Some(this);
            function.params.insert(0, this);
        }
        OverloadMatch {
            function,
            is_member: member,
            receiver,
            conversions: args,
        }
    }

    #[test]
    fn dominance_needs_one_strict_improvement() {
        let a = make_match("a", false, None, vec![Conversion::identity(), widening()]);
        let b = make_match("b", false, None, vec![widening(), widening()]);
        assert!(dominates(&a, &b));
        assert!(!dominates(&b, &a));
        assert!(!dominates(&a, &a.clone()));
    }

    #[test]
    fn lower_rank_wins() {
        let registry = SymbolRegistry::with_basic_types();
        let ctx = CompilationContext::new(&registry);
        let best = make_match("best", false, None, vec![Conversion::identity()]);
        let worse = make_match("worse", false, None, vec![widening()]);

        let m = find_best_match(&ctx, "f", vec![worse, best.clone()], Span::default()).unwrap();
        assert_eq!(m.function.hash, best.function.hash);
    }

    #[test]
    fn exact_member_beats_equal_free() {
        let registry = SymbolRegistry::with_basic_types();
        let ctx = CompilationContext::new(&registry);
        let member = make_match("member", true, Some(Conversion::identity()), vec![widening()]);
        let free = make_match("free", false, None, vec![widening()]);

        let m = find_best_match(&ctx, "f", vec![free, member.clone()], Span::default()).unwrap();
        assert_eq!(m.function.hash, member.function.hash);
    }

    fn qualification() -> Conversion {
        Conversion::implicit(ConversionKind::Qualification, Conversion::COST_QUALIFICATION)
    }

    #[test]
    fn converted_member_loses_to_cheaper_free() {
        let registry = SymbolRegistry::with_basic_types();
        let ctx = CompilationContext::new(&registry);
        let member = make_match("member", true, Some(qualification()), vec![widening()]);
        let free = make_match("free", false, None, vec![widening()]);

        let m = find_best_match(&ctx, "f", vec![member, free.clone()], Span::default()).unwrap();
        assert_eq!(m.function.hash, free.function.hash);
    }

    #[test]
    fn converted_member_wins_when_free_costs_more() {
        let registry = SymbolRegistry::with_basic_types();
        let ctx = CompilationContext::new(&registry);
        let member = make_match(
            "member",
            true,
            Some(qualification()),
            vec![Conversion::identity(), qualification()],
        );
        let free = make_match("free", false, None, vec![widening(), Conversion::identity()]);

        let m = find_best_match(&ctx, "f", vec![free, member.clone()], Span::default()).unwrap();
        assert_eq!(m.function.hash, member.function.hash);
    }

    #[test]
    fn equal_total_rank_is_ambiguous() {
        let registry = SymbolRegistry::with_basic_types();
        let ctx = CompilationContext::new(&registry);
        let member = make_match(
            "member",
            true,
            Some(qualification()),
            vec![widening(), Conversion::identity()],
        );
        let free = make_match("free", false, None, vec![qualification(), widening()]);

        let err = find_best_match(&ctx, "f", vec![member, free], Span::default()).unwrap_err();
        assert!(matches!(err, CompilationError::AmbiguousOverload { .. }));
    }

    #[test]
    fn two_free_candidates_never_use_total_rank() {
        let registry = SymbolRegistry::with_basic_types();
        let ctx = CompilationContext::new(&registry);
        let a = make_match("a", false, None, vec![Conversion::identity(), widening()]);
        let b = make_match("b", false, None, vec![widening(), qualification()]);

        let err = find_best_match(&ctx, "f", vec![a, b], Span::default()).unwrap_err();
        assert!(matches!(err, CompilationError::AmbiguousOverload { .. }));
    }
}
