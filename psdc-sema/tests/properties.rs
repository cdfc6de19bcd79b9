use miette::Result;
use proptest::{
    prelude::{any, prop},
    test_runner::{Config, TestCaseError, TestRunner},
};
use psdc_ast::{span, BinaryOp};
use psdc_sema::fold::{evaluate_binary, OperationMessage};
use psdc_sema::{Code, EvaluatedType, Symbol, Value, ValueStatus};

mod common;
use common::builders::*;
use common::{codes, run, run_quiet};

fn runner() -> TestRunner {
    TestRunner::new(Config {
        cases: 64,
        ..Config::default()
    })
}

fn base_type(choice: u8) -> EvaluatedType {
    match choice % 5 {
        0 => EvaluatedType::Boolean,
        1 => EvaluatedType::Integer,
        2 => EvaluatedType::LengthedString(usize::from(choice) + 1),
        3 => EvaluatedType::array(EvaluatedType::Real, usize::from(choice % 7) + 1),
        _ => EvaluatedType::Structure(vec![("a".to_string(), EvaluatedType::Character)]),
    }
}

#[test]
fn unaliasing_is_idempotent() -> Result<()> {
    runner()
        .run(&(any::<u8>(), 0usize..6), |(choice, depth)| {
            let base = base_type(choice);
            let aliased = (0..depth).fold(base.clone(), |ty, i| {
                EvaluatedType::alias(format!("A{i}"), ty)
            });

            let once = aliased.unaliased();
            proptest::prop_assert!(!matches!(once, EvaluatedType::Alias { .. }), "unaliased() returned an alias");
            proptest::prop_assert!(std::ptr::eq(once, once.unaliased()));
            proptest::prop_assert!(once.semantically_equals(&base));
            Ok(())
        })
        .map_err(|e| miette::miette!("alias property failed: {e}"))?;
    Ok(())
}

#[test]
fn aliases_are_semantically_equal_to_their_target() -> Result<()> {
    runner()
        .run(&(any::<u8>(), 1usize..6), |(choice, depth)| {
            let base = base_type(choice);
            let aliased = (0..depth).fold(base.clone(), |ty, i| {
                EvaluatedType::alias(format!("A{i}"), ty)
            });
            proptest::prop_assert!(aliased.semantically_equals(&base));
            proptest::prop_assert!(base.is_assignable_to(&aliased));
            proptest::prop_assert_eq!(aliased.display(), format!("A{}", depth - 1));
            Ok(())
        })
        .map_err(|e| miette::miette!("alias equality property failed: {e}"))?;
    Ok(())
}

#[test]
fn integer_division_agrees_with_runtime_arithmetic() -> Result<()> {
    runner()
        .run(&(any::<i32>(), any::<i32>()), |(a, b)| {
            for op in [BinaryOp::Divide, BinaryOp::Modulus] {
                let result = evaluate_binary(op, &Value::integer(a), &Value::integer(b), span(0, 1));
                let expected = match op {
                    BinaryOp::Divide => a.checked_div(b),
                    _ => (b != 0).then(|| a.wrapping_rem(b)),
                };
                let messages = if b == 0 {
                    vec![OperationMessage::DivisionByZero]
                } else if expected.is_none() {
                    vec![OperationMessage::IntegerOverflow]
                } else {
                    Vec::new()
                };
                proptest::prop_assert_eq!(result.messages.clone(), messages);
                match expected {
                    Some(n) => proptest::prop_assert_eq!(result.value.as_integer(), Some(n)),
                    None => proptest::prop_assert!(matches!(
                        result.value.status,
                        ValueStatus::Runtime
                    )),
                }
            }
            Ok(())
        })
        .map_err(|e| miette::miette!("division property failed: {e}"))?;
    Ok(())
}

#[test]
fn positional_items_fill_in_order() -> Result<()> {
    let strat = (1i32..8, prop::collection::vec(-100i32..100, 0..12));
    runner()
        .run(&strat, |(length, items)| {
            let algorithm = program(vec![constant(
                t_array(t_int(), vec![int(length)]),
                "T",
                ints(&items),
            )]);
            let (analysis, diagnostics) = run_quiet(&algorithm);

            let length = usize::try_from(length).map_err(|e| TestCaseError::fail(e.to_string()))?;
            let excess = items.len().saturating_sub(length);
            proptest::prop_assert_eq!(
                codes(&diagnostics),
                vec![Code::ExcessElementInInitializer; excess]
            );

            let Some(Symbol::Constant { value, .. }) =
                analysis.scopes.get_local(analysis.scopes.root(), "T")
            else {
                return Err(TestCaseError::fail("constant T missing"));
            };
            let elements = value
                .elements()
                .ok_or_else(|| TestCaseError::fail("T is not a comptime array"))?;
            proptest::prop_assert_eq!(elements.len(), length);
            for (i, element) in elements.iter().enumerate() {
                let expected = items.get(i).copied().unwrap_or(0);
                proptest::prop_assert_eq!(element.as_integer(), Some(expected));
            }
            Ok(())
        })
        .map_err(|e| miette::miette!("initializer property failed: {e}"))?;
    Ok(())
}

#[test]
fn analysis_is_deterministic() -> Result<()> {
    let strat = prop::collection::vec((any::<bool>(), -3i32..3), 0..10);
    runner()
        .run(&strat, |stmts| {
            let body = stmts
                .iter()
                .enumerate()
                .map(|(i, &(declare, n))| {
                    if declare {
                        local(t_int(), &["x"], Some(init(int(n))))
                    } else {
                        let target = if i % 2 == 0 { "x" } else { "y" };
                        assign(lvar(target), bin(BinaryOp::Divide, int(1), int(n)))
                    }
                })
                .collect();
            let algorithm = program(vec![main_program(body)]);

            let (first, a) = run(&algorithm);
            let (second, b) = run(&algorithm);
            proptest::prop_assert_eq!(&a, &b);
            proptest::prop_assert_eq!(first.counts, second.counts);
            proptest::prop_assert_eq!(first.scopes.len(), second.scopes.len());
            Ok(())
        })
        .map_err(|e| miette::miette!("determinism property failed: {e}"))?;
    Ok(())
}
