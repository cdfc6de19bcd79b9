use psdc_ast::{BracedItem, DirectiveKind};
use psdc_sema::initializer::{InitializerPath, PathStep};
use psdc_sema::{Analysis, Code, EvaluatedType, Symbol, Value};

mod common;
use common::builders::*;
use common::{codes, find, run_quiet};

fn constant_value(analysis: &Analysis, name: &str) -> Value {
    match analysis.scopes.get_local(analysis.scopes.root(), name) {
        Some(Symbol::Constant { value, .. }) => value.clone(),
        other => panic!("expected constant {name}, got {other:?}"),
    }
}

fn integers(value: &Value) -> Vec<Option<i32>> {
    value
        .elements()
        .expect("comptime array")
        .iter()
        .map(Value::as_integer)
        .collect()
}

fn point() -> psdc_ast::Declaration {
    type_alias("Point", t_struct(vec![("x", t_int()), ("y", t_int())]))
}

#[test]
fn positional_structure_initializer() {
    let algorithm = program(vec![
        point(),
        constant(t_alias("Point"), "P", ints(&[3, 4])),
    ]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");

    let p = constant_value(&analysis, "P");
    assert!(matches!(p.ty, EvaluatedType::Alias { .. }));
    assert_eq!(p.component("x").and_then(Value::as_integer), Some(3));
    assert_eq!(p.component("y").and_then(Value::as_integer), Some(4));
}

#[test]
fn component_designator_leaves_others_at_default() {
    let algorithm = program(vec![
        point(),
        constant(
            t_alias("Point"),
            "P",
            braced(vec![item_at(vec![d_field("y")], init(int(9)))]),
        ),
    ]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");

    let p = constant_value(&analysis, "P");
    assert_eq!(p.component("x").and_then(Value::as_integer), Some(0));
    assert_eq!(p.component("y").and_then(Value::as_integer), Some(9));
}

#[test]
fn positional_items_past_the_last_component() {
    let algorithm = program(vec![
        point(),
        constant(
            t_alias("Point"),
            "P",
            braced(vec![
                item_at(vec![d_field("x")], init(int(1))),
                item(init(int(2))),
                item(init(int(3))),
            ]),
        ),
    ]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert_eq!(codes(&diagnostics), vec![Code::ExcessElementInInitializer]);

    let p = constant_value(&analysis, "P");
    assert_eq!(p.component("x").and_then(Value::as_integer), Some(1));
    assert_eq!(p.component("y").and_then(Value::as_integer), Some(2));
}

#[test]
fn excess_array_elements_are_each_reported() {
    let algorithm = program(vec![constant(
        t_array(t_int(), vec![int(2)]),
        "T",
        ints(&[1, 2, 3, 4]),
    )]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert_eq!(
        codes(&diagnostics),
        vec![Code::ExcessElementInInitializer, Code::ExcessElementInInitializer]
    );
    assert_eq!(integers(&constant_value(&analysis, "T")), vec![Some(1), Some(2)]);
}

#[test]
fn nested_braces_fill_a_matrix() {
    let algorithm = program(vec![constant(
        t_array(t_int(), vec![int(2), int(2)]),
        "M",
        braced(vec![item(ints(&[1, 2])), item(ints(&[3, 4]))]),
    )]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");

    let m = constant_value(&analysis, "M");
    let rows: Vec<&Value> = m.elements().expect("comptime matrix").iter().collect();
    assert_eq!(integers(rows[0]), vec![Some(1), Some(2)]);
    assert_eq!(integers(rows[1]), vec![Some(3), Some(4)]);
}

#[test]
fn designator_chain_then_positional_item() {
    let algorithm = program(vec![constant(
        t_array(t_int(), vec![int(2), int(2)]),
        "M",
        braced(vec![
            item_at(vec![d_index(int(2)), d_index(int(1))], init(int(7))),
            item(init(int(8))),
        ]),
    )]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");

    let m = constant_value(&analysis, "M");
    let rows: Vec<&Value> = m.elements().expect("comptime matrix").iter().collect();
    assert_eq!(integers(rows[0]), vec![Some(0), Some(0)]);
    assert_eq!(integers(rows[1]), vec![Some(7), Some(8)]);
}

#[test]
fn out_of_bounds_designator() {
    let algorithm = program(vec![constant(
        t_array(t_int(), vec![int(3)]),
        "T",
        braced(vec![
            item_at(vec![d_index(int(4))], init(int(1))),
            item(init(int(5))),
        ]),
    )]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert_eq!(codes(&diagnostics), vec![Code::IndexOutOfBounds]);
    assert_eq!(diagnostics[0].advice, vec!["indexed at 4, length is 3".to_string()]);

    // The failed designator does not move the cursor.
    assert_eq!(
        integers(&constant_value(&analysis, "T")),
        vec![Some(5), Some(0), Some(0)]
    );
}

#[test]
fn designator_of_the_wrong_kind() {
    let algorithm = program(vec![
        point(),
        constant(
            t_alias("Point"),
            "P",
            braced(vec![item_at(vec![d_index(int(1))], init(int(1)))]),
        ),
        constant(
            t_array(t_int(), vec![int(2)]),
            "T",
            braced(vec![item_at(vec![d_field("x")], init(int(1)))]),
        ),
    ]);
    let (_, diagnostics) = run_quiet(&algorithm);
    assert_eq!(
        codes(&diagnostics),
        vec![Code::UnsupportedDesignator, Code::UnsupportedDesignator]
    );
    assert_eq!(
        diagnostics[0].message,
        "unsupported designator in 'Point' initializer"
    );
}

#[test]
fn designator_naming_a_missing_component() {
    let algorithm = program(vec![
        point(),
        constant(
            t_alias("Point"),
            "P",
            braced(vec![item_at(vec![d_field("z")], init(int(1)))]),
        ),
    ]);
    let (_, diagnostics) = run_quiet(&algorithm);
    assert_eq!(codes(&diagnostics), vec![Code::StructureComponentDoesntExist]);
}

#[test]
fn designator_index_must_be_a_constant_integer() {
    let algorithm = program(vec![main_program(vec![
        local(t_int(), &["i"], None),
        local(
            t_array(t_int(), vec![int(3)]),
            &["A"],
            Some(braced(vec![
                item_at(vec![d_index(var("i"))], init(int(1))),
                item_at(vec![d_index(boolean(true))], init(int(2))),
            ])),
        ),
    ])]);
    let (_, diagnostics) = run_quiet(&algorithm);
    assert_eq!(
        codes(&diagnostics),
        vec![Code::ConstantExpressionExpected, Code::NonIntegerIndex]
    );
}

#[test]
fn braced_initializer_on_a_scalar() {
    let algorithm = program(vec![main_program(vec![local(
        t_int(),
        &["x"],
        Some(ints(&[1])),
    )])]);
    let (_, diagnostics) = run_quiet(&algorithm);
    assert_eq!(codes(&diagnostics), vec![Code::UnsupportedInitializer]);
    assert_eq!(
        diagnostics[0].message,
        "unsupported initializer for type `entier`"
    );
}

#[test]
fn braced_initializer_on_an_unknown_type_is_not_reported() {
    let algorithm = program(vec![main_program(vec![local(
        t_alias("Inconnu"),
        &["x"],
        Some(ints(&[1, 2])),
    )])]);
    let (_, diagnostics) = run_quiet(&algorithm);
    assert_eq!(codes(&diagnostics), vec![Code::UndefinedSymbol]);
    assert_eq!(diagnostics[0].message, "undefined type alias `Inconnu`");
}

#[test]
fn item_of_the_wrong_type() {
    let algorithm = program(vec![constant(
        t_array(t_int(), vec![int(2)]),
        "T",
        braced(vec![item(init(string("a"))), item(init(int(2)))]),
    )]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    let d = find(&diagnostics, Code::ExpressionHasWrongType);
    assert_eq!(d.message, "can't convert expression of type 'chaîne(1)' to 'entier'");

    let values = constant_value(&analysis, "T");
    let items = values.elements().expect("comptime array");
    assert!(items.get(0).is_some_and(Value::is_invalid));
    assert_eq!(items.get(1).and_then(Value::as_integer), Some(2));
}

#[test]
fn integer_item_promoted_into_real_array() {
    let algorithm = program(vec![constant(
        t_array(t_real(), vec![int(2)]),
        "R",
        braced(vec![item(init(int(1))), item(init(real(2.5)))]),
    )]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");

    let r = constant_value(&analysis, "R");
    let items = r.elements().expect("comptime array");
    let first = items.get(0).expect("first element");
    assert_eq!(first.as_real(), Some(1.0));
    assert!(matches!(first.ty, EvaluatedType::Real));
    assert_eq!(items.get(1).and_then(Value::as_real), Some(2.5));
}

#[test]
fn huge_arrays_only_store_written_elements() {
    let algorithm = program(vec![
        constant(t_array(t_int(), vec![int(2_000_000_000)]), "T", ints(&[1])),
        constant(
            t_array(t_int(), vec![int(50_000), int(50_000)]),
            "M",
            braced(vec![item(ints(&[1]))]),
        ),
    ]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");

    let t = constant_value(&analysis, "T");
    let elements = t.elements().expect("comptime array");
    assert_eq!(elements.len(), 2_000_000_000);
    assert_eq!(elements.written_len(), 1);
    assert_eq!(elements.get(0).and_then(Value::as_integer), Some(1));
    assert_eq!(elements.get(1_999_999_999).and_then(Value::as_integer), Some(0));
    assert!(elements.get(2_000_000_000).is_none());

    let m = constant_value(&analysis, "M");
    let rows = m.elements().expect("comptime matrix");
    assert_eq!(rows.written_len(), 1);
    let first = rows.get(0).and_then(Value::elements).expect("first row");
    assert_eq!(first.written_len(), 1);
    assert_eq!(first.get(0).and_then(Value::as_integer), Some(1));
    assert_eq!(
        rows.get(49_999).and_then(Value::elements).map(|row| row.len()),
        Some(50_000)
    );
}

#[test]
fn long_array_values_are_shown_abbreviated() {
    let algorithm = program(vec![constant(
        t_array(t_int(), vec![int(10)]),
        "T",
        ints(&[1, 2]),
    )]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    assert_eq!(
        constant_value(&analysis, "T").status.to_string(),
        "{1, 2, 0, 0, 0, 0, 0, 0, (2 more...)}"
    );
}

#[test]
fn directives_between_items_take_no_position() {
    let failing = directive(DirectiveKind::Assert {
        expr: boolean(false),
        message: None,
    });
    let algorithm = program(vec![constant(
        t_array(t_int(), vec![int(2)]),
        "T",
        braced_entries(vec![
            BracedItem::Value(item(init(int(1)))),
            BracedItem::Directive(failing),
            BracedItem::Value(item(init(int(2)))),
        ]),
    )]);
    let (analysis, diagnostics) = run_quiet(&algorithm);
    assert_eq!(codes(&diagnostics), vec![Code::AssertionFailed]);
    assert_eq!(integers(&constant_value(&analysis, "T")), vec![Some(1), Some(2)]);
}

#[test]
fn path_advances_innermost_level_first() {
    let matrix = EvaluatedType::array(EvaluatedType::array(EvaluatedType::Integer, 3), 2);
    let path = InitializerPath::from_steps(
        vec![PathStep::Index(0), PathStep::Index(1)],
        EvaluatedType::Integer,
    )
    .expect("non-empty path");

    let next = path.advance(&matrix).expect("[1][3] follows [1][2]");
    assert_eq!(next.steps(), vec![&PathStep::Index(0), &PathStep::Index(2)]);
    assert!(matches!(next.ty(), EvaluatedType::Integer));

    let row = next.advance(&matrix).expect("second row follows the first");
    assert_eq!(row.steps(), vec![&PathStep::Index(1)]);
    assert_eq!(row.ty().dimensions(), vec![3]);

    assert!(row.advance(&matrix).is_none());
}

#[test]
fn path_reads_back_what_it_wrote() {
    let matrix = EvaluatedType::array(EvaluatedType::array(EvaluatedType::Integer, 2), 2);
    let mut value = matrix.default_value();
    let path = InitializerPath::from_steps(
        vec![PathStep::Index(1), PathStep::Index(0)],
        EvaluatedType::Integer,
    )
    .expect("non-empty path");

    path.set_value(&mut value, Value::integer(42));
    assert_eq!(path.get_value(&value).and_then(Value::as_integer), Some(42));

    let first = InitializerPath::first_object(&matrix).expect("matrix has rows");
    let untouched = first.get_value(&value).expect("row is comptime");
    assert_eq!(integers(untouched), vec![Some(0), Some(0)]);
}
