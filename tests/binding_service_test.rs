//! Integration tests for binding names and binding cleanup after removals.

use dataform::application::services::{BindingService, DataSourceService};
use dataform::application::DataFormController;
use dataform::domain::{BindingSheetInfo, CellRange, DataType, NodeId, NodeRecord};
use dataform::util::testing;

fn sheet(row: u32) -> BindingSheetInfo {
    BindingSheetInfo {
        unit_id: "workbook-1".into(),
        sub_unit_id: "sheet-1".into(),
        range: CellRange {
            start_row: row,
            start_column: 0,
            end_row: row,
            end_column: 0,
        },
    }
}

fn records() -> Vec<NodeRecord> {
    vec![
        NodeRecord::new("field1", DataType::Text),
        NodeRecord::new("customer", DataType::Namespace).with_children(vec![
            NodeRecord::new("name", DataType::Text),
            NodeRecord::new("orders", DataType::Table)
                .with_children(vec![NodeRecord::new("amount", DataType::Number)]),
        ]),
    ]
}

fn id_at(source: &DataSourceService, path: &[&str]) -> NodeId {
    source.find_by_path(path).unwrap().id.clone()
}

#[test]
fn given_node_bound_twice_when_generating_names_then_second_gets_count_suffix() {
    testing::init_test_setup();
    let source = DataSourceService::from_records(&records()).unwrap();
    let field1 = source.get_by_id(&id_at(&source, &["field1"])).unwrap();
    let mut bindings = BindingService::default();

    let first = bindings.bind_node(field1, sheet(1)).unwrap();
    let second = bindings.bind_node(field1, sheet(2)).unwrap();

    assert_eq!(first.name, "field1");
    assert_eq!(second.name, "field11");
    assert_eq!(bindings.get_bindings_by_node_id(&field1.id).len(), 2);
}

#[test]
fn given_many_bindings_when_generated_then_names_are_unique() {
    let source = DataSourceService::from_records(&records()).unwrap();
    let mut bindings = BindingService::default();
    let paths: [&[&str]; 3] = [
        &["field1"],
        &["customer", "name"],
        &["customer", "orders", "amount"],
    ];
    for path in paths {
        let node = source.get_by_id(&id_at(&source, path)).unwrap();
        for row in 0..4 {
            bindings.bind_node(node, sheet(row)).unwrap();
        }
    }

    let mut names: Vec<_> = bindings.bindings().iter().map(|b| b.name.clone()).collect();
    let total = names.len();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), total);
}

#[test]
fn given_removed_node_when_engine_only_then_bindings_stay_stale() {
    let mut source = DataSourceService::from_records(&records()).unwrap();
    let field1 = id_at(&source, &["field1"]);
    let mut bindings = BindingService::default();
    bindings
        .bind_node(source.get_by_id(&field1).unwrap(), sheet(1))
        .unwrap();
    bindings
        .bind_node(source.get_by_id(&field1).unwrap(), sheet(2))
        .unwrap();

    source.remove_node(&field1).unwrap();

    // the engine never touches the registry
    assert_eq!(bindings.get_bindings_by_node_id(&field1).len(), 2);

    let purged = bindings.purge_missing(source.tree());
    assert_eq!(purged.len(), 2);
    assert!(bindings.get_bindings_by_node_id(&field1).is_empty());
}

#[test]
fn given_removed_node_when_removed_through_controller_then_bindings_cascade() {
    let mut controller = DataFormController::new(
        DataSourceService::from_records(&records()).unwrap(),
        BindingService::default(),
    );
    let field1 = id_at(controller.source(), &["field1"]);
    let name = id_at(controller.source(), &["customer", "name"]);
    controller.bind_node(&field1, sheet(1)).unwrap();
    controller.bind_node(&field1, sheet(2)).unwrap();
    controller.bind_node(&name, sheet(3)).unwrap();

    controller.remove_node(&field1).unwrap();

    assert!(controller.get_bindings_by_node_id(&field1).is_empty());
    assert_eq!(controller.get_bindings_by_node_id(&name).len(), 1);
}

#[test]
fn given_bound_descendant_when_ancestor_removed_then_cascade_covers_subtree() {
    let mut controller = DataFormController::new(
        DataSourceService::from_records(&records()).unwrap(),
        BindingService::default(),
    );
    let customer = id_at(controller.source(), &["customer"]);
    let amount = id_at(controller.source(), &["customer", "orders", "amount"]);
    controller.bind_node(&amount, sheet(5)).unwrap();

    let removed = controller.remove_node(&customer).unwrap();

    assert!(removed.contains(&amount));
    assert!(controller.bindings().bindings().is_empty());
}

#[test]
fn given_binding_when_unbound_then_name_is_free_again() {
    let mut controller = DataFormController::new(
        DataSourceService::from_records(&records()).unwrap(),
        BindingService::default(),
    );
    let field1 = id_at(controller.source(), &["field1"]);
    let binding = controller.bind_node(&field1, sheet(1)).unwrap();

    controller.unbind(&binding.name).unwrap();
    assert!(controller.unbind(&binding.name).is_err());

    let again = controller.bind_node(&field1, sheet(1)).unwrap();
    assert_eq!(again.name, "field1");
}

#[test]
fn given_renamed_node_when_bound_then_binding_survives_and_new_name_used() {
    let mut controller = DataFormController::new(
        DataSourceService::from_records(&records()).unwrap(),
        BindingService::default(),
    );
    let field1 = id_at(controller.source(), &["field1"]);
    controller.bind_node(&field1, sheet(1)).unwrap();

    controller.source_mut().rename(&field1, "total").unwrap();
    let next = controller.bind_node(&field1, sheet(2)).unwrap();

    assert_eq!(next.name, "total1");
    assert_eq!(controller.get_bindings_by_node_id(&field1).len(), 2);
}
