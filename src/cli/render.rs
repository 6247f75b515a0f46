//! Terminal tree view of a data-source forest

use generational_arena::Index;
use itertools::Itertools;
use termtree::Tree;

use crate::application::DataFormController;
use crate::domain::DataNode;

/// Render the forest under a `title` root, annotating bound nodes with their binding names.
pub fn render_tree(controller: &DataFormController, title: &str, show_ids: bool) -> Tree<String> {
    let tree = controller.source().tree();
    let mut root = Tree::new(title.to_string());

    fn build_tree(
        controller: &DataFormController,
        node_idx: Index,
        show_ids: bool,
        parent_tree: &mut Tree<String>,
    ) {
        let tree = controller.source().tree();
        if let Some(node) = tree.get_node(node_idx) {
            let mut node_tree = Tree::new(label(controller, node, show_ids));
            for &child_idx in node.children() {
                build_tree(controller, child_idx, show_ids, &mut node_tree);
            }
            parent_tree.push(node_tree);
        }
    }

    for &idx in tree.roots() {
        build_tree(controller, idx, show_ids, &mut root);
    }
    root
}

fn label(controller: &DataFormController, node: &DataNode, show_ids: bool) -> String {
    let name = if node.name.is_empty() {
        "<unnamed>"
    } else {
        node.name.as_str()
    };
    let mut out = format!("{} [{}]", name, node.data_type());
    if show_ids {
        out.push_str(&format!(" ({})", node.id));
    }
    let bound = controller.get_bindings_by_node_id(&node.id);
    if !bound.is_empty() {
        out.push_str(" -> ");
        out.push_str(&bound.iter().map(|b| b.name.as_str()).join(", "));
    }
    out
}
