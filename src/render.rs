//! ASCII rendering of a need's future forest.

use itropa_core::models::{IndustryExpression, Need};
use itropa_core::tree;

const GENERATED: char = '•';
const USER_ADDED: char = '✎';
const CROSS_POLLINATED: char = '⊕';

fn origin_symbol(node: &IndustryExpression) -> char {
    if node.cross_pollinated {
        CROSS_POLLINATED
    } else if node.user_added {
        USER_ADDED
    } else {
        GENERATED
    }
}

/// Render a need as an ASCII tree with origin symbols and ids.
///
/// Example output:
/// ```text
/// Food
/// ├── • Vat Meat [e1]
/// │   ├── • Cell Ranching [e1-1]
/// │   └── ✎ Home Bioreactors [user-1]
/// └── ⊕ Kelp Vats [hybrid-1]
/// ```
pub fn render_need(need: &Need) -> String {
    let mut output = String::new();
    output.push_str(&need.name);
    output.push('\n');

    let roots: Vec<&IndustryExpression> = tree::roots(&need.eras).collect();
    for (i, node) in roots.iter().enumerate() {
        render_node(&mut output, node, "", i == roots.len() - 1);
    }
    output
}

fn render_node(output: &mut String, node: &IndustryExpression, prefix: &str, is_last: bool) {
    let branch = if is_last { "└── " } else { "├── " };
    output.push_str(prefix);
    output.push_str(branch);
    output.push(origin_symbol(node));
    output.push(' ');
    output.push_str(&node.name);
    output.push_str(&format!(" [{}]\n", node.id));

    let continuation = if is_last { "    " } else { "│   " };
    let child_prefix = format!("{prefix}{continuation}");
    for (i, child) in node.children.iter().enumerate() {
        render_node(output, child, &child_prefix, i == node.children.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use im::{vector, Vector};
    use itropa_core::models::{Era, NeedDraft};

    fn need(roots: Vector<IndustryExpression>) -> Need {
        Need::from_draft(
            "Food",
            NeedDraft {
                description: String::new(),
                prior_art: None,
                eras: vec![
                    Era::historical("Agrarian", vec!["Farming".to_string()]),
                    Era::future("Future", roots),
                ],
                related_needs: vec![],
            },
        )
    }

    #[test]
    fn empty_forest_renders_only_the_need() {
        assert_eq!(render_need(&need(vector![])), "Food\n");
    }

    #[test]
    fn nested_children_and_origin_symbols() {
        let user = IndustryExpression {
            user_added: true,
            ..IndustryExpression::new("user-1", "Home Bioreactors")
        };
        let hybrid = IndustryExpression {
            cross_pollinated: true,
            ..IndustryExpression::new("hybrid-1", "Kelp Vats")
        };
        let root = IndustryExpression::new("e1", "Vat Meat")
            .with_children(vector![IndustryExpression::new("e1-1", "Cell Ranching"), user]);

        let output = render_need(&need(vector![root, hybrid]));
        let expected = "\
Food
├── • Vat Meat [e1]
│   ├── • Cell Ranching [e1-1]
│   └── ✎ Home Bioreactors [user-1]
└── ⊕ Kelp Vats [hybrid-1]
";
        assert_eq!(output, expected);
    }

    #[test]
    fn last_branch_uses_blank_continuation() {
        let root = IndustryExpression::new("a", "A")
            .with_children(vector![IndustryExpression::new("a1", "A1")
                .with_children(vector![IndustryExpression::new("a1x", "A1X")])]);
        let output = render_need(&need(vector![root]));
        assert!(output.contains("└── • A [a]\n    └── • A1 [a1]\n        └── • A1X [a1x]\n"));
    }
}
