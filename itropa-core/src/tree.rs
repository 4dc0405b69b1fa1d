//! Pure operations over a need's expression forest.
//!
//! The forest is the slice of a need's eras; only `Future` eras hold
//! expressions. Operations take the forest by reference and return a new
//! one. Nodes on the path from the era root to the change are rebuilt;
//! every other subtree is shared with the input through the persistent
//! vectors, so the input stays valid and unchanged.

use std::collections::HashSet;

use im::Vector;
use tracing::debug;

use crate::error::{TreeError, TreeResult};
use crate::models::{Era, EraExpressions, IndustryExpression, Need};

/// Root expressions of every era that holds a forest, in era order.
pub fn roots(eras: &[Era]) -> impl Iterator<Item = &IndustryExpression> {
    eras.iter()
        .filter_map(Era::expressions)
        .flat_map(|expressions| expressions.iter())
}

/// Depth-first search by id; first match wins.
pub fn find_by_id<'a>(eras: &'a [Era], id: &str) -> Option<&'a IndustryExpression> {
    roots(eras).find_map(|root| find_in(root, &|node| node.id == id))
}

/// Depth-first search by trimmed, case-insensitive exact name.
pub fn find_by_name<'a>(eras: &'a [Era], name: &str) -> Option<&'a IndustryExpression> {
    roots(eras).find_map(|root| find_in(root, &|node| node.name_matches(name)))
}

fn find_in<'a>(
    node: &'a IndustryExpression,
    matches: &dyn Fn(&IndustryExpression) -> bool,
) -> Option<&'a IndustryExpression> {
    if matches(node) {
        return Some(node);
    }
    node.children.iter().find_map(|child| find_in(child, matches))
}

/// Looks `key` up as an id, then as a name.
///
/// Callers may hold an id from an older version of the need whose node was
/// re-keyed since; the name fallback still finds it.
pub fn resolve<'a>(eras: &'a [Era], key: &str) -> TreeResult<&'a IndustryExpression> {
    find_by_id(eras, key)
        .or_else(|| find_by_name(eras, key))
        .ok_or_else(|| TreeError::ExpressionNotFound(key.to_string()))
}

/// Every expression in the forest, depth-first, parents before children.
pub fn expressions(eras: &[Era]) -> Vec<&IndustryExpression> {
    let mut out = Vec::new();
    for root in roots(eras) {
        push_preorder(root, &mut out);
    }
    out
}

fn push_preorder<'a>(node: &'a IndustryExpression, out: &mut Vec<&'a IndustryExpression>) {
    out.push(node);
    for child in node.children.iter() {
        push_preorder(child, out);
    }
}

/// The chain of expressions from an era root down to `id`, inclusive.
pub fn path_to<'a>(eras: &'a [Era], id: &str) -> Option<Vec<&'a IndustryExpression>> {
    roots(eras).find_map(|root| {
        let mut path = Vec::new();
        path_in(root, id, &mut path).then_some(path)
    })
}

fn path_in<'a>(
    node: &'a IndustryExpression,
    id: &str,
    path: &mut Vec<&'a IndustryExpression>,
) -> bool {
    path.push(node);
    if node.id == id {
        return true;
    }
    for child in node.children.iter() {
        if path_in(child, id, path) {
            return true;
        }
    }
    path.pop();
    false
}

/// Every expression id in the forest, nested children included.
pub fn collect_ids(eras: &[Era]) -> HashSet<String> {
    let mut ids = HashSet::new();
    for root in roots(eras) {
        collect_subtree_ids(root, &mut ids);
    }
    ids
}

fn collect_subtree_ids(node: &IndustryExpression, ids: &mut HashSet<String>) {
    ids.insert(node.id.clone());
    for child in node.children.iter() {
        collect_subtree_ids(child, ids);
    }
}

/// Appends `nodes` after the existing children of `parent_id`.
pub fn insert_children(
    eras: &[Era],
    parent_id: &str,
    nodes: Vec<IndustryExpression>,
) -> TreeResult<Vec<Era>> {
    ensure_insertable(eras, &nodes)?;

    for (index, era) in eras.iter().enumerate() {
        let EraExpressions::Future(expressions) = &era.expressions else {
            continue;
        };
        if let Some(rebuilt) = append_under(expressions, parent_id, &nodes) {
            debug!(parent_id, added = nodes.len(), era = %era.name, "Inserted children");
            return Ok(replace_era_expressions(eras, index, rebuilt));
        }
    }

    Err(TreeError::ExpressionNotFound(parent_id.to_string()))
}

fn append_under(
    nodes: &Vector<IndustryExpression>,
    parent_id: &str,
    new_nodes: &[IndustryExpression],
) -> Option<Vector<IndustryExpression>> {
    nodes.iter().enumerate().find_map(|(index, node)| {
        let replacement = if node.id == parent_id {
            let mut children = node.children.clone();
            children.extend(new_nodes.iter().cloned());
            node.with_children(children)
        } else {
            node.with_children(append_under(&node.children, parent_id, new_nodes)?)
        };
        let mut rebuilt = nodes.clone();
        rebuilt.set(index, replacement);
        Some(rebuilt)
    })
}

/// Appends `node` as a root of the single era accepted by `is_target`.
pub fn insert_root(
    eras: &[Era],
    node: IndustryExpression,
    is_target: impl Fn(&Era) -> bool,
) -> TreeResult<Vec<Era>> {
    ensure_insertable(eras, std::slice::from_ref(&node))?;

    let targets: Vec<usize> = eras
        .iter()
        .enumerate()
        .filter(|(_, era)| is_target(era))
        .map(|(index, _)| index)
        .collect();

    let index = match targets.as_slice() {
        [] => return Err(TreeError::NoFutureEra),
        [index] => *index,
        many => return Err(TreeError::AmbiguousFutureEra(many.len())),
    };

    match &eras[index].expressions {
        EraExpressions::Future(expressions) => {
            debug!(id = %node.id, era = %eras[index].name, "Inserted root expression");
            let mut rebuilt = expressions.clone();
            rebuilt.push_back(node);
            Ok(replace_era_expressions(eras, index, rebuilt))
        }
        EraExpressions::Historical(_) => Err(TreeError::ReadOnlyEra(eras[index].name.clone())),
    }
}

/// Removes the expression `id` and its entire subtree.
///
/// Returns the new forest together with the removed subtree.
pub fn remove_by_id(eras: &[Era], id: &str) -> TreeResult<(Vec<Era>, IndustryExpression)> {
    for (index, era) in eras.iter().enumerate() {
        let EraExpressions::Future(expressions) = &era.expressions else {
            continue;
        };
        if let Some((rebuilt, removed)) = remove_from(expressions, id) {
            debug!(id, removed = removed.subtree_len(), era = %era.name, "Removed expression");
            return Ok((replace_era_expressions(eras, index, rebuilt), removed));
        }
    }

    Err(TreeError::ExpressionNotFound(id.to_string()))
}

fn remove_from(
    nodes: &Vector<IndustryExpression>,
    id: &str,
) -> Option<(Vector<IndustryExpression>, IndustryExpression)> {
    nodes.iter().enumerate().find_map(|(index, node)| {
        let mut rebuilt = nodes.clone();
        if node.id == id {
            let removed = rebuilt.remove(index);
            return Some((rebuilt, removed));
        }
        let (children, removed) = remove_from(&node.children, id)?;
        rebuilt.set(index, node.with_children(children));
        Some((rebuilt, removed))
    })
}

fn replace_era_expressions(
    eras: &[Era],
    index: usize,
    expressions: Vector<IndustryExpression>,
) -> Vec<Era> {
    let mut next = eras.to_vec();
    next[index].expressions = EraExpressions::Future(expressions);
    next
}

/// Rejects nodes whose ids (at any depth) collide with the forest or with each other.
fn ensure_insertable(eras: &[Era], nodes: &[IndustryExpression]) -> TreeResult<()> {
    let mut taken = collect_ids(eras);
    for node in nodes {
        claim_subtree_ids(node, &mut taken)?;
    }
    Ok(())
}

fn claim_subtree_ids(node: &IndustryExpression, taken: &mut HashSet<String>) -> TreeResult<()> {
    if !taken.insert(node.id.clone()) {
        return Err(TreeError::DuplicateId(node.id.clone()));
    }
    for child in node.children.iter() {
        claim_subtree_ids(child, taken)?;
    }
    Ok(())
}

/// Re-keys nodes whose ids are empty or already in `taken`, recursively.
///
/// Kept ids and new ids are both added to `taken`. A colliding id `x`
/// becomes `x-1`, `x-2`, ...; an empty id derives from `stem`.
pub fn assign_unique_ids(
    nodes: Vec<IndustryExpression>,
    stem: &str,
    taken: &mut HashSet<String>,
) -> Vec<IndustryExpression> {
    nodes
        .into_iter()
        .map(|node| assign_unique_id(node, stem, taken))
        .collect()
}

/// Single-node form of [`assign_unique_ids`].
pub fn assign_unique_id(
    node: IndustryExpression,
    stem: &str,
    taken: &mut HashSet<String>,
) -> IndustryExpression {
    let id = unique_id(&node.id, stem, taken);
    taken.insert(id.clone());
    let children = assign_unique_ids(node.children.iter().cloned().collect(), &id, taken);
    IndustryExpression {
        id,
        children: children.into_iter().collect(),
        ..node
    }
}

/// Re-keys every forest in `eras` so ids are non-empty and unique across
/// the need. Used on generator output before it becomes a need.
pub fn with_unique_ids(eras: Vec<Era>) -> Vec<Era> {
    let mut taken = HashSet::new();
    eras.into_iter()
        .map(|era| match era.expressions {
            EraExpressions::Future(expressions) => {
                let nodes = assign_unique_ids(expressions.into_iter().collect(), "expr", &mut taken);
                Era::future(era.name, nodes.into_iter().collect())
            }
            EraExpressions::Historical(_) => era,
        })
        .collect()
}

fn unique_id(id: &str, stem: &str, taken: &HashSet<String>) -> String {
    let id = id.trim();
    if !id.is_empty() && !taken.contains(id) {
        return id.to_string();
    }
    let base = if id.is_empty() { stem } else { id };
    let mut n = 1;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Checks the structural invariants of a need: exactly one future era that
/// holds a forest, and globally unique expression ids.
pub fn validate(need: &Need) -> TreeResult<()> {
    let future: Vec<&Era> = need
        .eras
        .iter()
        .filter(|era| era.is_future() || era.expressions().is_some())
        .collect();

    match future.as_slice() {
        [] => return Err(TreeError::NoFutureEra),
        [era] if era.expressions().is_none() => {
            return Err(TreeError::ReadOnlyEra(era.name.clone()))
        }
        [era] if !era.is_future() => return Err(TreeError::NoFutureEra),
        [_] => {}
        many => return Err(TreeError::AmbiguousFutureEra(many.len())),
    }

    let mut taken = HashSet::new();
    for root in roots(&need.eras) {
        claim_subtree_ids(root, &mut taken)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use im::vector;

    fn node(id: &str, children: Vector<IndustryExpression>) -> IndustryExpression {
        IndustryExpression::new(id, id.to_uppercase()).with_children(children)
    }

    /// Future forest:
    /// a
    /// ├── a1
    /// │   └── a1x
    /// └── a2
    /// b
    fn forest() -> Vec<Era> {
        vec![
            Era::historical("Agrarian", vec!["Granaries".to_string()]),
            Era::future(
                "Future",
                vector![
                    node(
                        "a",
                        vector![node("a1", vector![node("a1x", vector![])]), node("a2", vector![])]
                    ),
                    node("b", vector![]),
                ],
            ),
        ]
    }

    fn future_roots(eras: &[Era]) -> &Vector<IndustryExpression> {
        eras[1].expressions().expect("future era")
    }

    #[test]
    fn find_by_id_searches_nested_children() {
        let eras = forest();
        assert_eq!(find_by_id(&eras, "a1x").map(|n| n.name.as_str()), Some("A1X"));
        assert!(find_by_id(&eras, "missing").is_none());
    }

    #[test]
    fn find_by_name_is_case_and_whitespace_insensitive() {
        let eras = forest();
        assert_eq!(find_by_name(&eras, "  a2 ").map(|n| n.id.as_str()), Some("a2"));
    }

    #[test]
    fn path_to_returns_ancestors_root_first() {
        let eras = forest();
        let path: Vec<&str> = path_to(&eras, "a1x")
            .expect("path")
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(path, vec!["a", "a1", "a1x"]);
    }

    #[test]
    fn insert_children_appends_after_existing_children() {
        let eras = forest();
        let next = insert_children(&eras, "a", vec![node("a3", vector![])]).unwrap();

        let a = find_by_id(&next, "a").unwrap();
        let ids: Vec<&str> = a.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
    }

    #[test]
    fn insert_children_leaves_input_unchanged_and_shares_siblings() {
        let eras = forest();
        let before = eras.clone();
        let next = insert_children(&eras, "a1x", vec![node("deep", vector![])]).unwrap();

        assert_eq!(eras, before);
        assert!(find_by_id(&eras, "deep").is_none());
        assert!(find_by_id(&next, "deep").is_some());

        // `b` and `a2` are off the mutation path.
        assert_eq!(future_roots(&eras)[1], future_roots(&next)[1]);
        assert_eq!(find_by_id(&eras, "a2"), find_by_id(&next, "a2"));
        // Historical eras are carried over unchanged.
        assert_eq!(eras[0], next[0]);
    }

    #[test]
    fn insert_children_reports_missing_parent() {
        let eras = forest();
        let err = insert_children(&eras, "ghost", vec![node("x", vector![])]).unwrap_err();
        assert_eq!(err, TreeError::ExpressionNotFound("ghost".to_string()));
    }

    #[test]
    fn insert_children_rejects_duplicate_ids() {
        let eras = forest();
        let err = insert_children(&eras, "b", vec![node("a2", vector![])]).unwrap_err();
        assert_eq!(err, TreeError::DuplicateId("a2".to_string()));

        let err = insert_children(&eras, "b", vec![node("n", vector![]), node("n", vector![])])
            .unwrap_err();
        assert_eq!(err, TreeError::DuplicateId("n".to_string()));
    }

    #[test]
    fn insert_root_targets_the_future_era() {
        let eras = forest();
        let next = insert_root(&eras, node("c", vector![]), Era::is_future).unwrap();
        let ids: Vec<&str> = future_roots(&next).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn insert_root_refuses_read_only_era() {
        let eras = forest();
        let err = insert_root(&eras, node("c", vector![]), |era| era.name == "Agrarian").unwrap_err();
        assert_eq!(err, TreeError::ReadOnlyEra("Agrarian".to_string()));
    }

    #[test]
    fn insert_root_requires_exactly_one_target() {
        let eras = forest();
        assert_eq!(
            insert_root(&eras, node("c", vector![]), |_| false).unwrap_err(),
            TreeError::NoFutureEra
        );
        assert_eq!(
            insert_root(&eras, node("c", vector![]), |_| true).unwrap_err(),
            TreeError::AmbiguousFutureEra(2)
        );
    }

    #[test]
    fn remove_by_id_drops_the_whole_subtree() {
        let eras = forest();
        let (next, removed) = remove_by_id(&eras, "a1").unwrap();

        assert_eq!(removed.subtree_len(), 2);
        let ids = collect_ids(&next);
        assert!(!ids.contains("a1"));
        assert!(!ids.contains("a1x"));
        assert!(ids.contains("a2"));
        // Input untouched.
        assert!(collect_ids(&eras).contains("a1x"));
    }

    #[test]
    fn remove_by_id_of_missing_node_leaves_forest_as_is() {
        let eras = forest();
        let err = remove_by_id(&eras, "ghost").unwrap_err();
        assert_eq!(err, TreeError::ExpressionNotFound("ghost".to_string()));
        assert_eq!(collect_ids(&eras).len(), 5);
    }

    #[test]
    fn assign_unique_ids_rekeys_collisions_and_blanks() {
        let mut taken = collect_ids(&forest());
        let nodes = vec![
            node("a", vector![node("", vector![])]),
            node("", vector![]),
            node("fresh", vector![]),
        ];
        let assigned = assign_unique_ids(nodes, "b", &mut taken);

        let ids: Vec<&str> = assigned.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a-1", "b-1", "fresh"]);
        assert_eq!(assigned[0].children[0].id, "a-1-1");
        assert!(taken.contains("a-1-1"));
    }

    #[test]
    fn resolve_prefers_id_then_falls_back_to_name() {
        let eras = forest();
        assert_eq!(resolve(&eras, "a2").unwrap().id, "a2");
        assert_eq!(resolve(&eras, "A1X").unwrap().id, "a1x");
        assert_eq!(
            resolve(&eras, "ghost").unwrap_err(),
            TreeError::ExpressionNotFound("ghost".to_string())
        );
    }

    #[test]
    fn expressions_lists_parents_before_children() {
        let eras = forest();
        let ids: Vec<&str> = expressions(&eras).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "a1", "a1x", "a2", "b"]);
    }

    #[test]
    fn with_unique_ids_fixes_generator_output() {
        let eras = vec![
            Era::historical("Agrarian", vec![]),
            Era::future(
                "Future",
                vector![node("", vector![node("", vector![])]), node("x", vector![]), node("x", vector![])],
            ),
        ];
        let fixed = with_unique_ids(eras);
        let ids: Vec<&str> = expressions(&fixed).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["expr-1", "expr-1-1", "x", "x-1"]);
        assert_eq!(fixed[0], Era::historical("Agrarian", vec![]));
    }

    #[test]
    fn validate_checks_future_era_and_uniqueness() {
        use crate::models::NeedDraft;

        let ok = Need::from_draft(
            "Food",
            NeedDraft {
                description: String::new(),
                prior_art: None,
                eras: forest(),
                related_needs: vec![],
            },
        );
        assert!(validate(&ok).is_ok());

        let mut dup = ok.clone();
        dup.eras = insert_children(&ok.eras, "b", vec![node("z", vector![])]).unwrap();
        if let EraExpressions::Future(roots) = &mut dup.eras[1].expressions {
            roots.push_back(node("z", vector![]));
        }
        assert_eq!(validate(&dup), Err(TreeError::DuplicateId("z".to_string())));

        let mut none = ok.clone();
        none.eras.truncate(1);
        assert_eq!(validate(&none), Err(TreeError::NoFutureEra));

        let mut two = ok.clone();
        two.eras.push(Era::future("Far Future", vector![]));
        assert_eq!(validate(&two), Err(TreeError::AmbiguousFutureEra(2)));
    }
}
