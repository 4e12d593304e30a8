//! WBS (Work Breakdown Structure) hierarchy engine
//!
//! Turns flat WBS records into an ordered forest, generates dotted codes
//! for new items, and rolls estimated cost up each branch.

use crate::types::{WbsItem, WbsStatistics};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Hierarchy level: the number of dot-separated segments
pub fn code_level(code: &str) -> usize {
    code.split('.').count()
}

/// Order two dotted codes segment by segment, numerically.
/// Missing and non-numeric segments compare as 0, so "1.2" < "1.10" < "2.1".
pub fn compare_codes(a: &str, b: &str) -> Ordering {
    let parse = |code: &str| -> Vec<u64> {
        code.split('.')
            .map(|s| s.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Build an ordered forest from flat items.
///
/// Items without a parent, or whose parent is missing, become roots.
/// Items caught in a parent cycle are unreachable from any root and are left out.
pub fn build_hierarchy(items: &[WbsItem]) -> Vec<WbsItem> {
    let ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
    let mut children_of: HashMap<&str, Vec<&WbsItem>> = HashMap::new();
    let mut roots = Vec::new();

    for item in items {
        match item.parent_id.as_deref() {
            Some(parent_id) if ids.contains(parent_id) && parent_id != item.id => {
                children_of.entry(parent_id).or_default().push(item);
            }
            Some(parent_id) if !ids.contains(parent_id) => {
                tracing::warn!(item = %item.id, parent = parent_id, "WBS parent not found; treating item as root");
                roots.push(item);
            }
            _ => roots.push(item),
        }
    }

    let mut placed = 0;
    let mut forest: Vec<WbsItem> = roots
        .into_iter()
        .map(|root| assemble(root, &children_of, &mut placed))
        .collect();
    forest.sort_by(|a, b| compare_codes(&a.code, &b.code));

    if placed < items.len() {
        tracing::warn!(
            dropped = items.len() - placed,
            "WBS items unreachable from any root (parent cycle)"
        );
    }
    forest
}

fn assemble(item: &WbsItem, children_of: &HashMap<&str, Vec<&WbsItem>>, placed: &mut usize) -> WbsItem {
    *placed += 1;
    let mut node = item.clone();
    node.level = code_level(&node.code);
    node.children = children_of
        .get(item.id.as_str())
        .map(|kids| kids.iter().map(|k| assemble(k, children_of, placed)).collect())
        .unwrap_or_default();
    node.children.sort_by(|a, b| compare_codes(&a.code, &b.code));
    node
}

/// Pre-order walk of a forest, children cleared
pub fn flatten_hierarchy(roots: &[WbsItem]) -> Vec<WbsItem> {
    fn walk(node: &WbsItem, out: &mut Vec<WbsItem>) {
        let mut flat = node.clone();
        flat.children = Vec::new();
        out.push(flat);
        for child in &node.children {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    for root in roots {
        walk(root, &mut out);
    }
    out
}

/// Next free code under `parent_id`, or at root level when `None`.
///
/// Roots get `(max first segment + 1).0`; children get
/// `parentCode.(max last segment + 1)`. Malformed segments are ignored.
pub fn generate_next_code(parent_id: Option<&str>, items: &[WbsItem]) -> String {
    let parent = parent_id.and_then(|pid| items.iter().find(|i| i.id == pid));

    match parent {
        Some(parent) => {
            let max = items
                .iter()
                .filter(|i| i.parent_id.as_deref() == Some(parent.id.as_str()))
                .filter_map(|i| i.code.rsplit('.').next())
                .filter_map(|s| s.trim().parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            format!("{}.{}", parent.code, max + 1)
        }
        None => {
            if let Some(pid) = parent_id {
                tracing::warn!(parent = pid, "unknown WBS parent; generating a root code");
            }
            let max = items
                .iter()
                .filter(|i| i.parent_id.is_none())
                .filter_map(|i| i.code.split('.').next())
                .filter_map(|s| s.trim().parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            format!("{}.0", max + 1)
        }
    }
}

/// Leaf-only deletion: an item with children cannot be removed
pub fn can_delete(item_id: &str, items: &[WbsItem]) -> bool {
    !items
        .iter()
        .any(|i| i.parent_id.as_deref() == Some(item_id))
}

/// Would making `candidate_parent_id` the parent of `child_id` create a cycle?
pub fn has_circular_reference(candidate_parent_id: &str, child_id: &str, items: &[WbsItem]) -> bool {
    let by_id: HashMap<&str, &WbsItem> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    let mut seen = HashSet::new();
    let mut current = Some(candidate_parent_id);

    while let Some(id) = current {
        if id == child_id {
            return true;
        }
        // Existing cycle that does not involve the child
        if !seen.insert(id) {
            return false;
        }
        current = by_id.get(id).and_then(|i| i.parent_id.as_deref());
    }
    false
}

pub fn calculate_statistics(items: &[WbsItem]) -> WbsStatistics {
    let mut stats = WbsStatistics {
        total_items: items.len(),
        ..WbsStatistics::default()
    };

    for item in items {
        *stats.items_by_level.entry(code_level(&item.code)).or_insert(0) += 1;
        *stats.items_by_type.entry(item.item_type).or_insert(0) += 1;
        stats.total_estimated_cost += item.estimated_cost;
        stats.total_actual_cost += item.actual_cost;
        if let Some(responsible) = item.responsible.as_deref().filter(|r| !r.trim().is_empty()) {
            stats.responsible_parties.insert(responsible.to_string());
        }
    }

    let mut branch_costs = BTreeMap::new();
    for root in build_hierarchy(items) {
        branch_cost(&root, &mut branch_costs);
    }
    stats.branch_costs = branch_costs;
    stats
}

/// Post-order roll-up; returns the cost of the branch rooted at `node`
fn branch_cost(node: &WbsItem, costs: &mut BTreeMap<String, f64>) -> f64 {
    let total = node.estimated_cost
        + node
            .children
            .iter()
            .map(|child| branch_cost(child, costs))
            .sum::<f64>();
    costs.insert(node.id.clone(), total);
    total
}
