//! Constrained packing: a branch-and-bound integer solver for single- and
//! multi-bin selection under weight and diversity constraints.
//!
//! No CP-SAT/ILP crate is used here: none appears anywhere in the dependency
//! stack this crate is grown from, so the solver is hand-rolled. The
//! decision variables, objective, constraint order, and scaling constants
//! below are exact — only the search strategy (branch-and-bound with a
//! fractional-knapsack bound) is this crate's own.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::model::{
    weight_estimate_grams, ContainerPackingResult, ContainerSpec, MultiPackingResult,
    PackableItem, PackingConstraints, PackingResult, PackingStatus, RetrievedItem,
};

/// One decimal of gram precision (weights are already integral grams in this
/// crate, so this scale is algebraically inert here but kept for parity with
/// the CP-SAT-style formulation it stands in for).
#[allow(dead_code)]
const WEIGHT_SCALE: u64 = 10;
const SCORE_SCALE: f64 = 10_000.0;
const EPSILON: f64 = 0.001;

fn scaled_score(similarity: f32) -> i64 {
    ((f64::from(similarity) + EPSILON) * SCORE_SCALE).round() as i64
}

fn effective_upper(item: &PackableItem, constraints: &PackingConstraints) -> u32 {
    let cap = constraints.max_per_item.unwrap_or(u32::MAX);
    item.quantity_owned.min(cap)
}

/// Per-item/per-group relaxation decisions, computed independently of the
/// search so the relaxation logic is unit-testable on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintPlan {
    pub category_minimums_effective: HashMap<String, u32>,
    pub tag_minimums_effective: HashMap<String, u32>,
    pub pinned_indices: Vec<usize>,
    pub notes: Vec<String>,
}

/// Builds the relaxation plan for category/tag minimums and pinned items,
/// following the constraint order from §4.5: weight (handled by the search
/// itself), category minimums, category maximums (never relaxed, handled
/// directly from `constraints`), tag minimums, pinned items.
pub fn build_constraint_plan(items: &[PackableItem], constraints: &PackingConstraints) -> ConstraintPlan {
    let mut plan = ConstraintPlan::default();

    for (category, &minimum) in &constraints.category_minimums {
        let available: u32 = items
            .iter()
            .filter(|item| &item.category == category)
            .map(|item| effective_upper(item, constraints))
            .sum();
        if available == 0 {
            plan.notes.push(format!("No items available for category '{category}'"));
            continue;
        }
        let effective_min = minimum.min(available);
        if effective_min < minimum {
            plan.notes.push(format!(
                "Category '{category}': relaxed from >={minimum} to >={effective_min} (only {available} available)"
            ));
        }
        plan.category_minimums_effective.insert(category.clone(), effective_min);
    }

    for (tag, &minimum) in &constraints.tag_minimums {
        let available: u32 = items
            .iter()
            .filter(|item| item.semantic_tags.iter().any(|t| t == tag))
            .map(|item| effective_upper(item, constraints))
            .sum();
        if available == 0 {
            plan.notes.push(format!("No items available for tag '{tag}'"));
            continue;
        }
        let effective_min = minimum.min(available);
        if effective_min < minimum {
            plan.notes.push(format!(
                "Tag '{tag}': relaxed from >={minimum} to >={effective_min} (only {available} available)"
            ));
        }
        plan.tag_minimums_effective.insert(tag.clone(), effective_min);
    }

    for pinned_id in &constraints.pinned_items {
        match items.iter().position(|item| &item.item_id == pinned_id) {
            Some(idx) => plan.pinned_indices.push(idx),
            None => plan
                .notes
                .push(format!("Pinned item {pinned_id} not found in candidates")),
        }
    }

    plan
}

struct SolverItem {
    weight: u32,
    score: i64,
    upper: u32,
    category: String,
    tags: Vec<String>,
}

struct Best {
    quantities: Vec<u32>,
    score: i64,
    found: bool,
}

struct SolveCore<'a> {
    items: Vec<SolverItem>,
    constraints: &'a PackingConstraints,
    plan: ConstraintPlan,
    density_order: Vec<usize>,
    deadline: Instant,
    timed_out: bool,
}

impl<'a> SolveCore<'a> {
    fn new(packable: &[PackableItem], constraints: &'a PackingConstraints, time_limit: Duration) -> Self {
        let items: Vec<SolverItem> = packable
            .iter()
            .map(|item| SolverItem {
                weight: item.weight_grams,
                score: scaled_score(item.similarity_score),
                upper: effective_upper(item, constraints),
                category: item.category.clone(),
                tags: item.semantic_tags.clone(),
            })
            .collect();
        let plan = build_constraint_plan(packable, constraints);

        let mut density_order: Vec<usize> = (0..items.len()).collect();
        density_order.sort_by(|&a, &b| {
            let da = items[a].score as f64 / f64::from(items[a].weight.max(1));
            let db = items[b].score as f64 / f64::from(items[b].weight.max(1));
            db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
        });

        Self {
            items,
            constraints,
            plan,
            density_order,
            deadline: Instant::now() + time_limit,
            timed_out: false,
        }
    }

    /// Admissible upper bound on the score achievable from `remaining` (in
    /// density order) given `capacity` grams left, ignoring diversity
    /// constraints and allowing fractional units — both relaxations can only
    /// raise the true optimum, so this never under-prunes a feasible branch.
    fn fractional_bound(&self, mut capacity: i64, decided_from: usize) -> i64 {
        let mut bound = 0i64;
        for &idx in &self.density_order {
            if idx < decided_from {
                continue;
            }
            if capacity <= 0 {
                break;
            }
            let item = &self.items[idx];
            if item.weight == 0 {
                continue;
            }
            let full_weight = i64::from(item.weight) * i64::from(item.upper);
            if full_weight <= capacity {
                bound += item.score * i64::from(item.upper);
                capacity -= full_weight;
            } else {
                let units = capacity / i64::from(item.weight);
                bound += item.score * units;
                capacity -= units * i64::from(item.weight);
                if capacity > 0 {
                    bound += (item.score * capacity) / i64::from(item.weight);
                }
                break;
            }
        }
        bound
    }

    fn leaf_satisfies_diversity(&self, quantities: &[u32]) -> bool {
        for (category, &minimum) in &self.plan.category_minimums_effective {
            let total: u32 = self
                .items
                .iter()
                .zip(quantities)
                .filter(|(item, _)| item.category == *category)
                .map(|(_, &q)| q)
                .sum();
            if total < minimum {
                return false;
            }
        }
        for (category, &maximum) in &self.constraints.category_maximums {
            let total: u32 = self
                .items
                .iter()
                .zip(quantities)
                .filter(|(item, _)| item.category == *category)
                .map(|(_, &q)| q)
                .sum();
            if total > maximum {
                return false;
            }
        }
        for (tag, &minimum) in &self.plan.tag_minimums_effective {
            let total: u32 = self
                .items
                .iter()
                .zip(quantities)
                .filter(|(item, _)| item.tags.iter().any(|t| t == tag))
                .map(|(_, &q)| q)
                .sum();
            if total < minimum {
                return false;
            }
        }
        for &idx in &self.plan.pinned_indices {
            if quantities[idx] < 1 {
                return false;
            }
        }
        true
    }

    fn dfs(
        &mut self,
        idx: usize,
        remaining_capacity: i64,
        current_score: i64,
        quantities: &mut Vec<u32>,
        best: &mut Best,
        nodes_visited: &mut u64,
    ) {
        if self.timed_out {
            return;
        }
        *nodes_visited += 1;
        if *nodes_visited % 2048 == 0 && Instant::now() >= self.deadline {
            self.timed_out = true;
            return;
        }

        if idx == self.items.len() {
            if current_score > best.score && self.leaf_satisfies_diversity(quantities) {
                best.score = current_score;
                best.quantities = quantities.clone();
                best.found = true;
            }
            return;
        }

        if current_score + self.fractional_bound(remaining_capacity, idx) <= best.score && best.found {
            return;
        }

        let item = &self.items[idx];
        let max_by_weight = if item.weight == 0 {
            item.upper
        } else {
            item.upper.min((remaining_capacity / i64::from(item.weight)).max(0) as u32)
        };
        let max_by_category = self
            .constraints
            .category_maximums
            .get(&item.category)
            .map(|&cap| {
                let already: u32 = self.items[..idx]
                    .iter()
                    .zip(quantities.iter())
                    .filter(|(other, _)| other.category == item.category)
                    .map(|(_, &q)| q)
                    .sum();
                cap.saturating_sub(already)
            })
            .unwrap_or(u32::MAX);

        let max_feasible = max_by_weight.min(max_by_category);

        let mut x = max_feasible;
        loop {
            quantities.push(x);
            self.dfs(
                idx + 1,
                remaining_capacity - i64::from(x) * i64::from(item.weight),
                current_score + i64::from(x) * item.score,
                quantities,
                best,
                nodes_visited,
            );
            quantities.pop();
            if self.timed_out || x == 0 {
                break;
            }
            x -= 1;
        }
    }

    fn solve(&mut self, capacity_grams: u32) -> (Vec<u32>, PackingStatus, Vec<String>) {
        let mut best = Best {
            quantities: vec![0; self.items.len()],
            score: i64::MIN,
            found: false,
        };
        let mut quantities = Vec::with_capacity(self.items.len());
        let mut nodes_visited = 0u64;
        self.dfs(
            0,
            i64::from(capacity_grams),
            0,
            &mut quantities,
            &mut best,
            &mut nodes_visited,
        );

        let mut notes = self.plan.notes.clone();
        if !best.found {
            notes.push("Problem is infeasible — try relaxing weight or diversity constraints".to_string());
            (vec![0; self.items.len()], PackingStatus::Infeasible, notes)
        } else if self.timed_out {
            notes.push("Solver time limit reached; returning best solution found so far".to_string());
            (best.quantities, PackingStatus::Feasible, notes)
        } else {
            (best.quantities, PackingStatus::Optimal, notes)
        }
    }
}

/// Branch-and-bound packing solver (`W=10` weight scale, `S=10000`/`ε=0.001` score scale).
pub struct KnapsackOptimizer {
    pub time_limit_seconds: f64,
}

impl Default for KnapsackOptimizer {
    fn default() -> Self {
        Self { time_limit_seconds: 5.0 }
    }
}

impl KnapsackOptimizer {
    pub fn new(time_limit_seconds: f64) -> Self {
        Self { time_limit_seconds }
    }

    fn time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.time_limit_seconds.max(0.0))
    }

    /// Single-bin solve.
    pub fn solve(&self, items: &[PackableItem], constraints: &PackingConstraints) -> PackingResult {
        let started = Instant::now();
        let mut core = SolveCore::new(items, constraints, self.time_limit());
        let (quantities, status, notes) = core.solve(constraints.max_weight_grams);

        build_packing_result(
            items,
            &quantities,
            status,
            notes,
            started.elapsed(),
            constraints.max_weight_grams,
        )
    }

    /// Multi-bin solve: picks aggregate per-item quantities against the
    /// combined capacity of all containers, then distributes those quantities
    /// across the concrete containers with a first-fit-decreasing pass.
    pub fn solve_multi(
        &self,
        items: &[PackableItem],
        containers: &[ContainerSpec],
        constraints: &PackingConstraints,
    ) -> MultiPackingResult {
        let started = Instant::now();
        let total_capacity: u32 = containers.iter().map(|c| c.max_weight_grams).sum();

        let mut core = SolveCore::new(items, constraints, self.time_limit());
        let (quantities, status, mut notes) = core.solve(total_capacity);

        if status == PackingStatus::Infeasible {
            return MultiPackingResult {
                containers: containers
                    .iter()
                    .map(|c| ContainerPackingResult {
                        container_id: c.container_id.clone(),
                        container_name: c.name.clone(),
                        max_weight_grams: c.max_weight_grams,
                        packed_items: vec![],
                        total_weight_grams: 0,
                        weight_utilization: 0.0,
                    })
                    .collect(),
                unpacked_items: items.to_vec(),
                total_similarity_score: 0.0,
                status,
                solver_time_ms: started.elapsed().as_millis() as u64,
                relaxed_constraints: notes,
            };
        }

        let (per_container, leftover_notes) =
            distribute_first_fit_decreasing(items, &quantities, containers, &core.plan);
        notes.extend(leftover_notes);

        let total_similarity_score: f32 = per_container
            .iter()
            .flat_map(|c| c.packed_items.iter())
            .map(|(item, qty)| item.similarity_score * *qty as f32)
            .sum();

        let mut packed_ids_and_qty: HashMap<Uuid, u32> = HashMap::new();
        for container in &per_container {
            for (item, qty) in &container.packed_items {
                *packed_ids_and_qty.entry(item.item_id).or_insert(0) += qty;
            }
        }
        let unpacked_items: Vec<PackableItem> = items
            .iter()
            .filter(|item| packed_ids_and_qty.get(&item.item_id).copied().unwrap_or(0) == 0)
            .cloned()
            .collect();

        MultiPackingResult {
            containers: per_container,
            unpacked_items,
            total_similarity_score,
            status,
            solver_time_ms: started.elapsed().as_millis() as u64,
            relaxed_constraints: notes,
        }
    }
}

fn build_packing_result(
    items: &[PackableItem],
    quantities: &[u32],
    status: PackingStatus,
    notes: Vec<String>,
    elapsed: Duration,
    max_weight_grams: u32,
) -> PackingResult {
    if status == PackingStatus::Infeasible {
        return PackingResult {
            packed_items: vec![],
            unpacked_items: items.to_vec(),
            total_weight_grams: 0,
            total_similarity_score: 0.0,
            weight_utilization: 0.0,
            status,
            solver_time_ms: elapsed.as_millis() as u64,
            relaxed_constraints: notes,
        };
    }

    let mut packed_items = Vec::new();
    let mut unpacked_items = Vec::new();
    let mut total_weight_grams = 0u32;
    let mut total_similarity_score = 0f32;

    for (item, &qty) in items.iter().zip(quantities) {
        if qty > 0 {
            total_weight_grams += item.weight_grams * qty;
            total_similarity_score += item.similarity_score * qty as f32;
            packed_items.push((item.clone(), qty));
        } else {
            unpacked_items.push(item.clone());
        }
    }

    let weight_utilization = if max_weight_grams > 0 {
        total_weight_grams as f32 / max_weight_grams as f32
    } else {
        0.0
    };

    PackingResult {
        packed_items,
        unpacked_items,
        total_weight_grams,
        total_similarity_score,
        weight_utilization,
        status,
        solver_time_ms: elapsed.as_millis() as u64,
        relaxed_constraints: notes,
    }
}

/// Distributes aggregate per-item quantities across concrete containers using
/// first-fit-decreasing by per-unit weight, with pinned items given first
/// pick of capacity so the aggregate solve's "pinned count >= 1" guarantee
/// survives the per-bin split. After placement, each category/tag minimum
/// from `plan` is re-checked against the actual per-container totals — a bin
/// assignment can still leave one short even with pinned items placed first,
/// and that must be surfaced rather than silently reported as `Optimal`.
/// Units that cannot be placed due to fragmentation are reported as a
/// relaxation note and left out of every container's packed list (the caller
/// treats them as unpacked).
fn distribute_first_fit_decreasing(
    items: &[PackableItem],
    quantities: &[u32],
    containers: &[ContainerSpec],
    plan: &ConstraintPlan,
) -> (Vec<ContainerPackingResult>, Vec<String>) {
    let mut remaining_capacity: Vec<u32> = containers.iter().map(|c| c.max_weight_grams).collect();
    let mut packed_per_container: Vec<Vec<(PackableItem, u32)>> = vec![Vec::new(); containers.len()];

    let pinned: std::collections::HashSet<usize> = plan.pinned_indices.iter().copied().collect();

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| (!pinned.contains(&i), std::cmp::Reverse(items[i].weight_grams)));

    let mut notes = Vec::new();

    for idx in order {
        let mut remaining_units = quantities[idx];
        if remaining_units == 0 {
            continue;
        }
        let weight = items[idx].weight_grams;
        for bin in 0..containers.len() {
            if remaining_units == 0 {
                break;
            }
            if weight == 0 {
                continue;
            }
            let fits = remaining_capacity[bin] / weight;
            let placed = fits.min(remaining_units);
            if placed > 0 {
                remaining_capacity[bin] -= placed * weight;
                remaining_units -= placed;
                if let Some(entry) = packed_per_container[bin]
                    .iter_mut()
                    .find(|(item, _)| item.item_id == items[idx].item_id)
                {
                    entry.1 += placed;
                } else {
                    packed_per_container[bin].push((items[idx].clone(), placed));
                }
            }
        }
        if remaining_units > 0 {
            if pinned.contains(&idx) {
                notes.push(format!(
                    "Pinned item '{}' could not be placed in any single container during multi-bin distribution",
                    items[idx].name
                ));
            } else {
                notes.push(format!(
                    "{} unit(s) of '{}' could not be distributed across containers due to fragmentation",
                    remaining_units, items[idx].name
                ));
            }
        }
    }

    for (category, &minimum) in &plan.category_minimums_effective {
        let total: u32 = packed_per_container
            .iter()
            .flatten()
            .filter(|(item, _)| item.category == *category)
            .map(|(_, qty)| *qty)
            .sum();
        if total < minimum {
            notes.push(format!(
                "Category '{category}': only {total} of >={minimum} placed after multi-bin distribution"
            ));
        }
    }
    for (tag, &minimum) in &plan.tag_minimums_effective {
        let total: u32 = packed_per_container
            .iter()
            .flatten()
            .filter(|(item, _)| item.semantic_tags.iter().any(|t| t == tag))
            .map(|(_, qty)| *qty)
            .sum();
        if total < minimum {
            notes.push(format!(
                "Tag '{tag}': only {total} of >={minimum} placed after multi-bin distribution"
            ));
        }
    }

    let results = containers
        .iter()
        .enumerate()
        .map(|(bin, container)| {
            let packed = packed_per_container[bin].clone();
            let total_weight_grams: u32 = packed.iter().map(|(item, qty)| item.weight_grams * qty).sum();
            let weight_utilization = if container.max_weight_grams > 0 {
                total_weight_grams as f32 / container.max_weight_grams as f32
            } else {
                0.0
            };
            ContainerPackingResult {
                container_id: container.container_id.clone(),
                container_name: container.name.clone(),
                max_weight_grams: container.max_weight_grams,
                packed_items: packed,
                total_weight_grams,
                weight_utilization,
            }
        })
        .collect();

    (results, notes)
}

/// `weight_estimate` label → grams, falling back through store override, then
/// the label table, then 500 g for an absent estimate.
pub fn estimate_weight(weight_estimate: Option<&str>) -> u32 {
    weight_estimate.map_or(500, weight_estimate_grams)
}

/// Converts retrieved items into optimizer input, resolving weight via
/// (override → stored explicit → label estimate) and quantity via (inventory
/// map → 1).
pub fn retrieved_to_packable(
    items: &[RetrievedItem],
    inventory: Option<&HashMap<Uuid, u32>>,
    weight_overrides: Option<&HashMap<Uuid, u32>>,
) -> Vec<PackableItem> {
    items
        .iter()
        .map(|item| {
            let weight_grams = weight_overrides
                .and_then(|m| m.get(&item.item_id).copied())
                .or(item.weight_grams)
                .unwrap_or_else(|| estimate_weight(item.context.weight_estimate.as_deref()));
            let quantity_owned = inventory.and_then(|m| m.get(&item.item_id).copied()).unwrap_or(1);
            PackableItem {
                item_id: item.item_id,
                name: item.context.name.clone(),
                similarity_score: item.score.max(0.0),
                weight_grams: weight_grams.max(1),
                quantity_owned: quantity_owned.max(1),
                category: item.context.inferred_category.clone(),
                semantic_tags: item.context.semantic_tags.clone(),
            }
        })
        .collect()
}

/// Built-in diversity presets (§6).
pub fn constraint_preset(name: &str) -> Option<PackingConstraints> {
    let mut c = PackingConstraints::default();
    match name {
        "carry_on_luggage" => {
            c.max_weight_grams = 7_000;
            c.category_minimums.insert("clothing".into(), 2);
        }
        "checked_bag" => {
            c.max_weight_grams = 23_000;
            c.category_minimums.insert("clothing".into(), 3);
        }
        "drone_delivery" => {
            c.max_weight_grams = 5_000;
            c.category_minimums.insert("medical".into(), 2);
            c.tag_minimums.insert("wound_care".into(), 1);
            c.tag_minimums.insert("warmth".into(), 1);
            c.max_per_item = Some(2);
        }
        "medical_relief" => {
            c.max_weight_grams = 30_000;
            c.category_minimums.insert("medical".into(), 5);
            c.category_minimums.insert("camping".into(), 2);
            c.category_minimums.insert("clothing".into(), 2);
            c.tag_minimums.insert("wound_care".into(), 2);
            c.tag_minimums.insert("warmth".into(), 2);
            c.tag_minimums.insert("sterile".into(), 1);
        }
        "hiking_day_trip" => {
            c.max_weight_grams = 10_000;
            c.category_minimums.insert("medical".into(), 1);
            c.tag_minimums.insert("first_aid".into(), 1);
        }
        "bug_out_bag" => {
            c.max_weight_grams = 15_000;
            c.category_minimums.insert("medical".into(), 2);
            c.category_minimums.insert("tech".into(), 1);
            c.category_minimums.insert("camping".into(), 2);
            c.category_minimums.insert("clothing".into(), 1);
            c.tag_minimums.insert("warmth".into(), 1);
            c.tag_minimums.insert("wound_care".into(), 1);
            c.tag_minimums.insert("navigation".into(), 1);
        }
        _ => return None,
    }
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, score: f32, weight: u32, category: &str, tags: &[&str], qty: u32) -> PackableItem {
        PackableItem {
            item_id: Uuid::new_v4(),
            name: name.to_string(),
            similarity_score: score,
            weight_grams: weight,
            quantity_owned: qty,
            category: category.to_string(),
            semantic_tags: tags.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_solve_respects_weight_cap() {
        let items = vec![
            item("A", 0.9, 2000, "camping", &[], 1),
            item("B", 0.8, 3000, "camping", &[], 1),
            item("C", 0.7, 4000, "camping", &[], 1),
        ];
        let constraints = PackingConstraints {
            max_weight_grams: 5000,
            ..Default::default()
        };
        let optimizer = KnapsackOptimizer::new(2.0);
        let result = optimizer.solve(&items, &constraints);
        assert!(result.total_weight_grams <= 5000);
        assert_eq!(result.status, PackingStatus::Optimal);
    }

    #[test]
    fn test_solve_picks_highest_combined_score_under_weight() {
        let items = vec![
            item("A", 0.9, 3000, "camping", &[], 1),
            item("B", 0.85, 3000, "camping", &[], 1),
        ];
        let constraints = PackingConstraints {
            max_weight_grams: 3000,
            ..Default::default()
        };
        let optimizer = KnapsackOptimizer::new(2.0);
        let result = optimizer.solve(&items, &constraints);
        assert_eq!(result.packed_items.len(), 1);
        assert_eq!(result.packed_items[0].0.name, "A");
    }

    #[test]
    fn test_solve_relaxes_unavailable_category_minimum() {
        let items = vec![item("A", 0.5, 500, "camping", &[], 1)];
        let mut constraints = PackingConstraints {
            max_weight_grams: 5000,
            ..Default::default()
        };
        constraints.category_minimums.insert("medical".into(), 2);
        let optimizer = KnapsackOptimizer::new(2.0);
        let result = optimizer.solve(&items, &constraints);
        assert!(result
            .relaxed_constraints
            .iter()
            .any(|note| note.contains("No items available for category 'medical'")));
    }

    #[test]
    fn test_solve_infeasible_when_pinned_plus_minimum_exceed_weight() {
        let items = vec![item("Heavy", 0.1, 10_000, "camping", &[], 1)];
        let pinned = items[0].item_id;
        let constraints = PackingConstraints {
            max_weight_grams: 100,
            pinned_items: vec![pinned],
            ..Default::default()
        };
        let optimizer = KnapsackOptimizer::new(1.0);
        let result = optimizer.solve(&items, &constraints);
        assert_eq!(result.status, PackingStatus::Infeasible);
        assert!(result.packed_items.is_empty());
        assert_eq!(result.unpacked_items.len(), 1);
    }

    #[test]
    fn test_solve_respects_category_maximum_never_relaxed() {
        let items = vec![
            item("A", 0.9, 500, "tech", &[], 1),
            item("B", 0.8, 500, "tech", &[], 1),
        ];
        let mut constraints = PackingConstraints {
            max_weight_grams: 5000,
            ..Default::default()
        };
        constraints.category_maximums.insert("tech".into(), 1);
        let optimizer = KnapsackOptimizer::new(2.0);
        let result = optimizer.solve(&items, &constraints);
        let tech_count: u32 = result
            .packed_items
            .iter()
            .filter(|(i, _)| i.category == "tech")
            .map(|(_, q)| *q)
            .sum();
        assert!(tech_count <= 1);
    }

    #[test]
    fn test_build_constraint_plan_relaxes_tag_minimum() {
        let items = vec![item("A", 0.5, 500, "camping", &["warmth"], 1)];
        let mut constraints = PackingConstraints::default();
        constraints.tag_minimums.insert("warmth".into(), 5);
        let plan = build_constraint_plan(&items, &constraints);
        assert_eq!(plan.tag_minimums_effective.get("warmth"), Some(&1));
        assert!(plan.notes.iter().any(|n| n.contains("relaxed")));
    }

    #[test]
    fn test_build_constraint_plan_reports_missing_pinned_item() {
        let items = vec![item("A", 0.5, 500, "camping", &[], 1)];
        let constraints = PackingConstraints {
            pinned_items: vec![Uuid::new_v4()],
            ..Default::default()
        };
        let plan = build_constraint_plan(&items, &constraints);
        assert!(plan.pinned_indices.is_empty());
        assert!(plan.notes.iter().any(|n| n.contains("not found in candidates")));
    }

    #[test]
    fn test_estimate_weight_label_and_default() {
        assert_eq!(estimate_weight(Some("ultralight")), 100);
        assert_eq!(estimate_weight(None), 500);
    }

    #[test]
    fn test_constraint_preset_carry_on_luggage() {
        let preset = constraint_preset("carry_on_luggage").unwrap();
        assert_eq!(preset.max_weight_grams, 7_000);
        assert_eq!(preset.category_minimums.get("clothing"), Some(&2));
    }

    #[test]
    fn test_constraint_preset_unknown_name() {
        assert!(constraint_preset("nonexistent").is_none());
    }

    #[test]
    fn test_solve_multi_keeps_pinned_item_out_of_weight_oblivious_greedy() {
        // C is heavy and high-similarity, so a pure weight-descending
        // first-fit-decreasing pass places it before the low-similarity
        // pinned item D, which then no longer fits in either bin.
        let c = item("C", 0.9, 900, "camping", &[], 1);
        let d = item("D", 0.1, 250, "camping", &[], 1);
        let pinned_id = d.item_id;

        let items = vec![c, d];
        let containers = vec![
            ContainerSpec { container_id: "1".into(), name: "Bag 1".into(), max_weight_grams: 1000 },
            ContainerSpec { container_id: "2".into(), name: "Bag 2".into(), max_weight_grams: 1500 },
        ];
        let constraints = PackingConstraints {
            max_weight_grams: 0,
            pinned_items: vec![pinned_id],
            ..Default::default()
        };
        let optimizer = KnapsackOptimizer::new(2.0);
        let result = optimizer.solve_multi(&items, &containers, &constraints);

        let pinned_qty: u32 = result
            .containers
            .iter()
            .flat_map(|c| c.packed_items.iter())
            .filter(|(item, _)| item.item_id == pinned_id)
            .map(|(_, qty)| *qty)
            .sum();
        assert!(pinned_qty >= 1, "pinned item must survive multi-bin distribution");
        assert!(result.unpacked_items.iter().all(|item| item.item_id != pinned_id));
    }

    #[test]
    fn test_solve_multi_relaxes_unavailable_category_minimum() {
        let items = vec![item("A", 0.5, 500, "camping", &[], 1)];
        let containers = vec![ContainerSpec { container_id: "1".into(), name: "Bag".into(), max_weight_grams: 1000 }];
        let mut constraints = PackingConstraints { max_weight_grams: 0, ..Default::default() };
        constraints.category_minimums.insert("medical".into(), 1);
        let optimizer = KnapsackOptimizer::new(2.0);
        let result = optimizer.solve_multi(&items, &containers, &constraints);
        assert!(result
            .relaxed_constraints
            .iter()
            .any(|note| note.contains("No items available for category 'medical'")));
    }

    #[test]
    fn test_solve_multi_distributes_across_containers() {
        let items = vec![
            item("A", 0.9, 4000, "camping", &[], 1),
            item("B", 0.8, 4000, "camping", &[], 1),
        ];
        let containers = vec![
            ContainerSpec { container_id: "1".into(), name: "Bag 1".into(), max_weight_grams: 4000 },
            ContainerSpec { container_id: "2".into(), name: "Bag 2".into(), max_weight_grams: 4000 },
        ];
        let constraints = PackingConstraints {
            max_weight_grams: 0,
            ..Default::default()
        };
        let optimizer = KnapsackOptimizer::new(2.0);
        let result = optimizer.solve_multi(&items, &containers, &constraints);
        let total_packed: u32 = result
            .containers
            .iter()
            .flat_map(|c| c.packed_items.iter())
            .map(|(_, q)| *q)
            .sum();
        assert_eq!(total_packed, 2);
        assert!(result.unpacked_items.is_empty());
    }

    #[test]
    fn test_retrieved_to_packable_uses_override_then_stored_then_estimate() {
        use crate::model::ItemContext;
        let item = RetrievedItem {
            item_id: Uuid::new_v4(),
            score: 0.5,
            image_url: None,
            weight_grams: None,
            context: ItemContext {
                name: "Thing".into(),
                inferred_category: "misc".into(),
                primary_material: None,
                weight_estimate: Some("light".into()),
                thermal_rating: None,
                water_resistance: None,
                medical_application: None,
                utility_summary: "x".into(),
                semantic_tags: vec![],
                durability: None,
                compressibility: None,
                environmental_suitability: None,
                limitations_and_failure_modes: None,
                quantity: 1,
            },
        };
        let packable = retrieved_to_packable(&[item], None, None);
        assert_eq!(packable[0].weight_grams, 300);
    }
}
