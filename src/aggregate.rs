// 🧮 Ranking & Aggregation Primitives
// In-memory building blocks shared by every catalog query:
//   - group_aggregate: partition + associative metrics (count, sum, min, max, mean)
//   - dense_rank: ties share a rank, deterministic secondary order
//   - row_number: position within a partition (window-style)
//   - pairwise_cooccurrence: canonical unordered pairs under a shared parent

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregate {
    /// Partition size (every row, measure ignored)
    Count,
    /// Rows whose measure is present
    Present,
    /// Rows whose measure is missing
    Missing,
    Sum,
    Min,
    Max,
    Mean,
}

/// A named aggregate over a per-row measure. Rows returning None are
/// excluded from sum/min/max/mean and counted by Missing.
pub struct Metric<'a, T> {
    pub name: &'static str,
    pub aggregate: Aggregate,
    measure: Box<dyn Fn(&T) -> Option<f64> + 'a>,
}

impl<'a, T> Metric<'a, T> {
    pub fn new(
        name: &'static str,
        aggregate: Aggregate,
        measure: impl Fn(&T) -> Option<f64> + 'a,
    ) -> Self {
        Metric {
            name,
            aggregate,
            measure: Box::new(measure),
        }
    }

    pub fn count(name: &'static str) -> Self {
        Self::new(name, Aggregate::Count, |_| Some(1.0))
    }

    /// Conditional count: sum of a 0/1 indicator
    pub fn count_where(name: &'static str, predicate: impl Fn(&T) -> bool + 'a) -> Self {
        Self::new(name, Aggregate::Sum, move |row| {
            Some(if predicate(row) { 1.0 } else { 0.0 })
        })
    }

    pub fn sum(name: &'static str, measure: impl Fn(&T) -> Option<f64> + 'a) -> Self {
        Self::new(name, Aggregate::Sum, measure)
    }

    pub fn min(name: &'static str, measure: impl Fn(&T) -> Option<f64> + 'a) -> Self {
        Self::new(name, Aggregate::Min, measure)
    }

    pub fn max(name: &'static str, measure: impl Fn(&T) -> Option<f64> + 'a) -> Self {
        Self::new(name, Aggregate::Max, measure)
    }

    pub fn mean(name: &'static str, measure: impl Fn(&T) -> Option<f64> + 'a) -> Self {
        Self::new(name, Aggregate::Mean, measure)
    }

    pub fn missing(name: &'static str, measure: impl Fn(&T) -> Option<f64> + 'a) -> Self {
        Self::new(name, Aggregate::Missing, measure)
    }

    fn evaluate(&self, row: &T) -> Option<f64> {
        (self.measure)(row).filter(|v| v.is_finite())
    }
}

/// Running state for one metric over one partition.
/// `merge` is associative and commutative, so partial results combine in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    rows: usize,
    present: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    pub fn push(&mut self, value: Option<f64>) {
        self.rows += 1;
        if let Some(v) = value {
            self.present += 1;
            self.sum += v;
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }

    pub fn merge(&mut self, other: &Accumulator) {
        self.rows += other.rows;
        self.present += other.present;
        self.sum += other.sum;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Final value; None when the aggregate has nothing to summarize
    pub fn finish(&self, aggregate: Aggregate) -> Option<f64> {
        match aggregate {
            Aggregate::Count => Some(self.rows as f64),
            Aggregate::Present => Some(self.present as f64),
            Aggregate::Missing => Some((self.rows - self.present) as f64),
            Aggregate::Sum => (self.present > 0).then_some(self.sum),
            Aggregate::Min => self.min,
            Aggregate::Max => self.max,
            Aggregate::Mean => rate(self.sum, self.present as f64),
        }
    }
}

// ============================================================================
// GROUP AGGREGATE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Group<K> {
    pub key: K,
    pub size: usize,
    pub values: Vec<(&'static str, Option<f64>)>,
}

impl<K> Group<K> {
    /// Value of a metric by name (None if missing or unknown)
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| *v)
    }

    /// Integer view of a count-like metric
    pub fn count(&self, name: &str) -> i64 {
        self.value(name).map(|v| v as i64).unwrap_or(0)
    }
}

/// Partition rows by `key_fn` and apply every metric per partition.
/// Groups come back in ascending key order.
pub fn group_aggregate<T, K, F>(rows: &[T], key_fn: F, metrics: &[Metric<'_, T>]) -> Vec<Group<K>>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut partitions: BTreeMap<K, (usize, Vec<Accumulator>)> = BTreeMap::new();

    for row in rows {
        let (size, accs) = partitions
            .entry(key_fn(row))
            .or_insert_with(|| (0, vec![Accumulator::default(); metrics.len()]));
        *size += 1;
        for (acc, metric) in accs.iter_mut().zip(metrics) {
            acc.push(metric.evaluate(row));
        }
    }

    partitions
        .into_iter()
        .map(|(key, (size, accs))| Group {
            key,
            size,
            values: metrics
                .iter()
                .zip(&accs)
                .map(|(m, acc)| (m.name, acc.finish(m.aggregate)))
                .collect(),
        })
        .collect()
}

/// successful / total, None when total is zero
pub fn rate(successful: f64, total: f64) -> Option<f64> {
    if total == 0.0 {
        None
    } else {
        Some(successful / total)
    }
}

// ============================================================================
// RANKING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<T> {
    pub rank: usize,
    pub item: T,
}

/// Descending order with missing values last
pub fn cmp_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort by `metric_fn` descending and assign dense ranks 1..k.
/// Ties share a rank and are ordered by `tiebreak_fn` ascending.
pub fn dense_rank<T, M, B, K>(mut rows: Vec<T>, metric_fn: M, tiebreak_fn: B) -> Vec<Ranked<T>>
where
    M: Fn(&T) -> Option<f64>,
    B: Fn(&T) -> K,
    K: Ord,
{
    rows.sort_by(|a, b| {
        cmp_desc(metric_fn(a), metric_fn(b)).then_with(|| tiebreak_fn(a).cmp(&tiebreak_fn(b)))
    });

    let mut ranked = Vec::with_capacity(rows.len());
    let mut rank = 0;
    let mut previous: Option<Option<f64>> = None;

    for row in rows {
        let metric = metric_fn(&row);
        if previous.map_or(true, |p| cmp_desc(p, metric) != Ordering::Equal) {
            rank += 1;
            previous = Some(metric);
        }
        ranked.push(Ranked { rank, item: row });
    }

    ranked
}

/// Number rows 1.. within each partition, ordered by `order_fn`
pub fn row_number<T, P, PF, O, OF>(rows: Vec<T>, partition_fn: PF, order_fn: OF) -> Vec<(usize, T)>
where
    P: Ord,
    PF: Fn(&T) -> P,
    O: Ord,
    OF: Fn(&T) -> O,
{
    let mut partitions: BTreeMap<P, Vec<T>> = BTreeMap::new();
    for row in rows {
        partitions.entry(partition_fn(&row)).or_default().push(row);
    }

    let mut numbered = Vec::new();
    for (_, mut members) in partitions {
        members.sort_by(|a, b| order_fn(a).cmp(&order_fn(b)));
        numbered.extend(members.into_iter().enumerate().map(|(i, row)| (i + 1, row)));
    }
    numbered
}

// ============================================================================
// PAIRWISE CO-OCCURRENCE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PairStats {
    /// Number of shared parents
    pub count: u64,
    /// Sum of both participants' weights across shared parents
    pub weight: f64,
}

/// Collect each parent's distinct participants (weights summed per participant)
pub fn participants_by_parent<T, P, Q>(
    rows: &[T],
    parent_key_fn: impl Fn(&T) -> P,
    participant_key_fn: impl Fn(&T) -> Q,
    weight_fn: impl Fn(&T) -> f64,
) -> BTreeMap<P, BTreeMap<Q, f64>>
where
    P: Ord,
    Q: Ord,
{
    let mut parents: BTreeMap<P, BTreeMap<Q, f64>> = BTreeMap::new();
    for row in rows {
        *parents
            .entry(parent_key_fn(row))
            .or_default()
            .entry(participant_key_fn(row))
            .or_insert(0.0) += weight_fn(row);
    }
    parents
}

/// Every unordered pair (a, b), a < b, sharing a parent, with counts and
/// weights accumulated across all shared parents. A participant listed
/// twice under one parent counts once, so (x, x) is never emitted.
pub fn pairwise_cooccurrence<T, P, Q>(
    rows: &[T],
    parent_key_fn: impl Fn(&T) -> P,
    participant_key_fn: impl Fn(&T) -> Q,
    weight_fn: impl Fn(&T) -> f64,
) -> BTreeMap<(Q, Q), PairStats>
where
    P: Ord,
    Q: Ord + Clone,
{
    let parents = participants_by_parent(rows, parent_key_fn, participant_key_fn, weight_fn);
    let mut pairs: BTreeMap<(Q, Q), PairStats> = BTreeMap::new();

    for participants in parents.values() {
        // BTreeMap iteration is ascending, so (a, b) is already canonical
        let members: Vec<(&Q, f64)> = participants.iter().map(|(q, w)| (q, *w)).collect();
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let (a, wa) = members[i];
                let (b, wb) = members[j];
                let stats = pairs.entry((a.clone(), b.clone())).or_default();
                stats.count += 1;
                stats.weight += wa + wb;
            }
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        group: &'static str,
        id: i64,
        value: Option<f64>,
    }

    fn row(group: &'static str, id: i64, value: Option<f64>) -> Row {
        Row { group, id, value }
    }

    fn sample() -> Vec<Row> {
        vec![
            row("food", 1, Some(100.0)),
            row("food", 2, Some(300.0)),
            row("food", 3, None),
            row("tech", 4, Some(50.0)),
            row("pets", 5, None),
        ]
    }

    #[test]
    fn test_group_aggregate_partition_property() {
        let rows = sample();
        let metrics = [Metric::count("n")];
        let groups = group_aggregate(&rows, |r| r.group, &metrics);

        for g in &groups {
            assert_eq!(g.count("n") as usize, g.size);
            assert!(g.size > 0);
        }
        let total: usize = groups.iter().map(|g| g.size).sum();
        assert_eq!(total, rows.len());

        // ascending key order
        let keys: Vec<_> = groups.iter().map(|g| g.key).collect();
        assert_eq!(keys, vec!["food", "pets", "tech"]);
    }

    #[test]
    fn test_group_aggregate_null_handling() {
        let rows = sample();
        let metrics = [
            Metric::mean("avg", |r: &Row| r.value),
            Metric::min("min", |r: &Row| r.value),
            Metric::max("max", |r: &Row| r.value),
            Metric::sum("sum", |r: &Row| r.value),
            Metric::missing("missing", |r: &Row| r.value),
            Metric::count_where("big", |r: &Row| r.value.unwrap_or(0.0) > 200.0),
        ];
        let groups = group_aggregate(&rows, |r| r.group, &metrics);

        let food = &groups[0];
        assert_eq!(food.value("avg"), Some(200.0));
        assert_eq!(food.value("min"), Some(100.0));
        assert_eq!(food.value("max"), Some(300.0));
        assert_eq!(food.value("sum"), Some(400.0));
        assert_eq!(food.count("missing"), 1);
        assert_eq!(food.count("big"), 1);

        // a partition with only missing measures yields nulls, never a panic
        let pets = &groups[1];
        assert_eq!(pets.value("avg"), None);
        assert_eq!(pets.value("min"), None);
        assert_eq!(pets.value("sum"), None);
        assert_eq!(pets.count("missing"), 1);
    }

    #[test]
    fn test_accumulator_merge_is_order_independent() {
        let values = [Some(4.0), None, Some(-2.0), Some(9.5), None, Some(1.0)];

        let mut whole = Accumulator::default();
        values.iter().for_each(|v| whole.push(*v));

        let (left, right) = values.split_at(2);
        let mut a = Accumulator::default();
        left.iter().for_each(|v| a.push(*v));
        let mut b = Accumulator::default();
        right.iter().for_each(|v| b.push(*v));

        let mut ab = a;
        ab.merge(&b);
        let mut ba = b;
        ba.merge(&a);

        assert_eq!(ab, whole);
        assert_eq!(ba, whole);
        assert_eq!(whole.finish(Aggregate::Mean), Some(12.5 / 4.0));
    }

    #[test]
    fn test_rate_zero_denominator() {
        assert_eq!(rate(0.0, 0.0), None);
        assert_eq!(rate(4.0, 10.0), Some(0.4));
    }

    #[test]
    fn test_dense_rank_ties_and_order() {
        let rows = vec![
            row("a", 3, Some(10.0)),
            row("b", 1, Some(20.0)),
            row("c", 2, Some(10.0)),
            row("d", 4, None),
            row("e", 5, Some(5.0)),
        ];

        let ranked = dense_rank(rows.clone(), |r| r.value, |r| r.id);
        let summary: Vec<(usize, i64)> = ranked.iter().map(|r| (r.rank, r.item.id)).collect();

        assert_eq!(summary, vec![(1, 1), (2, 2), (2, 3), (3, 5), (4, 4)]);

        // ranks never decrease along the output
        assert!(ranked.windows(2).all(|w| w[0].rank <= w[1].rank));

        // identical input, identical order
        let again = dense_rank(rows, |r| r.value, |r| r.id);
        let again: Vec<(usize, i64)> = again.iter().map(|r| (r.rank, r.item.id)).collect();
        assert_eq!(summary, again);
    }

    #[test]
    fn test_dense_rank_empty() {
        let ranked = dense_rank(Vec::<Row>::new(), |r| r.value, |r| r.id);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_row_number_resets_per_partition() {
        let rows = vec![
            row("ep2", 30, None),
            row("ep1", 20, None),
            row("ep1", 10, None),
            row("ep2", 5, None),
            row("ep1", 15, None),
        ];

        let numbered = row_number(rows, |r| r.group, |r| r.id);
        let summary: Vec<(&str, usize, i64)> =
            numbered.iter().map(|(n, r)| (r.group, *n, r.id)).collect();

        assert_eq!(
            summary,
            vec![
                ("ep1", 1, 10),
                ("ep1", 2, 15),
                ("ep1", 3, 20),
                ("ep2", 1, 5),
                ("ep2", 2, 30),
            ]
        );
    }

    // (parent, participant, weight)
    type Link = (i64, i64, f64);

    fn pairs_of(links: &[Link]) -> BTreeMap<(i64, i64), PairStats> {
        pairwise_cooccurrence(links, |l| l.0, |l| l.1, |l| l.2)
    }

    #[test]
    fn test_pairwise_canonical_and_no_self_pairs() {
        // participant 7 listed twice under parent 1
        let links = [(1, 9, 1.0), (1, 7, 2.0), (1, 7, 3.0), (1, 3, 4.0)];
        let pairs = pairs_of(&links);

        assert!(pairs.keys().all(|(a, b)| a < b));
        assert!(!pairs.contains_key(&(7, 7)));
        assert!(!pairs.contains_key(&(9, 7)));
        assert_eq!(pairs.len(), 3);

        let p = pairs[&(7, 9)];
        assert_eq!(p.count, 1);
        assert_eq!(p.weight, 2.0 + 3.0 + 1.0);
    }

    #[test]
    fn test_pairwise_weight_per_parent_is_n_choose_2() {
        let links = [(1, 1, 0.0), (1, 2, 0.0), (1, 3, 0.0), (1, 4, 0.0), (2, 5, 0.0)];
        let pairs = pairs_of(&links);

        let total: u64 = pairs.values().map(|p| p.count).sum();
        assert_eq!(total, 6); // C(4, 2); parent 2 has a single participant
    }

    #[test]
    fn test_pairwise_accumulates_across_parents() {
        let links = [
            (1, 1, 0.0),
            (1, 2, 0.0),
            (1, 3, 0.0),
            (2, 2, 0.0),
            (2, 1, 0.0),
        ];
        let pairs = pairs_of(&links);

        assert_eq!(pairs[&(1, 2)].count, 2);
        assert_eq!(pairs[&(1, 3)].count, 1);
        assert_eq!(pairs[&(2, 3)].count, 1);
    }
}
