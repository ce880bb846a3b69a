//! Grouping and ordering of aggregation rows for comparison plots.
//!
//! Groups iterate ascending by key. Inside a group, points are sorted
//! ascending by order key with a stable sort, so equal order keys keep the
//! order in which their runs were discovered.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use tl_core::Real;
use tl_results::AggregationRow;

/// `group_key -> [(order_key, value)]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedSeries {
    groups: BTreeMap<OrderedFloat<Real>, Vec<(Real, Real)>>,
}

impl GroupedSeries {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = AggregationRow>,
    {
        let mut groups: BTreeMap<OrderedFloat<Real>, Vec<(Real, Real)>> = BTreeMap::new();
        for row in rows {
            groups
                .entry(OrderedFloat(row.group_key))
                .or_default()
                .push((row.order_key, row.value));
        }
        for points in groups.values_mut() {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
        Self { groups }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Real, &[(Real, Real)])> {
        self.groups
            .iter()
            .map(|(key, points)| (key.into_inner(), points.as_slice()))
    }

    pub fn group(&self, key: Real) -> Option<&[(Real, Real)]> {
        self.groups.get(&OrderedFloat(key)).map(Vec::as_slice)
    }

    pub fn group_keys(&self) -> Vec<Real> {
        self.groups.keys().map(|k| k.into_inner()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Flatten back to rows in group/order sequence.
    pub fn to_rows(&self) -> Vec<AggregationRow> {
        self.iter()
            .flat_map(|(group_key, points)| {
                points.iter().map(move |&(order_key, value)| AggregationRow {
                    group_key,
                    order_key,
                    value,
                })
            })
            .collect()
    }
}

pub fn group_rows(rows: &[AggregationRow]) -> GroupedSeries {
    GroupedSeries::from_rows(rows.iter().copied())
}

/// Legend label for a group.
pub fn group_label(key: Real) -> String {
    format!("Scale {key:?}")
}
